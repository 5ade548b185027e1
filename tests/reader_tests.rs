//! Reader tests: parsing, resolution, discriminators and validation

use domain_schema_docs::models::RawRef;
use domain_schema_docs::reader::parser::parse_schema;
use domain_schema_docs::reader::source::parse_document;
use domain_schema_docs::{
    CyclePolicy, DiscriminatorMode, ErrorKind, ReadError, ReaderConfig, Schema, SourceFile,
    ValidationErrors, build_model,
};

const APPLICATION: (&str, &str) = ("index.yaml", "title: Shop\ndescription: Online shop\n");
const CUSTOMERS: (&str, &str) = ("customers/index.yaml", "$id: /customers\ntitle: Customers\n");
const ORDERS: (&str, &str) = ("orders/index.yaml", "$id: /orders\ntitle: Orders\n");

const CUSTOMER: (&str, &str) = (
    "customers/Customer.yaml",
    "$id: /customers/Customer.yaml\ntitle: Customer\ntype: object\nrequired: [name]\nproperties:\n  name:\n    type: string\n    maxLength: 80\n  status:\n    type: string\n    enum: [active, blocked]\n",
);
const ORDER: (&str, &str) = (
    "orders/Order.yaml",
    "$id: /orders/Order.yaml\ntitle: Order\ntype: object\nproperties:\n  customer:\n    $ref: ../customers/Customer.yaml\n  lines:\n    type: array\n    items:\n      $ref: '#/definitions/OrderLine'\ndefinitions:\n  OrderLine:\n    type: object\n    properties:\n      quantity:\n        type: integer\n        minimum: 1\n",
);

fn sources(files: &[(&str, &str)]) -> Vec<SourceFile> {
    files
        .iter()
        .map(|(path, text)| SourceFile::new(*path, *text))
        .collect()
}

fn read(files: &[(&str, &str)], config: &ReaderConfig) -> Result<domain_schema_docs::Model, ValidationErrors> {
    build_model(sources(files), config).map_err(|e| match e {
        ReadError::Validation(errors) => errors,
        other => panic!("unexpected error: {other}"),
    })
}

fn parsed((path, text): (&str, &str)) -> Schema<RawRef> {
    let node = parse_document(&SourceFile::new(path, text)).unwrap();
    parse_schema(&node, &format!("/{}", path), &ReaderConfig::default()).unwrap()
}

mod resolution_tests {
    use super::*;

    #[test]
    fn test_resolution_keeps_schema_content() {
        let model = read(&[APPLICATION, CUSTOMERS, ORDERS, CUSTOMER, ORDER], &ReaderConfig::default()).unwrap();

        for file in [CUSTOMER, ORDER] {
            let before = serde_json::to_value(parsed(file)).unwrap();
            let id = format!("/{}", file.0);
            let handle = model.schema_by_id(&id).unwrap();
            let after = serde_json::to_value(model.schema(handle)).unwrap();
            assert_eq!(before, after, "content of {} changed", id);
        }
    }

    #[test]
    fn test_source_order_does_not_matter() {
        let forward = [APPLICATION, CUSTOMERS, ORDERS, CUSTOMER, ORDER];
        let mut backward = forward;
        backward.reverse();

        let a = read(&forward, &ReaderConfig::default()).unwrap();
        let b = read(&backward, &ReaderConfig::default()).unwrap();
        assert_eq!(serde_json::to_value(&a).unwrap(), serde_json::to_value(&b).unwrap());
    }

    #[test]
    fn test_missing_target_reported_once() {
        let broken = (
            "orders/Invoice.yaml",
            "$id: /orders/Invoice.yaml\ntype: object\nproperties:\n  payer:\n    $ref: ../customers/Payer.yaml\n",
        );
        let errors = read(&[APPLICATION, CUSTOMERS, ORDERS, CUSTOMER, broken], &ReaderConfig::default())
            .unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors.count(ErrorKind::UnresolvedReference), 1);
        let error = errors.iter().next().unwrap();
        assert_eq!(error.location.file, "orders/Invoice.yaml");
    }

    #[test]
    fn test_cycle_policy() {
        let a = ("m/A.yaml", "$id: /m/A.yaml\ntype: object\nproperties:\n  b:\n    $ref: ./B.yaml\n");
        let b = ("m/B.yaml", "$id: /m/B.yaml\ntype: object\nproperties:\n  a:\n    $ref: ./A.yaml\n");
        let module = ("m/index.yaml", "$id: /m\ntitle: M\n");

        assert!(read(&[module, a, b], &ReaderConfig::default()).is_ok());

        let forbid = ReaderConfig::default().with_cycle_policy(CyclePolicy::Forbid);
        let errors = read(&[module, a, b], &forbid).unwrap_err();
        assert!(errors.count(ErrorKind::CyclicReference) >= 1);
    }
}

mod discriminator_tests {
    use super::*;

    const MODULE: (&str, &str) = ("m/index.yaml", "$id: /m\ntitle: M\n");
    const BASE: (&str, &str) = (
        "m/Base.yaml",
        "$id: /m/Base.yaml\ntype: object\ndiscriminator:\n  propertyName: kind\nproperties:\n  kind:\n    type: string\n",
    );
    const DERIVED: (&str, &str) = (
        "m/Derived.yaml",
        "$id: /m/Derived.yaml\nallOf:\n  - $ref: ./Base.yaml\n  - properties:\n      kind:\n        const: derived\n",
    );

    #[test]
    fn test_allow_links_extension_to_base() {
        let config = ReaderConfig::default().with_discriminator(DiscriminatorMode::Allow);
        let model = read(&[MODULE, BASE, DERIVED], &config).unwrap();

        let base = model.schema_by_id("/m/Base.yaml").unwrap();
        let derived = model.schema_by_id("/m/Derived.yaml").unwrap();
        let variants = &model.schema(base).variants;
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].value.as_deref(), Some("derived"));
        assert_eq!(model.schema(derived).variant_of, vec![base]);
    }

    #[test]
    fn test_forbid_rejects_undeclared_extension() {
        let errors = read(&[MODULE, BASE, DERIVED], &ReaderConfig::default()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.count(ErrorKind::DiscriminatorViolation), 1);
    }
}

mod validation_tests {
    use super::*;

    #[test]
    fn test_every_constraint_violation_is_reported() {
        let module = ("m/index.yaml", "$id: /m\ntitle: M\n");
        let a = (
            "m/A.yaml",
            "$id: /m/A.yaml\ntype: object\nproperties:\n  age:\n    type: integer\n    minimum: 10\n    maximum: 1\n",
        );
        let b = (
            "m/B.yaml",
            "$id: /m/B.yaml\ntype: object\nrequired: [missing]\nproperties:\n  code:\n    type: string\n    format: emial\n",
        );

        let errors = read(&[module, a, b], &ReaderConfig::default()).unwrap_err();
        assert_eq!(errors.count(ErrorKind::ConstraintViolation), 3);
        let files: Vec<&str> = errors.iter().map(|e| e.location.file.as_str()).collect();
        assert_eq!(files, vec!["m/A.yaml", "m/B.yaml", "m/B.yaml"]);
    }

    #[test]
    fn test_module_errors_reported_with_constraint_violations() {
        let module = ("m/index.yaml", "$id: /m\ntitle: M\n");
        let twin = ("m/index.yml", "$id: /m\ntitle: M again\n");
        let a = (
            "m/A.yaml",
            "$id: /m/A.yaml\ntype: object\nproperties:\n  age:\n    type: integer\n    minimum: 10\n    maximum: 1\n",
        );
        let orphan = ("x/B.yaml", "$id: /x/B.yaml\ntype: object\n");

        let errors = read(&[module, twin, a, orphan], &ReaderConfig::default()).unwrap_err();
        assert_eq!(errors.count(ErrorKind::ConstraintViolation), 1);
        assert_eq!(errors.count(ErrorKind::MalformedInput), 1);
        assert_eq!(errors.count(ErrorKind::DuplicateId), 1);
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_unknown_keyword_is_malformed() {
        let module = ("m/index.yaml", "$id: /m\ntitle: M\n");
        let a = ("m/A.yaml", "$id: /m/A.yaml\ntitel: A\ntype: object\n");

        let errors = read(&[module, a], &ReaderConfig::default()).unwrap_err();
        assert_eq!(errors.count(ErrorKind::MalformedInput), 1);
        assert_eq!(errors.iter().next().unwrap().suggestion.as_deref(), Some("title"));
    }

    #[test]
    fn test_allowed_keyword_is_accepted() {
        let module = ("m/index.yaml", "$id: /m\ntitle: M\n");
        let a = ("m/A.yaml", "$id: /m/A.yaml\nowner: sales\ntype: object\n");

        let config = ReaderConfig::default().with_allowed_keywords(["owner"]);
        assert!(read(&[module, a], &config).is_ok());
    }
}

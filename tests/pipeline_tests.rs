//! End-to-end pipeline tests on the file system

use domain_schema_docs::{
    DefaultReader, DiscriminatorMode, FileSystemStorageBackend, MarkdownWriter, OpenApiPlugin,
    OutputCleaning, PipelineError, ReaderConfig, RunConfig, RunOptions, run,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const FILES: &[(&str, &str)] = &[
    ("index.yaml", "title: Shop\ndescription: Online shop\n"),
    ("customers/index.yaml", "$id: /customers\ntitle: Customers\n"),
    (
        "customers/Customer.yaml",
        "$id: /customers/Customer.yaml\ntitle: Customer\ntype: object\nrequired: [name]\nproperties:\n  name:\n    type: string\n  status:\n    type: string\n    enum: [active, blocked]\n",
    ),
    ("orders/index.yaml", "$id: /orders\ntitle: Orders\n"),
    (
        "orders/Order.yaml",
        "$id: /orders/Order.yaml\ntitle: Order\ntype: object\nproperties:\n  customer:\n    $ref: ../customers/Customer.yaml\n",
    ),
];

fn write_input(root: &Path, files: &[(&str, &str)]) {
    for (path, text) in files {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }
}

/// Every file below `root`, keyed by relative path
fn snapshot(root: &Path) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let relative = path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/");
                files.insert(relative, fs::read_to_string(&path).unwrap());
            }
        }
    }
    files
}

fn setup(files: &[(&str, &str)]) -> (TempDir, RunConfig) {
    let temp = tempfile::tempdir().unwrap();
    write_input(&temp.path().join("in"), files);
    let config = RunConfig::new()
        .with_input(temp.path().join("in"))
        .with_output(temp.path().join("out"));
    (temp, config)
}

mod output_tests {
    use super::*;

    #[tokio::test]
    async fn test_documentation_tree() {
        let (temp, config) = setup(FILES);
        let report = run(RunOptions::from_config(&config.with_openapi(true)).unwrap())
            .await
            .unwrap();

        assert_eq!(report.schemas, 2);
        assert_eq!(report.modules, 2);
        let files = snapshot(&temp.path().join("out"));
        let paths: Vec<&str> = files.keys().map(String::as_str).collect();
        assert_eq!(
            paths,
            vec![
                "README.md",
                "customers/Customer.yaml.md",
                "customers/README.md",
                "customers/customers.openapi.yaml",
                "orders/Order.yaml.md",
                "orders/README.md",
                "orders/orders.openapi.yaml",
            ]
        );

        let order = &files["orders/Order.yaml.md"];
        assert!(order.contains("[Customer](../customers/Customer.yaml.md)"));
        let module = &files["orders/README.md"];
        assert!(module.contains("[OpenApiSpec](./orders.openapi.yaml)"));
        let spec = &files["orders/orders.openapi.yaml"];
        assert!(spec.contains("Order:"));
        assert!(spec.contains("Customer:"));
    }

    #[tokio::test]
    async fn test_rerun_is_byte_identical() {
        let (temp, config) = setup(FILES);
        let config = config.with_openapi(true).with_clean_output(true);

        run(RunOptions::from_config(&config).unwrap()).await.unwrap();
        let first = snapshot(&temp.path().join("out"));
        run(RunOptions::from_config(&config).unwrap()).await.unwrap();
        let second = snapshot(&temp.path().join("out"));

        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_clean_output_removes_stale_files() {
        let (temp, config) = setup(FILES);
        let out = temp.path().join("out");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("stale.md"), "old").unwrap();

        run(RunOptions::from_config(&config.with_clean_output(true)).unwrap())
            .await
            .unwrap();
        assert!(!out.join("stale.md").exists());
        assert!(out.join("README.md").exists());
    }
}

mod failure_tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_input_writes_nothing() {
        let mut files = FILES.to_vec();
        files.push((
            "orders/Broken.yaml",
            "$id: /orders/Broken.yaml\ntype: object\nproperties:\n  a:\n    $ref: '#/does-not-exist'\n",
        ));
        let (temp, config) = setup(&files);

        let err = run(RunOptions::from_config(&config.with_openapi(true)).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        assert_eq!(err.validation_errors().map(|e| e.len()), Some(1));
        assert!(!temp.path().join("out").exists());
    }

    #[tokio::test]
    async fn test_missing_input_directory() {
        let temp = tempfile::tempdir().unwrap();
        let config = RunConfig::new()
            .with_input(temp.path().join("nowhere"))
            .with_output(temp.path().join("out"));

        let err = run(RunOptions::from_config(&config).unwrap()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Storage(_)));
    }
}

mod discriminator_tests {
    use super::*;

    const VARIANTS: &[(&str, &str)] = &[
        ("m/index.yaml", "$id: /m\ntitle: Shapes\n"),
        (
            "m/Base.yaml",
            "$id: /m/Base.yaml\ntitle: Shape\ntype: object\ndiscriminator:\n  propertyName: kind\nproperties:\n  kind:\n    type: string\n",
        ),
        (
            "m/Derived.yaml",
            "$id: /m/Derived.yaml\ntitle: Circle\nallOf:\n  - $ref: ./Base.yaml\n  - properties:\n      kind:\n        const: circle\n      radius:\n        type: number\n",
        ),
    ];

    #[tokio::test]
    async fn test_allow_documents_the_variant_on_the_base() {
        let temp = tempfile::tempdir().unwrap();
        write_input(&temp.path().join("in"), VARIANTS);
        let out = FileSystemStorageBackend::new(temp.path().join("out"));
        let reader = DefaultReader::new(FileSystemStorageBackend::new(temp.path().join("in")), "")
            .with_config(ReaderConfig::default().with_discriminator(DiscriminatorMode::Allow));
        let options = RunOptions::new(reader)
            .with_plugin(OpenApiPlugin::new(FileSystemStorageBackend::new(temp.path().join("out")), ""))
            .with_writer(MarkdownWriter::new(FileSystemStorageBackend::new(temp.path().join("out")), ""))
            .with_clean_output(OutputCleaning::new(out, ""));

        let report = run(options).await.unwrap();
        let base = report.model.schema_by_id("/m/Base.yaml").unwrap();
        assert_eq!(report.model.schema(base).variants.len(), 1);

        let page = fs::read_to_string(temp.path().join("out/m/Base.yaml.md")).unwrap();
        assert!(page.contains("[Circle](./Derived.yaml.md)"));
    }

    #[tokio::test]
    async fn test_forbid_fails_without_output() {
        let (temp, config) = setup(VARIANTS);
        let err = run(RunOptions::from_config(&config).unwrap()).await.unwrap_err();
        assert_eq!(err.validation_errors().map(|e| e.len()), Some(1));
        assert!(!temp.path().join("out").exists());
    }
}

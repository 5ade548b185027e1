//! Discriminator reconciliation
//!
//! Links polymorphic bases (schemas whose root declares a `discriminator`)
//! to their variants. Declared variants are the base's `oneOf` members and
//! mapping targets; extensions are definitions with an `allOf` parent
//! resolving to the base.

use super::config::DiscriminatorMode;
use crate::models::{
    DefinitionBody, PropertyType, RefTarget, Schema, SchemaHandle, SourceLocation, VariantLink,
};
use crate::validation::ValidationError;
use std::collections::BTreeMap;
use tracing::debug;

fn describe(schemas: &[Schema], target: &RefTarget) -> String {
    let id = &schemas[target.schema().index()].id;
    match target {
        RefTarget::Schema(_) => id.clone(),
        RefTarget::Definition { name, .. } => format!("{}#/definitions/{}", id, name),
        RefTarget::Property {
            definition: Some(definition),
            property,
            ..
        } => format!("{}#/definitions/{}/properties/{}", id, definition, property),
        RefTarget::Property { property, .. } => format!("{}#/properties/{}", id, property),
    }
}

fn location_of(schemas: &[Schema], target: &RefTarget) -> SourceLocation {
    let schema = &schemas[target.schema().index()];
    schema
        .definition(target.definition_name())
        .map(|d| d.location.clone())
        .unwrap_or_else(|| schema.location.clone())
}

/// The value a variant pins its discriminator property to
///
/// Either a `const`/single-value `enum` on the property, or a reference to
/// an enum with exactly one value.
fn fixed_value(schemas: &[Schema], target: &RefTarget, property_name: &str) -> Option<String> {
    if target.is_property() {
        return None;
    }
    let definition = schemas[target.schema().index()].definition(target.definition_name())?;
    let property = definition.property(property_name)?;
    match &property.ty {
        PropertyType::Primitive(primitive) => primitive.fixed_string().map(str::to_string),
        PropertyType::Ref { target, .. } => {
            let referenced = schemas[target.target.schema().index()]
                .definition(target.target.definition_name())?;
            match &referenced.body {
                DefinitionBody::Enum(body) if body.values.len() == 1 => {
                    body.values[0].as_str().map(str::to_string)
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// Definitions with an `allOf` parent that is the whole base schema
fn extensions(schemas: &[Schema], base: SchemaHandle) -> Vec<RefTarget> {
    let base_target = RefTarget::Schema(base);
    let mut found = Vec::new();
    for (position, schema) in schemas.iter().enumerate() {
        let handle = SchemaHandle::new(position);
        for (name, definition) in schema.all_definitions() {
            if handle == base && name.is_none() {
                continue;
            }
            if definition.parents.iter().any(|p| p.target == base_target) {
                found.push(match name {
                    None => RefTarget::Schema(handle),
                    Some(name) => RefTarget::Definition {
                        schema: handle,
                        name: name.to_string(),
                    },
                });
            }
        }
    }
    found
}

fn variants_of(
    schemas: &[Schema],
    base: SchemaHandle,
    mode: DiscriminatorMode,
    errors: &mut Vec<ValidationError>,
) -> Vec<VariantLink> {
    let schema = &schemas[base.index()];
    let Some(discriminator) = &schema.definition.discriminator else {
        return Vec::new();
    };
    let property_name = discriminator.property_name.as_str();

    if schema.definition.property(property_name).is_none() {
        errors.push(ValidationError::discriminator(
            format!(
                "Discriminator property '{}' is not declared by schema '{}'",
                property_name, schema.id
            ),
            schema.location.clone(),
        ));
    }

    let mut declared: Vec<(RefTarget, Option<String>)> = Vec::new();
    if let Some(object) = schema.definition.object() {
        for member in &object.one_of {
            if !declared.iter().any(|(t, _)| *t == member.target) {
                declared.push((member.target.clone(), None));
            }
        }
    }
    for (key, target) in &discriminator.mapping {
        if target.target.is_property() {
            errors.push(ValidationError::discriminator(
                format!(
                    "Discriminator mapping '{}' of schema '{}' targets the property '{}'",
                    key,
                    schema.id,
                    describe(schemas, &target.target)
                ),
                schema.location.clone(),
            ));
            continue;
        }
        match declared.iter_mut().find(|(t, _)| *t == target.target) {
            Some((_, mapped)) => {
                if mapped.is_none() {
                    *mapped = Some(key.clone());
                }
            }
            None => declared.push((target.target.clone(), Some(key.clone()))),
        }
    }

    let mut links = Vec::new();
    for (target, key) in declared {
        let value = match (fixed_value(schemas, &target, property_name), key) {
            (Some(fixed), Some(key)) if fixed != key => {
                errors.push(ValidationError::discriminator(
                    format!(
                        "Variant '{}' of polymorphic base '{}' is mapped as '{}' but sets discriminator '{}' to '{}'",
                        describe(schemas, &target),
                        schema.id,
                        key,
                        property_name,
                        fixed
                    ),
                    location_of(schemas, &target),
                ));
                Some(key)
            }
            (fixed, key) => fixed.or(key),
        };
        if value.is_none() && mode == DiscriminatorMode::Forbid {
            errors.push(ValidationError::discriminator(
                format!(
                    "Variant '{}' of polymorphic base '{}' has no value for discriminator '{}'",
                    describe(schemas, &target),
                    schema.id,
                    property_name
                ),
                location_of(schemas, &target),
            ));
        }
        links.push(VariantLink {
            value,
            target,
            declared: true,
        });
    }

    for target in extensions(schemas, base) {
        if links.iter().any(|l| l.target == target) {
            continue;
        }
        match mode {
            DiscriminatorMode::Forbid => errors.push(ValidationError::discriminator(
                format!(
                    "'{}' extends polymorphic base '{}' but is not one of its declared variants",
                    describe(schemas, &target),
                    schema.id
                ),
                location_of(schemas, &target),
            )),
            DiscriminatorMode::Allow => {
                debug!(base = %schema.id, variant = %describe(schemas, &target), "Linking undeclared variant");
                links.push(VariantLink {
                    value: fixed_value(schemas, &target, property_name),
                    target,
                    declared: false,
                });
            }
        }
    }

    let mut seen: BTreeMap<&str, &RefTarget> = BTreeMap::new();
    for link in &links {
        if let Some(value) = &link.value
            && let Some(previous) = seen.insert(value.as_str(), &link.target)
        {
            errors.push(ValidationError::discriminator(
                format!(
                    "Discriminator value '{}' of '{}' is used by both '{}' and '{}'",
                    value,
                    schema.id,
                    describe(schemas, previous),
                    describe(schemas, &link.target)
                ),
                location_of(schemas, &link.target),
            ));
        }
    }
    links
}

/// Link every polymorphic base to its variants
///
/// Sets `variants` on each base and `variant_of` on each variant schema;
/// returns the discriminator violations of the active mode.
pub fn reconcile(schemas: &mut [Schema], mode: DiscriminatorMode) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut links = Vec::new();
    for position in 0..schemas.len() {
        if schemas[position].definition.discriminator.is_some() {
            let base = SchemaHandle::new(position);
            links.push((base, variants_of(schemas, base, mode, &mut errors)));
        }
    }

    for (base, variants) in links {
        for variant in &variants {
            let schema = &mut schemas[variant.target.schema().index()];
            if !schema.variant_of.contains(&base) {
                schema.variant_of.push(base);
            }
        }
        schemas[base.index()].variants = variants;
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawRef;
    use crate::reader::config::ReaderConfig;
    use crate::reader::parser::parse_schema;
    use crate::reader::resolver::ReferenceResolver;
    use crate::reader::source::{SourceFile, parse_document};
    use crate::validation::ErrorKind;

    const BASE: &str = "$id: /m/Base.yaml\ntype: object\ndiscriminator:\n  propertyName: kind\nproperties:\n  kind:\n    type: string\n";
    const DERIVED: &str = "$id: /m/Derived.yaml\nallOf:\n  - $ref: ./Base.yaml\n  - properties:\n      kind:\n        const: derived\n";

    fn schemas(files: &[(&str, &str)]) -> Vec<Schema> {
        let parsed: Vec<Schema<RawRef>> = files
            .iter()
            .map(|(path, text)| {
                let node = parse_document(&SourceFile::new(*path, *text)).unwrap();
                parse_schema(&node, &format!("/{}", path), &ReaderConfig::default()).unwrap()
            })
            .collect();
        ReferenceResolver::resolve_all(parsed).unwrap()
    }

    #[test]
    fn test_allow_links_undeclared_extension() {
        let mut schemas = schemas(&[("m/Base.yaml", BASE), ("m/Derived.yaml", DERIVED)]);
        let errors = reconcile(&mut schemas, DiscriminatorMode::Allow);
        assert!(errors.is_empty());
        assert_eq!(
            schemas[0].variants,
            vec![VariantLink {
                value: Some("derived".to_string()),
                target: RefTarget::Schema(SchemaHandle::new(1)),
                declared: false,
            }]
        );
        assert_eq!(schemas[1].variant_of, vec![SchemaHandle::new(0)]);
    }

    #[test]
    fn test_forbid_reports_undeclared_extension_once() {
        let mut schemas = schemas(&[("m/Base.yaml", BASE), ("m/Derived.yaml", DERIVED)]);
        let errors = reconcile(&mut schemas, DiscriminatorMode::Forbid);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::DiscriminatorViolation);
        assert!(errors[0].message.contains("/m/Derived.yaml"));
        assert!(schemas[0].variants.is_empty());
    }

    #[test]
    fn test_mapping_key_must_match_fixed_value() {
        let base = "$id: /m/Base.yaml\ntype: object\ndiscriminator:\n  propertyName: kind\n  mapping:\n    circle: ./Circle.yaml\nproperties:\n  kind:\n    type: string\n";
        let circle = "$id: /m/Circle.yaml\nallOf:\n  - $ref: ./Base.yaml\n  - properties:\n      kind:\n        const: square\n";

        for mode in [DiscriminatorMode::Forbid, DiscriminatorMode::Allow] {
            let mut schemas = schemas(&[("m/Base.yaml", base), ("m/Circle.yaml", circle)]);
            let errors = reconcile(&mut schemas, mode);
            assert_eq!(errors.len(), 1);
            assert!(errors[0].message.contains("mapped as 'circle'"));
            assert!(errors[0].message.contains("'square'"));
            assert_eq!(schemas[0].variants[0].value.as_deref(), Some("circle"));
        }

        let matching = circle.replace("square", "circle");
        let mut schemas = schemas(&[("m/Base.yaml", base), ("m/Circle.yaml", &matching)]);
        assert!(reconcile(&mut schemas, DiscriminatorMode::Forbid).is_empty());
    }

    #[test]
    fn test_described_reference_to_base_is_not_a_variant() {
        let holder = "$id: /m/Holder.yaml\ntype: object\nproperties:\n  shape:\n    description: Any shape\n    allOf:\n      - $ref: ./Base.yaml\n";

        let mut forbid = schemas(&[("m/Base.yaml", BASE), ("m/Holder.yaml", holder)]);
        assert!(reconcile(&mut forbid, DiscriminatorMode::Forbid).is_empty());

        let mut allow = schemas(&[
            ("m/Base.yaml", BASE),
            ("m/Derived.yaml", DERIVED),
            ("m/Holder.yaml", holder),
        ]);
        assert!(reconcile(&mut allow, DiscriminatorMode::Allow).is_empty());
        assert_eq!(allow[0].variants.len(), 1);
        assert!(allow[2].variant_of.is_empty());
    }

    #[test]
    fn test_declared_variants_and_duplicate_values() {
        let base = "$id: /m/Base.yaml\ntype: object\ndiscriminator:\n  propertyName: kind\n  mapping:\n    a: ./A.yaml\n    b: ./B.yaml\nproperties:\n  kind:\n    type: string\n";
        let variant = |id: &str| {
            format!("$id: /m/{}.yaml\nallOf:\n  - $ref: ./Base.yaml\n  - properties:\n      kind:\n        const: same\n", id)
        };
        let a = variant("A");
        let b = variant("B");
        let mut schemas = schemas(&[("m/A.yaml", &a), ("m/B.yaml", &b), ("m/Base.yaml", base)]);
        let errors = reconcile(&mut schemas, DiscriminatorMode::Forbid);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("'same'"));
        assert_eq!(schemas[2].variants.len(), 2);
        assert!(schemas[2].variants.iter().all(|v| v.declared));
    }

    #[test]
    fn test_declared_variant_needs_a_value_under_forbid() {
        let base = "$id: /m/Base.yaml\ntype: object\ndiscriminator:\n  propertyName: kind\nproperties:\n  kind:\n    type: string\n";
        let with_one_of = format!("{}oneOf:\n  - $ref: ./C.yaml\n", base.replace("properties:\n  kind:\n    type: string\n", ""));
        let c = "$id: /m/C.yaml\ntype: object\nproperties:\n  name:\n    type: string\n";

        let mut forbid = schemas(&[("m/Base.yaml", &with_one_of), ("m/C.yaml", c)]);
        let errors = reconcile(&mut forbid, DiscriminatorMode::Forbid);
        // the base declares no 'kind' and C has no value
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.message.contains("has no value")));

        let mut allow = schemas(&[("m/Base.yaml", &with_one_of), ("m/C.yaml", c)]);
        let errors = reconcile(&mut allow, DiscriminatorMode::Allow);
        assert_eq!(errors.len(), 1);
        assert_eq!(allow[0].variants[0].value, None);
    }
}

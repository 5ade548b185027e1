//! Model assembly
//!
//! Folds parsed modules and resolved, reconciled schemas into a [`Model`].

use crate::models::{Application, Model, Module, Schema, SchemaHandle};
use crate::validation::{ErrorKind, ValidationError, ValidationErrors};
use tracing::info;

/// Duplicate module ids and schemas outside every module
///
/// Runs on parsed schemas so these errors are reported together with
/// the resolution and validation errors of the same input.
pub fn check_modules<R>(modules: &[Module], schemas: &[Schema<R>]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut sorted: Vec<&Module> = modules.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));
    for pair in sorted.windows(2) {
        if pair[0].id == pair[1].id {
            errors.push(ValidationError::new(
                ErrorKind::DuplicateId,
                format!("Duplicate module id '{}'", pair[1].id),
                pair[1].location.clone(),
            ));
        }
    }

    for schema in schemas {
        if !modules.iter().any(|m| m.id == schema.module_id()) {
            errors.push(ValidationError::malformed(
                format!(
                    "Schema '{}' is not part of a module, '{}' has no index.yaml",
                    schema.id,
                    schema.module_id()
                ),
                schema.location.clone(),
            ));
        }
    }
    errors
}

/// Build the model
///
/// `schemas` must be in the order their references were resolved against,
/// so handle `i` is `schemas[i]`. Modules are ordered by id and list the
/// handles of the schemas in their directory in arena order.
pub fn assemble(
    application: Application,
    mut modules: Vec<Module>,
    schemas: Vec<Schema>,
) -> Result<Model, ValidationErrors> {
    ValidationErrors(check_modules(&modules, &schemas))
        .sorted()
        .into_result()?;

    modules.sort_by(|a, b| a.id.cmp(&b.id));
    for module in &mut modules {
        module.schemas.clear();
    }
    for (position, schema) in schemas.iter().enumerate() {
        if let Some(module) = modules.iter_mut().find(|m| m.id == schema.module_id()) {
            module.schemas.push(SchemaHandle::new(position));
        }
    }

    info!(
        modules = modules.len(),
        schemas = schemas.len(),
        "Assembled model"
    );
    Ok(Model::from_parts(application, modules, schemas))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Definition, DefinitionBody, ObjectBody, paths};

    fn schema(id: &str) -> Schema {
        Schema::new(
            id,
            paths::schema_name(id),
            Definition::new(DefinitionBody::Object(ObjectBody::default())),
        )
    }

    #[test]
    fn test_modules_sorted_and_list_their_schemas() {
        let modules = vec![Module::new("/orders", "Orders"), Module::new("/customers", "Customers")];
        let schemas = vec![
            schema("/customers/Address.yaml"),
            schema("/customers/Customer.yaml"),
            schema("/orders/Order.yaml"),
        ];
        let model = assemble(Application::default(), modules, schemas).unwrap();

        let ids: Vec<&str> = model.modules().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["/customers", "/orders"]);
        assert_eq!(
            model.module("/customers").unwrap().schemas,
            vec![SchemaHandle::new(0), SchemaHandle::new(1)]
        );
        assert_eq!(model.schema_by_id("/orders/Order.yaml"), Some(SchemaHandle::new(2)));
    }

    #[test]
    fn test_schema_without_module() {
        let errors = assemble(
            Application::default(),
            vec![Module::new("/a", "A"), Module::new("/a", "A again")],
            vec![schema("/b/B.yaml")],
        )
        .unwrap_err();
        assert_eq!(errors.count(ErrorKind::DuplicateId), 1);
        assert_eq!(errors.count(ErrorKind::MalformedInput), 1);
    }
}

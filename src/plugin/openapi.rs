//! OpenAPI plugin
//!
//! Writes one OpenAPI 3.0.3 document per module. `components.schemas` holds
//! the module's schemas, their named definitions and every schema they
//! reach through `$ref`. Each module gets an `OpenApiSpec` link to its file.

use super::Plugin;
use crate::models::{
    AdditionalProperties, ArrayItems, Definition, DefinitionBody, Link, Model, Module, Primitive,
    Property, PropertyType, RefRole, RefTarget, ResolvedRef, SchemaHandle, paths,
};
use crate::storage::{self, StorageBackend};
use anyhow::Context;
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

const LINK_TEXT: &str = "OpenApiSpec";

/// Options of the OpenAPI plugin
#[derive(Debug, Clone)]
pub struct OpenApiOptions {
    /// Server URLs of every document
    pub servers: Vec<String>,
    /// Base of the module links; `./<file>` relative to the module page when unset
    pub link_path: Option<String>,
    /// `info.version` of every document
    pub version: String,
    /// Prefix component names with the module name
    pub prefix_definitions: bool,
    /// Properties left out of every component
    pub ignore_properties: Vec<String>,
}

impl Default for OpenApiOptions {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            link_path: None,
            version: "1.0.0".to_string(),
            prefix_definitions: false,
            ignore_properties: Vec::new(),
        }
    }
}

/// Plugin writing `<module>/<module>.openapi.yaml`
pub struct OpenApiPlugin<B: StorageBackend> {
    storage: B,
    output_dir: String,
    options: OpenApiOptions,
}

impl<B: StorageBackend> OpenApiPlugin<B> {
    pub fn new(storage: B, output_dir: impl Into<String>) -> Self {
        Self {
            storage,
            output_dir: output_dir.into(),
            options: OpenApiOptions::default(),
        }
    }

    pub fn with_options(mut self, options: OpenApiOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &OpenApiOptions {
        &self.options
    }

    /// The link added to a module
    pub fn module_link(&self, module: &Module) -> Link {
        let file = file_name(module);
        let href = match &self.options.link_path {
            Some(base) => format!("{}{}/{}", base.trim_end_matches('/'), module.id, file),
            None => format!("./{}", file),
        };
        Link::new(LINK_TEXT, href)
    }

    /// The OpenAPI document of a module
    pub fn specification(&self, model: &Model, module: &Module) -> Value {
        SpecBuilder {
            model,
            options: &self.options,
        }
        .build(module)
    }
}

/// `<module name>.openapi.yaml`
pub fn file_name(module: &Module) -> String {
    format!("{}.openapi.yaml", paths::schema_name(&module.id))
}

#[async_trait(?Send)]
impl<B: StorageBackend> Plugin for OpenApiPlugin<B> {
    fn name(&self) -> &str {
        "openapi"
    }

    async fn update_model(&self, model: &mut Model) -> anyhow::Result<()> {
        let links: Vec<(String, Link)> = model
            .modules()
            .iter()
            .map(|m| (m.id.clone(), self.module_link(m)))
            .collect();
        for (id, link) in links {
            if let Some(module) = model.module_mut(&id)
                && !module.links.contains(&link)
            {
                module.links.push(link);
            }
        }
        Ok(())
    }

    async fn generate_output(&self, model: &Model) -> anyhow::Result<()> {
        for module in model.modules() {
            let spec = self.specification(model, module);
            let yaml = serde_yaml::to_string(&spec)
                .with_context(|| format!("Failed to serialize the specification of {}", module.id))?;
            let path = storage::join(
                &self.output_dir,
                &format!("{}/{}", module.id, file_name(module)),
            );
            self.storage
                .write_file(&path, yaml.as_bytes())
                .await
                .with_context(|| format!("Failed to write {}", path))?;
            info!(module = %module.id, path = %path, "Wrote OpenAPI specification");
        }
        Ok(())
    }
}

struct SpecBuilder<'a> {
    model: &'a Model,
    options: &'a OpenApiOptions,
}

impl SpecBuilder<'_> {
    fn build(&self, module: &Module) -> Value {
        let mut schemas = Map::new();
        for handle in self.reachable(module) {
            let schema = self.model.schema(handle);
            let mut root = self.definition(&schema.definition);
            if let Some(object) = root.as_object_mut() {
                object.insert("title".to_string(), json!(schema.title));
                if let Some(example) = schema.examples.first() {
                    object.insert("example".to_string(), example.value.clone());
                }
            }
            schemas.insert(self.component_name(handle, None), root);
            for (name, definition) in &schema.definitions {
                schemas.insert(
                    self.component_name(handle, Some(name)),
                    self.definition(definition),
                );
            }
        }
        debug!(module = %module.id, components = schemas.len(), "Collected OpenAPI components");

        let mut info = Map::new();
        info.insert("title".to_string(), json!(module.title));
        if let Some(description) = &module.description {
            info.insert("description".to_string(), json!(description));
        }
        info.insert("version".to_string(), json!(self.options.version));

        let servers: Vec<Value> = self
            .options
            .servers
            .iter()
            .map(|url| json!({ "url": url }))
            .collect();

        json!({
            "openapi": "3.0.3",
            "info": info,
            "servers": servers,
            "paths": {},
            "components": { "schemas": schemas },
        })
    }

    /// Schemas of the module plus everything they reference, in handle order
    fn reachable(&self, module: &Module) -> BTreeSet<SchemaHandle> {
        let mut seen: BTreeSet<SchemaHandle> = module.schemas.iter().copied().collect();
        let mut pending: Vec<SchemaHandle> = module.schemas.clone();
        while let Some(handle) = pending.pop() {
            let mut targets = Vec::new();
            self.model.schema(handle).visit_refs(&mut |r: &ResolvedRef, role| {
                if role != RefRole::IdReference {
                    targets.push(r.target.schema());
                }
            });
            for target in targets {
                if seen.insert(target) {
                    pending.push(target);
                }
            }
        }
        seen
    }

    fn component_name(&self, handle: SchemaHandle, definition: Option<&str>) -> String {
        let schema = self.model.schema(handle);
        let mut name = paths::clean_name(schema.name());
        if self.options.prefix_definitions {
            name = paths::clean_name(paths::module_name(schema.module_id())) + &name;
        }
        if let Some(definition) = definition {
            // hoisted definitions already carry the schema name
            let definition = paths::clean_name(definition);
            match definition.strip_prefix(name.as_str()) {
                Some(rest) if !rest.is_empty() && !self.options.prefix_definitions => {
                    name = definition
                }
                _ => name.push_str(&definition),
            }
        }
        name
    }

    fn reference(&self, reference: &ResolvedRef) -> Value {
        match &reference.target {
            RefTarget::Schema(handle) => self.component_ref(*handle, None),
            RefTarget::Definition { schema, name } => self.component_ref(*schema, Some(name)),
            RefTarget::Property { property, .. } => {
                // inline the referenced property's type
                let ty = self
                    .model
                    .definition_of(&reference.target)
                    .and_then(|d| d.property(property))
                    .map(|p| &p.ty);
                match ty {
                    Some(PropertyType::Ref { target, .. }) if target.target.is_property() => {
                        json!({ "type": "object" })
                    }
                    Some(ty) => self.property_type(ty),
                    None => json!({ "type": "object" }),
                }
            }
        }
    }

    fn component_ref(&self, handle: SchemaHandle, definition: Option<&str>) -> Value {
        json!({ "$ref": format!("#/components/schemas/{}", self.component_name(handle, definition)) })
    }

    fn definition(&self, definition: &Definition<ResolvedRef>) -> Value {
        let mut out = Map::new();
        if let Some(title) = &definition.title {
            out.insert("title".to_string(), json!(title));
        }
        if let Some(description) = &definition.description {
            out.insert("description".to_string(), json!(description));
        }
        match &definition.body {
            DefinitionBody::Object(object) => {
                out.insert("type".to_string(), json!("object"));
                let mut properties = Map::new();
                for property in &object.properties {
                    if !self.options.ignore_properties.contains(&property.name) {
                        properties.insert(property.name.clone(), self.property(property));
                    }
                }
                out.insert("properties".to_string(), Value::Object(properties));
                if !object.required.is_empty() {
                    out.insert("required".to_string(), json!(object.required));
                }
                match &object.additional_properties {
                    AdditionalProperties::Allowed => {}
                    AdditionalProperties::Forbidden => {
                        out.insert("additionalProperties".to_string(), json!(false));
                    }
                    AdditionalProperties::Schema(values) => {
                        out.insert("additionalProperties".to_string(), self.property_type(values));
                    }
                }
                insert_u64(&mut out, "minProperties", object.min_properties);
                insert_u64(&mut out, "maxProperties", object.max_properties);
                if !object.one_of.is_empty() {
                    let members: Vec<Value> = object.one_of.iter().map(|m| self.reference(m)).collect();
                    out.insert("oneOf".to_string(), Value::Array(members));
                }
            }
            DefinitionBody::Enum(body) => {
                out.insert("type".to_string(), json!(body.ty));
                out.insert("enum".to_string(), Value::Array(body.values.clone()));
            }
            DefinitionBody::Array(items) => self.array(items, &mut out),
            DefinitionBody::Primitive(primitive) => primitive_fields(primitive, &mut out),
        }
        if let Some(discriminator) = &definition.discriminator {
            let mut value = Map::new();
            value.insert("propertyName".to_string(), json!(discriminator.property_name));
            if !discriminator.mapping.is_empty() {
                let mapping: BTreeMap<&str, Value> = discriminator
                    .mapping
                    .iter()
                    .map(|(key, target)| (key.as_str(), self.reference(target)["$ref"].clone()))
                    .collect();
                value.insert("mapping".to_string(), json!(mapping));
            }
            out.insert("discriminator".to_string(), Value::Object(value));
        }
        copy_extensions(&definition.extensions, &mut out);

        if definition.parents.is_empty() {
            return Value::Object(out);
        }
        let mut all_of: Vec<Value> = definition.parents.iter().map(|p| self.reference(p)).collect();
        let mut outer = Map::new();
        for key in ["title", "description"] {
            if let Some(value) = out.remove(key) {
                outer.insert(key.to_string(), value);
            }
        }
        all_of.push(Value::Object(out));
        outer.insert("allOf".to_string(), Value::Array(all_of));
        Value::Object(outer)
    }

    fn property(&self, property: &Property<ResolvedRef>) -> Value {
        let mut value = self.property_type(&property.ty);
        if let Some(out) = value.as_object_mut() {
            let is_ref = out.contains_key("$ref");
            if !is_ref {
                if let Some(description) = &property.description {
                    out.insert("description".to_string(), json!(description));
                }
                insert_flag(out, "nullable", property.nullable);
                insert_flag(out, "readOnly", property.read_only);
                insert_flag(out, "writeOnly", property.write_only);
                insert_flag(out, "deprecated", property.deprecated);
            }
            copy_extensions(&property.extensions, out);
        }
        value
    }

    fn property_type(&self, ty: &PropertyType<ResolvedRef>) -> Value {
        let mut out = Map::new();
        match ty {
            PropertyType::Ref { target, .. } => return self.reference(target),
            PropertyType::Array(items) => self.array(items, &mut out),
            PropertyType::Primitive(primitive) => primitive_fields(primitive, &mut out),
            PropertyType::Map { values } => {
                out.insert("type".to_string(), json!("object"));
                out.insert("additionalProperties".to_string(), self.property_type(values));
            }
            PropertyType::Object => {
                out.insert("type".to_string(), json!("object"));
            }
        }
        Value::Object(out)
    }

    fn array(&self, items: &ArrayItems<ResolvedRef>, out: &mut Map<String, Value>) {
        out.insert("type".to_string(), json!("array"));
        out.insert("items".to_string(), self.property_type(&items.items));
        insert_u64(out, "minItems", items.min_items);
        insert_u64(out, "maxItems", items.max_items);
        insert_flag(out, "uniqueItems", items.unique_items);
    }
}

fn primitive_fields(primitive: &Primitive, out: &mut Map<String, Value>) {
    let constraints = &primitive.constraints;
    out.insert("type".to_string(), json!(primitive.ty));
    if let Some(format) = &primitive.format {
        out.insert("format".to_string(), json!(format));
    }
    insert_number(out, "minimum", constraints.minimum);
    insert_number(out, "maximum", constraints.maximum);
    // 3.0 spells exclusive bounds as a flag on minimum/maximum
    if let Some(bound) = constraints.exclusive_minimum {
        insert_number(out, "minimum", Some(bound));
        out.insert("exclusiveMinimum".to_string(), json!(true));
    }
    if let Some(bound) = constraints.exclusive_maximum {
        insert_number(out, "maximum", Some(bound));
        out.insert("exclusiveMaximum".to_string(), json!(true));
    }
    insert_number(out, "multipleOf", constraints.multiple_of);
    insert_u64(out, "minLength", constraints.min_length);
    insert_u64(out, "maxLength", constraints.max_length);
    if let Some(pattern) = &constraints.pattern {
        out.insert("pattern".to_string(), json!(pattern));
    }
    if let Some(value) = &constraints.const_value {
        out.insert("enum".to_string(), json!([value]));
    } else if !constraints.enum_values.is_empty() {
        out.insert("enum".to_string(), Value::Array(constraints.enum_values.clone()));
    }
    if let Some(default) = &constraints.default {
        out.insert("default".to_string(), default.clone());
    }
}

/// Integral numbers are written without a fraction
fn insert_number(out: &mut Map<String, Value>, key: &str, value: Option<f64>) {
    let Some(value) = value else { return };
    let number = if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        json!(value as i64)
    } else {
        json!(value)
    };
    out.insert(key.to_string(), number);
}

fn insert_u64(out: &mut Map<String, Value>, key: &str, value: Option<u64>) {
    if let Some(value) = value {
        out.insert(key.to_string(), json!(value));
    }
}

fn insert_flag(out: &mut Map<String, Value>, key: &str, flag: bool) {
    if flag {
        out.insert(key.to_string(), json!(true));
    }
}

fn copy_extensions(extensions: &BTreeMap<String, Value>, out: &mut Map<String, Value>) {
    for (key, value) in extensions {
        if key.starts_with("x-") {
            out.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{ReaderConfig, SourceFile, build_model};
    use crate::storage::memory::MemoryStorageBackend;

    fn model() -> Model {
        let sources = vec![
            SourceFile::new("index.yaml", "title: Shop\n"),
            SourceFile::new("customers/index.yaml", "$id: /customers\ntitle: Customers\n"),
            SourceFile::new(
                "customers/Customer.yaml",
                "$id: /customers/Customer.yaml\ntitle: Customer\ntype: object\nrequired: [id]\nproperties:\n  id:\n    type: integer\n    minimum: 1\n  address:\n    $ref: ../shared/Address.yaml\n  status:\n    type: string\n    enum: [active, blocked]\n",
            ),
            SourceFile::new("shared/index.yaml", "$id: /shared\ntitle: Shared\n"),
            SourceFile::new(
                "shared/Address.yaml",
                "$id: /shared/Address.yaml\ntitle: Address\ntype: object\nx-schema-type: ValueObject\nproperties:\n  street:\n    type: string\n    x-db-column: street\n",
            ),
        ];
        build_model(sources, &ReaderConfig::default()).unwrap()
    }

    #[test]
    fn test_specification_collects_referenced_schemas() {
        let model = model();
        let plugin = OpenApiPlugin::new(MemoryStorageBackend::new(), "out");
        let module = model.module("/customers").unwrap();
        let spec = plugin.specification(&model, module);

        assert_eq!(spec["openapi"], "3.0.3");
        assert_eq!(spec["info"]["title"], "Customers");
        let schemas = &spec["components"]["schemas"];
        assert_eq!(schemas["Customer"]["title"], "Customer");
        assert_eq!(schemas["Customer"]["properties"]["id"]["minimum"], 1);
        assert_eq!(
            schemas["Customer"]["properties"]["address"]["$ref"],
            "#/components/schemas/Address"
        );
        assert_eq!(
            schemas["Customer"]["properties"]["status"]["$ref"],
            "#/components/schemas/CustomerStatus"
        );
        assert_eq!(schemas["CustomerStatus"]["enum"], json!(["active", "blocked"]));
        assert_eq!(schemas["Address"]["properties"]["street"]["x-db-column"], "street");
    }

    #[test]
    fn test_module_link() {
        let model = model();
        let module = model.module("/customers").unwrap();
        let plugin = OpenApiPlugin::new(MemoryStorageBackend::new(), "out");
        assert_eq!(plugin.module_link(module).href, "./customers.openapi.yaml");

        let plugin = plugin.with_options(OpenApiOptions {
            link_path: Some("https://docs.example.com/".to_string()),
            ..OpenApiOptions::default()
        });
        assert_eq!(
            plugin.module_link(module).href,
            "https://docs.example.com/customers/customers.openapi.yaml"
        );
    }

    #[tokio::test]
    async fn test_hooks_write_files_and_links() {
        let mut model = model();
        let storage = MemoryStorageBackend::new();
        let plugin = OpenApiPlugin::new(storage.clone(), "out");

        plugin.update_model(&mut model).await.unwrap();
        plugin.update_model(&mut model).await.unwrap();
        assert_eq!(model.module("/customers").unwrap().links.len(), 1);
        assert_eq!(model.module("/customers").unwrap().links[0].text, "OpenApiSpec");

        plugin.generate_output(&model).await.unwrap();
        let written = storage.get("out/customers/customers.openapi.yaml").unwrap();
        assert!(written.contains("openapi: 3.0.3"));
        assert!(written.contains("CustomerStatus:"));
        assert!(storage.get("out/shared/shared.openapi.yaml").is_some());
    }
}

//! Validation of example instances against resolved schemas

use crate::models::{
    AdditionalProperties, ArrayItems, Definition, DefinitionBody, JsonType, Primitive,
    PropertyType, RefTarget, ResolvedRef, Schema, SchemaHandle,
};
use crate::validation::formats::FormatRegistry;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeSet;

const MAX_DEPTH: usize = 64;

/// Violations of a primitive's type, format and constraints by a value
pub fn primitive_violations(
    primitive: &Primitive,
    value: &Value,
    registry: &FormatRegistry,
) -> Vec<String> {
    let mut out = Vec::new();
    if !primitive.ty.matches(value) {
        out.push(format!(
            "expected {}, got {}",
            primitive.ty,
            JsonType::describe(value)
        ));
        return out;
    }
    let c = &primitive.constraints;

    if let Some(expected) = &c.const_value
        && expected != value
    {
        out.push(format!("must be {}", expected));
    }
    if !c.enum_values.is_empty() && !c.enum_values.contains(value) {
        out.push(format!("must be one of {}", list(&c.enum_values)));
    }

    if let Some(n) = value.as_f64() {
        if let Some(min) = c.minimum
            && n < min
        {
            out.push(format!("must be >= {}", min));
        }
        if let Some(max) = c.maximum
            && n > max
        {
            out.push(format!("must be <= {}", max));
        }
        if let Some(min) = c.exclusive_minimum
            && n <= min
        {
            out.push(format!("must be > {}", min));
        }
        if let Some(max) = c.exclusive_maximum
            && n >= max
        {
            out.push(format!("must be < {}", max));
        }
        if let Some(m) = c.multiple_of
            && m > 0.0
        {
            let quotient = n / m;
            if (quotient - quotient.round()).abs() > 1e-9 {
                out.push(format!("must be a multiple of {}", m));
            }
        }
    }

    if let Some(s) = value.as_str() {
        let length = s.chars().count() as u64;
        if let Some(min) = c.min_length
            && length < min
        {
            out.push(format!("must be at least {} characters long", min));
        }
        if let Some(max) = c.max_length
            && length > max
        {
            out.push(format!("must be at most {} characters long", max));
        }
        if let Some(pattern) = &c.pattern
            && let Ok(regex) = Regex::new(pattern)
            && !regex.is_match(s)
        {
            out.push(format!("must match pattern '{}'", pattern));
        }
    }

    if let Some(format) = &primitive.format
        && registry.check(format, value) == Some(false)
    {
        out.push(format!("is not a valid '{}'", format));
    }
    out
}

fn list(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validates JSON values against schemas of a resolved schema set
///
/// Handles index into `schemas`, the same order the model arena uses.
pub struct InstanceValidator<'a> {
    schemas: &'a [Schema],
    registry: &'a FormatRegistry,
}

impl<'a> InstanceValidator<'a> {
    pub fn new(schemas: &'a [Schema], registry: &'a FormatRegistry) -> Self {
        Self { schemas, registry }
    }

    /// Violations of `value` against a schema, each prefixed with a JSON path
    pub fn validate(&self, handle: SchemaHandle, value: &Value) -> Vec<String> {
        let mut out = Vec::new();
        let schema = &self.schemas[handle.index()];
        self.definition(handle, &schema.definition, value, "$", &BTreeSet::new(), true, 0, &mut out);
        out
    }

    fn is_valid_target(&self, target: &RefTarget, value: &Value, depth: usize) -> bool {
        let mut out = Vec::new();
        self.target(target, value, "$", depth, &mut out);
        out.is_empty()
    }

    fn target(&self, target: &RefTarget, value: &Value, path: &str, depth: usize, out: &mut Vec<String>) {
        let schema = &self.schemas[target.schema().index()];
        match target {
            RefTarget::Property {
                definition,
                property,
                ..
            } => {
                let found = schema
                    .definition(definition.as_deref())
                    .and_then(|d| d.property(property));
                if let Some(property) = found {
                    if property.nullable && value.is_null() {
                        return;
                    }
                    self.property_type(target.schema(), &property.ty, value, path, depth + 1, out);
                }
            }
            _ => {
                if let Some(definition) = schema.definition(target.definition_name()) {
                    self.definition(
                        target.schema(),
                        definition,
                        value,
                        path,
                        &BTreeSet::new(),
                        true,
                        depth + 1,
                        out,
                    );
                }
            }
        }
    }

    /// Property names declared by a definition and its parents
    fn declared_names(&self, definition: &Definition, names: &mut BTreeSet<String>, depth: usize) {
        if depth > MAX_DEPTH {
            return;
        }
        for property in definition.properties() {
            names.insert(property.name.clone());
        }
        for parent in &definition.parents {
            let schema = &self.schemas[parent.target.schema().index()];
            if let Some(parent_definition) = schema.definition(parent.target.definition_name()) {
                self.declared_names(parent_definition, names, depth + 1);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn definition(
        &self,
        handle: SchemaHandle,
        definition: &Definition,
        value: &Value,
        path: &str,
        inherited: &BTreeSet<String>,
        dispatch: bool,
        depth: usize,
        out: &mut Vec<String>,
    ) {
        if depth > MAX_DEPTH {
            out.push(format!("{}: nesting is too deep", path));
            return;
        }

        if dispatch
            && let Some(discriminator) = &definition.discriminator
            && let Some(selected) = value.get(&discriminator.property_name).and_then(Value::as_str)
        {
            let schema = &self.schemas[handle.index()];
            if let Some(variant) = schema
                .variants
                .iter()
                .find(|v| v.value.as_deref() == Some(selected))
                && variant.target.schema() != handle
            {
                self.target(&variant.target, value, path, depth, out);
                return;
            }
            if !schema.variants.is_empty()
                && !schema.variants.iter().any(|v| v.value.as_deref() == Some(selected))
            {
                out.push(format!(
                    "{}.{}: unknown discriminator value '{}'",
                    path, discriminator.property_name, selected
                ));
            }
        }

        let mut allowed = inherited.clone();
        self.declared_names(definition, &mut allowed, depth);

        for parent in &definition.parents {
            let parent_schema = &self.schemas[parent.target.schema().index()];
            if let Some(parent_definition) = parent_schema.definition(parent.target.definition_name()) {
                self.definition(
                    parent.target.schema(),
                    parent_definition,
                    value,
                    path,
                    &allowed,
                    false,
                    depth + 1,
                    out,
                );
            }
        }

        match &definition.body {
            DefinitionBody::Object(object) => {
                if !object.one_of.is_empty() {
                    let matches = object
                        .one_of
                        .iter()
                        .filter(|member| self.is_valid_target(&member.target, value, depth + 1))
                        .count();
                    if matches != 1 {
                        out.push(format!(
                            "{}: must match exactly one oneOf member, matches {}",
                            path, matches
                        ));
                    }
                    if object.properties.is_empty() {
                        return;
                    }
                }

                let Some(map) = value.as_object() else {
                    out.push(format!("{}: expected object, got {}", path, JsonType::describe(value)));
                    return;
                };

                for name in &object.required {
                    if !map.contains_key(name) {
                        out.push(format!("{}: missing required property '{}'", path, name));
                    }
                }
                for property in &object.properties {
                    if let Some(item) = map.get(&property.name) {
                        if property.nullable && item.is_null() {
                            continue;
                        }
                        let child = format!("{}.{}", path, property.name);
                        self.property_type(handle, &property.ty, item, &child, depth + 1, out);
                    }
                }
                match &object.additional_properties {
                    AdditionalProperties::Allowed => {}
                    AdditionalProperties::Forbidden => {
                        for key in map.keys() {
                            if !allowed.contains(key) {
                                out.push(format!("{}: unexpected property '{}'", path, key));
                            }
                        }
                    }
                    AdditionalProperties::Schema(values) => {
                        for (key, item) in map {
                            if !allowed.contains(key) {
                                let child = format!("{}.{}", path, key);
                                self.property_type(handle, values, item, &child, depth + 1, out);
                            }
                        }
                    }
                }
                let count = map.len() as u64;
                if let Some(min) = object.min_properties
                    && count < min
                {
                    out.push(format!("{}: must have at least {} properties", path, min));
                }
                if let Some(max) = object.max_properties
                    && count > max
                {
                    out.push(format!("{}: must have at most {} properties", path, max));
                }
            }
            DefinitionBody::Enum(body) => {
                if !body.values.contains(value) {
                    out.push(format!("{}: must be one of {}", path, list(&body.values)));
                }
            }
            DefinitionBody::Array(items) => self.array(handle, items, value, path, depth, out),
            DefinitionBody::Primitive(primitive) => {
                for message in primitive_violations(primitive, value, self.registry) {
                    out.push(format!("{}: {}", path, message));
                }
            }
        }
    }

    fn array(
        &self,
        handle: SchemaHandle,
        items: &ArrayItems<ResolvedRef>,
        value: &Value,
        path: &str,
        depth: usize,
        out: &mut Vec<String>,
    ) {
        let Some(values) = value.as_array() else {
            out.push(format!("{}: expected array, got {}", path, JsonType::describe(value)));
            return;
        };
        let count = values.len() as u64;
        if let Some(min) = items.min_items
            && count < min
        {
            out.push(format!("{}: must have at least {} items", path, min));
        }
        if let Some(max) = items.max_items
            && count > max
        {
            out.push(format!("{}: must have at most {} items", path, max));
        }
        if items.unique_items {
            for (i, item) in values.iter().enumerate() {
                if values[..i].contains(item) {
                    out.push(format!("{}[{}]: duplicate item", path, i));
                }
            }
        }
        for (i, item) in values.iter().enumerate() {
            let child = format!("{}[{}]", path, i);
            self.property_type(handle, &items.items, item, &child, depth + 1, out);
        }
    }

    fn property_type(
        &self,
        handle: SchemaHandle,
        ty: &PropertyType<ResolvedRef>,
        value: &Value,
        path: &str,
        depth: usize,
        out: &mut Vec<String>,
    ) {
        if depth > MAX_DEPTH {
            out.push(format!("{}: nesting is too deep", path));
            return;
        }
        match ty {
            PropertyType::Ref { target, .. } => self.target(&target.target, value, path, depth, out),
            PropertyType::Array(items) => self.array(handle, items, value, path, depth, out),
            PropertyType::Primitive(primitive) => {
                for message in primitive_violations(primitive, value, self.registry) {
                    out.push(format!("{}: {}", path, message));
                }
            }
            PropertyType::Map { values } => {
                let Some(map) = value.as_object() else {
                    out.push(format!("{}: expected object, got {}", path, JsonType::describe(value)));
                    return;
                };
                for (key, item) in map {
                    let child = format!("{}.{}", path, key);
                    self.property_type(handle, values, item, &child, depth + 1, out);
                }
            }
            PropertyType::Object => {
                if !value.is_object() {
                    out.push(format!("{}: expected object, got {}", path, JsonType::describe(value)));
                }
            }
        }
    }
}

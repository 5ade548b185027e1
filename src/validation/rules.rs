//! Structural and reference rules for schemas

use crate::models::{
    AdditionalProperties, ArrayItems, Definition, DefinitionBody, EnumBody, JsonType, Primitive,
    Property, PropertyType, RefTarget, ResolvedRef, Schema, SchemaHandle, SourceLocation,
};
use crate::validation::error::ValidationError;
use crate::validation::formats::{FormatRegistry, KeywordContext};
use crate::validation::instance::{InstanceValidator, primitive_violations};
use crate::validation::suggest;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Checks schemas against structural rules and registered formats/keywords
pub struct Validator<'a> {
    registry: &'a FormatRegistry,
}

/// Where in a schema a check runs, used for messages
struct Subject<'s> {
    schema_id: &'s str,
    definition: Option<&'s str>,
    property: Option<&'s str>,
}

impl Subject<'_> {
    fn describe(&self) -> String {
        let mut out = format!("schema '{}'", self.schema_id);
        if let Some(definition) = self.definition {
            out.push_str(&format!(", definition '{}'", definition));
        }
        if let Some(property) = self.property {
            out.push_str(&format!(", property '{}'", property));
        }
        out
    }
}

fn bounds<T: PartialOrd + std::fmt::Display>(
    min: Option<T>,
    max: Option<T>,
    what: &str,
    subject: &Subject<'_>,
    location: &SourceLocation,
    out: &mut Vec<ValidationError>,
) {
    if let (Some(min), Some(max)) = (min, max)
        && min > max
    {
        out.push(ValidationError::constraint(
            format!(
                "Minimum {} {} is greater than maximum {} in {}",
                what,
                min,
                max,
                subject.describe()
            ),
            location.clone(),
        ));
    }
}

impl<'a> Validator<'a> {
    pub fn new(registry: &'a FormatRegistry) -> Self {
        Self { registry }
    }

    /// Structural checks on one schema; runs on parsed or resolved trees
    pub fn check_structure<R>(&self, schema: &Schema<R>) -> Vec<ValidationError> {
        let mut out = Vec::new();
        for (name, definition) in schema.all_definitions() {
            let subject = Subject {
                schema_id: &schema.id,
                definition: name,
                property: None,
            };
            self.check_definition(definition, &subject, &mut out);
        }
        out
    }

    fn check_definition<R>(
        &self,
        definition: &Definition<R>,
        subject: &Subject<'_>,
        out: &mut Vec<ValidationError>,
    ) {
        let location = &definition.location;
        self.check_keywords(&definition.extensions, subject, location, out);

        match &definition.body {
            DefinitionBody::Object(object) => {
                if object.one_of.is_empty() && definition.parents.is_empty() {
                    for name in &object.required {
                        if object.property(name).is_none() {
                            out.push(ValidationError::constraint(
                                format!(
                                    "Required property '{}' is not declared in {}",
                                    name,
                                    subject.describe()
                                ),
                                location.clone(),
                            ));
                        }
                    }
                }
                bounds(
                    object.min_properties,
                    object.max_properties,
                    "properties",
                    subject,
                    location,
                    out,
                );
                for property in &object.properties {
                    let property_subject = Subject {
                        schema_id: subject.schema_id,
                        definition: subject.definition,
                        property: Some(&property.name),
                    };
                    self.check_property(property, &property_subject, out);
                }
                if let AdditionalProperties::Schema(values) = &object.additional_properties {
                    self.check_type(values, subject, location, out);
                }
            }
            DefinitionBody::Enum(body) => self.check_enum(body, subject, location, out),
            DefinitionBody::Array(items) => self.check_items(items, subject, location, out),
            DefinitionBody::Primitive(primitive) => {
                self.check_primitive(primitive, subject, location, out)
            }
        }
    }

    fn check_property<R>(
        &self,
        property: &Property<R>,
        subject: &Subject<'_>,
        out: &mut Vec<ValidationError>,
    ) {
        self.check_keywords(&property.extensions, subject, &property.location, out);
        self.check_type(&property.ty, subject, &property.location, out);
    }

    fn check_type<R>(
        &self,
        ty: &PropertyType<R>,
        subject: &Subject<'_>,
        location: &SourceLocation,
        out: &mut Vec<ValidationError>,
    ) {
        match ty {
            PropertyType::Primitive(primitive) => {
                self.check_primitive(primitive, subject, location, out)
            }
            PropertyType::Array(items) => self.check_items(items, subject, location, out),
            PropertyType::Map { values } => self.check_type(values, subject, location, out),
            PropertyType::Ref { .. } | PropertyType::Object => {}
        }
    }

    fn check_items<R>(
        &self,
        items: &ArrayItems<R>,
        subject: &Subject<'_>,
        location: &SourceLocation,
        out: &mut Vec<ValidationError>,
    ) {
        bounds(items.min_items, items.max_items, "items", subject, location, out);
        self.check_type(&items.items, subject, location, out);
    }

    fn check_primitive(
        &self,
        primitive: &Primitive,
        subject: &Subject<'_>,
        location: &SourceLocation,
        out: &mut Vec<ValidationError>,
    ) {
        let c = &primitive.constraints;
        bounds(c.minimum, c.maximum, "value", subject, location, out);
        bounds(c.exclusive_minimum, c.exclusive_maximum, "exclusive value", subject, location, out);
        bounds(c.min_length, c.max_length, "length", subject, location, out);

        if let Some(multiple_of) = c.multiple_of
            && multiple_of <= 0.0
        {
            out.push(ValidationError::constraint(
                format!("multipleOf must be greater than 0 in {}", subject.describe()),
                location.clone(),
            ));
        }
        if let Some(pattern) = &c.pattern
            && let Err(e) = Regex::new(pattern)
        {
            out.push(ValidationError::constraint(
                format!("Invalid pattern '{}' in {}: {}", pattern, subject.describe(), e),
                location.clone(),
            ));
        }
        if let Some(format) = &primitive.format
            && !self.registry.contains(format)
        {
            let mut error = ValidationError::constraint(
                format!("Unknown format '{}' in {}", format, subject.describe()),
                location.clone(),
            );
            if let Some(suggestion) = suggest::closest(format, self.registry.names(), 3) {
                error = error.with_suggestion(suggestion);
            }
            out.push(error);
        }

        if !c.enum_values.is_empty() {
            self.check_unique(&c.enum_values, subject, location, out);
        }

        // Literal values are checked against the type without the literal itself
        let mut bare = primitive.clone();
        bare.constraints.enum_values.clear();
        bare.constraints.const_value = None;
        let literals = c
            .const_value
            .iter()
            .map(|v| ("const", v))
            .chain(c.default.iter().map(|v| ("default", v)))
            .chain(c.enum_values.iter().map(|v| ("enum", v)));
        for (what, value) in literals {
            for message in primitive_violations(&bare, value, self.registry) {
                out.push(ValidationError::constraint(
                    format!("Invalid {} value {} in {}: {}", what, value, subject.describe(), message),
                    location.clone(),
                ));
            }
        }
        if let Some(default) = &c.default
            && !c.enum_values.is_empty()
            && !c.enum_values.contains(default)
        {
            out.push(ValidationError::constraint(
                format!(
                    "Default value {} is not one of the enum values in {}",
                    default,
                    subject.describe()
                ),
                location.clone(),
            ));
        }
    }

    fn check_unique(
        &self,
        values: &[Value],
        subject: &Subject<'_>,
        location: &SourceLocation,
        out: &mut Vec<ValidationError>,
    ) {
        for (i, value) in values.iter().enumerate() {
            if values[..i].contains(value) {
                out.push(ValidationError::constraint(
                    format!("Duplicate enum value {} in {}", value, subject.describe()),
                    location.clone(),
                ));
            }
        }
    }

    fn check_enum(
        &self,
        body: &EnumBody,
        subject: &Subject<'_>,
        location: &SourceLocation,
        out: &mut Vec<ValidationError>,
    ) {
        if body.values.is_empty() {
            out.push(ValidationError::constraint(
                format!("Enum without values in {}", subject.describe()),
                location.clone(),
            ));
            return;
        }
        self.check_unique(&body.values, subject, location, out);

        for value in &body.values {
            if !body.ty.matches(value) {
                out.push(ValidationError::constraint(
                    format!(
                        "Enum value {} is not of type {} in {}",
                        value,
                        body.ty,
                        subject.describe()
                    ),
                    location.clone(),
                ));
            }
        }

        if body.descriptions.is_empty() {
            return;
        }
        let keys: Vec<String> = body
            .values
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        for key in &keys {
            if !body.descriptions.contains_key(key) {
                out.push(ValidationError::constraint(
                    format!(
                        "Enum value '{}' has no x-enum-description in {}",
                        key,
                        subject.describe()
                    ),
                    location.clone(),
                ));
            }
        }
        for key in body.descriptions.keys() {
            if !keys.contains(key) {
                out.push(ValidationError::constraint(
                    format!(
                        "x-enum-description '{}' is not an enum value in {}",
                        key,
                        subject.describe()
                    ),
                    location.clone(),
                ));
            }
        }
    }

    fn check_keywords(
        &self,
        extensions: &BTreeMap<String, Value>,
        subject: &Subject<'_>,
        location: &SourceLocation,
        out: &mut Vec<ValidationError>,
    ) {
        for (keyword, value) in extensions {
            let Some(handler) = self.registry.keyword(keyword) else {
                continue;
            };
            let context = KeywordContext {
                schema_id: subject.schema_id.to_string(),
                keyword: keyword.clone(),
                location: location.clone(),
            };
            if let Err(message) = handler(&context, value) {
                out.push(ValidationError::constraint(
                    format!("Invalid '{}' in {}: {}", keyword, subject.describe(), message),
                    location.clone(),
                ));
            }
        }
    }

    /// Reference and example checks on the resolved schema set
    pub fn validate(&self, schemas: &[Schema<ResolvedRef>]) -> Vec<ValidationError> {
        let mut out = Vec::new();
        let instances = InstanceValidator::new(schemas, self.registry);

        for (index, schema) in schemas.iter().enumerate() {
            for (name, definition) in schema.all_definitions() {
                for property in definition.properties() {
                    let subject = Subject {
                        schema_id: &schema.id,
                        definition: name,
                        property: Some(&property.name),
                    };
                    self.check_reference_type(schemas, property, &subject, &mut out);
                    self.check_id_references(property, &subject, &mut out);
                }
            }

            let handle = SchemaHandle::new(index);
            for (i, example) in schema.examples.iter().enumerate() {
                for message in instances.validate(handle, &example.value) {
                    out.push(ValidationError::constraint(
                        format!("Invalid example [{}] in schema '{}': {}", i, schema.id, message),
                        example.location.clone(),
                    ));
                }
            }
            if schema.examples.is_empty() && schema.schema_type.expects_examples() {
                warn!(
                    schema = %schema.id,
                    schema_type = %schema.schema_type,
                    "Schema has no examples"
                );
            }
        }
        out
    }

    fn check_reference_type(
        &self,
        schemas: &[Schema<ResolvedRef>],
        property: &Property<ResolvedRef>,
        subject: &Subject<'_>,
        out: &mut Vec<ValidationError>,
    ) {
        let PropertyType::Ref {
            target,
            declared: Some(declared),
        } = &property.ty
        else {
            return;
        };
        let Some(actual) = target_type(schemas, &target.target) else {
            return;
        };
        let compatible = *declared == actual
            || (*declared == JsonType::Number && actual == JsonType::Integer);
        if !compatible {
            out.push(ValidationError::constraint(
                format!(
                    "{} declares type {} but '{}' is of type {}",
                    capitalize(&subject.describe()),
                    declared,
                    target.text,
                    actual
                ),
                property.location.clone(),
            ));
        }
    }

    fn check_id_references(
        &self,
        property: &Property<ResolvedRef>,
        subject: &Subject<'_>,
        out: &mut Vec<ValidationError>,
    ) {
        if property.references.is_empty() {
            return;
        }
        let on_primitive = match &property.ty {
            PropertyType::Primitive(_) => true,
            PropertyType::Array(items) => matches!(*items.items, PropertyType::Primitive(_)),
            _ => false,
        };
        if !on_primitive {
            out.push(ValidationError::constraint(
                format!(
                    "x-references is only allowed on primitive properties or arrays of primitives in {}",
                    subject.describe()
                ),
                property.location.clone(),
            ));
        }
        for reference in &property.references {
            if reference.target.is_property() {
                out.push(ValidationError::constraint(
                    format!(
                        "x-references '{}' must point to a schema or definition in {}",
                        reference.text,
                        subject.describe()
                    ),
                    property.location.clone(),
                ));
            }
        }
    }
}

/// JSON type of whatever a resolved reference points at
fn target_type(schemas: &[Schema<ResolvedRef>], target: &RefTarget) -> Option<JsonType> {
    let schema = schemas.get(target.schema().index())?;
    match target {
        RefTarget::Property {
            definition,
            property,
            ..
        } => {
            let property = schema.definition(definition.as_deref())?.property(property)?;
            match &property.ty {
                PropertyType::Primitive(primitive) => Some(primitive.ty),
                PropertyType::Array(_) => Some(JsonType::Array),
                PropertyType::Map { .. } | PropertyType::Object => Some(JsonType::Object),
                PropertyType::Ref { .. } => None,
            }
        }
        _ => schema
            .definition(target.definition_name())
            .map(Definition::json_type),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

//! Schema parser: located documents to `Schema<RawRef>` trees
//!
//! Parsing fails fast on the first malformed node. Inline objects, enums and
//! `oneOf`s of properties are hoisted into named definitions so every
//! non-basic type is reachable by name.

use super::config::ReaderConfig;
use super::source::{Entry, Node, NodeValue};
use crate::models::{
    AdditionalProperties, Application, ArrayItems, Constraints, Definition, DefinitionBody,
    Discriminator, EnumBody, Example, ImplementationError, JsonType, Link, Module, ObjectBody,
    Primitive, Property, PropertyType, RawRef, Schema, SchemaType, Tag, paths,
};
use crate::validation::{ValidationError, suggest};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

type ParseResult<T> = Result<T, ValidationError>;

/// JSON-Schema keywords accepted anywhere in a schema
const BASE_KEYWORDS: &[&str] = &[
    "$schema", "$ref", "$comment", "$defs", "definitions", "title", "description", "default",
    "examples", "readOnly", "writeOnly", "deprecated", "type", "enum", "const", "multipleOf",
    "maximum", "exclusiveMaximum", "minimum", "exclusiveMinimum", "maxLength", "minLength",
    "pattern", "items", "additionalItems", "maxItems", "minItems", "uniqueItems", "contains",
    "maxProperties", "minProperties", "required", "properties", "patternProperties",
    "additionalProperties", "dependencies", "propertyNames", "if", "then", "else", "allOf",
    "anyOf", "oneOf", "not", "format", "contentMediaType", "contentEncoding",
];

/// Base keywords kept verbatim as extension values
const UNMODELED_KEYWORDS: &[&str] = &[
    "$schema", "$comment", "contains", "additionalItems", "patternProperties", "dependencies",
    "propertyNames", "if", "then", "else", "anyOf", "not",
];

/// Keywords only valid on the schema root
const ROOT_KEYWORDS: &[&str] = &[
    "$id", "discriminator", "x-schema-type", "x-todos", "x-links", "x-errors", "x-tags",
];

/// Extensions interpreted by the parser
const KNOWN_EXTENSIONS: &[&str] = &[
    "x-schema-type", "x-todos", "x-links", "x-errors", "x-tags", "x-references",
    "x-enum-description",
];

const TYPE_NAMES: &[&str] = &["string", "integer", "number", "boolean", "null", "object", "array"];

const APPLICATION_KEYS: &[&str] = &["title", "description", "todos", "links", "errors", "tags"];

const MODULE_KEYS: &[&str] = &["$id", "title", "description", "todos", "links", "errors", "tags"];

fn malformed(message: impl Into<String>, node: &Node) -> ValidationError {
    ValidationError::malformed(message, node.location.clone())
}

fn string(node: &Node, what: &str) -> ParseResult<String> {
    node.as_str()
        .map(str::to_string)
        .ok_or_else(|| malformed(format!("'{}' must be a string, found {}", what, node.kind_name()), node))
}

fn opt_string(node: &Node, key: &str) -> ParseResult<Option<String>> {
    node.get(key).map(|n| string(n, key)).transpose()
}

fn flag(node: &Node, key: &str) -> ParseResult<bool> {
    match node.get(key) {
        None => Ok(false),
        Some(n) => n
            .as_bool()
            .ok_or_else(|| malformed(format!("'{}' must be a boolean", key), n)),
    }
}

fn number(node: &Node, key: &str) -> ParseResult<Option<f64>> {
    node.get(key)
        .map(|n| {
            n.as_f64()
                .ok_or_else(|| malformed(format!("'{}' must be a number", key), n))
        })
        .transpose()
}

fn count(node: &Node, key: &str) -> ParseResult<Option<u64>> {
    node.get(key)
        .map(|n| {
            n.as_u64()
                .ok_or_else(|| malformed(format!("'{}' must be a non-negative integer", key), n))
        })
        .transpose()
}

fn sequence<'n>(node: &'n Node, what: &str) -> ParseResult<&'n [Node]> {
    node.as_sequence()
        .ok_or_else(|| malformed(format!("'{}' must be a list, found {}", what, node.kind_name()), node))
}

fn mapping<'n>(node: &'n Node, what: &str) -> ParseResult<&'n [Entry]> {
    if node.is_mapping() {
        Ok(node.entries())
    } else {
        Err(malformed(
            format!("'{}' must be a mapping, found {}", what, node.kind_name()),
            node,
        ))
    }
}

fn strings(node: &Node, what: &str) -> ParseResult<Vec<String>> {
    sequence(node, what)?
        .iter()
        .map(|n| string(n, what))
        .collect()
}

fn decode<T: DeserializeOwned>(node: &Node, what: &str) -> ParseResult<T> {
    serde_json::from_value(node.to_json())
        .map_err(|e| malformed(format!("Invalid '{}': {}", what, e), node))
}

fn unknown_key(entry: &Entry, context: &str, candidates: &[&str]) -> ValidationError {
    let error = ValidationError::malformed(
        format!("Unknown keyword '{}' in {}", entry.key, context),
        entry.key_location.clone(),
    );
    match suggest::closest(&entry.key, candidates.iter().copied(), 2) {
        Some(suggestion) => error.with_suggestion(suggestion),
        None => error,
    }
}

fn tags(node: &Node, what: &str) -> ParseResult<Vec<Tag>> {
    if node.is_mapping() {
        return Ok(node
            .entries()
            .iter()
            .map(|e| {
                let value = match e.value.to_json() {
                    Value::String(s) => s,
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                Tag::new(e.key.clone(), value)
            })
            .collect());
    }
    decode(node, what)
}

/// Todos, links, errors and tags of a document
struct Metadata {
    todos: Vec<String>,
    links: Vec<Link>,
    errors: Vec<ImplementationError>,
    tags: Vec<Tag>,
}

impl Metadata {
    fn parse(node: &Node, prefix: &str) -> ParseResult<Self> {
        let key = |name: &str| format!("{}{}", prefix, name);
        let todos_key = key("todos");
        let links_key = key("links");
        let errors_key = key("errors");
        let tags_key = key("tags");
        Ok(Self {
            todos: node
                .get(&todos_key)
                .map(|n| strings(n, &todos_key))
                .transpose()?
                .unwrap_or_default(),
            links: node
                .get(&links_key)
                .map(|n| decode(n, &links_key))
                .transpose()?
                .unwrap_or_default(),
            errors: node
                .get(&errors_key)
                .map(|n| decode(n, &errors_key))
                .transpose()?
                .unwrap_or_default(),
            tags: node
                .get(&tags_key)
                .map(|n| tags(n, &tags_key))
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

/// Parse the application document
pub fn parse_application(node: &Node) -> ParseResult<Application> {
    for entry in node.entries() {
        if !APPLICATION_KEYS.contains(&entry.key.as_str()) {
            return Err(unknown_key(entry, "application", APPLICATION_KEYS));
        }
    }
    let metadata = Metadata::parse(node, "")?;
    Ok(Application {
        title: opt_string(node, "title")?.unwrap_or_else(|| "Application".to_string()),
        description: opt_string(node, "description")?,
        todos: metadata.todos,
        links: metadata.links,
        errors: metadata.errors,
        tags: metadata.tags,
        location: node.location.clone(),
    })
}

fn check_id(node: &Node, expected_id: &str, what: &str) -> ParseResult<()> {
    match node.get("$id") {
        None => Err(malformed(
            format!("Missing '$id' in {}, expected '{}'", what, expected_id),
            node,
        )),
        Some(id_node) => {
            let id = string(id_node, "$id")?;
            if id == expected_id {
                Ok(())
            } else {
                Err(malformed(
                    format!(
                        "The $id '{}' of {} does not match its location, expected '{}'",
                        id, what, expected_id
                    ),
                    id_node,
                ))
            }
        }
    }
}

/// Parse a module document
pub fn parse_module(node: &Node, expected_id: &str) -> ParseResult<Module> {
    let context = format!("module '{}'", expected_id);
    for entry in node.entries() {
        if !MODULE_KEYS.contains(&entry.key.as_str()) {
            return Err(unknown_key(entry, &context, MODULE_KEYS));
        }
    }
    check_id(node, expected_id, &context)?;
    let metadata = Metadata::parse(node, "")?;
    let mut module = Module::new(
        expected_id,
        opt_string(node, "title")?.unwrap_or_else(|| paths::module_name(expected_id).to_string()),
    );
    module.description = opt_string(node, "description")?;
    module.todos = metadata.todos;
    module.links = metadata.links;
    module.errors = metadata.errors;
    module.tags = metadata.tags;
    module.location = node.location.clone();
    Ok(module)
}

/// Parse a schema document
pub fn parse_schema(
    node: &Node,
    expected_id: &str,
    config: &ReaderConfig,
) -> ParseResult<Schema<RawRef>> {
    let mut parser = SchemaParser {
        config,
        id: expected_id.to_string(),
        definitions: BTreeMap::new(),
        taken: BTreeSet::new(),
    };
    parser.parse(node)
}

struct SchemaParser<'a> {
    config: &'a ReaderConfig,
    id: String,
    definitions: BTreeMap<String, Definition<RawRef>>,
    taken: BTreeSet<String>,
}

impl SchemaParser<'_> {
    fn context(&self) -> String {
        format!("schema '{}'", self.id)
    }

    fn parse(&mut self, node: &Node) -> ParseResult<Schema<RawRef>> {
        check_id(node, &self.id.clone(), &self.context())?;
        self.check_keywords(node, true)?;

        let title = match node.get("title") {
            Some(n) => string(n, "title")?,
            None => paths::schema_name(&self.id).to_string(),
        };

        // Explicit definition names take precedence over hoisted ones
        let mut explicit: Vec<&Entry> = Vec::new();
        for key in ["definitions", "$defs"] {
            if let Some(definitions) = node.get(key) {
                for entry in mapping(definitions, key)? {
                    if !self.taken.insert(entry.key.clone()) {
                        return Err(ValidationError::malformed(
                            format!("Duplicate definition '{}' in {}", entry.key, self.context()),
                            entry.key_location.clone(),
                        ));
                    }
                    explicit.push(entry);
                }
            }
        }

        let mut root_name = paths::clean_name(&title);
        if root_name.is_empty() {
            root_name = paths::clean_name(paths::schema_name(&self.id));
        }
        let mut definition = self.definition(node, &root_name, true)?;
        definition.discriminator = self.discriminator(node)?;

        for entry in explicit {
            let parsed = self.definition(&entry.value, &entry.key, false)?;
            self.definitions.insert(entry.key.clone(), parsed);
        }

        let metadata = Metadata::parse(node, "x-")?;
        let mut schema = Schema::new(self.id.clone(), title, definition);
        schema.definitions = std::mem::take(&mut self.definitions);
        schema.schema_type = match node.get("x-schema-type") {
            Some(n) => string(n, "x-schema-type")?
                .parse::<SchemaType>()
                .map_err(|e| malformed(e, n))?,
            None => SchemaType::default(),
        };
        if let Some(examples) = node.get("examples") {
            schema.examples = sequence(examples, "examples")?
                .iter()
                .map(|e| Example {
                    value: e.to_json(),
                    location: e.location.clone(),
                })
                .collect();
        }
        schema.todos = metadata.todos;
        schema.links = metadata.links;
        schema.errors = metadata.errors;
        schema.tags = metadata.tags;
        schema.location = node.location.clone();
        Ok(schema)
    }

    fn check_keywords(&self, node: &Node, is_root: bool) -> ParseResult<()> {
        for entry in node.entries() {
            let key = entry.key.as_str();
            if ROOT_KEYWORDS.contains(&key) {
                if is_root {
                    continue;
                }
                return Err(ValidationError::malformed(
                    format!("Keyword '{}' is only allowed on the root of {}", key, self.context()),
                    entry.key_location.clone(),
                ));
            }
            if BASE_KEYWORDS.contains(&key) || key.starts_with("x-") || self.config.is_keyword_allowed(key) {
                continue;
            }
            let mut candidates: Vec<&str> = BASE_KEYWORDS.to_vec();
            candidates.extend(ROOT_KEYWORDS);
            candidates.extend(self.config.allowed_keywords.iter().map(String::as_str));
            candidates.extend(self.config.formats.keyword_names());
            return Err(unknown_key(entry, &self.context(), &candidates));
        }
        Ok(())
    }

    /// Extension values: unknown `x-*`, allowed custom keywords, unmodeled base keywords
    fn extensions(&self, node: &Node) -> BTreeMap<String, Value> {
        node.entries()
            .iter()
            .filter(|e| {
                let key = e.key.as_str();
                if key.starts_with("x-") {
                    !KNOWN_EXTENSIONS.contains(&key)
                } else {
                    UNMODELED_KEYWORDS.contains(&key)
                        || (!BASE_KEYWORDS.contains(&key) && !ROOT_KEYWORDS.contains(&key))
                }
            })
            .map(|e| (e.key.clone(), e.value.to_json()))
            .collect()
    }

    fn json_type(&self, name: &str, node: &Node) -> ParseResult<JsonType> {
        name.parse::<JsonType>().map_err(|_| {
            let error = malformed(format!("Unknown type '{}' in {}", name, self.context()), node);
            match suggest::closest(name, TYPE_NAMES.iter().copied(), 2) {
                Some(suggestion) => error.with_suggestion(suggestion),
                None => error,
            }
        })
    }

    /// Declared type and nullability (`type: [T, "null"]`)
    fn type_of(&self, node: &Node) -> ParseResult<(Option<JsonType>, bool)> {
        let Some(type_node) = node.get("type") else {
            return Ok((None, false));
        };
        match &type_node.value {
            NodeValue::String(name) => Ok((Some(self.json_type(name, type_node)?), false)),
            NodeValue::Sequence(items) => {
                let mut nullable = false;
                let mut types = Vec::new();
                for item in items {
                    let ty = self.json_type(&string(item, "type")?, item)?;
                    if ty == JsonType::Null {
                        nullable = true;
                    } else if !types.contains(&ty) {
                        types.push(ty);
                    }
                }
                match types.as_slice() {
                    [] => Ok((Some(JsonType::Null), false)),
                    [ty] => Ok((Some(*ty), nullable)),
                    _ => Err(malformed(
                        format!("Multiple types are not supported in {}", self.context()),
                        type_node,
                    )),
                }
            }
            _ => Err(malformed("'type' must be a string or a list of strings", type_node)),
        }
    }

    fn raw_ref(&self, node: &Node) -> ParseResult<RawRef> {
        let text = string(node, "$ref")?;
        if text.is_empty() {
            return Err(malformed("Empty reference", node));
        }
        Ok(RawRef::new(text, node.location.clone()))
    }

    fn id_references(&self, node: &Node) -> ParseResult<Vec<RawRef>> {
        match node.get("x-references") {
            None => Ok(Vec::new()),
            Some(n) if n.as_str().is_some() => Ok(vec![self.raw_ref(n)?]),
            Some(n) => sequence(n, "x-references")?
                .iter()
                .map(|r| self.raw_ref(r))
                .collect(),
        }
    }

    fn unique_name(&self, base: &str) -> String {
        let base = if base.is_empty() { "Type" } else { base };
        if !self.taken.contains(base) {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{}{}", base, n))
            .find(|candidate| !self.taken.contains(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    /// Move an inline type into a named definition and reference it
    fn hoist(&mut self, base: &str, node: &Node) -> ParseResult<RawRef> {
        let name = self.unique_name(base);
        self.taken.insert(name.clone());
        let definition = self.definition(node, &name, false)?;
        self.definitions.insert(name.clone(), definition);
        Ok(RawRef::new(format!("#/definitions/{}", name), node.location.clone()))
    }

    fn definition(&mut self, node: &Node, name: &str, is_root: bool) -> ParseResult<Definition<RawRef>> {
        if !node.is_mapping() {
            return Err(malformed(
                format!("Definition '{}' in {} must be a mapping", name, self.context()),
                node,
            ));
        }
        if !is_root {
            self.check_keywords(node, false)?;
            if let Some(nested) = node.entry("definitions").or_else(|| node.entry("$defs")) {
                return Err(ValidationError::malformed(
                    format!("Nested definitions are not supported in {}", self.context()),
                    nested.key_location.clone(),
                ));
            }
        }

        let (ty, _) = self.type_of(node)?;

        let mut parents = Vec::new();
        let mut merged: Vec<&Node> = Vec::new();
        if let Some(reference) = node.get("$ref") {
            parents.push(self.raw_ref(reference)?);
        }
        if let Some(all_of) = node.get("allOf") {
            for member in sequence(all_of, "allOf")? {
                if let Some(reference) = member.get("$ref") {
                    parents.push(self.raw_ref(reference)?);
                } else if member.is_mapping() {
                    self.check_keywords(member, false)?;
                    merged.push(member);
                } else {
                    return Err(malformed("'allOf' members must be mappings", member));
                }
            }
        }

        let body = if let Some(one_of) = node.get("oneOf") {
            if node.get("enum").is_some() {
                return Err(malformed(
                    format!("Definition '{}' in {} is an interface and an enum", name, self.context()),
                    node,
                ));
            }
            if node.get("properties").is_some() {
                return Err(malformed(
                    format!("Definition '{}' in {} is an interface and an object", name, self.context()),
                    node,
                ));
            }
            let mut members = Vec::new();
            for (index, member) in sequence(one_of, "oneOf")?.iter().enumerate() {
                match member.get("$ref") {
                    Some(reference) => members.push(self.raw_ref(reference)?),
                    None => members.push(self.hoist(&format!("OneOf{}{}", name, index + 1), member)?),
                }
            }
            DefinitionBody::Object(ObjectBody {
                one_of: members,
                ..ObjectBody::default()
            })
        } else if let Some(values) = node.get("enum") {
            if node.get("properties").is_some() {
                return Err(malformed(
                    format!("Definition '{}' in {} is an enum and an object", name, self.context()),
                    node,
                ));
            }
            DefinitionBody::Enum(self.enum_body(node, values, ty)?)
        } else if node.get("properties").is_some()
            || ty == Some(JsonType::Object)
            || (ty.is_none()
                && (!parents.is_empty()
                    || !merged.is_empty()
                    || node.get("required").is_some()
                    || node.get("additionalProperties").is_some()))
        {
            DefinitionBody::Object(self.object_body(node, &merged, name)?)
        } else if ty == Some(JsonType::Array) {
            DefinitionBody::Array(self.array_items(node, name)?)
        } else if let Some(ty) = ty {
            DefinitionBody::Primitive(self.primitive(node, ty)?)
        } else {
            return Err(malformed(
                format!(
                    "Definition '{}' in {} is not an object, interface, enum, array or typed value",
                    name,
                    self.context()
                ),
                node,
            ));
        };

        Ok(Definition {
            title: if is_root { None } else { opt_string(node, "title")? },
            description: opt_string(node, "description")?,
            body,
            discriminator: None,
            parents,
            extensions: self.extensions(node),
            location: node.location.clone(),
        })
    }

    fn enum_body(&self, node: &Node, values: &Node, ty: Option<JsonType>) -> ParseResult<EnumBody> {
        let values: Vec<Value> = sequence(values, "enum")?.iter().map(Node::to_json).collect();
        let ty = ty.unwrap_or_else(|| match values.first() {
            Some(Value::Number(n)) if n.is_i64() || n.is_u64() => JsonType::Integer,
            Some(Value::Number(_)) => JsonType::Number,
            Some(Value::Bool(_)) => JsonType::Boolean,
            _ => JsonType::String,
        });
        let mut descriptions = BTreeMap::new();
        if let Some(described) = node.get("x-enum-description") {
            for entry in mapping(described, "x-enum-description")? {
                descriptions.insert(entry.key.clone(), string(&entry.value, "x-enum-description")?);
            }
        }
        Ok(EnumBody {
            ty,
            values,
            descriptions,
        })
    }

    fn object_body(&mut self, node: &Node, merged: &[&Node], name: &str) -> ParseResult<ObjectBody<RawRef>> {
        let mut body = ObjectBody::default();
        for source in std::iter::once(node).chain(merged.iter().copied()) {
            if let Some(properties) = source.get("properties") {
                for entry in mapping(properties, "properties")? {
                    if body.property(&entry.key).is_some() {
                        return Err(ValidationError::malformed(
                            format!("Duplicate property '{}' in {}", entry.key, self.context()),
                            entry.key_location.clone(),
                        ));
                    }
                    let property = self.property(entry, name)?;
                    body.properties.push(property);
                }
            }
            if let Some(required) = source.get("required") {
                for name in strings(required, "required")? {
                    if !body.required.contains(&name) {
                        body.required.push(name);
                    }
                }
            }
        }

        body.additional_properties = match node.get("additionalProperties") {
            None => AdditionalProperties::Allowed,
            Some(n) => match &n.value {
                NodeValue::Bool(true) => AdditionalProperties::Allowed,
                NodeValue::Bool(false) => AdditionalProperties::Forbidden,
                NodeValue::Mapping(_) => {
                    self.check_keywords(n, false)?;
                    let (ty, _) = self.property_type(n, &format!("{}Value", name))?;
                    AdditionalProperties::Schema(Box::new(ty))
                }
                _ => {
                    return Err(malformed("'additionalProperties' must be a boolean or a mapping", n));
                }
            },
        };
        body.min_properties = count(node, "minProperties")?;
        body.max_properties = count(node, "maxProperties")?;
        Ok(body)
    }

    fn property(&mut self, entry: &Entry, scope: &str) -> ParseResult<Property<RawRef>> {
        let node = &entry.value;
        if !node.is_mapping() {
            return Err(malformed(
                format!("Property '{}' in {} must be a mapping", entry.key, self.context()),
                node,
            ));
        }
        self.check_keywords(node, false)?;

        let hoist_name = format!("{}{}", scope, paths::clean_name(&entry.key));
        let (ty, nullable) = self.property_type(node, &hoist_name)?;

        let mut references = self.id_references(node)?;
        if let Some(items) = node.get("items")
            && items.is_mapping()
        {
            references.extend(self.id_references(items)?);
        }

        Ok(Property {
            name: entry.key.clone(),
            description: opt_string(node, "description")?,
            ty,
            nullable,
            read_only: flag(node, "readOnly")?,
            write_only: flag(node, "writeOnly")?,
            deprecated: flag(node, "deprecated")?,
            references,
            extensions: self.extensions(node),
            location: entry.key_location.clone(),
        })
    }

    fn property_type(&mut self, node: &Node, hoist_name: &str) -> ParseResult<(PropertyType<RawRef>, bool)> {
        let (ty, nullable) = self.type_of(node)?;

        if let Some(reference) = node.get("$ref").or_else(|| wrapped_ref(node)) {
            let declared = ty.filter(|t| *t != JsonType::Null);
            return Ok((
                PropertyType::Ref {
                    target: self.raw_ref(reference)?,
                    declared,
                },
                nullable,
            ));
        }

        let inline = ["properties", "oneOf", "enum", "allOf"]
            .iter()
            .any(|k| node.get(k).is_some());
        if inline {
            let target = self.hoist(hoist_name, node)?;
            return Ok((
                PropertyType::Ref {
                    target,
                    declared: None,
                },
                nullable,
            ));
        }

        let ty = match ty {
            Some(ty) => ty,
            None => match node.get("const") {
                Some(constant) => match constant.value {
                    NodeValue::String(_) => JsonType::String,
                    NodeValue::Integer(_) => JsonType::Integer,
                    NodeValue::Float(_) => JsonType::Number,
                    NodeValue::Bool(_) => JsonType::Boolean,
                    _ => return Err(malformed("'const' without 'type' must be a scalar", constant)),
                },
                None => {
                    return Err(malformed(
                        format!("Type '{}' in {} has neither 'type' nor '$ref'", hoist_name, self.context()),
                        node,
                    ));
                }
            },
        };

        let property_type = match ty {
            JsonType::Array => PropertyType::Array(self.array_items(node, hoist_name)?),
            JsonType::Object => match node.get("additionalProperties") {
                Some(values) if values.is_mapping() => {
                    self.check_keywords(values, false)?;
                    let (values, _) = self.property_type(values, &format!("{}Value", hoist_name))?;
                    PropertyType::Map {
                        values: Box::new(values),
                    }
                }
                _ => PropertyType::Object,
            },
            ty => PropertyType::Primitive(self.primitive(node, ty)?),
        };
        Ok((property_type, nullable))
    }

    fn array_items(&mut self, node: &Node, hoist_name: &str) -> ParseResult<ArrayItems<RawRef>> {
        let items = node.get("items").ok_or_else(|| {
            malformed(
                format!("Array '{}' in {} has no 'items'", hoist_name, self.context()),
                node,
            )
        })?;
        if !items.is_mapping() {
            return Err(malformed("'items' must be a mapping", items));
        }
        self.check_keywords(items, false)?;
        let (ty, _) = self.property_type(items, hoist_name)?;
        Ok(ArrayItems {
            items: Box::new(ty),
            min_items: count(node, "minItems")?,
            max_items: count(node, "maxItems")?,
            unique_items: flag(node, "uniqueItems")?,
        })
    }

    fn primitive(&self, node: &Node, ty: JsonType) -> ParseResult<Primitive> {
        let constraints = Constraints {
            minimum: number(node, "minimum")?,
            maximum: number(node, "maximum")?,
            exclusive_minimum: number(node, "exclusiveMinimum")?,
            exclusive_maximum: number(node, "exclusiveMaximum")?,
            multiple_of: number(node, "multipleOf")?,
            min_length: count(node, "minLength")?,
            max_length: count(node, "maxLength")?,
            pattern: opt_string(node, "pattern")?,
            enum_values: Vec::new(),
            const_value: node.get("const").map(Node::to_json),
            default: node.get("default").map(Node::to_json),
            content_media_type: opt_string(node, "contentMediaType")?,
            content_encoding: opt_string(node, "contentEncoding")?,
        };
        Ok(Primitive {
            ty,
            format: opt_string(node, "format")?,
            constraints,
        })
    }

    fn discriminator(&self, node: &Node) -> ParseResult<Option<Discriminator<RawRef>>> {
        let Some(declaration) = node.get("discriminator") else {
            return Ok(None);
        };
        for entry in mapping(declaration, "discriminator")? {
            if !matches!(entry.key.as_str(), "propertyName" | "mapping") {
                return Err(unknown_key(entry, "discriminator", &["propertyName", "mapping"]));
            }
        }
        let property_name = match declaration.get("propertyName") {
            Some(n) => string(n, "propertyName")?,
            None => {
                return Err(malformed(
                    format!("The discriminator of {} has no 'propertyName'", self.context()),
                    declaration,
                ));
            }
        };
        let mut targets = BTreeMap::new();
        if let Some(declared) = declaration.get("mapping") {
            for entry in mapping(declared, "mapping")? {
                targets.insert(entry.key.clone(), self.raw_ref(&entry.value)?);
            }
        }
        Ok(Some(Discriminator {
            property_name,
            mapping: targets,
        }))
    }
}

/// The target of `allOf: [{$ref: ...}]` when there is nothing else to merge
///
/// Authors wrap a `$ref` this way to give it a description of its own.
fn wrapped_ref(node: &Node) -> Option<&Node> {
    if ["properties", "oneOf", "enum"].iter().any(|k| node.get(k).is_some()) {
        return None;
    }
    match node.get("allOf")?.as_sequence()? {
        [member] if member.entries().len() == 1 => member.get("$ref"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SchemaKind;
    use crate::reader::source::{SourceFile, parse_document};
    use crate::validation::ErrorKind;

    fn parse(text: &str) -> ParseResult<Schema<RawRef>> {
        let node = parse_document(&SourceFile::new("m/A.yaml", text)).unwrap();
        parse_schema(&node, "/m/A.yaml", &ReaderConfig::default())
    }

    #[test]
    fn test_object_schema() {
        let schema = parse(
            "$id: /m/A.yaml\ntitle: A\nx-schema-type: Aggregate\ntype: object\nrequired: [id]\nproperties:\n  id:\n    type: string\n    format: uuid\n  note:\n    type: [string, 'null']\n    maxLength: 10\n",
        )
        .unwrap();
        assert_eq!(schema.schema_type, SchemaType::Aggregate);
        assert_eq!(schema.kind(), SchemaKind::Object);
        let note = schema.definition.property("note").unwrap();
        assert!(note.nullable);
        assert_eq!(note.location.line, 10);
        let PropertyType::Primitive(primitive) = &note.ty else {
            panic!("expected primitive");
        };
        assert_eq!(primitive.constraints.max_length, Some(10));
        assert_eq!(schema.definition.property("id").unwrap().format(), Some("uuid"));
    }

    #[test]
    fn test_inline_types_are_hoisted() {
        let schema = parse(
            "$id: /m/A.yaml\ntitle: A\ntype: object\ndefinitions:\n  AStatus:\n    type: string\n    enum: [X]\nproperties:\n  status:\n    type: string\n    enum: [OPEN, CLOSED]\n  address:\n    type: object\n    properties:\n      street:\n        type: string\n",
        )
        .unwrap();
        // the explicit name wins, the hoisted enum gets a suffix
        assert!(schema.definitions.contains_key("AStatus"));
        assert!(schema.definitions.contains_key("AStatus2"));
        assert!(schema.definitions.contains_key("AAddress"));
        let PropertyType::Ref { target, .. } = &schema.definition.property("status").unwrap().ty else {
            panic!("expected reference");
        };
        assert_eq!(target.text, "#/definitions/AStatus2");
    }

    #[test]
    fn test_described_reference_is_not_hoisted() {
        let schema = parse(
            "$id: /m/A.yaml\ntitle: A\ntype: object\nproperties:\n  shape:\n    description: The outline\n    allOf:\n      - $ref: ./Base.yaml\n  framed:\n    allOf:\n      - $ref: ./Base.yaml\n      - properties:\n          frame:\n            type: string\n",
        )
        .unwrap();
        let shape = schema.definition.property("shape").unwrap();
        assert_eq!(shape.description.as_deref(), Some("The outline"));
        let PropertyType::Ref { target, .. } = &shape.ty else {
            panic!("expected reference");
        };
        assert_eq!(target.text, "./Base.yaml");
        assert!(!schema.definitions.contains_key("AShape"));
        // a real composition is still hoisted
        assert!(schema.definitions.contains_key("AFramed"));
    }

    #[test]
    fn test_unknown_keyword_with_suggestion() {
        let error = parse("$id: /m/A.yaml\ntitle: A\ntype: object\nproperties:\n  a:\n    type: string\n    maxLenght: 3\n").unwrap_err();
        assert_eq!(error.kind, ErrorKind::MalformedInput);
        assert_eq!(error.location.line, 7);
        assert_eq!(error.suggestion.as_deref(), Some("maxLength"));
    }

    #[test]
    fn test_allowed_keyword_kept_as_extension() {
        let node = parse_document(&SourceFile::new(
            "m/A.yaml",
            "$id: /m/A.yaml\ntype: object\nunit: kg\nx-owner: team\nproperties: {}\n",
        ))
        .unwrap();
        let config = ReaderConfig::default().with_allowed_keywords(["unit"]);
        let schema = parse_schema(&node, "/m/A.yaml", &config).unwrap();
        assert_eq!(schema.definition.extensions.get("unit"), Some(&Value::from("kg")));
        assert_eq!(schema.definition.extensions.get("x-owner"), Some(&Value::from("team")));
        assert_eq!(schema.title, "A");
    }

    #[test]
    fn test_id_must_match_location() {
        let error = parse("$id: /m/B.yaml\ntype: object\n").unwrap_err();
        assert!(error.message.contains("does not match"));
        assert!(parse("type: object\n").unwrap_err().message.contains("Missing '$id'"));
    }

    #[test]
    fn test_discriminator_only_on_root() {
        let schema = parse(
            "$id: /m/A.yaml\ntype: object\ndiscriminator:\n  propertyName: kind\n  mapping:\n    b: ./B.yaml\nproperties:\n  kind:\n    type: string\n",
        )
        .unwrap();
        let discriminator = schema.definition.discriminator.as_ref().unwrap();
        assert_eq!(discriminator.property_name, "kind");
        assert_eq!(discriminator.mapping["b"].text, "./B.yaml");

        let error = parse(
            "$id: /m/A.yaml\ntype: object\ndefinitions:\n  X:\n    type: object\n    discriminator:\n      propertyName: kind\n",
        )
        .unwrap_err();
        assert!(error.message.contains("only allowed on the root"));
    }

    #[test]
    fn test_property_without_type() {
        let error = parse("$id: /m/A.yaml\ntype: object\nproperties:\n  a:\n    description: nothing\n").unwrap_err();
        assert!(error.message.contains("neither 'type' nor '$ref'"));
    }

    #[test]
    fn test_module_and_application() {
        let node = parse_document(&SourceFile::new(
            "m/index.yaml",
            "$id: /m\ntitle: Module\ntodos: [write docs]\ntags:\n  team: core\n",
        ))
        .unwrap();
        let module = parse_module(&node, "/m").unwrap();
        assert_eq!(module.title, "Module");
        assert_eq!(module.todos, vec!["write docs"]);
        assert_eq!(module.tags, vec![Tag::new("team", "core")]);

        let node = parse_document(&SourceFile::new("index.yaml", "title: App\nlinks:\n  - text: Home\n    href: https://example.com\n")).unwrap();
        let application = parse_application(&node).unwrap();
        assert_eq!(application.links, vec![Link::new("Home", "https://example.com")]);

        let node = parse_document(&SourceFile::new("index.yaml", "titel: App\n")).unwrap();
        let error = parse_application(&node).unwrap_err();
        assert_eq!(error.suggestion.as_deref(), Some("title"));
    }
}

//! Schema, definition and property types
//!
//! All types are generic over the reference representation `R`. The parser
//! produces `Schema<RawRef>` (textual pointers), the resolver turns them into
//! `Schema<ResolvedRef>` (handles into the model arena). Both serialize a
//! reference as its pointer text, so a tree without references serializes
//! identically before and after resolution.

use super::common::{ImplementationError, Link, SourceLocation, SchemaType, Tag};
use super::paths;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Index of a schema in the model arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SchemaHandle(usize);

impl SchemaHandle {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// What a resolved reference points to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefTarget {
    /// A whole schema (`Other.yaml`, `#`)
    Schema(SchemaHandle),
    /// A named definition of a schema (`#/definitions/Name`)
    Definition { schema: SchemaHandle, name: String },
    /// A property of a schema root or definition (`#/properties/name`)
    Property {
        schema: SchemaHandle,
        definition: Option<String>,
        property: String,
    },
}

impl RefTarget {
    pub fn schema(&self) -> SchemaHandle {
        match self {
            Self::Schema(schema) => *schema,
            Self::Definition { schema, .. } | Self::Property { schema, .. } => *schema,
        }
    }

    /// Definition name for definition targets (and properties of definitions)
    pub fn definition_name(&self) -> Option<&str> {
        match self {
            Self::Schema(_) => None,
            Self::Definition { name, .. } => Some(name),
            Self::Property { definition, .. } => definition.as_deref(),
        }
    }

    pub fn is_property(&self) -> bool {
        matches!(self, Self::Property { .. })
    }
}

/// A reference as written in the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRef {
    pub text: String,
    pub location: SourceLocation,
}

impl RawRef {
    pub fn new(text: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            text: text.into(),
            location,
        }
    }
}

impl Serialize for RawRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

/// A reference together with its resolved target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRef {
    pub text: String,
    pub target: RefTarget,
}

impl Serialize for ResolvedRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

/// Position a reference occupies, used to tell type edges from id references
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefRole {
    /// `$ref` of a property, array item or map value
    Type,
    /// `allOf` parent
    Parent,
    /// `oneOf` member
    Variant,
    /// Discriminator mapping target
    Mapping,
    /// `x-references`: the value is an id of the target
    IdReference,
}

/// JSON value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    String,
    Integer,
    Number,
    Boolean,
    Null,
    Object,
    Array,
}

impl JsonType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Null => "null",
            Self::Object => "object",
            Self::Array => "array",
        }
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(self, Self::Object | Self::Array)
    }

    /// Whether `value` is an instance of this type (integers are numbers)
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => match value {
                Value::Number(n) => {
                    n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
                }
                _ => false,
            },
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Null => value.is_null(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }

    /// Type name of a JSON value as used in messages
    pub fn describe(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for JsonType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "integer" => Ok(Self::Integer),
            "number" => Ok(Self::Number),
            "boolean" => Ok(Self::Boolean),
            "null" => Ok(Self::Null),
            "object" => Ok(Self::Object),
            "array" => Ok(Self::Array),
            _ => Err(format!("Unknown type '{}'", s)),
        }
    }
}

/// Value constraints of a basic type
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Constraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,
    #[serde(rename = "const", skip_serializing_if = "Option::is_none")]
    pub const_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
}

/// A basic (non-object, non-array) type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Primitive {
    #[serde(rename = "type")]
    pub ty: JsonType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(flatten)]
    pub constraints: Constraints,
}

impl Primitive {
    pub fn new(ty: JsonType) -> Self {
        Self {
            ty,
            format: None,
            constraints: Constraints::default(),
        }
    }

    /// The single string a property is pinned to by `const` or a one-value `enum`
    pub fn fixed_string(&self) -> Option<&str> {
        if let Some(Value::String(value)) = &self.constraints.const_value {
            return Some(value);
        }
        match self.constraints.enum_values.as_slice() {
            [Value::String(value)] => Some(value),
            _ => None,
        }
    }
}

/// Array element type and bounds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrayItems<R> {
    pub items: Box<PropertyType<R>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub unique_items: bool,
}

impl<R> ArrayItems<R> {
    pub fn new(items: PropertyType<R>) -> Self {
        Self {
            items: Box::new(items),
            min_items: None,
            max_items: None,
            unique_items: false,
        }
    }

    fn visit_refs<'a>(&'a self, role: RefRole, f: &mut impl FnMut(&'a R, RefRole)) {
        self.items.visit_refs(role, f);
    }

    fn try_map_refs<S, E>(
        self,
        f: &mut impl FnMut(R) -> Result<S, E>,
    ) -> Result<ArrayItems<S>, E> {
        Ok(ArrayItems {
            items: Box::new((*self.items).try_map_refs(f)?),
            min_items: self.min_items,
            max_items: self.max_items,
            unique_items: self.unique_items,
        })
    }
}

/// Type of a property
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType<R> {
    /// `$ref`, optionally with a sibling `type` that must agree with the target
    Ref {
        target: R,
        #[serde(skip_serializing_if = "Option::is_none")]
        declared: Option<JsonType>,
    },
    Array(ArrayItems<R>),
    Primitive(Primitive),
    /// Object with `additionalProperties` as value type
    Map { values: Box<PropertyType<R>> },
    /// Free-form object
    Object,
}

impl<R> PropertyType<R> {
    pub fn visit_refs<'a>(&'a self, role: RefRole, f: &mut impl FnMut(&'a R, RefRole)) {
        match self {
            Self::Ref { target, .. } => f(target, role),
            Self::Array(items) => items.visit_refs(role, f),
            Self::Map { values } => values.visit_refs(role, f),
            Self::Primitive(_) | Self::Object => {}
        }
    }

    pub fn try_map_refs<S, E>(
        self,
        f: &mut impl FnMut(R) -> Result<S, E>,
    ) -> Result<PropertyType<S>, E> {
        Ok(match self {
            Self::Ref { target, declared } => PropertyType::Ref {
                target: f(target)?,
                declared,
            },
            Self::Array(items) => PropertyType::Array(items.try_map_refs(f)?),
            Self::Primitive(primitive) => PropertyType::Primitive(primitive),
            Self::Map { values } => PropertyType::Map {
                values: Box::new((*values).try_map_refs(f)?),
            },
            Self::Object => PropertyType::Object,
        })
    }

    /// The innermost primitive, looking through arrays and maps
    pub fn primitive(&self) -> Option<&Primitive> {
        match self {
            Self::Primitive(primitive) => Some(primitive),
            Self::Array(items) => items.items.primitive(),
            Self::Map { values } => values.primitive(),
            Self::Ref { .. } | Self::Object => None,
        }
    }
}

/// A property of an object definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property<R> {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub ty: PropertyType<R>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub read_only: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub write_only: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    /// `x-references`: schemas whose id this property holds
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<R>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, Value>,
    #[serde(skip)]
    pub location: SourceLocation,
}

impl<R> Property<R> {
    pub fn new(name: impl Into<String>, ty: PropertyType<R>) -> Self {
        Self {
            name: name.into(),
            description: None,
            ty,
            nullable: false,
            read_only: false,
            write_only: false,
            deprecated: false,
            references: Vec::new(),
            extensions: BTreeMap::new(),
            location: SourceLocation::default(),
        }
    }

    pub fn format(&self) -> Option<&str> {
        self.ty.primitive().and_then(|p| p.format.as_deref())
    }

    pub fn visit_refs<'a>(&'a self, f: &mut impl FnMut(&'a R, RefRole)) {
        self.ty.visit_refs(RefRole::Type, f);
        for reference in &self.references {
            f(reference, RefRole::IdReference);
        }
    }

    pub fn try_map_refs<S, E>(
        self,
        f: &mut impl FnMut(R) -> Result<S, E>,
    ) -> Result<Property<S>, E> {
        let ty = self.ty.try_map_refs(f)?;
        let references = self
            .references
            .into_iter()
            .map(&mut *f)
            .collect::<Result<Vec<S>, E>>()?;
        Ok(Property {
            name: self.name,
            description: self.description,
            ty,
            nullable: self.nullable,
            read_only: self.read_only,
            write_only: self.write_only,
            deprecated: self.deprecated,
            references,
            extensions: self.extensions,
            location: self.location,
        })
    }
}

/// `additionalProperties` of an object
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdditionalProperties<R> {
    Allowed,
    Forbidden,
    Schema(Box<PropertyType<R>>),
}

impl<R> Default for AdditionalProperties<R> {
    fn default() -> Self {
        Self::Allowed
    }
}

/// Body of an object or interface definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectBody<R> {
    pub properties: Vec<Property<R>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// `oneOf` members; non-empty for interfaces
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<R>,
    pub additional_properties: AdditionalProperties<R>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_properties: Option<u64>,
}

impl<R> Default for ObjectBody<R> {
    fn default() -> Self {
        Self {
            properties: Vec::new(),
            required: Vec::new(),
            one_of: Vec::new(),
            additional_properties: AdditionalProperties::Allowed,
            min_properties: None,
            max_properties: None,
        }
    }
}

impl<R> ObjectBody<R> {
    pub fn property(&self, name: &str) -> Option<&Property<R>> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }
}

/// Body of an enum definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumBody {
    #[serde(rename = "type")]
    pub ty: JsonType,
    pub values: Vec<Value>,
    /// `x-enum-description`
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub descriptions: BTreeMap<String, String>,
}

/// Shape of a definition
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionBody<R> {
    Object(ObjectBody<R>),
    Enum(EnumBody),
    Array(ArrayItems<R>),
    Primitive(Primitive),
}

/// Polymorphism declaration of a base schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discriminator<R> {
    pub property_name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub mapping: BTreeMap<String, R>,
}

/// Coarse kind of a definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionKind {
    Object,
    Interface,
    Enum,
    Array,
    Primitive,
}

/// A type definition: a schema root or one of its named definitions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Definition<R = ResolvedRef> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub body: DefinitionBody<R>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Discriminator<R>>,
    /// `allOf` parents
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<R>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, Value>,
    #[serde(skip)]
    pub location: SourceLocation,
}

impl<R> Definition<R> {
    pub fn new(body: DefinitionBody<R>) -> Self {
        Self {
            title: None,
            description: None,
            body,
            discriminator: None,
            parents: Vec::new(),
            extensions: BTreeMap::new(),
            location: SourceLocation::default(),
        }
    }

    pub fn kind(&self) -> DefinitionKind {
        match &self.body {
            DefinitionBody::Object(object) if !object.one_of.is_empty() => {
                DefinitionKind::Interface
            }
            DefinitionBody::Object(_) => DefinitionKind::Object,
            DefinitionBody::Enum(_) => DefinitionKind::Enum,
            DefinitionBody::Array(_) => DefinitionKind::Array,
            DefinitionBody::Primitive(_) => DefinitionKind::Primitive,
        }
    }

    /// JSON type of instances of this definition
    pub fn json_type(&self) -> JsonType {
        match &self.body {
            DefinitionBody::Object(_) => JsonType::Object,
            DefinitionBody::Enum(body) => body.ty,
            DefinitionBody::Array(_) => JsonType::Array,
            DefinitionBody::Primitive(primitive) => primitive.ty,
        }
    }

    pub fn object(&self) -> Option<&ObjectBody<R>> {
        match &self.body {
            DefinitionBody::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn properties(&self) -> &[Property<R>] {
        self.object().map(|o| o.properties.as_slice()).unwrap_or(&[])
    }

    pub fn property(&self, name: &str) -> Option<&Property<R>> {
        self.object().and_then(|o| o.property(name))
    }

    pub fn visit_refs<'a>(&'a self, f: &mut impl FnMut(&'a R, RefRole)) {
        match &self.body {
            DefinitionBody::Object(object) => {
                for property in &object.properties {
                    property.visit_refs(f);
                }
                for member in &object.one_of {
                    f(member, RefRole::Variant);
                }
                if let AdditionalProperties::Schema(values) = &object.additional_properties {
                    values.visit_refs(RefRole::Type, f);
                }
            }
            DefinitionBody::Array(items) => items.visit_refs(RefRole::Type, f),
            DefinitionBody::Enum(_) | DefinitionBody::Primitive(_) => {}
        }
        if let Some(discriminator) = &self.discriminator {
            for target in discriminator.mapping.values() {
                f(target, RefRole::Mapping);
            }
        }
        for parent in &self.parents {
            f(parent, RefRole::Parent);
        }
    }

    pub fn try_map_refs<S, E>(
        self,
        f: &mut impl FnMut(R) -> Result<S, E>,
    ) -> Result<Definition<S>, E> {
        let body = match self.body {
            DefinitionBody::Object(object) => {
                let properties = object
                    .properties
                    .into_iter()
                    .map(|p| p.try_map_refs(&mut *f))
                    .collect::<Result<Vec<_>, E>>()?;
                let one_of = object
                    .one_of
                    .into_iter()
                    .map(&mut *f)
                    .collect::<Result<Vec<_>, E>>()?;
                let additional_properties = match object.additional_properties {
                    AdditionalProperties::Allowed => AdditionalProperties::Allowed,
                    AdditionalProperties::Forbidden => AdditionalProperties::Forbidden,
                    AdditionalProperties::Schema(values) => {
                        AdditionalProperties::Schema(Box::new((*values).try_map_refs(f)?))
                    }
                };
                DefinitionBody::Object(ObjectBody {
                    properties,
                    required: object.required,
                    one_of,
                    additional_properties,
                    min_properties: object.min_properties,
                    max_properties: object.max_properties,
                })
            }
            DefinitionBody::Array(items) => DefinitionBody::Array(items.try_map_refs(f)?),
            DefinitionBody::Enum(body) => DefinitionBody::Enum(body),
            DefinitionBody::Primitive(primitive) => DefinitionBody::Primitive(primitive),
        };
        let discriminator = match self.discriminator {
            Some(discriminator) => Some(Discriminator {
                property_name: discriminator.property_name,
                mapping: discriminator
                    .mapping
                    .into_iter()
                    .map(|(value, target)| f(target).map(|target| (value, target)))
                    .collect::<Result<BTreeMap<_, _>, E>>()?,
            }),
            None => None,
        };
        let parents = self
            .parents
            .into_iter()
            .map(&mut *f)
            .collect::<Result<Vec<_>, E>>()?;
        Ok(Definition {
            title: self.title,
            description: self.description,
            body,
            discriminator,
            parents,
            extensions: self.extensions,
            location: self.location,
        })
    }
}

/// Kind of a schema as seen by plugins and writers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaKind {
    Object,
    Array,
    Primitive,
    Enum,
    Interface,
    PolymorphicBase,
    Variant,
}

impl SchemaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::Primitive => "primitive",
            Self::Enum => "enum",
            Self::Interface => "interface",
            Self::PolymorphicBase => "polymorphic base",
            Self::Variant => "variant",
        }
    }
}

/// An example instance of a schema
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    pub value: Value,
    pub location: SourceLocation,
}

impl Serialize for Example {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

/// Link from a polymorphic base to one of its variants
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantLink {
    /// Discriminator value selecting the variant
    pub value: Option<String>,
    pub target: RefTarget,
    /// Listed by the base (`oneOf` or mapping) rather than linked implicitly
    pub declared: bool,
}

/// A schema: one input file describing one named type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema<R = ResolvedRef> {
    #[serde(rename = "$id")]
    pub id: String,
    pub title: String,
    pub schema_type: SchemaType,
    pub definition: Definition<R>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub definitions: BTreeMap<String, Definition<R>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Example>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub todos: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ImplementationError>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<VariantLink>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variant_of: Vec<SchemaHandle>,
    #[serde(skip)]
    pub location: SourceLocation,
}

impl<R> Schema<R> {
    pub fn new(id: impl Into<String>, title: impl Into<String>, definition: Definition<R>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            schema_type: SchemaType::default(),
            definition,
            definitions: BTreeMap::new(),
            examples: Vec::new(),
            todos: Vec::new(),
            links: Vec::new(),
            errors: Vec::new(),
            tags: Vec::new(),
            variants: Vec::new(),
            variant_of: Vec::new(),
            location: SourceLocation::default(),
        }
    }

    /// File name without extension
    pub fn name(&self) -> &str {
        paths::schema_name(&self.id)
    }

    pub fn module_id(&self) -> &str {
        paths::module_id(&self.id)
    }

    pub fn kind(&self) -> SchemaKind {
        if self.definition.discriminator.is_some() {
            return SchemaKind::PolymorphicBase;
        }
        if !self.variant_of.is_empty() {
            return SchemaKind::Variant;
        }
        match self.definition.kind() {
            DefinitionKind::Object => SchemaKind::Object,
            DefinitionKind::Interface => SchemaKind::Interface,
            DefinitionKind::Enum => SchemaKind::Enum,
            DefinitionKind::Array => SchemaKind::Array,
            DefinitionKind::Primitive => SchemaKind::Primitive,
        }
    }

    /// The root definition for `None`, a named definition otherwise
    pub fn definition(&self, name: Option<&str>) -> Option<&Definition<R>> {
        match name {
            None => Some(&self.definition),
            Some(name) => self.definitions.get(name),
        }
    }

    /// Root and named definitions, root first
    pub fn all_definitions(&self) -> impl Iterator<Item = (Option<&str>, &Definition<R>)> {
        std::iter::once((None, &self.definition))
            .chain(self.definitions.iter().map(|(n, d)| (Some(n.as_str()), d)))
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.name == name)
    }

    pub fn visit_refs<'a>(&'a self, f: &mut impl FnMut(&'a R, RefRole)) {
        self.definition.visit_refs(f);
        for definition in self.definitions.values() {
            definition.visit_refs(f);
        }
    }

    pub fn try_map_refs<S, E>(
        self,
        f: &mut impl FnMut(R) -> Result<S, E>,
    ) -> Result<Schema<S>, E> {
        let definition = self.definition.try_map_refs(f)?;
        let definitions = self
            .definitions
            .into_iter()
            .map(|(name, d)| d.try_map_refs(&mut *f).map(|d| (name, d)))
            .collect::<Result<BTreeMap<_, _>, E>>()?;
        Ok(Schema {
            id: self.id,
            title: self.title,
            schema_type: self.schema_type,
            definition,
            definitions,
            examples: self.examples,
            todos: self.todos,
            links: self.links,
            errors: self.errors,
            tags: self.tags,
            variants: self.variants,
            variant_of: self.variant_of,
            location: self.location,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(text: &str) -> RawRef {
        RawRef::new(text, SourceLocation::file("m/S.yaml"))
    }

    fn sample() -> Schema<RawRef> {
        let mut object = ObjectBody::default();
        object
            .properties
            .push(Property::new("name", PropertyType::Primitive(Primitive::new(JsonType::String))));
        object.properties.push(Property::new(
            "address",
            PropertyType::Ref {
                target: raw("#/definitions/Address"),
                declared: None,
            },
        ));
        object.properties.push(Property::new(
            "tags",
            PropertyType::Array(ArrayItems::new(PropertyType::Ref {
                target: raw("../other/Tag.yaml"),
                declared: None,
            })),
        ));
        let mut schema = Schema::new("/m/S.yaml", "S", Definition::new(DefinitionBody::Object(object)));
        schema.definitions.insert(
            "Address".to_string(),
            Definition::new(DefinitionBody::Object(ObjectBody::default())),
        );
        schema
    }

    #[test]
    fn test_visit_refs_in_order() {
        let schema = sample();
        let mut seen = Vec::new();
        schema.visit_refs(&mut |r, role| seen.push((r.text.clone(), role)));
        assert_eq!(
            seen,
            vec![
                ("#/definitions/Address".to_string(), RefRole::Type),
                ("../other/Tag.yaml".to_string(), RefRole::Type),
            ]
        );
    }

    #[test]
    fn test_try_map_refs_keeps_shape() {
        let schema = sample();
        let before = serde_json::to_value(&schema).unwrap();
        let mapped: Schema<String> = schema
            .try_map_refs(&mut |r: RawRef| Ok::<_, ()>(r.text))
            .unwrap();
        assert_eq!(serde_json::to_value(&mapped).unwrap(), before);
    }

    #[test]
    fn test_try_map_refs_stops_on_error() {
        let result = sample().try_map_refs(&mut |r: RawRef| {
            if r.text.starts_with('#') { Ok(r.text) } else { Err(r.text) }
        });
        assert_eq!(result.unwrap_err(), "../other/Tag.yaml");
    }

    #[test]
    fn test_kind_and_fixed_string() {
        let schema = sample();
        assert_eq!(schema.kind(), SchemaKind::Object);
        assert_eq!(schema.name(), "S");
        assert_eq!(schema.module_id(), "/m");

        let mut primitive = Primitive::new(JsonType::String);
        primitive.constraints.enum_values = vec![json!("derived")];
        assert_eq!(primitive.fixed_string(), Some("derived"));
        primitive.constraints.const_value = Some(json!("other"));
        assert_eq!(primitive.fixed_string(), Some("other"));
    }

    #[test]
    fn test_json_type_matches() {
        assert!(JsonType::Integer.matches(&json!(3)));
        assert!(JsonType::Integer.matches(&json!(3.0)));
        assert!(!JsonType::Integer.matches(&json!(3.5)));
        assert!(JsonType::Number.matches(&json!(3)));
        assert!(!JsonType::String.matches(&json!(3)));
        assert_eq!(JsonType::describe(&json!([1])), "array");
    }
}

//! Source files and located document trees
//!
//! Input files are parsed with the `yaml-rust` event parser so every node
//! keeps the line and column it was read from. JSON files go through the
//! same parser (JSON is YAML flow syntax) with `serde_json` as a fallback.

use crate::models::SourceLocation;
use crate::validation::ValidationError;
use serde_json::Value;
use std::collections::HashMap;
use yaml_rust::Yaml;
use yaml_rust::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust::scanner::{Marker, TScalarStyle, TokenType};

/// An input file: path relative to the input root and its text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into().trim_start_matches('/').to_string(),
            content: content.into(),
        }
    }

    pub fn is_json(&self) -> bool {
        self.path.ends_with(".json")
    }
}

/// Value of a document node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Sequence(Vec<Node>),
    Mapping(Vec<Entry>),
}

/// A document node with its location
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub value: NodeValue,
    pub location: SourceLocation,
}

/// A mapping entry; keys keep their source order
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: String,
    pub key_location: SourceLocation,
    pub value: Node,
}

impl Node {
    pub fn kind_name(&self) -> &'static str {
        match &self.value {
            NodeValue::Null => "null",
            NodeValue::Bool(_) => "boolean",
            NodeValue::Integer(_) => "integer",
            NodeValue::Float(_) => "number",
            NodeValue::String(_) => "string",
            NodeValue::Sequence(_) => "sequence",
            NodeValue::Mapping(_) => "mapping",
        }
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self.value, NodeValue::Mapping(_))
    }

    /// Entries of a mapping, empty for other nodes
    pub fn entries(&self) -> &[Entry] {
        match &self.value {
            NodeValue::Mapping(entries) => entries,
            _ => &[],
        }
    }

    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.entries().iter().find(|e| e.key == key)
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entry(key).map(|e| &e.value)
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            NodeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.value {
            NodeValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self.value {
            NodeValue::Integer(i) => u64::try_from(i).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.value {
            NodeValue::Integer(i) => Some(i as f64),
            NodeValue::Float(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match &self.value {
            NodeValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Plain JSON value of the node, dropping locations
    pub fn to_json(&self) -> Value {
        match &self.value {
            NodeValue::Null => Value::Null,
            NodeValue::Bool(b) => Value::Bool(*b),
            NodeValue::Integer(i) => Value::from(*i),
            NodeValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            NodeValue::String(s) => Value::String(s.clone()),
            NodeValue::Sequence(items) => Value::Array(items.iter().map(Node::to_json).collect()),
            NodeValue::Mapping(entries) => Value::Object(
                entries
                    .iter()
                    .map(|e| (e.key.clone(), e.value.to_json()))
                    .collect(),
            ),
        }
    }

    fn from_json(value: &Value, location: &SourceLocation) -> Self {
        let value = match value {
            Value::Null => NodeValue::Null,
            Value::Bool(b) => NodeValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => NodeValue::Integer(i),
                None => NodeValue::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => NodeValue::String(s.clone()),
            Value::Array(items) => {
                NodeValue::Sequence(items.iter().map(|v| Node::from_json(v, location)).collect())
            }
            Value::Object(map) => NodeValue::Mapping(
                map.iter()
                    .map(|(k, v)| Entry {
                        key: k.clone(),
                        key_location: location.clone(),
                        value: Node::from_json(v, location),
                    })
                    .collect(),
            ),
        };
        Node {
            value,
            location: location.clone(),
        }
    }
}

fn scalar_value(text: String, style: TScalarStyle, tag: Option<TokenType>) -> NodeValue {
    if !matches!(style, TScalarStyle::Plain) {
        return NodeValue::String(text);
    }
    if let Some(TokenType::Tag(handle, suffix)) = tag
        && handle == "!!"
    {
        return match suffix.as_str() {
            "int" => text
                .parse()
                .map(NodeValue::Integer)
                .unwrap_or(NodeValue::String(text)),
            "float" => text
                .parse()
                .map(NodeValue::Float)
                .unwrap_or(NodeValue::String(text)),
            "bool" => match text.as_str() {
                "true" => NodeValue::Bool(true),
                "false" => NodeValue::Bool(false),
                _ => NodeValue::String(text),
            },
            "null" => NodeValue::Null,
            _ => NodeValue::String(text),
        };
    }
    let yaml = Yaml::from_str(&text);
    match &yaml {
        Yaml::Integer(i) => NodeValue::Integer(*i),
        Yaml::Real(_) => yaml
            .as_f64()
            .map(NodeValue::Float)
            .unwrap_or(NodeValue::String(text)),
        Yaml::Boolean(b) => NodeValue::Bool(*b),
        Yaml::Null => NodeValue::Null,
        _ => NodeValue::String(text),
    }
}

enum Frame {
    Sequence {
        items: Vec<Node>,
        location: SourceLocation,
        anchor: usize,
    },
    Mapping {
        entries: Vec<Entry>,
        pending_key: Option<(String, SourceLocation)>,
        location: SourceLocation,
        anchor: usize,
    },
}

/// Builds located nodes from parser events
struct TreeBuilder {
    file: String,
    stack: Vec<Frame>,
    documents: Vec<Node>,
    anchors: HashMap<usize, Node>,
    error: Option<ValidationError>,
}

impl TreeBuilder {
    fn new(file: &str) -> Self {
        Self {
            file: file.to_string(),
            stack: Vec::new(),
            documents: Vec::new(),
            anchors: HashMap::new(),
            error: None,
        }
    }

    fn location(&self, mark: &Marker) -> SourceLocation {
        SourceLocation::new(self.file.clone(), mark.line(), mark.col() + 1)
    }

    fn fail(&mut self, message: String, location: SourceLocation) {
        if self.error.is_none() {
            self.error = Some(ValidationError::malformed(message, location));
        }
    }

    fn expects_key(&self) -> bool {
        matches!(
            self.stack.last(),
            Some(Frame::Mapping {
                pending_key: None,
                ..
            })
        )
    }

    fn push_node(&mut self, node: Node) {
        match self.stack.last_mut() {
            None => self.documents.push(node),
            Some(Frame::Sequence { items, .. }) => items.push(node),
            Some(Frame::Mapping {
                entries,
                pending_key,
                ..
            }) => {
                if let Some((key, key_location)) = pending_key.take() {
                    entries.push(Entry {
                        key,
                        key_location,
                        value: node,
                    });
                }
            }
        }
    }

    fn set_key(&mut self, key: String, location: SourceLocation) {
        let duplicate = match self.stack.last() {
            Some(Frame::Mapping { entries, .. }) => entries.iter().any(|e| e.key == key),
            _ => false,
        };
        if duplicate {
            self.fail(format!("Duplicate key '{}'", key), location);
            return;
        }
        if let Some(Frame::Mapping { pending_key, .. }) = self.stack.last_mut() {
            *pending_key = Some((key, location));
        }
    }

    fn finish(&mut self, node: Node, anchor: usize) {
        if anchor > 0 {
            self.anchors.insert(anchor, node.clone());
        }
        self.push_node(node);
    }
}

impl MarkedEventReceiver for TreeBuilder {
    fn on_event(&mut self, event: Event, mark: Marker) {
        if self.error.is_some() {
            return;
        }
        let location = self.location(&mark);
        match event {
            Event::Scalar(text, style, anchor, tag) => {
                if self.expects_key() {
                    self.set_key(text, location);
                    return;
                }
                let node = Node {
                    value: scalar_value(text, style, tag),
                    location,
                };
                self.finish(node, anchor);
            }
            Event::Alias(id) => {
                if self.expects_key() {
                    self.fail("Aliases are not supported as mapping keys".to_string(), location);
                    return;
                }
                match self.anchors.get(&id).cloned() {
                    Some(node) => self.push_node(node),
                    None => self.fail("Unknown alias".to_string(), location),
                }
            }
            Event::SequenceStart(_) | Event::MappingStart(_) if self.expects_key() => {
                self.fail("Only scalar mapping keys are supported".to_string(), location);
            }
            Event::SequenceStart(anchor) => self.stack.push(Frame::Sequence {
                items: Vec::new(),
                location,
                anchor,
            }),
            Event::MappingStart(anchor) => self.stack.push(Frame::Mapping {
                entries: Vec::new(),
                pending_key: None,
                location,
                anchor,
            }),
            Event::SequenceEnd | Event::MappingEnd => match self.stack.pop() {
                Some(Frame::Sequence {
                    items,
                    location,
                    anchor,
                }) => self.finish(
                    Node {
                        value: NodeValue::Sequence(items),
                        location,
                    },
                    anchor,
                ),
                Some(Frame::Mapping {
                    entries,
                    location,
                    anchor,
                    ..
                }) => self.finish(
                    Node {
                        value: NodeValue::Mapping(entries),
                        location,
                    },
                    anchor,
                ),
                None => {}
            },
            _ => {}
        }
    }
}

/// Parse a source file into exactly one located mapping document
pub fn parse_document(source: &SourceFile) -> Result<Node, ValidationError> {
    let file_location = SourceLocation::file(&source.path);
    let mut builder = TreeBuilder::new(&source.path);
    let mut parser = Parser::new(source.content.chars());

    let document = match parser.load(&mut builder, true) {
        Ok(()) => {
            if let Some(error) = builder.error {
                return Err(error);
            }
            match builder.documents.len() {
                0 => {
                    return Err(ValidationError::malformed(
                        "Document is empty",
                        file_location,
                    ));
                }
                1 => builder.documents.remove(0),
                n => {
                    return Err(ValidationError::malformed(
                        format!("Expected one document, found {}", n),
                        file_location,
                    ));
                }
            }
        }
        Err(e) if source.is_json() => json_document(source, e.to_string())?,
        Err(e) => {
            let mark = e.marker();
            return Err(ValidationError::malformed(
                format!("Invalid YAML: {}", e),
                SourceLocation::new(&source.path, mark.line(), mark.col() + 1),
            ));
        }
    };

    if !document.is_mapping() {
        return Err(ValidationError::malformed(
            format!("Expected a mapping at the top level, found {}", document.kind_name()),
            document.location,
        ));
    }
    Ok(document)
}

fn json_document(source: &SourceFile, yaml_error: String) -> Result<Node, ValidationError> {
    match serde_json::from_str::<Value>(&source.content) {
        Ok(value) => Ok(Node::from_json(
            &value,
            &SourceLocation::new(&source.path, 1, 1),
        )),
        Err(e) => Err(ValidationError::malformed(
            format!("Invalid JSON: {} ({})", e, yaml_error),
            SourceLocation::new(&source.path, e.line(), e.column()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ErrorKind;
    use serde_json::json;

    fn parse(text: &str) -> Result<Node, ValidationError> {
        parse_document(&SourceFile::new("m/A.yaml", text))
    }

    #[test]
    fn test_scalars_and_locations() {
        let node = parse("title: A\ncount: 3\nratio: 1.5\nflag: true\nnothing: ~\nquoted: '3'\n").unwrap();
        assert_eq!(
            node.to_json(),
            json!({"title": "A", "count": 3, "ratio": 1.5, "flag": true, "nothing": null, "quoted": "3"})
        );
        let entry = node.entry("count").unwrap();
        assert_eq!(entry.key_location, SourceLocation::new("m/A.yaml", 2, 1));
        assert_eq!(entry.value.location, SourceLocation::new("m/A.yaml", 2, 8));
    }

    #[test]
    fn test_nested_and_anchors() {
        let node = parse("base: &b\n  type: string\ncopy: *b\nlist:\n  - 1\n  - two\n").unwrap();
        assert_eq!(node.get("copy").unwrap().to_json(), json!({"type": "string"}));
        assert_eq!(node.get("list").unwrap().to_json(), json!([1, "two"]));
        assert_eq!(node.get("list").unwrap().location.line, 5);
    }

    #[test]
    fn test_key_order_kept() {
        let node = parse("b: 1\na: 2\nc: 3\n").unwrap();
        let keys: Vec<_> = node.entries().iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_malformed_inputs() {
        let error = parse("title: [unclosed\n").unwrap_err();
        assert_eq!(error.kind, ErrorKind::MalformedInput);
        assert!(error.location.line > 0);

        let error = parse("a: 1\na: 2\n").unwrap_err();
        assert!(error.message.contains("Duplicate key 'a'"));
        assert_eq!(error.location.line, 2);

        assert!(parse("").unwrap_err().message.contains("empty"));
        assert!(parse("- 1\n- 2\n").unwrap_err().message.contains("mapping"));
        assert!(parse("a: 1\n---\nb: 2\n").unwrap_err().message.contains("one document"));
    }

    #[test]
    fn test_json_source() {
        let source = SourceFile::new("/m/A.json", "{\"$id\": \"/m/A.json\", \"type\": \"object\"}");
        assert_eq!(source.path, "m/A.json");
        let node = parse_document(&source).unwrap();
        assert_eq!(node.get("type").unwrap().as_str(), Some("object"));
    }
}

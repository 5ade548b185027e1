//! Reference resolution
//!
//! Two passes: an `$id` index over every parsed schema, then every textual
//! reference is mapped to a [`RefTarget`]. Resolution only records handles,
//! so cyclic references terminate and become graph edges.

use super::config::CyclePolicy;
use crate::models::{
    RawRef, RefRole, RefTarget, ResolvedRef, Schema, SchemaHandle, paths,
};
use crate::validation::{ErrorKind, ValidationError, ValidationErrors, suggest};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{Graph, NodeIndex};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Names a reference may point into
#[derive(Debug, Default)]
struct Shape {
    id: String,
    properties: BTreeSet<String>,
    definitions: BTreeMap<String, BTreeSet<String>>,
}

fn property_names<R>(properties: &[crate::models::Property<R>]) -> BTreeSet<String> {
    properties.iter().map(|p| p.name.clone()).collect()
}

/// Decode one JSON-pointer segment
fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Resolves textual references against a fixed set of schemas
#[derive(Debug)]
pub struct ReferenceResolver {
    index: BTreeMap<String, SchemaHandle>,
    shapes: Vec<Shape>,
}

impl ReferenceResolver {
    /// Index schemas by `$id`; handles follow slice order
    pub fn new(schemas: &[Schema<RawRef>]) -> Result<Self, ValidationErrors> {
        let mut index = BTreeMap::new();
        let mut errors = ValidationErrors::new();
        for (position, schema) in schemas.iter().enumerate() {
            if index.contains_key(&schema.id) {
                errors.push(ValidationError::new(
                    ErrorKind::DuplicateId,
                    format!("Duplicate schema id '{}'", schema.id),
                    schema.location.clone(),
                ));
                continue;
            }
            index.insert(schema.id.clone(), SchemaHandle::new(position));
        }
        errors.into_result()?;

        let shapes = schemas
            .iter()
            .map(|schema| Shape {
                id: schema.id.clone(),
                properties: property_names(schema.definition.properties()),
                definitions: schema
                    .definitions
                    .iter()
                    .map(|(name, d)| (name.clone(), property_names(d.properties())))
                    .collect(),
            })
            .collect();
        Ok(Self { index, shapes })
    }

    pub fn lookup(&self, id: &str) -> Option<SchemaHandle> {
        self.index.get(id).copied()
    }

    fn unresolved(&self, from: SchemaHandle, reference: &RawRef) -> ValidationError {
        ValidationError::unresolved(
            format!(
                "Unresolved reference '{}' in schema '{}'",
                reference.text, self.shapes[from.index()].id
            ),
            reference.location.clone(),
        )
    }

    fn schema_part(&self, from: SchemaHandle, file: &str) -> Option<SchemaHandle> {
        if file.is_empty() {
            return Some(from);
        }
        self.lookup(file).or_else(|| {
            let absolute = paths::resolve_relative_id(&self.shapes[from.index()].id, file)?;
            self.lookup(&absolute)
        })
    }

    fn fragment(&self, schema: SchemaHandle, fragment: &str) -> Option<RefTarget> {
        let segments: Vec<String> = fragment
            .trim_start_matches('/')
            .split('/')
            .map(unescape)
            .collect();
        let shape = &self.shapes[schema.index()];
        match segments.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            [""] => Some(RefTarget::Schema(schema)),
            ["definitions" | "$defs", name] => shape
                .definitions
                .contains_key(*name)
                .then(|| RefTarget::Definition {
                    schema,
                    name: name.to_string(),
                }),
            ["properties", property] => {
                shape
                    .properties
                    .contains(*property)
                    .then(|| RefTarget::Property {
                        schema,
                        definition: None,
                        property: property.to_string(),
                    })
            }
            ["definitions" | "$defs", name, "properties", property] => shape
                .definitions
                .get(*name)
                .filter(|properties| properties.contains(*property))
                .map(|_| RefTarget::Property {
                    schema,
                    definition: Some(name.to_string()),
                    property: property.to_string(),
                }),
            _ => None,
        }
    }

    /// Closest existing pointer for an unresolved one
    fn suggestion(&self, from: SchemaHandle, file: &str, fragment: Option<&str>) -> Option<String> {
        match (self.schema_part(from, file), fragment) {
            (None, _) => {
                let wanted = paths::resolve_relative_id(&self.shapes[from.index()].id, file)
                    .unwrap_or_else(|| file.to_string());
                suggest::closest(&wanted, self.index.keys().map(String::as_str), 3)
            }
            (Some(schema), Some(fragment)) => {
                let shape = &self.shapes[schema.index()];
                let candidates: Vec<String> = shape
                    .definitions
                    .keys()
                    .map(|name| format!("/definitions/{}", name))
                    .chain(shape.properties.iter().map(|p| format!("/properties/{}", p)))
                    .collect();
                let wanted = format!("/{}", fragment.trim_start_matches('/'));
                suggest::closest(&wanted, candidates.iter().map(String::as_str), 3)
                    .map(|pointer| format!("{}#{}", file, pointer))
            }
            (Some(_), None) => None,
        }
    }

    /// Resolve one reference made from schema `from`
    pub fn resolve(&self, from: SchemaHandle, reference: &RawRef) -> Result<RefTarget, ValidationError> {
        let (file, fragment) = match reference.text.split_once('#') {
            Some((file, fragment)) => (file, Some(fragment)),
            None => (reference.text.as_str(), None),
        };
        let target = self.schema_part(from, file).and_then(|schema| match fragment {
            None => Some(RefTarget::Schema(schema)),
            Some(fragment) => self.fragment(schema, fragment),
        });
        target.ok_or_else(|| {
            let error = self.unresolved(from, reference);
            match self.suggestion(from, file, fragment) {
                Some(suggestion) => error.with_suggestion(suggestion),
                None => error,
            }
        })
    }

    /// Resolve every reference of every schema
    ///
    /// All unresolved references are reported; on success the output keeps
    /// the input order, so handle `i` is `schemas[i]`.
    pub fn resolve_all(schemas: Vec<Schema<RawRef>>) -> Result<Vec<Schema<ResolvedRef>>, ValidationErrors> {
        let resolver = Self::new(&schemas)?;

        let mut errors = ValidationErrors::new();
        for (position, schema) in schemas.iter().enumerate() {
            let from = SchemaHandle::new(position);
            schema.visit_refs(&mut |reference, _| {
                if let Err(e) = resolver.resolve(from, reference) {
                    errors.push(e);
                }
            });
        }
        errors.into_result()?;

        let resolved = schemas
            .into_iter()
            .enumerate()
            .map(|(position, schema)| {
                let from = SchemaHandle::new(position);
                schema.try_map_refs(&mut |reference: RawRef| {
                    resolver.resolve(from, &reference).map(|target| ResolvedRef {
                        text: reference.text,
                        target,
                    })
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;
        debug!(schemas = resolved.len(), "Resolved references");
        Ok(resolved)
    }
}

/// Cyclic reference errors under [`CyclePolicy::Forbid`]
///
/// Edges are type references and `allOf` parents between schemas. Variant
/// links and `x-references` do not form cycles: a base and its variants
/// always point at each other.
pub fn check_cycles(schemas: &[Schema<ResolvedRef>], policy: CyclePolicy) -> Vec<ValidationError> {
    if policy == CyclePolicy::Allow {
        return Vec::new();
    }

    let mut graph: Graph<usize, ()> = Graph::new();
    let nodes: Vec<NodeIndex> = (0..schemas.len()).map(|i| graph.add_node(i)).collect();
    let mut self_loops = BTreeSet::new();

    for (position, schema) in schemas.iter().enumerate() {
        let mut targets = BTreeSet::new();
        schema.visit_refs(&mut |reference, role| {
            if !matches!(role, RefRole::Type | RefRole::Parent) {
                return;
            }
            let target = reference.target.schema().index();
            if target != position {
                targets.insert(target);
            } else if !reference.text.starts_with('#') {
                self_loops.insert(position);
            }
        });
        for target in targets {
            graph.add_edge(nodes[position], nodes[target], ());
        }
    }

    let mut errors: Vec<ValidationError> = tarjan_scc(&graph)
        .into_iter()
        .filter_map(|component| {
            let mut members: Vec<usize> = component.iter().map(|n| graph[*n]).collect();
            members.sort_unstable();
            let first = *members.first()?;
            if members.len() == 1 && !self_loops.contains(&first) {
                return None;
            }
            let ids: Vec<String> = members
                .iter()
                .map(|m| format!("'{}'", schemas[*m].id))
                .collect();
            Some(ValidationError::new(
                ErrorKind::CyclicReference,
                format!("Cyclic reference between schemas {}", ids.join(", ")),
                schemas[first].location.clone(),
            ))
        })
        .collect();
    errors.sort_by(|a, b| a.location.cmp(&b.location));
    errors
}

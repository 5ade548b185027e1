//! Dependencies between schemas and definitions
//!
//! Dependencies are derived from the resolved model and drive the class
//! diagrams of the documentation. The dependency type follows the
//! `x-schema-type` of both ends.

use super::common::SchemaType;
use super::schema::{DefinitionBody, PropertyType, RefTarget, ResolvedRef, SchemaHandle};
use super::Model;
use petgraph::graph::NodeIndex;
use petgraph::{Directed, Direction, Graph};
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

/// Kind of a dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DependencyType {
    IsImplementedBy,
    Contains,
    References,
    Enum,
}

impl DependencyType {
    /// Mermaid class diagram arrow
    pub fn arrow(&self) -> &'static str {
        match self {
            Self::IsImplementedBy => "<|..",
            Self::Contains => "o--",
            Self::References => "..>",
            Self::Enum => "-->",
        }
    }
}

/// A schema or one of its named definitions
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Endpoint {
    pub schema: SchemaHandle,
    pub definition: Option<String>,
}

impl Endpoint {
    fn of(target: &RefTarget) -> Self {
        Self {
            schema: target.schema(),
            definition: target.definition_name().map(str::to_string),
        }
    }
}

/// A derived dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    pub from: Endpoint,
    pub to: Endpoint,
    #[serde(rename = "type")]
    pub kind: DependencyType,
    /// Property the dependency comes from
    pub name: Option<String>,
    pub array: bool,
}

/// All dependencies of a model, indexed by schema
pub struct DependencyGraph {
    graph: Graph<SchemaHandle, usize, Directed>,
    node_map: HashMap<SchemaHandle, NodeIndex>,
    dependencies: Vec<Dependency>,
}

impl DependencyGraph {
    pub fn build(model: &Model) -> Self {
        let mut graph = Graph::<SchemaHandle, usize, Directed>::new();
        let mut node_map = HashMap::new();
        for handle in model.handles() {
            node_map.insert(handle, graph.add_node(handle));
        }

        let dependencies: Vec<Dependency> = model
            .handles()
            .flat_map(|handle| dependencies_of(model, handle))
            .collect();

        for (index, dependency) in dependencies.iter().enumerate() {
            if let (Some(&from), Some(&to)) = (
                node_map.get(&dependency.from.schema),
                node_map.get(&dependency.to.schema),
            ) {
                graph.add_edge(from, to, index);
            }
        }

        Self {
            graph,
            node_map,
            dependencies,
        }
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Dependencies starting at a schema, in derivation order
    pub fn outgoing(&self, handle: SchemaHandle) -> Vec<&Dependency> {
        self.edges(handle, Direction::Outgoing)
    }

    /// Dependencies of other schemas pointing at a schema, in derivation order
    pub fn incoming(&self, handle: SchemaHandle) -> Vec<&Dependency> {
        self.edges(handle, Direction::Incoming)
            .into_iter()
            .filter(|d| d.from.schema != handle)
            .collect()
    }

    fn edges(&self, handle: SchemaHandle, direction: Direction) -> Vec<&Dependency> {
        let Some(&node) = self.node_map.get(&handle) else {
            return Vec::new();
        };
        let mut indices: Vec<usize> = self
            .graph
            .edges_directed(node, direction)
            .map(|e| *e.weight())
            .collect();
        indices.sort_unstable();
        indices.into_iter().map(|i| &self.dependencies[i]).collect()
    }
}

/// Dependencies declared by one schema (root definition first)
pub fn dependencies_of(model: &Model, handle: SchemaHandle) -> Vec<Dependency> {
    let schema = model.schema(handle);
    let mut dependencies = Vec::new();

    for (name, definition) in schema.all_definitions() {
        let from = Endpoint {
            schema: handle,
            definition: name.map(str::to_string),
        };
        let DefinitionBody::Object(object) = &definition.body else {
            if let DefinitionBody::Array(items) = &definition.body {
                collect_type(model, &from, None, &items.items, true, &mut dependencies);
            }
            continue;
        };
        for member in &object.one_of {
            dependencies.push(Dependency {
                from: from.clone(),
                to: Endpoint::of(&member.target),
                kind: DependencyType::IsImplementedBy,
                name: None,
                array: false,
            });
        }
        for property in &object.properties {
            collect_type(model, &from, Some(&property.name), &property.ty, false, &mut dependencies);
            for reference in &property.references {
                dependencies.push(Dependency {
                    from: from.clone(),
                    to: Endpoint::of(&reference.target),
                    kind: DependencyType::References,
                    name: Some(property.name.clone()),
                    array: matches!(property.ty, PropertyType::Array(_)),
                });
            }
        }
    }

    for variant in &schema.variants {
        if variant.target.schema() != handle {
            dependencies.push(Dependency {
                from: Endpoint {
                    schema: handle,
                    definition: None,
                },
                to: Endpoint::of(&variant.target),
                kind: DependencyType::IsImplementedBy,
                name: variant.value.clone(),
                array: false,
            });
        }
    }

    dependencies
}

fn collect_type(
    model: &Model,
    from: &Endpoint,
    name: Option<&str>,
    ty: &PropertyType<ResolvedRef>,
    array: bool,
    out: &mut Vec<Dependency>,
) {
    match ty {
        PropertyType::Ref { target, .. } => {
            let is_enum = model
                .definition_of(&target.target)
                .is_some_and(|d| matches!(d.body, DefinitionBody::Enum(_)));
            let kind = if is_enum {
                DependencyType::Enum
            } else {
                dependency_type(model, from.schema, target.target.schema())
            };
            out.push(Dependency {
                from: from.clone(),
                to: Endpoint::of(&target.target),
                kind,
                name: name.map(str::to_string),
                array,
            });
        }
        PropertyType::Array(items) => collect_type(model, from, name, &items.items, true, out),
        PropertyType::Map { values } => collect_type(model, from, name, values, array, out),
        PropertyType::Primitive(_) | PropertyType::Object => {}
    }
}

/// Dependency type of a `$ref` between two schemas
pub fn dependency_type(model: &Model, from: SchemaHandle, to: SchemaHandle) -> DependencyType {
    if from == to {
        return DependencyType::Contains;
    }
    let from_schema = model.schema(from);
    let to_schema = model.schema(to);
    let (from_type, to_type) = (from_schema.schema_type, to_schema.schema_type);

    if from_type == SchemaType::Other || to_type == SchemaType::Other {
        return DependencyType::References;
    }

    match to_type {
        SchemaType::Aggregate | SchemaType::ReferenceData => {
            warn!(
                from = %from_schema.id,
                to = %to_schema.id,
                to_type = %to_type,
                "Schema is included using $ref, normally it is referenced using x-references"
            );
            DependencyType::References
        }
        SchemaType::ValueObject => DependencyType::Contains,
        SchemaType::Entity => {
            if matches!(from_type, SchemaType::ValueObject | SchemaType::ReferenceData) {
                warn!(
                    from = %from_schema.id,
                    to = %to_schema.id,
                    "Entity is included using $ref from a {}, normally it is referenced using x-references",
                    from_type
                );
                DependencyType::References
            } else {
                DependencyType::Contains
            }
        }
        SchemaType::Other => DependencyType::References,
    }
}

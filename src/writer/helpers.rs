//! Rendering helpers shared by the templates
//!
//! Type labels with relative links, multiline table cells, error todo
//! counters and Mermaid class diagrams.

use crate::models::dependencies::Endpoint;
use crate::models::{
    Dependency, DependencyGraph, Model, Module, PropertyType, RefTarget, ResolvedRef, SchemaHandle,
    SchemaType, paths,
};
use std::collections::BTreeSet;

/// Join the trimmed lines of a text with `<br>` so it fits a table cell
pub fn multiline(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("<br>")
}

/// Mermaid-safe identifier of a module or schema id
pub fn safe_id(id: &str) -> String {
    id.replace(['/', '.'], "_")
}

/// Todo entry counting plugin findings, if there are any
pub fn error_todo(count: usize) -> Option<String> {
    match count {
        0 => None,
        1 => Some("1 validation error".to_string()),
        n => Some(format!("{} validation errors", n)),
    }
}

/// Markdown file of a schema page
pub fn page_of(schema_id: &str) -> String {
    format!("{}.md", schema_id)
}

/// Markdown link from the page of `from` to a reference target
pub fn target_link(model: &Model, from: SchemaHandle, target: &RefTarget) -> String {
    let dir = model.schema(from).module_id();
    let to = model.schema(target.schema());
    let page = paths::relative_link(dir, &page_of(&to.id));
    match target {
        RefTarget::Schema(_) => format!("[{}]({})", to.title, page),
        RefTarget::Definition { schema, name } if *schema == from => {
            format!("[{}](#{})", name, name)
        }
        RefTarget::Definition { name, .. } => format!("[{}]({}#{})", name, page, name),
        RefTarget::Property { property, .. } => format!("[{}.{}]({})", to.title, property, page),
    }
}

/// Label of a property type, linking referenced types
pub fn type_label(
    model: &Model,
    from: SchemaHandle,
    ty: &PropertyType<ResolvedRef>,
    references: &[ResolvedRef],
) -> String {
    if !references.is_empty() {
        let targets: Vec<String> = references
            .iter()
            .map(|r| target_link(model, from, &r.target))
            .collect();
        let label = format!("References {}", targets.join(", "));
        return match ty {
            PropertyType::Array(_) => format!("[{}]", label),
            _ => label,
        };
    }
    match ty {
        PropertyType::Ref { target, .. } => target_link(model, from, &target.target),
        PropertyType::Array(items) => format!("[{}]", type_label(model, from, &items.items, &[])),
        PropertyType::Map { values } => {
            format!("Map of {}", type_label(model, from, values, &[]))
        }
        PropertyType::Primitive(primitive) => primitive
            .format
            .clone()
            .unwrap_or_else(|| primitive.ty.as_str().to_string()),
        PropertyType::Object => "object".to_string(),
    }
}

/// Application diagram: modules and the dependencies between them
pub fn application_diagram(model: &Model, graph: &DependencyGraph) -> Option<String> {
    if model.modules().is_empty() {
        return None;
    }
    let mut lines = vec!["classDiagram".to_string()];
    for module in model.modules() {
        lines.push(format!("  class {}[\"{}\"]", safe_id(&module.id), module.title));
    }
    let mut seen = BTreeSet::new();
    for dependency in graph.dependencies() {
        let from = model.schema(dependency.from.schema).module_id();
        let to = model.schema(dependency.to.schema).module_id();
        if from != to && seen.insert((from, to)) {
            lines.push(format!("  {} ..> {}", safe_id(from), safe_id(to)));
        }
    }
    Some(lines.join("\n"))
}

/// Schemas shown in module diagrams; value objects and reference data are left out
fn is_structural(model: &Model, handle: SchemaHandle) -> bool {
    !matches!(
        model.schema(handle).schema_type,
        SchemaType::ReferenceData | SchemaType::ValueObject
    )
}

/// Module diagram: dependencies into and out of the module's schemas
pub fn module_diagram(model: &Model, graph: &DependencyGraph, module: &Module) -> Option<String> {
    let relevant = |d: &&Dependency| {
        is_structural(model, d.from.schema) && is_structural(model, d.to.schema)
    };
    let mut dependencies: Vec<&Dependency> = graph
        .dependencies()
        .iter()
        .filter(|d| {
            model.schema(d.from.schema).module_id() != module.id
                && model.schema(d.to.schema).module_id() == module.id
        })
        .filter(relevant)
        .collect();
    dependencies.extend(
        graph
            .dependencies()
            .iter()
            .filter(|d| model.schema(d.from.schema).module_id() == module.id)
            .filter(relevant),
    );
    class_diagram(model, &dependencies)
}

/// Schema diagram: dependencies into and out of one schema
pub fn schema_diagram(model: &Model, graph: &DependencyGraph, handle: SchemaHandle) -> Option<String> {
    let mut dependencies = graph.incoming(handle);
    dependencies.extend(graph.outgoing(handle));
    class_diagram(model, &dependencies)
}

fn class_id(model: &Model, endpoint: &Endpoint) -> String {
    let schema_id = safe_id(&model.schema(endpoint.schema).id);
    match &endpoint.definition {
        Some(name) => format!("{}_{}", schema_id, name),
        None => schema_id,
    }
}

fn class_diagram(model: &Model, dependencies: &[&Dependency]) -> Option<String> {
    if dependencies.is_empty() {
        return None;
    }

    let mut endpoints: Vec<&Endpoint> = Vec::new();
    for dependency in dependencies {
        for endpoint in [&dependency.from, &dependency.to] {
            if !endpoints.contains(&endpoint) {
                endpoints.push(endpoint);
            }
        }
    }
    let mut modules: Vec<&str> = Vec::new();
    for endpoint in &endpoints {
        let module = model.schema(endpoint.schema).module_id();
        if !modules.contains(&module) {
            modules.push(module);
        }
    }

    let mut lines = vec!["classDiagram".to_string()];
    for module_id in modules {
        let title = model
            .module(module_id)
            .map(|m| m.title.as_str())
            .unwrap_or(module_id);
        lines.push(format!("  namespace {} {{", namespace_name(title, module_id)));
        for endpoint in endpoints
            .iter()
            .filter(|e| model.schema(e.schema).module_id() == module_id)
        {
            let label = match &endpoint.definition {
                Some(name) => name.as_str(),
                None => model.schema(endpoint.schema).title.as_str(),
            };
            lines.push(format!("    class {}[\"{}\"]", class_id(model, endpoint), label));
        }
        lines.push("  }".to_string());
    }
    for dependency in dependencies {
        let mut line = format!(
            "  {} {} {}",
            class_id(model, &dependency.from),
            dependency.kind.arrow(),
            class_id(model, &dependency.to)
        );
        if let Some(name) = &dependency.name {
            line.push_str(&format!(" : {}", name));
        }
        lines.push(line);
    }
    Some(lines.join("\n"))
}

/// Mermaid namespaces must be plain identifiers
fn namespace_name(title: &str, module_id: &str) -> String {
    let name = paths::clean_name(title);
    if name.is_empty() {
        safe_id(module_id)
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{ReaderConfig, SourceFile, build_model};

    fn model() -> Model {
        build_model(
            vec![
                SourceFile::new("index.yaml", "title: Shop\n"),
                SourceFile::new("orders/index.yaml", "$id: /orders\ntitle: Orders\n"),
                SourceFile::new(
                    "orders/Order.yaml",
                    "$id: /orders/Order.yaml\ntitle: Order\ntype: object\nproperties:\n  customerId:\n    type: string\n    x-references: ../customers/Customer.yaml\n  lines:\n    type: array\n    items:\n      $ref: '#/definitions/Line'\ndefinitions:\n  Line:\n    type: object\n    properties:\n      amount:\n        type: number\n",
                ),
                SourceFile::new("customers/index.yaml", "$id: /customers\ntitle: Customers\n"),
                SourceFile::new(
                    "customers/Customer.yaml",
                    "$id: /customers/Customer.yaml\ntitle: Customer\ntype: object\nx-schema-type: Aggregate\nproperties:\n  email:\n    type: string\n    format: email\n",
                ),
            ],
            &ReaderConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_multiline_and_todos() {
        assert_eq!(multiline("first\n  second "), "first<br>second");
        assert_eq!(error_todo(0), None);
        assert_eq!(error_todo(1).as_deref(), Some("1 validation error"));
        assert_eq!(error_todo(3).as_deref(), Some("3 validation errors"));
        assert_eq!(safe_id("/orders/Order.yaml"), "_orders_Order_yaml");
    }

    #[test]
    fn test_type_labels_link_relatively() {
        let model = model();
        let order = model.schema_by_id("/orders/Order.yaml").unwrap();
        let properties = model.schema(order).definition.properties();

        let customer = &properties[0];
        assert_eq!(
            type_label(&model, order, &customer.ty, &customer.references),
            "References [Customer](../customers/Customer.yaml.md)"
        );
        let lines = &properties[1];
        assert_eq!(type_label(&model, order, &lines.ty, &lines.references), "[[Line](#Line)]");

        let customer = model.schema_by_id("/customers/Customer.yaml").unwrap();
        let email = &model.schema(customer).definition.properties()[0];
        assert_eq!(type_label(&model, customer, &email.ty, &[]), "email");
    }

    #[test]
    fn test_diagrams() {
        let model = model();
        let graph = DependencyGraph::build(&model);

        let application = application_diagram(&model, &graph).unwrap();
        assert!(application.starts_with("classDiagram"));
        assert!(application.contains("class _customers[\"Customers\"]"));
        assert!(application.contains("_orders ..> _customers"));

        let order = model.schema_by_id("/orders/Order.yaml").unwrap();
        let diagram = schema_diagram(&model, &graph, order).unwrap();
        assert!(diagram.contains("namespace Orders {"));
        assert!(diagram.contains("_orders_Order_yaml o-- _orders_Order_yaml_Line : lines"));
        assert!(diagram.contains("_orders_Order_yaml ..> _customers_Customer_yaml : customerId"));

        // Customer is an Aggregate, so it stays in module diagrams
        let module = model.module("/customers").unwrap();
        assert!(module_diagram(&model, &graph, module).is_some());
    }
}

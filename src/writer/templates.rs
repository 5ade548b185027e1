//! Markdown templates
//!
//! A [`Templates`] implementation turns the render contexts into page text.
//! [`DefaultTemplates`] is used unless a writer is given another set.

use super::context::{ApplicationContext, ModuleContext, SchemaContext};
use super::helpers::{multiline, page_of, target_link, type_label};
use crate::models::{
    Definition, DefinitionBody, Finding, ImplementationError, Link, Model, Property, ResolvedRef,
    SchemaHandle, Tag, paths,
};
use serde_json::Value;
use std::fmt::{self, Write};

/// Page templates of the Markdown writer
pub trait Templates {
    fn application(&self, context: &ApplicationContext<'_>) -> Result<String, fmt::Error>;
    fn module(&self, context: &ModuleContext<'_>) -> Result<String, fmt::Error>;
    fn schema(&self, context: &SchemaContext<'_>) -> Result<String, fmt::Error>;
}

/// Built-in templates
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTemplates;

fn cell(text: &str) -> String {
    multiline(text).replace('|', "\\|")
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn heading(out: &mut String, title: &str, description: Option<&str>) -> fmt::Result {
    writeln!(out, "# {}", title)?;
    if let Some(description) = description {
        writeln!(out)?;
        writeln!(out, "{}", description.trim_end())?;
    }
    Ok(())
}

fn diagram(out: &mut String, diagram: Option<&str>) -> fmt::Result {
    if let Some(diagram) = diagram {
        writeln!(out)?;
        writeln!(out, "## Class diagram")?;
        writeln!(out)?;
        writeln!(out, "```mermaid")?;
        writeln!(out, "{}", diagram)?;
        writeln!(out, "```")?;
    }
    Ok(())
}

/// Links, todos, recorded implementation errors, findings and tags
fn metadata(
    out: &mut String,
    links: &[Link],
    todos: &[String],
    errors: &[ImplementationError],
    findings: &[&Finding],
    tags: &[Tag],
) -> fmt::Result {
    if !links.is_empty() {
        writeln!(out)?;
        writeln!(out, "## Links")?;
        writeln!(out)?;
        for link in links {
            writeln!(out, "- [{}]({})", link.text, link.href)?;
        }
    }
    if !todos.is_empty() {
        writeln!(out)?;
        writeln!(out, "## Todos")?;
        writeln!(out)?;
        for todo in todos {
            writeln!(out, "- {}", multiline(todo))?;
        }
    }
    if !errors.is_empty() || !findings.is_empty() {
        writeln!(out)?;
        writeln!(out, "## Known errors")?;
        writeln!(out)?;
        writeln!(out, "| Type | Text |")?;
        writeln!(out, "|---|---|")?;
        for error in errors {
            writeln!(out, "| {} | {} |", error.error_type.as_str(), cell(&error.text))?;
        }
        for finding in findings {
            writeln!(out, "| {} | {} |", finding.kind.as_str(), cell(&finding.text))?;
        }
    }
    if !tags.is_empty() {
        writeln!(out)?;
        writeln!(out, "## Tags")?;
        writeln!(out)?;
        writeln!(out, "| Name | Value |")?;
        writeln!(out, "|---|---|")?;
        for tag in tags {
            writeln!(out, "| {} | {} |", cell(&tag.name), cell(&tag.value))?;
        }
    }
    Ok(())
}

fn property_row(
    out: &mut String,
    model: &Model,
    handle: SchemaHandle,
    property: &Property<ResolvedRef>,
    required: bool,
) -> fmt::Result {
    let mut notes = Vec::new();
    if property.nullable {
        notes.push("nullable");
    }
    if property.read_only {
        notes.push("read only");
    }
    if property.write_only {
        notes.push("write only");
    }
    if property.deprecated {
        notes.push("deprecated");
    }
    let mut description = property.description.as_deref().map(cell).unwrap_or_default();
    if !notes.is_empty() {
        if !description.is_empty() {
            description.push_str("<br>");
        }
        description.push_str(&format!("_{}_", notes.join(", ")));
    }
    writeln!(
        out,
        "| {} | {} | {} | {} |",
        property.name,
        type_label(model, handle, &property.ty, &property.references),
        if required { "yes" } else { "" },
        description
    )
}

fn definition_body(
    out: &mut String,
    model: &Model,
    handle: SchemaHandle,
    definition: &Definition<ResolvedRef>,
) -> fmt::Result {
    if !definition.parents.is_empty() {
        let parents: Vec<String> = definition
            .parents
            .iter()
            .map(|p| target_link(model, handle, &p.target))
            .collect();
        writeln!(out)?;
        writeln!(out, "Extends {}", parents.join(", "))?;
    }
    if let Some(discriminator) = &definition.discriminator {
        writeln!(out)?;
        writeln!(out, "Discriminator property: `{}`", discriminator.property_name)?;
    }
    match &definition.body {
        DefinitionBody::Object(object) => {
            if !object.one_of.is_empty() {
                let members: Vec<String> = object
                    .one_of
                    .iter()
                    .map(|m| target_link(model, handle, &m.target))
                    .collect();
                writeln!(out)?;
                writeln!(out, "One of {}", members.join(", "))?;
            }
            if !object.properties.is_empty() {
                writeln!(out)?;
                writeln!(out, "| Name | Type | Required | Description |")?;
                writeln!(out, "|---|---|---|---|")?;
                for property in &object.properties {
                    let required = object.is_required(&property.name);
                    property_row(out, model, handle, property, required)?;
                }
            }
        }
        DefinitionBody::Enum(body) => {
            writeln!(out)?;
            writeln!(out, "| Value | Description |")?;
            writeln!(out, "|---|---|")?;
            for value in &body.values {
                let text = value_text(value);
                let description = body.descriptions.get(&text).map(|d| cell(d)).unwrap_or_default();
                writeln!(out, "| {} | {} |", cell(&text), description)?;
            }
        }
        DefinitionBody::Array(items) => {
            writeln!(out)?;
            writeln!(out, "Array of {}", type_label(model, handle, &items.items, &[]))?;
        }
        DefinitionBody::Primitive(primitive) => {
            writeln!(out)?;
            let label = primitive.format.as_deref().unwrap_or(primitive.ty.as_str());
            writeln!(out, "Type: {}", label)?;
        }
    }
    Ok(())
}

impl Templates for DefaultTemplates {
    fn application(&self, context: &ApplicationContext<'_>) -> Result<String, fmt::Error> {
        let application = context.application;
        let mut out = String::new();
        heading(&mut out, &application.title, application.description.as_deref())?;

        if !context.model.modules().is_empty() {
            writeln!(out)?;
            writeln!(out, "## Modules")?;
            writeln!(out)?;
            writeln!(out, "| Module | Description |")?;
            writeln!(out, "|---|---|")?;
            for module in context.model.modules() {
                let link = paths::relative_link("/", &format!("{}/README.md", module.id));
                let description = module.description.as_deref().map(cell).unwrap_or_default();
                writeln!(out, "| [{}]({}) | {} |", module.title, link, description)?;
            }
        }
        diagram(&mut out, context.diagram.as_deref())?;
        metadata(
            &mut out,
            &application.links,
            &context.todos,
            &application.errors,
            &context.findings,
            &application.tags,
        )?;
        Ok(out)
    }

    fn module(&self, context: &ModuleContext<'_>) -> Result<String, fmt::Error> {
        let module = context.module;
        let mut out = String::new();
        heading(&mut out, &module.title, module.description.as_deref())?;

        if !context.schemas.is_empty() {
            writeln!(out)?;
            writeln!(out, "## Schemas")?;
            writeln!(out)?;
            writeln!(out, "| Schema | Type | Description |")?;
            writeln!(out, "|---|---|---|")?;
            for (_, schema) in &context.schemas {
                let link = paths::relative_link(&module.id, &page_of(&schema.id));
                let description = schema
                    .definition
                    .description
                    .as_deref()
                    .map(cell)
                    .unwrap_or_default();
                writeln!(
                    out,
                    "| [{}]({}) | {} | {} |",
                    schema.title, link, schema.schema_type, description
                )?;
            }
        }
        diagram(&mut out, context.diagram.as_deref())?;
        metadata(
            &mut out,
            &module.links,
            &context.todos,
            &module.errors,
            &context.findings,
            &module.tags,
        )?;
        Ok(out)
    }

    fn schema(&self, context: &SchemaContext<'_>) -> Result<String, fmt::Error> {
        let (model, handle, schema) = (context.model, context.handle, context.schema);
        let mut out = String::new();
        heading(&mut out, &schema.title, schema.definition.description.as_deref())?;

        writeln!(out)?;
        writeln!(out, "| | |")?;
        writeln!(out, "|---|---|")?;
        if let Some(module) = context.module {
            writeln!(out, "| Module | [{}](./README.md) |", module.title)?;
        }
        writeln!(out, "| Schema type | {} |", schema.schema_type)?;
        writeln!(out, "| Kind | {} |", schema.kind().as_str())?;

        for base in &schema.variant_of {
            let base = model.schema(*base);
            let link = paths::relative_link(schema.module_id(), &page_of(&base.id));
            writeln!(out)?;
            writeln!(out, "Variant of [{}]({})", base.title, link)?;
        }

        definition_body(&mut out, model, handle, &schema.definition)?;

        if !schema.variants.is_empty() {
            writeln!(out)?;
            writeln!(out, "## Variants")?;
            writeln!(out)?;
            writeln!(out, "| Value | Schema | Declared |")?;
            writeln!(out, "|---|---|---|")?;
            for variant in &schema.variants {
                writeln!(
                    out,
                    "| {} | {} | {} |",
                    variant.value.as_deref().map(cell).unwrap_or_default(),
                    target_link(model, handle, &variant.target),
                    if variant.declared { "yes" } else { "no" }
                )?;
            }
        }

        if !schema.definitions.is_empty() {
            writeln!(out)?;
            writeln!(out, "## Definitions")?;
            for (name, definition) in &schema.definitions {
                writeln!(out)?;
                writeln!(out, "<a name=\"{}\"></a>", name)?;
                writeln!(out)?;
                writeln!(out, "### {}", definition.title.as_deref().unwrap_or(name))?;
                if let Some(description) = &definition.description {
                    writeln!(out)?;
                    writeln!(out, "{}", description.trim_end())?;
                }
                definition_body(&mut out, model, handle, definition)?;
            }
        }

        if !schema.examples.is_empty() {
            writeln!(out)?;
            writeln!(out, "## Examples")?;
            for example in &schema.examples {
                let json = serde_json::to_string_pretty(&example.value).map_err(|_| fmt::Error)?;
                writeln!(out)?;
                writeln!(out, "```json")?;
                writeln!(out, "{}", json)?;
                writeln!(out, "```")?;
            }
        }

        diagram(&mut out, context.diagram.as_deref())?;
        metadata(
            &mut out,
            &schema.links,
            &context.todos,
            &schema.errors,
            &context.findings,
            &schema.tags,
        )?;
        Ok(out)
    }
}

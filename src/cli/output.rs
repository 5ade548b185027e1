//! Output formatting for CLI

use crate::models::{FindingSubject, Model};
use crate::pipeline::RunReport;
use crate::validation::ValidationErrors;

fn subject_label(model: &Model, subject: &FindingSubject) -> String {
    match subject {
        FindingSubject::Application => "application".to_string(),
        FindingSubject::Module(id) => format!("module {}", id),
        FindingSubject::Schema(handle) => format!("schema {}", model.schema(*handle).id),
    }
}

/// Summary of a finished run
pub fn format_report(report: &RunReport) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "Documented {} schema(s) in {} module(s) in {} ms\n",
        report.schemas, report.modules, report.duration_ms
    ));
    let stages: Vec<&str> = report.stages_completed.iter().map(|s| s.name()).collect();
    output.push_str(&format!("  Stages: {}\n", stages.join(", ")));
    output.push_str(&format!("  Run id: {}\n", report.run_id));

    if !report.findings.is_empty() {
        output.push_str(&format!("\nFindings ({}):\n", report.findings.len()));
        for finding in &report.findings {
            output.push_str(&format!(
                "  - [{}] {}: {}\n",
                finding.kind.as_str(),
                subject_label(&report.model, &finding.subject),
                finding.text
            ));
        }
    }
    output
}

/// Summary of a model that was read without errors
pub fn format_model_summary(model: &Model) -> String {
    let mut output = format!(
        "Model '{}' is valid: {} module(s), {} schema(s)\n",
        model.application().title,
        model.modules().len(),
        model.schemas().len()
    );
    for module in model.modules() {
        let count = model
            .handles()
            .filter(|h| model.schema(*h).module_id() == module.id)
            .count();
        output.push_str(&format!("  - {} ({} schema(s))\n", module.id, count));
    }
    output
}

/// One line per error, grouped under a count
pub fn format_errors(errors: &ValidationErrors) -> String {
    let mut output = format!("{} error(s):\n", errors.len());
    for error in errors.iter() {
        output.push_str(&format!("  - {}\n", error));
    }
    output
}

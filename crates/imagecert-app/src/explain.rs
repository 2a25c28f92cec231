//! The `list` and `explain` use cases: describe registered checks.

use imagecert_engine::{CheckRegistry, Requirement};
use imagecert_types::{HelpText, Metadata};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckDescription {
    pub name: String,
    pub policies: Vec<String>,
    pub requirement: Requirement,
    pub metadata: Metadata,
    pub help: HelpText,
}

/// Output from the explain use case.
#[derive(Clone, Debug)]
pub enum ExplainOutput {
    Found(CheckDescription),
    /// Unknown check; includes the available names.
    NotFound {
        identifier: String,
        available: Vec<String>,
    },
}

pub fn run_list(registry: &CheckRegistry) -> Vec<CheckDescription> {
    registry
        .checks()
        .map(|check| describe(registry, check.name()))
        .collect::<Option<Vec<_>>>()
        .unwrap_or_default()
}

/// Look up a check by name (case-insensitive).
pub fn run_explain(registry: &CheckRegistry, identifier: &str) -> ExplainOutput {
    let found = registry
        .checks()
        .find(|c| c.name().eq_ignore_ascii_case(identifier.trim()))
        .and_then(|c| describe(registry, c.name()));

    match found {
        Some(description) => ExplainOutput::Found(description),
        None => ExplainOutput::NotFound {
            identifier: identifier.to_string(),
            available: registry.checks().map(|c| c.name().to_string()).collect(),
        },
    }
}

fn describe(registry: &CheckRegistry, name: &str) -> Option<CheckDescription> {
    let check = registry.lookup(name)?;
    Some(CheckDescription {
        name: check.name().to_string(),
        policies: registry
            .policies_of(name)
            .into_iter()
            .map(str::to_string)
            .collect(),
        requirement: check.requirement(),
        metadata: check.metadata(),
        help: check.help(),
    })
}

fn requirement_label(requirement: Requirement) -> &'static str {
    match requirement {
        Requirement::Reference => "image reference",
        Requirement::Filesystem => "extracted filesystem",
        Requirement::Mount => "mounted image (sandboxed)",
    }
}

/// One line per check: name, policies, description.
pub fn format_list(checks: &[CheckDescription]) -> String {
    let width = checks.iter().map(|c| c.name.len()).max().unwrap_or(0);
    let mut out = String::new();
    for check in checks {
        out.push_str(&format!(
            "{:width$}  [{}]  {}\n",
            check.name,
            check.policies.join(","),
            check.metadata.description,
        ));
    }
    out
}

/// Format an explanation for terminal display.
pub fn format_explanation(check: &CheckDescription) -> String {
    let mut out = String::new();

    out.push_str(&check.name);
    out.push('\n');
    out.push_str(&"=".repeat(check.name.len()));
    out.push_str("\n\n");
    out.push_str(&check.metadata.description);
    out.push_str("\n\n");
    let level = format!("{:?}", check.metadata.level).to_lowercase();
    out.push_str(&format!("Level:     {level}\n"));
    out.push_str(&format!("Policies:  {}\n", check.policies.join(", ")));
    out.push_str(&format!(
        "Needs:     {}\n",
        requirement_label(check.requirement)
    ));
    if let Some(url) = &check.metadata.knowledge_base_url {
        out.push_str(&format!("Docs:      {url}\n"));
    }
    out.push('\n');
    out.push_str("Remediation\n");
    out.push_str("-----------\n");
    out.push_str(&check.help.message);
    out.push('\n');
    out.push_str(&check.help.suggestion);
    out.push('\n');

    out
}

/// Format the "not found" error message for terminal display.
pub fn format_not_found(identifier: &str, available: &[String]) -> String {
    let mut out = String::new();

    out.push_str(&format!("Unknown check: {identifier}\n\n"));
    out.push_str("Available checks:\n");
    for name in available {
        out.push_str(&format!("  - {name}\n"));
    }

    out
}

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How strongly a check's outcome counts toward certification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Best,
    Good,
    Warn,
}

/// Descriptive metadata attached to every check and copied into its result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Metadata {
    pub description: String,
    pub level: Level,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_url: Option<String>,
}

impl Metadata {
    pub fn new(description: impl Into<String>, level: Level) -> Self {
        Self {
            description: description.into(),
            level,
            knowledge_base_url: None,
            check_url: None,
        }
    }
}

/// Remediation guidance shown when a check does not pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HelpText {
    pub message: String,
    pub suggestion: String,
}

impl HelpText {
    pub fn new(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }
}

//! Static catalog of analysis models a job may select.

use serde::Serialize;

/// A model the external worker knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub provider: &'static str,
    /// Used when a submission does not name a model.
    pub default: bool,
}

/// All selectable models. Exactly one entry is the default.
pub const MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "gpt-4o",
        name: "GPT-4o",
        provider: "openai",
        default: true,
    },
    ModelInfo {
        id: "gpt-4o-mini",
        name: "GPT-4o mini",
        provider: "openai",
        default: false,
    },
    ModelInfo {
        id: "claude-3-5-sonnet",
        name: "Claude 3.5 Sonnet",
        provider: "anthropic",
        default: false,
    },
    ModelInfo {
        id: "llama-3.1-70b",
        name: "Llama 3.1 70B",
        provider: "meta",
        default: false,
    },
];

/// Look up a model by id.
pub fn find_model(id: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.id == id)
}

/// The catalog default.
pub fn default_model() -> &'static ModelInfo {
    MODELS.iter().find(|m| m.default).unwrap_or(&MODELS[0])
}

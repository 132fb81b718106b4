use std::{borrow::Cow, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One scored dimension of text quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricId {
    Reasoning,
    Factual,
    Creativity,
    Conciseness,
    Relevance,
}

impl MetricId {
    /// Fixed metric order. Fallback segmentation cycles through this list.
    pub const ALL: [MetricId; 5] = [
        MetricId::Reasoning,
        MetricId::Factual,
        MetricId::Creativity,
        MetricId::Conciseness,
        MetricId::Relevance,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricId::Reasoning => "reasoning",
            MetricId::Factual => "factual",
            MetricId::Creativity => "creativity",
            MetricId::Conciseness => "conciseness",
            MetricId::Relevance => "relevance",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MetricId::Reasoning => "Reasoning",
            MetricId::Factual => "Factual",
            MetricId::Creativity => "Creativity",
            MetricId::Conciseness => "Conciseness",
            MetricId::Relevance => "Relevance",
        }
    }

    /// Case-insensitive lookup that ignores surrounding whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim();
        Self::ALL
            .into_iter()
            .find(|metric| metric.as_str().eq_ignore_ascii_case(key))
    }

    pub fn index(self) -> usize {
        match self {
            MetricId::Reasoning => 0,
            MetricId::Factual => 1,
            MetricId::Creativity => 2,
            MetricId::Conciseness => 3,
            MetricId::Relevance => 4,
        }
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown metric '{0}'")]
pub struct UnknownMetric(pub String);

impl FromStr for MetricId {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UnknownMetric(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownModel {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

/// Backends the client knows how to present. Ids are canonical.
pub const KNOWN_MODELS: [KnownModel; 4] = [
    KnownModel {
        id: "gpt-4o",
        name: "GPT-4o",
        description: "Most capable model for complex tasks",
    },
    KnownModel {
        id: "gpt-4o-mini",
        name: "GPT-4o Mini",
        description: "Balanced performance and speed",
    },
    KnownModel {
        id: "claude-3",
        name: "Claude 3",
        description: "Excellent for creative writing and nuance",
    },
    KnownModel {
        id: "llama-3",
        name: "Llama 3",
        description: "Fast processing for shorter content",
    },
];

// Keys are lowercase; every canonical id maps to itself so lookups stay idempotent.
const MODEL_ALIASES: &[(&str, &str)] = &[
    ("gpt-4o", "gpt-4o"),
    ("gpt4o", "gpt-4o"),
    ("gpt-4-o", "gpt-4o"),
    ("chatgpt", "gpt-4o"),
    ("openai", "gpt-4o"),
    ("gpt-4o-mini", "gpt-4o-mini"),
    ("gpt4o-mini", "gpt-4o-mini"),
    ("gpt-4o mini", "gpt-4o-mini"),
    ("gpt-4o_mini", "gpt-4o-mini"),
    ("gemini", "gpt-4o-mini"),
    ("claude-3", "claude-3"),
    ("claude3", "claude-3"),
    ("claude 3", "claude-3"),
    ("claude", "claude-3"),
    ("llama-3", "llama-3"),
    ("llama3", "llama-3"),
    ("llama 3", "llama-3"),
    ("llama", "llama-3"),
];

/// Resolves a raw model identifier to its canonical spelling.
///
/// Total and idempotent: anything not in the alias table comes back unchanged,
/// and every canonical id resolves to itself.
pub fn canon(raw: &str) -> Cow<'_, str> {
    let key = raw.trim().to_ascii_lowercase();
    match MODEL_ALIASES.iter().find(|(alias, _)| *alias == key) {
        Some((_, canonical)) => Cow::Borrowed(canonical),
        None => Cow::Borrowed(raw),
    }
}

/// Canonical backend identifier. Every constructor runs [`canon`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ModelId(String);

impl ModelId {
    pub fn new(raw: &str) -> Self {
        Self(canon(raw).into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Runs the current alias table again over a stored id.
    pub fn recanonicalized(&self) -> Self {
        Self::new(&self.0)
    }

    pub fn known(&self) -> Option<&'static KnownModel> {
        KNOWN_MODELS.iter().find(|model| model.id == self.0)
    }

    pub fn display_name(&self) -> &str {
        match self.known() {
            Some(model) => model.name,
            None => &self.0,
        }
    }
}

impl From<String> for ModelId {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl From<&str> for ModelId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<ModelId> for String {
    fn from(value: ModelId) -> Self {
        value.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identity supplied by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Returns `None` for blank input.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    Analysis,
    Editor,
    Chat,
}

impl HistoryKind {
    pub const ALL: [HistoryKind; 3] = [HistoryKind::Analysis, HistoryKind::Editor, HistoryKind::Chat];

    pub fn as_str(self) -> &'static str {
        match self {
            HistoryKind::Analysis => "analysis",
            HistoryKind::Editor => "editor",
            HistoryKind::Chat => "chat",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canon_collapses_service_names_and_spellings() {
        assert_eq!(canon("chatgpt"), "gpt-4o");
        assert_eq!(canon("GPT-4o"), "gpt-4o");
        assert_eq!(canon(" gemini "), "gpt-4o-mini");
        assert_eq!(canon("Claude"), "claude-3");
        assert_eq!(canon("llama3"), "llama-3");
    }

    #[test]
    fn canon_passes_unknown_ids_through_unchanged() {
        assert_eq!(canon("mistral-large"), "mistral-large");
        assert_eq!(canon("  Weird Model "), "  Weird Model ");
        assert_eq!(canon(""), "");
    }

    #[test]
    fn canon_is_idempotent() {
        let samples = [
            "gpt-4o", "GPT4O", "chatgpt", "gemini", "gpt-4o mini", "claude", "Claude 3",
            "llama", "LLAMA-3", "unknown", " padded ", "", "gpt-5",
        ];
        for raw in samples {
            let once = canon(raw).into_owned();
            let twice = canon(&once).into_owned();
            assert_eq!(once, twice, "canon not idempotent for {raw:?}");
        }
    }

    #[test]
    fn every_alias_target_is_a_known_model() {
        for (_, canonical) in MODEL_ALIASES {
            assert!(KNOWN_MODELS.iter().any(|model| model.id == *canonical));
            assert_eq!(canon(canonical), *canonical);
        }
    }

    #[test]
    fn model_id_deserializes_through_alias_table() {
        let model: ModelId = serde_json::from_str("\"claude\"").expect("model id");
        assert_eq!(model.as_str(), "claude-3");
        assert_eq!(model.display_name(), "Claude 3");
        assert_eq!(serde_json::to_string(&model).expect("json"), "\"claude-3\"");
    }

    #[test]
    fn metric_ids_parse_case_insensitively() {
        assert_eq!(MetricId::parse(" Factual "), Some(MetricId::Factual));
        assert_eq!("relevance".parse::<MetricId>(), Ok(MetricId::Relevance));
        assert!("tone".parse::<MetricId>().is_err());
        for (index, metric) in MetricId::ALL.into_iter().enumerate() {
            assert_eq!(metric.index(), index);
        }
    }

    #[test]
    fn user_id_rejects_blank_values() {
        assert!(UserId::new("   ").is_none());
        assert_eq!(UserId::new(" u-1 ").map(|id| id.as_str().to_string()), Some("u-1".into()));
    }
}

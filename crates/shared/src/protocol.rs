use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{HistoryKind, MetricId, ModelId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotateRequest {
    pub user_id: UserId,
    pub text: String,
    pub models: BTreeMap<MetricId, ModelId>,
}

/// One `{text, type}` item of an annotation response. `type` stays raw until
/// the segment parser resolves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSegment {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnnotateResponse {
    #[serde(default)]
    pub analysis: Vec<AnalysisSegment>,
    #[serde(default)]
    pub percentages: BTreeMap<String, f64>,
    #[serde(default)]
    pub models: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefineSegment {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: MetricId,
    pub model: ModelId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineRequest {
    pub user_id: UserId,
    pub full_text: String,
    pub instruction: String,
    pub segments: Vec<RefineSegment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineResponse {
    pub enhanced_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: Uuid,
    pub kind: HistoryKind,
    pub title: String,
    pub content: String,
    pub original_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
    #[serde(default)]
    pub models: BTreeMap<MetricId, ModelId>,
    pub created_at: DateTime<Utc>,
}

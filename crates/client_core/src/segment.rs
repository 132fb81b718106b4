//! Text divided into ordered, non-overlapping labeled spans.
//!
//! Every list produced here satisfies the coverage invariant: concatenating
//! the segment texts in order reproduces the source text exactly.

use std::ops::Range;

use serde::Serialize;
use shared::{domain::MetricId, protocol::AnalysisSegment};
use thiserror::Error;

const SENTENCE_DELIMITER: &str = ". ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    text: String,
    metric: MetricId,
}

impl Segment {
    /// `None` for empty text; segments are never empty.
    pub fn new(text: impl Into<String>, metric: MetricId) -> Option<Self> {
        let text = text.into();
        if text.is_empty() {
            None
        } else {
            Some(Self { text, metric })
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn metric(&self) -> MetricId {
        self.metric
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SegmentError {
    #[error("analysis item {index} has empty text")]
    EmptySegment { index: usize },
    #[error("analysis item {index} has unknown type '{kind}'")]
    UnknownMetric { index: usize, kind: String },
    #[error("analysis segments do not reproduce the submitted text")]
    CoverageMismatch,
}

/// Local segmentation: split on `". "`, keep the delimiter on every chunk but
/// the last, and label chunk `i` with `MetricId::ALL[i % 5]`.
pub fn build_from_sentences(text: &str) -> Vec<Segment> {
    if text.is_empty() {
        return Vec::new();
    }

    let chunks: Vec<&str> = text.split(SENTENCE_DELIMITER).collect();
    let last = chunks.len() - 1;
    chunks
        .into_iter()
        .enumerate()
        .filter_map(|(index, chunk)| {
            let metric = MetricId::ALL[index % MetricId::ALL.len()];
            let text = if index < last {
                format!("{chunk}{SENTENCE_DELIMITER}")
            } else {
                chunk.to_string()
            };
            // A text ending in ". " leaves an empty final chunk.
            Segment::new(text, metric)
        })
        .collect()
}

pub fn covers(segments: &[Segment], text: &str) -> bool {
    let mut rest = text;
    for segment in segments {
        match rest.strip_prefix(segment.text()) {
            Some(tail) => rest = tail,
            None => return false,
        }
    }
    rest.is_empty()
}

/// Uses service-supplied segments verbatim, provided they cover `text`.
pub fn segments_from_analysis(
    analysis: &[AnalysisSegment],
    text: &str,
) -> Result<Vec<Segment>, SegmentError> {
    let segments = analysis
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let metric = MetricId::parse(&item.kind).ok_or_else(|| SegmentError::UnknownMetric {
                index,
                kind: item.kind.clone(),
            })?;
            Segment::new(item.text.clone(), metric).ok_or(SegmentError::EmptySegment { index })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if covers(&segments, text) {
        Ok(segments)
    } else {
        Err(SegmentError::CoverageMismatch)
    }
}

/// Byte ranges of each segment within the text they cover.
pub fn spans(segments: &[Segment]) -> impl Iterator<Item = (Range<usize>, MetricId)> + '_ {
    segments.iter().scan(0usize, |offset, segment| {
        let start = *offset;
        *offset += segment.text().len();
        Some((start..*offset, segment.metric()))
    })
}

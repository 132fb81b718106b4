//! Highlighted editor: an invisible `TextEdit` stacked over a painted copy of
//! the same text whose segments carry metric background colors.
//!
//! Both layers are laid out from the same font, padding and wrap width, so a
//! character sits at the same pixel in each. The painted layer follows the
//! editable layer's scroll offset, never the other way round.

use std::{cell::Cell, ops::Range, sync::Arc};

use client_core::segment::{covers, spans, Segment};
use eframe::egui;
use egui::{
    text::{LayoutJob, TextFormat},
    Color32, FontId, Galley, Pos2, Shape, Vec2,
};
use shared::domain::MetricId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricPalette {
    pub background: Color32,
    pub foreground: Color32,
}

pub const fn metric_palette(metric: MetricId) -> MetricPalette {
    let (background, foreground) = match metric {
        MetricId::Reasoning => (
            Color32::from_rgb(0xDB, 0xEA, 0xFE),
            Color32::from_rgb(0x1E, 0x40, 0xAF),
        ),
        MetricId::Factual => (
            Color32::from_rgb(0xDC, 0xFC, 0xE7),
            Color32::from_rgb(0x16, 0x65, 0x34),
        ),
        MetricId::Creativity => (
            Color32::from_rgb(0xF3, 0xE8, 0xFF),
            Color32::from_rgb(0x6B, 0x21, 0xA8),
        ),
        MetricId::Conciseness => (
            Color32::from_rgb(0xFE, 0xF9, 0xC3),
            Color32::from_rgb(0x85, 0x4D, 0x0E),
        ),
        MetricId::Relevance => (
            Color32::from_rgb(0xFE, 0xE2, 0xE2),
            Color32::from_rgb(0x99, 0x1B, 0x1B),
        ),
    };
    MetricPalette {
        background,
        foreground,
    }
}

/// A byte range of the text and the metric that colors it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightRun {
    pub range: Range<usize>,
    pub metric: Option<MetricId>,
}

/// Runs covering `text` end to end. Falls back to one uncolored run when the
/// segments are empty or no longer reproduce `text`.
pub fn highlight_runs(text: &str, segments: &[Segment]) -> Vec<HighlightRun> {
    if text.is_empty() {
        return Vec::new();
    }
    if segments.is_empty() || !covers(segments, text) {
        return vec![HighlightRun {
            range: 0..text.len(),
            metric: None,
        }];
    }
    spans(segments)
        .map(|(range, metric)| HighlightRun {
            range,
            metric: Some(metric),
        })
        .collect()
}

pub fn editable_layout_job(text: &str, font: FontId, wrap_width: f32) -> LayoutJob {
    let mut job = LayoutJob::single_section(
        text.to_owned(),
        TextFormat {
            font_id: font,
            color: Color32::TRANSPARENT,
            ..Default::default()
        },
    );
    job.wrap.max_width = wrap_width;
    job
}

pub fn highlighted_layout_job(
    text: &str,
    segments: &[Segment],
    font: FontId,
    wrap_width: f32,
    plain_color: Color32,
) -> LayoutJob {
    let mut job = LayoutJob::default();
    job.wrap.max_width = wrap_width;
    for run in highlight_runs(text, segments) {
        let (background, color) = match run.metric {
            Some(metric) => {
                let palette = metric_palette(metric);
                (palette.background, palette.foreground)
            }
            None => (Color32::TRANSPARENT, plain_color),
        };
        job.append(
            &text[run.range],
            0.0,
            TextFormat {
                font_id: font.clone(),
                color,
                background,
                ..Default::default()
            },
        );
    }
    job
}

/// One-way copy of the editable layer's scroll offset.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollMirror {
    offset: Vec2,
}

impl ScrollMirror {
    /// Returns whether the offset moved since the last frame.
    pub fn sync(&mut self, source_offset: Vec2) -> bool {
        let moved = self.offset != source_offset;
        self.offset = source_offset;
        moved
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Screen position of an unscrolled content position inside a viewport.
    pub fn project(&self, viewport_min: Pos2, content_pos: Vec2) -> Pos2 {
        viewport_min + content_pos - self.offset
    }
}

#[derive(Debug, Clone)]
pub struct OverlayStyle {
    pub font: FontId,
    pub padding: i8,
    pub text_color: Color32,
    pub caret_color: Color32,
    pub min_rows: usize,
}

impl OverlayStyle {
    pub fn new(text_size: f32, visuals: &egui::Visuals) -> Self {
        Self {
            font: FontId::proportional(text_size),
            padding: 12,
            text_color: visuals.strong_text_color(),
            caret_color: visuals.strong_text_color(),
            min_rows: 12,
        }
    }
}

pub struct OverlayOutput {
    /// The user edited the text this frame.
    pub changed: bool,
    pub response: egui::Response,
}

pub fn show(
    ui: &mut egui::Ui,
    id_salt: &str,
    text: &mut String,
    segments: &[Segment],
    style: &OverlayStyle,
    interactive: bool,
    mirror: &mut ScrollMirror,
) -> OverlayOutput {
    // Reserved now so the painted layer ends up beneath the editor.
    let background = ui.painter().add(Shape::Noop);
    let wrap_width = Cell::new(f32::INFINITY);
    let mut layouter = |ui: &egui::Ui, buf: &dyn egui::TextBuffer, wrap: f32| -> Arc<Galley> {
        wrap_width.set(wrap);
        ui.painter()
            .layout_job(editable_layout_job(buf.as_str(), style.font.clone(), wrap))
    };

    let scroll = egui::ScrollArea::vertical()
        .id_salt(id_salt)
        .auto_shrink([false, false])
        .show(ui, |ui| {
            let content_origin = ui.min_rect().min;
            ui.visuals_mut().text_cursor.stroke.color = style.caret_color;
            let output = egui::TextEdit::multiline(text)
                .id_salt((id_salt, "editable"))
                .font(style.font.clone())
                .text_color(Color32::TRANSPARENT)
                .frame(false)
                .margin(egui::Margin::same(style.padding))
                .desired_width(f32::INFINITY)
                .desired_rows(style.min_rows)
                .interactive(interactive)
                .layouter(&mut layouter)
                .show(ui);
            (output.galley_pos - content_origin, output.response)
        });
    let (galley_offset, response) = scroll.inner;
    mirror.sync(scroll.state.offset);

    let job = highlighted_layout_job(
        text,
        segments,
        style.font.clone(),
        wrap_width.get(),
        style.text_color,
    );
    let galley = ui.painter().layout_job(job);
    let origin = mirror.project(scroll.inner_rect.min, galley_offset);
    ui.painter()
        .with_clip_rect(scroll.inner_rect)
        .set(background, Shape::galley(origin, galley, style.text_color));

    OverlayOutput {
        changed: response.changed(),
        response,
    }
}

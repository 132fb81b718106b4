//! UI layer: the app shell and the highlighted editor widget.

pub mod app;
pub mod overlay;

pub use app::{AnnotatorApp, PersistedAnnotatorSettings, SETTINGS_STORAGE_KEY};

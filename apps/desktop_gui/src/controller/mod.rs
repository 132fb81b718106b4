//! Controller layer: UI events, error modeling, and command orchestration.

pub mod events;
pub mod orchestration;

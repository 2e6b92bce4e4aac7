//! Shared types for the insole recommender.
//!
//! - [`ArchType`], [`LegShape`] - the closed label sets
//! - [`recommend`] - static (arch, leg) to insole number table
//! - [`decode_pressure`] - 12-bit packed sensor payload to a 60×60 [`PressureMatrix`]
//!
//! [`recommend_labels`] and [`explanation_for_label`] take free-form label text
//! (English or Japanese) for callers that hold labels rather than enums; the
//! `insole` binary works with the parsed enums directly.

mod error;
mod pressure;
mod recommendation;
mod types;

pub use error::DecodeError;
pub use pressure::{
    decode_pressure, PressureMatrix, GRID_SIZE, MAX_PRESSURE, PAYLOAD_LEN, SAMPLE_COUNT,
    SENSOR_FRAME_LEN,
};
pub use recommendation::{
    arch_explanation, explanation_for_label, leg_explanation, recommend, recommend_labels,
    RECOMMENDATIONS, NO_INFORMATION,
};
pub use types::{ArchThresholds, ArchType, Assessment, LegShape, PaperSize, UnknownLabel};

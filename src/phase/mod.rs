//! Breathing patterns and the time-to-phase model.

pub(crate) mod model;
pub(crate) mod pattern;

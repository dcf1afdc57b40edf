//! The frame-exact recording pipeline and its collaborators.

pub(crate) mod config;
pub(crate) mod events;
pub(crate) mod naming;
pub(crate) mod recorder;
pub(crate) mod ui;

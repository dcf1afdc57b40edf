//! Frame rendering contract, the reference CPU renderer, and encoder pixel buffers.

pub(crate) mod backend;
pub(crate) mod buffer;
pub(crate) mod cpu;

/// Result alias used throughout the crate.
pub type BreathcastResult<T> = Result<T, BreathcastError>;

/// Error type shared by every stage of the recording pipeline.
///
/// `EncoderOpen` and `EncoderWrite` are fatal to a recording. `FrameRender` and `BufferCreation`
/// are per-frame failures that the recorder answers by skipping the frame.
#[derive(thiserror::Error, Debug)]
pub enum BreathcastError {
    /// Invalid request, configuration or argument values.
    #[error("validation error: {0}")]
    Validation(String),

    /// The encoder could not be opened (bad path, missing `ffmpeg`, rejected settings).
    #[error("encoder open failed: {0}")]
    EncoderOpen(String),

    /// The encoder faulted while writing or finalizing.
    #[error("encoder write failed: {0}")]
    EncoderWrite(String),

    /// The frame renderer could not produce an image.
    #[error("frame render failed: {0}")]
    FrameRender(String),

    /// A rendered image could not be turned into an encoder pixel buffer.
    #[error("buffer creation failed: {0}")]
    BufferCreation(String),

    /// Wrapped error with context (typically I/O).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BreathcastError {
    /// Build a [`BreathcastError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`BreathcastError::EncoderOpen`].
    pub fn encoder_open(msg: impl Into<String>) -> Self {
        Self::EncoderOpen(msg.into())
    }

    /// Build a [`BreathcastError::EncoderWrite`].
    pub fn encoder_write(msg: impl Into<String>) -> Self {
        Self::EncoderWrite(msg.into())
    }

    /// Build a [`BreathcastError::FrameRender`].
    pub fn frame_render(msg: impl Into<String>) -> Self {
        Self::FrameRender(msg.into())
    }

    /// Build a [`BreathcastError::BufferCreation`].
    pub fn buffer_creation(msg: impl Into<String>) -> Self {
        Self::BufferCreation(msg.into())
    }

    /// `true` for errors the recorder recovers from by skipping a single frame.
    pub fn is_per_frame(&self) -> bool {
        matches!(self, Self::FrameRender(_) | Self::BufferCreation(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;

//! Image tool trait and shared types.
//!
//! The [`ImageTool`] trait is the seam between the asset pipeline and
//! whatever performs a conversion. The production implementation is
//! [`MagickTool`](super::magick::MagickTool), which runs an external
//! converter as a subprocess.

use super::params::ConvertParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Trait for image converters.
///
/// Implementations must be `Sync`: conversions run on a rayon pool and share
/// one tool instance.
pub trait ImageTool: Sync {
    /// Produce `params.output` from `params.source`.
    fn convert(&self, params: &ConvertParams) -> Result<(), ToolError>;
}

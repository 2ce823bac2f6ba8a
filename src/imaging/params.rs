//! Parameter types for image conversions.
//!
//! These structs describe *what* to produce, not *how*. The asset pipeline
//! plans a list of [`ConvertParams`] and hands them to an
//! [`ImageTool`](super::backend::ImageTool), which does the actual work.
//! Keeping the plan as plain data lets tests swap in a recording mock.

use std::fmt;
use std::path::PathBuf;

/// Which derived copy a conversion produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// Resized full copy for the species page.
    Full,
    /// Small cropped copy for listings.
    Thumbnail,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Full => write!(f, "full"),
            Variant::Thumbnail => write!(f, "thumb"),
        }
    }
}

/// One planned conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub variant: Variant,
}

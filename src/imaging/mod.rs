//! Image conversion through an external tool.
//!
//! | Output | Options |
//! |---|---|
//! | **Full copy** | `images.full_options` |
//! | **Thumbnail** | `images.thumb_options` |
//!
//! The module is split into:
//! - **Parameters**: [`ConvertParams`] describing one planned conversion
//! - **Backend**: [`ImageTool`] trait, the seam tests mock out
//! - **Magick**: [`MagickTool`], the subprocess implementation

pub mod backend;
pub mod magick;
mod params;

pub use backend::{ImageTool, ToolError};
pub use magick::MagickTool;
pub use params::{ConvertParams, Variant};

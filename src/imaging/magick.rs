//! External converter backend.
//!
//! Runs the configured program once per conversion:
//!
//! ```text
//! convert <source> <options...> <output>
//! ```
//!
//! Arguments are passed directly to the process, never through a shell, so
//! filenames with spaces or quotes need no escaping.

use super::backend::{ImageTool, ToolError};
use super::params::{ConvertParams, Variant};
use crate::config::ImagesConfig;
use std::ffi::OsString;
use std::process::Command;

#[derive(Debug, Clone)]
pub struct MagickTool {
    program: String,
    full_options: Vec<String>,
    thumb_options: Vec<String>,
}

impl MagickTool {
    pub fn new(program: &str, full_options: Vec<String>, thumb_options: Vec<String>) -> Self {
        Self {
            program: program.to_string(),
            full_options,
            thumb_options,
        }
    }

    pub fn from_config(config: &ImagesConfig) -> Self {
        Self::new(
            &config.tool,
            config.full_options.clone(),
            config.thumb_options.clone(),
        )
    }

    /// Arguments for one conversion, in call order.
    pub fn args(&self, params: &ConvertParams) -> Vec<OsString> {
        let options = match params.variant {
            Variant::Full => &self.full_options,
            Variant::Thumbnail => &self.thumb_options,
        };
        let mut args = Vec::with_capacity(options.len() + 2);
        args.push(params.source.clone().into_os_string());
        args.extend(options.iter().map(OsString::from));
        args.push(params.output.clone().into_os_string());
        args
    }
}

impl ImageTool for MagickTool {
    fn convert(&self, params: &ConvertParams) -> Result<(), ToolError> {
        tracing::debug!(
            program = %self.program,
            source = %params.source.display(),
            output = %params.output.display(),
            "running converter"
        );
        let output = Command::new(&self.program).args(self.args(params)).output()?;
        if !output.status.success() {
            return Err(ToolError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

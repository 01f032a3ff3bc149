//! Resize and re-encode parameters for one request.

use std::fmt;
use std::str::FromStr;

use crate::constants::DEFAULT_WIDTH;

/// Output format for encoded images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
    WebP,
    Avif,
}

impl OutputFormat {
    /// Parse the `t` query value. `jpg` is accepted as an alias for `jpeg`.
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            "avif" => Ok(OutputFormat::Avif),
            _ => Err(format!(
                "Invalid image type '{}', expected one of: jpeg, jpg, png, webp, avif",
                s
            )),
        }
    }

    pub fn to_mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
            OutputFormat::Avif => "image/avif",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
            OutputFormat::Avif => "avif",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target size and encoding.
///
/// Bounds are checked by the request validator before a spec is built; the
/// pipeline trusts what it receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformSpec {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub format: OutputFormat,
}

impl TransformSpec {
    /// Build a spec, falling back to [`DEFAULT_WIDTH`] when no dimension is given.
    pub fn new(width: Option<u32>, height: Option<u32>, format: OutputFormat) -> Self {
        let width = match (width, height) {
            (None, None) => Some(DEFAULT_WIDTH),
            _ => width,
        };
        TransformSpec {
            width,
            height,
            format,
        }
    }
}

impl Default for TransformSpec {
    /// Default-width JPEG, the same as a request without parameters.
    fn default() -> Self {
        Self::new(None, None, OutputFormat::default())
    }
}

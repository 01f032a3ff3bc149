//! Where the bytes for a request come from.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::constants::PHOTO_EXTENSION;

/// `<stem>.jpg` where the stem is limited to ASCII letters, digits, `-` and `_`.
static PHOTO_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-_a-zA-Z0-9]+\.jpg$").expect("photo name pattern is a valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhotoNameError {
    #[error("image name must not be empty")]
    Empty,

    #[error("image name '{0}' must look like 'name.jpg' using only letters, digits, '-' or '_'")]
    InvalidPattern(String),
}

/// A validated photo filename.
///
/// The only way to build one is [`PhotoName::parse`], so any `PhotoName`
/// is a bare filename that cannot climb out of the photo directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhotoName(String);

impl PhotoName {
    pub fn parse(raw: &str) -> Result<Self, PhotoNameError> {
        if raw.is_empty() {
            return Err(PhotoNameError::Empty);
        }
        if !PHOTO_NAME_PATTERN.is_match(raw) {
            return Err(PhotoNameError::InvalidPattern(raw.to_string()));
        }
        Ok(PhotoName(raw.to_string()))
    }

    /// Build the filename for a photo id, e.g. `_ok8uVzL2gI` -> `_ok8uVzL2gI.jpg`.
    pub fn from_id(id: &str) -> Result<Self, PhotoNameError> {
        Self::parse(&format!("{}.{}", id, PHOTO_EXTENSION))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PhotoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PhotoName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// How to obtain the raw bytes for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRequest {
    /// A specific photo from the managed directory
    Named(PhotoName),
    /// Any photo from the current catalog
    Random,
    /// An absolute http(s) URL fetched on demand
    Remote(Url),
    /// The bundled fallback photo
    Default,
}

impl SourceRequest {
    /// True when the client asked for a specific image rather than "any image".
    pub fn is_explicit(&self) -> bool {
        matches!(self, SourceRequest::Named(_) | SourceRequest::Remote(_))
    }

    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceRequest::Named(_) => "named",
            SourceRequest::Random => "random",
            SourceRequest::Remote(_) => "remote",
            SourceRequest::Default => "default",
        }
    }
}

use std::path::Path;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::HarnessError;

/// Image formats accepted in data URIs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSubtype {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageSubtype {
    /// Subtype as written after `image/`
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }
}

impl FromStr for ImageSubtype {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "gif" => Ok(Self::Gif),
            "webp" => Ok(Self::Webp),
            other => Err(HarnessError::InvalidInput(format!("unsupported image subtype: {other}"))),
        }
    }
}

impl std::fmt::Display for ImageSubtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inline image data URI: `data:image/<subtype>;base64,<payload>`
pub fn data_uri(bytes: &[u8], subtype: ImageSubtype) -> String {
    format!("data:image/{subtype};base64,{}", STANDARD.encode(bytes))
}

/// Raw image bytes plus their declared subtype
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    pub subtype: ImageSubtype,
}

impl ImageInput {
    /// Read an image fixture from disk
    ///
    /// # Errors
    ///
    /// Returns `HarnessError::Fixture` if the file cannot be read.
    pub async fn from_path(path: &Path, subtype: ImageSubtype) -> Result<Self, HarnessError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| HarnessError::Fixture {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self { bytes, subtype })
    }

    pub fn data_uri(&self) -> String {
        data_uri(&self.bytes, self.subtype)
    }
}

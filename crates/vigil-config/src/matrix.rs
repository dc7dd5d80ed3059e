use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Models and fixtures the harness runs against
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatrixConfig {
    /// Models for the text, system-prompt, streaming, tool and stop cases
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    /// Models for the image cases
    #[serde(default = "default_image_models")]
    pub image_models: Vec<String>,
    /// Image fixtures sent to every image model
    #[serde(default = "default_images")]
    pub images: Vec<ImageFixtureConfig>,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            models: default_models(),
            image_models: default_image_models(),
            images: default_images(),
        }
    }
}

/// An image file plus the subtype used in its data URI
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageFixtureConfig {
    /// Subtype such as `jpeg` or `png`
    pub subtype: String,
    /// Path to the image; relative paths are anchored at the config file
    pub path: PathBuf,
}

impl MatrixConfig {
    /// Resolve relative image paths against `dir`
    pub fn anchor_images(&mut self, dir: &Path) {
        for image in &mut self.images {
            if image.path.is_relative() {
                image.path = dir.join(&image.path);
            }
        }
    }
}

fn default_models() -> Vec<String> {
    [
        "bedrock/amazon.nova-lite-v1:0",
        "bedrock/amazon.nova-micro-v1:0",
        "bedrock/amazon.nova-pro-v1:0",
    ]
    .map(str::to_owned)
    .to_vec()
}

fn default_image_models() -> Vec<String> {
    ["bedrock/amazon.nova-lite-v1:0", "bedrock/us.amazon.nova-pro-v1:0"]
        .map(str::to_owned)
        .to_vec()
}

fn default_images() -> Vec<ImageFixtureConfig> {
    vec![
        ImageFixtureConfig {
            subtype: "jpeg".to_owned(),
            path: PathBuf::from("fixtures/sample.jpeg"),
        },
        ImageFixtureConfig {
            subtype: "png".to_owned(),
            path: PathBuf::from("fixtures/gradient.png"),
        },
    ]
}

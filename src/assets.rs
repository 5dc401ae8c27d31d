//! Card images.
//!
//! The PDF engine only embeds images given as base64 `data:` URIs, so the
//! front and back artwork is read from disk and inlined before templating.

use std::fs;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};

use crate::config::AssetPaths;
use crate::error::{CardError, Result};

/// `src` values for the two card-stock images. An empty string means no
/// image was configured; the engine skips it.
#[derive(Debug, Clone, Default)]
pub struct CardImages {
    pub front: String,
    pub back: String,
}

impl CardImages {
    pub fn load(paths: &AssetPaths) -> Result<Self> {
        Ok(Self {
            front: optional_data_uri(paths.front_image.as_deref())?,
            back: optional_data_uri(paths.back_image.as_deref())?,
        })
    }
}

fn optional_data_uri(path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) => image_data_uri(p),
        None => Ok(String::new()),
    }
}

/// Read an image file and encode it as `data:<mime>;base64,...`.
///
/// The image is fully decoded once here so that a corrupt file fails the run
/// up front rather than being dropped silently at render time.
pub fn image_data_uri(path: &Path) -> Result<String> {
    let asset_err = |reason: String| CardError::Asset {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = fs::read(path).map_err(|e| asset_err(e.to_string()))?;
    let format = image::guess_format(&bytes).map_err(|e| asset_err(e.to_string()))?;
    image::load_from_memory_with_format(&bytes, format).map_err(|e| asset_err(e.to_string()))?;

    log::debug!("Inlined '{}' ({} bytes)", path.display(), bytes.len());
    Ok(format!(
        "data:{};base64,{}",
        format.to_mime_type(),
        BASE64_STD.encode(&bytes)
    ))
}

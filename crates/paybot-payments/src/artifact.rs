//! Scannable Code Artifact
//!
//! A PIX charge comes back as a textual payment code; buyers scan it as a
//! QR image. The image lives in a temporary file owned by [`QrArtifact`]:
//! the file is removed when the handle is dropped, so callers only have to
//! keep the handle alive until the image has been sent.

use std::path::{Path, PathBuf};

use chrono::Utc;
use image::Luma;
use qrcode::QrCode;

use crate::error::{PaymentError, Result};

const MIN_DIMENSION: u32 = 300;

/// Owned handle to a rendered QR code PNG
#[derive(Debug)]
pub struct QrArtifact {
    path: PathBuf,
}

impl QrArtifact {
    /// Render `payload` as a PNG inside `dir`
    pub fn render(payload: &str, dir: &Path) -> Result<Self> {
        let code = QrCode::new(payload.as_bytes())
            .map_err(|e| PaymentError::Artifact(format!("cannot encode payment code: {e}")))?;

        let image = code
            .render::<Luma<u8>>()
            .min_dimensions(MIN_DIMENSION, MIN_DIMENSION)
            .build();

        let path = dir.join(unique_file_name());
        image
            .save(&path)
            .map_err(|e| PaymentError::Artifact(format!("cannot write {}: {e}", path.display())))?;

        tracing::debug!(path = %path.display(), "Rendered QR artifact");

        Ok(Self { path })
    }

    /// Location of the PNG on disk
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for QrArtifact {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed QR artifact"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove QR artifact"
            ),
        }
    }
}

/// Timestamp plus random suffix, so concurrent charges never collide
fn unique_file_name() -> String {
    format!(
        "qr_{}_{}.png",
        Utc::now().timestamp_millis(),
        uuid::Uuid::new_v4().simple()
    )
}

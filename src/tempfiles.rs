//! Temporary files: scoped formula rasters and generated output paths.

use crate::{Error, Result};
use image::{ImageFormat, RgbaImage};
use log::{debug, warn};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

const FILE_PREFIX: &str = "mathshot-";
const RETRY_STEP: Duration = Duration::from_millis(200);

/// A formula bitmap written to a uniquely named temporary PNG.
///
/// The file is removed when the guard drops, on success and error paths
/// alike, using [`remove_with_retries`].
#[derive(Debug)]
pub struct TempRaster {
    path: PathBuf,
    retries: u32,
}

impl TempRaster {
    pub fn create(bitmap: &RgbaImage, retries: u32) -> Result<Self> {
        let path = tempfile::Builder::new()
            .prefix(FILE_PREFIX)
            .suffix(".png")
            .tempfile()?
            .into_temp_path()
            .keep()
            .map_err(|e| Error::Io(e.error))?;

        // guard first so a failed save still cleans up
        let guard = Self { path, retries };
        bitmap.save_with_format(&guard.path, ImageFormat::Png)?;
        Ok(guard)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempRaster {
    fn drop(&mut self) {
        remove_with_retries(&self.path, self.retries);
    }
}

/// Delete `path`, retrying permission/lock failures with a growing delay
/// (200 ms, 400 ms, ...). Returns whether the file is gone.
pub fn remove_with_retries(path: &Path, max_retries: u32) -> bool {
    let attempts = max_retries.max(1);
    for attempt in 0..attempts {
        match std::fs::remove_file(path) {
            Ok(()) => {
                debug!("removed temp file {}", path.display());
                return true;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => return true,
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                if attempt + 1 < attempts {
                    std::thread::sleep(RETRY_STEP * (attempt + 1));
                } else {
                    warn!(
                        "Could not remove {} after {} attempts: {}",
                        path.display(),
                        attempts,
                        e
                    );
                }
            }
            Err(e) => {
                warn!("Failed to remove {}: {}", path.display(), e);
                return false;
            }
        }
    }
    false
}

/// A fresh, persistent temp path for a rendered output (`png`, `pdf`).
/// The caller owns the file afterwards.
pub fn output_path(extension: &str) -> Result<PathBuf> {
    tempfile::Builder::new()
        .prefix(FILE_PREFIX)
        .suffix(&format!(".{}", extension.trim_start_matches('.')))
        .tempfile()?
        .into_temp_path()
        .keep()
        .map_err(|e| Error::Io(e.error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn raster_is_removed_on_drop() {
        let bitmap = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let raster = TempRaster::create(&bitmap, 3).unwrap();
        let path = raster.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(image::open(&path).unwrap().width(), 4);

        drop(raster);
        assert!(!path.exists());
    }

    #[test]
    fn missing_file_counts_as_removed() {
        let dir = tempfile::tempdir().unwrap();
        assert!(remove_with_retries(&dir.path().join("gone.png"), 3));
    }

    #[test]
    fn output_paths_are_unique_and_kept() {
        let a = output_path("pdf").unwrap();
        let b = output_path(".pdf").unwrap();
        assert_ne!(a, b);
        assert!(a.exists());
        assert_eq!(b.extension().and_then(|e| e.to_str()), Some("pdf"));
        assert!(remove_with_retries(&a, 1));
        assert!(remove_with_retries(&b, 1));
    }
}

use std::path::{Path, PathBuf};

use crate::error::PermissionDenied;
use crate::models::ImageReference;

/// Fallback content type when the extension is not a known image type.
pub const DEFAULT_IMAGE_MIME: &str = "image";

const VALID_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Source of a user-selected photo (gallery picker, camera, file path).
///
/// `Ok(None)` means the user backed out without choosing anything.
pub trait ImagePicker: Send + Sync {
    fn pick(&self) -> Result<Option<ImageReference>, PermissionDenied>;
}

impl ImageReference {
    /// Last path segment of the reference.
    pub fn file_name(&self) -> &str {
        let uri = self.as_str();
        uri.rsplit('/').next().unwrap_or(uri)
    }

    /// Lower-cased extension, when the file name ends in `.` followed by word characters.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name();
        let (_, ext) = name.rsplit_once('.')?;
        if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return None;
        }
        Some(ext.to_lowercase())
    }

    pub fn mime_type(&self) -> String {
        match self.extension().as_deref() {
            Some("jpg") | Some("jpeg") => "image/jpeg".to_string(),
            Some(ext @ ("png" | "gif" | "webp" | "heic" | "bmp")) => format!("image/{ext}"),
            _ => DEFAULT_IMAGE_MIME.to_string(),
        }
    }

    /// Filesystem path behind a `file://` URI or a bare path.
    pub fn local_path(&self) -> PathBuf {
        let uri = self.as_str();
        PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri))
    }
}

pub fn is_valid_image(image: &ImageReference) -> bool {
    image
        .extension()
        .is_some_and(|ext| VALID_EXTENSIONS.contains(&ext.as_str()))
}

/// Picks a photo straight from a path on disk. Used by the terminal front end.
pub struct FileImagePicker {
    path: PathBuf,
}

impl FileImagePicker {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ImagePicker for FileImagePicker {
    fn pick(&self) -> Result<Option<ImageReference>, PermissionDenied> {
        let metadata = std::fs::metadata(&self.path).map_err(|e| {
            PermissionDenied(format!("cannot access {}: {e}", self.path.display()))
        })?;
        if !metadata.is_file() {
            return Err(PermissionDenied(format!(
                "{} is not a file",
                self.path.display()
            )));
        }

        let reference = ImageReference::new(format!("file://{}", self.path.display()));
        if !is_valid_image(&reference) {
            tracing::warn!("Ignoring {}: not a supported image type", self.path.display());
            return Ok(None);
        }
        Ok(Some(reference))
    }
}

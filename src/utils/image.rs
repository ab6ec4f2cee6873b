//! Inline images arrive as `data:image/<ext>;base64,<payload>` strings and are
//! stored under the media root with a random file name.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};

pub const IMAGE_DIR: &str = "recipes/images";
pub const MEDIA_URL: &str = "/media";

const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

#[derive(thiserror::Error, Debug)]
pub enum ImageError {
    #[error("image must be a base64 data URI")]
    NotDataUri,

    #[error("unsupported image type `{0}`")]
    UnsupportedType(String),

    #[error("image payload is not valid base64")]
    Base64(#[from] base64::DecodeError),

    #[error("image payload is empty")]
    Empty,

    #[error("failed to store image: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, PartialEq, Eq)]
pub struct DecodedImage {
    pub extension: String,
    pub bytes: Vec<u8>,
}

pub fn decode_data_uri(data: &str) -> Result<DecodedImage, ImageError> {
    let rest = data.strip_prefix("data:image/").ok_or(ImageError::NotDataUri)?;
    let (format, payload) = rest.split_once(";base64,").ok_or(ImageError::NotDataUri)?;

    let extension = format.to_ascii_lowercase();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ImageError::UnsupportedType(format.to_string()));
    }

    let bytes = STANDARD.decode(payload.trim())?;
    if bytes.is_empty() {
        return Err(ImageError::Empty);
    }

    Ok(DecodedImage { extension, bytes })
}

/// Writes the image below `media_root` and returns its path relative to it.
pub async fn store(media_root: &Path, image: DecodedImage) -> Result<String, ImageError> {
    let relative = format!("{IMAGE_DIR}/{}.{}", uuid::Uuid::new_v4(), image.extension);
    let path = media_root.join(&relative);

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, image.bytes).await?;

    tracing::debug!(path = %path.display(), "stored recipe image");
    Ok(relative)
}

pub async fn remove(media_root: &Path, relative: &str) {
    let path: PathBuf = media_root.join(relative);
    if let Err(err) = tokio::fs::remove_file(&path).await {
        tracing::warn!(path = %path.display(), %err, "failed to remove image");
    }
}

pub fn url(relative: &str) -> String {
    format!("{MEDIA_URL}/{relative}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIXEL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn decodes_png_data_uri() {
        let image = decode_data_uri(PIXEL).unwrap();
        assert_eq!(image.extension, "png");
        assert_eq!(&image.bytes[1..4], b"PNG");
    }

    #[test]
    fn rejects_non_image_payloads() {
        assert!(matches!(
            decode_data_uri("https://example.com/cat.png"),
            Err(ImageError::NotDataUri)
        ));
        assert!(matches!(
            decode_data_uri("data:image/svg+xml;base64,PHN2Zz4="),
            Err(ImageError::UnsupportedType(_))
        ));
        assert!(matches!(
            decode_data_uri("data:image/png;base64,***"),
            Err(ImageError::Base64(_))
        ));
    }

    #[tokio::test]
    async fn stores_image_under_media_root() {
        let dir = tempfile::tempdir().unwrap();
        let relative = store(dir.path(), decode_data_uri(PIXEL).unwrap())
            .await
            .unwrap();

        assert!(relative.starts_with(IMAGE_DIR));
        assert!(relative.ends_with(".png"));
        assert!(dir.path().join(&relative).exists());
        assert_eq!(url(&relative), format!("/media/{relative}"));
    }
}

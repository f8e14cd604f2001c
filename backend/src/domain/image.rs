//! Base64 data-URI decoding for uploaded images.
//!
//! Avatars and recipe images arrive as `data:image/<subtype>;base64,<data>`
//! strings inside JSON bodies. Decoding happens before any database work
//! so a bad payload never opens a transaction.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use uuid::Uuid;

/// Image subtypes accepted for upload.
const ALLOWED_SUBTYPES: &[&str] = &["png", "jpeg", "jpg", "gif", "webp"];

/// Errors raised while decoding an image data URI.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    #[error("image must be a base64 data URI (data:image/..;base64,..)")]
    NotADataUri,
    #[error("unsupported image type '{0}'")]
    UnsupportedType(String),
    #[error("image payload is not valid base64")]
    InvalidBase64,
    #[error("image payload is empty")]
    Empty,
}

/// A decoded image ready to hand to the media store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    bytes: Vec<u8>,
    extension: String,
}

impl ImageUpload {
    /// Decode a `data:image/..;base64,..` string.
    pub fn from_data_uri(uri: &str) -> Result<Self, ImageError> {
        let rest = uri.strip_prefix("data:image/").ok_or(ImageError::NotADataUri)?;
        let (subtype, data) = rest.split_once(";base64,").ok_or(ImageError::NotADataUri)?;

        let subtype = subtype.to_ascii_lowercase();
        if !ALLOWED_SUBTYPES.contains(&subtype.as_str()) {
            return Err(ImageError::UnsupportedType(subtype));
        }

        let bytes = BASE64
            .decode(data.trim())
            .map_err(|_| ImageError::InvalidBase64)?;
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }

        // Normalise the alias so stored filenames are uniform.
        let extension = if subtype == "jpg" { "jpeg".to_owned() } else { subtype };
        Ok(Self { bytes, extension })
    }

    /// Decoded image bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// File extension derived from the declared subtype.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Generate a collision-free filename for this upload.
    pub fn generate_filename(&self) -> String {
        format!("{}.{}", Uuid::new_v4(), self.extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    // A 1x1 transparent PNG.
    const PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk\
YPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[rstest]
    fn decodes_png_data_uri() {
        let uri = format!("data:image/png;base64,{PNG_B64}");
        let upload = ImageUpload::from_data_uri(&uri).unwrap();
        assert_eq!(upload.extension(), "png");
        assert!(!upload.bytes().is_empty());
        assert!(upload.generate_filename().ends_with(".png"));
    }

    #[rstest]
    fn normalises_jpg_alias() {
        let uri = format!("data:image/jpg;base64,{PNG_B64}");
        let upload = ImageUpload::from_data_uri(&uri).unwrap();
        assert_eq!(upload.extension(), "jpeg");
    }

    #[rstest]
    #[case("not a uri", ImageError::NotADataUri)]
    #[case("data:text/plain;base64,aGk=", ImageError::NotADataUri)]
    #[case("data:image/tiff;base64,aGk=", ImageError::UnsupportedType("tiff".into()))]
    #[case("data:image/png;base64,!!!", ImageError::InvalidBase64)]
    #[case("data:image/png;base64,", ImageError::Empty)]
    fn rejects_malformed_uris(#[case] uri: &str, #[case] expected: ImageError) {
        assert_eq!(ImageUpload::from_data_uri(uri).unwrap_err(), expected);
    }
}

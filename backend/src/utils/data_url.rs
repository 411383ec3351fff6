//! Base64 image payloads as sent by the capture tool and returned to viewers.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

/// 1×1 transparent PNG shown in place of screenshots that cannot be loaded.
pub const BLANK_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

const DEFAULT_IMAGE_TYPE: &str = "image/png";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataUrlError {
    #[error("image payload is empty")]
    Empty,
    #[error("image payload is not valid base64")]
    InvalidBase64,
    #[error("data URL must be base64 encoded")]
    NotBase64Encoded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Decodes `data:image/<x>;base64,<payload>` or a bare base64 string.
///
/// The content type comes from the magic bytes when they are recognised,
/// otherwise from the URL header, otherwise `image/png`.
pub fn decode_image(raw: &str) -> Result<DecodedImage, DataUrlError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(DataUrlError::Empty);
    }

    let (declared, payload) = match raw.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest.split_once(',').ok_or(DataUrlError::InvalidBase64)?;
            let mime = header
                .strip_suffix(";base64")
                .ok_or(DataUrlError::NotBase64Encoded)?;
            (Some(mime.to_string()).filter(|m| !m.is_empty()), payload)
        }
        None => (None, raw),
    };

    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(DataUrlError::Empty);
    }
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|_| DataUrlError::InvalidBase64)?;

    let content_type = sniff_image_type(&bytes)
        .map(str::to_string)
        .or(declared)
        .unwrap_or_else(|| DEFAULT_IMAGE_TYPE.to_string());

    Ok(DecodedImage {
        content_type,
        bytes,
    })
}

/// Recognises the common browser screenshot formats by their signature.
pub fn sniff_image_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

pub fn encode_data_url(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", content_type, STANDARD.encode(bytes))
}

pub fn blank_image_data_url() -> String {
    format!("data:image/png;base64,{}", BLANK_PNG_BASE64)
}

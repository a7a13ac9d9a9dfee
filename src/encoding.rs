//! Image payload encoding at the dictionary boundary.
//!
//! Images are stored as self-describing `data:image/...;base64,` URIs so a
//! stored payload can be handed straight to an image view. Format is sniffed
//! from magic bytes, never trusted from a file extension, and everything is
//! capped at 200 KiB before it can reach the store.

use crate::error::{Result, WordbeamError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_ENGINE;
use image::ImageFormat;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Hard ceiling on stored image payloads.
pub const MAX_IMAGE_BYTES: usize = 200 * 1024;

const ACCEPTED_SUBTYPES: [&str; 4] = ["jpeg", "png", "webp", "gif"];

fn accepted_mime(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Png => Some("image/png"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Gif => Some("image/gif"),
        _ => None,
    }
}

fn encode_bytes(bytes: &[u8], origin: &str) -> Result<String> {
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(WordbeamError::Validation(format!(
            "image from {origin} is {} KiB; the limit is {} KiB",
            bytes.len() / 1024,
            MAX_IMAGE_BYTES / 1024,
        )));
    }
    let format = image::guess_format(bytes).map_err(|_| {
        WordbeamError::Validation(format!("{origin} is not a recognized image"))
    })?;
    let mime = accepted_mime(format).ok_or_else(|| {
        WordbeamError::Validation(format!(
            "{origin} is {format:?}; use JPEG, PNG, WebP, or GIF"
        ))
    })?;
    debug!(origin, mime, bytes = bytes.len(), "Encoded image payload");
    Ok(format!("data:{mime};base64,{}", BASE64_ENGINE.encode(bytes)))
}

/// Encode a local image file as a data URI, enforcing type and size limits.
pub fn file_to_data_uri(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    encode_bytes(&bytes, &path.display().to_string())
}

/// Fetch a remote image and encode it as a data URI, with the same limits.
pub fn url_to_data_uri(url: &str) -> Result<String> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(20))
        .build()
        .map_err(|err| WordbeamError::Fetch(err.to_string()))?;
    let response = client
        .get(url)
        .send()
        .map_err(|err| WordbeamError::Fetch(format!("{url}: {err}")))?;
    if !response.status().is_success() {
        return Err(WordbeamError::Fetch(format!(
            "{url} returned {}",
            response.status()
        )));
    }
    let bytes = response
        .bytes()
        .map_err(|err| WordbeamError::Fetch(format!("{url}: {err}")))?;
    encode_bytes(&bytes, url)
}

/// Store-side gate: a payload must be a decodable data URI of an accepted
/// image type. Does not enforce the size ceiling; that happens where bytes
/// enter the system.
pub fn validate_data_uri(payload: &str) -> Result<()> {
    let rest = payload.strip_prefix("data:image/").ok_or_else(|| {
        WordbeamError::Validation("image payload must be a data:image/ URI".to_string())
    })?;
    let (subtype, body) = rest.split_once(";base64,").ok_or_else(|| {
        WordbeamError::Validation("image payload must be base64-encoded".to_string())
    })?;
    if !ACCEPTED_SUBTYPES.contains(&subtype) {
        return Err(WordbeamError::Validation(format!(
            "unsupported image type image/{subtype}"
        )));
    }
    BASE64_ENGINE
        .decode(body)
        .map_err(|err| WordbeamError::Validation(format!("image payload is not valid base64: {err}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{MAX_IMAGE_BYTES, encode_bytes, validate_data_uri};
    use crate::error::WordbeamError;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

    #[test]
    fn small_png_becomes_a_png_data_uri() {
        let uri = encode_bytes(&PNG_MAGIC, "test").expect("png should encode");
        assert!(uri.starts_with("data:image/png;base64,"));
        validate_data_uri(&uri).expect("encoded uri should validate");
    }

    #[test]
    fn oversized_jpeg_is_rejected_by_size() {
        let mut bytes = JPEG_MAGIC.to_vec();
        bytes.resize(250 * 1024, 0);
        assert!(bytes.len() > MAX_IMAGE_BYTES);
        let err = encode_bytes(&bytes, "big.jpg").unwrap_err();
        match err {
            WordbeamError::Validation(msg) => assert!(msg.contains("KiB"), "{msg}"),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn unrecognized_bytes_are_rejected() {
        let err = encode_bytes(b"not an image at all", "junk").unwrap_err();
        assert!(matches!(err, WordbeamError::Validation(_)));
    }

    #[test]
    fn validate_rejects_non_data_uris() {
        assert!(validate_data_uri("https://example.com/cat.png").is_err());
        assert!(validate_data_uri("data:text/plain;base64,aGk=").is_err());
        assert!(validate_data_uri("data:image/tiff;base64,aGk=").is_err());
        assert!(validate_data_uri("data:image/png;base64,!!!not-base64!!!").is_err());
    }

    #[test]
    fn validate_accepts_all_four_types() {
        for subtype in ["jpeg", "png", "webp", "gif"] {
            let uri = format!("data:image/{subtype};base64,aGVsbG8=");
            validate_data_uri(&uri).unwrap_or_else(|err| panic!("{subtype}: {err}"));
        }
    }
}

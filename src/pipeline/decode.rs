//! Image decoding: base64 payload (optionally a data URL) → raw bytes.
//!
//! The service returns each embedded image as a string such as
//! `data:image/jpeg;base64,/9j/4AAQ...`. Everything up to and including the
//! first comma is the data-URL header and is dropped; a string without a
//! comma is taken to be bare base64.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use tracing::debug;

/// Standard alphabet, padding optional. Payloads are sometimes truncated
/// of their trailing `=`.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Errors raised while decoding one image payload.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("payload is empty")]
    Empty,
    #[error(transparent)]
    Base64(#[from] base64::DecodeError),
}

/// Strip a `data:...;base64,` header, if any.
pub fn strip_data_url(payload: &str) -> &str {
    match payload.split_once(',') {
        Some((_, data)) => data,
        None => payload,
    }
}

/// Decode one image payload into raw bytes.
///
/// ASCII whitespace (line-wrapped base64) is ignored.
pub fn decode_image_payload(payload: &str) -> Result<Vec<u8>, PayloadError> {
    let data = strip_data_url(payload);
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(PayloadError::Empty);
    }
    let bytes = PAYLOAD_ENGINE.decode(compact.as_bytes())?;
    debug!("Decoded image payload → {} bytes", bytes.len());
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;

    const JPEG_HEADER: [u8; 6] = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

    #[test]
    fn decodes_data_url() {
        let payload = format!("data:image/jpeg;base64,{}", STANDARD.encode(JPEG_HEADER));
        assert_eq!(decode_image_payload(&payload).unwrap(), JPEG_HEADER);
    }

    #[test]
    fn decodes_bare_base64() {
        let payload = STANDARD.encode(b"raw image");
        assert_eq!(decode_image_payload(&payload).unwrap(), b"raw image");
    }

    #[test]
    fn tolerates_missing_padding_and_line_breaks() {
        // "ab" encodes to "YWI=".
        assert_eq!(decode_image_payload("data:image/png;base64,YWI").unwrap(), b"ab");
        assert_eq!(decode_image_payload("YW\nI=").unwrap(), b"ab");
    }

    #[test]
    fn only_first_comma_is_a_header() {
        assert_eq!(strip_data_url("data:x;base64,AAA,BBB"), "AAA,BBB");
        assert_eq!(strip_data_url("AAAA"), "AAAA");
    }

    #[test]
    fn rejects_empty_and_malformed() {
        assert!(matches!(
            decode_image_payload("data:image/jpeg;base64,"),
            Err(PayloadError::Empty)
        ));
        assert!(matches!(
            decode_image_payload("data:image/jpeg;base64,@@@@"),
            Err(PayloadError::Base64(_))
        ));
    }
}

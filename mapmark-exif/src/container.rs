//! Base64 data-URL container for in-memory JPEG bytes.

use base64::{Engine as _, engine::general_purpose};

use crate::ExifError;

/// Prefix of a JPEG data URL.
pub const DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// Decode a JPEG data URL, or bare base64, into bytes.
///
/// Whitespace inside the payload is ignored.
///
/// # Errors
/// Returns [`ExifError::DataUrl`] when the payload is not valid base64.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), mapmark_exif::ExifError> {
/// let bytes = mapmark_exif::decode_data_url("data:image/jpeg;base64,/9j/2Q==")?;
/// assert_eq!(bytes, [0xFF, 0xD8, 0xFF, 0xD9]);
/// # Ok(())
/// # }
/// ```
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, ExifError> {
    let payload = url.strip_prefix(DATA_URL_PREFIX).unwrap_or(url);
    let cleaned: String = payload
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .collect();
    general_purpose::STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|source| ExifError::DataUrl { source })
}

/// Encode JPEG bytes as a data URL.
#[must_use]
pub fn encode_data_url(jpeg: &[u8]) -> String {
    let mut url = String::from(DATA_URL_PREFIX);
    general_purpose::STANDARD.encode_string(jpeg, &mut url);
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::prefixed("data:image/jpeg;base64,/9j/2Q==")]
    #[case::bare("/9j/2Q==")]
    #[case::wrapped("/9j/\n2Q==")]
    fn accepts_prefixed_and_bare_payloads(#[case] url: &str) {
        let bytes = decode_data_url(url).expect("valid base64");
        assert_eq!(bytes, [0xFF, 0xD8, 0xFF, 0xD9]);
    }

    #[rstest]
    fn encodes_with_prefix() {
        assert_eq!(
            encode_data_url(&[0xFF, 0xD8, 0xFF, 0xD9]),
            "data:image/jpeg;base64,/9j/2Q=="
        );
    }

    #[rstest]
    fn rejects_invalid_base64() {
        let err = decode_data_url("data:image/jpeg;base64,@@@").expect_err("invalid");
        assert!(matches!(err, ExifError::DataUrl { .. }));
    }
}

//! Document payload decoding

use base64::Engine;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Document payload is empty")]
    Empty,

    #[error("Data URL has no ',' separator")]
    MissingSeparator,

    #[error("Invalid base64: {0}")]
    Base64(String),
}

/// Decode a stored `file_data` value into PDF bytes.
///
/// A leading `data:...,` prefix is stripped up to and including the first
/// comma. ASCII whitespace is ignored so line-wrapped payloads decode.
pub fn decode_file_data(file_data: &str) -> Result<Vec<u8>, PayloadError> {
    let trimmed = file_data.trim();
    if trimmed.is_empty() {
        return Err(PayloadError::Empty);
    }

    let encoded = match trimmed.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or(PayloadError::MissingSeparator)?,
        None => trimmed,
    };

    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if compact.is_empty() {
        return Err(PayloadError::Empty);
    }

    base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| PayloadError::Base64(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PDF_B64: &str = "JVBERi0xLjQKJcOkw7zDtsOf";

    #[test]
    fn test_plain_base64() {
        let bytes = decode_file_data(PDF_B64).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.4"));
    }

    #[test]
    fn test_data_url_prefix_matches_bare_payload() {
        let prefixed = format!("data:application/pdf;base64,{}", PDF_B64);
        assert_eq!(
            decode_file_data(&prefixed).unwrap(),
            decode_file_data(PDF_B64).unwrap()
        );
    }

    #[test]
    fn test_only_first_comma_is_separator() {
        // ',' is not base64, so a second comma is reported as bad data
        let prefixed = format!("data:application/pdf;base64,{},x", PDF_B64);
        assert!(matches!(decode_file_data(&prefixed), Err(PayloadError::Base64(_))));
    }

    #[test]
    fn test_wrapped_payload() {
        let wrapped = format!("{}\n{}", &PDF_B64[..12], &PDF_B64[12..]);
        assert_eq!(decode_file_data(&wrapped).unwrap(), decode_file_data(PDF_B64).unwrap());
    }

    #[test]
    fn test_errors() {
        assert_eq!(decode_file_data(""), Err(PayloadError::Empty));
        assert_eq!(decode_file_data("data:application/pdf;base64,"), Err(PayloadError::Empty));
        assert_eq!(
            decode_file_data("data:application/pdf;base64"),
            Err(PayloadError::MissingSeparator)
        );
        assert!(matches!(decode_file_data("not*base64!"), Err(PayloadError::Base64(_))));
        assert!(matches!(decode_file_data("JVBERi0"), Err(PayloadError::Base64(_))));
    }
}

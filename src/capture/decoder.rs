//! Barcode decode capability and the formats it is restricted to

use std::future::Future;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::frame::Rotation;
use crate::error::DecodeError;

/// Values decoded from one frame, in decoder order. `None` is a null entry.
pub type DetectionResult = Vec<Option<String>>;

/// External decode capability.
///
/// Implementations wrap a vision library; the pipeline only sees the values.
pub trait Decoder: Send + Sync + 'static {
    fn decode(
        &self,
        image: Bytes,
        rotation: Rotation,
    ) -> impl Future<Output = Result<DetectionResult, DecodeError>> + Send;
}

/// Linear symbologies the scanner accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Symbology {
    Ean13,
    UpcA,
    UpcE,
}

impl Symbology {
    /// Identify the symbology of a decoded value by length and check digit
    pub fn classify(value: &str) -> Option<Self> {
        let digits = to_digits(value)?;
        match digits.len() {
            13 if check_digit(&digits[..12]) == digits[12] => Some(Symbology::Ean13),
            12 if check_digit(&digits[..11]) == digits[11] => Some(Symbology::UpcA),
            8 => {
                let expanded = expand_upc_e(&digits)?;
                (check_digit(&expanded) == digits[7]).then_some(Symbology::UpcE)
            }
            _ => None,
        }
    }
}

fn to_digits(value: &str) -> Option<Vec<u8>> {
    value
        .bytes()
        .map(|b| b.is_ascii_digit().then(|| b - b'0'))
        .collect()
}

/// GS1 mod-10 check digit; the rightmost payload digit has weight 3
fn check_digit(payload: &[u8]) -> u8 {
    let sum: u32 = payload
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| if i % 2 == 0 { d as u32 * 3 } else { d as u32 })
        .sum();
    ((10 - sum % 10) % 10) as u8
}

/// UPC-E (number system, six digits, check) to the 11 payload digits of UPC-A
fn expand_upc_e(digits: &[u8]) -> Option<Vec<u8>> {
    let ns = digits[0];
    if ns > 1 {
        return None;
    }
    let d = &digits[1..7];
    let mut out = Vec::with_capacity(11);
    out.push(ns);
    match d[5] {
        0..=2 => {
            out.extend_from_slice(&[d[0], d[1], d[5], 0, 0]);
            out.extend_from_slice(&[0, 0, d[2], d[3], d[4]]);
        }
        3 => {
            out.extend_from_slice(&[d[0], d[1], d[2], 0, 0]);
            out.extend_from_slice(&[0, 0, 0, d[3], d[4]]);
        }
        4 => {
            out.extend_from_slice(&[d[0], d[1], d[2], d[3], 0]);
            out.extend_from_slice(&[0, 0, 0, 0, d[4]]);
        }
        _ => {
            out.extend_from_slice(&d[..5]);
            out.extend_from_slice(&[0, 0, 0, 0, d[5]]);
        }
    }
    Some(out)
}

/// Decoder for replayed frames whose payload is the text the scanner saw.
///
/// Payload grammar: `!` fails the decode, otherwise comma separated values
/// where `null` stands for a null entry. Values outside the enabled formats
/// are dropped, as a format-restricted vision decoder would.
#[derive(Debug, Clone)]
pub struct ScriptDecoder {
    formats: Vec<Symbology>,
}

impl ScriptDecoder {
    pub fn new(formats: Vec<Symbology>) -> Self {
        Self { formats }
    }

    fn decode_text(&self, text: &str) -> Result<DetectionResult, DecodeError> {
        let text = text.trim();
        if text == "!" {
            return Err(DecodeError::Malformed("scripted failure".into()));
        }

        let mut values = Vec::new();
        for token in text.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if token == "null" {
                values.push(None);
                continue;
            }
            match Symbology::classify(token) {
                Some(format) if self.formats.contains(&format) => {
                    values.push(Some(token.to_string()))
                }
                _ => trace!(token, "Dropping value outside enabled formats"),
            }
        }
        Ok(values)
    }
}

impl Decoder for ScriptDecoder {
    fn decode(
        &self,
        image: Bytes,
        _rotation: Rotation,
    ) -> impl Future<Output = Result<DetectionResult, DecodeError>> + Send {
        let result = std::str::from_utf8(&image)
            .map_err(|e| DecodeError::Malformed(e.to_string()))
            .and_then(|text| self.decode_text(text));
        async move { result }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_formats() -> ScriptDecoder {
        ScriptDecoder::new(vec![Symbology::Ean13, Symbology::UpcA, Symbology::UpcE])
    }

    #[test]
    fn classifies_valid_codes() {
        assert_eq!(Symbology::classify("4006381333931"), Some(Symbology::Ean13));
        assert_eq!(Symbology::classify("036000291452"), Some(Symbology::UpcA));
        assert_eq!(Symbology::classify("01234565"), Some(Symbology::UpcE));
    }

    #[test]
    fn rejects_bad_check_digits_and_junk() {
        assert_eq!(Symbology::classify("4006381333932"), None);
        assert_eq!(Symbology::classify("036000291453"), None);
        assert_eq!(Symbology::classify("01234566"), None);
        assert_eq!(Symbology::classify("2123456x"), None);
        assert_eq!(Symbology::classify(""), None);
    }

    #[tokio::test]
    async fn script_decoder_keeps_order_and_nulls() {
        let decoder = all_formats();
        let values = decoder
            .decode(
                Bytes::from_static(b"036000291452, null,4006381333931"),
                Rotation::Deg0,
            )
            .await
            .unwrap();
        assert_eq!(
            values,
            vec![
                Some("036000291452".to_string()),
                None,
                Some("4006381333931".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn script_decoder_filters_disabled_formats() {
        let decoder = ScriptDecoder::new(vec![Symbology::Ean13]);
        let values = decoder
            .decode(Bytes::from_static(b"036000291452,4006381333931"), Rotation::Deg90)
            .await
            .unwrap();
        assert_eq!(values, vec![Some("4006381333931".to_string())]);
    }

    #[tokio::test]
    async fn script_decoder_reports_failures() {
        let decoder = all_formats();
        let err = decoder
            .decode(Bytes::from_static(b"!"), Rotation::Deg0)
            .await
            .unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));

        let err = decoder
            .decode(Bytes::from_static(&[0xff, 0xfe]), Rotation::Deg0)
            .await
            .unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }
}

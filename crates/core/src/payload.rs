//! Textual integer and payload parsing for operator-supplied values.
//!
//! Integers are accepted in decimal or with a `0x` (also `0o`, `0b`) prefix,
//! optionally signed, with `_` digit separators. Payload tokens that do not
//! parse as a byte are coerced to 0 under the default lenient policy.

use crate::error::{Error, Result};
use std::fmt;
use tracing::warn;

/// Bytes sent when the operator supplies no payload tokens.
pub const DEFAULT_PAYLOAD: [u8; 3] = [0x01, 0x00, 0x04];

/// Parse a textual integer in decimal or prefixed radix notation.
///
/// Returns `None` for anything that is not a well-formed integer. Decimal
/// literals with leading zeros (`"010"`) are rejected; `"0"` and `"00"` are not.
pub fn parse_int(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let lower = body.get(..2).map(|p| p.to_ascii_lowercase());
    let (radix, digits) = match lower.as_deref() {
        Some("0x") => (16, &body[2..]),
        Some("0o") => (8, &body[2..]),
        Some("0b") => (2, &body[2..]),
        _ => (10, body),
    };
    // One separator may follow a radix prefix: `0x_ff`.
    let digits = match radix {
        10 => digits,
        _ => digits.strip_prefix('_').unwrap_or(digits),
    };

    if digits.is_empty()
        || digits.starts_with('_')
        || digits.ends_with('_')
        || digits.contains("__")
        || !digits.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return None;
    }
    let digits: String = digits.chars().filter(|c| *c != '_').collect();
    if radix == 10 && digits.starts_with('0') && digits.chars().any(|c| c != '0') {
        return None;
    }

    let value = i64::from_str_radix(&digits, radix).ok()?;
    Some(if negative { -value } else { value })
}

/// Parse a 16-bit field (VID, PID, interface, report type).
pub fn parse_u16(text: &str) -> Result<u16> {
    parse_int(text)
        .and_then(|v| u16::try_from(v).ok())
        .ok_or_else(|| Error::InvalidNumber(text.trim().to_string()))
}

/// How to treat payload tokens that are not a byte value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadPolicy {
    /// Substitute 0 and keep going.
    #[default]
    Lenient,
    /// Reject the whole payload.
    Strict,
}

/// A non-empty byte sequence for the data stage of a control transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload(Vec<u8>);

impl Payload {
    /// Wrap raw bytes. Returns `None` for an empty sequence.
    pub fn new(bytes: Vec<u8>) -> Option<Self> {
        if bytes.is_empty() {
            None
        } else {
            Some(Self(bytes))
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self(DEFAULT_PAYLOAD.to_vec())
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "0x{b:02X}")?;
        }
        write!(f, "]")
    }
}

/// A token that was coerced during lenient parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadWarning {
    /// Parsed as an integer, but outside 0..=255.
    OutOfRange { token: String },
    /// Not an integer at all.
    Invalid { token: String },
    /// No tokens were given; [`DEFAULT_PAYLOAD`] was used.
    EmptyDefault,
}

/// Result of parsing payload tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPayload {
    pub payload: Payload,
    pub warnings: Vec<PayloadWarning>,
}

/// Parse payload tokens into bytes.
///
/// Each token that parses as an integer in 0..=255 becomes that byte. Under
/// [`PayloadPolicy::Lenient`] every other token becomes 0 and is reported in
/// `warnings`; under [`PayloadPolicy::Strict`] the first such token fails the
/// call. An empty token list yields [`DEFAULT_PAYLOAD`] under either policy.
pub fn parse_payload<'a, I>(tokens: I, policy: PayloadPolicy) -> Result<ParsedPayload>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut bytes = Vec::new();
    let mut warnings = Vec::new();

    for token in tokens {
        let warning = match parse_int(token) {
            Some(v) => match u8::try_from(v) {
                Ok(b) => {
                    bytes.push(b);
                    continue;
                }
                Err(_) => PayloadWarning::OutOfRange {
                    token: token.to_string(),
                },
            },
            None => PayloadWarning::Invalid {
                token: token.to_string(),
            },
        };

        if policy == PayloadPolicy::Strict {
            return Err(Error::InvalidPayload {
                token: token.to_string(),
            });
        }
        warn!(token, "Payload token is not a byte value, using 0");
        bytes.push(0);
        warnings.push(warning);
    }

    match Payload::new(bytes) {
        Some(payload) => Ok(ParsedPayload { payload, warnings }),
        None => {
            warn!(default = %Payload::default(), "Empty payload, using default bytes");
            Ok(ParsedPayload {
                payload: Payload::default(),
                warnings: vec![PayloadWarning::EmptyDefault],
            })
        }
    }
}

/// Parse a whitespace-separated payload line.
pub fn parse_payload_line(line: &str, policy: PayloadPolicy) -> Result<ParsedPayload> {
    parse_payload(line.split_whitespace(), policy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_int_decimal_and_hex() {
        assert_eq!(parse_int("123"), Some(123));
        assert_eq!(parse_int("0x7B"), Some(123));
        assert_eq!(parse_int("0X7b"), Some(123));
        assert_eq!(parse_int("0o17"), Some(15));
        assert_eq!(parse_int("0b101"), Some(5));
        assert_eq!(parse_int("-5"), Some(-5));
        assert_eq!(parse_int("+5"), Some(5));
        assert_eq!(parse_int("1_000"), Some(1000));
        assert_eq!(parse_int("0x_ff"), Some(255));
        assert_eq!(parse_int("0b_1_0"), Some(2));
        assert_eq!(parse_int(" 0 "), Some(0));
        assert_eq!(parse_int("00"), Some(0));
    }

    #[test]
    fn parse_int_rejects_malformed() {
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_int("abc"), None);
        assert_eq!(parse_int("0x"), None);
        assert_eq!(parse_int("0x-5"), None);
        assert_eq!(parse_int("010"), None);
        assert_eq!(parse_int("1__0"), None);
        assert_eq!(parse_int("_1"), None);
        assert_eq!(parse_int("0x_"), None);
        assert_eq!(parse_int("0x__ff"), None);
        assert_eq!(parse_int("0xff_"), None);
        assert_eq!(parse_int("12z"), None);
        assert_eq!(parse_int("--1"), None);
    }

    #[test]
    fn parse_u16_bounds() {
        assert_eq!(parse_u16("0x25A7").unwrap(), 0x25A7);
        assert_eq!(parse_u16("64008").unwrap(), 0xFA08);
        assert!(parse_u16("0x10000").is_err());
        assert!(parse_u16("-1").is_err());
        assert!(parse_u16("mouse").is_err());
    }

    #[test]
    fn payload_mixed_tokens_coerce_to_zero() {
        let parsed = parse_payload(["0x01", "300", "-5", "abc"], PayloadPolicy::Lenient).unwrap();
        assert_eq!(parsed.payload.as_bytes(), &[1, 0, 0, 0]);
        assert_eq!(
            parsed.warnings,
            vec![
                PayloadWarning::OutOfRange {
                    token: "300".into()
                },
                PayloadWarning::OutOfRange { token: "-5".into() },
                PayloadWarning::Invalid {
                    token: "abc".into()
                },
            ]
        );
    }

    #[test]
    fn payload_exact_bytes_pass_through() {
        let parsed = parse_payload_line("0x01 0x00 0x04 255 0", PayloadPolicy::Lenient).unwrap();
        assert_eq!(parsed.payload.as_bytes(), &[1, 0, 4, 255, 0]);
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn payload_separators_after_prefix_keep_value() {
        let parsed = parse_payload(["0x_ff", "0_0"], PayloadPolicy::Lenient).unwrap();
        assert_eq!(parsed.payload.as_bytes(), &[0xFF, 0x00]);
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn payload_empty_uses_default() {
        let parsed = parse_payload_line("   ", PayloadPolicy::Lenient).unwrap();
        assert_eq!(parsed.payload.as_bytes(), &DEFAULT_PAYLOAD);
        assert_eq!(parsed.warnings, vec![PayloadWarning::EmptyDefault]);

        let strict = parse_payload_line("", PayloadPolicy::Strict).unwrap();
        assert_eq!(strict.payload.as_bytes(), &[1, 0, 4]);
    }

    #[test]
    fn payload_strict_rejects_bad_token() {
        let err = parse_payload_line("1 2 256", PayloadPolicy::Strict).unwrap_err();
        assert!(matches!(err, Error::InvalidPayload { token } if token == "256"));
    }

    #[test]
    fn payload_display_is_hex_list() {
        assert_eq!(Payload::default().to_string(), "[0x01, 0x00, 0x04]");
        assert!(Payload::new(Vec::new()).is_none());
    }
}

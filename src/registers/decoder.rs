/// Register list grammar
///
/// ```text
/// list   := '[' token (',' token)* ']'
/// token  := ws* (decimal | "nan") ws*
/// decimal := [+-]? digit* ('.' digit*)?   (at least one digit)
/// ```
///
/// The first bracket pair with no bracket inside it is used, so a list
/// embedded in serialized JSON (`{"registers":[1,2]}`) is still found.
/// `nan` (any case) decodes to 0.0; any other token that is not a decimal
/// fails the whole message.
use super::types::NumericRegisterArray;
use crate::arguments::is_debug_decoder_enabled;
use crate::errors::DecodeError;
use crate::logger::{self, LogTag};

/// Extract the register array from payload text
pub fn decode_registers(text: &str) -> Result<NumericRegisterArray, DecodeError> {
    let (open, close) = innermost_brackets(text).ok_or(DecodeError::NoRegisterData)?;
    let body = &text[open + 1..close];

    if body.trim().is_empty() {
        return Err(DecodeError::NoRegisterData);
    }

    let values = body
        .split(',')
        .map(parse_token)
        .collect::<Result<Vec<f64>, DecodeError>>()?;

    if is_debug_decoder_enabled() {
        logger::debug(
            LogTag::Decoder,
            &format!("Extracted {} registers: {:?}", values.len(), values),
        );
    }

    Ok(NumericRegisterArray::new(values))
}

/// Byte offsets of the first `[` ... `]` pair that encloses no other bracket
fn innermost_brackets(text: &str) -> Option<(usize, usize)> {
    let mut open = None;
    for (idx, ch) in text.char_indices() {
        match ch {
            '[' => open = Some(idx),
            ']' => {
                if let Some(start) = open {
                    return Some((start, idx));
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_token(raw: &str) -> Result<f64, DecodeError> {
    let token = raw.trim();
    if token.eq_ignore_ascii_case("nan") {
        return Ok(0.0);
    }

    let malformed = || DecodeError::MalformedToken {
        token: token.to_string(),
    };
    if !is_decimal(token) {
        return Err(malformed());
    }
    token.parse::<f64>().map_err(|_| malformed())
}

/// `[+-]? digits ('.' digits)?`, also accepting `.5` and `5.`
///
/// `f64::from_str` alone would let `inf` and exponents through.
fn is_decimal(token: &str) -> bool {
    let unsigned = token.strip_prefix(['+', '-']).unwrap_or(token);
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (unsigned, ""),
    };

    let digits_only = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    (!int_part.is_empty() || !frac_part.is_empty()) && digits_only(int_part) && digits_only(frac_part)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_decodes_to_zero() {
        let registers = decode_registers("[1,2,nan]").unwrap();
        assert_eq!(registers.values(), &[1.0, 2.0, 0.0]);
    }

    #[test]
    fn test_signed_decimals_and_whitespace() {
        let registers = decode_registers("meter says [ -1.5 , +230.25,0.0 ] ok").unwrap();
        assert_eq!(registers.values(), &[-1.5, 230.25, 0.0]);
    }

    #[test]
    fn test_no_brackets_is_no_register_data() {
        assert_eq!(decode_registers("230.1, 229.8"), Err(DecodeError::NoRegisterData));
        assert_eq!(decode_registers("[]"), Err(DecodeError::NoRegisterData));
        assert_eq!(decode_registers("] stray ["), Err(DecodeError::NoRegisterData));
    }

    #[test]
    fn test_malformed_token_fails_message() {
        assert_eq!(
            decode_registers("[1, two, 3]"),
            Err(DecodeError::MalformedToken {
                token: "two".to_string()
            })
        );
        assert!(decode_registers("[1,,3]").is_err());
    }

    #[test]
    fn test_infinity_and_exponents_rejected() {
        for payload in ["[inf,1000,inf]", "[1e3]", "[-Infinity]", "[1.2.3]", "[+]", "[.]"] {
            assert!(
                matches!(decode_registers(payload), Err(DecodeError::MalformedToken { .. })),
                "{} should be malformed",
                payload
            );
        }
        assert_eq!(decode_registers("[.5,5.,-0.25]").unwrap().values(), &[0.5, 5.0, -0.25]);
    }

    #[test]
    fn test_innermost_list_is_used() {
        let registers = decode_registers(r#"{"frames":[[50.01],[49.98]]}"#).unwrap();
        assert_eq!(registers.values(), &[50.01]);
    }

    #[test]
    fn test_single_value_list() {
        assert_eq!(decode_registers("[0.85]").unwrap().len(), 1);
    }
}

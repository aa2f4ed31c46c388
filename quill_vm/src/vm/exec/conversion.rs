//! Value casting.
//!
//! `TypeCast` pops the value, then the target type. Casting null fails;
//! the supported conversions are listed per target kind below, and any
//! other combination quietly produces null. String parsing follows the
//! `sscanf` rule: skip leading whitespace, consume the longest numeric
//! prefix, default to zero. Floats render to strings in `%g` form.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use super::super::error::VmError;
use super::super::Interpreter;
use crate::value::{Value, ValueKind};

impl Interpreter {
    pub(super) fn exec_type_cast(&mut self) -> Result<(), VmError> {
        let value = self.pop_resolved()?;
        let target = self.pop_stack()?;

        let target = match target {
            Value::Type(ty) => ty,
            other => {
                return Err(VmError::BadType(format!(
                    "cast target is not a type ({})",
                    other.kind()
                )))
            }
        };

        if matches!(value, Value::Null) {
            return Err(VmError::BadCast);
        }

        let result = match target.type_of {
            // boolean: truthiness of anything
            ValueKind::Boolean => Value::Boolean(value.is_truthy()),

            ValueKind::Integer => match &value {
                Value::Boolean(b) => Value::Integer(i32::from(*b)),
                Value::Float(x) => Value::Integer(*x as i32),
                Value::String(s) => Value::Integer(parse_leading_integer(s)),
                _ => Value::Null,
            },

            ValueKind::Float => match &value {
                Value::Boolean(b) => Value::Float(if *b { 1.0 } else { 0.0 }),
                Value::Integer(i) => Value::Float(*i as f32),
                Value::String(s) => Value::Float(parse_leading_float(s)),
                _ => Value::Null,
            },

            ValueKind::String => match &value {
                Value::Boolean(b) => Value::string(if *b { "true" } else { "false" }),
                Value::Integer(i) => Value::string(i.to_string()),
                Value::Float(x) => Value::string(format_float_g(*x)),
                _ => Value::Null,
            },

            other => {
                return Err(VmError::BadType(format!(
                    "unknown cast target {}, terminating",
                    other
                )))
            }
        };

        self.stack.push(result);
        Ok(())
    }
}

/// `%g` with the default six significant digits: fixed notation while the
/// decimal exponent stays in `[-4, 6)`, scientific notation outside it,
/// trailing zeros stripped either way.
fn format_float_g(x: f32) -> String {
    if x == 0.0 {
        return if x.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x.is_sign_negative() { "-inf" } else { "inf" }.to_string();
    }

    // round to six significant digits first; the exponent of the rounded
    // value decides which notation applies
    let scientific = format!("{:.5e}", x);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((mantissa, exponent)) => (mantissa.to_string(), exponent.parse::<i32>().unwrap_or(0)),
        None => (scientific, 0),
    };

    if (-4..6).contains(&exponent) {
        let precision = (5 - exponent).max(0) as usize;
        strip_trailing_zeros(format!("{:.*}", precision, x))
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            strip_trailing_zeros(mantissa),
            sign,
            exponent.abs()
        )
    }
}

fn strip_trailing_zeros(s: String) -> String {
    if !s.contains('.') {
        return s;
    }
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// `sscanf("%d")` semantics: skip leading whitespace, then take the
/// longest `[+-]?digits` prefix as an integer; 0 when there is none.
fn parse_leading_integer(s: &str) -> i32 {
    let s = s.trim_start_matches(|c: char| c.is_ascii_whitespace());
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    s[..end].parse().unwrap_or(0)
}

/// `sscanf("%f")` semantics: skip leading whitespace, then take the
/// longest `[+-]?digits[.digits][e[+-]digits]` prefix as a float; 0 when
/// there is none.
fn parse_leading_float(s: &str) -> f32 {
    let s = s.trim_start_matches(|c: char| c.is_ascii_whitespace());
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        // only consume the exponent when it has digits
        if exp_end > digits_start {
            end = exp_end;
        }
    }
    s[..end].parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_leading_integer() {
        assert_eq!(parse_leading_integer("42"), 42);
        assert_eq!(parse_leading_integer("-7"), -7);
        assert_eq!(parse_leading_integer("12abc"), 12);
        assert_eq!(parse_leading_integer("abc"), 0);
        assert_eq!(parse_leading_integer(""), 0);
    }

    #[test]
    fn test_parse_leading_integer_skips_whitespace() {
        assert_eq!(parse_leading_integer(" 42"), 42);
        assert_eq!(parse_leading_integer("\t\n-7"), -7);
        assert_eq!(parse_leading_integer("  "), 0);
    }

    #[test]
    fn test_parse_leading_float() {
        assert_eq!(parse_leading_float("3.5"), 3.5);
        assert_eq!(parse_leading_float("-0.25xyz"), -0.25);
        assert_eq!(parse_leading_float("2e3"), 2000.0);
        assert_eq!(parse_leading_float("1.5e"), 1.5);
        assert_eq!(parse_leading_float("nope"), 0.0);
    }

    #[test]
    fn test_parse_leading_float_skips_whitespace() {
        assert_eq!(parse_leading_float("  3.5"), 3.5);
        assert_eq!(parse_leading_float("\t-0.25"), -0.25);
    }

    #[test]
    fn test_format_float_g_fixed_notation() {
        assert_eq!(format_float_g(0.0), "0");
        assert_eq!(format_float_g(3.0), "3");
        assert_eq!(format_float_g(3.5), "3.5");
        assert_eq!(format_float_g(-0.25), "-0.25");
        assert_eq!(format_float_g(0.0001), "0.0001");
        // six significant digits, not shortest round-trip
        assert_eq!(format_float_g(2.0 / 3.0), "0.666667");
        assert_eq!(format_float_g(999999.0), "999999");
    }

    #[test]
    fn test_format_float_g_scientific_notation() {
        assert_eq!(format_float_g(123456789.0), "1.23457e+08");
        assert_eq!(format_float_g(1000000.0), "1e+06");
        assert_eq!(format_float_g(0.00001), "1e-05");
        assert_eq!(format_float_g(-2.5e10), "-2.5e+10");
    }
}

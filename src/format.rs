//! Number formatting that matches what the prediction page used to show.
//!
//! `to_fixed` follows `Number.prototype.toFixed`: the exact binary value is
//! rounded, so `1.005` (stored as 1.00499999...) becomes `1.00`, while a true
//! tie such as `0.125` rounds away from zero to `0.13`.

use serde_json::Value;

const EXPONENT_UPPER: f64 = 1e21;
const EXPONENT_LOWER: f64 = 1e-6;

pub fn to_fixed(value: f64, digits: usize) -> String {
    if let Some(text) = non_finite_label(value) {
        return text.to_string();
    }
    if value.abs() >= EXPONENT_UPPER {
        return format_verbatim(value);
    }
    // -0 prints as "0.00"
    let value = if value == 0.0 { 0.0 } else { value };
    let scale = 10f64.powi(digits as i32);
    let scaled = value * scale;
    if scaled.fract().abs() == 0.5 && scaled / scale == value {
        return format!("{:.*}", digits, scaled.round() / scale);
    }
    format!("{:.*}", digits, value)
}

/// Shortest round-trip text of a number, the way a JS template literal shows it.
pub fn format_verbatim(value: f64) -> String {
    if let Some(text) = non_finite_label(value) {
        return text.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs();
    if magnitude >= EXPONENT_UPPER || magnitude < EXPONENT_LOWER {
        let text = format!("{value:e}");
        return match text.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{mantissa}e+{exponent}")
            }
            _ => text,
        };
    }
    format!("{value}")
}

/// Text a JS template literal produces for a JSON field; `None` is a field the
/// payload left out.
pub fn format_json_verbatim(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        Some(Value::Number(number)) => match number.as_f64() {
            Some(float) => format_verbatim(float),
            None => number.to_string(),
        },
        Some(Value::String(text)) => text.clone(),
        // arrays join their elements with commas, holes print as nothing
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => format_json_verbatim(Some(other)),
            })
            .collect::<Vec<_>>()
            .join(","),
        Some(Value::Object(_)) => "[object Object]".to_string(),
    }
}

fn non_finite_label(value: f64) -> Option<&'static str> {
    if value.is_nan() {
        Some("NaN")
    } else if value == f64::INFINITY {
        Some("Infinity")
    } else if value == f64::NEG_INFINITY {
        Some("-Infinity")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_to_fixed_rounds_binary_value() {
        assert_eq!(to_fixed(100.456, 2), "100.46");
        assert_eq!(to_fixed(0.123, 2), "0.12");
        assert_eq!(to_fixed(0.456, 2), "0.46");
        assert_eq!(to_fixed(1.005, 2), "1.00");
        assert_eq!(to_fixed(105.0, 2), "105.00");
    }

    #[test]
    fn test_to_fixed_exact_ties_round_away_from_zero() {
        assert_eq!(to_fixed(0.125, 2), "0.13");
        assert_eq!(to_fixed(2.5, 0), "3");
        assert_eq!(to_fixed(-0.375, 2), "-0.38");
    }

    #[test]
    fn test_to_fixed_edge_values() {
        assert_eq!(to_fixed(-0.0, 2), "0.00");
        assert_eq!(to_fixed(-0.001, 2), "-0.00");
        assert_eq!(to_fixed(f64::NAN, 2), "NaN");
        assert_eq!(to_fixed(f64::NEG_INFINITY, 2), "-Infinity");
        assert_eq!(to_fixed(1e21, 2), "1e+21");
    }

    #[test]
    fn test_format_verbatim() {
        assert_eq!(format_verbatim(105.0), "105");
        assert_eq!(format_verbatim(105.5), "105.5");
        assert_eq!(format_verbatim(-0.0), "0");
        assert_eq!(format_verbatim(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_verbatim(1e-7), "1e-7");
        assert_eq!(format_verbatim(f64::INFINITY), "Infinity");
    }

    #[test]
    fn test_format_json_verbatim() {
        assert_eq!(format_json_verbatim(None), "undefined");
        assert_eq!(format_json_verbatim(Some(&json!(null))), "null");
        assert_eq!(format_json_verbatim(Some(&json!(105))), "105");
        assert_eq!(format_json_verbatim(Some(&json!(110.5))), "110.5");
        assert_eq!(format_json_verbatim(Some(&json!("Buy"))), "Buy");
        assert_eq!(format_json_verbatim(Some(&json!([1, null, "a"]))), "1,,a");
        assert_eq!(format_json_verbatim(Some(&json!({"a": 1}))), "[object Object]");
    }
}

//! Ingress/egress shaping values carried in pod annotations.
//!
//! Values use the Kubernetes resource-quantity notation (`"2M"`, `"1.5Gi"`,
//! `"10e6"`) and are accepted only within [`MIN_BANDWIDTH`, `MAX_BANDWIDTH`].

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Annotation requesting ingress shaping, in bits per second.
pub const INGRESS_BANDWIDTH_ANNOTATION: &str = "kubernetes.io/ingress-bandwidth";
/// Annotation requesting egress shaping, in bits per second.
pub const EGRESS_BANDWIDTH_ANNOTATION: &str = "kubernetes.io/egress-bandwidth";

/// Smallest accepted rate (`1k`).
pub const MIN_BANDWIDTH: i64 = 1_000;
/// Largest accepted rate (`1P`).
pub const MAX_BANDWIDTH: i64 = 1_000_000_000_000_000;

/// Validated shaping request. `None` means no shaping, which is not the
/// same as a zero rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BandwidthSpec {
    pub ingress: Option<u64>,
    pub egress: Option<u64>,
}

impl BandwidthSpec {
    /// Ingress as passed to the agent: the decimal rate, or empty when unset.
    pub fn ingress_arg(&self) -> String {
        agent_arg(self.ingress)
    }

    /// Egress as passed to the agent: the decimal rate, or empty when unset.
    pub fn egress_arg(&self) -> String {
        agent_arg(self.egress)
    }
}

fn agent_arg(value: Option<u64>) -> String {
    match value {
        Some(v) if v > 0 => v.to_string(),
        _ => String::new(),
    }
}

/// Read both bandwidth annotations. Either one failing fails the whole call.
pub fn extract_bandwidth(annotations: &HashMap<String, String>) -> Result<BandwidthSpec> {
    let ingress = annotations
        .get(INGRESS_BANDWIDTH_ANNOTATION)
        .map(|value| parse_and_validate_bandwidth("ingress", value))
        .transpose()?;
    let egress = annotations
        .get(EGRESS_BANDWIDTH_ANNOTATION)
        .map(|value| parse_and_validate_bandwidth("egress", value))
        .transpose()?;

    Ok(BandwidthSpec { ingress, egress })
}

/// Parse one quantity and check it against the accepted range.
pub fn parse_and_validate_bandwidth(field: &'static str, value: &str) -> Result<u64> {
    let parsed = parse_quantity(value).map_err(|reason| Error::InvalidQuantity {
        field,
        value: value.to_string(),
        reason,
    })?;

    if parsed < MIN_BANDWIDTH {
        return Err(Error::BandwidthOutOfRange {
            field,
            value: parsed,
            bound: "small (< 1000)",
        });
    }
    if parsed > MAX_BANDWIDTH {
        return Err(Error::BandwidthOutOfRange {
            field,
            value: parsed,
            bound: "large (> 1000000000000000)",
        });
    }

    // In range, so non-negative.
    Ok(parsed as u64)
}

enum Suffix {
    Decimal(i32),
    Binary(u32),
}

/// Parse a resource quantity into its integer value, rounding up.
///
/// Magnitudes that do not fit in an `i64` saturate.
pub fn parse_quantity(input: &str) -> std::result::Result<i64, String> {
    if input.is_empty() {
        return Err("quantity is empty".to_string());
    }

    let (negative, rest) = match input.as_bytes()[0] {
        b'-' => (true, &input[1..]),
        b'+' => (false, &input[1..]),
        _ => (false, input),
    };

    let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    let (int_part, rest) = rest.split_at(int_len);
    let (frac_part, suffix) = match rest.strip_prefix('.') {
        Some(after_dot) => {
            let frac_len = after_dot.bytes().take_while(u8::is_ascii_digit).count();
            after_dot.split_at(frac_len)
        }
        None => ("", rest),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err("quantity has no digits".to_string());
    }

    let suffix = parse_suffix(suffix)?;
    let (dec_exp, bin_exp) = match suffix {
        Suffix::Decimal(exp) => (exp, 0),
        Suffix::Binary(exp) => (0, exp),
    };

    let magnitude = scaled_magnitude(int_part, frac_part, dec_exp, bin_exp, negative);

    let magnitude = i64::try_from(magnitude).unwrap_or(i64::MAX);
    Ok(if negative { -magnitude } else { magnitude })
}

fn parse_suffix(suffix: &str) -> std::result::Result<Suffix, String> {
    let parsed = match suffix {
        "" => Suffix::Decimal(0),
        "n" => Suffix::Decimal(-9),
        "u" => Suffix::Decimal(-6),
        "m" => Suffix::Decimal(-3),
        "k" => Suffix::Decimal(3),
        "M" => Suffix::Decimal(6),
        "G" => Suffix::Decimal(9),
        "T" => Suffix::Decimal(12),
        "P" => Suffix::Decimal(15),
        "E" => Suffix::Decimal(18),
        "Ki" => Suffix::Binary(10),
        "Mi" => Suffix::Binary(20),
        "Gi" => Suffix::Binary(30),
        "Ti" => Suffix::Binary(40),
        "Pi" => Suffix::Binary(50),
        "Ei" => Suffix::Binary(60),
        other => {
            let exponent = other
                .strip_prefix('e')
                .or_else(|| other.strip_prefix('E'))
                .ok_or_else(|| format!("unable to parse quantity's suffix {other:?}"))?;
            let exponent: i32 = exponent
                .parse()
                .map_err(|_| format!("unable to parse quantity's suffix {other:?}"))?;
            Suffix::Decimal(exponent)
        }
    };
    Ok(parsed)
}

/// Number of decimal digits in `u128::MAX`.
const U128_DIGITS: i64 = 39;

/// `int_part.frac_part * 10^dec_exp * 2^bin_exp`, rounded toward positive
/// infinity once the sign is applied. Exact for any number of digits;
/// saturates at `u128::MAX`.
fn scaled_magnitude(
    int_part: &str,
    frac_part: &str,
    dec_exp: i32,
    bin_exp: u32,
    negative: bool,
) -> u128 {
    let frac_part = frac_part.trim_end_matches('0');
    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes())
        .skip_while(|&b| b == b'0')
        .map(|b| b - b'0')
        .collect();
    if digits.is_empty() {
        return 0;
    }

    // Digits after the decimal point; negative means trailing zeros follow.
    let frac_len = frac_part.len() as i64 - i64::from(dec_exp);

    for _ in 0..bin_exp {
        double(&mut digits);
    }

    let int_len = digits.len() as i64 - frac_len;
    if int_len > U128_DIGITS {
        return u128::MAX;
    }
    if int_len <= 0 {
        // Only a nonzero fraction is left.
        return if negative { 0 } else { 1 };
    }

    let split = (int_len as usize).min(digits.len());
    let (int_digits, frac_digits) = digits.split_at(split);

    let mut value: u128 = 0;
    for &d in int_digits {
        value = match value.checked_mul(10).and_then(|v| v.checked_add(u128::from(d))) {
            Some(v) => v,
            None => return u128::MAX,
        };
    }
    for _ in int_digits.len() as i64..int_len {
        value = match value.checked_mul(10) {
            Some(v) => v,
            None => return u128::MAX,
        };
    }

    let has_fraction = frac_digits.iter().any(|&d| d != 0);
    if has_fraction && !negative {
        value.saturating_add(1)
    } else {
        value
    }
}

/// Double a big-endian decimal digit vector in place.
fn double(digits: &mut Vec<u8>) {
    let mut carry = 0;
    for d in digits.iter_mut().rev() {
        let v = *d * 2 + carry;
        *d = v % 10;
        carry = v / 10;
    }
    if carry > 0 {
        digits.insert(0, carry);
    }
}

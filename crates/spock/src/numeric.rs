//! The numeric kernel: scalar arithmetic with unit composition.
//!
//! Units are free-form strings, not a fixed basis — `AttachUnit` accepts
//! whatever symbol a script writes (`"N"`, `"m/s"`, `"furlong"`).
//! `MulNumeric`/`DivNumeric` look up known compositions in a small static
//! table (`m * m -> m^2`, `m / s -> m_per_s`, `kg * m_per_s^2 -> N`) and
//! synthesize a fallback name for anything the table doesn't cover, so
//! composition never rejects a quantity for carrying an unrecognised unit.

use crate::error::{SpockError, SpockResult};

/// Known `(a, b) -> composed` multiplication entries. Checked in both
/// operand orders.
const MUL_TABLE: &[(&str, &str, &str)] = &[
    ("m", "m", "m^2"),
    ("m", "m^2", "m^3"),
    ("kg", "m_per_s^2", "N"),
    ("N", "m", "J"),
];

/// Known `(a, b) -> composed` division entries, checked in the given
/// operand order only (division is not commutative).
const DIV_TABLE: &[(&str, &str, &str)] = &[
    ("m", "s", "m_per_s"),
    ("m_per_s", "s", "m_per_s^2"),
    ("m^2", "m", "m"),
    ("m^3", "m^2", "m"),
];

/// Multiplies two magnitudes and composes their units.
///
/// A `None` unit acts as a scalar multiplier and leaves the other
/// operand's unit unchanged. Two present units compose via [`MUL_TABLE`]
/// when a matching entry exists; otherwise the composed unit is a
/// synthesized `"a*b"` name.
#[must_use]
pub fn compose_mul(a_mag: f64, a_unit: &Option<String>, b_mag: f64, b_unit: &Option<String>) -> (f64, Option<String>) {
    let unit = match (a_unit, b_unit) {
        (None, None) => None,
        (Some(u), None) | (None, Some(u)) => Some(u.clone()),
        (Some(u1), Some(u2)) => Some(lookup_mul(u1, u2)),
    };
    (a_mag * b_mag, unit)
}

fn lookup_mul(a: &str, b: &str) -> String {
    for (x, y, result) in MUL_TABLE {
        if (*x == a && *y == b) || (*x == b && *y == a) {
            return (*result).to_string();
        }
    }
    format!("{a}*{b}")
}

/// Divides two magnitudes and composes their units. `0.0` divisor is a
/// `NumericError`, never `inf`/`NaN` leaking into a `Value`.
pub fn compose_div(a_mag: f64, a_unit: &Option<String>, b_mag: f64, b_unit: &Option<String>) -> SpockResult<(f64, Option<String>)> {
    if b_mag == 0.0 {
        return Err(SpockError::Numeric("division by zero".to_string()));
    }
    let unit = match (a_unit, b_unit) {
        (None, None) => None,
        (Some(u), None) => Some(u.clone()),
        (None, Some(u)) => Some(format!("1/{u}")),
        (Some(u1), Some(u2)) => Some(lookup_div(u1, u2)),
    };
    Ok((a_mag / b_mag, unit))
}

fn lookup_div(a: &str, b: &str) -> String {
    for (x, y, result) in DIV_TABLE {
        if *x == a && *y == b {
            return (*result).to_string();
        }
    }
    if a == b {
        return "1".to_string();
    }
    format!("{a}/{b}")
}

/// Adds two magnitudes. Units must match exactly (`AddNumeric` requires
/// compatible quantities); mismatched units are a `NumericError`, not an
/// implicit scalar fallback.
pub fn combine(a_mag: f64, a_unit: &Option<String>, b_mag: f64, b_unit: &Option<String>) -> SpockResult<(f64, Option<String>)> {
    if a_unit != b_unit {
        return Err(SpockError::Numeric(format!(
            "cannot combine incompatible units {} and {}",
            a_unit.as_deref().unwrap_or("1"),
            b_unit.as_deref().unwrap_or("1"),
        )));
    }
    Ok((a_mag + b_mag, a_unit.clone()))
}

/// Subtracts `b_mag` from `a_mag`. Units must match exactly, same as
/// [`combine`].
pub fn subtract(a_mag: f64, a_unit: &Option<String>, b_mag: f64, b_unit: &Option<String>) -> SpockResult<(f64, Option<String>)> {
    if a_unit != b_unit {
        return Err(SpockError::Numeric(format!(
            "cannot combine incompatible units {} and {}",
            a_unit.as_deref().unwrap_or("1"),
            b_unit.as_deref().unwrap_or("1"),
        )));
    }
    Ok((a_mag - b_mag, a_unit.clone()))
}

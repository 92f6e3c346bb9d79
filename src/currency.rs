//! Locale-aware currency rendering.
//!
//! Formatting is a pure function of `(value, locale)` and is applied only at
//! emission time; the fold accumulates in raw numeric space so no
//! intermediate rounding can creep in.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// The locales the formatter knows about. `EnUs` is the default.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Locale {
    /// `$1,234,567.89`
    EnUs,
    /// `1.234.567,89 €`
    DeDe,
}

impl Locale {
    fn grouping_separator(self) -> char {
        match self {
            Locale::EnUs => ',',
            Locale::DeDe => '.',
        }
    }

    fn decimal_separator(self) -> char {
        match self {
            Locale::EnUs => '.',
            Locale::DeDe => ',',
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::EnUs => write!(f, "en-US"),
            Locale::DeDe => write!(f, "de-DE"),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown locale {0:?} (expected en-US or de-DE)")]
pub struct UnknownLocale(String);

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "en-us" => Ok(Locale::EnUs),
            "de-de" => Ok(Locale::DeDe),
            _ => Err(UnknownLocale(s.to_owned())),
        }
    }
}

/// Renders a monetary value with two fractional digits and digits grouped in
/// threes, using the locale's separators and symbol placement.
///
/// Values reaching this function are non-negative under the pipeline's input
/// precondition; a negative value is still rendered faithfully (leading
/// minus) rather than masked.
pub fn format_currency(value: f64, locale: Locale) -> String {
    let sign = if value.is_sign_negative() && value != 0.0 {
        "-"
    } else {
        ""
    };
    let fixed = format!("{:.2}", value.abs());
    let (int_digits, frac_digits) = match fixed.split_once('.') {
        Some(parts) => parts,
        None => (fixed.as_str(), "00"),
    };

    let digits = int_digits.as_bytes();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, d) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(locale.grouping_separator());
        }
        grouped.push(*d as char);
    }

    let dec = locale.decimal_separator();
    match locale {
        Locale::EnUs => format!("{sign}${grouped}{dec}{frac_digits}"),
        Locale::DeDe => format!("{sign}{grouped}{dec}{frac_digits} €"),
    }
}

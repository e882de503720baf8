//! Locale contract for the tokenizer.
//!
//! A `LanguageTable` is an immutable bundle of the spellings that differ between
//! spreadsheet locales:
//!
//! - the TRUE/FALSE literals (`TRUE`/`FALSE` vs. `WAHR`/`FALSCH`),
//! - the function argument separator (`,` vs. `;`),
//! - the decimal separator (`.` vs. `,`),
//! - the scientific-notation prefix recognizer used to keep `1E+3` together,
//! - the reformatting that turns a locale number into canonical `1.5` form.
//!
//! The tables are process-wide statics; they never change after first use and
//! can be read from any number of threads.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The built-in locales.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Locale {
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "en-US"))]
    EnUs,
    #[cfg_attr(feature = "serde", serde(rename = "de-DE"))]
    DeDe,
}

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::EnUs, Locale::DeDe];

    /// The language table for this locale.
    pub fn table(self) -> &'static LanguageTable {
        match self {
            Locale::EnUs => &EN_US,
            Locale::DeDe => &DE_DE,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Locale::EnUs => "en-US",
            Locale::DeDe => "de-DE",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown locale '{0}' (expected en-US or de-DE)")]
pub struct UnknownLocale(pub String);

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "en-us" | "en" => Ok(Locale::EnUs),
            "de-de" | "de" => Ok(Locale::DeDe),
            _ => Err(UnknownLocale(s.to_string())),
        }
    }
}

/// Immutable per-locale configuration consulted by the tokenizer.
pub struct LanguageTable {
    pub locale: Locale,
    pub true_literal: &'static str,
    pub false_literal: &'static str,
    pub argument_separator: char,
    pub decimal_separator: char,
    scientific_prefix: Regex,
}

impl fmt::Debug for LanguageTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LanguageTable")
            .field("locale", &self.locale)
            .field("true_literal", &self.true_literal)
            .field("false_literal", &self.false_literal)
            .field("argument_separator", &self.argument_separator)
            .field("decimal_separator", &self.decimal_separator)
            .finish()
    }
}

// Canonical (already reformatted) numeric literal.
static CANONICAL_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+\.?\d*|\.\d+)([Ee][+-]?\d+)?$").unwrap());

static EN_US: Lazy<LanguageTable> = Lazy::new(|| LanguageTable {
    locale: Locale::EnUs,
    true_literal: "TRUE",
    false_literal: "FALSE",
    argument_separator: ',',
    decimal_separator: '.',
    scientific_prefix: Regex::new(r"^\d+(\.\d*)?[Ee]$").unwrap(),
});

static DE_DE: Lazy<LanguageTable> = Lazy::new(|| LanguageTable {
    locale: Locale::DeDe,
    true_literal: "WAHR",
    false_literal: "FALSCH",
    argument_separator: ';',
    decimal_separator: ',',
    scientific_prefix: Regex::new(r"^\d+(,\d*)?[Ee]$").unwrap(),
});

impl LanguageTable {
    /// True when `buffer` is a mantissa followed by `E`, so that a following
    /// `+`/`-` belongs to the exponent.
    pub fn is_scientific_prefix(&self, buffer: &str) -> bool {
        self.scientific_prefix.is_match(buffer)
    }

    /// Rewrite a locale number into the canonical `.`-decimal form.
    pub fn reformat_number<'a>(&self, value: &'a str) -> Cow<'a, str> {
        if self.decimal_separator == '.' || !value.contains(self.decimal_separator) {
            Cow::Borrowed(value)
        } else {
            Cow::Owned(value.replace(self.decimal_separator, "."))
        }
    }

    /// Parse a locale number. Returns `None` for anything that is not a plain
    /// numeric literal (names such as `inf` or `NaN` included) and for
    /// literals too large to represent, such as `1E999`.
    pub fn parse_number(&self, value: &str) -> Option<f64> {
        if self.decimal_separator != '.' && value.contains('.') {
            return None;
        }
        let canonical = self.reformat_number(value);
        if !CANONICAL_NUMBER.is_match(&canonical) {
            return None;
        }
        canonical.parse::<f64>().ok().filter(|v| v.is_finite())
    }

    /// Match the locale's TRUE/FALSE spelling, ignoring ASCII case.
    pub fn parse_logical(&self, value: &str) -> Option<bool> {
        if value.eq_ignore_ascii_case(self.true_literal) {
            Some(true)
        } else if value.eq_ignore_ascii_case(self.false_literal) {
            Some(false)
        } else {
            None
        }
    }
}

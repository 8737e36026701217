// ABOUTME: The twelve zodiac signs with their Spanish labels and header date-range patterns.
// ABOUTME: Provides first-match-wins sign detection and stripping of the redundant header prefix.

//! Sign table and prefix handling.
//!
//! Each horoscope paragraph opens with a header such as
//! `ARIES: 20 MAR - 19 ABR:` followed by the prediction. The table below is
//! evaluated in a fixed order and the first pattern found anywhere in the
//! text wins.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};

/// A zodiac sign as named on Spanish-language horoscope pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    Aries,
    Tauro,
    Geminis,
    Cancer,
    Leo,
    Virgo,
    Libra,
    Escorpio,
    Sagitario,
    Capricornio,
    Acuario,
    Piscis,
}

impl Sign {
    /// All signs in matching order.
    pub const ALL: [Sign; 12] = [
        Sign::Aries,
        Sign::Tauro,
        Sign::Geminis,
        Sign::Cancer,
        Sign::Leo,
        Sign::Virgo,
        Sign::Libra,
        Sign::Escorpio,
        Sign::Sagitario,
        Sign::Capricornio,
        Sign::Acuario,
        Sign::Piscis,
    ];

    /// Canonical uppercase label written to the CSV log.
    pub fn label(self) -> &'static str {
        match self {
            Sign::Aries => "ARIES",
            Sign::Tauro => "TAURO",
            Sign::Geminis => "GÉMINIS",
            Sign::Cancer => "CÁNCER",
            Sign::Leo => "LEO",
            Sign::Virgo => "VIRGO",
            Sign::Libra => "LIBRA",
            Sign::Escorpio => "ESCORPIO",
            Sign::Sagitario => "SAGITARIO",
            Sign::Capricornio => "CAPRICORNIO",
            Sign::Acuario => "ACUARIO",
            Sign::Piscis => "PISCIS",
        }
    }

    /// Header pattern source: name, colon, then `D MON - D MON`.
    fn header_source(self) -> &'static str {
        match self {
            Sign::Aries => r"ARIES:\s*20\s+MAR\s*-\s*19\s+ABR",
            Sign::Tauro => r"TAURO:\s*20\s+ABR\s*-\s*20\s+MAY",
            Sign::Geminis => r"G[EÉ]MINIS:\s*21\s+MAY\s*-\s*21\s+JUN",
            Sign::Cancer => r"C[AÁ]NCER:\s*22\s+JUN\s*-\s*21\s+JUL",
            Sign::Leo => r"LEO:\s*22\s+JUL\s*-\s*22\s+AGO",
            Sign::Virgo => r"VIRGO:\s*23\s+AGO\s*-\s*22\s+SET",
            Sign::Libra => r"LIBRA:\s*23\s+SET\s*-\s*22\s+OCT",
            Sign::Escorpio => r"ESCORPIO:\s*23\s+OCT\s*-\s*22\s+NOV",
            Sign::Sagitario => r"SAGITARIO:\s*23\s+NOV\s*-\s*22\s+DIC",
            Sign::Capricornio => r"CAPRICORNIO:\s*23\s+DIC\s*-\s*21\s+ENE",
            Sign::Acuario => r"ACUARIO:\s*22\s+ENE\s*-\s*17\s+FEB",
            Sign::Piscis => r"PISCIS:\s*18\s+FEB\s*-\s*19\s+MAR",
        }
    }

    /// Compiled, case-insensitive header pattern for this sign.
    pub fn pattern(self) -> &'static Regex {
        &SIGN_PATTERNS[self as usize]
    }

    /// Looks a sign up by name, ignoring case and accents on GÉMINIS/CÁNCER.
    pub fn from_name(name: &str) -> Option<Sign> {
        let upper = name.trim().to_uppercase();
        let folded = upper.replace('É', "E").replace('Á', "A");
        Sign::ALL.into_iter().find(|sign| {
            let label = sign.label().replace('É', "E").replace('Á', "A");
            label == folded
        })
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl Serialize for Sign {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Error returned when a string does not name one of the twelve signs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sign: {0}")]
pub struct UnknownSign(pub String);

impl FromStr for Sign {
    type Err = UnknownSign;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Sign::from_name(s).ok_or_else(|| UnknownSign(s.to_string()))
    }
}

/// Compiled header patterns, indexed by `Sign as usize`.
static SIGN_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    Sign::ALL
        .iter()
        .map(|sign| {
            Regex::new(&format!("(?i){}", sign.header_source()))
                .expect("sign header pattern is valid")
        })
        .collect()
});

/// Separator run right after a header, e.g. ` : ` or `.| `.
///
/// Stops at the first whitespace following the run so an ellipsis opening
/// the prediction itself survives.
static HEADER_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[.:|]*\s*").expect("separator pattern is valid"));

/// Stray `:`/`|` still leading the text after the header is gone.
static LEADING_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\s:|]+").expect("leading separator pattern is valid"));

/// `HORÓSCOPO DE <SIGN>` in a heading.
static HEADING_SIGN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"HOR[ÓO]SCOP[OÓ]\s+DE\s+([A-ZÁÉÍÓÚÜÑ]+)").expect("heading sign pattern is valid")
});

/// A sign header located inside a paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignMatch {
    pub sign: Sign,
    /// Byte offset where the header starts.
    pub start: usize,
    /// Byte offset just past the date range.
    pub end: usize,
}

/// Finds the first sign (in table order) whose header appears anywhere in `text`.
pub fn match_sign(text: &str) -> Option<SignMatch> {
    Sign::ALL.into_iter().find_map(|sign| {
        sign.pattern().find(text).map(|m| SignMatch {
            sign,
            start: m.start(),
            end: m.end(),
        })
    })
}

/// Removes the matched header and its separators from the start of `text`.
///
/// Returns `None` when nothing is left. A header that does not open the
/// paragraph is left in place.
pub fn strip_header(text: &str, matched: &SignMatch) -> Option<String> {
    let opens_text = text[..matched.start].trim().is_empty();
    let rest = if opens_text {
        let tail = &text[matched.end..];
        let sep_len = HEADER_SEPARATOR_RE
            .find(tail)
            .map(|m| m.end())
            .unwrap_or(0);
        &tail[sep_len..]
    } else {
        text
    };

    let cleaned = LEADING_SEPARATOR_RE.replace(rest, "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Matches and strips in one step, yielding `(sign, prediction)`.
pub fn split_prediction(text: &str) -> Option<(Sign, String)> {
    let matched = match_sign(text)?;
    strip_header(text, &matched).map(|prediction| (matched.sign, prediction))
}

/// Reads the sign out of a heading such as `Horóscopo de Aries`.
pub fn sign_from_heading(heading: &str) -> Option<Sign> {
    let upper = heading.trim().to_uppercase();
    HEADING_SIGN_RE
        .captures(&upper)
        .and_then(|caps| caps.get(1))
        .and_then(|name| Sign::from_name(name.as_str()))
}

//! Quote Styles
//!
//! A quote is requested in one of two tones. Each style maps to exactly one
//! fixed prompt, one letter subject and one letter heading.
//!
//! | Style  | Legacy code | Trigger (default) |
//! |--------|-------------|-------------------|
//! | Upbeat | `1`         | 08:00             |
//! | Somber | `0`         | 00:00             |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::generation::QuoteError;

/// Text returned to callers whenever generation fails.
pub const FALLBACK_QUOTE: &str = "Today's quote got lost on the way. Try again tomorrow~";

const UPBEAT_PROMPT: &str =
    "Reply directly with one random short line, girlish and bursting with morning energy.";

const SOMBER_PROMPT: &str =
    "Reply directly with one random short late-night line, melancholic, about a breakup.";

/// Tone of a requested quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStyle {
    /// Energetic, cheerful morning text.
    Upbeat,
    /// Late-night, melancholic text.
    Somber,
}

impl QuoteStyle {
    /// All styles, in trigger order.
    pub const ALL: [Self; 2] = [Self::Upbeat, Self::Somber];

    /// Prompt sent to the inference endpoint for this style.
    #[must_use]
    pub const fn prompt(self) -> &'static str {
        match self {
            Self::Upbeat => UPBEAT_PROMPT,
            Self::Somber => SOMBER_PROMPT,
        }
    }

    /// Subject line of the letter carrying this style of quote.
    #[must_use]
    pub const fn subject(self) -> &'static str {
        match self {
            Self::Upbeat => "A little sunshine for your morning 🌸",
            Self::Somber => "Late-night feelings 🌙",
        }
    }

    /// Heading shown above the quote in the letter body.
    #[must_use]
    pub const fn heading(self) -> &'static str {
        match self {
            Self::Upbeat => "Today's dose of cute has arrived 🌸",
            Self::Somber => "Late-night feelings 🌙",
        }
    }

    /// Lowercase name used in logs, metrics labels and CSS classes.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upbeat => "upbeat",
            Self::Somber => "somber",
        }
    }
}

impl fmt::Display for QuoteStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuoteStyle {
    type Err = QuoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "upbeat" | "1" => Ok(Self::Upbeat),
            "somber" | "0" => Ok(Self::Somber),
            other => Err(QuoteError::InvalidStyle(other.to_string())),
        }
    }
}

/// Legacy numeric selector: `1` is upbeat, `0` is somber.
impl TryFrom<i32> for QuoteStyle {
    type Error = QuoteError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Upbeat),
            0 => Ok(Self::Somber),
            other => Err(QuoteError::InvalidStyle(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("upbeat", QuoteStyle::Upbeat ; "lowercase upbeat")]
    #[test_case("UPBEAT", QuoteStyle::Upbeat ; "uppercase upbeat")]
    #[test_case(" somber ", QuoteStyle::Somber ; "padded somber")]
    #[test_case("Somber", QuoteStyle::Somber ; "capitalized somber")]
    #[test_case("1", QuoteStyle::Upbeat ; "legacy upbeat code")]
    #[test_case("0", QuoteStyle::Somber ; "legacy somber code")]
    fn parses_style_names(input: &str, expected: QuoteStyle) {
        assert_eq!(input.parse::<QuoteStyle>().unwrap(), expected);
    }

    #[test_case("cheerful" ; "unknown name")]
    #[test_case("" ; "empty")]
    #[test_case("2" ; "unknown code")]
    fn rejects_unknown_style_names(input: &str) {
        let err = input.parse::<QuoteStyle>().unwrap_err();
        assert!(matches!(err, QuoteError::InvalidStyle(_)));
    }

    #[test]
    fn legacy_codes_map_to_styles() {
        assert_eq!(QuoteStyle::try_from(1).unwrap(), QuoteStyle::Upbeat);
        assert_eq!(QuoteStyle::try_from(0).unwrap(), QuoteStyle::Somber);
        assert!(matches!(
            QuoteStyle::try_from(2),
            Err(QuoteError::InvalidStyle(code)) if code == "2"
        ));
    }

    #[test]
    fn prompts_are_distinct_per_style() {
        assert_ne!(QuoteStyle::Upbeat.prompt(), QuoteStyle::Somber.prompt());
        assert!(QuoteStyle::Upbeat.prompt().contains("energy"));
        assert!(QuoteStyle::Somber.prompt().contains("late-night"));
    }

    #[test]
    fn display_matches_serde_name() {
        for style in QuoteStyle::ALL {
            let json = serde_json::to_string(&style).unwrap();
            assert_eq!(json, format!("\"{style}\""));
        }
    }
}

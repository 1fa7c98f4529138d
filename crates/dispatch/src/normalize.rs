//! Plain-text normalization seam.
//!
//! The exact inline-markup grammar belongs to the transport collaborator;
//! the dispatcher only requires *some* plain-text view of the message.

use regex::Regex;

/// Produces the plain-text view modules match against.
pub trait TextNormalizer: Send + Sync {
    fn normalize(&self, raw: &str) -> String;
}

/// Removes `[tag:...]` inline markup segments and trims the result.
pub struct MarkupStripper {
    markup: Regex,
}

impl MarkupStripper {
    /// Stripper for the common `[tag:payload]` inline segment shape.
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self {
            markup: Regex::new(r"\[[A-Za-z][A-Za-z0-9_]*:[^\]]*\]")
                .expect("literal pattern compiles"),
        }
    }

    /// Stripper with a transport-specific segment pattern.
    pub fn with_pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            markup: Regex::new(pattern)?,
        })
    }
}

impl Default for MarkupStripper {
    fn default() -> Self {
        Self::new()
    }
}

impl TextNormalizer for MarkupStripper {
    fn normalize(&self, raw: &str) -> String {
        self.markup.replace_all(raw, "").trim().to_string()
    }
}

/// For transports that already deliver plain text.
pub struct Passthrough;

impl TextNormalizer for Passthrough {
    fn normalize(&self, raw: &str) -> String {
        raw.to_string()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markup_segments() {
        let stripper = MarkupStripper::new();
        assert_eq!(
            stripper.normalize("[image:file=abc.png] hello [face:12] there"),
            "hello  there"
        );
    }

    #[test]
    fn plain_text_untouched_apart_from_trim() {
        let stripper = MarkupStripper::new();
        assert_eq!(stripper.normalize("  50% off https://x.example  "), "50% off https://x.example");
    }

    #[test]
    fn custom_pattern() {
        let stripper = MarkupStripper::with_pattern(r"<[^>]+>").unwrap();
        assert_eq!(stripper.normalize("<b>bold</b> move"), "bold move");
    }

    #[test]
    fn bad_pattern_is_an_error() {
        assert!(MarkupStripper::with_pattern("[unclosed").is_err());
    }

    #[test]
    fn passthrough_is_identity() {
        assert_eq!(Passthrough.normalize(" [x:y] "), " [x:y] ");
    }
}

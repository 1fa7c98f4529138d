//! Content fingerprints: SHA-256 over a normalized content feature.

use std::fmt;

use sha2::{Digest, Sha256};

/// Which fingerprint set a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Hash of the text preceding the first URL.
    Text,
    /// Hash of the attached image identifier.
    Image,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Image => write!(f, "image"),
        }
    }
}

/// A 32-byte SHA-256 digest used for dedup membership testing.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Fingerprint a content feature. Surrounding whitespace is ignored so
    /// paraphrased postings that only differ in padding still collide.
    pub fn of(content: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content.trim().as_bytes());
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Full digests drown out log lines; eight hex chars identify plenty.
        write!(
            f,
            "Fingerprint({:02x}{:02x}{:02x}{:02x}…)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_content_collides() {
        assert_eq!(Fingerprint::of("SALE 50% off"), Fingerprint::of("SALE 50% off"));
    }

    #[test]
    fn whitespace_padding_is_ignored() {
        assert_eq!(Fingerprint::of("  SALE \n"), Fingerprint::of("SALE"));
    }

    #[test]
    fn different_content_differs() {
        assert_ne!(Fingerprint::of("SALE"), Fingerprint::of("NEW"));
    }

    #[test]
    fn display_is_lowercase_hex() {
        let hex = Fingerprint::of("x").to_string();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}

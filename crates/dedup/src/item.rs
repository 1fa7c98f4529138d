//! The ephemeral ingestion item handed to the dedup engine.

use std::sync::LazyLock;

use regex::Regex;

use crate::fingerprint::Fingerprint;

#[allow(clippy::expect_used)]
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("literal pattern compiles"));

/// One ingested news item: the text before its first URL, the URL itself,
/// and an optional attached-image identifier. Produced by an ingestion
/// collaborator, consumed once by [`crate::DedupEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsItem {
    pub prefix_text: String,
    pub url: String,
    pub image_id: Option<String>,
}

impl NewsItem {
    pub fn new(prefix_text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            prefix_text: prefix_text.into(),
            url: url.into(),
            image_id: None,
        }
    }

    #[must_use]
    pub fn with_image(mut self, image_id: impl Into<String>) -> Self {
        self.image_id = Some(image_id.into());
        self
    }

    /// Split a raw posting into prefix text and first URL. Returns `None`
    /// when the text carries no URL at all.
    pub fn from_message(text: &str) -> Option<Self> {
        let m = URL_RE.find(text)?;
        Some(Self::new(&text[..m.start()], m.as_str()))
    }

    pub fn text_fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.prefix_text)
    }

    pub fn image_fingerprint(&self) -> Option<Fingerprint> {
        self.image_id.as_deref().map(Fingerprint::of)
    }
}

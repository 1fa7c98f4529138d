use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("module already registered: {name}")]
    Conflict { name: String },

    #[error("module not found: {name}")]
    NotFound { name: String },

    #[error("module {name} failed to load")]
    Load {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn conflict(name: impl Into<String>) -> Self {
        Self::Conflict { name: name.into() }
    }

    #[must_use]
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    #[must_use]
    pub fn load(name: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Load {
            name: name.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

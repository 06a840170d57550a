use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    TomlSerialize(#[from] toml::ser::Error),
    #[error(transparent)]
    Edit(#[from] toml_edit::TomlError),
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
    #[error("malformed descriptor {path}: {source}")]
    MalformedDescriptor {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("project not found: {0}")]
    NotFound(String),
}

impl Error {
    #[must_use]
    pub fn malformed(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::MalformedDescriptor {
            path: path.into(),
            source,
        }
    }

    /// Whether this error came from descriptor syntax rather than I/O.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedDescriptor { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

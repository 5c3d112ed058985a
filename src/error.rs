use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    YAML(#[from] serde_yaml::Error),
    #[error(transparent)]
    AhoCorasick(#[from] aho_corasick::BuildError),
    #[error("failed to load rules from {path}: {source}")]
    Rules {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },
    #[error("{category} rule #{index} has no patterns")]
    EmptyRule { category: &'static str, index: usize },
    #[error("unknown mapper {0:?}")]
    UnknownMapper(String),
    #[error("mapper {name:?} is missing its {what}")]
    InvalidMapper { name: String, what: &'static str },
}

impl Error {
    pub(crate) fn in_file(self, path: impl Into<PathBuf>) -> Self {
        Error::Rules {
            path: path.into(),
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

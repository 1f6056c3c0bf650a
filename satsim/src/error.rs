//! Error type shared by the library
//!
//! Setup problems (bad scenario, backend unavailable) and the degenerate
//! body-at-center precondition are errors. Numeric divergence between the
//! reference and accelerated paths is not: the oracle reports it as a value.

#[derive(thiserror::Error, Debug)]
pub enum SimError {
    #[error("invalid scenario: {0}")]
    Config(String),

    #[error("execution backend unavailable: {0}")]
    Backend(String),

    #[error("body {index} coincides with the gravitational center")]
    BodyAtCenter { index: usize },

    #[error("cannot read scenario: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse scenario: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;

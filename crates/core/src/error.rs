use thiserror::Error;

/// Failures surfaced while turning a SERP into a [`crate::models::PageExtraction`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("no parser registered for search engine '{0}'")]
    UnknownEngine(String),
    #[error("no registered search engine matches {0}")]
    UnrecognizedSource(String),
    /// The page does not have the result container this engine/variant expects.
    #[error("{engine}: result container '{container}' not found (variant '{variant}')")]
    MalformedPage {
        engine: String,
        variant: String,
        container: String,
    },
}

/// Fatal errors while constructing parsers or the registry.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("search engine name cannot be empty")]
    EmptyName,
    #[error("search engine '{0}' is registered more than once")]
    DuplicateEngine(String),
    #[error("{engine}: invalid url pattern")]
    InvalidPattern {
        engine: String,
        #[source]
        source: regex::Error,
    },
    #[error("{engine}: invalid link rewrite '{pattern}': {reason}")]
    InvalidRewrite {
        engine: String,
        pattern: String,
        reason: String,
    },
    #[error("{engine}: invalid {field} selector '{selector}': {reason}")]
    InvalidSelector {
        engine: String,
        field: String,
        selector: String,
        reason: String,
    },
    #[error("{engine}: variant '{variant}' has no {field} selector")]
    MissingSelector {
        engine: String,
        variant: String,
        field: &'static str,
    },
    #[error("{engine}: variant '{variant}' is declared more than once")]
    DuplicateVariant { engine: String, variant: String },
    #[error("{0}: at least one selector variant is required")]
    NoVariants(String),
    #[error("{engine}: default variant '{variant}' is not declared")]
    UnknownDefaultVariant { engine: String, variant: String },
}

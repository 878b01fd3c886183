use std::collections::HashMap;

use crate::error::{BuildError, ExtractError};
use crate::models::{EngineSpec, SearchEngineIdentity};
use crate::parser::EngineParser;

/// Frozen lookup table from engine names and result-page URLs to parsers.
#[derive(Debug, Clone)]
pub struct ParserRegistry {
    parsers: Vec<EngineParser>,
    by_name: HashMap<String, usize>,
}

impl ParserRegistry {
    /// Registration order is kept; it decides which pattern wins in
    /// [`ParserRegistry::resolve_by_url`].
    pub fn new(parsers: Vec<EngineParser>) -> Result<Self, BuildError> {
        let mut by_name = HashMap::new();
        for (idx, parser) in parsers.iter().enumerate() {
            let identity = parser.identity();
            for key in std::iter::once(&identity.name).chain(identity.aliases.iter()) {
                if by_name.insert(key.clone(), idx).is_some() {
                    return Err(BuildError::DuplicateEngine(key.clone()));
                }
            }
        }
        Ok(Self { parsers, by_name })
    }

    pub fn from_specs(specs: &[EngineSpec]) -> Result<Self, BuildError> {
        let parsers = specs
            .iter()
            .map(EngineParser::new)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(parsers)
    }

    /// Exact, case-insensitive lookup by engine name or alias.
    pub fn resolve_by_name(&self, engine_name: &str) -> Result<&EngineParser, ExtractError> {
        self.by_name
            .get(&engine_name.to_lowercase())
            .map(|&idx| &self.parsers[idx])
            .ok_or_else(|| ExtractError::UnknownEngine(engine_name.to_string()))
    }

    /// First registered engine whose URL pattern matches.
    pub fn resolve_by_url(&self, url: &str) -> Result<&EngineParser, ExtractError> {
        self.parsers
            .iter()
            .find(|p| p.matches_url(url))
            .ok_or_else(|| ExtractError::UnrecognizedSource(url.to_string()))
    }

    pub fn engines(&self) -> impl Iterator<Item = &SearchEngineIdentity> {
        self.parsers.iter().map(EngineParser::identity)
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}

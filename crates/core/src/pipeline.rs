use scraper::Html;
use tracing::debug;

use crate::error::ExtractError;
use crate::models::PageExtraction;
use crate::parser::EngineParser;
use crate::registry::ParserRegistry;

/// What the transport knows about a fetched result page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceHint {
    pub url: Option<String>,
    pub engine: Option<String>,
}

impl SourceHint {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            engine: None,
        }
    }

    pub fn engine(name: impl Into<String>) -> Self {
        Self {
            url: None,
            engine: Some(name.into()),
        }
    }

    pub fn with_engine(mut self, name: impl Into<String>) -> Self {
        self.engine = Some(name.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// `http://` and `https://` strings are URLs, anything else an engine name.
impl From<&str> for SourceHint {
    fn from(hint: &str) -> Self {
        let hint = hint.trim();
        let lower = hint.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::url(hint)
        } else {
            Self::engine(hint)
        }
    }
}

/// Raw SERP text in, structured results out. Performs no I/O.
#[derive(Debug, Clone)]
pub struct ExtractionPipeline {
    registry: ParserRegistry,
}

impl ExtractionPipeline {
    pub fn new(registry: ParserRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ParserRegistry {
        &self.registry
    }

    /// URL resolution first; the engine name is the fallback when the URL
    /// matches no registered pattern (or no URL is known).
    pub fn resolve(&self, hint: &SourceHint) -> Result<&EngineParser, ExtractError> {
        match (&hint.url, &hint.engine) {
            (Some(url), engine) => match self.registry.resolve_by_url(url) {
                Ok(parser) => Ok(parser),
                Err(err) => match engine {
                    Some(name) => {
                        debug!(%url, engine = %name, "url not recognized, resolving by engine name");
                        self.registry.resolve_by_name(name)
                    }
                    None => Err(err),
                },
            },
            (None, Some(name)) => self.registry.resolve_by_name(name),
            (None, None) => Err(ExtractError::UnknownEngine(String::new())),
        }
    }

    pub fn process(
        &self,
        raw_html: &str,
        hint: impl Into<SourceHint>,
    ) -> Result<PageExtraction, ExtractError> {
        let hint = hint.into();
        let parser = self.resolve(&hint)?;
        let document = Html::parse_document(raw_html);
        parser.extract(&document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EngineSpec, PageMarker, SearchEngineIdentity, SelectorSet};
    use pretty_assertions::assert_eq;

    fn pipeline() -> ExtractionPipeline {
        let foobar = EngineSpec {
            identity: SearchEngineIdentity {
                name: "foobar".to_string(),
                aliases: vec![],
                url_pattern: r"^https?://www\.foobar".to_string(),
                search_url: "https://www.foobar.com/search".to_string(),
                query_param: "q".to_string(),
            },
            default_variant: None,
            variants: vec![SelectorSet {
                tag: "default".to_string(),
                container: "#results_page".to_string(),
                item: ".results".to_string(),
                link: ".fb-link > a::attr(href)".to_string(),
                title: Some(".fb-link > a::text".to_string()),
                ..Default::default()
            }],
            effective_query: vec![],
            reported_count: vec!["#total::text".to_string()],
            page_number: vec![],
            no_results: vec![PageMarker {
                selector: Some("#no_results".to_string()),
                phrase: None,
            }],
            blocked: vec![],
            link_rewrites: vec![],
            visible_link_policy: Default::default(),
        };
        let mut mirror = foobar.clone();
        mirror.identity.name = "mirror".to_string();
        mirror.identity.url_pattern = r"^https?://mirror\.example".to_string();
        mirror.variants[0].container = "#mirror_results".to_string();
        ExtractionPipeline::new(ParserRegistry::from_specs(&[foobar, mirror]).unwrap())
    }

    const THREE: &str = r#"<html><body><div id="results_page">
        <div class="results"><span class="fb-link"><a href="https://a.example/1">A</a></span></div>
        <div class="results"><span class="fb-link"><a href="https://b.example/2">B</a></span></div>
        <div class="results"><span class="fb-link"><a href="https://c.example/3">C</a></span></div>
    </div></body></html>"#;

    #[test]
    fn hint_strings_are_classified() {
        assert_eq!(
            SourceHint::from("https://www.foobar.com/search?q=x"),
            SourceHint::url("https://www.foobar.com/search?q=x")
        );
        assert_eq!(SourceHint::from("Bing"), SourceHint::engine("Bing"));
    }

    #[test]
    fn url_hint_resolves_and_extracts_in_order() {
        let page = pipeline()
            .process(THREE, "https://www.foobar.com/search?q=x")
            .unwrap();
        assert_eq!(page.engine, "foobar");
        assert!(!page.no_results);
        let ranked: Vec<_> = page
            .records
            .iter()
            .map(|r| (r.rank, r.link.as_str()))
            .collect();
        assert_eq!(
            ranked,
            vec![
                (1, "https://a.example/1"),
                (2, "https://b.example/2"),
                (3, "https://c.example/3")
            ]
        );
    }

    #[test]
    fn missing_container_propagates_malformed_page() {
        let err = pipeline()
            .process("<html><body><p>layout changed</p></body></html>", "foobar")
            .unwrap_err();
        assert!(matches!(err, ExtractError::MalformedPage { .. }));
    }

    #[test]
    fn unregistered_engine_name_is_unknown_engine() {
        assert_eq!(
            pipeline().process(THREE, "barbaz").unwrap_err(),
            ExtractError::UnknownEngine("barbaz".to_string())
        );
    }

    #[test]
    fn empty_hint_is_unknown_engine() {
        assert!(matches!(
            pipeline().process(THREE, SourceHint::default()),
            Err(ExtractError::UnknownEngine(_))
        ));
    }

    #[test]
    fn unmatched_url_without_name_is_unrecognized() {
        assert_eq!(
            pipeline().process(THREE, "https://127.0.0.1/search").unwrap_err(),
            ExtractError::UnrecognizedSource("https://127.0.0.1/search".to_string())
        );
    }

    #[test]
    fn unmatched_url_falls_back_to_engine_name() {
        let hint = SourceHint::url("http://127.0.0.1:8080/search?q=x").with_engine("foobar");
        let page = pipeline().process(THREE, hint).unwrap();
        assert_eq!(page.records.len(), 3);
    }

    #[test]
    fn url_wins_over_declared_engine_name() {
        // Requested from foobar, served by a mirror with its own layout.
        let html = r#"<html><body><div id="mirror_results">
            <div class="results"><span class="fb-link"><a href="https://m.example/x">M</a></span></div>
        </div></body></html>"#;
        let hint = SourceHint::url("https://mirror.example/search?q=x").with_engine("foobar");
        let page = pipeline().process(html, hint).unwrap();
        assert_eq!(page.engine, "mirror");
        assert_eq!(page.records.len(), 1);
    }

    #[test]
    fn reported_zero_with_two_results_is_not_an_error() {
        let html = r#"<html><body><span id="total">0</span><div id="results_page">
            <div class="results"><span class="fb-link"><a href="https://a.example/1">A</a></span></div>
            <div class="results"><span class="fb-link"><a href="https://b.example/2">B</a></span></div>
        </div></body></html>"#;
        let page = pipeline().process(html, "foobar").unwrap();
        assert!(!page.no_results);
        assert_eq!(page.reported_count, Some(0));
        assert_eq!(page.records.len(), 2);
    }

    #[test]
    fn no_results_page_has_no_records() {
        let html = r#"<html><body><div id="no_results">No hits</div><div id="results_page">
            <div class="results"><span class="fb-link"><a href="https://a.example/1">A</a></span></div>
        </div></body></html>"#;
        let page = pipeline().process(html, "foobar").unwrap();
        assert!(page.no_results);
        assert!(page.records.is_empty());
    }

    #[test]
    fn concurrent_processing_matches_sequential() {
        let pipeline = pipeline();
        let expected = pipeline.process(THREE, "foobar").unwrap();
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| pipeline.process(THREE, "foobar").unwrap()))
                .collect();
            for h in handles {
                assert_eq!(h.join().unwrap(), expected);
            }
        });
    }
}

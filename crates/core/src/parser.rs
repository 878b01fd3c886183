use regex::Regex;
use scraper::Html;
use tracing::{debug, warn};
use url::Url;

use crate::error::{BuildError, ExtractError};
use crate::models::{
    Anomaly, EngineSpec, PageExtraction, PageMarker, ResultRecord, SearchEngineIdentity,
    SelectorSet, VisibleLinkPolicy,
};
use crate::selector::{FieldSelector, clean_text, first_value};

#[derive(Debug, Clone)]
struct Variant {
    tag: String,
    marker: Option<FieldSelector>,
    container: Option<FieldSelector>,
    item: FieldSelector,
    link: FieldSelector,
    title: Option<FieldSelector>,
    snippet: Option<FieldSelector>,
    visible_link: Option<FieldSelector>,
}

#[derive(Debug, Clone)]
struct Marker {
    selector: Option<FieldSelector>,
    phrase: Option<String>,
}

impl Marker {
    fn matches(&self, document: &Html, page_text: &str) -> bool {
        match (&self.selector, &self.phrase) {
            (Some(sel), Some(phrase)) => sel
                .first_in(document)
                .and_then(clean_text)
                .is_some_and(|t| t.contains(phrase.as_str())),
            (Some(sel), None) => sel.first_in(document).is_some(),
            (None, Some(phrase)) => page_text.contains(phrase.as_str()),
            (None, None) => false,
        }
    }
}

#[derive(Debug, Clone)]
struct Rewrite {
    regex: Regex,
    decode: bool,
}

/// Extracts search results from one engine's result pages.
///
/// Built once from an [`EngineSpec`]; immutable afterwards and safe to share
/// between threads.
#[derive(Debug, Clone)]
pub struct EngineParser {
    identity: SearchEngineIdentity,
    url_pattern: Regex,
    base: Option<Url>,
    variants: Vec<Variant>,
    default_variant: usize,
    effective_query: Vec<FieldSelector>,
    reported_count: Vec<FieldSelector>,
    page_number: Vec<FieldSelector>,
    no_results: Vec<Marker>,
    blocked: Vec<Marker>,
    needs_page_text: bool,
    link_rewrites: Vec<Rewrite>,
    visible_link_policy: VisibleLinkPolicy,
}

impl EngineParser {
    pub fn new(spec: &EngineSpec) -> Result<Self, BuildError> {
        let name = spec.identity.name.trim().to_lowercase();
        if name.is_empty() {
            return Err(BuildError::EmptyName);
        }
        let url_pattern =
            Regex::new(&spec.identity.url_pattern).map_err(|source| BuildError::InvalidPattern {
                engine: name.clone(),
                source,
            })?;
        if spec.variants.is_empty() {
            return Err(BuildError::NoVariants(name));
        }
        let variants = spec
            .variants
            .iter()
            .map(|v| compile_variant(&name, v))
            .collect::<Result<Vec<_>, _>>()?;
        for (i, v) in variants.iter().enumerate() {
            if variants[..i].iter().any(|prev| prev.tag == v.tag) {
                return Err(BuildError::DuplicateVariant {
                    engine: name,
                    variant: v.tag.clone(),
                });
            }
        }
        let default_variant = match &spec.default_variant {
            Some(tag) => variants.iter().position(|v| v.tag == *tag).ok_or_else(|| {
                BuildError::UnknownDefaultVariant {
                    engine: name.clone(),
                    variant: tag.clone(),
                }
            })?,
            None => 0,
        };

        let no_results = compile_markers(&name, "no_results", &spec.no_results)?;
        let blocked = compile_markers(&name, "blocked", &spec.blocked)?;
        let needs_page_text = no_results
            .iter()
            .chain(blocked.iter())
            .any(|m| m.selector.is_none() && m.phrase.is_some());

        let link_rewrites = spec
            .link_rewrites
            .iter()
            .map(|rw| {
                let invalid = |reason: String| BuildError::InvalidRewrite {
                    engine: name.clone(),
                    pattern: rw.pattern.clone(),
                    reason,
                };
                let regex = Regex::new(&rw.pattern).map_err(|e| invalid(e.to_string()))?;
                if !regex.capture_names().flatten().any(|n| n == "url") {
                    return Err(invalid("missing named group 'url'".to_string()));
                }
                Ok(Rewrite {
                    regex,
                    decode: rw.decode,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut identity = spec.identity.clone();
        identity.aliases = identity
            .aliases
            .iter()
            .map(|a| a.trim().to_lowercase())
            .filter(|a| !a.is_empty())
            .collect();
        identity.name = name.clone();

        Ok(Self {
            base: Url::parse(&identity.search_url).ok(),
            identity,
            url_pattern,
            variants,
            default_variant,
            effective_query: compile_list(&name, "effective_query", &spec.effective_query)?,
            reported_count: compile_list(&name, "reported_count", &spec.reported_count)?,
            page_number: compile_list(&name, "page_number", &spec.page_number)?,
            no_results,
            blocked,
            needs_page_text,
            link_rewrites,
            visible_link_policy: spec.visible_link_policy,
        })
    }

    pub fn identity(&self) -> &SearchEngineIdentity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn matches_url(&self, url: &str) -> bool {
        self.url_pattern.is_match(url)
    }

    pub fn variant_tags(&self) -> impl Iterator<Item = &str> {
        self.variants.iter().map(|v| v.tag.as_str())
    }

    /// Tag of the selector set that applies to `document`: the first variant
    /// whose marker is present, else the default variant.
    pub fn select_variant(&self, document: &Html) -> &str {
        &self.variants[self.variant_index(document)].tag
    }

    fn variant_index(&self, document: &Html) -> usize {
        self.variants
            .iter()
            .position(|v| {
                v.marker
                    .as_ref()
                    .is_some_and(|m| m.first_in(document).is_some())
            })
            .unwrap_or(self.default_variant)
    }

    pub fn extract_html(&self, raw_html: &str) -> Result<PageExtraction, ExtractError> {
        let document = Html::parse_document(raw_html);
        self.extract(&document)
    }

    pub fn extract(&self, document: &Html) -> Result<PageExtraction, ExtractError> {
        let variant = &self.variants[self.variant_index(document)];
        let page_text = if self.needs_page_text {
            clean_text(document.root_element()).unwrap_or_default()
        } else {
            String::new()
        };

        let reported_count_text = first_value(&self.reported_count, document);
        let mut page = PageExtraction {
            engine: self.identity.name.clone(),
            variant: variant.tag.clone(),
            effective_query: first_value(&self.effective_query, document),
            no_results: false,
            reported_count: reported_count_text.as_deref().and_then(parse_count),
            reported_count_text,
            page_number: first_value(&self.page_number, document)
                .and_then(|t| t.trim().parse().ok()),
            records: Vec::new(),
            anomalies: Vec::new(),
        };

        if self.blocked.iter().any(|m| m.matches(document, &page_text)) {
            warn!(engine = %self.identity.name, "result page is a captcha or block page");
            page.anomalies.push(Anomaly::Blocked);
            return Ok(page);
        }

        if self.no_results.iter().any(|m| m.matches(document, &page_text)) {
            debug!(engine = %self.identity.name, "engine reported no results");
            page.no_results = true;
            return Ok(page);
        }

        let scope = match &variant.container {
            Some(container) => container.first_in(document).ok_or_else(|| {
                warn!(
                    engine = %self.identity.name,
                    variant = %variant.tag,
                    container = container.as_str(),
                    "result container missing, layout may have changed"
                );
                ExtractError::MalformedPage {
                    engine: self.identity.name.clone(),
                    variant: variant.tag.clone(),
                    container: container.as_str().to_string(),
                }
            })?,
            None => document.root_element(),
        };

        for (i, item) in variant.item.all_within(scope).into_iter().enumerate() {
            let position = i + 1;
            let visible_link = variant
                .visible_link
                .as_ref()
                .and_then(|s| s.value_within(item));
            let raw_link = variant.link.value_within(item);
            match self.normalize_link(position, raw_link.as_deref(), visible_link.as_deref()) {
                Ok(link) => page.records.push(ResultRecord {
                    rank: page.records.len() + 1,
                    title: variant.title.as_ref().and_then(|s| s.value_within(item)),
                    link,
                    snippet: variant.snippet.as_ref().and_then(|s| s.value_within(item)),
                    visible_link,
                }),
                Err(anomaly) => {
                    debug!(engine = %self.identity.name, ?anomaly, "result item skipped");
                    page.anomalies.push(anomaly);
                }
            }
        }

        if let Some(reported) = page.reported_count
            && reported < page.records.len() as u64
        {
            page.anomalies.push(Anomaly::CountMismatch {
                reported,
                extracted: page.records.len(),
            });
        }

        debug!(
            engine = %self.identity.name,
            variant = %variant.tag,
            records = page.records.len(),
            "extracted result page"
        );
        Ok(page)
    }

    fn normalize_link(
        &self,
        position: usize,
        raw: Option<&str>,
        visible: Option<&str>,
    ) -> Result<String, Anomaly> {
        let visible_url = match self.visible_link_policy {
            VisibleLinkPolicy::Ignore => None,
            _ => visible.and_then(visible_to_url),
        };
        if let (VisibleLinkPolicy::Prefer, Some(v)) = (self.visible_link_policy, &visible_url) {
            return Ok(v.clone());
        }
        let Some(raw) = raw else {
            return visible_url.ok_or(Anomaly::MissingLink { position });
        };
        let unwrapped = self.unwrap_redirect(raw);
        match self.absolutize(&unwrapped) {
            Some(url) => Ok(url.to_string()),
            None => visible_url.ok_or(Anomaly::InvalidLink {
                position,
                link: unwrapped,
            }),
        }
    }

    fn unwrap_redirect(&self, link: &str) -> String {
        for rw in &self.link_rewrites {
            if let Some(caps) = rw.regex.captures(link)
                && let Some(m) = caps.name("url")
            {
                let captured = m.as_str();
                if rw.decode {
                    return urlencoding::decode(captured)
                        .map(|c| c.into_owned())
                        .unwrap_or_else(|_| captured.to_string());
                }
                return captured.to_string();
            }
        }
        link.to_string()
    }

    fn absolutize(&self, link: &str) -> Option<Url> {
        let parsed = match Url::parse(link) {
            Ok(u) => u,
            Err(url::ParseError::RelativeUrlWithoutBase) => self.base.as_ref()?.join(link).ok()?,
            Err(_) => return None,
        };
        is_web_url(&parsed).then_some(parsed)
    }
}

fn is_web_url(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https") && url.host_str().is_some_and(|h| !h.is_empty())
}

/// Displayed URLs often lack a scheme and carry trailing breadcrumbs.
fn visible_to_url(visible: &str) -> Option<String> {
    let token = visible.split_whitespace().next()?;
    let candidate = if token.contains("://") {
        token.to_string()
    } else {
        format!("http://{token}")
    };
    let url = Url::parse(&candidate).ok()?;
    is_web_url(&url).then(|| url.to_string())
}

/// First number in a result-count text such as "About 1,230,000 results".
fn parse_count(text: &str) -> Option<u64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let mut digits = String::new();
    let mut chars = text[start..].chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else if matches!(c, ',' | '.' | ' ' | '\'' | '\u{a0}' | '\u{202f}')
            && chars.peek().is_some_and(|n| n.is_ascii_digit())
        {
            continue;
        } else {
            break;
        }
    }
    digits.parse().ok()
}

fn compile(engine: &str, field: &str, raw: &str) -> Result<FieldSelector, BuildError> {
    FieldSelector::parse(raw).map_err(|reason| BuildError::InvalidSelector {
        engine: engine.to_string(),
        field: field.to_string(),
        selector: raw.to_string(),
        reason,
    })
}

fn compile_optional(
    engine: &str,
    field: &str,
    raw: Option<&str>,
) -> Result<Option<FieldSelector>, BuildError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => compile(engine, field, s).map(Some),
    }
}

fn compile_list(engine: &str, field: &str, raw: &[String]) -> Result<Vec<FieldSelector>, BuildError> {
    raw.iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| compile(engine, field, s))
        .collect()
}

fn compile_markers(engine: &str, field: &str, raw: &[PageMarker]) -> Result<Vec<Marker>, BuildError> {
    let mut out = Vec::new();
    for m in raw {
        let marker = Marker {
            selector: compile_optional(engine, field, m.selector.as_deref())?,
            phrase: m.phrase.clone().filter(|p| !p.trim().is_empty()),
        };
        if marker.selector.is_some() || marker.phrase.is_some() {
            out.push(marker);
        }
    }
    Ok(out)
}

fn compile_variant(engine: &str, set: &SelectorSet) -> Result<Variant, BuildError> {
    let missing = |field: &'static str| BuildError::MissingSelector {
        engine: engine.to_string(),
        variant: set.tag.clone(),
        field,
    };
    if set.item.trim().is_empty() {
        return Err(missing("item"));
    }
    if set.link.trim().is_empty() {
        return Err(missing("link"));
    }
    Ok(Variant {
        tag: set.tag.clone(),
        marker: compile_optional(engine, "marker", set.marker.as_deref())?,
        container: compile_optional(engine, "container", Some(set.container.as_str()))?,
        item: compile(engine, "item", &set.item)?,
        link: compile(engine, "link", &set.link)?,
        title: compile_optional(engine, "title", set.title.as_deref())?,
        snippet: compile_optional(engine, "snippet", set.snippet.as_deref())?,
        visible_link: compile_optional(engine, "visible_link", set.visible_link.as_deref())?,
    })
}

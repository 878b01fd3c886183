use serde::{Deserialize, Serialize};

/// Static description of a search engine: how to recognize its result pages
/// and where queries are submitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchEngineIdentity {
    pub name: String,
    /// Additional names accepted by name-based resolution (e.g. "googleimg").
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Regex matched against a result page URL.
    pub url_pattern: String,
    pub search_url: String,
    #[serde(default = "default_query_param")]
    pub query_param: String,
}

fn default_query_param() -> String {
    "q".to_string()
}

/// Where each field of a search result lives inside a SERP, for one layout variant.
///
/// Field selectors accept the `::text` and `::attr(name)` suffixes.
/// An empty `title`, `snippet` or `visible_link` means the field is not
/// extractable for this variant. An empty `container` scopes to the whole document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectorSet {
    pub tag: String,
    /// Structural fingerprint that selects this variant when present.
    #[serde(default)]
    pub marker: Option<String>,
    #[serde(default)]
    pub container: String,
    pub item: String,
    pub link: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub visible_link: Option<String>,
}

/// A page-level signal: an element, a phrase, or a phrase inside an element.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageMarker {
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub phrase: Option<String>,
}

/// Unwraps engine redirect links. `pattern` must contain a named group `url`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkRewrite {
    pub pattern: String,
    #[serde(default)]
    pub decode: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VisibleLinkPolicy {
    Ignore,
    /// Use the visible link only when the real link is missing or has no host.
    #[default]
    Fallback,
    /// Always prefer the visible link (engines that only expose redirector URLs).
    Prefer,
}

/// Complete declarative definition of one engine, as loaded from configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineSpec {
    #[serde(flatten)]
    pub identity: SearchEngineIdentity,
    #[serde(default)]
    pub default_variant: Option<String>,
    pub variants: Vec<SelectorSet>,
    #[serde(default)]
    pub effective_query: Vec<String>,
    #[serde(default)]
    pub reported_count: Vec<String>,
    #[serde(default)]
    pub page_number: Vec<String>,
    #[serde(default)]
    pub no_results: Vec<PageMarker>,
    #[serde(default)]
    pub blocked: Vec<PageMarker>,
    #[serde(default)]
    pub link_rewrites: Vec<LinkRewrite>,
    #[serde(default)]
    pub visible_link_policy: VisibleLinkPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultRecord {
    pub rank: usize,
    pub title: Option<String>,
    pub link: String,
    pub snippet: Option<String>,
    pub visible_link: Option<String>,
}

impl ResultRecord {
    /// Host part of the link, as stored alongside each link row.
    pub fn domain(&self) -> Option<String> {
        url::Url::parse(&self.link)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }
}

/// Data-quality irregularities absorbed into a [`PageExtraction`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    MissingLink { position: usize },
    InvalidLink { position: usize, link: String },
    CountMismatch { reported: u64, extracted: usize },
    Blocked,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageExtraction {
    pub engine: String,
    pub variant: String,
    pub effective_query: Option<String>,
    pub no_results: bool,
    pub reported_count: Option<u64>,
    pub reported_count_text: Option<String>,
    pub page_number: Option<u32>,
    pub records: Vec<ResultRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anomalies: Vec<Anomaly>,
}

impl PageExtraction {
    pub fn is_blocked(&self) -> bool {
        self.anomalies.contains(&Anomaly::Blocked)
    }

    pub fn skipped_items(&self) -> usize {
        self.anomalies
            .iter()
            .filter(|a| matches!(a, Anomaly::MissingLink { .. } | Anomaly::InvalidLink { .. }))
            .count()
    }
}

//! Field selectors: CSS plus the `::text` / `::attr(name)` pseudo-elements
//! used by SERP selector sets.

use scraper::{ElementRef, Html, Selector};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Text,
    Attr(String),
}

/// A compiled field selector. Always evaluates to the value of the first match
/// in document order.
#[derive(Debug, Clone)]
pub struct FieldSelector {
    raw: String,
    css: Selector,
    target: Target,
}

impl FieldSelector {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        let (css, target) = split_pseudo(raw);
        if css.is_empty() {
            return Err("empty css selector".to_string());
        }
        if target == Target::Attr(String::new()) {
            return Err("empty attribute name".to_string());
        }
        let compiled = Selector::parse(css).map_err(|e| format!("{e:?}"))?;
        Ok(Self {
            raw: raw.to_string(),
            css: compiled,
            target,
        })
    }

    /// Blank or absent selectors compile to `None` ("field not extractable").
    pub fn parse_optional(raw: Option<&str>) -> Result<Option<Self>, String> {
        match raw.map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => Self::parse(s).map(Some),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn first_in<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        document.select(&self.css).next()
    }

    pub fn first_within<'a>(&self, scope: ElementRef<'a>) -> Option<ElementRef<'a>> {
        scope.select(&self.css).next()
    }

    pub fn all_within<'a>(&self, scope: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        scope.select(&self.css).collect()
    }

    pub fn value_in(&self, document: &Html) -> Option<String> {
        self.first_in(document).and_then(|el| self.value_of(el))
    }

    pub fn value_within(&self, scope: ElementRef<'_>) -> Option<String> {
        self.first_within(scope).and_then(|el| self.value_of(el))
    }

    fn value_of(&self, el: ElementRef<'_>) -> Option<String> {
        match &self.target {
            Target::Text => clean_text(el),
            Target::Attr(name) => el
                .value()
                .attr(name)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
        }
    }
}

/// First non-empty value among `selectors`, tried in order.
pub fn first_value(selectors: &[FieldSelector], document: &Html) -> Option<String> {
    selectors.iter().find_map(|s| s.value_in(document))
}

/// Text content with whitespace runs collapsed to single spaces.
pub fn clean_text(el: ElementRef<'_>) -> Option<String> {
    let text = el.text().collect::<String>();
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

fn split_pseudo(raw: &str) -> (&str, Target) {
    if let Some(css) = raw.strip_suffix("::text") {
        return (css.trim_end(), Target::Text);
    }
    if raw.ends_with(')')
        && let Some(idx) = raw.rfind("::attr(")
    {
        let attr = raw[idx + "::attr(".len()..raw.len() - 1].trim();
        return (raw[..idx].trim_end(), Target::Attr(attr.to_string()));
    }
    (raw, Target::Text)
}

use crate::models::SearchEngineIdentity;

pub fn normalize_query(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Request URL for `query` on `engine`. Pages are 1-based; page 1 adds no
/// paging parameter.
pub fn build_search_url(engine: &SearchEngineIdentity, query: &str, page: u32) -> String {
    let mut params: Vec<(String, String)> = vec![(engine.query_param.clone(), query.to_string())];
    if page > 1 {
        params.push(paging_param(&engine.name, page));
    }
    let qs = serde_urlencoded::to_string(&params).unwrap_or_else(|_| {
        format!("{}={}", engine.query_param, urlencoding::encode(query))
    });
    let sep = if engine.search_url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", engine.search_url, sep, qs)
}

/// Offsets are computed in u64 so any u32 page number fits.
fn paging_param(engine: &str, page: u32) -> (String, String) {
    let skipped = u64::from(page.saturating_sub(1));
    let offset = |per_page: u64| (skipped * per_page).to_string();
    match engine {
        "google" => ("start".into(), offset(10)),
        "bing" => ("first".into(), (skipped * 10 + 1).to_string()),
        "yahoo" => ("b".into(), (skipped * 10 + 1).to_string()),
        "baidu" => ("pn".into(), offset(10)),
        "yandex" => ("p".into(), skipped.to_string()),
        "duckduckgo" => ("s".into(), offset(30)),
        _ => ("page".into(), page.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(name: &str, search_url: &str, param: &str) -> SearchEngineIdentity {
        SearchEngineIdentity {
            name: name.to_string(),
            aliases: vec![],
            url_pattern: ".*".to_string(),
            search_url: search_url.to_string(),
            query_param: param.to_string(),
        }
    }

    #[test]
    fn normalize_collapses_spaces() {
        assert_eq!(normalize_query("  hello   world  "), "hello world");
    }

    #[test]
    fn first_page_has_only_query_param() {
        let google = identity("google", "https://www.google.com/search", "q");
        assert_eq!(
            build_search_url(&google, "rust lang & co", 1),
            "https://www.google.com/search?q=rust+lang+%26+co"
        );
    }

    #[test]
    fn later_pages_use_engine_offsets() {
        let google = identity("google", "https://www.google.com/search", "q");
        assert!(build_search_url(&google, "x", 3).ends_with("q=x&start=20"));
        let bing = identity("bing", "https://www.bing.com/search", "q");
        assert!(build_search_url(&bing, "x", 2).ends_with("q=x&first=11"));
        let custom = identity("foobar", "https://www.foobar.com/search", "query");
        assert!(build_search_url(&custom, "x", 2).ends_with("query=x&page=2"));
    }

    #[test]
    fn huge_page_numbers_do_not_overflow() {
        let google = identity("google", "https://www.google.com/search", "q");
        assert!(build_search_url(&google, "x", u32::MAX).ends_with("start=42949672940"));
        let bing = identity("bing", "https://www.bing.com/search", "q");
        assert!(build_search_url(&bing, "x", u32::MAX).ends_with("first=42949672941"));
    }

    #[test]
    fn existing_query_string_is_extended() {
        let baidu = identity("baidu", "https://www.baidu.com/s?ie=utf-8", "wd");
        assert_eq!(
            build_search_url(&baidu, "matterhorn", 1),
            "https://www.baidu.com/s?ie=utf-8&wd=matterhorn"
        );
    }
}

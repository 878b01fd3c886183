use colored_json::ToColoredJson;
use serde_json::json;

use crate::models::{Anomaly, PageExtraction, ResultRecord};
use tabled::{Table, Tabled, settings::Style};
use terminal_size::{Width as TWidth, terminal_size};
use textwrap::fill as tw_fill;

pub fn calc_title_wrap_columns() -> usize {
    let term_cols = match terminal_size().map(|(w, _)| w) {
        Some(TWidth(n)) if n > 20 => n as usize,
        _ => 100usize,
    };
    term_cols.saturating_sub(50).max(20)
}

pub fn to_json_value(page: &PageExtraction) -> serde_json::Value {
    json!({
        "page": page,
        "count": page.records.len(),
    })
}

pub fn print_pretty_json(page: &PageExtraction) {
    match serde_json::to_string_pretty(&to_json_value(page)) {
        Ok(s) => match s.to_colored_json_auto() {
            Ok(cs) => println!("{cs}"),
            Err(_) => println!("{s}"),
        },
        Err(e) => eprintln!("failed to serialize results: {e}"),
    }
}

/// One-line page summary: engine, variant and the page-level fields that are set.
pub fn summary_line(page: &PageExtraction) -> String {
    let mut parts = vec![format!("{} [{}]", page.engine, page.variant)];
    if let Some(q) = &page.effective_query {
        parts.push(format!("searched for \"{q}\""));
    }
    if let Some(text) = &page.reported_count_text {
        parts.push(format!("reported: {text}"));
    }
    if let Some(n) = page.page_number {
        parts.push(format!("page {n}"));
    }
    parts.push(format!("{} results", page.records.len()));
    parts.join(" | ")
}

pub fn print_table(page: &PageExtraction) {
    println!("{}", summary_line(page));
    if page.is_blocked() {
        println!("Blocked: the engine served a captcha or block page.");
        return;
    }
    if page.records.is_empty() {
        println!("No results.");
        return;
    }
    let title_wrap = calc_title_wrap_columns();
    let mut rows: Vec<DisplayRow> = page.records.iter().map(DisplayRow::from).collect();
    for r in rows.iter_mut() {
        if r.title.len() > title_wrap {
            r.title = tw_fill(&r.title, title_wrap);
        }
    }
    if std::env::var("NO_TABLE").ok().as_deref() == Some("1") {
        for r in &rows {
            println!("  {}. {} ({})", r.rank, r.title, r.url);
        }
    } else {
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }
    for anomaly in &page.anomalies {
        println!("note: {}", describe_anomaly(anomaly));
    }
}

fn describe_anomaly(anomaly: &Anomaly) -> String {
    match anomaly {
        Anomaly::MissingLink { position } => format!("result #{position} has no link"),
        Anomaly::InvalidLink { position, link } => {
            format!("result #{position} has an unusable link: {link}")
        }
        Anomaly::CountMismatch {
            reported,
            extracted,
        } => format!("engine reported {reported} results but {extracted} were extracted"),
        Anomaly::Blocked => "blocked page".to_string(),
    }
}

#[derive(Clone, Tabled)]
struct DisplayRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Site")]
    site: String,
    #[tabled(rename = "URL")]
    url: String,
}

impl From<&ResultRecord> for DisplayRow {
    fn from(r: &ResultRecord) -> Self {
        Self {
            rank: r.rank,
            title: r.title.clone().unwrap_or_else(|| "-".to_string()),
            site: r.domain().unwrap_or_else(|| "-".to_string()),
            url: r.link.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(records: Vec<ResultRecord>) -> PageExtraction {
        PageExtraction {
            engine: "bing".into(),
            variant: "default".into(),
            effective_query: Some("rust".into()),
            no_results: records.is_empty(),
            reported_count: Some(1200),
            reported_count_text: Some("1,200 results".into()),
            page_number: Some(1),
            records,
            anomalies: vec![],
        }
    }

    fn record(rank: usize, title: Option<&str>) -> ResultRecord {
        ResultRecord {
            rank,
            title: title.map(str::to_string),
            link: format!("https://example.com/{rank}"),
            snippet: None,
            visible_link: None,
        }
    }

    #[test]
    fn calc_title_wrap_columns_returns_reasonable_default() {
        assert!(calc_title_wrap_columns() >= 20);
    }

    #[test]
    fn display_row_uses_dash_for_missing_title() {
        let row = DisplayRow::from(&record(2, None));
        assert_eq!(row.title, "-");
        assert_eq!(row.rank, 2);
        assert_eq!(row.site, "example.com");
    }

    #[test]
    fn summary_lists_page_fields() {
        let line = summary_line(&page(vec![record(1, Some("A"))]));
        assert_eq!(
            line,
            "bing [default] | searched for \"rust\" | reported: 1,200 results | page 1 | 1 results"
        );
    }

    #[test]
    fn json_value_carries_count_and_records() {
        let v = to_json_value(&page(vec![record(1, Some("A")), record(2, None)]));
        assert_eq!(v["count"], 2);
        assert_eq!(v["page"]["records"][1]["title"], serde_json::Value::Null);
        assert!(v["page"].get("anomalies").is_none());
    }

    #[test]
    fn printing_does_not_panic() {
        print_table(&page(vec![]));
        print_table(&page(vec![record(1, Some("A"))]));
        print_pretty_json(&page(vec![]));
    }
}

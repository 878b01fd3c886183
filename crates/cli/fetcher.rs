use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};

pub fn build_http_client() -> Result<Client> {
    Client::builder()
        .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/127.0.0.0 Safari/537.36")
        .gzip(true)
        .brotli(true)
        .http2_adaptive_window(true)
        .pool_idle_timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(2)
        .timeout(Duration::from_secs(15))
        .build()
        .context("build http client")
}

/// Single GET; non-200 responses are errors. Retrying is left to the caller.
pub async fn fetch_page(client: &Client, url: &str) -> Result<String> {
    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("request {url}"))?;
    let status = resp.status();
    if status != StatusCode::OK {
        anyhow::bail!("HTTP status {} for {}", status, url);
    }
    resp.text().await.context("read body text")
}

// src/fetch/mod.rs

use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;

pub mod rates;
pub mod table;

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) moexscraper/0.1";

/// Build the shared HTTP client. The cookie store carries the terms-consent
/// agreement across requests within a run.
pub fn http_client(cfg: &Config) -> Result<Client> {
    let mut builder = Client::builder()
        .cookie_store(true)
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT);
    if cfg.bypass_proxy {
        builder = builder.no_proxy();
    }
    builder.build().context("building HTTP client")
}

async fn get_text(client: &Client, url: &Url) -> Result<String> {
    debug!(%url, "GET");
    Ok(client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("GET {} failed", url))?
        .error_for_status()
        .with_context(|| format!("non-success status from {}", url))?
        .text()
        .await
        .with_context(|| format!("reading body from {}", url))?)
}

pub(crate) async fn get_text_with_retry(client: &Client, url: &Url) -> Result<String> {
    let mut attempts = 0;
    loop {
        match get_text(client, url).await {
            Ok(body) => return Ok(body),
            Err(e) if attempts < MAX_RETRIES => {
                attempts += 1;
                let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempts - 1);
                warn!(%url, attempt = attempts, delay_ms = backoff, error = %e, "retrying");
                sleep(Duration::from_millis(backoff)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

// src/fetch/rates.rs

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::{info, instrument, warn};
use url::Url;

use super::{get_text_with_retry, table};
use crate::config::Config;
use crate::reconcile::RawRow;

const USD_RUB: &str = "USD_RUB";
const EUR_RUB: &str = "EUR_RUB";

/// Scrape both indicative-rate tables. The EUR view is occasionally served
/// empty for the default date range; when that happens the request is
/// repeated with both ends of the range pinned to the configured year.
#[instrument(level = "info", skip(client, cfg))]
pub async fn fetch_rates(client: &Client, cfg: &Config) -> Result<(Vec<RawRow>, Vec<RawRow>)> {
    let usd = fetch_currency(client, cfg, USD_RUB, None).await?;
    info!(rows = usd.len(), pair = USD_RUB, "scraped");

    let mut eur = fetch_currency(client, cfg, EUR_RUB, None).await?;
    if eur.is_empty() {
        warn!(
            pair = EUR_RUB,
            year = cfg.fallback_year,
            "no rows for default range, retrying with pinned year"
        );
        eur = fetch_currency(client, cfg, EUR_RUB, Some(cfg.fallback_year)).await?;
    }
    info!(rows = eur.len(), pair = EUR_RUB, "scraped");

    Ok((usd, eur))
}

async fn fetch_currency(
    client: &Client,
    cfg: &Config,
    pair: &str,
    year: Option<i32>,
) -> Result<Vec<RawRow>> {
    let url = page_url(&cfg.rates_url, pair, year)?;
    let mut body = get_text_with_retry(client, &url).await?;

    // The exchange gates first-time visitors behind a terms-of-use page.
    // Following the consent link once stores the agreement cookie; after
    // that the rates page serves normally.
    if let Some(href) = table::consent_href(&body) {
        info!("accepting terms-of-use interstitial");
        let consent = url
            .join(&href)
            .with_context(|| format!("joining consent link {:?}", href))?;
        get_text_with_retry(client, &consent).await?;
        body = get_text_with_retry(client, &url).await?;
    }

    Ok(table::extract_rows(&body))
}

fn page_url(base: &str, pair: &str, year: Option<i32>) -> Result<Url> {
    let mut url = Url::parse(base).with_context(|| format!("parsing rates URL {:?}", base))?;
    url.query_pairs_mut().append_pair("currency", pair);
    if let Some(y) = year {
        let y = y.to_string();
        url.query_pairs_mut()
            .append_pair("d1year", &y)
            .append_pair("d2year", &y);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_url_carries_the_currency_pair() {
        let url = page_url(
            "https://www.moex.com/ru/derivatives/currency-rate.aspx",
            "USD_RUB",
            None,
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.moex.com/ru/derivatives/currency-rate.aspx?currency=USD_RUB"
        );
    }

    #[test]
    fn pinned_year_bounds_both_ends_of_the_range() {
        let url = page_url(
            "https://www.moex.com/ru/derivatives/currency-rate.aspx",
            "EUR_RUB",
            Some(2021),
        )
        .unwrap();
        assert_eq!(
            url.query(),
            Some("currency=EUR_RUB&d1year=2021&d2year=2021")
        );
    }

    #[test]
    fn bad_base_url_is_an_error() {
        assert!(page_url("not a url", "USD_RUB", None).is_err());
    }
}

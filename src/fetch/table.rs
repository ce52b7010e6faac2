// src/fetch/table.rs
//
// Pure extraction of the indicative-rates table out of a page body. Keeps no
// state and does no I/O so the selectors can be exercised against fixture
// documents.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::reconcile::RawRow;

static RATES_TABLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table.tablels").expect("selector should parse"));
static ANY_TABLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table").expect("selector should parse"));
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("selector should parse"));
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td").expect("selector should parse"));
static LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("selector should parse"));

/// Rows are identified by their leading trade date; anything else in the
/// table (headers, footers, notes) is skipped.
static DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}\.\d{2}\.\d{4}$").unwrap());

const CONSENT_TEXT: &str = "Согласен";

/// Href of the terms-of-use consent link, if the page served the
/// interstitial instead of the data. Absence is the normal case.
pub fn consent_href(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    doc.select(&LINK)
        .find(|el| el.text().collect::<String>().trim() == CONSENT_TEXT)
        .and_then(|el| el.value().attr("href").map(str::to_string))
}

/// Extract the rate rows from a page body. Returns an empty vec when the
/// page has no rates table or the table has no data rows; the caller decides
/// whether that warrants the fallback request.
pub fn extract_rows(html: &str) -> Vec<RawRow> {
    let doc = Html::parse_document(html);
    // The rates page marks its data table with the `tablels` class; the
    // EUR view after a form roundtrip sometimes serves a bare table.
    let table = match doc
        .select(&RATES_TABLE)
        .next()
        .or_else(|| doc.select(&ANY_TABLE).next())
    {
        Some(t) => t,
        None => return Vec::new(),
    };

    table.select(&ROW).filter_map(row_fields).collect()
}

fn row_fields(tr: ElementRef) -> Option<RawRow> {
    let cells: Vec<String> = tr
        .select(&CELL)
        .map(|td| td.text().collect::<String>().trim().to_string())
        .collect();
    let [date, iv, it, mv, mt]: [String; 5] = cells.try_into().ok()?;
    if !DATE.is_match(&date) {
        return None;
    }
    Some(RawRow {
        date,
        intermediate_value: iv,
        intermediate_time: it,
        main_value: mv,
        main_time: mt,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATES_PAGE: &str = r#"<html><body>
        <table class="tablels">
          <tr><th>Дата</th><th colspan="2">Промежуточный клиринг</th><th colspan="2">Основной клиринг</th></tr>
          <tr><th></th><th>Курс</th><th>Время</th><th>Курс</th><th>Время</th></tr>
          <tr><td>28.12.2021</td><td>73,8049</td><td>12:30</td><td>73,9343</td><td>18:30</td></tr>
          <tr><td>27.12.2021</td><td>-</td><td>-</td><td>73,5747</td><td>18:30</td></tr>
          <tr><td colspan="5">* курс указан по состоянию на время клиринга</td></tr>
        </table>
        </body></html>"#;

    #[test]
    fn extracts_data_rows_and_skips_headers_and_footers() {
        let rows = extract_rows(RATES_PAGE);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, "28.12.2021");
        assert_eq!(rows[0].intermediate_value, "73,8049");
        assert_eq!(rows[0].main_time, "18:30");
        // placeholder rows come through as scraped; dropping them is the
        // reconciler's job
        assert_eq!(rows[1].intermediate_value, "-");
    }

    #[test]
    fn missing_table_yields_no_rows() {
        assert!(extract_rows("<html><body><p>maintenance</p></body></html>").is_empty());
    }

    #[test]
    fn empty_table_yields_no_rows() {
        let html = r#"<table class="tablels"><tr><th>Дата</th></tr></table>"#;
        assert!(extract_rows(html).is_empty());
    }

    #[test]
    fn falls_back_to_a_bare_table() {
        let html = r#"<table>
          <tr><td>01.11.2021</td><td>71,1</td><td>12:30</td><td>71,2</td><td>18:30</td></tr>
        </table>"#;
        let rows = extract_rows(html);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].main_value, "71,2");
    }

    #[test]
    fn consent_link_is_detected_by_its_text() {
        let html = r#"<html><body>
            <a href="/ru/index/agreement?agree=1">Согласен</a>
            <a href="/ru/index">Не согласен</a>
            </body></html>"#;
        assert_eq!(
            consent_href(html),
            Some("/ru/index/agreement?agree=1".to_string())
        );
    }

    #[test]
    fn consent_link_is_usually_absent() {
        assert_eq!(consent_href(RATES_PAGE), None);
    }
}

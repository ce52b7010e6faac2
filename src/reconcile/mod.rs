// src/reconcile/mod.rs
//
// Pure reconciliation of the two scraped rate tables. The tables are scraped
// independently and may differ in length; rows are paired strictly by index
// position after trimming, never by date.

use thiserror::Error;
use tracing::debug;

/// Sentinel the exchange publishes for a clearing with no data.
pub const NO_DATA: &str = "-";

/// One scraped table row, all fields still text as published.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub date: String,
    pub intermediate_value: String,
    pub intermediate_time: String,
    pub main_value: String,
    pub main_time: String,
}

impl RawRow {
    /// True if any field carries the no-data sentinel.
    pub fn has_placeholder(&self) -> bool {
        [
            &self.date,
            &self.intermediate_value,
            &self.intermediate_time,
            &self.main_value,
            &self.main_time,
        ]
        .iter()
        .any(|f| f.as_str() == NO_DATA)
    }
}

/// A row with both clearing values parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ClearingRow {
    pub date: String,
    pub intermediate_value: f64,
    pub intermediate_time: String,
    pub main_value: f64,
    pub main_time: String,
}

#[derive(Error, Debug, PartialEq)]
pub enum ReconcileError {
    #[error("non-numeric clearing value {value:?} ({currency}, row {row})")]
    Parse {
        currency: &'static str,
        row: usize,
        value: String,
    },

    #[error("zero USD main-clearing value at row {index}")]
    ZeroDenominator { index: usize },

    #[error("no rows left after dropping placeholder rows")]
    Empty,
}

/// Reconciled output: both tables cut to the same length plus the derived
/// EUR/USD ratio per row.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub usd: Vec<ClearingRow>,
    pub eur: Vec<ClearingRow>,
    pub ratio: Vec<f64>,
    pub rows: usize,
    /// Sum of the USD intermediate-clearing column, used by the report
    /// stage as a non-fatal sanity check against the written sheet.
    pub usd_intermediate_sum: f64,
}

/// Aligns the two raw tables and derives the ratio series.
///
/// Placeholder rows are dropped first, then the longer table is truncated
/// from the END to the length of the shorter one. The removed rows are not
/// matched by date; a run where the two series published for different date
/// sets will pair unrelated dates (carried over from the upstream process,
/// pending product review).
pub fn reconcile(usd_raw: &[RawRow], eur_raw: &[RawRow]) -> Result<Reconciled, ReconcileError> {
    let mut usd: Vec<&RawRow> = usd_raw.iter().filter(|r| !r.has_placeholder()).collect();
    let mut eur: Vec<&RawRow> = eur_raw.iter().filter(|r| !r.has_placeholder()).collect();
    debug!(
        usd_dropped = usd_raw.len() - usd.len(),
        eur_dropped = eur_raw.len() - eur.len(),
        "placeholder rows removed"
    );

    let n = usd.len().min(eur.len());
    if n == 0 {
        return Err(ReconcileError::Empty);
    }
    // Positional trim: only the longer table shrinks, from the end.
    usd.truncate(n);
    eur.truncate(n);

    let usd = parse_rows(&usd, "USD/RUB")?;
    let eur = parse_rows(&eur, "EUR/RUB")?;

    let mut ratio = Vec::with_capacity(n);
    for i in 0..n {
        let denominator = usd[i].main_value;
        if denominator == 0.0 {
            return Err(ReconcileError::ZeroDenominator { index: i });
        }
        ratio.push(eur[i].main_value / denominator);
    }

    let usd_intermediate_sum = usd.iter().map(|r| r.intermediate_value).sum();

    Ok(Reconciled {
        usd,
        eur,
        ratio,
        rows: n,
        usd_intermediate_sum,
    })
}

fn parse_rows(rows: &[&RawRow], currency: &'static str) -> Result<Vec<ClearingRow>, ReconcileError> {
    rows.iter()
        .enumerate()
        .map(|(i, raw)| {
            Ok(ClearingRow {
                date: raw.date.clone(),
                intermediate_value: parse_value(&raw.intermediate_value, currency, i)?,
                intermediate_time: raw.intermediate_time.clone(),
                main_value: parse_value(&raw.main_value, currency, i)?,
                main_time: raw.main_time.clone(),
            })
        })
        .collect()
}

/// The exchange publishes decimal commas; normalize before parsing.
fn parse_value(text: &str, currency: &'static str, row: usize) -> Result<f64, ReconcileError> {
    text.trim()
        .replace(',', ".")
        .parse()
        .map_err(|_| ReconcileError::Parse {
            currency,
            row,
            value: text.to_string(),
        })
}

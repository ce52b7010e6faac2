// src/report/mod.rs

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::path::Path;
use tracing::{info, instrument, warn};

use crate::reconcile::{ClearingRow, Reconciled};

/// Column headers as published on the rates page.
const COLUMN_NAMES: [&str; 5] = [
    "Дата",
    "Значение курса промежуточного клиринга",
    "Время промежуточного клиринга",
    "Значение курса основного клиринга",
    "Время основного клиринга",
];
const RATIO_NAME: &str = "Изменение";

/// Financial ruble format applied to every clearing-value and ratio column.
const RUBLE_FORMAT: &str = "#,##0.0000 [$₽-ru-RU]";

const EUR_START_COL: u16 = 5; // USD table occupies A..E, EUR F..J
const RATIO_COL: u16 = 10; // K

/// Write the reconciled tables to `path` and return the last data row
/// (1-based, header row included) for the notification body.
///
/// Layout mirrors the published sheet: USD table at A1, EUR table at F1,
/// the EUR/USD ratio column at K1, values carrying the ruble number format.
/// A `SUM` check row is written below the USD intermediate-clearing column,
/// compared against the reconciler's checksum and cleared again before save;
/// a mismatch is only logged, never fatal.
#[instrument(level = "info", skip(data), fields(rows = data.rows))]
pub fn write_workbook(data: &Reconciled, path: &Path) -> Result<u32> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let ruble = Format::new().set_num_format(RUBLE_FORMAT);

    for (col, name) in COLUMN_NAMES.iter().enumerate() {
        sheet.write_string(0, col as u16, *name)?;
        sheet.write_string(0, col as u16 + EUR_START_COL, *name)?;
    }
    sheet.write_string(0, RATIO_COL, RATIO_NAME)?;

    let mut written_sum = 0.0;
    for (i, row) in data.usd.iter().enumerate() {
        write_clearing_row(sheet, i as u32 + 1, 0, row, &ruble)?;
        written_sum += row.intermediate_value;
    }
    for (i, row) in data.eur.iter().enumerate() {
        write_clearing_row(sheet, i as u32 + 1, EUR_START_COL, row, &ruble)?;
    }
    for (i, ratio) in data.ratio.iter().enumerate() {
        sheet.write_number_with_format(i as u32 + 1, RATIO_COL, *ratio, &ruble)?;
    }

    let last_row = data.rows as u32 + 1;

    // Sum sanity check below the data: the totals of the written USD
    // intermediate-clearing column vs. the reconciler's checksum. The check
    // row is cleared again before save, only the log keeps the outcome.
    let check_row = last_row; // 0-based: one past the last data row
    sheet.write_formula_with_format(
        check_row,
        1,
        format!("=SUM(B2:B{})", last_row).as_str(),
        &ruble,
    )?;
    if written_sum == data.usd_intermediate_sum {
        info!(sum = written_sum, "sum check passed");
    } else {
        warn!(
            written = written_sum,
            expected = data.usd_intermediate_sum,
            "sum check mismatch"
        );
    }
    sheet.write_blank(check_row, 1, &Format::new())?;

    sheet.autofit();
    workbook
        .save(path)
        .with_context(|| format!("saving workbook {}", path.display()))?;

    Ok(last_row)
}

fn write_clearing_row(
    sheet: &mut Worksheet,
    row: u32,
    start_col: u16,
    data: &ClearingRow,
    ruble: &Format,
) -> Result<()> {
    sheet.write_string(row, start_col, &data.date)?;
    sheet.write_number_with_format(row, start_col + 1, data.intermediate_value, ruble)?;
    sheet.write_string(row, start_col + 2, &data.intermediate_time)?;
    sheet.write_number_with_format(row, start_col + 3, data.main_value, ruble)?;
    sheet.write_string(row, start_col + 4, &data.main_time)?;
    Ok(())
}

//! Multi-sheet workbook output.
//!
//! The workbook is first described as plain [`SheetTable`]s, then written with
//! `rust_xlsxwriter`. The plan is what tests inspect; the writer only lays it out.

use crate::model::RegressionResult;
use rust_xlsxwriter::{Format, Workbook, XlsxError};

pub const SUMMARY_SHEET: &str = "Summary";
pub const COEFFICIENTS_SHEET: &str = "Coefficients";
pub const PREDICTIONS_SHEET: &str = "Predicted vs Actual";
pub const RESIDUALS_SHEET: &str = "Residuals";
pub const CORRELATION_SHEET: &str = "Correlation Matrix";

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
}

impl Cell {
    /// Non-finite numbers have no spreadsheet representation and are written as text.
    fn number(value: f64) -> Self {
        if value.is_finite() {
            Cell::Number(value)
        } else {
            Cell::Text(format!("{value}"))
        }
    }

    fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }
}

/// One worksheet: a bold header row followed by data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    pub name: &'static str,
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// Lays out the five sheets of a report workbook in their fixed order.
pub fn plan(result: &RegressionResult, target_name: &str, feature_names: &[String]) -> Vec<SheetTable> {
    let summary = SheetTable {
        name: SUMMARY_SHEET,
        header: vec!["Metric".into(), "Value".into()],
        rows: vec![
            vec![Cell::text("Dependent Variable"), Cell::text(target_name)],
            vec![
                Cell::text("Independent Variables"),
                Cell::text(feature_names.join(", ")),
            ],
            vec![Cell::text("R-squared"), Cell::number(result.r_squared)],
            vec![
                Cell::text("Adjusted R-squared"),
                Cell::number(result.adjusted_r_squared),
            ],
            vec![Cell::text("MSE"), Cell::number(result.mse)],
            vec![Cell::text("Intercept"), Cell::number(result.intercept)],
            vec![
                Cell::text("Observations"),
                Cell::number(result.n_observations as f64),
            ],
        ],
    };

    let coefficients = SheetTable {
        name: COEFFICIENTS_SHEET,
        header: ["Variable", "Coefficient", "P-value", "Significant"]
            .map(String::from)
            .to_vec(),
        rows: result
            .coefficients
            .iter()
            .map(|(name, &coef)| {
                let p = result.p_values.get(name).copied().unwrap_or(f64::NAN);
                let flag = if result.is_significant(name) { "Yes" } else { "No" };
                vec![Cell::text(name), Cell::number(coef), Cell::number(p), Cell::text(flag)]
            })
            .collect(),
    };

    let predictions = SheetTable {
        name: PREDICTIONS_SHEET,
        header: vec!["actual".into(), "predicted".into()],
        rows: result
            .predictions
            .iter()
            .map(|row| vec![Cell::number(row.actual), Cell::number(row.predicted)])
            .collect(),
    };

    let residuals = SheetTable {
        name: RESIDUALS_SHEET,
        header: vec!["residual".into()],
        rows: result.residuals().map(|r| vec![Cell::number(r)]).collect(),
    };

    let matrix = &result.pearson_correlation;
    let mut correlation_header = vec![String::new()];
    correlation_header.extend(matrix.names().iter().cloned());
    let correlation = SheetTable {
        name: CORRELATION_SHEET,
        header: correlation_header,
        rows: matrix
            .names()
            .iter()
            .zip(matrix.values().rows())
            .map(|(name, row)| {
                std::iter::once(Cell::text(name.as_str()))
                    .chain(row.iter().map(|&r| Cell::number(r)))
                    .collect()
            })
            .collect(),
    };

    vec![summary, coefficients, predictions, residuals, correlation]
}

/// Serializes the sheets into an `.xlsx` file held in memory.
pub fn write_workbook(sheets: &[SheetTable]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet.name)?;
        for (col, title) in sheet.header.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, title, &bold)?;
        }
        for (row_index, row) in sheet.rows.iter().enumerate() {
            let row_number = row_index as u32 + 1;
            for (col, cell) in row.iter().enumerate() {
                match cell {
                    Cell::Text(text) => worksheet.write_string(row_number, col as u16, text)?,
                    Cell::Number(value) => worksheet.write_number(row_number, col as u16, *value)?,
                };
            }
        }
        worksheet.set_column_width(0, 24)?;
    }

    workbook.save_to_buffer()
}

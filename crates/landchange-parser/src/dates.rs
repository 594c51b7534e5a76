//! Observation date columns.
//!
//! Exported band tables name each observation column after the composite it
//! came from, e.g. `2015-03-18_SR_B4`. Any `YYYY?MM?DD` run inside the name
//! counts, whatever the separators are.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use polars::prelude::DataFrame;
use regex::Regex;

use crate::errors::TableError;

static DATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4})[^0-9](\d{2})[^0-9](\d{2})").expect("date column pattern compiles")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateColumn {
    pub name: String,
    pub date: NaiveDate,
}

/// Returns `Ok(None)` when the name carries no date, and an error message when
/// it matches the pattern but is not a calendar date.
pub fn parse_column_date(name: &str) -> Result<Option<NaiveDate>, String> {
    let Some(captures) = DATE_PATTERN.captures(name) else {
        return Ok(None);
    };

    let year: i32 = captures[1]
        .parse()
        .map_err(|err| format!("bad year in '{name}': {err}"))?;
    let month: u32 = captures[2]
        .parse()
        .map_err(|err| format!("bad month in '{name}': {err}"))?;
    let day: u32 = captures[3]
        .parse()
        .map_err(|err| format!("bad day in '{name}': {err}"))?;

    NaiveDate::from_ymd_opt(year, month, day)
        .map(Some)
        .ok_or_else(|| format!("{year:04}-{month:02}-{day:02} is not a calendar date"))
}

/// Date-bearing columns of `df`, in table order.
pub fn date_columns(table: &str, df: &DataFrame) -> Result<Vec<DateColumn>, TableError> {
    let mut columns = Vec::new();
    for name in df.get_column_names() {
        let name = name.as_str();
        match parse_column_date(name) {
            Ok(Some(date)) => columns.push(DateColumn {
                name: name.to_string(),
                date,
            }),
            Ok(None) => {}
            Err(message) => {
                return Err(TableError::InvalidDate {
                    table: table.to_string(),
                    column: name.to_string(),
                    message,
                })
            }
        }
    }
    Ok(columns)
}

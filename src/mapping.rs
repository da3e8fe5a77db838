use crate::error::AnalysisError;
use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

/// One transaction row, as delivered by a source adapter: the export's
/// header zipped with the record's values.
pub type Row = HashMap<String, String>;

/// Where the monetary value of a row lives. Exports either carry one signed
/// amount column, or a separate debit and credit column pair. Exactly one
/// scheme applies per institution; encoding that as an enum makes a mapping
/// with both or neither unrepresentable.
#[derive(Debug, Clone)]
pub enum AmountColumns {
    Signed { column: String },
    Split { debit: String, credit: String },
}

impl AmountColumns {
    /// Build a scheme from optional column names, as found in adapter
    /// configuration files.
    pub fn from_parts(
        signed: Option<String>,
        debit: Option<String>,
        credit: Option<String>,
    ) -> Result<AmountColumns, AnalysisError> {
        match (signed, debit, credit) {
            (Some(column), None, None) => Ok(AmountColumns::Signed { column }),
            (None, Some(debit), Some(credit)) => Ok(AmountColumns::Split { debit, credit }),
            _ => Err(AnalysisError::Schema(
                "configure either a signed amount column, or a debit and a credit column"
                    .to_string(),
            )),
        }
    }
}

/// Per-institution description of a transaction export: which columns hold
/// what, plus the regex rules that drive classification.
#[derive(Debug, Clone)]
pub struct ColumnMapping {
    pub date_column: String,
    pub description_column: String,
    pub amount_columns: AmountColumns,
    /// Explicit chrono format string; when unset, common formats are tried.
    pub date_format: Option<String>,
    /// Descriptions to skip entirely (transfers to own accounts, taxes on
    /// savings, and other known non-expenses).
    pub exclude_pattern: Regex,
    /// Credits that are really returned expenses.
    pub include_pattern: Regex,
    /// Credits that are income (salary etc.).
    pub income_pattern: Regex,
    /// Expenses at or above this absolute value are extraordinary.
    pub extraordinary_floor: Decimal,
}

impl ColumnMapping {
    pub fn description<'r>(&self, row: &'r Row) -> Option<&'r str> {
        row.get(&self.description_column).map(|d| d.as_str())
    }
}

/// Returns the signed amount of one row. Debits are negative, credits
/// positive. Pure function of the row and the mapping.
pub fn extract_amount(row: &Row, mapping: &ColumnMapping) -> Result<Decimal, AnalysisError> {
    match &mapping.amount_columns {
        AmountColumns::Signed { column } => {
            let value = mapped_field(row, column)?;
            parse_money(value)
        }
        AmountColumns::Split { debit, credit } => {
            let debit_value = mapped_field(row, debit)?;
            if !debit_value.trim().is_empty() {
                let parsed = parse_money(debit_value)?;
                if !parsed.is_zero() {
                    return Ok(-parsed);
                }
            }
            parse_money(mapped_field(row, credit)?)
        }
    }
}

/// Parses the row's date, with the mapping's explicit format if it has one.
pub fn extract_date(row: &Row, mapping: &ColumnMapping) -> Result<NaiveDate, AnalysisError> {
    let value = mapped_field(row, &mapping.date_column)?;
    parse_row_date(value, mapping.date_format.as_deref())
}

fn mapped_field<'r>(row: &'r Row, column: &str) -> Result<&'r str, AnalysisError> {
    row.get(column)
        .map(|v| v.as_str())
        .ok_or_else(|| AnalysisError::Schema(format!("row has no '{column}' column")))
}

/// Parses a locale-formatted currency string: currency symbols, grouping
/// separators and surrounding text are stripped before conversion. A leading
/// minus survives the stripping.
fn parse_money(value: &str) -> Result<Decimal, AnalysisError> {
    let cleaned: String = value
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return Err(AnalysisError::Parse(format!(
            "'{value}' is not a monetary amount"
        )));
    }
    Decimal::from_str(&cleaned)
        .map_err(|_| AnalysisError::Parse(format!("'{value}' is not a monetary amount")))
}

// Tried in order when the mapping has no explicit date format. Day-first
// formats come first; the supported institutions all use them.
const DATE_FORMATS: [&str; 5] = ["%d/%m/%Y", "%Y-%m-%d", "%d.%m.%Y", "%d/%m/%y", "%m/%d/%Y"];

fn parse_row_date(value: &str, format: Option<&str>) -> Result<NaiveDate, AnalysisError> {
    let value = value.trim();
    if let Some(format) = format {
        return NaiveDate::parse_from_str(value, format).map_err(|_| {
            AnalysisError::Parse(format!("'{value}' does not match date format '{format}'"))
        });
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Ok(date);
        }
    }
    Err(AnalysisError::Parse(format!("'{value}' is not a date")))
}

#[cfg(test)]
pub fn test_mapping(amount_columns: AmountColumns) -> ColumnMapping {
    use rust_decimal_macros::dec;
    ColumnMapping {
        date_column: "Date".to_string(),
        description_column: "Description".to_string(),
        amount_columns,
        date_format: None,
        exclude_pattern: Regex::new("DEPOSIT INTO SAVINGS").unwrap(),
        include_pattern: Regex::new("Transfer From Account 12-799").unwrap(),
        income_pattern: Regex::new("SALARY").unwrap(),
        extraordinary_floor: dec!(26000),
    }
}

#[cfg(test)]
pub fn test_row(fields: &[(&str, &str)]) -> Row {
    fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

use crate::error::AnalysisError;
use crate::mapping::{AmountColumns, ColumnMapping, Row};
use anyhow::{Context, Result};
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fs;
use std::io::Read;
use std::path::Path;

// A pattern that matches nothing, for institutions that leave an optional
// rule unused.
const NEVER_MATCH: &str = "$^";

/// An institution, as a data record: how to recognize its export files and
/// how to read their rows. Adapters are tried in order; the first whose
/// pattern matches the file name wins.
pub struct SourceAdapter {
    pub bank_name: String,
    pub currency: String,
    /// Identifies the classification store file for this institution.
    pub store_id: String,
    pub file_pattern: Regex,
    pub mapping: ColumnMapping,
    /// Some exports list transactions oldest-first; the analysis expects
    /// newest-first, so these are reversed after reading.
    pub oldest_first: bool,
}

/// The institutions supported out of the box. Site-specific adapters can be
/// added with a configuration file.
pub fn builtin_adapters() -> Result<Vec<SourceAdapter>> {
    Ok(vec![
        SourceAdapter {
            bank_name: "Bank Discount".to_string(),
            currency: "Shekels".to_string(),
            store_id: "bank_discount".to_string(),
            file_pattern: Regex::new(r"Current Account.*\.csv$")?,
            mapping: ColumnMapping {
                date_column: "Value date".to_string(),
                description_column: "Description".to_string(),
                amount_columns: AmountColumns::Signed {
                    column: "Amount".to_string(),
                },
                date_format: None,
                // Transfers to own accounts, share purchases and taxes on
                // savings are not expenses.
                exclude_pattern: Regex::new(
                    "PURCHASE- .*\
                     |DEPOSIT INTO DEPOSIT ACCOUNT\
                     |TERM PLACEMENT.*\
                     |TERM DEPOSIT R PER YOM\
                     |TAX DEDUCTION DUE TO SECURITIES-\
                     |TAX ON PROFIT FROM DEPOSIT\
                     |TAX ON MATURITY OF DEPOSIT\
                     |TAX PAID AT SOURCE\
                     |TAX ON PROFIT FROM RENEWED DEP",
                )?,
                include_pattern: Regex::new(".*Transfer From Account.*")?,
                income_pattern: Regex::new("SALARY|CREDIT FROM MASAV")?,
                extraordinary_floor: dec!(26000),
            },
            oldest_first: false,
        },
        SourceAdapter {
            bank_name: "Bank Yahav".to_string(),
            currency: "Shekels".to_string(),
            store_id: "bank_yahav".to_string(),
            file_pattern: Regex::new(r"תנועות בחשבון עו״ש.*\.csv$")?,
            mapping: ColumnMapping {
                date_column: "תאריך ערך".to_string(),
                description_column: "תיאור פעולה".to_string(),
                amount_columns: AmountColumns::Split {
                    debit: "חובה(₪)".to_string(),
                    credit: "זכות(₪)".to_string(),
                },
                date_format: None,
                exclude_pattern: Regex::new(".*הפקדה לפקדון")?,
                include_pattern: Regex::new(".*Transfer From Account.*")?,
                income_pattern: Regex::new(".*משכורת")?,
                extraordinary_floor: dec!(10000),
            },
            oldest_first: false,
        },
        SourceAdapter {
            bank_name: "Pepper".to_string(),
            currency: "Shekels".to_string(),
            store_id: "pepper".to_string(),
            file_pattern: Regex::new(r"Monthly account statement.*\.csv$")?,
            mapping: ColumnMapping {
                date_column: "Date".to_string(),
                description_column: "Description".to_string(),
                amount_columns: AmountColumns::Split {
                    debit: "Debit".to_string(),
                    credit: "Credit".to_string(),
                },
                date_format: Some("%d.%m.%Y".to_string()),
                exclude_pattern: Regex::new(NEVER_MATCH)?,
                include_pattern: Regex::new(".*Transfer From Account.*")?,
                income_pattern: Regex::new("SALARY")?,
                extraordinary_floor: dec!(10000),
            },
            // Pepper statements run oldest to newest.
            oldest_first: true,
        },
    ])
}

/// Picks the adapter for an export by file name; the first matching pattern
/// wins. No match is a clean rejection, not a crash.
pub fn recognize<'a>(
    adapters: &'a [SourceAdapter],
    file_name: &str,
) -> Result<&'a SourceAdapter, AnalysisError> {
    adapters
        .iter()
        .find(|adapter| adapter.file_pattern.is_match(file_name))
        .ok_or_else(|| AnalysisError::SourceNotRecognized(file_name.to_string()))
}

/// Picks an adapter explicitly, for when the file name gives no hint.
pub fn by_name<'a>(
    adapters: &'a [SourceAdapter],
    name: &str,
) -> Result<&'a SourceAdapter, AnalysisError> {
    adapters
        .iter()
        .find(|adapter| {
            adapter.bank_name.eq_ignore_ascii_case(name)
                || adapter.store_id.eq_ignore_ascii_case(name)
        })
        .ok_or_else(|| AnalysisError::SourceNotRecognized(name.to_string()))
}

/// Reads a CSV export into rows of header/value maps, newest transaction
/// first.
pub fn read_rows<T>(reader: T, oldest_first: bool) -> Result<Vec<Row>>
where
    T: Read,
{
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .quote(b'"')
        .flexible(true)
        .from_reader(reader);

    let header: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let row: Row = header
            .iter()
            .zip(record.iter())
            .map(|(h, r)| (h.clone(), r.to_string()))
            .collect();
        rows.push(row);
    }
    if oldest_first {
        rows.reverse();
    }
    Ok(rows)
}

/// One institution in a user-supplied adapter file.
#[derive(Debug, Deserialize)]
pub struct AdapterConfig {
    pub bank_name: String,
    pub currency: String,
    pub store_id: Option<String>,
    pub file_pattern: String,
    pub date_column: String,
    pub description_column: String,
    pub amount_column: Option<String>,
    pub debit_column: Option<String>,
    pub credit_column: Option<String>,
    pub date_format: Option<String>,
    pub exclude_pattern: Option<String>,
    pub include_pattern: Option<String>,
    pub income_pattern: Option<String>,
    pub extraordinary_floor: Decimal,
    #[serde(default)]
    pub oldest_first: bool,
}

impl AdapterConfig {
    pub fn into_adapter(self) -> Result<SourceAdapter> {
        let amount_columns = AmountColumns::from_parts(
            self.amount_column,
            self.debit_column,
            self.credit_column,
        )?;
        let pattern = |p: Option<String>| -> Result<Regex> {
            Ok(Regex::new(p.as_deref().unwrap_or(NEVER_MATCH))?)
        };
        let store_id = self.store_id.unwrap_or_else(|| {
            self.bank_name
                .to_lowercase()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join("_")
        });
        Ok(SourceAdapter {
            store_id,
            bank_name: self.bank_name,
            currency: self.currency,
            file_pattern: Regex::new(&self.file_pattern)?,
            mapping: ColumnMapping {
                date_column: self.date_column,
                description_column: self.description_column,
                amount_columns,
                date_format: self.date_format,
                exclude_pattern: pattern(self.exclude_pattern)?,
                include_pattern: pattern(self.include_pattern)?,
                income_pattern: pattern(self.income_pattern)?,
                extraordinary_floor: self.extraordinary_floor,
            },
            oldest_first: self.oldest_first,
        })
    }
}

/// Loads extra adapters from a JSON file. These take priority over the
/// builtin ones.
pub fn load_adapters(path: &Path) -> Result<Vec<SourceAdapter>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let configs: Vec<AdapterConfig> = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a valid adapter file", path.display()))?;
    configs.into_iter().map(|c| c.into_adapter()).collect()
}

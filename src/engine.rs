use crate::error::AnalysisError;
use crate::mapping::{extract_amount, extract_date, ColumnMapping, Row};
use crate::store::ClassificationState;
use chrono::{Datelike, NaiveDate};
use log::debug;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeSet;

/// The analysis assumes the export covers exactly one year of transactions.
/// This is a stated limitation: the span is never validated against the
/// data's actual date range.
pub const NUMBER_OF_MONTHS: u32 = 12;

/// A recurring expense that never appears in bank data because it is
/// deducted before the salary arrives (meal cards, company insurance).
#[derive(Debug, Clone, Deserialize)]
pub struct NonBankExpense {
    pub label: String,
    pub monthly_amount: Decimal,
}

/// An expense at or above the mapping's extraordinary floor. Reported
/// separately and kept out of the monthly buckets.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierEvent {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// Date of the oldest processed row.
    pub start_date: NaiveDate,
    /// Date of the newest row; input is ordered newest-first.
    pub end_date: NaiveDate,
    /// Signed (negative) yearly total, outliers and non-bank seed included.
    pub total_expenses: Decimal,
    /// Signed (negative) sum of the outlier amounts.
    pub extraordinary_total: Decimal,
    pub outliers: Vec<OutlierEvent>,
    pub income: Decimal,
    /// Per calendar-month accumulators, stored as positive magnitudes.
    /// Outliers and the non-bank adjustment are not included.
    pub expenses_per_month: [Decimal; 12],
    pub salary_per_month: [Decimal; 12],
    /// Signed (negative) fixed monthly total of the non-bank expenses.
    pub non_bank_monthly_total: Decimal,
}

impl AnalysisResult {
    pub fn total_excluding_outliers(&self) -> Decimal {
        self.total_expenses - self.extraordinary_total
    }

    /// What the month actually cost, non-bank expenses included.
    pub fn monthly_expenses(&self, month: usize) -> Decimal {
        (self.expenses_per_month[month] - self.non_bank_monthly_total).abs()
    }

    /// Non-bank expenses are left out of profit: they are already gone from
    /// the salary before it reaches the account.
    pub fn monthly_profit(&self, month: usize) -> Decimal {
        self.salary_per_month[month] - self.expenses_per_month[month].abs()
    }

    pub fn total_profit(&self) -> Decimal {
        (0..12).map(|m| self.monthly_profit(m)).sum()
    }
}

fn is_end_of_data(description: Option<&str>) -> bool {
    match description {
        None => true,
        Some(d) => d.trim().is_empty(),
    }
}

/// Pre-pass over the export: collects the descriptions of negative-value
/// rows the classification store has not seen yet, so the user can be asked
/// about them once before the analysis runs.
pub fn pending_classifications(
    rows: &[Row],
    mapping: &ColumnMapping,
    classification: &ClassificationState,
) -> Result<BTreeSet<String>, AnalysisError> {
    let mut pending = BTreeSet::new();
    for row in rows {
        let description = match mapping.description(row) {
            d if is_end_of_data(d) => break,
            Some(d) => d,
            None => unreachable!(),
        };
        if mapping.exclude_pattern.is_match(description) {
            continue;
        }
        let amount = extract_amount(row, mapping)?;
        if amount < Decimal::ZERO && !classification.is_known(description) {
            pending.insert(description.to_string());
        }
    }
    Ok(pending)
}

/// The single forward pass over the export, newest row first.
///
/// Any schema or parse failure on a non-terminal row aborts the whole
/// analysis; partial totals would silently corrupt a financial report.
pub fn analyze(
    rows: &[Row],
    mapping: &ColumnMapping,
    classification: &ClassificationState,
    non_bank_monthly_expenses: &[NonBankExpense],
) -> Result<AnalysisResult, AnalysisError> {
    let mut non_bank_monthly_total = Decimal::ZERO;
    for expense in non_bank_monthly_expenses {
        non_bank_monthly_total -= expense.monthly_amount;
    }

    let mut total_expenses = non_bank_monthly_total * Decimal::from(NUMBER_OF_MONTHS);
    let mut extraordinary_total = Decimal::ZERO;
    let mut income = Decimal::ZERO;
    let mut expenses_per_month = [Decimal::ZERO; 12];
    let mut salary_per_month = [Decimal::ZERO; 12];
    let mut outliers = Vec::new();
    let mut end_date = None;
    let mut last_date = None;

    for row in rows {
        let description = match mapping.description(row) {
            d if is_end_of_data(d) => break,
            Some(d) => d,
            None => unreachable!(),
        };

        let date = extract_date(row, mapping)?;
        // The first row is the newest, the last processed one the oldest.
        end_date.get_or_insert(date);
        last_date = Some(date);

        if mapping.exclude_pattern.is_match(description)
            || classification.is_investment(description)
        {
            debug!("excluded: {date} {description}");
            continue;
        }

        let amount = extract_amount(row, mapping)?;
        let month = date.month0() as usize;

        if amount < Decimal::ZERO {
            if amount.abs() >= mapping.extraordinary_floor {
                extraordinary_total += amount;
                outliers.push(OutlierEvent {
                    date,
                    description: description.to_string(),
                    amount,
                });
            } else {
                expenses_per_month[month] -= amount;
            }
            total_expenses += amount;
        } else if mapping.include_pattern.is_match(description) {
            // A returned expense, partially offsetting an earlier one.
            total_expenses += amount;
        } else if mapping.income_pattern.is_match(description) {
            income += amount;
            salary_per_month[month] += amount;
        } else {
            // Credits that are neither refunds nor income (e.g. incoming
            // transfers) do not count as income.
            debug!("dropped credit: {date} {description} {amount}");
        }
    }

    let (start_date, end_date) = match (last_date, end_date) {
        (Some(start), Some(end)) => (start, end),
        _ => {
            return Err(AnalysisError::Parse(
                "the export contains no transaction rows".to_string(),
            ))
        }
    };

    Ok(AnalysisResult {
        start_date,
        end_date,
        total_expenses,
        extraordinary_total,
        outliers,
        income,
        expenses_per_month,
        salary_per_month,
        non_bank_monthly_total,
    })
}

#[cfg(test)]
mod analyze_tests {
    use super::*;
    use crate::mapping::{test_mapping, test_row, AmountColumns};
    use rust_decimal_macros::dec;

    fn mapping() -> ColumnMapping {
        test_mapping(AmountColumns::Signed {
            column: "Amount".to_string(),
        })
    }

    fn row(date: &str, description: &str, amount: &str) -> Row {
        test_row(&[
            ("Date", date),
            ("Description", description),
            ("Amount", amount),
        ])
    }

    // The 3-row scenario: a salary credit, a normal expense, and a rent
    // payment above the extraordinary floor of 26,000.
    fn january_rows() -> Vec<Row> {
        vec![
            row("15/01/2023", "ACME SALARY", "10000"),
            row("10/01/2023", "Groceries", "-500"),
            row("05/01/2023", "Rent", "-30000"),
        ]
    }

    #[test]
    fn classifies_income_expense_and_outlier() {
        let result = analyze(
            &january_rows(),
            &mapping(),
            &ClassificationState::default(),
            &[],
        )
        .unwrap();

        assert_eq!(result.income, dec!(10000));
        assert_eq!(result.salary_per_month[0], dec!(10000));
        assert_eq!(result.expenses_per_month[0], dec!(500));
        assert_eq!(result.outliers.len(), 1);
        assert_eq!(result.outliers[0].description, "Rent");
        assert_eq!(result.outliers[0].amount, dec!(-30000));
        assert_eq!(result.total_expenses, dec!(-30500));
        assert_eq!(result.extraordinary_total, dec!(-30000));
        assert_eq!(result.total_excluding_outliers(), dec!(-500));
    }

    #[test]
    fn dates_come_from_first_and_last_rows() {
        let result = analyze(
            &january_rows(),
            &mapping(),
            &ClassificationState::default(),
            &[],
        )
        .unwrap();
        assert_eq!(
            result.end_date,
            NaiveDate::from_ymd_opt(2023, 1, 15).unwrap()
        );
        assert_eq!(
            result.start_date,
            NaiveDate::from_ymd_opt(2023, 1, 5).unwrap()
        );
    }

    #[test]
    fn blank_description_stops_the_pass() {
        let mut rows = january_rows();
        rows.insert(1, row("12/01/2023", " ", "0"));
        let result = analyze(&rows, &mapping(), &ClassificationState::default(), &[]).unwrap();
        // Only the salary row was processed.
        assert_eq!(result.income, dec!(10000));
        assert_eq!(result.total_expenses, dec!(0));
        assert_eq!(
            result.start_date,
            NaiveDate::from_ymd_opt(2023, 1, 15).unwrap()
        );
    }

    #[test]
    fn outlier_partition_identity() {
        let result = analyze(
            &january_rows(),
            &mapping(),
            &ClassificationState::default(),
            &[],
        )
        .unwrap();
        assert_eq!(
            result.total_expenses,
            result.total_excluding_outliers() + result.extraordinary_total
        );
        // The outlier stays out of the month bucket.
        assert_eq!(result.expenses_per_month[0], dec!(500));
    }

    #[test]
    fn expense_exactly_at_the_floor_is_an_outlier() {
        let rows = vec![row("10/01/2023", "Dental surgery", "-26000")];
        let result = analyze(&rows, &mapping(), &ClassificationState::default(), &[]).unwrap();
        assert_eq!(result.outliers.len(), 1);
        assert_eq!(result.expenses_per_month[0], dec!(0));
    }

    #[test]
    fn monthly_sums_match_the_totals() {
        let rows = vec![
            row("15/03/2023", "Groceries", "-700"),
            row("10/02/2023", "Groceries", "-300"),
            row("05/01/2023", "Rent", "-30000"),
        ];
        let non_bank = [NonBankExpense {
            label: "Company meal card".to_string(),
            monthly_amount: dec!(500),
        }];
        let result = analyze(&rows, &mapping(), &ClassificationState::default(), &non_bank).unwrap();

        let bucket_sum: Decimal = result.expenses_per_month.iter().sum();
        let seeded = result.non_bank_monthly_total * Decimal::from(NUMBER_OF_MONTHS);
        assert_eq!(result.non_bank_monthly_total, dec!(-500));
        assert_eq!(
            bucket_sum,
            (result.total_expenses - result.extraordinary_total - seeded).abs()
        );
    }

    #[test]
    fn non_bank_expenses_seed_the_total_but_not_profit() {
        let rows = vec![
            row("15/01/2023", "ACME SALARY", "10000"),
            row("10/01/2023", "Groceries", "-500"),
        ];
        let non_bank = [NonBankExpense {
            label: "Company meal card".to_string(),
            monthly_amount: dec!(500),
        }];
        let result = analyze(&rows, &mapping(), &ClassificationState::default(), &non_bank).unwrap();
        // 12 months of meal card plus the groceries.
        assert_eq!(result.total_expenses, dec!(-6500));
        // Displayed January expenses include the meal card...
        assert_eq!(result.monthly_expenses(0), dec!(1000));
        // ... but profit does not, because it is already out of the salary.
        assert_eq!(result.monthly_profit(0), dec!(9500));
    }

    #[test]
    fn excluded_and_investment_descriptions_accumulate_nothing() {
        let rows = vec![
            row("15/01/2023", "DEPOSIT INTO SAVINGS", "-2000"),
            row("12/01/2023", "Broker standing order", "-1000"),
            row("10/01/2023", "Groceries", "-500"),
        ];
        let mut classification = ClassificationState::default();
        classification
            .investments
            .insert("Broker standing order".to_string());
        let result = analyze(&rows, &mapping(), &classification, &[]).unwrap();
        assert_eq!(result.total_expenses, dec!(-500));
        assert_eq!(result.expenses_per_month[0], dec!(500));
    }

    #[test]
    fn refunded_expenses_offset_the_total() {
        let rows = vec![
            row("15/01/2023", "Transfer From Account 12-799-0095", "200"),
            row("10/01/2023", "Groceries", "-500"),
        ];
        let result = analyze(&rows, &mapping(), &ClassificationState::default(), &[]).unwrap();
        assert_eq!(result.total_expenses, dec!(-300));
        // The refund is not income.
        assert_eq!(result.income, dec!(0));
    }

    #[test]
    fn unrecognized_credits_are_dropped() {
        let rows = vec![
            row("15/01/2023", "Incoming transfer", "1000"),
            row("10/01/2023", "Groceries", "-500"),
        ];
        let result = analyze(&rows, &mapping(), &ClassificationState::default(), &[]).unwrap();
        assert_eq!(result.income, dec!(0));
        assert_eq!(result.total_expenses, dec!(-500));
    }

    #[test]
    fn malformed_row_aborts_the_analysis() {
        let rows = vec![
            row("15/01/2023", "ACME SALARY", "10000"),
            row("10/01/2023", "Groceries", "not a number"),
        ];
        assert!(analyze(&rows, &mapping(), &ClassificationState::default(), &[]).is_err());
        let rows = vec![row("someday", "Groceries", "-500")];
        assert!(analyze(&rows, &mapping(), &ClassificationState::default(), &[]).is_err());
    }

    #[test]
    fn empty_export_is_an_error() {
        assert!(analyze(&[], &mapping(), &ClassificationState::default(), &[]).is_err());
        let rows = vec![row("15/01/2023", "", "0")];
        assert!(analyze(&rows, &mapping(), &ClassificationState::default(), &[]).is_err());
    }

    #[test]
    fn analysis_is_deterministic_across_runs() {
        let classification = ClassificationState::default();
        let first = analyze(&january_rows(), &mapping(), &classification, &[]).unwrap();
        let second = analyze(&january_rows(), &mapping(), &classification, &[]).unwrap();
        assert_eq!(first.total_expenses, second.total_expenses);
        assert_eq!(first.income, second.income);
        assert_eq!(first.outliers, second.outliers);
    }
}

#[cfg(test)]
mod pending_classification_tests {
    use super::*;
    use crate::mapping::{test_mapping, test_row, AmountColumns};

    fn mapping() -> ColumnMapping {
        test_mapping(AmountColumns::Signed {
            column: "Amount".to_string(),
        })
    }

    fn row(date: &str, description: &str, amount: &str) -> Row {
        test_row(&[
            ("Date", date),
            ("Description", description),
            ("Amount", amount),
        ])
    }

    #[test]
    fn collects_unknown_negative_descriptions_once() {
        let rows = vec![
            row("15/01/2023", "ACME SALARY", "10000"),
            row("10/01/2023", "Groceries", "-500"),
            row("09/01/2023", "Groceries", "-200"),
            row("08/01/2023", "DEPOSIT INTO SAVINGS", "-2000"),
        ];
        let pending =
            pending_classifications(&rows, &mapping(), &ClassificationState::default()).unwrap();
        // Credits and excluded descriptions are not candidates; duplicates
        // collapse.
        assert_eq!(pending.len(), 1);
        assert!(pending.contains("Groceries"));
    }

    #[test]
    fn known_descriptions_are_not_pending() {
        let rows = vec![row("10/01/2023", "Groceries", "-500")];
        let mut classification = ClassificationState::default();
        classification.expenses.insert("Groceries".to_string());
        let pending = pending_classifications(&rows, &mapping(), &classification).unwrap();
        assert!(pending.is_empty());
    }

    #[test]
    fn stops_at_the_end_of_data_sentinel() {
        let rows = vec![
            row("10/01/2023", " ", "0"),
            row("09/01/2023", "Groceries", "-500"),
        ];
        let pending =
            pending_classifications(&rows, &mapping(), &ClassificationState::default()).unwrap();
        assert!(pending.is_empty());
    }
}

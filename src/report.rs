use crate::engine::{AnalysisResult, NUMBER_OF_MONTHS};
use crate::output::format::ToOutputFormat;
use crate::projection::ProjectionRow;
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};

/// One semantically tagged piece of the report. Renderers consume the block
/// sequence in order and must preserve heading levels, emphasis and image
/// references; they add nothing of their own.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportBlock {
    Heading { level: u8, text: String },
    Paragraph { text: String, emphasized: bool },
    Image { path: PathBuf },
}

/// The fixed-rate model parameters shown in (and used by) the F.I.R.E.
/// section.
#[derive(Debug, Clone, Copy)]
pub struct Assumptions {
    pub current_age: u32,
    pub inflation_rate_pct: f64,
    pub interest_rate_pct: f64,
}

struct Report {
    blocks: Vec<ReportBlock>,
}

impl Report {
    fn heading(&mut self, level: u8, text: impl Into<String>) {
        self.blocks.push(ReportBlock::Heading {
            level,
            text: text.into(),
        });
    }

    fn paragraph(&mut self, text: impl Into<String>) {
        self.blocks.push(ReportBlock::Paragraph {
            text: text.into(),
            emphasized: false,
        });
    }

    fn emphasized(&mut self, text: impl Into<String>) {
        self.blocks.push(ReportBlock::Paragraph {
            text: text.into(),
            emphasized: true,
        });
    }
}

fn month_name(month: usize) -> String {
    // Year 1900 is arbitrary; only the month name is used.
    NaiveDate::from_ymd_opt(1900, month as u32 + 1, 1)
        .map(|d| d.format("%B").to_string())
        .unwrap_or_default()
}

fn monthly_average(total: Decimal) -> Decimal {
    total.abs() / Decimal::from(NUMBER_OF_MONTHS)
}

/// Assembles the full ordered block sequence: expense summary, monthly
/// table, income summary, chart reference and the F.I.R.E. projection.
pub fn build_report(
    bank_name: &str,
    result: &AnalysisResult,
    projection: &[ProjectionRow],
    assumptions: &Assumptions,
    chart: Option<&Path>,
) -> Vec<ReportBlock> {
    let mut report = Report { blocks: Vec::new() };

    report.heading(
        1,
        format!(
            "{} from: {} to: {}",
            bank_name,
            result.start_date.to_output_format(),
            result.end_date.to_output_format()
        ),
    );

    report.heading(2, "Expense Summary");
    report.paragraph("Including extraordinary expenses:");
    report.paragraph(format!(
        "Total expenses = {} Monthly = {}",
        result.total_expenses.abs().to_output_format(),
        monthly_average(result.total_expenses).to_output_format()
    ));

    let excluding = result.total_excluding_outliers();
    report.paragraph("");
    report.paragraph("Excluding extraordinary expenses:");
    for outlier in &result.outliers {
        report.paragraph(format!(
            "{} {} {}",
            outlier.date.to_output_format(),
            outlier.description,
            outlier.amount.to_output_format()
        ));
    }
    report.emphasized(format!(
        "Total expenses = {} Monthly = {}",
        excluding.abs().to_output_format(),
        monthly_average(excluding).to_output_format()
    ));

    // The data may start mid-month, so one month can mix this year and the
    // previous one.
    report.heading(2, "Monthly Summary");
    report.emphasized(format!(
        "{:>10}  {:>12} {:>12} {:>12}",
        "Month", "Expenses", "Income", "Profit/Loss"
    ));
    for month in 0..NUMBER_OF_MONTHS as usize {
        report.paragraph(format!(
            "{:>10}  {:>12} {:>12} {:>12}",
            month_name(month),
            result.monthly_expenses(month).to_output_format(),
            result.salary_per_month[month].to_output_format(),
            result.monthly_profit(month).to_output_format()
        ));
    }
    report.paragraph("=".repeat(52));
    report.emphasized(format!(
        "{:>10}  {:>12} {:>12} {:>12}",
        "Total",
        excluding.abs().to_output_format(),
        result.income.to_output_format(),
        result.total_profit().to_output_format()
    ));
    report.paragraph("=".repeat(52));

    report.heading(2, "Income Summary");
    report.paragraph(format!(
        "Total income = {} Monthly = {}",
        result.income.abs().to_output_format(),
        monthly_average(result.income).to_output_format()
    ));

    if let Some(path) = chart {
        report.blocks.push(ReportBlock::Image {
            path: path.to_path_buf(),
        });
    }

    report.heading(1, "F.I.R.E. Summary");
    if result.income > Decimal::ZERO {
        let ratio = (excluding.abs() / result.income).to_f64().unwrap_or(1.0);
        report.paragraph(format!(
            "You are saving {:.0}% of your income.",
            (1.0 - ratio) * 100.0
        ));
    } else {
        report.paragraph("You have no income.");
    }

    report.heading(2, "How much you will need until you start taking your pension");
    report.paragraph(format!(
        "Assumed inflation: {}%  Current age: {}",
        assumptions.inflation_rate_pct, assumptions.current_age
    ));
    report.paragraph(format!(
        "Assumed interest after tax: {}%",
        assumptions.interest_rate_pct
    ));
    report.paragraph("");
    report.paragraph(
        "The bold rows of the F.I.R.E. analysis table below show the ages at which \
         you can retire.",
    );
    report.paragraph("The calculations are based on the income and expenses of the past 12 months.");
    report.paragraph("");
    report.emphasized(format!(
        "{:<12} {:>20} {:>22} {:>18}",
        "Pension Age", "Savings Required", "Required Net Pension", "Savings Possible"
    ));
    report.emphasized(format!(
        "{:<12} {:>20} {:>22} {:>18}",
        "", "(Until pension)", "(After tax)", ""
    ));
    for row in projection {
        let text = format!(
            "{:<12} {:>20} {:>22} {:>18}",
            row.age,
            row.expenses_until_pension.to_output_format(),
            row.monthly_pension_needed.to_output_format(),
            row.savings_possible.to_output_format()
        );
        if row.affordable {
            report.emphasized(text);
        } else {
            report.paragraph(text);
        }
    }

    report.blocks
}

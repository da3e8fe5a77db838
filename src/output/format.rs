use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Monetary and date values as they appear in report text: two decimal
/// places, thousands separators, dd/mm/yyyy.
pub trait ToOutputFormat {
    fn to_output_format(&self) -> String;
}

impl ToOutputFormat for Decimal {
    fn to_output_format(&self) -> String {
        group_thousands(&format!("{:.2}", self.round_dp(2)))
    }
}

impl ToOutputFormat for f64 {
    fn to_output_format(&self) -> String {
        group_thousands(&format!("{:.2}", self))
    }
}

impl ToOutputFormat for NaiveDate {
    fn to_output_format(&self) -> String {
        format!("{}", self.format("%d/%m/%Y"))
    }
}

fn group_thousands(formatted: &str) -> String {
    let (sign, rest) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (integer, fraction) = match rest.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rest, None),
    };
    let mut grouped = String::new();
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    match fraction {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

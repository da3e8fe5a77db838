use crate::engine::AnalysisResult;
use anyhow::Result;
use charming;
use rust_decimal::prelude::ToPrimitive;
use std::fs;
use std::path::Path;

const FONT_SIZE: f64 = 25.0;
const TITLE_FONT_SIZE: f64 = FONT_SIZE * 1.2;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

fn bar_series(name: &str, color: &str, data: Vec<f64>) -> charming::series::Bar {
    charming::series::Bar::new()
        .name(name)
        .data(data)
        .item_style(charming::element::ItemStyle::new().color(color))
        .label(charming::element::Label::new().font_size(FONT_SIZE))
}

/// A horizontal bar chart of expenses vs. salary per month, one pair of
/// bars per calendar month.
fn monthly_chart(result: &AnalysisResult, title: &str, currency: &str) -> charming::Chart {
    let expenses: Vec<f64> = (0..12)
        .map(|m| result.monthly_expenses(m).to_f64().unwrap_or(0.0))
        .collect();
    let salary: Vec<f64> = (0..12)
        .map(|m| result.salary_per_month[m].to_f64().unwrap_or(0.0))
        .collect();

    charming::Chart::new()
        .background_color("#efefef")
        .title(
            charming::component::Title::new()
                .text(title)
                .padding((20, 0))
                .text_style(charming::element::TextStyle::new().font_size(TITLE_FONT_SIZE)),
        )
        .legend(
            charming::component::Legend::new()
                .padding((20, 0))
                .text_style(charming::element::TextStyle::new().font_size(FONT_SIZE)),
        )
        .grid(charming::component::Grid::new().top("22%"))
        .x_axis(
            charming::component::Axis::new()
                .type_(charming::element::AxisType::Value)
                .name(currency)
                .axis_label(charming::element::AxisLabel::new().font_size(FONT_SIZE)),
        )
        .y_axis(
            charming::component::Axis::new()
                .type_(charming::element::AxisType::Category)
                .name("Month")
                .data(MONTH_NAMES.iter().map(|m| m.to_string()).collect::<Vec<String>>())
                .axis_label(charming::element::AxisLabel::new().font_size(FONT_SIZE)),
        )
        .series(bar_series("Expenses", "#c23531", expenses))
        .series(bar_series("Salary", "#3c8618", salary))
}

/// Renders the monthly chart to a PNG file. The report only carries the
/// path; renderers decide what to do with it.
pub fn save_monthly_chart(
    result: &AnalysisResult,
    title: &str,
    currency: &str,
    path: &Path,
) -> Result<()> {
    let chart = monthly_chart(result, title, currency);
    let mut renderer = charming::ImageRenderer::new(2048, 1024);
    let bytes = renderer.render_format(charming::ImageFormat::Png, &chart)?;
    fs::write(path, bytes)?;
    Ok(())
}

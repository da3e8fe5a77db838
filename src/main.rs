use anyhow::{anyhow, Context, Result};
use clap::Parser;
use rust_decimal::prelude::ToPrimitive;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod adapters;
mod engine;
mod error;
mod mapping;
mod output;
mod projection;
mod report;
mod store;

use output::format::ToOutputFormat;
use output::Render;
use store::{NoPrompt, PromptSource, StdinPrompt};

/// Turns a bank transaction export into a categorized expense report and a
/// F.I.R.E. projection.
#[derive(Debug, Parser)]
struct Firesight {
    /// CSV export with the last 12 months of transactions, newest first.
    file: PathBuf,

    /// Select the bank by name instead of matching the file name.
    #[arg(long)]
    bank: Option<String>,

    /// JSON file with additional bank adapters, tried before the builtin
    /// ones.
    #[arg(long)]
    banks_file: Option<PathBuf>,

    /// JSON file listing recurring monthly expenses that never reach the
    /// bank account (meal cards, company insurance).
    #[arg(long)]
    fixed_expenses: Option<PathBuf>,

    /// Also write the report to this HTML file.
    #[arg(long)]
    html: Option<PathBuf>,

    /// Never prompt; pending descriptions become expenses and profile
    /// questions are skipped. Output is deterministic.
    #[arg(long)]
    non_interactive: bool,

    /// Skip rendering the monthly bar chart.
    #[arg(long)]
    no_chart: bool,

    /// Assumed yearly inflation, in percent.
    #[arg(long, default_value_t = 3.0)]
    inflation: f64,

    /// Assumed yearly interest after tax, in percent.
    #[arg(long, default_value_t = 3.0)]
    interest: f64,
}

fn main() -> ExitCode {
    match firesight_main() {
        Err(e) => {
            if let Some(io_error) = e.downcast_ref::<io::Error>() {
                if io_error.kind() == io::ErrorKind::BrokenPipe {
                    return ExitCode::SUCCESS;
                }
            }
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn firesight_main() -> Result<()> {
    env_logger::init();
    let cli = Firesight::parse();

    let mut registry = match &cli.banks_file {
        Some(path) => adapters::load_adapters(path)?,
        None => Vec::new(),
    };
    registry.extend(adapters::builtin_adapters()?);

    let adapter = match &cli.bank {
        Some(bank) => adapters::by_name(&registry, bank)?,
        None => {
            let file_name = cli
                .file
                .file_name()
                .and_then(OsStr::to_str)
                .ok_or_else(|| anyhow!("{} is not a usable file name", cli.file.display()))?;
            adapters::recognize(&registry, file_name)?
        }
    };

    let reader = fs::File::open(&cli.file)
        .with_context(|| format!("failed to open {}", cli.file.display()))?;
    let rows = adapters::read_rows(reader, adapter.oldest_first)?;

    let non_bank: Vec<engine::NonBankExpense> = match &cli.fixed_expenses {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("{} is not a valid fixed-expenses file", path.display()))?
        }
        None => Vec::new(),
    };

    let mut store = store::ClassificationStore::open(&adapter.store_id)?;
    let mut prompts: Box<dyn PromptSource> = if cli.non_interactive {
        Box::new(NoPrompt)
    } else {
        Box::new(StdinPrompt)
    };

    let pending = engine::pending_classifications(&rows, &adapter.mapping, &store.state)?;
    store.resolve_unknown(pending, prompts.as_mut())?;
    store.ensure_profile(prompts.as_mut())?;
    store.save()?;

    let result = engine::analyze(&rows, &adapter.mapping, &store.state, &non_bank)?;

    let assumptions = report::Assumptions {
        current_age: store.state.current_age(chrono::Local::now().date_naive()),
        inflation_rate_pct: cli.inflation,
        interest_rate_pct: cli.interest,
    };
    let excluding = result.total_excluding_outliers();
    let projection = projection::project(
        excluding.to_f64().unwrap_or(0.0),
        result.income.to_f64().unwrap_or(0.0),
        assumptions.current_age,
        store.state.pension_age_or_default(),
        assumptions.inflation_rate_pct,
        assumptions.interest_rate_pct,
    );

    let title = format!(
        "{} from: {} to: {}",
        adapter.bank_name,
        result.start_date.to_output_format(),
        result.end_date.to_output_format()
    );
    let chart_path = if cli.no_chart {
        None
    } else {
        let path = PathBuf::from(format!("{}.png", adapter.store_id));
        let chart_title = format!(
            "{}\nTotal income = {} Monthly = {}\nTotal expenses = {} Monthly = {}",
            title,
            result.income.abs().to_output_format(),
            (result.income.abs() / rust_decimal::Decimal::from(engine::NUMBER_OF_MONTHS))
                .to_output_format(),
            excluding.abs().to_output_format(),
            (excluding.abs() / rust_decimal::Decimal::from(engine::NUMBER_OF_MONTHS))
                .to_output_format()
        );
        output::chart::save_monthly_chart(&result, &chart_title, &adapter.currency, &path)?;
        Some(path)
    };

    let blocks = report::build_report(
        &adapter.bank_name,
        &result,
        &projection,
        &assumptions,
        chart_path.as_deref(),
    );

    output::console::ConsoleRenderer::new(io::stdout().lock()).render(&blocks)?;

    if let Some(html_path) = &cli.html {
        write_html(&blocks, html_path)?;
        println!("Summary in: {}", html_path.display());
    }

    Ok(())
}

fn write_html(blocks: &[report::ReportBlock], path: &Path) -> Result<()> {
    let file = fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    output::html::HtmlRenderer::new(io::BufWriter::new(file)).render(blocks)
}

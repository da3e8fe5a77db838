//! Year-by-year retirement affordability, computed with a fixed-rate
//! compound-growth model. Intentionally coarse and auditable; this is not a
//! Monte Carlo or actuarial engine.

/// One row of the F.I.R.E. table, for one candidate retirement age.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionRow {
    pub age: u32,
    /// Inflation-adjusted expenses from this age until the pension age.
    pub expenses_until_pension: f64,
    /// Net monthly pension that would cover expenses at this age's price
    /// level.
    pub monthly_pension_needed: f64,
    /// Savings accumulated by this age, growing at the interest rate.
    pub savings_possible: f64,
    /// Retiring at this age is covered by the savings.
    pub affordable: bool,
}

/// Sum of a growing annuity a + ar + ar^2 + ... + ar^n, excluding the zeroth
/// term: the future value of the remaining years, not counting the current
/// one.
fn geometric_series(a: f64, r: f64, n: i32) -> f64 {
    a.abs() * (1.0 - r.powi(n + 1)) / (1.0 - r) - a.abs()
}

/// Builds the affordability table for every age from `current_age` up to
/// (not including) `pension_age`. `total_expenses` is the signed yearly
/// total (negative), `income` the yearly income; both taken from the last
/// 12 months of transactions.
pub fn project(
    total_expenses: f64,
    income: f64,
    current_age: u32,
    pension_age: u32,
    inflation_rate_pct: f64,
    interest_rate_pct: f64,
) -> Vec<ProjectionRow> {
    let inflation = 1.0 + inflation_rate_pct / 100.0;
    let interest = 1.0 + interest_rate_pct / 100.0;
    let yearly_savings = income + total_expenses;

    let mut rows = Vec::new();
    for age in current_age..pension_age {
        let years_remaining = (pension_age - age) as i32;
        let years_elapsed = (age - current_age) as i32;
        let expenses_until_pension =
            geometric_series(total_expenses, inflation, years_remaining);
        let savings_possible = geometric_series(yearly_savings, interest, years_elapsed);
        let monthly_pension_needed =
            total_expenses.abs() * inflation.powi(years_elapsed) / 12.0;
        rows.push(ProjectionRow {
            age,
            expenses_until_pension,
            monthly_pension_needed,
            savings_possible,
            affordable: savings_possible >= expenses_until_pension,
        });
    }
    rows
}

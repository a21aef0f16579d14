//! Deployment business-case arithmetic.
//!
//! A detected spread is only worth acting on if the infrastructure needed to
//! capture it pays for itself. Each [`Scenario`] describes one way of running
//! a strategy (fixed setup cost, recurring costs, expected revenue) and
//! [`evaluate`] derives the headline figures: break-even horizon, first-year
//! return and ongoing return.

use serde::Serialize;

/// One deployment option, all amounts in USD.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Scenario {
    pub name: String,
    /// One-off setup cost (licences, contracts, deposits).
    pub upfront: f64,
    pub monthly_costs: f64,
    pub monthly_revenue: f64,
    /// Working capital that must be held but is not spent.
    pub capital: f64,
    pub notes: Vec<String>,
}

/// Derived figures for a [`Scenario`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScenarioOutcome {
    pub name: String,
    pub monthly_profit: f64,
    pub annual_costs: f64,
    pub annual_revenue: f64,
    /// Profit in year two onward, once setup is paid.
    pub annual_profit: f64,
    /// Upfront plus a year of operating costs.
    pub first_year_cost: f64,
    pub first_year_profit: f64,
    /// Months of profit needed to recover the upfront cost; `None` if never.
    pub breakeven_months: Option<f64>,
    /// `first_year_profit / first_year_cost`; `None` with no cost at all.
    pub first_year_roi: Option<f64>,
    /// `annual_profit / annual_costs`; `None` without operating costs.
    pub ongoing_roi: Option<f64>,
}

impl ScenarioOutcome {
    pub fn breaks_even(&self) -> bool {
        self.breakeven_months.is_some()
    }
}

impl Scenario {
    pub fn new(
        name: impl Into<String>,
        upfront: f64,
        monthly_costs: f64,
        monthly_revenue: f64,
        capital: f64,
    ) -> Self {
        Self {
            name: name.into(),
            upfront,
            monthly_costs,
            monthly_revenue,
            capital,
            notes: Vec::new(),
        }
    }

    pub fn with_notes<I, S>(mut self, notes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.notes.extend(notes.into_iter().map(Into::into));
        self
    }
}

/// Computes break-even and return figures for `scenario`.
pub fn evaluate(scenario: &Scenario) -> ScenarioOutcome {
    let monthly_profit = scenario.monthly_revenue - scenario.monthly_costs;
    let annual_costs = scenario.monthly_costs * 12.0;
    let annual_revenue = scenario.monthly_revenue * 12.0;
    let annual_profit = annual_revenue - annual_costs;
    let first_year_cost = scenario.upfront + annual_costs;
    let first_year_profit = annual_revenue - first_year_cost;

    ScenarioOutcome {
        name: scenario.name.clone(),
        monthly_profit,
        annual_costs,
        annual_revenue,
        annual_profit,
        first_year_cost,
        first_year_profit,
        breakeven_months: (monthly_profit > 0.0).then(|| scenario.upfront / monthly_profit),
        first_year_roi: (first_year_cost > 0.0).then(|| first_year_profit / first_year_cost),
        ongoing_roi: (annual_costs > 0.0).then(|| annual_profit / annual_costs),
    }
}

/// The four reference deployments: institutional forex, cross-exchange
/// crypto, and on-chain DeFi under conservative and optimistic volume.
pub fn default_scenarios() -> Vec<Scenario> {
    // 0.03% net per trade on $100K, 5 trades a day, 22 trading days.
    let forex_capital = 100_000.0;
    let forex_revenue = forex_capital * 0.0003 * 5.0 * 22.0;

    // 0.05% net per arb on $10K, 3 a day, every day.
    let cex_capital = 10_000.0;
    let cex_revenue = cex_capital * 0.0005 * 3.0 * 30.0;

    // Flash-loan funded: contract + gas float upfront; RPC, VPS and tips monthly.
    let defi_upfront = 500.0 + 100.0;
    let defi_monthly = 100.0 + 50.0 + 20.0;

    vec![
        Scenario::new(
            "Forex Institutional",
            125_000.0 + 10_000.0,
            1_000.0 + 500.0 + 200.0 + 100.0,
            forex_revenue,
            forex_capital,
        )
        .with_notes([
            "Trading capital is working capital and not part of the upfront cost",
            "Upfront: offshore licence capital requirement plus FIX API deposit",
            "Assumes 0.03% net per trade, 5 opportunities per day",
            "Risk: latency disadvantage against HFT firms with dedicated hardware",
            "Risk: licensing takes months and compliance costs are not modelled",
        ]),
        Scenario::new("Crypto CEX", 0.0, 100.0 + 50.0, cex_revenue, cex_capital).with_notes([
            "Capital is split across exchanges and locked on each",
            "No licence needed; exchange APIs are free with an account",
            "Assumes 0.05% net per arb, 3 opportunities per day",
            "Risk: transfers between exchanges take minutes to hours",
            "Risk: counterparty exposure on every venue",
        ]),
        Scenario::new(
            "DeFi Solana (Conservative)",
            defi_upfront,
            defi_monthly,
            10.0 * 2.0 * 30.0,
            0.0,
        )
        .with_notes([
            "No trading capital: flash loans borrow and repay in one transaction",
            "Assumes 10 successful arbs per day at $2 net each",
            "Unprofitable attempts revert and cost only gas",
            "Risk: contract bugs can lose borrowed funds",
        ]),
        Scenario::new(
            "DeFi Solana (Optimistic)",
            defi_upfront,
            defi_monthly,
            20.0 * 5.0 * 30.0,
            0.0,
        )
        .with_notes([
            "Same infrastructure as the conservative case",
            "Assumes a less contested niche: 20 arbs per day at $5 net",
            "Risk: niche pools are thin and attract competitors quickly",
        ]),
    ]
}

//! # Frankfurter Rate Fetcher
//!
//! Fetches the latest European Central Bank reference rates from the public
//! Frankfurter API and assembles them into a complete directed
//! [`RateSnapshot`] for a configured instrument list.
//!
//! The endpoint requires **no API key**. One request is made per base
//! instrument (`/v1/latest?base=USD&symbols=EUR,GBP,...`), so a run over N
//! instruments issues N requests and yields up to N×(N−1) directed quotes.
//!
//! ## Completeness
//!
//! The fetcher does not fill gaps: a quote missing from a response is simply
//! absent from the snapshot, and the analysis core rejects the table with the
//! missing pair named. Retries only cover rate limiting.

use std::time::Duration;

use chrono::NaiveDate;
use eyre::{eyre, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::types::{Instrument, RateSnapshot};

/// Public Frankfurter base URL (no API key required).
pub const DEFAULT_BASE_URL: &str = "https://api.frankfurter.dev";

/// Environment variable overriding [`DEFAULT_BASE_URL`].
pub const BASE_URL_ENV: &str = "ARB_RATES_URL";

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum rate-limit retries per base instrument.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Body of a `/v1/latest` response.
///
/// ```text
/// { "amount": 1.0, "base": "USD", "date": "2024-05-17",
///   "rates": { "EUR": 0.9201, "GBP": 0.7874 } }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct LatestRates {
    /// Amount of the base the rates are quoted for (always 1.0 here).
    #[serde(default = "default_amount")]
    pub amount: f64,
    /// Base instrument code.
    pub base: String,
    /// ECB publication date of the rates.
    pub date: NaiveDate,
    /// Quote code → units of quote per `amount` of base.
    pub rates: BTreeMap<String, f64>,
}

fn default_amount() -> f64 {
    1.0
}

/// HTTP client for the Frankfurter API.
#[derive(Debug, Clone)]
pub struct FrankfurterClient {
    client: reqwest::Client,
    base_url: String,
}

impl FrankfurterClient {
    /// Creates a client against `base_url` (no trailing slash required).
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("arb-scan/", env!("CARGO_PKG_VERSION")))
            .build()
            .wrap_err("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Creates a client using `ARB_RATES_URL` or the public default.
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    /// The base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches the latest rates for one base against `targets`.
    ///
    /// Waits and retries on HTTP 429, honouring `Retry-After`.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, a non-success status once retries
    /// are exhausted, or a malformed body.
    #[tracing::instrument(skip_all, fields(base = %base))]
    pub async fn fetch_latest(
        &self,
        base: &Instrument,
        targets: &[Instrument],
    ) -> Result<LatestRates> {
        let url = latest_url(&self.base_url, base, targets);
        let mut attempt = 0u32;

        loop {
            debug!(url = url.as_str(), attempt, "requesting latest rates");

            let response = self
                .client
                .get(&url)
                .send()
                .await
                .wrap_err_with(|| format!("Frankfurter request for base {base} failed"))?;

            let status = response.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS && attempt < MAX_RATE_LIMIT_RETRIES
            {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(5);
                warn!(
                    status = status.as_u16(),
                    retry_after_s = retry_after,
                    "Frankfurter rate limit hit, waiting"
                );
                tokio::time::sleep(Duration::from_secs(retry_after)).await;
                attempt += 1;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(eyre!(
                    "Frankfurter returned HTTP {} for base {}: {}",
                    status.as_u16(),
                    base,
                    body
                ));
            }

            let body = response
                .text()
                .await
                .wrap_err("failed to read Frankfurter response body")?;

            return parse_latest(&body);
        }
    }

    /// Builds a full directed snapshot by querying every instrument as base.
    ///
    /// # Errors
    ///
    /// Returns error if any per-base request fails.
    #[tracing::instrument(skip_all, fields(instruments = instruments.len()))]
    pub async fn fetch_snapshot(&self, instruments: &[Instrument]) -> Result<RateSnapshot> {
        let mut snapshot = RateSnapshot::new("frankfurter", instruments.to_vec());

        for base in instruments {
            let targets: Vec<Instrument> = instruments
                .iter()
                .filter(|candidate| *candidate != base)
                .cloned()
                .collect();

            let latest = self.fetch_latest(base, &targets).await?;
            let added = merge_latest(&mut snapshot, &latest, instruments);

            if snapshot.date.is_none() {
                snapshot.date = Some(latest.date);
            } else if snapshot.date != Some(latest.date) {
                warn!(
                    base = %base,
                    date = %latest.date,
                    "base quoted on a different date than earlier bases"
                );
            }

            debug!(base = %base, quotes = added, "merged base rates");
        }

        info!(
            quotes = snapshot.quote_count(),
            date = ?snapshot.date,
            "Frankfurter snapshot complete"
        );

        Ok(snapshot)
    }
}

/// Builds the `/v1/latest` URL for one base.
fn latest_url(base_url: &str, base: &Instrument, targets: &[Instrument]) -> String {
    let symbols = targets
        .iter()
        .map(Instrument::code)
        .collect::<Vec<_>>()
        .join(",");
    format!("{base_url}/v1/latest?base={}&symbols={symbols}", base.code())
}

/// Parses a `/v1/latest` JSON body.
///
/// # Errors
///
/// Returns error if the body is not valid JSON of the expected shape.
pub fn parse_latest(body: &str) -> Result<LatestRates> {
    serde_json::from_str(body).wrap_err("failed to parse Frankfurter latest-rates JSON")
}

/// Merges one base's quotes into `snapshot`, keeping configured instruments only.
///
/// Rates are divided by the response `amount` so they are always per unit of
/// base. Returns the number of quotes added.
pub fn merge_latest(
    snapshot: &mut RateSnapshot,
    latest: &LatestRates,
    instruments: &[Instrument],
) -> usize {
    let base = Instrument::new(&latest.base);
    let amount = if latest.amount > 0.0 { latest.amount } else { 1.0 };
    let mut added = 0usize;

    for (code, rate) in &latest.rates {
        let quote = Instrument::new(code);
        if quote == base || !instruments.contains(&quote) {
            debug!(base = %base, quote = %quote, "ignoring unconfigured quote");
            continue;
        }
        snapshot.insert(base.clone(), quote, rate / amount);
        added += 1;
    }

    added
}

//! Brazilian Central Bank SGS provider.
//!
//! Fetches series from the SGS JSON endpoint
//! (`{base}/bcdata.sgs.{code}/dados?formato=json`). Handles retries with
//! exponential backoff for transport failures and server errors, and
//! response parsing.
//!
//! The endpoint serves one series per request. A combined call walks its
//! identifiers in order and fails as a whole as soon as one of them fails,
//! which keeps the provider contract free of partial results.

use super::provider::{DataError, SeriesProvider};
use crate::domain::{Observation, RawColumn, SeriesFrame, SeriesId};
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

/// Public SGS endpoint root.
pub const DEFAULT_BASE_URL: &str = "https://api.bcb.gov.br/dados/serie";

/// Date format used by SGS in both query parameters and responses.
const SGS_DATE_FORMAT: &str = "%d/%m/%Y";

/// One row of the SGS JSON response.
#[derive(Debug, Deserialize)]
struct SgsRow {
    data: String,
    #[serde(default)]
    valor: Option<serde_json::Value>,
}

/// Connection settings for [`SgsProvider`].
#[derive(Debug, Clone)]
pub struct SgsSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
    pub user_agent: String,
    /// Upper bound sent with windowed requests. `None` means today.
    pub window_end: Option<NaiveDate>,
}

impl Default for SgsSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            user_agent: concat!("serieslab/", env!("CARGO_PKG_VERSION")).to_string(),
            window_end: None,
        }
    }
}

/// SGS data provider.
pub struct SgsProvider {
    client: reqwest::blocking::Client,
    settings: SgsSettings,
}

impl SgsProvider {
    pub fn new(settings: SgsSettings) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, settings })
    }

    /// Build the request URL and query for one series.
    fn series_request(
        &self,
        id: SeriesId,
        start: Option<NaiveDate>,
    ) -> (String, Vec<(String, String)>) {
        let url = format!(
            "{}/bcdata.sgs.{}/dados",
            self.settings.base_url.trim_end_matches('/'),
            id.code()
        );

        let mut query = vec![("formato".to_string(), "json".to_string())];
        if let Some(start) = start {
            let end = self
                .settings
                .window_end
                .unwrap_or_else(|| chrono::Local::now().date_naive());
            query.push((
                "dataInicial".to_string(),
                start.format(SGS_DATE_FORMAT).to_string(),
            ));
            query.push((
                "dataFinal".to_string(),
                end.format(SGS_DATE_FORMAT).to_string(),
            ));
        }

        (url, query)
    }

    /// Execute a single series request with retry.
    fn fetch_with_retry(
        &self,
        id: SeriesId,
        start: Option<NaiveDate>,
    ) -> Result<Vec<Observation>, DataError> {
        let (url, query) = self.series_request(id, start);
        let mut last_error = None;

        for attempt in 0..=self.settings.max_retries {
            if attempt > 0 {
                let delay = self
                    .settings
                    .base_delay
                    .saturating_mul(2u32.saturating_pow(attempt - 1));
                tracing::debug!(series = %id, attempt, ?delay, "retrying SGS request");
                std::thread::sleep(delay);
            }

            match self.client.get(&url).query(&query).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(DataError::SeriesNotFound { id });
                    }

                    if status.is_server_error()
                        || status == reqwest::StatusCode::TOO_MANY_REQUESTS
                    {
                        last_error = Some(DataError::Http {
                            status: status.as_u16(),
                            id,
                        });
                        continue;
                    }

                    if !status.is_success() {
                        return Err(DataError::Http {
                            status: status.as_u16(),
                            id,
                        });
                    }

                    let rows: Vec<SgsRow> = resp.json().map_err(|e| {
                        DataError::ResponseFormatChanged(format!(
                            "failed to parse response for series {id}: {e}"
                        ))
                    })?;

                    return parse_rows(id, rows);
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(DataError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

/// Convert SGS rows into observations, oldest first.
fn parse_rows(id: SeriesId, rows: Vec<SgsRow>) -> Result<Vec<Observation>, DataError> {
    let mut observations = Vec::with_capacity(rows.len());

    for row in rows {
        let date = NaiveDate::parse_from_str(row.data.trim(), SGS_DATE_FORMAT).map_err(|e| {
            DataError::ResponseFormatChanged(format!(
                "invalid date '{}' in series {id}: {e}",
                row.data
            ))
        })?;
        observations.push(Observation::new(date, parse_value(row.valor.as_ref())));
    }

    observations.sort_by_key(|o| o.date);
    Ok(observations)
}

/// SGS sends values as strings; blanks and non-numeric markers are missing.
fn parse_value(raw: Option<&serde_json::Value>) -> Option<f64> {
    match raw? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

impl SeriesProvider for SgsProvider {
    fn name(&self) -> &str {
        "bcb_sgs"
    }

    fn fetch(&self, ids: &[SeriesId], start: Option<NaiveDate>) -> Result<SeriesFrame, DataError> {
        if ids.is_empty() {
            return Err(DataError::EmptyRequest);
        }

        let mut columns = Vec::with_capacity(ids.len());
        for &id in ids {
            let observations = self.fetch_with_retry(id, start)?;
            columns.push(RawColumn::new(id.to_string(), observations));
        }

        Ok(SeriesFrame::new(columns))
    }
}

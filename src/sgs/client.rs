use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::IndexConfig;
use crate::error::{EtlError, Result};
use crate::models::{month_start, IndexObservation, IndexSeries};

/// Request parameters for one series fetch
#[derive(Debug, Clone)]
pub struct SeriesRequest {
    /// SGS series code (e.g. 433 for the monthly IPCA)
    pub code: u32,
    /// First day of the range, inclusive
    pub start_date: NaiveDate,
    /// Last day of the range, inclusive
    pub end_date: NaiveDate,
}

impl From<&IndexConfig> for SeriesRequest {
    fn from(config: &IndexConfig) -> Self {
        Self {
            code: config.series_code,
            start_date: config.start_date,
            end_date: config.end_date,
        }
    }
}

/// A fetched series together with the payload it was parsed from
#[derive(Debug, Clone)]
pub struct SeriesResponse {
    pub series: IndexSeries,
    pub raw: serde_json::Value,
}

/// Client for the Banco Central do Brasil time-series API (SGS)
pub struct SgsClient {
    client: Client,
    base_url: String,
}

impl SgsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http_client(base_url, Client::new())
    }

    /// Use a preconfigured HTTP client (proxies, timeouts)
    pub fn with_http_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn series_url(&self, code: u32) -> String {
        format!("{}/bcdata.sgs.{}/dados", self.base_url, code)
    }

    /// Fetch every observation of a series in the inclusive date range.
    ///
    /// Any non-success status fails the fetch with the status and body; no
    /// retry is attempted here.
    pub async fn fetch_series(&self, request: &SeriesRequest) -> Result<SeriesResponse> {
        let start = request.start_date.format("%d/%m/%Y").to_string();
        let end = request.end_date.format("%d/%m/%Y").to_string();
        info!(
            "Fetching SGS series {} from {} to {}",
            request.code, start, end
        );

        let response = self
            .client
            .get(self.series_url(request.code))
            .query(&[
                ("formato", "json"),
                ("dataInicial", start.as_str()),
                ("dataFinal", end.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!("SGS series {} returned HTTP {}", request.code, status);
            return Err(EtlError::RemoteFetch { status, body });
        }

        let body = response.text().await?;
        let raw: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            EtlError::source_format(
                format!("SGS series {}", request.code),
                format!("invalid JSON: {}", e),
            )
        })?;
        let series = parse_series(request.code, &raw)?;

        info!(
            "SGS series {}: {} observations",
            request.code,
            series.len()
        );

        Ok(SeriesResponse { series, raw })
    }
}

#[derive(Debug, Deserialize)]
struct SgsObservation {
    data: String,
    valor: String,
}

/// Parse an SGS JSON payload (`[{"data": "DD/MM/YYYY", "valor": "0.53"}]`).
///
/// Dates are normalized to month starts. When a date appears twice the
/// first observation is kept.
pub fn parse_series(code: u32, raw: &serde_json::Value) -> Result<IndexSeries> {
    let source_name = format!("SGS series {}", code);
    let entries: Vec<SgsObservation> = serde_json::from_value(raw.clone())
        .map_err(|e| EtlError::source_format(&source_name, e.to_string()))?;

    let mut observations: Vec<IndexObservation> = Vec::with_capacity(entries.len());
    for entry in entries {
        let date = NaiveDate::parse_from_str(entry.data.trim(), "%d/%m/%Y").map_err(|_| {
            EtlError::source_format(&source_name, format!("invalid date {:?}", entry.data))
        })?;
        let value: f64 = entry
            .valor
            .trim()
            .parse()
            .map_err(|_| EtlError::NumericParse {
                stage: "stage0_load",
                value: entry.valor.clone(),
            })?;
        let date = month_start(date);

        if observations.iter().any(|o| o.date == date) {
            warn!("{}: duplicate observation for {}, keeping the first", source_name, date);
            continue;
        }
        debug!("{}: {} = {}", source_name, date, value);
        observations.push(IndexObservation { date, value });
    }

    Ok(IndexSeries::new(code, observations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sgs::test_server::{local_client, serve_once};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn request() -> SeriesRequest {
        SeriesRequest {
            code: 433,
            start_date: ymd(2025, 1, 1),
            end_date: ymd(2025, 2, 28),
        }
    }

    #[test]
    fn test_parse_series() {
        let raw = serde_json::json!([
            {"data": "01/01/2025", "valor": "0.16"},
            {"data": "01/02/2025", "valor": "1.31"}
        ]);

        let series = parse_series(433, &raw).unwrap();

        assert_eq!(series.code, 433);
        assert_eq!(
            series.observations,
            vec![
                IndexObservation { date: ymd(2025, 1, 1), value: 0.16 },
                IndexObservation { date: ymd(2025, 2, 1), value: 1.31 },
            ]
        );
    }

    #[test]
    fn test_parse_series_keeps_first_duplicate() {
        let raw = serde_json::json!([
            {"data": "01/01/2025", "valor": "0.16"},
            {"data": "01/01/2025", "valor": "9.99"}
        ]);
        let series = parse_series(433, &raw).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.observations[0].value, 0.16);
    }

    #[test]
    fn test_parse_series_bad_value() {
        let raw = serde_json::json!([{"data": "01/01/2025", "valor": "n/d"}]);
        let err = parse_series(433, &raw).unwrap_err();
        assert!(matches!(err, EtlError::NumericParse { .. }));
    }

    #[test]
    fn test_parse_series_bad_date() {
        let raw = serde_json::json!([{"data": "2025-01-01", "valor": "0.16"}]);
        let err = parse_series(433, &raw).unwrap_err();
        assert!(matches!(err, EtlError::SourceFormat { .. }));
    }

    #[test]
    fn test_series_url() {
        let client = SgsClient::new("https://api.bcb.gov.br/dados/serie/");
        assert_eq!(
            client.series_url(433),
            "https://api.bcb.gov.br/dados/serie/bcdata.sgs.433/dados"
        );
    }

    #[tokio::test]
    async fn test_fetch_series_success() {
        let base = serve_once(
            "200 OK",
            r#"[{"data":"01/01/2025","valor":"0.16"},{"data":"01/02/2025","valor":"1.31"}]"#,
        );

        let response = local_client(base).fetch_series(&request()).await.unwrap();

        assert_eq!(response.series.len(), 2);
        assert_eq!(response.raw.as_array().map(|a| a.len()), Some(2));
    }

    #[tokio::test]
    async fn test_fetch_series_non_success_is_remote_fetch_error() {
        let base = serve_once("500 Internal Server Error", "upstream down");

        let err = local_client(base).fetch_series(&request()).await.unwrap_err();

        match err {
            EtlError::RemoteFetch { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "upstream down");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

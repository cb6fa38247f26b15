use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::{DailyForecast, GeoResult, LookupError};

use super::WeatherProvider;

pub const DEFAULT_GEOCODING_BASE_URL: &str = "https://geocoding-api.open-meteo.com";
pub const DEFAULT_FORECAST_BASE_URL: &str = "https://api.open-meteo.com";

const DAILY_FIELDS: &str = "weathercode,temperature_2m_max,temperature_2m_min";

/// Open-Meteo geocoding and forecast APIs. Neither needs an API key.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    geocoding_base_url: String,
    forecast_base_url: String,
    http: Client,
}

impl OpenMeteoClient {
    pub fn new(geocoding_base_url: &str, forecast_base_url: &str) -> anyhow::Result<Self> {
        Url::parse(geocoding_base_url)
            .with_context(|| format!("Invalid geocoding base URL: {geocoding_base_url}"))?;
        Url::parse(forecast_base_url)
            .with_context(|| format!("Invalid forecast base URL: {forecast_base_url}"))?;

        Ok(Self {
            geocoding_base_url: geocoding_base_url.trim_end_matches('/').to_string(),
            forecast_base_url: forecast_base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        })
    }

    async fn search(&self, query: &str) -> Result<OmSearchResponse, LookupError> {
        let url = format!("{}/v1/search", self.geocoding_base_url);

        let res = self
            .http
            .get(&url)
            .query(&[("name", query)])
            .send()
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, "geocoding request could not be sent");
                LookupError::Network
            })?;

        let status = res.status();
        let body = res.text().await.map_err(|err| {
            LookupError::remote(format!("Failed to read geocoding response body: {err}"))
        })?;

        if !status.is_success() {
            return Err(LookupError::remote(format!(
                "Geocoding request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        serde_json::from_str(&body).map_err(|err| {
            LookupError::remote(format!("Failed to parse geocoding response: {err}"))
        })
    }
}

#[derive(Debug, Deserialize)]
struct OmSearchResponse {
    #[serde(default)]
    results: Vec<OmLocation>,
}

#[derive(Debug, Deserialize)]
struct OmLocation {
    latitude: f64,
    longitude: f64,
    #[serde(default = "auto_timezone")]
    timezone: String,
    name: String,
    #[serde(default)]
    country_code: String,
}

fn auto_timezone() -> String {
    "auto".to_string()
}

impl From<OmLocation> for GeoResult {
    fn from(loc: OmLocation) -> Self {
        GeoResult {
            latitude: loc.latitude,
            longitude: loc.longitude,
            timezone: loc.timezone,
            name: loc.name,
            country_code: loc.country_code,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OmForecastResponse {
    daily: OmDaily,
}

#[derive(Debug, Deserialize)]
struct OmDaily {
    time: Vec<NaiveDate>,
    weathercode: Vec<i32>,
    temperature_2m_max: Vec<f64>,
    temperature_2m_min: Vec<f64>,
}

#[async_trait]
impl WeatherProvider for OpenMeteoClient {
    async fn geocode(&self, query: &str) -> Result<GeoResult, LookupError> {
        let parsed = self.search(query).await?;
        tracing::debug!(query, matches = parsed.results.len(), "geocoding response received");

        GeoResult::first_of(parsed.results.into_iter().map(GeoResult::from))
    }

    async fn forecast(&self, location: &GeoResult) -> Result<DailyForecast, LookupError> {
        let url = format!("{}/v1/forecast", self.forecast_base_url);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("latitude", location.latitude.to_string()),
                ("longitude", location.longitude.to_string()),
                ("timezone", location.timezone.clone()),
                ("daily", DAILY_FIELDS.to_string()),
            ])
            .send()
            .await
            .map_err(|err| LookupError::remote(format!("Failed to send forecast request: {err}")))?;

        let status = res.status();
        let body = res.text().await.map_err(|err| {
            LookupError::remote(format!("Failed to read forecast response body: {err}"))
        })?;

        if !status.is_success() {
            return Err(LookupError::remote(format!(
                "Forecast request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        let parsed: OmForecastResponse = serde_json::from_str(&body).map_err(|err| {
            LookupError::remote(format!("Failed to parse forecast response: {err}"))
        })?;

        let daily = parsed.daily;
        DailyForecast::new(
            daily.time,
            daily.weathercode,
            daily.temperature_2m_max,
            daily.temperature_2m_min,
        )
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

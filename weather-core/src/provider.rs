use crate::{Config, DailyForecast, GeoResult, LookupError, provider::open_meteo::OpenMeteoClient};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod open_meteo;

/// The two remote stages of a lookup.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Resolve a free-text location to its first geocoding match.
    ///
    /// A failure to reach the service at all must be reported as
    /// [`LookupError::Network`], an answer without matches as
    /// [`LookupError::NotFound`].
    async fn geocode(&self, query: &str) -> Result<GeoResult, LookupError>;

    /// Fetch the daily forecast at a resolved location.
    async fn forecast(&self, location: &GeoResult) -> Result<DailyForecast, LookupError>;
}

/// Construct the Open-Meteo provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let client = OpenMeteoClient::new(&config.geocoding_base_url, &config.forecast_base_url)?;
    Ok(Arc::new(client))
}

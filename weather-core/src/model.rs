use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::LookupError;

/// A resolved location, taken from the first entry of a geocoding response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoResult {
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    pub name: String,
    pub country_code: String,
}

impl GeoResult {
    /// Pick the first entry of a result set, or `NotFound` when there is none.
    pub fn first_of<I>(results: I) -> Result<Self, LookupError>
    where
        I: IntoIterator<Item = GeoResult>,
    {
        results.into_iter().next().ok_or(LookupError::NotFound)
    }
}

/// Daily forecast stored as parallel sequences.
///
/// Index `i` of every sequence describes the same calendar day; the
/// constructor refuses sequences of differing length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyForecast {
    time: Vec<NaiveDate>,
    weather_code: Vec<i32>,
    temp_max: Vec<f64>,
    temp_min: Vec<f64>,
}

impl DailyForecast {
    pub fn new(
        time: Vec<NaiveDate>,
        weather_code: Vec<i32>,
        temp_max: Vec<f64>,
        temp_min: Vec<f64>,
    ) -> Result<Self, LookupError> {
        let len = time.len();
        if weather_code.len() != len || temp_max.len() != len || temp_min.len() != len {
            return Err(LookupError::remote(format!(
                "Forecast response has misaligned daily data (time: {}, weathercode: {}, \
                 temperature_2m_max: {}, temperature_2m_min: {})",
                len,
                weather_code.len(),
                temp_max.len(),
                temp_min.len(),
            )));
        }

        Ok(Self { time, weather_code, temp_max, temp_min })
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn time(&self) -> &[NaiveDate] {
        &self.time
    }

    pub fn weather_code(&self) -> &[i32] {
        &self.weather_code
    }

    pub fn temp_max(&self) -> &[f64] {
        &self.temp_max
    }

    pub fn temp_min(&self) -> &[f64] {
        &self.temp_min
    }

    /// Iterate the forecast one day at a time.
    pub fn days(&self) -> impl Iterator<Item = DayForecast> + '_ {
        (0..self.len()).map(move |i| DayForecast {
            date: self.time[i],
            weather_code: self.weather_code[i],
            temp_max: self.temp_max[i],
            temp_min: self.temp_min[i],
        })
    }
}

/// One row of a [`DailyForecast`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayForecast {
    pub date: NaiveDate,
    pub weather_code: i32,
    pub temp_max: f64,
    pub temp_min: f64,
}

/// Lifecycle of the lookup for the current query.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LookupState {
    #[default]
    Idle,
    Loading,
    Success {
        location: GeoResult,
        forecast: DailyForecast,
    },
    Error(String),
}

impl LookupState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LookupState::Loading)
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            LookupState::Error(message) => Some(message),
            _ => None,
        }
    }
}

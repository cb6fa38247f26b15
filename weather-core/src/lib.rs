//! Core library for the `classy-weather` CLI.
//!
//! This crate defines:
//! - The lookup controller: query changes in, lookup state out
//! - Abstraction over the geocoding/forecast provider (Open-Meteo)
//! - Shared domain models and the lookup error taxonomy
//! - Presentation helpers (icons, day labels, flags)
//! - Configuration of the service base URLs
//!
//! It is used by `classy-weather-cli`, but can also drive other front-ends.

pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod present;
pub mod provider;

pub use config::Config;
pub use controller::LookupController;
pub use error::LookupError;
pub use model::{DailyForecast, DayForecast, GeoResult, LookupState};
pub use provider::{WeatherProvider, open_meteo::OpenMeteoClient};

//! Pure display helpers: weather icons, day labels, flags and temperatures.

use chrono::{Local, NaiveDate};
use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::model::DayForecast;

/// Returned by [`icon_for`] for codes outside every bucket.
pub const ICON_NOT_FOUND: &str = "NOT FOUND";

/// Label used for the current calendar day.
pub const TODAY: &str = "TODAY";

/// Offset from an ASCII capital letter to its regional indicator symbol.
const REGIONAL_INDICATOR_OFFSET: u32 = 127_397;

/// Display category of a WMO weather code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IconBucket {
    Clear,
    MostlyClear,
    PartlyCloudy,
    Overcast,
    Fog,
    LightRain,
    Rain,
    Snow,
    Thunderstorm,
    ThunderstormHail,
}

impl IconBucket {
    /// WMO codes belonging to each bucket. Buckets are disjoint.
    const TABLE: &'static [(&'static [i32], IconBucket)] = &[
        (&[0], IconBucket::Clear),
        (&[1], IconBucket::MostlyClear),
        (&[2], IconBucket::PartlyCloudy),
        (&[3], IconBucket::Overcast),
        (&[45, 48], IconBucket::Fog),
        (&[51, 56, 61, 66, 80], IconBucket::LightRain),
        (&[53, 55, 57, 63, 65, 67, 81, 82], IconBucket::Rain),
        (&[71, 73, 75, 77, 85, 86], IconBucket::Snow),
        (&[95], IconBucket::Thunderstorm),
        (&[96, 99], IconBucket::ThunderstormHail),
    ];

    pub fn from_wmo_code(code: i32) -> Option<Self> {
        static BY_CODE: Lazy<HashMap<i32, IconBucket>> = Lazy::new(|| {
            IconBucket::TABLE
                .iter()
                .flat_map(|(codes, bucket)| codes.iter().map(move |code| (*code, *bucket)))
                .collect()
        });

        BY_CODE.get(&code).copied()
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Clear => "☀️",
            Self::MostlyClear => "🌤",
            Self::PartlyCloudy => "⛅️",
            Self::Overcast => "☁️",
            Self::Fog => "🌫",
            Self::LightRain => "🌦",
            Self::Rain => "🌧",
            Self::Snow => "🌨",
            Self::Thunderstorm => "🌩",
            Self::ThunderstormHail => "⛈",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::MostlyClear => "Mostly clear",
            Self::PartlyCloudy => "Partly cloudy",
            Self::Overcast => "Overcast",
            Self::Fog => "Fog",
            Self::LightRain => "Light rain showers",
            Self::Rain => "Rain",
            Self::Snow => "Snow",
            Self::Thunderstorm => "Thunderstorm",
            Self::ThunderstormHail => "Thunderstorm with hail",
        }
    }
}

/// Glyph for a WMO weather code, or [`ICON_NOT_FOUND`].
pub fn icon_for(weather_code: i32) -> &'static str {
    IconBucket::from_wmo_code(weather_code)
        .map(|bucket| bucket.glyph())
        .unwrap_or(ICON_NOT_FOUND)
}

/// `"TODAY"` when `date` is the same calendar day as `today`, otherwise the
/// short weekday name ("Mon").
pub fn day_label(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        TODAY.to_string()
    } else {
        date.format("%a").to_string()
    }
}

/// [`day_label`] against the current day in the local time zone.
pub fn day_label_local(date: NaiveDate) -> String {
    day_label(date, Local::now().date_naive())
}

/// Flag emoji for a two-letter country code, in either case.
///
/// Returns `None` unless the input is exactly two ASCII letters.
pub fn flag_for(country_code: &str) -> Option<String> {
    if country_code.chars().count() != 2 {
        return None;
    }

    country_code
        .chars()
        .map(|c| {
            if !c.is_ascii_alphabetic() {
                return None;
            }
            char::from_u32(c.to_ascii_uppercase() as u32 + REGIONAL_INDICATOR_OFFSET)
        })
        .collect()
}

/// Whole degrees, rounded half away from zero, with a degree mark.
pub fn format_temperature(value: f64) -> String {
    let rounded = value.round();
    // -0.4 rounds to -0.0, which would print as "-0".
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded:.0}°")
}

/// Everything needed to render one forecast day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySummary {
    pub icon: &'static str,
    pub label: String,
    pub min: String,
    pub max: String,
}

pub fn summarize(day: &DayForecast, today: NaiveDate) -> DaySummary {
    DaySummary {
        icon: icon_for(day.weather_code),
        label: day_label(day.date, today),
        min: format_temperature(day.temp_min),
        max: format_temperature(day.temp_max),
    }
}

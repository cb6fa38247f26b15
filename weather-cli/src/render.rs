use chrono::NaiveDate;
use classy_weather_core::{
    LookupState,
    present::{flag_for, summarize},
};

/// Terminal view of a lookup state. `Idle` renders nothing.
pub fn render_state(state: &LookupState, today: NaiveDate) -> Option<String> {
    match state {
        LookupState::Idle => None,
        LookupState::Loading => Some("Loading...".to_string()),
        LookupState::Error(message) => Some(message.clone()),
        LookupState::Success { location, forecast } => {
            let mut out = match flag_for(&location.country_code) {
                Some(flag) => format!("Weather for {} {flag}", location.name),
                None => format!("Weather for {}", location.name),
            };

            for day in forecast.days() {
                let summary = summarize(&day, today);
                out.push_str(&format!(
                    "\n{}  {:<5}  {} — {}",
                    summary.icon, summary.label, summary.min, summary.max
                ));
            }

            Some(out)
        }
    }
}

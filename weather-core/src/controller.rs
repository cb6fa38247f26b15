//! Query-driven lookup lifecycle.
//!
//! Every query change bumps the attempt counter and cancels the previous
//! attempt's token. A spawned attempt may only write the state while it is
//! still the current attempt, which is checked under the same lock that
//! changes it.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::{DailyForecast, GeoResult, LookupError, LookupState, WeatherProvider};

/// Queries shorter than this many characters are not looked up.
pub const MIN_QUERY_CHARS: usize = 2;

/// Inputs of the [`reduce`] transition function.
#[derive(Debug, Clone)]
pub enum LookupEvent {
    QueryCleared,
    Started,
    Succeeded {
        location: GeoResult,
        forecast: DailyForecast,
    },
    Failed(LookupError),
}

/// Pure state transition.
///
/// Completions are only meaningful while loading; in any other state they
/// leave it untouched.
pub fn reduce(state: LookupState, event: LookupEvent) -> LookupState {
    match (state, event) {
        (_, LookupEvent::QueryCleared) => LookupState::Idle,
        (_, LookupEvent::Started) => LookupState::Loading,
        (LookupState::Loading, LookupEvent::Succeeded { location, forecast }) => {
            LookupState::Success { location, forecast }
        }
        (LookupState::Loading, LookupEvent::Failed(err)) => LookupState::Error(err.to_string()),
        (state, _) => {
            tracing::debug!(?state, "ignoring completion outside of loading");
            state
        }
    }
}

/// Geocode `query`, then fetch the forecast for the first match.
pub async fn lookup(
    provider: &dyn WeatherProvider,
    query: &str,
) -> Result<(GeoResult, DailyForecast), LookupError> {
    tracing::debug!("geocoding");
    let location = provider.geocode(query).await?;

    tracing::debug!(
        name = %location.name,
        latitude = location.latitude,
        longitude = location.longitude,
        "fetching forecast"
    );
    let forecast = provider.forecast(&location).await?;

    Ok((location, forecast))
}

#[derive(Debug, Default)]
struct ActiveLookup {
    attempt: u64,
    token: Option<CancellationToken>,
    disposed: bool,
}

#[derive(Debug)]
struct Shared {
    state: watch::Sender<LookupState>,
    active: Mutex<ActiveLookup>,
}

impl Shared {
    /// Callers must hold the `active` lock.
    fn transition(&self, event: LookupEvent) {
        self.state.send_modify(|state| {
            let prev = std::mem::take(state);
            *state = reduce(prev, event);
        });
    }

    fn apply(&self, attempt: u64, event: LookupEvent) {
        let active = self.active.lock();
        if active.disposed || active.attempt != attempt {
            tracing::debug!(current = active.attempt, "discarding result of stale lookup");
            return;
        }
        self.transition(event);
    }
}

/// Owns the [`LookupState`] for a changing query.
///
/// At most one lookup is in flight. Dropping the controller disposes it.
#[derive(Debug)]
pub struct LookupController {
    provider: Arc<dyn WeatherProvider>,
    shared: Arc<Shared>,
}

impl LookupController {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        let (state, _) = watch::channel(LookupState::Idle);
        Self {
            provider,
            shared: Arc::new(Shared {
                state,
                active: Mutex::new(ActiveLookup::default()),
            }),
        }
    }

    /// React to a new query value.
    ///
    /// Short queries reset the state to `Idle` and return `None`. Otherwise
    /// the state becomes `Loading` and the lookup runs on a spawned task whose
    /// handle is returned; this must be called from within a tokio runtime.
    pub fn on_query_change(&self, query: &str) -> Option<JoinHandle<()>> {
        let mut active = self.shared.active.lock();
        if active.disposed {
            tracing::warn!(query, "query change after dispose ignored");
            return None;
        }

        if let Some(token) = active.token.take() {
            token.cancel();
        }
        active.attempt += 1;
        let attempt = active.attempt;

        if query.chars().count() < MIN_QUERY_CHARS {
            tracing::debug!(attempt, "query too short, not looking up");
            self.shared.transition(LookupEvent::QueryCleared);
            return None;
        }

        let token = CancellationToken::new();
        active.token = Some(token.clone());
        self.shared.transition(LookupEvent::Started);
        drop(active);

        let provider = Arc::clone(&self.provider);
        let shared = Arc::clone(&self.shared);
        let query = query.to_owned();
        let span = tracing::info_span!("lookup", attempt, query = %query);

        let task = async move {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::debug!("lookup cancelled");
                    return;
                }
                outcome = lookup(provider.as_ref(), &query) => outcome,
            };

            let event = match outcome {
                Ok((location, forecast)) => {
                    tracing::info!(name = %location.name, days = forecast.len(), "lookup finished");
                    LookupEvent::Succeeded { location, forecast }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "lookup failed");
                    LookupEvent::Failed(err)
                }
            };
            shared.apply(attempt, event);
        };

        Some(tokio::spawn(task.instrument(span)))
    }

    pub fn state(&self) -> LookupState {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LookupState> {
        self.shared.state.subscribe()
    }

    /// Cancel the active lookup and stop accepting queries.
    pub fn dispose(&self) {
        let mut active = self.shared.active.lock();
        if active.disposed {
            return;
        }
        active.disposed = true;
        if let Some(token) = active.token.take() {
            token.cancel();
        }
        tracing::debug!(attempt = active.attempt, "lookup controller disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.active.lock().disposed
    }
}

impl Drop for LookupController {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct FakeProvider {
        delays: Vec<(&'static str, u64)>,
        geocode_error: Option<LookupError>,
        forecast_error: Option<LookupError>,
        completed: Mutex<Vec<String>>,
    }

    impl FakeProvider {
        fn delay_for(&self, query: &str) -> Duration {
            let ms = self
                .delays
                .iter()
                .find(|(q, _)| *q == query)
                .map(|(_, ms)| *ms)
                .unwrap_or(1);
            Duration::from_millis(ms)
        }
    }

    #[async_trait]
    impl WeatherProvider for FakeProvider {
        async fn geocode(&self, query: &str) -> Result<GeoResult, LookupError> {
            tokio::time::sleep(self.delay_for(query)).await;
            self.completed.lock().push(query.to_string());

            if let Some(err) = &self.geocode_error {
                return Err(err.clone());
            }
            Ok(GeoResult {
                latitude: 51.5,
                longitude: -0.12,
                timezone: "Europe/London".into(),
                name: query.to_string(),
                country_code: "GB".into(),
            })
        }

        async fn forecast(&self, _location: &GeoResult) -> Result<DailyForecast, LookupError> {
            if let Some(err) = &self.forecast_error {
                return Err(err.clone());
            }
            week()
        }
    }

    fn week() -> Result<DailyForecast, LookupError> {
        let start = NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date");
        DailyForecast::new(
            start.iter_days().take(7).collect(),
            vec![0, 1, 2, 3, 45, 61, 95],
            vec![15.0, 14.5, 13.0, 12.2, 11.8, 10.1, 9.9],
            vec![8.0, 7.5, 6.0, 5.5, 4.9, 4.0, 3.3],
        )
    }

    fn controller(provider: FakeProvider) -> (LookupController, Arc<FakeProvider>) {
        let provider = Arc::new(provider);
        (LookupController::new(provider.clone()), provider)
    }

    #[tokio::test(start_paused = true)]
    async fn successful_lookup_ends_in_success() {
        let (ctl, _) = controller(FakeProvider::default());

        let handle = ctl.on_query_change("london").expect("lookup started");
        assert_eq!(ctl.state(), LookupState::Loading);
        handle.await.expect("task completes");

        match ctl.state() {
            LookupState::Success { location, forecast } => {
                assert_eq!(location.name, "london");
                assert_eq!(forecast.len(), 7);
                assert_eq!(forecast.weather_code().len(), 7);
                assert_eq!(forecast.temp_max().len(), 7);
                assert_eq!(forecast.temp_min().len(), 7);
                assert_eq!(forecast.weather_code()[4], 45);
                assert_eq!(forecast.temp_min()[4], 4.9);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn short_query_is_idle_regardless_of_prior_state() {
        let (ctl, _) = controller(FakeProvider {
            geocode_error: Some(LookupError::NotFound),
            ..Default::default()
        });

        ctl.on_query_change("nowhere").expect("lookup started").await.expect("task completes");
        assert_eq!(ctl.state(), LookupState::Error("Location not found".into()));

        assert!(ctl.on_query_change("n").is_none());
        assert_eq!(ctl.state(), LookupState::Idle);

        ctl.on_query_change("nowhere").expect("lookup started");
        assert!(ctl.on_query_change("").is_none());
        assert_eq!(ctl.state(), LookupState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn short_query_cancels_in_flight_lookup() {
        let (ctl, provider) = controller(FakeProvider {
            delays: vec![("london", 100)],
            ..Default::default()
        });

        let handle = ctl.on_query_change("london").expect("lookup started");
        assert!(ctl.on_query_change("l").is_none());
        handle.await.expect("task completes");

        assert_eq!(ctl.state(), LookupState::Idle);
        assert!(provider.completed.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn length_counts_characters_not_bytes() {
        let (ctl, _) = controller(FakeProvider::default());

        assert!(ctl.on_query_change("é").is_none());
        assert_eq!(ctl.state(), LookupState::Idle);

        let handle = ctl.on_query_change("Åre").expect("lookup started");
        handle.await.expect("task completes");
        assert!(matches!(ctl.state(), LookupState::Success { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_changes_only_latest_result_wins() {
        let (ctl, provider) = controller(FakeProvider {
            delays: vec![("lon", 300), ("londo", 200), ("london", 10)],
            ..Default::default()
        });

        let first = ctl.on_query_change("lon").expect("lookup started");
        let second = ctl.on_query_change("londo").expect("lookup started");
        let third = ctl.on_query_change("london").expect("lookup started");
        assert_eq!(ctl.state(), LookupState::Loading);

        third.await.expect("task completes");
        first.await.expect("task completes");
        second.await.expect("task completes");
        tokio::time::sleep(Duration::from_millis(500)).await;

        match ctl.state() {
            LookupState::Success { location, .. } => assert_eq!(location.name, "london"),
            other => panic!("expected success, got {other:?}"),
        }
        assert_eq!(*provider.completed.lock(), vec!["london".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_attempt_cannot_write_state() {
        let (ctl, _) = controller(FakeProvider {
            delays: vec![("paris", 1_000)],
            ..Default::default()
        });

        ctl.on_query_change("london");
        ctl.on_query_change("paris");

        let location = GeoResult {
            latitude: 51.5,
            longitude: -0.12,
            timezone: "Europe/London".into(),
            name: "London".into(),
            country_code: "GB".into(),
        };
        let forecast = week().expect("aligned");
        ctl.shared.apply(1, LookupEvent::Succeeded { location, forecast });

        assert_eq!(ctl.state(), LookupState::Loading);
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_is_reported() {
        let (ctl, _) = controller(FakeProvider {
            geocode_error: Some(LookupError::NotFound),
            ..Default::default()
        });

        ctl.on_query_change("atlantis").expect("lookup started").await.expect("task completes");
        assert_eq!(ctl.state(), LookupState::Error("Location not found".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn network_failure_is_reported() {
        let (ctl, _) = controller(FakeProvider {
            geocode_error: Some(LookupError::Network),
            ..Default::default()
        });

        ctl.on_query_change("london").expect("lookup started").await.expect("task completes");
        assert_eq!(ctl.state(), LookupState::Error("Connect to the internet".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn forecast_failure_message_is_verbatim() {
        let (ctl, _) = controller(FakeProvider {
            forecast_error: Some(LookupError::remote("Forecast request failed with status 502")),
            ..Default::default()
        });

        ctl.on_query_change("london").expect("lookup started").await.expect("task completes");
        assert_eq!(
            ctl.state().error_message(),
            Some("Forecast request failed with status 502")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn new_query_after_error_starts_loading_again() {
        let (ctl, _) = controller(FakeProvider {
            geocode_error: Some(LookupError::Network),
            ..Default::default()
        });

        ctl.on_query_change("london").expect("lookup started").await.expect("task completes");
        assert!(ctl.state().error_message().is_some());

        ctl.on_query_change("londo").expect("lookup started");
        assert_eq!(ctl.state(), LookupState::Loading);
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_prevents_late_writes() {
        let (ctl, provider) = controller(FakeProvider {
            delays: vec![("london", 100)],
            ..Default::default()
        });

        let handle = ctl.on_query_change("london").expect("lookup started");
        ctl.dispose();
        handle.await.expect("task completes");
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(ctl.is_disposed());
        assert_eq!(ctl.state(), LookupState::Loading);
        assert!(provider.completed.lock().is_empty());
        assert!(ctl.on_query_change("paris").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_disposes_controller() {
        let (ctl, provider) = controller(FakeProvider {
            delays: vec![("london", 100)],
            ..Default::default()
        });
        let rx = ctl.subscribe();

        let handle = ctl.on_query_change("london").expect("lookup started");
        drop(ctl);
        handle.await.expect("task completes");

        assert_eq!(*rx.borrow(), LookupState::Loading);
        assert!(provider.completed.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_observe_transitions() {
        let (ctl, _) = controller(FakeProvider::default());
        let mut rx = ctl.subscribe();
        assert_eq!(*rx.borrow_and_update(), LookupState::Idle);

        let handle = ctl.on_query_change("london").expect("lookup started");
        assert!(rx.has_changed().expect("sender alive"));
        assert_eq!(*rx.borrow_and_update(), LookupState::Loading);

        handle.await.expect("task completes");
        rx.changed().await.expect("sender alive");
        assert!(matches!(*rx.borrow(), LookupState::Success { .. }));
    }

    #[test]
    fn reduce_ignores_completion_outside_loading() {
        let err = LookupEvent::Failed(LookupError::Network);
        assert_eq!(reduce(LookupState::Idle, err), LookupState::Idle);

        let done = LookupEvent::Succeeded {
            location: GeoResult {
                latitude: 0.0,
                longitude: 0.0,
                timezone: "UTC".into(),
                name: "Null Island".into(),
                country_code: String::new(),
            },
            forecast: week().expect("aligned"),
        };
        let previous = LookupState::Error("Location not found".into());
        assert_eq!(reduce(previous.clone(), done), previous);
    }

    #[test]
    fn reduce_basic_transitions() {
        assert_eq!(reduce(LookupState::Idle, LookupEvent::Started), LookupState::Loading);
        assert_eq!(
            reduce(LookupState::Loading, LookupEvent::QueryCleared),
            LookupState::Idle
        );
        assert_eq!(
            reduce(LookupState::Loading, LookupEvent::Failed(LookupError::NotFound)),
            LookupState::Error("Location not found".into())
        );
    }
}

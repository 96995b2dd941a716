use std::fmt;

use chrono::{DateTime, Local};
use tracing::{debug, warn};

use crate::store::{PreferenceStore, CITY_KEY};
use crate::weather::{kelvin_to_celsius, FetchOutcome, WeatherError};

/// Sequence number of a fetch request. Only the latest one may update the view.
pub type Ticket = u64;

// Only Error is raised by the fetch flow; the banner renders all four.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Success,
}

#[derive(Debug, Clone)]
pub struct WeatherResult {
    pub title: String,
    pub text: String,
    /// Condition description from the provider, e.g. "light rain".
    pub summary: Option<String>,
    pub fetched_at: DateTime<Local>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub text: String,
    /// Increases with every notification shown in the session.
    pub serial: u64,
}

#[derive(Debug, Clone)]
pub enum ViewState {
    Idle,
    Fetching { ticket: Ticket, city: String },
    ResultShown(WeatherResult),
    NotificationShown(Notification),
}

/// Values handed to the city prompt, computed once per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityPrompt {
    pub title: String,
    pub description: String,
    pub input_name: String,
    pub confirm_label: String,
    pub initial_city: String,
}

impl CityPrompt {
    pub fn new(initial_city: impl Into<String>) -> Self {
        Self {
            title: "Enter city".to_string(),
            description: "Enter city name for a weather forecast of this city.".to_string(),
            input_name: "city".to_string(),
            confirm_label: "Show me the weather!".to_string(),
            initial_city: initial_city.into(),
        }
    }

    pub fn from_store(store: &dyn PreferenceStore) -> Self {
        let initial_city = match store.get(CITY_KEY) {
            Ok(city) => city.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "could not read stored city, starting with an empty prompt");
                String::new()
            }
        };
        Self::new(initial_city)
    }
}

/// A fetch the shell has to perform and report back through
/// [`Session::apply_outcome`].
#[derive(Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub ticket: Ticket,
    pub city: String,
    pub api_key: String,
}

impl fmt::Debug for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchRequest")
            .field("ticket", &self.ticket)
            .field("city", &self.city)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    TornDown,
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Shown,
    Discarded(DiscardReason),
}

pub struct Session {
    city: String,
    state: ViewState,
    api_key: Option<String>,
    last_ticket: Ticket,
    notification_serial: u64,
    torn_down: bool,
    prompt: CityPrompt,
}

impl Session {
    pub fn new(api_key: Option<String>, prompt: CityPrompt) -> Self {
        Self {
            city: String::new(),
            state: ViewState::Idle,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            last_ticket: 0,
            notification_serial: 0,
            torn_down: false,
            prompt,
        }
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn prompt(&self) -> &CityPrompt {
        &self.prompt
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn is_fetching(&self) -> bool {
        matches!(self.state, ViewState::Fetching { .. })
    }

    pub fn is_result_visible(&self) -> bool {
        matches!(self.state, ViewState::ResultShown(_))
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn is_notification_visible(&self) -> bool {
        matches!(self.state, ViewState::NotificationShown(_))
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn result(&self) -> Option<&WeatherResult> {
        match &self.state {
            ViewState::ResultShown(result) => Some(result),
            _ => None,
        }
    }

    pub fn notification(&self) -> Option<&Notification> {
        match &self.state {
            ViewState::NotificationShown(notification) => Some(notification),
            _ => None,
        }
    }

    /// Stores the submitted city. A fetch starts only when the value differs
    /// from the current one and is not empty.
    pub fn submit_city(&mut self, city: impl Into<String>) -> Option<FetchRequest> {
        if self.torn_down {
            return None;
        }
        let city = city.into();
        if city == self.city {
            debug!(city = %city, "city unchanged, not fetching");
            return None;
        }
        self.city = city;
        if self.city.is_empty() {
            return None;
        }
        let city = self.city.clone();
        self.fetch_and_show_weather(&city)
    }

    pub fn fetch_and_show_weather(&mut self, city: &str) -> Option<FetchRequest> {
        let Some(api_key) = self.api_key.clone() else {
            warn!("no API key configured, skipping weather request");
            self.notify(Severity::Error, WeatherError::MissingCredential.to_string());
            return None;
        };

        self.last_ticket += 1;
        let ticket = self.last_ticket;
        debug!(ticket, city, "fetching");
        self.state = ViewState::Fetching {
            ticket,
            city: city.to_string(),
        };
        Some(FetchRequest {
            ticket,
            city: city.to_string(),
            api_key,
        })
    }

    pub fn apply_outcome(&mut self, outcome: FetchOutcome) -> Applied {
        if self.torn_down {
            warn!(ticket = outcome.ticket, "session closed, dropping weather response");
            return Applied::Discarded(DiscardReason::TornDown);
        }
        if outcome.ticket != self.last_ticket {
            warn!(
                ticket = outcome.ticket,
                latest = self.last_ticket,
                city = %outcome.city,
                "dropping superseded weather response"
            );
            return Applied::Discarded(DiscardReason::Stale);
        }

        match outcome.result {
            Ok(current) => {
                let celsius = kelvin_to_celsius(current.main.feels_like);
                self.state = ViewState::ResultShown(WeatherResult {
                    title: format!("Weather in {}", outcome.city),
                    text: format!("Today it feels like {}°C", celsius),
                    summary: current.summary().map(str::to_string),
                    fetched_at: Local::now(),
                });
            }
            Err(e) => {
                self.notify(Severity::Error, e.to_string());
            }
        }
        Applied::Shown
    }

    pub fn dismiss_result(&mut self) {
        if self.is_result_visible() {
            self.state = ViewState::Idle;
        }
    }

    /// Hides the notification with the given serial. A newer notification
    /// stays up.
    pub fn dismiss_notification(&mut self, serial: u64) {
        if matches!(&self.state, ViewState::NotificationShown(n) if n.serial == serial) {
            self.state = ViewState::Idle;
        }
    }

    pub fn teardown(&mut self) {
        debug!("session torn down");
        self.torn_down = true;
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    fn notify(&mut self, severity: Severity, text: String) {
        self.notification_serial += 1;
        self.state = ViewState::NotificationShown(Notification {
            severity,
            text,
            serial: self.notification_serial,
        });
    }
}

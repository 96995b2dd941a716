use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::session::{FetchRequest, Ticket};

pub const OPEN_WEATHER_API_BASE: &str = "https://api.openweathermap.org";

// Current conditions as returned by /data/2.5/weather. Only `main.feels_like`
// is required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub main: MainReadings,
    #[serde(default)]
    pub weather: Vec<Condition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainReadings {
    /// Kelvin, the API default when no `units` parameter is sent.
    pub feels_like: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default)]
    pub description: String,
}

impl CurrentWeather {
    pub fn summary(&self) -> Option<&str> {
        self.weather
            .first()
            .map(|c| c.description.as_str())
            .filter(|d| !d.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeatherError {
    #[error("put API key in the OPENWEATHER_API_KEY environment variable")]
    MissingCredential,
    #[error("{0}")]
    Transport(String),
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("{0}")]
    Decode(String),
}

/// Result of one fetch, tagged with the ticket of the request that produced it.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub ticket: Ticket,
    pub city: String,
    pub result: Result<CurrentWeather, WeatherError>,
}

#[async_trait]
pub trait WeatherClient: Send + Sync {
    async fn current(&self, city: &str, api_key: &str) -> Result<CurrentWeather, WeatherError>;
}

pub struct OpenWeatherClient {
    http: reqwest::Client,
    base_url: String,
}

impl OpenWeatherClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/data/2.5/weather", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl WeatherClient for OpenWeatherClient {
    async fn current(&self, city: &str, api_key: &str) -> Result<CurrentWeather, WeatherError> {
        let url = self.endpoint();
        debug!(%url, city, "requesting current weather");

        // without_url keeps the appid query parameter out of error messages
        let response = self
            .http
            .get(&url)
            .query(&[("q", city), ("appid", api_key)])
            .send()
            .await
            .map_err(|e| WeatherError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| WeatherError::Transport(e.without_url().to_string()))?;

        if status.is_success() {
            decode_current(&body)
        } else {
            Err(status_error(status.as_u16(), &body))
        }
    }
}

pub fn decode_current(body: &str) -> Result<CurrentWeather, WeatherError> {
    serde_json::from_str::<CurrentWeather>(body).map_err(|e| WeatherError::Decode(e.to_string()))
}

fn status_error(status: u16, body: &str) -> WeatherError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("Error fetching weather: {}", status));
    WeatherError::Status { status, message }
}

/// Approximate Kelvin to Celsius conversion, `round(k - 273)`.
///
/// The offset is 273 rather than 273.15 and halves round towards positive
/// infinity, so 295.5 K reads 23 and 272.5 K reads 0.
pub fn kelvin_to_celsius(kelvin: f64) -> i64 {
    (kelvin - 273.0 + 0.5).floor() as i64
}

// The async function to run one request on behalf of the session
pub async fn fetch(client: Arc<dyn WeatherClient>, request: FetchRequest) -> FetchOutcome {
    info!(ticket = request.ticket, city = %request.city, "fetching weather");
    let result = client.current(&request.city, &request.api_key).await;
    match &result {
        Ok(current) => info!(
            ticket = request.ticket,
            feels_like = current.main.feels_like,
            "weather fetched"
        ),
        Err(e) => warn!(ticket = request.ticket, error = %e, "weather fetch failed"),
    }
    FetchOutcome {
        ticket: request.ticket,
        city: request.city,
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    #[test]
    fn conversion_uses_273_offset() {
        assert_eq!(kelvin_to_celsius(300.0), 27);
        assert_eq!(kelvin_to_celsius(273.0), 0);
        assert_eq!(kelvin_to_celsius(295.0), 22);
        // 273.15 would give 0 here
        assert_eq!(kelvin_to_celsius(273.6), 1);
        assert_eq!(kelvin_to_celsius(250.0), -23);
    }

    #[test]
    fn conversion_rounds_halves_up() {
        assert_eq!(kelvin_to_celsius(295.5), 23);
        assert_eq!(kelvin_to_celsius(272.5), 0);
        assert_eq!(kelvin_to_celsius(271.5), -1);
    }

    #[test]
    fn decode_accepts_full_payload() {
        let body = r#"{
            "coord": {"lon": 13.41, "lat": 52.52},
            "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}],
            "main": {"temp": 296.1, "feels_like": 295.4, "pressure": 1015, "humidity": 40},
            "name": "Berlin",
            "cod": 200
        }"#;
        let current = decode_current(body).unwrap();
        assert_eq!(current.main.feels_like, 295.4);
        assert_eq!(current.summary(), Some("clear sky"));
    }

    #[test]
    fn decode_reports_missing_main() {
        let err = decode_current(r#"{"name": "Berlin"}"#).unwrap_err();
        match err {
            WeatherError::Decode(message) => assert!(message.contains("main")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn decode_rejects_non_json() {
        assert!(matches!(
            decode_current("<html>bad gateway</html>"),
            Err(WeatherError::Decode(_))
        ));
    }

    #[test]
    fn status_error_prefers_provider_message() {
        let err = status_error(401, r#"{"cod": 401, "message": "Invalid API key."}"#);
        assert_eq!(err.to_string(), "Invalid API key.");
        let err = status_error(404, r#"{"cod": "404", "message": "city not found"}"#);
        assert_eq!(
            err,
            WeatherError::Status {
                status: 404,
                message: "city not found".to_string()
            }
        );
    }

    #[test]
    fn status_error_falls_back_to_status() {
        let err = status_error(502, "upstream exploded");
        assert_eq!(err.to_string(), "Error fetching weather: 502");
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let client = OpenWeatherClient::new("http://localhost:9999/");
        assert_eq!(client.endpoint(), "http://localhost:9999/data/2.5/weather");
    }

    #[test]
    fn missing_credential_message() {
        assert_eq!(
            WeatherError::MissingCredential.to_string(),
            "put API key in the OPENWEATHER_API_KEY environment variable"
        );
    }

    // Answers exactly one HTTP request with the given status line and body and
    // hands back the raw request head.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });
        (base_url, handle)
    }

    #[tokio::test]
    async fn open_weather_client_sends_city_and_key() {
        let (base_url, server) =
            serve_once("HTTP/1.1 200 OK", r#"{"main": {"feels_like": 295}}"#).await;
        let client = OpenWeatherClient::new(base_url);

        let current = client.current("Rio de Janeiro", "k3y").await.unwrap();
        assert_eq!(current.main.feels_like, 295.0);
        assert_eq!(current.summary(), None);

        let request = server.await.unwrap();
        let request_line = request.lines().next().unwrap();
        assert!(request_line.starts_with("GET /data/2.5/weather?"));
        assert!(request_line.contains("q=Rio+de+Janeiro"));
        assert!(request_line.contains("appid=k3y"));
    }

    #[tokio::test]
    async fn open_weather_client_maps_error_status() {
        let (base_url, server) = serve_once(
            "HTTP/1.1 401 Unauthorized",
            r#"{"cod": 401, "message": "Invalid API key."}"#,
        )
        .await;
        let client = OpenWeatherClient::new(base_url);

        let err = client.current("Berlin", "nope").await.unwrap_err();
        assert_eq!(
            err,
            WeatherError::Status {
                status: 401,
                message: "Invalid API key.".to_string()
            }
        );
        server.await.unwrap();
    }

    #[tokio::test]
    async fn open_weather_client_reports_transport_failure_without_key() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = OpenWeatherClient::new(format!("http://{addr}"));
        let err = client.current("Berlin", "secret-key").await.unwrap_err();
        match err {
            WeatherError::Transport(message) => assert!(!message.contains("secret-key")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    struct RecordingClient {
        calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl WeatherClient for RecordingClient {
        async fn current(&self, city: &str, api_key: &str) -> Result<CurrentWeather, WeatherError> {
            self.calls
                .lock()
                .unwrap()
                .push((city.to_string(), api_key.to_string()));
            Err(WeatherError::Transport("network down".to_string()))
        }
    }

    #[tokio::test]
    async fn fetch_tags_outcome_with_request() {
        let client = Arc::new(RecordingClient {
            calls: Mutex::new(Vec::new()),
        });
        let request = FetchRequest {
            ticket: 7,
            city: "Oslo".to_string(),
            api_key: "abc".to_string(),
        };

        let outcome = fetch(client.clone(), request).await;
        assert_eq!(outcome.ticket, 7);
        assert_eq!(outcome.city, "Oslo");
        assert_eq!(
            outcome.result.unwrap_err(),
            WeatherError::Transport("network down".to_string())
        );
        assert_eq!(
            *client.calls.lock().unwrap(),
            vec![("Oslo".to_string(), "abc".to_string())]
        );
    }
}

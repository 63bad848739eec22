use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use super::types::{SearchParams, SearchResponse};

const MAX_ATTEMPTS: u32 = 3;
const SEARCH_ENDPOINT: &str = "/api/search";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// Auth failures are terminal: retrying with the same token cannot succeed.
    pub fn is_auth(&self) -> bool {
        if let Self::Http { status: 401 | 403, .. } = self {
            return true;
        }

        let message = match self {
            Self::Http { message, .. } => message,
            Self::Network(message) => message,
            Self::Decode(_) => return false,
        };
        let message = message.to_lowercase();
        message.contains("token")
            && (message.contains("expired")
                || message.contains("invalid")
                || message.contains("missing")
                || message.contains("no authentication"))
    }
}

/// Uniform envelope handed to callers: either `data` with `success = true`,
/// or a terminal `error` message after retries are spent.
#[derive(Clone, Debug)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub success: bool,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            success: true,
            error: None,
        }
    }

    fn err(message: String) -> Self {
        Self {
            data: None,
            success: false,
            error: Some(message),
        }
    }
}

pub trait Transport: Send + Sync {
    fn get(&self, url: &str, query: &[(String, String)], token: Option<&str>)
    -> Result<Value, ApiError>;
    fn post(&self, url: &str, body: &Value, token: Option<&str>) -> Result<Value, ApiError>;
}

struct HttpTransport {
    http: reqwest::blocking::Client,
}

impl HttpTransport {
    fn new() -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
        }
    }

    fn finish(response: reqwest::blocking::Response) -> Result<Value, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|value| {
                    value
                        .get("error")
                        .or_else(|| value.get("message"))
                        .and_then(Value::as_str)
                        .map(str::to_owned)
                })
                .unwrap_or(body);
            return Err(ApiError::Http {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<Value>()
            .map_err(|error| ApiError::Decode(error.to_string()))
    }
}

impl Transport for HttpTransport {
    fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        token: Option<&str>,
    ) -> Result<Value, ApiError> {
        let mut request = self.http.get(url).query(query);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .map_err(|error| ApiError::Network(error.to_string()))?;
        Self::finish(response)
    }

    fn post(&self, url: &str, body: &Value, token: Option<&str>) -> Result<Value, ApiError> {
        let mut request = self.http.post(url).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .map_err(|error| ApiError::Network(error.to_string()))?;
        Self::finish(response)
    }
}

type Sleeper = Box<dyn Fn(Duration) + Send + Sync>;

/// Blocking client for the graph backend. Every call retries transient
/// failures with exponential backoff and short-circuits on auth errors.
pub struct RemoteClient {
    base_url: String,
    token: Option<String>,
    transport: Arc<dyn Transport>,
    sleeper: Sleeper,
}

impl RemoteClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            token,
            transport: Arc::new(HttpTransport::new()),
            sleeper: Box::new(thread::sleep),
        }
    }

    #[cfg(test)]
    fn with_transport(transport: Arc<dyn Transport>, sleeper: Sleeper) -> Self {
        Self {
            base_url: "http://test.invalid".to_owned(),
            token: None,
            transport,
            sleeper,
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }

    fn run<T>(&self, call: impl Fn() -> Result<T, ApiError>) -> ApiResponse<T> {
        let mut last_error = None;

        for attempt in 0..MAX_ATTEMPTS {
            match call() {
                Ok(data) => return ApiResponse::ok(data),
                Err(error) if error.is_auth() => {
                    tracing::warn!(%error, "authentication failed, not retrying");
                    return ApiResponse::err(error.to_string());
                }
                Err(error) => {
                    if attempt + 1 < MAX_ATTEMPTS {
                        let backoff = Duration::from_millis(1000u64 << attempt);
                        tracing::warn!(%error, attempt, backoff_ms = backoff.as_millis() as u64, "request failed, retrying");
                        (self.sleeper)(backoff);
                    }
                    last_error = Some(error);
                }
            }
        }

        let message = last_error
            .map(|error| error.to_string())
            .unwrap_or_else(|| "request failed".to_owned());
        ApiResponse::err(message)
    }

    pub fn get(&self, endpoint: &str, query: &[(String, String)]) -> ApiResponse<Value> {
        let url = self.url(endpoint);
        self.run(|| self.transport.get(&url, query, self.token.as_deref()))
    }

    pub fn post(&self, endpoint: &str, body: &Value) -> ApiResponse<Value> {
        let url = self.url(endpoint);
        self.run(|| self.transport.post(&url, body, self.token.as_deref()))
    }

    pub fn search(&self, params: &SearchParams) -> ApiResponse<SearchResponse> {
        let url = self.url(SEARCH_ENDPOINT);
        let query = params.to_query();
        self.run(|| {
            let raw = self.transport.get(&url, &query, self.token.as_deref())?;
            parse_search_response(raw)
        })
    }
}

fn parse_search_response(raw: Value) -> Result<SearchResponse, ApiError> {
    // Some deployments wrap the payload in a {data: ...} envelope.
    let payload = match raw.get("data") {
        Some(inner) if inner.is_object() || inner.is_array() => inner.clone(),
        _ => raw,
    };

    if payload.is_array() {
        let nodes =
            serde_json::from_value(payload).map_err(|error| ApiError::Decode(error.to_string()))?;
        return Ok(SearchResponse { nodes });
    }

    serde_json::from_value(payload).map_err(|error| ApiError::Decode(error.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    struct ScriptedTransport {
        responses: Mutex<Vec<Result<Value, ApiError>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<Value, ApiError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(0),
            }
        }

        fn next(&self) -> Result<Value, ApiError> {
            *self.calls.lock().expect("calls lock") += 1;
            let mut responses = self.responses.lock().expect("responses lock");
            if responses.is_empty() {
                Err(ApiError::Network("script exhausted".to_owned()))
            } else {
                responses.remove(0)
            }
        }
    }

    impl Transport for ScriptedTransport {
        fn get(&self, _: &str, _: &[(String, String)], _: Option<&str>) -> Result<Value, ApiError> {
            self.next()
        }

        fn post(&self, _: &str, _: &Value, _: Option<&str>) -> Result<Value, ApiError> {
            self.next()
        }
    }

    fn client_with(
        responses: Vec<Result<Value, ApiError>>,
    ) -> (RemoteClient, Arc<ScriptedTransport>, Arc<Mutex<Vec<Duration>>>) {
        let transport = Arc::new(ScriptedTransport::new(responses));
        let delays = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&delays);
        let client = RemoteClient::with_transport(
            Arc::clone(&transport) as Arc<dyn Transport>,
            Box::new(move |duration| recorded.lock().expect("delays lock").push(duration)),
        );
        (client, transport, delays)
    }

    #[test]
    fn retries_three_times_with_exponential_backoff() {
        let (client, transport, delays) = client_with(vec![
            Err(ApiError::Network("connection refused".to_owned())),
            Err(ApiError::Http {
                status: 500,
                message: "internal error".to_owned(),
            }),
            Err(ApiError::Network("connection reset".to_owned())),
        ]);

        let response = client.get("/api/search", &[]);

        assert!(!response.success);
        assert_eq!(*transport.calls.lock().expect("calls lock"), 3);
        assert_eq!(
            *delays.lock().expect("delays lock"),
            vec![Duration::from_millis(1000), Duration::from_millis(2000)]
        );
        assert_eq!(
            response.error.expect("error message"),
            "network error: connection reset"
        );
    }

    #[test]
    fn auth_error_short_circuits_after_one_attempt() {
        let (client, transport, delays) = client_with(vec![
            Err(ApiError::Network("Token expired".to_owned())),
            Ok(json!({"nodes": []})),
        ]);

        let response = client.get("/api/search", &[]);

        assert!(!response.success);
        assert_eq!(*transport.calls.lock().expect("calls lock"), 1);
        assert!(delays.lock().expect("delays lock").is_empty());
    }

    #[test]
    fn forbidden_status_is_terminal() {
        let (client, transport, _) = client_with(vec![Err(ApiError::Http {
            status: 403,
            message: "forbidden".to_owned(),
        })]);

        let response = client.get("/api/nodes", &[]);

        assert!(!response.success);
        assert_eq!(*transport.calls.lock().expect("calls lock"), 1);
    }

    #[test]
    fn success_after_transient_failure_returns_data() {
        let (client, transport, delays) = client_with(vec![
            Err(ApiError::Network("timeout".to_owned())),
            Ok(json!({"nodes": [{"id": "d1", "title": "Doc", "type": "document"}]})),
        ]);

        let response = client.search(&SearchParams::children_of("d1"));

        assert!(response.success);
        let data = response.data.expect("search data");
        assert_eq!(data.nodes.len(), 1);
        assert_eq!(data.nodes[0].id, "d1");
        assert_eq!(*transport.calls.lock().expect("calls lock"), 2);
        assert_eq!(
            *delays.lock().expect("delays lock"),
            vec![Duration::from_millis(1000)]
        );
    }

    #[test]
    fn search_unwraps_data_envelope() {
        let (client, _, _) = client_with(vec![Ok(json!({
            "data": {"nodes": [{"id": "a"}, {"id": "b"}]},
            "success": true
        }))]);

        let response = client.search(&SearchParams::initial("type:document", 3, 100));

        let data = response.data.expect("search data");
        assert_eq!(data.nodes.len(), 2);
    }
}

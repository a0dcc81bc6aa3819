use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use chrono::Utc;
use reqwest::{
    blocking::Client,
    header::{ACCEPT, CONTENT_TYPE},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;

use crate::{
    domain::{HealthReport, HealthStatus, PullRequest},
    jobs::CancelToken,
};

pub const GRAPHQL_PATH: &str = "/graphql";
pub const HEALTH_PATH: &str = "/health";
const USER_AGENT_HEADER: &str = "renovate-dashboard/0.1";

pub const STATUS_UNKNOWN: &str = "unknown";
pub const STATUS_DISCONNECTED: &str = "disconnected";

const OPEN_PULL_REQUESTS_OPERATION: &str = "OpenPullRequests";
const OPEN_PULL_REQUESTS_QUERY: &str = "query OpenPullRequests {
  openPullRequests {
    id
    number
    title
    state
    htmlUrl
    createdAt
    updatedAt
    userLogin
    userAvatarUrl
    repoOwner
    repoName
    headBranch
    baseBranch
  }
}";

const HEALTH_OPERATION: &str = "Health";
const HEALTH_QUERY: &str = "query Health {
  health
  version
}";

/// Raw access to the backend. Paths are relative to the configured origin.
pub trait Transport: Send + Sync {
    fn get(&self, path: &str) -> Result<String, FetchError>;
    fn post_json(&self, path: &str, body: &Value) -> Result<String, FetchError>;
}

pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT_HEADER)
            .timeout(timeout)
            .build()
            .map_err(FetchError::Http)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl Transport for HttpTransport {
    fn get(&self, path: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(self.url(path))
            .header(ACCEPT, "application/json")
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.text()?)
    }

    fn post_json(&self, path: &str, body: &Value) -> Result<String, FetchError> {
        let response = self
            .client
            .post(self.url(path))
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.text()?)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchPolicy {
    CacheFirst,
    NetworkOnly,
}

/// Backend client shared by every panel. Clones share the response cache.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    cache: Arc<Mutex<HashMap<String, Value>>>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn connect(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let transport = HttpTransport::new(base_url, timeout)?;
        Ok(Self::new(Arc::new(transport)))
    }

    pub fn open_pull_requests(&self, policy: FetchPolicy) -> Result<Vec<PullRequest>, FetchError> {
        let data: OpenPullRequestsData =
            self.query(OPEN_PULL_REQUESTS_OPERATION, OPEN_PULL_REQUESTS_QUERY, policy)?;
        Ok(data.open_pull_requests.unwrap_or_default())
    }

    pub fn api_health(&self, policy: FetchPolicy) -> Result<HealthStatus, FetchError> {
        self.query(HEALTH_OPERATION, HEALTH_QUERY, policy)
    }

    /// Maps `GET /health` onto a display string. Never fails.
    pub fn rest_status(&self) -> String {
        status_from_health_response(self.transport.get(HEALTH_PATH))
    }

    pub fn query<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        policy: FetchPolicy,
    ) -> Result<T, FetchError> {
        if policy == FetchPolicy::CacheFirst
            && let Some(data) = self.cached(query)
        {
            log::debug!("Serving {operation} from the response cache");
            return Ok(serde_json::from_value(data)?);
        }

        log::debug!("Issuing GraphQL operation {operation}");
        let request = GraphqlRequest {
            query,
            operation_name: operation,
        };
        let body = self
            .transport
            .post_json(GRAPHQL_PATH, &serde_json::to_value(&request)?)?;
        let response: GraphqlResponse = serde_json::from_str(&body)?;

        if !response.errors.is_empty() {
            let messages: Vec<_> = response
                .errors
                .into_iter()
                .map(|error| error.message)
                .collect();
            return Err(FetchError::Graphql(messages.join("; ")));
        }
        let data = response.data.ok_or(FetchError::MissingData)?;
        let parsed = serde_json::from_value(data.clone())?;
        self.store(query, data);
        Ok(parsed)
    }

    fn cached(&self, query: &str) -> Option<Value> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(query)
            .cloned()
    }

    fn store(&self, query: &str, data: Value) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(query.to_owned(), data);
    }
}

/// Runs both health checks and bundles them into one report.
///
/// The REST status is only published together with the structured result.
/// A cancelled token stops the check before each request.
pub fn check_health(api: &ApiClient, token: &CancelToken) -> Result<HealthReport, FetchError> {
    token.check()?;
    let rest_status = api.rest_status();
    token.check()?;
    let api_health = api
        .api_health(FetchPolicy::CacheFirst)
        .map_err(|err| {
            log::warn!("Structured health query failed: {err}");
            err.to_string()
        });
    Ok(HealthReport {
        rest_status,
        api: api_health,
        checked_at: Utc::now(),
    })
}

fn status_from_health_response(response: Result<String, FetchError>) -> String {
    let body = match response {
        Ok(body) => body,
        Err(err) => {
            log::warn!("Health endpoint unreachable: {err}");
            return STATUS_DISCONNECTED.to_owned();
        }
    };
    let payload: Value = match serde_json::from_str(&body) {
        Ok(payload) => payload,
        Err(err) => {
            log::warn!("Health endpoint returned malformed JSON: {err}");
            return STATUS_DISCONNECTED.to_owned();
        }
    };
    match payload.get("status") {
        Some(Value::String(status)) if !status.is_empty() => status.clone(),
        Some(Value::Bool(true)) => "true".to_owned(),
        Some(Value::Number(number)) if number.as_f64() != Some(0.0) => number.to_string(),
        _ => STATUS_UNKNOWN.to_owned(),
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server responded with HTTP {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{0}")]
    Graphql(String),
    #[error("response did not contain any data")]
    MissingData,
    #[error("request was cancelled")]
    Cancelled,
    #[error("Background worker disconnected before returning a result")]
    BackgroundWorkerGone,
}

// Wire payloads -------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphqlRequest<'a> {
    query: &'a str,
    operation_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphqlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorEntry {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenPullRequestsData {
    open_pull_requests: Option<Vec<PullRequest>>,
}


// -------------------------------------------------------------------------
// Tests
// -------------------------------------------------------------------------

//! Data source facade
//!
//! Ties settings, token handling and the query operations together behind the
//! two calls a visualization host makes:
//! 1. `query_data`: run a batch of queries, one frame set per `ref_id`
//! 2. `check_health`: acquire a token and probe the configured base path
//!
//! A batch is processed sequentially and aborts on the first failing query.

use crate::config::SdsSettings;
use crate::sds::client::decode_json;
use crate::sds::query::DEFAULT_FRAME_NAME;
use crate::sds::{
    fetch_stream_data, list_streams, Addressing, DecodePolicy, HttpTransport, ReqwestTransport,
    Result, ResultFrame, SdsClient, SdsError, Stream, TokenManager,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

const HEALTHY_MESSAGE: &str = "Data source is working";
const TOKEN_FAILURE_MESSAGE: &str = "Unable to retrieve token";
const INVALID_CONFIG_MESSAGE: &str = "Invalid Configuration";

/// Query time range; bounds are sent to the data endpoint as RFC3339
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// One query of a batch, as received from the host
#[derive(Debug, Clone)]
pub struct DataQuery {
    pub ref_id: String,
    /// Raw query model (`collection`, `queryText`, `id`)
    pub json: serde_json::Value,
    pub time_range: TimeRange,
}

/// Query model carried in `DataQuery::json`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct QueryModel {
    pub collection: String,
    #[serde(rename = "queryText")]
    pub query_text: String,
    pub id: String,
}

impl QueryModel {
    fn is_streams(&self) -> bool {
        self.collection.eq_ignore_ascii_case("streams")
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryDataRequest {
    /// Forwarded request headers; `Authorization` is used in pass-through mode
    pub headers: HashMap<String, String>,
    pub queries: Vec<DataQuery>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataResponse {
    pub frames: Vec<ResultFrame>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryDataResponse {
    /// Keyed by `DataQuery::ref_id`
    pub responses: HashMap<String, DataResponse>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckHealthResult {
    pub status: HealthStatus,
    /// Fixed user-facing message
    pub message: String,
    /// Underlying failure, when there is one
    pub details: Option<String>,
}

impl CheckHealthResult {
    fn ok() -> Self {
        CheckHealthResult {
            status: HealthStatus::Ok,
            message: HEALTHY_MESSAGE.to_string(),
            details: None,
        }
    }

    fn error(message: &str, err: &SdsError) -> Self {
        CheckHealthResult {
            status: HealthStatus::Error,
            message: message.to_string(),
            details: Some(err.to_string()),
        }
    }
}

/// Where bearer tokens come from
enum AuthMode {
    ClientCredentials(TokenManager),
    /// Use the caller's `Authorization` header verbatim
    PassThrough,
}

#[derive(Deserialize)]
struct HealthProbe {
    #[serde(rename = "Id")]
    id: String,
}

pub struct SdsDataSource {
    client: SdsClient,
    auth: AuthMode,
    policy: DecodePolicy,
}

impl SdsDataSource {
    /// Create a data source over the default `reqwest` transport
    pub fn new(settings: &SdsSettings) -> Result<Self> {
        Self::with_transport(settings, Arc::new(ReqwestTransport::new()))
    }

    pub fn with_transport(settings: &SdsSettings, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        settings.validate()?;

        let client = SdsClient::new(
            transport.clone(),
            settings.resource.clone(),
            settings.api_version.clone(),
            settings.addressing()?,
        );

        let auth = if settings.oauth_pass_thru {
            AuthMode::PassThrough
        } else {
            AuthMode::ClientCredentials(TokenManager::new(transport, settings.credentials()))
        };

        Ok(SdsDataSource {
            client,
            auth,
            policy: settings.decode_policy,
        })
    }

    /// Run every query of the batch in order
    ///
    /// The token is resolved once per batch. The first failing query aborts
    /// the batch; later queries are not executed. This includes a query whose
    /// model does not deserialize, which fails the whole batch rather than
    /// being reported against its own `ref_id`.
    pub async fn query_data(&self, request: &QueryDataRequest) -> Result<QueryDataResponse> {
        info!("QueryData called with {} queries", request.queries.len());

        let token = self.resolve_token(&request.headers).await?;

        let mut response = QueryDataResponse::default();
        for query in &request.queries {
            let result = self.query(query, &token).await.map_err(|e| {
                warn!("Query '{}' failed: {}", query.ref_id, e);
                e
            })?;
            response.responses.insert(query.ref_id.clone(), result);
        }

        Ok(response)
    }

    async fn query(&self, query: &DataQuery, token: &str) -> Result<DataResponse> {
        let model: QueryModel = serde_json::from_value(query.json.clone())
            .map_err(|e| SdsError::Decode(format!("query model '{}': {}", query.ref_id, e)))?;

        let frame = if model.is_streams() && !model.id.is_empty() {
            debug!("Stream data query for '{}'", model.id);
            fetch_stream_data(
                &self.client,
                token,
                &model.id,
                &format_index(query.time_range.from),
                &format_index(query.time_range.to),
                self.policy,
            )
            .await?
        } else if model.is_streams() {
            debug!("Stream query '{}'", model.query_text);
            list_streams(&self.client, token, &model.query_text).await?
        } else {
            debug!("Unrecognized collection '{}'", model.collection);
            ResultFrame::empty(DEFAULT_FRAME_NAME)
        };

        Ok(DataResponse {
            frames: vec![frame],
        })
    }

    async fn resolve_token(&self, headers: &HashMap<String, String>) -> Result<String> {
        match &self.auth {
            AuthMode::PassThrough => headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case("Authorization"))
                .map(|(_, v)| v.clone())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| SdsError::Auth("Unable to retrieve token".into())),
            AuthMode::ClientCredentials(manager) => manager.get_token().await.map_err(|e| {
                warn!("Unable to retrieve token: {}", e);
                e
            }),
        }
    }

    /// Acquire a token and issue one GET against the base path
    ///
    /// Pass-through mode has no credentials to test and always reports healthy.
    pub async fn check_health(&self) -> CheckHealthResult {
        let manager = match &self.auth {
            AuthMode::PassThrough => return CheckHealthResult::ok(),
            AuthMode::ClientCredentials(manager) => manager,
        };

        let token = match manager.get_token().await {
            Ok(token) => token,
            Err(e) => {
                warn!("Error unable to get token health check: {}", e);
                return CheckHealthResult::error(TOKEN_FAILURE_MESSAGE, &e);
            }
        };

        match self.probe(&token).await {
            Ok(()) => CheckHealthResult::ok(),
            Err(e) => {
                warn!("Error test request health check: {}", e);
                CheckHealthResult::error(INVALID_CONFIG_MESSAGE, &e)
            }
        }
    }

    async fn probe(&self, token: &str) -> Result<()> {
        let body = self
            .client
            .fetch(token, &self.client.health_path(), &[])
            .await?;

        match self.client.addressing() {
            Addressing::Account { .. } => decode_json::<Vec<Stream>>(&body).map(|_| ()),
            Addressing::Tenant { .. } => {
                let probe: HealthProbe = decode_json(&body)?;
                debug!("Health probe reached '{}'", probe.id);
                Ok(())
            }
        }
    }
}

/// Range bounds as RFC3339 with second precision and a `Z` suffix
fn format_index(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

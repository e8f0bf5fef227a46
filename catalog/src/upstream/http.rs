//! HTTP implementation of [`CatalogClient`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::HeaderMap, Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

use super::{unwrap_list, CatalogClient, ExecutionRequest, NamespaceInfo, RemoteOperation};
use crate::{
    credential::Credential,
    error::{CatalogError, CatalogResult},
};

const CONNECTION_HEADER: &str = "x-connection-id";
const SERVER_HEADER: &str = "x-server-id";

/// Upstream client speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    http: Client,
    base_url: Url,
}

impl HttpCatalogClient {
    pub fn new(base_url: &str, timeout: Duration) -> CatalogResult<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| CatalogError::Config(format!("upstream_base_url: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(CatalogError::Config(format!(
                "upstream_base_url cannot be used as a base: {}",
                base_url
            )));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Config(format!("build HTTP client: {}", e)))?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> CatalogResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                CatalogError::Config(format!("invalid base url: {}", self.base_url))
            })?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    fn authorize(request: RequestBuilder, credential: Option<&Credential>) -> RequestBuilder {
        match credential {
            Some(cred) if !cred.is_empty() => request.bearer_auth(cred.expose()),
            _ => request,
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> CatalogResult<T> {
        let response = request.send().await.map_err(|e| {
            CatalogError::UpstreamUnavailable(format!("request to upstream failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let body: Value = response.json().await.map_err(|e| {
            CatalogError::UpstreamUnavailable(format!("failed to read upstream body: {}", e))
        })?;
        Ok(serde_json::from_value(body)?)
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        credential: Option<&Credential>,
    ) -> CatalogResult<Vec<T>> {
        let url = self.endpoint(segments)?;
        debug!(url = %url, "Fetching upstream listing");
        let request = Self::authorize(self.http.get(url), credential);
        let body: Value = self.send_json(request).await?;
        Ok(serde_json::from_value(unwrap_list(body))?)
    }
}

/// Map a non-success HTTP status to the catalog error taxonomy.
pub(crate) fn status_error(status: StatusCode, body: &str) -> CatalogError {
    let detail = extract_error_detail(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    });

    if status == StatusCode::NOT_FOUND {
        CatalogError::not_found(detail)
    } else if status.is_client_error() {
        CatalogError::rejected(Some(status.as_u16()), detail)
    } else {
        CatalogError::UpstreamUnavailable(format!("upstream returned {}: {}", status, detail))
    }
}

fn extract_error_detail(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => ["error", "message", "detail"]
            .iter()
            .find_map(|key| match value.get(*key) {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Object(obj)) => obj
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            })
            .or_else(|| Some(trimmed.to_string())),
        Err(_) => Some(trimmed.chars().take(512).collect()),
    }
}

fn routing_headers(request: &ExecutionRequest) -> CatalogResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    let pairs = [
        (CONNECTION_HEADER, &request.routing.connection_id),
        (SERVER_HEADER, &request.routing.server_id),
    ];
    for (name, value) in pairs {
        if let Some(v) = value {
            headers.insert(
                name,
                v.parse()
                    .map_err(|e| CatalogError::InvalidInput(format!("header {}: {}", name, e)))?,
            );
        }
    }
    Ok(headers)
}

fn legacy_app_name(entry: &Value) -> Option<String> {
    match entry {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => ["name", "key", "slug"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_str))
            .map(str::to_string),
        _ => None,
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn list_namespaces(
        &self,
        credential: Option<&Credential>,
    ) -> CatalogResult<Vec<NamespaceInfo>> {
        self.get_list(&["namespaces"], credential).await
    }

    async fn list_operations(
        &self,
        source_name: &str,
        credential: Option<&Credential>,
    ) -> CatalogResult<Vec<RemoteOperation>> {
        self.get_list(&["namespaces", source_name, "operations"], credential)
            .await
    }

    async fn execute(
        &self,
        request: ExecutionRequest,
        credential: Option<&Credential>,
    ) -> CatalogResult<Value> {
        let url = self.endpoint(&["operations", &request.operation, "execute"])?;
        let headers = routing_headers(&request)?;
        let body = json!({
            "arguments": request.parameters,
            "context": request.routing.context_fields(),
        });

        debug!(
            operation = %request.operation,
            source = %request.routing.source_name,
            "Executing upstream operation"
        );
        let http_request = Self::authorize(self.http.post(url), credential)
            .headers(headers)
            .json(&body);
        self.send_json(http_request).await
    }

    async fn list_legacy_apps(&self, credential: Option<&Credential>) -> CatalogResult<Vec<String>> {
        let entries: Vec<Value> = self.get_list(&["apps"], credential).await?;
        let total = entries.len();
        let names: Vec<String> = entries.iter().filter_map(legacy_app_name).collect();
        if names.len() < total {
            warn!(
                skipped = total - names.len(),
                "Ignoring legacy app entries without a name"
            );
        }
        Ok(names)
    }
}

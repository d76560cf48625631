//! The Store Client (C1): a thin, instrumented transport over the store's
//! HTTP API.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use membridge_config::MemoryConfig;
use membridge_core::MemoryError;
use serde_json::Value;

use crate::envelope::StoreEnvelope;
use crate::types::{
    AddEventsBatchRequest, AddMessageRequest, AddResourceRequest, AddSkillRequest,
    CommitSessionRequest, ContextHit, CreateSessionResult, FsMkdirRequest, FsMvRequest,
    RelationEdge, RelationLinkRequest, SearchRequest, SearchResult,
};

/// The operations the read and write paths depend on.
///
/// Expressed as a trait (rather than a concrete struct) so tests can swap in
/// a fake without standing up a real HTTP server, and so the `dyn` object can
/// be shared behind an `Arc` across the per-(agentId,endpoint) singletons.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// `GET /health`.
    async fn health(&self) -> Result<Value, MemoryError>;
    /// `POST /api/v1/sessions`.
    async fn create_session(&self) -> Result<String, MemoryError>;
    /// `GET /api/v1/sessions`.
    async fn list_sessions(&self) -> Result<Value, MemoryError>;
    /// `GET /api/v1/sessions/{id}`.
    async fn get_session(&self, id: &str) -> Result<Value, MemoryError>;
    /// `DELETE /api/v1/sessions/{id}`.
    async fn delete_session(&self, id: &str) -> Result<(), MemoryError>;
    /// `POST /api/v1/sessions/{id}/extract`.
    async fn extract_session(&self, id: &str) -> Result<Value, MemoryError>;
    /// `POST /api/v1/sessions/{id}/messages`.
    async fn add_session_message(
        &self,
        id: &str,
        role: &str,
        content: &str,
    ) -> Result<(), MemoryError>;
    /// `POST /api/v1/sessions/{id}/events/batch`.
    async fn add_events_batch(&self, id: &str, events: &[Value]) -> Result<(), MemoryError>;
    /// `POST /api/v1/sessions/{id}/commit`.
    async fn commit_session(&self, id: &str, cause: &str) -> Result<(), MemoryError>;
    /// `POST /api/v1/search/search`.
    async fn search(
        &self,
        query: &str,
        target_uri: &str,
        session_id: Option<&str>,
        limit: u32,
        score_threshold: Option<f64>,
    ) -> Result<SearchResult, MemoryError>;
    /// `POST /api/v1/search/find`.
    async fn find(
        &self,
        query: &str,
        target_uri: &str,
        session_id: Option<&str>,
        limit: u32,
        score_threshold: Option<f64>,
    ) -> Result<SearchResult, MemoryError>;
    /// `POST /api/v1/search/grep`.
    async fn grep(&self, uri: &str, pattern: &str, case_insensitive: bool)
        -> Result<Value, MemoryError>;
    /// `POST /api/v1/search/glob`.
    async fn glob(&self, pattern: &str, uri: &str) -> Result<Value, MemoryError>;
    /// `GET /api/v1/content/read?uri=…`.
    async fn read(&self, uri: &str) -> Result<String, MemoryError>;
    /// `GET /api/v1/content/abstract?uri=…`.
    async fn r#abstract(&self, uri: &str) -> Result<String, MemoryError>;
    /// `GET /api/v1/content/overview?uri=…`.
    async fn overview(&self, uri: &str) -> Result<String, MemoryError>;
    /// `POST /api/v1/resources`.
    async fn add_resource(
        &self,
        path: &str,
        target: Option<&str>,
        reason: &str,
        instruction: &str,
        wait: bool,
        timeout: Option<u64>,
    ) -> Result<Value, MemoryError>;
    /// `POST /api/v1/skills`.
    async fn add_skill(&self, data: &Value, wait: bool, timeout: Option<u64>)
        -> Result<Value, MemoryError>;
    /// `POST /api/v1/system/wait`.
    async fn wait_processed(&self, timeout: Option<u64>) -> Result<Value, MemoryError>;
    /// `GET /api/v1/fs/ls?uri=…`.
    async fn fs_ls(&self, uri: &str) -> Result<Value, MemoryError>;
    /// `GET /api/v1/fs/tree?uri=…`.
    async fn fs_tree(&self, uri: &str) -> Result<Value, MemoryError>;
    /// `GET /api/v1/fs/stat?uri=…`.
    async fn fs_stat(&self, uri: &str) -> Result<Value, MemoryError>;
    /// `POST /api/v1/fs/mkdir`. `uri` must already be policy-vetted.
    async fn fs_mkdir(&self, uri: &str) -> Result<(), MemoryError>;
    /// `DELETE /api/v1/fs?uri=…&recursive=…`. `uri` must already be policy-vetted.
    async fn fs_rm(&self, uri: &str, recursive: bool) -> Result<(), MemoryError>;
    /// `POST /api/v1/fs/mv`. Both uris must already be policy-vetted.
    async fn fs_mv(&self, from_uri: &str, to_uri: &str) -> Result<(), MemoryError>;
    /// `GET /api/v1/relations?uri=…`.
    async fn relations(&self, uri: &str) -> Result<Vec<RelationEdge>, MemoryError>;
    /// `POST /api/v1/relations/link`.
    async fn link_relation(
        &self,
        from_uri: &str,
        to_uri: &str,
        reason: Option<&str>,
    ) -> Result<(), MemoryError>;
    /// `DELETE /api/v1/relations/link`.
    async fn unlink_relation(&self, from_uri: &str, to_uri: &str) -> Result<(), MemoryError>;
    /// `GET /api/v1/observer/queue`.
    async fn observer_queue(&self) -> Result<Value, MemoryError>;
    /// `GET /api/v1/observer/vikingdb`.
    async fn observer_vikingdb(&self) -> Result<Value, MemoryError>;
    /// `GET /api/v1/observer/vlm`.
    async fn observer_vlm(&self) -> Result<Value, MemoryError>;
    /// `GET /api/v1/observer/transaction`.
    async fn observer_transaction(&self) -> Result<Value, MemoryError>;
    /// `GET /api/v1/observer/system`.
    async fn observer_system(&self) -> Result<Value, MemoryError>;
    /// `POST /api/v1/pack/export`.
    async fn pack_export(&self, body: &Value) -> Result<Value, MemoryError>;
    /// `POST /api/v1/pack/import`.
    async fn pack_import(&self, body: &Value) -> Result<Value, MemoryError>;
}

/// `reqwest`-backed [`StoreClient`].
///
/// One instance is constructed per `(agentId, endpoint)` and reused — it
/// owns a single `reqwest::Client` so connection pooling is shared across
/// calls from the same agent.
pub struct HttpStoreClient {
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
    api_key: Option<String>,
    static_headers: HashMap<String, String>,
}

impl HttpStoreClient {
    /// Build a client from a resolved [`MemoryConfig`].
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            http: reqwest::Client::builder()
                .user_agent("memory-bridge/1.0")
                .build()
                .unwrap_or_default(),
            endpoint: config.endpoint.trim_end_matches('/').to_owned(),
            timeout: Duration::from_millis(config.timeout_ms),
            api_key: config.api_key.clone(),
            static_headers: config.headers.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    fn header_map(&self, extra: Option<&HashMap<String, String>>) -> reqwest::header::HeaderMap {
        let mut map = reqwest::header::HeaderMap::new();
        for (k, v) in &self.static_headers {
            insert_header(&mut map, k, v);
        }
        if let Some(key) = &self.api_key {
            insert_header(&mut map, "X-API-Key", key);
        }
        if let Some(extra) = extra {
            for (k, v) in extra {
                insert_header(&mut map, k, v);
            }
        }
        map
    }

    async fn request(
        &self,
        operation: &'static str,
        method: reqwest::Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value, MemoryError> {
        let span = tracing::info_span!(
            "memory_client.request",
            operation,
            method = %method,
            path,
        );
        let _enter = span.enter();
        let started = Instant::now();

        let mut builder = self
            .http
            .request(method, self.url(path))
            .timeout(self.timeout)
            .headers(self.header_map(None));

        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let result = builder.send().await;
        let elapsed_ms = started.elapsed().as_millis();

        let response = match result {
            Ok(r) => r,
            Err(e) => {
                let err: MemoryError = e.into();
                tracing::warn!(operation, %elapsed_ms, error = %err, "store request failed");
                return Err(err);
            }
        };

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or("unknown status");
        let is_2xx = status.is_success();
        let is_retryable_status =
            status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS;
        let body_text = response.text().await.unwrap_or_default();

        match StoreEnvelope::parse(is_2xx, is_retryable_status, status_text, &body_text) {
            Ok(value) => {
                tracing::debug!(operation, status = %status, %elapsed_ms, "store request ok");
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(operation, status = %status, %elapsed_ms, error = %err, "store request errored");
                Err(err)
            }
        }
    }
}

fn insert_header(map: &mut reqwest::header::HeaderMap, key: &str, value: &str) {
    if let (Ok(name), Ok(val)) = (
        reqwest::header::HeaderName::from_bytes(key.as_bytes()),
        reqwest::header::HeaderValue::from_str(value),
    ) {
        let _ = map.insert(name, val);
    }
}

fn parse_search_result(value: Value) -> Result<SearchResult, MemoryError> {
    serde_json::from_value(value).map_err(|e| MemoryError::Protocol(format!("bad search result: {e}")))
}

fn layer_text(value: Value) -> Result<String, MemoryError> {
    match value {
        Value::String(s) => Ok(s),
        Value::Object(map) => Ok(map
            .get("text")
            .or_else(|| map.get("content"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned()),
        Value::Null => Ok(String::new()),
        other => Ok(other.to_string()),
    }
}

#[async_trait]
impl StoreClient for HttpStoreClient {
    async fn health(&self) -> Result<Value, MemoryError> {
        self.request("health", reqwest::Method::GET, "/health", &[], None)
            .await
    }

    async fn create_session(&self) -> Result<String, MemoryError> {
        let value = self
            .request(
                "create_session",
                reqwest::Method::POST,
                "/api/v1/sessions",
                &[],
                Some(&serde_json::json!({})),
            )
            .await?;
        let parsed: CreateSessionResult = serde_json::from_value(value)
            .map_err(|e| MemoryError::Protocol(format!("bad create_session result: {e}")))?;
        Ok(parsed.session_id)
    }

    async fn list_sessions(&self) -> Result<Value, MemoryError> {
        self.request(
            "list_sessions",
            reqwest::Method::GET,
            "/api/v1/sessions",
            &[],
            None,
        )
        .await
    }

    async fn get_session(&self, id: &str) -> Result<Value, MemoryError> {
        self.request(
            "get_session",
            reqwest::Method::GET,
            &format!("/api/v1/sessions/{id}"),
            &[],
            None,
        )
        .await
    }

    async fn delete_session(&self, id: &str) -> Result<(), MemoryError> {
        self.request(
            "delete_session",
            reqwest::Method::DELETE,
            &format!("/api/v1/sessions/{id}"),
            &[],
            None,
        )
        .await?;
        Ok(())
    }

    async fn extract_session(&self, id: &str) -> Result<Value, MemoryError> {
        self.request(
            "extract_session",
            reqwest::Method::POST,
            &format!("/api/v1/sessions/{id}/extract"),
            &[],
            Some(&serde_json::json!({})),
        )
        .await
    }

    async fn add_session_message(
        &self,
        id: &str,
        role: &str,
        content: &str,
    ) -> Result<(), MemoryError> {
        let body = serde_json::to_value(AddMessageRequest { role, content })?;
        self.request(
            "add_session_message",
            reqwest::Method::POST,
            &format!("/api/v1/sessions/{id}/messages"),
            &[],
            Some(&body),
        )
        .await?;
        Ok(())
    }

    async fn add_events_batch(&self, id: &str, events: &[Value]) -> Result<(), MemoryError> {
        let body = serde_json::to_value(AddEventsBatchRequest { events })?;
        self.request(
            "add_events_batch",
            reqwest::Method::POST,
            &format!("/api/v1/sessions/{id}/events/batch"),
            &[],
            Some(&body),
        )
        .await?;
        Ok(())
    }

    async fn commit_session(&self, id: &str, cause: &str) -> Result<(), MemoryError> {
        let body = serde_json::to_value(CommitSessionRequest { cause })?;
        self.request(
            "commit_session",
            reqwest::Method::POST,
            &format!("/api/v1/sessions/{id}/commit"),
            &[],
            Some(&body),
        )
        .await?;
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        target_uri: &str,
        session_id: Option<&str>,
        limit: u32,
        score_threshold: Option<f64>,
    ) -> Result<SearchResult, MemoryError> {
        let body = serde_json::to_value(SearchRequest {
            query,
            target_uri,
            session_id,
            limit,
            score_threshold,
            filter: None,
        })?;
        let value = self
            .request(
                "search",
                reqwest::Method::POST,
                "/api/v1/search/search",
                &[],
                Some(&body),
            )
            .await?;
        parse_search_result(value)
    }

    async fn find(
        &self,
        query: &str,
        target_uri: &str,
        session_id: Option<&str>,
        limit: u32,
        score_threshold: Option<f64>,
    ) -> Result<SearchResult, MemoryError> {
        let body = serde_json::to_value(SearchRequest {
            query,
            target_uri,
            session_id,
            limit,
            score_threshold,
            filter: None,
        })?;
        let value = self
            .request(
                "find",
                reqwest::Method::POST,
                "/api/v1/search/find",
                &[],
                Some(&body),
            )
            .await?;
        parse_search_result(value)
    }

    async fn grep(
        &self,
        uri: &str,
        pattern: &str,
        case_insensitive: bool,
    ) -> Result<Value, MemoryError> {
        let body = serde_json::json!({"uri": uri, "pattern": pattern, "case_insensitive": case_insensitive});
        self.request(
            "grep",
            reqwest::Method::POST,
            "/api/v1/search/grep",
            &[],
            Some(&body),
        )
        .await
    }

    async fn glob(&self, pattern: &str, uri: &str) -> Result<Value, MemoryError> {
        let body = serde_json::json!({"pattern": pattern, "uri": uri});
        self.request(
            "glob",
            reqwest::Method::POST,
            "/api/v1/search/glob",
            &[],
            Some(&body),
        )
        .await
    }

    async fn read(&self, uri: &str) -> Result<String, MemoryError> {
        let value = self
            .request(
                "read",
                reqwest::Method::GET,
                "/api/v1/content/read",
                &[("uri", uri)],
                None,
            )
            .await?;
        layer_text(value)
    }

    async fn r#abstract(&self, uri: &str) -> Result<String, MemoryError> {
        let value = self
            .request(
                "abstract",
                reqwest::Method::GET,
                "/api/v1/content/abstract",
                &[("uri", uri)],
                None,
            )
            .await?;
        layer_text(value)
    }

    async fn overview(&self, uri: &str) -> Result<String, MemoryError> {
        let value = self
            .request(
                "overview",
                reqwest::Method::GET,
                "/api/v1/content/overview",
                &[("uri", uri)],
                None,
            )
            .await?;
        layer_text(value)
    }

    async fn add_resource(
        &self,
        path: &str,
        target: Option<&str>,
        reason: &str,
        instruction: &str,
        wait: bool,
        timeout: Option<u64>,
    ) -> Result<Value, MemoryError> {
        let body = serde_json::to_value(AddResourceRequest {
            path,
            target,
            reason,
            instruction,
            wait,
            timeout,
        })?;
        self.request(
            "add_resource",
            reqwest::Method::POST,
            "/api/v1/resources",
            &[],
            Some(&body),
        )
        .await
    }

    async fn add_skill(
        &self,
        data: &Value,
        wait: bool,
        timeout: Option<u64>,
    ) -> Result<Value, MemoryError> {
        let body = serde_json::to_value(AddSkillRequest { data, wait, timeout })?;
        self.request(
            "add_skill",
            reqwest::Method::POST,
            "/api/v1/skills",
            &[],
            Some(&body),
        )
        .await
    }

    async fn wait_processed(&self, timeout: Option<u64>) -> Result<Value, MemoryError> {
        let body = serde_json::json!({"timeout": timeout});
        self.request(
            "wait_processed",
            reqwest::Method::POST,
            "/api/v1/system/wait",
            &[],
            Some(&body),
        )
        .await
    }

    async fn fs_ls(&self, uri: &str) -> Result<Value, MemoryError> {
        self.request(
            "fs_ls",
            reqwest::Method::GET,
            "/api/v1/fs/ls",
            &[("uri", uri)],
            None,
        )
        .await
    }

    async fn fs_tree(&self, uri: &str) -> Result<Value, MemoryError> {
        self.request(
            "fs_tree",
            reqwest::Method::GET,
            "/api/v1/fs/tree",
            &[("uri", uri)],
            None,
        )
        .await
    }

    async fn fs_stat(&self, uri: &str) -> Result<Value, MemoryError> {
        self.request(
            "fs_stat",
            reqwest::Method::GET,
            "/api/v1/fs/stat",
            &[("uri", uri)],
            None,
        )
        .await
    }

    async fn fs_mkdir(&self, uri: &str) -> Result<(), MemoryError> {
        let body = serde_json::to_value(FsMkdirRequest { uri })?;
        self.request(
            "fs_mkdir",
            reqwest::Method::POST,
            "/api/v1/fs/mkdir",
            &[],
            Some(&body),
        )
        .await?;
        Ok(())
    }

    async fn fs_rm(&self, uri: &str, recursive: bool) -> Result<(), MemoryError> {
        self.request(
            "fs_rm",
            reqwest::Method::DELETE,
            "/api/v1/fs",
            &[("uri", uri), ("recursive", if recursive { "true" } else { "false" })],
            None,
        )
        .await?;
        Ok(())
    }

    async fn fs_mv(&self, from_uri: &str, to_uri: &str) -> Result<(), MemoryError> {
        let body = serde_json::to_value(FsMvRequest { from_uri, to_uri })?;
        self.request(
            "fs_mv",
            reqwest::Method::POST,
            "/api/v1/fs/mv",
            &[],
            Some(&body),
        )
        .await?;
        Ok(())
    }

    async fn relations(&self, uri: &str) -> Result<Vec<RelationEdge>, MemoryError> {
        let value = self
            .request(
                "relations",
                reqwest::Method::GET,
                "/api/v1/relations",
                &[("uri", uri)],
                None,
            )
            .await?;
        match value {
            Value::Array(_) => serde_json::from_value(value)
                .map_err(|e| MemoryError::Protocol(format!("bad relations result: {e}"))),
            Value::Object(ref map) if map.contains_key("relations") => {
                serde_json::from_value(value["relations"].clone())
                    .map_err(|e| MemoryError::Protocol(format!("bad relations result: {e}")))
            }
            Value::Null => Ok(Vec::new()),
            other => Err(MemoryError::Protocol(format!(
                "unexpected relations shape: {other}"
            ))),
        }
    }

    async fn link_relation(
        &self,
        from_uri: &str,
        to_uri: &str,
        reason: Option<&str>,
    ) -> Result<(), MemoryError> {
        let body = serde_json::to_value(RelationLinkRequest {
            from_uri,
            to_uri,
            reason,
        })?;
        self.request(
            "link_relation",
            reqwest::Method::POST,
            "/api/v1/relations/link",
            &[],
            Some(&body),
        )
        .await?;
        Ok(())
    }

    async fn unlink_relation(&self, from_uri: &str, to_uri: &str) -> Result<(), MemoryError> {
        let body = serde_json::to_value(RelationLinkRequest {
            from_uri,
            to_uri,
            reason: None,
        })?;
        self.request(
            "unlink_relation",
            reqwest::Method::DELETE,
            "/api/v1/relations/link",
            &[],
            Some(&body),
        )
        .await?;
        Ok(())
    }

    async fn observer_queue(&self) -> Result<Value, MemoryError> {
        self.request(
            "observer_queue",
            reqwest::Method::GET,
            "/api/v1/observer/queue",
            &[],
            None,
        )
        .await
    }

    async fn observer_vikingdb(&self) -> Result<Value, MemoryError> {
        self.request(
            "observer_vikingdb",
            reqwest::Method::GET,
            "/api/v1/observer/vikingdb",
            &[],
            None,
        )
        .await
    }

    async fn observer_vlm(&self) -> Result<Value, MemoryError> {
        self.request(
            "observer_vlm",
            reqwest::Method::GET,
            "/api/v1/observer/vlm",
            &[],
            None,
        )
        .await
    }

    async fn observer_transaction(&self) -> Result<Value, MemoryError> {
        self.request(
            "observer_transaction",
            reqwest::Method::GET,
            "/api/v1/observer/transaction",
            &[],
            None,
        )
        .await
    }

    async fn observer_system(&self) -> Result<Value, MemoryError> {
        self.request(
            "observer_system",
            reqwest::Method::GET,
            "/api/v1/observer/system",
            &[],
            None,
        )
        .await
    }

    async fn pack_export(&self, body: &Value) -> Result<Value, MemoryError> {
        self.request(
            "pack_export",
            reqwest::Method::POST,
            "/api/v1/pack/export",
            &[],
            Some(body),
        )
        .await
    }

    async fn pack_import(&self, body: &Value) -> Result<Value, MemoryError> {
        self.request(
            "pack_import",
            reqwest::Method::POST,
            "/api/v1/pack/import",
            &[],
            Some(body),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(endpoint: &str) -> MemoryConfig {
        let mut cfg = MemoryConfig::default();
        cfg.endpoint = endpoint.to_owned();
        cfg.timeout_ms = 2_000;
        cfg
    }

    #[tokio::test]
    async fn health_hits_get_health() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ok",
                "result": {"ok": true}
            })))
            .mount(&server)
            .await;

        let client = HttpStoreClient::new(&config_for(&server.uri()));
        let value = client.health().await.unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn create_session_parses_session_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ok",
                "result": {"session_id": "sess-123"}
            })))
            .mount(&server)
            .await;

        let client = HttpStoreClient::new(&config_for(&server.uri()));
        let id = client.create_session().await.unwrap();
        assert_eq!(id, "sess-123");
    }

    #[tokio::test]
    async fn error_envelope_becomes_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/sessions/missing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "error",
                "error": {"message": "no such session"}
            })))
            .mount(&server)
            .await;

        let client = HttpStoreClient::new(&config_for(&server.uri()));
        let err = client.get_session("missing").await.unwrap_err();
        assert_eq!(err.to_string(), "store protocol error: no such session");
    }

    #[tokio::test]
    async fn server_error_status_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = HttpStoreClient::new(&config_for(&server.uri()));
        let err = client.health().await.unwrap_err();
        assert!(matches!(err, MemoryError::Transport(_)));
    }

    #[tokio::test]
    async fn client_error_status_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = HttpStoreClient::new(&config_for(&server.uri()));
        let err = client.health().await.unwrap_err();
        assert!(matches!(err, MemoryError::Protocol(_)));
    }

    #[tokio::test]
    async fn too_many_requests_status_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = HttpStoreClient::new(&config_for(&server.uri()));
        let err = client.health().await.unwrap_err();
        assert!(matches!(err, MemoryError::Transport(_)));
    }

    #[tokio::test]
    async fn search_parses_memories_and_query_plan() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/search/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ok",
                "result": {
                    "memories": [{"uri": "viking://session/1", "score": 0.9}],
                    "query_plan": {"queries": [{"context_type": "memory", "priority": 1}]}
                }
            })))
            .mount(&server)
            .await;

        let client = HttpStoreClient::new(&config_for(&server.uri()));
        let result = client
            .search("hello", "viking://", None, 10, None)
            .await
            .unwrap();
        assert_eq!(result.memories.len(), 1);
        assert_eq!(result.memories[0].uri, "viking://session/1");
        assert_eq!(result.query_plan.unwrap().queries.len(), 1);
    }

    #[tokio::test]
    async fn relations_parses_bare_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/relations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ok",
                "result": [{"uri": "viking://resource/a", "reason": "seed-link"}]
            })))
            .mount(&server)
            .await;

        let client = HttpStoreClient::new(&config_for(&server.uri()));
        let edges = client.relations("viking://resource/root").await.unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].uri, "viking://resource/a");
    }
}

//! # Portal Client
//!
//! reqwest implementation of [`PortalBackend`] for the patient portal backend.
//!
//! Requests carry `Accept: application/json` and, when configured, a bearer token. The
//! configured timeout applies to every request and nothing is retried: a failed fetch is
//! reported once and the caller decides whether to try again.

use async_trait::async_trait;
use portal_core::constants::{DIARY_BY_ID_PATH, DIARY_CREATE_PATH, INTEREST_CATALOG_PATH};
use portal_core::{BackendError, BackendResult, PortalBackend, PortalConfig};
use portal_types::DiaryId;
use portal_wire::DiaryCreateReq;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::instrument;

/// HTTP client for the three diary endpoints.
#[derive(Clone, Debug)]
pub struct HttpPortalBackend {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpPortalBackend {
    /// Build a client from resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Config`] if the token is not a valid header value or the
    /// TLS backend cannot be initialised.
    pub fn new(config: &PortalConfig) -> BackendResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = config.access_token() {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| BackendError::Config(format!("invalid access token: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| BackendError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.backend_url().to_string(),
            timeout: config.request_timeout(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `{base}/diaries/{id}/` with the id carried as exactly one encoded path segment.
    fn diary_url(&self, id: &DiaryId) -> BackendResult<Url> {
        let raw = id.as_str();
        if raw == "." || raw == ".." {
            return Err(BackendError::NotFound);
        }
        let mut url = Url::parse(&self.url(DIARY_BY_ID_PATH))
            .map_err(|e| BackendError::Config(format!("invalid backend url: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| BackendError::Config("backend url cannot be a base".to_string()))?
            .push(raw)
            .push("");
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> BackendResult<Response> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        tracing::debug!(%status, url = %response.url(), "received backend response");

        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::NOT_FOUND => Err(BackendError::NotFound),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(BackendError::Unauthorized(status.as_u16()))
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(BackendError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    async fn json_body(&self, response: Response) -> BackendResult<Option<Value>> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Null) => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(e) => Err(BackendError::Decode(e.to_string())),
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout(self.timeout)
        } else if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl PortalBackend for HttpPortalBackend {
    #[instrument(skip(self))]
    async fn interest_catalog(&self) -> BackendResult<Option<Value>> {
        let response = self
            .send(self.client.get(self.url(INTEREST_CATALOG_PATH)))
            .await?;
        self.json_body(response).await
    }

    #[instrument(skip(self, req), fields(areas = req.interest_areas.interest_area_dict.len()))]
    async fn create_diary(&self, req: &DiaryCreateReq) -> BackendResult<()> {
        self.send(self.client.post(self.url(DIARY_CREATE_PATH)).json(req))
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(diary_id = %id))]
    async fn diary_by_id(&self, id: &DiaryId) -> BackendResult<Option<Value>> {
        let url = self.diary_url(id)?;
        let response = self.send(self.client.get(url)).await?;
        self.json_body(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_core::{
        fold_submission, load_catalog, load_diary, CatalogFallback, DiaryFields, PlaybackError,
    };
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer, token: Option<&str>) -> HttpPortalBackend {
        let config = PortalConfig::new(
            server.uri(),
            token.map(str::to_string),
            Duration::from_secs(2),
            CatalogFallback::ErrorState,
        )
        .expect("config");
        HttpPortalBackend::new(&config).expect("client")
    }

    #[tokio::test]
    async fn catalog_request_carries_token_and_accept() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/person/interest-areas"))
            .and(header("Authorization", "Bearer secret"))
            .and(header("Accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "interest_area_dict": {"Sleep": ["How many hours?", "Quality?"]},
                "observation_id": 10
            })))
            .expect(1)
            .mount(&server)
            .await;

        let areas = load_catalog(&backend(&server, Some("secret")))
            .await
            .expect("catalog");
        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0].triggers.len(), 2);
    }

    #[tokio::test]
    async fn empty_and_null_bodies_are_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/person/interest-areas"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/diaries/3/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        let client = backend(&server, None);
        assert_eq!(client.interest_catalog().await.expect("ok"), None);
        let id = DiaryId::parse(Some("3")).expect("id");
        assert_eq!(client.diary_by_id(&id).await.expect("ok"), None);
    }

    #[tokio::test]
    async fn status_codes_map_to_backend_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/diaries/missing/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/diaries/locked/"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/diaries/broken/"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&server)
            .await;

        let client = backend(&server, None);
        let get = |raw: &str| DiaryId::parse(Some(raw)).expect("id");

        assert!(matches!(
            client.diary_by_id(&get("missing")).await,
            Err(BackendError::NotFound)
        ));
        assert!(matches!(
            client.diary_by_id(&get("locked")).await,
            Err(BackendError::Unauthorized(403))
        ));
        match client.diary_by_id(&get("broken")).await {
            Err(BackendError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_json_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/diaries/9/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let client = backend(&server, None);
        let err = load_diary(&client, Some("9")).await.expect_err("decode fails");
        assert!(matches!(err, PlaybackError::FetchFailed(_)));
    }

    #[tokio::test]
    async fn create_diary_posts_folded_body() {
        let server = MockServer::start().await;
        let payload = fold_submission(&[], &DiaryFields::default()).payload;
        Mock::given(method("POST"))
            .and(path("/diaries/"))
            .and(body_json(json!({
                "date_range_type": "since_last",
                "text": "",
                "text_shared": false,
                "diary_shared": false,
                "interest_areas": {"interest_area_dict": {}}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"diary_id": 1})))
            .expect(1)
            .mount(&server)
            .await;

        backend(&server, None)
            .create_diary(&payload.to_wire())
            .await
            .expect("created");
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/person/interest-areas"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let err = backend(&server, None)
            .interest_catalog()
            .await
            .expect_err("times out");
        assert!(matches!(err, BackendError::Timeout(_)));
    }

    #[tokio::test]
    async fn diary_id_stays_inside_its_path_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/diaries/[^/]+/$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"diary_id": 1})))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/person/interest-areas"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let client = backend(&server, None);
        for raw in ["../person/interest-areas", "5?owner=other"] {
            let id = DiaryId::parse(Some(raw)).expect("id");
            assert!(client.diary_by_id(&id).await.expect("ok").is_some());
        }

        let requests = server.received_requests().await.expect("recording on");
        assert_eq!(requests.len(), 2);
        for request in &requests {
            assert_eq!(request.url.query(), None);
            let segments: Vec<&str> = request.url.path().split('/').collect();
            assert_eq!(segments.len(), 4, "path was {}", request.url.path());
            assert_eq!(segments[1], "diaries");
            assert_eq!(segments[3], "");
        }
        assert_eq!(
            requests[0].url.path(),
            "/diaries/..%2Fperson%2Finterest-areas/"
        );
        assert_eq!(requests[1].url.path(), "/diaries/5%3Fowner=other/");
    }

    #[tokio::test]
    async fn dot_segment_ids_are_not_requested() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"diary_id": 1})))
            .expect(0)
            .mount(&server)
            .await;

        let client = backend(&server, None);
        for raw in [".", ".."] {
            let id = DiaryId::parse(Some(raw)).expect("id");
            assert!(matches!(
                client.diary_by_id(&id).await,
                Err(BackendError::NotFound)
            ));
        }
    }
}

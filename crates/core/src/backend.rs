//! The backend seam.
//!
//! The diary pipelines need exactly three backend calls. They are expressed as a trait so
//! that the pipelines can be driven by the reqwest client in production and by in-memory
//! doubles in tests.

use async_trait::async_trait;
use portal_types::DiaryId;
use portal_wire::DiaryCreateReq;
use serde_json::Value;
use std::time::Duration;

/// Errors a backend call can fail with.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("resource not found")]
    NotFound,
    #[error("not authorised (HTTP {0})")]
    Unauthorized(u16),
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("could not decode response body: {0}")]
    Decode(String),
    #[error("client configuration error: {0}")]
    Config(String),
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// The backend operations consumed by the diary pipelines.
///
/// Bodies are returned as raw JSON: classifying their shape is the pipelines' job.
#[async_trait]
pub trait PortalBackend: Send + Sync {
    /// `GET` the personalised interest catalog. `None` when the body is empty or `null`.
    async fn interest_catalog(&self) -> BackendResult<Option<Value>>;

    /// `POST` a new diary. The response body is opaque.
    async fn create_diary(&self, req: &DiaryCreateReq) -> BackendResult<()>;

    /// `GET` one stored diary. `None` when the body is empty or `null`.
    async fn diary_by_id(&self, id: &DiaryId) -> BackendResult<Option<Value>>;
}

#[async_trait]
impl<T> PortalBackend for std::sync::Arc<T>
where
    T: PortalBackend + ?Sized,
{
    async fn interest_catalog(&self) -> BackendResult<Option<Value>> {
        (**self).interest_catalog().await
    }

    async fn create_diary(&self, req: &DiaryCreateReq) -> BackendResult<()> {
        (**self).create_diary(req).await
    }

    async fn diary_by_id(&self, id: &DiaryId) -> BackendResult<Option<Value>> {
        (**self).diary_by_id(id).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory backend double shared by the pipeline tests.

    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct FakeBackend {
        pub catalog: Option<BackendResult<Option<Value>>>,
        pub diaries: HashMap<String, Value>,
        pub fail_diaries: bool,
        pub fail_create: bool,
        pub created: Mutex<Vec<DiaryCreateReq>>,
        pub diary_calls: AtomicUsize,
    }

    impl FakeBackend {
        pub fn with_catalog(body: Value) -> Self {
            Self {
                catalog: Some(Ok(Some(body))),
                ..Self::default()
            }
        }

        pub fn with_diary(id: &str, body: Value) -> Self {
            let mut backend = Self::default();
            backend.diaries.insert(id.to_string(), body);
            backend
        }
    }

    fn clone_result(result: &BackendResult<Option<Value>>) -> BackendResult<Option<Value>> {
        match result {
            Ok(v) => Ok(v.clone()),
            Err(e) => Err(BackendError::Network(e.to_string())),
        }
    }

    #[async_trait]
    impl PortalBackend for FakeBackend {
        async fn interest_catalog(&self) -> BackendResult<Option<Value>> {
            match &self.catalog {
                Some(result) => clone_result(result),
                None => Err(BackendError::Network("connection refused".into())),
            }
        }

        async fn create_diary(&self, req: &DiaryCreateReq) -> BackendResult<()> {
            if self.fail_create {
                return Err(BackendError::Status {
                    status: 500,
                    body: "boom".into(),
                });
            }
            self.created
                .lock()
                .expect("created lock")
                .push(req.clone());
            Ok(())
        }

        async fn diary_by_id(&self, id: &DiaryId) -> BackendResult<Option<Value>> {
            self.diary_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_diaries {
                return Err(BackendError::Network("connection reset".into()));
            }
            match self.diaries.get(id.as_str()) {
                Some(Value::Null) => Ok(None),
                Some(body) => Ok(Some(body.clone())),
                None => Err(BackendError::NotFound),
            }
        }
    }
}

//! Constants used throughout the portal core crate.
//!
//! Endpoint paths, wire keys and defaults live here so that the client, the REST
//! layer and the CLI agree on them.

/// Backend path of the personalised interest catalog.
pub const INTEREST_CATALOG_PATH: &str = "/person/interest-areas";

/// Backend path for creating a diary.
pub const DIARY_CREATE_PATH: &str = "/diaries/";

/// Backend path prefix for reading one diary; the id and a trailing slash follow.
pub const DIARY_BY_ID_PATH: &str = "/diaries";

/// Key in `trigger_dict` carrying the area-level free response.
pub const GENERAL_RESPONSE_KEY: &str = "general_response";

/// Prefix of the submission key used for interest areas without a catalog name.
pub const UNNAMED_INTEREST_PREFIX: &str = "interest_";

/// Multiplier separating trigger ids of consecutive interest areas.
///
/// Trigger ids stay unique within a capture session while no area has this many triggers.
pub const TRIGGER_ID_STRIDE: i64 = 1000;

/// Default backend base URL when none is configured.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Default timeout applied to each backend request, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Section label used when a stored trigger has no question text.
pub const UNTITLED_TRIGGER_LABEL: &str = "Question";

/// Display label used when an interest area has neither a name nor a custom label.
pub const UNTITLED_INTEREST_LABEL: &str = "Interest";

/// Custom label of the development placeholder interest area.
pub const PLACEHOLDER_INTEREST_LABEL: &str = "Sample interest 1";

/// Question of the development placeholder trigger.
pub const PLACEHOLDER_TRIGGER_NAME: &str = "How did you feel today?";

/// Concept id of the development placeholder trigger.
pub const PLACEHOLDER_TRIGGER_CONCEPT_ID: i64 = 1001;

//! Catalog normalisation (capture pipeline ingress).
//!
//! Turns the server's loosely typed `interest name -> triggers` dictionary into the
//! editable form model. Dictionary order is significant: it numbers the areas and fixes
//! display order, so the dictionary is treated as an ordered sequence throughout.
//!
//! Numbering is positional and therefore not stable across re-fetches if the server
//! reorders its dictionary.

use crate::backend::{BackendError, PortalBackend};
use crate::config::CatalogFallback;
use crate::constants::{
    PLACEHOLDER_INTEREST_LABEL, PLACEHOLDER_TRIGGER_CONCEPT_ID, PLACEHOLDER_TRIGGER_NAME,
    TRIGGER_ID_STRIDE,
};
use crate::diary::model::{InterestArea, InterestAreaId, InterestAreas, Trigger, TriggerId};
use portal_wire::{CatalogBody, CatalogRes};
use serde_json::Value;
use std::sync::Arc;

/// Failure to obtain the interest catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("interest catalog unavailable: {0}")]
    Unavailable(#[from] BackendError),
}

impl CatalogError {
    /// Message suitable for the person filling in the diary.
    pub fn user_message(&self) -> &'static str {
        "Your interests could not be loaded right now. Please try again later."
    }
}

/// Normalise a classified catalog body into interest areas.
///
/// An absent body yields an empty list, so the form can show its empty state.
pub fn normalize_catalog(body: CatalogBody) -> InterestAreas {
    match body {
        CatalogBody::Absent => {
            tracing::warn!("interest catalog is empty");
            Vec::new()
        }
        CatalogBody::Unrecognised(kind) => {
            tracing::warn!("interest catalog body is a JSON {kind}; treating it as empty");
            Vec::new()
        }
        CatalogBody::Catalog(catalog) => normalize_dictionary(catalog),
    }
}

fn normalize_dictionary(catalog: CatalogRes) -> InterestAreas {
    let base = catalog.observation_id;

    catalog
        .interest_area_dict
        .into_iter()
        .enumerate()
        .map(|(index, (name, raw_triggers))| {
            let index = index as i64;
            let names = trigger_names(raw_triggers);
            if names.len() as i64 >= TRIGGER_ID_STRIDE {
                tracing::warn!(
                    "interest area '{}' has {} triggers; trigger ids will overlap the next area",
                    name,
                    names.len()
                );
            }

            let triggers = names
                .into_iter()
                .enumerate()
                .map(|(position, trigger_name)| {
                    Trigger::new(
                        TriggerId(index * TRIGGER_ID_STRIDE + position as i64),
                        trigger_name,
                    )
                })
                .collect();

            let name = (!name.is_empty()).then_some(name);
            Arc::new(InterestArea::new(
                InterestAreaId(base.saturating_add(index)),
                name,
                triggers,
            ))
        })
        .collect()
}

/// Coerce one dictionary value into trigger names.
///
/// - array: its elements
/// - object: its values, in order
/// - scalar: a single name holding its text form
/// - `null`: no triggers
///
/// Within arrays and objects, strings are taken verbatim, `null` elements are skipped and
/// any other element contributes its JSON text.
pub fn trigger_names(value: Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.into_iter().filter_map(element_text).collect(),
        Value::Object(map) => map.into_iter().filter_map(|(_, v)| element_text(v)).collect(),
        Value::String(s) => vec![s],
        scalar => vec![scalar.to_string()],
    }
}

fn element_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Fetch and normalise the catalog.
///
/// # Errors
///
/// Returns [`CatalogError::Unavailable`] when the backend call fails. No fallback is
/// applied here; see [`resolve_catalog`].
pub async fn load_catalog<B>(backend: &B) -> Result<InterestAreas, CatalogError>
where
    B: PortalBackend + ?Sized,
{
    let body = backend.interest_catalog().await?;
    let areas = normalize_catalog(CatalogBody::from_value(body));
    tracing::info!("loaded {} interest areas", areas.len());
    Ok(areas)
}

/// Apply the configured fallback policy to a catalog load.
///
/// Returns the areas to show and whether they are the placeholder.
///
/// # Errors
///
/// Returns the original error under [`CatalogFallback::ErrorState`].
pub fn resolve_catalog(
    loaded: Result<InterestAreas, CatalogError>,
    policy: CatalogFallback,
) -> Result<(InterestAreas, bool), CatalogError> {
    match (loaded, policy) {
        (Ok(areas), _) => Ok((areas, false)),
        (Err(e), CatalogFallback::Placeholder) => {
            tracing::warn!("{e}; showing placeholder interest area");
            Ok((placeholder_catalog(), true))
        }
        (Err(e), CatalogFallback::ErrorState) => {
            tracing::error!("{e}");
            Err(e)
        }
    }
}

/// The single sample interest area shown when the catalog is unavailable in development.
pub fn placeholder_catalog() -> InterestAreas {
    let mut trigger = Trigger::new(TriggerId(1), PLACEHOLDER_TRIGGER_NAME);
    trigger.concept_id = PLACEHOLDER_TRIGGER_CONCEPT_ID;

    let mut area = InterestArea::new(InterestAreaId(1), None, vec![trigger]);
    area.custom_name = Some(PLACEHOLDER_INTEREST_LABEL.to_string());
    vec![Arc::new(area)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::FakeBackend;
    use serde_json::json;

    fn normalize(body: Value) -> InterestAreas {
        normalize_catalog(CatalogBody::from_value(Some(body)))
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Run `f` under a subscriber that writes into a buffer; return its result and the log.
    fn with_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let out = tracing::subscriber::with_default(subscriber, f);
        let logs = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        (out, logs)
    }

    fn catalog_with_big_area(count: usize) -> Value {
        let names: Vec<String> = (0..count).map(|i| format!("Question {i}")).collect();
        json!({
            "interest_area_dict": {"Big": names, "Next": ["First"]},
            "observation_id": 1
        })
    }

    #[test]
    fn oversized_area_warns_about_overlapping_ids() {
        let (areas, logs) = with_logs(|| normalize(catalog_with_big_area(1001)));

        assert_eq!(areas[0].triggers.len(), 1001);
        assert_eq!(areas[0].triggers[1000].id, TriggerId(1000));
        assert_eq!(areas[1].triggers[0].id, TriggerId(1000));
        assert!(logs.contains("WARN"), "logs were: {logs}");
        assert!(logs.contains("interest area 'Big' has 1001 triggers"));
    }

    #[test]
    fn area_below_the_stride_does_not_warn() {
        let (areas, logs) = with_logs(|| normalize(catalog_with_big_area(999)));

        assert_eq!(areas[0].triggers[998].id, TriggerId(998));
        assert_eq!(areas[1].triggers[0].id, TriggerId(1000));
        assert!(!logs.contains("overlap"), "logs were: {logs}");
    }

    #[test]
    fn sleep_catalog_normalises_with_positional_ids() {
        let areas = normalize(json!({
            "interest_area_dict": {"Sleep": ["How many hours?", "Quality?"]},
            "observation_id": 10
        }));

        assert_eq!(areas.len(), 1);
        let sleep = &areas[0];
        assert_eq!(sleep.id, InterestAreaId(10));
        assert_eq!(sleep.name.as_deref(), Some("Sleep"));
        let triggers: Vec<(i64, &str)> = sleep
            .triggers
            .iter()
            .map(|t| (t.id.0, t.name.as_str()))
            .collect();
        assert_eq!(triggers, vec![(0, "How many hours?"), (1, "Quality?")]);
        assert!(sleep.triggers.iter().all(|t| !t.shared && t.response.is_none()));
    }

    #[test]
    fn area_ids_increase_by_one_from_the_base() {
        let areas = normalize(json!({
            "interest_area_dict": {"A": [], "B": [], "C": [], "D": []},
            "observation_id": 40
        }));

        assert_eq!(areas.len(), 4);
        let ids: Vec<i64> = areas.iter().map(|a| a.id.0).collect();
        assert_eq!(ids, vec![40, 41, 42, 43]);
    }

    #[test]
    fn trigger_ids_are_strided_by_area_position() {
        let areas = normalize(json!({
            "interest_area_dict": {"A": ["x"], "B": ["y", "z"]}
        }));

        assert_eq!(areas[0].id, InterestAreaId(0));
        assert_eq!(areas[1].triggers[0].id, TriggerId(1000));
        assert_eq!(areas[1].triggers[1].id, TriggerId(1001));
    }

    #[test]
    fn duplicate_trigger_names_still_get_distinct_ids() {
        let areas = normalize(json!({"interest_area_dict": {"A": ["same", "same"]}}));
        assert_eq!(areas[0].triggers[0].id, TriggerId(0));
        assert_eq!(areas[0].triggers[1].id, TriggerId(1));
    }

    #[test]
    fn trigger_values_accept_array_map_and_scalar() {
        assert_eq!(trigger_names(json!(["a", "b"])), vec!["a", "b"]);
        assert_eq!(
            trigger_names(json!({"first": "a", "second": "b"})),
            vec!["a", "b"]
        );
        assert_eq!(trigger_names(json!("single")), vec!["single"]);
        assert_eq!(trigger_names(json!(42)), vec!["42"]);
        assert_eq!(trigger_names(json!(true)), vec!["true"]);
        assert!(trigger_names(json!(null)).is_empty());
        assert_eq!(trigger_names(json!(["a", null, 3])), vec!["a", "3"]);
    }

    #[test]
    fn empty_key_produces_unnamed_area() {
        let areas = normalize(json!({"interest_area_dict": {"": ["q"]}, "observation_id": 3}));
        assert_eq!(areas[0].name, None);
        assert_eq!(areas[0].submission_key(), "interest_3");
    }

    #[test]
    fn absent_and_unrecognised_bodies_are_empty() {
        assert!(normalize_catalog(CatalogBody::Absent).is_empty());
        assert!(normalize(json!([1, 2, 3])).is_empty());
        assert!(normalize(json!({})).is_empty());
    }

    #[tokio::test]
    async fn load_catalog_reports_backend_failure() {
        let backend = FakeBackend::default();
        let err = load_catalog(&backend).await.expect_err("no catalog configured");
        assert!(matches!(err, CatalogError::Unavailable(_)));
    }

    #[tokio::test]
    async fn load_catalog_normalises_backend_body() {
        let backend = FakeBackend::with_catalog(json!({
            "interest_area_dict": {"Sleep": ["Quality?"]},
            "observation_id": 2
        }));
        let areas = load_catalog(&backend).await.expect("catalog");
        assert_eq!(areas[0].id, InterestAreaId(2));
    }

    #[test]
    fn resolve_catalog_applies_policy() {
        let failed = || Err(CatalogError::Unavailable(BackendError::Timeout(
            std::time::Duration::from_secs(1),
        )));

        let (areas, degraded) =
            resolve_catalog(failed(), CatalogFallback::Placeholder).expect("placeholder");
        assert!(degraded);
        assert_eq!(areas, placeholder_catalog());

        assert!(resolve_catalog(failed(), CatalogFallback::ErrorState).is_err());

        let (areas, degraded) =
            resolve_catalog(Ok(Vec::new()), CatalogFallback::ErrorState).expect("loaded");
        assert!(!degraded);
        assert!(areas.is_empty());
    }

    #[test]
    fn placeholder_has_one_area_and_trigger() {
        let areas = placeholder_catalog();
        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0].id, InterestAreaId(1));
        assert_eq!(areas[0].label(), PLACEHOLDER_INTEREST_LABEL);
        assert_eq!(areas[0].submission_key(), "interest_1");
        assert_eq!(areas[0].triggers[0].id, TriggerId(1));
        assert_eq!(areas[0].triggers[0].concept_id, PLACEHOLDER_TRIGGER_CONCEPT_ID);
    }
}

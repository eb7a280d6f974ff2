//! Interest catalog wire model (`GET /person/interest-areas`).
//!
//! The catalog arrives as `{interest_area_dict, observation_id}` where each dictionary
//! value is a trigger list, a trigger map, or a bare scalar. The dictionary keeps the
//! server's insertion order (`serde_json` is built with `preserve_order`), because that
//! order numbers the interest areas downstream.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Wire representation of the interest catalog.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct CatalogRes {
    /// Interest area name -> triggers, in server order.
    #[serde(default, deserialize_with = "dictionary")]
    pub interest_area_dict: Map<String, Value>,

    /// Base used to number interest areas. Whole floats such as `10.0` count; missing or
    /// non-integer reads as 0.
    #[serde(default, deserialize_with = "observation_id")]
    pub observation_id: i64,
}

/// What the catalog endpoint actually returned.
#[derive(Clone, Debug, PartialEq)]
pub enum CatalogBody {
    /// No body, or JSON `null`.
    Absent,
    /// An object body, read leniently.
    Catalog(CatalogRes),
    /// A body of some other JSON kind (e.g. an array), named for logging.
    Unrecognised(&'static str),
}

impl CatalogBody {
    /// Classify a raw catalog body.
    pub fn from_value(value: Option<Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Absent,
            Some(Value::Object(map)) => {
                // Every field is lenient, so an object body cannot fail to parse.
                match serde_json::from_value::<CatalogRes>(Value::Object(map)) {
                    Ok(catalog) => Self::Catalog(catalog),
                    Err(_) => Self::Unrecognised("object"),
                }
            }
            Some(Value::Array(_)) => Self::Unrecognised("array"),
            Some(Value::String(_)) => Self::Unrecognised("string"),
            Some(Value::Number(_)) => Self::Unrecognised("number"),
            Some(Value::Bool(_)) => Self::Unrecognised("boolean"),
        }
    }
}

fn dictionary<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    })
}

fn observation_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(crate::lenient::integer(deserializer)?.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_and_missing_bodies_are_absent() {
        assert_eq!(CatalogBody::from_value(None), CatalogBody::Absent);
        assert_eq!(CatalogBody::from_value(Some(json!(null))), CatalogBody::Absent);
    }

    #[test]
    fn dictionary_order_is_preserved() {
        let body = json!({
            "interest_area_dict": {"Sleep": [], "Appetite": [], "Mood": []},
            "observation_id": 10
        });
        let CatalogBody::Catalog(catalog) = CatalogBody::from_value(Some(body)) else {
            panic!("expected a catalog");
        };
        let keys: Vec<&str> = catalog.interest_area_dict.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Sleep", "Appetite", "Mood"]);
        assert_eq!(catalog.observation_id, 10);
    }

    #[test]
    fn odd_fields_degrade_to_defaults() {
        let body = json!({"interest_area_dict": null, "observation_id": "ten"});
        assert_eq!(
            CatalogBody::from_value(Some(body)),
            CatalogBody::Catalog(CatalogRes::default())
        );
    }

    #[test]
    fn whole_float_observation_id_is_kept() {
        let read = |raw: Value| match CatalogBody::from_value(Some(
            json!({"interest_area_dict": {}, "observation_id": raw}),
        )) {
            CatalogBody::Catalog(catalog) => catalog.observation_id,
            other => panic!("expected catalog, got {other:?}"),
        };

        assert_eq!(read(json!(10.0)), 10);
        assert_eq!(read(json!(-3.0)), -3);
        assert_eq!(read(json!(10.5)), 0);
        assert_eq!(read(json!(1e300)), 0);
    }

    #[test]
    fn array_body_is_unrecognised() {
        assert_eq!(
            CatalogBody::from_value(Some(json!([{"interest_name": "Sleep"}]))),
            CatalogBody::Unrecognised("array")
        );
    }
}

//! Pure state transitions over the capture form model.
//!
//! Each function returns a new list in which exactly the targeted leaf is replaced.
//! Entries that do not match keep their identity (the same `Arc`), and an id that
//! matches nothing leaves the list unchanged.

use crate::diary::model::{InterestArea, InterestAreaId, Trigger, TriggerId};
use std::sync::Arc;

fn update_area<F>(areas: &[Arc<InterestArea>], area_id: InterestAreaId, f: F) -> Vec<Arc<InterestArea>>
where
    F: Fn(&InterestArea) -> InterestArea,
{
    areas
        .iter()
        .map(|area| {
            if area.id == area_id {
                Arc::new(f(area))
            } else {
                Arc::clone(area)
            }
        })
        .collect()
}

fn update_trigger<F>(
    areas: &[Arc<InterestArea>],
    area_id: InterestAreaId,
    trigger_id: TriggerId,
    f: F,
) -> Vec<Arc<InterestArea>>
where
    F: Fn(&Trigger) -> Trigger,
{
    update_area(areas, area_id, |area| InterestArea {
        triggers: area
            .triggers
            .iter()
            .map(|trigger| {
                if trigger.id == trigger_id {
                    Arc::new(f(trigger))
                } else {
                    Arc::clone(trigger)
                }
            })
            .collect(),
        ..area.clone()
    })
}

/// Replace the area-level free response.
pub fn set_area_response(
    areas: &[Arc<InterestArea>],
    area_id: InterestAreaId,
    text: &str,
) -> Vec<Arc<InterestArea>> {
    update_area(areas, area_id, |area| InterestArea {
        response: Some(text.to_string()),
        ..area.clone()
    })
}

/// Replace the area-level sharing flag.
pub fn set_area_shared(
    areas: &[Arc<InterestArea>],
    area_id: InterestAreaId,
    shared: bool,
) -> Vec<Arc<InterestArea>> {
    update_area(areas, area_id, |area| InterestArea {
        shared,
        ..area.clone()
    })
}

/// Replace one trigger's response.
pub fn set_trigger_response(
    areas: &[Arc<InterestArea>],
    area_id: InterestAreaId,
    trigger_id: TriggerId,
    text: &str,
) -> Vec<Arc<InterestArea>> {
    update_trigger(areas, area_id, trigger_id, |trigger| Trigger {
        response: Some(text.to_string()),
        ..trigger.clone()
    })
}

/// Replace one trigger's sharing flag.
pub fn set_trigger_shared(
    areas: &[Arc<InterestArea>],
    area_id: InterestAreaId,
    trigger_id: TriggerId,
    shared: bool,
) -> Vec<Arc<InterestArea>> {
    update_trigger(areas, area_id, trigger_id, |trigger| Trigger {
        shared,
        ..trigger.clone()
    })
}

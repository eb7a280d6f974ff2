//! Parsing `--answer`, `--trigger`, `--share` and `--share-trigger` arguments and applying
//! them to a capture session.
//!
//! Areas are matched by label, catalog name or submission key; triggers by label or name.
//! Matching ignores case and surrounding whitespace.

use anyhow::{anyhow, bail, Context};
use portal_core::{CaptureSession, InterestArea, InterestAreaId, TriggerId};
use std::sync::Arc;

/// `Area=Text`
#[derive(Debug, PartialEq, Eq)]
pub struct AreaAnswer {
    pub area: String,
    pub text: String,
}

/// `Area::Trigger=Text`, or `Area::Trigger` when no text is needed.
#[derive(Debug, PartialEq, Eq)]
pub struct TriggerRef {
    pub area: String,
    pub trigger: String,
    pub text: Option<String>,
}

pub fn parse_area_answer(raw: &str) -> anyhow::Result<AreaAnswer> {
    let (area, text) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected AREA=TEXT, got '{raw}'"))?;
    if area.trim().is_empty() {
        bail!("missing interest area in '{raw}'");
    }
    Ok(AreaAnswer {
        area: area.trim().to_string(),
        text: text.to_string(),
    })
}

pub fn parse_trigger_ref(raw: &str, with_text: bool) -> anyhow::Result<TriggerRef> {
    let (area, rest) = raw
        .split_once("::")
        .ok_or_else(|| anyhow!("expected AREA::TRIGGER in '{raw}'"))?;

    let (trigger, text) = if with_text {
        let (trigger, text) = rest
            .split_once('=')
            .ok_or_else(|| anyhow!("expected AREA::TRIGGER=TEXT, got '{raw}'"))?;
        (trigger, Some(text.to_string()))
    } else {
        (rest, None)
    };

    if area.trim().is_empty() || trigger.trim().is_empty() {
        bail!("missing interest area or trigger in '{raw}'");
    }
    Ok(TriggerRef {
        area: area.trim().to_string(),
        trigger: trigger.trim().to_string(),
        text,
    })
}

fn matches(candidate: &str, wanted: &str) -> bool {
    candidate.trim().eq_ignore_ascii_case(wanted.trim())
}

pub fn find_area<'a>(session: &'a CaptureSession, wanted: &str) -> anyhow::Result<&'a InterestArea> {
    session
        .areas()
        .iter()
        .map(Arc::as_ref)
        .find(|area| {
            matches(area.label(), wanted)
                || area.name.as_deref().is_some_and(|n| matches(n, wanted))
                || matches(&area.submission_key(), wanted)
        })
        .ok_or_else(|| anyhow!("no interest area called '{wanted}'"))
}

pub fn find_trigger(
    session: &CaptureSession,
    area: &str,
    trigger: &str,
) -> anyhow::Result<(InterestAreaId, TriggerId)> {
    let found = find_area(session, area)?;
    let t = found
        .triggers
        .iter()
        .find(|t| matches(t.label(), trigger) || matches(&t.name, trigger))
        .ok_or_else(|| anyhow!("no trigger '{trigger}' in interest area '{area}'"))?;
    Ok((found.id, t.id))
}

/// Apply every edit given on the command line, in argument order per flag.
pub fn apply(
    session: &mut CaptureSession,
    answers: &[String],
    triggers: &[String],
    shares: &[String],
    share_triggers: &[String],
) -> anyhow::Result<()> {
    for raw in answers {
        let answer = parse_area_answer(raw)?;
        let id = find_area(session, &answer.area)?.id;
        session
            .set_area_response(id, &answer.text)
            .with_context(|| format!("applying --answer '{raw}'"))?;
    }
    for raw in triggers {
        let r = parse_trigger_ref(raw, true)?;
        let (area_id, trigger_id) = find_trigger(session, &r.area, &r.trigger)?;
        session
            .set_trigger_response(area_id, trigger_id, r.text.as_deref().unwrap_or_default())
            .with_context(|| format!("applying --trigger '{raw}'"))?;
    }
    for raw in shares {
        let id = find_area(session, raw)?.id;
        session.set_area_shared(id, true)?;
    }
    for raw in share_triggers {
        let r = parse_trigger_ref(raw, false)?;
        let (area_id, trigger_id) = find_trigger(session, &r.area, &r.trigger)?;
        session.set_trigger_shared(area_id, trigger_id, true)?;
    }
    Ok(())
}

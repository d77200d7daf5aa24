use crate::checkin::{render, CheckInOutcome};
use crate::ipc::error::{err, get_required_str, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_scan_check_in(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(service) = state.service.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let raw = match get_required_str(&req.params, "name") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let claimed = req
        .params
        .get("classCode")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let result = service.check_in(&raw, claimed);
    let outcome = match &result {
        Ok(CheckInOutcome::Recorded { .. }) => "success",
        Ok(CheckInOutcome::Skipped { .. }) => "skipped",
        Err(_) => "error",
    };
    let message = render(&result);
    if let Err(e) = &result {
        tracing::warn!(code = e.code(), "check-in failed: {e}");
    }

    // Check-in failures are answers, not transport errors.
    ok(&req.id, json!({ "message": message, "outcome": outcome }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "scan.checkIn" => Some(handle_scan_check_in(state, req)),
        _ => None,
    }
}

use crate::ipc::error::{err, get_required_str, ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_roster_scan_codes(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(service) = state.service.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let class_code = match get_required_str(&req.params, "classCode") {
        Ok(v) => v.trim().to_string(),
        Err(e) => return e.response(&req.id),
    };
    match service.scan_codes(&class_code) {
        Ok(codes) => ok(
            &req.id,
            json!({ "classCode": class_code, "students": codes }),
        ),
        Err(e) => HandlerErr {
            code: e.code(),
            message: e.to_string(),
            details: Some(json!({ "classCode": class_code })),
        }
        .response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "roster.scanCodes" => Some(handle_roster_scan_codes(state, req)),
        _ => None,
    }
}

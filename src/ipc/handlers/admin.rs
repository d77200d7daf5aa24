use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_index_rebuild(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(service) = state.service.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match service.rebuild_index() {
        Ok(summary) => ok(
            &req.id,
            json!({
                "buildId": summary.index.build_id.to_string(),
                "builtAt": summary.index.built_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
                "entryCount": summary.index.len(),
                "recordCount": summary.index.record_count,
                "collisions": summary.collisions,
                "skippedPartitions": summary.skipped,
            }),
        ),
        Err(e) => HandlerErr {
            code: e.code(),
            message: e.to_string(),
            details: None,
        }
        .response(&req.id),
    }
}

fn handle_cache_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(service) = state.service.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    service.clear_cache();
    ok(&req.id, json!({ "cleared": true }))
}

fn handle_classes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(service) = state.service.as_ref() else {
        return ok(&req.id, json!({ "classes": [] }));
    };
    ok(&req.id, json!({ "classes": service.classes() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "index.rebuild" => Some(handle_index_rebuild(state, req)),
        "cache.clear" => Some(handle_cache_clear(state, req)),
        "classes.list" => Some(handle_classes_list(state, req)),
        _ => None,
    }
}

use crate::checkin::CheckInService;
use crate::clock::SystemClock;
use crate::config::{AppConfig, CONFIG_FILE};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "indexWarm": state.service.as_ref().map(|s| s.cache().is_warm()).unwrap_or(false)
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };
    let config_path = req
        .params
        .get("configPath")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
        .unwrap_or_else(|| path.join(CONFIG_FILE));

    let config = match AppConfig::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            warn!("config load failed: {e:#}");
            return err(
                &req.id,
                "config_invalid",
                format!("{e:#}"),
                Some(json!({ "configPath": config_path.to_string_lossy() })),
            );
        }
    };
    let class_count = config.registry.list_classes().len();

    match CheckInService::open(&path, config, Arc::new(SystemClock)) {
        Ok(service) => {
            info!("workspace selected: {}", path.to_string_lossy());
            state.workspace = Some(path.clone());
            state.service = Some(service);
            ok(
                &req.id,
                json!({
                    "workspacePath": path.to_string_lossy(),
                    "classCount": class_count
                }),
            )
        }
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}

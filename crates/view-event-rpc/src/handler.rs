//! JSON-RPC request handlers.

use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error};
use view_event::{
    EventBus, EventData, ObserverMode, RouteTable, ViewDefinition, ViewEventError,
};

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 error structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
            id,
        }
    }
}

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Main JSON-RPC handler.
pub async fn handle_rpc(
    State(state): State<Arc<AppState>>,
    Json(request): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    let method = &request.method;
    let params = request.params.unwrap_or(Value::Object(Default::default()));
    let id = request.id.clone();

    debug!("RPC call: {}({:?})", method, params);

    if method == "health_check" {
        return (
            StatusCode::OK,
            Json(JsonRpcResponse::success(id, json!({"status": "ok"}))),
        );
    }

    match dispatch_method(&state, method, params) {
        Ok(value) => (StatusCode::OK, Json(JsonRpcResponse::success(id, value))),
        Err(e) => {
            error!("RPC error for {}: {}", method, e);
            let code = e.to_rpc_error_code();
            (
                StatusCode::OK,
                Json(JsonRpcResponse::error(id, code, e.to_string())),
            )
        }
    }
}

/// Extract a required string parameter, supporting both snake_case and camelCase.
macro_rules! require_str_param {
    ($params:expr, $snake:literal, $camel:literal) => {
        match $params
            .get($snake)
            .or_else(|| $params.get($camel))
            .and_then(|v| v.as_str())
        {
            Some(s) => s.to_string(),
            None => {
                return Err(ViewEventError::Validation {
                    field: $snake.to_string(),
                    message: format!("Missing required parameter: {}", $snake),
                });
            }
        }
    };
}

/// Dispatch a method call to the host or the observer.
fn dispatch_method(state: &AppState, method: &str, params: Value) -> view_event::Result<Value> {
    match method {
        "register_view" => {
            let view: ViewDefinition = serde_json::from_value(params)?;
            view.validate()?;
            let installed = state.host.register_view(&view);
            Ok(json!({ "installed": installed }))
        }

        "fire_event" => {
            let event_type = require_str_param!(params, "event_type", "eventType");
            let data = match params.get("data") {
                Some(Value::Object(map)) => map.clone(),
                Some(Value::Null) | None => EventData::new(),
                Some(_) => {
                    return Err(ViewEventError::Validation {
                        field: "data".to_string(),
                        message: "Event data must be an object".to_string(),
                    })
                }
            };
            state.host.fire(&event_type, data);
            Ok(json!({ "fired": event_type }))
        }

        "list_routes" => Ok(serde_json::to_value(state.host.installed_routes())?),

        "request_routes" => {
            let replayed = state.observer.request_routes();
            Ok(json!({ "replayed": replayed }))
        }

        "observer_status" => {
            let keys = state.observer.payload_keys();
            let buffered: Vec<Value> = state
                .observer
                .buffered_routes()
                .iter()
                .map(|r| Value::Object(r.to_event_data(keys)))
                .collect();
            let mode = match state.observer.mode() {
                ObserverMode::Buffering => "buffering",
                ObserverMode::Broadcasting => "broadcasting",
            };
            Ok(json!({ "mode": mode, "buffered": buffered }))
        }

        _ => Err(ViewEventError::UnknownCommand {
            command_type: method.to_string(),
        }),
    }
}

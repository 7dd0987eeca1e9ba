//! Integration tests for the route observer against the in-process host.
//!
//! These exercise the public API only: views registered through
//! `LocalHost`, route requests arriving as bus events and as websocket
//! commands, and the events that come out the other side.

use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use view_event::{
    Event, EventBus, EventData, HttpMethod, InclusionPolicy, LocalHost, ObserverConfig,
    RouteDescriptor, RouteObserver, ViewDefinition,
};

/// Collect the payloads of every `route_registered` event.
fn record_routes(host: &LocalHost) -> Arc<Mutex<Vec<Value>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    host.listen(
        "route_registered",
        Arc::new(move |e: &Event| s.lock().unwrap().push(Value::Object(e.data.clone()))),
    );
    seen
}

fn lights_view() -> ViewDefinition {
    ViewDefinition::new("/api/lights")
        .with_methods([HttpMethod::Get, HttpMethod::Post])
        .requires_auth(true)
        .cors_allowed(true)
}

#[test]
fn test_lights_scenario_end_to_end() {
    let host = Arc::new(LocalHost::new());
    let seen = record_routes(&host);
    let observer = RouteObserver::install(&host, ObserverConfig::for_components(["lights"])).unwrap();

    host.register_view(&lights_view());

    assert_eq!(
        observer.buffered_routes(),
        vec![
            RouteDescriptor::new("/api/lights", HttpMethod::Get, true),
            RouteDescriptor::new("/api/lights", HttpMethod::Post, true),
        ]
    );
    assert!(seen.lock().unwrap().is_empty());

    host.fire("request_routes", EventData::new());

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            json!({"route": "/api/lights", "method": "get", "auth_required": true}),
            json!({"route": "/api/lights", "method": "post", "auth_required": true}),
        ]
    );
}

#[test]
fn test_request_via_websocket_command() {
    let host = Arc::new(LocalHost::new());
    let seen = record_routes(&host);
    let observer = RouteObserver::install(&host, ObserverConfig::default()).unwrap();

    host.register_view(&lights_view());

    let result = host
        .dispatch_command(&json!({"id": 5, "type": "view_event/request_routes"}))
        .unwrap();

    assert_eq!(result, json!({"replayed": 2}));
    assert!(observer.is_broadcasting());
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[test]
fn test_routes_after_request_are_broadcast_immediately() {
    let host = Arc::new(LocalHost::new());
    let seen = record_routes(&host);
    let observer = RouteObserver::install(&host, ObserverConfig::default()).unwrap();

    host.fire("request_routes", EventData::new());
    assert!(seen.lock().unwrap().is_empty());

    host.register_view(&lights_view());

    assert_eq!(seen.lock().unwrap().len(), 2);
    assert!(observer.buffered_routes().is_empty());
}

#[test]
fn test_fifo_replay_across_views() {
    let host = Arc::new(LocalHost::new());
    let seen = record_routes(&host);
    RouteObserver::install(&host, ObserverConfig::default()).unwrap();

    for url in ["/api/first", "/api/second", "/api/third"] {
        host.register_view(
            &ViewDefinition::new(url)
                .with_methods([HttpMethod::Get])
                .cors_allowed(true),
        );
    }
    host.fire("request_routes", EventData::new());

    let routes: Vec<Value> = seen
        .lock()
        .unwrap()
        .iter()
        .map(|p| p["route"].clone())
        .collect();
    assert_eq!(
        routes,
        vec![json!("/api/first"), json!("/api/second"), json!("/api/third")]
    );
}

#[test]
fn test_n_methods_by_m_urls() {
    let host = Arc::new(LocalHost::new());
    let observer = RouteObserver::install(
        &host,
        ObserverConfig {
            rules: Vec::new(),
            ..ObserverConfig::default()
        },
    )
    .unwrap();

    let view = ViewDefinition::new("/api/a")
        .with_extra_url("/api/b")
        .with_methods([HttpMethod::Get, HttpMethod::Put, HttpMethod::Options]);
    host.register_view(&view);

    assert_eq!(observer.buffered_routes().len(), 6);
}

#[test]
fn test_component_allow_list_policy() {
    let host = Arc::new(LocalHost::new());
    let observer = RouteObserver::install(
        &host,
        ObserverConfig {
            rules: vec![InclusionPolicy::allow_components(["lights", "climate"])],
            ..ObserverConfig::default()
        },
    )
    .unwrap();

    host.register_view(
        &ViewDefinition::new("/api/lights")
            .with_extra_url("/api/services/switch/toggle")
            .with_extra_url("/api/camera_proxy")
            .with_methods([HttpMethod::Post]),
    );

    let paths: Vec<String> = observer
        .buffered_routes()
        .iter()
        .map(|r| r.path().to_string())
        .collect();
    assert_eq!(paths, vec!["/api/lights", "/api/services/switch/toggle"]);
}

#[test]
fn test_custom_event_types_and_route_key() {
    let host = Arc::new(LocalHost::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    host.listen(
        "remote_route",
        Arc::new(move |e: &Event| s.lock().unwrap().push(e.data.clone())),
    );

    let config = ObserverConfig {
        event_type: "remote_route".to_string(),
        request_event_type: "remote_request".to_string(),
        route_key: "url".to_string(),
        ..ObserverConfig::default()
    };
    RouteObserver::install(&host, config).unwrap();
    host.register_view(&lights_view());

    host.fire("request_routes", EventData::new());
    assert!(seen.lock().unwrap().is_empty());

    host.fire("remote_request", EventData::new());
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0]["url"], json!("/api/lights"));
}

#[test]
fn test_cross_instance_payload() {
    let host = Arc::new(
        LocalHost::new()
            .with_location_name("Cabin")
            .with_base_url("http://192.168.1.20:8123")
            .with_signing_secret(b"cabin-token".to_vec()),
    );
    let seen = record_routes(&host);
    RouteObserver::install(
        &host,
        ObserverConfig {
            sign_routes: true,
            ..ObserverConfig::default()
        },
    )
    .unwrap();

    host.register_view(&lights_view());
    host.fire("request_routes", EventData::new());

    let seen = seen.lock().unwrap();
    assert_eq!(
        seen[0],
        json!({
            "route": "/api/lights",
            "method": "get",
            "auth_required": true,
            "instance_name": "Cabin",
            "instance_ip": "192.168.1.20",
            "instance_port": 8123,
            "signature": hex::encode(b"cabin-token"),
        })
    );
}

#[tokio::test]
async fn test_events_reach_host_subscribers() {
    let host = Arc::new(LocalHost::new());
    let mut rx = host.subscribe();
    RouteObserver::install(&host, ObserverConfig::default()).unwrap();

    host.register_view(&lights_view());
    host.fire("request_routes", EventData::new());

    let first = rx.recv().await.unwrap();
    assert_eq!(first.event_type, "request_routes");
    let second = rx.recv().await.unwrap();
    assert_eq!(second.event_type, "route_registered");
    assert_eq!(second.data["method"], json!("get"));
}

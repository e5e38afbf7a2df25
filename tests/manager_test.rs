use message_interceptor::interceptors::trace::SPANS_ATTRIBUTE;
use message_interceptor::interceptors::validation::VALIDATION_ERRORS_ATTRIBUTE;
use message_interceptor::manager::build_interceptors;
use message_interceptor::pipeline::ROUTE_ATTRIBUTE;
use message_interceptor::settings::{InterceptorConfig, InterceptorType, SettingsError};
use message_interceptor::{Context, Interceptor, InterceptorManager, Message, Settings};
use serde_json::{json, Value};
use std::collections::HashMap;

const CONFIG: &str = r#"
    [dispatcher.audit]
    interceptor_type = "logging"
    order = 1

    [dispatcher.fallback]
    interceptor_type = "recovery"
    order = 2

    [dispatcher.fallback.settings]
    pattern = "timeout"
    fallback = "cached"

    [dispatcher.disabled]
    interceptor_type = "logging"
    enabled = false

    [pipelines.main]
    routing_order = 10

    [pipelines.main.interceptors.trace]
    interceptor_type = "tracing"
    order = 0

    [pipelines.main.interceptors.stamp]
    interceptor_type = "headers"
    order = 20

    [pipelines.main.interceptors.stamp.settings]
    headers = { x-handled-by = "main" }

    [[pipelines.main.routes]]
    name = "orders"
    kind = "order.*"
    target = "orders"

    [pipelines.orders.interceptors.check]
    interceptor_type = "validation"

    [pipelines.orders.interceptors.check.settings]
    required_headers = ["x-tenant"]
"#;

fn manager() -> InterceptorManager {
    let settings = Settings::from_toml_str(CONFIG).unwrap();
    InterceptorManager::new(&settings).unwrap()
}

#[test]
fn test_dispatcher_built_in_configured_order() {
    let manager = manager();
    assert_eq!(manager.dispatcher().interceptor_names(), vec!["audit", "fallback"]);

    let mut context = Context::new();
    let ok = manager
        .dispatcher()
        .dispatch(&mut context, |_| Err("read timeout".into()))
        .unwrap();
    assert!(ok);
    assert_eq!(context.result_as::<String>().as_deref(), Some("cached"));
}

#[test]
fn test_pipelines_include_routing_at_configured_position() {
    let manager = manager();
    assert_eq!(manager.pipeline_names(), vec!["main", "orders"]);

    let main = manager.pipeline("main").unwrap();
    assert_eq!(main.interceptor_names(), vec!["trace", "main.routing", "stamp"]);
    assert_eq!(manager.pipeline("orders").unwrap().interceptor_names(), vec!["check"]);
    assert!(manager.pipeline("missing").is_none());
}

#[test]
fn test_routed_message_runs_target_pipeline() {
    let manager = manager();
    let main = manager.pipeline("main").unwrap();

    let mut context = Context::new();
    let message = Message::new("order.created", json!({"id": 1})).with_header("x-tenant", "acme");
    assert!(main.process(message, &mut context));
    assert_eq!(context.attribute_as::<String>(ROUTE_ATTRIBUTE).as_deref(), Some("orders"));
    assert_eq!(context.attribute_as::<Vec<Value>>(SPANS_ATTRIBUTE).map(|s| s.len()), Some(1));

    let mut context = Context::new();
    assert!(!main.process(Message::new("order.created", json!({"id": 2})), &mut context));
    assert!(context.has_attribute(VALIDATION_ERRORS_ATTRIBUTE));
}

#[test]
fn test_unrouted_message_continues_local_chain() {
    let manager = manager();
    let main = manager.pipeline("main").unwrap();

    let mut context = Context::new();
    assert!(main.process(Message::new("user.created", Value::Null), &mut context));
    assert!(!context.has_attribute(ROUTE_ATTRIBUTE));
}

#[test]
fn test_update_dispatcher_replaces_interceptors() {
    let manager = manager();

    let mut configs = HashMap::new();
    configs.insert(
        "catch-all".to_string(),
        InterceptorConfig::new(InterceptorType::Recovery).with_setting("fallback", 0),
    );
    manager.update_dispatcher(&configs);
    assert_eq!(manager.dispatcher().interceptor_names(), vec!["catch-all"]);

    let mut context = Context::new();
    assert!(manager
        .dispatcher()
        .dispatch(&mut context, |_| Err("anything".into()))
        .unwrap());
    assert_eq!(context.result_as::<i64>(), Some(0));
}

#[test]
fn test_build_interceptors_skips_invalid_entries() {
    let mut configs = HashMap::new();
    configs.insert("audit".to_string(), InterceptorConfig::new(InterceptorType::Logging));
    // 선형 디스패처에 등록할 수 없는 타입
    configs.insert("trace".to_string(), InterceptorConfig::new(InterceptorType::Tracing));
    // 사용자 목록이 없는 인증
    configs.insert("auth".to_string(), InterceptorConfig::new(InterceptorType::BasicAuth));

    let interceptors = build_interceptors(&configs);
    assert_eq!(interceptors.len(), 1);
    assert_eq!(interceptors[0].name(), "audit");
}

#[test]
fn test_invalid_settings_are_rejected() {
    let mut settings = Settings::default();
    settings
        .dispatcher
        .insert("trace".to_string(), InterceptorConfig::new(InterceptorType::Tracing));

    assert!(matches!(InterceptorManager::new(&settings), Err(SettingsError::InvalidConfig(_))));
}

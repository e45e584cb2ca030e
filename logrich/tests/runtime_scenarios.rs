//! End-to-end scenarios exercising the public runtime surface: `init`,
//! `bind`, `get`, `dump`, `shutdown`, and `inspect` composed together the
//! way an embedding application would use them.
//!
//! The runtime is a process-wide singleton, so every test here serialises
//! on `GUARD` and cleans up its own environment variables before
//! returning, successful or not.

use std::collections::BTreeMap;
use std::sync::Mutex;

use logrich::runtime::api::{self, BindFields};
use logrich::runtime::config::RuntimeConfig;
use logrich::Severity;

static GUARD: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "LOGRICH_SERVICE",
        "LOGRICH_ENVIRONMENT",
        "LOGRICH_CONSOLE_LEVEL",
        "LOGRICH_QUEUE_ENABLED",
        "LOGRICH_ENABLE_RING_BUFFER",
        "LOGRICH_RING_BUFFER_SIZE",
        "LOGRICH_RATE_LIMIT_MAX_EVENTS",
        "LOGRICH_RATE_LIMIT_WINDOW_SECONDS",
    ] {
        std::env::remove_var(key);
    }
}

fn minimal_config(service: &str, environment: &str) -> RuntimeConfig {
    clear_env();
    std::env::set_var("LOGRICH_SERVICE", service);
    std::env::set_var("LOGRICH_ENVIRONMENT", environment);
    std::env::set_var("LOGRICH_QUEUE_ENABLED", "false");
    std::env::set_var("LOGRICH_CONSOLE_LEVEL", "DEBUG");
    let config = RuntimeConfig::from_env().expect("minimal config builds");
    clear_env();
    config
}

#[test]
fn context_propagation_follows_nested_bind_scopes() {
    let _guard = GUARD.lock().unwrap();
    api::init(minimal_config("checkout", "test"), None).expect("init succeeds");

    let _outer = api::bind(
        BindFields::new()
            .service("checkout")
            .environment("test")
            .job_id("job-1"),
    )
    .expect("outer bind succeeds");

    {
        let _inner = api::bind(BindFields::new().request_id("req-1")).expect("inner bind succeeds");
        let logger = api::get("checkout.cart").expect("logger available while initialised");
        let outcome = logger.info("added item", BTreeMap::new());
        assert!(outcome.ok());
    }

    let logger = api::get("checkout.cart").expect("logger still available");
    let outcome = logger.info("checked out", BTreeMap::new());
    assert!(outcome.ok());

    use logrich::infrastructure::dump::{DumpFormat, DumpOptions};
    let rendered = api::dump(
        DumpOptions {
            format: DumpFormat::Json,
            ..Default::default()
        },
        None,
    )
    .expect("dump succeeds");
    let events: Vec<serde_json::Value> = serde_json::from_str(&rendered).expect("valid json");
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["context"]["request_id"], serde_json::json!("req-1"));
    assert_eq!(events[0]["context"]["job_id"], serde_json::json!("job-1"));
    assert!(events[1]["context"]["request_id"].is_null());
    assert_eq!(events[1]["context"]["job_id"], serde_json::json!("job-1"));

    api::shutdown().expect("shutdown succeeds");
}

#[test]
fn dump_json_round_trip_filters_by_minimum_severity() {
    let _guard = GUARD.lock().unwrap();
    api::init(minimal_config("reports", "test"), None).expect("init succeeds");

    let logger = api::get("reports.job").expect("logger available");
    let levels = [
        Severity::Debug,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
    ];
    for severity in levels {
        logger.log(severity, format!("event at {severity}"), BTreeMap::new());
    }

    use logrich::infrastructure::dump::{DumpFilter, DumpFormat, DumpOptions};
    let options = DumpOptions {
        format: DumpFormat::Json,
        template: None,
        theme: Default::default(),
        color: false,
        filter: DumpFilter {
            min_severity: Some(Severity::Warning),
            ..Default::default()
        },
    };
    let rendered = api::dump(options, None).expect("dump succeeds");
    let parsed: Vec<serde_json::Value> = serde_json::from_str(&rendered).expect("valid json");
    assert_eq!(parsed.len(), 4);
    for entry in &parsed {
        let level = entry["severity"].as_str().unwrap_or_default();
        assert!(matches!(level, "WARNING" | "ERROR" | "CRITICAL"));
    }

    let text_options = DumpOptions {
        format: DumpFormat::Text,
        template: Some("short".to_string()),
        theme: Default::default(),
        color: false,
        filter: DumpFilter {
            min_severity: Some(Severity::Warning),
            ..Default::default()
        },
    };
    let text = api::dump(text_options, None).expect("text dump succeeds");
    let re = regex::Regex::new(r"^(WARN|ERRO|CRIT)\|.+$").unwrap();
    for line in text.lines() {
        assert!(re.is_match(line), "line did not match expected template: {line}");
    }

    api::shutdown().expect("shutdown succeeds");
}

#[test]
fn init_shutdown_init_is_reusable() {
    let _guard = GUARD.lock().unwrap();
    api::init(minimal_config("svc-a", "test"), None).expect("first init succeeds");
    assert!(api::is_initialised());
    api::shutdown().expect("first shutdown succeeds");
    assert!(!api::is_initialised());

    api::init(minimal_config("svc-b", "test"), None).expect("second init succeeds");
    assert!(api::is_initialised());
    let inspection = api::inspect().expect("inspect succeeds while initialised");
    assert_eq!(inspection.service, "svc-b");
    api::shutdown().expect("second shutdown succeeds");
}

#[test]
fn rate_limited_events_are_denied_once_the_window_is_exhausted() {
    let _guard = GUARD.lock().unwrap();
    clear_env();
    std::env::set_var("LOGRICH_SERVICE", "rate-limited");
    std::env::set_var("LOGRICH_ENVIRONMENT", "test");
    std::env::set_var("LOGRICH_QUEUE_ENABLED", "false");
    std::env::set_var("LOGRICH_RATE_LIMIT_MAX_EVENTS", "2");
    std::env::set_var("LOGRICH_RATE_LIMIT_WINDOW_SECONDS", "60");
    let config = RuntimeConfig::from_env().expect("config builds");
    clear_env();

    api::init(config, None).expect("init succeeds");
    let logger = api::get("rate-limited.worker").expect("logger available");

    let first = logger.info("one", BTreeMap::new());
    let second = logger.info("two", BTreeMap::new());
    let third = logger.info("three", BTreeMap::new());

    assert!(first.ok());
    assert!(second.ok());
    assert!(!third.ok());
    assert_eq!(third.reason(), Some("rate_limited"));

    api::shutdown().expect("shutdown succeeds");
}

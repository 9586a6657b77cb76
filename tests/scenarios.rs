//! End-to-end scenarios from the testable-properties section: linear
//! chains, interface cycles, feeder priority, tenant isolation, and
//! logger-swap visibility across a post-config hook.

use async_trait::async_trait;
use ferrous_modular::config::{ConfigBuilder, SectionTarget};
use ferrous_modular::feeder::{ConfigResult, Feeder};
use ferrous_modular::key::InterfaceKey;
use ferrous_modular::logger::{Level, Logger};
use ferrous_modular::module::{
    ConsumesServices, DependencyAware, Module, ProvidedService, ProvidesServices,
};
use ferrous_modular::service::ServiceDependency;
use ferrous_modular::tenant::TenantId;
use ferrous_modular::tracker::{FieldTracker, TrackedField};
use ferrous_modular::{Application, ErrorKind};
use serde_json::Value;
use std::sync::{Arc, Mutex};

// --- S1: linear chain -------------------------------------------------

struct Chained {
    name: &'static str,
    deps: Vec<&'static str>,
    order: Arc<Mutex<Vec<&'static str>>>,
    stop_order: Arc<Mutex<Vec<&'static str>>>,
}

#[async_trait]
impl Module for Chained {
    fn name(&self) -> &str {
        self.name
    }
    fn as_dependency_aware(&self) -> Option<&dyn DependencyAware> {
        if self.deps.is_empty() {
            None
        } else {
            Some(self)
        }
    }
    fn as_startable(&self) -> Option<&dyn ferrous_modular::module::Startable> {
        Some(self)
    }
    fn as_stoppable(&self) -> Option<&dyn ferrous_modular::module::Stoppable> {
        Some(self)
    }
    async fn init(&self, _app: &Application) -> ferrous_modular::AppResult<()> {
        self.order.lock().unwrap().push(self.name);
        Ok(())
    }
}
impl DependencyAware for Chained {
    fn dependencies(&self) -> Vec<String> {
        self.deps.iter().map(|s| s.to_string()).collect()
    }
}
#[async_trait]
impl ferrous_modular::module::Startable for Chained {
    async fn start(&self, _app: &Application) -> ferrous_modular::AppResult<()> {
        Ok(())
    }
}
#[async_trait]
impl ferrous_modular::module::Stoppable for Chained {
    async fn stop(&self, _app: &Application) -> ferrous_modular::AppResult<()> {
        self.stop_order.lock().unwrap().push(self.name);
        Ok(())
    }
}

#[tokio::test]
async fn s1_linear_chain_init_and_stop_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let stop_order = Arc::new(Mutex::new(Vec::new()));
    let app = Application::builder().build();

    for (name, deps) in [("a", vec![]), ("b", vec!["a"]), ("c", vec!["b"])] {
        app.register(Arc::new(Chained {
            name,
            deps,
            order: Arc::clone(&order),
            stop_order: Arc::clone(&stop_order),
        }))
        .unwrap();
    }

    app.init().await.unwrap();
    app.start().await.unwrap();
    app.stop().await.unwrap();

    assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
    assert_eq!(*stop_order.lock().unwrap(), vec!["c", "b", "a"]);
}

// --- S2: interface cycle ------------------------------------------------

trait IFoo: Send + Sync {}
trait IBar: Send + Sync {}

struct CycleModule {
    name: &'static str,
    provides_foo: bool,
    provides_bar: bool,
    requires: InterfaceKey,
}
struct FooImpl;
impl IFoo for FooImpl {}
struct BarImpl;
impl IBar for BarImpl {}

#[async_trait]
impl Module for CycleModule {
    fn name(&self) -> &str {
        self.name
    }
    fn as_service_provider(&self) -> Option<&dyn ProvidesServices> {
        Some(self)
    }
    fn as_service_consumer(&self) -> Option<&dyn ConsumesServices> {
        Some(self)
    }
}
impl ProvidesServices for CycleModule {
    fn provides(&self) -> Vec<ProvidedService> {
        let mut out = vec![];
        if self.provides_foo {
            out.push(ProvidedService {
                name: format!("{}-foo", self.name),
                description: String::new(),
                interfaces: vec![InterfaceKey::of::<dyn IFoo>()],
                instance: Arc::new(FooImpl),
            });
        }
        if self.provides_bar {
            out.push(ProvidedService {
                name: format!("{}-bar", self.name),
                description: String::new(),
                interfaces: vec![InterfaceKey::of::<dyn IBar>()],
                instance: Arc::new(BarImpl),
            });
        }
        out
    }
}
impl ConsumesServices for CycleModule {
    fn requires(&self) -> Vec<ServiceDependency> {
        vec![ServiceDependency {
            name: String::new(),
            required: true,
            match_by_interface: true,
            satisfies_interface_type: Some(self.requires),
        }]
    }
}

#[tokio::test]
async fn s2_interface_cycle_fails_with_both_modules_named() {
    let app = Application::builder().build();
    app.register(Arc::new(CycleModule {
        name: "A",
        provides_foo: true,
        provides_bar: false,
        requires: InterfaceKey::of::<dyn IBar>(),
    }))
    .unwrap();
    app.register(Arc::new(CycleModule {
        name: "B",
        provides_foo: false,
        provides_bar: true,
        requires: InterfaceKey::of::<dyn IFoo>(),
    }))
    .unwrap();

    let err = app.init().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CircularDependency);
    let rendered = format!("{err}");
    assert!(rendered.contains('A') && rendered.contains('B'));
    assert!(rendered.contains("interface:"));
}

// --- S3: feeder priority override --------------------------------------

#[derive(Debug)]
struct KeyFeeder {
    value: &'static str,
    priority: i64,
}
impl Feeder for KeyFeeder {
    fn feed(&self, target: &mut Value, tracker: &FieldTracker) -> ConfigResult<()> {
        if let Value::Object(map) = target {
            map.insert("sdk_key".to_string(), Value::String(self.value.to_string()));
            tracker.track_field(
                "sdk_key",
                TrackedField {
                    source_feeder: self.name().to_string(),
                    source_key: "sdk_key".to_string(),
                    final_value: self.value.to_string(),
                },
            );
        }
        Ok(())
    }
    fn priority(&self) -> i64 {
        self.priority
    }
    fn name(&self) -> &str {
        "key-feeder"
    }
}

struct MainOnly;
#[async_trait]
impl Module for MainOnly {
    fn name(&self) -> &str {
        "main-only"
    }
}

#[tokio::test]
async fn s3_higher_priority_feeder_wins_and_swap_reverses_result() {
    let app = Application::builder()
        .with_main_config(serde_json::json!({}))
        .with_feeder(Arc::new(KeyFeeder { value: "yaml", priority: 50 }))
        .with_feeder(Arc::new(KeyFeeder { value: "env", priority: 100 }))
        .build();
    app.register(Arc::new(MainOnly)).unwrap();
    app.init().await.unwrap();
    let section = app.get_config_section("_main").unwrap();
    assert_eq!(section.get_config()["sdk_key"], "env");

    let app2 = Application::builder()
        .with_main_config(serde_json::json!({}))
        .with_feeder(Arc::new(KeyFeeder { value: "yaml", priority: 100 }))
        .with_feeder(Arc::new(KeyFeeder { value: "env", priority: 50 }))
        .build();
    app2.register(Arc::new(MainOnly)).unwrap();
    app2.init().await.unwrap();
    let section2 = app2.get_config_section("_main").unwrap();
    assert_eq!(section2.get_config()["sdk_key"], "yaml");
}

// --- S4: tenant deep isolation ------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct Features {
    flags: std::collections::HashMap<String, bool>,
}

#[test]
fn s4_tenant_isolation_from_each_other_and_base() {
    let overlay = ferrous_modular::tenant::TenantOverlay::new();
    let base = Features {
        flags: std::collections::HashMap::from([("f1".to_string(), true)]),
    };
    overlay.set_tenant_config_isolated(TenantId::new("t1"), "features", base.clone());

    let mut mutated = base.clone();
    mutated.flags.insert("f1".to_string(), false);
    mutated.flags.insert("new".to_string(), true);
    overlay.set_tenant_config_isolated(TenantId::new("t1"), "features", mutated);

    let t1 = overlay
        .get_tenant_value::<Features>(&TenantId::new("t1"), "features")
        .unwrap();
    assert_eq!(t1.flags.get("f1"), Some(&false));
    assert_eq!(t1.flags.get("new"), Some(&true));
    assert_eq!(base.flags.get("f1"), Some(&true));
}

// --- S5: config-loaded hook swaps logger --------------------------------

struct RecordingLogger {
    tag: &'static str,
    messages: Arc<Mutex<Vec<String>>>,
}
impl Logger for RecordingLogger {
    fn log(&self, _level: Level, message: &str) {
        self.messages.lock().unwrap().push(format!("{}:{}", self.tag, message));
    }
}

struct CachesLogger;
#[async_trait]
impl Module for CachesLogger {
    fn name(&self) -> &str {
        "caches-logger"
    }
    async fn init(&self, app: &Application) -> ferrous_modular::AppResult<()> {
        app.logger().info("init ran");
        Ok(())
    }
}

#[tokio::test]
async fn s5_hook_swaps_logger_before_module_init_sees_it() {
    let json_messages = Arc::new(Mutex::new(Vec::new()));
    let json_messages_for_hook = Arc::clone(&json_messages);

    let app = Application::builder()
        .with_logger(Arc::new(RecordingLogger {
            tag: "text",
            messages: Arc::new(Mutex::new(Vec::new())),
        }))
        .with_post_config_hook(move |app| {
            app.set_logger(Arc::new(RecordingLogger {
                tag: "json",
                messages: Arc::clone(&json_messages_for_hook),
            }));
            Ok(())
        })
        .build();

    app.register(Arc::new(CachesLogger)).unwrap();
    app.init().await.unwrap();

    let messages = json_messages.lock().unwrap();
    assert!(messages.iter().any(|m| m == "json:init ran"));
}

// --- property 3 tie-break: equal priority, later-added wins -------------

#[tokio::test]
async fn equal_priority_later_added_feeder_wins() {
    let mut builder = ferrous_modular::config::ConfigBuilder::new(Arc::new(FieldTracker::new()));
    builder.add_feeder(Arc::new(KeyFeeder { value: "first", priority: 0 }));
    builder.add_feeder(Arc::new(KeyFeeder { value: "second", priority: 0 }));
    builder.add_section(SectionTarget::new("_main", serde_json::json!({})));
    builder.feed().unwrap();
    assert_eq!(builder.section("_main").unwrap()["sdk_key"], "second");

    let tracked = builder.tracker().tracked_fields();
    assert_eq!(tracked["sdk_key"].final_value, "second");
}

//! Lifecycle engine / Application (C7): registration, init, start, stop,
//! hooks, logger swap.
//!
//! The state machine (`Created -> Initializing -> Initialized -> Starting ->
//! Started -> Stopping -> Stopped`) is grounded in the teacher's
//! `async_lifecycle.rs` `AsyncLifecycleManager`/`LifecycleState`
//! (`register -> initialize_all -> startup_all -> shutdown_all`),
//! generalized from per-service keys to per-module resolved order.

use crate::config::provider::{AnyConfigProvider, ConfigProvider, IsolatedProvider};
use crate::config::{ConfigBuilder, SectionTarget, MAIN_SECTION};
use crate::error::{AppError, AppResult, ErrorKind};
use crate::event::{Event, EventType};
use crate::feeder::Feeder;
use crate::logger::{default_logger, Logger};
use crate::module::registry::ModuleRegistry;
use crate::module::Module;
use crate::observer::{Observer, ObserverId, ObserverRegistry};
use crate::service::{ServiceDependency, ServiceRegistry};
use crate::tenant::{TenantId, TenantOverlay};
use crate::tracker::FieldTracker;
use arc_swap::ArcSwap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tokio::sync::Notify;

/// `stop()`'s cancellation handle (§5): modules that honour it receive this
/// at `start()` and must observe its cancellation themselves; there is no
/// built-in per-module timeout.
#[derive(Clone)]
pub struct CancellationContext {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancellationContext {
    fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel()` has been called.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.notify.notified().await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Initializing,
    Initialized,
    Starting,
    Started,
    Stopping,
    Stopped,
}

/// A post-config hook: an ordered function `(app) -> Result<()>` run after
/// config load and before module init (§9 Design Notes — "lifecycle
/// middleware").
pub type PostConfigHook = Box<dyn Fn(&Application) -> AppResult<()> + Send + Sync>;

/// Constructs an [`Application`] with the optional state §4.7 lists.
pub struct ApplicationBuilder {
    main_config: Option<Value>,
    feeders: Vec<Arc<dyn Feeder>>,
    hooks: Vec<PostConfigHook>,
    verbose_config: bool,
    with_tenants: bool,
    logger: Arc<dyn Logger>,
}

impl Default for ApplicationBuilder {
    fn default() -> Self {
        Self {
            main_config: None,
            feeders: Vec::new(),
            hooks: Vec::new(),
            verbose_config: false,
            with_tenants: false,
            logger: default_logger(),
        }
    }
}

impl ApplicationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supplies the default `_main` section's initial value. A `_main`
    /// section is present iff this was called (§3 invariant).
    pub fn with_main_config(mut self, value: Value) -> Self {
        self.main_config = Some(value);
        self
    }

    pub fn with_feeder(mut self, feeder: Arc<dyn Feeder>) -> Self {
        self.feeders.push(feeder);
        self
    }

    pub fn with_post_config_hook(
        mut self,
        hook: impl Fn(&Application) -> AppResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    pub fn with_verbose_config(mut self, verbose: bool) -> Self {
        self.verbose_config = verbose;
        self
    }

    pub fn with_tenant_overlay(mut self) -> Self {
        self.with_tenants = true;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn build(self) -> Application {
        Application {
            main_config: self.main_config,
            feeders: self.feeders,
            hooks: self.hooks,
            verbose_config: self.verbose_config,
            phase: RwLock::new(Phase::Created),
            module_registry: RwLock::new(ModuleRegistry::new()),
            service_registry: RwLock::new(ServiceRegistry::new()),
            sections: RwLock::new(Vec::new()),
            resolved_order: RwLock::new(Vec::new()),
            logger: ArcSwap::from(self.logger),
            tracker: Arc::new(FieldTracker::new()),
            tenant_overlay: if self.with_tenants {
                Some(TenantOverlay::new())
            } else {
                None
            },
            observers: ObserverRegistry::new(default_logger()),
            start_time: RwLock::new(None),
            cancellation: CancellationContext::new(),
        }
    }
}

/// The lifecycle engine: owns the module registry, service registry,
/// section config providers, observer table, and optional tenant overlay
/// for one application instance.
pub struct Application {
    main_config: Option<Value>,
    feeders: Vec<Arc<dyn Feeder>>,
    hooks: Vec<PostConfigHook>,
    verbose_config: bool,
    phase: RwLock<Phase>,
    module_registry: RwLock<ModuleRegistry>,
    service_registry: RwLock<ServiceRegistry>,
    sections: RwLock<Vec<(String, Arc<dyn ConfigProvider<Value>>)>>,
    resolved_order: RwLock<Vec<Arc<dyn Module>>>,
    logger: ArcSwap<dyn Logger>,
    tracker: Arc<FieldTracker>,
    tenant_overlay: Option<TenantOverlay>,
    observers: ObserverRegistry,
    start_time: RwLock<Option<Instant>>,
    cancellation: CancellationContext,
}

impl Application {
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    fn phase(&self) -> Phase {
        *self.phase.read().unwrap_or_else(|e| e.into_inner())
    }

    fn set_phase(&self, phase: Phase) {
        *self.phase.write().unwrap_or_else(|e| e.into_inner()) = phase;
    }

    fn emit(&self, event_type: EventType, source: &str, data: Value) {
        self.observers.notify(Event::new(event_type, source, data));
    }

    /// Registers an observer, interested only in the given event types (an
    /// empty filter subscribes to every event).
    pub fn register_observer(
        &self,
        observer: Arc<dyn Observer>,
        filter: Vec<EventType>,
    ) -> ObserverId {
        self.observers.register(observer, filter)
    }

    pub fn unregister_observer(&self, id: ObserverId) {
        self.observers.unregister(id);
    }

    /// `register(module)` — pre-init only; a call after `init()` returns an
    /// error (the Rust analogue of the reference's panics-equivalent
    /// failure).
    pub fn register(&self, module: Arc<dyn Module>) -> AppResult<()> {
        if self.phase() != Phase::Created {
            return Err(AppError::new(
                ErrorKind::ApplicationNotReady,
                "register() called after init()",
            ));
        }
        let name = module.name().to_string();
        self.module_registry
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .register(module)?;
        self.emit(EventType::ModuleRegistered, &name, serde_json::json!({ "module": name }));
        Ok(())
    }

    /// Atomic logger swap; subsequent calls to `logger()` return the new
    /// sink immediately, including from within a post-config hook or a
    /// module's own `init`.
    pub fn set_logger(&self, logger: Arc<dyn Logger>) {
        self.logger.store(logger);
    }

    pub fn logger(&self) -> Arc<dyn Logger> {
        self.logger.load_full()
    }

    pub fn tracker(&self) -> &Arc<FieldTracker> {
        &self.tracker
    }

    pub fn tenant_overlay(&self) -> Option<&TenantOverlay> {
        self.tenant_overlay.as_ref()
    }

    /// Returns a value-carrying context usable by tenant-aware modules.
    pub fn with_tenant(&self, tenant: TenantId) -> AppResult<TenantContext<'_>> {
        let overlay = self.tenant_overlay.as_ref().ok_or_else(|| {
            AppError::new(ErrorKind::TenantNotFound, "application has no tenant overlay configured")
        })?;
        Ok(TenantContext {
            app: self,
            overlay,
            tenant,
        })
    }

    pub fn cancellation(&self) -> &CancellationContext {
        &self.cancellation
    }

    /// Executes the §4.7 init algorithm in exact order. Errors from steps
    /// 1, 2, 3, and 5 surface to the caller; step 6 (event emission) never
    /// errors.
    pub async fn init(&self) -> AppResult<()> {
        self.set_phase(Phase::Initializing);

        let modules = self
            .module_registry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .all()
            .to_vec();

        // Step 1: let Configurable modules register their sections.
        let mut builder = ConfigBuilder::new(Arc::clone(&self.tracker));
        if let Some(main) = &self.main_config {
            builder.add_section(SectionTarget::new(MAIN_SECTION, main.clone()));
        }
        for module in &modules {
            if let Some(configurable) = module.as_configurable() {
                configurable.register_config(&mut builder)?;
            }
        }
        for feeder in &self.feeders {
            builder.add_feeder(Arc::clone(feeder));
        }

        // Step 2: load configuration.
        builder.feed()?;

        self.emit(
            EventType::ConfigLoaded,
            "application",
            serde_json::json!({ "phase": "init_start" }),
        );

        for section in builder.sections() {
            let provider: Arc<dyn ConfigProvider<Value>> =
                Arc::new(IsolatedProvider::new(section.value.clone()));
            self.sections
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .push((section.section_key.clone(), provider));
        }

        // Step 3: post-config hooks, in registration order.
        for (ordinal, hook) in self.hooks.iter().enumerate() {
            hook(self).map_err(|e| {
                AppError::with_source(
                    e.kind(),
                    format!("post-config hook #{ordinal} failed"),
                    e,
                )
            })?;
        }

        // Step 4: resolve module dependencies.
        let resolved = self
            .module_registry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .resolve()?;
        *self
            .resolved_order
            .write()
            .unwrap_or_else(|e| e.into_inner()) = resolved.clone();

        // Step 5: construct, register services, initialize, in order.
        let mut working: Vec<Arc<dyn Module>> = resolved;
        for idx in 0..working.len() {
            let mut module = Arc::clone(&working[idx]);

            // 5a: collect and register this module's published services.
            if let Some(provider) = module.as_service_provider() {
                for service in provider.provides() {
                    let actual = self
                        .service_registry
                        .write()
                        .unwrap_or_else(|e| e.into_inner())
                        .register(service.name, module.name(), service.instance, service.interfaces);
                    self.emit(
                        EventType::ServiceRegistered,
                        module.name(),
                        serde_json::json!({ "service": actual }),
                    );
                }
            }

            // 5b: construct, if Constructable — treated as a single fixed
            // point; the replacement is never re-probed for Constructable.
            if let Some(constructable) = module.as_constructable() {
                let injected = self.build_injected_services(module.as_ref())?;
                let replacement = constructable.construct(injected).await.map_err(|e| {
                    AppError::with_source(
                        e.kind(),
                        format!("module '{}' constructor failed", module.name()),
                        e,
                    )
                })?;
                self.module_registry
                    .write()
                    .unwrap_or_else(|e| e.into_inner())
                    .replace(module.name(), Arc::clone(&replacement));
                module = replacement;
                working[idx] = Arc::clone(&module);
            }

            // 5c: initialize.
            if let Err(e) = module.init(self).await {
                self.emit(
                    EventType::ModuleFailed,
                    module.name(),
                    serde_json::json!({ "error": e.to_string() }),
                );
                return Err(e);
            }
            self.emit(EventType::ModuleInitialized, module.name(), serde_json::json!({}));
        }
        *self
            .resolved_order
            .write()
            .unwrap_or_else(|e| e.into_inner()) = working;

        self.emit(
            EventType::ConfigValidated,
            "application",
            serde_json::json!({ "phase": "init_complete" }),
        );

        self.set_phase(Phase::Initialized);
        Ok(())
    }

    fn build_injected_services(
        &self,
        module: &dyn Module,
    ) -> AppResult<HashMap<String, Arc<dyn std::any::Any + Send + Sync>>> {
        let mut injected = HashMap::new();
        let Some(consumer) = module.as_service_consumer() else {
            return Ok(injected);
        };
        let registry = self.service_registry.read().unwrap_or_else(|e| e.into_inner());
        for dep in consumer.requires() {
            let key = dep.name.clone();
            if let Some(entry) = registry.resolve_dependency(&dep)? {
                let key = if key.is_empty() { entry.actual_name.clone() } else { key };
                injected.insert(key, Arc::clone(&entry.instance));
            }
        }
        Ok(injected)
    }

    /// Starts `Startable` modules in resolved order. Records start time and
    /// creates the root cancellation context. The first error aborts; the
    /// engine does not roll back already-started modules.
    pub async fn start(&self) -> AppResult<()> {
        if self.phase() != Phase::Initialized {
            return Err(AppError::new(
                ErrorKind::ApplicationNotReady,
                "start() called before a successful init()",
            ));
        }
        self.set_phase(Phase::Starting);
        *self.start_time.write().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());

        let order = self
            .resolved_order
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for module in &order {
            if let Some(startable) = module.as_startable() {
                if let Err(e) = startable.start(self).await {
                    self.emit(
                        EventType::ApplicationFailed,
                        module.name(),
                        serde_json::json!({ "error": e.to_string() }),
                    );
                    return Err(e);
                }
                self.emit(EventType::ModuleStarted, module.name(), serde_json::json!({}));
            }
        }

        self.set_phase(Phase::Started);
        self.emit(EventType::ApplicationStarted, "application", serde_json::json!({}));
        Ok(())
    }

    /// Stops `Stoppable` modules in reverse resolved order. Every stoppable
    /// is invoked regardless of earlier failures; the first error is
    /// returned, later errors are logged against the failing module name.
    pub async fn stop(&self) -> AppResult<()> {
        self.set_phase(Phase::Stopping);
        let mut order = self
            .resolved_order
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        order.reverse();

        let mut first_error: Option<AppError> = None;
        for module in &order {
            if let Some(stoppable) = module.as_stoppable() {
                if let Err(e) = stoppable.stop(self).await {
                    self.logger()
                        .error(&format!("module '{}' failed to stop: {e}", module.name()));
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                } else {
                    self.emit(EventType::ModuleStopped, module.name(), serde_json::json!({}));
                }
            }
        }

        self.cancellation.cancel();
        self.set_phase(Phase::Stopped);
        self.emit(EventType::ApplicationStopped, "application", serde_json::json!({}));

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Fails with [`ErrorKind::ConfigMissing`] if `name` was never
    /// registered (the Rust analogue of the spec's "section not found").
    pub fn get_config_section(&self, name: &str) -> AppResult<Arc<dyn ConfigProvider<Value>>> {
        self.sections
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, provider)| Arc::clone(provider))
            .ok_or_else(|| AppError::new(ErrorKind::ConfigMissing, format!("section '{name}' not found")))
    }

    /// Deserializes section `name`'s current value into `T`.
    pub fn get_typed_config_section<T: DeserializeOwned>(&self, name: &str) -> AppResult<T> {
        let provider = self.get_config_section(name)?;
        let value = provider.get_config();
        serde_json::from_value((*value).clone()).map_err(|e| {
            AppError::with_source(
                ErrorKind::ConfigValidationError,
                format!("section '{name}' does not deserialize into the requested type"),
                e,
            )
        })
    }

    pub fn get_service<T: Send + Sync + 'static>(&self, name: &str) -> AppResult<Arc<T>> {
        self.service_registry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .lookup(name)
    }

    pub fn get_module(&self, name: &str) -> Option<Arc<dyn Module>> {
        self.module_registry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    /// Returns a copy; mutating it never affects the engine's registry.
    pub fn get_all_modules(&self) -> HashMap<String, Arc<dyn Module>> {
        self.module_registry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .all()
            .iter()
            .map(|m| (m.name().to_string(), Arc::clone(m)))
            .collect()
    }

    pub fn verbose_config(&self) -> bool {
        self.verbose_config
    }
}

/// Value-carrying context for a tenant-aware module, returned by
/// [`Application::with_tenant`].
pub struct TenantContext<'a> {
    app: &'a Application,
    overlay: &'a TenantOverlay,
    tenant: TenantId,
}

impl<'a> TenantContext<'a> {
    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    pub fn app(&self) -> &Application {
        self.app
    }

    pub fn get_config_section<T: Send + Sync + 'static>(&self, section: &str) -> AppResult<Arc<T>> {
        self.overlay.get_tenant_value::<T>(&self.tenant, section)
    }

    pub fn get_config_section_any(&self, section: &str) -> AppResult<Arc<dyn AnyConfigProvider>> {
        self.overlay.get_tenant_config(&self.tenant, section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{ConsumesServices, ProvidedService, ProvidesServices};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct Leaf;
    #[async_trait]
    impl Module for Leaf {
        fn name(&self) -> &str {
            "leaf"
        }
    }

    struct Dependent {
        started: Arc<AtomicUsize>,
        stopped: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Module for Dependent {
        fn name(&self) -> &str {
            "dependent"
        }

        fn as_startable(&self) -> Option<&dyn crate::module::Startable> {
            Some(self)
        }

        fn as_stoppable(&self) -> Option<&dyn crate::module::Stoppable> {
            Some(self)
        }
    }

    #[async_trait]
    impl crate::module::Startable for Dependent {
        async fn start(&self, _app: &Application) -> AppResult<()> {
            self.started.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[async_trait]
    impl crate::module::Stoppable for Dependent {
        async fn stop(&self, _app: &Application) -> AppResult<()> {
            self.stopped.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn register_after_init_is_rejected() {
        let app = Application::builder().build();
        app.register(Arc::new(Leaf)).unwrap();
        app.init().await.unwrap();

        let err = app.register(Arc::new(Leaf)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ApplicationNotReady);
    }

    #[tokio::test]
    async fn start_then_stop_runs_every_module() {
        let started = Arc::new(AtomicUsize::new(0));
        let stopped = Arc::new(AtomicUsize::new(0));
        let app = Application::builder().build();
        app.register(Arc::new(Dependent {
            started: Arc::clone(&started),
            stopped: Arc::clone(&stopped),
        }))
        .unwrap();
        app.init().await.unwrap();
        app.start().await.unwrap();
        app.stop().await.unwrap();

        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(stopped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn get_all_modules_is_a_snapshot() {
        let app = Application::builder().build();
        app.register(Arc::new(Leaf)).unwrap();
        app.init().await.unwrap();

        let mut snapshot = app.get_all_modules();
        snapshot.clear();
        assert_eq!(app.get_all_modules().len(), 1);
    }

    struct Provider;
    #[async_trait]
    impl Module for Provider {
        fn name(&self) -> &str {
            "provider"
        }
        fn as_service_provider(&self) -> Option<&dyn ProvidesServices> {
            Some(self)
        }
    }
    impl ProvidesServices for Provider {
        fn provides(&self) -> Vec<ProvidedService> {
            vec![ProvidedService {
                name: "greeting".into(),
                description: String::new(),
                interfaces: vec![],
                instance: Arc::new("hello".to_string()),
            }]
        }
    }

    struct Consumer {
        seen: Arc<RwLock<Option<String>>>,
    }
    #[async_trait]
    impl Module for Consumer {
        fn name(&self) -> &str {
            "consumer"
        }
        fn as_dependency_aware(&self) -> Option<&dyn crate::module::DependencyAware> {
            Some(self)
        }
        fn as_service_consumer(&self) -> Option<&dyn ConsumesServices> {
            Some(self)
        }
        async fn init(&self, app: &Application) -> AppResult<()> {
            let value = app.get_service::<String>("greeting")?;
            *self.seen.write().unwrap() = Some((*value).clone());
            Ok(())
        }
    }
    impl crate::module::DependencyAware for Consumer {
        fn dependencies(&self) -> Vec<String> {
            vec!["provider".to_string()]
        }
    }
    impl ConsumesServices for Consumer {
        fn requires(&self) -> Vec<ServiceDependency> {
            vec![ServiceDependency {
                name: "greeting".into(),
                required: true,
                match_by_interface: false,
                satisfies_interface_type: None,
            }]
        }
    }

    #[tokio::test]
    async fn service_is_visible_before_consumer_init_runs() {
        let app = Application::builder().build();
        let seen = Arc::new(RwLock::new(None));
        app.register(Arc::new(Provider)).unwrap();
        app.register(Arc::new(Consumer { seen: Arc::clone(&seen) })).unwrap();
        app.init().await.unwrap();

        assert_eq!(seen.read().unwrap().as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn post_config_hook_can_swap_logger() {
        use crate::logger::JsonLogger;

        let app = Application::builder()
            .with_post_config_hook(|app| {
                app.set_logger(Arc::new(JsonLogger));
                Ok(())
            })
            .build();
        app.init().await.unwrap();
        // No type-safe way to assert the concrete logger from outside;
        // absence of a panic/error is the behavioural assertion here.
        app.logger().info("ok");
    }
}

//! Module data model (§3): a named unit of behavior plus the optional
//! capabilities the engine probes for structurally.
//!
//! Rust has no runtime interface tables, so capability probing can't be
//! duck-typed the way the Go reference does it. Instead each capability is
//! its own trait, and `Module` exposes an `as_*` accessor per capability
//! that defaults to `None`; a module that implements a capability trait
//! overrides the matching accessor to return `Some(self)`. This mirrors the
//! reference's structural detection without macros or reflection, at the
//! cost of one boilerplate line per capability a module opts into.

pub mod registry;

use crate::app::Application;
use crate::config::ConfigBuilder;
use crate::error::AppResult;
use crate::key::InterfaceKey;
use crate::observer::Observer;
use crate::service::ServiceDependency;
use crate::tenant::TenantId;
use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// A published service, pending registration into the service registry.
pub struct ProvidedService {
    pub name: String,
    pub description: String,
    pub interfaces: Vec<InterfaceKey>,
    pub instance: Arc<dyn Any + Send + Sync>,
}

/// A unit of functionality identified by a name unique within one
/// application (§3). Capability traits below are the optional extension
/// points; the core contract is just `name` and `init`.
#[async_trait]
pub trait Module: Send + Sync {
    fn name(&self) -> &str;

    /// Called once, in resolved topological order, after services this
    /// module requires have been registered (§4.7 step 5c).
    async fn init(&self, _app: &Application) -> AppResult<()> {
        Ok(())
    }

    fn as_configurable(&self) -> Option<&dyn Configurable> {
        None
    }
    fn as_dependency_aware(&self) -> Option<&dyn DependencyAware> {
        None
    }
    fn as_service_provider(&self) -> Option<&dyn ProvidesServices> {
        None
    }
    fn as_service_consumer(&self) -> Option<&dyn ConsumesServices> {
        None
    }
    fn as_constructable(&self) -> Option<&dyn Constructable> {
        None
    }
    fn as_startable(&self) -> Option<&dyn Startable> {
        None
    }
    fn as_stoppable(&self) -> Option<&dyn Stoppable> {
        None
    }
    fn as_tenant_aware(&self) -> Option<&dyn TenantAware> {
        None
    }
    fn as_observable(&self) -> Option<&dyn Observable> {
        None
    }
}

/// Registers one or more named configuration sections at init step 1.
pub trait Configurable: Send + Sync {
    fn register_config(&self, builder: &mut ConfigBuilder) -> AppResult<()>;
}

/// Declares module-name dependencies.
pub trait DependencyAware: Send + Sync {
    fn dependencies(&self) -> Vec<String>;
}

/// Publishes services to the registry.
pub trait ProvidesServices: Send + Sync {
    fn provides(&self) -> Vec<ProvidedService>;
}

/// Declares required/optional services, by name and/or by interface type.
pub trait ConsumesServices: Send + Sync {
    fn requires(&self) -> Vec<ServiceDependency>;
}

/// Receives a map of injected services keyed by required-service name on
/// entry to init, and returns the (possibly replaced) module. Treated as a
/// single fixed point: the replacement is installed without re-probing it
/// for `Constructable` again (an open question in §9, resolved this way and
/// recorded in DESIGN.md).
#[async_trait]
pub trait Constructable: Send + Sync {
    async fn construct(
        &self,
        injected: HashMap<String, Arc<dyn Any + Send + Sync>>,
    ) -> AppResult<Arc<dyn Module>>;
}

#[async_trait]
pub trait Startable: Send + Sync {
    async fn start(&self, app: &Application) -> AppResult<()>;
}

#[async_trait]
pub trait Stoppable: Send + Sync {
    async fn stop(&self, app: &Application) -> AppResult<()>;
}

/// Receives callbacks when tenants appear/disappear.
pub trait TenantAware: Send + Sync {
    fn on_tenant_registered(&self, tenant: &TenantId);
    fn on_tenant_removed(&self, tenant: &TenantId);
}

/// Registers itself as an observer and/or as an event source.
pub trait Observable: Send + Sync {
    fn as_observer(&self) -> Option<Arc<dyn Observer>> {
        None
    }
}

//! `ferrous-modular` — a lifecycle-and-composition engine for Rust
//! processes assembled out of independently authored modules.
//!
//! A process is built from [`app::Application`]: modules register
//! themselves and their declared dependencies, the engine resolves a
//! dependency order from both declared edges and service-derived edges,
//! layered configuration is fed into per-module sections by priority-sorted
//! [`feeder::Feeder`]s, and the resulting modules are constructed,
//! initialized, started, and stopped under an observer-visible event
//! stream. An optional per-tenant overlay layers tenant-specific section
//! configs over the defaults using the same provider policies as ordinary
//! sections.
//!
//! # Quick start
//!
//! ```no_run
//! use ferrous_modular::app::Application;
//! use ferrous_modular::module::Module;
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct Clock;
//!
//! #[async_trait]
//! impl Module for Clock {
//!     fn name(&self) -> &str {
//!         "clock"
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let app = Application::builder().build();
//! app.register(Arc::new(Clock))?;
//! app.init().await?;
//! app.start().await?;
//! app.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod event;
pub mod feeder;
pub mod key;
pub mod logger;
pub mod module;
pub mod observer;
pub mod service;
pub mod tenant;
pub mod tracker;

pub use app::{Application, ApplicationBuilder, CancellationContext, TenantContext};
pub use error::{AppError, AppResult, ErrorKind};
pub use event::{Event, EventType};
pub use feeder::Feeder;
pub use key::InterfaceKey;
pub use logger::{Level, Logger};
pub use module::registry::ModuleRegistry;
pub use module::Module;
pub use observer::{Observer, ObserverId, ObserverRegistry};
pub use service::{ServiceDependency, ServiceEntry, ServiceRegistry};
pub use tenant::{TenantId, TenantOverlay};
pub use tracker::{FieldTracker, TrackedField};

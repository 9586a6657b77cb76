//! A provider module publishes a service under an interface; a consumer
//! module requires that interface (not by name) and receives whichever
//! provider satisfies it.

use async_trait::async_trait;
use ferrous_modular::app::Application;
use ferrous_modular::key::InterfaceKey;
use ferrous_modular::module::{ConsumesServices, Module, ProvidedService, ProvidesServices};
use ferrous_modular::service::ServiceDependency;
use std::sync::Arc;

trait Greeter: Send + Sync {
    fn greet(&self) -> String;
}

struct EnglishGreeter;
impl Greeter for EnglishGreeter {
    fn greet(&self) -> String {
        "hello".to_string()
    }
}

struct GreeterModule;
#[async_trait]
impl Module for GreeterModule {
    fn name(&self) -> &str {
        "greeter"
    }
    fn as_service_provider(&self) -> Option<&dyn ProvidesServices> {
        Some(self)
    }
}
impl ProvidesServices for GreeterModule {
    fn provides(&self) -> Vec<ProvidedService> {
        vec![ProvidedService {
            name: "greeter.default".to_string(),
            description: "a friendly greeter".to_string(),
            interfaces: vec![InterfaceKey::of::<dyn Greeter>()],
            instance: Arc::new(EnglishGreeter) as Arc<dyn std::any::Any + Send + Sync>,
        }]
    }
}

struct FrontDesk;
#[async_trait]
impl Module for FrontDesk {
    fn name(&self) -> &str {
        "front-desk"
    }
    fn as_service_consumer(&self) -> Option<&dyn ConsumesServices> {
        Some(self)
    }
    async fn init(&self, app: &Application) -> ferrous_modular::AppResult<()> {
        let greeter = app.get_service::<EnglishGreeter>("greeter.default")?;
        println!("front desk says: {}", greeter.greet());
        Ok(())
    }
}
impl ConsumesServices for FrontDesk {
    fn requires(&self) -> Vec<ServiceDependency> {
        vec![ServiceDependency {
            name: String::new(),
            required: true,
            match_by_interface: true,
            satisfies_interface_type: Some(InterfaceKey::of::<dyn Greeter>()),
        }]
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let app = Application::builder().build();
    app.register(Arc::new(GreeterModule))?;
    app.register(Arc::new(FrontDesk))?;
    app.init().await?;
    Ok(())
}

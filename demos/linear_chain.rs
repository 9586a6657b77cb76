//! Three modules with a linear declared-dependency chain: `c` depends on
//! `b`, `b` depends on `a`. Prints init order, then stop order.

use async_trait::async_trait;
use ferrous_modular::app::Application;
use ferrous_modular::module::{DependencyAware, Module};
use std::sync::Arc;

struct Chained {
    label: &'static str,
    deps: Vec<&'static str>,
}

#[async_trait]
impl Module for Chained {
    fn name(&self) -> &str {
        self.label
    }

    fn as_dependency_aware(&self) -> Option<&dyn DependencyAware> {
        if self.deps.is_empty() {
            None
        } else {
            Some(self)
        }
    }

    async fn init(&self, _app: &Application) -> ferrous_modular::AppResult<()> {
        println!("init: {}", self.label);
        Ok(())
    }
}

impl DependencyAware for Chained {
    fn dependencies(&self) -> Vec<String> {
        self.deps.iter().map(|s| s.to_string()).collect()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let app = Application::builder().build();
    app.register(Arc::new(Chained { label: "a", deps: vec![] }))?;
    app.register(Arc::new(Chained { label: "b", deps: vec!["a"] }))?;
    app.register(Arc::new(Chained { label: "c", deps: vec!["b"] }))?;

    app.init().await?;
    app.start().await?;
    app.stop().await?;
    Ok(())
}

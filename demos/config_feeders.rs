//! Two feeders at different priorities set the same field; the
//! higher-priority feeder's value wins regardless of registration order.

use ferrous_modular::feeder::{ConfigResult, Feeder};
use ferrous_modular::tracker::{FieldTracker, TrackedField};
use ferrous_modular::Application;
use async_trait::async_trait;
use ferrous_modular::module::Module;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug)]
struct ConstFeeder {
    field: &'static str,
    value: &'static str,
    priority: i64,
    label: &'static str,
}

impl Feeder for ConstFeeder {
    fn feed(&self, target: &mut Value, tracker: &FieldTracker) -> ConfigResult<()> {
        if let Value::Object(map) = target {
            map.insert(self.field.to_string(), Value::String(self.value.to_string()));
            tracker.track_field(
                self.field,
                TrackedField {
                    source_feeder: self.label.to_string(),
                    source_key: self.field.to_string(),
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
        self.label
    }
}

struct MainModule;
#[async_trait]
impl Module for MainModule {
    fn name(&self) -> &str {
        "main"
    }
    async fn init(&self, app: &Application) -> ferrous_modular::AppResult<()> {
        let section = app.get_config_section("_main")?;
        println!("sdk_key = {}", section.get_config()["sdk_key"]);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let app = Application::builder()
        .with_feeder(Arc::new(ConstFeeder {
            field: "sdk_key",
            value: "yaml",
            priority: 50,
            label: "yaml",
        }))
        .with_feeder(Arc::new(ConstFeeder {
            field: "sdk_key",
            value: "env",
            priority: 100,
            label: "env",
        }))
        .with_main_config(serde_json::json!({}))
        .build();

    app.register(Arc::new(MainModule))?;
    app.init().await?;
    Ok(())
}

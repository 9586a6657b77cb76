#![no_main]

use ferrous_modular::config::{ConfigBuilder, SectionTarget};
use ferrous_modular::feeder::{ConfigResult, Feeder};
use ferrous_modular::tracker::FieldTracker;
use libfuzzer_sys::arbitrary::{self, Arbitrary};
use libfuzzer_sys::fuzz_target;
use serde_json::Value;
use std::sync::Arc;

#[derive(Arbitrary, Debug, Clone)]
struct FuzzFeederSpec {
    priority: i8,
    value: String,
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    feeders: Vec<FuzzFeederSpec>,
}

#[derive(Debug)]
struct FuzzFeeder {
    priority: i64,
    value: String,
}

impl Feeder for FuzzFeeder {
    fn feed(&self, target: &mut Value, tracker: &FieldTracker) -> ConfigResult<()> {
        if let Value::Object(map) = target {
            map.insert("field".to_string(), Value::String(self.value.clone()));
            tracker.track_field(
                "field",
                ferrous_modular::tracker::TrackedField {
                    source_feeder: self.name().to_string(),
                    source_key: "field".to_string(),
                    final_value: self.value.clone(),
                },
            );
        }
        Ok(())
    }

    fn priority(&self) -> i64 {
        self.priority
    }

    fn name(&self) -> &str {
        "fuzz-feeder"
    }
}

fuzz_target!(|input: FuzzInput| {
    if input.feeders.len() > 64 {
        return;
    }
    let mut builder = ConfigBuilder::new(Arc::new(FieldTracker::new()));
    let expected_last = input.feeders.iter().enumerate().max_by_key(|(idx, f)| (f.priority, *idx as i64));
    for spec in &input.feeders {
        builder.add_feeder(Arc::new(FuzzFeeder {
            priority: spec.priority as i64,
            value: spec.value.clone(),
        }));
    }
    builder.add_section(SectionTarget::new("_main", serde_json::json!({})));

    // Feeding must never panic regardless of field content.
    builder.feed().unwrap();

    if let Some((_, expected)) = expected_last {
        assert_eq!(
            builder.section("_main").unwrap()["field"],
            Value::String(expected.value.clone())
        );
    }
});

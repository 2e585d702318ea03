//! Schema adapters for older synthesis payload shapes.
//!
//! Adapters run once, in order, on the parsed JSON object before any field
//! checks. Each one rewrites a single legacy shape into the current one and
//! must leave current-shape payloads untouched.

use serde_json::{Map, Value};
use tracing::debug;

/// A single rewrite from a legacy payload shape.
pub trait SchemaAdapter: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Rewrite `root` in place. Returns how many values were changed.
    fn adapt(&self, root: &mut Map<String, Value>) -> usize;
}

/// Older prompts asked for `rationale` on strategic priorities; it is now `why`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RationaleToWhy;

impl SchemaAdapter for RationaleToWhy {
    fn name(&self) -> &'static str {
        "rationale-to-why"
    }

    fn adapt(&self, root: &mut Map<String, Value>) -> usize {
        let Some(Value::Array(priorities)) = root.get_mut("strategic_priorities") else {
            return 0;
        };
        let mut changed = 0;
        for entry in priorities.iter_mut().filter_map(Value::as_object_mut) {
            let Some(rationale) = entry.remove("rationale") else {
                continue;
            };
            let has_why = entry.get("why").is_some_and(|why| !why.is_null());
            if !has_why {
                entry.insert("why".to_string(), rationale);
                changed += 1;
            }
        }
        changed
    }
}

/// The adapters applied by the response validator, oldest shape first.
pub fn default_adapters() -> Vec<Box<dyn SchemaAdapter>> {
    vec![Box::new(RationaleToWhy)]
}

/// Run every adapter once over `root`.
pub fn apply_adapters(adapters: &[Box<dyn SchemaAdapter>], root: &mut Map<String, Value>) {
    for adapter in adapters {
        let changed = adapter.adapt(root);
        if changed > 0 {
            debug!(adapter = adapter.name(), changed, "Migrated legacy synthesis fields");
        }
    }
}

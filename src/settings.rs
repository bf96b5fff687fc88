use crate::storage::KeyValueStore;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MONOCHROME_KEY: &str = "monochrome";
pub const HIDE_ENGAGEMENT_KEY: &str = "hideEngagement";

/// Global toggles shared by every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_enabled")]
    pub monochrome: bool,
    #[serde(default = "default_enabled")]
    pub hide_engagement: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            monochrome: true,
            hide_engagement: true,
        }
    }
}

impl Settings {
    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Self {
        Self {
            monochrome: read_flag(store, MONOCHROME_KEY),
            hide_engagement: read_flag(store, HIDE_ENGAGEMENT_KEY),
        }
    }

    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> Result<()> {
        store.set(MONOCHROME_KEY, Value::Bool(self.monochrome))?;
        store.set(HIDE_ENGAGEMENT_KEY, Value::Bool(self.hide_engagement))?;
        Ok(())
    }
}

// Only an explicit `false` turns a flag off.
fn read_flag<S: KeyValueStore + ?Sized>(store: &S, key: &str) -> bool {
    match store.get(key) {
        None | Some(Value::Null) => true,
        Some(Value::Bool(value)) => value,
        Some(other) => {
            tracing::warn!(key, value = %other, "ignoring non-boolean setting");
            true
        }
    }
}

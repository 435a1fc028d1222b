//! Serializable snapshot of a scanned unit.
//!
//! The manifest is what the surrounding tooling (daemon, dashboard)
//! consumes: every subscription with its resolved configuration, in
//! registry order. Rendering is deterministic so manifests diff cleanly.

use serde::Serialize;

use crate::registry::ResourceRegistry;
use crate::resource::Subscription;

#[derive(Debug, Serialize)]
pub struct Manifest {
    pub subscriptions: Vec<Subscription>,
}

impl Manifest {
    pub fn from_registry(registry: &ResourceRegistry) -> Self {
        Self {
            subscriptions: registry.subscriptions().into_iter().cloned().collect(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

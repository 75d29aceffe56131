//! Concurrent pack store.
//!
//! Installation is validate-then-swap: a candidate pack is fully prepared
//! (static validation plus derived-field ordering) before it replaces the
//! active entry under its id, in one atomic map update. A candidate that
//! fails validation leaves the previously active pack untouched, so
//! readers never observe a half-installed or invalid pack.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use quill_core::pack::Pack;
use quill_engine::{EvalError, PreparedPack};

/// Thread-safe registry of prepared packs, keyed by pack id.
#[derive(Debug, Default)]
pub struct PackStore {
    packs: RwLock<HashMap<String, Arc<PreparedPack>>>,
}

impl PackStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the candidate and, only on success, swap it in under its
    /// pack id. Returns the prepared pack that is now active.
    ///
    /// On validation failure the store is unchanged and the error carries
    /// the full report.
    pub fn install(&self, pack: Pack) -> Result<Arc<PreparedPack>, EvalError> {
        let pack_id = pack.id.clone();
        let prepared = match PreparedPack::prepare(pack) {
            Ok(prepared) => Arc::new(prepared),
            Err(err) => {
                warn!(pack_id = %pack_id, %err, "pack installation rejected");
                return Err(err);
            }
        };

        let previous = {
            let mut packs = self.packs.write().expect("pack store lock poisoned");
            packs.insert(pack_id.clone(), Arc::clone(&prepared))
        };
        match previous {
            Some(old) => info!(
                pack_id = %pack_id,
                old_fingerprint = %old.fingerprint(),
                new_fingerprint = %prepared.fingerprint(),
                "pack replaced"
            ),
            None => info!(
                pack_id = %pack_id,
                fingerprint = %prepared.fingerprint(),
                "pack installed"
            ),
        }
        Ok(prepared)
    }

    /// The active prepared pack for an id, if any. The returned handle
    /// stays valid across later swaps.
    pub fn get(&self, pack_id: &str) -> Option<Arc<PreparedPack>> {
        self.packs
            .read()
            .expect("pack store lock poisoned")
            .get(pack_id)
            .cloned()
    }

    /// Remove a pack. Existing handles remain usable.
    pub fn remove(&self, pack_id: &str) -> Option<Arc<PreparedPack>> {
        let removed = self
            .packs
            .write()
            .expect("pack store lock poisoned")
            .remove(pack_id);
        if removed.is_some() {
            info!(pack_id = %pack_id, "pack removed");
        }
        removed
    }

    /// Installed pack ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .packs
            .read()
            .expect("pack store lock poisoned")
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}

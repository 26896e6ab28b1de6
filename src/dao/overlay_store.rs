//! In-memory holder for the operator-edited configuration overlay.

use tokio::sync::RwLock;

use crate::dao::models::ConfigurationOverlay;

/// Holds the mutable overlay. Loading never fails: before any edit the store
/// answers with the default empty overlay at version 0.
#[derive(Debug)]
pub struct ConfigurationOverlayStore {
    current: RwLock<ConfigurationOverlay>,
}

impl ConfigurationOverlayStore {
    /// Create the store, seeded from whatever the gateway recovered from disk.
    pub fn new(initial: ConfigurationOverlay) -> Self {
        Self {
            current: RwLock::new(initial),
        }
    }

    /// Snapshot of the current overlay.
    pub async fn load(&self) -> ConfigurationOverlay {
        self.current.read().await.clone()
    }

    /// Swap in a new overlay. Called by the gateway after the durable write.
    pub(crate) async fn install(&self, overlay: ConfigurationOverlay) {
        let mut guard = self.current.write().await;
        *guard = overlay;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_store_loads_the_default_overlay() {
        let store = ConfigurationOverlayStore::new(ConfigurationOverlay::default());
        let overlay = store.load().await;
        assert_eq!(overlay.version, 0);
        assert!(overlay.days.is_empty());
        assert!(overlay.last_modified_by.is_none());
    }
}

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use recordmap::RecordMap;

use crate::config::Configuration;

/// What every node of a render pass can see: the merged configuration and
/// the document. Never mutated once published.
#[derive(Debug)]
pub struct RenderContext {
    pub config: Configuration,
    pub record_map: Arc<RecordMap>,
    /// Publication counter of the provider that produced this snapshot.
    pub generation: u64,
}

/// Shared, read-only handle to one published snapshot.
/// Cloning is cheap; all clones see the same snapshot.
#[derive(Debug, Clone)]
pub struct ContextHandle(Arc<RenderContext>);

impl ContextHandle {
    pub fn config(&self) -> &Configuration {
        &self.0.config
    }

    pub fn record_map(&self) -> &RecordMap {
        &self.0.record_map
    }

    /// Another owner of the snapshot's document, for republishing it.
    pub fn shared_record_map(&self) -> Arc<RecordMap> {
        Arc::clone(&self.0.record_map)
    }

    pub fn generation(&self) -> u64 {
        self.0.generation
    }

    /// True when both handles point at the same snapshot.
    pub fn same_snapshot(&self, other: &ContextHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Publish a standalone snapshot, outside any provider.
pub fn publish(config: Configuration, record_map: Arc<RecordMap>) -> ContextHandle {
    ContextHandle(Arc::new(RenderContext {
        config,
        record_map,
        generation: 0,
    }))
}

/// Holder of the latest snapshot for one render tree.
///
/// The root publishes, readers pull with [`ContextProvider::current`]. A pass
/// keeps whatever handle it pulled at its start, so a publish during the pass
/// never mixes old and new configuration within it.
#[derive(Debug)]
pub struct ContextProvider {
    current: RwLock<ContextHandle>,
    generation: AtomicU64,
}

impl ContextProvider {
    /// Create a provider with its first snapshot already published.
    pub fn new(config: Configuration, record_map: Arc<RecordMap>) -> Self {
        ContextProvider {
            current: RwLock::new(ContextHandle(Arc::new(RenderContext {
                config,
                record_map,
                generation: 1,
            }))),
            generation: AtomicU64::new(1),
        }
    }

    /// Replace the published snapshot and return a handle to the new one.
    pub fn publish(&self, config: Configuration, record_map: Arc<RecordMap>) -> ContextHandle {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = ContextHandle(Arc::new(RenderContext {
            config,
            record_map,
            generation,
        }));
        *self.current.write() = handle.clone();
        tracing::debug!(generation, "published render context");
        handle
    }

    /// The latest snapshot.
    pub fn current(&self) -> ContextHandle {
        self.current.read().clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

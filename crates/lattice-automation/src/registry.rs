//! Cross-generation cache from data item to a client-exposed proxy.
//!
//! When a peer is handed to an automation client, the client receives a
//! [`ProxyHandle`]. The collection that owns the peer remembers the handle
//! against the peer's item, so that after the peer has dropped out of the
//! current identity map it can still be found again the next time an equal item
//! shows up. Handles are generation-tagged slot keys: once the proxy is
//! released, the key simply stops resolving.

use lattice_automation_core::logging::targets;
use slotmap::new_key_type;

use crate::identity_map::IdentityMap;
use crate::item::Item;
use crate::peer::PeerId;

new_key_type! {
    /// A weak, generation-checked handle to a client-exposed proxy.
    pub struct ProxyHandle;
}

/// Answers what a proxy handle points at right now.
///
/// Returns the item peer behind a live handle together with that peer's
/// current item, or `None` if the handle is dead or no longer names an item
/// peer whose item is still alive.
pub trait ProxyLookup {
    /// Resolve a handle.
    fn lookup(&self, handle: ProxyHandle) -> Option<(PeerId, Item)>;
}

impl<F> ProxyLookup for F
where
    F: Fn(ProxyHandle) -> Option<(PeerId, Item)>,
{
    fn lookup(&self, handle: ProxyHandle) -> Option<(PeerId, Item)> {
        self(handle)
    }
}

/// Mapping from data item to the proxy handle last exposed for it.
#[derive(Debug, Default)]
pub struct WeakProxyRegistry {
    entries: IdentityMap<ProxyHandle>,
}

impl WeakProxyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the handle exposed for an item.
    ///
    /// An existing entry for an equal item is kept; returns whether the handle
    /// was stored.
    pub fn remember(&mut self, item: Item, handle: ProxyHandle) -> bool {
        if self.entries.contains(&item) {
            return false;
        }
        self.entries.insert(item, handle)
    }

    /// Resolve an item to the peer behind its remembered proxy.
    ///
    /// A dead handle, or one that now points at a peer for a different item, is
    /// purged on the spot.
    pub fn resolve(&mut self, item: &Item, lookup: &impl ProxyLookup) -> Option<PeerId> {
        let handle = *self.entries.get(item)?;
        match lookup.lookup(handle) {
            Some((peer, current)) if current == *item => Some(peer),
            _ => {
                self.entries.remove(item);
                tracing::trace!(target: targets::REGISTRY, ?item, "stale registry entry dropped");
                None
            }
        }
    }

    /// Drop every entry whose handle no longer resolves to a matching peer.
    ///
    /// Returns the number of entries removed. Never fails.
    pub fn purge(&mut self, lookup: &impl ProxyLookup) -> usize {
        let removed = self.entries.retain(|item, handle| {
            lookup
                .lookup(*handle)
                .is_some_and(|(_, current)| current == *item)
        });
        if removed > 0 {
            tracing::debug!(target: targets::REGISTRY, removed, remaining = self.entries.len(), "registry purged");
        }
        removed
    }

    /// Number of remembered entries, dead or alive.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The handle remembered for an item, without checking it.
    pub fn handle_for(&self, item: &Item) -> Option<ProxyHandle> {
        self.entries.get(item).copied()
    }
}

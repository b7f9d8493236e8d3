//! The automation engine: peer arena, client proxies and deferred work.
//!
//! [`AutomationEngine`] owns every peer it creates. Clients and hosts refer to
//! peers by [`PeerId`] and to client-exposed proxies by [`ProxyHandle`]; both
//! are generation-tagged, so a discarded peer or released proxy never aliases a
//! newer one.
//!
//! Peer lifetime follows the owning collection's identity map. A peer that
//! drops out of the map during a rebuild is *detached*; it stays in the arena
//! only while a client still holds a live proxy for it, so the proxy registry
//! can hand the same identity back if its item returns. Releasing the last
//! proxy of a detached peer discards it.
//!
//! The engine is single-threaded. All host callbacks happen on the thread that
//! owns the engine.

use std::rc::Rc;

use lattice_automation_core::logging::targets;
use lattice_automation_core::{
    Dispatcher, OperationId, automation_debug, automation_trace, run_turn,
};
use slotmap::{SecondaryMap, SlotMap};

use crate::config::EngineConfig;
use crate::error::{AutomationError, Result};
use crate::host::{GroupRef, ItemsControlHost};
use crate::item::{Item, ItemHold};
use crate::patterns::PatternKind;
use crate::peer::{CollectionKind, CollectionState, PeerId, PeerKind, PeerNode, PeerProfile};
use crate::registry::ProxyHandle;

/// Peer identity, caching and realization engine for items controls.
pub struct AutomationEngine {
    pub(crate) config: EngineConfig,
    pub(crate) peers: SlotMap<PeerId, PeerNode>,
    pub(crate) collections: SecondaryMap<PeerId, CollectionState>,
    pub(crate) proxies: SlotMap<ProxyHandle, PeerId>,
    pub(crate) dispatcher: Dispatcher<AutomationEngine>,
    /// Queued bring-into-view retries, one per item peer.
    pub(crate) pending_realize: SecondaryMap<PeerId, OperationId>,
}

/// What a proxy handle refers to right now, as seen by a registry.
pub(crate) fn proxy_target(
    proxies: &SlotMap<ProxyHandle, PeerId>,
    peers: &SlotMap<PeerId, PeerNode>,
    handle: ProxyHandle,
) -> Option<(PeerId, Item)> {
    let peer = *proxies.get(handle)?;
    let node = peers.get(peer)?;
    if !node.kind.is_item() {
        return None;
    }
    Some((peer, node.current_item()?))
}

impl AutomationEngine {
    /// Create an engine with the default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with a custom configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        automation_debug!(?config, "automation engine created");
        Self {
            config,
            peers: SlotMap::with_key(),
            collections: SecondaryMap::new(),
            proxies: SlotMap::with_key(),
            dispatcher: Dispatcher::new(),
            pending_realize: SecondaryMap::new(),
        }
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =========================================================================
    // Peers
    // =========================================================================

    /// Create the peer of an items control.
    pub fn create_collection_peer(
        &mut self,
        host: Rc<dyn ItemsControlHost>,
        kind: CollectionKind,
    ) -> PeerId {
        let id = self.peers.insert(PeerNode::collection(kind));
        self.collections
            .insert(id, CollectionState::new(host, kind.item_kind()));
        automation_debug!(?id, ?kind, "collection peer created");
        id
    }

    /// Discard a collection peer and every peer it caches.
    ///
    /// Item peers still held by a client proxy stay resolvable until the proxy
    /// is released.
    pub fn remove_collection_peer(&mut self, collection: PeerId) -> Result<()> {
        let node = self.node(collection)?;
        if !node.kind.is_collection() {
            return Err(AutomationError::invalid_operation("not a collection peer"));
        }
        self.discard_peer(collection);
        Ok(())
    }

    /// Check whether a peer id is still live.
    pub fn contains_peer(&self, peer: PeerId) -> bool {
        self.peers.contains_key(peer)
    }

    /// Number of peers in the arena.
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// What kind of peer this is.
    pub fn kind(&self, peer: PeerId) -> Result<PeerKind> {
        Ok(self.node(peer)?.kind)
    }

    /// The static profile of a peer.
    pub fn profile(&self, peer: PeerId) -> Result<PeerProfile> {
        Ok(self.node(peer)?.kind.profile())
    }

    /// The peer this one is listed under.
    pub fn parent(&self, peer: PeerId) -> Result<Option<PeerId>> {
        Ok(self.node(peer)?.parent)
    }

    /// The data item a peer stands for, if it has one and it is still alive.
    pub fn item(&self, peer: PeerId) -> Result<Option<Item>> {
        Ok(self.node(peer)?.current_item())
    }

    /// The group a group peer stands for.
    pub fn group(&self, peer: PeerId) -> Result<Option<GroupRef>> {
        Ok(self.node(peer)?.group.clone())
    }

    /// Whether the peer is listed in its owner's current identity map.
    pub fn is_attached(&self, peer: PeerId) -> Result<bool> {
        Ok(self.node(peer)?.attached)
    }

    /// Look up the current peer cached for an item in a collection.
    pub fn item_peer(&self, collection: PeerId, item: &Item) -> Result<Option<PeerId>> {
        Ok(self.state(collection)?.item_peers.get(item).copied())
    }

    /// Number of entries in a collection's current identity map.
    pub fn identity_map_len(&self, collection: PeerId) -> Result<usize> {
        Ok(self.state(collection)?.item_peers.len())
    }

    /// Number of entries in a collection's proxy registry.
    pub fn registry_len(&self, collection: PeerId) -> Result<usize> {
        Ok(self.state(collection)?.registry.len())
    }

    /// Sweep dead entries out of a collection's proxy registry.
    pub fn purge_registry(&mut self, collection: PeerId) -> Result<usize> {
        let proxies = &self.proxies;
        let peers = &self.peers;
        let state = self
            .collections
            .get_mut(collection)
            .ok_or(AutomationError::InvalidPeer(collection))?;
        let lookup = |handle| proxy_target(proxies, peers, handle);
        Ok(state.registry.purge(&lookup))
    }

    // =========================================================================
    // Client proxies
    // =========================================================================

    /// Expose a peer to an automation client.
    ///
    /// Returns the peer's proxy handle, creating it on first exposure. Item
    /// peers are remembered in their owner's registry at this point so their
    /// identity survives eviction from the identity map.
    pub fn provider_for(&mut self, peer: PeerId) -> Result<ProxyHandle> {
        let node = self.node(peer)?;
        if let Some(handle) = node.proxy.filter(|h| self.proxies.contains_key(*h)) {
            return Ok(handle);
        }

        let handle = self.proxies.insert(peer);
        let node = self.node_mut(peer)?;
        node.proxy = Some(handle);
        let owner = node.owner;
        let item = node
            .current_item()
            .filter(|_| node.kind.is_item());

        if let (Some(owner), Some(item)) = (owner, item) {
            let proxies = &self.proxies;
            let peers = &self.peers;
            if let Some(state) = self.collections.get_mut(owner) {
                let lookup = |h| proxy_target(proxies, peers, h);
                // Drops an entry left behind by an earlier, released proxy.
                state.registry.resolve(&item, &lookup);
                state.registry.remember(item, handle);
            }
        }
        tracing::trace!(target: targets::REGISTRY, ?peer, ?handle, "peer exposed");
        Ok(handle)
    }

    /// The peer behind a proxy handle, if the handle is still live.
    pub fn peer_from_proxy(&self, handle: ProxyHandle) -> Option<PeerId> {
        self.proxies
            .get(handle)
            .copied()
            .filter(|peer| self.peers.contains_key(*peer))
    }

    /// Release a client proxy.
    ///
    /// A detached peer whose last proxy goes away is discarded. Returns whether
    /// the handle was live.
    pub fn release_proxy(&mut self, handle: ProxyHandle) -> bool {
        let Some(peer) = self.proxies.remove(handle) else {
            return false;
        };
        let detached = match self.peers.get_mut(peer) {
            Some(node) => {
                if node.proxy == Some(handle) {
                    node.proxy = None;
                }
                !node.attached
            }
            None => false,
        };
        if detached {
            tracing::trace!(target: targets::REGISTRY, ?peer, "detached peer released");
            self.discard_peer(peer);
        }
        true
    }

    // =========================================================================
    // Deferred work
    // =========================================================================

    /// Run one dispatcher turn: every operation queued before this call.
    ///
    /// Hosts call this between frames. Returns the number of operations run.
    pub fn run_deferred(&mut self) -> usize {
        run_turn(self, |engine| &mut engine.dispatcher)
    }

    /// Number of operations waiting for [`run_deferred`](Self::run_deferred).
    pub fn pending_operations(&self) -> usize {
        self.dispatcher.pending_count()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    pub(crate) fn node(&self, peer: PeerId) -> Result<&PeerNode> {
        self.peers.get(peer).ok_or(AutomationError::InvalidPeer(peer))
    }

    pub(crate) fn node_mut(&mut self, peer: PeerId) -> Result<&mut PeerNode> {
        self.peers
            .get_mut(peer)
            .ok_or(AutomationError::InvalidPeer(peer))
    }

    pub(crate) fn state(&self, peer: PeerId) -> Result<&CollectionState> {
        self.node(peer)?;
        self.collections
            .get(peer)
            .ok_or_else(|| AutomationError::invalid_operation("peer has no item collection"))
    }

    /// The collection state that caches a peer.
    pub(crate) fn owner_state(&self, peer: PeerId) -> Option<&CollectionState> {
        let owner = self.peers.get(peer)?.owner?;
        self.collections.get(owner)
    }

    pub(crate) fn owner_host(&self, peer: PeerId) -> Option<Rc<dyn ItemsControlHost>> {
        self.owner_state(peer).map(|state| Rc::clone(&state.host))
    }

    /// Fail unless the peer's profile lists a pattern.
    pub(crate) fn require_pattern(&self, peer: PeerId, pattern: PatternKind) -> Result<&PeerNode> {
        let node = self.node(peer)?;
        if node.kind.profile().patterns.supports(pattern) {
            Ok(node)
        } else {
            Err(AutomationError::PatternNotSupported { peer, pattern })
        }
    }

    /// The live item of an item peer, or `NotAvailable` once it is collected.
    pub(crate) fn live_item(&self, peer: PeerId) -> Result<Item> {
        self.node(peer)?
            .current_item()
            .ok_or(AutomationError::NotAvailable)
    }

    /// Find the peer for an item in `owner`'s caches, or make one.
    ///
    /// Lookup order is the reusable map (the previous generation while a
    /// rebuild runs, the current one otherwise), then the proxy registry, then
    /// a new peer. A peer found in the registry has its ancestor flag cleared
    /// and its children marked stale, since its place in the tree may have
    /// moved while it was detached.
    pub(crate) fn find_or_create_item_peer(
        &mut self,
        owner: PeerId,
        parent: PeerId,
        item: &Item,
    ) -> Result<PeerId> {
        let state = self
            .collections
            .get(owner)
            .ok_or(AutomationError::InvalidPeer(owner))?;
        let item_kind = state.item_kind;

        let mut found = state
            .reusable_item_peer(item)
            .filter(|id| self.peers.contains_key(*id));

        if found.is_none() && self.config.reuse_proxied_peers {
            let proxies = &self.proxies;
            let peers = &self.peers;
            if let Some(state) = self.collections.get_mut(owner) {
                let lookup = |h| proxy_target(proxies, peers, h);
                found = state.registry.resolve(item, &lookup);
            }
            if let Some(peer) = found {
                tracing::debug!(target: targets::REGISTRY, ?peer, ?item, "peer resurrected from registry");
                self.set_ancestors_invalid(peer, false)?;
                self.node_mut(peer)?.children_valid = false;
            }
        }

        let peer = match found {
            Some(peer) => {
                let node = self.node_mut(peer)?;
                // Adopt the instance seen now; equal is not necessarily identical.
                node.item = Some(ItemHold::new(item.clone()));
                node.parent = Some(parent);
                node.owner = Some(owner);
                node.attached = true;
                peer
            }
            None => {
                let peer = self
                    .peers
                    .insert(PeerNode::item(item_kind, item.clone(), owner, parent));
                tracing::trace!(target: targets::REBUILD, ?peer, ?item, "item peer created");
                peer
            }
        };

        // Resolving the wrapper rebinds its events source to this peer.
        self.wrapper(peer);
        Ok(peer)
    }

    /// Find or create an item peer outside a rebuild and record it in the
    /// owner's current map.
    pub(crate) fn item_peer_on_demand(&mut self, owner: PeerId, item: &Item) -> Result<PeerId> {
        if let Some(peer) = self
            .collections
            .get(owner)
            .and_then(|state| state.item_peers.get(item).copied())
            .filter(|id| self.peers.contains_key(*id))
        {
            return Ok(peer);
        }
        let parent = self.on_demand_parent(owner, item);
        let peer = self.find_or_create_item_peer(owner, parent, item)?;
        if let Some(state) = self.collections.get_mut(owner)
            && !state.item_peers.contains(item)
        {
            state.item_peers.insert(item.clone(), peer);
        }
        Ok(peer)
    }

    /// Take a peer out of its owner's current generation.
    pub(crate) fn detach_peer(&mut self, peer: PeerId) {
        let Some(node) = self.peers.get_mut(peer) else {
            return;
        };
        node.attached = false;
        node.parent = None;
        let proxied = node.proxy.is_some_and(|h| self.proxies.contains_key(h));
        if proxied {
            tracing::trace!(target: targets::REBUILD, ?peer, "peer detached, kept for its proxy");
        } else {
            self.discard_peer(peer);
        }
    }

    /// Remove a peer from the arena, with any collection it owns.
    pub(crate) fn discard_peer(&mut self, peer: PeerId) {
        let Some(node) = self.peers.remove(peer) else {
            return;
        };
        if let Some(handle) = node.proxy {
            self.proxies.remove(handle);
        }
        if let Some(state) = self.collections.remove(peer) {
            let owned: Vec<PeerId> = state
                .item_peers
                .values()
                .chain(state.group_peers.values())
                .copied()
                .filter(|id| self.peers.get(*id).is_some_and(|n| n.owner == Some(peer)))
                .collect();
            for id in owned {
                self.detach_peer(id);
            }
        }
        automation_trace!(?peer, "peer discarded");
    }
}

impl Default for AutomationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AutomationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutomationEngine")
            .field("peers", &self.peers.len())
            .field("collections", &self.collections.len())
            .field("proxies", &self.proxies.len())
            .field("pending", &self.dispatcher.pending_count())
            .finish()
    }
}

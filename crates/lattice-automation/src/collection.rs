//! Child list rebuilds for collection and group peers.
//!
//! A rebuild walks the host's current view of the collection and maps every
//! entry to a peer, reusing peers by item identity:
//!
//! 1. The current identity maps move into a reusable slot and fresh maps take
//!    their place.
//! 2. The source is picked: the items host's containers when grouping (groups
//!    are real visuals), realized containers when virtualizing, the logical
//!    items otherwise.
//! 3. Each item is looked up in the previous map, then in the proxy registry,
//!    and only then gets a new peer.
//! 4. Peers left in the previous map without a counterpart in the new one are
//!    detached when the rebuild ends, however it ends.
//!
//! Grouped rebuilds rebuild every group peer in the same pass, so group
//! children can still claim item peers from the previous generation.

use std::collections::HashSet;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use lattice_automation_core::PerfSpan;
use lattice_automation_core::logging::{span_names, targets};

use crate::engine::AutomationEngine;
use crate::error::{AutomationError, Result};
use crate::host::{ContainerContent, ContainerId, GroupMember, GroupRef, ItemsControlHost};
use crate::identity_map::IdentityMap;
use crate::item::Item;
use crate::peer::{PeerChild, PeerId, PeerKind, PeerNode, ReusablePeers};

/// Keeps a collection's previous-generation maps reachable for one rebuild.
///
/// Dropping the scope releases the maps and detaches every peer that did not
/// make it into the new generation.
pub(crate) struct ReusableScope<'a> {
    engine: &'a mut AutomationEngine,
    collection: PeerId,
}

impl<'a> ReusableScope<'a> {
    pub(crate) fn enter(engine: &'a mut AutomationEngine, collection: PeerId) -> Result<Self> {
        let state = engine
            .collections
            .get_mut(collection)
            .ok_or(AutomationError::InvalidPeer(collection))?;
        if state.reusable.is_some() {
            return Err(AutomationError::invalid_operation(
                "collection is already rebuilding its children",
            ));
        }
        state.reusable = Some(ReusablePeers {
            items: mem::take(&mut state.item_peers),
            groups: mem::take(&mut state.group_peers),
        });
        Ok(Self { engine, collection })
    }
}

impl Deref for ReusableScope<'_> {
    type Target = AutomationEngine;

    fn deref(&self) -> &AutomationEngine {
        self.engine
    }
}

impl DerefMut for ReusableScope<'_> {
    fn deref_mut(&mut self) -> &mut AutomationEngine {
        self.engine
    }
}

impl Drop for ReusableScope<'_> {
    fn drop(&mut self) {
        self.engine.release_reusable(self.collection);
    }
}

/// One entry of a rebuild source.
enum SourceEntry {
    Item(Item),
    Group(GroupRef),
}

fn resolve_containers(
    host: &dyn ItemsControlHost,
    containers: Vec<ContainerId>,
) -> Vec<SourceEntry> {
    containers
        .into_iter()
        .filter_map(|container| match host.item_from_container(container) {
            ContainerContent::Item(item) => Some(SourceEntry::Item(item)),
            ContainerContent::Group(group) => Some(SourceEntry::Group(group)),
            ContainerContent::Unset => {
                tracing::trace!(target: targets::REBUILD, ?container, "unmapped container skipped");
                None
            }
        })
        .collect()
}

fn collection_source(host: &dyn ItemsControlHost) -> Vec<SourceEntry> {
    if host.is_grouping() {
        match host.items_host_children() {
            Some(containers) => resolve_containers(host, containers),
            None if !host.is_virtualizing() => {
                host.groups().into_iter().map(SourceEntry::Group).collect()
            }
            None => Vec::new(),
        }
    } else if host.is_virtualizing() {
        let containers = host.items_host_children().unwrap_or_default();
        resolve_containers(host, containers)
            .into_iter()
            .filter(|entry| matches!(entry, SourceEntry::Item(_)))
            .collect()
    } else {
        host.items().into_iter().map(SourceEntry::Item).collect()
    }
}

impl AutomationEngine {
    /// The children of a peer, rebuilding them first if they are stale.
    ///
    /// Collection and group peers return their cached list while
    /// `children_valid` holds. Item peers answer from their wrapper (see
    /// [`realize`](Self::realize)).
    pub fn children(&mut self, peer: PeerId) -> Result<Vec<PeerChild>> {
        let node = self.node(peer)?;
        match node.kind {
            PeerKind::Collection(_) | PeerKind::Group => {
                if !node.children_valid {
                    self.rebuild_children(peer)?;
                }
                Ok(self.node(peer)?.children.clone())
            }
            PeerKind::Item(_) => self.item_children(peer),
        }
    }

    /// The children of a peer that are engine peers.
    pub fn child_peers(&mut self, peer: PeerId) -> Result<Vec<PeerId>> {
        Ok(self
            .children(peer)?
            .iter()
            .filter_map(PeerChild::peer)
            .collect())
    }

    /// Rebuild a peer's children now, whatever their validity.
    pub fn rebuild_children(&mut self, peer: PeerId) -> Result<()> {
        match self.node(peer)?.kind {
            PeerKind::Group => self.rebuild_group(peer),
            PeerKind::Collection(_) => self.rebuild_collection(peer),
            PeerKind::Item(_) => {
                self.node_mut(peer)?.children_valid = false;
                self.item_children(peer).map(|_| ())
            }
        }
    }

    /// Rebuild the child list of a peer that owns a collection state.
    pub(crate) fn rebuild_collection(&mut self, collection: PeerId) -> Result<()> {
        let _perf = PerfSpan::new(span_names::REBUILD);
        let host = Rc::clone(&self.state(collection)?.host);
        let grouping = host.is_grouping();

        let children = {
            let mut scope = ReusableScope::enter(self, collection)?;
            let source = collection_source(host.as_ref());
            scope.attach_entries(collection, collection, source, grouping)?
        };

        let count = children.len();
        let node = self.node_mut(collection)?;
        node.children = children;
        node.children_valid = true;

        if self.config.purge_after_rebuild {
            self.purge_registry(collection)?;
        }
        tracing::debug!(
            target: targets::REBUILD,
            ?collection,
            children = count,
            cached = self.state(collection)?.item_peers.len(),
            "children rebuilt"
        );
        Ok(())
    }

    /// Rebuild a group peer's children against its owner's caches.
    ///
    /// Inside a collection rebuild the enclosing [`ReusableScope`] handles
    /// eviction. A group rebuilt on its own evicts the peers it no longer
    /// lists and purges the owner's registry itself.
    pub(crate) fn rebuild_group(&mut self, group_peer: PeerId) -> Result<()> {
        let node = self.node(group_peer)?;
        let owner = node.owner.ok_or(AutomationError::InvalidPeer(group_peer))?;
        let group = node
            .group
            .clone()
            .ok_or_else(|| AutomationError::invalid_operation("not a group peer"))?;
        let previous: Vec<PeerId> = node.child_peers().collect();
        let state = self.state(owner)?;
        let host = Rc::clone(&state.host);
        let standalone = state.reusable.is_none();

        let source = match host.group_host_children(&group) {
            Some(containers) => resolve_containers(host.as_ref(), containers),
            None if !host.is_virtualizing() => group
                .members()
                .into_iter()
                .map(|member| match member {
                    GroupMember::Group(group) => SourceEntry::Group(group),
                    GroupMember::Item(item) => SourceEntry::Item(item),
                })
                .collect(),
            None => Vec::new(),
        };

        let children = self.attach_entries(owner, group_peer, source, true)?;
        let kept: HashSet<PeerId> = children.iter().filter_map(PeerChild::peer).collect();
        let node = self.node_mut(group_peer)?;
        node.children = children;
        node.children_valid = true;

        if standalone {
            let stale: Vec<PeerId> = previous
                .into_iter()
                .filter(|peer| !kept.contains(peer))
                .filter(|peer| {
                    self.peers
                        .get(*peer)
                        .is_some_and(|node| node.parent == Some(group_peer))
                })
                .collect();
            if !stale.is_empty() {
                tracing::debug!(target: targets::REBUILD, ?group_peer, evicted = stale.len(), "group members released");
            }
            for peer in stale {
                self.evict_cached(owner, peer);
            }
            if self.config.purge_after_rebuild {
                self.purge_registry(owner)?;
            }
        }
        Ok(())
    }

    /// Drop a peer, and the group members under it, from `owner`'s current
    /// maps and detach them.
    fn evict_cached(&mut self, owner: PeerId, peer: PeerId) {
        let Some(node) = self.peers.get(peer) else {
            return;
        };
        let members: Vec<PeerId> = match node.kind {
            PeerKind::Group => node
                .child_peers()
                .filter(|child| {
                    self.peers
                        .get(*child)
                        .is_some_and(|n| n.parent == Some(peer))
                })
                .collect(),
            _ => Vec::new(),
        };
        for member in members {
            self.evict_cached(owner, member);
        }
        if let Some(state) = self.collections.get_mut(owner) {
            state.item_peers.retain(|_, id| *id != peer);
            state.group_peers.retain(|_, id| *id != peer);
        }
        self.detach_peer(peer);
    }

    /// The peer that already lists `item` under a different group, if any.
    ///
    /// During a collection rebuild any entry in the new map was claimed by an
    /// earlier group. Outside one, an item belongs to the live group peer it
    /// is parented to.
    fn claimed_elsewhere(&self, owner: PeerId, parent: PeerId, item: &Item) -> Option<PeerId> {
        let state = self.collections.get(owner)?;
        let claimant = state.item_peers.get(item).copied()?;
        if state.reusable.is_some() {
            return Some(claimant);
        }
        let claimant_parent = self.peers.get(claimant)?.parent?;
        let live_group = self
            .peers
            .get(claimant_parent)
            .is_some_and(|n| n.kind == PeerKind::Group && n.attached);
        (claimant_parent != parent && live_group).then_some(claimant)
    }

    fn attach_entries(
        &mut self,
        owner: PeerId,
        parent: PeerId,
        source: Vec<SourceEntry>,
        descend_groups: bool,
    ) -> Result<Vec<PeerChild>> {
        let mut seen_items = IdentityMap::new();
        let mut seen_groups = IdentityMap::new();
        let mut children = Vec::with_capacity(source.len());

        for entry in source {
            match entry {
                SourceEntry::Item(item) => {
                    if let Some(peer) = self.attach_item(owner, parent, item, &mut seen_items)? {
                        children.push(PeerChild::Peer(peer));
                    }
                }
                SourceEntry::Group(group) => {
                    if let Some(peer) = self.attach_group(owner, parent, group, &mut seen_groups)? {
                        if descend_groups {
                            self.rebuild_group(peer)?;
                        }
                        children.push(PeerChild::Peer(peer));
                    }
                }
            }
        }
        Ok(children)
    }

    fn attach_item(
        &mut self,
        owner: PeerId,
        parent: PeerId,
        item: Item,
        seen: &mut IdentityMap<()>,
    ) -> Result<Option<PeerId>> {
        if seen.contains(&item) {
            tracing::trace!(target: targets::REBUILD, ?item, "duplicate item skipped");
            return Ok(None);
        }
        seen.insert(item.clone(), ());

        if !self.collections.contains_key(owner) {
            return Err(AutomationError::InvalidPeer(owner));
        }
        if let Some(claimant) = self.claimed_elsewhere(owner, parent, &item) {
            tracing::trace!(target: targets::REBUILD, ?item, ?claimant, "item listed by another group");
            return Ok(None);
        }

        let peer = self.find_or_create_item_peer(owner, parent, &item)?;
        if let Some(state) = self.collections.get_mut(owner)
            && !state.item_peers.contains(&item)
        {
            state.item_peers.insert(item, peer);
        }
        Ok(Some(peer))
    }

    fn attach_group(
        &mut self,
        owner: PeerId,
        parent: PeerId,
        group: GroupRef,
        seen: &mut IdentityMap<()>,
    ) -> Result<Option<PeerId>> {
        let identity = group.identity();
        if seen.contains(&identity) {
            return Ok(None);
        }
        seen.insert(identity.clone(), ());

        let existing = self
            .collections
            .get(owner)
            .ok_or(AutomationError::InvalidPeer(owner))?
            .reusable_group_peer(&identity)
            .filter(|id| self.peers.contains_key(*id));

        let peer = match existing {
            Some(peer) => {
                let node = self.node_mut(peer)?;
                node.group = Some(group);
                node.parent = Some(parent);
                node.attached = true;
                node.children_valid = false;
                peer
            }
            None => self.peers.insert(PeerNode::group(group, owner, parent)),
        };

        if let Some(state) = self.collections.get_mut(owner)
            && !state.group_peers.contains(&identity)
        {
            state.group_peers.insert(identity, peer);
        }
        Ok(Some(peer))
    }

    /// End a rebuild scope: drop the previous generation and detach its
    /// leftovers.
    fn release_reusable(&mut self, collection: PeerId) {
        let Some(state) = self.collections.get_mut(collection) else {
            return;
        };
        let Some(old) = state.reusable.take() else {
            return;
        };

        let stale: Vec<PeerId> = old
            .items
            .iter()
            .filter(|(item, id)| state.item_peers.get(item) != Some(*id))
            .chain(
                old.groups
                    .iter()
                    .filter(|(identity, id)| state.group_peers.get(identity) != Some(*id)),
            )
            .map(|(_, id)| *id)
            .collect();

        if !stale.is_empty() {
            tracing::debug!(target: targets::REBUILD, ?collection, evicted = stale.len(), "previous generation released");
        }
        for peer in stale {
            if self
                .peers
                .get(peer)
                .is_some_and(|node| node.owner == Some(collection))
            {
                self.detach_peer(peer);
            }
        }
    }
}

//! Peer arena nodes.
//!
//! Peers live in a slot map owned by the [`AutomationEngine`](crate::AutomationEngine)
//! and are addressed by [`PeerId`]. A stale id (the peer was discarded) simply
//! fails to resolve.
//!
//! Peers that own children of their own (collection peers, and tree items
//! with a nested items control) also have a [`CollectionState`] holding the
//! identity map, the proxy registry and the host handle.

mod kind;

use std::cell::Cell;
use std::rc::Rc;

use slotmap::new_key_type;

use crate::host::{ContainerId, ElementPeer, GroupRef, ItemsControlHost};
use crate::identity_map::IdentityMap;
use crate::item::{Item, ItemHold};
use crate::registry::{ProxyHandle, WeakProxyRegistry};

pub use kind::{CollectionKind, ControlType, ItemKind, PeerKind, PeerProfile};

new_key_type! {
    /// A unique identifier for a peer in the engine's arena.
    pub struct PeerId;
}

/// One entry of a peer's child list.
#[derive(Clone)]
pub enum PeerChild {
    /// A peer owned by the engine.
    Peer(PeerId),
    /// A peer owned by a live container, reached through an item's wrapper.
    Element(Rc<dyn ElementPeer>),
}

impl PeerChild {
    /// The engine peer, if this child is one.
    pub fn peer(&self) -> Option<PeerId> {
        match self {
            Self::Peer(id) => Some(*id),
            Self::Element(_) => None,
        }
    }
}

impl std::fmt::Debug for PeerChild {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Peer(id) => f.debug_tuple("Peer").field(id).finish(),
            Self::Element(element) => f.debug_tuple("Element").field(&element.name()).finish(),
        }
    }
}

/// A node in the peer arena.
#[derive(Debug)]
pub(crate) struct PeerNode {
    pub kind: PeerKind,
    /// The peer this one is listed under.
    pub parent: Option<PeerId>,
    /// The peer whose collection state caches this one.
    pub owner: Option<PeerId>,
    pub ancestors_invalid: bool,
    pub children_valid: bool,
    pub children: Vec<PeerChild>,
    pub item: Option<ItemHold>,
    pub group: Option<GroupRef>,
    pub proxy: Option<ProxyHandle>,
    /// Listed in the owner's current identity map.
    pub attached: bool,
}

impl PeerNode {
    pub fn collection(kind: CollectionKind) -> Self {
        Self {
            kind: PeerKind::Collection(kind),
            parent: None,
            owner: None,
            ancestors_invalid: false,
            children_valid: false,
            children: Vec::new(),
            item: None,
            group: None,
            proxy: None,
            attached: true,
        }
    }

    pub fn item(kind: ItemKind, item: Item, owner: PeerId, parent: PeerId) -> Self {
        Self {
            kind: PeerKind::Item(kind),
            parent: Some(parent),
            owner: Some(owner),
            ancestors_invalid: false,
            children_valid: false,
            children: Vec::new(),
            item: Some(ItemHold::new(item)),
            group: None,
            proxy: None,
            attached: true,
        }
    }

    pub fn group(group: GroupRef, owner: PeerId, parent: PeerId) -> Self {
        Self {
            kind: PeerKind::Group,
            parent: Some(parent),
            owner: Some(owner),
            ancestors_invalid: false,
            children_valid: false,
            children: Vec::new(),
            item: None,
            group: Some(group),
            proxy: None,
            attached: true,
        }
    }

    /// The item this peer stands for, if it is still alive.
    pub fn current_item(&self) -> Option<Item> {
        self.item.as_ref().and_then(ItemHold::get)
    }

    pub fn child_peers(&self) -> impl Iterator<Item = PeerId> + '_ {
        self.children.iter().filter_map(PeerChild::peer)
    }
}

/// The previous generation's maps, kept while a rebuild is in progress.
#[derive(Debug, Default)]
pub(crate) struct ReusablePeers {
    pub items: IdentityMap<PeerId>,
    pub groups: IdentityMap<PeerId>,
}

/// Per-collection caches.
pub(crate) struct CollectionState {
    pub host: Rc<dyn ItemsControlHost>,
    pub item_kind: ItemKind,
    /// Current generation of item peers.
    pub item_peers: IdentityMap<PeerId>,
    /// Current generation of group peers, keyed by group identity.
    pub group_peers: IdentityMap<PeerId>,
    /// Previous generation, present only during a rebuild.
    pub reusable: Option<ReusablePeers>,
    pub registry: WeakProxyRegistry,
    /// Offscreen container used by the recyclable wrapper.
    pub offscreen: Cell<Option<ContainerId>>,
}

impl CollectionState {
    pub fn new(host: Rc<dyn ItemsControlHost>, item_kind: ItemKind) -> Self {
        Self {
            host,
            item_kind,
            item_peers: IdentityMap::new(),
            group_peers: IdentityMap::new(),
            reusable: None,
            registry: WeakProxyRegistry::new(),
            offscreen: Cell::new(None),
        }
    }

    /// Find a peer for an item among the maps a rebuild may reuse from.
    pub fn reusable_item_peer(&self, item: &Item) -> Option<PeerId> {
        match &self.reusable {
            Some(old) => old.items.get(item).copied(),
            None => self.item_peers.get(item).copied(),
        }
    }

    pub fn reusable_group_peer(&self, identity: &Item) -> Option<PeerId> {
        match &self.reusable {
            Some(old) => old.groups.get(identity).copied(),
            None => self.group_peers.get(identity).copied(),
        }
    }
}

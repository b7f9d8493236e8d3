//! Automation peer engine for Lattice items controls.
//!
//! Assistive technology addresses the items of a list, combo box, tree or
//! data grid through *peers*. Items controls virtualize: only the items in
//! view get a visual container, and containers are recycled while scrolling.
//! This crate keeps one stable peer per data item regardless:
//!
//! - **Identity**: each collection peer caches its item peers in an
//!   [`IdentityMap`] keyed by item equality, reusing peers across rebuilds
//! - **Proxy registry**: item peers handed to a client are remembered in a
//!   [`WeakProxyRegistry`] so their identity survives eviction
//! - **Realization**: an item peer forwards to its current container's peer
//!   when realized and follows the configured [`VirtualAccessPolicy`] when not
//! - **Invalidation**: `ancestors_invalid` and `children_valid` flags drive
//!   lazy rebuilds and deep subtree updates
//! - **Patterns**: selection, scrolling, expand/collapse, invoke, grid and
//!   item-container search over the whole logical collection
//!
//! The engine is single-threaded; it is neither `Send` nor `Sync`.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use lattice_automation::{
//!     AutomationEngine, CollectionKind, ContainerContent, ContainerId, ElementPeer, Item,
//!     ItemsControlHost,
//! };
//!
//! struct Fruit(Vec<Item>);
//!
//! impl ItemsControlHost for Fruit {
//!     fn items(&self) -> Vec<Item> {
//!         self.0.clone()
//!     }
//!     fn items_host_children(&self) -> Option<Vec<ContainerId>> {
//!         None
//!     }
//!     fn item_from_container(&self, _: ContainerId) -> ContainerContent {
//!         ContainerContent::Unset
//!     }
//!     fn container_from_item(&self, _: &Item) -> Option<ContainerId> {
//!         None
//!     }
//!     fn bring_item_into_view(&self, _: &Item) {}
//!     fn container_peer(&self, _: ContainerId) -> Option<Rc<dyn ElementPeer>> {
//!         None
//!     }
//! }
//!
//! let host = Rc::new(Fruit(vec![Item::value("apple"), Item::value("pear")]));
//! let mut engine = AutomationEngine::new();
//! let list = engine.create_collection_peer(host, CollectionKind::List);
//!
//! let first = engine.child_peers(list)?;
//! engine.invalidate_children(list)?;
//! let second = engine.child_peers(list)?;
//! assert_eq!(first, second);
//! assert_eq!(engine.name(first[0])?, "apple");
//! # Ok::<(), lattice_automation::AutomationError>(())
//! ```

mod collection;
pub mod config;
mod engine;
mod error;
#[cfg(feature = "accessibility")]
pub mod export;
mod grouping;
pub mod host;
pub mod identity_map;
mod invalidation;
pub mod item;
mod item_peer;
pub mod logging;
pub mod patterns;
pub mod peer;
pub mod registry;

pub use config::{EngineConfig, VirtualAccessPolicy, VirtualAccessTable, VirtualAccessor};
pub use engine::AutomationEngine;
pub use error::{AutomationError, Result};
pub use grouping::{SetPlacement, find_position_in_group};
pub use host::{
    CollectionGroup, ContainerContent, ContainerId, ElementPeer, ExpandCollapseState,
    GeneratorStatus, GroupMember, GroupRef, InvokeOutcome, ItemsControlHost, Point, Rect,
    SelectionHost,
};
pub use identity_map::{IdentityMap, StorageMode};
pub use item::{DataItem, HashReliability, Item, WeakItem};
pub use item_peer::RealizationState;
pub use logging::PeerTreeDebug;
pub use patterns::{GridItem, Pattern, PatternKind, PatternSet, PropertyValue, SearchProperty};
pub use peer::{
    CollectionKind, ControlType, ItemKind, PeerChild, PeerId, PeerKind, PeerProfile,
};
pub use registry::{ProxyHandle, ProxyLookup, WeakProxyRegistry};

pub use lattice_automation_core::DispatchPriority;

static_assertions::assert_not_impl_any!(AutomationEngine: Send, Sync);
static_assertions::assert_not_impl_any!(Item: Send, Sync);

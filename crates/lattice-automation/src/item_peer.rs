//! Item peers: wrapper resolution, realization and property access.
//!
//! An item peer has no visual of its own. Whether it is realized is
//! recomputed on every query by asking the owning host for the container
//! currently bound to the item; the container's peer is the *wrapper*.
//! Realized queries go straight to the wrapper. Virtual queries follow the
//! per-accessor [`VirtualAccessPolicy`].

use std::rc::Rc;

use lattice_automation_core::PerfSpan;
use lattice_automation_core::logging::{span_names, targets};

use crate::config::{VirtualAccessPolicy, VirtualAccessor};
use crate::engine::AutomationEngine;
use crate::error::{AutomationError, Result};
use crate::host::{ContainerId, ElementPeer, GeneratorStatus, ItemsControlHost, Point, Rect};
use crate::item::Item;
use crate::patterns::PatternKind;
use crate::peer::{CollectionState, PeerChild, PeerId, PeerKind, PeerNode};

/// Whether an item currently has a live container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RealizationState {
    /// No container; queries follow the virtual access policy.
    Virtual,
    /// A container is bound; queries go to its peer.
    Realized,
}

/// An offscreen container linked to an item for the duration of one query.
///
/// The container is unlinked again when this value is dropped.
pub(crate) struct RecyclableWrapper {
    host: Rc<dyn ItemsControlHost>,
    container: ContainerId,
    item: Item,
    peer: Rc<dyn ElementPeer>,
}

impl RecyclableWrapper {
    fn link(state: &CollectionState, item: &Item) -> Option<Self> {
        let container = match state.offscreen.get() {
            Some(container) => container,
            None => {
                let container = state.host.create_offscreen_container()?;
                state.offscreen.set(Some(container));
                container
            }
        };
        state.host.prepare_container(container, item);
        let Some(peer) = state.host.container_peer(container) else {
            state.host.clear_container(container, item);
            return None;
        };
        Some(Self {
            host: Rc::clone(&state.host),
            container,
            item: item.clone(),
            peer,
        })
    }

    pub(crate) fn peer(&self) -> &dyn ElementPeer {
        self.peer.as_ref()
    }
}

impl Drop for RecyclableWrapper {
    fn drop(&mut self) {
        self.host.clear_container(self.container, &self.item);
    }
}

impl AutomationEngine {
    /// The peer of the container currently bound to an item peer's item.
    ///
    /// Resolving the wrapper also points its events source at `peer`, so a
    /// recycled container reports to the item it shows now. A detached peer
    /// only claims the container when the proxy registry could hand it back.
    pub fn wrapper(&self, peer: PeerId) -> Option<Rc<dyn ElementPeer>> {
        let node = self.peers.get(peer)?;
        if !node.kind.is_item() {
            return None;
        }
        let item = node.current_item()?;
        let host = &self.collections.get(node.owner?)?.host;
        let container = host.container_from_item(&item)?;
        let wrapper = host.container_peer(container)?;

        let claims = node.attached || self.config.reuse_proxied_peers;
        if claims && wrapper.events_source() != Some(peer) {
            tracing::trace!(target: targets::REALIZE, ?peer, ?container, "events source rebound");
            wrapper.set_events_source(Some(peer));
        }
        Some(wrapper)
    }

    /// Whether an item peer is realized right now.
    pub fn realization_state(&self, peer: PeerId) -> Result<RealizationState> {
        self.require_pattern(peer, PatternKind::VirtualizedItem)?;
        Ok(if self.wrapper(peer).is_some() {
            RealizationState::Realized
        } else {
            RealizationState::Virtual
        })
    }

    /// Bring an item peer's item into view so a container gets bound to it.
    ///
    /// Does nothing for a realized peer. If the host's generator is not ready
    /// the request is queued on the dispatcher and retried by
    /// [`run_deferred`](Self::run_deferred); the call itself never waits.
    pub fn realize(&mut self, peer: PeerId) -> Result<()> {
        let _perf = PerfSpan::new(span_names::REALIZE);
        self.require_pattern(peer, PatternKind::VirtualizedItem)?;
        if self.wrapper(peer).is_some() {
            tracing::trace!(target: targets::REALIZE, ?peer, "already realized");
            return Ok(());
        }
        let item = self.live_item(peer)?;
        self.bring_into_view_or_defer(peer, &item)
    }

    fn bring_into_view_or_defer(&mut self, peer: PeerId, item: &Item) -> Result<()> {
        let host = self.owner_host(peer).ok_or(AutomationError::NotAvailable)?;
        if host.generator_status() == GeneratorStatus::ContainersGenerated {
            tracing::debug!(target: targets::REALIZE, ?peer, "bringing item into view");
            host.bring_item_into_view(item);
        } else if self
            .pending_realize
            .get(peer)
            .is_some_and(|id| self.dispatcher.is_pending(*id))
        {
            tracing::trace!(target: targets::REALIZE, ?peer, "realize already queued");
        } else {
            let priority = self.config.deferred_realize_priority;
            tracing::debug!(
                target: targets::REALIZE,
                ?peer,
                status = ?host.generator_status(),
                ?priority,
                "generator busy, realize deferred"
            );
            let id = self
                .dispatcher
                .post(priority, move |engine: &mut AutomationEngine| engine.retry_realize(peer));
            self.pending_realize.insert(peer, id);
        }
        Ok(())
    }

    fn retry_realize(&mut self, peer: PeerId) {
        let _perf = PerfSpan::new(span_names::REALIZE);
        self.pending_realize.remove(peer);
        if self.wrapper(peer).is_some() {
            return;
        }
        let Some(item) = self.peers.get(peer).and_then(PeerNode::current_item) else {
            tracing::trace!(target: targets::REALIZE, ?peer, "deferred realize dropped");
            return;
        };
        if let Err(err) = self.bring_into_view_or_defer(peer, &item) {
            tracing::warn!(target: targets::REALIZE, ?peer, %err, "deferred realize failed");
        }
    }

    // =========================================================================
    // Properties
    // =========================================================================

    fn effective_policy(&self, peer: PeerId, accessor: VirtualAccessor) -> VirtualAccessPolicy {
        let policy = self.config.virtual_access.policy(accessor);
        if policy == VirtualAccessPolicy::Throw {
            let virtualizing = self.owner_host(peer).is_some_and(|h| h.is_virtualizing());
            if !(self.config.throw_on_virtualized_access && virtualizing) {
                return VirtualAccessPolicy::Default;
            }
        }
        policy
    }

    fn read_property<T>(
        &self,
        peer: PeerId,
        accessor: VirtualAccessor,
        read: impl Fn(&dyn ElementPeer) -> T,
        fallback: impl FnOnce() -> T,
    ) -> Result<T> {
        let node = self.node(peer)?;
        if !node.kind.is_item() {
            return Err(AutomationError::invalid_operation("not an item peer"));
        }
        if let Some(wrapper) = self.wrapper(peer) {
            return Ok(read(wrapper.as_ref()));
        }

        let item = self.live_item(peer)?;
        match self.effective_policy(peer, accessor) {
            VirtualAccessPolicy::Throw => Err(AutomationError::NotAvailable),
            VirtualAccessPolicy::Default => Ok(fallback()),
            VirtualAccessPolicy::RecyclableWrapper => {
                let linked = self
                    .owner_state(peer)
                    .and_then(|state| RecyclableWrapper::link(state, &item));
                Ok(match linked {
                    Some(wrapper) => read(wrapper.peer()),
                    None => fallback(),
                })
            }
        }
    }

    /// Accessible name. Falls back to the item's text when empty.
    ///
    /// Group peers answer with their group's name and collection peers with
    /// an empty string.
    pub fn name(&self, peer: PeerId) -> Result<String> {
        let node = self.node(peer)?;
        match node.kind {
            PeerKind::Group => {
                return Ok(node.group.as_ref().map(|g| g.name()).unwrap_or_default());
            }
            PeerKind::Collection(_) => return Ok(String::new()),
            PeerKind::Item(_) => {}
        }
        let name = self.read_property(peer, VirtualAccessor::Name, |w| w.name(), String::new)?;
        if name.is_empty() && self.config.name_falls_back_to_item_text {
            let text = self
                .node(peer)?
                .current_item()
                .and_then(|item| item.display_text());
            return Ok(text.unwrap_or_default());
        }
        Ok(name)
    }

    pub fn automation_id(&self, peer: PeerId) -> Result<String> {
        self.read_property(peer, VirtualAccessor::AutomationId, |w| w.automation_id(), String::new)
    }

    pub fn help_text(&self, peer: PeerId) -> Result<String> {
        self.read_property(peer, VirtualAccessor::HelpText, |w| w.help_text(), String::new)
    }

    pub fn item_status(&self, peer: PeerId) -> Result<String> {
        self.read_property(peer, VirtualAccessor::ItemStatus, |w| w.item_status(), String::new)
    }

    pub fn bounding_rectangle(&self, peer: PeerId) -> Result<Rect> {
        self.read_property(
            peer,
            VirtualAccessor::BoundingRectangle,
            |w| w.bounding_rect(),
            Rect::default,
        )
    }

    pub fn clickable_point(&self, peer: PeerId) -> Result<Option<Point>> {
        self.read_property(peer, VirtualAccessor::ClickablePoint, |w| w.clickable_point(), || None)
    }

    /// Virtual items are always offscreen.
    pub fn is_offscreen(&self, peer: PeerId) -> Result<bool> {
        self.read_property(peer, VirtualAccessor::IsOffscreen, |w| w.is_offscreen(), || true)
    }

    /// Virtual items report the owning control's enabled state.
    pub fn is_enabled(&self, peer: PeerId) -> Result<bool> {
        let owner_enabled = self.owner_host(peer).is_some_and(|h| h.is_enabled());
        self.read_property(peer, VirtualAccessor::IsEnabled, |w| w.is_enabled(), || owner_enabled)
    }

    pub fn is_keyboard_focusable(&self, peer: PeerId) -> Result<bool> {
        self.read_property(
            peer,
            VirtualAccessor::IsKeyboardFocusable,
            |w| w.is_keyboard_focusable(),
            || false,
        )
    }

    pub fn has_keyboard_focus(&self, peer: PeerId) -> Result<bool> {
        self.read_property(
            peer,
            VirtualAccessor::HasKeyboardFocus,
            |w| w.has_keyboard_focus(),
            || false,
        )
    }

    pub fn set_focus(&self, peer: PeerId) -> Result<()> {
        self.read_property(peer, VirtualAccessor::SetFocus, |w| w.set_focus(), || ())
    }

    /// 1-based position in the set. The container's own answer wins over the
    /// collection's.
    pub fn position_in_set(&self, peer: PeerId) -> Result<Option<usize>> {
        let explicit = self.read_property(
            peer,
            VirtualAccessor::PositionInSet,
            |w| w.position_in_set(),
            || None,
        )?;
        Ok(explicit.or_else(|| self.set_placement(peer).map(|p| p.position)))
    }

    /// Size of the set. The container's own answer wins over the collection's.
    pub fn size_of_set(&self, peer: PeerId) -> Result<Option<usize>> {
        let explicit =
            self.read_property(peer, VirtualAccessor::SizeOfSet, |w| w.size_of_set(), || None)?;
        Ok(explicit.or_else(|| self.set_placement(peer).map(|p| p.size)))
    }

    // =========================================================================
    // Children
    // =========================================================================

    /// Children of an item peer.
    ///
    /// Hierarchical items with a nested items control get a cached child list
    /// rebuilt like a collection's. Other realized items list the wrapper's
    /// children, refreshed for every read. Virtual items have no children.
    pub(crate) fn item_children(&mut self, peer: PeerId) -> Result<Vec<PeerChild>> {
        let node = self.node(peer)?;
        let PeerKind::Item(item_kind) = node.kind else {
            return Err(AutomationError::invalid_operation("not an item peer"));
        };
        let hierarchical = node.kind.profile().hierarchical;

        let Some(wrapper) = self.wrapper(peer) else {
            let node = self.node_mut(peer)?;
            node.children.clear();
            node.children_valid = false;
            return Ok(Vec::new());
        };

        if hierarchical && let Some(nested) = wrapper.nested_items() {
            let stale = match self.collections.get_mut(peer) {
                Some(state) if Rc::ptr_eq(&state.host, &nested) => false,
                Some(state) => {
                    state.host = nested;
                    true
                }
                None => {
                    self.collections
                        .insert(peer, CollectionState::new(nested, item_kind));
                    true
                }
            };
            if stale || !self.node(peer)?.children_valid {
                self.rebuild_collection(peer)?;
            }
            return Ok(self.node(peer)?.children.clone());
        }

        if self.config.refresh_wrapper_children {
            wrapper.force_refresh_children();
        }
        let children: Vec<PeerChild> = wrapper
            .children()
            .into_iter()
            .map(PeerChild::Element)
            .collect();
        // Element lists are read fresh on every call and never count as valid.
        let node = self.node_mut(peer)?;
        node.children = children.clone();
        node.children_valid = false;
        Ok(children)
    }
}

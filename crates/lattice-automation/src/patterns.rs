//! Automation patterns exposed by peers.
//!
//! Pattern support is a closed set declared per [`PeerKind`](crate::PeerKind)
//! in its profile. Every pattern operation checks that set first and fails
//! with [`AutomationError::PatternNotSupported`] before touching the host.

use std::rc::Rc;

use lattice_automation_core::automation_debug;

use crate::engine::AutomationEngine;
use crate::error::{AutomationError, Result};
use crate::host::{ExpandCollapseState, InvokeOutcome, ItemsControlHost, SelectionHost};
use crate::identity_map::IdentityMap;
use crate::item::Item;
use crate::peer::{ControlType, PeerId, PeerKind};

/// The patterns a peer can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    /// Realize a virtual item.
    VirtualizedItem,
    /// Select or deselect an item.
    SelectionItem,
    /// Read a container's selection.
    Selection,
    /// Scroll an item into view.
    ScrollItem,
    /// Expand or collapse a tree node.
    ExpandCollapse,
    /// Invoke a row.
    Invoke,
    /// Search a container's items, including virtual ones.
    ItemContainer,
    /// Address rows and columns.
    Grid,
}

impl PatternKind {
    /// Every pattern kind.
    pub const ALL: [PatternKind; 8] = [
        PatternKind::VirtualizedItem,
        PatternKind::SelectionItem,
        PatternKind::Selection,
        PatternKind::ScrollItem,
        PatternKind::ExpandCollapse,
        PatternKind::Invoke,
        PatternKind::ItemContainer,
        PatternKind::Grid,
    ];

    /// Returns the bitflag for this pattern.
    pub const fn as_set(self) -> PatternSet {
        match self {
            Self::VirtualizedItem => PatternSet::VIRTUALIZED_ITEM,
            Self::SelectionItem => PatternSet::SELECTION_ITEM,
            Self::Selection => PatternSet::SELECTION,
            Self::ScrollItem => PatternSet::SCROLL_ITEM,
            Self::ExpandCollapse => PatternSet::EXPAND_COLLAPSE,
            Self::Invoke => PatternSet::INVOKE,
            Self::ItemContainer => PatternSet::ITEM_CONTAINER,
            Self::Grid => PatternSet::GRID,
        }
    }
}

bitflags::bitflags! {
    /// A set of supported patterns.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PatternSet: u32 {
        const VIRTUALIZED_ITEM = 1 << 0;
        const SELECTION_ITEM = 1 << 1;
        const SELECTION = 1 << 2;
        const SCROLL_ITEM = 1 << 3;
        const EXPAND_COLLAPSE = 1 << 4;
        const INVOKE = 1 << 5;
        const ITEM_CONTAINER = 1 << 6;
        const GRID = 1 << 7;

        /// What every item of a selector control supports.
        const SELECTOR_ITEM = Self::VIRTUALIZED_ITEM.bits()
            | Self::SELECTION_ITEM.bits()
            | Self::SCROLL_ITEM.bits();
    }
}

impl PatternSet {
    /// Whether the set contains a pattern.
    pub const fn supports(self, pattern: PatternKind) -> bool {
        self.contains(pattern.as_set())
    }

    /// The patterns in this set.
    pub fn kinds(self) -> impl Iterator<Item = PatternKind> {
        PatternKind::ALL
            .into_iter()
            .filter(move |kind| self.supports(*kind))
    }
}

impl From<PatternKind> for PatternSet {
    fn from(kind: PatternKind) -> Self {
        kind.as_set()
    }
}

impl FromIterator<PatternKind> for PatternSet {
    fn from_iter<I: IntoIterator<Item = PatternKind>>(iter: I) -> Self {
        let mut set = PatternSet::empty();
        for kind in iter {
            set |= kind.as_set();
        }
        set
    }
}

/// A pattern obtained from a peer that supports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pattern {
    pub peer: PeerId,
    pub kind: PatternKind,
}

/// Properties an item container can be searched by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchProperty {
    /// Match every item.
    Any,
    Name,
    AutomationId,
    ControlType,
    IsSelected,
}

/// A value to search for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Text(String),
    ControlType(ControlType),
    Bool(bool),
}

/// A cell address returned by the grid pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridItem {
    /// The row's item peer.
    pub row_peer: PeerId,
    pub row: usize,
    pub column: usize,
}

/// A validated search criterion.
enum Criterion {
    Any,
    Name(String),
    AutomationId(String),
    ControlType(ControlType),
    IsSelected(bool),
}

impl Criterion {
    fn new(property: SearchProperty, value: Option<PropertyValue>) -> Result<Self> {
        match (property, value) {
            (SearchProperty::Any, _) => Ok(Self::Any),
            (SearchProperty::Name, None) => Ok(Self::Name(String::new())),
            (SearchProperty::Name, Some(PropertyValue::Text(text))) => Ok(Self::Name(text)),
            (SearchProperty::AutomationId, None) => Ok(Self::AutomationId(String::new())),
            (SearchProperty::AutomationId, Some(PropertyValue::Text(text))) => {
                Ok(Self::AutomationId(text))
            }
            (SearchProperty::ControlType, Some(PropertyValue::ControlType(ty))) => {
                Ok(Self::ControlType(ty))
            }
            (SearchProperty::IsSelected, Some(PropertyValue::Bool(selected))) => {
                Ok(Self::IsSelected(selected))
            }
            (SearchProperty::ControlType | SearchProperty::IsSelected, None) => {
                Err(AutomationError::ArgumentNull("value"))
            }
            (property, Some(value)) => Err(AutomationError::invalid_argument(
                "value",
                format!("{value:?} cannot be compared with {property:?}"),
            )),
        }
    }
}

impl AutomationEngine {
    /// Whether a peer supports a pattern.
    pub fn supports_pattern(&self, peer: PeerId, kind: PatternKind) -> Result<bool> {
        Ok(self.node(peer)?.kind.profile().patterns.supports(kind))
    }

    /// Get a pattern from a peer.
    pub fn get_pattern(&self, peer: PeerId, kind: PatternKind) -> Result<Pattern> {
        self.require_pattern(peer, kind)?;
        Ok(Pattern { peer, kind })
    }

    fn selection_host<'h>(host: &'h dyn ItemsControlHost) -> Result<&'h dyn SelectionHost> {
        host.selection()
            .ok_or_else(|| AutomationError::invalid_operation("control has no selection model"))
    }

    /// Host, item and enabled check shared by the mutating item patterns.
    fn mutable_item(
        &self,
        peer: PeerId,
        pattern: PatternKind,
    ) -> Result<(Rc<dyn ItemsControlHost>, Item)> {
        self.require_pattern(peer, pattern)?;
        let item = self.live_item(peer)?;
        let host = self.owner_host(peer).ok_or(AutomationError::NotAvailable)?;
        if !host.is_enabled() {
            return Err(AutomationError::NotEnabled);
        }
        Ok((host, item))
    }

    // =========================================================================
    // SelectionItem
    // =========================================================================

    /// Whether an item peer's item is selected.
    pub fn is_selected(&self, peer: PeerId) -> Result<bool> {
        self.require_pattern(peer, PatternKind::SelectionItem)?;
        let item = self.live_item(peer)?;
        Ok(self
            .owner_host(peer)
            .is_some_and(|host| host.selection().is_some_and(|sel| sel.is_selected(&item))))
    }

    /// Make the item the only selected one.
    pub fn select(&mut self, peer: PeerId) -> Result<()> {
        let (host, item) = self.mutable_item(peer, PatternKind::SelectionItem)?;
        Self::selection_host(host.as_ref())?.select_only(&item);
        Ok(())
    }

    /// Add the item to the selection.
    pub fn add_to_selection(&mut self, peer: PeerId) -> Result<()> {
        let (host, item) = self.mutable_item(peer, PatternKind::SelectionItem)?;
        let selection = Self::selection_host(host.as_ref())?;
        if !selection.can_select_multiple()
            && selection.selected_items().iter().any(|selected| *selected != item)
        {
            return Err(AutomationError::invalid_operation(
                "control does not allow multiple selection",
            ));
        }
        selection.add_to_selection(&item);
        Ok(())
    }

    /// Remove the item from the selection.
    pub fn remove_from_selection(&mut self, peer: PeerId) -> Result<()> {
        let (host, item) = self.mutable_item(peer, PatternKind::SelectionItem)?;
        let selection = Self::selection_host(host.as_ref())?;
        if !selection.is_selected(&item) {
            return Ok(());
        }
        if selection.is_selection_required()
            && !selection.can_select_multiple()
            && selection.selected_items().len() == 1
        {
            return Err(AutomationError::invalid_operation(
                "cannot remove the only selected item",
            ));
        }
        selection.remove_from_selection(&item);
        Ok(())
    }

    /// The collection peer an item peer is selected within.
    pub fn selection_container(&self, peer: PeerId) -> Result<Option<PeerId>> {
        self.require_pattern(peer, PatternKind::SelectionItem)?;
        let mut current = self.node(peer)?.owner;
        while let Some(id) = current {
            let node = self.node(id)?;
            if let PeerKind::Collection(_) = node.kind {
                return Ok(Some(id));
            }
            current = node.owner;
        }
        Ok(None)
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Peers for every selected item of a collection, created on demand.
    pub fn selection(&mut self, collection: PeerId) -> Result<Vec<PeerId>> {
        self.require_pattern(collection, PatternKind::Selection)?;
        let host = Rc::clone(&self.state(collection)?.host);
        let selected = host
            .selection()
            .map(|sel| sel.selected_items())
            .unwrap_or_default();
        selected
            .iter()
            .map(|item| self.item_peer_on_demand(collection, item))
            .collect()
    }

    pub fn can_select_multiple(&self, collection: PeerId) -> Result<bool> {
        self.require_pattern(collection, PatternKind::Selection)?;
        Ok(self
            .state(collection)?
            .host
            .selection()
            .is_some_and(|sel| sel.can_select_multiple()))
    }

    pub fn is_selection_required(&self, collection: PeerId) -> Result<bool> {
        self.require_pattern(collection, PatternKind::Selection)?;
        Ok(self
            .state(collection)?
            .host
            .selection()
            .is_some_and(|sel| sel.is_selection_required()))
    }

    // =========================================================================
    // ScrollItem
    // =========================================================================

    /// Ask the owning control to scroll the item into view.
    pub fn scroll_into_view(&mut self, peer: PeerId) -> Result<()> {
        self.require_pattern(peer, PatternKind::ScrollItem)?;
        let item = self.live_item(peer)?;
        let host = self.owner_host(peer).ok_or(AutomationError::NotAvailable)?;
        host.bring_item_into_view(&item);
        Ok(())
    }

    // =========================================================================
    // ExpandCollapse
    // =========================================================================

    pub fn expand_collapse_state(&self, peer: PeerId) -> Result<ExpandCollapseState> {
        self.require_pattern(peer, PatternKind::ExpandCollapse)?;
        let wrapper = self.wrapper(peer).ok_or(AutomationError::NotAvailable)?;
        Ok(wrapper.expand_collapse_state())
    }

    pub fn expand(&mut self, peer: PeerId) -> Result<()> {
        self.expand_or_collapse(peer, true)
    }

    pub fn collapse(&mut self, peer: PeerId) -> Result<()> {
        self.expand_or_collapse(peer, false)
    }

    fn expand_or_collapse(&mut self, peer: PeerId, expand: bool) -> Result<()> {
        self.require_pattern(peer, PatternKind::ExpandCollapse)?;
        let wrapper = self.wrapper(peer).ok_or(AutomationError::NotAvailable)?;
        if !self.owner_host(peer).is_some_and(|host| host.is_enabled()) {
            return Err(AutomationError::NotEnabled);
        }
        if wrapper.expand_collapse_state() == ExpandCollapseState::LeafNode {
            return Err(AutomationError::invalid_operation("leaf node cannot expand or collapse"));
        }
        if expand {
            wrapper.expand();
        } else {
            wrapper.collapse();
        }
        self.invalidate_children(peer)
    }

    // =========================================================================
    // Invoke
    // =========================================================================

    /// Invoke a row.
    ///
    /// A placeholder row refusing edit mode is not an error.
    pub fn invoke(&mut self, peer: PeerId) -> Result<()> {
        self.mutable_item(peer, PatternKind::Invoke)?;
        let wrapper = self.wrapper(peer).ok_or(AutomationError::NotAvailable)?;
        match wrapper.invoke() {
            InvokeOutcome::Invoked | InvokeOutcome::EditRejected { placeholder: true } => Ok(()),
            InvokeOutcome::EditRejected { placeholder: false } => Err(
                AutomationError::invalid_operation("row could not enter edit mode"),
            ),
        }
    }

    // =========================================================================
    // Grid
    // =========================================================================

    pub fn row_count(&self, collection: PeerId) -> Result<usize> {
        self.require_pattern(collection, PatternKind::Grid)?;
        Ok(self.state(collection)?.host.item_count())
    }

    pub fn column_count(&self, collection: PeerId) -> Result<usize> {
        self.require_pattern(collection, PatternKind::Grid)?;
        Ok(self.state(collection)?.host.column_count())
    }

    /// The cell at `row`, `column`, with the row's peer created on demand.
    pub fn grid_item(&mut self, collection: PeerId, row: usize, column: usize) -> Result<GridItem> {
        self.require_pattern(collection, PatternKind::Grid)?;
        let host = Rc::clone(&self.state(collection)?.host);
        let rows = host.item_count();
        if row >= rows {
            return Err(AutomationError::out_of_range("row", row, rows));
        }
        let columns = host.column_count();
        if column >= columns {
            return Err(AutomationError::out_of_range("column", column, columns));
        }
        let items = host.items();
        let item = items
            .get(row)
            .ok_or(AutomationError::out_of_range("row", row, items.len()))?;
        let row_peer = self.item_peer_on_demand(collection, item)?;
        Ok(GridItem {
            row_peer,
            row,
            column,
        })
    }

    // =========================================================================
    // ItemContainer
    // =========================================================================

    /// Find the next item whose property matches, searching the whole logical
    /// collection rather than only realized items.
    ///
    /// The search starts after `start_after` (or at the beginning), skips
    /// duplicate items and items whose property cannot be read while virtual.
    /// Peers are created as needed; the hit is exposed to the client before it
    /// is returned.
    pub fn find_item_by_property(
        &mut self,
        container: PeerId,
        start_after: Option<PeerId>,
        property: SearchProperty,
        value: Option<PropertyValue>,
    ) -> Result<Option<PeerId>> {
        self.require_pattern(container, PatternKind::ItemContainer)?;
        let criterion = Criterion::new(property, value)?;

        if !self.collections.contains_key(container) {
            // A tree item builds its nested collection state on first use.
            self.item_children(container)?;
            if !self.collections.contains_key(container) {
                return match self.wrapper(container) {
                    Some(_) => Ok(None),
                    None => Err(AutomationError::NotAvailable),
                };
            }
        }
        let host = Rc::clone(&self.state(container)?.host);
        let items = host.items();

        let start = match start_after {
            None => 0,
            Some(after) => {
                let after_item = self.node(after)?.current_item().ok_or_else(|| {
                    AutomationError::invalid_operation("start item is no longer available")
                })?;
                let index = items.iter().position(|i| *i == after_item).ok_or_else(|| {
                    AutomationError::invalid_operation("start item is not in this container")
                })?;
                index + 1
            }
        };

        let mut seen = IdentityMap::new();
        for item in items.into_iter().skip(start) {
            if seen.contains(&item) {
                continue;
            }
            seen.insert(item.clone(), ());

            let peer = self.item_peer_on_demand(container, &item)?;
            let matched = match &criterion {
                Criterion::Any => Ok(true),
                Criterion::Name(name) => self.name(peer).map(|n| n == *name),
                Criterion::AutomationId(id) => self.automation_id(peer).map(|a| a == *id),
                Criterion::ControlType(ty) => self.profile(peer).map(|p| p.control_type == *ty),
                Criterion::IsSelected(selected) => self.is_selected(peer).map(|s| s == *selected),
            };
            match matched {
                Ok(true) => {
                    self.provider_for(peer)?;
                    automation_debug!(?container, ?peer, ?property, "item found");
                    return Ok(Some(peer));
                }
                Ok(false) => {}
                Err(AutomationError::NotAvailable) => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(None)
    }
}

//! Contracts the engine consumes from the surrounding UI framework.
//!
//! The engine never owns a visual container, never mutates a collection and
//! never computes geometry. Everything of that kind comes through the traits in
//! this module:
//!
//! - [`ItemsControlHost`]: the items control, its logical items, grouping
//!   state and container generator.
//! - [`ElementPeer`]: the automation peer of one live visual container (the
//!   *wrapper* of an item peer).
//! - [`CollectionGroup`]: a read-only group node of a grouped collection.
//! - [`SelectionHost`]: the selection model of a selector control.
//!
//! All calls happen on the owner thread, so every method takes `&self` and
//! implementations use interior mutability where they need to change state.

use std::fmt;
use std::rc::Rc;

use crate::item::Item;
use crate::peer::PeerId;

/// Opaque handle to a visual container owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(pub u64);

/// State of the host's container generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GeneratorStatus {
    /// Generation has not begun.
    #[default]
    NotStarted,
    /// Containers are being produced; mappings may be incomplete.
    GeneratingContainers,
    /// Containers are in place and mappings are current.
    ContainersGenerated,
    /// Generation failed.
    Error,
}

/// What a container currently displays.
#[derive(Debug, Clone)]
pub enum ContainerContent {
    /// An item container.
    Item(Item),
    /// A group container.
    Group(GroupRef),
    /// The container is not mapped to anything right now (recycled, or the
    /// generator is mid-unhook).
    Unset,
}

/// Screen rectangle in host units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Create a rectangle.
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the rectangle has no area.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Screen point in host units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Expansion state of a hierarchical node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpandCollapseState {
    Collapsed,
    Expanded,
    PartiallyExpanded,
    /// The node has no children to show.
    LeafNode,
}

/// Result of invoking a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeOutcome {
    /// The container performed its action.
    Invoked,
    /// The container refused to enter edit mode.
    EditRejected {
        /// The container is the new-item placeholder row.
        placeholder: bool,
    },
}

/// Shared reference to a group node.
pub type GroupRef = Rc<dyn CollectionGroup>;

/// Member of a group: either a sub-group or an item.
#[derive(Debug, Clone)]
pub enum GroupMember {
    Group(GroupRef),
    Item(Item),
}

/// A read-only node of a grouped collection.
pub trait CollectionGroup: fmt::Debug {
    /// The item identifying this group (usually its name).
    fn identity(&self) -> Item;

    /// Number of leaf items under this group, across all nesting levels.
    fn item_count(&self) -> usize;

    /// Whether the members of this group are items rather than sub-groups.
    fn is_bottom_level(&self) -> bool;

    /// Direct members in flattened order.
    fn members(&self) -> Vec<GroupMember>;

    /// The enclosing group, if any.
    fn parent(&self) -> Option<GroupRef>;

    /// Display name.
    fn name(&self) -> String {
        self.identity().display_text().unwrap_or_default()
    }
}

/// Selection model of a selector control.
pub trait SelectionHost {
    /// Whether several items may be selected at once.
    fn can_select_multiple(&self) -> bool;

    /// Whether at least one item must stay selected.
    fn is_selection_required(&self) -> bool {
        false
    }

    /// Currently selected items.
    fn selected_items(&self) -> Vec<Item>;

    /// Whether an item is selected.
    fn is_selected(&self, item: &Item) -> bool {
        self.selected_items().iter().any(|i| i == item)
    }

    /// Replace the selection with one item.
    fn select_only(&self, item: &Item);

    /// Add an item to the selection.
    fn add_to_selection(&self, item: &Item);

    /// Remove an item from the selection.
    fn remove_from_selection(&self, item: &Item);
}

/// The items control an automation collection peer represents.
pub trait ItemsControlHost {
    /// Logical items in flattened order.
    fn items(&self) -> Vec<Item>;

    /// Number of logical items.
    fn item_count(&self) -> usize {
        self.items().len()
    }

    /// Index of an item in the logical collection.
    fn index_of(&self, item: &Item) -> Option<usize> {
        self.items().iter().position(|i| i == item)
    }

    /// Whether the collection is grouped.
    fn is_grouping(&self) -> bool {
        false
    }

    /// Top-level groups, in order.
    fn groups(&self) -> Vec<GroupRef> {
        Vec::new()
    }

    /// Whether the items host panel virtualizes its children.
    fn is_virtualizing(&self) -> bool {
        false
    }

    /// Whether the control is enabled.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Live visual children of the items host panel, or `None` when there is
    /// no panel yet.
    fn items_host_children(&self) -> Option<Vec<ContainerId>>;

    /// Live visual children of a group's own items panel.
    fn group_host_children(&self, group: &GroupRef) -> Option<Vec<ContainerId>> {
        let _ = group;
        None
    }

    /// Current generator status.
    fn generator_status(&self) -> GeneratorStatus {
        GeneratorStatus::ContainersGenerated
    }

    /// What a container currently displays.
    fn item_from_container(&self, container: ContainerId) -> ContainerContent;

    /// The realized container for an item, if any.
    fn container_from_item(&self, item: &Item) -> Option<ContainerId>;

    /// Ask the panel to scroll an item into view and realize its container.
    fn bring_item_into_view(&self, item: &Item);

    /// The automation peer of a live container.
    fn container_peer(&self, container: ContainerId) -> Option<Rc<dyn ElementPeer>>;

    /// Create a detached container for answering queries about virtual items.
    fn create_offscreen_container(&self) -> Option<ContainerId> {
        None
    }

    /// Link a detached container to an item.
    fn prepare_container(&self, container: ContainerId, item: &Item) {
        let _ = (container, item);
    }

    /// Unlink a detached container from an item.
    fn clear_container(&self, container: ContainerId, item: &Item) {
        let _ = (container, item);
    }

    /// Selection model, for selector controls.
    fn selection(&self) -> Option<&dyn SelectionHost> {
        None
    }

    /// Number of columns, for tabular controls.
    fn column_count(&self) -> usize {
        0
    }
}

/// The automation peer of a live visual container.
///
/// Only the identity-related slots (`events_source`, `ancestors_invalid`) and
/// the child plumbing are required; every property has a neutral default.
pub trait ElementPeer {
    fn name(&self) -> String {
        String::new()
    }

    fn automation_id(&self) -> String {
        String::new()
    }

    fn help_text(&self) -> String {
        String::new()
    }

    fn item_status(&self) -> String {
        String::new()
    }

    fn bounding_rect(&self) -> Rect {
        Rect::default()
    }

    fn clickable_point(&self) -> Option<Point> {
        None
    }

    fn is_offscreen(&self) -> bool {
        false
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn is_keyboard_focusable(&self) -> bool {
        false
    }

    fn has_keyboard_focus(&self) -> bool {
        false
    }

    fn set_focus(&self) {}

    /// Explicit position in set, when the container knows better than the
    /// collection.
    fn position_in_set(&self) -> Option<usize> {
        None
    }

    /// Explicit size of set, when the container knows better than the
    /// collection.
    fn size_of_set(&self) -> Option<usize> {
        None
    }

    /// Rebuild the container peer's own child list from the visual tree.
    fn force_refresh_children(&self) {}

    /// The container peer's children.
    fn children(&self) -> Vec<Rc<dyn ElementPeer>> {
        Vec::new()
    }

    /// The peer events raised by this container surface under.
    fn events_source(&self) -> Option<PeerId>;

    fn set_events_source(&self, source: Option<PeerId>);

    fn ancestors_invalid(&self) -> bool;

    fn set_ancestors_invalid(&self, invalid: bool);

    /// Nested items control, for hierarchical containers (tree nodes).
    fn nested_items(&self) -> Option<Rc<dyn ItemsControlHost>> {
        None
    }

    fn expand_collapse_state(&self) -> ExpandCollapseState {
        ExpandCollapseState::LeafNode
    }

    fn expand(&self) {}

    fn collapse(&self) {}

    fn invoke(&self) -> InvokeOutcome {
        InvokeOutcome::Invoked
    }
}

impl fmt::Debug for dyn ElementPeer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementPeer")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for dyn ItemsControlHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemsControlHost")
            .field("item_count", &self.item_count())
            .field("grouping", &self.is_grouping())
            .field("virtualizing", &self.is_virtualizing())
            .finish_non_exhaustive()
    }
}

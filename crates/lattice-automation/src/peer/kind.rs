//! Peer kinds and their static profiles.
//!
//! A peer is not a subclass of anything. Its behavior is picked from a
//! [`PeerKind`], which resolves to a fixed [`PeerProfile`]: the control type
//! reported to clients, the patterns it supports and whether it hosts a nested
//! items control of its own.

use crate::patterns::PatternSet;

/// Kinds of items control a collection peer can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    List,
    ComboBox,
    TreeView,
    DataGrid,
}

impl CollectionKind {
    /// The item kind this collection creates for its items.
    pub fn item_kind(self) -> ItemKind {
        match self {
            Self::List => ItemKind::ListItem,
            Self::ComboBox => ItemKind::ComboBoxItem,
            Self::TreeView => ItemKind::TreeItem,
            Self::DataGrid => ItemKind::DataGridRow,
        }
    }
}

/// Kinds of item peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    ListItem,
    ComboBoxItem,
    TreeItem,
    DataGridRow,
}

/// What a peer is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerKind {
    /// The peer of an items control.
    Collection(CollectionKind),
    /// The peer of one data item.
    Item(ItemKind),
    /// The peer of a group in a grouped collection.
    Group,
}

/// Control types reported to automation clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlType {
    List,
    ListItem,
    ComboBox,
    Tree,
    TreeItem,
    DataGrid,
    DataItem,
    Group,
}

/// Fixed behavior of a peer kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerProfile {
    pub control_type: ControlType,
    pub patterns: PatternSet,
    /// Children come from a nested items control instead of the wrapper.
    pub hierarchical: bool,
}

impl PeerKind {
    /// The profile of this kind.
    pub const fn profile(self) -> PeerProfile {
        match self {
            Self::Collection(CollectionKind::List) => PeerProfile {
                control_type: ControlType::List,
                patterns: PatternSet::SELECTION.union(PatternSet::ITEM_CONTAINER),
                hierarchical: false,
            },
            Self::Collection(CollectionKind::ComboBox) => PeerProfile {
                control_type: ControlType::ComboBox,
                patterns: PatternSet::SELECTION.union(PatternSet::ITEM_CONTAINER),
                hierarchical: false,
            },
            Self::Collection(CollectionKind::TreeView) => PeerProfile {
                control_type: ControlType::Tree,
                patterns: PatternSet::SELECTION.union(PatternSet::ITEM_CONTAINER),
                hierarchical: false,
            },
            Self::Collection(CollectionKind::DataGrid) => PeerProfile {
                control_type: ControlType::DataGrid,
                patterns: PatternSet::SELECTION
                    .union(PatternSet::ITEM_CONTAINER)
                    .union(PatternSet::GRID),
                hierarchical: false,
            },
            Self::Item(ItemKind::ListItem) | Self::Item(ItemKind::ComboBoxItem) => PeerProfile {
                control_type: ControlType::ListItem,
                patterns: PatternSet::SELECTOR_ITEM,
                hierarchical: false,
            },
            Self::Item(ItemKind::TreeItem) => PeerProfile {
                control_type: ControlType::TreeItem,
                patterns: PatternSet::SELECTOR_ITEM
                    .union(PatternSet::EXPAND_COLLAPSE)
                    .union(PatternSet::ITEM_CONTAINER),
                hierarchical: true,
            },
            Self::Item(ItemKind::DataGridRow) => PeerProfile {
                control_type: ControlType::DataItem,
                patterns: PatternSet::SELECTOR_ITEM.union(PatternSet::INVOKE),
                hierarchical: false,
            },
            Self::Group => PeerProfile {
                control_type: ControlType::Group,
                patterns: PatternSet::empty(),
                hierarchical: false,
            },
        }
    }

    /// Whether this is an item peer.
    pub fn is_item(self) -> bool {
        matches!(self, Self::Item(_))
    }

    /// Whether this is a collection peer.
    pub fn is_collection(self) -> bool {
        matches!(self, Self::Collection(_))
    }
}

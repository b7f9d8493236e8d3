//! AccessKit export of a peer tree.
//!
//! Walks a collection peer's children (rebuilding stale child lists on the
//! way) and produces a full [`TreeUpdate`]. Item peers are exported whether
//! realized or virtual; properties a virtual item cannot answer are left
//! unset rather than failing the whole export.

use accesskit::{Action, Node, NodeId, Role, Tree, TreeUpdate};
use lattice_automation_core::{automation_debug, automation_warn};
use slotmap::{Key, KeyData};

use crate::engine::AutomationEngine;
use crate::error::Result;
use crate::host::{ElementPeer, ExpandCollapseState, Rect};
use crate::patterns::PatternKind;
use crate::peer::{ControlType, PeerChild, PeerId};

/// Node ids for wrapper children that have no peer of their own.
const ELEMENT_ID_BIT: u64 = 1 << 63;

impl ControlType {
    /// The AccessKit role for this control type.
    pub fn to_accesskit_role(self) -> Role {
        match self {
            Self::List => Role::List,
            Self::ListItem => Role::ListItem,
            Self::ComboBox => Role::ComboBox,
            Self::Tree => Role::Tree,
            Self::TreeItem => Role::TreeItem,
            Self::DataGrid => Role::Grid,
            Self::DataItem => Role::Row,
            Self::Group => Role::Group,
        }
    }
}

/// Convert a PeerId to an AccessKit NodeId.
pub fn peer_id_to_node_id(id: PeerId) -> NodeId {
    NodeId(id.data().as_ffi() & !ELEMENT_ID_BIT)
}

/// Convert an AccessKit NodeId back to a PeerId.
///
/// Returns None for nodes that stand for wrapper children.
pub fn node_id_to_peer_id(id: NodeId) -> Option<PeerId> {
    if id.0 & ELEMENT_ID_BIT != 0 {
        return None;
    }
    Some(PeerId::from(KeyData::from_ffi(id.0)))
}

fn to_accesskit_rect(rect: Rect) -> accesskit::Rect {
    accesskit::Rect {
        x0: rect.x,
        y0: rect.y,
        x1: rect.x + rect.width,
        y1: rect.y + rect.height,
    }
}

struct Exporter<'e> {
    engine: &'e mut AutomationEngine,
    nodes: Vec<(NodeId, Node)>,
    next_element: u64,
}

impl Exporter<'_> {
    fn export_peer(&mut self, peer: PeerId) -> Result<NodeId> {
        let id = peer_id_to_node_id(peer);
        let profile = self.engine.profile(peer)?;
        let mut node = Node::new(profile.control_type.to_accesskit_role());

        if let Ok(name) = self.engine.name(peer)
            && !name.is_empty()
        {
            node.set_label(name);
        }

        if self.engine.kind(peer)?.is_item() {
            self.item_properties(peer, &mut node)?;
        }
        if profile.patterns.supports(PatternKind::Grid) {
            node.set_row_count(self.engine.row_count(peer)?);
            node.set_column_count(self.engine.column_count(peer)?);
        }

        let children = self.engine.children(peer)?;
        let mut child_ids = Vec::with_capacity(children.len());
        for child in children {
            let child_id = match child {
                PeerChild::Peer(child) => self.export_peer(child)?,
                PeerChild::Element(element) => self.export_element(element.as_ref()),
            };
            child_ids.push(child_id);
        }
        if !child_ids.is_empty() {
            node.set_children(child_ids);
        }

        self.nodes.push((id, node));
        Ok(id)
    }

    fn item_properties(&mut self, peer: PeerId, node: &mut Node) -> Result<()> {
        let engine = &*self.engine;
        if let Ok(rect) = engine.bounding_rectangle(peer)
            && !rect.is_empty()
        {
            node.set_bounds(to_accesskit_rect(rect));
        }
        if let Ok(Some(position)) = engine.position_in_set(peer) {
            node.set_position_in_set(position);
        }
        if let Ok(Some(size)) = engine.size_of_set(peer) {
            node.set_size_of_set(size);
        }
        if engine.is_selected(peer)? {
            node.set_selected(true);
        }
        node.add_action(Action::ScrollIntoView);
        node.add_action(Action::Focus);

        let patterns = engine.profile(peer)?.patterns;
        if patterns.supports(PatternKind::ExpandCollapse) {
            match engine.expand_collapse_state(peer) {
                Ok(ExpandCollapseState::Expanded | ExpandCollapseState::PartiallyExpanded) => {
                    node.set_expanded(true);
                    node.add_action(Action::Collapse);
                }
                Ok(ExpandCollapseState::Collapsed) => {
                    node.set_expanded(false);
                    node.add_action(Action::Expand);
                }
                Ok(ExpandCollapseState::LeafNode) | Err(_) => {}
            }
        }
        if patterns.supports(PatternKind::Invoke) {
            node.add_action(Action::Click);
        }
        Ok(())
    }

    fn export_element(&mut self, element: &dyn ElementPeer) -> NodeId {
        let id = NodeId(ELEMENT_ID_BIT | self.next_element);
        self.next_element += 1;

        let mut node = Node::new(Role::GenericContainer);
        let name = element.name();
        if !name.is_empty() {
            node.set_label(name);
        }
        let rect = element.bounding_rect();
        if !rect.is_empty() {
            node.set_bounds(to_accesskit_rect(rect));
        }
        let children: Vec<NodeId> = element
            .children()
            .iter()
            .map(|child| self.export_element(child.as_ref()))
            .collect();
        if !children.is_empty() {
            node.set_children(children);
        }

        self.nodes.push((id, node));
        id
    }
}

impl AutomationEngine {
    /// Build a full AccessKit tree update rooted at `root`.
    ///
    /// Focus goes to `focus` when given, otherwise to the root.
    pub fn build_tree_update(&mut self, root: PeerId, focus: Option<PeerId>) -> Result<TreeUpdate> {
        let mut exporter = Exporter {
            engine: self,
            nodes: Vec::new(),
            next_element: 0,
        };
        let root_id = exporter.export_peer(root)?;
        let nodes = exporter.nodes;
        automation_debug!(?root, nodes = nodes.len(), "accesskit tree built");

        let focus = match focus.map(peer_id_to_node_id) {
            Some(id) if nodes.iter().any(|(node, _)| *node == id) => id,
            Some(_) => {
                automation_warn!(?root, ?focus, "focus peer outside the exported tree, focusing root");
                root_id
            }
            None => root_id,
        };
        Ok(TreeUpdate {
            nodes,
            tree: Some(Tree::new(root_id)),
            focus,
        })
    }
}

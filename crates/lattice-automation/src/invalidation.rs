//! The two-flag invalidation protocol.
//!
//! Every peer carries `ancestors_invalid` (its ancestor chain may have changed)
//! and `children_valid` (its cached child list is current). A child request
//! short-circuits while `children_valid` holds, so the only way to force a deep
//! repopulation of a cached subtree is to mark its root's ancestors invalid and
//! run [`update_subtree`](AutomationEngine::update_subtree).

use lattice_automation_core::PerfSpan;
use lattice_automation_core::logging::{span_names, targets};

use crate::engine::AutomationEngine;
use crate::error::Result;
use crate::host::ElementPeer;
use crate::peer::{PeerChild, PeerId};

impl AutomationEngine {
    pub fn ancestors_invalid(&self, peer: PeerId) -> Result<bool> {
        Ok(self.node(peer)?.ancestors_invalid)
    }

    pub fn children_valid(&self, peer: PeerId) -> Result<bool> {
        Ok(self.node(peer)?.children_valid)
    }

    /// Set a peer's `ancestors_invalid` flag.
    ///
    /// Clearing the flag also clears it on the peer's wrapper, when one is
    /// resolvable. Setting it leaves the wrapper alone.
    pub fn set_ancestors_invalid(&mut self, peer: PeerId, invalid: bool) -> Result<()> {
        self.node_mut(peer)?.ancestors_invalid = invalid;
        if !invalid && let Some(wrapper) = self.wrapper(peer) {
            wrapper.set_ancestors_invalid(false);
        }
        tracing::trace!(target: targets::INVALIDATION, ?peer, invalid, "ancestors flag set");
        Ok(())
    }

    /// Mark a peer's children stale; the next child request rebuilds them.
    pub fn invalidate_children(&mut self, peer: PeerId) -> Result<()> {
        self.node_mut(peer)?.children_valid = false;
        Ok(())
    }

    /// Mark a peer and its ancestors as having an invalid ancestor chain.
    ///
    /// The walk stops at the first peer already marked.
    pub fn invalidate_ancestors(&mut self, peer: PeerId) -> Result<()> {
        self.node(peer)?;
        let mut current = Some(peer);
        let mut marked = 0usize;
        while let Some(id) = current {
            let Some(node) = self.peers.get_mut(id) else {
                break;
            };
            if node.ancestors_invalid {
                break;
            }
            node.ancestors_invalid = true;
            marked += 1;
            current = node.parent;
        }
        tracing::trace!(target: targets::INVALIDATION, ?peer, marked, "ancestors invalidated");
        Ok(())
    }

    /// Invalidate upward from a container peer.
    ///
    /// The walk continues through the element's events source, so a change
    /// seen by a wrapper reaches the stable item peer it stands in for.
    pub fn invalidate_element_ancestors(&mut self, element: &dyn ElementPeer) -> Result<()> {
        if element.ancestors_invalid() {
            return Ok(());
        }
        element.set_ancestors_invalid(true);
        match element.events_source() {
            Some(source) if self.peers.contains_key(source) => self.invalidate_ancestors(source),
            _ => Ok(()),
        }
    }

    /// Bring a subtree up to date.
    ///
    /// A peer with `ancestors_invalid` set has its children rebuilt and pushes
    /// the flag onto each child peer before clearing its own. Children whose
    /// flag is set are then updated in turn.
    pub fn update_subtree(&mut self, peer: PeerId) -> Result<()> {
        let _perf = PerfSpan::new(span_names::UPDATE_SUBTREE);
        let deep = self.node(peer)?.ancestors_invalid;
        if deep {
            self.node_mut(peer)?.children_valid = false;
        }

        let children: Vec<PeerId> = self
            .children(peer)?
            .iter()
            .filter_map(PeerChild::peer)
            .collect();

        if deep {
            for &child in &children {
                if let Some(node) = self.peers.get_mut(child) {
                    node.ancestors_invalid = true;
                }
            }
            self.set_ancestors_invalid(peer, false)?;
        }

        for child in children {
            if self.peers.get(child).is_some_and(|node| node.ancestors_invalid) {
                self.update_subtree(child)?;
            }
        }
        Ok(())
    }
}

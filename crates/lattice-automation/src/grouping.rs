//! Position and size of an item's set in a possibly grouped collection.
//!
//! A grouped collection is flattened depth-first: every group contributes its
//! items in order, nested groups inside their parent. The set an item belongs
//! to is its bottom-level group, so its position restarts at 1 in every such
//! group.

use crate::engine::AutomationEngine;
use crate::host::{GroupMember, GroupRef};
use crate::item::Item;
use crate::peer::PeerId;

/// Where an item sits in its set. Both values are 1-based counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetPlacement {
    pub position: usize,
    pub size: usize,
}

/// Locate the item at a flattened `index` among `groups`.
///
/// Groups before the target are skipped whole, each taking its full item
/// count off the running index. Returns `None` when the index runs past the
/// last group.
pub fn find_position_in_group(groups: &[GroupRef], index: usize) -> Option<SetPlacement> {
    let (group, offset) = locate(groups, index)?;
    Some(SetPlacement {
        position: offset + 1,
        size: group.item_count(),
    })
}

/// The bottom-level group holding the item at a flattened `index`.
pub(crate) fn group_of_item(groups: &[GroupRef], index: usize) -> Option<GroupRef> {
    locate(groups, index).map(|(group, _)| group)
}

fn locate(groups: &[GroupRef], index: usize) -> Option<(GroupRef, usize)> {
    let mut remaining = index;
    for group in groups {
        let count = group.item_count();
        if remaining >= count {
            remaining -= count;
            continue;
        }
        if group.is_bottom_level() {
            return Some((GroupRef::clone(group), remaining));
        }
        let subgroups: Vec<GroupRef> = group
            .members()
            .into_iter()
            .filter_map(|member| match member {
                GroupMember::Group(sub) => Some(sub),
                GroupMember::Item(_) => None,
            })
            .collect();
        return locate(&subgroups, remaining);
    }
    None
}

impl AutomationEngine {
    /// Where an item peer's item sits in its owner's collection.
    pub(crate) fn set_placement(&self, peer: PeerId) -> Option<SetPlacement> {
        let item = self.peers.get(peer)?.current_item()?;
        let host = self.owner_host(peer)?;
        let index = host.index_of(&item)?;
        if host.is_grouping() {
            find_position_in_group(&host.groups(), index)
        } else {
            Some(SetPlacement {
                position: index + 1,
                size: host.item_count(),
            })
        }
    }

    /// The peer an on-demand item peer should hang under: its bottom-level
    /// group's peer in a grouped collection, the collection otherwise.
    ///
    /// Falls back to the collection while the group peers are not built yet.
    pub(crate) fn on_demand_parent(&self, owner: PeerId, item: &Item) -> PeerId {
        let Some(state) = self.collections.get(owner) else {
            return owner;
        };
        if !state.host.is_grouping() {
            return owner;
        }
        state
            .host
            .index_of(item)
            .and_then(|index| group_of_item(&state.host.groups(), index))
            .and_then(|group| state.group_peers.get(&group.identity()).copied())
            .filter(|id| self.peers.contains_key(*id))
            .unwrap_or(owner)
    }
}

//! Tests for grouped collections, invalidation and tree export.

mod common;

use lattice_automation::{
    AutomationEngine, CollectionKind, ElementPeer, EngineConfig, GroupRef, Item, PeerChild,
    PeerKind, PeerTreeDebug, PropertyValue, SearchProperty,
    logging::{TreeFormatOptions, TreeStyle},
};
use std::rc::Rc;

use common::{MockGroup, MockItemsControl, numbered, words};

fn grouped() -> (AutomationEngine, std::rc::Rc<MockItemsControl>, lattice_automation::PeerId) {
    let a = words(&["a1", "a2"]);
    let b = words(&["b1", "b2", "b3"]);
    let c = words(&["c1"]);
    let host = MockItemsControl::new([a.clone(), b.clone(), c.clone()].concat());
    *host.groups.borrow_mut() = Some(vec![
        MockGroup::leaf("A", a),
        MockGroup::leaf("B", b),
        MockGroup::leaf("C", c),
    ]);
    let mut engine = AutomationEngine::new();
    let list = engine.create_collection_peer(host.as_host(), CollectionKind::List);
    (engine, host, list)
}

#[test]
fn test_grouped_children() {
    let (mut engine, _host, list) = grouped();
    let groups = engine.child_peers(list).unwrap();
    assert_eq!(groups.len(), 3);
    assert!(groups.iter().all(|g| engine.kind(*g).unwrap() == PeerKind::Group));
    assert_eq!(engine.name(groups[1]).unwrap(), "B");

    let b_items = engine.child_peers(groups[1]).unwrap();
    assert_eq!(b_items.len(), 3);
    assert_eq!(engine.parent(b_items[0]).unwrap(), Some(groups[1]));
    // Group members are cached by the collection itself.
    assert_eq!(engine.identity_map_len(list).unwrap(), 6);
}

#[test]
fn test_grouped_position_in_set() {
    let (mut engine, _host, list) = grouped();
    let groups = engine.child_peers(list).unwrap();
    let b_items = engine.child_peers(groups[1]).unwrap();

    assert_eq!(engine.position_in_set(b_items[1]).unwrap(), Some(2));
    assert_eq!(engine.size_of_set(b_items[1]).unwrap(), Some(3));

    let c_items = engine.child_peers(groups[2]).unwrap();
    assert_eq!(engine.position_in_set(c_items[0]).unwrap(), Some(1));
    assert_eq!(engine.size_of_set(c_items[0]).unwrap(), Some(1));
}

#[test]
fn test_regrouping_keeps_item_identity() {
    let (mut engine, host, list) = grouped();
    let groups = engine.child_peers(list).unwrap();
    let b1 = engine.child_peers(groups[1]).unwrap()[0];

    // Move b1 into group A.
    let a = words(&["a1", "a2", "b1"]);
    let b = words(&["b2", "b3"]);
    let c = words(&["c1"]);
    *host.items.borrow_mut() = [a.clone(), b.clone(), c.clone()].concat();
    *host.groups.borrow_mut() = Some(vec![
        MockGroup::leaf("A", a),
        MockGroup::leaf("B", b),
        MockGroup::leaf("C", c),
    ]);
    engine.invalidate_children(list).unwrap();

    let regrouped = engine.child_peers(list).unwrap();
    assert_eq!(regrouped, groups);
    let a_items = engine.child_peers(regrouped[0]).unwrap();
    assert_eq!(a_items[2], b1);
    assert_eq!(engine.parent(b1).unwrap(), Some(regrouped[0]));
    assert_eq!(engine.position_in_set(b1).unwrap(), Some(3));
}

#[test]
fn test_group_rebuild_releases_departed_members() {
    let a = words(&["a1", "a2"]);
    let b = MockGroup::shared("B", words(&["b1", "b2", "b3"]));
    let host = MockItemsControl::new(words(&["a1", "a2", "b1", "b2", "b3"]));
    *host.groups.borrow_mut() = Some(vec![MockGroup::leaf("A", a), Rc::clone(&b) as GroupRef]);
    let mut engine = AutomationEngine::new();
    let list = engine.create_collection_peer(host.as_host(), CollectionKind::List);

    let groups = engine.child_peers(list).unwrap();
    let before = engine.child_peers(groups[1]).unwrap();
    assert_eq!(engine.identity_map_len(list).unwrap(), 5);

    let b2 = Item::value("b2".to_string());
    b.items.borrow_mut().retain(|item| *item != b2);
    host.items.borrow_mut().retain(|item| *item != b2);
    engine.invalidate_children(groups[1]).unwrap();

    let after = engine.child_peers(groups[1]).unwrap();
    assert_eq!(after, vec![before[0], before[2]]);
    assert!(!engine.contains_peer(before[1]));
    assert_eq!(engine.item_peer(list, &b2).unwrap(), None);
    assert_eq!(engine.identity_map_len(list).unwrap(), 4);
    // Group A was not touched.
    assert!(engine.children_valid(groups[0]).unwrap());
}

#[test]
fn test_group_rebuild_keeps_exposed_member_for_its_proxy() {
    let b = MockGroup::shared("B", words(&["b1", "b2"]));
    let host = MockItemsControl::new(words(&["b1", "b2"]));
    *host.groups.borrow_mut() = Some(vec![Rc::clone(&b) as GroupRef]);
    let mut engine = AutomationEngine::new();
    let list = engine.create_collection_peer(host.as_host(), CollectionKind::List);

    let group = engine.child_peers(list).unwrap()[0];
    let b2 = engine.child_peers(group).unwrap()[1];
    let handle = engine.provider_for(b2).unwrap();

    b.items.borrow_mut().truncate(1);
    engine.invalidate_children(group).unwrap();
    assert_eq!(engine.child_peers(group).unwrap().len(), 1);
    assert!(engine.contains_peer(b2));
    assert!(!engine.is_attached(b2).unwrap());

    assert!(engine.release_proxy(handle));
    assert!(!engine.contains_peer(b2));
}

#[test]
fn test_item_in_two_groups_listed_once_on_every_path() {
    let host = MockItemsControl::new(words(&["a1", "shared", "b1"]));
    *host.groups.borrow_mut() = Some(vec![
        MockGroup::leaf("A", words(&["a1", "shared"])),
        MockGroup::leaf("B", words(&["shared", "b1"])),
    ]);
    let mut engine = AutomationEngine::new();
    let list = engine.create_collection_peer(host.as_host(), CollectionKind::List);

    let groups = engine.child_peers(list).unwrap();
    let in_a = engine.child_peers(groups[0]).unwrap();
    let in_b = engine.child_peers(groups[1]).unwrap();
    assert_eq!(in_a.len(), 2);
    assert_eq!(in_b.len(), 1);
    assert_eq!(engine.name(in_b[0]).unwrap(), "b1");

    engine.invalidate_children(groups[1]).unwrap();
    assert_eq!(engine.child_peers(groups[1]).unwrap(), in_b);

    engine.invalidate_children(groups[0]).unwrap();
    assert_eq!(engine.child_peers(groups[0]).unwrap(), in_a);
    assert_eq!(engine.parent(in_a[1]).unwrap(), Some(groups[0]));
}

#[test]
fn test_found_item_hangs_under_its_group() {
    let b = MockGroup::shared("B", words(&["b1", "b2"]));
    let host = MockItemsControl::new(words(&["a1", "b1", "b2"]));
    *host.groups.borrow_mut() = Some(vec![
        MockGroup::leaf("A", words(&["a1"])),
        Rc::clone(&b) as GroupRef,
    ]);
    let mut engine = AutomationEngine::new();
    let list = engine.create_collection_peer(host.as_host(), CollectionKind::List);
    let groups = engine.child_peers(list).unwrap();
    engine.child_peers(groups[1]).unwrap();

    // A new member the cached tree has not seen yet.
    let b3 = Item::value("b3".to_string());
    b.items.borrow_mut().push(b3.clone());
    host.items.borrow_mut().push(b3);

    let found = engine
        .find_item_by_property(list, None, SearchProperty::Name, Some(PropertyValue::Text("b3".into())))
        .unwrap()
        .unwrap();
    assert_eq!(engine.parent(found).unwrap(), Some(groups[1]));

    engine.invalidate_children(groups[1]).unwrap();
    let members = engine.child_peers(groups[1]).unwrap();
    assert_eq!(members.len(), 3);
    assert_eq!(members[2], found);
}

#[test]
fn test_setting_ancestors_invalid_leaves_wrapper_alone() {
    let host = MockItemsControl::new(words(&["a", "b"]));
    let mut engine = AutomationEngine::new();
    let list = engine.create_collection_peer(host.as_host(), CollectionKind::List);
    let peer = engine.child_peers(list).unwrap()[0];
    let element = host.element(0).unwrap();

    engine.set_ancestors_invalid(peer, true).unwrap();
    assert!(engine.ancestors_invalid(peer).unwrap());
    assert!(!element.ancestors_invalid());

    element.set_ancestors_invalid(true);
    engine.set_ancestors_invalid(peer, true).unwrap();
    assert!(element.ancestors_invalid());

    engine.set_ancestors_invalid(peer, false).unwrap();
    assert!(!engine.ancestors_invalid(peer).unwrap());
    assert!(!element.ancestors_invalid());
}

#[test]
fn test_host_collapse_and_reexpand_rebuilds_nested_children() {
    let host = MockItemsControl::new(words(&["fruit", "stone"]));
    host.nested.borrow_mut().insert(
        "fruit".to_string(),
        MockItemsControl::new(words(&["apple", "pear", "plum"])),
    );
    host.expanded.borrow_mut().insert("fruit".to_string());
    let mut engine = AutomationEngine::new();
    let tree = engine.create_collection_peer(host.as_host(), CollectionKind::TreeView);
    let fruit = engine.child_peers(tree).unwrap()[0];

    let expanded = engine.child_peers(fruit).unwrap();
    assert_eq!(expanded.len(), 3);

    // Collapsed by the host, not through the engine.
    host.expanded.borrow_mut().remove("fruit");
    let collapsed = engine.children(fruit).unwrap();
    assert_eq!(collapsed.len(), 1);
    assert!(matches!(&collapsed[0], PeerChild::Element(e) if e.name() == "fruit"));

    host.expanded.borrow_mut().insert("fruit".to_string());
    assert_eq!(engine.child_peers(fruit).unwrap(), expanded);
}

#[test]
fn test_element_change_invalidates_up_to_collection() {
    let host = MockItemsControl::virtualized(numbered(50), 10);
    let mut engine = AutomationEngine::new();
    let list = engine.create_collection_peer(host.as_host(), CollectionKind::List);
    let items = engine.child_peers(list).unwrap();

    let element = host.element(4).unwrap();
    engine.invalidate_element_ancestors(&*element).unwrap();
    assert!(element.ancestors_invalid());
    assert!(engine.ancestors_invalid(items[4]).unwrap());
    assert!(engine.ancestors_invalid(list).unwrap());
    assert!(!engine.ancestors_invalid(items[3]).unwrap());

    engine.update_subtree(list).unwrap();
    assert!(!engine.ancestors_invalid(list).unwrap());
    assert!(!engine.ancestors_invalid(items[4]).unwrap());
    assert!(!element.ancestors_invalid());
    assert!(element.refreshes.get() > 0);
    assert_eq!(engine.child_peers(list).unwrap(), items);
}

#[test]
fn test_update_subtree_picks_up_scrolled_window() {
    let host = MockItemsControl::virtualized(numbered(50), 10);
    let mut engine = AutomationEngine::with_config(EngineConfig::default());
    let list = engine.create_collection_peer(host.as_host(), CollectionKind::List);
    engine.child_peers(list).unwrap();

    host.scroll_to(20);
    engine.update_subtree(list).unwrap();
    // Nothing was invalidated, so the cached list stands.
    assert_eq!(engine.identity_map_len(list).unwrap(), 10);
    let cached = engine.child_peers(list).unwrap();
    assert_eq!(
        engine.name(cached[0]).unwrap(),
        "item 0",
        "stale peers keep answering for their own item"
    );

    engine.set_ancestors_invalid(list, true).unwrap();
    engine.update_subtree(list).unwrap();
    let fresh = engine.child_peers(list).unwrap();
    assert_eq!(engine.name(fresh[0]).unwrap(), "item 20");
}

#[test]
fn test_peer_tree_debug_over_groups() {
    let (mut engine, _host, list) = grouped();
    let groups = engine.child_peers(list).unwrap();
    engine.child_peers(groups[0]).unwrap();

    let output = PeerTreeDebug::with_options(TreeFormatOptions {
        style: TreeStyle::Ascii,
        ..TreeFormatOptions::minimal()
    })
    .format_subtree(&engine, list)
    .unwrap();
    assert!(output.starts_with("List\n"));
    assert!(output.contains("+-- A\n"));
    assert!(output.contains("|  +-- a1\n"));
}

#[cfg(feature = "accessibility")]
#[test]
fn test_accesskit_export_of_tree() {
    use lattice_automation::export::peer_id_to_node_id;

    let host = MockItemsControl::new(words(&["fruit", "stone"]));
    host.nested
        .borrow_mut()
        .insert("fruit".to_string(), MockItemsControl::new(words(&["apple"])));
    host.expanded.borrow_mut().insert("fruit".to_string());

    let mut engine = AutomationEngine::new();
    let tree = engine.create_collection_peer(host.as_host(), CollectionKind::TreeView);
    let nodes = engine.child_peers(tree).unwrap();

    let update = engine.build_tree_update(tree, Some(nodes[1])).unwrap();
    assert_eq!(update.focus, peer_id_to_node_id(nodes[1]));

    let fruit = &update
        .nodes
        .iter()
        .find(|(id, _)| *id == peer_id_to_node_id(nodes[0]))
        .unwrap()
        .1;
    assert_eq!(fruit.role(), accesskit::Role::TreeItem);
    assert_eq!(fruit.label(), Some("fruit"));
    assert_eq!(fruit.is_expanded(), Some(true));
    assert_eq!(fruit.children().len(), 1);

    // Stone is a leaf: its one child is the label inside its container.
    let stone = &update
        .nodes
        .iter()
        .find(|(id, _)| *id == peer_id_to_node_id(nodes[1]))
        .unwrap()
        .1;
    assert_eq!(stone.is_expanded(), None);
    assert_eq!(stone.children().len(), 1);
}

#[cfg(feature = "accessibility")]
#[test]
fn test_accesskit_focus_outside_subtree_falls_back_to_root() {
    use lattice_automation::export::peer_id_to_node_id;

    let (mut engine, _host, list) = grouped();
    let groups = engine.child_peers(list).unwrap();

    let update = engine.build_tree_update(groups[0], Some(groups[2])).unwrap();
    assert_eq!(update.focus, peer_id_to_node_id(groups[0]));
}

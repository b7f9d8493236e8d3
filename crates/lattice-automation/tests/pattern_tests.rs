//! Tests for the automation patterns exposed by collection and item peers.

mod common;

use std::rc::Rc;

use lattice_automation::{
    AutomationEngine, AutomationError, CollectionKind, ControlType, ExpandCollapseState, Item,
    ItemKind, PatternKind, PeerKind, PropertyValue, RealizationState, SearchProperty,
};

use common::{MockItemsControl, numbered, words};

fn list_of(host: &Rc<MockItemsControl>) -> (AutomationEngine, lattice_automation::PeerId) {
    let mut engine = AutomationEngine::new();
    let list = engine.create_collection_peer(host.as_host(), CollectionKind::List);
    (engine, list)
}

// =============================================================================
// Pattern support
// =============================================================================

#[test]
fn test_pattern_support_follows_profile() {
    let host = MockItemsControl::new(words(&["a"]));
    let (mut engine, list) = list_of(&host);
    let item = engine.child_peers(list).unwrap()[0];

    assert!(engine.supports_pattern(list, PatternKind::Selection).unwrap());
    assert!(!engine.supports_pattern(list, PatternKind::Grid).unwrap());
    assert!(engine.supports_pattern(item, PatternKind::VirtualizedItem).unwrap());
    assert!(engine.get_pattern(item, PatternKind::ScrollItem).is_ok());
    assert_eq!(
        engine.get_pattern(item, PatternKind::Invoke),
        Err(AutomationError::PatternNotSupported {
            peer: item,
            pattern: PatternKind::Invoke
        })
    );
    assert!(matches!(
        engine.invoke(item),
        Err(AutomationError::PatternNotSupported { .. })
    ));
    assert_eq!(engine.profile(item).unwrap().control_type, ControlType::ListItem);
}

// =============================================================================
// Selection
// =============================================================================

#[test]
fn test_single_selection() {
    let host = MockItemsControl::new(words(&["a", "b", "c"]));
    host.selection.required.set(true);
    let (mut engine, list) = list_of(&host);
    let items = engine.child_peers(list).unwrap();

    engine.select(items[1]).unwrap();
    assert!(engine.is_selected(items[1]).unwrap());
    assert!(!engine.is_selected(items[0]).unwrap());
    assert_eq!(engine.selection(list).unwrap(), vec![items[1]]);
    assert_eq!(engine.selection_container(items[1]).unwrap(), Some(list));
    assert!(!engine.can_select_multiple(list).unwrap());
    assert!(engine.is_selection_required(list).unwrap());

    assert!(matches!(
        engine.add_to_selection(items[2]),
        Err(AutomationError::InvalidOperation(_))
    ));
    // Adding the already selected item is allowed.
    engine.add_to_selection(items[1]).unwrap();
    assert!(matches!(
        engine.remove_from_selection(items[1]),
        Err(AutomationError::InvalidOperation(_))
    ));
    // Removing an unselected item is a no-op.
    engine.remove_from_selection(items[0]).unwrap();

    engine.select(items[2]).unwrap();
    assert_eq!(engine.selection(list).unwrap(), vec![items[2]]);
}

#[test]
fn test_multiple_selection() {
    let host = MockItemsControl::new(words(&["a", "b", "c"]));
    host.selection.multiple.set(true);
    let (mut engine, list) = list_of(&host);
    let items = engine.child_peers(list).unwrap();

    engine.add_to_selection(items[0]).unwrap();
    engine.add_to_selection(items[2]).unwrap();
    assert_eq!(engine.selection(list).unwrap(), vec![items[0], items[2]]);

    engine.remove_from_selection(items[0]).unwrap();
    assert_eq!(engine.selection(list).unwrap(), vec![items[2]]);
}

#[test]
fn test_selection_requires_enabled_control() {
    let host = MockItemsControl::new(words(&["a"]));
    let (mut engine, list) = list_of(&host);
    let item = engine.child_peers(list).unwrap()[0];

    host.enabled.set(false);
    assert_eq!(engine.select(item), Err(AutomationError::NotEnabled));
    assert!(host.selection.selected.borrow().is_empty());
}

#[test]
fn test_selection_of_virtual_items_creates_peers() {
    let host = MockItemsControl::virtualized(numbered(100), 10);
    host.selection.multiple.set(true);
    host.selection
        .selected
        .borrow_mut()
        .extend([Item::value("item 3".to_string()), Item::value("item 70".to_string())]);
    let (mut engine, list) = list_of(&host);
    let realized = engine.child_peers(list).unwrap();

    let selected = engine.selection(list).unwrap();
    assert_eq!(selected.len(), 2);
    assert_eq!(selected[0], realized[3]);
    assert_eq!(
        engine.realization_state(selected[1]).unwrap(),
        RealizationState::Virtual
    );
    assert!(engine.is_selected(selected[1]).unwrap());
}

// =============================================================================
// Scroll
// =============================================================================

#[test]
fn test_scroll_into_view() {
    let host = MockItemsControl::virtualized(numbered(100), 10);
    let (mut engine, list) = list_of(&host);
    let item = engine.child_peers(list).unwrap()[5];

    engine.scroll_into_view(item).unwrap();
    assert_eq!(
        host.brought_into_view.borrow().as_slice(),
        &[Item::value("item 5".to_string())]
    );
}

// =============================================================================
// Expand / collapse and hierarchical items
// =============================================================================

fn tree() -> (AutomationEngine, Rc<MockItemsControl>, lattice_automation::PeerId) {
    let host = MockItemsControl::new(words(&["fruit", "stone"]));
    host.nested.borrow_mut().insert(
        "fruit".to_string(),
        MockItemsControl::new(words(&["apple", "pear", "plum"])),
    );
    let mut engine = AutomationEngine::new();
    let tree = engine.create_collection_peer(host.as_host(), CollectionKind::TreeView);
    (engine, host, tree)
}

#[test]
fn test_expand_collapse() {
    let (mut engine, _host, tree) = tree();
    let nodes = engine.child_peers(tree).unwrap();
    let (fruit, stone) = (nodes[0], nodes[1]);

    assert_eq!(engine.kind(fruit).unwrap(), PeerKind::Item(ItemKind::TreeItem));
    assert_eq!(
        engine.expand_collapse_state(fruit).unwrap(),
        ExpandCollapseState::Collapsed
    );
    assert_eq!(
        engine.expand_collapse_state(stone).unwrap(),
        ExpandCollapseState::LeafNode
    );
    assert!(matches!(
        engine.expand(stone),
        Err(AutomationError::InvalidOperation(_))
    ));

    engine.expand(fruit).unwrap();
    assert_eq!(
        engine.expand_collapse_state(fruit).unwrap(),
        ExpandCollapseState::Expanded
    );
    assert!(!engine.children_valid(fruit).unwrap());

    let fruits = engine.child_peers(fruit).unwrap();
    assert_eq!(fruits.len(), 3);
    assert_eq!(engine.parent(fruits[0]).unwrap(), Some(fruit));
    assert_eq!(engine.name(fruits[1]).unwrap(), "pear");
    assert_eq!(
        engine.kind(fruits[2]).unwrap(),
        PeerKind::Item(ItemKind::TreeItem)
    );

    // Cached until invalidated.
    assert_eq!(engine.child_peers(fruit).unwrap(), fruits);

    engine.collapse(fruit).unwrap();
    assert_eq!(
        engine.expand_collapse_state(fruit).unwrap(),
        ExpandCollapseState::Collapsed
    );
}

#[test]
fn test_nested_identity_survives_collapse() {
    let (mut engine, _host, tree) = tree();
    let fruit = engine.child_peers(tree).unwrap()[0];

    engine.expand(fruit).unwrap();
    let first = engine.child_peers(fruit).unwrap();
    engine.collapse(fruit).unwrap();
    engine.child_peers(fruit).unwrap();
    engine.expand(fruit).unwrap();
    assert_eq!(engine.child_peers(fruit).unwrap(), first);
}

#[test]
fn test_expand_requires_enabled_control() {
    let (mut engine, host, tree) = tree();
    let fruit = engine.child_peers(tree).unwrap()[0];
    host.enabled.set(false);
    assert_eq!(engine.expand(fruit), Err(AutomationError::NotEnabled));
}

// =============================================================================
// Invoke and grid
// =============================================================================

fn grid() -> (AutomationEngine, Rc<MockItemsControl>, lattice_automation::PeerId) {
    let host = MockItemsControl::new(numbered(3));
    host.columns.set(2);
    let mut engine = AutomationEngine::new();
    let grid = engine.create_collection_peer(host.as_host(), CollectionKind::DataGrid);
    (engine, host, grid)
}

#[test]
fn test_invoke_rows() {
    let (mut engine, host, grid) = grid();
    let rows = engine.child_peers(grid).unwrap();
    assert_eq!(engine.profile(rows[0]).unwrap().control_type, ControlType::DataItem);

    engine.invoke(rows[0]).unwrap();

    host.reject_edit.set(Some(true));
    engine.invoke(rows[0]).unwrap();

    host.reject_edit.set(Some(false));
    assert!(matches!(
        engine.invoke(rows[0]),
        Err(AutomationError::InvalidOperation(_))
    ));

    host.reject_edit.set(None);
    host.enabled.set(false);
    assert_eq!(engine.invoke(rows[0]), Err(AutomationError::NotEnabled));
}

#[test]
fn test_grid_addressing() {
    let (mut engine, _host, grid) = grid();
    let rows = engine.child_peers(grid).unwrap();

    assert_eq!(engine.row_count(grid).unwrap(), 3);
    assert_eq!(engine.column_count(grid).unwrap(), 2);

    let cell = engine.grid_item(grid, 1, 1).unwrap();
    assert_eq!(cell.row_peer, rows[1]);
    assert_eq!((cell.row, cell.column), (1, 1));

    assert_eq!(
        engine.grid_item(grid, 3, 0),
        Err(AutomationError::ArgumentOutOfRange {
            parameter: "row",
            value: 3,
            limit: 3
        })
    );
    assert!(matches!(
        engine.grid_item(grid, 0, 2),
        Err(AutomationError::ArgumentOutOfRange { parameter: "column", .. })
    ));
}

// =============================================================================
// Item container search
// =============================================================================

#[test]
fn test_find_item_beyond_realized_window() {
    let host = MockItemsControl::virtualized(numbered(1000), 20);
    let (mut engine, list) = list_of(&host);
    engine.child_peers(list).unwrap();

    let found = engine
        .find_item_by_property(
            list,
            None,
            SearchProperty::Name,
            Some(PropertyValue::Text("item 500".into())),
        )
        .unwrap()
        .unwrap();
    assert_eq!(engine.item(found).unwrap(), Some(Item::value("item 500".to_string())));
    assert_eq!(engine.realization_state(found).unwrap(), RealizationState::Virtual);
    // Exposed to the client, so it survives the next rebuild.
    assert_eq!(engine.registry_len(list).unwrap(), 1);

    engine.invalidate_children(list).unwrap();
    engine.child_peers(list).unwrap();
    assert!(engine.contains_peer(found));
    assert!(engine.identity_map_len(list).unwrap() <= 20);

    let next = engine
        .find_item_by_property(list, Some(found), SearchProperty::Any, None)
        .unwrap()
        .unwrap();
    assert_eq!(engine.item(next).unwrap(), Some(Item::value("item 501".to_string())));
}

#[test]
fn test_find_item_by_other_properties() {
    let host = MockItemsControl::new(words(&["a", "b", "b", "c"]));
    let (mut engine, list) = list_of(&host);
    let items = engine.child_peers(list).unwrap();
    engine.select(items[2]).unwrap();

    let selected = engine
        .find_item_by_property(list, None, SearchProperty::IsSelected, Some(PropertyValue::Bool(true)))
        .unwrap();
    assert_eq!(selected, Some(items[2]));

    let first_item = engine
        .find_item_by_property(
            list,
            None,
            SearchProperty::ControlType,
            Some(PropertyValue::ControlType(ControlType::ListItem)),
        )
        .unwrap();
    assert_eq!(first_item, Some(items[0]));

    let by_id = engine
        .find_item_by_property(
            list,
            Some(items[0]),
            SearchProperty::AutomationId,
            Some(PropertyValue::Text("id-c".into())),
        )
        .unwrap();
    assert_eq!(by_id, Some(items[2]));

    let missing = engine
        .find_item_by_property(list, None, SearchProperty::Name, Some(PropertyValue::Text("z".into())))
        .unwrap();
    assert_eq!(missing, None);
}

#[test]
fn test_find_item_rejects_bad_arguments() {
    let host = MockItemsControl::new(words(&["a"]));
    let (mut engine, list) = list_of(&host);

    assert!(matches!(
        engine.find_item_by_property(list, None, SearchProperty::IsSelected, None),
        Err(AutomationError::ArgumentNull("value"))
    ));
    assert!(matches!(
        engine.find_item_by_property(
            list,
            None,
            SearchProperty::IsSelected,
            Some(PropertyValue::Text("yes".into()))
        ),
        Err(AutomationError::InvalidArgument { .. })
    ));
}

#[test]
fn test_find_item_in_tree_node() {
    let (mut engine, _host, tree) = tree();
    let fruit = engine.child_peers(tree).unwrap()[0];
    engine.expand(fruit).unwrap();

    let plum = engine
        .find_item_by_property(fruit, None, SearchProperty::Name, Some(PropertyValue::Text("plum".into())))
        .unwrap()
        .unwrap();
    assert_eq!(engine.parent(plum).unwrap(), Some(fruit));
}

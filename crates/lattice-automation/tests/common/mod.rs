//! In-memory items control used by the integration tests.
//!
//! Containers are slots in a realized window. When virtualizing, item `i` is
//! bound to container `i % window_len` while it is inside the window, so
//! scrolling recycles containers the way a virtualizing panel does.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::rc::{Rc, Weak};

use lattice_automation::{
    CollectionGroup, ContainerContent, ContainerId, ElementPeer, ExpandCollapseState,
    GeneratorStatus, GroupMember, GroupRef, InvokeOutcome, Item, ItemsControlHost, PeerId, Rect,
    SelectionHost,
};

pub const OFFSCREEN: ContainerId = ContainerId(u64::MAX);

pub fn words(words: &[&str]) -> Vec<Item> {
    words.iter().map(|w| Item::value(w.to_string())).collect()
}

pub fn numbered(count: usize) -> Vec<Item> {
    (0..count).map(|i| Item::value(format!("item {i}"))).collect()
}

/// Install a test subscriber so `RUST_LOG` shows engine traces.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Default)]
pub struct MockSelection {
    pub selected: RefCell<Vec<Item>>,
    pub multiple: Cell<bool>,
    pub required: Cell<bool>,
}

impl SelectionHost for MockSelection {
    fn can_select_multiple(&self) -> bool {
        self.multiple.get()
    }

    fn is_selection_required(&self) -> bool {
        self.required.get()
    }

    fn selected_items(&self) -> Vec<Item> {
        self.selected.borrow().clone()
    }

    fn select_only(&self, item: &Item) {
        *self.selected.borrow_mut() = vec![item.clone()];
    }

    fn add_to_selection(&self, item: &Item) {
        let mut selected = self.selected.borrow_mut();
        if !selected.contains(item) {
            selected.push(item.clone());
        }
    }

    fn remove_from_selection(&self, item: &Item) {
        self.selected.borrow_mut().retain(|i| i != item);
    }
}

#[derive(Debug)]
pub struct MockGroup {
    pub name: &'static str,
    pub items: RefCell<Vec<Item>>,
    pub subgroups: Vec<GroupRef>,
}

impl MockGroup {
    pub fn leaf(name: &'static str, items: Vec<Item>) -> GroupRef {
        Self::shared(name, items)
    }

    /// A leaf group whose membership the test can change in place.
    pub fn shared(name: &'static str, items: Vec<Item>) -> Rc<Self> {
        Rc::new(Self {
            name,
            items: RefCell::new(items),
            subgroups: Vec::new(),
        })
    }
}

impl CollectionGroup for MockGroup {
    fn identity(&self) -> Item {
        Item::value(format!("group:{}", self.name))
    }

    fn item_count(&self) -> usize {
        self.items.borrow().len() + self.subgroups.iter().map(|g| g.item_count()).sum::<usize>()
    }

    fn is_bottom_level(&self) -> bool {
        self.subgroups.is_empty()
    }

    fn members(&self) -> Vec<GroupMember> {
        if self.subgroups.is_empty() {
            self.items.borrow().iter().cloned().map(GroupMember::Item).collect()
        } else {
            self.subgroups.iter().cloned().map(GroupMember::Group).collect()
        }
    }

    fn parent(&self) -> Option<GroupRef> {
        None
    }

    fn name(&self) -> String {
        self.name.to_string()
    }
}

/// A label inside an item container.
pub struct TextElement(pub String);

impl ElementPeer for TextElement {
    fn name(&self) -> String {
        self.0.clone()
    }

    fn events_source(&self) -> Option<PeerId> {
        None
    }

    fn set_events_source(&self, _source: Option<PeerId>) {}

    fn ancestors_invalid(&self) -> bool {
        false
    }

    fn set_ancestors_invalid(&self, _invalid: bool) {}
}

/// The automation peer of one container slot.
pub struct MockElement {
    host: Weak<MockItemsControl>,
    pub slot: u64,
    pub item: RefCell<Option<Item>>,
    events_source: Cell<Option<PeerId>>,
    ancestors_invalid: Cell<bool>,
    pub refreshes: Cell<usize>,
}

impl MockElement {
    fn text(&self) -> String {
        self.item
            .borrow()
            .as_ref()
            .and_then(Item::display_text)
            .unwrap_or_default()
    }
}

impl ElementPeer for MockElement {
    fn name(&self) -> String {
        self.text()
    }

    fn automation_id(&self) -> String {
        format!("id-{}", self.text())
    }

    fn bounding_rect(&self) -> Rect {
        Rect::new(0.0, self.slot as f64 * 20.0, 100.0, 20.0)
    }

    fn is_keyboard_focusable(&self) -> bool {
        true
    }

    fn force_refresh_children(&self) {
        self.refreshes.set(self.refreshes.get() + 1);
    }

    fn children(&self) -> Vec<Rc<dyn ElementPeer>> {
        vec![Rc::new(TextElement(self.text()))]
    }

    fn events_source(&self) -> Option<PeerId> {
        self.events_source.get()
    }

    fn set_events_source(&self, source: Option<PeerId>) {
        self.events_source.set(source);
    }

    fn ancestors_invalid(&self) -> bool {
        self.ancestors_invalid.get()
    }

    fn set_ancestors_invalid(&self, invalid: bool) {
        self.ancestors_invalid.set(invalid);
    }

    fn nested_items(&self) -> Option<Rc<dyn ItemsControlHost>> {
        let host = self.host.upgrade()?;
        let text = self.text();
        if !host.expanded.borrow().contains(&text) {
            return None;
        }
        let nested = host.nested.borrow().get(&text).cloned()?;
        Some(nested)
    }

    fn expand_collapse_state(&self) -> ExpandCollapseState {
        let Some(host) = self.host.upgrade() else {
            return ExpandCollapseState::LeafNode;
        };
        let text = self.text();
        if !host.nested.borrow().contains_key(&text) {
            ExpandCollapseState::LeafNode
        } else if host.expanded.borrow().contains(&text) {
            ExpandCollapseState::Expanded
        } else {
            ExpandCollapseState::Collapsed
        }
    }

    fn expand(&self) {
        if let Some(host) = self.host.upgrade() {
            host.expanded.borrow_mut().insert(self.text());
        }
    }

    fn collapse(&self) {
        if let Some(host) = self.host.upgrade() {
            host.expanded.borrow_mut().remove(&self.text());
        }
    }

    fn invoke(&self) -> InvokeOutcome {
        match self.host.upgrade().and_then(|h| h.reject_edit.get()) {
            Some(placeholder) => InvokeOutcome::EditRejected { placeholder },
            None => InvokeOutcome::Invoked,
        }
    }
}

/// A scriptable items control.
pub struct MockItemsControl {
    me: Weak<MockItemsControl>,
    pub items: RefCell<Vec<Item>>,
    pub virtualizing: Cell<bool>,
    pub window_start: Cell<usize>,
    pub window_len: Cell<usize>,
    pub enabled: Cell<bool>,
    pub status: Cell<GeneratorStatus>,
    pub groups: RefCell<Option<Vec<GroupRef>>>,
    pub offscreen: Cell<bool>,
    pub offscreen_item: RefCell<Option<Item>>,
    pub prepared: Cell<usize>,
    pub cleared: Cell<usize>,
    pub columns: Cell<usize>,
    pub has_selection: Cell<bool>,
    pub selection: MockSelection,
    pub brought_into_view: RefCell<Vec<Item>>,
    pub nested: RefCell<HashMap<String, Rc<MockItemsControl>>>,
    pub expanded: RefCell<HashSet<String>>,
    pub reject_edit: Cell<Option<bool>>,
    /// Container slots that are listed but report no item, as while unhooking.
    pub unhooked: RefCell<HashSet<u64>>,
    elements: RefCell<HashMap<u64, Rc<MockElement>>>,
}

impl MockItemsControl {
    /// A non-virtualizing control with every item realized.
    pub fn new(items: Vec<Item>) -> Rc<Self> {
        Rc::new_cyclic(|me| Self {
            me: me.clone(),
            items: RefCell::new(items),
            virtualizing: Cell::new(false),
            window_start: Cell::new(0),
            window_len: Cell::new(0),
            enabled: Cell::new(true),
            status: Cell::new(GeneratorStatus::ContainersGenerated),
            groups: RefCell::new(None),
            offscreen: Cell::new(false),
            offscreen_item: RefCell::new(None),
            prepared: Cell::new(0),
            cleared: Cell::new(0),
            columns: Cell::new(0),
            has_selection: Cell::new(true),
            selection: MockSelection::default(),
            brought_into_view: RefCell::new(Vec::new()),
            nested: RefCell::new(HashMap::new()),
            expanded: RefCell::new(HashSet::new()),
            reject_edit: Cell::new(None),
            unhooked: RefCell::new(HashSet::new()),
            elements: RefCell::new(HashMap::new()),
        })
    }

    /// A virtualizing control realizing `window_len` items from the top.
    pub fn virtualized(items: Vec<Item>, window_len: usize) -> Rc<Self> {
        let host = Self::new(items);
        host.virtualizing.set(true);
        host.window_len.set(window_len.max(1));
        host
    }

    pub fn as_host(self: &Rc<Self>) -> Rc<dyn ItemsControlHost> {
        Rc::clone(self) as Rc<dyn ItemsControlHost>
    }

    pub fn scroll_to(&self, start: usize) {
        self.window_start.set(start);
    }

    /// The element of a container slot, if it was ever handed out.
    pub fn element(&self, slot: u64) -> Option<Rc<MockElement>> {
        self.elements.borrow().get(&slot).cloned()
    }

    fn realized(&self) -> Range<usize> {
        let len = self.items.borrow().len();
        if self.virtualizing.get() {
            let start = self.window_start.get().min(len);
            start..(start + self.window_len.get()).min(len)
        } else {
            0..len
        }
    }

    fn slot_of(&self, index: usize) -> u64 {
        if self.virtualizing.get() {
            (index % self.window_len.get()) as u64
        } else {
            index as u64
        }
    }

    fn element_for(&self, slot: u64, item: Option<Item>) -> Rc<MockElement> {
        let mut elements = self.elements.borrow_mut();
        let element = elements.entry(slot).or_insert_with(|| {
            Rc::new(MockElement {
                host: self.me.clone(),
                slot,
                item: RefCell::new(None),
                events_source: Cell::new(None),
                ancestors_invalid: Cell::new(false),
                refreshes: Cell::new(0),
            })
        });
        *element.item.borrow_mut() = item;
        Rc::clone(element)
    }
}

impl ItemsControlHost for MockItemsControl {
    fn items(&self) -> Vec<Item> {
        self.items.borrow().clone()
    }

    fn is_grouping(&self) -> bool {
        self.groups.borrow().is_some()
    }

    fn groups(&self) -> Vec<GroupRef> {
        self.groups.borrow().clone().unwrap_or_default()
    }

    fn is_virtualizing(&self) -> bool {
        self.virtualizing.get()
    }

    fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    fn items_host_children(&self) -> Option<Vec<ContainerId>> {
        if self.is_grouping() {
            return None;
        }
        Some(
            self.realized()
                .map(|index| ContainerId(self.slot_of(index)))
                .collect(),
        )
    }

    fn generator_status(&self) -> GeneratorStatus {
        self.status.get()
    }

    fn item_from_container(&self, container: ContainerId) -> ContainerContent {
        if self.unhooked.borrow().contains(&container.0) {
            return ContainerContent::Unset;
        }
        let items = self.items.borrow();
        self.realized()
            .find(|index| self.slot_of(*index) == container.0)
            .and_then(|index| items.get(index).cloned())
            .map_or(ContainerContent::Unset, ContainerContent::Item)
    }

    fn container_from_item(&self, item: &Item) -> Option<ContainerId> {
        let index = self.items.borrow().iter().position(|i| i == item)?;
        self.realized()
            .contains(&index)
            .then(|| ContainerId(self.slot_of(index)))
    }

    fn bring_item_into_view(&self, item: &Item) {
        self.brought_into_view.borrow_mut().push(item.clone());
        if self.virtualizing.get()
            && let Some(index) = self.index_of(item)
        {
            self.window_start.set(index);
        }
    }

    fn container_peer(&self, container: ContainerId) -> Option<Rc<dyn ElementPeer>> {
        let item = if container == OFFSCREEN {
            Some(self.offscreen_item.borrow().clone()?)
        } else {
            match self.item_from_container(container) {
                ContainerContent::Item(item) => Some(item),
                _ => return None,
            }
        };
        Some(self.element_for(container.0, item) as Rc<dyn ElementPeer>)
    }

    fn create_offscreen_container(&self) -> Option<ContainerId> {
        self.offscreen.get().then_some(OFFSCREEN)
    }

    fn prepare_container(&self, container: ContainerId, item: &Item) {
        if container == OFFSCREEN {
            *self.offscreen_item.borrow_mut() = Some(item.clone());
            self.prepared.set(self.prepared.get() + 1);
        }
    }

    fn clear_container(&self, container: ContainerId, _item: &Item) {
        if container == OFFSCREEN {
            *self.offscreen_item.borrow_mut() = None;
            self.cleared.set(self.cleared.get() + 1);
        }
    }

    fn selection(&self) -> Option<&dyn SelectionHost> {
        self.has_selection
            .get()
            .then_some(&self.selection as &dyn SelectionHost)
    }

    fn column_count(&self) -> usize {
        self.columns.get()
    }
}

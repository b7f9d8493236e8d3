//! Data items: the logical objects peers stand for.
//!
//! An [`Item`] is an opaque handle supplied by the host collection. Its identity
//! follows the host's equality semantics, which may be value equality (two equal
//! strings are the same item) or reference identity (two allocations with equal
//! contents are different items).
//!
//! Items also declare whether their hash codes can be trusted. Identity maps
//! pick their storage strategy from that declaration (see
//! [`IdentityMap`](crate::IdentityMap)).

use std::any::Any;
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::rc::{Rc, Weak};

/// Whether an item's hash code is stable for as long as it lives in a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashReliability {
    /// The hash never changes while the item is alive.
    Reliable,
    /// The hash may change (mutable contents, or a type the engine does not
    /// trust), so hash-based storage would corrupt.
    Unreliable,
}

/// A logical data object that may be represented by an automation peer.
///
/// Most hosts use the ready-made constructors on [`Item`]; implement this trait
/// directly for items with custom equality.
pub trait DataItem: fmt::Debug + 'static {
    /// Upcast for downcasting in `item_eq`.
    fn as_any(&self) -> &dyn Any;

    /// Host equality between two items.
    fn item_eq(&self, other: &dyn DataItem) -> bool;

    /// Hash consistent with [`item_eq`](DataItem::item_eq).
    fn item_hash(&self) -> u64;

    /// Whether [`item_hash`](DataItem::item_hash) can be trusted.
    fn hash_reliability(&self) -> HashReliability;

    /// A weak handle for items that peers must not keep alive.
    ///
    /// Returning `None` (the default) makes peers hold the item strongly, which is
    /// right for value-like items.
    fn downgrade(&self) -> Option<WeakItem> {
        None
    }

    /// Text used as a last-resort accessible name.
    fn display_text(&self) -> Option<String> {
        None
    }
}

/// A shared handle to a [`DataItem`].
#[derive(Clone)]
pub struct Item(Rc<dyn DataItem>);

impl Item {
    /// Wrap a custom [`DataItem`].
    pub fn new<D: DataItem>(data: D) -> Self {
        Self(Rc::new(data))
    }

    /// A value-equality item with a reliable hash, held strongly by peers.
    pub fn value<T>(value: T) -> Self
    where
        T: Eq + Hash + fmt::Debug + fmt::Display + 'static,
    {
        Self::new(ValueItem(value))
    }

    /// A value-equality item whose hash must not be trusted.
    pub fn unhashed<T>(value: T) -> Self
    where
        T: PartialEq + fmt::Debug + fmt::Display + 'static,
    {
        Self::new(UnhashedItem(value))
    }

    /// A reference-identity item over a shared allocation, held weakly by peers.
    pub fn object<T>(object: Rc<T>) -> Self
    where
        T: fmt::Debug + 'static,
    {
        Self::new(ObjectItem(object))
    }

    /// The underlying data item.
    pub fn data(&self) -> &dyn DataItem {
        self.0.as_ref()
    }

    /// Borrow the payload of an item created with [`Item::value`] or
    /// [`Item::unhashed`].
    pub fn value_ref<T: 'static>(&self) -> Option<&T> {
        let any = self.0.as_any();
        any.downcast_ref::<ValueItem<T>>()
            .map(|v| &v.0)
            .or_else(|| any.downcast_ref::<UnhashedItem<T>>().map(|v| &v.0))
    }

    /// The shared allocation of an item created with [`Item::object`].
    pub fn object_ref<T: 'static>(&self) -> Option<Rc<T>> {
        self.0
            .as_any()
            .downcast_ref::<ObjectItem<T>>()
            .map(|o| Rc::clone(&o.0))
    }

    /// Whether the item's hash can be trusted.
    pub fn hash_reliability(&self) -> HashReliability {
        self.0.hash_reliability()
    }

    /// Last-resort accessible name.
    pub fn display_text(&self) -> Option<String> {
        self.0.display_text()
    }

    /// Whether peers hold this item through a weak handle.
    pub fn is_weakly_held(&self) -> bool {
        self.0.downgrade().is_some()
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0) || self.0.item_eq(other.0.as_ref())
    }
}

impl Eq for Item {}

impl Hash for Item {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.item_hash());
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A weak handle to a reference-identity item.
#[derive(Clone)]
pub struct WeakItem(Rc<dyn Fn() -> Option<Item>>);

impl WeakItem {
    /// Build a weak handle from an upgrade function.
    pub fn new<F>(upgrade: F) -> Self
    where
        F: Fn() -> Option<Item> + 'static,
    {
        Self(Rc::new(upgrade))
    }

    fn from_object<T: fmt::Debug + 'static>(weak: Weak<T>) -> Self {
        Self::new(move || weak.upgrade().map(Item::object))
    }

    /// Get the item back if it is still alive.
    pub fn upgrade(&self) -> Option<Item> {
        (self.0)()
    }
}

impl fmt::Debug for WeakItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(item) => write!(f, "WeakItem({item:?})"),
            None => write!(f, "WeakItem(<collected>)"),
        }
    }
}

/// How a peer keeps hold of its item.
#[derive(Debug, Clone)]
pub(crate) enum ItemHold {
    Strong(Item),
    Weak(WeakItem),
}

impl ItemHold {
    pub(crate) fn new(item: Item) -> Self {
        match item.data().downgrade() {
            Some(weak) => Self::Weak(weak),
            None => Self::Strong(item),
        }
    }

    pub(crate) fn get(&self) -> Option<Item> {
        match self {
            Self::Strong(item) => Some(item.clone()),
            Self::Weak(weak) => weak.upgrade(),
        }
    }
}

fn hash_of<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug)]
struct ValueItem<T>(T);

impl<T> DataItem for ValueItem<T>
where
    T: Eq + Hash + fmt::Debug + fmt::Display + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn item_eq(&self, other: &dyn DataItem) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|o| o.0 == self.0)
    }

    fn item_hash(&self) -> u64 {
        hash_of(&self.0)
    }

    fn hash_reliability(&self) -> HashReliability {
        HashReliability::Reliable
    }

    fn display_text(&self) -> Option<String> {
        Some(self.0.to_string())
    }
}

#[derive(Debug)]
struct UnhashedItem<T>(T);

impl<T> DataItem for UnhashedItem<T>
where
    T: PartialEq + fmt::Debug + fmt::Display + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn item_eq(&self, other: &dyn DataItem) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|o| o.0 == self.0)
    }

    fn item_hash(&self) -> u64 {
        0
    }

    fn hash_reliability(&self) -> HashReliability {
        HashReliability::Unreliable
    }

    fn display_text(&self) -> Option<String> {
        Some(self.0.to_string())
    }
}

#[derive(Debug)]
struct ObjectItem<T>(Rc<T>);

impl<T> DataItem for ObjectItem<T>
where
    T: fmt::Debug + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn item_eq(&self, other: &dyn DataItem) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|o| Rc::ptr_eq(&o.0, &self.0))
    }

    fn item_hash(&self) -> u64 {
        Rc::as_ptr(&self.0) as *const () as usize as u64
    }

    fn hash_reliability(&self) -> HashReliability {
        HashReliability::Reliable
    }

    fn downgrade(&self) -> Option<WeakItem> {
        Some(WeakItem::from_object(Rc::downgrade(&self.0)))
    }
}

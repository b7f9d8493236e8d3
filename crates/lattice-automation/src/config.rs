//! Engine configuration.
//!
//! Every behavior switch the engine honors lives in [`EngineConfig`], passed in
//! when the engine is created. There is no global state. The configuration can
//! be built in code with the `with_*` setters or loaded from TOML:
//!
//! ```
//! use lattice_automation::{EngineConfig, VirtualAccessPolicy, VirtualAccessor};
//!
//! let config = EngineConfig::from_toml_str(r#"
//!     throw_on_virtualized_access = false
//!     deferred_realize_priority = "background"
//!
//!     [virtual_access]
//!     name = "default"
//! "#).unwrap();
//!
//! assert!(!config.throw_on_virtualized_access);
//! assert_eq!(config.virtual_access.policy(VirtualAccessor::Name), VirtualAccessPolicy::Default);
//! ```

use lattice_automation_core::DispatchPriority;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How an item peer answers an accessor while its item is virtual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VirtualAccessPolicy {
    /// Fail with `NotAvailable`, provided the host virtualizes and
    /// [`EngineConfig::throw_on_virtualized_access`] is on. Otherwise behaves
    /// like [`Default`](Self::Default).
    Throw,
    /// Answer with the accessor's documented virtual value.
    Default,
    /// Link the collection's offscreen container to the item, ask it once and
    /// unlink it again. Falls back to the default value when the host offers no
    /// offscreen container.
    RecyclableWrapper,
}

/// The accessors that consult a [`VirtualAccessPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VirtualAccessor {
    Name,
    AutomationId,
    HelpText,
    ItemStatus,
    BoundingRectangle,
    ClickablePoint,
    IsOffscreen,
    IsEnabled,
    IsKeyboardFocusable,
    HasKeyboardFocus,
    SetFocus,
    PositionInSet,
    SizeOfSet,
}

impl VirtualAccessor {
    /// Every accessor, in declaration order.
    pub const ALL: [VirtualAccessor; 13] = [
        VirtualAccessor::Name,
        VirtualAccessor::AutomationId,
        VirtualAccessor::HelpText,
        VirtualAccessor::ItemStatus,
        VirtualAccessor::BoundingRectangle,
        VirtualAccessor::ClickablePoint,
        VirtualAccessor::IsOffscreen,
        VirtualAccessor::IsEnabled,
        VirtualAccessor::IsKeyboardFocusable,
        VirtualAccessor::HasKeyboardFocus,
        VirtualAccessor::SetFocus,
        VirtualAccessor::PositionInSet,
        VirtualAccessor::SizeOfSet,
    ];
}

/// Per-accessor policy table for virtual item peers.
///
/// Defaults: identity-independent text (`name`, `automation_id`) comes from the
/// recyclable wrapper; container-dependent queries throw; `is_offscreen`,
/// `position_in_set` and `size_of_set` always have an answer without a
/// container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualAccessTable {
    pub name: VirtualAccessPolicy,
    pub automation_id: VirtualAccessPolicy,
    pub help_text: VirtualAccessPolicy,
    pub item_status: VirtualAccessPolicy,
    pub bounding_rectangle: VirtualAccessPolicy,
    pub clickable_point: VirtualAccessPolicy,
    pub is_offscreen: VirtualAccessPolicy,
    pub is_enabled: VirtualAccessPolicy,
    pub is_keyboard_focusable: VirtualAccessPolicy,
    pub has_keyboard_focus: VirtualAccessPolicy,
    pub set_focus: VirtualAccessPolicy,
    pub position_in_set: VirtualAccessPolicy,
    pub size_of_set: VirtualAccessPolicy,
}

impl Default for VirtualAccessTable {
    fn default() -> Self {
        Self {
            name: VirtualAccessPolicy::RecyclableWrapper,
            automation_id: VirtualAccessPolicy::RecyclableWrapper,
            help_text: VirtualAccessPolicy::Throw,
            item_status: VirtualAccessPolicy::Throw,
            bounding_rectangle: VirtualAccessPolicy::Throw,
            clickable_point: VirtualAccessPolicy::Throw,
            is_offscreen: VirtualAccessPolicy::Default,
            is_enabled: VirtualAccessPolicy::Throw,
            is_keyboard_focusable: VirtualAccessPolicy::Throw,
            has_keyboard_focus: VirtualAccessPolicy::Throw,
            set_focus: VirtualAccessPolicy::Throw,
            position_in_set: VirtualAccessPolicy::Default,
            size_of_set: VirtualAccessPolicy::Default,
        }
    }
}

impl VirtualAccessTable {
    /// A table answering every accessor with its default value.
    pub fn lenient() -> Self {
        let mut table = Self::default();
        for accessor in VirtualAccessor::ALL {
            table.set(accessor, VirtualAccessPolicy::Default);
        }
        table
    }

    /// The policy for one accessor.
    pub fn policy(&self, accessor: VirtualAccessor) -> VirtualAccessPolicy {
        match accessor {
            VirtualAccessor::Name => self.name,
            VirtualAccessor::AutomationId => self.automation_id,
            VirtualAccessor::HelpText => self.help_text,
            VirtualAccessor::ItemStatus => self.item_status,
            VirtualAccessor::BoundingRectangle => self.bounding_rectangle,
            VirtualAccessor::ClickablePoint => self.clickable_point,
            VirtualAccessor::IsOffscreen => self.is_offscreen,
            VirtualAccessor::IsEnabled => self.is_enabled,
            VirtualAccessor::IsKeyboardFocusable => self.is_keyboard_focusable,
            VirtualAccessor::HasKeyboardFocus => self.has_keyboard_focus,
            VirtualAccessor::SetFocus => self.set_focus,
            VirtualAccessor::PositionInSet => self.position_in_set,
            VirtualAccessor::SizeOfSet => self.size_of_set,
        }
    }

    /// Replace the policy for one accessor.
    pub fn set(&mut self, accessor: VirtualAccessor, policy: VirtualAccessPolicy) {
        let slot = match accessor {
            VirtualAccessor::Name => &mut self.name,
            VirtualAccessor::AutomationId => &mut self.automation_id,
            VirtualAccessor::HelpText => &mut self.help_text,
            VirtualAccessor::ItemStatus => &mut self.item_status,
            VirtualAccessor::BoundingRectangle => &mut self.bounding_rectangle,
            VirtualAccessor::ClickablePoint => &mut self.clickable_point,
            VirtualAccessor::IsOffscreen => &mut self.is_offscreen,
            VirtualAccessor::IsEnabled => &mut self.is_enabled,
            VirtualAccessor::IsKeyboardFocusable => &mut self.is_keyboard_focusable,
            VirtualAccessor::HasKeyboardFocus => &mut self.has_keyboard_focus,
            VirtualAccessor::SetFocus => &mut self.set_focus,
            VirtualAccessor::PositionInSet => &mut self.position_in_set,
            VirtualAccessor::SizeOfSet => &mut self.size_of_set,
        };
        *slot = policy;
    }
}

/// Behavior switches for an [`AutomationEngine`](crate::AutomationEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Allow `Throw` policies to fail with `NotAvailable`. When off, every
    /// `Throw` entry answers with the default value instead.
    pub throw_on_virtualized_access: bool,
    /// Consult the proxy registry when a rebuild misses the identity map.
    pub reuse_proxied_peers: bool,
    /// Force-refresh a wrapper's children before reading them.
    pub refresh_wrapper_children: bool,
    /// Use the item's display text when the name comes back empty.
    pub name_falls_back_to_item_text: bool,
    /// Dispatcher tier for realize requests that must wait for the generator.
    pub deferred_realize_priority: DispatchPriority,
    /// Sweep dead registry entries after every rebuild.
    pub purge_after_rebuild: bool,
    /// Per-accessor behavior for virtual item peers.
    pub virtual_access: VirtualAccessTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            throw_on_virtualized_access: true,
            reuse_proxied_peers: true,
            refresh_wrapper_children: true,
            name_falls_back_to_item_text: true,
            deferred_realize_priority: DispatchPriority::Loaded,
            purge_after_rebuild: true,
            virtual_access: VirtualAccessTable::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Serialize the configuration to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| crate::AutomationError::Config(e.to_string()))
    }

    /// Set whether `Throw` policies may fail.
    pub fn with_throw_on_virtualized_access(mut self, enabled: bool) -> Self {
        self.throw_on_virtualized_access = enabled;
        self
    }

    /// Set the policy for one accessor.
    pub fn with_virtual_access(mut self, accessor: VirtualAccessor, policy: VirtualAccessPolicy) -> Self {
        self.virtual_access.set(accessor, policy);
        self
    }

    /// Set whether rebuilds consult the proxy registry.
    pub fn with_reuse_proxied_peers(mut self, enabled: bool) -> Self {
        self.reuse_proxied_peers = enabled;
        self
    }

    /// Set whether wrapper children are refreshed before reads.
    pub fn with_refresh_wrapper_children(mut self, enabled: bool) -> Self {
        self.refresh_wrapper_children = enabled;
        self
    }

    /// Set whether empty names fall back to item text.
    pub fn with_name_falls_back_to_item_text(mut self, enabled: bool) -> Self {
        self.name_falls_back_to_item_text = enabled;
        self
    }

    /// Set the dispatcher tier for deferred realize requests.
    pub fn with_deferred_realize_priority(mut self, priority: DispatchPriority) -> Self {
        self.deferred_realize_priority = priority;
        self
    }

    /// Set whether the registry is purged after each rebuild.
    pub fn with_purge_after_rebuild(mut self, enabled: bool) -> Self {
        self.purge_after_rebuild = enabled;
        self
    }
}

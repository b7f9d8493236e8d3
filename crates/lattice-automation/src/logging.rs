//! Logging and tree inspection.
//!
//! Tracing targets and span names live in [`lattice_automation_core::logging`]
//! and are re-exported here. [`PeerTreeDebug`] renders the peer tree an engine
//! has cached:
//!
//! ```
//! use lattice_automation::AutomationEngine;
//! use lattice_automation::logging::{PeerTreeDebug, TreeFormatOptions};
//!
//! let engine = AutomationEngine::new();
//! let debug = PeerTreeDebug::with_options(TreeFormatOptions::minimal());
//! assert!(debug.format_all(&engine).contains("0 peers"));
//! ```

use std::fmt::Write;

pub use lattice_automation_core::logging::{PerfSpan, span_names, targets};

use crate::engine::AutomationEngine;
use crate::error::{AutomationError, Result};
use crate::peer::{PeerChild, PeerId, PeerKind, PeerNode};

/// Style options for peer tree output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Compact single-line representation.
    Compact,
}

/// Configuration for peer tree output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    pub style: TreeStyle,
    /// Whether to show peer ids.
    pub show_ids: bool,
    /// Whether to show peer kinds.
    pub show_kinds: bool,
    /// Whether to show the two invalidation flags.
    pub show_flags: bool,
    /// Maximum depth to traverse (None for unlimited).
    pub max_depth: Option<usize>,
    /// Indent size for each level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: true,
            show_kinds: true,
            show_flags: false,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Options for detailed output, flags included.
    pub fn detailed() -> Self {
        Self {
            show_flags: true,
            ..Default::default()
        }
    }

    /// Options for labels only.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            show_kinds: false,
            show_flags: false,
            ..Default::default()
        }
    }
}

/// Renders the cached peer tree of an engine.
///
/// Only child lists already cached are walked; formatting never triggers a
/// rebuild or touches a host.
#[derive(Debug, Clone, Default)]
pub struct PeerTreeDebug {
    options: TreeFormatOptions,
}

impl PeerTreeDebug {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Format every root peer (peers without a parent).
    pub fn format_all(&self, engine: &AutomationEngine) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "Peer Tree ({} peers):", engine.peers.len());
        let roots: Vec<PeerId> = engine
            .peers
            .iter()
            .filter(|(_, node)| node.parent.is_none() && node.kind.is_collection())
            .map(|(id, _)| id)
            .collect();
        if roots.is_empty() {
            output.push_str("  (empty)\n");
        }
        for root in roots {
            self.format_node(engine, root, 0, true, &mut output);
        }
        output
    }

    /// Format the subtree under one peer.
    pub fn format_subtree(&self, engine: &AutomationEngine, root: PeerId) -> Result<String> {
        if !engine.contains_peer(root) {
            return Err(AutomationError::InvalidPeer(root));
        }
        let mut output = String::new();
        self.format_node(engine, root, 0, true, &mut output);
        Ok(output)
    }

    fn format_node(
        &self,
        engine: &AutomationEngine,
        id: PeerId,
        depth: usize,
        is_last: bool,
        output: &mut String,
    ) {
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return;
        }
        let Some(node) = engine.peers.get(id) else {
            return;
        };

        output.push_str(&self.build_prefix(depth, is_last));
        output.push_str(&peer_label(node));
        if self.options.show_ids {
            let _ = write!(output, " [{id:?}]");
        }
        if self.options.show_kinds {
            let _ = write!(output, " ({:?})", node.kind);
        }
        if self.options.show_flags {
            let _ = write!(
                output,
                " ancestors_invalid={} children_valid={}",
                node.ancestors_invalid, node.children_valid
            );
        }
        output.push('\n');

        let count = node.children.len();
        for (i, child) in node.children.iter().enumerate() {
            let last = i + 1 == count;
            match child {
                PeerChild::Peer(child) => self.format_node(engine, *child, depth + 1, last, output),
                PeerChild::Element(element) => {
                    if self.options.max_depth.is_some_and(|max| depth + 1 > max) {
                        continue;
                    }
                    output.push_str(&self.build_prefix(depth + 1, last));
                    let name = element.name();
                    output.push_str(if name.is_empty() { "(element)" } else { &name });
                    output.push('\n');
                }
            }
        }
    }

    fn build_prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }

        let (branch, corner, last_corner) = match self.options.style {
            TreeStyle::Ascii => ("|", "+-- ", "`-- "),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500} ", "\u{2514}\u{2500}\u{2500} "),
            TreeStyle::Compact => ("", "- ", "- "),
        };

        let mut prefix = String::new();
        for _ in 0..(depth - 1) {
            prefix.push_str(branch);
            prefix.extend(std::iter::repeat_n(' ', self.options.indent_size));
        }
        prefix.push_str(if is_last { last_corner } else { corner });
        prefix
    }
}

fn peer_label(node: &PeerNode) -> String {
    match node.kind {
        PeerKind::Collection(kind) => format!("{kind:?}"),
        PeerKind::Group => node
            .group
            .as_ref()
            .map(|g| g.name())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "(group)".to_owned()),
        PeerKind::Item(_) => match node.current_item() {
            Some(item) => item.display_text().unwrap_or_else(|| "(item)".to_owned()),
            None => "(collected)".to_owned(),
        },
    }
}

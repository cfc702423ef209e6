//! Content-generation tools discovered at startup.

use serde::{Deserialize, Serialize};

use crate::enums::ContentKind;

/// A tool advertised by the capability-discovery endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name as advertised.
    pub name: String,
    /// Free-form description, empty when the endpoint gave none.
    #[serde(default)]
    pub description: String,
}

/// The set of tools discovered at initialization.
///
/// An empty catalog means discovery failed or advertised nothing; content
/// prompts are then logged without a target tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCatalog {
    tools: Vec<ToolDescriptor>,
}

impl ToolCatalog {
    /// Wrap a list of discovered tools.
    pub const fn new(tools: Vec<ToolDescriptor>) -> Self {
        Self { tools }
    }

    /// An empty catalog.
    pub const fn empty() -> Self {
        Self { tools: Vec::new() }
    }

    /// Number of discovered tools.
    pub const fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools were discovered.
    pub const fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Iterate over the discovered tools.
    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter()
    }

    /// The first tool whose name or description mentions the tool family
    /// for `kind`, compared case-insensitively.
    pub fn tool_for(&self, kind: ContentKind) -> Option<&ToolDescriptor> {
        let family = kind.tool_family();
        self.tools.iter().find(|tool| {
            tool.name.to_lowercase().contains(family)
                || tool.description.to_lowercase().contains(family)
        })
    }
}

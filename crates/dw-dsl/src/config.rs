//! Configuration for script parsing.

/// Markers that classify terminal sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptConfig {
    /// Text that marks a terminal section as lethal.
    pub lethal_marker: String,
    /// Text that must mark victory sections. When `None`, any terminal
    /// section without the lethal marker is a victory.
    pub victory_marker: Option<String>,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            lethal_marker: "**потрачено**".to_string(),
            victory_marker: None,
        }
    }
}

impl ScriptConfig {
    /// Set the lethal marker.
    pub fn with_lethal_marker(mut self, marker: impl Into<String>) -> Self {
        self.lethal_marker = marker.into();
        self
    }

    /// Require an explicit victory marker.
    pub fn with_victory_marker(mut self, marker: impl Into<String>) -> Self {
        self.victory_marker = Some(marker.into());
        self
    }
}

//! Reversible encoding of tool names for providers with strict naming rules
//!
//! Bedrock only accepts tool names matching `[a-zA-Z][a-zA-Z0-9_]*` of at most
//! 64 characters. Callers may supply arbitrary names, so each request builds a
//! [`ToolNameMap`] that rewrites names on the way out and restores them on the
//! way back in. Names that are already valid pass through untouched.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::types::ToolDefinition;

/// Longest tool name Bedrock accepts
pub const MAX_TOOL_NAME_LEN: usize = 64;

fn valid_tool_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_]{0,63}$").expect("valid tool name regex"))
}

/// Whether a name can be sent to Bedrock as-is
pub fn is_valid_tool_name(name: &str) -> bool {
    valid_tool_name_regex().is_match(name)
}

/// Rewrite a name into the allowed alphabet without collision handling
pub fn sanitize_tool_name(name: &str) -> String {
    if is_valid_tool_name(name) {
        return name.to_owned();
    }

    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if !out.starts_with(|c: char| c.is_ascii_alphabetic()) {
        out.insert(0, 't');
    }

    out.truncate(MAX_TOOL_NAME_LEN);
    out
}

/// Bidirectional mapping between caller tool names and wire tool names
#[derive(Debug, Clone, Default)]
pub struct ToolNameMap {
    to_wire: HashMap<String, String>,
    from_wire: HashMap<String, String>,
}

impl ToolNameMap {
    /// Build the mapping for every tool offered in a request
    ///
    /// Valid names are reserved first so they never get a collision suffix.
    pub fn from_tools(tools: &[ToolDefinition]) -> Self {
        let mut map = Self::default();
        let (valid, invalid): (Vec<&str>, Vec<&str>) = tools
            .iter()
            .map(|t| t.name.as_str())
            .partition(|name| is_valid_tool_name(name));
        for name in valid.into_iter().chain(invalid) {
            map.insert(name);
        }
        map
    }

    fn insert(&mut self, name: &str) {
        if self.to_wire.contains_key(name) {
            return;
        }

        let base = sanitize_tool_name(name);
        let mut wire = base.clone();
        let mut n = 1usize;
        while self.from_wire.contains_key(&wire) {
            let suffix = format!("_{n}");
            let keep = MAX_TOOL_NAME_LEN.saturating_sub(suffix.len()).min(base.len());
            wire = format!("{}{suffix}", &base[..keep]);
            n += 1;
        }

        self.to_wire.insert(name.to_owned(), wire.clone());
        self.from_wire.insert(wire, name.to_owned());
    }

    /// Wire name for a caller name; unknown names are sanitized on the fly
    pub fn encode(&self, name: &str) -> String {
        self.to_wire
            .get(name)
            .cloned()
            .unwrap_or_else(|| sanitize_tool_name(name))
    }

    /// Caller name for a wire name; unknown names are returned unchanged
    pub fn decode(&self, wire: &str) -> String {
        self.from_wire.get(wire).cloned().unwrap_or_else(|| wire.to_owned())
    }

    /// Whether any name needed rewriting
    pub fn is_identity(&self) -> bool {
        self.to_wire.iter().all(|(name, wire)| name == wire)
    }
}

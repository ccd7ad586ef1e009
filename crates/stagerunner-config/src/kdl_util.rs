// Helper functions for extracting values from KDL nodes

use kdl::{KdlNode, KdlValue};

use crate::{ConfigError, ConfigResult};

pub(crate) fn first_arg(node: &KdlNode) -> Option<&KdlValue> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .map(|e| e.value())
}

pub(crate) fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    first_arg(node)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

pub(crate) fn get_bool_prop(node: &KdlNode, name: &str) -> Option<bool> {
    node.get(name).and_then(|v| v.as_bool())
}

/// Child nodes of `node`, empty when it has no children block.
pub(crate) fn children(node: &KdlNode) -> impl Iterator<Item = &KdlNode> {
    node.children().into_iter().flat_map(|doc| doc.nodes())
}

pub(crate) fn require_string(node: &KdlNode, field: &str) -> ConfigResult<String> {
    get_first_string_arg(node).ok_or_else(|| ConfigError::invalid(field, "expected a string"))
}

pub(crate) fn require_u64(node: &KdlNode, field: &str) -> ConfigResult<u64> {
    let value = first_arg(node)
        .and_then(|v| v.as_integer())
        .ok_or_else(|| ConfigError::invalid(field, "expected an integer"))?;
    u64::try_from(value).map_err(|_| ConfigError::invalid(field, format!("{} is out of range", value)))
}

pub(crate) fn require_usize(node: &KdlNode, field: &str) -> ConfigResult<usize> {
    let value = require_u64(node, field)?;
    usize::try_from(value).map_err(|_| ConfigError::invalid(field, format!("{} is out of range", value)))
}

/// Accepts both `0.5` and `1`.
pub(crate) fn require_f64(node: &KdlNode, field: &str) -> ConfigResult<f64> {
    first_arg(node)
        .and_then(|v| v.as_float().or_else(|| v.as_integer().map(|i| i as f64)))
        .ok_or_else(|| ConfigError::invalid(field, "expected a number"))
}

//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::AutomationError;

/// Map domain errors to a string for CLI output, prefixed with the error class.
pub fn map_error(e: &AutomationError) -> String {
    format!("[{}] {}", e.kind(), e)
}

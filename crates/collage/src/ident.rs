//! Safe SQL identifier handling.
//!
//! Everything downstream of [`sanitize`] treats the returned name as literal
//! SQL text, so this is the single point where injection is ruled out. The
//! grammar is deliberately narrow: ASCII letters, digits, and underscores,
//! not starting with a digit. No quoting, no Unicode folding, no trimming.

use crate::error::{EngineError, EngineResult};

/// Validate a bare identifier against `[A-Za-z_][A-Za-z0-9_]*`.
///
/// Returns the input unchanged on success so call sites can embed it
/// directly in a SQL fragment.
pub fn sanitize(name: &str) -> EngineResult<&str> {
    let mut chars = name.chars();

    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return Err(EngineError::InvalidFieldName(name.to_string())),
    }

    for c in chars {
        if c != '_' && !c.is_ascii_alphanumeric() {
            return Err(EngineError::InvalidFieldName(name.to_string()));
        }
    }

    Ok(name)
}

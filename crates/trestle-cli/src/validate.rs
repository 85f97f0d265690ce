//! Client-id validation, enforced before anything reaches the hub.

use std::sync::LazyLock;

use anyhow::{Result, bail};
use regex::Regex;

/// Shortest allowed client id.
const MIN_LEN: usize = 1;
/// Longest allowed client id.
const MAX_LEN: usize = 100;

static CLIENT_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[a-zA-Z0-9-@._]*$").unwrap());

/// Check that a client id is acceptable to the hub.
pub fn check_client_id(client_id: &str) -> Result<()> {
    if client_id.len() < MIN_LEN || client_id.len() > MAX_LEN {
        bail!("a client id must be between {MIN_LEN} and {MAX_LEN} characters");
    }
    if !CLIENT_ID_PATTERN.is_match(client_id) {
        bail!("a client id may only contain letters, digits and - @ . _");
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

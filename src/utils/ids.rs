//! Id generation helpers.
//!
//! Two flavors of ids are used across the crate:
//!
//! - [`fresh_id`]: uuid-backed ids for nodes, edges, and other entities
//!   whose identity must be unique across the graph's lifetime.
//! - [`timestamp_id`]: millisecond-timestamp ids for optimistically
//!   appended chat messages, where the local ordering hint is useful and
//!   the backend later assigns the durable identity.

use chrono::Utc;
use uuid::Uuid;

/// Generate a globally unique id with the given prefix, e.g. `node-<uuid>`.
#[must_use]
pub fn fresh_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

/// Generate a locally ordered id from the current wall clock,
/// e.g. `msg-1712345678901`.
///
/// Collisions within the same millisecond are tolerable: these ids only
/// label tentative client-side entries and are never sent to the backend.
#[must_use]
pub fn timestamp_id(prefix: &str) -> String {
    format!("{prefix}-{}", Utc::now().timestamp_millis())
}

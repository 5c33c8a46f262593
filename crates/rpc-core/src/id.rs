//! Unique id generation (§4.1 `genId`).

use uuid::Uuid;

/// Generate a time-prefixed, process-unique token suitable for handle ids
/// and call ids.
///
/// Format: `<millis-since-unix-epoch>-<uuid-v4>` — the millis prefix keeps
/// ids roughly sortable by creation time, and the v4 suffix supplies the
/// actual uniqueness guarantee rather than a hand-rolled counter.
#[must_use]
pub fn gen_id() -> String {
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("{millis:x}-{}", Uuid::new_v4())
}

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::history::sort_newest_first;

/// Best-effort read of a previously written snapshot's messages. A missing,
/// unreadable, or malformed file is the same as an empty history: it must
/// never block a fresh full sync.
pub fn load_existing_messages(path: &Path) -> Vec<Value> {
    fn read(path: &Path) -> Option<Vec<Value>> {
        let content = fs::read_to_string(path).ok()?;
        let snapshot: Value = serde_json::from_str(&content).ok()?;
        Some(snapshot.get("messages")?.as_array()?.clone())
    }
    read(path).unwrap_or_default()
}

/// Best-effort read of the persisted user directory.
pub fn load_existing_usernames(path: &Path) -> BTreeMap<String, String> {
    fn read(path: &Path) -> Option<BTreeMap<String, String>> {
        let content = fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }
    read(path).unwrap_or_default()
}

/// Overlay a freshly listed id→name mapping on the stored one. Fresh entries
/// win on shared ids; ids that vanished from the remote listing are kept.
pub fn merge_usernames(
    existing: BTreeMap<String, String>,
    fresh: BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = existing;
    merged.extend(fresh);
    merged
}

/// Consume a newest-first message source until it either ends or yields a
/// message that is already stored, then combine with the stored collection
/// and re-sort newest first.
///
/// The first exact structural match marks the overlap boundary: the source
/// yields strictly newest-first, so everything it would produce after that
/// point was captured by an earlier run. Stopping there bounds the fetch to
/// the new messages plus at most one already-seen message. Nothing is ever
/// dropped from the stored collection.
///
/// Equality is over the full enriched message, so if the derivation of
/// `date` or `username` changes between runs the boundary is missed and old
/// messages are re-appended as duplicates sharing a `ts`.
pub fn merge_messages<I>(existing: Vec<Value>, source: I) -> Result<Vec<Value>>
where
    I: IntoIterator<Item = Result<Value>>,
{
    let mut combined = Vec::new();
    for message in source {
        let message = message?;
        if existing.contains(&message) {
            break;
        }
        combined.push(message);
    }
    combined.extend(existing);
    sort_newest_first(&mut combined);
    Ok(combined)
}

/// Serialize `data` as pretty-printed JSON and atomically replace `path`.
/// Parent directories are created as needed. The write goes to a sibling
/// temp file first, then renames into place, so a crash mid-write never
/// leaves a truncated file at the final path.
pub fn write_json_atomic<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| AppError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }
    let json =
        serde_json::to_string_pretty(data).map_err(|e| AppError::JsonSerialize(e.to_string()))?;
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, json).map_err(|e| AppError::WriteFile {
        path: temp_path.display().to_string(),
        source: e,
    })?;
    fs::rename(&temp_path, path).map_err(|e| AppError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(())
}

/// Persist one conversation snapshot: the raw descriptor for provenance plus
/// the full merged message collection, newest messages at the top.
pub fn write_snapshot(path: &Path, info: &Value, messages: &[Value]) -> Result<()> {
    let snapshot = serde_json::json!({
        "channel": info,
        "messages": messages,
    });
    write_json_atomic(path, &snapshot)
}

/// Merge a conversation's live history into its snapshot file and return the
/// number of newly stored messages. The existing file is not rewritten until
/// the merged collection is fully assembled, so a fetch failure leaves the
/// prior snapshot untouched.
pub fn sync_conversation<I>(path: &Path, info: &Value, source: I) -> Result<usize>
where
    I: IntoIterator<Item = Result<Value>>,
{
    let existing = load_existing_messages(path);
    let existing_count = existing.len();
    let merged = merge_messages(existing, source)?;
    write_snapshot(path, info, &merged)?;
    Ok(merged.len() - existing_count)
}

/// Merge the freshly listed user directory into its snapshot file and return
/// the merged directory for author resolution during channel processing.
pub fn sync_usernames(
    path: &Path,
    fresh: BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>> {
    let merged = merge_usernames(load_existing_usernames(path), fresh);
    write_json_atomic(path, &merged)?;
    Ok(merged)
}

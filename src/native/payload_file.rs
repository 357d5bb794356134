//! Application data travels between windows as a small JSON file: the dragged
//! native item is the file's path, and the receiving window reads it back on drop.

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub fn write_payload(data: &serde_json::Value, prefix: &str) -> Result<NamedTempFile, String> {
    let bytes = serde_json::to_vec(data).map_err(|e| format!("Failed to encode payload: {}", e))?;

    let mut file = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".json")
        .tempfile()
        .map_err(|e| format!("Failed to create payload file: {}", e))?;
    file.write_all(&bytes)
        .and_then(|_| file.flush())
        .map_err(|e| format!("Failed to write payload file: {}", e))?;

    Ok(file)
}

/// Whether `path` names a payload file written by this plugin.
pub fn is_payload_file(path: &Path, prefix: &str) -> bool {
    path.file_name()
        .and_then(|f| f.to_str())
        .map(|f| f.starts_with(prefix))
        .unwrap_or_default()
}

pub fn read_payload(path: &Path) -> Result<serde_json::Value, String> {
    let bytes = std::fs::read(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| format!("Invalid payload in {}: {}", path.display(), e))
}

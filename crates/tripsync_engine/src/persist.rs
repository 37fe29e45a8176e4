//! Small JSON state files.

use crate::error::SyncResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Reads a JSON state file, returning `None` if it does not exist.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> SyncResult<Option<T>> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let value = serde_json::from_slice(&data)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(Some(value))
}

/// Writes a JSON state file via a sibling temp file and rename, so readers
/// see either the old or the new value and never a torn write.
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> SyncResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let data = serde_json::to_vec_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let tmp = temp_path(path)?;
    let result = replace_with(&tmp, path, &data);
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// Sibling temp file named after the full file name (`state.json.tmp`).
fn temp_path(path: &Path) -> io::Result<PathBuf> {
    let mut name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?
        .to_os_string();
    name.push(".tmp");
    Ok(path.with_file_name(name))
}

fn replace_with(tmp: &Path, path: &Path, data: &[u8]) -> SyncResult<()> {
    {
        let mut file = fs::File::create(tmp)?;
        file.write_all(data)?;
        file.sync_all()?;
    }
    fs::rename(tmp, path)?;
    Ok(())
}

//! Cursor command implementation.

use std::path::Path;
use tripsync_engine::{CursorStore, FileCursorStore, SyncResult};
use tripsync_protocol::Timestamp;

/// Reads the cursor stored at `path`.
pub fn read(path: &Path) -> SyncResult<Option<Timestamp>> {
    FileCursorStore::open(path)?.last_pulled_at()
}

/// Prints the cursor stored at `path`.
pub fn show(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    match read(path)? {
        Some(cursor) => println!("last_pulled_at: {}", cursor.as_millis()),
        None => println!("last_pulled_at: none (next pull fetches everything)"),
    }
    Ok(())
}

/// Clears the cursor stored at `path`.
pub fn reset(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileCursorStore::open(path)?;
    let previous = store.last_pulled_at()?;
    store.save(None)?;
    tracing::info!(
        path = %path.display(),
        previous = ?previous.map(|t| t.as_millis()),
        "cursor reset"
    );
    println!("cursor reset");
    Ok(())
}

//! Merge command implementation.

use serde::Serialize;
use std::fs;
use std::path::Path;
use tripsync_protocol::{merge, SyncBatch};

/// Summary of a merge.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct MergeSummary {
    /// Envelopes in the local input.
    pub local: usize,
    /// Envelopes in the remote input.
    pub remote: usize,
    /// Envelopes in the merged output.
    pub merged: usize,
    /// Tombstones in the merged output.
    pub tombstones: usize,
}

/// Reads a JSON array of envelopes.
pub fn read_batch(path: &Path) -> Result<SyncBatch, Box<dyn std::error::Error>> {
    let data = fs::read(path).map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    let batch = serde_json::from_slice(&data)
        .map_err(|e| format!("invalid batch in {}: {}", path.display(), e))?;
    Ok(batch)
}

/// Merges two batch files.
pub fn merge_files(
    local: &Path,
    remote: &Path,
) -> Result<(SyncBatch, MergeSummary), Box<dyn std::error::Error>> {
    let local = read_batch(local)?;
    let remote = read_batch(remote)?;
    let (local_len, remote_len) = (local.len(), remote.len());

    let merged = merge(local, remote);
    let summary = MergeSummary {
        local: local_len,
        remote: remote_len,
        merged: merged.len(),
        tombstones: merged.iter().filter(|e| e.is_deleted).count(),
    };
    Ok((merged, summary))
}

/// Runs the merge command.
pub fn run(
    local: &Path,
    remote: &Path,
    output: Option<&Path>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let (merged, summary) = merge_files(local, remote)?;
    tracing::debug!(?summary, "merged batches");

    if let Some(output) = output {
        fs::write(output, serde_json::to_vec_pretty(&merged)?)?;
    }

    match format {
        "text" => print_text_output(&merged, &summary),
        _ if output.is_none() => println!("{}", serde_json::to_string_pretty(&merged)?),
        _ => println!("{}", serde_json::to_string_pretty(&summary)?),
    }

    Ok(())
}

fn print_text_output(merged: &SyncBatch, summary: &MergeSummary) {
    println!("Merge Result");
    println!("============");
    println!();
    println!("  Local:      {}", summary.local);
    println!("  Remote:     {}", summary.remote);
    println!("  Merged:     {}", summary.merged);
    println!("  Tombstones: {}", summary.tombstones);
    println!();
    for envelope in merged {
        println!(
            "  {:<6} {} @{}{}",
            envelope.kind.as_str(),
            envelope.id,
            envelope.updated_at.as_millis(),
            if envelope.is_deleted { " (deleted)" } else { "" }
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tripsync_protocol::{RecordEnvelope, RecordKind, Timestamp};
    use uuid::Uuid;

    fn write(dir: &TempDir, name: &str, batch: &SyncBatch) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, serde_json::to_vec(batch).unwrap()).unwrap();
        path
    }

    #[test]
    fn merges_files_with_lww() {
        let dir = TempDir::new().unwrap();
        let id = Uuid::new_v4();
        let local = vec![RecordEnvelope::new(
            RecordKind::Trip,
            id,
            Timestamp::from_millis(10),
            b"old".to_vec(),
        )];
        let remote = vec![
            RecordEnvelope::tombstone(RecordKind::Trip, id, Timestamp::from_millis(20)),
            RecordEnvelope::new(RecordKind::Tag, Uuid::new_v4(), Timestamp::from_millis(5), vec![]),
        ];

        let (merged, summary) = merge_files(
            &write(&dir, "local.json", &local),
            &write(&dir, "remote.json", &remote),
        )
        .unwrap();

        assert_eq!(
            summary,
            MergeSummary {
                local: 1,
                remote: 2,
                merged: 2,
                tombstones: 1
            }
        );
        assert_eq!(merged[0].kind, RecordKind::Tag);
        assert!(merged[1].is_deleted);
    }

    #[test]
    fn invalid_file_names_the_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, b"{}").unwrap();

        let err = read_batch(&path).unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }
}

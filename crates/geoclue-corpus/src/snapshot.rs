//! Flat JSON snapshot of the corpus.
//!
//! The file is a single array of `{text, region, category, embedding}` rows.
//! `f32` values are written in their shortest round-trip form, so a reload
//! yields bit-identical vectors.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use geoclue_core::error::{Error, Result};
use geoclue_core::types::Document;

pub fn read_snapshot(path: &Path) -> Result<Vec<Document>> {
    let unavailable = |reason: String| Error::CorpusUnavailable { path: path.to_path_buf(), reason };
    let file = File::open(path).map_err(|e| unavailable(e.to_string()))?;
    serde_json::from_reader(std::io::BufReader::new(file)).map_err(|e| unavailable(format!("unreadable snapshot: {}", e)))
}

/// Write the snapshot through a temp file in the destination directory and
/// rename it into place, so readers never observe a partial file.
pub fn write_snapshot(path: &Path, documents: &[Document]) -> Result<()> {
    let failed = |what: &str, e: &dyn std::fmt::Display| {
        Error::Operation(format!("failed to {} snapshot {}: {}", what, path.display(), e))
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| failed("create directory for", &e))?;
    let tmp = NamedTempFile::new_in(dir).map_err(|e| failed("stage", &e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer(&mut writer, documents).map_err(|e| failed("serialize", &e))?;
        writer.flush().map_err(|e| failed("write", &e))?;
    }
    tmp.as_file().sync_all().map_err(|e| failed("sync", &e))?;
    tmp.persist(path).map_err(|e| failed("persist", &e.error))?;
    Ok(())
}

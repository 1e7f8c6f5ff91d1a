// [apps/worker/src/log.rs]
//! Per-task log file the executor appends to for the lifetime of one
//! job (spec 4.F). Plain line-oriented text, opened fresh on every
//! append — tasks run sequentially within a worker, so there is never
//! contention on one task's file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

pub fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")
}

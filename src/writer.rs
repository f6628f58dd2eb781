use crate::error::{Error, Result};
use crate::models::Assignment;
use csv::{Terminator, WriterBuilder};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const HEADER: [&str; 3] = ["Stud_ID", "Paper_assigned", "Pref_No"];

/// Writes the assignment as CSV. An existing destination is only replaced
/// when `force` is set; the file is either fully written or left as it was.
pub fn write_assignment(assignment: &Assignment, path: impl AsRef<Path>, force: bool) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        if !force {
            return Err(Error::OutputConflict {
                path: path.to_path_buf(),
            });
        }
        tracing::info!("The output file {} will be overwritten", path.display());
    }

    let staging = staging_path(path);
    if let Err(source) = write_then_rename(assignment, &staging, path) {
        // Best effort; the staging file may never have been created.
        let _ = fs::remove_file(&staging);
        return Err(Error::OutputWriteFailure {
            path: path.to_path_buf(),
            source,
        });
    }

    tracing::info!("Please see the file {} for the assignment results", path.display());
    Ok(())
}

fn write_then_rename(assignment: &Assignment, staging: &Path, path: &Path) -> io::Result<()> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_path(staging)?;

    writer.write_record(HEADER)?;
    for (id, assigned) in assignment {
        writer.write_record([
            id.key().to_string(),
            assigned.paper.clone(),
            assigned.rank_label(),
        ])?;
    }

    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    drop(file);
    fs::rename(staging, path)
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "assignment".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

/// Console rendering of an assignment for verbose runs.
pub fn render_table(assignment: &Assignment) -> String {
    let width = assignment
        .values()
        .map(|a| a.paper.chars().count())
        .chain(std::iter::once(HEADER[1].len()))
        .max()
        .unwrap_or_default();

    let mut content = format!("{:<10} {:<width$} {}\n", HEADER[0], HEADER[1], HEADER[2]);
    for (id, assigned) in assignment {
        content.push_str(&format!(
            "{:<10} {:<width$} {}\n",
            id.key(),
            assigned.paper,
            assigned.rank_label()
        ));
    }
    content
}

use crate::error::{Error, Result};
use crate::models::{PaperPool, StudentId, StudentPreference, MAX_PREFERENCES};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

/// Reads the roster: one `id, pref1, .., pref4` record per student.
pub fn read_preferences(path: impl AsRef<Path>, has_headers: bool) -> Result<Vec<StudentPreference>> {
    let path = path.as_ref();
    let mut reader = open(path, has_headers)?;

    let mut students = Vec::new();
    let mut seen = HashSet::new();
    for record in reader.records() {
        let record = record.map_err(|e| Error::unreadable(path, e.into()))?;
        let line = line_of(&record);

        let raw_id = record.get(0).unwrap_or_default();
        let id = StudentId::parse(raw_id).ok_or_else(|| Error::InvalidRecord {
            path: path.to_path_buf(),
            line,
            reason: if raw_id.is_empty() {
                "missing student id".to_string()
            } else {
                format!("student id '{}' is not a number", raw_id)
            },
        })?;
        if !seen.insert(id.key()) {
            return Err(Error::DuplicateStudent {
                path: path.to_path_buf(),
                id: id.to_string(),
            });
        }

        let slots: Vec<&str> = (1..=MAX_PREFERENCES)
            .map(|i| record.get(i).unwrap_or_default())
            .collect();
        let student = StudentPreference::new(id, &slots);

        let stated = slots.iter().filter(|s| !s.is_empty()).count();
        if stated > student.preferences().len() {
            tracing::warn!(
                "Student {} (line {}): preferences after the first blank rank are ignored",
                student.id,
                line
            );
        }
        students.push(student);
    }

    tracing::info!("Read preferences for {} students from {}", students.len(), path.display());
    Ok(students)
}

/// Reads the paper pool: the first column of every record.
pub fn read_papers(path: impl AsRef<Path>, has_headers: bool) -> Result<PaperPool> {
    let path = path.as_ref();
    let mut reader = open(path, has_headers)?;

    let mut papers = PaperPool::new();
    for record in reader.records() {
        let record = record.map_err(|e| Error::unreadable(path, e.into()))?;
        let paper = record.get(0).unwrap_or_default();
        if paper.is_empty() {
            continue;
        }
        if !papers.insert(paper.to_string()) {
            tracing::warn!("Paper {} listed more than once in {}", paper, path.display());
        }
    }

    tracing::info!("Read {} papers from {}", papers.len(), path.display());
    Ok(papers)
}

/// Logs preferences that can never be honored because the paper is not offered.
pub fn report_unknown_preferences(students: &[StudentPreference], papers: &PaperPool) {
    for student in students {
        for (rank, paper) in student.ranked() {
            if !papers.contains(paper) {
                tracing::debug!(
                    "Student {} ranks unknown paper {} at {}",
                    student.id,
                    paper,
                    rank
                );
            }
        }
    }
}

fn open(path: &Path, has_headers: bool) -> Result<csv::Reader<File>> {
    let file = File::open(path).map_err(|e| Error::unreadable(path, e))?;
    Ok(ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(file))
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or_default()
}

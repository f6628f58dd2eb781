use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Highest preference rank a student may state.
pub const MAX_PREFERENCES: usize = 4;

pub const DEFAULT_OUTPUT_FILE: &str = "assignment_result.csv";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub output_file: String,
    pub seed: Option<u64>,
    // Both input files start with a header row unless disabled
    pub has_headers: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_file: DEFAULT_OUTPUT_FILE.to_string(),
            seed: None,
            has_headers: true,
        }
    }
}

impl Config {
    pub fn load_from_file(file_path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(file_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, file_path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(file_path, content)?;
        Ok(())
    }
}

/// Student identifier as written in the roster, keyed by its numeric value.
#[derive(Debug, Clone)]
pub struct StudentId {
    raw: String,
    key: i64,
}

impl StudentId {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        trimmed.parse::<i64>().ok().map(|key| Self {
            raw: trimmed.to_string(),
            key,
        })
    }

    pub fn key(&self) -> i64 {
        self.key
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl PartialEq for StudentId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for StudentId {}

impl Hash for StudentId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for StudentId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StudentId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentPreference {
    pub id: StudentId,
    preferences: Vec<String>, // rank 1 first, never holds blanks
}

impl StudentPreference {
    /// Builds a record from raw rank slots. Slots after the first blank are
    /// dropped so ranks stay contiguous from 1.
    pub fn new<I, S>(id: StudentId, slots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let preferences = slots
            .into_iter()
            .take(MAX_PREFERENCES)
            .map(|slot| slot.as_ref().trim().to_string())
            .take_while(|slot| !slot.is_empty())
            .collect();
        Self { id, preferences }
    }

    pub fn preferences(&self) -> &[String] {
        &self.preferences
    }

    /// Ranked papers paired with their 1-based rank.
    pub fn ranked(&self) -> impl Iterator<Item = (u8, &str)> {
        self.preferences
            .iter()
            .enumerate()
            .map(|(i, paper)| ((i + 1) as u8, paper.as_str()))
    }
}

/// Papers available for allocation. Sorted so seeded draws are reproducible.
pub type PaperPool = BTreeSet<String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignedPaper {
    pub paper: String,
    pub rank: Option<u8>,
}

impl AssignedPaper {
    /// Rank as written to the output, empty for fallback assignments.
    pub fn rank_label(&self) -> String {
        self.rank.map(|r| r.to_string()).unwrap_or_default()
    }

    pub fn is_fallback(&self) -> bool {
        self.rank.is_none()
    }
}

/// Final allocation, iterated in ascending numeric student order.
pub type Assignment = BTreeMap<StudentId, AssignedPaper>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentSummary {
    pub students: usize,
    pub by_rank: [usize; MAX_PREFERENCES],
    pub fallback: usize,
    pub unused_papers: usize,
}

impl AssignmentSummary {
    pub fn from_assignment(assignment: &Assignment, pool_size: usize) -> Self {
        let mut summary = Self {
            students: assignment.len(),
            unused_papers: pool_size.saturating_sub(assignment.len()),
            ..Self::default()
        };
        for assigned in assignment.values() {
            if assigned.is_fallback() {
                summary.fallback += 1;
            } else if let Some(rank) = assigned.rank {
                summary.by_rank[usize::from(rank) - 1] += 1;
            }
        }
        summary
    }

    pub fn honored(&self) -> usize {
        self.by_rank.iter().sum()
    }
}

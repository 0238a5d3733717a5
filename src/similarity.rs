//! Line-match scoring of a monitoring log against reference data.
//!
//! Every reference line is looked up in the candidate from the top; a hit
//! counts once for that reference line, and the same candidate line may
//! satisfy any number of reference lines. The score is relative to the
//! reference length, so swapping the arguments generally changes it.

use log::warn;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityResult {
    pub matches: usize,
    pub reference_lines: usize,
    pub percentage: f64,
}

impl SimilarityResult {
    const EMPTY: Self = Self {
        matches: 0,
        reference_lines: 0,
        percentage: 0.0,
    };
}

/// Score in-memory line sequences.
pub fn score_lines<C, R>(candidate: &[C], reference: &[R]) -> SimilarityResult
where
    C: AsRef<str>,
    R: AsRef<str>,
{
    if reference.is_empty() {
        return SimilarityResult::EMPTY;
    }

    let matches = reference
        .iter()
        .filter(|line| {
            candidate
                .iter()
                .any(|candidate| candidate.as_ref() == line.as_ref())
        })
        .count();

    SimilarityResult {
        matches,
        reference_lines: reference.len(),
        percentage: matches as f64 / reference.len() as f64 * 100.0,
    }
}

/// Score two files. An unreadable file scores zero.
pub fn compare_files(candidate_log: &Path, reference_log: &Path) -> SimilarityResult {
    let Some(candidate) = read_lines(candidate_log) else {
        return SimilarityResult::EMPTY;
    };
    let Some(reference) = read_lines(reference_log) else {
        return SimilarityResult::EMPTY;
    };
    score_lines(candidate.as_slice(), reference.as_slice())
}

/// Match percentage of `reference_log` lines found in `candidate_log`, in [0, 100].
pub fn similarity(candidate_log: &Path, reference_log: &Path) -> f64 {
    compare_files(candidate_log, reference_log).percentage
}

fn read_lines(path: &Path) -> Option<Vec<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Some(content.lines().map(str::to_string).collect()),
        Err(e) => {
            warn!("Failed to open data file {}: {}", path.display(), e);
            None
        }
    }
}

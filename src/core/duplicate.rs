// Similarity grouping over computed fingerprints.
//
// Pairs are scored by a weighted vote of the three hash families, then
// clustered greedily: each unassigned image seeds a group and collects every
// later unassigned image that agrees with the seed itself.

use crate::core::fingerprint::FingerprintMap;
use crate::core::hash::{FingerprintTriple, HASH_BITS, HashDistances};
use crate::core::scanner::ScanError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Points each hash family contributes when its distance is within the
/// threshold, and the total needed to call a pair similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub coarse: u32,
    pub gradient: u32,
    pub average: u32,
    pub pass_score: u32,
}

impl ScoreWeights {
    pub fn max_score(&self) -> u32 {
        self.coarse + self.gradient + self.average
    }

    pub fn score(&self, distances: &HashDistances, threshold: u32) -> u32 {
        let mut score = 0;
        if distances.coarse <= threshold {
            score += self.coarse;
        }
        if distances.gradient <= threshold {
            score += self.gradient;
        }
        if distances.average <= threshold {
            score += self.average;
        }
        score
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            coarse: 2,
            gradient: 1,
            average: 1,
            pass_score: 3,
        }
    }
}

/// Images judged similar, plus the reviewer's per-image selection flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimilarityGroup {
    image_paths: Vec<PathBuf>,
    selected: Vec<bool>,
}

impl SimilarityGroup {
    pub fn new(image_paths: Vec<PathBuf>) -> Self {
        let selected = vec![false; image_paths.len()];
        Self {
            image_paths,
            selected,
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.image_paths
    }

    pub fn len(&self) -> usize {
        self.image_paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.image_paths.is_empty()
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.get(index).copied().unwrap_or(false)
    }

    pub fn set_selected(&mut self, index: usize, selected: bool) {
        if let Some(flag) = self.selected.get_mut(index) {
            *flag = selected;
        }
    }

    pub fn toggle(&mut self, index: usize) {
        if let Some(flag) = self.selected.get_mut(index) {
            *flag = !*flag;
        }
    }

    pub fn select_all(&mut self) {
        self.selected.iter_mut().for_each(|flag| *flag = true);
    }

    pub fn deselect_all(&mut self) {
        self.selected.iter_mut().for_each(|flag| *flag = false);
    }

    pub fn selected_paths(&self) -> Vec<PathBuf> {
        self.image_paths
            .iter()
            .zip(&self.selected)
            .filter(|(_, selected)| **selected)
            .map(|(path, _)| path.clone())
            .collect()
    }

    pub fn unselected_paths(&self) -> Vec<PathBuf> {
        self.image_paths
            .iter()
            .zip(&self.selected)
            .filter(|(_, selected)| !**selected)
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Drop `removed` from the group and clear every selection flag.
    pub fn remove_paths(&mut self, removed: &[PathBuf]) {
        self.image_paths.retain(|p| !removed.contains(p));
        self.selected = vec![false; self.image_paths.len()];
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.image_paths.iter().any(|p| p == path)
    }
}

pub struct SimilarityGrouper {
    threshold: u32,
    weights: ScoreWeights,
}

impl SimilarityGrouper {
    /// `threshold` is the largest Hamming distance, per hash family, still
    /// counted as a match. It cannot exceed the hash width.
    pub fn new(threshold: u32) -> Result<Self, ScanError> {
        Self::with_weights(threshold, ScoreWeights::default())
    }

    pub fn with_weights(threshold: u32, weights: ScoreWeights) -> Result<Self, ScanError> {
        if threshold > HASH_BITS {
            return Err(ScanError::InvalidThreshold {
                threshold,
                max: HASH_BITS,
            });
        }
        Ok(Self { threshold, weights })
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    pub fn score(&self, a: &FingerprintTriple, b: &FingerprintTriple) -> u32 {
        self.weights.score(&a.distances(b), self.threshold)
    }

    pub fn is_similar(&self, a: &FingerprintTriple, b: &FingerprintTriple) -> bool {
        self.score(a, b) >= self.weights.pass_score
    }

    /// Partition the fingerprinted images into groups of two or more.
    ///
    /// Membership is decided against the seed only: an image close to a
    /// member but not to the seed stays out and may seed a later group.
    pub fn group(&self, fingerprints: &FingerprintMap) -> Vec<SimilarityGroup> {
        let entries: Vec<(&PathBuf, &FingerprintTriple)> = fingerprints.iter().collect();
        let mut assigned = vec![false; entries.len()];
        let mut groups = Vec::new();

        for (i, (seed_path, seed)) in entries.iter().enumerate() {
            if assigned[i] {
                continue;
            }
            assigned[i] = true;
            let mut members = vec![(*seed_path).clone()];

            for (j, (path, triple)) in entries.iter().enumerate().skip(i + 1) {
                if assigned[j] {
                    continue;
                }
                if self.is_similar(seed, triple) {
                    assigned[j] = true;
                    members.push((*path).clone());
                }
            }

            if members.len() > 1 {
                groups.push(SimilarityGroup::new(members));
            }
        }

        log::info!(
            "Grouped {} images into {} similarity groups (threshold {})",
            entries.len(),
            groups.len(),
            self.threshold
        );
        groups
    }
}

/// Group fingerprints with the default weights.
pub fn group_similar(
    fingerprints: &FingerprintMap,
    threshold: u32,
) -> Result<Vec<SimilarityGroup>, ScanError> {
    Ok(SimilarityGrouper::new(threshold)?.group(fingerprints))
}

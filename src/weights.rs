//! Balanced class weights.
//!
//! `weight(c) = n_samples / (n_classes · count(c))`, the inverse-frequency
//! weighting used to counter the scarcity of seizure windows.
use ndarray::ArrayView1;
use std::collections::BTreeMap;

use crate::error::{PrepError, Result};

/// Class label → weight, ordered by label.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassWeights(BTreeMap<u8, f64>);

impl ClassWeights {
    pub fn get(&self, class: u8) -> Option<f64> {
        self.0.get(&class).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, f64)> + '_ {
        self.0.iter().map(|(&c, &w)| (c, w))
    }

    pub fn classes(&self) -> Vec<u8> {
        self.0.keys().copied().collect()
    }

    pub fn weights(&self) -> Vec<f64> {
        self.0.values().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Balanced weights over the classes present in `labels`.
///
/// # Errors
/// [`PrepError::DegenerateLabels`] when fewer than two distinct classes are
/// present (including an empty label vector).
pub fn compute_class_weights(labels: ArrayView1<'_, u8>) -> Result<ClassWeights> {
    let mut counts: BTreeMap<u8, usize> = BTreeMap::new();
    for &l in labels.iter() {
        *counts.entry(l).or_default() += 1;
    }
    if counts.len() < 2 {
        return Err(PrepError::DegenerateLabels { found: counts.len() });
    }

    let n = labels.len() as f64;
    let k = counts.len() as f64;
    Ok(ClassWeights(
        counts
            .into_iter()
            .map(|(c, count)| (c, n / (k * count as f64)))
            .collect(),
    ))
}

//! Stratified train/validation/test partitioning.
//!
//! Two successive stratified splits: `test_fraction` of the whole dataset
//! is peeled off as test, then `validation_fraction` of the remainder is
//! peeled off as validation, and what is left trains.

use std::collections::BTreeMap;
use std::fmt;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::data::Dataset;
use crate::error::{Result, SearchError};

/// Smallest class size that can appear in all three partitions.
pub const MIN_SAMPLES_PER_CLASS: usize = 3;

/// Split fractions and seed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fraction of the whole dataset used for test.
    pub test_fraction: f64,
    /// Fraction of the post-test remainder used for validation.
    pub validation_fraction: f64,
    /// Shuffle seed.
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.25,
            validation_fraction: 0.25,
            seed: 42,
        }
    }
}

impl SplitConfig {
    /// Check both fractions lie strictly between 0 and 1.
    ///
    /// # Errors
    ///
    /// `InvalidSplit` naming the offending fraction.
    pub fn validate(&self) -> Result<()> {
        check_fraction("test_fraction", self.test_fraction)?;
        check_fraction("validation_fraction", self.validation_fraction)
    }
}

/// One of the three disjoint subsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Partition {
    Train,
    Validation,
    Test,
}

impl Partition {
    /// All partitions in reporting order.
    pub const ALL: [Partition; 3] = [Partition::Train, Partition::Validation, Partition::Test];
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Partition::Train => "train",
            Partition::Validation => "validation",
            Partition::Test => "test",
        })
    }
}

/// Train, validation and test datasets. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partitions {
    pub train: Dataset,
    pub validation: Dataset,
    pub test: Dataset,
}

impl Partitions {
    /// Dataset for a partition.
    #[must_use]
    pub fn get(&self, partition: Partition) -> &Dataset {
        match partition {
            Partition::Train => &self.train,
            Partition::Validation => &self.validation,
            Partition::Test => &self.test,
        }
    }

    /// Total rows across the three partitions.
    #[must_use]
    pub fn total_samples(&self) -> usize {
        self.train.n_samples() + self.validation.n_samples() + self.test.n_samples()
    }
}

/// Stratified three-way split.
///
/// Every class keeps at least one sample in each partition; rows inside a
/// partition keep their original relative order. Identical inputs always
/// give identical partitions.
///
/// # Errors
///
/// - `InvalidSplit` if a fraction is outside (0, 1)
/// - `InsufficientSamplesForStratification` if a class has fewer than
///   [`MIN_SAMPLES_PER_CLASS`] samples
///
/// # Example
///
/// ```
/// use hypergrid::data::{synthetic::make_blobs, Dataset};
/// use hypergrid::model_selection::split;
///
/// let df = make_blobs(&[40, 40, 20], 2, 0.5, 0).expect("blobs");
/// let ds = Dataset::from_frame(&df, "target").expect("dataset");
///
/// let parts = split(&ds, 0.25, 0.25, 42).expect("stratifiable");
/// assert_eq!(parts.total_samples(), 100);
/// assert_eq!(parts.test.class_counts().len(), 3);
/// ```
pub fn split(
    dataset: &Dataset,
    test_fraction: f64,
    val_fraction_of_remainder: f64,
    seed: u64,
) -> Result<Partitions> {
    SplitConfig {
        test_fraction,
        validation_fraction: val_fraction_of_remainder,
        seed,
    }
    .validate()?;

    let by_class = indices_by_class(dataset.labels());
    for (&label, rows) in &by_class {
        if rows.len() < MIN_SAMPLES_PER_CLASS {
            return Err(SearchError::InsufficientSamplesForStratification {
                label,
                available: rows.len(),
                required: MIN_SAMPLES_PER_CLASS,
            });
        }
    }

    let mut rng = StdRng::seed_from_u64(seed);

    // The remainder must still hold two per class for the validation split.
    let (remainder, test) = stratified_peel(&by_class, test_fraction, 2, &mut rng);
    let (train, validation) = stratified_peel(
        &indices_by_class_subset(dataset.labels(), &remainder),
        val_fraction_of_remainder,
        1,
        &mut rng,
    );

    Ok(Partitions {
        train: dataset.select(&train),
        validation: dataset.select(&validation),
        test: dataset.select(&test),
    })
}

/// Split a [`Dataset`] with a [`SplitConfig`].
///
/// # Errors
///
/// See [`split`].
pub fn split_with(dataset: &Dataset, config: &SplitConfig) -> Result<Partitions> {
    split(
        dataset,
        config.test_fraction,
        config.validation_fraction,
        config.seed,
    )
}

fn check_fraction(name: &str, value: f64) -> Result<()> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(SearchError::InvalidSplit {
            message: format!("{name} must be between 0 and 1, got {value}"),
        })
    }
}

/// Row indices per class; BTreeMap gives a fixed class visiting order.
fn indices_by_class(labels: &[usize]) -> BTreeMap<usize, Vec<usize>> {
    let mut classes: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (row, &label) in labels.iter().enumerate() {
        classes.entry(label).or_default().push(row);
    }
    classes
}

fn indices_by_class_subset(labels: &[usize], rows: &[usize]) -> BTreeMap<usize, Vec<usize>> {
    let mut classes: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for &row in rows {
        classes.entry(labels[row]).or_default().push(row);
    }
    classes
}

/// Peel `fraction` of each class off, keeping at least `min_keep` rows
/// and peeling at least one. Returns `(kept, peeled)`, both sorted.
fn stratified_peel(
    by_class: &BTreeMap<usize, Vec<usize>>,
    fraction: f64,
    min_keep: usize,
    rng: &mut StdRng,
) -> (Vec<usize>, Vec<usize>) {
    let mut kept = Vec::new();
    let mut peeled = Vec::new();

    for rows in by_class.values() {
        let n = rows.len();
        let n_peel = ((n as f64 * fraction).round() as usize).clamp(1, n.saturating_sub(min_keep).max(1));

        let mut shuffled = rows.clone();
        shuffled.shuffle(rng);
        peeled.extend_from_slice(&shuffled[..n_peel]);
        kept.extend_from_slice(&shuffled[n_peel..]);
    }

    kept.sort_unstable();
    peeled.sort_unstable();
    (kept, peeled)
}

#[cfg(test)]
#[path = "tests_split.rs"]
mod tests;

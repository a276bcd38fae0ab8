pub(crate) use super::*;
use crate::data::synthetic::{make_blobs, TARGET_COLUMN};
use crate::primitives::Matrix;

fn blobs(sizes: &[usize]) -> Dataset {
    let df = make_blobs(sizes, 2, 0.5, 11).expect("blobs");
    Dataset::from_frame(&df, TARGET_COLUMN).expect("dataset")
}

fn labelled(labels: Vec<usize>) -> Dataset {
    let n = labels.len();
    let features = Matrix::from_vec(n, 1, (0..n).map(|i| i as f32).collect()).expect("n x 1");
    Dataset::new(vec!["row".to_string()], "target", features, labels).expect("dataset")
}

fn row_ids(ds: &Dataset) -> Vec<usize> {
    ds.features().column(0).iter().map(|&v| v as usize).collect()
}

#[test]
fn test_split_sizes_sum_to_total() {
    let ds = blobs(&[40, 40, 20]);
    let parts = split(&ds, 0.25, 0.25, 42).expect("split");
    assert_eq!(parts.total_samples(), 100);
    assert_eq!(parts.test.n_samples(), 25);
    // round(7.5) = 8 twice, round(3.75) = 4
    assert_eq!(parts.validation.n_samples(), 20);
    assert_eq!(parts.train.n_samples(), 55);
}

#[test]
fn test_split_every_class_in_every_partition() {
    let ds = blobs(&[40, 40, 20]);
    let parts = split(&ds, 0.25, 0.25, 42).expect("split");
    for partition in Partition::ALL {
        let counts = parts.get(partition).class_counts();
        assert_eq!(counts.len(), 3, "{partition} is missing a class");
    }
}

#[test]
fn test_split_partitions_disjoint_and_complete() {
    let ds = labelled((0..30).map(|i| i % 3).collect());
    let parts = split(&ds, 0.3, 0.4, 5).expect("split");

    let mut all: Vec<usize> = Partition::ALL
        .iter()
        .flat_map(|&p| row_ids(parts.get(p)))
        .collect();
    all.sort_unstable();
    assert_eq!(all, (0..30).collect::<Vec<_>>());
}

#[test]
fn test_split_rows_keep_original_order() {
    let ds = labelled((0..30).map(|i| i % 3).collect());
    let parts = split(&ds, 0.3, 0.4, 5).expect("split");
    for partition in Partition::ALL {
        let ids = row_ids(parts.get(partition));
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }
}

#[test]
fn test_split_deterministic_for_seed() {
    let ds = blobs(&[10, 12, 9]);
    let a = split(&ds, 0.25, 0.25, 7).expect("split");
    let b = split(&ds, 0.25, 0.25, 7).expect("split");
    assert_eq!(a, b);
}

#[test]
fn test_split_seed_changes_assignment() {
    let ds = labelled((0..60).map(|i| i % 2).collect());
    let a = split(&ds, 0.25, 0.25, 1).expect("split");
    let b = split(&ds, 0.25, 0.25, 2).expect("split");
    assert_ne!(row_ids(&a.test), row_ids(&b.test));
}

#[test]
fn test_split_minimum_class_size() {
    // Three samples of a class: exactly one per partition
    let ds = labelled(vec![0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1]);
    let parts = split(&ds, 0.1, 0.1, 0).expect("split");
    for partition in Partition::ALL {
        assert_eq!(parts.get(partition).class_counts().get(&0), Some(&1));
    }
}

#[test]
fn test_split_large_fraction_still_leaves_train() {
    let ds = labelled(vec![0, 0, 0, 0, 1, 1, 1, 1]);
    let parts = split(&ds, 0.9, 0.9, 3).expect("split");
    for partition in Partition::ALL {
        assert_eq!(parts.get(partition).class_counts().len(), 2);
    }
}

#[test]
fn test_split_insufficient_samples() {
    let ds = labelled(vec![0, 0, 0, 0, 1, 1]);
    let err = split(&ds, 0.25, 0.25, 0).expect_err("class 1 too small");
    assert!(matches!(
        err,
        SearchError::InsufficientSamplesForStratification {
            label: 1,
            available: 2,
            required: 3
        }
    ));
}

#[test]
fn test_split_rejects_bad_fractions() {
    let ds = labelled(vec![0, 0, 0, 1, 1, 1]);
    for (t, v) in [(0.0, 0.2), (1.0, 0.2), (0.2, 0.0), (0.2, 1.5), (-0.1, 0.5)] {
        assert!(
            matches!(split(&ds, t, v, 0), Err(SearchError::InvalidSplit { .. })),
            "({t}, {v}) should be rejected"
        );
    }
}

#[test]
fn test_split_with_config_default() {
    let ds = blobs(&[20, 20]);
    let via_config = split_with(&ds, &SplitConfig::default()).expect("split");
    let direct = split(&ds, 0.25, 0.25, 42).expect("split");
    assert_eq!(via_config, direct);
}

#[test]
fn test_partition_display() {
    assert_eq!(Partition::Validation.to_string(), "validation");
}

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_split_is_a_partition(
            class_sizes in prop::collection::vec(3usize..30, 1..4),
            test_fraction in 0.05f64..0.95,
            val_fraction in 0.05f64..0.95,
            seed in any::<u64>(),
        ) {
            let labels: Vec<usize> = class_sizes
                .iter()
                .enumerate()
                .flat_map(|(c, &n)| std::iter::repeat(c).take(n))
                .collect();
            let ds = labelled(labels);
            let parts = split(&ds, test_fraction, val_fraction, seed).expect("split");

            prop_assert_eq!(parts.total_samples(), ds.n_samples());
            let mut all: Vec<usize> = Partition::ALL
                .iter()
                .flat_map(|&p| row_ids(parts.get(p)))
                .collect();
            all.sort_unstable();
            all.dedup();
            prop_assert_eq!(all.len(), ds.n_samples());

            for partition in Partition::ALL {
                prop_assert_eq!(parts.get(partition).class_counts().len(), class_sizes.len());
            }
        }
    }
}

//! Property-based tests using proptest.
//!
//! These tests verify the invariants of grid generation, splitting,
//! selection and fingerprinting over generated inputs.

use std::collections::BTreeSet;

use hypergrid::cache::fingerprint;
use hypergrid::coordinator::select_best;
use hypergrid::metrics::ClassificationReport;
use hypergrid::prelude::*;
use proptest::prelude::*;

/// Search space with `counts[i]` integer candidates for parameter `p{i}`.
fn space_from_counts(counts: &[usize]) -> SearchSpace {
    counts
        .iter()
        .enumerate()
        .fold(SearchSpace::new(), |space, (i, &n)| {
            space.add(format!("p{i}"), (0..n as i64).collect::<Vec<_>>())
        })
}

/// Dataset whose single feature is the row index, so rows are identifiable.
fn indexed_dataset(class_sizes: &[usize]) -> Dataset {
    let labels: Vec<usize> = class_sizes
        .iter()
        .enumerate()
        .flat_map(|(class, &n)| std::iter::repeat(class).take(n))
        .collect();
    let x: Vec<f32> = (0..labels.len()).map(|i| i as f32).collect();
    let features = Matrix::from_vec(labels.len(), 1, x).expect("column");
    Dataset::new(vec!["row".to_string()], "class", features, labels).expect("dataset")
}

/// Always predicts the same label.
#[derive(Debug, Clone)]
struct Constant(usize);

impl Classifier for Constant {
    fn fit(&mut self, _x: &Matrix<f32>, _y: &[usize]) -> Result<()> {
        Ok(())
    }

    fn predict(&self, x: &Matrix<f32>) -> Result<Vec<usize>> {
        Ok(vec![self.0; x.n_rows()])
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn grid_is_the_full_cartesian_product(counts in proptest::collection::vec(1usize..5, 0..5)) {
        let space = space_from_counts(&counts);
        let grid = generate(&space).expect("valid space");

        prop_assert_eq!(grid.len(), counts.iter().product::<usize>());
        let distinct: BTreeSet<String> = grid.iter().map(ToString::to_string).collect();
        prop_assert_eq!(distinct.len(), grid.len());
        for set in &grid {
            prop_assert_eq!(set.len(), counts.len());
        }
    }

    #[test]
    fn split_covers_every_row_once_and_every_class(
        class_sizes in proptest::collection::vec(3usize..40, 1..5),
        test_fraction in 0.05f64..0.95,
        val_fraction in 0.05f64..0.95,
        seed in any::<u64>(),
    ) {
        let ds = indexed_dataset(&class_sizes);
        let parts = split(&ds, test_fraction, val_fraction, seed).expect("stratifiable");

        prop_assert_eq!(parts.total_samples(), ds.n_samples());
        let mut seen = BTreeSet::new();
        for partition in Partition::ALL {
            let data = parts.get(partition);
            prop_assert_eq!(data.class_counts().len(), class_sizes.len());
            for &row in data.features().as_slice() {
                prop_assert!(seen.insert(row as usize), "row {} in two partitions", row);
            }
        }
    }

    #[test]
    fn split_is_reproducible(
        class_sizes in proptest::collection::vec(3usize..20, 1..4),
        seed in any::<u64>(),
    ) {
        let ds = indexed_dataset(&class_sizes);
        let a = split(&ds, 0.25, 0.25, seed).expect("split");
        let b = split(&ds, 0.25, 0.25, seed).expect("split");
        prop_assert_eq!(a, b);
    }

    #[test]
    fn selection_picks_first_maximum(
        answers in proptest::collection::vec(0usize..4, 1..8),
        y_true in proptest::collection::vec(0usize..4, 6),
    ) {
        let x = Matrix::from_vec(y_true.len(), 1, vec![0.0; y_true.len()]).expect("column");
        let models: Vec<TrainedModel<Constant>> = answers
            .iter()
            .enumerate()
            .map(|(grid_index, &a)| TrainedModel {
                grid_index,
                hyperparameters: HyperparameterSet::default(),
                model: Constant(a),
            })
            .collect();

        let selection = select_best(&x, &y_true, models, Metric::MacroF1).expect("scorable");
        let max = selection.records.iter().map(|r| r.score).fold(f64::MIN, f64::max);
        let first = selection.records.iter().position(|r| r.score == max).expect("non-empty");

        prop_assert_eq!(selection.best_score, max);
        prop_assert_eq!(selection.best.grid_index, first);
    }

    #[test]
    fn metrics_are_bounded_and_reports_account_for_every_sample(
        pairs in proptest::collection::vec((0usize..5, 0usize..5), 1..50),
    ) {
        let (y_true, y_pred): (Vec<usize>, Vec<usize>) = pairs.into_iter().unzip();
        for metric in [
            Metric::MacroF1,
            Metric::WeightedF1,
            Metric::MicroF1,
            Metric::Accuracy,
            Metric::MacroPrecision,
            Metric::MacroRecall,
        ] {
            let score = metric.score(&y_true, &y_pred).expect("same length");
            prop_assert!((0.0..=1.0).contains(&score), "{} = {}", metric, score);
        }

        let report = ClassificationReport::new(&y_pred, &y_true).expect("report");
        prop_assert_eq!(report.confusion.total(), y_true.len());
        let support: usize = report.per_class.iter().map(|m| m.support).sum();
        prop_assert_eq!(support, y_true.len());
    }

    #[test]
    fn fingerprint_tracks_content(labels in proptest::collection::vec(0usize..3, 1..30), flip in any::<prop::sample::Index>()) {
        let a = fingerprint(&labels).expect("encode");
        prop_assert_eq!(&a, &fingerprint(&labels.clone()).expect("encode"));

        let mut changed = labels.clone();
        let i = flip.index(changed.len());
        changed[i] += 1;
        prop_assert_ne!(a, fingerprint(&changed).expect("encode"));
    }
}

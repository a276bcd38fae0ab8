pub(crate) use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::cache::MemoryCache;
use crate::search::{generate, ParamValue, SearchSpace};

/// Predicts a fixed label for every row; `answer = None` cannot predict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StubModel {
    answer: Option<usize>,
    fitted: bool,
}

impl Classifier for StubModel {
    fn fit(&mut self, _x: &Matrix<f32>, _y: &[usize]) -> Result<()> {
        self.fitted = true;
        Ok(())
    }

    fn predict(&self, x: &Matrix<f32>) -> Result<Vec<usize>> {
        match self.answer {
            Some(label) => Ok(vec![label; x.n_rows()]),
            None => Err(SearchError::InvalidDataset {
                message: "stub has no answer".to_string(),
            }),
        }
    }
}

/// Fails to build when `answer` equals `fail_on`.
#[derive(Debug, Default)]
struct StubFactory {
    builds: AtomicUsize,
    fail_on: Option<i64>,
}

impl StubFactory {
    fn failing_on(answer: i64) -> Self {
        Self {
            fail_on: Some(answer),
            ..Self::default()
        }
    }
}

impl ClassifierFactory for StubFactory {
    type Model = StubModel;

    fn identity(&self) -> &str {
        "stub"
    }

    fn parameter_names(&self) -> &[&'static str] {
        &["answer"]
    }

    fn build(&self, hyperparameters: &HyperparameterSet) -> Result<StubModel> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        let answer = hyperparameters.get("answer").and_then(ParamValue::as_i64);
        if answer.is_some() && answer == self.fail_on {
            return Err(SearchError::InvalidHyperparameter {
                param: "answer".to_string(),
                value: format!("{answer:?}"),
                constraint: "a label the stub can learn".to_string(),
            });
        }
        Ok(StubModel {
            answer: answer.map(|v| v as usize),
            fitted: false,
        })
    }
}

fn train_set() -> Dataset {
    let x = Matrix::from_vec(4, 1, vec![0.0, 1.0, 2.0, 3.0]).expect("4x1");
    Dataset::new(vec!["x".to_string()], "y", x, vec![0, 0, 1, 1]).expect("dataset")
}

fn val() -> (Matrix<f32>, Vec<usize>) {
    let x = Matrix::from_vec(4, 1, vec![0.0, 1.0, 2.0, 3.0]).expect("4x1");
    (x, vec![0, 0, 0, 1])
}

fn stub(grid_index: usize, answer: Option<usize>) -> TrainedModel<StubModel> {
    let value = answer.map_or(ParamValue::None, |a| ParamValue::Int(a as i64));
    TrainedModel {
        grid_index,
        hyperparameters: HyperparameterSet::from_entries(vec![("answer".to_string(), value)]),
        model: StubModel {
            answer,
            fitted: true,
        },
    }
}

fn answers(values: &[i64]) -> Grid {
    generate(&SearchSpace::new().add("answer", values.to_vec())).expect("grid")
}

#[test]
fn test_train_all_preserves_grid_order() {
    let factory = StubFactory::default();
    let grid = answers(&[3, 1, 2, 0]);
    let coordinator = SearchCoordinator::new(Metric::MacroF1, FailurePolicy::BestEffort);

    let fan_out = coordinator
        .train_all(Trainer::new(&factory), &train_set(), &grid)
        .expect("fan-out");
    let indices: Vec<usize> = fan_out.models.iter().map(|m| m.grid_index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    let learned: Vec<Option<usize>> = fan_out.models.iter().map(|m| m.model.answer).collect();
    assert_eq!(learned, vec![Some(3), Some(1), Some(2), Some(0)]);
    assert!(fan_out.models.iter().all(|m| m.model.fitted));
    assert!(fan_out.failures.is_empty());
}

#[test]
fn test_best_effort_one_of_four_fails() {
    let factory = StubFactory::failing_on(2);
    let grid = answers(&[0, 1, 2, 3]);
    let coordinator = SearchCoordinator::new(Metric::MacroF1, FailurePolicy::BestEffort);

    let fan_out = coordinator
        .train_all(Trainer::new(&factory), &train_set(), &grid)
        .expect("best effort never fails on a unit");
    assert_eq!(fan_out.models.len(), 3);
    assert_eq!(fan_out.failures.len(), 1);
    assert_eq!(fan_out.failures[0].grid_index, 2);
    assert!(fan_out.failures[0].message.contains("{answer=2}"));

    let (vx, vy) = val();
    let selection = coordinator
        .select_best(&vx, &vy, fan_out.models)
        .expect("three models remain");
    assert_eq!(selection.records.len(), 3);
    assert_eq!(selection.best.grid_index, 0);
}

#[test]
fn test_fail_fast_returns_training_error() {
    let factory = StubFactory::failing_on(1);
    let grid = answers(&[0, 1]);
    let coordinator = SearchCoordinator::new(Metric::MacroF1, FailurePolicy::FailFast);

    let err = coordinator
        .train_all(Trainer::new(&factory), &train_set(), &grid)
        .expect_err("one unit fails");
    match err {
        SearchError::Training { hyperparameters, .. } => {
            assert_eq!(hyperparameters, "{answer=1}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_select_best_tie_goes_to_earliest() {
    let (vx, vy) = val();
    // grid indices 0 and 2 predict the same labels and tie
    let models = vec![stub(2, Some(0)), stub(0, Some(0)), stub(1, Some(1))];
    let selection = select_best(&vx, &vy, models, Metric::MacroF1).expect("selection");
    assert_eq!(selection.best.grid_index, 0);
    let order: Vec<usize> = selection.records.iter().map(|r| r.grid_index).collect();
    assert_eq!(order, vec![0, 1, 2]);
    assert_eq!(selection.records[0].score, selection.records[2].score);
}

#[test]
fn test_select_best_is_repeatable() {
    let (vx, vy) = val();
    let pick = || {
        select_best(
            &vx,
            &vy,
            vec![stub(0, Some(1)), stub(1, Some(0)), stub(2, Some(0))],
            Metric::Accuracy,
        )
        .expect("selection")
        .best
        .grid_index
    };
    assert_eq!(pick(), 1);
    assert_eq!(pick(), 1);
}

#[test]
fn test_select_best_excludes_prediction_failures() {
    let (vx, vy) = val();
    let selection = select_best(
        &vx,
        &vy,
        vec![stub(0, None), stub(1, Some(1))],
        Metric::Accuracy,
    )
    .expect("one model scorable");
    assert_eq!(selection.best.grid_index, 1);
    assert_eq!(selection.records.len(), 1);
    assert_eq!(selection.scoring_failures.len(), 1);
    assert_eq!(selection.scoring_failures[0].grid_index, 0);
    assert!(selection.scoring_failures[0].message.contains("stub has no answer"));
}

#[test]
fn test_nan_score_is_a_scoring_failure() {
    let model = stub(3, Some(1));
    let err = reject_nan(&model, Metric::MacroF1, f64::NAN).expect_err("NaN cannot rank");
    match err {
        SearchError::Scoring {
            hyperparameters,
            message,
        } => {
            assert_eq!(hyperparameters, "{answer=1}");
            assert_eq!(message, "f1_macro is NaN");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(reject_nan(&model, Metric::MacroF1, 0.0).expect("finite"), 0.0);
}

#[test]
fn test_select_best_empty_model_set() {
    let (vx, vy) = val();
    let err = select_best::<StubModel>(&vx, &vy, Vec::new(), Metric::MacroF1).expect_err("nothing to pick");
    assert!(matches!(
        err,
        SearchError::EmptyModelSet {
            trained: 0,
            excluded: 0
        }
    ));
}

#[test]
fn test_select_best_all_excluded() {
    let (vx, vy) = val();
    let err = select_best(&vx, &vy, vec![stub(0, None), stub(1, None)], Metric::MacroF1)
        .expect_err("no scorable model");
    assert!(matches!(
        err,
        SearchError::EmptyModelSet {
            trained: 2,
            excluded: 2
        }
    ));
}

#[test]
fn test_best_score_is_maximum() {
    let (vx, vy) = val();
    let selection = select_best(
        &vx,
        &vy,
        vec![stub(0, Some(1)), stub(1, Some(0))],
        Metric::MacroF1,
    )
    .expect("selection");
    for record in &selection.records {
        assert!(selection.best_score >= record.score);
    }
}

#[test]
fn test_memoized_training_runs_each_unit_once() {
    let factory = StubFactory::default();
    let grid = answers(&[0, 1]);
    let memoizer = Memoizer::new(Arc::new(MemoryCache::new()));
    let coordinator = SearchCoordinator::new(Metric::MacroF1, FailurePolicy::BestEffort)
        .with_memoizer(memoizer.clone(), "cache-v1");

    let first = coordinator
        .train_all(Trainer::new(&factory), &train_set(), &grid)
        .expect("fan-out");
    let second = coordinator
        .train_all(Trainer::new(&factory), &train_set(), &grid)
        .expect("fan-out");

    assert_eq!(factory.builds.load(Ordering::SeqCst), 2);
    assert_eq!(memoizer.stats().hits, 2);
    let models = |f: &FanOut<StubModel>| f.models.iter().map(|m| m.model.clone()).collect::<Vec<_>>();
    assert_eq!(models(&first), models(&second));
}

#[test]
fn test_memoized_training_keyed_by_data() {
    let factory = StubFactory::default();
    let grid = answers(&[0]);
    let coordinator = SearchCoordinator::new(Metric::MacroF1, FailurePolicy::BestEffort)
        .with_memoizer(Memoizer::new(Arc::new(MemoryCache::new())), "cache-v1");

    let other = train_set().select(&[0, 1, 2]);
    coordinator
        .train_all(Trainer::new(&factory), &train_set(), &grid)
        .expect("fan-out");
    coordinator
        .train_all(Trainer::new(&factory), &other, &grid)
        .expect("fan-out");
    assert_eq!(factory.builds.load(Ordering::SeqCst), 2);
}

#[test]
fn test_memoized_selection_matches_direct() {
    let (vx, vy) = val();
    let memoizer = Memoizer::new(Arc::new(MemoryCache::new()));
    let coordinator = SearchCoordinator::new(Metric::MacroF1, FailurePolicy::BestEffort)
        .with_memoizer(memoizer.clone(), "cache-v1");
    let models = || vec![stub(0, Some(1)), stub(1, None), stub(2, Some(0))];

    let direct = select_best(&vx, &vy, models(), Metric::MacroF1).expect("direct");
    let first = coordinator.select_best(&vx, &vy, models()).expect("miss");
    let second = coordinator.select_best(&vx, &vy, models()).expect("hit");

    assert_eq!(memoizer.stats().hits, 1);
    for sel in [&first, &second] {
        assert_eq!(sel.best.grid_index, direct.best.grid_index);
        assert_eq!(sel.records, direct.records);
        assert_eq!(sel.scoring_failures, direct.scoring_failures);
        assert_eq!(sel.best_score.to_bits(), direct.best_score.to_bits());
    }
}

#[test]
fn test_dedicated_worker_pool() {
    let factory = StubFactory::default();
    let grid = answers(&[0, 1, 2, 3]);
    let coordinator =
        SearchCoordinator::new(Metric::MacroF1, FailurePolicy::BestEffort).with_workers(Some(2));
    let fan_out = coordinator
        .train_all(Trainer::new(&factory), &train_set(), &grid)
        .expect("fan-out");
    assert_eq!(fan_out.models.len(), 4);
}

//! Memoized pipeline runs against the on-disk cache.

use std::path::Path;
use std::sync::Arc;

use hypergrid::prelude::*;

fn frame() -> DataFrame {
    make_blobs(&[24, 24, 24], 3, 0.6, 17).expect("blobs")
}

fn config() -> PipelineConfig {
    PipelineConfig::default().with_search_space(
        SearchSpace::new()
            .add("n_estimators", [4, 8])
            .add("max_depth", [Some(3), None]),
    )
}

fn count_entries(dir: &Path) -> usize {
    let mut n = 0;
    for entry in std::fs::read_dir(dir).expect("readable dir") {
        let path = entry.expect("dir entry").path();
        if path.is_dir() {
            n += count_entries(&path);
        } else if path.extension().is_some_and(|ext| ext == "bin") {
            n += 1;
        }
    }
    n
}

#[test]
fn test_second_run_is_served_from_disk() {
    let dir = tempfile::tempdir().expect("temp dir");
    let cache: Arc<dyn CacheBackend> = Arc::new(DiskCache::new(dir.path()).expect("cache"));

    let first_pipeline = Pipeline::new(config(), RandomForestFactory::new(42)).with_cache(Arc::clone(&cache));
    let first = first_pipeline.run(&frame()).expect("first run");
    let stats = first_pipeline.cache_stats();
    assert_eq!(stats.hits, 0);
    // grid, split, four training units, selection
    assert_eq!(stats.misses, 7);
    assert_eq!(count_entries(dir.path()), 7);

    // A fresh pipeline over the same directory recomputes nothing
    let second_pipeline = Pipeline::new(config(), RandomForestFactory::new(42)).with_cache(cache);
    let second = second_pipeline.run(&frame()).expect("second run");
    assert_eq!(second_pipeline.cache_stats(), CacheStats { hits: 7, misses: 0 });
    assert_eq!(count_entries(dir.path()), 7);

    assert_eq!(first.grid, second.grid);
    assert_eq!(first.partitions, second.partitions);
    assert_eq!(first.search, second.search);
    assert_eq!(first.best.model, second.best.model);
    assert_eq!(first.evaluation, second.evaluation);
}

#[test]
fn test_version_bump_invalidates_entries() {
    let dir = tempfile::tempdir().expect("temp dir");
    let cache: Arc<dyn CacheBackend> = Arc::new(DiskCache::new(dir.path()).expect("cache"));

    Pipeline::new(config(), RandomForestFactory::new(42))
        .with_cache(Arc::clone(&cache))
        .run(&frame())
        .expect("v1 run");

    let bumped = config().with_cache(CacheConfig::default().with_version("cache-v2"));
    let pipeline = Pipeline::new(bumped, RandomForestFactory::new(42)).with_cache(cache);
    pipeline.run(&frame()).expect("v2 run");

    assert_eq!(pipeline.cache_stats().hits, 0);
    assert_eq!(count_entries(dir.path()), 14);
}

#[test]
fn test_changed_seed_retrains_but_reuses_split() {
    let dir = tempfile::tempdir().expect("temp dir");
    let cache: Arc<dyn CacheBackend> = Arc::new(DiskCache::new(dir.path()).expect("cache"));

    Pipeline::new(config(), RandomForestFactory::new(1))
        .with_cache(Arc::clone(&cache))
        .run(&frame())
        .expect("seed 1");

    let pipeline = Pipeline::new(config(), RandomForestFactory::new(2)).with_cache(cache);
    pipeline.run(&frame()).expect("seed 2");

    // Grid and split are unchanged; every training unit and selection are new
    assert_eq!(pipeline.cache_stats(), CacheStats { hits: 2, misses: 5 });
}

#[test]
fn test_changed_data_misses_split_and_training() {
    let cache: Arc<dyn CacheBackend> = Arc::new(MemoryCache::new());

    Pipeline::new(config(), RandomForestFactory::new(42))
        .with_cache(Arc::clone(&cache))
        .run(&frame())
        .expect("first frame");

    let other = make_blobs(&[24, 24, 24], 3, 0.6, 18).expect("blobs");
    let pipeline = Pipeline::new(config(), RandomForestFactory::new(42)).with_cache(cache);
    pipeline.run(&other).expect("second frame");

    // Only the grid is shared
    assert_eq!(pipeline.cache_stats(), CacheStats { hits: 1, misses: 6 });
}

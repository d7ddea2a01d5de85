use magic_knn::{
    CollectingSink, DataError, Metric, ParseErrorKind, Pipeline, PipelineConfig, PipelineError,
    SearchStrategy, describe,
};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

const HEADER: &str = "ID,fLength:,fWidth:,fSize:,fConc:,fConc1:,fAsym:,fM3Long:,fM3Trans:,fAlpha:,fDist:,class:";

/// Two noisy clusters in ten dimensions, `g` around 0 and `h` around 10.
fn telescope_rows(n: usize, seed: u64) -> Vec<String> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut rows = vec![HEADER.to_string()];
    for id in 0..n {
        let (center, class) = if id % 3 == 0 { (10.0, "h") } else { (0.0, "g") };
        let features: Vec<String> = (0..10)
            .map(|_| format!("{:.4}", center + rng.random_range(-2.0..2.0)))
            .collect();
        rows.push(format!("{id},{},{class}", features.join(",")));
    }
    rows
}

#[test]
fn default_run_classifies_separable_clusters() {
    let rows = telescope_rows(300, 7);
    let mut sink = CollectingSink::default();
    let report = Pipeline::new(PipelineConfig::default())
        .run(&rows, &mut sink)
        .unwrap();

    assert_eq!(report.dataset.len(), 300);
    assert_eq!(report.split.train.len(), 210);
    assert_eq!(report.split.test.len(), 90);
    assert_eq!(report.predictions.len(), 90);

    let cells: usize = report.matrix.counts().iter().sum();
    assert_eq!(cells, report.split.test.len());
    let accuracy = report.matrix.accuracy().unwrap();
    assert!((0.0..=1.0).contains(&accuracy));
    assert!(accuracy > 0.95, "accuracy {accuracy}");
    assert_eq!(sink.matrices.len(), 1);
    assert!(sink.skipped.is_empty());
}

#[test]
fn split_membership_is_deterministic_and_disjoint() {
    let rows = telescope_rows(120, 1);
    let pipeline = Pipeline::new(PipelineConfig::default());
    let a = pipeline.run(&rows, CollectingSink::default()).unwrap();
    let b = pipeline.run(&rows, CollectingSink::default()).unwrap();

    let ids = |d: &magic_knn::Dataset<f64>| d.iter().map(|r| r.id()).collect::<Vec<_>>();
    assert_eq!(ids(&a.split.train), ids(&b.split.train));
    assert_eq!(ids(&a.split.test), ids(&b.split.test));
    assert_eq!(a.predictions, b.predictions);

    let train = ids(&a.split.train);
    assert!(ids(&a.split.test).iter().all(|id| !train.contains(id)));
    assert_eq!(train.len() + a.split.test.len(), 120);
}

#[test]
fn search_strategies_agree() {
    let rows = telescope_rows(200, 3);
    let run = |strategy, metric| {
        let config = PipelineConfig {
            strategy,
            metric,
            k: 5,
            ..PipelineConfig::default()
        };
        Pipeline::new(config)
            .run(&rows, CollectingSink::default())
            .unwrap()
            .predictions
    };
    for metric in [Metric::Euclidean, Metric::Manhattan, Metric::Chebyshev] {
        assert_eq!(
            run(SearchStrategy::Linear, metric),
            run(SearchStrategy::KdTree { leaf_size: 4 }, metric)
        );
    }
}

#[test]
fn malformed_rows_are_reported_and_skipped() {
    let mut rows = telescope_rows(60, 11);
    rows.insert(5, "999,1,2,3".to_string());
    rows.insert(9, "1000,1,2,3,4,5,6,7,8,9,ten,g".to_string());
    rows.push(String::new());

    let mut sink = CollectingSink::default();
    let report = Pipeline::new(PipelineConfig::default())
        .run(&rows, &mut sink)
        .unwrap();

    assert_eq!(report.dataset.len(), 60);
    assert_eq!(report.skipped_rows, 2);
    assert_eq!(sink.skipped[0].row, 4);
    assert!(matches!(sink.skipped[0].kind, ParseErrorKind::FieldCount { .. }));
    assert_eq!(sink.skipped[1].row, 8);
    assert!(matches!(
        sink.skipped[1].kind,
        ParseErrorKind::InvalidNumber { column: 10, .. }
    ));
}

#[test]
fn failures_are_tagged_with_their_stage() {
    let rows = telescope_rows(30, 5);

    let config = PipelineConfig {
        train_ratio: 1.5,
        ..PipelineConfig::default()
    };
    let err = Pipeline::new(config)
        .run(&rows, CollectingSink::default())
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Split {
            source: DataError::InvalidRatio(r)
        } if r == 1.5
    ));

    let config = PipelineConfig {
        k: 0,
        ..PipelineConfig::default()
    };
    let err = Pipeline::new(config)
        .run(&rows, CollectingSink::default())
        .unwrap_err();
    assert_eq!(err.stage(), "config");

    let err = Pipeline::new(PipelineConfig::default())
        .run(["ID,a,b,class"], CollectingSink::default())
        .unwrap_err();
    assert_eq!(err.stage(), "load");
}

#[test]
fn describe_reports_every_column() {
    let rows = telescope_rows(90, 2);
    let report = Pipeline::new(PipelineConfig::default())
        .run(&rows, CollectingSink::default())
        .unwrap();
    let summary = describe(&report.dataset).unwrap();

    assert_eq!(summary.columns.len(), 10);
    assert_eq!(summary.columns[1].name, "fWidth");
    assert!(summary.columns.iter().all(|c| c.count == 90 && c.min <= c.median && c.median <= c.max));
    assert_eq!(
        summary.class_counts,
        vec![("g".to_string(), 60), ("h".to_string(), 30)]
    );
}

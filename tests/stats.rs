use insdc_bench::stats::{AggregateStats, nearest_rank};

#[test]
fn four_trial_reference() {
    let stats = AggregateStats::from_values(&[10.0, 20.0, 30.0, 40.0]).unwrap();
    assert_eq!(stats.mean, 25.0);
    assert_eq!(stats.median, 25.0);
    assert_eq!(stats.p95, 40.0);
}

#[test]
fn order_does_not_matter() {
    let a = AggregateStats::from_values(&[40.0, 10.0, 30.0, 20.0]).unwrap();
    let b = AggregateStats::from_values(&[10.0, 20.0, 30.0, 40.0]).unwrap();
    assert_eq!(a, b);
}

#[test]
fn nearest_rank_reference_table() {
    // (series length, expected p95 over 1..=n)
    let table = [(1, 1.0), (2, 2.0), (3, 3.0), (10, 10.0), (19, 19.0), (20, 19.0), (40, 38.0), (100, 95.0)];
    for (n, expected) in table {
        let series: Vec<f64> = (1..=n).map(f64::from).collect();
        assert_eq!(nearest_rank(&series, 95.0), expected, "n = {n}");
    }
}

#[test]
fn three_trial_speeds() {
    let stats = AggregateStats::from_values(&[50.0, 55.0, 60.0]).unwrap();
    assert_eq!(stats.mean, 55.0);
    assert_eq!(stats.median, 55.0);
    assert_eq!(stats.p95, 60.0);
}

use latmetrics_common::{LatMetricsError, Sample};
use latmetrics_server::loader::{
    load, load_from, FallbackSource, JsonFileSource, RegionIndex, SampleSource, StaticSource,
};
use std::io::Write;

// --- Test helpers ---

fn sample_set() -> Vec<Sample> {
    vec![
        Sample::new("apac", 120.0, 99.1),
        Sample::new("emea", 150.0, 98.2),
        Sample::new("apac", 180.0, 97.3),
        Sample::new("amer", 90.0, 99.9),
        Sample::new("apac", 110.0, 98.4),
    ]
}

fn write_dataset(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

// --- Grouping ---

#[test]
fn test_groups_by_region_preserving_dataset_order() {
    let index = load(&sample_set()).unwrap();
    let apac = index.get("apac").unwrap();
    assert_eq!(apac.latencies(), &[120.0, 180.0, 110.0]);
    assert_eq!(apac.uptimes(), &[99.1, 97.3, 98.4]);
}

#[test]
fn test_every_sample_lands_in_exactly_one_region() {
    let samples = sample_set();
    let index = load(&samples).unwrap();

    assert_eq!(index.sample_count(), samples.len());
    for region in index.regions() {
        let series = index.get(region).unwrap();
        assert_eq!(series.latencies().len(), series.uptimes().len());
        let expected = samples.iter().filter(|s| s.region == region).count();
        assert_eq!(series.len(), expected);
    }
}

#[test]
fn test_regions_lists_every_present_region() {
    let index = load(&sample_set()).unwrap();
    assert_eq!(index.regions(), vec!["amer", "apac", "emea"]);
    assert_eq!(index.len(), 3);
    assert!(index.contains("emea"));
    assert!(!index.contains("mars-colony"));
}

#[test]
fn test_empty_dataset_yields_empty_index() {
    let index = load(&[]).unwrap();
    assert!(index.is_empty());
    assert_eq!(index.sample_count(), 0);
}

#[test]
fn test_load_is_idempotent() {
    let samples = sample_set();
    assert_eq!(load(&samples).unwrap(), load(&samples).unwrap());
}

#[test]
fn test_load_does_not_mutate_input() {
    let samples = sample_set();
    let copy = samples.clone();
    let _ = load(&samples).unwrap();
    assert_eq!(samples, copy);
}

#[test]
fn test_load_rejects_non_finite_values() {
    let samples = vec![Sample::new("apac", 1.0, 99.0), Sample::new("apac", f64::NAN, 99.0)];
    assert!(matches!(load(&samples), Err(LatMetricsError::DataUnavailable(_))));

    let samples = vec![Sample::new("emea", 1.0, f64::INFINITY)];
    assert!(matches!(load(&samples), Err(LatMetricsError::DataUnavailable(_))));
}

#[test]
fn test_from_samples_matches_load() {
    let samples = sample_set();
    assert_eq!(RegionIndex::from_samples(&samples), load(&samples).unwrap());
}

// --- Sources ---

#[test]
fn test_json_file_source_reads_samples() {
    let file = write_dataset(
        r#"[{"region":"apac","latency_ms":120.5,"uptime_pct":99.1},
            {"region":"emea","latency_ms":150,"uptime_pct":98.2,"service":"api"}]"#,
    );
    let source = JsonFileSource::new(file.path());
    let samples = source.read_samples().unwrap();
    assert_eq!(samples, vec![Sample::new("apac", 120.5, 99.1), Sample::new("emea", 150.0, 98.2)]);
}

#[test]
fn test_json_file_source_missing_file_is_data_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let source = JsonFileSource::new(dir.path().join("nope.json"));
    match source.read_samples() {
        Err(LatMetricsError::DataUnavailable(msg)) => assert!(msg.contains("nope.json")),
        other => panic!("expected DataUnavailable, got {other:?}"),
    }
}

#[test]
fn test_json_file_source_malformed_json_is_data_unavailable() {
    let file = write_dataset(r#"[{"region":"apac","latency_ms":"fast"}]"#);
    let source = JsonFileSource::new(file.path());
    assert!(matches!(source.read_samples(), Err(LatMetricsError::DataUnavailable(_))));
}

#[test]
fn test_fallback_source_prefers_primary() {
    let source = FallbackSource::new(
        Box::new(StaticSource(vec![Sample::new("primary", 1.0, 99.0)])),
        Box::new(StaticSource(vec![Sample::new("fallback", 2.0, 98.0)])),
    );
    let samples = source.read_samples().unwrap();
    assert_eq!(samples[0].region, "primary");
}

#[test]
fn test_fallback_source_uses_fallback_when_primary_missing() {
    let dir = tempfile::tempdir().unwrap();
    let fallback = write_dataset(r#"[{"region":"emea","latency_ms":150,"uptime_pct":98.2}]"#);
    let source = FallbackSource::new(
        Box::new(JsonFileSource::new(dir.path().join("data.json"))),
        Box::new(JsonFileSource::new(fallback.path())),
    );
    let index = load_from(&source).unwrap();
    assert!(index.contains("emea"));
}

#[test]
fn test_fallback_source_fails_when_both_missing() {
    let dir = tempfile::tempdir().unwrap();
    let source = FallbackSource::new(
        Box::new(JsonFileSource::new(dir.path().join("data.json"))),
        Box::new(JsonFileSource::new(dir.path().join("fallback.json"))),
    );
    match load_from(&source) {
        Err(LatMetricsError::DataUnavailable(msg)) => assert!(msg.contains("fallback.json")),
        other => panic!("expected DataUnavailable, got {other:?}"),
    }
}

#[test]
fn test_fallback_source_does_not_mask_malformed_primary() {
    let primary = write_dataset(r#"[{"region":"apac","latency_ms":"fast"}]"#);
    let fallback = write_dataset(r#"[{"region":"emea","latency_ms":150,"uptime_pct":98.2}]"#);
    let primary_name = primary.path().display().to_string();
    let source = FallbackSource::new(
        Box::new(JsonFileSource::new(primary.path())),
        Box::new(JsonFileSource::new(fallback.path())),
    );
    match load_from(&source) {
        Err(LatMetricsError::DataUnavailable(msg)) => assert!(msg.contains(&primary_name)),
        other => panic!("expected DataUnavailable from primary, got {other:?}"),
    }
}

#[test]
fn test_json_file_source_is_missing_only_when_absent() {
    let dir = tempfile::tempdir().unwrap();
    assert!(JsonFileSource::new(dir.path().join("nope.json")).is_missing());

    let malformed = write_dataset("{not json");
    assert!(!JsonFileSource::new(malformed.path()).is_missing());
    assert!(!StaticSource::default().is_missing());
}

#[test]
fn test_describe_names_the_source() {
    assert_eq!(JsonFileSource::new("/srv/data.json").describe(), "/srv/data.json");
    assert_eq!(StaticSource(sample_set()).describe(), "in-memory (5 samples)");
}

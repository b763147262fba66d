//! End-to-end pipeline flow: load shard catalogs, cross-match against a
//! reference catalog, join against an in-memory survey database, fetch
//! photometry, and run a resumable period-search batch over it.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;

use ztf_periodic::catalog::{load_catalog_dir, read_reference_text, LoadOptions};
use ztf_periodic::coords::angular_separation_arcsec;
use ztf_periodic::crossmatch::{crossmatch, write_matches, CrossMatchParams, MatchMode};
use ztf_periodic::fetch::{
    build_join_table, fetch_lightcurves, FeatureDatabase, FetchOptions, FetchResult, LabelService,
    LabelVote, PhotometryService,
};
use ztf_periodic::lightcurve::LightCurve;
use ztf_periodic::periodogram::runner::{read_result, result_path};
use ztf_periodic::periodogram::{run_batch, Algorithm, ComputeBackend, RunnerConfig};
use ztf_periodic::retry::Retry;

const STATS_COLUMNS: usize = 36;

fn shard_line(name: &str, objid: i64, ra: f64, dec: f64, period: f64, sig: f64) -> String {
    let stats = vec!["0.0"; STATS_COLUMNS].join(" ");
    format!("{name} {objid} {ra} {dec} {period} {sig} 0.0 1 {stats}\n")
}

fn write_file(dir: &Path, name: &str, contents: &str) {
    let mut file = std::fs::File::create(dir.join(name)).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
}

struct MemoryDb {
    objects: Vec<(i64, f64, f64)>,
}

impl FeatureDatabase for MemoryDb {
    fn resolve_objids(
        &self,
        positions: &[(f64, f64)],
        radius_arcsec: f64,
    ) -> FetchResult<Vec<Option<i64>>> {
        Ok(positions
            .iter()
            .map(|&(ra, dec)| {
                self.objects
                    .iter()
                    .find(|&&(_, ora, odec)| {
                        angular_separation_arcsec(ra, dec, ora, odec) <= radius_arcsec
                    })
                    .map(|&(id, _, _)| id)
            })
            .collect())
    }

    fn features(&self, objids: &[i64], _columns: &[&str]) -> FetchResult<Vec<serde_json::Value>> {
        Ok(objids
            .iter()
            .map(|id| serde_json::json!({ "_id": id, "period": 0.5 }))
            .collect())
    }
}

struct MemoryLabels(Vec<LabelVote>);

impl LabelService for MemoryLabels {
    fn programs(&self) -> FetchResult<Vec<String>> {
        Ok(vec!["variable_star_classification".to_string()])
    }

    fn votes(&self, objids: &[i64]) -> FetchResult<Vec<LabelVote>> {
        Ok(self
            .0
            .iter()
            .filter(|v| objids.contains(&v.objid))
            .cloned()
            .collect())
    }
}

struct SinusoidPhotometry {
    freq: f64,
}

impl PhotometryService for SinusoidPhotometry {
    fn photometry(&self, ra: f64, dec: f64, _radius_arcsec: f64) -> FetchResult<Vec<LightCurve>> {
        let phi = 0.618_033_988_75_f64;
        let n = 200;
        let times: Vec<f64> = (0..n).map(|i| ((i as f64 * phi) % 1.0) * 5.0).collect();
        let mags: Vec<f64> = times
            .iter()
            .map(|&t| 17.0 + 0.3 * libm::sin(2.0 * std::f64::consts::PI * self.freq * t))
            .collect();
        let lc = LightCurve::new("ZTFJ00402000", ra, dec, 2, times, mags, vec![0.02; n])?;
        Ok(vec![lc])
    }
}

fn fetch_options() -> FetchOptions {
    FetchOptions {
        workers: 1,
        retry: Retry::new(1, Duration::from_millis(0)),
        artifact_dir: None,
        label_table: None,
    }
}

#[test]
fn test_catalog_to_crossmatch_flow() {
    let dir = TempDir::new().unwrap();
    let primary_dir = dir.path().join("LS");
    let secondary_dir = dir.path().join("CE");
    std::fs::create_dir_all(&primary_dir).unwrap();
    std::fs::create_dir_all(&secondary_dir).unwrap();

    // Newest shard carries the reprocessed row for ZTFJ00402000.
    write_file(
        &primary_dir,
        "fields_0001.dat",
        &(shard_line("ZTFJ00402000", 101, 10.0, 20.0, 0.4, 3.0)
            + &shard_line("ZTFJ0100+3000", 102, 15.0, 30.0, 0.6, 9.0)),
    );
    write_file(
        &primary_dir,
        "fields_0002.dat",
        &shard_line("ZTFJ00402000", 101, 10.0, 20.0, 0.5, 12.0),
    );
    write_file(
        &secondary_dir,
        "fields_0001.dat",
        &(shard_line("ZTFJ0040+2000b", 201, 10.0003, 20.0002, 0.5001, 9.0)
            + &shard_line("ZTFJfar", 202, 200.0, -40.0, 1.2, 8.0)),
    );

    let primary = load_catalog_dir(&primary_dir, &LoadOptions::default(), None).unwrap();
    let secondary = load_catalog_dir(&secondary_dir, &LoadOptions::default(), None).unwrap();
    assert_eq!(primary.len(), 2);

    let reprocessed = primary
        .records()
        .iter()
        .find(|r| r.name == "ZTFJ00402000")
        .unwrap();
    assert_eq!(reprocessed.catnum, 2);
    assert_eq!(reprocessed.sig, 12.0);

    let params = CrossMatchParams {
        radius_arcsec: 2.0,
        min_sig_primary: 5.0,
        min_sig_secondary: 5.0,
        ..Default::default()
    };
    let matches = crossmatch(&primary, &secondary, &params);
    assert_eq!(matches.len(), 1);
    let m = &matches[0];
    assert_eq!(m.name, "ZTFJ00402000");
    assert!((m.separation_arcsec - 1.24).abs() < 0.02, "sep = {}", m.separation_arcsec);
    assert!(m.rank_ratio <= 1.0);

    let out = dir.path().join("matches.dat");
    write_matches(&out, &matches).unwrap();
    let contents = std::fs::read_to_string(&out).unwrap();
    assert_eq!(contents.lines().count(), 3); // two header lines + one match
}

#[test]
fn test_reference_match_carries_classification() {
    let dir = TempDir::new().unwrap();
    let survey_dir = dir.path().join("LS");
    std::fs::create_dir_all(&survey_dir).unwrap();
    write_file(
        &survey_dir,
        "fields_0001.dat",
        &shard_line("ZTFJ00402000", 101, 10.0, 20.0, 0.5, 12.0),
    );
    write_file(dir.path(), "CRTS.dat", "CSS_J001 10.0001 20.0001 0.5002 EW\n");

    let survey = load_catalog_dir(&survey_dir, &LoadOptions::default(), None).unwrap();
    let reference = read_reference_text(&dir.path().join("CRTS.dat")).unwrap();

    let params = CrossMatchParams {
        radius_arcsec: 2.0,
        mode: MatchMode::Reference,
        ..Default::default()
    };
    let matches = crossmatch(&survey, &reference, &params);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].classification, "EW");
    assert_eq!(matches[0].rank_ratio, 1.0);
    assert_eq!(matches[0].match_period, Some(0.5002));
}

#[test]
fn test_join_fetch_and_period_batch() {
    let dir = TempDir::new().unwrap();
    let catalog_dir = dir.path().join("LS");
    std::fs::create_dir_all(&catalog_dir).unwrap();
    write_file(
        &catalog_dir,
        "fields_0001.dat",
        &(shard_line("ZTFJ00402000", 101, 10.0, 20.0, 0.5, 12.0)
            + &shard_line("ZTFJnotingested", 999, 120.0, -5.0, 0.7, 8.0)),
    );
    let table = load_catalog_dir(&catalog_dir, &LoadOptions::default(), None).unwrap();

    let db = MemoryDb {
        objects: vec![(101, 10.0, 20.0)],
    };
    let labels = MemoryLabels(vec![
        LabelVote {
            objid: 101,
            label: "EW".to_string(),
            vote: 1.0,
        },
        LabelVote {
            objid: 101,
            label: "EA".to_string(),
            vote: 0.0,
        },
    ]);

    let rows = build_join_table(&db, &labels, &table, &fetch_options()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].label.as_deref(), Some("ew"));

    let freq = 25.2; // cycles/day, outside every contaminated band
    let phot = SinusoidPhotometry { freq };
    let curves = fetch_lightcurves(&phot, &rows, &fetch_options()).unwrap();
    assert_eq!(curves.len(), 1);
    let metadata = curves[0].metadata();
    assert_eq!(metadata.label.as_deref(), Some("ew"));
    assert_eq!(metadata.period, Some(0.5));
    assert!(!metadata.features.is_empty());

    let output_dir = dir.path().join("periods");
    let config = RunnerConfig {
        backend: Some(ComputeBackend::Cpu),
        ..RunnerConfig::new(&output_dir)
    };

    let first = run_batch(&curves, &config).unwrap();
    assert_eq!(first.processed, 1);

    let result = read_result(&result_path(&output_dir, "ZTFJ00402000")).unwrap();
    assert_eq!(result.periodogram.spectra.len(), 1);
    assert_eq!(
        result.periodogram.spectra[0].powers.len(),
        result.periodogram.grid.nf
    );
    let peak = result.peak(Algorithm::Gls).unwrap();
    assert!((peak.frequency - freq).abs() < 0.1, "freq = {}", peak.frequency);
    assert!((peak.period - 1.0 / freq).abs() < 1e-4);
    assert!(peak.significance > 3.0);

    // Rerunning the same batch touches nothing.
    let second = run_batch(&curves, &config).unwrap();
    assert_eq!(second.processed, 0);
    assert_eq!(second.skipped, 1);
}

#[test]
fn test_batch_without_backend_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = RunnerConfig::new(dir.path().join("periods"));
    let err = run_batch(&[], &config).unwrap_err();
    assert!(err.to_string().contains("No compute backend"));
}

//! Classifier vote aggregation and dominant-label selection.
//!
//! Multiple human and machine classifiers vote on each object. Votes are
//! averaged per label, and an object only gets a training label when the
//! averaged votes are unanimous: exactly one label at full vote and no
//! residual mass elsewhere.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::FetchResult;

/// Variability classes used for training, as `(catalog label, short name)`.
pub const TARGET_LABELS: [(&str, &str); 8] = [
    ("Cepheid", "ceph"),
    ("Delta Scu", "dscu"),
    ("EA", "ea"),
    ("EB", "eb"),
    ("EW", "ew"),
    ("RR Lyrae", "rrlyr"),
    ("RS CVn", "rscvn"),
    ("YSO", "yso"),
];

const VOTE_EPS: f64 = 1e-9;

/// Short name for a catalog label, `None` for labels outside the
/// training vocabulary.
pub fn short_label(raw: &str) -> Option<&'static str> {
    TARGET_LABELS
        .iter()
        .find(|&&(long, _)| long == raw)
        .map(|&(_, short)| short)
}

/// One classifier's vote on one object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelVote {
    pub objid: i64,
    /// Catalog label as stored, e.g. `"RR Lyrae"`.
    pub label: String,
    /// Vote weight in [0, 1].
    pub vote: f64,
}

/// Mean-aggregated votes for one object, restricted to the training
/// vocabulary and keyed by short label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRecord {
    pub objid: i64,
    /// `(short label, mean vote)`, in vocabulary order. Every mean vote
    /// lies in [0, 1].
    pub labels: Vec<(String, f64)>,
}

/// Groups votes by object and averages them per label.
///
/// Labels outside [`TARGET_LABELS`] are dropped before averaging, and vote
/// weights are clamped to [0, 1] so every aggregated mean stays a valid
/// fraction. Objects whose votes were all dropped still get a record, with
/// no labels. Records come back in ascending objid order.
pub fn aggregate_votes(votes: &[LabelVote]) -> Vec<LabelRecord> {
    // objid -> short label -> (sum, count)
    let mut by_object: BTreeMap<i64, BTreeMap<&'static str, (f64, u32)>> = BTreeMap::new();

    for vote in votes {
        let per_label = by_object.entry(vote.objid).or_default();
        let Some(short) = short_label(&vote.label) else {
            continue;
        };
        let (sum, count) = per_label.entry(short).or_insert((0.0, 0));
        *sum += vote.vote.clamp(0.0, 1.0);
        *count += 1;
    }

    by_object
        .into_iter()
        .map(|(objid, means)| {
            let labels = TARGET_LABELS
                .iter()
                .filter_map(|&(_, short)| {
                    means
                        .get(short)
                        .map(|&(sum, count)| (short.to_string(), sum / count as f64))
                })
                .collect();
            LabelRecord { objid, labels }
        })
        .collect()
}

/// Picks the training label for one object, if its votes are unanimous.
///
/// The total vote mass must be exactly 1: zero mass means unclassified,
/// more than 1 means classifiers disagreed, and either way the object is
/// excluded. Otherwise the label carrying the full vote is returned.
pub fn select_label(record: &LabelRecord) -> Option<&str> {
    let total: f64 = record.labels.iter().map(|(_, v)| v).sum();
    if total < VOTE_EPS || total > 1.0 + VOTE_EPS {
        return None;
    }
    record
        .labels
        .iter()
        .find(|(_, v)| (v - 1.0).abs() < VOTE_EPS)
        .map(|(label, _)| label.as_str())
}

/// Persists an aggregated label table as JSON.
///
/// Written to a temporary sibling and renamed into place, so readers never
/// see a partial table.
pub fn write_label_table(path: &Path, records: &[LabelRecord]) -> FetchResult<()> {
    let tmp_path = path.with_extension("json.tmp");
    let file = std::fs::File::create(&tmp_path)?;
    serde_json::to_writer_pretty(&file, records)?;
    file.sync_all()?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Loads a previously persisted label table.
pub fn read_label_table(path: &Path) -> FetchResult<Vec<LabelRecord>> {
    let file = std::fs::File::open(path)?;
    Ok(serde_json::from_reader(file)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(objid: i64, label: &str, vote: f64) -> LabelVote {
        LabelVote {
            objid,
            label: label.to_string(),
            vote,
        }
    }

    #[test]
    fn test_short_label_vocabulary() {
        assert_eq!(short_label("RR Lyrae"), Some("rrlyr"));
        assert_eq!(short_label("Delta Scu"), Some("dscu"));
        assert_eq!(short_label("EW"), Some("ew"));
        assert_eq!(short_label("Quasar"), None);
    }

    #[test]
    fn test_aggregate_means_per_label() {
        let votes = [
            vote(1, "EW", 1.0),
            vote(1, "EW", 0.5),
            vote(1, "EA", 0.0),
            vote(2, "RR Lyrae", 1.0),
        ];
        let records = aggregate_votes(&votes);
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].labels,
            vec![("ea".to_string(), 0.0), ("ew".to_string(), 0.75)]
        );
        assert_eq!(records[1].labels, vec![("rrlyr".to_string(), 1.0)]);
    }

    #[test]
    fn test_aggregate_drops_unknown_labels() {
        let records = aggregate_votes(&[vote(1, "Quasar", 1.0), vote(1, "EW", 1.0)]);
        assert_eq!(records[0].labels, vec![("ew".to_string(), 1.0)]);
    }

    #[test]
    fn test_select_unanimous_label() {
        let records = aggregate_votes(&[vote(1, "EB", 1.0), vote(1, "EB", 1.0)]);
        assert_eq!(select_label(&records[0]), Some("eb"));
    }

    #[test]
    fn test_select_rejects_disagreement() {
        // Two classifiers fully committed to different labels: mass 2.
        let records = aggregate_votes(&[vote(1, "EB", 1.0), vote(1, "EW", 1.0)]);
        assert_eq!(select_label(&records[0]), None);
    }

    #[test]
    fn test_select_rejects_zero_mass() {
        let records = aggregate_votes(&[vote(1, "EB", 0.0)]);
        assert_eq!(select_label(&records[0]), None);
    }

    #[test]
    fn test_select_rejects_partial_vote() {
        // Mass under 1 but no label at full vote.
        let records = aggregate_votes(&[vote(1, "EB", 0.5), vote(1, "EW", 0.4)]);
        assert_eq!(select_label(&records[0]), None);
    }

    #[test]
    fn test_select_full_vote_with_zero_others() {
        let records = aggregate_votes(&[vote(1, "Cepheid", 1.0), vote(1, "YSO", 0.0)]);
        assert_eq!(select_label(&records[0]), Some("ceph"));
    }

    #[test]
    fn test_aggregate_clamps_out_of_range_votes() {
        let records = aggregate_votes(&[vote(1, "EW", 1.7), vote(1, "EW", -0.5)]);
        // Clamped to 1.0 and 0.0 before averaging.
        assert_eq!(records[0].labels, vec![("ew".to_string(), 0.5)]);
        for (_, mean) in &records[0].labels {
            assert!((0.0..=1.0).contains(mean));
        }
    }

    #[test]
    fn test_label_table_persists_atomically() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("labels.json");
        let records = aggregate_votes(&[vote(1, "EB", 1.0), vote(2, "EW", 0.5)]);

        write_label_table(&path, &records).unwrap();
        assert_eq!(read_label_table(&path).unwrap(), records);
        assert!(!dir.path().join("labels.json.tmp").exists());
    }
}

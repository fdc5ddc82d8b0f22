use std::collections::BTreeMap;

use crate::record::{Categorical, Category, DraftRecord, Score};
use crate::summary::utility::mean;

/// Per-Track imputation statistics: Track → column → statistic.
///
/// Built once per run from the pre-imputation drafts, so an imputed value
/// never feeds back into another value's statistic.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TrackStatistics {
    means: BTreeMap<String, BTreeMap<Score, f64>>,
    modes: BTreeMap<String, BTreeMap<Categorical, Category>>,
}

impl TrackStatistics {
    pub fn from_drafts(drafts: &[DraftRecord], categorical: &[Categorical]) -> Self {
        let mut by_track: BTreeMap<&str, Vec<&DraftRecord>> = BTreeMap::new();
        for draft in drafts {
            by_track.entry(draft.track.as_str()).or_default().push(draft);
        }

        let mut stats = TrackStatistics::default();

        for (track, rows) in by_track {
            let means: BTreeMap<Score, f64> = Score::ALL
                .iter()
                .filter_map(|&score| {
                    let values: Vec<f64> = rows.iter().filter_map(|r| r.score(score)).collect();
                    (!values.is_empty()).then(|| (score, mean(&values)))
                })
                .collect();

            let modes: BTreeMap<Categorical, Category> = categorical
                .iter()
                .filter_map(|&column| {
                    mode(rows.iter().filter_map(|r| r.category(column))).map(|m| (column, m))
                })
                .collect();

            stats.means.insert(track.to_string(), means);
            stats.modes.insert(track.to_string(), modes);
        }

        stats
    }

    /// Mean of the non-missing values, `None` if the Track has none.
    pub fn mean(&self, track: &str, score: Score) -> Option<f64> {
        self.means.get(track)?.get(&score).copied()
    }

    /// Most frequent value, `None` if the Track has none or the column is not imputed.
    pub fn mode(&self, track: &str, column: Categorical) -> Option<&Category> {
        self.modes.get(track)?.get(&column)
    }
}

/// Most frequent value; ties go to the value seen first.
pub fn mode<I>(values: I) -> Option<Category>
where
    I: IntoIterator<Item = Category>,
{
    let mut counts: Vec<(Category, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, n)) => *n += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best: Option<(Category, usize)> = None;
    for (value, n) in counts {
        if best.as_ref().is_none_or(|(_, best_n)| n > *best_n) {
            best = Some((value, n));
        }
    }
    best.map(|(value, _)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(track: &str, math: Option<f64>, cohort: Option<&str>) -> DraftRecord {
        DraftRecord {
            math,
            cohort: cohort.map(String::from),
            ..DraftRecord::new(track)
        }
    }

    #[test]
    fn test_mean_excludes_missing() {
        let drafts = vec![
            draft("A", Some(80.0), None),
            draft("A", None, None),
            draft("A", Some(90.0), None),
            draft("B", Some(10.0), None),
        ];

        let stats = TrackStatistics::from_drafts(&drafts, &[]);

        assert_eq!(stats.mean("A", Score::Math), Some(85.0));
        assert_eq!(stats.mean("B", Score::Math), Some(10.0));
        assert_eq!(stats.mean("A", Score::English), None);
        assert_eq!(stats.mean("C", Score::Math), None);
    }

    #[test]
    fn test_mode_per_track() {
        let drafts = vec![
            draft("A", None, Some("23-24")),
            draft("A", None, Some("24-25")),
            draft("A", None, Some("24-25")),
            draft("B", None, Some("22-23")),
        ];

        let stats = TrackStatistics::from_drafts(&drafts, &[Categorical::Cohort]);

        assert_eq!(
            stats.mode("A", Categorical::Cohort),
            Some(&Category::Text("24-25".into()))
        );
        assert_eq!(
            stats.mode("B", Categorical::Cohort),
            Some(&Category::Text("22-23".into()))
        );
        assert_eq!(stats.mode("A", Categorical::Class), None);
    }

    #[test]
    fn test_mode_tie_goes_to_first_seen() {
        let values = vec![
            Category::Flag(false),
            Category::Flag(true),
            Category::Flag(true),
            Category::Flag(false),
        ];
        assert_eq!(mode(values), Some(Category::Flag(false)));
    }

    #[test]
    fn test_mode_of_nothing() {
        assert_eq!(mode(Vec::new()), None);
    }
}

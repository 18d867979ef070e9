//! Grading a dataset summary: integrity limits first, then sample-quality limits.

use crate::capture::{summarize_root, summarize_runs};
use crate::types::{
    DatasetResult, DatasetSummary, RunSummary, SampleIndex, ValidationOutcome, ValidationReport,
    ValidationThresholds,
};
use std::path::Path;

#[derive(Default)]
struct Verdict {
    outcome: Option<ValidationOutcome>,
    reasons: Vec<String>,
}

impl Verdict {
    fn raise(&mut self, to: ValidationOutcome, reason: String) {
        self.outcome = Some(self.outcome.map_or(to, |cur| cur.max(to)));
        self.reasons.push(reason);
    }

    /// Integrity: anything over `max` fails, naming the runs that contribute.
    fn integrity(
        &mut self,
        what: &str,
        runs: &[RunSummary],
        count_of: impl Fn(&RunSummary) -> usize,
        max: usize,
    ) {
        let total: usize = runs.iter().map(&count_of).sum();
        if total <= max {
            if total > 0 {
                self.raise(
                    ValidationOutcome::Warn,
                    format!("{what}: {total} (allowed {max})"),
                );
            }
            return;
        }
        let offenders: Vec<String> = runs
            .iter()
            .filter(|r| count_of(r) > 0)
            .map(|r| format!("{} ({})", r.run_dir.display(), count_of(r)))
            .collect();
        self.raise(
            ValidationOutcome::Fail,
            format!("{what}: {total} exceeds {max} in {}", offenders.join(", ")),
        );
    }

    /// Quality: over a configured limit fails, otherwise any occurrence warns.
    fn quality(
        &mut self,
        what: &str,
        count: usize,
        examined: usize,
        max_count: Option<usize>,
        max_ratio: Option<f32>,
    ) {
        let ratio = count as f32 / examined.max(1) as f32;
        if let Some(max) = max_count.filter(|max| count > *max) {
            self.raise(
                ValidationOutcome::Fail,
                format!("{what}: {count} exceeds max {max}"),
            );
        } else if let Some(max) = max_ratio.filter(|max| ratio > *max) {
            self.raise(
                ValidationOutcome::Fail,
                format!("{what}: ratio {ratio:.3} exceeds max {max:.3}"),
            );
        } else if count > 0 {
            self.raise(
                ValidationOutcome::Warn,
                format!("{what}: {count} of {examined} labels"),
            );
        }
    }
}

pub fn validate_summary(
    summary: DatasetSummary,
    thresholds: &ValidationThresholds,
) -> ValidationReport {
    let mut verdict = Verdict::default();
    verdict.integrity(
        "misaligned frame/label pairs",
        &summary.runs,
        |r| r.misaligned,
        thresholds.max_misaligned,
    );
    verdict.integrity(
        "images without a label",
        &summary.runs,
        |r| r.orphan_images,
        thresholds.max_orphan_images,
    );

    let totals = &summary.totals;
    verdict.quality(
        "missing images",
        totals.missing_file + totals.missing_image,
        totals.total,
        thresholds.max_missing,
        thresholds.max_missing_ratio,
    );
    verdict.quality(
        "invalid labels",
        totals.invalid,
        totals.total,
        thresholds.max_invalid,
        thresholds.max_invalid_ratio,
    );
    verdict.quality(
        "labels without a boxed object",
        totals.empty,
        totals.total,
        thresholds.max_empty,
        thresholds.max_empty_ratio,
    );

    ValidationReport {
        outcome: verdict.outcome.unwrap_or(ValidationOutcome::Pass),
        reasons: verdict.reasons,
        summary,
    }
}

/// Grade the runs named by `indices` (runs without labels are not seen).
pub fn summarize_with_thresholds(
    indices: &[SampleIndex],
    thresholds: &ValidationThresholds,
) -> DatasetResult<ValidationReport> {
    let summary = summarize_runs(indices)?;
    Ok(validate_summary(summary, thresholds))
}

/// Grade every run under `root`, including runs whose `labels/` is empty.
pub fn summarize_root_with_thresholds(
    root: &Path,
    thresholds: &ValidationThresholds,
) -> DatasetResult<ValidationReport> {
    let summary = summarize_root(root)?;
    Ok(validate_summary(summary, thresholds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn summary(runs: Vec<RunSummary>) -> DatasetSummary {
        DatasetSummary::from_runs(runs)
    }

    fn run(name: &str, totals: RunSummary) -> RunSummary {
        RunSummary {
            run_dir: PathBuf::from(name),
            ..totals
        }
    }

    #[test]
    fn clean_dataset_passes() {
        let report = validate_summary(
            summary(vec![run(
                "run_1",
                RunSummary {
                    total: 4,
                    valid: 4,
                    non_empty: 4,
                    ..Default::default()
                },
            )]),
            &ValidationThresholds::default(),
        );
        assert_eq!(report.outcome, ValidationOutcome::Pass);
        assert!(report.reasons.is_empty());
    }

    #[test]
    fn misalignment_fails_and_names_the_run() {
        let report = validate_summary(
            summary(vec![
                run(
                    "run_1",
                    RunSummary {
                        total: 2,
                        valid: 2,
                        non_empty: 2,
                        ..Default::default()
                    },
                ),
                run(
                    "run_2",
                    RunSummary {
                        total: 2,
                        valid: 1,
                        non_empty: 1,
                        misaligned: 1,
                        ..Default::default()
                    },
                ),
            ]),
            &ValidationThresholds::default(),
        );
        assert_eq!(report.outcome, ValidationOutcome::Fail);
        assert!(report.reasons[0].contains("run_2 (1)"));
        assert!(!report.reasons[0].contains("run_1"));
    }

    #[test]
    fn tolerated_orphans_only_warn() {
        let orphaned = summary(vec![run(
            "run_1",
            RunSummary {
                total: 1,
                valid: 1,
                non_empty: 1,
                orphan_images: 2,
                ..Default::default()
            },
        )]);
        let strict = validate_summary(orphaned.clone(), &ValidationThresholds::default());
        assert_eq!(strict.outcome, ValidationOutcome::Fail);
        let lenient = validate_summary(
            orphaned,
            &ValidationThresholds {
                max_orphan_images: 2,
                ..Default::default()
            },
        );
        assert_eq!(lenient.outcome, ValidationOutcome::Warn);
    }

    #[test]
    fn empty_ratio_threshold() {
        let totals = run(
            "run_1",
            RunSummary {
                total: 4,
                valid: 4,
                non_empty: 2,
                empty: 2,
                ..Default::default()
            },
        );
        let lenient = validate_summary(
            summary(vec![totals.clone()]),
            &ValidationThresholds::default(),
        );
        assert_eq!(lenient.outcome, ValidationOutcome::Warn);
        let strict = validate_summary(
            summary(vec![totals]),
            &ValidationThresholds {
                max_empty_ratio: Some(0.25),
                ..Default::default()
            },
        );
        assert_eq!(strict.outcome, ValidationOutcome::Fail);
    }
}

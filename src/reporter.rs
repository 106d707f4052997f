/**
This modules gives a few tools to prettyprint the score of an evaluation, its error analysis and
the counters of a corpus load. Every report is displayed as a small dataframe: a header line
followed by comma-separated rows.
*/
use crate::corpus::LoadStats;
use crate::error_analysis::{ErrorReport, FnCategory, FpCategory};
use crate::metrics::ScoreReport;
use enum_iterator::all;
use std::fmt::Display;

/// The ScoreReport acts as a one-line dataframe when displayed.
///
/// # Example
///
/// ```rust
/// use aligneval::ScoreReport;
///
/// let report = ScoreReport::from_counts(1, 1, 2);
/// let expected = "Precision, Recall, F1, TP, FP, FN
/// 0.5, 0.5, 0.5, 1, 1, 1\n";
/// assert_eq!(expected, report.to_string());
/// ```
impl Display for ScoreReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Precision, Recall, F1, TP, FP, FN")?;
        writeln!(
            f,
            "{}, {}, {}, {}, {}, {}",
            self.precision, self.recall, self.f1, self.tp, self.fp, self.fn_
        )
    }
}

/// One line per category, false negatives first, then the number of false negatives with an
/// overlapping candidate.
impl Display for ErrorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Error, Category, Count")?;
        for category in all::<FnCategory>() {
            writeln!(f, "FN, {}, {}", category, self.fn_count(category))?
        }
        writeln!(f, "FN, Partially_Matched, {}", self.partially_matched.len())?;
        for category in all::<FpCategory>() {
            writeln!(f, "FP, {}, {}", category, self.fp_count(category))?
        }
        Ok(())
    }
}

impl Display for LoadStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Documents, Annotations, Filtered, Aligned, Unaligned, Duplicates"
        )?;
        writeln!(
            f,
            "{}, {}, {}, {}, {}, {}",
            self.documents,
            self.annotations,
            self.filtered,
            self.aligned,
            self.unaligned,
            self.duplicates
        )
    }
}

use crate::batch::BatchSummary;
use crate::layout::OutputLayout;
use crate::range::NumberRange;

const LISTED_FAILURES: usize = 10;
const RULE_WIDTH: usize = 50;

/// End-of-run tally. Success counts files actually on disk, so numbers
/// finished by an earlier run count too.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryReport {
    pub requested: usize,
    pub generated: usize,
    pub failed: Vec<u32>,
}

impl SummaryReport {
    pub fn new(range: NumberRange, layout: &OutputLayout, summary: &BatchSummary) -> Self {
        Self {
            requested: range.len(),
            generated: layout.count_generated(range),
            failed: summary.failed_indices(),
        }
    }

    /// Percentage of the range with a file on disk.
    pub fn success_rate(&self) -> f64 {
        if self.requested == 0 {
            return 0.0;
        }
        self.generated as f64 / self.requested as f64 * 100.0
    }

    pub fn lines(&self) -> Vec<String> {
        let rule = "=".repeat(RULE_WIDTH);
        let mut lines = vec![
            rule.clone(),
            "GENERATION SUMMARY REPORT".to_string(),
            rule.clone(),
            format!("Total numbers to process: {}", self.requested),
            format!("Successfully generated: {}", self.generated),
            format!("Failed: {}", self.failed.len()),
            format!("Success rate: {:.1}%", self.success_rate()),
        ];

        if !self.failed.is_empty() {
            let listed: Vec<String> = self
                .failed
                .iter()
                .take(LISTED_FAILURES)
                .map(|index| index.to_string())
                .collect();
            lines.push(format!("Failed numbers: {}", listed.join(", ")));
            if self.failed.len() > LISTED_FAILURES {
                lines.push(format!(
                    "... and {} more",
                    self.failed.len() - LISTED_FAILURES
                ));
            }
        }

        lines.push(rule);
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::GenerationResult;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_counts_files_on_disk() {
        let temp = TempDir::new().unwrap();
        let layout = OutputLayout::new(temp.path());
        for index in [1, 2, 3] {
            fs::write(layout.path_for(index), b"x").unwrap();
        }
        let summary = BatchSummary {
            results: vec![
                GenerationResult::resumed(1),
                GenerationResult::generated(2),
                GenerationResult::generated(3),
                GenerationResult::failed(4, "boom".to_string()),
            ],
        };

        let report = SummaryReport::new(NumberRange::new(1, 4).unwrap(), &layout, &summary);
        assert_eq!(report.requested, 4);
        assert_eq!(report.generated, 3);
        assert_eq!(report.failed, vec![4]);
        assert!((report.success_rate() - 75.0).abs() < f64::EPSILON);

        let lines = report.lines();
        assert!(lines.contains(&"Success rate: 75.0%".to_string()));
        assert!(lines.contains(&"Failed numbers: 4".to_string()));
        assert!(!lines.iter().any(|l| l.contains("more")));
    }

    #[test]
    fn test_long_failure_list_is_truncated() {
        let report = SummaryReport {
            requested: 30,
            generated: 15,
            failed: (1..=15).collect(),
        };

        let lines = report.lines();
        assert!(lines.contains(&"Failed numbers: 1, 2, 3, 4, 5, 6, 7, 8, 9, 10".to_string()));
        assert!(lines.contains(&"... and 5 more".to_string()));
        assert!(lines.contains(&"Success rate: 50.0%".to_string()));
    }

    #[test]
    fn test_no_failures_section_when_clean() {
        let report = SummaryReport {
            requested: 3,
            generated: 3,
            failed: vec![],
        };
        let lines = report.lines();
        assert!(!lines.iter().any(|l| l.starts_with("Failed numbers")));
        assert!(lines.contains(&"Failed: 0".to_string()));
    }
}

//! Conversion report types for tracking failed files and skipped boxes.

use serde::Serialize;
use std::fmt;

use crate::error::PrepError;

/// A report generated by a batch conversion.
///
/// Tracks how many files were seen, converted and failed, and every box
/// that was left out, so a run can be audited after the fact.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ConversionReport {
    /// Source format name.
    pub from: String,
    /// Target format name.
    pub to: String,
    pub counts: ConversionCounts,
    pub issues: Vec<ConversionIssue>,
}

impl ConversionReport {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            ..Default::default()
        }
    }

    pub fn add(&mut self, issue: ConversionIssue) {
        self.issues.push(issue);
    }

    /// Count of error-level issues (files that produced no output).
    pub fn error_count(&self) -> usize {
        self.count_severity(ConversionSeverity::Error)
    }

    /// Count of warning-level issues (skipped boxes, skipped images).
    pub fn warning_count(&self) -> usize {
        self.count_severity(ConversionSeverity::Warning)
    }

    fn count_severity(&self, severity: ConversionSeverity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// Fails with `ConversionFailed` when any file could not be converted.
    pub fn ensure_no_failures(&self) -> Result<(), PrepError> {
        if self.counts.files_failed > 0 {
            return Err(PrepError::ConversionFailed {
                failed: self.counts.files_failed,
                total: self.counts.files_seen,
            });
        }
        Ok(())
    }
}

impl fmt::Display for ConversionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "  {} files: {} converted, {} failed",
            self.counts.files_seen, self.counts.files_converted, self.counts.files_failed
        )?;
        writeln!(
            f,
            "  {} boxes written, {} skipped",
            self.counts.boxes_written, self.counts.boxes_skipped
        )?;

        for (severity, title) in [
            (ConversionSeverity::Error, "Errors"),
            (ConversionSeverity::Warning, "Warnings"),
        ] {
            let count = self.count_severity(severity);
            if count == 0 {
                continue;
            }
            writeln!(f)?;
            writeln!(f, "{} ({}):", title, count)?;
            for issue in self.issues.iter().filter(|i| i.severity == severity) {
                writeln!(f, "  - {}: {}", issue.path, issue.message)?;
            }
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConversionCounts {
    pub files_seen: usize,
    pub files_converted: usize,
    pub files_failed: usize,
    pub boxes_written: usize,
    pub boxes_skipped: usize,
}

/// A single issue observed while converting one file.
#[derive(Clone, Debug, Serialize)]
pub struct ConversionIssue {
    pub severity: ConversionSeverity,
    pub code: ConversionIssueCode,
    /// The input file the issue belongs to.
    pub path: String,
    pub message: String,
}

impl ConversionIssue {
    /// A file that produced no output.
    pub fn error(
        code: ConversionIssueCode,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: ConversionSeverity::Error,
            code,
            path: path.into(),
            message: message.into(),
        }
    }

    /// Partial output: something was skipped but the run carries on.
    pub fn warning(
        code: ConversionIssueCode,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: ConversionSeverity::Warning,
            code,
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionSeverity {
    Error,
    Warning,
}

/// Stable issue codes for programmatic consumption.
///
/// These codes are part of the JSON output and should remain stable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionIssueCode {
    /// VOC document could not be read or parsed.
    MalformedAnnotation,
    /// Label file has a row that is not `class a b c d`.
    LabelParse,
    /// Image header could not be probed for its dimensions.
    ImageSizeUnreadable,
    /// Image has no label file next to it.
    MissingLabel,
    /// A box names a class outside the mapping.
    UnknownClass,
    /// A label row uses an id outside the mapping.
    UnknownClassId,
}

impl ConversionIssueCode {
    /// Issue code for a per-file or per-box error.
    pub fn for_error(error: &PrepError) -> Self {
        match error {
            PrepError::LabelParse { .. } => Self::LabelParse,
            PrepError::ImageDimensionRead { .. } | PrepError::LayoutInvalid { .. } => {
                Self::ImageSizeUnreadable
            }
            PrepError::MissingLabel { .. } => Self::MissingLabel,
            PrepError::UnknownClass { .. } => Self::UnknownClass,
            PrepError::UnknownClassId { .. } => Self::UnknownClassId,
            _ => Self::MalformedAnnotation,
        }
    }
}

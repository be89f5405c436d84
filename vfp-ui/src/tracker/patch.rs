//! Row-patch instructions
//!
//! The tracker never touches the rendered table directly; it emits one
//! serialized patch per state change and the render layer applies it to
//! the addressed row.

use chrono::{DateTime, Utc};
use serde::Serialize;

use vfp_common::api::{FileMetrics, ModelSummary};
use vfp_common::relative_time::format_relative;
use vfp_common::CategoryStatus;

/// Progress bar width scale: pixels per percent
pub const BAR_PX_PER_PERCENT: u32 = 2;

/// Label shown for a file that reached the failed state
pub const ERROR_LABEL: &str = "an error occurred";

/// Label shown while a file waits for a validation worker
pub const QUEUED_LABEL: &str = "in queue";

/// Permanent cells written into a row when its file finishes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerminalCells {
    pub syntax: CategoryStatus,
    pub schema: CategoryStatus,
    pub rules: CategoryStatus,
    pub industry: CategoryStatus,
    pub bsdd: CategoryStatus,
    /// Relative completion time, empty when the backend sent no date
    pub date_label: String,
    pub report_url: Option<String>,
    pub download_url: Option<String>,
}

/// One UI-update instruction for one row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowPatch {
    /// Non-terminal progress display: label plus bar width in pixels
    Progress {
        row_id: u64,
        label: String,
        bar_width: u32,
    },
    /// Best-effort metrics, updated on every poll while non-terminal
    Metrics {
        row_id: u64,
        geometries: Option<u64>,
        properties: Option<u64>,
    },
    /// Replace the in-progress decorations with the permanent cells
    Finalized { row_id: u64, cells: TerminalCells },
    /// File finished but its summary fetch failed; progress shows complete
    /// and the detail cells stay placeholder
    FinalizeDegraded { row_id: u64 },
    /// File terminated with an internal error
    TerminalError { row_id: u64, label: String },
}

impl RowPatch {
    /// Display mapping for a non-terminal progress value: negative renders
    /// as the queued label with a zero-width bar, otherwise `{p}%` with the
    /// bar scaled linearly.
    pub fn progress(row_id: u64, value: i32) -> RowPatch {
        if value < 0 {
            RowPatch::Progress {
                row_id,
                label: QUEUED_LABEL.to_string(),
                bar_width: 0,
            }
        } else {
            let clamped = value.min(100) as u32;
            RowPatch::Progress {
                row_id,
                label: format!("{}%", clamped),
                bar_width: clamped * BAR_PX_PER_PERCENT,
            }
        }
    }

    pub fn metrics(row_id: u64, metrics: &FileMetrics) -> RowPatch {
        RowPatch::Metrics {
            row_id,
            geometries: metrics.number_of_geometries,
            properties: metrics.number_of_properties,
        }
    }

    pub fn finalized(row_id: u64, summary: &ModelSummary, now: DateTime<Utc>) -> RowPatch {
        RowPatch::Finalized {
            row_id,
            cells: TerminalCells {
                syntax: summary.status_syntax,
                schema: summary.status_schema,
                rules: summary.status_rules,
                industry: summary.status_ind,
                bsdd: summary.status_bsdd,
                date_label: summary
                    .date
                    .map(|date| format_relative(date, now))
                    .unwrap_or_default(),
                report_url: summary.report_url.clone(),
                download_url: summary.download_url.clone(),
            },
        }
    }

    pub fn terminal_error(row_id: u64) -> RowPatch {
        RowPatch::TerminalError {
            row_id,
            label: ERROR_LABEL.to_string(),
        }
    }

    /// Row this patch addresses
    pub fn row_id(&self) -> u64 {
        match *self {
            RowPatch::Progress { row_id, .. }
            | RowPatch::Metrics { row_id, .. }
            | RowPatch::Finalized { row_id, .. }
            | RowPatch::FinalizeDegraded { row_id }
            | RowPatch::TerminalError { row_id, .. } => row_id,
        }
    }
}

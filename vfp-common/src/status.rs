//! Severity and status taxonomy shared by the progress table and the report
//!
//! Two independent axes:
//! - `CategoryStatus`: the per-file, per-category outcome shown as a table
//!   cell icon (valid / invalid / warning / not checked / pending / n.a.)
//! - `Severity`: the 5-value ordinal attached to each individual outcome
//!   record inside a report group
//!
//! Both are pure lookup tables plus the `combine` merge operation; no other
//! behavior lives here.

use serde::{Deserialize, Serialize};

/// Per-file category status, serialized as the one-character wire codes
/// used by the validation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryStatus {
    /// Check ran and passed
    #[serde(rename = "v")]
    Valid,
    /// Check did not run for this file
    #[serde(rename = "n")]
    NotChecked,
    /// Check ran with non-fatal findings
    #[serde(rename = "w")]
    Warning,
    /// Check ran and failed
    #[serde(rename = "i")]
    Invalid,
    /// Check still executing
    #[serde(rename = "p")]
    Pending,
    /// Check not applicable to this file type
    #[serde(rename = "-")]
    NotApplicable,
}

impl Default for CategoryStatus {
    fn default() -> Self {
        CategoryStatus::Pending
    }
}

impl CategoryStatus {
    /// Human-readable cell label
    pub fn label(self) -> &'static str {
        match self {
            CategoryStatus::Valid => "Valid",
            CategoryStatus::NotChecked => "N/A",
            CategoryStatus::Warning => "Warning",
            CategoryStatus::Invalid => "Invalid",
            CategoryStatus::Pending => "Pending...",
            CategoryStatus::NotApplicable => "N/A",
        }
    }

    /// Icon class for the table cell
    pub fn icon(self) -> &'static str {
        match self {
            CategoryStatus::Valid => "check_circle",
            CategoryStatus::NotChecked => "browser_not_supported",
            CategoryStatus::Warning => "warning",
            CategoryStatus::Invalid => "error",
            CategoryStatus::Pending => "hourglass_bottom",
            CategoryStatus::NotApplicable => "block",
        }
    }

    /// Cell background color
    pub fn color(self) -> &'static str {
        match self {
            CategoryStatus::Valid => "rgb(217, 242, 217)",
            CategoryStatus::NotChecked => "#dddddd",
            CategoryStatus::Warning => "rgb(253, 253, 150)",
            CategoryStatus::Invalid => "rgb(255, 204, 204)",
            CategoryStatus::Pending => "#dddddd",
            CategoryStatus::NotApplicable => "#dddddd",
        }
    }

    /// Merge rank. Total order `- < p < v < n < w < i`; the four statuses a
    /// finished check can produce keep the required `v < n < w < i` order,
    /// and the two transient states sit below all of them.
    fn rank(self) -> u8 {
        match self {
            CategoryStatus::NotApplicable => 0,
            CategoryStatus::Pending => 1,
            CategoryStatus::Valid => 2,
            CategoryStatus::NotChecked => 3,
            CategoryStatus::Warning => 4,
            CategoryStatus::Invalid => 5,
        }
    }

    /// Merge two category statuses into one displayed cell: the status with
    /// the highest rank wins. Associative and commutative, since rank is a
    /// total order.
    pub fn combine(a: CategoryStatus, b: CategoryStatus) -> CategoryStatus {
        if b.rank() > a.rank() {
            b
        } else {
            a
        }
    }
}

/// Per-outcome severity, a closed 5-value ordinal.
///
/// Wire format is the bare integer 0-4. Unknown values degrade to `Error`
/// instead of failing the whole response payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum Severity {
    /// Check not applicable or disabled
    NotApplicable = 0,
    /// Check applicable, nothing to report
    Applicable = 1,
    /// Check passed
    Passed = 2,
    /// Non-fatal finding
    Warning = 3,
    /// Fatal finding
    Error = 4,
}

impl Default for Severity {
    fn default() -> Self {
        Severity::NotApplicable
    }
}

impl From<u8> for Severity {
    fn from(value: u8) -> Self {
        match value {
            0 => Severity::NotApplicable,
            1 => Severity::Applicable,
            2 => Severity::Passed,
            3 => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl From<Severity> for u8 {
    fn from(value: Severity) -> Self {
        value as u8
    }
}

impl Severity {
    /// Human-readable label
    pub fn label(self) -> &'static str {
        match self {
            Severity::NotApplicable => "N/A",
            Severity::Applicable => "Applicable",
            Severity::Passed => "Passed",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        }
    }

    /// Status class used for the group background
    pub fn status(self) -> CategoryStatus {
        match self {
            Severity::NotApplicable => CategoryStatus::NotChecked,
            Severity::Applicable | Severity::Passed => CategoryStatus::Valid,
            Severity::Warning => CategoryStatus::Warning,
            Severity::Error => CategoryStatus::Invalid,
        }
    }

    /// Group background color
    pub fn color(self) -> &'static str {
        self.status().color()
    }

    /// Warnings and errors stay visible when the report hides passed checks
    pub fn is_reportable(self) -> bool {
        self > Severity::Passed
    }
}

/// The rule categories a file is checked against; also the report route
/// parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckCategory {
    Syntax,
    Schema,
    Rules,
    Industry,
    Bsdd,
}

impl CheckCategory {
    /// All categories in dashboard column order
    pub const ALL: [CheckCategory; 5] = [
        CheckCategory::Syntax,
        CheckCategory::Schema,
        CheckCategory::Rules,
        CheckCategory::Industry,
        CheckCategory::Bsdd,
    ];

    /// Lowercase name used in URLs and query strings
    pub fn as_str(self) -> &'static str {
        match self {
            CheckCategory::Syntax => "syntax",
            CheckCategory::Schema => "schema",
            CheckCategory::Rules => "rules",
            CheckCategory::Industry => "industry",
            CheckCategory::Bsdd => "bsdd",
        }
    }
}

impl std::str::FromStr for CheckCategory {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "syntax" => Ok(CheckCategory::Syntax),
            "schema" => Ok(CheckCategory::Schema),
            "rules" => Ok(CheckCategory::Rules),
            "industry" => Ok(CheckCategory::Industry),
            "bsdd" => Ok(CheckCategory::Bsdd),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown check category: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for CheckCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

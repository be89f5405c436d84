//! Plain-text export of one report group
//!
//! Pure formatting for clipboard use: no network, no state, no mutation.

use super::ReportGroup;

const HEADER: &str = "Severity\tId\tEntity\tExpected\tObserved\tMessage";

/// Flatten one group into tab-separated text, one line per outcome row.
/// Free-form payload fields may contain tabs or newlines; those are
/// replaced with spaces so the table stays rectangular.
pub fn export_group_as_text(group: &ReportGroup) -> String {
    let mut out = String::with_capacity(64 * (group.rows.len() + 1));
    out.push_str(HEADER);
    out.push('\n');

    for row in &group.rows {
        let columns = [
            row.severity.label(),
            &row.guid,
            &row.entity_type,
            &row.expected,
            &row.observed,
            &row.message,
        ];
        let mut first = true;
        for column in columns {
            if !first {
                out.push('\t');
            }
            first = false;
            out.push_str(&flatten(column));
        }
        out.push('\n');
    }

    out
}

fn flatten(field: &str) -> String {
    field.replace(['\t', '\n', '\r'], " ")
}

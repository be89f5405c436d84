//! Result aggregation for the drillable report
//!
//! A pure transformation: flat outcome list plus occurrence counts in,
//! grouped / title-sorted / paginated report out. The aggregator holds no
//! state between calls and is re-run whenever a report view opens or its
//! filter changes, so identical inputs must always produce identical group
//! order and page contents.

pub mod export;

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::Value;

use vfp_common::api::{InstanceMap, OutcomeRecord};
use vfp_common::Severity;

/// Groups per report page
pub const PAGE_SIZE: usize = 10;

/// Group for title-less records produced by schema-version checks
const SCHEMA_VERSION_GROUP: &str = "Schema version";
/// Group for records carrying no usable grouping key at all
const UNCATEGORIZED_GROUP: &str = "Uncategorized";
/// Display placeholder for unresolvable instance references
const PLACEHOLDER: &str = "?";

/// Aggregation switches
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    /// Keep passed/not-applicable records too; default shows only
    /// warnings and errors
    pub include_all: bool,
    /// Drop records sharing an identical (instance, title, severity) key,
    /// keeping the first in delivery order
    pub dedup: bool,
}

/// One display-ready outcome row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub guid: String,
    pub entity_type: String,
    pub severity: Severity,
    pub expected: String,
    pub observed: String,
    pub message: String,
}

/// All records sharing one rule title; the unit of display and pagination
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportGroup {
    pub title: String,
    /// Highest severity among members; drives the group background
    pub severity: Severity,
    pub rows: Vec<ReportRow>,
    /// Rows actually delivered by the backend
    pub delivered: usize,
    /// Total occurrences on the backend, >= delivered
    pub total: u64,
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurrence_note: Option<String>,
}

/// Aggregated report, ready for page-by-page rendering
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    groups: Vec<ReportGroup>,
}

impl Report {
    pub fn groups(&self) -> &[ReportGroup] {
        &self.groups
    }

    pub fn total_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn total_pages(&self) -> usize {
        (self.groups.len() + PAGE_SIZE - 1) / PAGE_SIZE
    }

    /// One page of groups. A page past the end is empty, not an error.
    pub fn page(&self, page: usize) -> &[ReportGroup] {
        let start = match page.checked_mul(PAGE_SIZE) {
            Some(start) if start < self.groups.len() => start,
            _ => return &[],
        };
        let end = (start + PAGE_SIZE).min(self.groups.len());
        &self.groups[start..end]
    }
}

/// Build the grouped report from a flat outcome list.
///
/// Steps: filter by severity (unless `include_all`), optional stable
/// de-duplication, group by title, sort groups by title ascending, compute
/// per-group severity and truncation against the occurrence counts. A
/// title missing from `counts` degrades to "exactly what was delivered" -
/// no truncation banner, never an error.
pub fn aggregate(
    records: &[OutcomeRecord],
    counts: &HashMap<String, u64>,
    instances: &InstanceMap,
    options: ReportOptions,
) -> Report {
    let filtered: Vec<&OutcomeRecord> = records
        .iter()
        .filter(|record| options.include_all || record.severity.is_reportable())
        .collect();

    let filtered = if options.dedup {
        dedup_stable(filtered)
    } else {
        filtered
    };

    // Partition by title in discovery order, then order the groups by title
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<&OutcomeRecord>> = HashMap::new();
    for record in filtered {
        let key = group_key(record);
        match buckets.get_mut(&key) {
            Some(bucket) => bucket.push(record),
            None => {
                order.push(key.clone());
                buckets.insert(key, vec![record]);
            }
        }
    }
    order.sort();

    let groups = order
        .into_iter()
        .map(|title| {
            let members = buckets.remove(&title).unwrap_or_default();
            let severity = members
                .iter()
                .map(|record| record.severity)
                .max()
                .unwrap_or(Severity::NotApplicable);
            let delivered = members.len();
            let total = counts
                .get(&title)
                .copied()
                .unwrap_or(delivered as u64)
                .max(delivered as u64);
            let truncated = (delivered as u64) < total;
            let occurrence_note = truncated.then(|| {
                format!(
                    "only the first {} of {} occurrences are shown",
                    delivered, total
                )
            });
            let rows = members
                .iter()
                .map(|&record| render_row(record, instances))
                .collect();

            ReportGroup {
                title,
                severity,
                rows,
                delivered,
                total,
                truncated,
                occurrence_note,
            }
        })
        .collect();

    Report { groups }
}

/// Grouping key: the rule title; title-less records fall back to the
/// schema-version group when they carry a feature, else to uncategorized.
fn group_key(record: &OutcomeRecord) -> String {
    if let Some(title) = record.title.as_ref().filter(|t| !t.is_empty()) {
        return title.clone();
    }
    if record.feature.is_some() {
        SCHEMA_VERSION_GROUP.to_string()
    } else {
        UNCATEGORIZED_GROUP.to_string()
    }
}

/// Order-preserving unique filter on (instance, title, severity); the
/// first occurrence in delivery order survives.
fn dedup_stable(records: Vec<&OutcomeRecord>) -> Vec<&OutcomeRecord> {
    let mut seen: HashSet<(Option<i64>, String, Severity)> = HashSet::new();
    records
        .into_iter()
        .filter(|&record| seen.insert((record.instance_id, group_key(record), record.severity)))
        .collect()
}

fn render_row(record: &OutcomeRecord, instances: &InstanceMap) -> ReportRow {
    let (guid, entity_type) = match record.instance_id.and_then(|id| instances.get(&id)) {
        Some(instance) => (instance.guid.clone(), instance.entity_type.clone()),
        None => (PLACEHOLDER.to_string(), PLACEHOLDER.to_string()),
    };

    ReportRow {
        guid,
        entity_type,
        severity: record.severity,
        expected: display_value(record.expected.as_ref()),
        observed: display_value(record.observed.as_ref()),
        message: record.message.clone().unwrap_or_default(),
    }
}

/// Scalars display bare, nested descriptors as compact JSON
fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(scalar @ (Value::Bool(_) | Value::Number(_))) => scalar.to_string(),
        Some(nested) => nested.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vfp_common::api::ModelInstance;

    fn record(title: &str, severity: u8, instance_id: Option<i64>) -> OutcomeRecord {
        OutcomeRecord {
            instance_id,
            severity: Severity::from(severity),
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    fn no_counts() -> HashMap<String, u64> {
        HashMap::new()
    }

    fn no_instances() -> InstanceMap {
        InstanceMap::new()
    }

    #[test]
    fn test_filter_hides_passed_by_default() {
        let records = vec![
            record("Walls", 2, None),
            record("Walls", 4, None),
            record("Doors", 1, None),
        ];
        let report = aggregate(
            &records,
            &no_counts(),
            &no_instances(),
            ReportOptions::default(),
        );

        assert_eq!(report.total_groups(), 1);
        let group = &report.groups()[0];
        assert_eq!(group.title, "Walls");
        assert!(group.rows.iter().all(|r| r.severity.is_reportable()));
    }

    #[test]
    fn test_include_all_keeps_every_record() {
        let records = vec![
            record("Walls", 2, None),
            record("Walls", 4, None),
            record("Doors", 1, None),
        ];
        let report = aggregate(
            &records,
            &no_counts(),
            &no_instances(),
            ReportOptions {
                include_all: true,
                ..Default::default()
            },
        );

        let delivered: usize = report.groups().iter().map(|g| g.delivered).sum();
        assert_eq!(delivered, records.len());
        assert_eq!(report.total_groups(), 2);
    }

    #[test]
    fn test_groups_sorted_by_title() {
        let records = vec![
            record("Zeta", 3, None),
            record("Alpha", 4, None),
            record("Mid", 3, None),
            record("Alpha", 3, None),
        ];
        let report = aggregate(
            &records,
            &no_counts(),
            &no_instances(),
            ReportOptions::default(),
        );

        let titles: Vec<&str> = report.groups().iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "Mid", "Zeta"]);
    }

    #[test]
    fn test_group_severity_is_member_maximum() {
        let records = vec![record("Walls", 3, None), record("Walls", 4, None)];
        let report = aggregate(
            &records,
            &no_counts(),
            &no_instances(),
            ReportOptions::default(),
        );
        assert_eq!(report.groups()[0].severity, Severity::Error);
    }

    #[test]
    fn test_deterministic_grouping() {
        let records: Vec<OutcomeRecord> = (0..200)
            .map(|i| record(&format!("Rule {:03}", i % 17), 3 + (i % 2) as u8, Some(i)))
            .collect();
        let counts: HashMap<String, u64> =
            (0..17).map(|i| (format!("Rule {:03}", i), 100)).collect();

        let first = aggregate(&records, &counts, &no_instances(), ReportOptions::default());
        let second = aggregate(&records, &counts, &no_instances(), ReportOptions::default());

        assert_eq!(first, second);
        assert_eq!(first.page(1), second.page(1));
    }

    #[test]
    fn test_truncation_annotation() {
        let records: Vec<OutcomeRecord> =
            (0..50).map(|i| record("Space heights", 4, Some(i))).collect();
        let counts = HashMap::from([("Space heights".to_string(), 1000u64)]);

        let report = aggregate(&records, &counts, &no_instances(), ReportOptions::default());
        let group = &report.groups()[0];

        assert!(group.truncated);
        assert_eq!(group.delivered, 50);
        assert_eq!(group.total, 1000);
        assert_eq!(
            group.occurrence_note.as_deref(),
            Some("only the first 50 of 1000 occurrences are shown")
        );
    }

    #[test]
    fn test_missing_count_key_means_no_truncation() {
        let records = vec![record("Walls", 4, None)];
        let report = aggregate(
            &records,
            &no_counts(),
            &no_instances(),
            ReportOptions::default(),
        );
        let group = &report.groups()[0];
        assert!(!group.truncated);
        assert_eq!(group.total, 1);
        assert!(group.occurrence_note.is_none());
    }

    #[test]
    fn test_count_below_delivered_is_corrected() {
        // A backend undercount must not produce a nonsense banner
        let records = vec![record("Walls", 4, None), record("Walls", 4, None)];
        let counts = HashMap::from([("Walls".to_string(), 1u64)]);
        let report = aggregate(&records, &counts, &no_instances(), ReportOptions::default());
        assert!(!report.groups()[0].truncated);
        assert_eq!(report.groups()[0].total, 2);
    }

    #[test]
    fn test_page_beyond_last_is_empty() {
        let records: Vec<OutcomeRecord> = (0..25)
            .map(|i| record(&format!("Rule {:02}", i), 4, None))
            .collect();
        let report = aggregate(
            &records,
            &no_counts(),
            &no_instances(),
            ReportOptions::default(),
        );

        assert_eq!(report.total_groups(), 25);
        assert_eq!(report.total_pages(), 3);
        assert_eq!(report.page(2).len(), 5);
        assert!(report.page(3).is_empty());
        assert!(report.page(usize::MAX / PAGE_SIZE + 1).is_empty());
    }

    /// 25 records over 4 titles; 18 reportable across 3 titles.
    #[test]
    fn test_filtered_batch_scenario() {
        let mut records = Vec::new();
        for i in 0..6 {
            records.push(record("Alignment", 3, Some(i)));
            records.push(record("Georeferencing", 4, Some(i)));
            records.push(record("Space boundaries", 3, Some(i)));
        }
        for i in 0..7 {
            records.push(record("Units", 2, Some(i)));
        }
        assert_eq!(records.len(), 25);

        let report = aggregate(
            &records,
            &no_counts(),
            &no_instances(),
            ReportOptions::default(),
        );

        assert_eq!(report.total_groups(), 3);
        let page = report.page(0);
        let titles: Vec<&str> = page.iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, vec!["Alignment", "Georeferencing", "Space boundaries"]);
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let mut first = record("Walls", 4, Some(7));
        first.message = Some("first".to_string());
        let mut duplicate = record("Walls", 4, Some(7));
        duplicate.message = Some("second".to_string());
        let different_instance = record("Walls", 4, Some(8));

        let records = vec![first, duplicate, different_instance];
        let report = aggregate(
            &records,
            &no_counts(),
            &no_instances(),
            ReportOptions {
                dedup: true,
                ..Default::default()
            },
        );

        let group = &report.groups()[0];
        assert_eq!(group.delivered, 2);
        assert_eq!(group.rows[0].message, "first");
    }

    #[test]
    fn test_dedup_disabled_by_default() {
        let records = vec![record("Walls", 4, Some(7)), record("Walls", 4, Some(7))];
        let report = aggregate(
            &records,
            &no_counts(),
            &no_instances(),
            ReportOptions::default(),
        );
        assert_eq!(report.groups()[0].delivered, 2);
    }

    #[test]
    fn test_instance_resolution_and_placeholder() {
        let instances: InstanceMap = HashMap::from([(
            7,
            ModelInstance {
                guid: "2O2Fr$t4X7Zf8NOew3FLOH".to_string(),
                entity_type: "IfcWall".to_string(),
            },
        )]);
        let records = vec![record("Walls", 4, Some(7)), record("Walls", 4, None)];
        let report = aggregate(&records, &no_counts(), &instances, ReportOptions::default());

        let rows = &report.groups()[0].rows;
        assert_eq!(rows[0].guid, "2O2Fr$t4X7Zf8NOew3FLOH");
        assert_eq!(rows[0].entity_type, "IfcWall");
        assert_eq!(rows[1].guid, "?");
        assert_eq!(rows[1].entity_type, "?");
    }

    #[test]
    fn test_title_fallback_groups() {
        let schema_level = OutcomeRecord {
            severity: Severity::Error,
            feature: Some("IFC4X3".to_string()),
            ..Default::default()
        };
        let bare = OutcomeRecord {
            severity: Severity::Error,
            ..Default::default()
        };
        let report = aggregate(
            &[schema_level, bare],
            &no_counts(),
            &no_instances(),
            ReportOptions::default(),
        );

        let titles: Vec<&str> = report.groups().iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, vec!["Schema version", "Uncategorized"]);
    }

    #[test]
    fn test_display_value_shapes() {
        assert_eq!(display_value(None), "");
        assert_eq!(display_value(Some(&Value::String("IfcWall".into()))), "IfcWall");
        assert_eq!(display_value(Some(&serde_json::json!(42))), "42");
        assert_eq!(
            display_value(Some(&serde_json::json!({"oneOf": [1, 2]}))),
            r#"{"oneOf":[1,2]}"#
        );
    }
}

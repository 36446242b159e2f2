//! Purpose: JSON envelopes for CLI output.
//! Exports: `rows_json`, `generated_id_json`, `id_source_label`, `report_json`.
//! Role: Keep output shapes consistent across commands.
//! Invariants: Stable key names; rows keep their column order.

use flatstore::api::{
    FallbackReason, GeneratedId, IdSource, Record, Severity, ValidationReport, ValidationStatus,
};
use serde_json::{Map, Value, json};

pub(crate) fn rows_json(rows: &[Record]) -> Value {
    Value::Array(rows.iter().map(Record::to_json).collect())
}

pub(crate) fn id_source_label(source: IdSource) -> &'static str {
    match source {
        IdSource::Sequential => "sequential",
        IdSource::Fallback(FallbackReason::ScanFailed) => "fallback_scan_failed",
        IdSource::Fallback(FallbackReason::Collision) => "fallback_collision",
    }
}

pub(crate) fn generated_id_json(table: &str, generated: &GeneratedId) -> Value {
    json!({
        "table": table,
        "id": generated.id,
        "source": id_source_label(generated.source),
    })
}

pub(crate) fn report_json(report: &ValidationReport) -> Value {
    let mut map = Map::new();
    map.insert("table".to_string(), json!(report.table));
    map.insert("path".to_string(), json!(report.path.display().to_string()));
    map.insert("exists".to_string(), json!(report.exists));
    map.insert(
        "status".to_string(),
        json!(match report.status {
            ValidationStatus::Ok => "ok",
            ValidationStatus::Corrupt => "corrupt",
        }),
    );
    map.insert("columns".to_string(), json!(report.column_count));
    map.insert("rows".to_string(), json!(report.row_count));
    map.insert("issue_count".to_string(), json!(report.issue_count()));
    let issues = report
        .issues
        .iter()
        .map(|issue| {
            let mut entry = Map::new();
            entry.insert("code".to_string(), json!(issue.code));
            entry.insert(
                "severity".to_string(),
                json!(match issue.severity {
                    Severity::Warning => "warning",
                    Severity::Error => "error",
                }),
            );
            entry.insert("message".to_string(), json!(issue.message));
            if let Some(line) = issue.line {
                entry.insert("line".to_string(), json!(line));
            }
            Value::Object(entry)
        })
        .collect::<Vec<_>>();
    map.insert("issues".to_string(), Value::Array(issues));
    if !report.orphaned_temp_files.is_empty() {
        let orphans = report
            .orphaned_temp_files
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>();
        map.insert("orphaned_temp_files".to_string(), json!(orphans));
    }
    if !report.remediation_hints.is_empty() {
        map.insert("hints".to_string(), json!(report.remediation_hints));
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::{generated_id_json, rows_json};
    use flatstore::api::{FallbackReason, GeneratedId, IdSource, Record};

    #[test]
    fn rows_keep_column_order() {
        let rows = vec![Record::new().with("z", 1).with("a", "x")];
        let text = serde_json::to_string(&rows_json(&rows)).expect("encode");
        assert_eq!(text, r#"[{"z":1,"a":"x"}]"#);
    }

    #[test]
    fn fallback_ids_are_labelled() {
        let generated = GeneratedId {
            id: "TRN0A1B2C".to_string(),
            source: IdSource::Fallback(FallbackReason::Collision),
        };
        let value = generated_id_json("tx", &generated);
        assert_eq!(value["source"], "fallback_collision");
        assert_eq!(value["id"], "TRN0A1B2C");
    }
}

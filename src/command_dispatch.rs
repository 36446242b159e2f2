//! Purpose: Hold top-level CLI command dispatch for `flatstore`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: One `Store` call per command, so each command is atomic on its table.
//! Invariants: "Nothing matched" exits with the NotFound code, not success.

use super::*;
use report_json::{generated_id_json, report_json, rows_json};

pub(super) fn dispatch_command(
    command: Command,
    store: &Store,
    color_mode: ColorMode,
) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            emit_completion(shell);
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_version_output(color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Tables => {
            let tables = store.tables()?;
            emit_json(
                json!({
                    "dir": store.config().data_dir().display().to_string(),
                    "tables": tables,
                }),
                color_mode,
            );
            Ok(RunOutcome::ok())
        }
        Command::Insert {
            table,
            record,
            id_prefix,
            id_column,
        } => {
            let record = parse_record("record", &record)?;
            match id_prefix {
                Some(prefix) => {
                    let generated =
                        store.create_with_generated_id(&table, &prefix, &id_column, &record)?;
                    emit_json(generated_id_json(&table, &generated), color_mode);
                }
                None => {
                    store.create(&table, &record)?;
                    emit_json(
                        json!({ "table": table, "inserted": record.to_json() }),
                        color_mode,
                    );
                }
            }
            Ok(RunOutcome::ok())
        }
        Command::All { table } => {
            let rows = store.read_all(&table)?;
            emit_json(json!({ "table": table, "rows": rows_json(&rows) }), color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Get {
            table,
            id,
            id_column,
        } => {
            let row = store.read_by_id(&table, id.as_str(), &id_column)?.ok_or_else(|| {
                Error::new(ErrorKind::NotFound)
                    .with_message(format!("no row with {id_column} = {id}"))
                    .with_table(&table)
            })?;
            emit_json(json!({ "table": table, "row": row.to_json() }), color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Update {
            table,
            id,
            updates,
            id_column,
        } => {
            let updates = parse_record("updates", &updates)?;
            let updated = store.update_by_id(&table, id.as_str(), &updates, &id_column)?;
            emit_json(json!({ "table": table, "updated": updated }), color_mode);
            Ok(RunOutcome::ok())
        }
        Command::UpdateWhere {
            table,
            condition,
            updates,
        } => {
            let condition = Predicate::from(parse_record("condition", &condition)?);
            let updates = parse_record("updates", &updates)?;
            let updated = store.update_by_condition(&table, &condition, &updates)?;
            emit_json(json!({ "table": table, "updated": updated }), color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Delete {
            table,
            id,
            id_column,
        } => {
            let deleted = store.delete_by_id(&table, id.as_str(), &id_column)?;
            emit_json(json!({ "table": table, "deleted": deleted }), color_mode);
            Ok(RunOutcome::ok())
        }
        Command::DeleteWhere { table, condition } => {
            let condition = Predicate::from(parse_record("condition", &condition)?);
            if condition.is_empty() {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("refusing to delete with an empty condition")
                    .with_hint("Pass at least one field, e.g. '{\"status\":\"expired\"}'."));
            }
            let deleted = store.delete_by_condition(&table, &condition)?;
            emit_json(json!({ "table": table, "deleted": deleted }), color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Find {
            table,
            condition,
            one,
        } => {
            let condition = parse_condition(condition.as_deref())?;
            if one {
                let row = store.find_one(&table, &condition.unwrap_or_default())?;
                let row = row.map_or(Value::Null, |row| row.to_json());
                emit_json(json!({ "table": table, "row": row }), color_mode);
            } else {
                let rows = store.find(&table, condition.as_ref())?;
                emit_json(json!({ "table": table, "rows": rows_json(&rows) }), color_mode);
            }
            Ok(RunOutcome::ok())
        }
        Command::Count { table, condition } => {
            let condition = parse_condition(condition.as_deref())?.unwrap_or_default();
            let count = store.count(&table, &condition)?;
            emit_json(json!({ "table": table, "count": count }), color_mode);
            Ok(RunOutcome::ok())
        }
        Command::NextId {
            table,
            prefix,
            id_column,
        } => {
            let generated = store.generate_id(&table, &prefix, &id_column)?;
            emit_json(generated_id_json(&table, &generated), color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Incr {
            table,
            id,
            field,
            by,
            id_column,
        } => {
            let value = store.increment_field(&table, id.as_str(), &id_column, &field, by)?;
            emit_json(
                json!({ "table": table, "field": field, "value": value }),
                color_mode,
            );
            Ok(RunOutcome::ok())
        }
        Command::Doctor { tables } => {
            let tables = if tables.is_empty() {
                store.tables()?
            } else {
                tables
            };
            let mut reports = Vec::with_capacity(tables.len());
            for table in &tables {
                reports.push(store.validate(table)?);
            }
            let any_corrupt = reports
                .iter()
                .any(|report| report.status == flatstore::api::ValidationStatus::Corrupt);
            let values = reports.iter().map(report_json).collect::<Vec<_>>();
            emit_json(json!({ "reports": values }), color_mode);
            if any_corrupt {
                Ok(RunOutcome::with_code(to_exit_code(ErrorKind::Corrupt)))
            } else {
                Ok(RunOutcome::ok())
            }
        }
    }
}

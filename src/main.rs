//! Purpose: `flatstore` CLI entry point.
//! Role: Binary crate root; parses args, builds the `Store`, emits JSON on stdout.
//! Invariants: Command results are JSON on stdout (pretty on a TTY, one line otherwise).
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: All table access goes through one `api::Store` per process.
use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{
    CommandFactory, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod report_json;

use flatstore::api::{
    Durability, Error, ErrorKind, Predicate, Record, Store, StoreConfig, to_exit_code,
};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse_from(std::env::args_os().collect::<Vec<OsString>>()) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Try `flatstore --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    init_tracing();

    let color_mode = cli.color;
    let config = match cli.dir {
        Some(dir) => StoreConfig::new(dir),
        None => StoreConfig::from_env(),
    }
    .with_durability(cli.durability.into())
    .with_id_width(usize::from(cli.id_width));
    let store = Store::new(config);
    command_dispatch::dispatch_command(cli.command, &store, color_mode)
        .map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "flatstore",
    version,
    about = "Thread-safe flat-file tables with atomic writes",
    after_help = r#"NOTES
  - Tables live in <dir>/<table>.csv (default dir: $FLATSTORE_DIR or ./data/csv)
  - Records and conditions are JSON objects of scalars: {"id":"U1","xp":10,"active":true}
  - Set RUST_LOG=debug to trace writes on stderr"#
)]
struct Cli {
    #[arg(
        long,
        help = "Data directory holding table files (default: $FLATSTORE_DIR or ./data/csv)",
        value_hint = ValueHint::DirPath
    )]
    dir: Option<PathBuf>,
    #[arg(
        long,
        default_value = "fast",
        value_enum,
        help = "fast: rename only; flush: fsync before and after the rename"
    )]
    durability: DurabilityArg,
    #[arg(
        long,
        default_value_t = 3,
        value_parser = clap::value_parser!(u8).range(1..=20),
        help = "Minimum digits in generated ids (1-20)"
    )]
    id_width: u8,
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics and pretty JSON output: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum DurabilityArg {
    Fast,
    Flush,
}

impl From<DurabilityArg> for Durability {
    fn from(arg: DurabilityArg) -> Self {
        match arg {
            DurabilityArg::Fast => Durability::Fast,
            DurabilityArg::Flush => Durability::Flush,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "List tables in the data directory")]
    Tables,
    #[command(
        arg_required_else_help = true,
        about = "Append a record to a table",
        after_help = r#"EXAMPLES
  $ flatstore insert users '{"user_id":"USR001","username":"admin"}'
  $ flatstore insert scores --id-prefix SCR --id-column score_id '{"points":40}'"#
    )]
    Insert {
        table: String,
        #[arg(help = "Record as a JSON object")]
        record: String,
        #[arg(long, help = "Allocate the next <prefix>NNN id and store it in --id-column")]
        id_prefix: Option<String>,
        #[arg(long, default_value = "id")]
        id_column: String,
    },
    #[command(arg_required_else_help = true, about = "Print every row of a table")]
    All { table: String },
    #[command(arg_required_else_help = true, about = "Print the first row with the given id")]
    Get {
        table: String,
        id: String,
        #[arg(long, default_value = "id")]
        id_column: String,
    },
    #[command(
        arg_required_else_help = true,
        about = "Set fields on every row with the given id",
        after_help = r#"EXAMPLES
  $ flatstore update users USR001 '{"streak_days":4}' --id-column user_id"#
    )]
    Update {
        table: String,
        id: String,
        #[arg(help = "Fields to set, as a JSON object")]
        updates: String,
        #[arg(long, default_value = "id")]
        id_column: String,
    },
    #[command(
        name = "update-where",
        arg_required_else_help = true,
        about = "Set fields on every row matching a condition"
    )]
    UpdateWhere {
        table: String,
        #[arg(help = "Condition as a JSON object (all fields must match)")]
        condition: String,
        updates: String,
    },
    #[command(arg_required_else_help = true, about = "Delete every row with the given id")]
    Delete {
        table: String,
        id: String,
        #[arg(long, default_value = "id")]
        id_column: String,
    },
    #[command(
        name = "delete-where",
        arg_required_else_help = true,
        about = "Delete every row matching a condition"
    )]
    DeleteWhere { table: String, condition: String },
    #[command(
        arg_required_else_help = true,
        about = "Print rows matching a condition",
        after_help = r#"EXAMPLES
  $ flatstore find users --where '{"role":"admin"}'
  $ flatstore find sessions --where '{"user_id":"USR002","status":"completed"}' --one"#
    )]
    Find {
        table: String,
        #[arg(long = "where", help = "Condition as a JSON object; omit to list every row")]
        condition: Option<String>,
        #[arg(long, help = "Print only the first match (or null)")]
        one: bool,
    },
    #[command(arg_required_else_help = true, about = "Count rows matching a condition")]
    Count {
        table: String,
        #[arg(long = "where")]
        condition: Option<String>,
    },
    #[command(
        name = "next-id",
        arg_required_else_help = true,
        about = "Print the next sequential id for a prefix"
    )]
    NextId {
        table: String,
        prefix: String,
        #[arg(long, default_value = "id")]
        id_column: String,
    },
    #[command(
        arg_required_else_help = true,
        about = "Add to an integer field of the rows with the given id"
    )]
    Incr {
        table: String,
        id: String,
        field: String,
        #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
        by: i64,
        #[arg(long, default_value = "id")]
        id_column: String,
    },
    #[command(about = "Check table files for malformed rows and leftover staging files")]
    Doctor {
        #[arg(help = "Tables to check (default: every table)")]
        tables: Vec<String>,
    },
    #[command(arg_required_else_help = true, about = "Generate shell completions")]
    Completion { shell: Shell },
    #[command(about = "Print version information")]
    Version,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn parse_record(label: &str, text: &str) -> Result<Record, Error> {
    serde_json::from_str::<Record>(text).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("invalid {label} JSON"))
            .with_hint(format!(
                "Expected an object of scalar values, e.g. '{{\"id\":\"U1\",\"xp\":10}}'. Details: {err}"
            ))
    })
}

fn parse_condition(text: Option<&str>) -> Result<Option<Predicate>, Error> {
    text.map(|text| parse_record("condition", text).map(Predicate::from))
        .transpose()
}

fn emit_json(value: Value, color_mode: ColorMode) {
    let is_tty = io::stdout().is_terminal();
    let pretty = is_tty || color_mode.use_color(is_tty);
    let json = if pretty {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn emit_version_output(color_mode: ColorMode) {
    if io::stdout().is_terminal() {
        println!("flatstore {}", env!("CARGO_PKG_VERSION"));
    } else {
        emit_json(
            json!({
                "name": "flatstore",
                "version": env!("CARGO_PKG_VERSION"),
            }),
            color_mode,
        );
    }
}

fn emit_completion(shell: Shell) {
    let mut cmd = Cli::command();
    clap_complete::aot::generate(shell, &mut cmd, "flatstore", &mut io::stdout());
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::Busy => "resource is busy".to_string(),
        ErrorKind::Permission => "permission denied".to_string(),
        ErrorKind::Corrupt => "corrupt data".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(table) = err.table() {
        inner.insert("table".to_string(), json!(table));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = vec![format!("{} {}", red_label("error:", use_color), error_message(err))];
    if let Some(hint) = err.hint() {
        lines.push(format!("{} {hint}", yellow_label("hint:", use_color)));
    }
    if let Some(table) = err.table() {
        lines.push(format!("{} {table}", yellow_label("table:", use_color)));
    }
    if let Some(path) = err.path() {
        lines.push(format!("{} {}", yellow_label("path:", use_color), path.display()));
    }
    for cause in error_causes(err) {
        lines.push(format!("{} {cause}", yellow_label("caused by:", use_color)));
    }
    lines.join("\n")
}

fn red_label(label: &str, enabled: bool) -> String {
    if enabled {
        format!("\x1b[31m{label}\x1b[0m")
    } else {
        label.to_string()
    }
}

fn yellow_label(label: &str, enabled: bool) -> String {
    if enabled {
        format!("\x1b[33m{label}\x1b[0m")
    } else {
        label.to_string()
    }
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, clap_error_summary, error_json, parse_condition, parse_record};
    use clap::{CommandFactory, Parser};
    use flatstore::api::{Error, ErrorKind};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn incr_accepts_negative_amounts() {
        let cli = Cli::try_parse_from(["flatstore", "incr", "users", "U1", "xp", "--by", "-5"])
            .expect("parse");
        match cli.command {
            Command::Incr { by, .. } => assert_eq!(by, -5),
            _ => panic!("expected incr"),
        }
    }

    #[test]
    fn id_width_is_bounded() {
        let cli = Cli::try_parse_from(["flatstore", "--id-width", "20", "tables"]).expect("parse");
        assert_eq!(cli.id_width, 20);
        for width in ["0", "21", "100000"] {
            assert!(Cli::try_parse_from(["flatstore", "--id-width", width, "tables"]).is_err());
        }
    }

    #[test]
    fn records_parse_in_order() {
        let record = parse_record("record", r#"{"b":1,"a":"x"}"#).expect("parse");
        assert_eq!(record.columns().collect::<Vec<_>>(), vec!["b", "a"]);
        let err = parse_record("record", "[1]").expect_err("array");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(parse_condition(None).expect("none").is_none());
    }

    #[test]
    fn error_json_carries_context() {
        let err = Error::new(ErrorKind::NotFound)
            .with_message("no matching rows")
            .with_table("users");
        let value = error_json(&err);
        assert_eq!(value["error"]["kind"], "NotFound");
        assert_eq!(value["error"]["table"], "users");
        assert!(value["error"].get("hint").is_none());
    }

    #[test]
    fn clap_summary_strips_prefix() {
        let err = Cli::try_parse_from(["flatstore", "get", "users"])
            .err()
            .expect("missing id");
        let summary = clap_error_summary(&err);
        assert!(!summary.starts_with("error:"));
        assert!(summary.contains("required"));
    }
}

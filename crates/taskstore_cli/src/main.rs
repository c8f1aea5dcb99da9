//! Command-line front end for the task store.
//!
//! # Responsibility
//! - Map argv commands onto `TaskService` calls.
//! - Print results as JSON on stdout and errors on stderr.
//!
//! # Store
//! - Defaults to the SQLite file `./tasks.db`, kept across invocations.
//!   `TASKSTORE_FRESH_START=true` wipes it on open.
//!
//! # Exit codes
//! - `0` success, `1` storage or startup failure, `2` not found, `64` usage error.

use chrono::DateTime;
use log::error;
use serde_json::json;
use std::process::ExitCode;
use taskstore_core::{
    default_log_level, init_logging, open_repository, ConfigError, ServiceError, StoreConfig,
    TaskId, TaskRepository, TaskService,
};

const USAGE: &str = "usage: taskstore_cli <command>
commands:
  ping
  add <text> <due-rfc3339> [tag...]
  get <id>
  list
  tag <tag>
  due <yyyy> <mm> <dd>
  delete <id>
  clear";

const EXIT_FAILURE: u8 = 1;
const EXIT_NOT_FOUND: u8 = 2;
const EXIT_USAGE: u8 = 64;

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Ping,
    Add {
        text: String,
        due: String,
        tags: Vec<String>,
    },
    Get(TaskId),
    List,
    Tag(String),
    Due {
        year: i32,
        month: u32,
        day: u32,
    },
    Delete(TaskId),
    Clear,
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_command(&args) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{message}\n{USAGE}");
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let config = match cli_config(|key| std::env::var(key).ok()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    if let Some(log_dir) = &config.log_dir {
        let level = config.log_level.as_deref().unwrap_or(default_log_level());
        if let Err(err) = init_logging(level, log_dir) {
            eprintln!("{err}");
            return ExitCode::from(EXIT_FAILURE);
        }
    }

    let repo = match open_repository(&config) {
        Ok(repo) => repo,
        Err(err) => {
            error!("event=cli_start module=cli status=error error={err}");
            eprintln!("failed to open task store: {err}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let service = TaskService::new(repo);
    match run(&service, command) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) if err.is_not_found() => {
            eprintln!("{err}");
            ExitCode::from(EXIT_NOT_FOUND)
        }
        Err(CliError::Usage(message)) => {
            eprintln!("{message}\n{USAGE}");
            ExitCode::from(EXIT_USAGE)
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

#[derive(Debug)]
enum CliError {
    Usage(String),
    Service(ServiceError),
    Encode(serde_json::Error),
}

impl CliError {
    fn is_not_found(&self) -> bool {
        matches!(self, Self::Service(err) if err.is_not_found())
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Usage(message) => write!(f, "{message}"),
            Self::Service(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode output: {err}"),
        }
    }
}

impl From<ServiceError> for CliError {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::InvalidDate { .. } => Self::Usage(value.to_string()),
            other => Self::Service(other),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

/// Store settings for one CLI invocation.
///
/// Each command runs in its own process, so the store defaults to the SQLite
/// file kept across runs. `TASKSTORE_*` variables still override.
fn cli_config(lookup: impl Fn(&str) -> Option<String>) -> Result<StoreConfig, ConfigError> {
    StoreConfig::from_lookup_over(StoreConfig::persistent(), lookup)
}

fn run<R: TaskRepository>(service: &TaskService<R>, command: Command) -> Result<String, CliError> {
    let value = match command {
        Command::Ping => json!({
            "ping": taskstore_core::ping(),
            "version": taskstore_core::core_version(),
        }),
        Command::Add { text, due, tags } => {
            let due = DateTime::parse_from_rfc3339(&due)
                .map_err(|err| CliError::Usage(format!("invalid due `{due}`: {err}")))?;
            json!({ "id": service.create_task(text, tags, due)? })
        }
        Command::Get(id) => serde_json::to_value(service.get_task(id)?)?,
        Command::List => serde_json::to_value(service.list_tasks()?)?,
        Command::Tag(tag) => serde_json::to_value(service.list_tasks_by_tag(&tag)?)?,
        Command::Due { year, month, day } => {
            serde_json::to_value(service.list_tasks_by_date(year, month, day)?)?
        }
        Command::Delete(id) => {
            service.delete_task(id)?;
            json!({ "deleted": id })
        }
        Command::Clear => {
            service.delete_all_tasks()?;
            json!({ "deleted": "all" })
        }
    };
    Ok(serde_json::to_string_pretty(&value)?)
}

fn parse_command(args: &[String]) -> Result<Command, String> {
    let Some((name, rest)) = args.split_first() else {
        return Err("missing command".to_string());
    };

    match (name.as_str(), rest) {
        ("ping", []) => Ok(Command::Ping),
        ("add", [text, due, tags @ ..]) => Ok(Command::Add {
            text: text.clone(),
            due: due.clone(),
            tags: tags.to_vec(),
        }),
        ("get", [id]) => Ok(Command::Get(parse_number(id, "id")?)),
        ("list", []) => Ok(Command::List),
        ("tag", [tag]) => Ok(Command::Tag(tag.clone())),
        ("due", [year, month, day]) => Ok(Command::Due {
            year: parse_number(year, "year")?,
            month: parse_number(month, "month")?,
            day: parse_number(day, "day")?,
        }),
        ("delete", [id]) => Ok(Command::Delete(parse_number(id, "id")?)),
        ("clear", []) => Ok(Command::Clear),
        (other, _) => Err(format!("unknown command or wrong arguments: `{other}`")),
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, field: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|err| format!("invalid {field} `{value}`: {err}"))
}

#[cfg(test)]
mod tests {
    use super::{cli_config, parse_command, run, CliError, Command};
    use taskstore_core::config::{ENV_BACKEND, ENV_DB_PATH};
    use taskstore_core::{open_repository, InMemoryTaskRepository, StorageBackend, TaskService};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn parses_add_with_trailing_tags() {
        let command = parse_command(&args(&[
            "add",
            "buy milk",
            "2024-05-01T10:00:00Z",
            "errand",
            "home",
        ]))
        .unwrap();
        assert_eq!(
            command,
            Command::Add {
                text: "buy milk".to_string(),
                due: "2024-05-01T10:00:00Z".to_string(),
                tags: vec!["errand".to_string(), "home".to_string()],
            }
        );
    }

    #[test]
    fn rejects_bad_numbers_and_unknown_commands() {
        assert!(parse_command(&args(&["get", "abc"]))
            .unwrap_err()
            .contains("invalid id"));
        assert!(parse_command(&args(&["due", "2024", "5"])).is_err());
        assert!(parse_command(&args(&["frobnicate"])).is_err());
        assert!(parse_command(&[]).is_err());
    }

    #[test]
    fn run_add_then_get_prints_task_json() {
        let service = TaskService::new(InMemoryTaskRepository::new());
        let created = run(
            &service,
            Command::Add {
                text: "buy milk".to_string(),
                due: "2024-05-01T10:00:00Z".to_string(),
                tags: vec!["errand".to_string()],
            },
        )
        .unwrap();
        let created: serde_json::Value = serde_json::from_str(&created).unwrap();
        assert_eq!(created["id"], 1);

        let fetched = run(&service, Command::Get(1)).unwrap();
        let fetched: serde_json::Value = serde_json::from_str(&fetched).unwrap();
        assert_eq!(fetched["text"], "buy milk");
        assert_eq!(fetched["due"], "2024-05-01T10:00:00+00:00");
    }

    #[test]
    fn run_maps_missing_task_to_not_found_and_bad_date_to_usage() {
        let service = TaskService::new(InMemoryTaskRepository::new());
        assert!(run(&service, Command::Delete(7)).unwrap_err().is_not_found());
        let err = run(
            &service,
            Command::Due {
                year: 2024,
                month: 13,
                day: 1,
            },
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));
    }

    #[test]
    fn ping_reports_pong_and_version() {
        let service = TaskService::new(InMemoryTaskRepository::new());
        let output = run(&service, Command::Ping).unwrap();
        let output: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(output["ping"], "pong");
        assert_eq!(output["version"], taskstore_core::core_version());
    }

    #[test]
    fn default_config_keeps_tasks_between_invocations() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("tasks.db");
        let db_path_str = db_path.to_str().unwrap().to_string();
        let lookup = |key: &str| (key == ENV_DB_PATH).then(|| db_path_str.clone());

        let config = cli_config(lookup).unwrap();
        assert_eq!(config.backend, StorageBackend::Sqlite);
        assert!(!config.fresh_start);

        {
            let service = TaskService::new(open_repository(&config).unwrap());
            let created = run(
                &service,
                Command::Add {
                    text: "buy milk".to_string(),
                    due: "2024-05-01T10:00:00Z".to_string(),
                    tags: vec!["errand".to_string()],
                },
            )
            .unwrap();
            let created: serde_json::Value = serde_json::from_str(&created).unwrap();
            assert_eq!(created["id"], 1);
        }

        let service = TaskService::new(open_repository(&cli_config(lookup).unwrap()).unwrap());
        let fetched = run(&service, Command::Get(1)).unwrap();
        let fetched: serde_json::Value = serde_json::from_str(&fetched).unwrap();
        assert_eq!(fetched["text"], "buy milk");
        assert_eq!(fetched["tags"][0], "errand");

        let tagged = run(&service, Command::Tag("errand".to_string())).unwrap();
        let tagged: serde_json::Value = serde_json::from_str(&tagged).unwrap();
        assert_eq!(tagged.as_array().unwrap().len(), 1);
    }

    #[test]
    fn explicit_memory_backend_still_honoured() {
        let config =
            cli_config(|key| (key == ENV_BACKEND).then(|| "memory".to_string())).unwrap();
        assert_eq!(config.backend, StorageBackend::Memory);
    }
}

//! Command-line front end for the environment manager.
//!
//! # Responsibility
//! - Map subcommands onto `EnvService` operations.
//! - Report permission failures with a dedicated exit code so wrappers can
//!   rerun the command elevated.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::warn;

use envmgr_core::{
    default_log_level, init_logging, EnvMgrConfig, EnvService, EnvServiceError, FileBackend,
    Group, LoadStatus, Scope,
};

/// Exit code used when a write needs elevated privilege (EX_NOPERM).
const EXIT_PERMISSION_DENIED: u8 = 77;

#[derive(Debug, Parser)]
#[command(
    name = "envmgr",
    version,
    about = "Manage system and user environment variables, remarks and switchable groups"
)]
struct Cli {
    /// Directory holding metadata, groups, profiles and scope files.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Treat the system scope as writable (use when already running elevated).
    #[arg(long, global = true)]
    elevated: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show the merged variable view.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Create or overwrite a variable.
    Set {
        #[arg(value_enum)]
        scope: ScopeArg,
        name: String,
        value: String,
        #[arg(long, default_value = "")]
        remark: String,
    },
    /// Delete a variable and its remark.
    Delete {
        #[arg(value_enum)]
        scope: ScopeArg,
        name: String,
    },
    /// Set or clear (empty string) the remark of a variable.
    Remark {
        #[arg(value_enum)]
        scope: ScopeArg,
        name: String,
        remark: String,
    },
    /// List groups and their selected items.
    Groups {
        #[arg(long)]
        json: bool,
    },
    /// Upsert groups from a JSON file holding one group or an array of groups.
    GroupImport {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    GroupDelete {
        name: String,
    },
    /// Make one item of a group active and apply its variables.
    Switch {
        group: String,
        item: String,
    },
    Profiles,
    /// Save a profile from KEY=VALUE pairs.
    ProfileSave {
        name: String,
        #[arg(value_name = "KEY=VALUE")]
        vars: Vec<String>,
    },
    /// Apply a profile to the user scope.
    ProfileApply {
        name: String,
    },
    /// Report whether system-scope writes are allowed.
    Privileged,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScopeArg {
    System,
    User,
}

impl From<ScopeArg> for Scope {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::System => Scope::System,
            ScopeArg::User => Scope::User,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            let permission_denied = err
                .downcast_ref::<EnvServiceError>()
                .is_some_and(EnvServiceError::is_permission_denied);
            if permission_denied {
                ExitCode::from(EXIT_PERMISSION_DENIED)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = EnvMgrConfig::resolve(cli.data_dir).context("resolving data directory")?;
    config.force_system_privilege = cli.elevated;

    let level = cli
        .log_level
        .or_else(|| config.log_level.clone())
        .unwrap_or_else(|| default_log_level().to_string());
    if let Err(err) = init_logging(&level, &config.log_dir()) {
        eprintln!("warning: logging disabled: {err}");
    }

    let service: EnvService<FileBackend> = EnvService::open(config.file_backend(), &config);
    for (store, status) in [
        ("metadata", service.remarks().load_status()),
        ("groups", service.groups().load_status()),
        ("profiles", service.profiles().load_status()),
    ] {
        if matches!(status, LoadStatus::Malformed(_)) {
            warn!("event=store_reset module=cli store={store} status=recovered");
            eprintln!("warning: {store} file was unreadable and has been reset");
        }
    }

    match cli.command {
        Commands::List { json } => {
            let variables = service.merged_variables()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&variables)?);
            } else {
                for variable in variables {
                    let remark = if variable.remark.is_empty() {
                        String::new()
                    } else {
                        format!("  # {}", variable.remark)
                    };
                    println!(
                        "[{:<6}] {}={}{}",
                        variable.scope, variable.name, variable.value, remark
                    );
                }
            }
        }
        Commands::Set {
            scope,
            name,
            value,
            remark,
        } => service.set_variable(scope.into(), &name, &value, &remark)?,
        Commands::Delete { scope, name } => service.delete_variable(scope.into(), &name)?,
        Commands::Remark {
            scope,
            name,
            remark,
        } => service.set_remark(scope.into(), &name, &remark)?,
        Commands::Groups { json } => {
            let groups = service.list_groups();
            if json {
                println!("{}", serde_json::to_string_pretty(&groups)?);
            } else {
                for group in groups {
                    let selected = group
                        .selected_item()
                        .map(|item| item.name.as_str())
                        .unwrap_or("-");
                    println!(
                        "{} ({} items, selected: {})",
                        group.name,
                        group.items.len(),
                        selected
                    );
                }
            }
        }
        Commands::GroupImport { path } => {
            let data = fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let groups = parse_groups(&data)
                .with_context(|| format!("parsing groups from {}", path.display()))?;
            for group in groups {
                let name = group.name.clone();
                service
                    .upsert_group(group)
                    .with_context(|| format!("saving group `{name}`"))?;
            }
        }
        Commands::GroupDelete { name } => service.delete_group(&name)?,
        Commands::Switch { group, item } => {
            let outcome = service.switch_group_item(&group, &item)?;
            match &outcome.selected {
                Some(selected) => println!(
                    "{}: switched to `{}` ({} system, {} user variables)",
                    outcome.group, selected, outcome.system_applied, outcome.user_applied
                ),
                None => println!(
                    "{}: no item named `{}`; selection cleared",
                    outcome.group, item
                ),
            }
            if let Some(err) = outcome.broadcast_error {
                eprintln!("warning: variables applied but change broadcast failed: {err}");
            }
        }
        Commands::Profiles => {
            for profile in service.list_profiles() {
                println!("{} ({} variables)", profile.name, profile.vars.len());
            }
        }
        Commands::ProfileSave { name, vars } => {
            service.save_profile(&name, parse_assignments(&vars)?)?;
        }
        Commands::ProfileApply { name } => {
            let applied = service.apply_profile(&name)?;
            println!("applied {applied} variables from profile `{name}`");
        }
        Commands::Privileged => println!("{}", service.is_privileged()),
    }
    Ok(())
}

fn parse_groups(data: &str) -> Result<Vec<Group>> {
    let value: serde_json::Value = serde_json::from_str(data)?;
    if value.is_array() {
        Ok(serde_json::from_value(value)?)
    } else {
        Ok(vec![serde_json::from_value(value)?])
    }
}

fn parse_assignments(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    let mut vars = BTreeMap::new();
    for pair in pairs {
        let Some((name, value)) = pair.split_once('=') else {
            bail!("expected KEY=VALUE, got `{pair}`");
        };
        vars.insert(name.to_string(), value.to_string());
    }
    Ok(vars)
}

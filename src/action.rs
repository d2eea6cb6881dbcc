//! Per-action working argument lists.

use crate::arguments::flags::{
    Flag, ACTION, COMMAND_TIMEOUT, DIAGNOSTICS_FILE, EXCLUDE_TABLE_DATA, SOURCE, TARGET,
    TARGET_FILE, VERIFY_EXTRACTION,
};
use crate::arguments::{ArgumentList, CliArgument};
use crate::connection::ConnectionDescriptor;
use crate::utils::{ensure_parent_dir, resolve_path};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Backup,
    Restore,
    BackupAll,
    RestoreAll,
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "backup" => Ok(Action::Backup),
            "restore" => Ok(Action::Restore),
            "backup-all" => Ok(Action::BackupAll),
            "restore-all" => Ok(Action::RestoreAll),
            other => Err(format!("Unknown action '{}'", other)),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Backup => "Backup",
            Action::Restore => "Restore",
            Action::BackupAll => "Backup-All",
            Action::RestoreAll => "Restore-All",
        };
        f.write_str(name)
    }
}

impl Action {
    /// The recognized action in `arguments`, or `None` for pass-through.
    pub fn from_arguments(arguments: &ArgumentList) -> Option<Action> {
        arguments.value(&ACTION).and_then(|v| v.parse().ok())
    }
}

/// Flags never forwarded on Backup; they are replaced by synthesized ones.
pub fn backup_skipped() -> Vec<Flag> {
    let mut flags = vec![ACTION, COMMAND_TIMEOUT, EXCLUDE_TABLE_DATA];
    flags.extend(SOURCE.all());
    flags
}

/// Flags never forwarded on Restore; they are replaced by synthesized ones.
pub fn restore_skipped() -> Vec<Flag> {
    let mut flags = vec![ACTION, COMMAND_TIMEOUT];
    flags.extend(TARGET.all());
    flags
}

/// Property defaults applied when the user did not pass them.
const BACKUP_DEFAULTS: [Flag; 1] = [VERIFY_EXTRACTION];

fn apply_defaults(working: &mut ArgumentList, defaults: &[Flag]) {
    for flag in defaults {
        if let Some(value) = flag.default {
            working.set_default(flag, value);
        }
    }
}

/// Working list for an Export of the source database.
pub fn build_backup_arguments(original: &ArgumentList, source: &ConnectionDescriptor) -> ArgumentList {
    let mut working = original.without(&backup_skipped());

    working.insert(0, CliArgument::new(ACTION.abbrev.unwrap_or(ACTION.name), "Export"));
    working.insert(
        1,
        CliArgument::new(SOURCE.connection_string.name, source.connection_string.as_str()),
    );

    apply_defaults(&mut working, &BACKUP_DEFAULTS);
    working.wrap_paths_in_quotes();
    working
}

/// Working list for an Import into the target database.
pub fn build_restore_arguments(original: &ArgumentList, target: &ConnectionDescriptor) -> ArgumentList {
    let mut working = original.without(&restore_skipped());

    working.insert(0, CliArgument::new(ACTION.abbrev.unwrap_or(ACTION.name), "Import"));
    working.insert(
        1,
        CliArgument::new(TARGET.connection_string.name, target.connection_string.as_str()),
    );

    working.wrap_paths_in_quotes();
    working
}

/// Create missing output directories and remove a stale backup artifact.
pub fn prepare_output_paths(working: &ArgumentList, action: Action) -> anyhow::Result<()> {
    if let Some(diagnostics) = working.value(&DIAGNOSTICS_FILE).filter(|v| !v.is_empty()) {
        ensure_parent_dir(&resolve_path(diagnostics).map_err(anyhow::Error::msg)?)?;
    }

    if matches!(action, Action::Backup | Action::BackupAll) {
        if let Some(target_file) = working.value(&TARGET_FILE).filter(|v| !v.is_empty()) {
            let path = resolve_path(target_file).map_err(anyhow::Error::msg)?;
            ensure_parent_dir(&path)?;

            if path.is_file() {
                info!("Removing existing backup file {}", path.display());
                std::fs::remove_file(&path)?;
            }
        }
    }

    debug!("Output paths prepared for {}", action);
    Ok(())
}

use crate::action::{build_backup_arguments, build_restore_arguments, prepare_output_paths, Action};
use crate::arguments::flags::{SOURCE_FILE, TARGET, TARGET_FILE};
use crate::arguments::{ArgumentList, CliArgument};
use crate::batch;
use crate::config::AppConfig;
use crate::connection::ConnectionDescriptor;
use crate::database::Catalog;
use crate::package::PackageTool;
use crate::state::AppState;
use crate::tables::{apply_to_working, resolve_table_list};
use crate::utils::resolve_path;
use anyhow::Result;
use humansize::{format_size, DECIMAL};
use std::path::Path;
use tracing::{info, warn};

/// Properties that make a publish of an empty package drop every user object.
const PURGE_PROPERTIES: [&str; 11] = [
    "/p:AllowIncompatiblePlatform=true",
    "/p:BlockOnPossibleDataLoss=false",
    "/p:IncludeCompositeObjects=false",
    "/p:DropObjectsNotInSource=true",
    "/p:DropConstraintsNotInSource=true",
    "/p:DropDmlTriggersNotInSource=true",
    "/p:DropExtendedPropertiesNotInSource=true",
    "/p:DropIndexesNotInSource=true",
    "/p:DropPermissionsNotInSource=true",
    "/p:DropRoleMembersNotInSource=true",
    "/p:DropStatisticsNotInSource=true",
];

/// Runs one invocation against the injected tool and catalog.
pub struct Runner<'a> {
    pub config: &'a AppConfig,
    pub tool: &'a dyn PackageTool,
    pub catalog: &'a dyn Catalog,
    pub dry_run: bool,
}

impl<'a> Runner<'a> {
    pub fn new(
        config: &'a AppConfig,
        tool: &'a dyn PackageTool,
        catalog: &'a dyn Catalog,
        dry_run: bool,
    ) -> Self {
        Runner {
            config,
            tool,
            catalog,
            dry_run,
        }
    }

    pub async fn run(&self, state: &AppState) -> Result<i32> {
        match state.action {
            Some(Action::Backup) => self.backup(&state.original, &state.source).await,
            Some(Action::Restore) => self.restore(&state.original, &state.target).await,
            Some(Action::BackupAll) => batch::backup_all(self, state).await,
            Some(Action::RestoreAll) => batch::restore_all(self, state).await,
            None => self.pass_through(&state.raw).await,
        }
    }

    /// Export one database.
    pub async fn backup(&self, original: &ArgumentList, source: &ConnectionDescriptor) -> Result<i32> {
        info!(
            "Backup {} on {} to {}",
            source.database_name,
            source.server_name,
            original.value(&TARGET_FILE).unwrap_or("(none)")
        );

        let working = build_backup_arguments(original, source);
        let tables = resolve_table_list(original, source, self.catalog).await?;
        let working = apply_to_working(&working, &tables);

        let exit_code = self.execute(Action::Backup, &working).await?;

        if exit_code == 0 && !self.dry_run {
            if let Some(path) = original.value(&TARGET_FILE).and_then(|p| resolve_path(p).ok()) {
                report_file_size(&path);
            }
        }
        Ok(exit_code)
    }

    /// Import one artifact, preparing the target database first.
    pub async fn restore(&self, original: &ArgumentList, target: &ConnectionDescriptor) -> Result<i32> {
        info!(
            "Restore {} to {} on {}",
            original.value(&SOURCE_FILE).unwrap_or("(none)"),
            target.database_name,
            target.server_name
        );

        if self.config.purge_target && !self.dry_run {
            self.prepare_target(target).await?;
        }

        let working = build_restore_arguments(original, target);
        self.execute(Action::Restore, &working).await
    }

    async fn pass_through(&self, raw: &[String]) -> Result<i32> {
        info!("Passing {} argument(s) through unchanged", raw.len());

        if self.dry_run {
            info!("Dry run: {}", ArgumentList::import(raw).to_masked_string());
            return Ok(0);
        }
        self.tool.run(raw).await
    }

    async fn execute(&self, action: Action, working: &ArgumentList) -> Result<i32> {
        info!("SqlPackage {}", working.to_masked_string());

        if self.dry_run {
            info!("Dry run: {} not executed", action);
            return Ok(0);
        }

        prepare_output_paths(working, action)?;
        let exit_code = self.tool.run(&working.to_cli_args()).await?;

        if exit_code != 0 {
            warn!("{} finished with exit code {}", action, exit_code);
        }
        Ok(exit_code)
    }

    /// Create the target database when missing, purge it otherwise.
    async fn prepare_target(&self, target: &ConnectionDescriptor) -> Result<()> {
        let name = target.database_name.as_str();

        if !target.has_server() || name.is_empty() {
            warn!("No target server or database given; skipping purge");
            return Ok(());
        }

        if !self.catalog.database_exists(target, name).await? {
            info!("Creating database [{}] on {}", name, target.server_name);
            self.catalog.create_database(target, name).await?;
            return Ok(());
        }

        info!("Purging database [{}] on {}", name, target.server_name);

        match self.config.get_blank_dacpac() {
            Some(blank) => {
                let args = purge_arguments(&blank, target);
                let exit_code = self.tool.run(&args.to_cli_args()).await?;
                if exit_code != 0 {
                    anyhow::bail!("Purging [{}] failed with exit code {}", name, exit_code);
                }
            }
            None => {
                self.catalog.drop_database(target, name).await?;
                self.catalog.create_database(target, name).await?;
            }
        }

        info!("Database [{}] is ready", name);
        Ok(())
    }
}

/// Publish of the empty package over the target.
fn purge_arguments(blank_dacpac: &Path, target: &ConnectionDescriptor) -> ArgumentList {
    let mut args = ArgumentList::new();
    args.push(CliArgument::new("/a:", "Publish"));
    args.push(CliArgument::new(SOURCE_FILE.name, blank_dacpac.display().to_string()));
    args.push(CliArgument::new(
        TARGET.connection_string.name,
        target.connection_string.as_str(),
    ));
    args.extend(PURGE_PROPERTIES.iter().filter_map(|p| CliArgument::parse(p)));
    args.wrap_paths_in_quotes();
    args
}

fn report_file_size(path: &Path) {
    if let Ok(metadata) = std::fs::metadata(path) {
        info!(
            "Backup file {} ({})",
            path.display(),
            format_size(metadata.len(), DECIMAL)
        );
    }
}

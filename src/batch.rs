//! Backup-All and Restore-All: the single-database cycle repeated per item.
//!
//! Items run strictly one after another. A failing item does not stop the
//! batch; the batch exit code is the last item's.

use crate::arguments::flags::{Flag, DIAGNOSTICS_FILE, SOURCE_FILE, TARGET_FILE};
use crate::arguments::ArgumentList;
use crate::cli::Runner;
use crate::state::AppState;
use crate::utils::resolve_path;
use anyhow::Result;
use glob::{glob, Pattern};
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};
use tracing::{error, info};

/// Exit code when a batch finds nothing to process.
pub const NO_ITEMS_EXIT_CODE: i32 = -2;

#[derive(Debug, Clone, PartialEq, Tabled)]
pub struct BatchItem {
    #[tabled(rename = "Database")]
    pub database: String,
    #[tabled(rename = "File")]
    pub file: String,
    #[tabled(rename = "Exit Code")]
    pub exit_code: i32,
}

pub async fn backup_all(runner: &Runner<'_>, state: &AppState) -> Result<i32> {
    let databases = runner.catalog.list_user_databases(&state.source).await?;

    if databases.is_empty() {
        error!("No user databases found on {}", state.source.server_name);
        return Ok(NO_ITEMS_EXIT_CODE);
    }
    info!(
        "Backing up {} database(s) from {}",
        databases.len(),
        state.source.server_name
    );

    let target_template = state.original.value(&TARGET_FILE).map(str::to_string);
    let mut items = Vec::with_capacity(databases.len());

    for database in databases {
        let target_file = item_path(target_template.as_deref(), &database, "bacpac");
        let original = retarget(&state.original, &TARGET_FILE, &target_file, &database);
        let source = state.source.with_database(&database);

        let exit_code = match runner.backup(&original, &source).await {
            Ok(code) => code,
            Err(e) => {
                error!("Backup of {} failed: {:#}", database, e);
                1
            }
        };

        items.push(BatchItem {
            database,
            file: target_file,
            exit_code,
        });
    }

    Ok(finish(&items))
}

pub async fn restore_all(runner: &Runner<'_>, state: &AppState) -> Result<i32> {
    let source_template = state.original.value(&SOURCE_FILE).unwrap_or_default();
    let files = find_backup_files(source_template, &runner.config.backup_extension)?;

    if files.is_empty() {
        error!(
            "No .{} files found in {}",
            runner.config.backup_extension,
            search_dir(source_template).display()
        );
        return Ok(NO_ITEMS_EXIT_CODE);
    }
    info!("Restoring {} backup file(s)", files.len());

    let mut items = Vec::with_capacity(files.len());

    for file in files {
        let database = file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let source_file = file.display().to_string();
        let original = retarget(&state.original, &SOURCE_FILE, &source_file, &database);
        let target = state.target.with_database(&database);

        let exit_code = match runner.restore(&original, &target).await {
            Ok(code) => code,
            Err(e) => {
                error!("Restore of {} failed: {:#}", database, e);
                1
            }
        };

        items.push(BatchItem {
            database,
            file: source_file,
            exit_code,
        });
    }

    Ok(finish(&items))
}

/// Original arguments for one item: the artifact path and log file renamed.
fn retarget(original: &ArgumentList, file_flag: &Flag, file: &str, database: &str) -> ArgumentList {
    let mut arguments = original.clone();
    arguments.set_value(file_flag, file);

    if let Some(log) = original.value(&DIAGNOSTICS_FILE).filter(|v| !v.is_empty()) {
        arguments.set_value(&DIAGNOSTICS_FILE, &item_path(Some(log), database, "log"));
    }
    arguments
}

fn finish(items: &[BatchItem]) -> i32 {
    println!("{}", Table::new(items));

    let failed = items.iter().filter(|i| i.exit_code != 0).count();
    if failed > 0 {
        error!("{} of {} item(s) failed", failed, items.len());
    }

    items.last().map(|i| i.exit_code).unwrap_or(NO_ITEMS_EXIT_CODE)
}

fn is_directory_template(template: &str) -> bool {
    template.ends_with('/') || template.ends_with('\\') || Path::new(template).is_dir()
}

/// Directory part of a path template, if it has one.
fn template_dir(template: &str) -> Option<PathBuf> {
    if template.is_empty() {
        return None;
    }
    let path = resolve_path(template).unwrap_or_else(|_| PathBuf::from(template));

    if is_directory_template(template) {
        return Some(path);
    }
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

fn search_dir(template: &str) -> PathBuf {
    template_dir(template).unwrap_or_else(|| PathBuf::from("."))
}

/// `<dir of template>/<name>.<ext of template or default_ext>`
pub fn item_path(template: Option<&str>, name: &str, default_ext: &str) -> String {
    let template = template.unwrap_or_default();
    let extension = if is_directory_template(template) {
        None
    } else {
        Path::new(template).extension().map(|e| e.to_string_lossy().to_string())
    };
    let file_name = format!("{}.{}", name, extension.as_deref().unwrap_or(default_ext));

    match template_dir(template) {
        Some(dir) => dir.join(file_name).display().to_string(),
        None => file_name,
    }
}

/// Backup artifacts beside `template`, sorted by path.
pub fn find_backup_files(template: &str, extension: &str) -> Result<Vec<PathBuf>> {
    let dir = Pattern::escape(&search_dir(template).to_string_lossy());
    let pattern = PathBuf::from(dir)
        .join(format!("*.{}", Pattern::escape(extension.trim_start_matches('.'))))
        .to_string_lossy()
        .to_string();

    let mut files: Vec<PathBuf> = glob(&pattern)?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments::flags::TARGET;
    use crate::config::AppConfig;
    use crate::database::tests::MockCatalog;
    use crate::package::tests::MockPackageTool;
    use tempfile::tempdir;

    fn state(tokens: &[String]) -> AppState {
        AppState::import(tokens).unwrap()
    }

    #[test]
    fn test_item_path_substitutes_name_and_keeps_extension() {
        let dir = tempdir().unwrap();
        let template = dir.path().join("server.bak").display().to_string();
        let path = item_path(Some(&template), "shop", "bacpac");
        assert_eq!(PathBuf::from(path), dir.path().join("shop.bak"));

        assert_eq!(item_path(None, "shop", "bacpac"), "shop.bacpac");
        assert_eq!(item_path(Some("x.bacpac"), "shop", "bacpac"), "shop.bacpac");
    }

    #[test]
    fn test_item_path_with_directory_template() {
        let dir = tempdir().unwrap();
        let template = dir.path().display().to_string();
        let path = item_path(Some(&template), "shop", "bacpac");
        assert_eq!(PathBuf::from(path), dir.path().join("shop.bacpac"));
    }

    #[test]
    fn test_find_backup_files_sorted() {
        let dir = tempdir().unwrap();
        for name in ["b.bacpac", "a.bacpac", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let template = dir.path().join("anything.bacpac").display().to_string();
        let files = find_backup_files(&template, "bacpac").unwrap();
        assert_eq!(files, vec![dir.path().join("a.bacpac"), dir.path().join("b.bacpac")]);
    }

    #[test]
    fn test_find_backup_files_in_directory_with_glob_characters() {
        let dir = tempdir().unwrap();
        let prod = dir.path().join("[prod]");
        std::fs::create_dir(&prod).unwrap();
        std::fs::write(prod.join("shop.bacpac"), b"").unwrap();

        let template = prod.join("x.bacpac").display().to_string();
        let files = find_backup_files(&template, "bacpac").unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("shop.bacpac"));
    }

    #[tokio::test]
    async fn test_backup_all_runs_once_per_database() {
        let dir = tempdir().unwrap();
        let config = AppConfig::default();
        let tool = MockPackageTool::with_exit_codes(&[0, 5, 0]);
        let catalog = MockCatalog {
            databases: vec!["alpha".into(), "beta".into(), "gamma".into()],
            ..MockCatalog::with_tables(&["[dbo].[t]"])
        };
        let runner = Runner::new(&config, &tool, &catalog, false);

        let state = state(&[
            "/a:Backup-All".to_string(),
            "/ssn:host".to_string(),
            format!("/tf:{}", dir.path().join("server.bacpac").display()),
            format!("/df:{}", dir.path().join("logs").join("run.log").display()),
        ]);

        let code = runner.run(&state).await.unwrap();
        assert_eq!(code, 0);

        let invocations = tool.invocations();
        assert_eq!(invocations.len(), 3);
        let second = ArgumentList::import(&invocations[1]);
        assert_eq!(
            second.value(&TARGET_FILE).map(PathBuf::from),
            Some(dir.path().join("beta.bacpac"))
        );
        assert_eq!(
            second.value(&DIAGNOSTICS_FILE).map(PathBuf::from),
            Some(dir.path().join("logs").join("beta.log"))
        );
        assert!(second
            .value(&crate::arguments::flags::SOURCE.connection_string)
            .unwrap()
            .contains("Initial Catalog=beta"));
        assert_eq!(catalog.table_queries(), 3);
    }

    #[tokio::test]
    async fn test_backup_all_exit_code_is_last_item() {
        let config = AppConfig::default();
        let tool = MockPackageTool::with_exit_codes(&[0, 7]);
        let catalog = MockCatalog::with_databases(&["a", "b"]);
        let runner = Runner::new(&config, &tool, &catalog, true);
        let state = state(&["/a:backup-all".to_string(), "/ssn:host".to_string()]);

        // dry run never reaches the tool, every item reports success
        assert_eq!(runner.run(&state).await.unwrap(), 0);

        let runner = Runner::new(&config, &tool, &catalog, false);
        assert_eq!(runner.run(&state).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_backup_all_without_databases() {
        let config = AppConfig::default();
        let tool = MockPackageTool::installed();
        let catalog = MockCatalog::default();
        let runner = Runner::new(&config, &tool, &catalog, false);

        let code = runner
            .run(&state(&["/a:Backup-All".to_string(), "/ssn:host".to_string()]))
            .await
            .unwrap();
        assert_eq!(code, NO_ITEMS_EXIT_CODE);
        assert!(tool.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_restore_all_derives_database_from_file_name() {
        let dir = tempdir().unwrap();
        for name in ["shop.bacpac", "crm.bacpac"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let config = AppConfig::default();
        let tool = MockPackageTool::installed();
        let catalog = MockCatalog::default();
        let runner = Runner::new(&config, &tool, &catalog, false);

        let state = state(&[
            "/a:Restore-All".to_string(),
            "/tsn:host".to_string(),
            "/tdn:ignored".to_string(),
            format!("/sf:{}", dir.path().join("shop.bacpac").display()),
        ]);

        let code = runner.run(&state).await.unwrap();
        assert_eq!(code, 0);
        assert_eq!(
            catalog.calls(),
            vec![
                "database_exists crm",
                "create_database crm",
                "database_exists shop",
                "create_database shop"
            ]
        );

        let invocations = tool.invocations();
        assert_eq!(invocations.len(), 2);
        let first = ArgumentList::import(&invocations[0]);
        assert!(first
            .value(&TARGET.connection_string)
            .unwrap()
            .contains("Initial Catalog=crm"));
        assert_eq!(
            first.value(&SOURCE_FILE).map(PathBuf::from),
            Some(dir.path().join("crm.bacpac"))
        );
    }

    #[tokio::test]
    async fn test_restore_all_renames_diagnostics_per_item() {
        let dir = tempdir().unwrap();
        for name in ["shop.bacpac", "crm.bacpac"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let logs = dir.path().join("logs");
        let config = AppConfig::default();
        let tool = MockPackageTool::installed();
        let catalog = MockCatalog::default();
        let runner = Runner::new(&config, &tool, &catalog, false);

        let state = state(&[
            "/a:Restore-All".to_string(),
            "/tsn:host".to_string(),
            format!("/sf:{}", dir.path().join("shop.bacpac").display()),
            format!("/df:{}", logs.join("restore.txt").display()),
        ]);

        assert_eq!(runner.run(&state).await.unwrap(), 0);

        let logs_used: Vec<Option<PathBuf>> = tool
            .invocations()
            .iter()
            .map(|args| ArgumentList::import(args).value(&DIAGNOSTICS_FILE).map(PathBuf::from))
            .collect();
        assert_eq!(
            logs_used,
            vec![Some(logs.join("crm.txt")), Some(logs.join("shop.txt"))]
        );
        assert!(logs.is_dir());
    }

    #[tokio::test]
    async fn test_restore_all_without_files() {
        let dir = tempdir().unwrap();
        let config = AppConfig::default();
        let tool = MockPackageTool::installed();
        let catalog = MockCatalog::default();
        let runner = Runner::new(&config, &tool, &catalog, false);

        let state = state(&[
            "/a:Restore-All".to_string(),
            format!("/sf:{}", dir.path().join("x.bacpac").display()),
        ]);

        assert_eq!(runner.run(&state).await.unwrap(), NO_ITEMS_EXIT_CODE);
    }
}

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub fn resolve_path(path_str: &str) -> Result<PathBuf, String> {
    let path_str = remove_wrapped_quotes(path_str);
    let resolved_path = if path_str.starts_with('~') {
        let expanded_str = shellexpand::tilde(path_str);
        PathBuf::from(expanded_str.to_string())
    } else {
        PathBuf::from(path_str)
    };

    if resolved_path.exists() {
        fs::canonicalize(&resolved_path).map_err(|e| format!("Could not canonicalize path: {}", e))
    } else {
        Ok(resolved_path)
    }
}

/// Strip one matching pair of wrapping `"` or `'` characters.
pub fn remove_wrapped_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

pub fn wrap_in_quotes(value: &str) -> String {
    format!("\"{}\"", remove_wrapped_quotes(value))
}

/// Create the parent directory of `file_path` when it has one and it is missing.
pub fn ensure_parent_dir(file_path: &Path) -> std::io::Result<()> {
    match file_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

/// `HH:MM:SS.ff`
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let hundredths = elapsed.subsec_millis() / 10;

    format!(
        "{:02}:{:02}:{:02}.{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60,
        hundredths
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_path_existing() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("testfile.bacpac");
        File::create(&file_path).unwrap();

        let resolved = resolve_path(file_path.to_str().unwrap()).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("testfile.bacpac"));
    }

    #[test]
    fn test_resolve_path_non_existing() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("not_exist.bacpac");

        let resolved = resolve_path(file_path.to_str().unwrap()).unwrap();
        assert_eq!(resolved, file_path);
    }

    #[test]
    fn test_resolve_path_with_tilde() {
        let home = env::var("HOME").unwrap();
        let resolved = resolve_path("~/backups/db.bacpac").unwrap();
        assert!(resolved.starts_with(&home));
        assert!(resolved.ends_with("db.bacpac"));
    }

    #[test]
    fn test_resolve_path_strips_quotes() {
        let resolved = resolve_path("\"/tmp/does not exist/x.bacpac\"").unwrap();
        assert_eq!(resolved, PathBuf::from("/tmp/does not exist/x.bacpac"));
    }

    #[test]
    fn test_remove_wrapped_quotes() {
        assert_eq!(
            remove_wrapped_quotes("\"C:\\temp\\x.bacpac\""),
            "C:\\temp\\x.bacpac"
        );
        assert_eq!(remove_wrapped_quotes("'single'"), "single");
        assert_eq!(remove_wrapped_quotes("\"'both'\""), "'both'");
        assert_eq!(remove_wrapped_quotes("\"unbalanced"), "\"unbalanced");
        assert_eq!(remove_wrapped_quotes("\""), "\"");
        assert_eq!(remove_wrapped_quotes(""), "");
    }

    #[test]
    fn test_remove_wrapped_quotes_is_idempotent() {
        for value in ["\"C:\\temp\\x.bacpac\"", "\"a b\"", "plain", "'single'"] {
            let once = remove_wrapped_quotes(value);
            assert_eq!(remove_wrapped_quotes(once), once);
        }
    }

    #[test]
    fn test_remove_wrapped_quotes_strips_one_pair_only() {
        assert_eq!(
            remove_wrapped_quotes("\"Server=a;Name='x;y'\""),
            "Server=a;Name='x;y'"
        );
        assert_eq!(remove_wrapped_quotes("\"Name=\"x\"\""), "Name=\"x\"");
    }

    #[test]
    fn test_wrap_in_quotes_does_not_double_wrap() {
        assert_eq!(wrap_in_quotes("out dir/x.bacpac"), "\"out dir/x.bacpac\"");
        assert_eq!(wrap_in_quotes("\"x.bacpac\""), "\"x.bacpac\"");
    }

    #[test]
    fn test_ensure_parent_dir_creates_missing_directories() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("a").join("b").join("db.bacpac");

        ensure_parent_dir(&file_path).unwrap();
        assert!(dir.path().join("a").join("b").is_dir());
        assert!(!file_path.exists());

        // bare file names have no directory to create
        ensure_parent_dir(Path::new("db.bacpac")).unwrap();
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(3_723_456)), "01:02:03.45");
        assert_eq!(format_elapsed(Duration::ZERO), "00:00:00.00");
    }
}

use log::{error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use crate::config::AppConfig;

/// Run all boot checks. Call this before Rocket launches.
/// Creates missing directories, warns about a missing poster background,
/// and aborts if a generated-file directory is unusable.
pub fn run(config: &AppConfig) {
    info!("Gazette boot check starting...");

    let (warnings, errors) = check(config);

    if errors > 0 {
        error!(
            "Boot check FAILED: {} error(s), {} warning(s). Aborting.",
            errors, warnings
        );
        process::exit(1);
    }

    if warnings > 0 {
        warn!(
            "Boot check passed with {} warning(s). Some features may not work correctly.",
            warnings
        );
    } else {
        info!("Boot check passed. All systems go.");
    }
}

/// Returns `(warnings, errors)`.
pub fn check(config: &AppConfig) -> (u32, u32) {
    let mut warnings = 0u32;
    let mut errors = 0u32;

    // ── 1. Directories ─────────────────────────────────
    for dir in required_dirs(config) {
        if !dir.exists() {
            match fs::create_dir_all(&dir) {
                Ok(_) => info!("  Created directory: {}", dir.display()),
                Err(e) => {
                    error!("  FAILED to create directory {}: {}", dir.display(), e);
                    errors += 1;
                    continue;
                }
            }
        }

        // ── 2. Writable ────────────────────────────────
        let test_file = dir.join(".write_test");
        match fs::write(&test_file, "test") {
            Ok(_) => {
                let _ = fs::remove_file(&test_file);
            }
            Err(e) => {
                error!("  Directory not writable {}: {}", dir.display(), e);
                errors += 1;
            }
        }
    }

    // ── 3. Poster background ───────────────────────────
    let background = config.poster_background();
    if !background.is_file() {
        warn!(
            "  Missing poster background: {} (poster generation will fail)",
            background.display()
        );
        warnings += 1;
    }

    (warnings, errors)
}

fn required_dirs(config: &AppConfig) -> Vec<PathBuf> {
    let mut dirs = vec![config.export_dir(), config.qrcode_dir()];
    if let Some(parent) = Path::new(&config.database_path).parent() {
        if !parent.as_os_str().is_empty() {
            dirs.push(parent.to_path_buf());
        }
    }
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_dirs_and_warns_on_missing_background() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = AppConfig {
            runtime_root_path: format!("{}/", tmp.path().display()),
            database_path: format!("{}/db/gazette.db", tmp.path().display()),
            ..AppConfig::default()
        };

        let (warnings, errors) = check(&cfg);
        assert_eq!(errors, 0);
        assert_eq!(warnings, 1);
        assert!(cfg.export_dir().is_dir());
        assert!(cfg.qrcode_dir().is_dir());
        assert!(tmp.path().join("db").is_dir());

        fs::write(cfg.poster_background(), b"not really a jpeg").unwrap();
        assert_eq!(check(&cfg), (0, 0));
    }
}

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};

pub const MEMORY_URL: &str = "sqlite::memory:";
const DATA_DIR: &str = ".clavierdor";
const DB_FILE: &str = "clavierdor.db";

/// `~/.clavierdor/clavierdor.db`, or the file in the working directory without a home.
#[must_use]
pub fn default_db_url() -> String {
    let path = dirs::home_dir().map_or_else(
        || PathBuf::from(DB_FILE),
        |home| home.join(DATA_DIR).join(DB_FILE),
    );
    normalize_sqlite_url(&path.display().to_string())
}

/// Turns a path or `sqlite:` URL into an absolute `sqlite://` URL.
#[must_use]
pub fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == MEMORY_URL || trimmed.starts_with("sqlite://") {
        return trimmed.to_owned();
    }

    let path = Path::new(trimmed.strip_prefix("sqlite:").unwrap_or(trimmed));
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Creates the database file and its parent directories when missing.
///
/// # Errors
///
/// Fails on a URL without a file path or when the filesystem refuses.
pub fn prepare_sqlite_file(db_url: &str) -> anyhow::Result<()> {
    if db_url == MEMORY_URL {
        return Ok(());
    }

    let Some(rest) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid --db value: {db_url}");
    };
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() {
        bail!("invalid --db value: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("creating {}", path.display()))?;
    }
    Ok(())
}

//! Plain-text leaderboard report.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use comfy_table::{ContentArrangement, Table};

use crate::error::ExportError;
use crate::game::ScoreEntry;

pub const REPORT_TITLE: &str = "Classement - Clavier d'Or";

/// Leaderboard table with the Joueur / Score / Date columns.
#[must_use]
pub fn scores_table(scores: &[ScoreEntry]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Joueur", "Score", "Date"]);
    for entry in scores {
        table.add_row(vec![
            entry.player_name.clone(),
            entry.score.to_string(),
            entry.started_at.format("%d/%m/%Y").to_string(),
        ]);
    }
    table
}

#[must_use]
pub fn render_report(scores: &[ScoreEntry], generated_at: DateTime<Utc>) -> String {
    format!(
        "{REPORT_TITLE}\nExporté le {}\n\n{}\n",
        generated_at.format("%d/%m/%Y %H:%M"),
        scores_table(scores)
    )
}

/// Writes the report to `path`, creating parent directories.
///
/// # Errors
///
/// Returns `ExportError::Io` if a directory or the file cannot be written.
pub fn export_scores(
    path: &Path,
    scores: &[ScoreEntry],
    generated_at: DateTime<Utc>,
) -> Result<PathBuf, ExportError> {
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, render_report(scores, generated_at)).map_err(io_err)?;

    tracing::info!(path = %path.display(), rows = scores.len(), "exported leaderboard");
    Ok(path.to_path_buf())
}

// File-backed pattern source. One UTF-8 text file, one entry per line;
// blank lines and '#' lines are comments. A missing file is created with a
// commented template so operators see the format before the first entry.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::core::patterns::{PatternError, PatternSource};

const BLOCKLIST_TEMPLATE: &[&str] = &[
    "# chatguard banned patterns",
    "# One entry per line: a plain word/phrase or a regular expression.",
    "# Plain entries automatically match their spelling variants.",
    "# Examples:",
    "#   badword",
    "#   ^evil.*$",
];

const ALLOWLIST_TEMPLATE: &[&str] = &[
    "# chatguard exceptions",
    "# Entries here are never blocked and override the banned patterns.",
    "# Examples:",
    "#   safeword",
    "#   ^specific\\sphrase$",
];

pub struct FilePatternSource {
    path: PathBuf,
    template: &'static [&'static str],
}

impl FilePatternSource {
    /// Source for the banned-patterns file.
    pub fn blocklist(path: impl AsRef<Path>) -> Self {
        Self::with_template(path, BLOCKLIST_TEMPLATE)
    }

    /// Source for the exceptions file.
    pub fn allowlist(path: impl AsRef<Path>) -> Self {
        Self::with_template(path, ALLOWLIST_TEMPLATE)
    }

    pub fn with_template(path: impl AsRef<Path>, template: &'static [&'static str]) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            template,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_exists(&self) -> Result<(), PatternError> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PatternError::Source(e.to_string()))?;
        }
        let mut text = self.template.join("\n");
        text.push('\n');
        fs::write(&self.path, text)
            .await
            .map_err(|e| PatternError::Source(e.to_string()))
    }
}

#[async_trait]
impl PatternSource for FilePatternSource {
    async fn read_lines(&self) -> Result<Vec<String>, PatternError> {
        self.ensure_exists().await?;
        let text = fs::read_to_string(&self.path)
            .await
            .map_err(|e| PatternError::Source(e.to_string()))?;
        Ok(text.lines().map(str::to_string).collect())
    }

    async fn append_line(&self, line: &str) -> Result<(), PatternError> {
        self.ensure_exists().await?;
        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| PatternError::Source(e.to_string()))?;
        file.write_all(format!("{line}\n").as_bytes())
            .await
            .map_err(|e| PatternError::Source(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| PatternError::Source(e.to_string()))
    }

    async fn write_lines(&self, lines: &[String]) -> Result<(), PatternError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PatternError::Source(e.to_string()))?;
        }
        let mut text = lines.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        fs::write(&self.path, text)
            .await
            .map_err(|e| PatternError::Source(e.to_string()))
    }
}

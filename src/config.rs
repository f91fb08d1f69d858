use anyhow::Result;
use std::env;
use std::path::{Path, PathBuf};

use crate::ai::DEFAULT_MODEL;
use crate::error::AppError;

pub const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";
const DATA_DIR_VAR: &str = "JOBB_DATA_DIR";
const MODEL_VAR: &str = "JOBB_MODEL";

/// Runtime settings. Precedence is CLI flag, then environment (including a
/// `.env` file), then built-in defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub model: String,
    api_key: Option<String>,
}

impl Config {
    pub fn load(data_dir: Option<PathBuf>, model: Option<String>) -> Result<Self> {
        // A missing .env is normal.
        let _ = dotenvy::dotenv();

        let data_dir = match data_dir.or_else(|| env::var_os(DATA_DIR_VAR).map(PathBuf::from)) {
            Some(dir) => dir,
            None => Self::default_data_dir(),
        };
        let model = model
            .or_else(|| env::var(MODEL_VAR).ok())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_key = env::var(API_KEY_VAR).ok().filter(|k| !k.trim().is_empty());

        Ok(Self {
            data_dir,
            model,
            api_key,
        })
    }

    fn default_data_dir() -> PathBuf {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobb") {
            proj_dirs.data_dir().to_path_buf()
        } else {
            PathBuf::from("data")
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("jobb.db")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.data_dir.join("output")
    }

    pub fn photo_dir(&self) -> PathBuf {
        self.data_dir.join("profile")
    }

    pub fn guidelines_path(&self) -> PathBuf {
        self.data_dir.join("guidelines").join("cover_letter_style.md")
    }

    /// The LLM credential, or a configuration error naming the variable.
    pub fn require_api_key(&self) -> Result<&str, AppError> {
        self.api_key.as_deref().ok_or_else(|| {
            AppError::Config(format!(
                "{} is not set. Set it with: export {}=your-key-here (or put it in .env)",
                API_KEY_VAR, API_KEY_VAR
            ))
        })
    }

    /// Loads the optional cover-letter style guide. Absent or blank files
    /// yield `None`.
    pub fn load_guidelines(&self) -> Result<Option<String>> {
        read_optional_text(&self.guidelines_path())
    }
}

fn read_optional_text(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let text = text.trim();
            Ok((!text.is_empty()).then(|| text.to_string()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(anyhow::Error::new(e)
            .context(format!("Failed to read {}", path.display()))),
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests(data_dir: &Path, api_key: Option<&str>) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.map(str::to_string),
        }
    }
}

use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::ranking::SortMode;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub polling_interval_ms: u64,
    pub max_answers: usize,

    pub view: ViewConfig,
    pub paths: Paths,
}

/// Начальный выбор отображения: вопрос и режим сортировки.
#[derive(Debug, Deserialize, Clone)]
pub struct ViewConfig {
    pub question_id: String,
    #[serde(default = "default_sort_by")]
    pub sort_by: SortMode,
}

fn default_sort_by() -> SortMode {
    SortMode::Time
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Paths {
    /// JSON-файл с начальными данными хранилища. Без него старт с пустым
    /// хранилищем.
    #[serde(default)]
    pub seed_path: Option<String>,
    /// Адрес HTTP API. Без него API не поднимается.
    #[serde(default)]
    pub api_listen_addr: Option<String>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {path}"))?;
        let cfg: Config = serde_yaml::from_str(&data)
            .with_context(|| format!("failed to parse YAML config at {path}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.polling_interval_ms > 0,
            "polling_interval_ms must be positive (got {})",
            self.polling_interval_ms
        );
        ensure!(
            self.polling_interval_ms <= 60000,
            "polling_interval_ms must be <= 60000 ms (1 minute) to keep the published list fresh (got {})",
            self.polling_interval_ms
        );
        ensure!(
            self.max_answers > 0,
            "max_answers must be positive (got {})",
            self.max_answers
        );
        ensure!(
            self.max_answers <= 10000,
            "max_answers must be <= 10000 to prevent excessive memory usage (got {})",
            self.max_answers
        );

        self.view.validate()?;
        self.paths.validate()?;

        Ok(())
    }
}

impl ViewConfig {
    fn validate(&self) -> Result<()> {
        ensure!(
            !self.question_id.trim().is_empty(),
            "view.question_id must not be empty"
        );
        Ok(())
    }
}

impl Paths {
    fn validate(&self) -> Result<()> {
        if let Some(ref seed_path) = self.seed_path {
            ensure!(
                !seed_path.trim().is_empty(),
                "seed_path must not be empty when set"
            );

            let path = Path::new(seed_path);
            match path.extension() {
                Some(ext) if ext.to_string_lossy().to_lowercase() == "json" => {}
                Some(ext) => anyhow::bail!(
                    "seed_path must have .json extension (got {:?})",
                    ext
                ),
                None => anyhow::bail!(
                    "seed_path must have .json extension (got path without extension: {:?})",
                    path
                ),
            }

            ensure!(
                path.is_file(),
                "seed_path must point to an existing file (got {:?})",
                path
            );
        }

        Ok(())
    }
}

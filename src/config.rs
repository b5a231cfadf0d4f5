use std::path::PathBuf;

use config::{Config, Environment, File, Source};
use serde::Deserialize;

use crate::error::Result;

const FILE_NAME: &str = "laws_compiler";
const ENV_PREFIX: &str = "LAWS";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub corpus_dir: PathBuf,
    pub db_path: PathBuf,
}

impl Settings {
    /// Defaults, then `laws_compiler.toml` if present, then `LAWS_*` variables.
    pub fn load() -> Result<Self> {
        layered(
            File::with_name(FILE_NAME).required(false),
            Environment::with_prefix(ENV_PREFIX),
        )
    }

    /// Explicit command-line values win over every other layer.
    pub fn with_overrides(mut self, corpus_dir: Option<PathBuf>, db_path: Option<PathBuf>) -> Self {
        if let Some(dir) = corpus_dir {
            self.corpus_dir = dir;
        }
        if let Some(path) = db_path {
            self.db_path = path;
        }
        self
    }
}

fn layered<F>(file: F, env: Environment) -> Result<Settings>
where
    F: Source + Send + Sync + 'static,
{
    let settings = Config::builder()
        .set_default("corpus_dir", "murphys-laws")?
        .set_default("db_path", "data/laws.sqlite")?
        .add_source(file)
        .add_source(env)
        .build()?
        .try_deserialize()?;
    Ok(settings)
}

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{Identifier, IdentifierRange};
use crate::error::MinerError;

pub const DEFAULT_CONFIG_FILE: &str = "itasser-miner.json";
pub const DEFAULT_BASE_URL: &str = "https://zhanglab.ccmb.med.umich.edu/I-TASSER/output";
pub const DEFAULT_FIRST: &str = "S438773";
pub const DEFAULT_LAST: &str = "S449979";
pub const DEFAULT_DELAY_SECS: u64 = 2;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub first: Option<String>,
    #[serde(default)]
    pub last: Option<String>,
    #[serde(default)]
    pub delay_secs: Option<u64>,
    #[serde(default)]
    pub can_download: Option<bool>,
    #[serde(default)]
    pub blast: Option<BlastConfig>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct BlastConfig {
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub threads: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlastSettings {
    pub program: String,
    pub database: String,
    pub threads: usize,
}

impl Default for BlastSettings {
    fn default() -> Self {
        Self {
            program: "blastp".to_string(),
            database: "human".to_string(),
            threads: 4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub base_url: String,
    pub range: IdentifierRange,
    pub delay: Duration,
    pub can_download: bool,
    pub blast: BlastSettings,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub first: Option<Identifier>,
    pub last: Option<Identifier>,
    pub delay_secs: Option<u64>,
    pub offline: bool,
    pub blast_program: Option<String>,
    pub blast_database: Option<String>,
    pub blast_threads: Option<usize>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads the config file at `path`, which must exist.
    pub fn resolve(path: &Path) -> Result<ResolvedConfig, MinerError> {
        let content =
            fs::read_to_string(path).map_err(|_| MinerError::ConfigRead(path.to_path_buf()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| MinerError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    /// Config for a workspace rooted at `root`. An explicit path must exist;
    /// otherwise [`DEFAULT_CONFIG_FILE`] inside `root` is read when present
    /// and built-in defaults apply when it is not.
    pub fn resolve_in(root: &Path, explicit: Option<&Path>) -> Result<ResolvedConfig, MinerError> {
        if let Some(path) = explicit {
            return Self::resolve(path);
        }
        let candidate = root.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            Self::resolve(&candidate)
        } else {
            Self::resolve_config(Config::default())
        }
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, MinerError> {
        let schema_version = config.schema_version.unwrap_or(1);
        let base_url = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let first: Identifier = config.first.as_deref().unwrap_or(DEFAULT_FIRST).parse()?;
        let last: Identifier = config.last.as_deref().unwrap_or(DEFAULT_LAST).parse()?;

        let defaults = BlastSettings::default();
        let blast = match config.blast {
            Some(blast) => BlastSettings {
                program: blast.program.unwrap_or(defaults.program),
                database: blast.database.unwrap_or(defaults.database),
                threads: blast.threads.unwrap_or(defaults.threads),
            },
            None => defaults,
        };

        Ok(ResolvedConfig {
            schema_version,
            base_url,
            range: IdentifierRange::new(first, last),
            delay: Duration::from_secs(config.delay_secs.unwrap_or(DEFAULT_DELAY_SECS)),
            can_download: config.can_download.unwrap_or(true),
            blast,
        })
    }
}

impl ResolvedConfig {
    pub fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(first) = overrides.first {
            self.range.first = first;
        }
        if let Some(last) = overrides.last {
            self.range.last = last;
        }
        if let Some(delay) = overrides.delay_secs {
            self.delay = Duration::from_secs(delay);
        }
        if overrides.offline {
            self.can_download = false;
        }
        if let Some(program) = overrides.blast_program {
            self.blast.program = program;
        }
        if let Some(database) = overrides.blast_database {
            self.blast.database = database;
        }
        if let Some(threads) = overrides.blast_threads {
            self.blast.threads = threads.max(1);
        }
        self
    }
}

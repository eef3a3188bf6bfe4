use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "claimgen.toml";
const ENV_PREFIX: &str = "CLAIMGEN";

/// Layered settings: built-in defaults, then an optional TOML file, then
/// `CLAIMGEN_*` environment variables (`__` separates sections, e.g.
/// `CLAIMGEN_GENERATE__LEGITIMATE_COUNT=10`). CLI flags are applied on top by
/// the caller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: Paths,
    pub scrape: ScrapeSettings,
    pub generate: GenerateSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub clinics_csv: PathBuf,
    pub doctors_csv: PathBuf,
    pub specialties_json: PathBuf,
    pub billing_json: PathBuf,
    pub design_file: PathBuf,
    pub logos_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Paths {
            clinics_csv: "hospitals_and_clinics.csv".into(),
            doctors_csv: "doctors_and_specialists_list.csv".into(),
            specialties_json: "specialities_diseases.json".into(),
            billing_json: "disease_consultation.json".into(),
            design_file: "design.json".into(),
            logos_dir: "logos".into(),
            output_dir: "output".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrapeSettings {
    /// Worker count; `None` means one per available core.
    pub workers: Option<usize>,
    pub max_retries: u32,
    pub backoff_ms: u64,
    pub timeout_secs: u64,
    pub pool_size: usize,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        ScrapeSettings {
            workers: None,
            max_retries: 3,
            backoff_ms: 1000,
            timeout_secs: 30,
            pool_size: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerateSettings {
    pub legitimate_count: usize,
    pub fraudulent_count: usize,
    pub seed: Option<u64>,
    pub workers: Option<usize>,
}

impl Default for GenerateSettings {
    fn default() -> Self {
        GenerateSettings {
            legitimate_count: 50,
            fraudulent_count: 50,
            seed: None,
            workers: None,
        }
    }
}

impl Settings {
    pub fn load(file: &Path) -> Result<Self> {
        Config::builder()
            .add_source(File::from(file).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .with_context(|| format!("Failed to load settings from {:?}", file))
    }
}

/// One worker per core, four when the core count is unknown.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let s = Settings::load(Path::new("does-not-exist.toml")).unwrap();
        assert_eq!(s.generate.legitimate_count, 50);
        assert_eq!(s.scrape.max_retries, 3);
        assert_eq!(s.paths.design_file, PathBuf::from("design.json"));
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("claimgen.toml");
        std::fs::write(
            &path,
            "[generate]\nlegitimate_count = 3\nseed = 7\n\n[paths]\noutput_dir = \"claims\"\n",
        )
        .unwrap();

        let s = Settings::load(&path).unwrap();
        assert_eq!(s.generate.legitimate_count, 3);
        assert_eq!(s.generate.fraudulent_count, 50);
        assert_eq!(s.generate.seed, Some(7));
        assert_eq!(s.paths.output_dir, PathBuf::from("claims"));
    }
}

//! YAML config loading: one provider or benchmark per file, `${VAR}` /
//! `${VAR:-default}` interpolation, sealed-semantics validation before
//! registration.

use std::path::Path;
use std::sync::OnceLock;

use anyhow::{bail, Context as _, Result};
use regex::{Captures, Regex};
use tracing::debug;

use membench_core::domain::{BenchmarkConfig, ProviderConfig};
use membench_core::validate_sealed_semantics;
use membench_packs::PackRegistry;

#[derive(Debug, Default)]
pub struct ConfigSet {
    pub benchmarks: Vec<BenchmarkConfig>,
    pub providers: Vec<ProviderConfig>,
}

fn env_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(:-([^}]*))?\}").expect("static pattern")
    })
}

/// Substitutes `${VAR}` and `${VAR:-default}` from the environment.
/// Placeholders with no value and no default are preserved verbatim, so
/// prompt-template expressions like `${question}` survive.
pub fn interpolate_env(raw: &str) -> String {
    env_pattern()
        .replace_all(raw, |caps: &Captures<'_>| {
            match std::env::var(&caps[1]) {
                Ok(value) => value,
                Err(_) => match caps.get(3) {
                    Some(default) => default.as_str().to_string(),
                    None => caps[0].to_string(),
                },
            }
        })
        .into_owned()
}

/// Loads `benchmarks/*.yaml` and `providers/*.yaml` under `dir`. Each
/// benchmark is checked against the pack that owns it before it is
/// accepted.
pub fn load_config_dir(dir: &Path, packs: &PackRegistry) -> Result<ConfigSet> {
    let mut set = ConfigSet::default();

    for path in yaml_files(&dir.join("benchmarks"))? {
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: BenchmarkConfig = serde_yaml::from_str(&interpolate_env(&raw))
            .with_context(|| format!("parsing {}", path.display()))?;

        let pack = packs.get_latest(&config.name);
        validate_sealed_semantics(&config, pack.as_deref())
            .with_context(|| format!("validating {}", path.display()))?;

        debug!(benchmark = %config.name, file = %path.display(), "benchmark config loaded");
        set.benchmarks.push(config);
    }

    for path in yaml_files(&dir.join("providers"))? {
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: ProviderConfig = serde_yaml::from_str(&interpolate_env(&raw))
            .with_context(|| format!("parsing {}", path.display()))?;
        debug!(provider = %config.name, file = %path.display(), "provider config loaded");
        set.providers.push(config);
    }

    if set.benchmarks.is_empty() && set.providers.is_empty() {
        bail!(
            "no configs found under {}; expected benchmarks/*.yaml and providers/*.yaml",
            dir.display()
        );
    }
    Ok(set)
}

fn yaml_files(dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("listing {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("yaml" | "yml")
            )
        })
        .collect();
    files.sort();
    Ok(files)
}

//! `chronoscript.toml` configuration (SPEC_FULL.md "Configuration"):
//! tunables the CLI reads once at startup and that CLI flags override.
//! None of these bound correctness — the interpreter and GC behave
//! identically regardless — they only pick when the host chooses to run
//! a collection cycle and how large the value caches start out.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChronoConfig {
    pub gc: GcConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GcConfig {
    /// Run `markAll` + `sweep` once after the entry function returns (§5:
    /// GC is explicit, "typically at shutdown"). Off by default since a
    /// one-shot CLI invocation has no long-lived persistent containers to
    /// reclaim mid-run.
    pub collect_after_run: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Initial capacity hint for the string cache, in slots.
    pub initial_string_slots: usize,
    /// Initial capacity hint for the container heap, in slots.
    pub initial_heap_slots: usize,
}

impl Default for ChronoConfig {
    fn default() -> Self {
        Self { gc: GcConfig::default(), cache: CacheConfig::default() }
    }
}

impl Default for GcConfig {
    fn default() -> Self {
        Self { collect_after_run: false }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { initial_string_slots: 256, initial_heap_slots: 64 }
    }
}

/// Loads `path` if given, else `chronoscript.toml` in the current directory
/// if one happens to exist; falls back to defaults otherwise. A config file
/// that is present but malformed is an error rather than a silent fallback.
pub fn load(path: Option<&Path>) -> Result<ChronoConfig> {
    let candidate = path.map(Path::to_path_buf).or_else(|| {
        let default = Path::new("chronoscript.toml");
        default.exists().then(|| default.to_path_buf())
    });

    let Some(candidate) = candidate else {
        return Ok(ChronoConfig::default());
    };

    let text = std::fs::read_to_string(&candidate)
        .with_context(|| format!("reading config file '{}'", candidate.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing config file '{}'", candidate.display()))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;

    #[test]
    fn missing_config_falls_back_to_defaults() {
        let config = load(Some(Path::new("/nonexistent/chronoscript.toml")));
        assert!(config.is_err());
    }

    #[test]
    fn no_path_and_no_cwd_file_uses_defaults() {
        let config = load(None).unwrap();
        assert_eq!(config.cache.initial_string_slots, 256);
        assert!(!config.gc.collect_after_run);
    }

    fn with_temp_config(contents: &str) -> Result<ChronoConfig> {
        let dir = std::env::temp_dir().join(format!("chronoscript-cfg-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("chronoscript.toml");
        std::fs::write(&path, contents).unwrap();
        let result = load(Some(&path));
        std::fs::remove_dir_all(&dir).ok();
        result
    }

    #[test_case("[gc]\ncollect_after_run = true\n", true, 256; "overrides only gc")]
    #[test_case("[cache]\ninitial_string_slots = 1024\n", false, 1024; "overrides only cache")]
    #[test_case("", false, 256; "empty document uses every default")]
    fn parses_a_partial_toml_document(contents: &str, expect_collect: bool, expect_slots: usize) {
        let config = with_temp_config(contents).unwrap();
        assert_eq!(config.gc.collect_after_run, expect_collect);
        assert_eq!(config.cache.initial_string_slots, expect_slots);
    }
}

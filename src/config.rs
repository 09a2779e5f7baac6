// src/config.rs
//! Engine configuration: one object carrying every tunable, loadable from TOML or
//! JSON, with bundled presets for the common weight/threshold variants.
//!
//! Resolution order of [`load_config_default`]:
//! 1) `$SENTIMENT_CONFIG_PATH` (must exist)
//! 2) `config/engine.toml`
//! 3) `config/engine.json`
//! 4) `$SENTIMENT_PRESET` (preset name)
//! 5) built-in `balanced` preset

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::classify::{ClampRange, Thresholds};
use crate::context::ContextConfig;
use crate::engine::JitterConfig;
use crate::error::ConfigError;
use crate::lexicon::{Lexicon, NegationConfig};
use crate::phrases::PhraseConfig;

pub const ENV_CONFIG_PATH: &str = "SENTIMENT_CONFIG_PATH";
pub const ENV_PRESET: &str = "SENTIMENT_PRESET";
pub const DEFAULT_CONFIG_TOML: &str = "config/engine.toml";
pub const DEFAULT_CONFIG_JSON: &str = "config/engine.json";
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 256;

/// Every knob of the engine. Missing fields fall back to the `balanced` defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub lexicon: Lexicon,
    pub negation: NegationConfig,
    pub phrases: PhraseConfig,
    pub context: ContextConfig,
    pub thresholds: Thresholds,
    pub clamp: ClampRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jitter: Option<JitterConfig>,
    /// Batches at or above this size are scored in parallel.
    pub parallel_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lexicon: Lexicon::default(),
            negation: NegationConfig::default(),
            phrases: PhraseConfig::default(),
            context: ContextConfig::default(),
            thresholds: Thresholds::default(),
            clamp: ClampRange::default(),
            jitter: None,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl EngineConfig {
    /// Consistency checks that do not need compilation. Pattern checks happen when
    /// the phrase set is compiled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.thresholds.validate()?;
        self.clamp.validate(&self.thresholds)?;
        self.context.validate()?;

        if !(1..=3).contains(&self.negation.window) {
            return Err(ConfigError::NegationWindow(self.negation.window));
        }
        let amp = self.negation.amplification;
        if !amp.is_finite() {
            return Err(ConfigError::NonFinite {
                name: "negation.amplification",
                value: amp,
            });
        }
        if amp <= 0.0 {
            return Err(ConfigError::NonPositive {
                name: "negation.amplification",
                value: amp,
            });
        }

        if let Some((word, &weight)) = self.lexicon.iter().find(|(_, w)| !w.is_finite()) {
            return Err(ConfigError::LexiconWeight {
                word: word.clone(),
                weight,
            });
        }

        if let Some(j) = &self.jitter {
            j.validate()?;
        }
        Ok(())
    }
}

/// Bundled configuration presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    /// Symmetric thresholds, additive phrases, mild engagement weighting.
    Balanced,
    /// Asymmetric: easier to be negative than positive.
    Cautious,
    /// Five-way labels.
    FiveWay,
    /// Short-circuit phrase tier with a wider clamp range.
    Gatekeeper,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::Balanced,
        Preset::Cautious,
        Preset::FiveWay,
        Preset::Gatekeeper,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Preset::Balanced => "balanced",
            Preset::Cautious => "cautious",
            Preset::FiveWay => "five_way",
            Preset::Gatekeeper => "gatekeeper",
        }
    }

    /// Case-insensitive; `-` and `_` are interchangeable.
    pub fn from_name(name: &str) -> Option<Self> {
        let n = name.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|p| p.name() == n)
    }

    fn source(&self) -> &'static str {
        match self {
            Preset::Balanced => include_str!("../presets/balanced.toml"),
            Preset::Cautious => include_str!("../presets/cautious.toml"),
            Preset::FiveWay => include_str!("../presets/five_way.toml"),
            Preset::Gatekeeper => include_str!("../presets/gatekeeper.toml"),
        }
    }

    pub fn config(&self) -> EngineConfig {
        toml::from_str(self.source()).expect("valid bundled preset")
    }
}

/// Load configuration from an explicit path. `.json` is parsed as JSON, anything
/// else as TOML (falling back to JSON).
pub fn load_config_from(path: &Path) -> Result<EngineConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading engine config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
        .with_context(|| format!("parsing engine config {}", path.display()))
}

/// Load configuration using env vars + fallbacks (see module docs).
pub fn load_config_default() -> Result<EngineConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        }
        return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
    }
    let toml_p = PathBuf::from(DEFAULT_CONFIG_TOML);
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    let json_p = PathBuf::from(DEFAULT_CONFIG_JSON);
    if json_p.exists() {
        return load_config_from(&json_p);
    }
    if let Ok(name) = std::env::var(ENV_PRESET) {
        let preset =
            Preset::from_name(&name).ok_or_else(|| anyhow!("unknown preset `{name}`"))?;
        return Ok(preset.config());
    }
    Ok(Preset::Balanced.config())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<EngineConfig> {
    if hint_ext == "json" {
        return Ok(serde_json::from_str(s)?);
    }
    match toml::from_str::<EngineConfig>(s) {
        Ok(cfg) => Ok(cfg),
        Err(toml_err) => serde_json::from_str(s)
            .map_err(|_| anyhow!(toml_err).context("unsupported engine config format")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phrases::PhraseTier;
    use std::env;

    #[test]
    fn every_preset_parses_and_validates() {
        for p in Preset::ALL {
            let cfg = p.config();
            assert!(cfg.validate().is_ok(), "{} failed validation", p.name());
            assert_eq!(Preset::from_name(p.name()), Some(p));
        }
        assert_eq!(Preset::from_name("Five-Way"), Some(Preset::FiveWay));
        assert_eq!(Preset::from_name("nope"), None);
    }

    #[test]
    fn balanced_preset_matches_defaults() {
        assert_eq!(Preset::Balanced.config(), EngineConfig::default());
    }

    #[test]
    fn presets_differ_where_it_matters() {
        let cautious = Preset::Cautious.config();
        assert!(cautious.thresholds.positive > -cautious.thresholds.negative);
        assert!(Preset::FiveWay.config().thresholds.is_five_way());
        assert_eq!(
            Preset::Gatekeeper.config().phrases.tier,
            PhraseTier::ShortCircuit
        );
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg = parse_config(
            r#"
parallel_threshold = 8

[lexicon]
great = 2
bad = -2

[thresholds]
positive = 0.3
negative = -0.3
"#,
            "toml",
        )
        .unwrap();
        assert_eq!(cfg.parallel_threshold, 8);
        assert_eq!(cfg.lexicon.len(), 2);
        assert_eq!(cfg.lexicon.weight("great"), Some(2.0));
        assert_eq!(cfg.negation, NegationConfig::default());
        assert_eq!(cfg.context, ContextConfig::default());
        assert!(cfg.jitter.is_none());
    }

    #[test]
    fn json_config_parses() {
        let cfg = parse_config(
            r#"{"thresholds":{"positive":0.5,"negative":-0.1},"jitter":{"amplitude":0.05,"seed":7}}"#,
            "json",
        )
        .unwrap();
        assert_eq!(cfg.thresholds.positive, 0.5);
        assert_eq!(cfg.jitter.unwrap().seed, 7);
        assert!(parse_config("not = [valid", "toml").is_err());
    }

    #[test]
    fn validation_catches_inconsistencies() {
        let mut cfg = EngineConfig::default();
        cfg.thresholds = Thresholds::three_way(-0.5, 0.5);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvertedThresholds { .. })
        ));

        let mut cfg = EngineConfig::default();
        cfg.negation.window = 5;
        assert_eq!(cfg.validate(), Err(ConfigError::NegationWindow(5)));

        let mut cfg = EngineConfig::default();
        cfg.lexicon = Lexicon::from_pairs([("odd", f64::INFINITY)]);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::LexiconWeight { .. })
        ));
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        // Isolate CWD so the repo's own config/ is not picked up
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var(ENV_PRESET);

        // Nothing on disk → balanced preset
        let cfg = load_config_default().unwrap();
        assert_eq!(cfg, EngineConfig::default());

        // Preset env var
        env::set_var(ENV_PRESET, "cautious");
        assert_eq!(load_config_default().unwrap(), Preset::Cautious.config());

        // config/engine.toml beats the preset
        fs::create_dir_all(tmp.path().join("config")).unwrap();
        fs::write(
            tmp.path().join(DEFAULT_CONFIG_TOML),
            "[thresholds]\npositive = 0.4\nnegative = -0.4\n",
        )
        .unwrap();
        assert_eq!(load_config_default().unwrap().thresholds.positive, 0.4);
        env::remove_var(ENV_PRESET);

        // Explicit path wins
        let p_json = tmp.path().join("engine.json");
        fs::write(&p_json, r#"{"parallel_threshold": 3}"#).unwrap();
        env::set_var(ENV_CONFIG_PATH, p_json.display().to_string());
        assert_eq!(load_config_default().unwrap().parallel_threshold, 3);

        // ...and must exist
        env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml"));
        assert!(load_config_default().is_err());
        env::remove_var(ENV_CONFIG_PATH);

        env::set_current_dir(&old).unwrap();
    }
}

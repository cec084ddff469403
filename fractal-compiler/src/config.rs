//! JSON configuration. Every field has a default, so `{}` is a valid config.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FractalError, Result};
use crate::registry::{OperatorSpec, Registry};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub generator: GeneratorConfig,
    pub probe: ProbeConfig,
    pub search: SearchConfig,
    pub cycle: CycleConfig,
    pub shader: ShaderConfig,
    pub operators: OperatorsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// RNG seed; entropy-seeded when absent.
    pub seed: Option<u64>,
    /// Complexity at the root of each candidate.
    pub complexity: f64,
    /// Drop-off used by one-shot generation.
    pub drop_off: f64,
    /// Drop-off used when the cycle regenerates a formula.
    pub regen_drop_off: f64,
    pub literal_min: f64,
    pub literal_max: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: None,
            complexity: 1.0,
            drop_off: 0.9,
            regen_drop_off: 0.85,
            literal_min: -3.0,
            literal_max: 3.0,
        }
    }
}

impl GeneratorConfig {
    /// Check the generation parameters.
    ///
    /// Drop-offs must be strictly below 1: at 1.0 a root complexity of 1.0
    /// never decays and generation would not terminate.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("drop_off", self.drop_off), ("regen_drop_off", self.regen_drop_off)] {
            check_drop_off(name, value)?;
        }
        if !(0.0..=1.0).contains(&self.complexity) {
            return Err(FractalError::config(format!(
                "generator.complexity must be in [0, 1], got {}",
                self.complexity
            )));
        }
        if !(self.literal_min < self.literal_max) {
            return Err(FractalError::config(format!(
                "generator literal range [{}, {}] is empty",
                self.literal_min, self.literal_max
            )));
        }
        Ok(())
    }
}

/// Reject drop-offs outside the open interval (0, 1).
pub fn check_drop_off(name: &str, value: f64) -> Result<()> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(FractalError::config(format!(
            "generator.{name} must be in (0, 1), got {value}"
        )))
    }
}

/// When a candidate counts as boring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoringPolicy {
    /// Reject only if every checkpoint came out constant.
    #[default]
    All,
    /// Reject as soon as one checkpoint comes out constant.
    Any,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Mix values to render and inspect, in order.
    pub checkpoints: Vec<f32>,
    /// Random interior pixels read in addition to the anchor.
    pub samples: usize,
    /// Alpha below this marks a NaN/Inf pixel.
    pub alpha_threshold: f32,
    pub boring_policy: BoringPolicy,
    /// Seed for pixel sampling; entropy-seeded when absent.
    pub seed: Option<u64>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            checkpoints: vec![0.5, 1.0],
            samples: 10,
            alpha_threshold: 0.2,
            boring_policy: BoringPolicy::All,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Candidates tried per cycle before keeping the current formula. 0 = unbounded.
    pub max_attempts: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { max_attempts: 256 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Accumulator units per second of (clamped) frame time.
    pub speed: f32,
    /// Largest frame delta counted, in seconds.
    pub max_step: f32,
    pub initial_last: String,
    pub initial_current: String,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            speed: 0.5,
            max_step: 1.0 / 60.0,
            initial_last: "mandelbrot(z, c)".to_string(),
            initial_current: "burning_ship(z, c)".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    pub max_iter: u32,
    pub escape_radius: f32,
    /// Half-height of the visible complex-plane window.
    pub zoom: f32,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            max_iter: 100,
            escape_radius: 10.0,
            zoom: 1.7,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorsConfig {
    /// Drop the standard catalog and use only `extra`.
    pub replace_standard: bool,
    pub extra: Vec<OperatorSpec>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.generator.validate()?;

        let p = &self.probe;
        if p.checkpoints.is_empty() {
            return Err(FractalError::config("probe.checkpoints must not be empty"));
        }
        if let Some(bad) = p.checkpoints.iter().find(|m| !(0.0..=1.0).contains(*m)) {
            return Err(FractalError::config(format!(
                "probe checkpoint {bad} is outside [0, 1]"
            )));
        }
        if p.samples == 0 {
            return Err(FractalError::config("probe.samples must be at least 1"));
        }
        if !(0.0..=1.0).contains(&p.alpha_threshold) {
            return Err(FractalError::config(format!(
                "probe.alpha_threshold must be in [0, 1], got {}",
                p.alpha_threshold
            )));
        }

        let c = &self.cycle;
        if !(c.speed > 0.0) || !(c.max_step > 0.0) {
            return Err(FractalError::config("cycle.speed and cycle.max_step must be positive"));
        }

        let s = &self.shader;
        if s.max_iter == 0 || !(s.escape_radius > 0.0) || !(s.zoom > 0.0) {
            return Err(FractalError::config(
                "shader.max_iter, escape_radius and zoom must be positive",
            ));
        }

        if self.operators.replace_standard && self.operators.extra.is_empty() {
            return Err(FractalError::config(
                "operators.replace_standard needs at least one extra operator",
            ));
        }
        Ok(())
    }

    /// Build the operator registry this config describes.
    pub fn registry(&self) -> Result<Registry> {
        let mut builder = Registry::builder();
        if !self.operators.replace_standard {
            builder = builder.with_standard()?;
        }
        for spec in &self.operators.extra {
            builder.add_spec(spec)?;
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn empty_object_gives_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.probe.checkpoints, vec![0.5, 1.0]);
        assert_eq!(config.probe.samples, 10);
        assert_eq!(config.generator.regen_drop_off, 0.85);
        assert_eq!(config.cycle.initial_last, "mandelbrot(z, c)");
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let config = Config::from_json(
            r#"{ "probe": { "checkpoints": [0.001, 0.5, 1.0], "boring_policy": "any" },
                 "search": { "max_attempts": 0 } }"#,
        )
        .unwrap();
        assert_eq!(config.probe.checkpoints, vec![0.001, 0.5, 1.0]);
        assert_eq!(config.probe.boring_policy, BoringPolicy::Any);
        assert_eq!(config.probe.alpha_threshold, 0.2);
        assert_eq!(config.search.max_attempts, 0);
    }

    #[test]
    fn invalid_values_are_rejected() {
        for json in [
            r#"{ "probe": { "checkpoints": [] } }"#,
            r#"{ "probe": { "checkpoints": [1.5] } }"#,
            r#"{ "generator": { "drop_off": 1.2 } }"#,
            r#"{ "generator": { "drop_off": 1.0 } }"#,
            r#"{ "generator": { "regen_drop_off": 1.0 } }"#,
            r#"{ "generator": { "drop_off": 0.0 } }"#,
            r#"{ "generator": { "complexity": 1.5 } }"#,
            r#"{ "generator": { "complexity": -0.1 } }"#,
            r#"{ "probe": { "samples": 0 } }"#,
            r#"{ "generator": { "literal_min": 3.0, "literal_max": -3.0 } }"#,
            r#"{ "shader": { "max_iter": 0 } }"#,
            r#"{ "operators": { "replace_standard": true } }"#,
        ] {
            let err = Config::from_json(json).unwrap_err();
            assert!(err.is_configuration(), "{json}: {err}");
        }
    }

    #[test]
    fn generator_checks_catch_non_terminating_settings() {
        let mut generator = GeneratorConfig::default();
        assert!(generator.validate().is_ok());

        generator.complexity = f64::NAN;
        assert!(generator.validate().unwrap_err().is_configuration());

        generator.complexity = 1.0;
        generator.regen_drop_off = 1.0;
        assert!(generator.validate().unwrap_err().is_configuration());

        assert!(check_drop_off("drop_off", 0.999).is_ok());
        assert!(check_drop_off("drop_off", f64::NAN).is_err());
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        let err = Config::from_json("{ nope").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Json(_)));
    }

    #[test]
    fn extra_operators_extend_the_catalog() {
        let config = Config::from_json(
            r#"{ "operators": { "extra": [
                { "name": "conj", "inputs": ["complex"], "output": "complex",
                  "template": "({0} * vec2f(1.0, -1.0))" }
            ] } }"#,
        )
        .unwrap();
        let registry = config.registry().unwrap();
        assert_eq!(registry.len(), 30);
        assert!(registry.get("conj").is_some());
    }

    #[test]
    fn replacing_the_catalog_still_requires_full_coverage() {
        let config = Config::from_json(
            r#"{ "operators": { "replace_standard": true, "extra": [
                { "name": "mag", "inputs": ["complex"], "output": "float", "template": "length({0})" }
            ] } }"#,
        )
        .unwrap();
        let err = config.registry().unwrap_err();
        assert!(matches!(err.kind, ErrorKind::MissingOperator(_)));
    }
}

//! WASM bindings for the fractal formula generator.
//!
//! Shader compilation and probing stay on the JavaScript side (WebGPU); these
//! functions hand it formulas and complete shader sources.
//! Build with: `wasm-pack build --target web --features wasm`

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::config::{GeneratorConfig, ShaderConfig};
use crate::formula::Formula;
use crate::registry::Registry;

#[derive(Serialize)]
struct RandomFormula {
    notation: String,
    formula: String,
}

fn standard() -> Result<Registry, JsError> {
    Registry::standard().map_err(|e| JsError::new(&e.to_string()))
}

/// Generate a random Complex formula from `seed`.
///
/// Returns `{ notation, formula }`: the op-call notation and the WGSL
/// expression to splice into `fractal_a` / `fractal_b`.
#[wasm_bindgen]
pub fn random_formula(seed: u32, drop_off: f64) -> Result<JsValue, JsError> {
    let registry = standard()?;
    let config = GeneratorConfig {
        seed: Some(seed as u64),
        drop_off,
        ..Default::default()
    };
    let (notation, formula) =
        crate::random_formula(&registry, &config).map_err(|e| JsError::new(&e.to_string()))?;
    let out = RandomFormula {
        notation,
        formula: formula.into_string(),
    };
    serde_wasm_bindgen::to_value(&out).map_err(|e| JsError::new(&e.to_string()))
}

/// Parse op-call notation into a WGSL formula, or throw with the error position.
#[wasm_bindgen]
pub fn formula_from_notation(source: &str) -> Result<String, JsError> {
    let registry = standard()?;
    crate::formula_from_notation(source, &registry)
        .map(Formula::into_string)
        .map_err(|e| JsError::new(&e.to_string()))
}

/// Build the complete WGSL shader for two already-rendered formulas.
///
/// `options` is an optional `{ max_iter, escape_radius, zoom }` object.
#[wasm_bindgen]
pub fn fractal_shader(fractal_a: &str, fractal_b: &str, options: JsValue) -> Result<String, JsError> {
    let options: ShaderConfig = if options.is_undefined() || options.is_null() {
        ShaderConfig::default()
    } else {
        serde_wasm_bindgen::from_value(options).map_err(|e| JsError::new(&e.to_string()))?
    };
    Ok(crate::shader::fractal_shader(
        &Formula::from(fractal_a),
        &Formula::from(fractal_b),
        &options,
    ))
}

pub mod config;
pub mod cycle;
pub mod error;
pub mod expr;
pub mod formula;
pub mod generator;
pub mod lexer;
pub mod parser;
pub mod probe;
pub mod registry;
pub mod search;
pub mod shader;
pub mod sketch;
pub mod token;
pub mod types;

#[cfg(feature = "gpu")]
pub mod gpu;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use config::Config;
pub use error::{ErrorKind, FractalError, Result};
pub use expr::Expr;
pub use formula::Formula;
pub use generator::Generator;
pub use registry::Registry;
pub use types::ValueType;

use config::{GeneratorConfig, ShaderConfig};

/// Generate one random Complex formula, rendered for the shader.
///
/// Returns the op-call notation alongside the formula so callers can show
/// or re-parse it. Settings that would not terminate are rejected.
pub fn random_formula(registry: &Registry, config: &GeneratorConfig) -> Result<(String, Formula)> {
    config.validate()?;
    let mut gen = Generator::from_config(registry, config);
    let tree = gen.generate(ValueType::Complex, config.complexity);
    Ok((tree.to_string(), formula::render_for_shader(&tree)))
}

/// Parse op-call notation into a shader formula. The root must be Complex.
pub fn formula_from_notation(source: &str, registry: &Registry) -> Result<Formula> {
    let tree = parser::parse_typed(source, registry, ValueType::Complex)?;
    Ok(formula::render_for_shader(&tree))
}

/// Build the full WGSL shader blending two notation formulas.
pub fn shader_from_notation(a: &str, b: &str, registry: &Registry, options: &ShaderConfig) -> Result<String> {
    let fa = formula_from_notation(a, registry)?;
    let fb = formula_from_notation(b, registry)?;
    Ok(shader::fractal_shader(&fa, &fb, options))
}

use std::fmt;

use serde::{Deserialize, Serialize};

/// The two value types a fractal formula can compute with.
///
/// Complex numbers are carried as `vec2f` in the shader (x = real, y = imaginary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Float,
    Complex,
}

impl ValueType {
    pub const ALL: [ValueType; 2] = [ValueType::Float, ValueType::Complex];

    /// The WGSL type this value is represented as.
    pub fn wgsl(self) -> &'static str {
        match self {
            ValueType::Float => "f32",
            ValueType::Complex => "vec2f",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Float => write!(f, "float"),
            ValueType::Complex => write!(f, "complex"),
        }
    }
}

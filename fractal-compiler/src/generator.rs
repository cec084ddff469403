//! Random well-typed expression generation.
//!
//! Each level either stops with a terminal (with probability `1 - complexity`)
//! or picks an operator producing the requested type and recurses into its
//! inputs with `complexity * drop_off`. Complexity decays geometrically, so
//! trees terminate with probability 1 for any `drop_off < 1`.

use crate::config::GeneratorConfig;
use crate::expr::{Expr, Param};
use crate::registry::Registry;
use crate::types::ValueType;

pub const DEFAULT_DROP_OFF: f64 = 0.9;

pub struct Generator<'r> {
    registry: &'r Registry,
    rng: fastrand::Rng,
    drop_off: f64,
    literal_min: f64,
    literal_max: f64,
}

impl<'r> Generator<'r> {
    /// Generator with default settings and an entropy-seeded RNG.
    pub fn new(registry: &'r Registry) -> Self {
        Self::from_config(registry, &GeneratorConfig::default())
    }

    pub fn from_config(registry: &'r Registry, config: &GeneratorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        Self {
            registry,
            rng,
            drop_off: config.drop_off,
            literal_min: config.literal_min,
            literal_max: config.literal_max,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self
    }

    pub fn with_drop_off(mut self, drop_off: f64) -> Self {
        self.drop_off = drop_off;
        self
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn drop_off(&self) -> f64 {
        self.drop_off
    }

    /// Generate a tree of type `output` using the configured drop-off.
    pub fn generate(&mut self, output: ValueType, complexity: f64) -> Expr<'r> {
        self.generate_with(output, complexity, self.drop_off)
    }

    /// Generate a tree of type `output`, decaying complexity by `drop_off` per level.
    pub fn generate_with(&mut self, output: ValueType, complexity: f64, drop_off: f64) -> Expr<'r> {
        if complexity <= 0.0 || self.rng.f64() > complexity {
            return self.terminal(output);
        }

        let registry = self.registry;
        let candidates = registry.lookup(output);
        if candidates.is_empty() {
            // Unreachable for a registry that passed `build`.
            return self.terminal(output);
        }
        let op = &candidates[self.rng.usize(..candidates.len())];
        let args = op
            .inputs()
            .iter()
            .map(|&ty| self.generate_with(ty, complexity * drop_off, drop_off))
            .collect();
        Expr::Apply { op, args }
    }

    fn terminal(&mut self, output: ValueType) -> Expr<'r> {
        match output {
            ValueType::Float => {
                let raw = self.literal_min + self.rng.f64() * (self.literal_max - self.literal_min);
                Expr::literal(round_one_decimal(raw))
            }
            ValueType::Complex => Expr::param(Param::ALL[self.rng.usize(..Param::ALL.len())]),
        }
    }
}

/// Round to one decimal place, folding `-0.0` into `0.0`.
fn round_one_decimal(value: f64) -> f64 {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Terminal;
    use crate::types::ValueType::{Complex, Float};

    fn minimal_registry() -> Registry {
        Registry::builder()
            .op("add_f", &[Float, Float], Float, "({0} + {1})")
            .unwrap()
            .op("create_cx", &[Float, Float], Complex, "vec2f({0}, {1})")
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn zero_complexity_always_terminates() {
        let registry = Registry::standard().unwrap();
        let mut gen = Generator::new(&registry).with_seed(7);
        for _ in 0..200 {
            for ty in ValueType::ALL {
                let tree = gen.generate(ty, 0.0);
                assert!(tree.is_terminal());
                assert_eq!(tree.value_type(), ty);
                assert!(gen.generate(ty, -1.0).is_terminal());
            }
        }
    }

    #[test]
    fn generated_trees_are_well_typed() {
        let registry = Registry::standard().unwrap();
        for seed in 0..300 {
            let mut gen = Generator::new(&registry).with_seed(seed);
            for ty in ValueType::ALL {
                let tree = gen.generate_with(ty, 1.0, 0.85);
                assert_eq!(tree.value_type(), ty, "seed {seed}: {tree}");
                tree.check().unwrap_or_else(|e| panic!("seed {seed}: {tree}: {e}"));
            }
        }
    }

    #[test]
    fn minimal_registry_terminates_with_bounded_depth() {
        let registry = minimal_registry();
        for seed in 0..50 {
            let mut gen = Generator::new(&registry).with_seed(seed).with_drop_off(0.9);
            let tree = gen.generate(Complex, 1.0);
            assert_eq!(tree.value_type(), Complex);
            tree.check().unwrap();
            assert!(tree.depth() <= 24, "seed {seed}: depth {}", tree.depth());
        }
    }

    #[test]
    fn full_complexity_root_is_an_application() {
        // r is drawn from [0, 1), so r > 1.0 never holds.
        let registry = minimal_registry();
        let mut gen = Generator::new(&registry).with_seed(3);
        let tree = gen.generate(Complex, 1.0);
        assert!(matches!(tree, Expr::Apply { op, .. } if op.name() == "create_cx"));
    }

    #[test]
    fn literals_are_bounded_and_rounded() {
        let registry = Registry::standard().unwrap();
        let mut gen = Generator::new(&registry).with_seed(11);
        for _ in 0..1000 {
            match gen.generate(Float, 0.0) {
                Expr::Terminal(Terminal::Literal(v)) => {
                    assert!((-3.0..=3.0).contains(&v), "{v}");
                    assert!(((v * 10.0).round() - v * 10.0).abs() < 1e-9, "{v}");
                    assert!(!(v == 0.0 && v.is_sign_negative()));
                }
                other => panic!("expected literal, got {other}"),
            }
        }
    }

    #[test]
    fn complex_terminals_use_both_parameters() {
        let registry = Registry::standard().unwrap();
        let mut gen = Generator::new(&registry).with_seed(5);
        let mut seen = [false; 2];
        for _ in 0..100 {
            match gen.generate(Complex, 0.0) {
                Expr::Terminal(Terminal::Param(Param::Z)) => seen[0] = true,
                Expr::Terminal(Terminal::Param(Param::C)) => seen[1] = true,
                other => panic!("expected parameter, got {other}"),
            }
        }
        assert_eq!(seen, [true, true]);
    }

    #[test]
    fn same_seed_same_tree() {
        let registry = Registry::standard().unwrap();
        let a = Generator::new(&registry).with_seed(42).generate(Complex, 1.0).to_string();
        let b = Generator::new(&registry).with_seed(42).generate(Complex, 1.0).to_string();
        assert_eq!(a, b);
    }

    #[test]
    fn rounding_folds_negative_zero() {
        assert_eq!(round_one_decimal(-0.04).to_bits(), 0.0f64.to_bits());
        assert_eq!(round_one_decimal(2.96), 3.0);
        assert_eq!(round_one_decimal(-1.25), -1.3);
    }
}

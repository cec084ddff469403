//! Rendering expression trees into formula text.

use std::fmt;

use crate::expr::{Expr, Terminal};

/// Name of the identity function the shader prelude defines for runtime literals.
pub const RUNTIME_LITERAL_FN: &str = "rt";

/// A rendered formula: one iteration step over `z` and `c`, as shader code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Formula(String);

impl Formula {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Formula {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// How float literals are emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LiteralStyle {
    /// The literal token as-is: `1.5`.
    #[default]
    Verbatim,
    /// Wrapped in the prelude's identity call: `rt(1.5)`. Keeps literal-only
    /// subtrees out of WGSL constant evaluation, which rejects non-finite results.
    Runtime,
}

/// Render a tree with verbatim literals.
pub fn render(expr: &Expr<'_>) -> String {
    render_with(expr, LiteralStyle::Verbatim)
}

/// Render a tree for splicing into the fractal shader.
pub fn render_for_shader(expr: &Expr<'_>) -> Formula {
    Formula(render_with(expr, LiteralStyle::Runtime))
}

pub fn render_with(expr: &Expr<'_>, style: LiteralStyle) -> String {
    match expr {
        Expr::Terminal(t @ Terminal::Literal(_)) => match style {
            LiteralStyle::Verbatim => t.token(),
            LiteralStyle::Runtime => format!("{RUNTIME_LITERAL_FN}({})", t.token()),
        },
        Expr::Terminal(t) => t.token(),
        Expr::Apply { op, args } => {
            let inputs: Vec<String> = args.iter().map(|a| render_with(a, style)).collect();
            op.apply(&inputs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Param;
    use crate::generator::Generator;
    use crate::registry::Registry;
    use crate::types::ValueType::{Complex, Float};

    #[test]
    fn depth_two_tree_renders_exactly() {
        let registry = Registry::builder()
            .op("add_f", &[Float, Float], Float, "({0} + {1})")
            .unwrap()
            .op("sqr_f", &[Float], Float, "({0} * {0})")
            .unwrap()
            .op("param_x", &[], Float, "x")
            .unwrap()
            .op("create_cx", &[Float, Float], Complex, "vec2f({0}, {1})")
            .unwrap()
            .build()
            .unwrap();
        let x = Expr::apply(registry.get("param_x").unwrap(), vec![]).unwrap();
        let sqr = Expr::apply(registry.get("sqr_f").unwrap(), vec![x]).unwrap();
        let tree = Expr::apply(registry.get("add_f").unwrap(), vec![sqr, Expr::literal(1.0)]).unwrap();
        assert_eq!(render(&tree), "((x * x) + 1.0)");
    }

    #[test]
    fn standard_ops_render_post_order() {
        let registry = Registry::standard().unwrap();
        let op = |name: &str| registry.get(name).unwrap();
        let tree = Expr::apply(
            op("add_cx"),
            vec![
                Expr::apply(op("mul_cx"), vec![Expr::param(Param::Z), Expr::param(Param::Z)]).unwrap(),
                Expr::apply(
                    op("create_cx"),
                    vec![
                        Expr::apply(op("real"), vec![Expr::param(Param::C)]).unwrap(),
                        Expr::literal(-0.5),
                    ],
                )
                .unwrap(),
            ],
        )
        .unwrap();
        assert_eq!(render(&tree), "(cx_mul(z, z) + vec2f(c.x, -0.5))");
        assert_eq!(
            render_for_shader(&tree).as_str(),
            "(cx_mul(z, z) + vec2f(c.x, rt(-0.5)))"
        );
    }

    #[test]
    fn terminals_render_verbatim() {
        assert_eq!(render(&Expr::param(Param::Z)), "z");
        assert_eq!(render(&Expr::literal(2.0)), "2.0");
    }

    fn balanced(text: &str) -> bool {
        let mut depth = 0i32;
        for ch in text.chars() {
            match ch {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth < 0 {
                        return false;
                    }
                }
                _ => {}
            }
        }
        depth == 0
    }

    #[test]
    fn random_formulas_nest_safely() {
        let registry = Registry::standard().unwrap();
        let mut gen = Generator::new(&registry).with_seed(99);
        let sub = registry.get("sub_cx").unwrap();
        for _ in 0..200 {
            let a = gen.generate(Complex, 1.0);
            let b = gen.generate(Complex, 1.0);
            let (ra, rb) = (render(&a), render(&b));
            assert!(balanced(&ra), "{ra}");
            let nested = Expr::apply(sub, vec![a, b]).unwrap();
            assert_eq!(render(&nested), format!("({ra} - {rb})"));
        }
    }
}

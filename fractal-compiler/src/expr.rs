//! Typed expression trees.
//!
//! A tree is built bottom-up once (by the generator or the notation parser),
//! never mutated, and dropped after it has been rendered to a formula.

use std::fmt;

use crate::error::{ErrorKind, Result};
use crate::registry::Operator;
use crate::types::ValueType;

/// The two free parameters of a fractal iteration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    /// The current point of the orbit.
    Z,
    /// The constant, i.e. the pixel's position in the complex plane.
    C,
}

impl Param {
    pub const ALL: [Param; 2] = [Param::Z, Param::C];

    pub fn name(self) -> &'static str {
        match self {
            Param::Z => "z",
            Param::C => "c",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "z" => Some(Param::Z),
            "c" => Some(Param::C),
            _ => None,
        }
    }
}

/// A leaf: a float literal or one of the complex parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Terminal {
    Literal(f64),
    Param(Param),
}

impl Terminal {
    pub fn value_type(&self) -> ValueType {
        match self {
            Terminal::Literal(_) => ValueType::Float,
            Terminal::Param(_) => ValueType::Complex,
        }
    }

    /// The literal's token or the parameter's name. Whole literals keep a
    /// trailing `.0` so they stay float-typed in WGSL.
    pub fn token(&self) -> String {
        match self {
            Terminal::Literal(v) if v.fract() == 0.0 => format!("{v:.1}"),
            Terminal::Literal(v) => format!("{v}"),
            Terminal::Param(p) => p.name().to_string(),
        }
    }
}

/// An expression node: a terminal, or an operator applied to one child per input.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr<'r> {
    Terminal(Terminal),
    Apply {
        op: &'r Operator,
        args: Vec<Expr<'r>>,
    },
}

impl<'r> Expr<'r> {
    pub fn literal(value: f64) -> Self {
        Expr::Terminal(Terminal::Literal(value))
    }

    pub fn param(param: Param) -> Self {
        Expr::Terminal(Terminal::Param(param))
    }

    /// Apply `op` to `args`, checking arity and slot types.
    pub fn apply(op: &'r Operator, args: Vec<Expr<'r>>) -> Result<Self> {
        if args.len() != op.arity() {
            return Err(ErrorKind::ArityMismatch {
                op: op.name().to_string(),
                expected: op.arity(),
                got: args.len(),
            }
            .into());
        }
        for (i, (arg, expected)) in args.iter().zip(op.inputs()).enumerate() {
            if arg.value_type() != *expected {
                return Err(ErrorKind::TypeMismatch {
                    context: format!("argument {i} of '{}'", op.name()),
                    expected: *expected,
                    got: arg.value_type(),
                }
                .into());
            }
        }
        Ok(Expr::Apply { op, args })
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Expr::Terminal(t) => t.value_type(),
            Expr::Apply { op, .. } => op.output(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Expr::Terminal(_))
    }

    /// Number of nodes on the longest root-to-leaf path (a terminal has depth 1).
    pub fn depth(&self) -> usize {
        match self {
            Expr::Terminal(_) => 1,
            Expr::Apply { args, .. } => 1 + args.iter().map(Expr::depth).max().unwrap_or(0),
        }
    }

    pub fn node_count(&self) -> usize {
        match self {
            Expr::Terminal(_) => 1,
            Expr::Apply { args, .. } => 1 + args.iter().map(Expr::node_count).sum::<usize>(),
        }
    }

    /// Re-verify the whole tree: every child matches its operator's slot type.
    pub fn check(&self) -> Result<()> {
        if let Expr::Apply { op, args } = self {
            if args.len() != op.arity() {
                return Err(ErrorKind::ArityMismatch {
                    op: op.name().to_string(),
                    expected: op.arity(),
                    got: args.len(),
                }
                .into());
            }
            for (i, (arg, expected)) in args.iter().zip(op.inputs()).enumerate() {
                if arg.value_type() != *expected {
                    return Err(ErrorKind::TypeMismatch {
                        context: format!("argument {i} of '{}'", op.name()),
                        expected: *expected,
                        got: arg.value_type(),
                    }
                    .into());
                }
                arg.check()?;
            }
        }
        Ok(())
    }
}

/// Op-call notation, e.g. `add_cx(sqr_cx(z), c)`. Parsed back by [`crate::parser`].
impl fmt::Display for Expr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Terminal(t) => write!(f, "{}", t.token()),
            Expr::Apply { op, args } => {
                write!(f, "{}(", op.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    #[test]
    fn apply_checks_slot_types() {
        let registry = Registry::standard().unwrap();
        let add = registry.get("add_f").unwrap();
        let err = Expr::apply(add, vec![Expr::literal(1.0), Expr::param(Param::Z)]).unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::TypeMismatch { expected: ValueType::Float, got: ValueType::Complex, .. }
        ));

        let err = Expr::apply(add, vec![Expr::literal(1.0)]).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ArityMismatch { expected: 2, got: 1, .. }));
    }

    #[test]
    fn depth_and_count() {
        let registry = Registry::standard().unwrap();
        let sqr = registry.get("sqr_cx").unwrap();
        let add = registry.get("add_cx").unwrap();
        let tree = Expr::apply(
            add,
            vec![
                Expr::apply(sqr, vec![Expr::param(Param::Z)]).unwrap(),
                Expr::param(Param::C),
            ],
        )
        .unwrap();
        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.node_count(), 4);
        assert_eq!(tree.value_type(), ValueType::Complex);
        assert!(tree.check().is_ok());
        assert_eq!(tree.to_string(), "add_cx(sqr_cx(z), c)");
    }

    #[test]
    fn check_catches_hand_assembled_mistakes() {
        let registry = Registry::standard().unwrap();
        let real = registry.get("real").unwrap();
        let bad = Expr::Apply {
            op: real,
            args: vec![Expr::literal(2.0)],
        };
        assert!(bad.check().is_err());
    }

    #[test]
    fn literal_tokens_stay_floats() {
        assert_eq!(Terminal::Literal(1.0).token(), "1.0");
        assert_eq!(Terminal::Literal(-3.0).token(), "-3.0");
        assert_eq!(Terminal::Literal(-2.5).token(), "-2.5");
        assert_eq!(Terminal::Literal(0.25).token(), "0.25");
        assert_eq!(Terminal::Param(Param::C).token(), "c");
    }
}

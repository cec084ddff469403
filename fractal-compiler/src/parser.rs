use std::ops::Range;

use crate::error::{ErrorKind, FractalError, Result};
use crate::expr::{Expr, Param};
use crate::lexer;
use crate::registry::{Operator, Registry};
use crate::token::{Spanned, Token};
use crate::types::ValueType;

/// Deepest call nesting accepted before the parser gives up.
pub const MAX_NESTING: usize = 256;

/// Recursive descent parser for op-call notation.
///
/// Grammar:
/// ```text
/// expr := NUMBER | IDENT | IDENT '(' [expr (',' expr)*] ')'
/// ```
/// A bare identifier is `z`, `c`, or a zero-input operator. Every
/// application is type-checked against the registry as it is built.
/// Calls nested deeper than [`MAX_NESTING`] are rejected.
pub struct Parser<'r> {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
    registry: &'r Registry,
}

impl<'r> Parser<'r> {
    pub fn new(tokens: Vec<Spanned>, registry: &'r Registry) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            registry,
        }
    }

    // ── Helpers ────────────────────────────────────────────────────────

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: &Token) -> Result<Range<usize>> {
        match self.tokens.get(self.pos) {
            Some(s) if &s.token == expected => {
                self.pos += 1;
                Ok(s.span.clone())
            }
            Some(s) => Err(FractalError::unexpected_token(
                expected.describe(),
                s.token.describe(),
                s.span.clone(),
            )),
            None => Err(FractalError::unexpected_eof(expected.describe())),
        }
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    // ── Top-level ──────────────────────────────────────────────────────

    /// Parse exactly one expression spanning the whole input.
    pub fn parse(&mut self) -> Result<Expr<'r>> {
        let (expr, _) = self.parse_expr()?;
        if let Some(s) = self.tokens.get(self.pos) {
            return Err(FractalError::unexpected_token(
                "end of input",
                s.token.describe(),
                s.span.clone(),
            ));
        }
        Ok(expr)
    }

    fn parse_expr(&mut self) -> Result<(Expr<'r>, Range<usize>)> {
        let Some(first) = self.advance() else {
            return Err(FractalError::unexpected_eof("expression"));
        };

        match first.token {
            Token::Number(value) => Ok((Expr::literal(value), first.span)),
            Token::Ident(name) if self.at(&Token::LParen) => self.parse_call(&name, first.span),
            Token::Ident(name) => {
                if let Some(param) = Param::from_name(&name) {
                    return Ok((Expr::param(param), first.span));
                }
                let registry = self.registry;
                match registry.get(&name) {
                    Some(op) if op.arity() == 0 => Ok((Expr::Apply { op, args: Vec::new() }, first.span)),
                    Some(op) => Err(FractalError::from(ErrorKind::ArityMismatch {
                        op: name,
                        expected: op.arity(),
                        got: 0,
                    })
                    .with_span(first.span)),
                    None => Err(FractalError::unknown_operator(&name).with_span(first.span)),
                }
            }
            other => Err(FractalError::unexpected_token(
                "expression",
                other.describe(),
                first.span,
            )),
        }
    }

    fn parse_call(&mut self, name: &str, name_span: Range<usize>) -> Result<(Expr<'r>, Range<usize>)> {
        let registry = self.registry;
        let op = registry
            .get(name)
            .ok_or_else(|| FractalError::unknown_operator(name).with_span(name_span.clone()))?;
        let open = self.expect(&Token::LParen)?;
        if self.depth >= MAX_NESTING {
            return Err(FractalError::unexpected_token(
                &format!("at most {MAX_NESTING} nested calls"),
                "'('",
                open,
            ));
        }

        self.depth += 1;
        let parsed = self.parse_args(name, op);
        self.depth -= 1;
        let args = parsed?;

        let close = self.expect(&Token::RParen)?;
        let span = name_span.start..close.end;

        if args.len() != op.arity() {
            return Err(FractalError::from(ErrorKind::ArityMismatch {
                op: name.to_string(),
                expected: op.arity(),
                got: args.len(),
            })
            .with_span(span));
        }
        Ok((Expr::Apply { op, args }, span))
    }

    fn parse_args(&mut self, name: &str, op: &'r Operator) -> Result<Vec<Expr<'r>>> {
        let mut args = Vec::new();
        if !self.at(&Token::RParen) {
            loop {
                let (arg, span) = self.parse_expr()?;
                if let Some(&expected) = op.inputs().get(args.len()) {
                    if arg.value_type() != expected {
                        return Err(FractalError::from(ErrorKind::TypeMismatch {
                            context: format!("argument {} of '{name}'", args.len()),
                            expected,
                            got: arg.value_type(),
                        })
                        .with_span(span));
                    }
                }
                args.push(arg);
                if self.at(&Token::Comma) {
                    self.pos += 1;
                } else {
                    break;
                }
            }
        }
        Ok(args)
    }
}

/// Parse notation into a tree, type-checked against `registry`.
pub fn parse<'r>(source: &str, registry: &'r Registry) -> Result<Expr<'r>> {
    let tokens = lexer::lex(source)?;
    Parser::new(tokens, registry).parse()
}

/// Parse notation and require the root to have type `expected`.
pub fn parse_typed<'r>(source: &str, registry: &'r Registry, expected: ValueType) -> Result<Expr<'r>> {
    let expr = parse(source, registry)?;
    if expr.value_type() != expected {
        return Err(FractalError::from(ErrorKind::TypeMismatch {
            context: "formula root".to_string(),
            expected,
            got: expr.value_type(),
        })
        .with_span(0..source.len()));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::render;
    use crate::generator::Generator;

    #[test]
    fn parse_mandelbrot_step() {
        let registry = Registry::standard().unwrap();
        let expr = parse("add_cx(sqr_cx(z), c)", &registry).unwrap();
        assert_eq!(expr.value_type(), ValueType::Complex);
        assert_eq!(render(&expr), "(cx_sqr(z) + c)");
    }

    #[test]
    fn parse_literals_and_whitespace() {
        let registry = Registry::standard().unwrap();
        let expr = parse(" create_cx( -0.5 ,\n real(z) ) ", &registry).unwrap();
        assert_eq!(render(&expr), "vec2f(-0.5, z.x)");
    }

    #[test]
    fn display_output_parses_back() {
        let registry = Registry::standard().unwrap();
        let mut gen = Generator::new(&registry).with_seed(17);
        for _ in 0..50 {
            let tree = gen.generate(ValueType::Complex, 1.0);
            let reparsed = parse(&tree.to_string(), &registry).unwrap();
            assert_eq!(reparsed, tree);
        }
    }

    #[test]
    fn type_mismatch_points_at_argument() {
        let registry = Registry::standard().unwrap();
        let err = parse("add_f(1.0, z)", &registry).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::TypeMismatch { .. }));
        assert_eq!(err.span, Some(11..12));
    }

    #[test]
    fn arity_mismatch_spans_the_call() {
        let registry = Registry::standard().unwrap();
        let err = parse("sqr_cx(z, c)", &registry).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ArityMismatch { expected: 1, got: 2, .. }));
        assert_eq!(err.span, Some(0..12));
    }

    #[test]
    fn unknown_names_are_reported() {
        let registry = Registry::standard().unwrap();
        let err = parse("mandelbrot(z, c)", &registry).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnknownOperator(ref n) if n == "mandelbrot"));
        assert_eq!(err.span, Some(0..10));

        let err = parse("w", &registry).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnknownOperator(_)));
    }

    #[test]
    fn trailing_and_missing_tokens() {
        let registry = Registry::standard().unwrap();
        assert!(matches!(
            parse("z c", &registry).unwrap_err().kind,
            ErrorKind::UnexpectedToken { .. }
        ));
        assert!(matches!(
            parse("add_cx(z,", &registry).unwrap_err().kind,
            ErrorKind::UnexpectedEof { .. }
        ));
        assert!(matches!(parse("", &registry).unwrap_err().kind, ErrorKind::UnexpectedEof { .. }));
    }

    fn nested(depth: usize) -> String {
        format!("{}z{}", "sqr_cx(".repeat(depth), ")".repeat(depth))
    }

    #[test]
    fn deep_nesting_is_an_error_not_a_crash() {
        let registry = Registry::standard().unwrap();
        let err = parse(&nested(5000), &registry).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnexpectedToken { .. }));
        // The opening paren of the first call past the limit.
        let open = "sqr_cx(".len() * (MAX_NESTING + 1) - 1;
        assert_eq!(err.span, Some(open..open + 1));
    }

    #[test]
    fn nesting_up_to_the_limit_parses() {
        let registry = Registry::standard().unwrap();
        let expr = parse(&nested(MAX_NESTING), &registry).unwrap();
        assert_eq!(expr.depth(), MAX_NESTING + 1);
        assert!(parse(&nested(MAX_NESTING + 1), &registry).is_err());
    }

    #[test]
    fn typed_parse_checks_root() {
        let registry = Registry::standard().unwrap();
        assert!(parse_typed("mag(z)", &registry, ValueType::Complex).is_err());
        assert!(parse_typed("abs_cx(z)", &registry, ValueType::Complex).is_ok());
    }
}

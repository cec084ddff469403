use logos::Logos;

use crate::error::{ErrorKind, FractalError, Result};
use crate::token::{Spanned, Token};

/// Tokenize notation source into a vector of spanned tokens.
pub fn lex(source: &str) -> Result<Vec<Spanned>> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => {
                tokens.push(Spanned { token, span });
            }
            Err(()) => {
                let fragment = &source[span.clone()];
                return Err(FractalError {
                    kind: ErrorKind::UnrecognizedToken(fragment.to_string()),
                    span: Some(span),
                });
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_nested_call() {
        let tokens = lex("add_cx(sqr_cx(z), create_cx(-0.5, 2))").expect("lexing should succeed");
        let kinds: Vec<_> = tokens.iter().map(|t| &t.token).collect();

        assert!(matches!(kinds[0], Token::Ident(s) if s == "add_cx"));
        assert_eq!(kinds[1], &Token::LParen);
        assert!(matches!(kinds[2], Token::Ident(s) if s == "sqr_cx"));
        assert_eq!(kinds[3], &Token::LParen);
        assert!(matches!(kinds[4], Token::Ident(s) if s == "z"));
        assert_eq!(kinds[5], &Token::RParen);
        assert_eq!(kinds[6], &Token::Comma);
        assert!(matches!(kinds[7], Token::Ident(s) if s == "create_cx"));
        assert_eq!(kinds[8], &Token::LParen);
        assert!(matches!(kinds[9], Token::Number(v) if (*v + 0.5).abs() < 1e-12));
        assert_eq!(kinds[10], &Token::Comma);
        assert!(matches!(kinds[11], Token::Number(v) if (*v - 2.0).abs() < 1e-12));
        assert_eq!(kinds[12], &Token::RParen);
        assert_eq!(kinds[13], &Token::RParen);
        assert_eq!(tokens.len(), 14);
    }

    #[test]
    fn lex_comments_are_skipped() {
        let tokens = lex("# burning ship\nabs_cx(z)").unwrap();
        assert!(matches!(&tokens[0].token, Token::Ident(s) if s == "abs_cx"));
        assert_eq!(tokens[0].span, 15..21);
    }

    #[test]
    fn lex_rejects_operators_symbols() {
        let err = lex("z + c").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnrecognizedToken(ref s) if s == "+"));
        assert_eq!(err.span, Some(2..3));
    }
}

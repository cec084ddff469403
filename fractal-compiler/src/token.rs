use logos::Logos;

/// Tokens of the op-call notation, e.g. `add_cx(sqr_cx(z), create_cx(-0.5, 1.0))`.
///
/// Operator names and parameters are both plain identifiers; the parser
/// tells them apart by the registry and by a following `(`.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+|#[^\n]*")]
pub enum Token {
    // ── Literals ───────────────────────────────────────────────────────
    #[regex(r"-?[0-9]+(\.[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| Some(lex.slice().to_string()))]
    Ident(String),

    // ── Punctuation ────────────────────────────────────────────────────
    #[token(",")]
    Comma,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
}

impl Token {
    /// Human-readable name for error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Token::Number(_) => "number",
            Token::Ident(_) => "identifier",
            Token::Comma => "','",
            Token::LParen => "'('",
            Token::RParen => "')'",
        }
    }
}

/// A token with its source location (byte offset span).
#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub span: std::ops::Range<usize>,
}

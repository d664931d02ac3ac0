//! Token definitions shared by the lexer and the evaluator.
use super::*;

/// Maximum number of bytes of source text held by a single token
pub const TOKEN_TEXT_MAX: usize = 32;
/// Maximum number of tokens in a single expression
pub const TOKENS_MAX: usize = 2048;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenType {
    /// whitespace; matched by the lexer but never emitted
    Blank,
    Decimal,
    Hex,
    Register,
    Add,
    Sub,
    Star, // multiplication until the classifier decides otherwise
    Div,
    LParen,
    RParen,
    Eq,
    Neq,
    And,
    Or,
    Not,
    /// unary minus (reclassified from Sub)
    Neg,
    /// pointer dereference (reclassified from Star)
    Deref,
}

impl TokenType {
    /// true if a token of this type ends an operand, i.e. a following '-' or '*' is binary
    pub fn is_value(&self) -> bool {
        matches!(
            self,
            TokenType::Decimal | TokenType::Hex | TokenType::Register | TokenType::RParen
        )
    }
    pub fn is_unary(&self) -> bool { matches!(self, TokenType::Neg | TokenType::Deref | TokenType::Not) }
    /// Binding strength of an operator; lower binds more loosely.
    /// Returns None for anything that isn't an operator.
    pub fn precedence(&self) -> Option<u8> {
        use TokenType::*;
        match self {
            Or => Some(1),
            And => Some(2),
            Eq | Neq => Some(3),
            Add | Sub => Some(4),
            Star | Div => Some(5),
            Neg | Deref | Not => Some(6),
            Blank | Decimal | Hex | Register | LParen | RParen => None,
        }
    }
}

/// A single lexical unit of an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub ttype: TokenType,
    /// raw source text that produced this token
    pub raw: String,
}
impl Token {
    pub fn new(ttype: TokenType, raw: &str) -> Self {
        Token {
            ttype,
            raw: raw.to_string(),
        }
    }
}
impl std::cmp::PartialEq<TokenType> for Token {
    fn eq(&self, other: &TokenType) -> bool { self.ttype == *other }
}
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{:?}\"{}\"", self.ttype, self.raw) }
}

//! Converts expression text into a sequence of classified tokens.
//!
//! The rule table is tried in order at every position and the first rule whose
//! pattern matches *at* the position wins. Order therefore encodes priority:
//! two-character operators come before any single-character rule sharing their
//! first character, and hex literals come before decimal literals.
use super::token::{Token, TokenType, TOKENS_MAX, TOKEN_TEXT_MAX};
use super::*;

use lazy_static::lazy_static;
use regex::Regex;

/// One entry in the lexical rule table.
pub struct Rule {
    pub re: Regex,
    pub ttype: TokenType,
}
impl Rule {
    fn new(pattern: &str, ttype: TokenType) -> Self {
        Rule {
            // every pattern is anchored so that it can only match at the scan position
            re: Regex::new(format!("^(?:{})", pattern).as_str()).unwrap(),
            ttype,
        }
    }
}

#[rustfmt::skip]
lazy_static! {
    static ref RULES: Vec<Rule> = vec![
        Rule::new(r"\s+",                  TokenType::Blank),
        Rule::new(r"==",                   TokenType::Eq),
        Rule::new(r"!=",                   TokenType::Neq),
        Rule::new(r"&&",                   TokenType::And),
        Rule::new(r"\|\|",                 TokenType::Or),
        Rule::new(r"!",                    TokenType::Not),
        Rule::new(r"\+",                   TokenType::Add),
        Rule::new(r"-",                    TokenType::Sub),
        Rule::new(r"\*",                   TokenType::Star),
        Rule::new(r"/",                    TokenType::Div),
        Rule::new(r"\(",                   TokenType::LParen),
        Rule::new(r"\)",                   TokenType::RParen),
        Rule::new(r"0[xX][0-9a-fA-F]+",    TokenType::Hex),
        Rule::new(r"[0-9]+",               TokenType::Decimal),
        Rule::new(r"\$[0-9a-zA-Z_]+",      TokenType::Register),
    ];
}

/// Compiles the rule table. Calling this is optional; the table is otherwise built on first use.
pub fn init() { lazy_static::initialize(&RULES); }

/// Tokenize the given string and return a Vec<Token>.
/// Fails with ErrorKind::Lex(position) at the first position no rule matches.
pub fn tokenize(input: &str) -> Result<Vec<Token>, Error> {
    let mut output = Vec::new();
    let mut position = 0usize;
    'scan: while position < input.len() {
        let rest = &input[position..];
        for (i, rule) in RULES.iter().enumerate() {
            if let Some(m) = rule.re.find(rest) {
                let text = m.as_str();
                verbose_println!(
                    "match rules[{}] = \"{}\" at position {} with len {}: {}",
                    i,
                    rule.re.as_str(),
                    position,
                    text.len(),
                    text
                );
                if rule.ttype != TokenType::Blank {
                    if text.len() > TOKEN_TEXT_MAX {
                        return Err(lex_err!(
                            position,
                            "token \"{}\" at position {} exceeds {} bytes",
                            text,
                            position,
                            TOKEN_TEXT_MAX
                        ));
                    }
                    if output.len() == TOKENS_MAX {
                        return Err(lex_err!(position, "expression exceeds {} tokens", TOKENS_MAX));
                    }
                    output.push(Token::new(rule.ttype, text));
                }
                position += text.len();
                continue 'scan;
            }
        }
        let caret = format!("{}^", " ".repeat(position));
        return Err(lex_err!(position, "no match at position {}\n{}\n{}", position, input, caret));
    }
    Ok(output)
}

/// Reclassifies '-' and '*' as unary negation and dereference wherever they
/// don't follow a value (a literal, a register or a closing parenthesis).
pub fn classify(tokens: &mut [Token]) {
    for i in 0..tokens.len() {
        if i > 0 && tokens[i - 1].ttype.is_value() {
            continue;
        }
        tokens[i].ttype = match tokens[i].ttype {
            TokenType::Sub => TokenType::Neg,
            TokenType::Star => TokenType::Deref,
            other => other,
        };
    }
}

/// tokenize followed by classify
pub fn lex(input: &str) -> Result<Vec<Token>, Error> {
    let mut tokens = tokenize(input)?;
    classify(&mut tokens);
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenType::*;
    fn types(tokens: &[Token]) -> Vec<TokenType> { tokens.iter().map(|t| t.ttype).collect() }

    #[test]
    fn simple_sum() -> Result<(), Error> {
        let tokens = tokenize("1+2*3")?;
        assert_eq!(types(&tokens), vec![Decimal, Add, Decimal, Star, Decimal]);
        assert_eq!(tokens[0].raw, "1");
        assert_eq!(tokens[4].raw, "3");
        Ok(())
    }
    #[test]
    fn whitespace_is_discarded() -> Result<(), Error> {
        let tokens = tokenize("  ( 0x1F\t+ $a0 )  ")?;
        assert_eq!(types(&tokens), vec![LParen, Hex, Add, Register, RParen]);
        assert_eq!(tokens[1].raw, "0x1F");
        assert_eq!(tokens[3].raw, "$a0");
        Ok(())
    }
    #[test]
    fn two_char_operators_win() -> Result<(), Error> {
        let tokens = tokenize("1==2!=!3&&4||5")?;
        assert_eq!(
            types(&tokens),
            vec![Decimal, Eq, Decimal, Neq, Not, Decimal, And, Decimal, Or, Decimal]
        );
        Ok(())
    }
    #[test]
    fn hex_before_decimal() -> Result<(), Error> {
        let tokens = tokenize("0x10 010 0X0")?;
        assert_eq!(types(&tokens), vec![Hex, Decimal, Hex]);
        Ok(())
    }
    #[test]
    fn no_match_reports_position() {
        match tokenize("1 + a") {
            Err(e) => assert_eq!(e.kind, ErrorKind::Lex(4)),
            Ok(t) => panic!("expected a lexical error, got {:?}", t),
        }
        match tokenize("1 = 2") {
            Err(e) => assert_eq!(e.kind, ErrorKind::Lex(2)),
            Ok(t) => panic!("expected a lexical error, got {:?}", t),
        }
        // a lone '&' or '$' isn't a token either
        assert!(tokenize("1 & 2").is_err());
        assert!(tokenize("$").is_err());
    }
    #[test]
    fn overlong_token_rejected() {
        let digits = "1".repeat(TOKEN_TEXT_MAX + 1);
        assert!(matches!(tokenize(&digits), Err(e) if e.kind == ErrorKind::Lex(0)));
        let ok = "1".repeat(TOKEN_TEXT_MAX);
        assert!(tokenize(&ok).is_ok());
    }
    #[test]
    fn too_many_tokens_rejected() {
        let ok = vec!["1"; TOKENS_MAX / 2].join("+");
        assert!(tokenize(&ok).is_ok());
        let too_many = vec!["1"; TOKENS_MAX].join("+");
        assert!(matches!(tokenize(&too_many), Err(Error { kind: ErrorKind::Lex(_), .. })));
    }
    #[test]
    fn empty_input() -> Result<(), Error> {
        assert!(tokenize("")?.is_empty());
        assert!(tokenize("   ")?.is_empty());
        Ok(())
    }
    #[test]
    fn classify_minus() -> Result<(), Error> {
        assert_eq!(types(&lex("-5+3")?), vec![Neg, Decimal, Add, Decimal]);
        assert_eq!(types(&lex("4*-2")?), vec![Decimal, Star, Neg, Decimal]);
        assert_eq!(types(&lex("(1)-2")?), vec![LParen, Decimal, RParen, Sub, Decimal]);
        assert_eq!(types(&lex("$pc--1")?), vec![Register, Sub, Neg, Decimal]);
        assert_eq!(types(&lex("!-1")?), vec![Not, Neg, Decimal]);
        Ok(())
    }
    #[test]
    fn classify_star() -> Result<(), Error> {
        assert_eq!(types(&lex("*$sp")?), vec![Deref, Register]);
        assert_eq!(types(&lex("2**0x80000000")?), vec![Decimal, Star, Deref, Hex]);
        assert_eq!(types(&lex("(*1)*2")?), vec![LParen, Deref, Decimal, RParen, Star, Decimal]);
        assert_eq!(types(&lex("--*-1")?), vec![Neg, Neg, Deref, Neg, Decimal]);
        Ok(())
    }
}

//! Recursive evaluation of debugger expressions.
//!
//! Grammar (operator precedence low to high):
//! ```text
//!  expr := expr '||' expr
//!        | expr '&&' expr
//!        | expr ('=='|'!=') expr
//!        | expr ('+'|'-') expr
//!        | expr ('*'|'/') expr
//!        | ('-'|'*'|'!') expr
//!        | '(' expr ')'
//!        | DECIMAL | '0x' HEX+ | '$' NAME
//! ```
//! Rather than building a tree, a token range is split at its loosest-binding
//! operator outside of any parentheses and both halves are evaluated recursively.
//! All arithmetic is on wrapping 32-bit unsigned values.
use super::token::{Token, TokenType};
use super::*;

/// Supplies register and memory contents to the evaluator.
/// Implemented by whatever simulator hosts the debugger.
pub trait Resolver {
    /// value of the register named `name` (without the '$' sigil), or None if there is no such register
    fn resolve_register(&self, name: &str) -> Option<u32>;
    /// the 32-bit word stored at `addr`
    fn read_memory(&self, addr: u32) -> Result<u32, Error>;
}

/// Tokenize, classify and evaluate `expr` in one go.
/// Any error carries the expression text as context.
pub fn evaluate(expr: &str, resolver: &dyn Resolver) -> Result<u32, Error> {
    let tokens = lexer::lex(expr).map_err(|e| e.with_ctx(expr))?;
    if tokens.is_empty() {
        return Err(eval_err!(ErrorKind::Malformed, "empty expression").with_ctx(expr));
    }
    Evaluator::new(&tokens, resolver)
        .eval(0, tokens.len() - 1)
        .map_err(|e| e.with_ctx(expr))
}

/// Evaluates ranges of a single, already classified, token sequence.
/// Holds no state between calls so nested evaluation is safe.
pub struct Evaluator<'a> {
    tokens: &'a [Token],
    resolver: &'a dyn Resolver,
}

impl<'a> Evaluator<'a> {
    pub fn new(tokens: &'a [Token], resolver: &'a dyn Resolver) -> Self { Evaluator { tokens, resolver } }

    /// Evaluate the closed token range [p, q].
    /// An empty range (p > q) evaluates to 0.
    pub fn eval(&self, p: usize, q: usize) -> Result<u32, Error> {
        if p > q {
            return Ok(0);
        }
        if p == q {
            return self.eval_operand(&self.tokens[p]);
        }
        if self.check_parentheses(p, q) {
            if p + 1 > q - 1 {
                return Err(eval_err!(ErrorKind::Malformed, "empty parentheses"));
            }
            return self.eval(p + 1, q - 1);
        }
        let op = self.find_split(p, q)?;
        let token = &self.tokens[op];
        if token.ttype.is_unary() {
            // a unary operator must open its range; anything to its left is a stray operand
            if op != p {
                return Err(eval_err!(
                    ErrorKind::Malformed,
                    "unexpected operand before \"{}\"",
                    token.raw
                ));
            }
            if op == q {
                return Err(eval_err!(ErrorKind::Malformed, "missing operand for \"{}\"", token.raw));
            }
            let val = self.eval(op + 1, q)?;
            return self.apply_unary(token, val);
        }
        if op == p || op == q {
            return Err(eval_err!(
                ErrorKind::Malformed,
                "missing operand(s) for binary operation \"{}\"",
                token.raw
            ));
        }
        let lhs = self.eval(p, op - 1)?;
        let rhs = self.eval(op + 1, q)?;
        self.apply_binary(token, lhs, rhs)
    }

    /// True if [p, q] is wrapped in a single matching pair of parentheses,
    /// i.e. the '(' at p stays open until the ')' at q.
    pub fn check_parentheses(&self, p: usize, q: usize) -> bool {
        if self.tokens[p] != TokenType::LParen || self.tokens[q] != TokenType::RParen {
            return false;
        }
        let mut depth = 0i32;
        for token in &self.tokens[p..q] {
            match token.ttype {
                TokenType::LParen => depth += 1,
                TokenType::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        // the opening parenthesis closed before q
                        return false;
                    }
                }
                _ => {}
            }
        }
        depth == 1
    }

    /// Find the operator at which to split [p, q]: the loosest-binding operator
    /// outside parentheses. Among binary operators of equal precedence the rightmost
    /// wins, which makes them left-associative. Among unary operators the leftmost
    /// wins since they nest to the right.
    pub fn find_split(&self, p: usize, q: usize) -> Result<usize, Error> {
        let mut depth = 0i32;
        let mut split: Option<(u8, usize)> = None;
        for i in p..=q {
            let ttype = self.tokens[i].ttype;
            match ttype {
                TokenType::LParen => {
                    depth += 1;
                    continue;
                }
                TokenType::RParen => {
                    depth -= 1;
                    if depth < 0 {
                        return Err(eval_err!(ErrorKind::Malformed, "unmatched \")\""));
                    }
                    continue;
                }
                _ => {}
            }
            if depth != 0 {
                continue;
            }
            if let Some(level) = ttype.precedence() {
                split = match split {
                    None => Some((level, i)),
                    Some((lowest, _)) if level < lowest => Some((level, i)),
                    Some((lowest, _)) if level == lowest && !ttype.is_unary() => Some((level, i)),
                    keep => keep,
                };
            }
        }
        if depth != 0 {
            return Err(eval_err!(ErrorKind::Malformed, "unmatched \"(\""));
        }
        split
            .map(|(_, i)| i)
            .ok_or_else(|| eval_err!(ErrorKind::Malformed, "missing operator"))
    }

    fn eval_operand(&self, token: &Token) -> Result<u32, Error> {
        match token.ttype {
            TokenType::Decimal => Ok(accumulate(&token.raw, 10)),
            TokenType::Hex => Ok(accumulate(&token.raw[2..], 16)),
            TokenType::Register => {
                let name = &token.raw[1..];
                self.resolver.resolve_register(name).ok_or_else(|| {
                    eval_err!(
                        ErrorKind::UnknownRegister(name.to_string()),
                        "unknown register \"{}\"",
                        token.raw
                    )
                })
            }
            _ => Err(eval_err!(ErrorKind::Malformed, "expected a value but found \"{}\"", token.raw)),
        }
    }

    fn apply_unary(&self, op: &Token, val: u32) -> Result<u32, Error> {
        match op.ttype {
            TokenType::Neg => Ok(val.wrapping_neg()),
            TokenType::Not => Ok(u32::from(val == 0)),
            TokenType::Deref => self.resolver.read_memory(val),
            _ => Err(eval_err!(ErrorKind::Malformed, "\"{}\" is not a unary operator", op.raw)),
        }
    }

    fn apply_binary(&self, op: &Token, lhs: u32, rhs: u32) -> Result<u32, Error> {
        match op.ttype {
            TokenType::Add => Ok(lhs.wrapping_add(rhs)),
            TokenType::Sub => Ok(lhs.wrapping_sub(rhs)),
            TokenType::Star => Ok(lhs.wrapping_mul(rhs)),
            TokenType::Div => lhs
                .checked_div(rhs)
                .ok_or_else(|| eval_err!(ErrorKind::DivisionByZero, "division by zero")),
            TokenType::Eq => Ok(u32::from(lhs == rhs)),
            TokenType::Neq => Ok(u32::from(lhs != rhs)),
            TokenType::And => Ok(u32::from(lhs != 0 && rhs != 0)),
            TokenType::Or => Ok(u32::from(lhs != 0 || rhs != 0)),
            _ => Err(eval_err!(ErrorKind::Malformed, "\"{}\" is not a binary operator", op.raw)),
        }
    }
}

/// Accumulates digits of the given radix into a wrapping 32-bit value.
/// The lexer guarantees every digit is valid.
fn accumulate(digits: &str, radix: u32) -> u32 {
    digits
        .chars()
        .filter_map(|c| c.to_digit(radix))
        .fold(0u32, |acc, d| acc.wrapping_mul(radix).wrapping_add(d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MockResolver {
        regs: HashMap<&'static str, u32>,
        mem: HashMap<u32, u32>,
    }
    impl MockResolver {
        fn new() -> Self {
            MockResolver {
                regs: HashMap::from([("pc", 0x8000_0000), ("sp", 0x8000_1000), ("a0", 7), ("0", 0)]),
                mem: HashMap::from([(0x8000_1000, 42), (42, 0xdead_beef)]),
            }
        }
    }
    impl Resolver for MockResolver {
        fn resolve_register(&self, name: &str) -> Option<u32> { self.regs.get(name).copied() }
        fn read_memory(&self, addr: u32) -> Result<u32, Error> {
            self.mem
                .get(&addr)
                .copied()
                .ok_or_else(|| Error::new(ErrorKind::Memory, None, "unmapped"))
        }
    }
    fn eval(expr: &str) -> Result<u32, Error> { evaluate(expr, &MockResolver::new()) }
    fn eval_kind(expr: &str) -> ErrorKind {
        match eval(expr) {
            Err(e) => e.kind,
            Ok(v) => panic!("expected \"{}\" to fail but it evaluated to {}", expr, v),
        }
    }

    #[test]
    fn precedence() -> Result<(), Error> {
        assert_eq!(eval("1+2*3")?, 7);
        assert_eq!(eval("(1+2)*3")?, 9);
        assert_eq!(eval("2*3+4*5")?, 26);
        assert_eq!(eval("1 + 2 == 3")?, 1);
        assert_eq!(eval("1 == 1 && 2 != 2")?, 0);
        assert_eq!(eval("0 && 0 || 1")?, 1);
        Ok(())
    }
    #[test]
    fn left_associativity() -> Result<(), Error> {
        assert_eq!(eval("10-3-2")?, 5);
        assert_eq!(eval("100/10/5")?, 2);
        assert_eq!(eval("8/2*4")?, 16);
        assert_eq!(eval("1-2+3")?, 2);
        Ok(())
    }
    #[test]
    fn parentheses() -> Result<(), Error> {
        assert_eq!(eval("((((5))))")?, 5);
        assert_eq!(eval("(1+2)*(3+4)")?, 21);
        assert_eq!(eval("(10-(3-2))")?, 9);
        assert_eq!(eval_kind("1+2)"), ErrorKind::Malformed);
        assert_eq!(eval_kind("(1+2"), ErrorKind::Malformed);
        assert_eq!(eval_kind("()"), ErrorKind::Malformed);
        assert_eq!(eval_kind(")1+2("), ErrorKind::Malformed);
        assert_eq!(eval_kind("(1)(2)"), ErrorKind::Malformed);
        Ok(())
    }
    #[test]
    fn literals() -> Result<(), Error> {
        assert_eq!(eval("0x10")?, 16);
        assert_eq!(eval("0XfF")?, 255);
        assert_eq!(eval("0xffffffff")?, u32::MAX);
        assert_eq!(eval("007")?, 7);
        // wider literals wrap at 32 bits
        assert_eq!(eval("0x100000001")?, 1);
        assert_eq!(eval("4294967297")?, 1);
        Ok(())
    }
    #[test]
    fn unary_minus() -> Result<(), Error> {
        assert_eq!(eval("-5+3")?, (-2i32) as u32);
        assert_eq!(eval("4*-2")?, (-8i32) as u32);
        assert_eq!(eval("--5")?, 5);
        assert_eq!(eval("-(2+3)")?, (-5i32) as u32);
        assert_eq!(eval("3 - -3")?, 6);
        assert_eq!(eval("-2*3")?, (-6i32) as u32);
        Ok(())
    }
    #[test]
    fn logical() -> Result<(), Error> {
        assert_eq!(eval("!0 && 1")?, 1);
        assert_eq!(eval("0 || 0")?, 0);
        assert_eq!(eval("!5")?, 0);
        assert_eq!(eval("!!5")?, 1);
        assert_eq!(eval("2 && 3")?, 1);
        assert_eq!(eval("!0 + 1")?, 2);
        Ok(())
    }
    #[test]
    fn division() -> Result<(), Error> {
        assert_eq!(eval("7/2")?, 3);
        assert_eq!(eval_kind("1/0"), ErrorKind::DivisionByZero);
        assert_eq!(eval_kind("1/(2-2)"), ErrorKind::DivisionByZero);
        // both sides are always evaluated
        assert_eq!(eval_kind("0 && 1/0"), ErrorKind::DivisionByZero);
        Ok(())
    }
    #[test]
    fn registers_and_memory() -> Result<(), Error> {
        assert_eq!(eval("$pc")?, 0x8000_0000);
        assert_eq!(eval("$a0 * 2 + 1")?, 15);
        assert_eq!(eval("$0")?, 0);
        assert_eq!(eval("*$sp")?, 42);
        assert_eq!(eval("**$sp")?, 0xdead_beef);
        assert_eq!(eval("*$sp / 2")?, 21);
        assert_eq!(eval("*(0x80000000 + 0x1000)")?, 42);
        assert_eq!(eval_kind("$t9"), ErrorKind::UnknownRegister("t9".to_string()));
        assert_eq!(eval_kind("*0"), ErrorKind::Memory);
        Ok(())
    }
    #[test]
    fn malformed() {
        for expr in ["", "  ", "1 +", "+ 1", "1 2", "5 !3", "-", "1 * / 2", "(+)", "$a0 $a0"] {
            match eval(expr) {
                Err(e) => assert!(
                    e.kind == ErrorKind::Malformed,
                    "\"{}\" failed with {:?} rather than Malformed",
                    expr,
                    e.kind
                ),
                Ok(v) => panic!("\"{}\" unexpectedly evaluated to {}", expr, v),
            }
        }
    }
    #[test]
    fn errors_carry_expression() {
        let e = eval("1 + @").unwrap_err();
        assert_eq!(e.kind, ErrorKind::Lex(4));
        assert_eq!(e.ctx.as_deref(), Some("1 + @"));
        let e = eval("(1/0)").unwrap_err();
        assert_eq!(e.ctx.as_deref(), Some("(1/0)"));
        assert!(e.to_string().contains("Expression: (1/0)"));
    }
    #[test]
    fn split_and_bracket_helpers() -> Result<(), Error> {
        let r = MockResolver::new();
        let tokens = lexer::lex("(1+2)*(3)")?;
        let ev = Evaluator::new(&tokens, &r);
        assert!(!ev.check_parentheses(0, tokens.len() - 1));
        assert!(ev.check_parentheses(0, 4));
        assert!(ev.check_parentheses(6, 8));
        assert_eq!(ev.find_split(0, tokens.len() - 1)?, 5);
        assert_eq!(ev.eval(0, 4)?, 3);
        // the empty range is 0
        assert_eq!(ev.eval(3, 2)?, 0);
        Ok(())
    }
}

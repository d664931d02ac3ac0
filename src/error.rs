use std::{convert::From, fmt};

/// Simple custom Error for the sdb project
pub struct Error {
    pub kind: ErrorKind,
    /// the expression being evaluated when the error occurred (if any)
    pub ctx: Option<String>,
    pub msg: String,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    /// no lexical rule matches at the given byte position
    Lex(usize),
    /// structurally invalid token range (parentheses, missing operator or operand)
    Malformed,
    /// divisor evaluated to zero
    DivisionByZero,
    /// the simulator doesn't know the named register
    UnknownRegister(String),
    /// dereference of an address outside guest memory
    Memory,
    /// every watchpoint slot is in use
    Exhausted,
    /// no active watchpoint with the given number
    NotFound,
    /// underlying io error
    IO,
    /// error in the syntax of a trace file
    Syntax,
    /// normal exit (not really an error)
    Exit,
    /// catch-all for other errors
    General,
}

impl Error {
    pub fn new(kind: ErrorKind, ctx: Option<&str>, message: &str) -> Error {
        Error {
            kind,
            ctx: ctx.map(String::from),
            msg: String::from(message),
        }
    }
    /// attaches the expression text unless a more specific one is already present
    pub fn with_ctx(mut self, expr: &str) -> Error {
        if self.ctx.is_none() {
            self.ctx = Some(expr.to_string());
        }
        self
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self { Error::new(ErrorKind::IO, None, e.to_string().as_str()) }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}({:?}): {}", red!("sdb::Error"), self.kind, self.msg)
    }
}
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.msg)?;
        if let Some(expr) = self.ctx.as_ref() {
            write!(f, "\nExpression: {}", expr)?;
        }
        Ok(())
    }
}
impl std::error::Error for Error {}

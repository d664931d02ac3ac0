#![allow(unused_macros, dead_code)]
macro_rules! verbose_println {
    ($($p:expr),+) => {
        if (config::ARGS.verbose) {
            println!($($p),+);
        }
    }
}
// Adding explicit carriage returns to some of these because the monitor may be
// driven from a raw-mode terminal where a bare LF doesn't return the cursor.
macro_rules! info {
    ($($p:expr),+) => {
        println!(concat!(blue!("INFO"),": {}\r"),format_args!($($p),+))
    }
}

macro_rules! warn {
    ($($p:expr),+) => {
        println!(concat!(red!("WARNING"),": {}\r"),format_args!($($p),+))
    }
}
macro_rules! general_err {
    ($msg:expr) => {
        Error::new(crate::ErrorKind::General, None, format!("{}", $msg).as_str())
    };
}
macro_rules! lex_err {
    ($pos:expr, $($msg:expr),*) => {
        Error::new(
            crate::ErrorKind::Lex($pos),
            None,
            format!("{} {}", red!("Lexical Error"), format!($($msg),*)).as_str(),
        )
    };
}
macro_rules! eval_err {
    ($kind:expr, $($msg:expr),*) => {
        Error::new(
            $kind,
            None,
            format!("{} {}", red!("Evaluation Error"), format!($($msg),*)).as_str(),
        )
    };
}
macro_rules! syntax_err_line {
    ($line:expr, $msg:expr) => {
        Error::new(
            crate::ErrorKind::Syntax,
            None,
            format!("{}, line {}: {}", red!("Syntax Error"), $line, $msg).as_str(),
        )
    };
}
macro_rules! color {
    ($color: literal, $msg: expr) => {
        concat!("\x1b[", $color, "m", $msg, "\x1b[0m")
    };
}
macro_rules! red {
    ($msg:expr) => {
        color!(91, $msg)
    };
}
macro_rules! blue {
    ($msg:expr) => {
        color!(94, $msg)
    };
}

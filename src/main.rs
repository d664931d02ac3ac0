//! # A simple debugger monitor with expressions and watchpoints, written in Rust.
//!
//! ## Getting Started
//! To replay an execution trace under the monitor:
//! ```
//! cargo run -- /path/to/program.trace
//! ```
//! ...or if you've already built the binary then just...
//! ```
//! sdb /path/to/program.trace
//! ```
//! Type `h` at the `(sdb)` prompt for a list of commands.
//! ## Options
//! Help for command line options is available using -h or --help.
#[macro_use]
mod macros;
mod config;
mod error;
mod expr;
mod lexer;
mod machine;
mod monitor;
mod token;
mod watchpoint;
use machine::TraceMachine;
use monitor::Monitor;
use std::fmt;
use std::result::Result;
pub(crate) use crate::error::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    config::init();
    lexer::init();
    // process_file does all the work
    if let Err(e) = process_file(config::ARGS.file.as_str()) {
        println!("{}", e);
        return Err(Box::new(e));
    }
    Ok(())
}
/// process_file loads the trace and hands it to the monitor
fn process_file(filename: &str) -> Result<(), Error> {
    let machine = TraceMachine::load_from_file(filename, config::ARGS.mem_base, config::ARGS.mem_size)?;
    info!("Loaded {} ({} steps)", filename, machine.remaining());
    let mut monitor = Monitor::new(machine);
    if config::batch() {
        return match monitor.execute("c") {
            Err(e) if e.kind == ErrorKind::Exit => Ok(()),
            other => other,
        };
    }
    monitor.cli()
}
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn process_trace_file() -> Result<(), Error> {
        let path = std::env::temp_dir().join(format!("sdb-test-{}.trace", std::process::id()));
        fs::write(&path, "init: sp=0x80001000\na0=1\n[0x80001000]=3\n")?;
        let path_str = path.to_str().ok_or_else(|| general_err!("bad temp path"))?;
        let machine = TraceMachine::load_from_file(path_str, config::ARGS.mem_base, config::ARGS.mem_size)?;
        assert_eq!(machine.remaining(), 2);
        let mut monitor = Monitor::new(machine);
        monitor.execute("w *$sp")?;
        monitor.execute("c")?;
        assert_eq!(monitor.evaluate_expression("*$sp")?, 3);
        assert_eq!(monitor.list_watchpoints()[0].value, 3);
        fs::remove_file(&path)?;
        Ok(())
    }
    #[test]
    fn missing_file() {
        match TraceMachine::load_from_file("no/such/file.trace", 0x8000_0000, 0x100) {
            Err(e) => assert_eq!(e.kind, ErrorKind::IO),
            Ok(_) => panic!("loaded a file that doesn't exist"),
        }
    }
    #[test]
    fn default_config() {
        assert_eq!(config::ARGS.mem_base, 0x8000_0000);
        assert_eq!(config::ARGS.mem_size, 0x1_0000);
        assert!(!config::batch());
    }
}

//! The interactive command front end.
use super::expr;
use super::machine::{Simulator, StepState};
use super::watchpoint::{ChangeReport, NewWatchpoint, WatchpointInfo, WatchpointPool};
use super::*;
use std::io::{stdin, stdout, Write};

macro_rules! help {
    ($name:ident,$help:expr) => {
        #[allow(non_upper_case_globals)]
        static $name: &'static str = $help;
    };
}

help!(cmd_c, "c - Continue; run until the trace ends or a watchpoint changes");
help!(cmd_si, "si [<n>] - Step; execute <n> instructions (default 1)");
help!(cmd_info, "info r|w - Info; show registers (r) or watchpoints (w)");
help!(cmd_p, "p <expr> - Print; evaluate <expr>");
help!(cmd_x, "x <n> <expr> - Examine; dump <n> words of memory starting at address <expr>");
help!(cmd_w, "w <expr> - Watch; pause whenever the value of <expr> changes");
help!(cmd_d, "d <num> - Delete; delete watchpoint #<num>");
help!(cmd_q, "q - Quit; terminate this application");
help!(cmd_h, "h - Help; display this help text");

static COMMAND_HELP: &[&str] = &[
    cmd_c,
    cmd_si,
    cmd_info,
    cmd_p,
    cmd_x,
    cmd_w,
    cmd_d,
    cmd_q,
    cmd_h,
    "<expr> syntax: decimal, 0x hex, $reg, ( ), unary - * !, binary * / + - == != && ||",
];

/// Why a run of instructions came to an end.
#[derive(Debug, PartialEq, Eq)]
pub enum Stop {
    /// the requested number of instructions was executed
    Done,
    /// the simulator has no more instructions to execute
    Halted,
    /// at least one watchpoint changed value
    Watchpoint(ChangeReport),
}

/// Couples a simulator with the expression evaluator and the watchpoint registry.
pub struct Monitor<S: Simulator> {
    pub sim: S,
    wp: WatchpointPool,
    halted: bool,
}

impl<S: Simulator> Monitor<S> {
    pub fn new(sim: S) -> Self {
        Monitor {
            sim,
            wp: WatchpointPool::new(),
            halted: false,
        }
    }
    pub fn evaluate_expression(&self, text: &str) -> Result<u32, Error> { expr::evaluate(text, &self.sim) }
    pub fn create_watchpoint(&mut self, text: &str) -> Result<NewWatchpoint, Error> { self.wp.create(text, &self.sim) }
    pub fn delete_watchpoint(&mut self, no: usize) -> bool { self.wp.delete(no) }
    pub fn list_watchpoints(&self) -> Vec<WatchpointInfo> { self.wp.list_all() }
    /// Executes one instruction and then checks every watchpoint.
    pub fn step_and_check(&mut self) -> Result<(StepState, ChangeReport), Error> {
        let state = self.sim.step()?;
        if state == StepState::Halted {
            return Ok((state, ChangeReport::default()));
        }
        Ok((state, self.wp.check_all(&self.sim)))
    }
    /// Executes up to `count` instructions (or until the simulator halts if None),
    /// stopping early if a watchpoint changes.
    pub fn exec(&mut self, count: Option<u64>) -> Result<Stop, Error> {
        if self.halted {
            return Ok(Stop::Halted);
        }
        let mut executed = 0u64;
        while count.map_or(true, |n| executed < n) {
            let (state, report) = self.step_and_check()?;
            if state == StepState::Halted {
                self.halted = true;
                return Ok(Stop::Halted);
            }
            executed += 1;
            if !report.is_empty() {
                return Ok(Stop::Watchpoint(report));
            }
        }
        Ok(Stop::Done)
    }
    fn run_and_report(&mut self, count: Option<u64>) -> Result<(), Error> {
        match self.exec(count)? {
            Stop::Done => println!("pc = 0x{:08x}", self.sim.pc()),
            Stop::Halted => info!(
                "Program execution has ended after {} instructions (pc = 0x{:08x})",
                self.sim.step_count(),
                self.sim.pc()
            ),
            Stop::Watchpoint(report) => {
                println!("{}", report);
                verbose_println!("{} watchpoint(s) changed", report.len());
                println!("Paused at pc = 0x{:08x}", self.sim.pc());
            }
        }
        Ok(())
    }
    fn show_registers(&self) {
        for (i, (name, value)) in self.sim.registers().iter().enumerate() {
            print!("{:>4}: 0x{:08x}  ", name, value);
            if i % 4 == 3 {
                println!();
            }
        }
        println!();
    }
    fn show_watchpoints(&self) {
        let list = self.list_watchpoints();
        if list.is_empty() {
            println!("No watchpoints are set.");
            return;
        }
        println!("Num  {:<30} {:>10}", "Expression", "Value");
        for wp in list {
            println!("{}", wp);
        }
        println!("{} in use, {} free", self.wp.active_len(), self.wp.free_len());
    }
    fn examine(&self, count: u32, start: u32) -> Result<(), Error> {
        const COLS_PER_ROW: u32 = 4;
        for i in 0..count {
            let addr = start.wrapping_add(i.wrapping_mul(4));
            if i % COLS_PER_ROW == 0 {
                if i > 0 {
                    println!();
                }
                print!(blue!("0x{:08x}:"), addr);
            }
            print!(" 0x{:08x}", self.sim.read_memory(addr)?);
        }
        println!();
        Ok(())
    }

    /// Executes a single monitor command.
    /// Errors are returned for the caller to display; ErrorKind::Exit means the user asked to quit.
    pub fn execute(&mut self, line: &str) -> Result<(), Error> {
        let line = line.trim();
        let (cmd, rest) = match line.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (line, ""),
        };
        match cmd {
            "" => {}
            "c" => self.run_and_report(None)?,
            "si" => {
                let count = if rest.is_empty() {
                    1
                } else {
                    rest.parse::<u64>()
                        .map_err(|_| general_err!(format!("invalid step count \"{}\"\n{}", rest, cmd_si)))?
                };
                self.run_and_report(Some(count))?;
            }
            "info" => match rest {
                "r" => self.show_registers(),
                "w" => self.show_watchpoints(),
                _ => return Err(general_err!(cmd_info)),
            },
            "p" => {
                if rest.is_empty() {
                    return Err(general_err!(cmd_p));
                }
                let value = self.evaluate_expression(rest)?;
                println!("{} = {} (0x{:08x})", rest, value, value);
            }
            "x" => {
                let (n, e) = rest.split_once(char::is_whitespace).ok_or_else(|| general_err!(cmd_x))?;
                let count = n
                    .parse::<u32>()
                    .map_err(|_| general_err!(format!("invalid word count \"{}\"\n{}", n, cmd_x)))?;
                let start = self.evaluate_expression(e.trim())?;
                self.examine(count, start)?;
            }
            "w" => {
                if rest.is_empty() {
                    return Err(general_err!(cmd_w));
                }
                let wp = self.create_watchpoint(rest)?;
                match wp.warning {
                    None => println!("Watchpoint {}: {} = {}", wp.no, rest, wp.value),
                    Some(e) => warn!(
                        "Watchpoint {} set, but its expression can't be evaluated yet (value taken as {}):\n{}",
                        wp.no,
                        wp.value,
                        e
                    ),
                }
            }
            "d" => {
                let no = rest
                    .parse::<usize>()
                    .map_err(|_| general_err!(format!("invalid watchpoint number \"{}\"\n{}", rest, cmd_d)))?;
                if !self.delete_watchpoint(no) {
                    return Err(Error::new(
                        ErrorKind::NotFound,
                        None,
                        format!("Watchpoint {} does not exist. Use \"info w\" to see current watchpoints.", no)
                            .as_str(),
                    ));
                }
                println!("Watchpoint {} deleted", no);
            }
            "q" | "quit" => return Err(Error::new(ErrorKind::Exit, None, "session terminated by user")),
            "h" | "help" => {
                for help in COMMAND_HELP {
                    println!("{}", help);
                }
            }
            _ => return Err(general_err!(format!("Unknown command \"{}\". Try 'h' for help.", cmd))),
        }
        Ok(())
    }

    /// Reads and executes commands from stdin until the user quits or input ends.
    pub fn cli(&mut self) -> Result<(), Error> {
        loop {
            let mut input = String::new();
            print!(blue!("(sdb) "));
            _ = stdout().flush();
            if stdin().read_line(&mut input)? == 0 {
                // end of input
                println!();
                return Ok(());
            }
            match self.execute(&input) {
                Ok(()) => {}
                Err(e) if e.kind == ErrorKind::Exit => return Ok(()),
                Err(e) => println!("{}", e),
            }
        }
    }
}

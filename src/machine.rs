//! A replay simulator that drives the monitor from a recorded execution trace.
//!
//! Trace format (one executed instruction per line):
//! ```text
//! # comment
//! init: sp=0x80001000 [0x80001000]=7     initial state; not a step
//! a0=1                                   one step; pc advances by 4
//! pc=0x80000100 [0x80001000]=0x2a        one step; explicit pc
//! ```
//! Register names are the RISC-V ABI names (plus `pc`). Memory assignments store
//! a little-endian 32-bit word.
use super::expr::Resolver;
use super::*;

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::VecDeque;

/// RISC-V integer register ABI names, indexed by register number. x0 is named "0".
#[rustfmt::skip]
pub static REG_NAMES: [&str; 32] = [
    "0", "ra", "sp", "gp", "tp", "t0", "t1", "t2",
    "s0", "s1", "a0", "a1", "a2", "a3", "a4", "a5",
    "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7",
    "s8", "s9", "s10", "s11", "t3", "t4", "t5", "t6",
];

lazy_static! {
    static ref RE_REG_ASSIGN: Regex = Regex::new(r"^([a-z0-9]+)=(0[xX][0-9a-fA-F]+|[0-9]+)$").unwrap();
    static ref RE_MEM_ASSIGN: Regex =
        Regex::new(r"^\[(0[xX][0-9a-fA-F]+|[0-9]+)\]=(0[xX][0-9a-fA-F]+|[0-9]+)$").unwrap();
}

/// Whether the simulator can execute further instructions.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum StepState {
    Running,
    Halted,
}

/// The instruction-set simulator as seen by the monitor.
pub trait Simulator: Resolver {
    /// execute one instruction
    fn step(&mut self) -> Result<StepState, Error>;
    fn pc(&self) -> u32;
    /// number of instructions executed so far
    fn step_count(&self) -> u64;
    /// (name, value) for every register, for display
    fn registers(&self) -> Vec<(&'static str, u32)>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Gpr(usize),
    Pc,
    Mem(u32),
}

#[derive(Debug, Clone, Copy)]
struct Assign {
    target: Target,
    value: u32,
}

pub struct TraceMachine {
    pub gpr: [u32; 32],
    pub pc: u32,
    mem_base: u32,
    mem: Vec<u8>,
    steps: VecDeque<Vec<Assign>>,
    pub step_count: u64,
}

fn reg_index(name: &str) -> Option<usize> { REG_NAMES.iter().position(|r| *r == name) }

fn parse_u32(s: &str) -> Option<u32> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => s.parse::<u32>().ok(),
    }
}

impl TraceMachine {
    pub fn new(mem_base: u32, mem_size: u32) -> Self {
        TraceMachine {
            gpr: [0; 32],
            pc: mem_base,
            mem_base,
            mem: vec![0; mem_size as usize],
            steps: VecDeque::new(),
            step_count: 0,
        }
    }
    pub fn load_from_file(filename: &str, mem_base: u32, mem_size: u32) -> Result<Self, Error> {
        let text = std::fs::read_to_string(filename)
            .map_err(|e| Error::new(ErrorKind::IO, None, format!("{}: {}", filename, e).as_str()))?;
        Self::from_trace(&text, mem_base, mem_size)
    }
    /// Parses a whole trace. `init:` lines are applied immediately; every other
    /// non-blank line becomes one step.
    pub fn from_trace(text: &str, mem_base: u32, mem_size: u32) -> Result<Self, Error> {
        let mut machine = TraceMachine::new(mem_base, mem_size);
        for (i, raw) in text.lines().enumerate() {
            let line_num = i + 1;
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if let Some(init) = line.strip_prefix("init:") {
                let assigns = machine.parse_assignments(init, line_num)?;
                machine.apply(&assigns);
            } else {
                let assigns = machine.parse_assignments(line, line_num)?;
                machine.steps.push_back(assigns);
            }
        }
        verbose_println!("loaded {} trace steps", machine.steps.len());
        Ok(machine)
    }
    fn parse_assignments(&self, line: &str, line_num: usize) -> Result<Vec<Assign>, Error> {
        let mut assigns = Vec::new();
        for field in line.split_whitespace() {
            if let Some(caps) = RE_REG_ASSIGN.captures(field) {
                let target = match &caps[1] {
                    "pc" => Target::Pc,
                    name => Target::Gpr(
                        reg_index(name)
                            .ok_or_else(|| syntax_err_line!(line_num, format!("unknown register \"{}\"", name)))?,
                    ),
                };
                let value = parse_u32(&caps[2])
                    .ok_or_else(|| syntax_err_line!(line_num, format!("value out of range \"{}\"", &caps[2])))?;
                assigns.push(Assign { target, value });
            } else if let Some(caps) = RE_MEM_ASSIGN.captures(field) {
                let addr = parse_u32(&caps[1])
                    .ok_or_else(|| syntax_err_line!(line_num, format!("address out of range \"{}\"", &caps[1])))?;
                if self.offset_of(addr).is_none() {
                    return Err(syntax_err_line!(
                        line_num,
                        format!("address {:08x} is outside guest memory", addr)
                    ));
                }
                let value = parse_u32(&caps[2])
                    .ok_or_else(|| syntax_err_line!(line_num, format!("value out of range \"{}\"", &caps[2])))?;
                assigns.push(Assign {
                    target: Target::Mem(addr),
                    value,
                });
            } else {
                return Err(syntax_err_line!(line_num, format!("can't parse \"{}\"", field)));
            }
        }
        Ok(assigns)
    }
    /// offset into guest memory of the word at addr, if the whole word is mapped
    fn offset_of(&self, addr: u32) -> Option<usize> {
        let offset = addr.checked_sub(self.mem_base)? as usize;
        if offset.checked_add(4)? <= self.mem.len() {
            Some(offset)
        } else {
            None
        }
    }
    /// applies assignments; returns true if pc was assigned
    fn apply(&mut self, assigns: &[Assign]) -> bool {
        let mut pc_written = false;
        for a in assigns {
            match a.target {
                // x0 is hardwired to zero
                Target::Gpr(0) => {}
                Target::Gpr(r) => self.gpr[r] = a.value,
                Target::Pc => {
                    self.pc = a.value;
                    pc_written = true;
                }
                Target::Mem(addr) => {
                    if let Some(offset) = self.offset_of(addr) {
                        self.mem[offset..offset + 4].copy_from_slice(&a.value.to_le_bytes());
                    }
                }
            }
        }
        pc_written
    }
    /// number of steps left in the trace
    pub fn remaining(&self) -> usize { self.steps.len() }
}

impl Resolver for TraceMachine {
    fn resolve_register(&self, name: &str) -> Option<u32> {
        if name == "pc" {
            return Some(self.pc);
        }
        reg_index(name).map(|r| self.gpr[r])
    }
    fn read_memory(&self, addr: u32) -> Result<u32, Error> {
        let offset = self.offset_of(addr).ok_or_else(|| {
            Error::new(
                ErrorKind::Memory,
                None,
                format!("address {:08x} is outside guest memory", addr).as_str(),
            )
        })?;
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.mem[offset..offset + 4]);
        Ok(u32::from_le_bytes(word))
    }
}

impl Simulator for TraceMachine {
    fn step(&mut self) -> Result<StepState, Error> {
        let assigns = match self.steps.pop_front() {
            Some(a) => a,
            None => return Ok(StepState::Halted),
        };
        if !self.apply(&assigns) {
            self.pc = self.pc.wrapping_add(4);
        }
        self.step_count += 1;
        Ok(StepState::Running)
    }
    fn pc(&self) -> u32 { self.pc }
    fn step_count(&self) -> u64 { self.step_count }
    fn registers(&self) -> Vec<(&'static str, u32)> {
        let mut regs: Vec<(&'static str, u32)> = REG_NAMES.iter().copied().zip(self.gpr.iter().copied()).collect();
        regs.push(("pc", self.pc));
        regs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    const BASE: u32 = 0x8000_0000;
    const TRACE: &str = "
        # a tiny trace
        init: sp=0x80001000 [0x80001000]=7
        a0=1
        a0=2 [0x80001000]=0x2a   # store
        pc=0x80000100
        zero=3
    ";

    #[test]
    fn initial_state() -> Result<(), Error> {
        let m = TraceMachine::from_trace("init: sp=0x80001000 [0x80001000]=7\na0=1", BASE, 0x2000)?;
        assert_eq!(m.pc(), BASE);
        assert_eq!(m.resolve_register("sp"), Some(0x8000_1000));
        assert_eq!(m.read_memory(0x8000_1000)?, 7);
        assert_eq!(m.remaining(), 1);
        Ok(())
    }
    #[test]
    fn bad_lines_are_rejected() {
        assert!(matches!(TraceMachine::from_trace(TRACE, BASE, 0x2000), Err(e) if e.kind == ErrorKind::Syntax));
        assert!(TraceMachine::from_trace("a0=0x100000000", BASE, 0x2000).is_err());
        assert!(TraceMachine::from_trace("[0x10]=1", BASE, 0x2000).is_err());
        assert!(TraceMachine::from_trace("a0 = 1", BASE, 0x2000).is_err());
    }
    #[test]
    fn stepping() -> Result<(), Error> {
        let trace = TRACE.replace("zero=3", "0=3");
        let mut m = TraceMachine::from_trace(&trace, BASE, 0x2000)?;
        assert_eq!(m.step()?, StepState::Running);
        assert_eq!((m.pc(), m.resolve_register("a0")), (BASE + 4, Some(1)));
        assert_eq!(m.step()?, StepState::Running);
        assert_eq!(m.read_memory(0x8000_1000)?, 0x2a);
        assert_eq!(m.step()?, StepState::Running);
        assert_eq!(m.pc(), 0x8000_0100);
        assert_eq!(m.step()?, StepState::Running);
        assert_eq!(m.resolve_register("0"), Some(0));
        assert_eq!(m.step()?, StepState::Halted);
        assert_eq!(m.step_count, 4);
        assert_eq!(m.pc(), 0x8000_0104);
        Ok(())
    }
    #[test]
    fn memory_window() -> Result<(), Error> {
        let m = TraceMachine::new(BASE, 0x100);
        assert_eq!(m.read_memory(BASE + 0xfc)?, 0);
        assert!(matches!(m.read_memory(BASE + 0xfd), Err(e) if e.kind == ErrorKind::Memory));
        assert!(m.read_memory(BASE - 4).is_err());
        assert!(m.read_memory(u32::MAX).is_err());
        Ok(())
    }
    #[test]
    fn register_names() {
        let m = TraceMachine::new(BASE, 0x100);
        assert_eq!(m.registers().len(), 33);
        assert_eq!(m.resolve_register("t6"), Some(0));
        assert_eq!(m.resolve_register("pc"), Some(BASE));
        assert_eq!(m.resolve_register("x5"), None);
        assert_eq!(m.resolve_register("PC"), None);
    }
}

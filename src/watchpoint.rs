//! Fixed-capacity watchpoint registry.
//!
//! All slots live in one array. Each slot is threaded onto exactly one of two
//! singly linked lists by index: the active list (in creation order) or the free
//! list (kept in ascending slot order so the lowest free slot is always reused first).
//! A watchpoint's number is its slot index.
use super::expr::{self, Resolver};
use super::*;

/// Number of watchpoint slots
pub const NR_WP: usize = 32;
/// Maximum number of bytes of expression text stored per watchpoint
pub const WP_EXPR_MAX: usize = 1024;

struct Slot {
    expr: String,
    value: u32,
    next: Option<usize>,
}

/// A read-only copy of an active watchpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchpointInfo {
    pub no: usize,
    pub expr: String,
    pub value: u32,
}
impl fmt::Display for WatchpointInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:3}  {:<30} {:>10} (0x{:08x})", self.no, self.expr, self.value, self.value)
    }
}

/// Outcome of creating a watchpoint.
/// If the expression couldn't be evaluated the watchpoint still exists with a
/// value of 0 and the reason is returned in `warning`.
pub struct NewWatchpoint {
    pub no: usize,
    pub value: u32,
    pub warning: Option<Error>,
}

/// A watchpoint whose value differs from the value seen at the previous check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub no: usize,
    pub expr: String,
    pub old: u32,
    pub new: u32,
}
impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Watchpoint {}: {}\n  Old value = {} (0x{:08x})\n  New value = {} (0x{:08x})",
            self.no, self.expr, self.old, self.old, self.new, self.new
        )
    }
}

/// All changes detected by one pass over the active watchpoints.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChangeReport {
    pub changes: Vec<Change>,
}
impl ChangeReport {
    pub fn is_empty(&self) -> bool { self.changes.is_empty() }
    pub fn len(&self) -> usize { self.changes.len() }
}
impl fmt::Display for ChangeReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, change) in self.changes.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", change)?;
        }
        Ok(())
    }
}

/// Iterates slot indices along one of the pool's lists.
struct Links<'a> {
    slots: &'a [Slot],
    cur: Option<usize>,
}
impl<'a> Iterator for Links<'a> {
    type Item = usize;
    fn next(&mut self) -> Option<usize> {
        let i = self.cur?;
        self.cur = self.slots[i].next;
        Some(i)
    }
}

pub struct WatchpointPool {
    slots: Vec<Slot>,
    head: Option<usize>,
    free: Option<usize>,
}

impl WatchpointPool {
    pub fn new() -> Self {
        let mut pool = WatchpointPool {
            slots: Vec::with_capacity(NR_WP),
            head: None,
            free: None,
        };
        pool.reset();
        pool
    }
    /// Returns every slot to the free list, discarding all active watchpoints.
    pub fn reset(&mut self) {
        self.slots = (0..NR_WP)
            .map(|i| Slot {
                expr: String::new(),
                value: 0,
                next: if i + 1 < NR_WP { Some(i + 1) } else { None },
            })
            .collect();
        self.head = None;
        self.free = Some(0);
    }
    fn active(&self) -> Links<'_> {
        Links {
            slots: &self.slots,
            cur: self.head,
        }
    }
    fn free_slots(&self) -> Links<'_> {
        Links {
            slots: &self.slots,
            cur: self.free,
        }
    }
    pub fn active_len(&self) -> usize { self.active().count() }
    pub fn free_len(&self) -> usize { self.free_slots().count() }

    /// Takes the lowest free slot, records the expression and its current value and
    /// appends it to the end of the active list.
    pub fn create(&mut self, expr: &str, resolver: &dyn Resolver) -> Result<NewWatchpoint, Error> {
        let no = self.free.ok_or_else(|| {
            Error::new(
                ErrorKind::Exhausted,
                Some(expr),
                format!("all {} watchpoints are in use", NR_WP).as_str(),
            )
        })?;
        self.free = self.slots[no].next;
        let text = truncate(expr).to_string();
        let (value, warning) = match expr::evaluate(&text, resolver) {
            Ok(v) => (v, None),
            Err(e) => (0, Some(e)),
        };
        let slot = &mut self.slots[no];
        slot.expr = text;
        slot.value = value;
        slot.next = None;
        let tail = self.active().last();
        match tail {
            Some(tail) => self.slots[tail].next = Some(no),
            None => self.head = Some(no),
        }
        verbose_println!("watchpoint {} created: {} = {}", no, self.slots[no].expr, value);
        Ok(NewWatchpoint { no, value, warning })
    }

    /// Removes watchpoint `no` from the active list and returns its slot to the free list.
    /// Returns false (and changes nothing) if no such watchpoint is active.
    pub fn delete(&mut self, no: usize) -> bool {
        let mut prev = None;
        let mut found = false;
        for i in self.active() {
            if i == no {
                found = true;
                break;
            }
            prev = Some(i);
        }
        if !found {
            return false;
        }
        // unlink from the active list
        let next = self.slots[no].next;
        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        self.slots[no].expr.clear();
        self.slots[no].value = 0;
        // insert into the free list, keeping it sorted by slot index
        let mut prev = None;
        for i in self.free_slots() {
            if i > no {
                break;
            }
            prev = Some(i);
        }
        match prev {
            Some(p) => {
                self.slots[no].next = self.slots[p].next;
                self.slots[p].next = Some(no);
            }
            None => {
                self.slots[no].next = self.free;
                self.free = Some(no);
            }
        }
        verbose_println!("watchpoint {} deleted", no);
        true
    }

    /// Re-evaluates every active watchpoint in creation order and reports the ones whose value changed.
    /// A watchpoint whose expression can't currently be evaluated keeps its old value and is not reported.
    pub fn check_all(&mut self, resolver: &dyn Resolver) -> ChangeReport {
        let mut report = ChangeReport::default();
        let mut cur = self.head;
        while let Some(i) = cur {
            let slot = &mut self.slots[i];
            match expr::evaluate(&slot.expr, resolver) {
                Ok(new) if new != slot.value => {
                    report.changes.push(Change {
                        no: i,
                        expr: slot.expr.clone(),
                        old: slot.value,
                        new,
                    });
                    slot.value = new;
                }
                Ok(_) => {}
                Err(e) => verbose_println!("watchpoint {} not evaluated: {}", i, e),
            }
            cur = slot.next;
        }
        report
    }

    /// Snapshot of the active watchpoints in creation order.
    pub fn list_all(&self) -> Vec<WatchpointInfo> {
        self.active()
            .map(|i| WatchpointInfo {
                no: i,
                expr: self.slots[i].expr.clone(),
                value: self.slots[i].value,
            })
            .collect()
    }
}

/// Cuts `expr` down to at most WP_EXPR_MAX bytes without splitting a character.
fn truncate(expr: &str) -> &str {
    if expr.len() <= WP_EXPR_MAX {
        return expr;
    }
    let mut end = WP_EXPR_MAX;
    while !expr.is_char_boundary(end) {
        end -= 1;
    }
    &expr[..end]
}

//! Register Alias Table and dependency resolution.
//!
//! Maps each architectural register to the handle of its latest in-flight
//! producer, or `None` if the committed value is current. Renaming an
//! instruction links it behind the producers of its sources; completing an
//! instruction walks its dependents and reports the ones that became ready.

use crate::common::{NUM_ARCH_REGS, RegId, SimError};
use crate::core::dinst::{DInst, DInstPool, InstHandle};

/// Source slot used for the serialization chain link.
pub const SERIAL_SLOT: usize = 2;

/// Register Alias Table: maps each architectural register to the handle of
/// its latest in-flight producer, or None if the value is committed.
#[derive(Debug)]
pub struct RegisterAliasTable {
    map: [Option<InstHandle>; NUM_ARCH_REGS],
}

impl Default for RegisterAliasTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterAliasTable {
    /// Create a new table with all registers clear (no pending writers).
    pub const fn new() -> Self {
        Self {
            map: [None; NUM_ARCH_REGS],
        }
    }

    /// Mark a register as having a pending writer.
    /// No-op for the zero register.
    pub fn set_producer(&mut self, reg: RegId, h: InstHandle) {
        if !reg.is_zero() {
            self.map[reg.index()] = Some(h);
        }
    }

    /// Get the latest pending writer for a register.
    /// Returns None if the committed value is current.
    pub fn producer(&self, reg: RegId) -> Option<InstHandle> {
        self.map[reg.index()]
    }

    /// Clear a register's pending writer, but ONLY if it is still `h`.
    /// A retiring instruction must not clear a slot a newer rename took over.
    pub fn clear_if_match(&mut self, reg: RegId, h: InstHandle) {
        let slot = &mut self.map[reg.index()];
        if *slot == Some(h) {
            *slot = None;
        }
    }

    /// Flush: clear all entries (all speculative state is gone).
    pub fn flush(&mut self) {
        self.map = [None; NUM_ARCH_REGS];
    }

    /// Number of registers that currently have a pending writer.
    pub fn live_producers(&self) -> usize {
        self.map.iter().filter(|s| s.is_some()).count()
    }

    /// Renames `h`: links its sources behind their producers, then makes it
    /// the producer of its destination register.
    ///
    /// A producer that already executed, or whose handle was recycled, is
    /// treated as a satisfied dependency.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::StaleHandle`] if `h` itself is not live.
    pub fn rename(&mut self, pool: &mut DInstPool, h: InstHandle) -> Result<(), SimError> {
        let regs = pool
            .get(h)
            .map(|d| d.inst.regs)
            .ok_or(SimError::StaleHandle {
                index: h.index(),
                structure: "rename",
            })?;

        for (slot, reg) in regs.sources().into_iter().enumerate() {
            if reg.is_zero() {
                continue;
            }
            if let Some(producer) = self.producer(reg) {
                let _ = add_dependency(pool, slot, producer, h)?;
            }
        }

        self.set_producer(regs.dst, h);
        Ok(())
    }

    /// Completes `h`: drains its dependent list and returns the dependents
    /// whose last pending source this was.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::StaleHandle`] if `h` is not live.
    pub fn resolve(pool: &mut DInstPool, h: InstHandle) -> Result<Vec<InstHandle>, SimError> {
        let waiters = pool
            .get_mut(h)
            .map(DInst::take_dependents)
            .ok_or(SimError::StaleHandle {
                index: h.index(),
                structure: "resolve",
            })?;

        let mut woken = Vec::new();
        for w in waiters {
            // Flushed waiters are simply skipped.
            if let Some(d) = pool.get_mut(w)
                && d.source_ready()
            {
                woken.push(w);
            }
        }
        Ok(woken)
    }
}

/// Makes `consumer` wait for `producer` through source slot `slot`.
///
/// Returns false (and links nothing) if the producer already executed or was recycled.
///
/// # Errors
///
/// Returns [`SimError::StaleHandle`] if `consumer` is not live.
pub fn add_dependency(
    pool: &mut DInstPool,
    slot: usize,
    producer: InstHandle,
    consumer: InstHandle,
) -> Result<bool, SimError> {
    if !pool.contains(consumer) {
        return Err(SimError::StaleHandle {
            index: consumer.index(),
            structure: "dependency link",
        });
    }
    let linked = match pool.get_mut(producer) {
        Some(p) if !p.is_executed() => {
            p.add_dependent(consumer);
            true
        }
        _ => false,
    };
    if linked && let Some(c) = pool.get_mut(consumer) {
        c.link_source(slot, producer);
    }
    Ok(linked)
}

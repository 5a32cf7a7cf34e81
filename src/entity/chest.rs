use std::time::{Duration, Instant};

use crate::memory::{RemoteAddress, RemoteRead};

const PROBE_START: u64 = 0x300;
const PROBE_END: u64 = 0x600;
const PROBE_STEP: u64 = 8;
const PROBE_COOLDOWN: Duration = Duration::from_secs(5);
const MAX_FAILURES: u32 = 3;

/// Discovers the inventory-component field offset inside chest actors.
///
/// Chest blueprints do not share a layout across game builds, so the offset
/// is found by scanning a pointer-sized window of the actor and asking the
/// caller to validate each candidate. A confirmed offset is reused for every
/// chest afterwards; probing stops for good after repeated failures.
pub struct ChestProbe {
    cached_offset: Option<u64>,
    fail_count: u32,
    last_probe: Option<Instant>,
    cooldown: Duration,
}

impl ChestProbe {
    pub fn new() -> Self {
        Self::with_cooldown(PROBE_COOLDOWN)
    }

    pub fn with_cooldown(cooldown: Duration) -> Self {
        Self { cached_offset: None, fail_count: 0, last_probe: None, cooldown }
    }

    pub fn cached_offset(&self) -> Option<u64> {
        self.cached_offset
    }

    /// Returns the inventory component of a chest actor, probing for the
    /// field offset if it is not yet known. `validate` must confirm that a
    /// candidate pointer really is an inventory component with readable
    /// item entries.
    pub fn locate<F>(
        &mut self,
        reader: &dyn RemoteRead,
        actor: RemoteAddress,
        validate: F,
    ) -> Option<RemoteAddress>
    where
        F: Fn(RemoteAddress) -> bool,
    {
        if let Some(off) = self.cached_offset {
            let ptr = reader.read_ptr(actor.offset(off as i64)).ok()?;
            if ptr.is_plausible() {
                return Some(ptr);
            }
            // Layout changed under us, re-probe from scratch
            self.cached_offset = None;
        }

        if self.fail_count >= MAX_FAILURES {
            return None;
        }
        if let Some(last) = self.last_probe {
            if last.elapsed() < self.cooldown {
                return None;
            }
        }
        self.last_probe = Some(Instant::now());

        let mut off = PROBE_START;
        while off <= PROBE_END {
            if let Ok(ptr) = reader.read_ptr(actor.offset(off as i64)) {
                if ptr.is_plausible() && validate(ptr) {
                    log::debug!("chest inventory component found at actor+{off:#x}");
                    self.cached_offset = Some(off);
                    self.fail_count = 0;
                    return Some(ptr);
                }
            }
            off += PROBE_STEP;
        }

        self.fail_count += 1;
        if self.fail_count >= MAX_FAILURES {
            log::debug!("giving up on chest inventory probing after {MAX_FAILURES} attempts");
        }
        None
    }
}

impl Default for ChestProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::mock::MockMemory;

    const ACTOR: u64 = 0x2000_0000;
    const COMPONENT: u64 = 0x3000_0000;

    fn chest_with_component_at(off: u64) -> MockMemory {
        let mem = MockMemory::new();
        let mut o = PROBE_START;
        while o <= PROBE_END {
            mem.write_u64(ACTOR + o, 0);
            o += PROBE_STEP;
        }
        mem.write_u64(ACTOR + off, COMPONENT);
        mem
    }

    #[test]
    fn probe_finds_and_caches_the_offset() {
        let mem = chest_with_component_at(0x4a8);
        let mut probe = ChestProbe::with_cooldown(Duration::ZERO);

        let found = probe.locate(&mem, RemoteAddress::new(ACTOR), |p| p.as_u64() == COMPONENT);
        assert_eq!(found, Some(RemoteAddress::new(COMPONENT)));
        assert_eq!(probe.cached_offset(), Some(0x4a8));

        // Second call must hit the cache, not the validator
        let found = probe.locate(&mem, RemoteAddress::new(ACTOR), |_| false);
        assert_eq!(found, Some(RemoteAddress::new(COMPONENT)));
    }

    #[test]
    fn probe_gives_up_after_repeated_failures() {
        let mem = chest_with_component_at(0x4a8);
        let mut probe = ChestProbe::with_cooldown(Duration::ZERO);

        for _ in 0..MAX_FAILURES {
            assert!(probe.locate(&mem, RemoteAddress::new(ACTOR), |_| false).is_none());
        }
        // Even a now-passing validator is never consulted again
        assert!(probe
            .locate(&mem, RemoteAddress::new(ACTOR), |p| p.as_u64() == COMPONENT)
            .is_none());
    }

    #[test]
    fn cooldown_throttles_rescans() {
        let mem = chest_with_component_at(0x4a8);
        let mut probe = ChestProbe::with_cooldown(Duration::from_secs(3600));

        assert!(probe.locate(&mem, RemoteAddress::new(ACTOR), |_| false).is_none());
        assert_eq!(probe.fail_count, 1);
        // Within the cooldown the probe does not run at all
        assert!(probe.locate(&mem, RemoteAddress::new(ACTOR), |_| false).is_none());
        assert_eq!(probe.fail_count, 1);
    }

    #[test]
    fn stale_cached_offset_triggers_reprobe() {
        let mem = chest_with_component_at(0x4a8);
        let mut probe = ChestProbe::with_cooldown(Duration::ZERO);
        probe.cached_offset = Some(0x310);

        // Cached slot holds a null pointer, so the probe falls through to a
        // fresh scan and relocates the component.
        let found = probe.locate(&mem, RemoteAddress::new(ACTOR), |p| p.as_u64() == COMPONENT);
        assert_eq!(found, Some(RemoteAddress::new(COMPONENT)));
        assert_eq!(probe.cached_offset(), Some(0x4a8));
    }
}

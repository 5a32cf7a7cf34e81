use crate::memory::{RemoteAddress, RemoteRead};
use crate::world::offsets;
use crate::world::types::TArrayRaw;
use log::{info, warn};

const SCAN_START: u64 = 0x28;
const SCAN_END: u64 = 0x200;
const SCAN_STEP: u64 = 8;
const MAX_ACTOR_COUNT: i32 = 100_000;
const MAX_ACTOR_CAPACITY: i32 = 200_000;
const VERIFY_SAMPLE: usize = 5;

/// Discovered per-build layout facts. The level's actors array shifts between
/// client updates, so its offset is validated on first use and rediscovered
/// by scanning a live level object when the default stops working.
pub struct LayoutResolver {
    level_actors: u64,
    resolved: bool,
}

impl LayoutResolver {
    pub fn new() -> Self {
        Self { level_actors: offsets::level::ACTORS, resolved: false }
    }

    pub fn with_level_actors(offset: u64) -> Self {
        Self { level_actors: offset, resolved: false }
    }

    pub fn level_actors_offset(&self) -> u64 {
        self.level_actors
    }

    /// Validate or discover the actors offset against a live level object.
    /// Runs once; subsequent calls are free.
    pub fn ensure_level_actors(&mut self, reader: &dyn RemoteRead, level: RemoteAddress) -> u64 {
        if self.resolved || level.is_null() {
            return self.level_actors;
        }
        self.resolved = true;

        if Self::verified_entries(reader, level, self.level_actors) > 0 {
            info!("level actors offset 0x{:x} validated", self.level_actors);
            return self.level_actors;
        }

        warn!("level actors offset 0x{:x} failed validation, scanning", self.level_actors);

        let mut best: Option<(u64, i32, usize)> = None;
        let mut offset = SCAN_START;
        while offset <= SCAN_END {
            let verified = Self::verified_entries(reader, level, offset);
            if verified > 0 {
                let count = TArrayRaw::read_from(reader, level + offset)
                    .map(|a| a.count)
                    .unwrap_or(0);
                let better = match best {
                    Some((_, bc, bv)) => verified > bv || (verified == bv && count > bc),
                    None => true,
                };
                if better {
                    best = Some((offset, count, verified));
                }
            }
            offset += SCAN_STEP;
        }

        match best {
            Some((off, count, verified)) => {
                info!(
                    "level actors offset discovered at 0x{:x} (count={}, verified={})",
                    off, count, verified
                );
                self.level_actors = off;
            }
            None => {
                warn!("no plausible actors array found in level scan; keeping 0x{:x}", self.level_actors);
            }
        }
        self.level_actors
    }

    /// How many of the first few entries at the candidate offset look like
    /// live objects (plausible pointer whose first field is itself a
    /// plausible vtable pointer).
    fn verified_entries(reader: &dyn RemoteRead, level: RemoteAddress, offset: u64) -> usize {
        let array = match TArrayRaw::read_from(reader, level + offset) {
            Ok(a) => a,
            Err(_) => return 0,
        };
        if !array.is_plausible(MAX_ACTOR_COUNT) || array.max >= MAX_ACTOR_CAPACITY {
            return 0;
        }
        let sample = (array.count as usize).min(VERIFY_SAMPLE);
        let entries = match reader.read_vec(array.data, sample * 8) {
            Ok(raw) => raw,
            Err(_) => return 0,
        };
        entries
            .chunks_exact(8)
            .filter(|chunk| {
                let ptr = RemoteAddress::new(u64::from_le_bytes((*chunk).try_into().unwrap_or_default()));
                if !ptr.is_plausible() {
                    return false;
                }
                match reader.read_ptr(ptr) {
                    Ok(vtable) => vtable.is_plausible(),
                    Err(_) => false,
                }
            })
            .count()
    }
}

impl Default for LayoutResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::mock::MockMemory;

    const LEVEL: u64 = 0x100_0000;
    const VTABLE: u64 = 0x7F00_0000;

    fn seed_actor(mem: &MockMemory, at: u64) {
        mem.write_u64(at, VTABLE);
        mem.write_u64(VTABLE, 0x1234_5678);
    }

    fn seed_actor_array(mem: &MockMemory, array_header: u64, data: u64, count: i32) {
        mem.write_tarray(array_header, data, count, count + 4);
        for i in 0..count as u64 {
            let actor = 0x200_0000 + i * 0x1000;
            seed_actor(mem, actor);
            mem.write_u64(data + i * 8, actor);
        }
    }

    #[test]
    fn default_offset_validates_without_scan() {
        let mem = MockMemory::new();
        seed_actor_array(&mem, LEVEL + offsets::level::ACTORS, 0x300_0000, 3);
        let mut layout = LayoutResolver::new();
        let off = layout.ensure_level_actors(&mem, RemoteAddress::new(LEVEL));
        assert_eq!(off, offsets::level::ACTORS);
    }

    #[test]
    fn broken_default_triggers_discovery() {
        let mem = MockMemory::new();
        // Default offset holds garbage, real array lives at 0x150
        mem.write_tarray(LEVEL + offsets::level::ACTORS, 0xFFFF_FFFF_FFFF_0000, 7, 8);
        seed_actor_array(&mem, LEVEL + 0x150, 0x300_0000, 6);
        // Fill the rest of the scan window so header reads don't fail
        let mut off = SCAN_START;
        while off <= SCAN_END + 16 {
            if off != 0x150 && off != 0x158 && off != offsets::level::ACTORS {
                mem.write_u64(LEVEL + off, 0);
            }
            off += 8;
        }

        let mut layout = LayoutResolver::new();
        let found = layout.ensure_level_actors(&mem, RemoteAddress::new(LEVEL));
        assert_eq!(found, 0x150);
        // Resolution is sticky
        assert_eq!(layout.level_actors_offset(), 0x150);
    }

    #[test]
    fn pinned_offset_overrides_the_default() {
        let mem = MockMemory::new();
        seed_actor_array(&mem, LEVEL + 0x188, 0x300_0000, 3);
        let mut layout = LayoutResolver::with_level_actors(0x188);
        let off = layout.ensure_level_actors(&mem, RemoteAddress::new(LEVEL));
        assert_eq!(off, 0x188);
    }

    #[test]
    fn no_candidate_keeps_default() {
        let mem = MockMemory::new();
        let mut off = SCAN_START;
        while off <= SCAN_END + 16 {
            mem.write_u64(LEVEL + off, 0);
            off += 8;
        }
        let mut layout = LayoutResolver::new();
        let found = layout.ensure_level_actors(&mem, RemoteAddress::new(LEVEL));
        assert_eq!(found, offsets::level::ACTORS);
    }
}

use crate::memory::{RemoteAddress, RemoteRead};
use ahash::AHashMap;
use log::{info, warn};
use parking_lot::RwLock;
use std::sync::Arc;

const BLOCK_OFFSET_BITS: u32 = 16;
const BLOCKS_OFFSET: u64 = 0x10;
const ENTRY_STRIDE: u64 = 2;
const MAX_NAME_LEN: u32 = 1024;

/// Reads interned engine names out of the remote name pool.
///
/// Pool layout: a block pointer array at pool + 0x10, entries addressed by
/// `block = index >> 16`, `offset = (index & 0xFFFF) * 2`. Each entry starts
/// with a 2-byte header: bit 0 selects wide encoding, bits 6..16 hold the
/// length.
pub struct NameResolver {
    reader: Arc<dyn RemoteRead>,
    pool: RemoteAddress,
    cache: RwLock<AHashMap<u32, String>>,
}

impl NameResolver {
    pub fn new(reader: Arc<dyn RemoteRead>, pool: RemoteAddress) -> Self {
        Self { reader, pool, cache: RwLock::new(AHashMap::new()) }
    }

    pub fn pool_address(&self) -> RemoteAddress {
        self.pool
    }

    /// Index 0 must resolve to "None" on a correct pool address. When it does
    /// not, the configured address may be a pointer to the pool rather than
    /// the pool itself, so one extra dereference is tried before giving up.
    pub fn initialize(&mut self) -> bool {
        if self.pool.is_null() {
            warn!("name pool address is null");
            return false;
        }

        if self.resolve(0) == "None" {
            info!("name pool verified at {} (index 0 = None)", self.pool);
            return true;
        }

        if let Ok(deref) = self.reader.read_ptr(self.pool) {
            if deref.is_plausible() {
                let saved = self.pool;
                self.pool = deref;
                self.cache.write().clear();
                if self.resolve(0) == "None" {
                    info!("name pool dereferenced: {} -> {} (index 0 = None)", saved, deref);
                    return true;
                }
                self.pool = saved;
                self.cache.write().clear();
            }
        }

        warn!("name pool at {} failed the None check; name reads may be garbage", self.pool);
        false
    }

    /// Resolved name for a pool index, or empty string if unreadable.
    pub fn resolve(&self, index: u32) -> String {
        if let Some(hit) = self.cache.read().get(&index) {
            return hit.clone();
        }
        if self.pool.is_null() {
            return String::new();
        }

        let block = (index >> BLOCK_OFFSET_BITS) as u64;
        let offset = (index & ((1 << BLOCK_OFFSET_BITS) - 1)) as u64;

        let block_ptr = match self.reader.read_ptr(self.pool + BLOCKS_OFFSET + block * 8) {
            Ok(p) if p.is_plausible() => p,
            _ => return String::new(),
        };

        let name = self.read_entry(block_ptr + offset * ENTRY_STRIDE);
        if !name.is_empty() {
            self.cache.write().insert(index, name.clone());
        }
        name
    }

    /// Full name for an (index, number) pair. A nonzero number denotes the
    /// instanced form, printed as "_{number - 1}".
    pub fn resolve_fname(&self, index: u32, number: u32) -> String {
        let base = self.resolve(index);
        if base.is_empty() || number == 0 {
            return base;
        }
        format!("{}_{}", base, number - 1)
    }

    fn read_entry(&self, entry: RemoteAddress) -> String {
        let header = match self.reader.read_u16(entry) {
            Ok(h) => h,
            Err(_) => return String::new(),
        };
        let wide = header & 1 != 0;
        let len = (header >> 6) as u32;
        if len == 0 || len > MAX_NAME_LEN {
            return String::new();
        }

        let data = entry + 2;
        if wide {
            let raw = match self.reader.read_vec(data, len as usize * 2) {
                Ok(r) => r,
                Err(_) => return String::new(),
            };
            raw.chunks_exact(2)
                .map(|pair| {
                    let cu = u16::from_le_bytes([pair[0], pair[1]]);
                    if cu < 128 { cu as u8 as char } else { '?' }
                })
                .collect()
        } else {
            match self.reader.read_vec(data, len as usize) {
                Ok(raw) => raw
                    .into_iter()
                    .map(|b| if b < 128 { b as char } else { '?' })
                    .collect(),
                Err(_) => String::new(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::mock::MockMemory;

    const POOL: u64 = 0x10_0000;
    const BLOCK0: u64 = 0x20_0000;

    fn write_entry(mem: &MockMemory, at: u64, name: &str) {
        let header = (name.len() as u16) << 6;
        mem.write_u16(at, header);
        mem.write_ascii(at + 2, name);
    }

    fn pool_with_none(mem: &MockMemory) {
        mem.write_u64(POOL + 0x10, BLOCK0);
        write_entry(mem, BLOCK0, "None");
    }

    fn resolver(mem: Arc<MockMemory>) -> NameResolver {
        NameResolver::new(mem, RemoteAddress::new(POOL))
    }

    #[test]
    fn none_round_trip() {
        let mem = Arc::new(MockMemory::new());
        pool_with_none(&mem);
        let mut r = resolver(mem);
        assert!(r.initialize());
        assert_eq!(r.resolve(0), "None");
    }

    #[test]
    fn block_and_offset_decomposition() {
        let mem = Arc::new(MockMemory::new());
        pool_with_none(&mem);
        // Block 1, offset 0x30 (index 0x10030), entry at block1 + 0x60
        let block1 = 0x30_0000u64;
        mem.write_u64(POOL + 0x10 + 8, block1);
        write_entry(&mem, block1 + 0x60, "BP_PlayerCharacterDungeon_C");

        let r = resolver(mem);
        assert_eq!(r.resolve(0x0001_0030), "BP_PlayerCharacterDungeon_C");
    }

    #[test]
    fn wide_entry_narrows_with_placeholder() {
        let mem = Arc::new(MockMemory::new());
        mem.write_u64(POOL + 0x10, BLOCK0);
        // 3 wide chars: 'A', U+00E9, 'Z'
        let header: u16 = (3 << 6) | 1;
        mem.write_u16(BLOCK0, header);
        mem.write_u16(BLOCK0 + 2, 'A' as u16);
        mem.write_u16(BLOCK0 + 4, 0x00E9);
        mem.write_u16(BLOCK0 + 6, 'Z' as u16);

        let r = resolver(mem);
        assert_eq!(r.resolve(0), "A?Z");
    }

    #[test]
    fn instanced_names_append_number_minus_one() {
        let mem = Arc::new(MockMemory::new());
        pool_with_none(&mem);
        write_entry(&mem, BLOCK0 + 0x40, "Chest");
        let r = resolver(mem);
        assert_eq!(r.resolve_fname(0x20, 0), "Chest");
        assert_eq!(r.resolve_fname(0x20, 3), "Chest_2");
        assert_eq!(r.resolve_fname(0x7777, 5), "");
    }

    #[test]
    fn pointer_to_pool_fallback() {
        let mem = Arc::new(MockMemory::new());
        // POOL holds a pointer to the real pool
        let real_pool = 0x40_0000u64;
        mem.write_u64(POOL, real_pool);
        // Make the direct interpretation fail: blocks slot unreadable is enough
        mem.write_u64(real_pool + 0x10, BLOCK0);
        write_entry(&mem, BLOCK0, "None");

        let mut r = resolver(mem);
        assert!(r.initialize());
        assert_eq!(r.pool_address().as_u64(), real_pool);
        assert_eq!(r.resolve(0), "None");
    }

    #[test]
    fn unreadable_index_is_empty() {
        let mem = Arc::new(MockMemory::new());
        pool_with_none(&mem);
        let r = resolver(mem);
        assert_eq!(r.resolve(0x9999), "");
    }
}

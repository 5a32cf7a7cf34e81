use crate::memory::{MemoryError, RemoteAddress, RemoteRead};
use ahash::AHashMap;
use parking_lot::RwLock;

/// Byte-granular fake address space for tests. Reads touching any unmapped
/// byte fail the way a bad remote read would.
pub struct MockMemory {
    bytes: RwLock<AHashMap<u64, u8>>,
}

impl MockMemory {
    pub fn new() -> Self {
        Self { bytes: RwLock::new(AHashMap::new()) }
    }

    pub fn write_bytes(&self, addr: u64, data: &[u8]) {
        let mut map = self.bytes.write();
        for (i, &b) in data.iter().enumerate() {
            map.insert(addr + i as u64, b);
        }
    }

    pub fn write_u16(&self, addr: u64, value: u16) {
        self.write_bytes(addr, &value.to_le_bytes());
    }

    pub fn write_u32(&self, addr: u64, value: u32) {
        self.write_bytes(addr, &value.to_le_bytes());
    }

    pub fn write_u64(&self, addr: u64, value: u64) {
        self.write_bytes(addr, &value.to_le_bytes());
    }

    pub fn write_i32(&self, addr: u64, value: i32) {
        self.write_bytes(addr, &value.to_le_bytes());
    }

    pub fn write_f32(&self, addr: u64, value: f32) {
        self.write_bytes(addr, &value.to_le_bytes());
    }

    pub fn write_f64(&self, addr: u64, value: f64) {
        self.write_bytes(addr, &value.to_le_bytes());
    }

    pub fn write_u8(&self, addr: u64, value: u8) {
        self.write_bytes(addr, &[value]);
    }

    /// ASCII bytes, no terminator.
    pub fn write_ascii(&self, addr: u64, s: &str) {
        self.write_bytes(addr, s.as_bytes());
    }

    /// UTF-16LE code units followed by a NUL.
    pub fn write_wide_str(&self, addr: u64, s: &str) {
        let mut data = Vec::new();
        for cu in s.encode_utf16() {
            data.extend_from_slice(&cu.to_le_bytes());
        }
        data.extend_from_slice(&0u16.to_le_bytes());
        self.write_bytes(addr, &data);
    }

    /// TArray header: { data: u64, count: i32, max: i32 }.
    pub fn write_tarray(&self, addr: u64, data: u64, count: i32, max: i32) {
        self.write_u64(addr, data);
        self.write_i32(addr + 8, count);
        self.write_i32(addr + 12, max);
    }

    /// FString header is the same shape as a TArray of u16.
    pub fn write_fstring(&self, addr: u64, data_addr: u64, s: &str) {
        let count = s.encode_utf16().count() as i32 + 1;
        self.write_tarray(addr, data_addr, count, count);
        self.write_wide_str(data_addr, s);
    }

    /// FName: { comparison_index: u32, number: u32 }.
    pub fn write_fname(&self, addr: u64, index: u32, number: u32) {
        self.write_u32(addr, index);
        self.write_u32(addr + 4, number);
    }
}

impl Default for MockMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteRead for MockMemory {
    fn read_bytes(&self, addr: RemoteAddress, buf: &mut [u8]) -> Result<(), MemoryError> {
        let map = self.bytes.read();
        for (i, slot) in buf.iter_mut().enumerate() {
            match map.get(&(addr.as_u64() + i as u64)) {
                Some(&b) => *slot = b,
                None => return Err(MemoryError::ReadFailed(addr.as_u64())),
            }
        }
        Ok(())
    }
}

use crate::memory::{MemoryError, RemoteAddress, RemoteRead};
use crate::pattern::Pattern;
use log::debug;

/// Window size for remote scans. Reads go through the accessor, so the
/// window trades syscall (or relay) count against buffer size.
pub const SCAN_CHUNK: usize = 0x10000;

pub struct RemoteScanner<'a> {
    reader: &'a dyn RemoteRead,
}

impl<'a> RemoteScanner<'a> {
    pub fn new(reader: &'a dyn RemoteRead) -> Self {
        Self { reader }
    }

    /// First match of `pattern` in [start, start + size). Windows overlap by
    /// pattern length - 1 so a match straddling a window edge is still seen.
    /// Unreadable windows are skipped, not fatal.
    pub fn scan(&self, start: RemoteAddress, size: u64, pattern: &Pattern) -> Option<RemoteAddress> {
        if pattern.is_empty() || size < pattern.len() as u64 {
            return None;
        }
        let overlap = pattern.len() - 1;
        let mut offset = 0u64;

        while offset < size {
            let want = (SCAN_CHUNK as u64).min(size - offset) as usize;
            if want < pattern.len() {
                break;
            }
            let at = start + offset;
            match self.reader.read_vec(at, want) {
                Ok(buf) => {
                    if let Some(hit) = pattern.find_in(&buf) {
                        return Some(at + hit as u64);
                    }
                }
                Err(_) => {
                    debug!("scan window unreadable at {}", at);
                }
            }
            offset += (want - overlap) as u64;
        }
        None
    }
}

/// Resolve a RIP-relative operand: the i32 displacement at
/// `at + disp_offset`, relative to the end of an `instr_len`-byte
/// instruction starting at `at`.
pub fn resolve_relative(
    reader: &dyn RemoteRead,
    at: RemoteAddress,
    disp_offset: u64,
    instr_len: u64,
) -> Result<RemoteAddress, MemoryError> {
    let disp = reader.read_i32(at + disp_offset)?;
    Ok((at + instr_len).offset(disp as i64))
}

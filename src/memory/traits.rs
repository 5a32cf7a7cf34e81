use crate::memory::{MemoryError, RemoteAddress};

/// Read-only view of another process's address space. Every higher layer
/// (name pool, world walk, entity reads) goes through this trait, so tests
/// can substitute a synthetic backend.
pub trait RemoteRead: Send + Sync {
    fn read_bytes(&self, addr: RemoteAddress, buf: &mut [u8]) -> Result<(), MemoryError>;

    fn read_vec(&self, addr: RemoteAddress, len: usize) -> Result<Vec<u8>, MemoryError> {
        let mut buf = vec![0u8; len];
        self.read_bytes(addr, &mut buf)?;
        Ok(buf)
    }

    fn read_u8(&self, addr: RemoteAddress) -> Result<u8, MemoryError> {
        let mut b = [0u8; 1];
        self.read_bytes(addr, &mut b)?;
        Ok(b[0])
    }

    fn read_u16(&self, addr: RemoteAddress) -> Result<u16, MemoryError> {
        let mut b = [0u8; 2];
        self.read_bytes(addr, &mut b)?;
        Ok(u16::from_le_bytes(b))
    }

    fn read_u32(&self, addr: RemoteAddress) -> Result<u32, MemoryError> {
        let mut b = [0u8; 4];
        self.read_bytes(addr, &mut b)?;
        Ok(u32::from_le_bytes(b))
    }

    fn read_u64(&self, addr: RemoteAddress) -> Result<u64, MemoryError> {
        let mut b = [0u8; 8];
        self.read_bytes(addr, &mut b)?;
        Ok(u64::from_le_bytes(b))
    }

    fn read_i32(&self, addr: RemoteAddress) -> Result<i32, MemoryError> {
        let mut b = [0u8; 4];
        self.read_bytes(addr, &mut b)?;
        Ok(i32::from_le_bytes(b))
    }

    fn read_f32(&self, addr: RemoteAddress) -> Result<f32, MemoryError> {
        let mut b = [0u8; 4];
        self.read_bytes(addr, &mut b)?;
        Ok(f32::from_le_bytes(b))
    }

    fn read_f64(&self, addr: RemoteAddress) -> Result<f64, MemoryError> {
        let mut b = [0u8; 8];
        self.read_bytes(addr, &mut b)?;
        Ok(f64::from_le_bytes(b))
    }

    fn read_bool(&self, addr: RemoteAddress) -> Result<bool, MemoryError> {
        Ok(self.read_u8(addr)? != 0)
    }

    fn read_ptr(&self, addr: RemoteAddress) -> Result<RemoteAddress, MemoryError> {
        Ok(RemoteAddress::new(self.read_u64(addr)?))
    }

    /// UTF-16 string in remote memory, narrowed to ASCII with `?` placeholders.
    /// Stops at the first NUL.
    fn read_wide_string(&self, addr: RemoteAddress, chars: usize) -> Result<String, MemoryError> {
        let raw = self.read_vec(addr, chars * 2)?;
        let mut out = String::with_capacity(chars);
        for pair in raw.chunks_exact(2) {
            let cu = u16::from_le_bytes([pair[0], pair[1]]);
            if cu == 0 {
                break;
            }
            if cu < 128 {
                out.push(cu as u8 as char);
            } else {
                out.push('?');
            }
        }
        Ok(out)
    }
}

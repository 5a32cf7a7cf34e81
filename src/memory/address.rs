use std::fmt;
use std::ops::{Add, Sub};

/// Lowest address a live game allocation can plausibly sit at.
pub const MIN_CANONICAL: u64 = 0x10000;
/// Upper bound of canonical user-space addresses on x86-64.
pub const MAX_CANONICAL: u64 = 0x0000_7FFF_FFFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RemoteAddress {
    value: u64,
}

impl RemoteAddress {
    pub fn new(value: u64) -> Self {
        Self { value }
    }

    pub fn zero() -> Self {
        Self { value: 0 }
    }

    pub fn as_u64(&self) -> u64 {
        self.value
    }

    pub fn is_null(&self) -> bool {
        self.value == 0
    }

    /// Heap pointers read out of the target are garbage unless they land in
    /// the canonical user range.
    pub fn is_plausible(&self) -> bool {
        self.value >= MIN_CANONICAL && self.value <= MAX_CANONICAL
    }

    pub fn offset(&self, offset: i64) -> Self {
        Self { value: (self.value as i64).wrapping_add(offset) as u64 }
    }

    pub fn align_down(&self, alignment: u64) -> Self {
        Self { value: self.value & !(alignment - 1) }
    }

    pub fn is_within_range(&self, start: Self, end: Self) -> bool {
        self.value >= start.value && self.value < end.value
    }
}

impl fmt::Display for RemoteAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.value)
    }
}

impl fmt::LowerHex for RemoteAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.value, f)
    }
}

impl Add<u64> for RemoteAddress {
    type Output = Self;
    fn add(self, rhs: u64) -> Self::Output {
        Self { value: self.value.wrapping_add(rhs) }
    }
}

impl Sub<u64> for RemoteAddress {
    type Output = Self;
    fn sub(self, rhs: u64) -> Self::Output {
        Self { value: self.value.wrapping_sub(rhs) }
    }
}

impl Sub<RemoteAddress> for RemoteAddress {
    type Output = i64;
    fn sub(self, rhs: RemoteAddress) -> Self::Output {
        self.value as i64 - rhs.value as i64
    }
}

impl From<u64> for RemoteAddress {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl From<RemoteAddress> for u64 {
    fn from(addr: RemoteAddress) -> Self {
        addr.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plausibility_bounds() {
        assert!(!RemoteAddress::zero().is_plausible());
        assert!(!RemoteAddress::new(0x1000).is_plausible());
        assert!(RemoteAddress::new(0x10000).is_plausible());
        assert!(RemoteAddress::new(0x7FFF_FFFF_0000).is_plausible());
        assert!(!RemoteAddress::new(0xFFFF_8000_0000_0000).is_plausible());
    }

    #[test]
    fn arithmetic() {
        let a = RemoteAddress::new(0x1000);
        assert_eq!((a + 0x10).as_u64(), 0x1010);
        assert_eq!((a - 0x10).as_u64(), 0xFF0);
        assert_eq!(a.offset(-0x100).as_u64(), 0xF00);
        assert_eq!(RemoteAddress::new(0x1234).align_down(0x1000).as_u64(), 0x1000);
    }
}

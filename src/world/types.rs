use crate::memory::{MemoryError, RemoteAddress, RemoteRead};
use std::ops::Sub;

/// World-space position, engine units (centimeters), double precision.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance_to(&self, other: &Vec3) -> f64 {
        (*self - *other).length()
    }

    /// Engine units are centimeters.
    pub fn distance_to_meters(&self, other: &Vec3) -> f64 {
        self.distance_to(other) / 100.0
    }

    pub fn dot(&self, other: &Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn read_from(reader: &dyn RemoteRead, addr: RemoteAddress) -> Result<Self, MemoryError> {
        let raw = reader.read_vec(addr, 24)?;
        Ok(Self {
            x: f64::from_le_bytes(raw[0..8].try_into().unwrap_or_default()),
            y: f64::from_le_bytes(raw[8..16].try_into().unwrap_or_default()),
            z: f64::from_le_bytes(raw[16..24].try_into().unwrap_or_default()),
        })
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rotator {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

impl Rotator {
    pub fn read_from(reader: &dyn RemoteRead, addr: RemoteAddress) -> Result<Self, MemoryError> {
        let raw = reader.read_vec(addr, 24)?;
        Ok(Self {
            pitch: f64::from_le_bytes(raw[0..8].try_into().unwrap_or_default()),
            yaw: f64::from_le_bytes(raw[8..16].try_into().unwrap_or_default()),
            roll: f64::from_le_bytes(raw[16..24].try_into().unwrap_or_default()),
        })
    }
}

/// Header of an engine dynamic array: { data, count, max }.
#[derive(Debug, Clone, Copy, Default)]
pub struct TArrayRaw {
    pub data: RemoteAddress,
    pub count: i32,
    pub max: i32,
}

impl TArrayRaw {
    pub fn read_from(reader: &dyn RemoteRead, addr: RemoteAddress) -> Result<Self, MemoryError> {
        let raw = reader.read_vec(addr, 16)?;
        Ok(Self {
            data: RemoteAddress::new(u64::from_le_bytes(raw[0..8].try_into().unwrap_or_default())),
            count: i32::from_le_bytes(raw[8..12].try_into().unwrap_or_default()),
            max: i32::from_le_bytes(raw[12..16].try_into().unwrap_or_default()),
        })
    }

    /// Filters out garbage headers read from wrong offsets or torn frames.
    pub fn is_plausible(&self, max_count: i32) -> bool {
        self.data.is_plausible()
            && self.count > 0
            && self.count < max_count
            && self.max >= self.count
    }

    /// All pointer-sized elements, nulls preserved.
    pub fn read_ptr_elements(
        &self,
        reader: &dyn RemoteRead,
    ) -> Result<Vec<RemoteAddress>, MemoryError> {
        let raw = reader.read_vec(self.data, self.count as usize * 8)?;
        Ok(raw
            .chunks_exact(8)
            .map(|c| RemoteAddress::new(u64::from_le_bytes(c.try_into().unwrap_or_default())))
            .collect())
    }
}

/// Engine FName handle: comparison index plus instance number.
#[derive(Debug, Clone, Copy, Default)]
pub struct FNameRaw {
    pub index: u32,
    pub number: u32,
}

impl FNameRaw {
    pub fn read_from(reader: &dyn RemoteRead, addr: RemoteAddress) -> Result<Self, MemoryError> {
        let raw = reader.read_vec(addr, 8)?;
        Ok(Self {
            index: u32::from_le_bytes(raw[0..4].try_into().unwrap_or_default()),
            number: u32::from_le_bytes(raw[4..8].try_into().unwrap_or_default()),
        })
    }
}

/// Heap-backed UTF-16 engine string. Reads resolve to ASCII with `?`
/// placeholders; anything implausible resolves to empty.
pub fn read_fstring(
    reader: &dyn RemoteRead,
    addr: RemoteAddress,
    max_chars: i32,
) -> Result<String, MemoryError> {
    let header = TArrayRaw::read_from(reader, addr)?;
    if !header.data.is_plausible() || header.count <= 0 || header.count >= max_chars {
        return Ok(String::new());
    }
    reader.read_wide_string(header.data, header.count as usize)
}

/// Camera state for one frame of projection.
#[derive(Debug, Clone, Copy, Default)]
pub struct CameraPose {
    pub location: Vec3,
    pub rotation: Rotator,
    pub fov: f32,
}

impl CameraPose {
    /// Layout: location (24 bytes), rotation (24 bytes), fov (4 bytes).
    pub fn read_from(reader: &dyn RemoteRead, addr: RemoteAddress) -> Result<Self, MemoryError> {
        Ok(Self {
            location: Vec3::read_from(reader, addr)?,
            rotation: Rotator::read_from(reader, addr + 24)?,
            fov: reader.read_f32(addr + 48)?,
        })
    }

    pub fn fov_is_sane(&self) -> bool {
        self.fov > 0.0 && self.fov <= 180.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::mock::MockMemory;

    #[test]
    fn vec3_distance_in_meters() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(300.0, 400.0, 0.0);
        assert_eq!(a.distance_to(&b), 500.0);
        assert_eq!(a.distance_to_meters(&b), 5.0);
    }

    #[test]
    fn tarray_plausibility() {
        let ok = TArrayRaw { data: RemoteAddress::new(0x10_0000), count: 10, max: 16 };
        assert!(ok.is_plausible(100_000));
        let shrunk = TArrayRaw { data: RemoteAddress::new(0x10_0000), count: 10, max: 4 };
        assert!(!shrunk.is_plausible(100_000));
        let null = TArrayRaw { data: RemoteAddress::zero(), count: 10, max: 16 };
        assert!(!null.is_plausible(100_000));
        let huge = TArrayRaw { data: RemoteAddress::new(0x10_0000), count: 100_001, max: 200_000 };
        assert!(!huge.is_plausible(100_000));
    }

    #[test]
    fn camera_pose_read() {
        let mem = MockMemory::new();
        let at = 0x5000u64;
        mem.write_f64(at, 1.0);
        mem.write_f64(at + 8, 2.0);
        mem.write_f64(at + 16, 3.0);
        mem.write_f64(at + 24, -10.0);
        mem.write_f64(at + 32, 90.0);
        mem.write_f64(at + 40, 0.0);
        mem.write_f32(at + 48, 100.0);

        let pose = CameraPose::read_from(&mem, RemoteAddress::new(at)).unwrap();
        assert_eq!(pose.location, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(pose.rotation.yaw, 90.0);
        assert!(pose.fov_is_sane());
    }

    #[test]
    fn fstring_read_narrows() {
        let mem = MockMemory::new();
        mem.write_fstring(0x6_0000, 0x6_1000, "Remy");
        let s = read_fstring(&mem, RemoteAddress::new(0x6_0000), 128).unwrap();
        assert_eq!(s, "Remy");
    }
}

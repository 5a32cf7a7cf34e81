use crate::memory::{MemoryError, RemoteAddress};
use log::{debug, warn};
use memmap2::MmapMut;
use std::cell::UnsafeCell;
use std::fs::OpenOptions;
use std::mem::size_of;
use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

// "DWRL" little-endian
pub const RELAY_MAGIC: u32 = 0x4C52_5744;
pub const RELAY_VERSION: u32 = 1;
pub const SLOT_COUNT: usize = 4;
pub const SLOT_DATA_MAX: usize = 0x4000;

pub const STATE_IDLE: u32 = 0;
pub const STATE_REQUEST: u32 = 1;
pub const STATE_READY: u32 = 2;
pub const STATE_ERROR: u32 = 3;

const REQUEST_TIMEOUT: Duration = Duration::from_millis(100);

#[repr(C)]
pub struct RelayHeader {
    pub magic: AtomicU32,
    pub version: AtomicU32,
    pub pid: AtomicU32,
    pub heartbeat: AtomicU32,
    pub module_base: AtomicU64,
    pub module_size: AtomicU64,
}

#[repr(C)]
pub struct RelaySlot {
    pub state: AtomicU32,
    pub size: AtomicU32,
    pub address: AtomicU64,
    data: UnsafeCell<[u8; SLOT_DATA_MAX]>,
}

// data is only touched by the side the state machine currently hands the
// slot to; the state transitions carry the acquire/release edges.
unsafe impl Sync for RelaySlot {}

const HEADER_SIZE: usize = size_of::<RelayHeader>();
const SLOT_SIZE: usize = size_of::<RelaySlot>();
pub const SECTION_SIZE: usize = HEADER_SIZE + SLOT_COUNT * SLOT_SIZE;

/// Shared-memory section mapped by both ends of the relay.
pub struct RelaySection {
    map: MmapMut,
}

impl RelaySection {
    /// Helper side: create (or reset) the section and stamp the header.
    pub fn create(path: &Path, pid: u32, module_base: u64, module_size: u64) -> Result<Self, MemoryError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        file.set_len(SECTION_SIZE as u64)?;
        let map = unsafe { MmapMut::map_mut(&file)? };
        let section = Self { map };

        let h = section.header();
        h.pid.store(pid, Ordering::Relaxed);
        h.module_base.store(module_base, Ordering::Relaxed);
        h.module_size.store(module_size, Ordering::Relaxed);
        h.heartbeat.store(0, Ordering::Relaxed);
        h.version.store(RELAY_VERSION, Ordering::Relaxed);
        for i in 0..SLOT_COUNT {
            section.slot(i).state.store(STATE_IDLE, Ordering::Relaxed);
        }
        // Magic last, so an observer never sees a half-initialized section
        h.magic.store(RELAY_MAGIC, Ordering::Release);
        Ok(section)
    }

    /// Requester side: map an existing section and validate it.
    pub fn open(path: &Path) -> Result<Self, MemoryError> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let map = unsafe { MmapMut::map_mut(&file)? };
        if map.len() < SECTION_SIZE {
            return Err(MemoryError::RelayInvalid(format!(
                "section too small: {} < {}",
                map.len(),
                SECTION_SIZE
            )));
        }
        let section = Self { map };
        let h = section.header();
        let magic = h.magic.load(Ordering::Acquire);
        if magic != RELAY_MAGIC {
            return Err(MemoryError::RelayInvalid(format!("bad magic 0x{:08x}", magic)));
        }
        let version = h.version.load(Ordering::Relaxed);
        if version != RELAY_VERSION {
            return Err(MemoryError::RelayInvalid(format!("version {} != {}", version, RELAY_VERSION)));
        }
        Ok(section)
    }

    pub fn header(&self) -> &RelayHeader {
        unsafe { &*(self.map.as_ptr() as *const RelayHeader) }
    }

    pub fn slot(&self, index: usize) -> &RelaySlot {
        debug_assert!(index < SLOT_COUNT);
        unsafe { &*(self.map.as_ptr().add(HEADER_SIZE + index * SLOT_SIZE) as *const RelaySlot) }
    }
}

/// Requester end: issues read requests through the section, chunking
/// anything larger than one slot payload.
pub struct RelayChannel {
    section: RelaySection,
    next_slot: usize,
}

impl RelayChannel {
    pub fn open(path: &Path) -> Result<Self, MemoryError> {
        let section = RelaySection::open(path)?;
        Ok(Self { section, next_slot: 0 })
    }

    pub fn target_pid(&self) -> u32 {
        self.section.header().pid.load(Ordering::Relaxed)
    }

    /// Module bounds as reported by the helper from inside the target.
    pub fn reported_module(&self) -> Option<(RemoteAddress, u64)> {
        let h = self.section.header();
        let base = h.module_base.load(Ordering::Relaxed);
        let size = h.module_size.load(Ordering::Relaxed);
        if base == 0 || size == 0 {
            return None;
        }
        Some((RemoteAddress::new(base), size))
    }

    /// A live helper bumps the heartbeat every service pass.
    pub fn is_alive(&self) -> bool {
        let h = self.section.header();
        let before = h.heartbeat.load(Ordering::Relaxed);
        for _ in 0..10 {
            std::thread::sleep(Duration::from_millis(5));
            if h.heartbeat.load(Ordering::Relaxed) != before {
                return true;
            }
        }
        false
    }

    pub fn read_bytes(&mut self, addr: RemoteAddress, buf: &mut [u8]) -> Result<(), MemoryError> {
        let mut done = 0usize;
        while done < buf.len() {
            let chunk = (buf.len() - done).min(SLOT_DATA_MAX);
            self.read_chunk(addr + done as u64, &mut buf[done..done + chunk])?;
            done += chunk;
        }
        Ok(())
    }

    fn read_chunk(&mut self, addr: RemoteAddress, buf: &mut [u8]) -> Result<(), MemoryError> {
        debug_assert!(buf.len() <= SLOT_DATA_MAX);
        let index = self.next_slot;
        self.next_slot = (self.next_slot + 1) % SLOT_COUNT;
        let slot = self.section.slot(index);

        self.wait_state(slot, STATE_IDLE, addr)?;

        slot.address.store(addr.as_u64(), Ordering::Relaxed);
        slot.size.store(buf.len() as u32, Ordering::Relaxed);
        slot.state.store(STATE_REQUEST, Ordering::Release);

        match self.wait_done(slot, addr)? {
            STATE_READY => {
                unsafe {
                    std::ptr::copy_nonoverlapping(
                        (*slot.data.get()).as_ptr(),
                        buf.as_mut_ptr(),
                        buf.len(),
                    );
                }
                slot.state.store(STATE_IDLE, Ordering::Release);
                Ok(())
            }
            _ => {
                slot.state.store(STATE_IDLE, Ordering::Release);
                Err(MemoryError::RelayFault(addr.as_u64()))
            }
        }
    }

    fn wait_state(&self, slot: &RelaySlot, want: u32, addr: RemoteAddress) -> Result<(), MemoryError> {
        let deadline = Instant::now() + REQUEST_TIMEOUT;
        let mut spins = 0u32;
        loop {
            if slot.state.load(Ordering::Acquire) == want {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(MemoryError::RelayTimeout(addr.as_u64()));
            }
            Self::backoff(&mut spins);
        }
    }

    fn wait_done(&self, slot: &RelaySlot, addr: RemoteAddress) -> Result<u32, MemoryError> {
        let deadline = Instant::now() + REQUEST_TIMEOUT;
        let mut spins = 0u32;
        loop {
            let state = slot.state.load(Ordering::Acquire);
            if state == STATE_READY || state == STATE_ERROR {
                return Ok(state);
            }
            if Instant::now() >= deadline {
                // Leave the slot for the helper to finish; the next user
                // waits for idle anyway.
                return Err(MemoryError::RelayTimeout(addr.as_u64()));
            }
            Self::backoff(&mut spins);
        }
    }

    fn backoff(spins: &mut u32) {
        *spins += 1;
        if *spins < 64 {
            std::hint::spin_loop();
        } else if *spins % 256 == 0 {
            std::thread::sleep(Duration::from_micros(200));
        } else {
            std::thread::yield_now();
        }
    }
}

/// Serving end of the relay. In production this runs inside the target; in
/// tests it runs on a thread over the same file with an injected reader.
pub struct RelayHelper {
    section: RelaySection,
    read_fn: Box<dyn Fn(u64, &mut [u8]) -> bool + Send>,
}

impl RelayHelper {
    pub fn create(
        path: &Path,
        pid: u32,
        module_base: u64,
        module_size: u64,
        read_fn: Box<dyn Fn(u64, &mut [u8]) -> bool + Send>,
    ) -> Result<Self, MemoryError> {
        let section = RelaySection::create(path, pid, module_base, module_size)?;
        Ok(Self { section, read_fn })
    }

    /// Service every pending slot once and bump the heartbeat.
    pub fn service_pass(&self) {
        for i in 0..SLOT_COUNT {
            let slot = self.section.slot(i);
            if slot.state.load(Ordering::Acquire) != STATE_REQUEST {
                continue;
            }
            let addr = slot.address.load(Ordering::Relaxed);
            let size = slot.size.load(Ordering::Relaxed) as usize;
            if size == 0 || size > SLOT_DATA_MAX {
                warn!("relay request with bad size {} at 0x{:x}", size, addr);
                slot.state.store(STATE_ERROR, Ordering::Release);
                continue;
            }
            let ok = {
                let data = unsafe { &mut *slot.data.get() };
                (self.read_fn)(addr, &mut data[..size])
            };
            if ok {
                slot.state.store(STATE_READY, Ordering::Release);
            } else {
                debug!("relay read failed at 0x{:x} ({} bytes)", addr, size);
                slot.state.store(STATE_ERROR, Ordering::Release);
            }
        }
        self.section.header().heartbeat.fetch_add(1, Ordering::Relaxed);
    }
}

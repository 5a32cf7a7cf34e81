use crate::memory::{
    MemoryError, ModuleInfo, ProcessMemory, RelayChannel, RemoteAddress, RemoteRead,
};
use log::info;
use parking_lot::Mutex;
use std::path::Path;

enum Backend {
    Direct(ProcessMemory),
    Relay(Mutex<RelayChannel>),
}

/// The accessor the rest of the crate reads through: direct syscall reads
/// when the target is inspectable, shared-memory relay when it is not.
pub struct RemoteHandle {
    backend: Backend,
}

impl RemoteHandle {
    pub fn direct(process: ProcessMemory) -> Self {
        Self { backend: Backend::Direct(process) }
    }

    pub fn relay(path: &Path) -> Result<Self, MemoryError> {
        let channel = RelayChannel::open(path)?;
        info!("relay channel attached (target pid {})", channel.target_pid());
        Ok(Self { backend: Backend::Relay(Mutex::new(channel)) })
    }

    pub fn is_alive(&self) -> bool {
        match &self.backend {
            Backend::Direct(p) => p.is_alive(),
            Backend::Relay(c) => c.lock().is_alive(),
        }
    }

    /// Main-module bounds. The relay reports them from inside the target;
    /// the direct path walks procfs.
    pub fn find_module(&self, name: &str) -> Result<ModuleInfo, MemoryError> {
        match &self.backend {
            Backend::Direct(p) => p.find_module(name),
            Backend::Relay(c) => {
                let channel = c.lock();
                match channel.reported_module() {
                    Some((base, size)) => Ok(ModuleInfo { base, size, path: String::new() }),
                    None => Err(MemoryError::ModuleNotFound(name.to_string())),
                }
            }
        }
    }
}

impl RemoteRead for RemoteHandle {
    fn read_bytes(&self, addr: RemoteAddress, buf: &mut [u8]) -> Result<(), MemoryError> {
        match &self.backend {
            Backend::Direct(p) => p.read_bytes(addr, buf),
            Backend::Relay(c) => c.lock().read_bytes(addr, buf),
        }
    }
}

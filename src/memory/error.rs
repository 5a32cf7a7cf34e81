use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid address: 0x{0:x}")]
    InvalidAddress(u64),
    #[error("Read failed at address 0x{0:x}")]
    ReadFailed(u64),
    #[error("Short read at 0x{addr:x}: wanted {wanted}, got {got}")]
    ShortRead { addr: u64, wanted: usize, got: usize },
    #[error("Process not found: {0}")]
    ProcessNotFound(String),
    #[error("Process {0} exited")]
    ProcessExited(i32),
    #[error("Module not found: {0}")]
    ModuleNotFound(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Relay channel invalid: {0}")]
    RelayInvalid(String),
    #[error("Relay request timed out at 0x{0:x}")]
    RelayTimeout(u64),
    #[error("Relay helper reported failure at 0x{0:x}")]
    RelayFault(u64),
    #[error("Not supported: {0}")]
    NotSupported(String),
}

pub mod address;
pub mod error;
pub mod handle;
pub mod process;
pub mod relay;
pub mod traits;

#[cfg(test)]
pub mod mock;

pub use address::RemoteAddress;
pub use error::MemoryError;
pub use handle::RemoteHandle;
pub use process::{ModuleInfo, ProcessMemory};
pub use relay::{RelayChannel, RelayHelper, RelaySection};
pub use traits::RemoteRead;

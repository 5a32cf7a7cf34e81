pub mod config;
pub mod entity;
pub mod memory;
pub mod names;
pub mod pattern;
pub mod projection;
pub mod runtime;
pub mod world;

pub use config::Config;
pub use entity::{Entity, EntityFilter, EntityKind, EntityReconstructor, Rarity};
pub use memory::{MemoryError, ProcessMemory, RemoteAddress, RemoteHandle, RemoteRead};
pub use names::NameResolver;
pub use pattern::{Pattern, RemoteScanner};
pub use projection::{Projector, ScreenPos};
pub use runtime::{ScanTask, Snapshot, SnapshotBus};
pub use world::{LayoutResolver, WorldReader};

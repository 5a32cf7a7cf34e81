pub mod pattern;
pub mod scanner;

pub use pattern::Pattern;
pub use scanner::{resolve_relative, RemoteScanner, SCAN_CHUNK};

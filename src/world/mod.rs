pub mod layout;
pub mod offsets;
pub mod reader;
pub mod types;

pub use layout::LayoutResolver;
pub use reader::WorldReader;
pub use types::{CameraPose, FNameRaw, Rotator, TArrayRaw, Vec3};

//! Typed game entities rebuilt from raw actor pointers: classification by
//! class name, per-kind hydration, and pass-to-pass caching.

pub mod chest;
pub mod classify;
pub mod rarity;
pub mod reconstructor;
pub mod types;

pub use classify::classify;
pub use reconstructor::{filter_entities, EntityFilter, EntityReconstructor};
pub use types::{
    ActorCategory, ChestInfo, Entity, EntityKind, LootInfo, MonsterGrade, MonsterInfo, PlayerInfo,
    Rarity,
};

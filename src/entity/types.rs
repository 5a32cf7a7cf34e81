use crate::memory::RemoteAddress;
use crate::world::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Item rarity ladder, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Poor,
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
    Unique,
    Artifact,
}

impl Rarity {
    pub fn label(&self) -> &'static str {
        match self {
            Rarity::Poor => "Poor",
            Rarity::Common => "Common",
            Rarity::Uncommon => "Uncommon",
            Rarity::Rare => "Rare",
            Rarity::Epic => "Epic",
            Rarity::Legendary => "Legendary",
            Rarity::Unique => "Unique",
            Rarity::Artifact => "Artifact",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Monster tier. `Unknown` doubles as "no floor" in filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonsterGrade {
    Unknown,
    Common,
    Elite,
    Nightmare,
}

impl Default for MonsterGrade {
    fn default() -> Self {
        MonsterGrade::Unknown
    }
}

impl MonsterGrade {
    pub fn label(&self) -> &'static str {
        match self {
            MonsterGrade::Unknown => "?",
            MonsterGrade::Common => "Common",
            MonsterGrade::Elite => "Elite",
            MonsterGrade::Nightmare => "Nightmare",
        }
    }
}

/// Verdict of class-name classification, before any per-kind hydration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorCategory {
    Player,
    Monster,
    ChestSpecial,
    ChestNormal,
    Loot,
    Portal,
    Interactable,
    Unknown,
}

#[derive(Debug, Clone, Default)]
pub struct PlayerInfo {
    pub nickname: String,
    pub level: i32,
    pub class_name: String,
    pub down: bool,
    /// Lootable gear on a dead body, pre-rendered "Rarity Name" lines.
    pub equipment: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MonsterInfo {
    pub grade: MonsterGrade,
    pub loot: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ChestInfo {
    pub special: bool,
    pub contents: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct LootInfo {
    pub item_name: String,
    pub rarity: Rarity,
    pub category: &'static str,
    pub gear_score: i32,
}

impl Default for LootInfo {
    fn default() -> Self {
        Self { item_name: String::new(), rarity: Rarity::Common, category: "Item", gear_score: 0 }
    }
}

/// Kind-specific payload of a reconstructed entity.
#[derive(Debug, Clone)]
pub enum EntityKind {
    Player(PlayerInfo),
    Monster(MonsterInfo),
    Chest(ChestInfo),
    Loot(LootInfo),
    Portal,
    /// Doors, shrines, levers. Nothing in the current vocabulary produces
    /// these, but the category is part of the classification verdict.
    Interactable,
}

impl EntityKind {
    pub fn category(&self) -> ActorCategory {
        match self {
            EntityKind::Player(_) => ActorCategory::Player,
            EntityKind::Monster(_) => ActorCategory::Monster,
            EntityKind::Chest(c) if c.special => ActorCategory::ChestSpecial,
            EntityKind::Chest(_) => ActorCategory::ChestNormal,
            EntityKind::Loot(_) => ActorCategory::Loot,
            EntityKind::Portal => ActorCategory::Portal,
            EntityKind::Interactable => ActorCategory::Interactable,
        }
    }
}

/// One live game object rebuilt from remote reads.
#[derive(Debug, Clone)]
pub struct Entity {
    pub address: RemoteAddress,
    pub class_name: String,
    pub display_name: String,
    pub position: Vec3,
    /// Position plus standing height; only meaningful for players.
    pub head_position: Vec3,
    /// -1.0 means the health chain was unreadable, which is not the same
    /// thing as dead.
    pub health: f32,
    pub max_health: f32,
    pub alive: bool,
    pub is_local: bool,
    pub kind: EntityKind,
}

impl Entity {
    pub fn new(address: RemoteAddress, class_name: String, kind: EntityKind) -> Self {
        Self {
            address,
            class_name,
            display_name: String::new(),
            position: Vec3::default(),
            head_position: Vec3::default(),
            health: -1.0,
            max_health: 0.0,
            alive: true,
            is_local: false,
            kind,
        }
    }

    pub fn category(&self) -> ActorCategory {
        self.kind.category()
    }
}

/// Readable name from a raw asset or class identifier: namespace prefixes up
/// to the last ':' or '.' go, then "BP_", a trailing "_C", any long trailing
/// digit run, and underscores become spaces.
pub fn clean_item_name(raw: &str) -> String {
    let mut name = raw;
    if let Some(pos) = name.rfind(':') {
        name = &name[pos + 1..];
    }
    if let Some(pos) = name.rfind('.') {
        name = &name[pos + 1..];
    }
    let mut name = name.strip_prefix("BP_").unwrap_or(name);
    name = name.strip_suffix("_C").unwrap_or(name);

    let mut owned = name.to_string();
    if let Some(pos) = owned.rfind('_') {
        let tail = &owned[pos + 1..];
        // Instance suffixes like _2147263766; short numbers stay (Tier_2)
        if tail.len() >= 4 && tail.chars().all(|c| c.is_ascii_digit()) {
            owned.truncate(pos);
        }
    }
    owned.replace('_', " ")
}

/// Monster display name from a class name: strip "BP_", "_C", and the grade
/// or fake-death suffixes that are rendered separately.
pub fn clean_monster_name(class_name: &str) -> String {
    let mut name = class_name.strip_prefix("BP_").unwrap_or(class_name);
    name = name.strip_suffix("_C").unwrap_or(name);
    for suffix in ["_Common", "_Soulflame", "_Nightmare", "FromFakeDeath"] {
        name = name.strip_suffix(suffix).unwrap_or(name);
    }
    name.replace('_', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rarity_ordering_is_monotone() {
        assert!(Rarity::Poor < Rarity::Common);
        assert!(Rarity::Uncommon < Rarity::Rare);
        assert!(Rarity::Rare < Rarity::Epic);
        assert!(Rarity::Epic < Rarity::Legendary);
        assert!(Rarity::Legendary < Rarity::Unique);
        assert!(Rarity::Unique < Rarity::Artifact);
    }

    #[test]
    fn grade_ordering() {
        assert!(MonsterGrade::Unknown < MonsterGrade::Common);
        assert!(MonsterGrade::Common < MonsterGrade::Elite);
        assert!(MonsterGrade::Elite < MonsterGrade::Nightmare);
    }

    #[test]
    fn item_name_cleanup() {
        assert_eq!(clean_item_name("BP_FlangedMace_C"), "FlangedMace");
        assert_eq!(clean_item_name("Id_Item.FlangedMace"), "FlangedMace");
        assert_eq!(clean_item_name("DesignDataItem:Id_Item_Bandage"), "Id Item Bandage");
        assert_eq!(clean_item_name("BP_Torch_2147263766"), "Torch");
        assert_eq!(clean_item_name("Skull_Key"), "Skull Key");
    }

    #[test]
    fn short_numeric_suffix_survives_cleanup() {
        assert_eq!(clean_item_name("BP_Chest_N0_C"), "Chest N0");
    }

    #[test]
    fn monster_name_cleanup() {
        assert_eq!(clean_monster_name("BP_SkeletonSwordman_Common_C"), "SkeletonSwordman");
        assert_eq!(clean_monster_name("BP_GiantSpider_Nightmare_C"), "GiantSpider");
        assert_eq!(clean_monster_name("BP_SkeletonFootmanFromFakeDeath_C"), "SkeletonFootman");
        assert_eq!(clean_monster_name("BP_Living_Statue_C"), "Living Statue");
    }
}

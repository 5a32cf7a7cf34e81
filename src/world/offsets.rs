//! Field offsets for the targeted game build, grouped by owning type.
//! These shift between client revisions; anything load-bearing is
//! overridable from the config file.

pub mod uobject {
    pub const CLASS: u64 = 0x10;
    pub const NAME: u64 = 0x18;
}

pub mod actor {
    pub const ROOT_COMPONENT: u64 = 0x1B8;
}

pub mod scene_component {
    pub const RELATIVE_LOCATION: u64 = 0x128;
    pub const RELATIVE_ROTATION: u64 = 0x140;
    pub const COMPONENT_TO_WORLD: u64 = 0x1C0;
    /// Translation within the component-to-world transform.
    pub const C2W_TRANSLATION: u64 = 0x30;
}

pub mod world {
    pub const PERSISTENT_LEVEL: u64 = 0x30;
    pub const LEVELS: u64 = 0x178;
    pub const OWNING_GAME_INSTANCE: u64 = 0x1D8;
}

pub mod level {
    /// Default actors array offset; the layout resolver rediscovers it when
    /// this one stops validating.
    pub const ACTORS: u64 = 0xA0;
}

pub mod game_instance {
    pub const LOCAL_PLAYERS: u64 = 0x38;
}

pub mod local_player {
    pub const PLAYER_CONTROLLER: u64 = 0x30;
}

pub mod player_controller {
    pub const ACKNOWLEDGED_PAWN: u64 = 0x350;
    pub const CAMERA_MANAGER: u64 = 0x360;
}

pub mod camera_manager {
    pub const CAMERA_CACHE_PRIVATE: u64 = 0x1410;
    pub const CACHE_POV: u64 = 0x10;
}

pub mod character {
    pub const ABILITY_SYSTEM: u64 = 0x708;
    pub const ACCOUNT_DATA: u64 = 0x7F8;
    pub const IS_DEAD: u64 = 0x8B9;
    pub const INVENTORY_COMPONENT: u64 = 0xA68;
    pub const CHARACTER_KEY: u64 = 0xB50;
}

pub mod account_data {
    pub const NICKNAME: u64 = 0x10;
    pub const CHARACTER_ID: u64 = 0x80;
    pub const LEVEL: u64 = 0xB4;
    pub const ALIVE: u64 = 0xBB;
    pub const DOWN: u64 = 0xBD;
}

pub mod ability_system {
    pub const SPAWNED_ATTRIBUTES: u64 = 0x1088;
}

pub mod attribute_set {
    pub const HEALTH: u64 = 0x820;
    pub const MAX_HEALTH: u64 = 0x840;
    /// CurrentValue within an attribute data block.
    pub const CURRENT_VALUE: u64 = 0x0C;
}

pub mod item_holder {
    pub const DATA_ASSET: u64 = 0x348;
    pub const ITEM_INFO: u64 = 0x350;
}

pub mod item_info {
    pub const DATA_ASSET: u64 = 0x10;
}

pub mod item_data {
    pub const ID_TAG: u64 = 0x80;
    pub const ITEM_TYPE: u64 = 0xD0;
    pub const RARITY_TYPE: u64 = 0x118;
    pub const GEAR_SCORE: u64 = 0x268;
}

pub mod inventory {
    pub const LIST: u64 = 0x170;
    pub const BASE_INVENTORY_ID: u64 = 0x70;
    pub const BASE_MONSTER_ITEMS: u64 = 0xD8;
    pub const BASE_INVENTORY_DATA: u64 = 0x130;
    pub const DATA_ITEMS: u64 = 0x108;
    pub const ELEM_ITEM_INFO: u64 = 0x10;
    pub const ELEM_ITEM_INFO_ALT: u64 = 0x08;
    pub const ELEM_SIZE: u64 = 0x240;
}

pub mod monster {
    pub const DESIGN_DATA_ASSET: u64 = 0xDB8;
    pub const DATA_ASSET_ITEM: u64 = 0x70;
    pub const DESIGN_GRADE_TYPE: u64 = 0x10;
}

use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use log::debug;

use crate::entity::chest::ChestProbe;
use crate::entity::classify::classify;
use crate::entity::rarity::{guess_rarity_from_name, parse_monster_grade, parse_rarity_tag};
use crate::entity::types::{
    clean_item_name, clean_monster_name, ActorCategory, ChestInfo, Entity, EntityKind, LootInfo,
    MonsterGrade, MonsterInfo, PlayerInfo, Rarity,
};
use crate::memory::{RemoteAddress, RemoteRead};
use crate::names::NameResolver;
use crate::world::offsets;
use crate::world::types::{read_fstring, FNameRaw, TArrayRaw, Vec3};
use crate::world::WorldReader;

/// Passes between full actor-list refreshes from the world object.
const ACTOR_LIST_REFRESH: u32 = 15;
/// Class-name resolutions allowed per pass; the rest wait for the next one.
const FRESH_RESOLVE_BUDGET: u32 = 500;
/// Passes a confirmed death sticks to a monster even if its health reads
/// briefly disagree.
const DEATH_DEBOUNCE_PASSES: u32 = 4;
/// Positions beyond this Z are staging areas, not the playable map.
const MAX_ABS_Z: f64 = 100_000.0;
/// Standing eye height above the root component, in centimeters.
const HEAD_HEIGHT: f64 = 170.0;
const DIAG_INTERVAL: u64 = 120;

const MAX_INVENTORY_BASES: i32 = 20;
const MAX_INVENTORY_ITEMS: i32 = 50;
const MAX_ATTR_SETS: i32 = 32;
const MAX_NICKNAME_CHARS: i32 = 128;
const MAX_CHARACTER_ID_CHARS: i32 = 256;

/// Extra per-base item-array offsets probed on dead bodies. Body containers
/// vary by equipment slot layout, unlike chests.
const BODY_ITEM_PROBE: &[u64] = &[
    0xC0, 0xC8, 0xD0, 0xE0, 0xE8, 0xF0, 0x100, 0x110, 0x120, 0x128, 0x140, 0x150, 0x200, 0x210,
    0x220, 0x230, 0x248, 0x258,
];

/// Candidate (element stride, item-info offset) pairs for inventory item
/// arrays, tried in order until one yields a validating first entry.
const BODY_ELEMENT_LAYOUTS: &[(u64, u64)] =
    &[(0x240, 0x08), (0x240, 0x10), (0x240, 0x18), (0x240, 0x20), (0x238, 0x10), (0x228, 0x00)];
const CHEST_ELEMENT_LAYOUTS: &[(u64, u64)] = &[(0x240, 0x08), (0x240, 0x10), (0x240, 0x18)];

/// Display filter applied when handing entities to a consumer.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EntityFilter {
    pub show_players: bool,
    pub show_monsters: bool,
    pub show_loot: bool,
    pub show_portals: bool,
    /// Meters; applies to everything except players.
    pub max_distance: f64,
    /// Meters; players stay visible much further out.
    pub max_player_distance: f64,
    pub min_loot_rarity: Rarity,
    pub min_monster_grade: MonsterGrade,
}

impl Default for EntityFilter {
    fn default() -> Self {
        Self {
            show_players: true,
            show_monsters: true,
            show_loot: true,
            show_portals: true,
            max_distance: 300.0,
            max_player_distance: 1000.0,
            min_loot_rarity: Rarity::Uncommon,
            min_monster_grade: MonsterGrade::Unknown,
        }
    }
}

/// Substructure pointers that hold still for an object's lifetime, captured
/// once per actor address so later passes skip the resolution chain.
#[derive(Debug, Clone, Copy, Default)]
struct SubPointers {
    root: RemoteAddress,
    attr_set: RemoteAddress,
}

/// Rebuilds typed entities from raw actor pointers, pass by pass.
///
/// Class names are resolved once per actor address and cached; actors whose
/// class is unreadable or uninteresting go on a skip list so later passes
/// never touch them again. All per-address caches grow monotonically within a
/// level; a large swing in the actor count means a level transition, which
/// drops them together because the allocator reuses addresses across levels.
pub struct EntityReconstructor {
    reader: Arc<dyn RemoteRead>,
    entities: Vec<Entity>,
    class_cache: AHashMap<u64, (ActorCategory, String)>,
    known_unknown: AHashSet<u64>,
    death_debounce: AHashMap<u64, u32>,
    sub_cache: AHashMap<u64, SubPointers>,
    cached_actors: Vec<RemoteAddress>,
    actor_list_age: u32,
    last_actor_count: usize,
    local_pawn: RemoteAddress,
    chest_probe: ChestProbe,
    pass_counter: u64,
}

impl EntityReconstructor {
    pub fn new(reader: Arc<dyn RemoteRead>) -> Self {
        Self {
            reader,
            entities: Vec::new(),
            class_cache: AHashMap::new(),
            known_unknown: AHashSet::new(),
            death_debounce: AHashMap::new(),
            sub_cache: AHashMap::new(),
            cached_actors: Vec::new(),
            actor_list_age: ACTOR_LIST_REFRESH,
            last_actor_count: 0,
            local_pawn: RemoteAddress::zero(),
            chest_probe: ChestProbe::new(),
            pass_counter: 0,
        }
    }

    #[cfg(test)]
    fn with_chest_cooldown(reader: Arc<dyn RemoteRead>, cooldown: std::time::Duration) -> Self {
        let mut this = Self::new(reader);
        this.chest_probe = ChestProbe::with_cooldown(cooldown);
        this
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn local_pawn(&self) -> RemoteAddress {
        self.local_pawn
    }

    /// One reconstruction pass over the live actor list.
    pub fn update(&mut self, world: &mut WorldReader, names: &NameResolver, min_rarity: Rarity) {
        self.pass_counter += 1;
        self.entities.clear();

        // Expire stale death marks
        self.death_debounce.retain(|_, passes| {
            *passes = passes.saturating_sub(1);
            *passes > 0
        });

        self.actor_list_age += 1;
        if self.actor_list_age >= ACTOR_LIST_REFRESH || self.cached_actors.is_empty() {
            self.cached_actors = world.all_actors();
            self.actor_list_age = 0;

            let count = self.cached_actors.len();
            if self.last_actor_count > 0
                && count.abs_diff(self.last_actor_count) > self.last_actor_count / 2
            {
                debug!(
                    "actor count {} -> {}, level transition assumed, caches dropped",
                    self.last_actor_count, count
                );
                self.class_cache.clear();
                self.known_unknown.clear();
                self.death_debounce.clear();
                self.sub_cache.clear();
            }
            self.last_actor_count = count;
        }

        self.local_pawn = world.local_pawn().unwrap_or_default();

        let mut resolve_budget = FRESH_RESOLVE_BUDGET;
        let mut portal_keys: AHashSet<u64> = AHashSet::new();
        let actors = std::mem::take(&mut self.cached_actors);

        for &actor in &actors {
            let key = actor.as_u64();
            if self.known_unknown.contains(&key) {
                continue;
            }

            let (category, class_name) = match self.class_cache.get(&key) {
                Some(hit) => hit.clone(),
                None => {
                    if resolve_budget == 0 {
                        continue;
                    }
                    resolve_budget -= 1;
                    match self.resolve_class(actor, names) {
                        Some(resolved) => {
                            self.class_cache.insert(key, resolved.clone());
                            resolved
                        }
                        None => {
                            self.known_unknown.insert(key);
                            continue;
                        }
                    }
                }
            };

            if category == ActorCategory::Unknown {
                self.known_unknown.insert(key);
                continue;
            }

            let position = match self.read_position(actor) {
                Some(p) => p,
                None => continue,
            };

            let mut entity = match category {
                ActorCategory::Player => self.hydrate_player(actor, &class_name, names, min_rarity),
                ActorCategory::Monster => self.hydrate_monster(actor, &class_name, names, min_rarity),
                ActorCategory::ChestSpecial | ActorCategory::ChestNormal => self.hydrate_chest(
                    actor,
                    &class_name,
                    category == ActorCategory::ChestSpecial,
                    names,
                    min_rarity,
                ),
                ActorCategory::Loot => match self.hydrate_loot(actor, &class_name, names) {
                    Some(e) => e,
                    None => {
                        // Loose currency never becomes interesting
                        self.known_unknown.insert(key);
                        continue;
                    }
                },
                ActorCategory::Portal => {
                    if !portal_keys.insert(portal_dedup_key(&position)) {
                        continue;
                    }
                    self.hydrate_portal(actor, &class_name)
                }
                ActorCategory::Interactable => self.hydrate_interactable(actor, &class_name),
                ActorCategory::Unknown => unreachable!(),
            };

            entity.position = position;
            entity.head_position = Vec3::new(position.x, position.y, position.z + HEAD_HEIGHT);
            entity.is_local = actor == self.local_pawn;

            if matches!(entity.kind, EntityKind::Monster(_)) {
                self.apply_death_debounce(key, &mut entity);
            }

            self.entities.push(entity);
        }
        self.cached_actors = actors;

        if self.pass_counter % DIAG_INTERVAL == 0 {
            debug!(
                "pass {}: {} entities, {} classes cached, {} skipped, {} actors",
                self.pass_counter,
                self.entities.len(),
                self.class_cache.len(),
                self.known_unknown.len(),
                self.last_actor_count
            );
        }
    }

    /// Indices of entities the filter lets through, distances measured from
    /// the viewer.
    pub fn filtered_indices(&self, viewer: &Vec3, filter: &EntityFilter) -> Vec<usize> {
        filter_entities(&self.entities, viewer, filter)
    }

    /// Re-reads positions for the given entities between full passes, so
    /// moving targets track smoothly at render rate.
    pub fn refresh_positions(&mut self, indices: &[usize]) {
        for &i in indices {
            let Some(entity) = self.entities.get(i) else { continue };
            let addr = entity.address;
            let is_player = matches!(entity.kind, EntityKind::Player(_));
            if let Some(pos) = self.read_position(addr) {
                let entity = &mut self.entities[i];
                entity.position = pos;
                if is_player {
                    entity.head_position = Vec3::new(pos.x, pos.y, pos.z + HEAD_HEIGHT);
                }
            }
        }
    }

    fn resolve_class(
        &self,
        actor: RemoteAddress,
        names: &NameResolver,
    ) -> Option<(ActorCategory, String)> {
        let class_ptr = self.reader.read_ptr(actor + offsets::uobject::CLASS).ok()?;
        if !class_ptr.is_plausible() {
            return None;
        }
        let fname = FNameRaw::read_from(self.reader.as_ref(), class_ptr + offsets::uobject::NAME)
            .ok()?;
        let name = names.resolve_fname(fname.index, fname.number);
        if name.is_empty() {
            return None;
        }
        let category = classify(&name);
        Some((category, name))
    }

    fn actor_name(&self, actor: RemoteAddress, names: &NameResolver) -> String {
        match FNameRaw::read_from(self.reader.as_ref(), actor + offsets::uobject::NAME) {
            Ok(f) => names.resolve_fname(f.index, f.number),
            Err(_) => String::new(),
        }
    }

    /// World position via the root component. The root pointer is captured
    /// once per actor address and reused until it stops yielding a position.
    fn read_position(&mut self, actor: RemoteAddress) -> Option<Vec3> {
        let key = actor.as_u64();
        if let Some(cached) = self.sub_cache.get(&key) {
            if !cached.root.is_null() {
                if let Some(pos) = self.position_from_root(cached.root) {
                    return Some(pos);
                }
            }
        }

        let root = self.reader.read_ptr(actor + offsets::actor::ROOT_COMPONENT).ok()?;
        if !root.is_plausible() {
            return None;
        }
        let pos = self.position_from_root(root)?;
        self.sub_cache.entry(key).or_default().root = root;
        Some(pos)
    }

    /// Component-to-world translation first, relative location as fallback;
    /// zero vectors and off-map Z are treated as unreadable.
    fn position_from_root(&self, root: RemoteAddress) -> Option<Vec3> {
        let c2w = root
            + offsets::scene_component::COMPONENT_TO_WORLD
            + offsets::scene_component::C2W_TRANSLATION;
        if let Ok(pos) = Vec3::read_from(self.reader.as_ref(), c2w) {
            if !pos.is_zero() && pos.z.abs() < MAX_ABS_Z {
                return Some(pos);
            }
        }
        let pos = Vec3::read_from(
            self.reader.as_ref(),
            root + offsets::scene_component::RELATIVE_LOCATION,
        )
        .ok()?;
        (!pos.is_zero() && pos.z.abs() < MAX_ABS_Z).then_some(pos)
    }

    /// Health via the ability system. An unreadable chain yields the -1.0
    /// sentinel and leaves the entity alive; only a readable value below the
    /// half-point threshold means dead. The attribute-set pointer is captured
    /// once per actor address, so repeat reads skip the chain entirely.
    fn read_health(&mut self, actor: RemoteAddress) -> (f32, f32, bool) {
        const UNKNOWN: (f32, f32, bool) = (-1.0, 0.0, true);

        let key = actor.as_u64();
        if let Some(cached) = self.sub_cache.get(&key) {
            if !cached.attr_set.is_null() {
                if let Some(known) = self.read_health_from_set(cached.attr_set) {
                    return known;
                }
            }
        }

        let asc = match self.reader.read_ptr(actor + offsets::character::ABILITY_SYSTEM) {
            Ok(p) if p.is_plausible() => p,
            _ => return UNKNOWN,
        };
        let attrs = match TArrayRaw::read_from(
            self.reader.as_ref(),
            asc + offsets::ability_system::SPAWNED_ATTRIBUTES,
        ) {
            Ok(a) if a.is_plausible(MAX_ATTR_SETS) => a,
            _ => return UNKNOWN,
        };
        let attr_set = match self.reader.read_ptr(attrs.data) {
            Ok(p) if p.is_plausible() => p,
            _ => return UNKNOWN,
        };
        match self.read_health_from_set(attr_set) {
            Some(known) => {
                self.sub_cache.entry(key).or_default().attr_set = attr_set;
                known
            }
            None => UNKNOWN,
        }
    }

    fn read_health_from_set(&self, attr_set: RemoteAddress) -> Option<(f32, f32, bool)> {
        let health = self
            .reader
            .read_f32(attr_set + offsets::attribute_set::HEALTH + offsets::attribute_set::CURRENT_VALUE)
            .ok()?;
        let mut max = self
            .reader
            .read_f32(
                attr_set + offsets::attribute_set::MAX_HEALTH + offsets::attribute_set::CURRENT_VALUE,
            )
            .ok()?;
        if max <= 0.0 {
            max = 100.0;
        }
        let alive = !(0.0..0.5).contains(&health);
        Some((health, max, alive))
    }

    fn hydrate_player(
        &mut self,
        actor: RemoteAddress,
        class_name: &str,
        names: &NameResolver,
        min_rarity: Rarity,
    ) -> Entity {
        let (health, max_health, mut alive) = self.read_health(actor);

        let mut info = PlayerInfo::default();
        let acct =
            self.reader.read_ptr(actor + offsets::character::ACCOUNT_DATA).unwrap_or_default();
        if acct.is_plausible() {
            info.nickname = read_fstring(
                self.reader.as_ref(),
                acct + offsets::account_data::NICKNAME,
                MAX_NICKNAME_CHARS,
            )
            .unwrap_or_default();
            info.level =
                self.reader.read_i32(acct + offsets::account_data::LEVEL).unwrap_or_default();
            info.down =
                self.reader.read_bool(acct + offsets::account_data::DOWN).unwrap_or_default();

            let character_id = read_fstring(
                self.reader.as_ref(),
                acct + offsets::account_data::CHARACTER_ID,
                MAX_CHARACTER_ID_CHARS,
            )
            .unwrap_or_default();
            info.class_name = class_from_identity(&character_id).unwrap_or_default();
        }

        if info.class_name.is_empty() {
            // Account data unreadable or id string opaque; the character key
            // FName on the pawn itself carries the class word too
            if let Ok(f) =
                FNameRaw::read_from(self.reader.as_ref(), actor + offsets::character::CHARACTER_KEY)
            {
                let key = names.resolve_fname(f.index, f.number);
                info.class_name = class_from_identity(&key).unwrap_or_default();
            }
        }

        if self.reader.read_bool(actor + offsets::character::IS_DEAD).unwrap_or(false) {
            alive = false;
        }

        let display = if info.nickname.is_empty() {
            if info.class_name.is_empty() {
                "Player".to_string()
            } else {
                info.class_name.clone()
            }
        } else {
            info.nickname.clone()
        };
        let display = if info.down { format!("{display} [DOWN]") } else { display };

        let is_local = actor == self.local_pawn;
        if !alive && !is_local {
            info.equipment = self.read_inventory(
                self.reader
                    .read_ptr(actor + offsets::character::INVENTORY_COMPONENT)
                    .unwrap_or_default(),
                BODY_ELEMENT_LAYOUTS,
                true,
                names,
                min_rarity,
            );
        }

        let mut e = Entity::new(actor, class_name.to_string(), EntityKind::Player(info));
        e.display_name = display;
        e.health = health;
        e.max_health = max_health;
        e.alive = alive;
        e
    }

    fn hydrate_monster(
        &mut self,
        actor: RemoteAddress,
        class_name: &str,
        names: &NameResolver,
        min_rarity: Rarity,
    ) -> Entity {
        let (mut health, max_health, mut alive) = self.read_health(actor);

        let is_dead_flag =
            self.reader.read_bool(actor + offsets::character::IS_DEAD).unwrap_or(false);
        if health < 0.0 && is_dead_flag {
            alive = false;
            health = 0.0;
        }
        // Fake-death variants play a corpse animation while fully alive
        if class_name.contains("FromFakeDeath") {
            alive = true;
        }

        let mut info =
            MonsterInfo { grade: self.read_monster_grade(actor, names), loot: Vec::new() };
        if !alive {
            info.loot = self.read_inventory(
                self.reader
                    .read_ptr(actor + offsets::character::INVENTORY_COMPONENT)
                    .unwrap_or_default(),
                BODY_ELEMENT_LAYOUTS,
                true,
                names,
                min_rarity,
            );
        }

        let mut e = Entity::new(actor, class_name.to_string(), EntityKind::Monster(info));
        e.display_name = clean_monster_name(class_name);
        e.health = health;
        e.max_health = max_health;
        e.alive = alive;
        e
    }

    fn read_monster_grade(&self, actor: RemoteAddress, names: &NameResolver) -> MonsterGrade {
        // The grade lives as a gameplay tag on the design data asset
        let design = match self.reader.read_ptr(actor + offsets::monster::DESIGN_DATA_ASSET) {
            Ok(p) if p.is_plausible() => p,
            _ => return MonsterGrade::Unknown,
        };
        let item = match self.reader.read_ptr(design + offsets::monster::DATA_ASSET_ITEM) {
            Ok(p) if p.is_plausible() => p,
            _ => return MonsterGrade::Unknown,
        };
        match self.reader.read_u32(item + offsets::monster::DESIGN_GRADE_TYPE) {
            Ok(index) => parse_monster_grade(&names.resolve(index)),
            Err(_) => MonsterGrade::Unknown,
        }
    }

    fn hydrate_loot(
        &self,
        actor: RemoteAddress,
        class_name: &str,
        names: &NameResolver,
    ) -> Option<Entity> {
        let item_name = self.actor_name(actor, names);
        if is_gold(&item_name) {
            return None;
        }

        let is_holder = class_name.contains("ItemHolder");
        let data_asset = if is_holder {
            self.reader.read_ptr(actor + offsets::item_holder::DATA_ASSET).unwrap_or_default()
        } else {
            match self.reader.read_ptr(actor + offsets::item_holder::ITEM_INFO) {
                Ok(info) if info.is_plausible() => self
                    .reader
                    .read_ptr(info + offsets::item_info::DATA_ASSET)
                    .unwrap_or_default(),
                _ => RemoteAddress::zero(),
            }
        };

        let mut info = LootInfo::default();
        if data_asset.is_plausible() {
            let id_name = match FNameRaw::read_from(
                self.reader.as_ref(),
                data_asset + offsets::item_data::ID_TAG,
            ) {
                Ok(f) => names.resolve_fname(f.index, f.number),
                Err(_) => String::new(),
            };
            info.item_name = if id_name.is_empty() {
                fallback_item_name(&item_name, class_name)
            } else {
                clean_item_name(&id_name)
            };
            info.category = item_type_label(
                self.reader.read_u8(data_asset + offsets::item_data::ITEM_TYPE).unwrap_or(0),
            );
            info.gear_score = self
                .reader
                .read_i32(data_asset + offsets::item_data::GEAR_SCORE)
                .unwrap_or_default();

            let rarity_tag = match self
                .reader
                .read_u32(data_asset + offsets::item_data::RARITY_TYPE)
            {
                Ok(index) => names.resolve(index),
                Err(_) => String::new(),
            };
            info.rarity = if rarity_tag.contains("Rarity.") {
                parse_rarity_tag(&rarity_tag)
            } else {
                guess_rarity_from_name(&item_name)
            };
        } else {
            info.item_name = fallback_item_name(&item_name, class_name);
            info.rarity = guess_rarity_from_name(class_name);
        }

        let display = info.item_name.clone();
        let mut e = Entity::new(actor, class_name.to_string(), EntityKind::Loot(info));
        e.display_name = display;
        Some(e)
    }

    fn hydrate_chest(
        &mut self,
        actor: RemoteAddress,
        class_name: &str,
        special: bool,
        names: &NameResolver,
        min_rarity: Rarity,
    ) -> Entity {
        let reader = Arc::clone(&self.reader);
        let inv = self.chest_probe.locate(reader.as_ref(), actor, |candidate| {
            match TArrayRaw::read_from(reader.as_ref(), candidate + offsets::inventory::LIST) {
                Ok(list) => list.is_plausible(MAX_INVENTORY_BASES),
                Err(_) => false,
            }
        });

        let contents = match inv {
            Some(component) => {
                self.read_inventory(component, CHEST_ELEMENT_LAYOUTS, false, names, min_rarity)
            }
            None => Vec::new(),
        };

        let mut e = Entity::new(
            actor,
            class_name.to_string(),
            EntityKind::Chest(ChestInfo { special, contents }),
        );
        e.display_name = if special { "RARE CHEST".to_string() } else { "Chest".to_string() };
        e
    }

    fn hydrate_portal(&self, actor: RemoteAddress, class_name: &str) -> Entity {
        let mut e = Entity::new(actor, class_name.to_string(), EntityKind::Portal);
        e.display_name = portal_display_name(class_name).to_string();
        e
    }

    fn hydrate_interactable(&self, actor: RemoteAddress, class_name: &str) -> Entity {
        let mut e = Entity::new(actor, class_name.to_string(), EntityKind::Interactable);
        e.display_name = clean_monster_name(class_name);
        e
    }

    fn apply_death_debounce(&mut self, key: u64, entity: &mut Entity) {
        if !entity.alive && entity.health == 0.0 {
            self.death_debounce.insert(key, DEATH_DEBOUNCE_PASSES);
        } else if self.death_debounce.contains_key(&key) {
            if entity.health == 0.0 {
                // Health momentarily read as restored on a confirmed corpse
                entity.alive = false;
            } else if entity.health > 0.0 {
                self.death_debounce.remove(&key);
            }
            // A negative sentinel says nothing either way; the mark stands
        }
    }

    /// Walks an inventory component into display lines. Each base container
    /// is tried against the known item-array offsets (plus the dead-body
    /// probe set), each item array against the element layouts, first
    /// validating entry wins the layout.
    fn read_inventory(
        &self,
        component: RemoteAddress,
        layouts: &[(u64, u64)],
        probe_bases: bool,
        names: &NameResolver,
        min_rarity: Rarity,
    ) -> Vec<String> {
        let mut out = Vec::new();
        if !component.is_plausible() {
            return out;
        }
        let list = match TArrayRaw::read_from(
            self.reader.as_ref(),
            component + offsets::inventory::LIST,
        ) {
            Ok(l) if l.is_plausible(MAX_INVENTORY_BASES) => l,
            _ => return out,
        };
        let bases = match list.read_ptr_elements(self.reader.as_ref()) {
            Ok(b) => b,
            Err(_) => return out,
        };

        let mut item_offsets = vec![
            offsets::inventory::BASE_MONSTER_ITEMS,
            offsets::inventory::BASE_INVENTORY_DATA + offsets::inventory::DATA_ITEMS,
        ];
        if probe_bases {
            item_offsets.extend_from_slice(BODY_ITEM_PROBE);
        }

        for base in bases {
            if !base.is_plausible() {
                continue;
            }
            for &item_off in &item_offsets {
                let items = match TArrayRaw::read_from(self.reader.as_ref(), base + item_off) {
                    Ok(a) if a.is_plausible(MAX_INVENTORY_ITEMS) => a,
                    _ => continue,
                };
                if self.collect_items(&items, layouts, names, min_rarity, &mut out) {
                    break;
                }
            }
        }
        out
    }

    /// True once a layout validated for this item array, whether or not any
    /// entry cleared the rarity floor.
    fn collect_items(
        &self,
        items: &TArrayRaw,
        layouts: &[(u64, u64)],
        names: &NameResolver,
        min_rarity: Rarity,
        out: &mut Vec<String>,
    ) -> bool {
        for &(stride, info_off) in layouts {
            let first = match self.read_item_entry(items.data + info_off, names) {
                Some(e) => e,
                None => continue,
            };
            // Layout confirmed, collect the rest with it
            let mut entries = vec![first];
            for i in 1..items.count as u64 {
                if let Some(e) = self.read_item_entry(items.data + i * stride + info_off, names) {
                    entries.push(e);
                }
            }
            for (name, rarity) in entries {
                if rarity < min_rarity || is_gold(&name) {
                    continue;
                }
                out.push(format!("{} {}", rarity.label(), clean_item_name(&name)));
            }
            return true;
        }
        false
    }

    /// (raw name, rarity) for one slot, or `None` when the slot fails
    /// validation: implausible pointers, a missing `Rarity.` tag, or a name
    /// too short to be a real item id.
    fn read_item_entry(&self, slot: RemoteAddress, names: &NameResolver) -> Option<(String, Rarity)> {
        let info = match self.reader.read_ptr(slot) {
            Ok(p) if p.is_plausible() => p,
            _ => return None,
        };
        let asset = match self.reader.read_ptr(info + offsets::item_info::DATA_ASSET) {
            Ok(p) if p.is_plausible() => p,
            _ => return None,
        };

        let rarity_tag = match self.reader.read_u32(asset + offsets::item_data::RARITY_TYPE) {
            Ok(index) => names.resolve(index),
            Err(_) => return None,
        };
        if !rarity_tag.contains("Rarity.") {
            return None;
        }

        let name = match self.reader.read_u32(asset + offsets::item_data::ID_TAG) {
            Ok(index) => names.resolve(index),
            Err(_) => return None,
        };
        if name.len() < 5 || name == "None" {
            return None;
        }
        Some((name, parse_rarity_tag(&rarity_tag)))
    }
}

/// Indices of entities the filter lets through, distances measured from the
/// viewer in meters. Chests and interactables ignore category toggles; the
/// local pawn is never listed; monsters of unknown grade bypass the grade
/// floor.
pub fn filter_entities(entities: &[Entity], viewer: &Vec3, filter: &EntityFilter) -> Vec<usize> {
    let mut out = Vec::new();
    for (i, e) in entities.iter().enumerate() {
        if e.is_local {
            continue;
        }
        let dist = viewer.distance_to_meters(&e.position);
        let keep = match &e.kind {
            EntityKind::Player(_) => filter.show_players && dist <= filter.max_player_distance,
            EntityKind::Monster(m) => {
                filter.show_monsters
                    && dist <= filter.max_distance
                    && (m.grade == MonsterGrade::Unknown || m.grade >= filter.min_monster_grade)
            }
            EntityKind::Chest(_) => dist <= filter.max_distance,
            EntityKind::Loot(l) => {
                filter.show_loot && dist <= filter.max_distance && l.rarity >= filter.min_loot_rarity
            }
            EntityKind::Portal => filter.show_portals && dist <= filter.max_distance,
            EntityKind::Interactable => dist <= filter.max_distance,
        };
        if keep {
            out.push(i);
        }
    }
    out
}

/// Grid key for portal de-duplication: paired portal actors standing on the
/// same 50 cm cell collapse to one.
fn portal_dedup_key(pos: &Vec3) -> u64 {
    let px = (pos.x / 50.0) as i32;
    let py = (pos.y / 50.0) as i32;
    let pz = (pos.z / 50.0) as i32;
    ((px as u32 as u64) << 32) | ((py as u16 as u64) << 16) | (pz as u16 as u64)
}

fn portal_display_name(class_name: &str) -> &'static str {
    if class_name.contains("Escape")
        || class_name.contains("Extraction")
        || class_name.contains("StairEscape")
    {
        "EXIT PORTAL"
    } else if class_name.contains("Down") {
        "Down Portal"
    } else if class_name.contains("Up") {
        "Up Portal"
    } else {
        "Portal"
    }
}

fn is_gold(name: &str) -> bool {
    name.contains("GoldCoin") || name.contains("Gold_Coin") || name.contains("GoldPouch")
}

const PLAYER_CLASSES: &[&str] =
    &["Fighter", "Barbarian", "Rogue", "Ranger", "Wizard", "Cleric", "Bard", "Warlock", "Druid"];

/// Class word embedded in a character identity string, if any.
fn class_from_identity(identity: &str) -> Option<String> {
    PLAYER_CLASSES.iter().find(|c| identity.contains(**c)).map(|c| (*c).to_string())
}

fn fallback_item_name(item_name: &str, class_name: &str) -> String {
    if item_name.is_empty() {
        clean_item_name(class_name)
    } else {
        clean_item_name(item_name)
    }
}

fn item_type_label(item_type: u8) -> &'static str {
    match item_type {
        1 => "Weapon",
        2 => "Armor",
        3 => "Utility",
        4 => "Accessory",
        5 => "Misc",
        6 => "Gem",
        _ => "Item",
    }
}

use crate::entity::types::ActorCategory;

/// Single predicate over a class name.
#[derive(Debug, Clone, Copy)]
pub enum NameTest {
    Prefix(&'static str),
    NotPrefix(&'static str),
    Contains(&'static str),
    NotContains(&'static str),
}

impl NameTest {
    fn passes(&self, name: &str) -> bool {
        match self {
            NameTest::Prefix(p) => name.starts_with(p),
            NameTest::NotPrefix(p) => !name.starts_with(p),
            NameTest::Contains(s) => name.contains(s),
            NameTest::NotContains(s) => !name.contains(s),
        }
    }
}

/// One classification rule: every `all` test must pass, and at least one
/// `any` test (when the list is non-empty). First matching rule wins.
#[derive(Debug)]
pub struct Rule {
    pub category: ActorCategory,
    pub all: &'static [NameTest],
    pub any: &'static [NameTest],
}

impl Rule {
    fn matches(&self, name: &str) -> bool {
        self.all.iter().all(|t| t.passes(name))
            && (self.any.is_empty() || self.any.iter().any(|t| t.passes(name)))
    }
}

use NameTest::{Contains, NotContains, NotPrefix, Prefix};

/// Classification vocabulary for the current game build, evaluated top to
/// bottom. Order is load-bearing: rejects come before accepts, players
/// before monsters, the currency reject before the valuables rule.
pub static RULES: &[Rule] = &[
    // Visual-effect actors
    Rule { category: ActorCategory::Unknown, all: &[Prefix("GC_")], any: &[] },
    // Projectiles
    Rule {
        category: ActorCategory::Unknown,
        all: &[],
        any: &[
            Contains("_Arrow_C"),
            Contains("_MagicArrow_C"),
            Contains("_Missile_C"),
            Contains("_Projectile_C"),
            Contains("Thrown"),
        ],
    },
    // Area effects and decals
    Rule {
        category: ActorCategory::Unknown,
        all: &[],
        any: &[
            Contains("_Aoe_"),
            Contains("PoisonArea"),
            Contains("PoisonSting"),
            Contains("_Area_C"),
            Contains("_Effect_C"),
            Contains("Decal"),
        ],
    },
    // Player pawns
    Rule { category: ActorCategory::Player, all: &[Prefix("BP_PlayerCharacter")], any: &[] },
    // Shapeshift forms spawn as separate pawns with their own class names
    Rule {
        category: ActorCategory::Player,
        all: &[],
        any: &[
            Contains("ShapeShift"),
            Contains("DruidBear"),
            Contains("DruidPanther"),
            Contains("DruidChicken"),
            Contains("DruidRat"),
            Contains("BearForm"),
            Contains("PantherForm"),
        ],
    },
    // High-value chests
    Rule {
        category: ActorCategory::ChestSpecial,
        all: &[],
        any: &[Contains("GoldChest"), Contains("MarvelousChest"), Contains("OrnateChest")],
    },
    // Everything below requires a blueprint class
    Rule { category: ActorCategory::Unknown, all: &[NotPrefix("BP_")], any: &[] },
    // Skeleton combatants, not corpse decorations
    Rule {
        category: ActorCategory::Monster,
        all: &[Contains("Skeleton")],
        any: &[
            Contains("Swordman"),
            Contains("Archer"),
            Contains("Footman"),
            Contains("Guardman"),
            Contains("Champion"),
        ],
    },
    Rule {
        category: ActorCategory::Monster,
        all: &[Contains("Mummy"), NotContains("Spider"), NotContains("Corpse")],
        any: &[],
    },
    // Named monster types
    Rule {
        category: ActorCategory::Monster,
        all: &[],
        any: &[
            Contains("SpiderMummy"),
            Contains("Cockatrice"),
            Contains("Banshee"),
            Contains("SpectralKnight"),
            Contains("DeathSkull"),
            Contains("LivingArmor"),
            Contains("DireWolf"),
            Contains("Wisp"),
            Contains("GiantDragonfly"),
            Contains("Zombie"),
            Contains("Gargoyle"),
            Contains("GiantBat"),
            Contains("GiantSpider"),
            Contains("GiantCentipede"),
            Contains("Wraith"),
            Contains("GhostKing"),
            Contains("Lich"),
            Contains("Mimic"),
            Contains("Wyvern"),
            Contains("Troll"),
            Contains("Goblin"),
            Contains("Wolf"),
            Contains("Bear"),
            Contains("LivingStatue"),
            Contains("Living_Statue"),
            Contains("Demon"),
            Contains("DemonDog"),
        ],
    },
    // Grade-suffixed monster blueprints
    Rule {
        category: ActorCategory::Monster,
        all: &[],
        any: &[Contains("_Common_C"), Contains("_Soulflame_C"), Contains("_Nightmare_C")],
    },
    // Generic ground-item containers
    Rule { category: ActorCategory::Loot, all: &[Contains("ItemHolder")], any: &[] },
    // Weapons
    Rule {
        category: ActorCategory::Loot,
        all: &[],
        any: &[
            Contains("Sword_C"),
            Contains("Axe_C"),
            Contains("Mace_C"),
            Contains("Dagger_C"),
            Contains("Rapier_C"),
            Contains("Halberd_C"),
            Contains("Spear_C"),
            Contains("Longsword_C"),
            Contains("Falchion_C"),
            Contains("Bardiche_C"),
            Contains("Zweihander_C"),
            Contains("Quarterstaff_C"),
            Contains("HandCannon_C"),
            Contains("Crossbow_C"),
            Contains("Longbow_C"),
            Contains("RecurveBow_C"),
            Contains("Spellbook_C"),
            Contains("Staff_C"),
            Contains("CrystalBall_C"),
            Contains("Wand_C"),
            Contains("Flute_C"),
            Contains("Lute_C"),
            Contains("Drum_C"),
        ],
    },
    // Shields
    Rule {
        category: ActorCategory::Loot,
        all: &[],
        any: &[
            Contains("Buckler_C"),
            Contains("HeaterShield_C"),
            Contains("RoundShield_C"),
            Contains("Pavise_C"),
        ],
    },
    // Armor
    Rule {
        category: ActorCategory::Loot,
        all: &[],
        any: &[
            Contains("Helmet_C"),
            Contains("Chestplate_C"),
            Contains("Leggings_C"),
            Contains("Gloves_C"),
            Contains("Boots_C"),
            Contains("Cloak_C"),
            Contains("Hood_C"),
            Contains("Hat_C"),
            Contains("Robe_C"),
            Contains("Tunic_C"),
            Contains("Cape_C"),
            Contains("Gauntlet_C"),
            Contains("Necklace_C"),
            Contains("Pendant_C"),
            Contains("Ring_C"),
        ],
    },
    // Consumables and utility
    Rule {
        category: ActorCategory::Loot,
        all: &[],
        any: &[
            Contains("HealingPotion"),
            Contains("ProtectionPotion"),
            Contains("InvisibilityPotion"),
            Contains("Potion_C"),
            Contains("Bandage_C"),
            Contains("Lantern_C"),
            Contains("Torch_C"),
            Contains("Ale_C"),
            Contains("CampfireKit_C"),
            Contains("Scroll_C"),
            Contains("Trap_C"),
        ],
    },
    // Loose currency is noise, not loot
    Rule {
        category: ActorCategory::Unknown,
        all: &[],
        any: &[Contains("GoldCoin"), Contains("GoldPouch"), Contains("Gold_Coin")],
    },
    // Valuables
    Rule {
        category: ActorCategory::Loot,
        all: &[],
        any: &[
            Contains("Gem_C"),
            Contains("Coin_C"),
            Contains("Ingot_C"),
            Contains("Ore_C"),
            Contains("Trophy_C"),
        ],
    },
    // Portals
    Rule {
        category: ActorCategory::Portal,
        all: &[],
        any: &[
            Contains("FloorPortal"),
            Contains("EscapePortal"),
            Contains("DownPortal"),
            Contains("UpPortal"),
            Contains("Portal_C"),
            Contains("Escape_C"),
            Contains("ExtractionPortal"),
        ],
    },
];

/// Category for a resolved class name: first matching rule wins, no match
/// means the actor is of no interest.
pub fn classify(class_name: &str) -> ActorCategory {
    for rule in RULES {
        if rule.matches(class_name) {
            return rule.category;
        }
    }
    ActorCategory::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn players() {
        assert_eq!(classify("BP_PlayerCharacterDungeon_C"), ActorCategory::Player);
        assert_eq!(classify("BP_DruidBearShapeShift_C"), ActorCategory::Player);
    }

    #[test]
    fn shapeshift_wins_over_animal_monsters() {
        // A druid in bear form must never be classified as the bear mob
        assert_eq!(classify("BP_DruidBear_C"), ActorCategory::Player);
        assert_eq!(classify("BP_Bear_Common_C"), ActorCategory::Monster);
    }

    #[test]
    fn special_chests() {
        assert_eq!(classify("BP_GoldChest_N0_C"), ActorCategory::ChestSpecial);
        assert_eq!(classify("BP_MarvelousChest_N0_C"), ActorCategory::ChestSpecial);
        assert_eq!(classify("BP_OrnateChest_N2_C"), ActorCategory::ChestSpecial);
    }

    #[test]
    fn monsters() {
        assert_eq!(classify("BP_SkeletonSwordman_Common_C"), ActorCategory::Monster);
        assert_eq!(classify("BP_Mummy_Common_C"), ActorCategory::Monster);
        assert_eq!(classify("BP_Lich_Nightmare_C"), ActorCategory::Monster);
        assert_eq!(classify("BP_GiantSpider_Soulflame_C"), ActorCategory::Monster);
    }

    #[test]
    fn skeleton_decorations_are_not_monsters() {
        assert_eq!(classify("BP_SkeletonBones_C"), ActorCategory::Unknown);
        assert_eq!(classify("BP_MummyCorpseProp_C"), ActorCategory::Unknown);
    }

    #[test]
    fn loot() {
        assert_eq!(classify("BP_StaticMeshItemHolder_C"), ActorCategory::Loot);
        assert_eq!(classify("BP_FlangedMace_C"), ActorCategory::Loot);
        assert_eq!(classify("BP_Buckler_C"), ActorCategory::Loot);
        assert_eq!(classify("BP_HealingPotion_C"), ActorCategory::Loot);
        assert_eq!(classify("BP_RubyGem_C"), ActorCategory::Loot);
    }

    #[test]
    fn currency_is_rejected() {
        assert_eq!(classify("BP_GoldCoins_C"), ActorCategory::Unknown);
        assert_eq!(classify("BP_GoldPouch_C"), ActorCategory::Unknown);
    }

    #[test]
    fn portals() {
        assert_eq!(classify("BP_EscapePortal_C"), ActorCategory::Portal);
        assert_eq!(classify("BP_DownPortal_C"), ActorCategory::Portal);
    }

    #[test]
    fn rejects_come_first() {
        // A projectile with a weapon-like substring stays rejected
        assert_eq!(classify("BP_Hunting_Arrow_C"), ActorCategory::Unknown);
        assert_eq!(classify("GC_SomeEffect_C"), ActorCategory::Unknown);
        // Non-blueprint classes never reach the monster rules
        assert_eq!(classify("SkeletonSwordmanMesh"), ActorCategory::Unknown);
    }

    #[test]
    fn classification_is_deterministic() {
        let names = [
            "BP_PlayerCharacterDungeon_C",
            "BP_SkeletonArcher_Common_C",
            "BP_GoldChest_N0_C",
            "BP_StaticMeshItemHolder_C",
            "BP_EscapePortal_C",
            "SomeRandomActor",
        ];
        for name in names {
            let first = classify(name);
            for _ in 0..10 {
                assert_eq!(classify(name), first);
            }
        }
    }
}

use crate::entity::types::{MonsterGrade, Rarity};

/// Parses a rarity gameplay tag such as `Item.Rarity.Legend` into a tier.
/// Case-insensitive substring match, most valuable tier first so that
/// `Uncommon` is not swallowed by the `common` check.
pub fn parse_rarity_tag(tag: &str) -> Rarity {
    let lower = tag.to_ascii_lowercase();
    if lower.contains("artifact") {
        Rarity::Artifact
    } else if lower.contains("unique") {
        Rarity::Unique
    } else if lower.contains("legend") {
        Rarity::Legendary
    } else if lower.contains("epic") {
        Rarity::Epic
    } else if lower.contains("rare") {
        Rarity::Rare
    } else if lower.contains("uncommon") {
        Rarity::Uncommon
    } else if lower.contains("common") {
        Rarity::Common
    } else if lower.contains("poor") {
        Rarity::Poor
    } else {
        Rarity::Common
    }
}

/// Best-effort rarity from an item or class name when no data asset is
/// readable. Names embed the tier as a word, e.g. `BP_Sword_Epic_C`.
pub fn guess_rarity_from_name(name: &str) -> Rarity {
    let lower = name.to_ascii_lowercase();
    if lower.contains("artifact") {
        Rarity::Artifact
    } else if lower.contains("unique") {
        Rarity::Unique
    } else if lower.contains("legendary") || lower.contains("legend") {
        Rarity::Legendary
    } else if lower.contains("epic") {
        Rarity::Epic
    } else if lower.contains("rare") {
        Rarity::Rare
    } else if lower.contains("uncommon") {
        Rarity::Uncommon
    } else if lower.contains("common") {
        Rarity::Common
    } else if lower.contains("poor") {
        Rarity::Poor
    } else {
        Rarity::Common
    }
}

/// Monster grade from a design-data gameplay tag.
pub fn parse_monster_grade(tag: &str) -> MonsterGrade {
    let lower = tag.to_ascii_lowercase();
    if lower.contains("nightmare") {
        MonsterGrade::Nightmare
    } else if lower.contains("elite") {
        MonsterGrade::Elite
    } else if lower.contains("common") {
        MonsterGrade::Common
    } else {
        MonsterGrade::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_tiers() {
        assert_eq!(parse_rarity_tag("Item.Rarity.Poor"), Rarity::Poor);
        assert_eq!(parse_rarity_tag("Item.Rarity.Common"), Rarity::Common);
        assert_eq!(parse_rarity_tag("Item.Rarity.Rare"), Rarity::Rare);
        assert_eq!(parse_rarity_tag("Item.Rarity.Epic"), Rarity::Epic);
        assert_eq!(parse_rarity_tag("Item.Rarity.Legend"), Rarity::Legendary);
        assert_eq!(parse_rarity_tag("Item.Rarity.Unique"), Rarity::Unique);
        assert_eq!(parse_rarity_tag("Item.Rarity.Artifact"), Rarity::Artifact);
    }

    #[test]
    fn uncommon_is_checked_before_common() {
        assert_eq!(parse_rarity_tag("Item.Rarity.Uncommon"), Rarity::Uncommon);
        assert_eq!(guess_rarity_from_name("BP_Sword_Uncommon_C"), Rarity::Uncommon);
    }

    #[test]
    fn unrecognized_tag_defaults_to_common() {
        assert_eq!(parse_rarity_tag("Item.Rarity.Whatever"), Rarity::Common);
        assert_eq!(parse_rarity_tag(""), Rarity::Common);
    }

    #[test]
    fn name_guess_is_case_insensitive() {
        assert_eq!(guess_rarity_from_name("bp_torch_LEGENDARY_c"), Rarity::Legendary);
        assert_eq!(guess_rarity_from_name("BP_Helmet_epic_C"), Rarity::Epic);
        assert_eq!(guess_rarity_from_name("BP_Torch_C"), Rarity::Common);
    }

    #[test]
    fn monster_grades() {
        assert_eq!(parse_monster_grade("Monster.Grade.Nightmare"), MonsterGrade::Nightmare);
        assert_eq!(parse_monster_grade("Monster.Grade.Elite"), MonsterGrade::Elite);
        assert_eq!(parse_monster_grade("Monster.Grade.Common"), MonsterGrade::Common);
        assert_eq!(parse_monster_grade("something else"), MonsterGrade::Unknown);
    }
}

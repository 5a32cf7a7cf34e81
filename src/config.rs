use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::entity::EntityFilter;

/// Pattern-scan recipe for a global the binary does not export: the byte
/// pattern locates the instruction, the displacement field inside it points
/// at the global.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternConfig {
    pub pattern: String,
    /// Byte offset of the 32-bit displacement within the matched bytes.
    pub disp_offset: usize,
    /// Total instruction length, for rip-relative resolution.
    pub instr_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub process_name: String,
    /// Shared-memory relay file; direct process reads when absent.
    pub relay_path: Option<PathBuf>,
    /// Known module-relative offset of the world pointer, e.g. "0x98A2D48".
    #[serde(with = "hex_offset")]
    pub gworld_offset: Option<u64>,
    #[serde(with = "hex_offset")]
    pub gnames_offset: Option<u64>,
    /// Fallback pattern scans when the fixed offsets are stale.
    pub gworld_pattern: Option<PatternConfig>,
    pub gnames_pattern: Option<PatternConfig>,
    /// Pin the level's actor-array offset instead of discovering it on the
    /// first world read.
    #[serde(with = "hex_offset")]
    pub level_actors_offset: Option<u64>,
    pub screen_width: u32,
    pub screen_height: u32,
    pub scan_interval_ms: u64,
    pub filter: EntityFilter,
}

/// Module-relative root pointer offsets for the current game build; a stale
/// pair is caught by verification and the pattern scans take over.
pub const DEFAULT_GWORLD_OFFSET: u64 = 0xC36_F138;
pub const DEFAULT_GNAMES_OFFSET: u64 = 0xC10_A3C0;

const DEFAULT_GWORLD_PATTERN: &str = "48 8B 05 ?? ?? ?? ?? 48 3B C3 48 0F 44 C6";
const DEFAULT_GNAMES_PATTERN: &str = "48 8D 05 ?? ?? ?? ?? EB 16";

impl Default for Config {
    fn default() -> Self {
        Self {
            process_name: "DungeonCrawler".to_string(),
            relay_path: None,
            gworld_offset: Some(DEFAULT_GWORLD_OFFSET),
            gnames_offset: Some(DEFAULT_GNAMES_OFFSET),
            gworld_pattern: Some(PatternConfig {
                pattern: DEFAULT_GWORLD_PATTERN.to_string(),
                disp_offset: 3,
                instr_len: 7,
            }),
            gnames_pattern: Some(PatternConfig {
                pattern: DEFAULT_GNAMES_PATTERN.to_string(),
                disp_offset: 3,
                instr_len: 7,
            }),
            level_actors_offset: None,
            screen_width: 1920,
            screen_height: 1080,
            scan_interval_ms: 500,
            filter: EntityFilter::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_process_name(mut self, name: String) -> Self {
        self.process_name = name;
        self
    }

    pub fn with_relay_path(mut self, path: PathBuf) -> Self {
        self.relay_path = Some(path);
        self
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw).with_context(|| format!("writing config {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.process_name.is_empty() {
            return Err("process_name must not be empty".to_string());
        }
        if self.gworld_offset.is_none() && self.gworld_pattern.is_none() {
            return Err("either gworld_offset or gworld_pattern must be set".to_string());
        }
        if self.gnames_offset.is_none() && self.gnames_pattern.is_none() {
            return Err("either gnames_offset or gnames_pattern must be set".to_string());
        }
        if self.screen_width == 0 || self.screen_height == 0 {
            return Err("screen dimensions must be nonzero".to_string());
        }
        if self.scan_interval_ms == 0 {
            return Err("scan_interval_ms must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Offsets serialize as "0x"-prefixed hex strings, the form they are quoted
/// in everywhere else.
mod hex_offset {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<u64>, ser: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => ser.serialize_some(&format!("{v:#x}")),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<u64>, D::Error> {
        let raw: Option<String> = Option::deserialize(de)?;
        match raw {
            None => Ok(None),
            Some(s) => {
                let digits = s.trim_start_matches("0x").trim_start_matches("0X");
                u64::from_str_radix(digits, 16)
                    .map(Some)
                    .map_err(|e| serde::de::Error::custom(format!("bad hex offset '{s}': {e}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates_with_builtin_roots() {
        let c = Config::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.gworld_offset, Some(DEFAULT_GWORLD_OFFSET));
    }

    #[test]
    fn config_without_any_root_source_is_rejected() {
        let mut c = Config::default();
        c.gworld_offset = None;
        c.gworld_pattern = None;
        assert!(c.validate().is_err());
    }

    #[test]
    fn offsets_round_trip_as_hex_strings() {
        let mut c = Config::default();
        c.gworld_offset = Some(0x98A_2D48);
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("\"0x98a2d48\""));

        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.gworld_offset, Some(0x98A_2D48));
        assert_eq!(back.gnames_offset, Some(DEFAULT_GNAMES_OFFSET));
    }

    #[test]
    fn uppercase_and_bare_hex_both_parse() {
        let back: Config =
            serde_json::from_str(r#"{"gworld_offset": "0X1A2B", "gnames_offset": "ff00"}"#)
                .unwrap();
        assert_eq!(back.gworld_offset, Some(0x1A2B));
        assert_eq!(back.gnames_offset, Some(0xFF00));
    }

    #[test]
    fn level_actors_override_parses_as_hex() {
        assert_eq!(Config::default().level_actors_offset, None);
        let c: Config = serde_json::from_str(r#"{"level_actors_offset": "0x98"}"#).unwrap();
        assert_eq!(c.level_actors_offset, Some(0x98));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let c: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(c.process_name, "DungeonCrawler");
        assert_eq!(c.scan_interval_ms, 500);
        assert!(c.filter.show_players);
    }

    #[test]
    fn pattern_only_config_validates() {
        let mut c = Config::default();
        c.gworld_pattern = Some(PatternConfig {
            pattern: "48 8B 05 ?? ?? ?? ??".to_string(),
            disp_offset: 3,
            instr_len: 7,
        });
        c.gnames_pattern = Some(PatternConfig {
            pattern: "48 8D 0D ?? ?? ?? ??".to_string(),
            disp_offset: 3,
            instr_len: 7,
        });
        assert!(c.validate().is_ok());
    }
}

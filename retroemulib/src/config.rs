use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::LoadError;

/// Shade applied to each of the four DMG colour indices, as (b, g, r).
pub type DmgShade = (u8, u8, u8);

const DEFAULT_DMG_PALETTE: [DmgShade; 4] = [
    (0xFF, 0xFF, 0xFF),
    (0xAA, 0xAA, 0xAA),
    (0x55, 0x55, 0x55),
    (0x00, 0x00, 0x00),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    /// Decode the stable unofficial 6502 opcodes instead of faulting on them.
    pub allow_unofficial_opcodes: bool,
    /// Keep the hardware limit of 8 NES sprites per scanline.
    pub sprite_limit: bool,
    pub dmg_palette: [DmgShade; 4],
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            allow_unofficial_opcodes: true,
            sprite_limit: true,
            dmg_palette: DEFAULT_DMG_PALETTE,
        }
    }
}

impl EmulatorConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&text)?)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::EmulatorConfig;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EmulatorConfig::from_json(r#"{ "sprite_limit": false }"#).unwrap();
        assert!(!config.sprite_limit);
        assert!(config.allow_unofficial_opcodes);
        assert_eq!(config.dmg_palette[3], (0, 0, 0));
    }

    #[test]
    fn test_json_roundtrip() {
        let mut config = EmulatorConfig::default();
        config.allow_unofficial_opcodes = false;
        config.dmg_palette[0] = (0x0F, 0xBC, 0x9B);

        let parsed = EmulatorConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_bad_json_rejected() {
        assert!(EmulatorConfig::from_json("{ sprite_limit: ").is_err());
    }
}

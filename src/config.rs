//! On-disk panel configuration.
//!
//! The JSON shape (PascalCase field names, `LavaColorArgb` packed as a signed
//! ARGB int, zero meaning "unset") matches the original desktop builds of this
//! toy, so an existing `lavalamp.config.json` keeps working.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::field::Rgb;

pub const CONFIG_FILE: &str = "lavalamp.config.json";

/// Default lava orange, ARGB (255, 245, 110, 30).
pub const DEFAULT_COLOR_ARGB: i32 = 0xFFF5_6E1Eu32 as i32;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub lava_color_argb: i32,
}

impl Config {
    /// A config only routes to Animation when its panel has real area.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn color(&self) -> Rgb {
        if self.lava_color_argb == 0 {
            Rgb::from_argb(DEFAULT_COLOR_ARGB)
        } else {
            Rgb::from_argb(self.lava_color_argb)
        }
    }
}

/// Missing or malformed files both read as `None`; the bootstrap routes that
/// to Placement rather than reporting an error.
pub fn load(path: &Path) -> Option<Config> {
    let text = fs::read_to_string(path).ok()?;
    serde_json::from_str(&text).ok()
}

pub fn save(path: &Path, config: &Config) -> io::Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json)
}

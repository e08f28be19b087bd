//! Scenes shipped inside the binary.

use anyhow::{anyhow, Result};

use crate::config::{load_from_yaml_str, SceneConfig};

#[derive(Debug, Clone, Copy)]
pub struct Preset {
    pub name: &'static str,
    pub summary: &'static str,
    pub yaml: &'static str,
}

pub const PRESETS: &[Preset] = &[
    Preset {
        name: "campus",
        summary: "outlined town block with orbit limits",
        yaml: include_str!("../assets/scenes/campus.yaml"),
    },
    Preset {
        name: "classroom",
        summary: "room shell with a windowed front wall",
        yaml: include_str!("../assets/scenes/classroom.yaml"),
    },
    Preset {
        name: "starfield",
        summary: "sphere turning once every ten seconds",
        yaml: include_str!("../assets/scenes/starfield.yaml"),
    },
    Preset {
        name: "courier",
        summary: "van ping-ponging along a three-point path",
        yaml: include_str!("../assets/scenes/courier.yaml"),
    },
];

pub fn find(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

pub fn load(name: &str) -> Result<SceneConfig> {
    let preset = find(name).ok_or_else(|| {
        let known: Vec<&str> = PRESETS.iter().map(|p| p.name).collect();
        anyhow!("unknown preset `{name}` (known: {})", known.join(", "))
    })?;
    load_from_yaml_str(preset.yaml)
}

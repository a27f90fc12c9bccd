//! Game version identification.
//!
//! The engine shipped in four retail builds: two base games, each with and
//! without its addon. Every build is a distinct binary with its own code
//! layout, so signature sets are keyed by [`GameVersion`].

mod detect;

pub use detect::{DetectedImage, detect_version};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Preferred image base of all four retail executables (32-bit, fixed base).
pub const IMAGE_BASE: u64 = 0x0040_0000;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Display,
)]
pub enum GameVersion {
    #[strum(serialize = "g1")]
    #[serde(rename = "g1")]
    Gothic1Classic,
    #[strum(serialize = "g1a")]
    #[serde(rename = "g1a")]
    Gothic1Addon,
    #[strum(serialize = "g2")]
    #[serde(rename = "g2")]
    Gothic2Classic,
    #[strum(serialize = "g2a")]
    #[serde(rename = "g2a")]
    Gothic2Addon,
}

impl GameVersion {
    /// Short tag used in file names and CLI arguments ("g1", "g2a", ...)
    pub fn tag(&self) -> &'static str {
        self.into()
    }

    /// Long name matching the community namespace convention.
    pub fn namespace_name(&self) -> &'static str {
        match self {
            Self::Gothic1Classic => "Gothic_I_Classic",
            Self::Gothic1Addon => "Gothic_I_Addon",
            Self::Gothic2Classic => "Gothic_II_Classic",
            Self::Gothic2Addon => "Gothic_II_Addon",
        }
    }

    /// Engine version banner embedded in the executable.
    pub fn version_marker(&self) -> &'static [u8] {
        match self {
            Self::Gothic1Classic => b"GOTHIC v1.08k_mod",
            Self::Gothic1Addon => b"GOTHIC v1.12f",
            Self::Gothic2Classic => b"GOTHIC II v1.30",
            Self::Gothic2Addon => b"GOTHIC II v2.6 (fix)",
        }
    }

    /// `SizeOfImage` of the retail build, used as a fast fingerprint.
    pub fn image_size(&self) -> usize {
        match self {
            Self::Gothic1Classic => 0x0076_C000,
            Self::Gothic1Addon => 0x0078_3000,
            Self::Gothic2Classic => 0x0082_F000,
            Self::Gothic2Addon => 0x008E_9000,
        }
    }
}

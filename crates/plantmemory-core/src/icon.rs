//! The closed catalogue of icon categories an entry can be drawn as.
//!
//! The core only stores `(IconType, variant)` keys; resolving them to an
//! actual drawable is left to the presentation layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Smallest cosmetic variant within an icon type.
pub const MIN_VARIANT: u8 = 1;
/// Largest cosmetic variant within an icon type.
pub const MAX_VARIANT: u8 = 8;

macro_rules! icon_types {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Category tag assigned to a journal entry.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum IconType {
            $($variant),+
        }

        impl IconType {
            const ALL: &'static [IconType] = &[$(IconType::$variant),+];

            /// Stored and serialized name.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(IconType::$variant => $name),+
                }
            }
        }

        impl FromStr for IconType {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
                    $($name => Ok(IconType::$variant),)+
                    _ => Err(ValidationError::UnknownIcon(s.to_string())),
                }
            }
        }
    };
}

icon_types! {
    Simple => "simple",
    Tree => "tree",
    Cluster => "cluster",
    Grass => "grass",
    Mushroom => "mushroom",
    // Flowers
    Sunflower => "sunflower",
    Tulip => "tulip",
    Rose => "rose",
    Daisy => "daisy",
    // Plants
    Cactus => "cactus",
    Leaf => "leaf",
    Seedling => "seedling",
    Clover => "clover",
    Fern => "fern",
    // Creatures
    Butterfly => "butterfly",
    Bee => "bee",
    Ladybug => "ladybug",
    Snail => "snail",
    Bird => "bird",
    Cat => "cat",
    // Sky
    Sun => "sun",
    Moon => "moon",
    Star => "star",
    Cloud => "cloud",
    Rainbow => "rainbow",
    Raindrop => "raindrop",
    // Garden
    WateringCan => "watering_can",
    Pot => "pot",
    Acorn => "acorn",
    Pinecone => "pinecone",
    Birdhouse => "birdhouse",
    // Fruit
    Apple => "apple",
    Cherry => "cherry",
    // Misc
    Heart => "heart",
    Sparkle => "sparkle",
    Feather => "feather",
    Shell => "shell",
}

impl IconType {
    /// Every category, in catalogue order.
    pub fn all() -> &'static [IconType] {
        Self::ALL
    }

    /// Catalogue position; unknown ordinals fall back to [`IconType::Simple`].
    pub fn from_ordinal(ordinal: usize) -> Self {
        Self::ALL.get(ordinal).copied().unwrap_or(IconType::Simple)
    }

    pub fn ordinal(self) -> usize {
        Self::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    /// Decode a name read back from storage.
    ///
    /// Rows written by a newer catalogue may carry names this build does not
    /// know; those render as [`IconType::Simple`] instead of failing the read.
    pub fn from_stored(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            tracing::warn!(icon = name, "unknown stored icon type, using simple");
            IconType::Simple
        })
    }
}

impl Default for IconType {
    fn default() -> Self {
        IconType::Simple
    }
}

impl fmt::Display for IconType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

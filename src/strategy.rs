use std::fmt;

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Rhetorical strategy used to write a caption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Baity,
    Opinion,
    Event,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Baity, Strategy::Opinion, Strategy::Event];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Baity => "baity",
            Strategy::Opinion => "opinion",
            Strategy::Event => "event",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "baity" => Some(Strategy::Baity),
            "opinion" => Some(Strategy::Opinion),
            "event" => Some(Strategy::Event),
            _ => None,
        }
    }

    /// Uniform pick with no memory of earlier requests.
    pub fn choose<R: Rng + ?Sized>(rng: &mut R) -> Self {
        *Self::ALL.choose(rng).unwrap_or(&Strategy::Baity)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Card token codec.
//!
//! A token looks like `<num>.<colorCode>.<orientationCode>`, optionally
//! wrapped in `*` markers, e.g. `*3.2.4*`. Parsing is total: anything that is
//! not a complete card is `None`, never an error.

use serde::{Deserialize, Serialize};

/// Marker character the data files use to flag a card. Carries no meaning
/// for matching.
pub const MARKER: char = '*';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardColor {
    Orange,
    Yellow,
    Purple,
    Green,
}

impl CardColor {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "1" => Some(CardColor::Orange),
            "2" => Some(CardColor::Yellow),
            "3" => Some(CardColor::Purple),
            "4" => Some(CardColor::Green),
            _ => None,
        }
    }

    /// Colour word used in the SVG asset file names.
    pub fn asset_name(self) -> &'static str {
        match self {
            CardColor::Orange => "naranja",
            CardColor::Yellow => "amarillo",
            CardColor::Purple => "morado",
            CardColor::Green => "verde",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Orientation {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "1" => Some(Orientation::Deg0),
            "2" => Some(Orientation::Deg90),
            "3" => Some(Orientation::Deg180),
            "4" => Some(Orientation::Deg270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Orientation::Deg0 => 0,
            Orientation::Deg90 => 90,
            Orientation::Deg180 => 180,
            Orientation::Deg270 => 270,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub num: String,
    pub color: CardColor,
    pub orientation: Orientation,
}

impl Card {
    pub fn asset_path(&self) -> String {
        format!("/JungleSVG/{} {}.svg", self.num, self.color.asset_name())
    }

    /// Only the number decides a match.
    pub fn matches(&self, other: &Card) -> bool {
        self.num == other.num
    }
}

/// Parse a raw token. Markers and surrounding whitespace are ignored; the
/// remainder must split into exactly three non-empty, known parts.
pub fn parse_token(raw: &str) -> Option<Card> {
    let clean: String = raw.chars().filter(|&c| c != MARKER).collect();
    let clean = clean.trim();
    if clean.is_empty() {
        return None;
    }

    let mut parts = clean.split('.');
    let num = parts.next()?.trim();
    let color = parts.next()?.trim();
    let orientation = parts.next()?.trim();
    if parts.next().is_some() || num.is_empty() {
        return None;
    }

    Some(Card {
        num: num.to_string(),
        color: CardColor::from_code(color)?,
        orientation: Orientation::from_code(orientation)?,
    })
}

/// Canonical form of a token for equality checks: markers and all
/// whitespace removed. Not for display.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|&c| c != MARKER && !c.is_whitespace())
        .collect()
}

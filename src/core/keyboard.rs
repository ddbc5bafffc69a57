// File: src/core/keyboard.rs
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Keys at most this far apart count as touching.
pub const ADJACENT_KEY_DISTANCE: f64 = 1.15;
/// Substitutions across keys further apart than this are not plausible typos.
pub const NEARBY_KEY_DISTANCE: f64 = 2.5;

/// Physical (row, column) of each letter slot on the compact keyboard,
/// named by its QWERTY letter. The bottom row is split by the space bar.
const PHYSICAL_KEYS: [(char, (i32, i32)); 26] = [
    ('q', (0, 0)), ('w', (0, 1)), ('e', (0, 2)), ('r', (0, 3)), ('t', (0, 4)),
    ('y', (0, 5)), ('u', (0, 6)), ('i', (0, 7)), ('o', (0, 8)), ('p', (0, 9)),
    ('a', (1, 0)), ('s', (1, 1)), ('d', (1, 2)), ('f', (1, 3)), ('g', (1, 4)),
    ('h', (1, 5)), ('j', (1, 6)), ('k', (1, 7)), ('l', (1, 8)),
    ('z', (2, 0)), ('x', (2, 1)), ('c', (2, 2)), ('v', (2, 3)),
    ('b', (2, 6)), ('n', (2, 7)), ('m', (2, 8)),
];

/// Letter layouts used for proximity scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyboardLayout {
    #[default]
    Qwerty,
    Azerty,
    Qwertz,
}

impl KeyboardLayout {
    /// Letter printed on the physical slot that carries `qwerty_slot` on QWERTY.
    fn letter_on(self, qwerty_slot: char) -> char {
        match (self, qwerty_slot) {
            (KeyboardLayout::Azerty, 'q') => 'a',
            (KeyboardLayout::Azerty, 'a') => 'q',
            (KeyboardLayout::Azerty, 'w') => 'z',
            (KeyboardLayout::Azerty, 'z') => 'w',
            (KeyboardLayout::Qwertz, 'y') => 'z',
            (KeyboardLayout::Qwertz, 'z') => 'y',
            (_, c) => c,
        }
    }

    pub fn key_positions(self) -> KeyPositions {
        let positions = PHYSICAL_KEYS
            .iter()
            .map(|&(slot, pos)| (self.letter_on(slot), pos))
            .collect();
        KeyPositions { layout: self, positions }
    }
}

impl FromStr for KeyboardLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "qwerty" => Ok(KeyboardLayout::Qwerty),
            "azerty" => Ok(KeyboardLayout::Azerty),
            "qwertz" => Ok(KeyboardLayout::Qwertz),
            other => Err(format!("unknown keyboard layout '{}'", other)),
        }
    }
}

impl fmt::Display for KeyboardLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyboardLayout::Qwerty => "qwerty",
            KeyboardLayout::Azerty => "azerty",
            KeyboardLayout::Qwertz => "qwertz",
        };
        f.write_str(name)
    }
}

/// Letter -> (row, column) table for one layout.
#[derive(Debug, Clone)]
pub struct KeyPositions {
    layout: KeyboardLayout,
    positions: HashMap<char, (i32, i32)>,
}

impl KeyPositions {
    pub fn layout(&self) -> KeyboardLayout {
        self.layout
    }

    /// Euclidean distance in key units; `None` when either key is off the map.
    pub fn distance(&self, a: char, b: char) -> Option<f64> {
        let lower = |c: char| c.to_lowercase().next().unwrap_or(c);
        let (r1, c1) = *self.positions.get(&lower(a))?;
        let (r2, c2) = *self.positions.get(&lower(b))?;
        let dr = f64::from(r1 - r2);
        let dc = f64::from(c1 - c2);
        Some((dr * dr + dc * dc).sqrt())
    }
}

impl Default for KeyPositions {
    fn default() -> Self {
        KeyboardLayout::Qwerty.key_positions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qwerty_neighbours() {
        let keys = KeyboardLayout::Qwerty.key_positions();
        assert_eq!(keys.distance('a', 's'), Some(1.0));
        assert_eq!(keys.distance('Q', 'a'), Some(1.0));
        assert!(keys.distance('a', 'm').unwrap() > NEARBY_KEY_DISTANCE);
        assert_eq!(keys.distance('a', '1'), None);
    }

    #[test]
    fn azerty_swaps_letters() {
        let keys = KeyboardLayout::Azerty.key_positions();
        assert_eq!(keys.distance('a', 'z'), Some(1.0));
        assert_eq!(keys.distance('a', 'q'), Some(1.0));
        let qw = keys.distance('q', 'w').unwrap();
        assert!((qw - 2f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn qwertz_swaps_y_and_z() {
        let keys = KeyboardLayout::Qwertz.key_positions();
        assert_eq!(keys.distance('z', 't'), Some(1.0));
        assert_eq!(keys.distance('y', 'x'), Some(1.0));
    }

    #[test]
    fn parses_names() {
        assert_eq!("AZERTY".parse::<KeyboardLayout>(), Ok(KeyboardLayout::Azerty));
        assert!("dvorak".parse::<KeyboardLayout>().is_err());
        assert_eq!(KeyboardLayout::Qwertz.to_string(), "qwertz");
    }
}

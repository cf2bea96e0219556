use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

/* ----------------------------- Physical keys ----------------------------- */

/// Keyboard keys that can appear in a stored binding.
///
/// Names follow the physical-key naming used in ini files
/// (`KeyCode::KeyA`, `KeyCode::Semicolon`, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InputKey {
    KeyA, KeyB, KeyC, KeyD, KeyE, KeyF, KeyG, KeyH, KeyI, KeyJ, KeyK, KeyL, KeyM,
    KeyN, KeyO, KeyP, KeyQ, KeyR, KeyS, KeyT, KeyU, KeyV, KeyW, KeyX, KeyY, KeyZ,
    Digit0, Digit1, Digit2, Digit3, Digit4, Digit5, Digit6, Digit7, Digit8, Digit9,
    Space,
    Semicolon,
    Comma,
    Period,
    Slash,
    Quote,
    BracketLeft,
    BracketRight,
    Tab,
    CapsLock,
    Enter,
    ShiftLeft,
    ShiftRight,
    ControlLeft,
    ControlRight,
    AltLeft,
    AltRight,
}

impl InputKey {
    pub const fn name(self) -> &'static str {
        use InputKey::*;
        match self {
            KeyA => "KeyA", KeyB => "KeyB", KeyC => "KeyC", KeyD => "KeyD",
            KeyE => "KeyE", KeyF => "KeyF", KeyG => "KeyG", KeyH => "KeyH",
            KeyI => "KeyI", KeyJ => "KeyJ", KeyK => "KeyK", KeyL => "KeyL",
            KeyM => "KeyM", KeyN => "KeyN", KeyO => "KeyO", KeyP => "KeyP",
            KeyQ => "KeyQ", KeyR => "KeyR", KeyS => "KeyS", KeyT => "KeyT",
            KeyU => "KeyU", KeyV => "KeyV", KeyW => "KeyW", KeyX => "KeyX",
            KeyY => "KeyY", KeyZ => "KeyZ",
            Digit0 => "Digit0", Digit1 => "Digit1", Digit2 => "Digit2", Digit3 => "Digit3",
            Digit4 => "Digit4", Digit5 => "Digit5", Digit6 => "Digit6", Digit7 => "Digit7",
            Digit8 => "Digit8", Digit9 => "Digit9",
            Space => "Space",
            Semicolon => "Semicolon",
            Comma => "Comma",
            Period => "Period",
            Slash => "Slash",
            Quote => "Quote",
            BracketLeft => "BracketLeft",
            BracketRight => "BracketRight",
            Tab => "Tab",
            CapsLock => "CapsLock",
            Enter => "Enter",
            ShiftLeft => "ShiftLeft",
            ShiftRight => "ShiftRight",
            ControlLeft => "ControlLeft",
            ControlRight => "ControlRight",
            AltLeft => "AltLeft",
            AltRight => "AltRight",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        use InputKey::*;
        let key = match name {
            // Letter keys
            "KeyA" => KeyA, "KeyB" => KeyB, "KeyC" => KeyC, "KeyD" => KeyD,
            "KeyE" => KeyE, "KeyF" => KeyF, "KeyG" => KeyG, "KeyH" => KeyH,
            "KeyI" => KeyI, "KeyJ" => KeyJ, "KeyK" => KeyK, "KeyL" => KeyL,
            "KeyM" => KeyM, "KeyN" => KeyN, "KeyO" => KeyO, "KeyP" => KeyP,
            "KeyQ" => KeyQ, "KeyR" => KeyR, "KeyS" => KeyS, "KeyT" => KeyT,
            "KeyU" => KeyU, "KeyV" => KeyV, "KeyW" => KeyW, "KeyX" => KeyX,
            "KeyY" => KeyY, "KeyZ" => KeyZ,
            // Number row
            "Digit0" => Digit0, "Digit1" => Digit1, "Digit2" => Digit2, "Digit3" => Digit3,
            "Digit4" => Digit4, "Digit5" => Digit5, "Digit6" => Digit6, "Digit7" => Digit7,
            "Digit8" => Digit8, "Digit9" => Digit9,
            // Punctuation and special keys
            "Space" => Space,
            "Semicolon" => Semicolon,
            "Comma" => Comma,
            "Period" => Period,
            "Slash" => Slash,
            "Quote" => Quote,
            "BracketLeft" => BracketLeft,
            "BracketRight" => BracketRight,
            "Tab" => Tab,
            "CapsLock" => CapsLock,
            "Enter" => Enter,
            "ShiftLeft" => ShiftLeft,
            "ShiftRight" => ShiftRight,
            "ControlLeft" => ControlLeft,
            "ControlRight" => ControlRight,
            "AltLeft" => AltLeft,
            "AltRight" => AltRight,
            _ => return None,
        };
        Some(key)
    }
}

impl fmt::Display for InputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyCode::{}", self.name())
    }
}

impl FromStr for InputKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        // Accept both the prefixed ini form and a bare key name.
        let name = t.strip_prefix("KeyCode::").unwrap_or(t);
        Self::from_name(name).ok_or_else(|| format!("'{t}' is not a known key"))
    }
}

/* --------------------------- Key combinations --------------------------- */

/// Keys that must be held together to trigger a binding, e.g.
/// `KeyCode::ShiftLeft+KeyCode::KeyD`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct KeyCombination {
    keys: SmallVec<[InputKey; 2]>,
}

impl KeyCombination {
    pub fn new(keys: &[InputKey]) -> Self {
        let mut combo: SmallVec<[InputKey; 2]> = keys.iter().copied().collect();
        combo.sort_unstable();
        combo.dedup();
        Self { keys: combo }
    }

    #[inline(always)]
    pub fn single(key: InputKey) -> Self {
        Self::new(&[key])
    }

    #[inline(always)]
    pub fn keys(&self) -> &[InputKey] {
        &self.keys
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// True when every key of `self` is held in `pressed`.
    pub fn is_pressed(&self, pressed: &[InputKey]) -> bool {
        !self.keys.is_empty() && self.keys.iter().all(|k| pressed.contains(k))
    }
}

impl From<InputKey> for KeyCombination {
    fn from(key: InputKey) -> Self {
        Self::single(key)
    }
}

impl fmt::Display for KeyCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                write!(f, "+")?;
            }
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

impl FromStr for KeyCombination {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err("Key combination is empty".to_string());
        }
        let keys = raw
            .split('+')
            .map(InputKey::from_str)
            .collect::<Result<SmallVec<[InputKey; 2]>, _>>()?;
        Ok(Self::new(&keys))
    }
}

/// Parses an ini binding list such as `KeyCode::KeyD;KeyCode::KeyF`.
///
/// Unknown tokens are skipped so one typo does not drop the whole row.
pub fn parse_binding_list(value: &str) -> Vec<KeyCombination> {
    value.split([';', ','])
        .map(str::trim)
        .filter(|tok| !tok.is_empty())
        .filter_map(|tok| match tok.parse::<KeyCombination>() {
            Ok(combo) => Some(combo),
            Err(e) => {
                log::warn!("Ignoring key binding token: {e}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{InputKey, KeyCombination, parse_binding_list};

    #[test]
    fn parses_prefixed_and_bare_key_names() {
        assert_eq!("KeyCode::KeyD".parse::<InputKey>(), Ok(InputKey::KeyD));
        assert_eq!(" Semicolon ".parse::<InputKey>(), Ok(InputKey::Semicolon));
        assert!("KeyCode::F13".parse::<InputKey>().is_err());
    }

    #[test]
    fn combination_order_does_not_matter() {
        let a: KeyCombination = "KeyCode::KeyD+KeyCode::ShiftLeft".parse().unwrap();
        let b: KeyCombination = "ShiftLeft+KeyD".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "KeyCode::KeyD+KeyCode::ShiftLeft");
    }

    #[test]
    fn combination_requires_every_key() {
        let combo = KeyCombination::new(&[InputKey::ShiftLeft, InputKey::KeyD]);
        assert!(combo.is_pressed(&[InputKey::KeyD, InputKey::ShiftLeft, InputKey::KeyF]));
        assert!(!combo.is_pressed(&[InputKey::KeyD]));
        assert!(!KeyCombination::default().is_pressed(&[InputKey::KeyD]));
    }

    #[test]
    fn binding_list_skips_bad_tokens() {
        let list = parse_binding_list("KeyCode::KeyD; bogus ,KeyCode::KeyF;");
        assert_eq!(
            list,
            vec![
                KeyCombination::single(InputKey::KeyD),
                KeyCombination::single(InputKey::KeyF)
            ]
        );
    }
}

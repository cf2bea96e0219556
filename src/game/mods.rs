use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Layout family of the playfield. The discriminant is part of the variant
/// encoding, so values must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum PlayfieldType {
    /// One stage holding every column.
    #[default]
    Single = 0,
    /// Columns split across two stages side by side.
    Dual = 1,
}

impl PlayfieldType {
    #[inline(always)]
    pub const fn value(self) -> i32 {
        self as i32
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Single => "Single",
            Self::Dual => "Dual",
        }
    }
}

/// Capabilities a gameplay modifier can declare.
pub trait Mod {
    fn acronym(&self) -> &'static str;

    /// A fixed playfield layout this modifier forces, if any.
    fn playfield_type(&self) -> Option<PlayfieldType> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ManiaMod {
    NoFail,
    Easy,
    HalfTime,
    HardRock,
    SuddenDeath,
    Perfect,
    DoubleTime,
    Nightcore,
    FadeIn,
    Hidden,
    Flashlight,
    Mirror,
    Random,
    DualStages,
    Autoplay,
}

impl ManiaMod {
    pub const ALL: [Self; 15] = [
        Self::NoFail,
        Self::Easy,
        Self::HalfTime,
        Self::HardRock,
        Self::SuddenDeath,
        Self::Perfect,
        Self::DoubleTime,
        Self::Nightcore,
        Self::FadeIn,
        Self::Hidden,
        Self::Flashlight,
        Self::Mirror,
        Self::Random,
        Self::DualStages,
        Self::Autoplay,
    ];
}

impl Mod for ManiaMod {
    fn acronym(&self) -> &'static str {
        match self {
            Self::NoFail => "NF",
            Self::Easy => "EZ",
            Self::HalfTime => "HT",
            Self::HardRock => "HR",
            Self::SuddenDeath => "SD",
            Self::Perfect => "PF",
            Self::DoubleTime => "DT",
            Self::Nightcore => "NC",
            Self::FadeIn => "FI",
            Self::Hidden => "HD",
            Self::Flashlight => "FL",
            Self::Mirror => "MR",
            Self::Random => "RD",
            Self::DualStages => "DS",
            Self::Autoplay => "AT",
        }
    }

    fn playfield_type(&self) -> Option<PlayfieldType> {
        match self {
            Self::DualStages => Some(PlayfieldType::Dual),
            _ => None,
        }
    }
}

impl fmt::Display for ManiaMod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.acronym())
    }
}

impl FromStr for ManiaMod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.acronym().eq_ignore_ascii_case(raw))
            .ok_or_else(|| format!("'{raw}' is not a valid mod"))
    }
}

/// Active modifiers in the order they were enabled. Exact duplicates are
/// dropped; iteration order is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModSet {
    mods: Vec<ManiaMod>,
}

impl ModSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the mod was already active.
    pub fn insert(&mut self, m: ManiaMod) -> bool {
        if self.mods.contains(&m) {
            return false;
        }
        self.mods.push(m);
        true
    }

    #[inline(always)]
    pub fn iter(&self) -> std::slice::Iter<'_, ManiaMod> {
        self.mods.iter()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.mods.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.mods.is_empty()
    }

    #[inline(always)]
    pub fn playfield_type(&self) -> PlayfieldType {
        playfield_type(self.iter())
    }
}

impl FromIterator<ManiaMod> for ModSet {
    fn from_iter<I: IntoIterator<Item = ManiaMod>>(iter: I) -> Self {
        let mut set = Self::new();
        for m in iter {
            set.insert(m);
        }
        set
    }
}

impl<'a> IntoIterator for &'a ModSet {
    type Item = &'a ManiaMod;
    type IntoIter = std::slice::Iter<'a, ManiaMod>;

    fn into_iter(self) -> Self::IntoIter {
        self.mods.iter()
    }
}

impl FromStr for ModSet {
    type Err = String;

    /// Accepts `"DS+MR"`, `"DS,MR"`, `"DS MR"`, or an empty string.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(|c: char| c == '+' || c == ',' || c.is_whitespace())
            .filter(|tok| !tok.is_empty())
            .map(ManiaMod::from_str)
            .collect()
    }
}

impl fmt::Display for ModSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mods.is_empty() {
            return write!(f, "None");
        }
        for (i, m) in self.mods.iter().enumerate() {
            if i > 0 {
                write!(f, "+")?;
            }
            write!(f, "{m}")?;
        }
        Ok(())
    }
}

/// First playfield override in iteration order, or [`PlayfieldType::Single`].
///
/// Conflicting overrides are never combined; later ones are reported and
/// ignored.
pub fn playfield_type<'a, M, I>(mods: I) -> PlayfieldType
where
    M: Mod + ?Sized + 'a,
    I: IntoIterator<Item = &'a M>,
{
    let mut chosen: Option<(&'static str, PlayfieldType)> = None;
    for m in mods {
        let Some(kind) = m.playfield_type() else { continue };
        match chosen {
            None => chosen = Some((m.acronym(), kind)),
            Some((first, first_kind)) => warn!(
                "Mod {} requests a {} playfield but {} already fixed it to {}; ignoring.",
                m.acronym(),
                kind.as_str(),
                first,
                first_kind.as_str()
            ),
        }
    }
    chosen.map_or(PlayfieldType::Single, |(_, kind)| kind)
}

/// Additive variant encoding: playfield type value plus total column count.
/// Saturates at `i32::MAX` instead of wrapping.
#[inline(always)]
pub fn encode_variant(playfield: PlayfieldType, total_columns: u32) -> i32 {
    playfield
        .value()
        .saturating_add(i32::try_from(total_columns).unwrap_or(i32::MAX))
}

/// Layout variant used to look up key bindings for `mods` over
/// `total_columns` columns.
///
/// Recomputed on every call; callers must not cache it across mod changes.
#[inline(always)]
pub fn resolve_variant<'a, M, I>(mods: I, total_columns: u32) -> i32
where
    M: Mod + ?Sized + 'a,
    I: IntoIterator<Item = &'a M>,
{
    encode_variant(playfield_type(mods), total_columns)
}

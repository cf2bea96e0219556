use crate::core::input::{InputKey, KeyCombination};
use crate::game::mods::{PlayfieldType, encode_variant};
use crate::game::ruleset::RulesetInfo;
use log::{debug, warn};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/* ------------------------------ Actions ------------------------------ */

/// What a key binding triggers. Written as `Special1`, `Special2` or `Key<n>`
/// in config files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ManiaAction {
    /// Special column of the first stage.
    Special1,
    /// Special column of the second stage.
    Special2,
    /// Column `n`, 1-based and counted across all stages.
    Key(u32),
}

impl fmt::Display for ManiaAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Special1 => f.write_str("Special1"),
            Self::Special2 => f.write_str("Special2"),
            Self::Key(n) => write!(f, "Key{n}"),
        }
    }
}

impl FromStr for ManiaAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        match raw {
            "Special1" => return Ok(Self::Special1),
            "Special2" => return Ok(Self::Special2),
            _ => {}
        }
        raw.strip_prefix("Key")
            .and_then(|n| n.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .map(Self::Key)
            .ok_or_else(|| {
                format!("'{raw}' is not a mania action (expected Special1, Special2, Key1, Key2, ...)")
            })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyBinding {
    /// `None` for bindings that apply to every ruleset.
    pub ruleset_id: Option<i32>,
    pub variant: Option<i32>,
    pub keys: KeyCombination,
    pub action: ManiaAction,
}

/* --------------------------- Default layouts --------------------------- */

/// Stage arrangement and column count a variant was resolved from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlayfieldLayout {
    pub playfield_type: PlayfieldType,
    pub columns: u32,
}

impl PlayfieldLayout {
    #[inline(always)]
    pub fn variant(self) -> i32 {
        encode_variant(self.playfield_type, self.columns)
    }
}

// Single stage: home row, mirrored around Space.
const SINGLE_LEFT: [InputKey; 5] =
    [InputKey::KeyF, InputKey::KeyD, InputKey::KeyS, InputKey::KeyA, InputKey::CapsLock];
const SINGLE_RIGHT: [InputKey; 5] =
    [InputKey::KeyJ, InputKey::KeyK, InputKey::KeyL, InputKey::Semicolon, InputKey::Quote];
const SINGLE_CENTER: InputKey = InputKey::Space;

// Dual stage: one hand per stage, left to right.
const DUAL_FIRST: [InputKey; 9] = [
    InputKey::KeyQ, InputKey::KeyW, InputKey::KeyE, InputKey::KeyR, InputKey::KeyT,
    InputKey::KeyA, InputKey::KeyS, InputKey::KeyD, InputKey::KeyF,
];
const DUAL_SECOND: [InputKey; 9] = [
    InputKey::KeyY, InputKey::KeyU, InputKey::KeyI, InputKey::KeyO, InputKey::KeyP,
    InputKey::KeyH, InputKey::KeyJ, InputKey::KeyK, InputKey::KeyL,
];

/// Keys for `columns` lanes of one symmetric stage, left to right.
fn single_stage_keys(columns: u32) -> Vec<Option<InputKey>> {
    let half = (columns / 2) as usize;
    let mut keys: Vec<Option<InputKey>> = (0..half).rev().map(|i| SINGLE_LEFT.get(i).copied()).collect();
    if columns % 2 == 1 {
        keys.push(Some(SINGLE_CENTER));
    }
    keys.extend((0..half).map(|i| SINGLE_RIGHT.get(i).copied()));
    keys
}

fn dual_stage_keys(columns: u32) -> Vec<Option<InputKey>> {
    let first = columns.div_ceil(2) as usize;
    let second = columns as usize - first;
    (0..first)
        .map(|i| DUAL_FIRST.get(i).copied())
        .chain((0..second).map(|i| DUAL_SECOND.get(i).copied()))
        .collect()
}

/// Built-in bindings for a layout: one `Key<n>` action per column. Special
/// actions are never bound by default. Columns beyond the key pools stay
/// unbound.
pub fn default_key_bindings(ruleset_id: Option<i32>, layout: PlayfieldLayout) -> Vec<KeyBinding> {
    let keys = match layout.playfield_type {
        PlayfieldType::Single => single_stage_keys(layout.columns),
        PlayfieldType::Dual => dual_stage_keys(layout.columns),
    };
    let variant = Some(layout.variant());
    let mut out = Vec::with_capacity(keys.len());
    for (i, key) in keys.into_iter().enumerate() {
        let action = ManiaAction::Key(i as u32 + 1);
        match key {
            Some(key) => out.push(KeyBinding {
                ruleset_id,
                variant,
                keys: KeyCombination::single(key),
                action,
            }),
            None => warn!(
                "No default key for {action} in a {}-column {} layout.",
                layout.columns,
                layout.playfield_type.as_str()
            ),
        }
    }
    out
}

/* -------------------------------- Store -------------------------------- */

type StoreKey = (Option<i32>, Option<i32>);

/// Key bindings grouped by `(ruleset id, variant)`.
#[derive(Debug, Clone, Default)]
pub struct KeyBindingStore {
    bindings: FxHashMap<StoreKey, Vec<KeyBinding>>,
}

impl KeyBindingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bindings(bindings: impl IntoIterator<Item = KeyBinding>) -> Self {
        let mut store = Self::new();
        for binding in bindings {
            store.insert(binding);
        }
        store
    }

    pub fn insert(&mut self, binding: KeyBinding) {
        self.bindings
            .entry((binding.ruleset_id, binding.variant))
            .or_default()
            .push(binding);
    }

    /// Adds each default whose action has nothing stored for the pair yet, so
    /// user overrides replace defaults action by action. Returns how many
    /// defaults were added.
    pub fn register_defaults(
        &mut self,
        ruleset_id: Option<i32>,
        variant: Option<i32>,
        defaults: impl IntoIterator<Item = KeyBinding>,
    ) -> usize {
        let slot = self.bindings.entry((ruleset_id, variant)).or_default();
        let bound: SmallVec<[ManiaAction; 16]> = slot.iter().map(|b| b.action).collect();
        let before = slot.len();
        slot.extend(defaults.into_iter().filter(|d| !bound.contains(&d.action)));
        let added = slot.len() - before;
        if added > 0 {
            debug!(
                "Registered {added} default bindings for ruleset {ruleset_id:?} variant {variant:?}."
            );
        }
        added
    }

    pub fn query(&self, ruleset_id: Option<i32>, variant: Option<i32>) -> Vec<KeyBinding> {
        self.bindings
            .get(&(ruleset_id, variant))
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.bindings.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/* ---------------------------- Input manager ---------------------------- */

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputManagerError {
    #[error("a variant is required when a ruleset is given (ruleset '{0}')")]
    MissingVariant(String),
}

/// Maps held keys to mania actions using the stored bindings for one
/// `(ruleset, variant)` pair.
#[derive(Debug, Clone)]
pub struct KeyBindingInputManager {
    ruleset_id: Option<i32>,
    variant: Option<i32>,
    bindings: Vec<KeyBinding>,
}

impl KeyBindingInputManager {
    /// `ruleset = None` selects global bindings, which take no variant.
    pub fn new(ruleset: Option<&RulesetInfo>, variant: Option<i32>) -> Result<Self, InputManagerError> {
        if let Some(r) = ruleset
            && variant.is_none()
        {
            return Err(InputManagerError::MissingVariant(r.name.clone()));
        }
        Ok(Self {
            ruleset_id: ruleset.and_then(|r| r.id),
            variant,
            bindings: Vec::new(),
        })
    }

    pub fn reload_mappings(&mut self, store: &KeyBindingStore) {
        self.bindings = store.query(self.ruleset_id, self.variant);
        debug!(
            "Loaded {} key bindings for ruleset {:?} variant {:?}.",
            self.bindings.len(),
            self.ruleset_id,
            self.variant
        );
    }

    #[inline(always)]
    pub fn variant(&self) -> Option<i32> {
        self.variant
    }

    #[inline(always)]
    pub fn bindings(&self) -> &[KeyBinding] {
        &self.bindings
    }

    /// Actions whose full key combination is held, in binding order.
    pub fn actions_for(&self, pressed: &[InputKey]) -> SmallVec<[ManiaAction; 4]> {
        let mut out: SmallVec<[ManiaAction; 4]> = SmallVec::new();
        for binding in &self.bindings {
            if binding.keys.is_pressed(pressed) && !out.contains(&binding.action) {
                out.push(binding.action);
            }
        }
        out
    }
}

use crate::config::Config;
use crate::game::bar_lines::{BarLine, generate_bar_lines};
use crate::game::beatmap::Beatmap;
use crate::game::bindings::{
    InputManagerError, KeyBindingInputManager, KeyBindingStore, PlayfieldLayout, default_key_bindings,
};
use crate::game::mods::{ModSet, PlayfieldType, resolve_variant};
use crate::game::ruleset::RulesetInfo;
use crate::game::scroll::{ScrollDirection, ScrollDirectionBroker, ScrollDirectionReader};
use crate::game::timing::TimingError;
use log::{debug, info};
use serde::Serialize;
use std::sync::Arc;

/// Everything one play of a mania beatmap needs before the first frame:
/// the laid-out beatmap, its bar lines and the shared scroll direction.
#[derive(Debug)]
pub struct ManiaSession {
    source: Arc<Beatmap>,
    beatmap: Arc<Beatmap>,
    mods: ModSet,
    bar_lines: Vec<BarLine>,
    scrolling: ScrollDirectionBroker,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary<'a> {
    pub title: &'a str,
    pub version: &'a str,
    pub mods: String,
    pub playfield: &'static str,
    pub columns: u32,
    pub variant: i32,
    pub scroll_direction: Option<ScrollDirection>,
    pub bar_lines: &'a [BarLine],
}

fn lay_out(source: &Arc<Beatmap>, mods: &ModSet) -> Arc<Beatmap> {
    match mods.playfield_type() {
        PlayfieldType::Single => Arc::clone(source),
        PlayfieldType::Dual => Arc::new(source.with_dual_stages()),
    }
}

impl ManiaSession {
    /// Fails on invalid timing before anything is generated. The configured
    /// scroll direction is published before this returns.
    pub fn new(source: Arc<Beatmap>, mods: ModSet, config: &Config) -> Result<Self, TimingError> {
        let bar_lines = generate_bar_lines(source.timing(), source.last_object_time())?;
        let beatmap = lay_out(&source, &mods);
        let scrolling = ScrollDirectionBroker::new();
        scrolling.set(config.scroll_direction);

        info!(
            "Session ready: '{}' [{}] mods={mods} columns={} bar_lines={}.",
            source.metadata.title,
            source.metadata.version,
            beatmap.total_columns(),
            bar_lines.len()
        );
        Ok(Self { source, beatmap, mods, bar_lines, scrolling })
    }

    /// Re-publishes the scroll direction. Consumers are notified even when
    /// the value is unchanged.
    pub fn apply_config(&self, config: &Config) {
        self.scrolling.set(config.scroll_direction);
    }

    pub fn set_mods(&mut self, mods: ModSet) {
        debug!("Mods changed from {} to {mods}.", self.mods);
        self.beatmap = lay_out(&self.source, &mods);
        self.mods = mods;
    }

    #[inline(always)]
    pub fn mods(&self) -> &ModSet {
        &self.mods
    }

    /// Beatmap as laid out for the current mods.
    #[inline(always)]
    pub fn beatmap(&self) -> &Beatmap {
        &self.beatmap
    }

    #[inline(always)]
    pub fn bar_lines(&self) -> &[BarLine] {
        &self.bar_lines
    }

    pub fn layout(&self) -> PlayfieldLayout {
        PlayfieldLayout {
            playfield_type: self.mods.playfield_type(),
            columns: self.beatmap.total_columns(),
        }
    }

    /// Recomputed from the current mods on every call.
    pub fn variant(&self) -> i32 {
        resolve_variant(&self.mods, self.beatmap.total_columns())
    }

    pub fn scroll_reader(&self) -> ScrollDirectionReader {
        self.scrolling.reader()
    }

    #[inline(always)]
    pub fn scroll_direction(&self) -> Option<ScrollDirection> {
        self.scrolling.get()
    }

    /// Input manager for the current variant. Every action `store` holds no
    /// binding for gets its default key first.
    pub fn create_input_manager(
        &self,
        ruleset: &RulesetInfo,
        store: &mut KeyBindingStore,
    ) -> Result<KeyBindingInputManager, InputManagerError> {
        let layout = self.layout();
        let variant = self.variant();
        store.register_defaults(ruleset.id, Some(variant), default_key_bindings(ruleset.id, layout));

        let mut manager = KeyBindingInputManager::new(Some(ruleset), Some(variant))?;
        manager.reload_mappings(store);
        Ok(manager)
    }

    pub fn summary(&self) -> SessionSummary<'_> {
        let layout = self.layout();
        SessionSummary {
            title: &self.source.metadata.title,
            version: &self.source.metadata.version,
            mods: self.mods.to_string(),
            playfield: layout.playfield_type.as_str(),
            columns: layout.columns,
            variant: self.variant(),
            scroll_direction: self.scroll_direction(),
            bar_lines: &self.bar_lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::input::{InputKey, KeyCombination};
    use crate::game::beatmap::{BeatmapMetadata, HitObject, StageDefinition};
    use crate::game::bindings::{KeyBinding, ManiaAction};
    use crate::game::mods::ManiaMod;
    use crate::game::ruleset::MANIA_RULESET_ID;
    use crate::game::timing::{TimingControlPoint, TimingTimeline};
    use std::sync::Mutex;

    fn four_key() -> Arc<Beatmap> {
        let timing = TimingTimeline::new(vec![TimingControlPoint::new(0.0, 500.0, 4)]).unwrap();
        Arc::new(Beatmap::new(
            BeatmapMetadata {
                title: "Test".to_string(),
                artist: String::new(),
                version: "4K".to_string(),
            },
            timing,
            vec![HitObject::note(0.0, 0), HitObject::note(1000.0, 3)],
            vec![StageDefinition { columns: 4 }],
        ))
    }

    fn up() -> Config {
        Config { scroll_direction: ScrollDirection::Up, ..Config::default() }
    }

    #[test]
    fn setup_generates_bar_lines_and_publishes_direction() {
        let session = ManiaSession::new(four_key(), ModSet::new(), &up()).unwrap();
        let times: Vec<_> = session.bar_lines().iter().map(|b| b.start_time).collect();
        assert_eq!(times, vec![0.0, 500.0, 1000.0, 1500.0, 2000.0, 2500.0]);
        assert_eq!(session.scroll_direction(), Some(ScrollDirection::Up));
        assert_eq!(session.variant(), 4);
    }

    #[test]
    fn apply_config_always_notifies() {
        let session = ManiaSession::new(four_key(), ModSet::new(), &Config::default()).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        session.scroll_reader().subscribe(move |d| sink.lock().unwrap().push(d));

        session.apply_config(&Config::default());
        session.apply_config(&up());
        assert_eq!(*seen.lock().unwrap(), vec![ScrollDirection::Down, ScrollDirection::Up]);
    }

    #[test]
    fn dual_stages_change_variant_immediately() {
        let mut session = ManiaSession::new(four_key(), ModSet::new(), &Config::default()).unwrap();
        session.set_mods([ManiaMod::DualStages].into_iter().collect());
        assert_eq!(session.beatmap().total_columns(), 8);
        assert_eq!(session.variant(), 9);
        assert_eq!(session.beatmap().hit_objects().len(), 2);

        session.set_mods(ModSet::new());
        assert_eq!(session.variant(), 4);
        assert_eq!(session.beatmap().hit_objects().len(), 2);
    }

    #[test]
    fn input_manager_binds_defaults_for_an_empty_store() {
        let session = ManiaSession::new(four_key(), ModSet::new(), &Config::default()).unwrap();
        let mut store = KeyBindingStore::new();
        let manager = session.create_input_manager(&RulesetInfo::mania(), &mut store).unwrap();
        assert_eq!(manager.variant(), Some(4));
        assert_eq!(manager.bindings().len(), 4);
        assert_eq!(manager.actions_for(&[InputKey::KeyJ]).as_slice(), &[ManiaAction::Key(3)]);
    }

    #[test]
    fn one_column_override_keeps_the_other_defaults() {
        let session = ManiaSession::new(four_key(), ModSet::new(), &Config::default()).unwrap();
        let mut store = KeyBindingStore::with_bindings([KeyBinding {
            ruleset_id: Some(MANIA_RULESET_ID),
            variant: Some(4),
            keys: KeyCombination::single(InputKey::KeyZ),
            action: ManiaAction::Key(1),
        }]);
        let manager = session.create_input_manager(&RulesetInfo::mania(), &mut store).unwrap();

        let mut bound: Vec<_> = manager.bindings().iter().map(|b| b.action).collect();
        bound.sort();
        assert_eq!(bound, (1..=4).map(ManiaAction::Key).collect::<Vec<_>>());
        assert_eq!(manager.actions_for(&[InputKey::KeyZ]).as_slice(), &[ManiaAction::Key(1)]);
        assert!(manager.actions_for(&[InputKey::KeyD]).is_empty());
        assert_eq!(manager.actions_for(&[InputKey::KeyK]).as_slice(), &[ManiaAction::Key(4)]);
    }

    #[test]
    fn variant_matches_resolver_for_every_mod_order() {
        let mut session = ManiaSession::new(four_key(), ModSet::new(), &Config::default()).unwrap();
        for mods in ["HD+DS+MR", "MR DS", "DS,HD", "HD+MR"] {
            let set: ModSet = mods.parse().unwrap();
            session.set_mods(set.clone());
            let expected = resolve_variant(&set, session.beatmap().total_columns());
            assert_eq!(session.variant(), expected);
            assert_eq!(session.layout().variant(), expected);
            assert_eq!(session.summary().variant, expected);
            let manager = session
                .create_input_manager(&RulesetInfo::mania(), &mut KeyBindingStore::new())
                .unwrap();
            assert_eq!(manager.variant(), Some(expected));
        }
        assert_eq!(session.variant(), 4);
    }

    #[test]
    fn empty_timeline_yields_no_bar_lines() {
        let map = four_key();
        let bare = Beatmap::new(
            map.metadata.clone(),
            TimingTimeline::default(),
            map.hit_objects().to_vec(),
            map.stages().to_vec(),
        );
        let session = ManiaSession::new(Arc::new(bare), ModSet::new(), &Config::default()).unwrap();
        assert!(session.bar_lines().is_empty());
    }

    #[test]
    fn runaway_timing_fails_before_setup() {
        let timing = TimingTimeline::new(vec![TimingControlPoint::new(0.0, 0.1, 4)]).unwrap();
        let map = Beatmap::new(
            BeatmapMetadata::default(),
            timing,
            vec![HitObject::note(1_000_000.0, 0)],
            vec![StageDefinition { columns: 4 }],
        );
        let err = ManiaSession::new(Arc::new(map), ModSet::new(), &Config::default()).unwrap_err();
        assert!(matches!(err, TimingError::TooManyBarLines { .. }));
    }

    #[test]
    fn summary_serializes() {
        let session = ManiaSession::new(four_key(), ModSet::new(), &up()).unwrap();
        let json = serde_json::to_value(session.summary()).unwrap();
        assert_eq!(json["variant"], 4);
        assert_eq!(json["scroll_direction"], "Up");
        assert_eq!(json["mods"], "None");
        assert_eq!(json["bar_lines"].as_array().map(Vec::len), Some(6));
    }
}

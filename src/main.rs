use lanesync::config;
use lanesync::game::bindings::KeyBindingStore;
use lanesync::game::mods::ModSet;
use lanesync::game::parsing::osu::load_osu;
use lanesync::game::ruleset::RulesetInfo;
use lanesync::game::session::ManiaSession;
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct Output<'a> {
    #[serde(flatten)]
    session: lanesync::game::session::SessionSummary<'a>,
    key_bindings: Vec<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install logger immediately, then set runtime max level from config after loading it.
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .try_init();
    log::set_max_level(log::LevelFilter::Warn);

    config::load();
    let cfg = config::get();
    log::set_max_level(cfg.log_level.as_level_filter());

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        return Err("usage: lanesync <beatmap.osu> [MOD ...]".into());
    };
    let mods: ModSet = args.collect::<Vec<_>>().join(" ").parse()?;

    let beatmap = Arc::new(load_osu(&path)?);
    let session = ManiaSession::new(beatmap, mods, &cfg)?;

    let ruleset = RulesetInfo::mania();
    let mut store = KeyBindingStore::with_bindings(config::key_binding_overrides());
    let input = session.create_input_manager(&ruleset, &mut store)?;

    let output = Output {
        session: session.summary(),
        key_bindings: input
            .bindings()
            .iter()
            .map(|b| format!("{}={}", b.action, b.keys))
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub mod bar_lines;
pub mod beatmap;
pub mod bindings;
pub mod mods;
pub mod parsing;
pub mod ruleset;
pub mod scroll;
pub mod session;
pub mod timing;

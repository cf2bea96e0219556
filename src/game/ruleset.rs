use serde::{Deserialize, Serialize};

/// Identity of a game mode. Key bindings are stored per ruleset id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RulesetInfo {
    /// Storage id; `None` until the ruleset has been registered.
    pub id: Option<i32>,
    pub name: String,
    /// Fully qualified name of the implementing type.
    pub instantiation_info: String,
    pub available: bool,
}

pub const MANIA_RULESET_ID: i32 = 3;

impl RulesetInfo {
    pub fn mania() -> Self {
        Self {
            id: Some(MANIA_RULESET_ID),
            name: "osu!mania".to_string(),
            instantiation_info: "lanesync::game::ManiaRuleset".to_string(),
            available: true,
        }
    }
}

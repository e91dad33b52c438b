// Player and pick records as served by the draft API.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A draftable player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub jersey_number: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ppg: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rpg: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub apg: Option<f64>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub school_seed: Option<u32>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl Player {
    /// Points per game used for ranking; missing or non-finite values count
    /// as zero.
    pub fn ranking_ppg(&self) -> f64 {
        self.ppg.filter(|v| v.is_finite()).unwrap_or(0.0)
    }
}

/// The `/api/available_players` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerPool {
    #[serde(default)]
    pub all: Vec<Player>,
    #[serde(default)]
    pub undrafted: Vec<Player>,
    #[serde(default)]
    pub drafted: Vec<Player>,
}

impl PlayerPool {
    pub fn find(&self, player_id: i64) -> Option<&Player> {
        self.all
            .iter()
            .chain(self.undrafted.iter())
            .chain(self.drafted.iter())
            .find(|p| p.id == player_id)
    }
}

/// A committed pick from `/api/draft_picks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftPickRecord {
    pub id: i64,
    #[serde(deserialize_with = "lenient_id")]
    pub participant_id: String,
    pub participant_name: String,
    #[serde(default)]
    pub player_id: Option<i64>,
    pub player_name: String,
    #[serde(default)]
    pub player_school: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub player_ppg: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub player_rpg: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub player_apg: Option<f64>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub draft_position: Option<u32>,
}

/// Body of `POST /api/draft_pick`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickRequest {
    pub participant_id: String,
    pub player_id: i64,
    pub draft_position: Option<u32>,
}

/// Next free draft position given the committed picks.
pub fn next_draft_position(picks: &[DraftPickRecord]) -> u32 {
    picks
        .iter()
        .filter_map(|p| p.draft_position)
        .max()
        .map_or(1, |max| max.saturating_add(1))
}

/// Format a stat the way the draft board shows it.
pub fn format_stat(value: Option<f64>) -> String {
    format!("{:.1}", value.unwrap_or(0.0))
}

// ---------------------------------------------------------------------------
// Lenient field decoding
// ---------------------------------------------------------------------------

// Stats arrive as numbers, numeric strings ("0.0" for missing stats) or null.

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_u32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

//! QR sticker inventory.
//!
//! Stickers are pre-printed in batches and later bound to equipment. A
//! reassigned sticker is retired to HISTORICAL rather than deleted, so old
//! printed labels keep resolving.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StickerStatus {
    Available,
    Assigned,
    Historical,
}

impl StickerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Assigned => "ASSIGNED",
            Self::Historical => "HISTORICAL",
        }
    }
}

impl std::fmt::Display for StickerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for StickerStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "AVAILABLE" => Ok(Self::Available),
            "ASSIGNED" => Ok(Self::Assigned),
            "HISTORICAL" => Ok(Self::Historical),
            _ => Err(format!("Unknown sticker status: {}", s)),
        }
    }
}

/// Sticker codes are densely numbered from the highest existing code.
pub fn format_sticker_code(sequence: i64) -> String {
    format!("TUVINSP-{:06}", sequence)
}

/// Parse the sequence number back out of a sticker code.
pub fn parse_sticker_sequence(code: &str) -> Option<i64> {
    code.strip_prefix("TUVINSP-")?.parse().ok()
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Sticker {
    pub id: i64,
    pub sticker_code: String,
    pub qr_payload: String,
    #[sqlx(try_from = "String")]
    pub status: StickerStatus,
    pub assigned_equipment_id: Option<i64>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub assigned_by: Option<i64>,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sticker_code_format() {
        assert_eq!(format_sticker_code(1), "TUVINSP-000001");
        assert_eq!(format_sticker_code(999999), "TUVINSP-999999");
    }

    #[test]
    fn test_sticker_sequence_round_trip() {
        assert_eq!(parse_sticker_sequence("TUVINSP-000042"), Some(42));
        assert_eq!(parse_sticker_sequence("BADPREFIX-000042"), None);
        assert_eq!(parse_sticker_sequence("TUVINSP-abc"), None);
    }
}

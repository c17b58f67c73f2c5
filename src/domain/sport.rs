use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{PropsightError, Result};

/// Sports covered by the prediction ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    Nba,
    Nfl,
    Nhl,
    Cfb,
    Tennis,
    Soccer,
    Lol,
    Cs2,
}

impl Sport {
    pub const ALL: [Sport; 8] = [
        Sport::Nba,
        Sport::Nfl,
        Sport::Nhl,
        Sport::Cfb,
        Sport::Tennis,
        Sport::Soccer,
        Sport::Lol,
        Sport::Cs2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sport::Nba => "nba",
            Sport::Nfl => "nfl",
            Sport::Nhl => "nhl",
            Sport::Cfb => "cfb",
            Sport::Tennis => "tennis",
            Sport::Soccer => "soccer",
            Sport::Lol => "lol",
            Sport::Cs2 => "cs2",
        }
    }
}

impl std::fmt::Display for Sport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Sport {
    type Err = PropsightError;

    fn from_str(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Sport::ALL
            .into_iter()
            .find(|sport| sport.as_str() == normalized)
            .ok_or_else(|| {
                PropsightError::Validation(format!(
                    "unknown sport '{}'; expected one of nba|nfl|nhl|cfb|tennis|soccer|lol|cs2",
                    raw.trim()
                ))
            })
    }
}

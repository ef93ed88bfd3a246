use crate::reminder::{format_hours, parse_hours};
use crate::short_id::ShortId;
use std::{fmt::Display, str::FromStr};
use thiserror::Error;

const SEPARATOR: char = '|';

/// Action encoded in an inline button payload: `action|short_id[|param]`
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackAction {
    /// "I have already voted"
    Voted { short_id: ShortId },
    /// "Remind me in H hour(s)"
    RemindIn { short_id: ShortId, hours: f64 },
}

impl CallbackAction {
    pub fn short_id(&self) -> &ShortId {
        match self {
            Self::Voted { short_id } | Self::RemindIn { short_id, .. } => short_id,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CallbackParseError {
    #[error("Callback payload `{0}` is missing a short id")]
    MissingShortId(String),
    #[error("Callback payload `{0}` has a missing or invalid hours parameter")]
    InvalidHours(String),
    #[error("Unknown callback action `{0}`")]
    UnknownAction(String),
}

impl FromStr for CallbackAction {
    type Err = CallbackParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(SEPARATOR);
        let action = parts.next().unwrap_or_default();
        let short_id = parts
            .next()
            .filter(|id| !id.is_empty())
            .map(ShortId::new)
            .ok_or_else(|| CallbackParseError::MissingShortId(s.to_string()))?;

        match action {
            "voted" => Ok(Self::Voted { short_id }),
            "remind_in" => {
                let hours = parts
                    .next()
                    .and_then(|h| parse_hours(h).ok())
                    .filter(|h| *h > 0.0)
                    .ok_or_else(|| CallbackParseError::InvalidHours(s.to_string()))?;
                Ok(Self::RemindIn { short_id, hours })
            }
            _ => Err(CallbackParseError::UnknownAction(action.to_string())),
        }
    }
}

impl Display for CallbackAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Voted { short_id } => write!(f, "voted{}{}", SEPARATOR, short_id),
            Self::RemindIn { short_id, hours } => write!(
                f,
                "remind_in{}{}{}{}",
                SEPARATOR,
                short_id,
                SEPARATOR,
                format_hours(*hours)
            ),
        }
    }
}

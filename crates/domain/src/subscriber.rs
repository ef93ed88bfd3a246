use crate::reminder::{ReminderOffsets, ReminderState};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Opaque transport level identifier of a chat
pub type ChatId = i64;

/// Reminder status of a single subscriber, keyed by proposal id
pub type SubscriberReminders = BTreeMap<String, ReminderState>;

/// Every registered subscriber and their per proposal `ReminderState`.
///
/// Persisted as `chat_id -> proposal_id -> state`. Records nested under a
/// top level `reminders` key are read as well.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Subscribers(BTreeMap<ChatId, SubscriberReminders>);

impl<'de> Deserialize<'de> for Subscribers {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Untagged content keeps map keys as strings
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Persisted {
            Wrapped {
                reminders: BTreeMap<String, SubscriberReminders>,
            },
            Plain(BTreeMap<String, SubscriberReminders>),
        }

        let (Persisted::Wrapped { reminders } | Persisted::Plain(reminders)) =
            Persisted::deserialize(deserializer)?;
        reminders
            .into_iter()
            .map(|(chat_id, reminders)| {
                chat_id
                    .parse::<ChatId>()
                    .map(|chat_id| (chat_id, reminders))
                    .map_err(|_| D::Error::custom(format!("Invalid chat id: {}", chat_id)))
            })
            .collect::<Result<_, _>>()
            .map(Self)
    }
}

impl Subscribers {
    /// Returns `false` if the chat was already registered
    pub fn register(&mut self, chat_id: ChatId) -> bool {
        if self.0.contains_key(&chat_id) {
            return false;
        }
        self.0.insert(chat_id, Default::default());
        true
    }

    pub fn is_registered(&self, chat_id: ChatId) -> bool {
        self.0.contains_key(&chat_id)
    }

    pub fn chat_ids(&self) -> Vec<ChatId> {
        self.0.keys().copied().collect()
    }

    pub fn state(&self, chat_id: ChatId, proposal_id: &str) -> Option<&ReminderState> {
        self.0.get(&chat_id).and_then(|r| r.get(proposal_id))
    }

    pub fn has_entry(&self, chat_id: ChatId, proposal_id: &str) -> bool {
        self.state(chat_id, proposal_id).is_some()
    }

    /// Sets the state for a registered subscriber. Returns `false` and leaves
    /// the record untouched when the chat is not registered.
    pub fn set_state(&mut self, chat_id: ChatId, proposal_id: &str, state: ReminderState) -> bool {
        match self.0.get_mut(&chat_id) {
            Some(reminders) => {
                reminders.insert(proposal_id.to_string(), state);
                true
            }
            None => false,
        }
    }

    /// All `(chat_id, proposal_id, state)` entries
    pub fn entries(&self) -> impl Iterator<Item = (ChatId, &str, &ReminderState)> {
        self.0.iter().flat_map(|(chat_id, reminders)| {
            reminders
                .iter()
                .map(move |(proposal_id, state)| (*chat_id, proposal_id.as_str(), state))
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Per subscriber override of the globally configured `ReminderOffsets`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberOffsets(BTreeMap<ChatId, ReminderOffsets>);

impl SubscriberOffsets {
    pub fn get(&self, chat_id: ChatId) -> Option<&ReminderOffsets> {
        self.0.get(&chat_id)
    }

    /// The subscriber's own offsets if present, otherwise `default`
    pub fn resolve<'a>(&'a self, chat_id: ChatId, default: &'a ReminderOffsets) -> &'a ReminderOffsets {
        self.0.get(&chat_id).unwrap_or(default)
    }

    pub fn set(&mut self, chat_id: ChatId, offsets: Option<ReminderOffsets>) {
        match offsets {
            Some(offsets) => {
                self.0.insert(chat_id, offsets);
            }
            None => {
                self.0.remove(&chat_id);
            }
        }
    }
}

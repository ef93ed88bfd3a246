use crate::subscriber::ChatId;

#[derive(Debug, Clone, PartialEq)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

/// A message for the chat transport. Every inner `Vec` of `buttons` is
/// rendered as one keyboard row.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub chat_id: ChatId,
    pub text: String,
    pub buttons: Vec<Vec<InlineButton>>,
}

impl OutboundMessage {
    pub fn text(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            buttons: Vec::new(),
        }
    }
}

/// Something a user did in a chat
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// `/name arg1 arg2`
    Command {
        chat_id: ChatId,
        name: String,
        args: Vec<String>,
    },
    /// Inline button press
    Callback {
        chat_id: ChatId,
        callback_id: String,
        data: String,
    },
}

impl InboundEvent {
    /// Parses a chat text like `/start@my_bot now` into a `Command`.
    /// Returns `None` for plain text.
    pub fn parse_command(chat_id: ChatId, text: &str) -> Option<Self> {
        let mut words = text.split_whitespace();
        let name = words.next()?.strip_prefix('/')?;
        // Group chats address commands as `/name@bot_username`
        let name = name.split('@').next().unwrap_or_default();
        if name.is_empty() {
            return None;
        }
        Some(Self::Command {
            chat_id,
            name: name.to_lowercase(),
            args: words.map(String::from).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(
            InboundEvent::parse_command(1, "/start"),
            Some(InboundEvent::Command {
                chat_id: 1,
                name: "start".into(),
                args: vec![]
            })
        );
        assert_eq!(
            InboundEvent::parse_command(1, "/Offsets@gov_bot 0,1  2"),
            Some(InboundEvent::Command {
                chat_id: 1,
                name: "offsets".into(),
                args: vec!["0,1".into(), "2".into()]
            })
        );
        assert_eq!(InboundEvent::parse_command(1, "hello"), None);
        assert_eq!(InboundEvent::parse_command(1, "/"), None);
        assert_eq!(InboundEvent::parse_command(1, ""), None);
    }
}

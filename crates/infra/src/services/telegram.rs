use super::IChatTransport;
use crate::config::TelegramConfig;
use govbot_domain::{ChatId, InboundEvent, OutboundMessage};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Answer for callbacks that cannot be routed to a chat
const UNROUTABLE_CALLBACK_ANSWER: &str = "An error occurred. Please try again later.";

#[derive(Debug, Serialize)]
struct InlineKeyboardButton<'a> {
    text: &'a str,
    callback_data: &'a str,
}

#[derive(Debug, Serialize)]
struct InlineKeyboardMarkup<'a> {
    inline_keyboard: Vec<Vec<InlineKeyboardButton<'a>>>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: ChatId,
    text: &'a str,
    parse_mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<InlineKeyboardMarkup<'a>>,
}

#[derive(Debug, Serialize)]
struct AnswerCallbackQueryRequest<'a> {
    callback_query_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 2],
}

#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: ChatId,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    id: String,
    #[serde(default)]
    message: Option<Message>,
    #[serde(default)]
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<Message>,
    #[serde(default)]
    callback_query: Option<CallbackQuery>,
}

impl Update {
    /// Callbacks from inline mode messages carry no chat
    fn chatless_callback_id(&self) -> Option<&str> {
        self.callback_query
            .as_ref()
            .filter(|query| query.message.is_none())
            .map(|query| query.id.as_str())
    }

    fn into_inbound_event(self) -> Option<InboundEvent> {
        if let Some(query) = self.callback_query {
            let chat_id = query.message.as_ref()?.chat.id;
            return Some(InboundEvent::Callback {
                chat_id,
                callback_id: query.id,
                data: query.data.unwrap_or_default(),
            });
        }
        let message = self.message?;
        InboundEvent::parse_command(message.chat.id, message.text.as_deref()?)
    }
}

/// Telegram Bot API client
pub struct TelegramBotApi {
    client: Client,
    base_url: String,
    updates_timeout_secs: u64,
    /// Id of the next update to fetch
    offset: Mutex<i64>,
}

impl TelegramBotApi {
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: format!(
                "{}/bot{}",
                config.api_url.trim_end_matches('/'),
                config.bot_token
            ),
            updates_timeout_secs: config.updates_timeout_secs,
            offset: Mutex::new(0),
        }
    }

    async fn call<B: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> anyhow::Result<T> {
        let res: TelegramResponse<T> = self
            .client
            .post(format!("{}/{}", self.base_url, method))
            .json(body)
            .send()
            .await?
            .json()
            .await?;
        if !res.ok {
            anyhow::bail!(
                "Telegram {} failed: {}",
                method,
                res.description.unwrap_or_default()
            );
        }
        res.result
            .ok_or_else(|| anyhow::anyhow!("Telegram {} returned no result", method))
    }

    fn current_offset(&self) -> anyhow::Result<i64> {
        self.offset
            .lock()
            .map(|offset| *offset)
            .map_err(|_| anyhow::anyhow!("Telegram offset lock poisoned"))
    }
}

#[async_trait::async_trait]
impl IChatTransport for TelegramBotApi {
    async fn send(&self, message: &OutboundMessage) -> anyhow::Result<()> {
        let reply_markup = if message.buttons.is_empty() {
            None
        } else {
            Some(InlineKeyboardMarkup {
                inline_keyboard: message
                    .buttons
                    .iter()
                    .map(|row| {
                        row.iter()
                            .map(|b| InlineKeyboardButton {
                                text: &b.text,
                                callback_data: &b.callback_data,
                            })
                            .collect()
                    })
                    .collect(),
            })
        };
        let body = SendMessageRequest {
            chat_id: message.chat_id,
            text: &message.text,
            parse_mode: "HTML",
            reply_markup,
        };
        let _: serde_json::Value = self.call("sendMessage", &body).await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> anyhow::Result<()> {
        let body = AnswerCallbackQueryRequest {
            callback_query_id: callback_id,
            text,
        };
        let _: bool = self.call("answerCallbackQuery", &body).await?;
        Ok(())
    }

    async fn poll_updates(&self) -> anyhow::Result<Vec<InboundEvent>> {
        let body = GetUpdatesRequest {
            offset: self.current_offset()?,
            timeout: self.updates_timeout_secs,
            allowed_updates: ["message", "callback_query"],
        };
        let updates: Vec<Update> = self.call("getUpdates", &body).await?;

        if let Some(last) = updates.iter().map(|u| u.update_id).max() {
            let mut offset = self
                .offset
                .lock()
                .map_err(|_| anyhow::anyhow!("Telegram offset lock poisoned"))?;
            *offset = last + 1;
        }

        for callback_id in updates.iter().filter_map(Update::chatless_callback_id) {
            warn!("Callback {} has no chat, answering it with an error", callback_id);
            if let Err(e) = self
                .answer_callback(callback_id, Some(UNROUTABLE_CALLBACK_ANSWER))
                .await
            {
                warn!("Unable to answer callback {}: {:?}", callback_id, e);
            }
        }

        let events = updates
            .into_iter()
            .filter_map(Update::into_inbound_event)
            .collect::<Vec<_>>();
        debug!("Received {} inbound chat events", events.len());
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use govbot_domain::InlineButton;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api(server: &MockServer) -> TelegramBotApi {
        TelegramBotApi::new(&TelegramConfig {
            bot_token: "123:abc".into(),
            api_url: server.uri(),
            updates_timeout_secs: 0,
        })
    }

    #[tokio::test]
    async fn sends_messages_with_inline_keyboard() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .and(body_json(json!({
                "chat_id": 42,
                "text": "<b>Vote</b>",
                "parse_mode": "HTML",
                "reply_markup": {
                    "inline_keyboard": [[{"text": "I have already voted", "callback_data": "voted|abc"}]]
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": {}})))
            .expect(1)
            .mount(&server)
            .await;

        let message = OutboundMessage {
            chat_id: 42,
            text: "<b>Vote</b>".into(),
            buttons: vec![vec![InlineButton {
                text: "I have already voted".into(),
                callback_data: "voted|abc".into(),
            }]],
        };
        assert!(api(&server).send(&message).await.is_ok());
    }

    #[tokio::test]
    async fn api_errors_are_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .respond_with(ResponseTemplate::new(403).set_body_json(
                json!({"ok": false, "description": "Forbidden: bot was blocked by the user"}),
            ))
            .mount(&server)
            .await;

        let err = api(&server)
            .send(&OutboundMessage::text(42, "hi"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("bot was blocked"));
    }

    #[tokio::test]
    async fn polls_updates_and_advances_offset() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/getUpdates"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": [
                    {"update_id": 10, "message": {"chat": {"id": 42}, "text": "/start"}},
                    {"update_id": 11, "message": {"chat": {"id": 42}, "text": "just chatting"}},
                    {"update_id": 12, "callback_query": {
                        "id": "cb1",
                        "data": "voted|abc",
                        "message": {"chat": {"id": 42}}
                    }}
                ]
            })))
            .mount(&server)
            .await;

        let api = api(&server);
        let events = api.poll_updates().await.unwrap();
        assert_eq!(
            events,
            vec![
                InboundEvent::Command {
                    chat_id: 42,
                    name: "start".into(),
                    args: vec![]
                },
                InboundEvent::Callback {
                    chat_id: 42,
                    callback_id: "cb1".into(),
                    data: "voted|abc".into()
                }
            ]
        );
        assert_eq!(api.current_offset().unwrap(), 13);
    }

    #[tokio::test]
    async fn answers_callbacks_without_chat() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/getUpdates"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": [
                    {"update_id": 20, "callback_query": {"id": "cb2", "data": "voted|abc"}}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/answerCallbackQuery"))
            .and(body_json(json!({
                "callback_query_id": "cb2",
                "text": "An error occurred. Please try again later."
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": true})))
            .expect(1)
            .mount(&server)
            .await;

        let api = api(&server);
        assert!(api.poll_updates().await.unwrap().is_empty());
        assert_eq!(api.current_offset().unwrap(), 21);
    }
}

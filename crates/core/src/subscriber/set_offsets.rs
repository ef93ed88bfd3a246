use crate::{error::GovBotError, shared::usecase::UseCase};
use govbot_domain::{ChatId, ReminderOffsets};
use govbot_infra::GovBotContext;

/// Overrides, or with `None` resets, the offsets used for the chat's
/// reminders. Proposals seen before keep their current reminders.
#[derive(Debug)]
pub struct SetOffsetsUseCase {
    pub chat_id: ChatId,
    pub offsets: Option<ReminderOffsets>,
}

#[derive(Debug, Clone)]
pub enum UseCaseError {
    NotSubscribed,
    StorageError,
}

impl From<UseCaseError> for GovBotError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::NotSubscribed => Self::NotSubscribed,
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for SetOffsetsUseCase {
    /// The offsets now in effect for the chat
    type Response = ReminderOffsets;

    type Error = UseCaseError;

    const NAME: &'static str = "SetOffsets";

    async fn execute(&mut self, ctx: &GovBotContext) -> Result<Self::Response, Self::Error> {
        let records = &ctx.repos.records;
        let subscribers = records
            .subscribers()
            .await
            .map_err(|_| UseCaseError::StorageError)?;
        if !subscribers.is_registered(self.chat_id) {
            return Err(UseCaseError::NotSubscribed);
        }

        let mut offsets = records
            .subscriber_offsets()
            .await
            .map_err(|_| UseCaseError::StorageError)?;
        offsets.set(self.chat_id, self.offsets.clone());
        records
            .save_subscriber_offsets(&offsets)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        Ok(offsets
            .resolve(self.chat_id, &ctx.config.reminders.default_offsets)
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use govbot_domain::Subscribers;

    #[tokio::test]
    async fn overrides_and_resets_offsets() {
        let ctx = GovBotContext::create_inmemory();
        let mut subscribers = Subscribers::default();
        subscribers.register(42);
        ctx.repos.records.save_subscribers(&subscribers).await.unwrap();

        let custom = ReminderOffsets::new(vec![], vec![24.0, 1.0]);
        let res = SetOffsetsUseCase {
            chat_id: 42,
            offsets: Some(custom.clone()),
        }
        .execute(&ctx)
        .await
        .unwrap();
        assert_eq!(res, custom);
        assert_eq!(
            ctx.repos.records.subscriber_offsets().await.unwrap().get(42),
            Some(&custom)
        );

        let res = SetOffsetsUseCase {
            chat_id: 42,
            offsets: None,
        }
        .execute(&ctx)
        .await
        .unwrap();
        assert_eq!(res, ctx.config.reminders.default_offsets);
    }

    #[tokio::test]
    async fn requires_subscription() {
        let ctx = GovBotContext::create_inmemory();
        let res = SetOffsetsUseCase {
            chat_id: 42,
            offsets: None,
        }
        .execute(&ctx)
        .await;
        assert!(matches!(res, Err(UseCaseError::NotSubscribed)));
    }
}

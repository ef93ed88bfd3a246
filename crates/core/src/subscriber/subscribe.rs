use super::subscribers::WelcomeOnSubscribed;
use crate::{
    error::GovBotError,
    shared::usecase::{Subscriber, UseCase},
};
use govbot_domain::ChatId;
use govbot_infra::GovBotContext;
use tracing::info;

/// Registers a chat for reminders about every proposal seen from now on
#[derive(Debug)]
pub struct SubscribeUseCase {
    pub chat_id: ChatId,
}

#[derive(Debug, Clone)]
pub enum UseCaseError {
    StorageError,
}

impl From<UseCaseError> for GovBotError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct Subscription {
    pub chat_id: ChatId,
    /// `false` when the chat was already registered
    pub newly_registered: bool,
}

#[async_trait::async_trait(?Send)]
impl UseCase for SubscribeUseCase {
    type Response = Subscription;

    type Error = UseCaseError;

    const NAME: &'static str = "Subscribe";

    async fn execute(&mut self, ctx: &GovBotContext) -> Result<Self::Response, Self::Error> {
        let mut subscribers = ctx
            .repos
            .records
            .subscribers()
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        let newly_registered = subscribers.register(self.chat_id);
        if newly_registered {
            ctx.repos
                .records
                .save_subscribers(&subscribers)
                .await
                .map_err(|_| UseCaseError::StorageError)?;
            info!("Added chat {} to the reminder list", self.chat_id);
        } else {
            info!("Chat {} is already registered", self.chat_id);
        }

        Ok(Subscription {
            chat_id: self.chat_id,
            newly_registered,
        })
    }

    fn subscribers() -> Vec<Box<dyn Subscriber<Self>>> {
        vec![Box::new(WelcomeOnSubscribed)]
    }
}

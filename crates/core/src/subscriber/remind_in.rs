use super::subscribers::ConfirmOnSnoozed;
use crate::{
    error::GovBotError,
    reminder::ReminderScheduler,
    shared::usecase::{Subscriber, UseCase},
};
use chrono::{DateTime, Utc};
use govbot_domain::{hours_to_duration, ChatId, ReminderState, ShortId};
use govbot_infra::GovBotContext;
use tracing::error;

/// "Remind me in H hour(s)": replaces every pending reminder of the proposal
/// with a single one `hours` from now
#[derive(Debug)]
pub struct RemindInUseCase<'a> {
    pub chat_id: ChatId,
    pub proposal_id: String,
    pub short_id: ShortId,
    pub hours: f64,
    pub scheduler: &'a ReminderScheduler,
}

#[derive(Debug, Clone)]
pub enum UseCaseError {
    UnknownChat(ChatId),
    AlreadyVoted,
    InvalidHours(f64),
    StorageError,
}

impl From<UseCaseError> for GovBotError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::UnknownChat(chat_id) => {
                Self::NotFound(format!("Chat {} is not registered", chat_id))
            }
            UseCaseError::AlreadyVoted => {
                Self::Conflict("You already voted on this proposal.".into())
            }
            UseCaseError::InvalidHours(hours) => {
                Self::BadClientData(format!("Unable to snooze for {} hours", hours))
            }
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct ReminderSnoozed {
    pub chat_id: ChatId,
    pub proposal_id: String,
    pub hours: f64,
    pub fire_at: DateTime<Utc>,
}

#[async_trait::async_trait(?Send)]
impl UseCase for RemindInUseCase<'_> {
    type Response = ReminderSnoozed;

    type Error = UseCaseError;

    const NAME: &'static str = "RemindIn";

    async fn execute(&mut self, ctx: &GovBotContext) -> Result<Self::Response, Self::Error> {
        let mut subscribers = ctx
            .repos
            .records
            .subscribers()
            .await
            .map_err(|_| UseCaseError::StorageError)?;
        if !subscribers.is_registered(self.chat_id) {
            return Err(UseCaseError::UnknownChat(self.chat_id));
        }
        if subscribers
            .state(self.chat_id, &self.proposal_id)
            .map(|state| state.is_voted())
            .unwrap_or(false)
        {
            return Err(UseCaseError::AlreadyVoted);
        }
        let catalog = ctx
            .repos
            .records
            .proposals()
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        let fire_at = hours_to_duration(self.hours)
            .and_then(|snooze| ctx.sys.now().checked_add_signed(snooze))
            .ok_or(UseCaseError::InvalidHours(self.hours))?;

        self.scheduler.cancel(self.chat_id, &self.proposal_id);
        self.scheduler.schedule_snooze(
            &ctx.config,
            self.chat_id,
            &self.proposal_id,
            catalog.get(&self.proposal_id),
            &self.short_id,
            fire_at,
        );

        subscribers.set_state(
            self.chat_id,
            &self.proposal_id,
            ReminderState::SnoozedUntil(fire_at),
        );
        if let Err(e) = ctx.repos.records.save_subscribers(&subscribers).await {
            error!(
                "Unable to persist snoozed reminder of chat {} on proposal {}: {:?}",
                self.chat_id, self.proposal_id, e
            );
        }

        Ok(ReminderSnoozed {
            chat_id: self.chat_id,
            proposal_id: self.proposal_id.clone(),
            hours: self.hours,
            fire_at,
        })
    }

    fn subscribers() -> Vec<Box<dyn Subscriber<Self>>> {
        vec![Box::new(ConfirmOnSnoozed)]
    }
}

use super::subscribers::ThankOnVoted;
use crate::{
    error::GovBotError,
    reminder::ReminderScheduler,
    shared::usecase::{Subscriber, UseCase},
};
use govbot_domain::{ChatId, ReminderState};
use govbot_infra::GovBotContext;
use tracing::error;

/// "I have already voted": no more reminders for the proposal, ever
#[derive(Debug)]
pub struct MarkVotedUseCase<'a> {
    pub chat_id: ChatId,
    pub proposal_id: String,
    pub scheduler: &'a ReminderScheduler,
}

#[derive(Debug, Clone)]
pub enum UseCaseError {
    UnknownChat(ChatId),
    StorageError,
}

impl From<UseCaseError> for GovBotError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::UnknownChat(chat_id) => {
                Self::NotFound(format!("Chat {} is not registered", chat_id))
            }
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct VoteRecorded {
    pub chat_id: ChatId,
    pub proposal_id: String,
    pub cancelled_jobs: usize,
}

#[async_trait::async_trait(?Send)]
impl UseCase for MarkVotedUseCase<'_> {
    type Response = VoteRecorded;

    type Error = UseCaseError;

    const NAME: &'static str = "MarkVoted";

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

        let cancelled_jobs = self.scheduler.cancel(self.chat_id, &self.proposal_id);
        subscribers.set_state(self.chat_id, &self.proposal_id, ReminderState::Voted);
        if let Err(e) = ctx.repos.records.save_subscribers(&subscribers).await {
            // Reminders are already cancelled, only a restart would bring them back
            error!(
                "Unable to persist vote of chat {} on proposal {}: {:?}",
                self.chat_id, self.proposal_id, e
            );
        }

        Ok(VoteRecorded {
            chat_id: self.chat_id,
            proposal_id: self.proposal_id.clone(),
            cancelled_jobs,
        })
    }

    fn subscribers() -> Vec<Box<dyn Subscriber<Self>>> {
        vec![Box::new(ThankOnVoted)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::{
        test_utils::{now, setup, setup_with_kv, FailingWrites},
        usecase::execute,
    };
    use chrono::Duration;
    use govbot_domain::{OutboundMessage, Subscribers};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn cancels_every_job_and_thanks() {
        let mut t = setup();
        let mut subscribers = Subscribers::default();
        subscribers.register(42);
        t.ctx.repos.records.save_subscribers(&subscribers).await.unwrap();
        for hours in [1, 2, 3] {
            t.scheduler.schedule(
                42,
                "P1",
                now() + Duration::hours(hours),
                OutboundMessage::text(42, "vote!"),
            );
        }

        let res = execute(
            MarkVotedUseCase {
                chat_id: 42,
                proposal_id: "P1".into(),
                scheduler: &t.scheduler,
            },
            &t.ctx,
        )
        .await
        .unwrap();

        assert_eq!(res.cancelled_jobs, 3);
        assert_eq!(t.scheduler.live_jobs(), 0);
        assert!(
            tokio::time::timeout(std::time::Duration::from_secs(4 * 3600), t.due.recv())
                .await
                .is_err()
        );
        assert_eq!(
            t.ctx.repos.records.subscribers().await.unwrap().state(42, "P1"),
            Some(&ReminderState::Voted)
        );
        assert_eq!(
            t.chat.sent_to(42)[0].text,
            "<b>Thanks for voting!</b> No more reminders for this vote."
        );
    }

    #[tokio::test]
    async fn unknown_chats_are_rejected() {
        let t = setup();
        let res = MarkVotedUseCase {
            chat_id: 42,
            proposal_id: "P1".into(),
            scheduler: &t.scheduler,
        }
        .execute(&t.ctx)
        .await;
        assert!(matches!(res, Err(UseCaseError::UnknownChat(42))));
    }

    #[tokio::test(start_paused = true)]
    async fn vote_counts_even_if_it_cannot_be_persisted() {
        let kv = Arc::new(FailingWrites::new(vec!["user_preferences"]));
        kv.seed("user_preferences", r#"{"42":{"P1":null}}"#).await;
        let t = setup_with_kv(kv);
        t.scheduler.schedule(
            42,
            "P1",
            now() + Duration::hours(1),
            OutboundMessage::text(42, "vote!"),
        );

        let res = execute(
            MarkVotedUseCase {
                chat_id: 42,
                proposal_id: "P1".into(),
                scheduler: &t.scheduler,
            },
            &t.ctx,
        )
        .await;

        assert!(res.is_ok());
        assert_eq!(t.scheduler.live_jobs(), 0);
        assert_eq!(
            t.ctx.repos.records.subscribers().await.unwrap().state(42, "P1"),
            Some(&ReminderState::NotYetScheduled)
        );
        assert_eq!(t.chat.sent_to(42).len(), 1);
    }
}

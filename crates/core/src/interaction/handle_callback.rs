use crate::{
    error::GovBotError,
    reminder::ReminderScheduler,
    shared::usecase::{execute, UseCase},
    subscriber::{mark_voted, mark_voted::MarkVotedUseCase, remind_in, remind_in::RemindInUseCase},
};
use govbot_domain::{CallbackAction, CallbackParseError, ChatId};
use govbot_infra::GovBotContext;
use tracing::{error, info};

/// Handles an inline button press with payload `action|short_id[|param]`.
/// The press is always answered, failures with a message for the user.
#[derive(Debug)]
pub struct HandleCallbackUseCase<'a> {
    pub chat_id: ChatId,
    pub callback_id: String,
    pub data: String,
    pub scheduler: &'a ReminderScheduler,
}

#[derive(Debug, Clone)]
pub enum UseCaseError {
    MalformedPayload(CallbackParseError),
    UnknownShortId(String),
    MarkVoted(mark_voted::UseCaseError),
    RemindIn(remind_in::UseCaseError),
    StorageError,
}

impl From<UseCaseError> for GovBotError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::MalformedPayload(e) => Self::NotFound(e.to_string()),
            UseCaseError::UnknownShortId(short_id) => {
                Self::NotFound(format!("Short id {} not found in proposal id map", short_id))
            }
            UseCaseError::MarkVoted(e) => e.into(),
            UseCaseError::RemindIn(e) => e.into(),
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

impl HandleCallbackUseCase<'_> {
    async fn dispatch(&self, ctx: &GovBotContext) -> Result<CallbackAction, UseCaseError> {
        let action = self
            .data
            .parse::<CallbackAction>()
            .map_err(UseCaseError::MalformedPayload)?;
        let id_map = ctx
            .repos
            .records
            .proposal_id_map()
            .await
            .map_err(|_| UseCaseError::StorageError)?;
        let proposal_id = id_map
            .resolve(action.short_id().as_str())
            .ok_or_else(|| UseCaseError::UnknownShortId(action.short_id().to_string()))?
            .to_string();

        info!(
            "Button callback received: action={}, proposal_id={}, chat_id={}",
            action, proposal_id, self.chat_id
        );
        match &action {
            CallbackAction::Voted { .. } => {
                let usecase = MarkVotedUseCase {
                    chat_id: self.chat_id,
                    proposal_id,
                    scheduler: self.scheduler,
                };
                execute(usecase, ctx)
                    .await
                    .map_err(UseCaseError::MarkVoted)?;
            }
            CallbackAction::RemindIn { short_id, hours } => {
                let usecase = RemindInUseCase {
                    chat_id: self.chat_id,
                    proposal_id,
                    short_id: short_id.clone(),
                    hours: *hours,
                    scheduler: self.scheduler,
                };
                execute(usecase, ctx)
                    .await
                    .map_err(UseCaseError::RemindIn)?;
            }
        }
        Ok(action)
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for HandleCallbackUseCase<'_> {
    type Response = CallbackAction;

    type Error = UseCaseError;

    const NAME: &'static str = "HandleCallback";

    async fn execute(&mut self, ctx: &GovBotContext) -> Result<Self::Response, Self::Error> {
        let res = self.dispatch(ctx).await;

        let answer = match &res {
            Ok(_) => None,
            Err(e) => Some(GovBotError::from(e.clone()).to_string()),
        };
        if let Err(e) = ctx
            .services
            .chat
            .answer_callback(&self.callback_id, answer.as_deref())
            .await
        {
            error!("Unable to answer callback {}: {:?}", self.callback_id, e);
        }

        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::{now, setup, TestContext};
    use chrono::Duration;
    use govbot_domain::{OutboundMessage, ProposalIdMap, ReminderState, Subscribers};

    const GENERIC_ERROR: &str = "An error occurred. Please try again later.";

    async fn seed(t: &TestContext) -> String {
        let mut id_map = ProposalIdMap::default();
        let (short_id, _) = id_map.assign("P1");
        t.ctx.repos.records.save_proposal_id_map(&id_map).await.unwrap();

        let mut subscribers = Subscribers::default();
        subscribers.register(42);
        subscribers.set_state(42, "P1", ReminderState::NotYetScheduled);
        t.ctx.repos.records.save_subscribers(&subscribers).await.unwrap();
        short_id.to_string()
    }

    fn callback<'a>(t: &'a TestContext, chat_id: ChatId, data: String) -> HandleCallbackUseCase<'a> {
        HandleCallbackUseCase {
            chat_id,
            callback_id: "cb1".into(),
            data,
            scheduler: &t.scheduler,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn voted_button_cancels_reminders() {
        let t = setup();
        let short_id = seed(&t).await;
        t.scheduler.schedule(
            42,
            "P1",
            now() + Duration::hours(1),
            OutboundMessage::text(42, "vote!"),
        );

        let res = execute(callback(&t, 42, format!("voted|{}", short_id)), &t.ctx).await;
        assert!(matches!(res, Ok(CallbackAction::Voted { .. })));
        assert_eq!(t.scheduler.live_jobs(), 0);
        assert_eq!(t.chat.answered(), vec![("cb1".to_string(), None)]);
    }

    #[tokio::test(start_paused = true)]
    async fn remind_in_button_snoozes() {
        let t = setup();
        let short_id = seed(&t).await;

        execute(callback(&t, 42, format!("remind_in|{}|4", short_id)), &t.ctx)
            .await
            .unwrap();
        assert_eq!(
            t.scheduler.live_fire_times(42, "P1"),
            vec![now() + Duration::hours(4)]
        );
        assert_eq!(t.chat.answered().len(), 1);
    }

    #[tokio::test]
    async fn resolution_failures_are_answered_generically() {
        let t = setup();
        let short_id = seed(&t).await;

        for (chat_id, data) in [
            (42, "voted|unknown1".to_string()),
            (42, "vote|".to_string()),
            (42, format!("remind_in|{}|soon", short_id)),
            (42, format!("remind_in|{}|1e20", short_id)),
            (7, format!("voted|{}", short_id)),
        ] {
            let res = execute(callback(&t, chat_id, data), &t.ctx).await;
            assert!(res.is_err());
        }

        let answers = t.chat.answered();
        assert_eq!(answers.len(), 5);
        for (_, text) in answers {
            assert_eq!(text.as_deref(), Some(GENERIC_ERROR));
        }
        assert!(t.chat.sent().is_empty());
    }

    #[tokio::test]
    async fn snoozing_after_voting_is_refused() {
        let t = setup();
        let short_id = seed(&t).await;
        execute(callback(&t, 42, format!("voted|{}", short_id)), &t.ctx)
            .await
            .unwrap();

        let res = execute(callback(&t, 42, format!("remind_in|{}|1", short_id)), &t.ctx).await;
        assert!(matches!(
            res,
            Err(UseCaseError::RemindIn(remind_in::UseCaseError::AlreadyVoted))
        ));
        assert_eq!(
            t.chat.answered()[1].1.as_deref(),
            Some("You already voted on this proposal.")
        );
        assert_eq!(t.scheduler.live_jobs(), 0);
    }
}

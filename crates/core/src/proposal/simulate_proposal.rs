use super::handle_proposal_event::{HandleProposalEventUseCase, HandledProposal};
use crate::{
    error::GovBotError,
    reminder::ReminderScheduler,
    shared::usecase::{execute, UseCase},
};
use chrono::Duration;
use govbot_domain::{Proposal, ProposalKind};
use govbot_infra::GovBotContext;
use uuid::Uuid;

/// Injects a synthetic off-chain proposal opening in a few seconds and
/// closing two minutes later, to try the reminder flow end to end.
#[derive(Debug)]
pub struct SimulateProposalUseCase<'a> {
    pub scheduler: &'a ReminderScheduler,
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

#[async_trait::async_trait(?Send)]
impl UseCase for SimulateProposalUseCase<'_> {
    type Response = Proposal;

    type Error = UseCaseError;

    const NAME: &'static str = "SimulateProposal";

    async fn execute(&mut self, ctx: &GovBotContext) -> Result<Self::Response, Self::Error> {
        let now = ctx.sys.now();
        let proposal = Proposal {
            id: format!("test_proposal_id_{}", Uuid::new_v4()),
            title: "Test Proposal".into(),
            start: now + Duration::seconds(5),
            end: now + Duration::minutes(2),
            kind: ProposalKind::OffChain,
        };

        let usecase = HandleProposalEventUseCase {
            event: proposal.clone(),
            scheduler: self.scheduler,
        };
        match execute(usecase, ctx).await {
            Ok(HandledProposal::Dispatched { .. }) | Ok(HandledProposal::AlreadyKnown) => {
                Ok(proposal)
            }
            Err(_) => Err(UseCaseError::StorageError),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::{now, setup};
    use govbot_domain::Subscribers;

    #[tokio::test(start_paused = true)]
    async fn simulated_proposal_reaches_subscribers() {
        let t = setup();
        let mut subscribers = Subscribers::default();
        subscribers.register(42);
        t.ctx.repos.records.save_subscribers(&subscribers).await.unwrap();

        let proposal = SimulateProposalUseCase {
            scheduler: &t.scheduler,
        }
        .execute(&t.ctx)
        .await
        .unwrap();

        assert!(proposal.id.starts_with("test_proposal_id_"));
        assert_eq!(proposal.kind, ProposalKind::OffChain);
        assert_eq!(
            t.scheduler.live_fire_times(42, &proposal.id),
            vec![now() + Duration::seconds(5)]
        );
        assert!(t
            .ctx
            .repos
            .records
            .known_proposals()
            .await
            .unwrap()
            .contains(&proposal.id));
    }
}

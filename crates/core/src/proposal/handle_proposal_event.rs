use crate::{reminder::ReminderScheduler, shared::usecase::UseCase};
use govbot_domain::{ProposalEvent, ReminderState, ShortId};
use govbot_infra::GovBotContext;
use tracing::{error, info};

/// Dispatches a proposal reported by a source: unseen proposals are recorded
/// and every registered subscriber gets reminders scheduled for it.
#[derive(Debug)]
pub struct HandleProposalEventUseCase<'a> {
    pub event: ProposalEvent,
    pub scheduler: &'a ReminderScheduler,
}

#[derive(Debug)]
pub enum UseCaseError {
    StorageError,
}

#[derive(Debug, PartialEq)]
pub enum HandledProposal {
    AlreadyKnown,
    Dispatched {
        short_id: ShortId,
        /// Subscribers that got reminder jobs for the proposal
        subscribers: usize,
    },
}

#[async_trait::async_trait(?Send)]
impl UseCase for HandleProposalEventUseCase<'_> {
    type Response = HandledProposal;

    type Error = UseCaseError;

    const NAME: &'static str = "HandleProposalEvent";

    async fn execute(&mut self, ctx: &GovBotContext) -> Result<Self::Response, Self::Error> {
        let records = &ctx.repos.records;
        let proposal = &self.event;

        let mut known = records
            .known_proposals()
            .await
            .map_err(|_| UseCaseError::StorageError)?;
        if known.contains(&proposal.id) {
            return Ok(HandledProposal::AlreadyKnown);
        }
        info!("New proposal detected: {} ({})", proposal.id, proposal.title);

        // Everything the reminders depend on is stored before the proposal
        // becomes known, a failure here leaves it to be picked up next poll
        let mut catalog = records
            .proposals()
            .await
            .map_err(|_| UseCaseError::StorageError)?;
        catalog.insert(proposal);
        records
            .save_proposals(&catalog)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        let mut id_map = records
            .proposal_id_map()
            .await
            .map_err(|_| UseCaseError::StorageError)?;
        let (short_id, created) = id_map.assign(&proposal.id);
        if created {
            records
                .save_proposal_id_map(&id_map)
                .await
                .map_err(|_| UseCaseError::StorageError)?;
        }

        known.insert(&proposal.id);
        records
            .save_known_proposals(&known)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        let mut subscribers = records
            .subscribers()
            .await
            .map_err(|_| UseCaseError::StorageError)?;
        let offsets = records
            .subscriber_offsets()
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        let mut scheduled = 0;
        for chat_id in subscribers.chat_ids() {
            if subscribers.has_entry(chat_id, &proposal.id) {
                continue;
            }
            subscribers.set_state(chat_id, &proposal.id, ReminderState::NotYetScheduled);
            let offsets = offsets.resolve(chat_id, &ctx.config.reminders.default_offsets);
            let state =
                self.scheduler
                    .schedule_proposal(&ctx.config, chat_id, proposal, &short_id, offsets);
            subscribers.set_state(chat_id, &proposal.id, state);
            scheduled += 1;
        }

        if let Err(e) = records.save_subscribers(&subscribers).await {
            error!(
                "Unable to persist reminder states for proposal {}: {:?}",
                proposal.id, e
            );
            return Err(UseCaseError::StorageError);
        }

        Ok(HandledProposal::Dispatched {
            short_id,
            subscribers: scheduled,
        })
    }
}

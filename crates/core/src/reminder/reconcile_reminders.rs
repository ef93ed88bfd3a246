use super::ReminderScheduler;
use crate::shared::usecase::UseCase;
use govbot_domain::ReminderState;
use govbot_infra::GovBotContext;
use tracing::{info, warn};

/// Jobs only live in memory. At startup they are rebuilt from the persisted
/// reminder states and the proposal catalog, dropping anything in the past.
#[derive(Debug)]
pub struct ReconcileRemindersUseCase<'a> {
    pub scheduler: &'a ReminderScheduler,
}

#[derive(Debug)]
pub enum UseCaseError {
    StorageError,
}

#[derive(Debug, Default, PartialEq)]
pub struct ReconciledReminders {
    pub restored_jobs: usize,
    /// Entries that could not be rebuilt because their proposal is unknown
    pub skipped_entries: usize,
}

#[async_trait::async_trait(?Send)]
impl UseCase for ReconcileRemindersUseCase<'_> {
    type Response = ReconciledReminders;

    type Error = UseCaseError;

    const NAME: &'static str = "ReconcileReminders";

    async fn execute(&mut self, ctx: &GovBotContext) -> Result<Self::Response, Self::Error> {
        let records = &ctx.repos.records;
        let subscribers = records
            .subscribers()
            .await
            .map_err(|_| UseCaseError::StorageError)?;
        let catalog = records
            .proposals()
            .await
            .map_err(|_| UseCaseError::StorageError)?;
        let id_map = records
            .proposal_id_map()
            .await
            .map_err(|_| UseCaseError::StorageError)?;
        let offsets = records
            .subscriber_offsets()
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        let mut res = ReconciledReminders::default();
        for (chat_id, proposal_id, state) in subscribers.entries() {
            let short_id = match id_map.get(proposal_id) {
                Some(short_id) => short_id,
                None => {
                    warn!("Proposal {} has no short id, skipping its reminders", proposal_id);
                    res.skipped_entries += 1;
                    continue;
                }
            };

            match state {
                ReminderState::Voted => {}
                ReminderState::SnoozedUntil(fire_at) => {
                    let job = self.scheduler.schedule_snooze(
                        &ctx.config,
                        chat_id,
                        proposal_id,
                        catalog.get(proposal_id),
                        short_id,
                        *fire_at,
                    );
                    if job.is_some() {
                        res.restored_jobs += 1;
                    }
                }
                ReminderState::NotYetScheduled | ReminderState::Scheduled { .. } => {
                    let proposal = match catalog.get(proposal_id) {
                        Some(proposal) => proposal,
                        None => {
                            warn!(
                                "Proposal {} is not in the catalog, unable to restore reminders for chat {}",
                                proposal_id, chat_id
                            );
                            res.skipped_entries += 1;
                            continue;
                        }
                    };
                    let offsets = offsets.resolve(chat_id, &ctx.config.reminders.default_offsets);
                    if let ReminderState::Scheduled { fire_times } = self
                        .scheduler
                        .schedule_proposal(&ctx.config, chat_id, proposal, short_id, offsets)
                    {
                        res.restored_jobs += fire_times.len();
                    }
                }
            }
        }

        info!(
            "Restored {} reminder jobs, skipped {} entries",
            res.restored_jobs, res.skipped_entries
        );
        Ok(res)
    }
}

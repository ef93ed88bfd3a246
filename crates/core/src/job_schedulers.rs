use crate::{
    interaction::handle_inbound_event,
    proposal::{
        handle_proposal_event::HandleProposalEventUseCase,
        sources::{poll_offchain, poll_onchain},
    },
    reminder::{notifier::deliver, DueReminder, DueReminders, ReminderScheduler},
    shared::usecase::execute,
};
use actix_web::rt::time::{interval, sleep};
use govbot_domain::ProposalEvent;
use govbot_infra::GovBotContext;
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tracing::{debug, error};

const UPDATES_RETRY_DELAY: Duration = Duration::from_secs(5);

async fn dispatch_proposal_events(
    events: Vec<ProposalEvent>,
    scheduler: &ReminderScheduler,
    ctx: &GovBotContext,
) {
    for event in events {
        let usecase = HandleProposalEventUseCase { event, scheduler };
        // Failed events are not known yet and come back on the next poll
        let _ = execute(usecase, ctx).await;
    }
}

pub fn start_offchain_poller(ctx: GovBotContext, scheduler: Arc<ReminderScheduler>) {
    actix_web::rt::spawn(async move {
        let mut interval = interval(ctx.config.snapshot.poll_interval);
        loop {
            interval.tick().await;

            match poll_offchain(&ctx).await {
                Ok(events) => dispatch_proposal_events(events, &scheduler, &ctx).await,
                Err(e) => error!("Error in monitoring off-chain proposals: {:?}", e),
            }
        }
    });
}

pub fn start_onchain_poller(ctx: GovBotContext, scheduler: Arc<ReminderScheduler>) {
    let (source, config) = match (ctx.services.onchain.clone(), ctx.config.onchain.clone()) {
        (Some(source), Some(config)) => (source, config),
        _ => return,
    };
    actix_web::rt::spawn(async move {
        let mut interval = interval(config.poll_interval);
        loop {
            interval.tick().await;

            match poll_onchain(&ctx, source.as_ref(), config.average_block_time_secs).await {
                Ok(events) => dispatch_proposal_events(events, &scheduler, &ctx).await,
                Err(e) => error!("Error in monitoring on-chain proposals: {:?}", e),
            }
        }
    });
}

/// Claims a due reminder and sends it on its own task, so a slow chat
/// transport never holds back other reminders. Returns `None` for jobs
/// cancelled after their timer elapsed.
pub fn fire_due_reminder(
    due: &DueReminder,
    scheduler: &ReminderScheduler,
    ctx: &GovBotContext,
) -> Option<JoinHandle<bool>> {
    let job = match scheduler.take_due(due) {
        Some(job) => job,
        None => {
            debug!(
                "Reminder {} for proposal {} and chat {} was cancelled",
                due.job_id, due.proposal_id, due.chat_id
            );
            return None;
        }
    };
    let chat = ctx.services.chat.clone();
    Some(tokio::spawn(async move {
        deliver(chat.as_ref(), &job.message).await
    }))
}

pub fn start_due_reminders_consumer(
    ctx: GovBotContext,
    scheduler: Arc<ReminderScheduler>,
    mut due_reminders: DueReminders,
) {
    actix_web::rt::spawn(async move {
        while let Some(due) = due_reminders.recv().await {
            fire_due_reminder(&due, &scheduler, &ctx);
        }
    });
}

pub fn start_chat_updates_listener(ctx: GovBotContext, scheduler: Arc<ReminderScheduler>) {
    actix_web::rt::spawn(async move {
        loop {
            match ctx.services.chat.poll_updates().await {
                Ok(events) => {
                    for event in events {
                        handle_inbound_event(event, &scheduler, &ctx).await;
                    }
                }
                Err(e) => {
                    error!("Unable to fetch chat updates: {:?}", e);
                    sleep(UPDATES_RETRY_DELAY).await;
                }
            }
        }
    });
}

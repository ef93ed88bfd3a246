use super::notifier::{render_reminder, render_snooze};
use chrono::{DateTime, Utc};
use govbot_domain::{
    plan_reminders, ChatId, OutboundMessage, Proposal, ReminderOffsets, ReminderState, ShortId,
};
use govbot_infra::{Config, ISys};
use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};
use tokio::{
    sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};
use tracing::{debug, info};

pub type JobId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct JobKey {
    chat_id: ChatId,
    proposal_id: String,
}

impl JobKey {
    fn new(chat_id: ChatId, proposal_id: &str) -> Self {
        Self {
            chat_id,
            proposal_id: proposal_id.to_string(),
        }
    }
}

/// A pending reminder. The message is rendered when the job is scheduled.
#[derive(Debug)]
pub struct ScheduledJob {
    pub id: JobId,
    pub chat_id: ChatId,
    pub proposal_id: String,
    pub fire_at: DateTime<Utc>,
    pub message: OutboundMessage,
    timer: JoinHandle<()>,
}

/// Pushed by a job's timer when its fire time has elapsed
#[derive(Debug, Clone, PartialEq)]
pub struct DueReminder {
    pub chat_id: ChatId,
    pub proposal_id: String,
    pub job_id: JobId,
}

pub type DueReminders = UnboundedReceiver<DueReminder>;

/// Owns the table of live reminder jobs keyed by `(chat_id, proposal_id)`.
///
/// Every job is a timer task that pushes a `DueReminder` onto the channel
/// returned by `new` once it elapses. The consumer of that channel claims
/// the job with `take_due`, which fails for jobs that were cancelled in
/// the meantime.
pub struct ReminderScheduler {
    sys: Arc<dyn ISys>,
    jobs: Mutex<HashMap<JobKey, Vec<ScheduledJob>>>,
    next_job_id: AtomicU64,
    due_tx: UnboundedSender<DueReminder>,
}

impl ReminderScheduler {
    pub fn new(sys: Arc<dyn ISys>) -> (Self, DueReminders) {
        let (due_tx, due_rx) = unbounded_channel();
        let scheduler = Self {
            sys,
            jobs: Mutex::new(HashMap::new()),
            next_job_id: AtomicU64::new(1),
            due_tx,
        };
        (scheduler, due_rx)
    }

    fn jobs(&self) -> MutexGuard<'_, HashMap<JobKey, Vec<ScheduledJob>>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a job firing at `fire_at`. Fire times that are not in the
    /// future are dropped and `None` is returned.
    pub fn schedule(
        &self,
        chat_id: ChatId,
        proposal_id: &str,
        fire_at: DateTime<Utc>,
        message: OutboundMessage,
    ) -> Option<JobId> {
        let now = self.sys.now();
        let delay = match (fire_at - now).to_std() {
            Ok(delay) if fire_at > now => delay,
            _ => {
                debug!(
                    "Reminder for proposal {} and chat {} at {} is in the past. Skipping it.",
                    proposal_id, chat_id, fire_at
                );
                return None;
            }
        };

        let id = self.next_job_id.fetch_add(1, Ordering::Relaxed);
        let due = DueReminder {
            chat_id,
            proposal_id: proposal_id.to_string(),
            job_id: id,
        };
        let due_tx = self.due_tx.clone();

        let mut jobs = self.jobs();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if due_tx.send(due).is_err() {
                debug!("Due reminders are no longer consumed");
            }
        });
        jobs.entry(JobKey::new(chat_id, proposal_id))
            .or_default()
            .push(ScheduledJob {
                id,
                chat_id,
                proposal_id: proposal_id.to_string(),
                fire_at,
                message,
                timer,
            });
        info!(
            "Scheduled reminder for proposal {} at {} for chat {}",
            proposal_id,
            fire_at.to_rfc3339(),
            chat_id
        );
        Some(id)
    }

    /// Moves a subscriber's proposal from not yet scheduled to scheduled by
    /// registering one job per future fire time derived from `offsets`.
    pub fn schedule_proposal(
        &self,
        config: &Config,
        chat_id: ChatId,
        proposal: &Proposal,
        short_id: &ShortId,
        offsets: &ReminderOffsets,
    ) -> ReminderState {
        let plan = plan_reminders(proposal, offsets, self.sys.now());
        for skipped in &plan.skipped {
            debug!(
                "Reminder for proposal {} at {} is in the past. Skipping it.",
                proposal.id, skipped.fire_at
            );
        }

        let fire_times = plan
            .upcoming
            .iter()
            .filter_map(|reminder| {
                let message = render_reminder(config, chat_id, proposal, short_id, reminder.trigger);
                self.schedule(chat_id, &proposal.id, reminder.fire_at, message)
                    .map(|_| reminder.fire_at)
            })
            .collect();
        ReminderState::Scheduled { fire_times }
    }

    /// Registers the single job of a "Remind me in H hour(s)" request
    pub fn schedule_snooze(
        &self,
        config: &Config,
        chat_id: ChatId,
        proposal_id: &str,
        proposal: Option<&Proposal>,
        short_id: &ShortId,
        fire_at: DateTime<Utc>,
    ) -> Option<JobId> {
        let message = render_snooze(config, chat_id, proposal_id, proposal, short_id);
        self.schedule(chat_id, proposal_id, fire_at, message)
    }

    /// Cancels every live job of the pair and returns how many there were.
    /// Cancelling a pair without jobs is a no-op.
    pub fn cancel(&self, chat_id: ChatId, proposal_id: &str) -> usize {
        let removed = self.jobs().remove(&JobKey::new(chat_id, proposal_id));
        match removed {
            Some(jobs) => {
                for job in &jobs {
                    job.timer.abort();
                }
                info!(
                    "Cancelled {} reminders for proposal {} and chat {}",
                    jobs.len(),
                    proposal_id,
                    chat_id
                );
                jobs.len()
            }
            None => 0,
        }
    }

    /// Claims an elapsed job, removing it from the table. Returns `None`
    /// if the job was cancelled after its timer elapsed.
    pub fn take_due(&self, due: &DueReminder) -> Option<ScheduledJob> {
        let key = JobKey::new(due.chat_id, &due.proposal_id);
        let mut jobs = self.jobs();
        let pair_jobs = jobs.get_mut(&key)?;
        let position = pair_jobs.iter().position(|job| job.id == due.job_id)?;
        let job = pair_jobs.remove(position);
        if pair_jobs.is_empty() {
            jobs.remove(&key);
        }
        Some(job)
    }

    /// Fire times of the live jobs of the pair, earliest first
    pub fn live_fire_times(&self, chat_id: ChatId, proposal_id: &str) -> Vec<DateTime<Utc>> {
        let mut fire_times = self
            .jobs()
            .get(&JobKey::new(chat_id, proposal_id))
            .map(|jobs| jobs.iter().map(|job| job.fire_at).collect::<Vec<_>>())
            .unwrap_or_default();
        fire_times.sort();
        fire_times
    }

    pub fn live_jobs(&self) -> usize {
        self.jobs().values().map(Vec::len).sum()
    }
}

impl Debug for ReminderScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderScheduler")
            .field("live_jobs", &self.live_jobs())
            .finish()
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        for job in self.jobs().values().flatten() {
            job.timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use govbot_domain::ProposalKind;
    use govbot_infra::StaticTimeSys;

    const NOW: i64 = 1_700_000_000_000;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(NOW).unwrap()
    }

    fn scheduler() -> (ReminderScheduler, DueReminders) {
        ReminderScheduler::new(Arc::new(StaticTimeSys(NOW)))
    }

    fn proposal(start: DateTime<Utc>, end: DateTime<Utc>) -> Proposal {
        Proposal {
            id: "P1".into(),
            title: "Treasury diversification".into(),
            start,
            end,
            kind: ProposalKind::OffChain,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn jobs_fire_in_order() {
        let (scheduler, mut due) = scheduler();
        let later = scheduler
            .schedule(42, "P1", now() + Duration::hours(2), OutboundMessage::text(42, "later"))
            .unwrap();
        let sooner = scheduler
            .schedule(42, "P1", now() + Duration::hours(1), OutboundMessage::text(42, "sooner"))
            .unwrap();
        assert_eq!(scheduler.live_jobs(), 2);

        let first = due.recv().await.unwrap();
        assert_eq!(first.job_id, sooner);
        let job = scheduler.take_due(&first).unwrap();
        assert_eq!(job.message.text, "sooner");

        let second = due.recv().await.unwrap();
        assert_eq!(second.job_id, later);
        assert!(scheduler.take_due(&second).is_some());
        assert_eq!(scheduler.live_jobs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn past_fire_times_are_dropped() {
        let (scheduler, _due) = scheduler();
        assert!(scheduler
            .schedule(42, "P1", now(), OutboundMessage::text(42, "now"))
            .is_none());
        assert!(scheduler
            .schedule(42, "P1", now() - Duration::minutes(1), OutboundMessage::text(42, "past"))
            .is_none());
        assert_eq!(scheduler.live_jobs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn schedules_one_job_per_offset() {
        let (scheduler, _due) = scheduler();
        let start = now() + Duration::minutes(10);
        let p = proposal(start, start + Duration::hours(48));
        let offsets = ReminderOffsets::new(vec![1.0, 2.0], vec![]);

        let state = scheduler.schedule_proposal(
            &Config::default(),
            42,
            &p,
            &ShortId::new("Ab3dE6gH"),
            &offsets,
        );
        let expected = vec![start + Duration::hours(1), start + Duration::hours(2)];
        assert_eq!(
            state,
            ReminderState::Scheduled {
                fire_times: expected.clone()
            }
        );
        assert_eq!(scheduler.live_fire_times(42, "P1"), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_instants_get_their_own_job() {
        let (scheduler, _due) = scheduler();
        let p = proposal(now() + Duration::hours(1), now() + Duration::hours(3));
        let offsets = ReminderOffsets::new(vec![1.0], vec![1.0]);

        scheduler.schedule_proposal(&Config::default(), 42, &p, &ShortId::new("x"), &offsets);
        let at = now() + Duration::hours(2);
        assert_eq!(scheduler.live_fire_times(42, "P1"), vec![at, at]);
    }

    #[tokio::test(start_paused = true)]
    async fn everything_in_the_past_still_counts_as_scheduled() {
        let (scheduler, _due) = scheduler();
        let p = proposal(now() - Duration::hours(5), now() - Duration::hours(1));
        let state = scheduler.schedule_proposal(
            &Config::default(),
            42,
            &p,
            &ShortId::new("x"),
            &ReminderOffsets::new(vec![0.0], vec![1.0]),
        );
        assert_eq!(state, ReminderState::Scheduled { fire_times: vec![] });
        assert_eq!(scheduler.live_jobs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_jobs_never_fire() {
        let (scheduler, mut due) = scheduler();
        scheduler.schedule(42, "P1", now() + Duration::hours(1), OutboundMessage::text(42, "a"));
        scheduler.schedule(42, "P1", now() + Duration::hours(2), OutboundMessage::text(42, "b"));
        scheduler.schedule(7, "P1", now() + Duration::hours(3), OutboundMessage::text(7, "c"));

        assert_eq!(scheduler.cancel(42, "P1"), 2);
        assert_eq!(scheduler.cancel(42, "P1"), 0);
        assert!(scheduler.live_fire_times(42, "P1").is_empty());

        // Only the other subscriber's job is left
        let fired = due.recv().await.unwrap();
        assert_eq!(fired.chat_id, 7);
        assert!(scheduler.take_due(&fired).is_some());
        assert!(
            tokio::time::timeout(std::time::Duration::from_secs(24 * 3600), due.recv())
                .await
                .is_err()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn jobs_cancelled_after_elapsing_are_not_claimed() {
        let (scheduler, mut due) = scheduler();
        scheduler.schedule(42, "P1", now() + Duration::hours(1), OutboundMessage::text(42, "a"));

        let fired = due.recv().await.unwrap();
        scheduler.cancel(42, "P1");
        assert!(scheduler.take_due(&fired).is_none());
        assert!(scheduler.take_due(&fired).is_none());
    }
}

pub mod notifier;
pub mod reconcile_reminders;
pub mod scheduler;

pub use scheduler::{DueReminder, DueReminders, JobId, ReminderScheduler, ScheduledJob};

mod callback;
mod chat;
mod proposal;
mod reminder;
mod short_id;
mod subscriber;

pub use callback::{CallbackAction, CallbackParseError};
pub use chat::{InboundEvent, InlineButton, OutboundMessage};
pub use proposal::{KnownProposals, Proposal, ProposalCatalog, ProposalEvent, ProposalKind};
pub use reminder::{
    format_hours, hours_to_duration, parse_hours, parse_hours_list, plan_reminders,
    InvalidHoursError, PlannedReminder, ReminderOffsets, ReminderPlan, ReminderState,
    ReminderTrigger, MAX_HOURS,
};
pub use short_id::{ProposalIdMap, ShortId};
pub use subscriber::{ChatId, SubscriberOffsets, SubscriberReminders, Subscribers};

use super::{
    mark_voted::{MarkVotedUseCase, VoteRecorded},
    remind_in::{ReminderSnoozed, RemindInUseCase},
    subscribe::{SubscribeUseCase, Subscription},
};
use crate::{reminder::notifier::deliver, shared::usecase::Subscriber};
use govbot_domain::{format_hours, OutboundMessage};
use govbot_infra::GovBotContext;

pub struct WelcomeOnSubscribed;

#[async_trait::async_trait(?Send)]
impl Subscriber<SubscribeUseCase> for WelcomeOnSubscribed {
    async fn notify(&self, e: &Subscription, ctx: &GovBotContext) {
        let message = OutboundMessage::text(
            e.chat_id,
            "<b>You've been added to the reminder list</b> for DAO votes!",
        );
        // Sideeffect, ignore result
        deliver(ctx.services.chat.as_ref(), &message).await;
    }
}

pub struct ThankOnVoted;

#[async_trait::async_trait(?Send)]
impl<'a> Subscriber<MarkVotedUseCase<'a>> for ThankOnVoted {
    async fn notify(&self, e: &VoteRecorded, ctx: &GovBotContext) {
        let message = OutboundMessage::text(
            e.chat_id,
            "<b>Thanks for voting!</b> No more reminders for this vote.",
        );
        deliver(ctx.services.chat.as_ref(), &message).await;
    }
}

pub struct ConfirmOnSnoozed;

#[async_trait::async_trait(?Send)]
impl<'a> Subscriber<RemindInUseCase<'a>> for ConfirmOnSnoozed {
    async fn notify(&self, e: &ReminderSnoozed, ctx: &GovBotContext) {
        let message = OutboundMessage::text(
            e.chat_id,
            format!(
                "<b>Reminder set</b> for {} hours from now.",
                format_hours(e.hours)
            ),
        );
        deliver(ctx.services.chat.as_ref(), &message).await;
    }
}

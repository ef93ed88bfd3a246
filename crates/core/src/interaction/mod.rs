pub mod handle_callback;
pub mod handle_command;

use crate::{reminder::ReminderScheduler, shared::usecase::execute};
use govbot_domain::InboundEvent;
use govbot_infra::GovBotContext;
use handle_callback::HandleCallbackUseCase;
use handle_command::HandleCommandUseCase;

/// Routes an inbound chat event to its use case. Failures are logged and
/// reported to the chat by the use cases themselves.
pub async fn handle_inbound_event(
    event: InboundEvent,
    scheduler: &ReminderScheduler,
    ctx: &GovBotContext,
) {
    match event {
        InboundEvent::Command {
            chat_id,
            name,
            args,
        } => {
            let usecase = HandleCommandUseCase {
                chat_id,
                name,
                args,
                scheduler,
            };
            let _ = execute(usecase, ctx).await;
        }
        InboundEvent::Callback {
            chat_id,
            callback_id,
            data,
        } => {
            let usecase = HandleCallbackUseCase {
                chat_id,
                callback_id,
                data,
                scheduler,
            };
            let _ = execute(usecase, ctx).await;
        }
    }
}

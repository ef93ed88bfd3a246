use crate::{
    error::GovBotError,
    proposal::simulate_proposal::{self, SimulateProposalUseCase},
    reminder::{
        notifier::{deliver, escape_html},
        ReminderScheduler,
    },
    shared::usecase::{execute, UseCase},
    subscriber::{
        set_offsets::{self, SetOffsetsUseCase},
        subscribe::{self, SubscribeUseCase},
    },
};
use govbot_domain::{parse_hours_list, ChatId, OutboundMessage, ReminderOffsets};
use govbot_infra::GovBotContext;
use tracing::{debug, error};

const OFFSETS_USAGE: &str = "Use /offsets <from_start> <before_end> with comma separated hours, e.g. <code>/offsets 0,24 1</code>. Use - for no reminders and <code>/offsets reset</code> for the defaults.";

#[derive(Debug)]
pub struct HandleCommandUseCase<'a> {
    pub chat_id: ChatId,
    /// Lowercase command name without the leading slash
    pub name: String,
    pub args: Vec<String>,
    pub scheduler: &'a ReminderScheduler,
}

#[derive(Debug, Clone)]
pub enum UseCaseError {
    Subscribe(subscribe::UseCaseError),
    Simulate(simulate_proposal::UseCaseError),
    SetOffsets(set_offsets::UseCaseError),
    InvalidOffsets(String),
    StorageError,
}

impl From<UseCaseError> for GovBotError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::Subscribe(e) => e.into(),
            UseCaseError::Simulate(e) => e.into(),
            UseCaseError::SetOffsets(e) => e.into(),
            UseCaseError::InvalidOffsets(reason) => {
                Self::BadClientData(format!("{}\n{}", escape_html(&reason), OFFSETS_USAGE))
            }
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum CommandOutcome {
    Subscribed,
    Simulated { proposal_id: String },
    OffsetsShown(ReminderOffsets),
    OffsetsUpdated(ReminderOffsets),
    Ignored,
}

fn parse_offsets_args(args: &[String]) -> Result<Option<ReminderOffsets>, UseCaseError> {
    match args {
        [reset] if reset.eq_ignore_ascii_case("reset") => Ok(None),
        [from_start, before_end] => {
            let parse = |value: &str| {
                parse_hours_list(value).map_err(|e| UseCaseError::InvalidOffsets(e.to_string()))
            };
            Ok(Some(ReminderOffsets::new(
                parse(from_start)?,
                parse(before_end)?,
            )))
        }
        _ => Err(UseCaseError::InvalidOffsets(
            "Expected two lists of hours.".into(),
        )),
    }
}

impl HandleCommandUseCase<'_> {
    async fn reply(&self, ctx: &GovBotContext, text: String) {
        deliver(
            ctx.services.chat.as_ref(),
            &OutboundMessage::text(self.chat_id, text),
        )
        .await;
    }

    async fn dispatch(&self, ctx: &GovBotContext) -> Result<CommandOutcome, UseCaseError> {
        match self.name.as_str() {
            "start" | "subscribe" => {
                // The welcome message is sent by the use case
                execute(
                    SubscribeUseCase {
                        chat_id: self.chat_id,
                    },
                    ctx,
                )
                .await
                .map_err(UseCaseError::Subscribe)?;
                Ok(CommandOutcome::Subscribed)
            }
            "testproposal" | "simulate" => {
                let proposal = execute(
                    SimulateProposalUseCase {
                        scheduler: self.scheduler,
                    },
                    ctx,
                )
                .await
                .map_err(UseCaseError::Simulate)?;
                self.reply(
                    ctx,
                    format!(
                        "Test proposal created with ID {} and reminders scheduled.",
                        proposal.id
                    ),
                )
                .await;
                Ok(CommandOutcome::Simulated {
                    proposal_id: proposal.id,
                })
            }
            "offsets" if self.args.is_empty() => {
                let offsets = ctx
                    .repos
                    .records
                    .subscriber_offsets()
                    .await
                    .map_err(|_| UseCaseError::StorageError)?;
                let offsets = offsets
                    .resolve(self.chat_id, &ctx.config.reminders.default_offsets)
                    .clone();
                self.reply(
                    ctx,
                    format!(
                        "Your reminders in hours, {}.\n{}",
                        offsets, OFFSETS_USAGE
                    ),
                )
                .await;
                Ok(CommandOutcome::OffsetsShown(offsets))
            }
            "offsets" => {
                let offsets = parse_offsets_args(&self.args)?;
                let offsets = execute(
                    SetOffsetsUseCase {
                        chat_id: self.chat_id,
                        offsets,
                    },
                    ctx,
                )
                .await
                .map_err(UseCaseError::SetOffsets)?;
                self.reply(
                    ctx,
                    format!(
                        "<b>Reminders updated</b>, {}. They apply to proposals from now on.",
                        offsets
                    ),
                )
                .await;
                Ok(CommandOutcome::OffsetsUpdated(offsets))
            }
            other => {
                debug!("Ignoring unknown command /{} from chat {}", other, self.chat_id);
                Ok(CommandOutcome::Ignored)
            }
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for HandleCommandUseCase<'_> {
    type Response = CommandOutcome;

    type Error = UseCaseError;

    const NAME: &'static str = "HandleCommand";

    async fn execute(&mut self, ctx: &GovBotContext) -> Result<Self::Response, Self::Error> {
        let res = self.dispatch(ctx).await;
        if let Err(e) = &res {
            let message = GovBotError::from(e.clone()).to_string();
            if let Err(e) = ctx
                .services
                .chat
                .send(&OutboundMessage::text(self.chat_id, message))
                .await
            {
                error!("Unable to report command failure to chat {}: {:?}", self.chat_id, e);
            }
        }
        res
    }
}

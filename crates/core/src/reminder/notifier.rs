use govbot_domain::{
    format_hours, CallbackAction, ChatId, InlineButton, OutboundMessage, Proposal, ProposalKind,
    ReminderTrigger, ShortId,
};
use govbot_infra::{Config, IChatTransport};
use tracing::{error, info};

/// Escapes text placed inside messages sent with the HTML parse mode
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

pub fn proposal_link(config: &Config, proposal: &Proposal) -> String {
    match proposal.kind {
        ProposalKind::OffChain => format!(
            "{}{}/proposal/{}",
            config.snapshot.proposal_base_url, config.snapshot.space, proposal.id
        ),
        ProposalKind::OnChain => format!(
            "{}{}?dao={}:{}",
            config.links.proposals_base_url,
            proposal.id,
            config.links.chain_prefix,
            config.links.frontend_contract_address
        ),
    }
}

/// "I have already voted" followed by one snooze button per configured hour
pub fn reminder_buttons(short_id: &ShortId, button_hours: &[f64]) -> Vec<Vec<InlineButton>> {
    let voted = CallbackAction::Voted {
        short_id: short_id.clone(),
    };
    let mut buttons = vec![vec![InlineButton {
        text: "I have already voted".into(),
        callback_data: voted.to_string(),
    }]];
    for hours in button_hours {
        let remind_in = CallbackAction::RemindIn {
            short_id: short_id.clone(),
            hours: *hours,
        };
        buttons.push(vec![InlineButton {
            text: format!("Remind me in {} hour(s)", format_hours(*hours)),
            callback_data: remind_in.to_string(),
        }]);
    }
    buttons
}

fn footer(proposal_id: &str, link: Option<&str>) -> String {
    let mut footer = format!("\n\nProposal ID: <code>{}</code>", escape_html(proposal_id));
    if let Some(link) = link {
        footer.push_str(&format!("\n<a href='{}'>View Proposal</a>", escape_html(link)));
    }
    footer
}

/// Renders the reminder a scheduled job sends when it fires
pub fn render_reminder(
    config: &Config,
    chat_id: ChatId,
    proposal: &Proposal,
    short_id: &ShortId,
    trigger: ReminderTrigger,
) -> OutboundMessage {
    let headline = match trigger {
        ReminderTrigger::FromStart { .. } => format!(
            "Voting has started for proposal '<b>{}</b>'. Don't forget to vote!",
            escape_html(&proposal.title)
        ),
        ReminderTrigger::BeforeEnd { hours } => format!(
            "{} minutes left to vote on proposal '<b>{}</b>'. Don't miss out!",
            (hours * 60.0) as i64,
            escape_html(&proposal.title)
        ),
    };
    let link = proposal_link(config, proposal);
    OutboundMessage {
        chat_id,
        text: headline + &footer(&proposal.id, Some(&link)),
        buttons: reminder_buttons(short_id, &config.reminders.button_hours),
    }
}

/// Renders the reminder of a "Remind me in H hour(s)" request. Proposals
/// recorded before the catalog existed are shown by their id only.
pub fn render_snooze(
    config: &Config,
    chat_id: ChatId,
    proposal_id: &str,
    proposal: Option<&Proposal>,
    short_id: &ShortId,
) -> OutboundMessage {
    let title = proposal.map(|p| p.title.as_str()).unwrap_or(proposal_id);
    let link = proposal.map(|p| proposal_link(config, p));
    OutboundMessage {
        chat_id,
        text: format!("Reminder: Time to vote on '<b>{}</b>'!", escape_html(title))
            + &footer(proposal_id, link.as_deref()),
        buttons: reminder_buttons(short_id, &config.reminders.button_hours),
    }
}

/// Sends a message, logging and dropping it on failure
pub async fn deliver(chat: &dyn IChatTransport, message: &OutboundMessage) -> bool {
    match chat.send(message).await {
        Ok(()) => {
            info!("Sent message to chat {}", message.chat_id);
            true
        }
        Err(e) => {
            error!("Failed to send message to chat {}: {:?}", message.chat_id, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use govbot_infra::InMemoryChatTransport;

    fn proposal(kind: ProposalKind) -> Proposal {
        Proposal {
            id: "0xabc".into(),
            title: "Fund the grants program".into(),
            start: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            end: Utc.timestamp_opt(1_700_086_400, 0).unwrap(),
            kind,
        }
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.snapshot.space = "gov.example.eth".into();
        config.links.proposals_base_url = "https://app.aragon.org/proposals/".into();
        config.links.frontend_contract_address = "0xdao".into();
        config.reminders.button_hours = vec![1.0, 4.5];
        config
    }

    #[test]
    fn links_depend_on_proposal_kind() {
        assert_eq!(
            proposal_link(&config(), &proposal(ProposalKind::OffChain)),
            "https://snapshot.org/#/gov.example.eth/proposal/0xabc"
        );
        assert_eq!(
            proposal_link(&config(), &proposal(ProposalKind::OnChain)),
            "https://app.aragon.org/proposals/0xabc?dao=eth:0xdao"
        );
    }

    #[test]
    fn renders_buttons_for_configured_hours() {
        let buttons = reminder_buttons(&ShortId::new("Ab3dE6gH"), &[1.0, 4.5]);
        let rendered = buttons
            .iter()
            .map(|row| (row[0].text.as_str(), row[0].callback_data.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            rendered,
            vec![
                ("I have already voted", "voted|Ab3dE6gH"),
                ("Remind me in 1 hour(s)", "remind_in|Ab3dE6gH|1"),
                ("Remind me in 4.5 hour(s)", "remind_in|Ab3dE6gH|4.5"),
            ]
        );
    }

    #[test]
    fn renders_reminders() {
        let short_id = ShortId::new("Ab3dE6gH");
        let p = proposal(ProposalKind::OffChain);

        let started = render_reminder(
            &config(),
            42,
            &p,
            &short_id,
            ReminderTrigger::FromStart { hours: 0.0 },
        );
        assert_eq!(started.chat_id, 42);
        assert_eq!(
            started.text,
            "Voting has started for proposal '<b>Fund the grants program</b>'. Don't forget to vote!\n\n\
             Proposal ID: <code>0xabc</code>\n\
             <a href='https://snapshot.org/#/gov.example.eth/proposal/0xabc'>View Proposal</a>"
        );
        assert_eq!(started.buttons.len(), 3);

        let ending = render_reminder(
            &config(),
            42,
            &p,
            &short_id,
            ReminderTrigger::BeforeEnd { hours: 1.5 },
        );
        assert!(ending
            .text
            .starts_with("90 minutes left to vote on proposal '<b>Fund the grants program</b>'."));

        let snoozed = render_snooze(&config(), 42, "0xdef", None, &short_id);
        assert_eq!(
            snoozed.text,
            "Reminder: Time to vote on '<b>0xdef</b>'!\n\nProposal ID: <code>0xdef</code>"
        );
    }

    #[test]
    fn escapes_user_provided_text() {
        let mut p = proposal(ProposalKind::OffChain);
        p.title = "R&D <Grants>".into();
        p.id = "0x<1>".into();

        let started = render_reminder(
            &config(),
            42,
            &p,
            &ShortId::new("Ab3dE6gH"),
            ReminderTrigger::FromStart { hours: 0.0 },
        );
        assert!(started.text.starts_with(
            "Voting has started for proposal '<b>R&amp;D &lt;Grants&gt;</b>'. Don't forget to vote!\n\n\
             Proposal ID: <code>0x&lt;1&gt;</code>"
        ));

        let snoozed = render_snooze(&config(), 42, "P&1", None, &ShortId::new("Ab3dE6gH"));
        assert_eq!(
            snoozed.text,
            "Reminder: Time to vote on '<b>P&amp;1</b>'!\n\nProposal ID: <code>P&amp;1</code>"
        );
        assert_eq!(escape_html("it's \"fine\""), "it&#39;s &quot;fine&quot;");
    }

    #[tokio::test]
    async fn delivery_failures_are_dropped() {
        let chat = InMemoryChatTransport::new();
        chat.fail_sends(true);
        assert!(!deliver(&chat, &OutboundMessage::text(1, "hi")).await);
        chat.fail_sends(false);
        assert!(deliver(&chat, &OutboundMessage::text(1, "hi")).await);
        assert_eq!(chat.sent().len(), 1);
    }
}

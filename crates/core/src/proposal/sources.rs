use chrono::{DateTime, Duration, TimeZone, Utc};
use govbot_domain::{ProposalEvent, ProposalKind};
use govbot_infra::{GovBotContext, IOnChainEventSource, OffChainProposal, OnChainProposalEntry};
use tracing::warn;

fn from_unix_secs(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

/// Turns the newest first off-chain listing into events, oldest first,
/// so subscribers are notified in the order proposals were created.
pub fn normalize_offchain(proposals: Vec<OffChainProposal>) -> Vec<ProposalEvent> {
    proposals
        .into_iter()
        .rev()
        .filter_map(|p| match (from_unix_secs(p.start), from_unix_secs(p.end)) {
            (Some(start), Some(end)) => Some(ProposalEvent {
                id: p.id,
                title: p.title,
                start,
                end,
                kind: ProposalKind::OffChain,
            }),
            _ => {
                warn!("Off-chain proposal {} has invalid voting times", p.id);
                None
            }
        })
        .collect()
}

/// On-chain proposals open when their log is seen. The end is estimated from
/// the blocks left until `voting_end_block`, an end block that has already
/// passed ends the proposal now.
pub fn normalize_onchain(
    entry: OnChainProposalEntry,
    current_block: u64,
    average_block_time_secs: u64,
    now: DateTime<Utc>,
) -> ProposalEvent {
    let blocks_left = entry.voting_end_block.saturating_sub(current_block);
    let secs_left = blocks_left.saturating_mul(average_block_time_secs);
    let end = i64::try_from(secs_left)
        .ok()
        .and_then(|secs| now.checked_add_signed(Duration::seconds(secs)))
        .unwrap_or(now);
    ProposalEvent {
        title: format!("On-Chain Proposal {}", entry.proposal_id),
        id: entry.proposal_id,
        start: now,
        end,
        kind: ProposalKind::OnChain,
    }
}

pub async fn poll_offchain(ctx: &GovBotContext) -> anyhow::Result<Vec<ProposalEvent>> {
    let snapshot = &ctx.config.snapshot;
    let proposals = ctx
        .services
        .offchain
        .latest_proposals(&snapshot.space, snapshot.proposal_limit)
        .await?;
    Ok(normalize_offchain(proposals))
}

pub async fn poll_onchain(
    ctx: &GovBotContext,
    source: &dyn IOnChainEventSource,
    average_block_time_secs: u64,
) -> anyhow::Result<Vec<ProposalEvent>> {
    let entries = source.new_entries().await?;
    if entries.is_empty() {
        return Ok(Vec::new());
    }
    let current_block = source.current_block().await?;
    let now = ctx.sys.now();
    Ok(entries
        .into_iter()
        .map(|entry| normalize_onchain(entry, current_block, average_block_time_secs, now))
        .collect())
}

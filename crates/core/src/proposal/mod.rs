pub mod handle_proposal_event;
pub mod simulate_proposal;
pub mod sources;

pub mod mark_voted;
pub mod remind_in;
pub mod set_offsets;
pub mod subscribe;
mod subscribers;

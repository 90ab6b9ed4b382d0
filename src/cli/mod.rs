mod commands;
mod handlers;

pub use commands::{Cli, Commands, ProfileArgs, SubmitCommand, SubmitEntity};
pub use handlers::{
    handle_delete, handle_flag, handle_init, handle_leaderboard, handle_profile, handle_queue,
    handle_rate, handle_revise, handle_review, handle_score, handle_show, handle_submit,
    handle_vote, CliResult,
};

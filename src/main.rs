use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use viridian::cli::{
    handle_delete, handle_flag, handle_init, handle_leaderboard, handle_profile, handle_queue,
    handle_rate, handle_revise, handle_review, handle_score, handle_show, handle_submit,
    handle_vote, Cli, Commands,
};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,viridian=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let actor = cli.actor;

    let result = match cli.command {
        Commands::Init => handle_init(),
        Commands::Submit(submit) => handle_submit(submit.entity, actor),
        Commands::Rate {
            target,
            score,
            weight,
            json,
        } => handle_rate(target, score, weight, json, actor),
        Commands::Review {
            id,
            decision,
            reason,
            comment,
            json,
        } => handle_review(id, decision, reason, comment, json, actor),
        Commands::Delete { id, json } => handle_delete(id, json, actor),
        Commands::Revise {
            id,
            title,
            name,
            description,
            change_reason,
            json,
        } => handle_revise(id, title, name, description, change_reason, json, actor),
        Commands::Vote {
            target,
            value,
            json,
        } => handle_vote(target, value, json, actor),
        Commands::Flag { id, reason, json } => handle_flag(id, reason, json),
        Commands::Show { id, json } => handle_show(id, json),
        Commands::Score {
            id,
            recompute,
            json,
        } => handle_score(id, recompute, json),
        Commands::Queue { json } => handle_queue(json),
        Commands::Leaderboard { kind, limit, json } => handle_leaderboard(kind, limit, json),
        Commands::Profile(args) => handle_profile(args, actor),
    };

    if let Err(rejection) = result {
        eprintln!("Error: {}", rejection);
        std::process::exit(1);
    }
}

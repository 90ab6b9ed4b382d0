use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "viridian")]
#[command(version, about = "Moderation, scoring and reputation for crowdsourced product ratings")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Act as this user (defaults to the git user name)
    #[arg(long = "as", global = true, value_name = "USER")]
    pub actor: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new viridian project in the current directory
    Init,

    /// Submit a new asset for moderation
    Submit(SubmitCommand),

    /// Rate a product, producer or label (0-100)
    Rate {
        /// Target asset ID (or unique prefix)
        target: String,

        /// Score between 0 and 100
        score: f64,

        /// Rating weight
        #[arg(long, short = 'w', default_value_t = 1)]
        weight: i32,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decide the open review of an asset
    Review {
        /// Asset ID (or unique prefix)
        id: String,

        /// Decision (approve, reject, ignore)
        decision: String,

        /// Reject reason (inappropriate, incorrect, outdated, duplicate, missing_src, other)
        #[arg(long, short = 'r')]
        reason: Option<String>,

        /// Free-text comment for the submitter
        #[arg(long, short = 'c')]
        comment: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete an asset
    Delete {
        /// Asset ID (or unique prefix)
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Publish a new version of an active product, producer, label or information
    Revise {
        /// Asset ID (or unique prefix)
        id: String,

        /// New title (information)
        #[arg(long)]
        title: Option<String>,

        /// New display name (product, producer, label)
        #[arg(long)]
        name: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// Why the asset changed
        #[arg(long = "change-reason")]
        change_reason: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Vote on a rating, information or comment (-1, 0 or 1)
    Vote {
        /// Target asset ID (or unique prefix)
        target: String,

        /// Vote value; 0 clears a previous vote
        #[arg(allow_hyphen_values = true)]
        value: i32,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Flag a comment
    Flag {
        /// Comment ID (or unique prefix)
        id: String,

        /// Reason (inappropriate, incorrect, outdated, trivial, other)
        reason: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show an asset with its review history
    Show {
        /// Asset ID (or unique prefix)
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the composite score of an asset
    Score {
        /// Asset ID (or unique prefix)
        id: String,

        /// Recompute and store the score first
        #[arg(long)]
        recompute: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List assets waiting for moderation
    Queue {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Best-scored active assets of a kind
    Leaderboard {
        /// Asset kind (product, producer, label)
        #[arg(default_value = "product")]
        kind: String,

        /// Maximum number of results
        #[arg(long, short = 'n', default_value_t = 10)]
        limit: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Update your public profile
    Profile(ProfileArgs),
}

#[derive(Args, Debug)]
pub struct SubmitCommand {
    #[command(subcommand)]
    pub entity: SubmitEntity,
}

#[derive(Subcommand, Debug)]
pub enum SubmitEntity {
    /// Submit a product
    Product {
        /// Global trade item number
        gtin: String,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Locale of the display name
        #[arg(long, default_value = "en")]
        locale: String,

        /// Producer ID
        #[arg(long)]
        producer: Option<String>,

        /// Label IDs (can be specified multiple times)
        #[arg(long = "label", short = 'l')]
        labels: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Submit a producer
    Producer {
        /// Producer name
        name: String,

        /// Postal address
        #[arg(long)]
        address: Option<String>,

        /// Website
        #[arg(long)]
        url: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Submit a sustainability label
    Label {
        /// Label version
        #[arg(value_name = "VERSION")]
        label_version: String,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Locale of the display name
        #[arg(long, default_value = "en")]
        locale: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Submit information about a product, producer or label
    #[command(alias = "information")]
    Info {
        /// Target asset ID (or unique prefix)
        target: String,

        /// Title
        title: String,

        /// Category (general_information, life_cycle_analysis, study_or_paper, ...)
        #[arg(long, default_value = "general_information")]
        category: String,

        /// Description
        #[arg(long)]
        description: Option<String>,

        /// Source URLs (can be specified multiple times)
        #[arg(long = "source", short = 's')]
        sources: Vec<String>,

        /// Weight
        #[arg(long, short = 'w', default_value_t = 0)]
        weight: i32,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Comment on any asset
    Comment {
        /// Target asset ID (or unique prefix)
        target: String,

        /// Comment text
        text: String,

        /// Weight
        #[arg(long, short = 'w', default_value_t = 0)]
        weight: i32,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct ProfileArgs {
    #[arg(long = "avatar-url")]
    pub avatar_url: Option<String>,

    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub bio: Option<String>,

    #[arg(long = "real-name")]
    pub real_name: Option<String>,

    #[arg(long)]
    pub url: Option<String>,

    #[arg(long)]
    pub location: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_negative_vote_parses() {
        let cli = Cli::try_parse_from(["viridian", "vote", "abc", "-1"]).unwrap();
        match cli.command {
            Commands::Vote { target, value, .. } => {
                assert_eq!(target, "abc");
                assert_eq!(value, -1);
            }
            other => panic!("Expected vote, got {:?}", other),
        }
    }

    #[test]
    fn test_submit_label_takes_version_positional() {
        let cli = Cli::try_parse_from(["viridian", "submit", "label", "2.1", "--name", "Eco"]).unwrap();
        match cli.command {
            Commands::Submit(SubmitCommand {
                entity: SubmitEntity::Label {
                    label_version, name, ..
                },
            }) => {
                assert_eq!(label_version, "2.1");
                assert_eq!(name.as_deref(), Some("Eco"));
            }
            other => panic!("Expected label submission, got {:?}", other),
        }
    }

    #[test]
    fn test_global_actor() {
        let cli = Cli::try_parse_from(["viridian", "queue", "--as", "mod"]).unwrap();
        assert_eq!(cli.actor.as_deref(), Some("mod"));
    }
}

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "plugadmin")]
#[command(author, version, about = "Operator CLI for the FindYourPlug bot config and storefront", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the current configuration document
    ShowConfig {
        /// Fetch the unauthenticated public projection instead
        #[arg(long)]
        public: bool,
    },

    /// Set one top-level config field (value is parsed as JSON, else taken
    /// as a string)
    Set {
        key: String,
        value: String,

        /// Use the longer free-text debounce window
        #[arg(long)]
        text: bool,
    },

    /// Manage the shop social media list
    Social {
        #[command(subcommand)]
        action: SocialAction,
    },

    /// Broadcast a message to every bot user
    Broadcast {
        message: String,

        /// URL of an image to attach
        #[arg(long)]
        image: Option<String>,
    },

    /// Push a locally-flagged config to the server (manual reconciliation)
    Sync,

    /// Reset the local fallback copy to defaults
    ClearLocal,

    /// Show the cached telegram links
    Links {
        /// Fetch fresh links immediately instead of reading the cache
        #[arg(long)]
        now: bool,

        /// Keep polling and print every update until Ctrl-C
        #[arg(long)]
        watch: bool,
    },

    /// Show referral statistics
    Stats,

    /// Cast a like on a listing
    Vote {
        plug_id: String,
    },
}

#[derive(Subcommand)]
pub enum SocialAction {
    /// Add an entry (id is derived from the name)
    Add {
        name: String,
        emoji: String,
        url: String,
    },

    /// Flip an entry's enabled flag
    Toggle {
        id: String,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

use super::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(about = "Email one-time-password login")]
pub struct Cli {
    #[arg(long)]
    pub settings: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Request a code for EMAIL, then read codes from stdin until login succeeds.
    Login {
        #[arg(long)]
        email: String,
        /// Requester address charged against the per-IP budget.
        #[arg(long)]
        ip: Option<String>,
    },
    /// Print the allowed email domain pattern and the login message.
    Domains,
    /// Look up an issued session.
    Session {
        #[arg(long)]
        id: String,
    },
}

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "funnelbot")]
#[command(author, version, about = "Telegram referral funnel bot: join, verify, earn and withdraw", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot
    Run {
        /// Use webhook mode instead of long polling
        #[arg(long)]
        webhook: bool,
    },

    /// Log the effective configuration and exit
    CheckConfig,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

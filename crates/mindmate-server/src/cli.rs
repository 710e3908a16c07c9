use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "mindmate-server", about = "MindMate chat relay and history service")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/mindmate.toml")]
    pub config: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Print a signed session token for an account and exit
    #[arg(long, value_name = "ACCOUNT_ID")]
    pub issue_token: Option<i64>,
}

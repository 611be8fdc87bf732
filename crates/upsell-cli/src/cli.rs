use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "kactus-upsell")]
#[command(bin_name = "kactus-upsell")]
#[command(version)]
#[command(about = "Unlock Kactus full access from the terminal")]
pub struct Cli {
    #[arg(long, global = true, help = "Write a diagnostics log for this run")]
    pub diagnostics: bool,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[command(about = "Check a coupon code against the coupon service")]
    Coupon {
        #[arg(value_name = "CODE")]
        code: String,
    },
    #[command(about = "Run configuration and service checks")]
    Doctor,
}

//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags};
use crate::commands;

/// Manage images on the cloudimg service
#[derive(Parser, Debug)]
#[command(
    name = "cloudimg",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Answer yes to confirmation prompts
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in through the browser
    Login(commands::login::LoginArgs),

    /// Forget the stored session
    Logout,

    /// Inspect the stored session
    #[command(subcommand)]
    Auth(commands::auth::AuthCommand),

    /// Manage images
    #[command(subcommand)]
    Image(commands::image::ImageCommand),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            json,
            quiet,
            no_color,
            yes,
            command,
            ..
        } = self;
        let app = AppContext::new(&AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            behaviour: BehaviourFlags { yes },
        })?;

        match command {
            Command::Login(args) => commands::login::run(&app, &args).await,
            Command::Logout => commands::logout::run(&app).await,
            Command::Auth(cmd) => commands::auth::run(&app, &cmd).await,
            Command::Image(cmd) => commands::image::run(&app, &cmd).await,
            Command::Config(cmd) => commands::config::run(&app, &cmd),
            Command::Version => commands::version::run(&app),
        }
    }
}

/// `EnvFilter` directive for a `-v` count.
#[must_use]
pub fn log_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "cloudimg_cli=info,warn",
        2 => "cloudimg_cli=debug,warn",
        _ => "cloudimg_cli=trace,reqwest=debug,info",
    }
}

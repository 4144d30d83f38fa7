//! `cloudimg image` — list, create, activate and deactivate images.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::app::AppContext;
use crate::application::ports::ImageApi;
use crate::application::services::image_ops::{self, CreateImage, CreateOutcome};

/// Image subcommands.
#[derive(Subcommand, Debug)]
pub enum ImageCommand {
    /// List images
    List,
    /// Upload an artifact and create an image from it
    Create(CreateArgs),
    /// Wait for an image creation task that is already running
    Task {
        /// Task id printed by `image create --no-wait`
        task_id: String,
    },
    /// Activate an image
    Activate(TransitionArgs),
    /// Deactivate an image
    Deactivate(TransitionArgs),
}

/// Arguments for `image create`.
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Image name (lowercase letters, digits, `.`, `_`, `-`)
    pub name: String,

    /// Artifact to upload
    #[arg(long, short)]
    pub file: PathBuf,

    /// Free-form description
    #[arg(long)]
    pub description: Option<String>,

    /// Return once the task is submitted
    #[arg(long)]
    pub no_wait: bool,
}

/// Arguments for `image activate` / `image deactivate`.
#[derive(Args, Debug)]
pub struct TransitionArgs {
    /// Image id
    pub image_id: String,

    /// Return once the request is submitted
    #[arg(long)]
    pub no_wait: bool,
}

/// Run the image command.
///
/// # Errors
///
/// Returns an error if no session is stored, an API call fails, or a
/// long-running operation fails or times out.
pub async fn run(app: &AppContext, cmd: &ImageCommand) -> Result<ExitCode> {
    let config = app.config()?;
    let client = app.session_client(&config).await?;
    let settings = config.poll_settings();

    match cmd {
        ImageCommand::List => {
            let images = client.list_images().await?;
            app.renderer().render_images(&images)?;
        }
        ImageCommand::Create(args) => {
            let request = CreateImage {
                name: &args.name,
                description: args.description.as_deref(),
                file: &args.file,
                wait: !args.no_wait,
            };
            let outcome = {
                let reporter = app.reporter();
                image_ops::create_image(&client, &reporter, &request, settings).await?
            };
            app.renderer().render_create(&outcome)?;
        }
        ImageCommand::Task { task_id } => {
            let image_id = {
                let reporter = app.reporter();
                image_ops::wait_for_task(&client, &reporter, task_id, settings).await?
            };
            app.renderer().render_create(&CreateOutcome::Created {
                task_id: task_id.clone(),
                image_id,
            })?;
        }
        ImageCommand::Activate(args) => {
            let outcome = {
                let reporter = app.reporter();
                image_ops::activate_image(&client, &reporter, &args.image_id, !args.no_wait, settings)
                    .await?
            };
            app.renderer()
                .render_transition("activate", &args.image_id, &outcome)?;
        }
        ImageCommand::Deactivate(args) => {
            let prompt = format!("Deactivate image {}?", args.image_id);
            if !app.non_interactive && !app.confirm(&prompt, false)? {
                app.output.info("Cancelled.");
                return Ok(ExitCode::SUCCESS);
            }
            let outcome = {
                let reporter = app.reporter();
                image_ops::deactivate_image(
                    &client,
                    &reporter,
                    &args.image_id,
                    !args.no_wait,
                    settings,
                )
                .await?
            };
            app.renderer()
                .render_transition("deactivate", &args.image_id, &outcome)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

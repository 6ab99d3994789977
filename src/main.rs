//! Cowboy Autoplay - command line entry point
//!
//! Binds one player, runs the requested operation, prints the JSON result
//! on stdout and unbinds. Logs go to stderr.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use cowboy_autoplay::control::Controller;
use cowboy_autoplay::core::config::ControllerConfig;
use cowboy_autoplay::core::error::Result;

/// Autonomous controller for Cowboy grid combat games
#[derive(Parser, Debug)]
#[command(name = "cowboy-autoplay")]
#[command(about = "Bind to a Cowboy game seat and play it")]
struct Cli {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the game services base URL
    #[arg(long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct Seat {
    /// Game UUID
    #[arg(long)]
    game_id: String,

    /// Seat to control: A, B, C or D
    #[arg(long)]
    player: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bind and keep playing until the game finishes or Ctrl-C
    Play {
        #[command(flatten)]
        seat: Seat,

        /// Bind without starting autoplay
        #[arg(long, default_value_t = false)]
        no_autoplay: bool,
    },
    /// Block until it is the seat's turn
    Wait {
        #[command(flatten)]
        seat: Seat,

        /// Seconds to wait
        #[arg(long, default_value_t = 120)]
        timeout: u64,
    },
    /// Show what autoplay would do next, without submitting
    Preview {
        #[command(flatten)]
        seat: Seat,
    },
    /// Submit one explicit action for the current turn
    Submit {
        #[command(flatten)]
        seat: Seat,

        /// move, shield, shoot or speak
        #[arg(long = "command")]
        command_type: String,

        #[arg(long)]
        direction: Option<String>,

        /// Text for speak
        #[arg(long)]
        text: Option<String>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("cowboy_autoplay=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "cowboy-autoplay failed");
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = ControllerConfig::load(cli.config.as_deref())?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
        config.validate()?;
    }

    let mut controller = Controller::from_config(config)?;
    let outcome = match cli.command {
        Command::Play { seat, no_autoplay } => {
            let report = controller
                .bind(&seat.game_id, &seat.player, Some(!no_autoplay))
                .await?;
            print_json(&report)?;
            play_until_finished(&controller).await
        }
        Command::Wait { seat, timeout } => {
            controller.bind(&seat.game_id, &seat.player, Some(false)).await?;
            let outcome = controller.wait_for_my_turn(Duration::from_secs(timeout)).await;
            outcome.and_then(|o| print_json(&o))
        }
        Command::Preview { seat } => {
            controller.bind(&seat.game_id, &seat.player, Some(false)).await?;
            controller.explain_next_move().and_then(|p| print_json(&p))
        }
        Command::Submit {
            seat,
            command_type,
            direction,
            text,
        } => {
            controller.bind(&seat.game_id, &seat.player, Some(false)).await?;
            let receipt = controller
                .submit_action(&command_type, direction.as_deref(), text.as_deref())
                .await;
            receipt.and_then(|r| print_json(&r))
        }
    };

    controller.unbind().await;
    outcome
}

/// Report each new decision until the game ends or Ctrl-C
async fn play_until_finished(controller: &Controller) -> Result<()> {
    let mut last_reported = None;
    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    loop {
        tokio::select! {
            _ = &mut interrupted => {
                tracing::info!("interrupted");
                return Ok(());
            }
            _ = ticker.tick() => {}
        }

        let status = controller.autoplay_status();
        if let Some(record) = status.status.last_decision {
            let key = (record.turn_no, record.error.is_some());
            if last_reported != Some(key) {
                last_reported = Some(key);
                print_json(&record)?;
            }
        }

        let finished = controller
            .session()
            .map_or(true, |s| s.store().is_finished());
        if finished {
            tracing::info!("game finished");
            return Ok(());
        }
    }
}

use anyhow::Context;
use clap::{Parser, Subcommand};
use wayfarer_speech::{SpeechClient, SpeechClientParams};
use wayfarer_valhalla::{ValhallaClient, ValhallaClientParams};

use crate::{route::RouteArgs, simulate::SimulateArgs};

mod console;
mod parsers;
mod route;
mod simulate;

const VALHALLA_URL_ENV_VAR: &str = "VALHALLA_URL";
const SPEECH_URL_ENV_VAR: &str = "SPEECH_URL";

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(short, long)]
    debug: bool,

    /// Routing service base url, defaults to $VALHALLA_URL
    #[arg(long, global = true)]
    valhalla_url: Option<String>,

    /// Speech service base url, defaults to $SPEECH_URL
    #[arg(long, global = true)]
    speech_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetches a route and prints its maneuvers
    Route {
        #[command(flatten)]
        args: RouteArgs,
    },
    /// Replays a recorded track through the guidance engine
    #[command(visible_alias = "sim")]
    Simulate {
        #[command(flatten)]
        args: SimulateArgs,
    },
}

fn service_url(flag: Option<String>, env_var: &str) -> anyhow::Result<String> {
    match flag {
        Some(url) => Ok(url),
        None => std::env::var(env_var)
            .with_context(|| format!("Pass the url as a flag or set {env_var}")),
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::from_filename("./.env.local").ok();

    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    match cli.command {
        Some(Commands::Route { args }) => {
            let valhalla_url = service_url(cli.valhalla_url, VALHALLA_URL_ENV_VAR)?;
            let client = ValhallaClient::new(ValhallaClientParams::new(valhalla_url));
            route::run(args, &client).await?
        }
        Some(Commands::Simulate { args }) => {
            let valhalla_url = service_url(cli.valhalla_url, VALHALLA_URL_ENV_VAR)?;
            let speech_url = service_url(cli.speech_url, SPEECH_URL_ENV_VAR)?;

            let routing = ValhallaClient::new(ValhallaClientParams::new(valhalla_url));
            let speech = SpeechClient::new(SpeechClientParams { speech_url });
            simulate::run(args, routing, speech).await?
        }
        None => {}
    }

    Ok(())
}

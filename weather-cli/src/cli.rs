use anyhow::{Context, bail};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use classy_weather_core::{
    Config, LookupController, LookupState, OpenMeteoClient, provider::provider_from_config,
};
use inquire::{InquireError, Text};

use crate::render::render_state;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "classy-weather", version, about = "Classy Weather: daily forecasts by place name")]
pub struct Cli {
    #[command(flatten)]
    pub endpoints: Endpoints,

    #[command(subcommand)]
    pub command: Command,
}

/// Per-invocation overrides of the configured service URLs.
#[derive(Debug, Args)]
pub struct Endpoints {
    /// Geocoding service base URL.
    #[arg(long, global = true)]
    pub geocoding_url: Option<String>,

    /// Forecast service base URL.
    #[arg(long, global = true)]
    pub forecast_url: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure the geocoding and forecast service URLs.
    Configure,

    /// Search interactively; every entry triggers a new lookup.
    Search,

    /// Show the forecast for one location.
    Show {
        /// Location name, e.g. "london".
        location: String,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::load()?
            .with_overrides(self.endpoints.geocoding_url, self.endpoints.forecast_url);

        match self.command {
            Command::Configure => configure(config).await,
            Command::Search => {
                let controller = LookupController::new(provider_from_config(&config)?);
                search(&controller).await
            }
            Command::Show { location } => {
                let controller = LookupController::new(provider_from_config(&config)?);
                show(&controller, &location).await
            }
        }
    }
}

async fn configure(current: Config) -> anyhow::Result<()> {
    let updated = tokio::task::spawn_blocking(move || -> anyhow::Result<Config> {
        let geocoding_base_url = Text::new("Geocoding base URL:")
            .with_default(&current.geocoding_base_url)
            .prompt()
            .context("Failed to read geocoding base URL")?;
        let forecast_base_url = Text::new("Forecast base URL:")
            .with_default(&current.forecast_base_url)
            .prompt()
            .context("Failed to read forecast base URL")?;

        Ok(Config { geocoding_base_url, forecast_base_url })
    })
    .await??;

    OpenMeteoClient::new(&updated.geocoding_base_url, &updated.forecast_base_url)?;
    let path = updated.save()?;
    println!("Saved configuration to {}", path.display());

    Ok(())
}

async fn search(controller: &LookupController) -> anyhow::Result<()> {
    println!("CLASSY WEATHER");

    loop {
        let input = tokio::task::spawn_blocking(|| {
            Text::new("SEARCH FOR LOCATION").with_placeholder("e.g. london").prompt()
        })
        .await?;

        let query = match input {
            Ok(query) => query,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(err) => return Err(err).context("Failed to read search input"),
        };

        let today = Local::now().date_naive();
        if let Some(handle) = controller.on_query_change(&query) {
            if let Some(line) = render_state(&controller.state(), today) {
                println!("{line}");
            }
            handle.await.context("Lookup task failed")?;
        }

        if let Some(out) = render_state(&controller.state(), today) {
            println!("{out}");
        }
    }

    controller.dispose();
    Ok(())
}

async fn show(controller: &LookupController, location: &str) -> anyhow::Result<()> {
    let Some(handle) = controller.on_query_change(location) else {
        bail!("Location must be at least 2 characters long");
    };
    handle.await.context("Lookup task failed")?;

    match controller.state() {
        LookupState::Error(message) => bail!(message),
        state => {
            if let Some(out) = render_state(&state, Local::now().date_naive()) {
                println!("{out}");
            }
        }
    }

    Ok(())
}

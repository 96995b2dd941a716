mod app;
mod components;
mod config;
mod session;
mod store;
mod view;
mod weather;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use app::{AppContext, CityWeatherApp};
use clap::Parser;
use iced::{window, Application};
use session::CityPrompt;
use store::{JsonFileStore, MemoryStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use weather::OpenWeatherClient;

#[derive(Debug, Parser)]
#[command(name = "city-wx", about = "Current weather for a city")]
struct Args {
    /// Settings file, defaults to ./city-wx.toml when present
    #[arg(long)]
    config: Option<PathBuf>,
    /// JSON file holding the stored city
    #[arg(long)]
    preferences: Option<PathBuf>,
    #[arg(long)]
    api_base: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut settings =
        config::load_settings(args.config.as_deref()).context("failed to load settings")?;
    if let Some(path) = args.preferences {
        settings.preferences_path = Some(path);
    }
    if let Some(api_base) = args.api_base {
        settings.api_base = api_base;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&settings.log_filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let prompt = match settings
        .preferences_path
        .clone()
        .or_else(JsonFileStore::default_path)
    {
        Some(path) => {
            let store = JsonFileStore::new(path);
            info!(path = %store.path().display(), "reading stored city");
            CityPrompt::from_store(&store)
        }
        None => {
            warn!("no config directory, starting without a stored city");
            CityPrompt::from_store(&MemoryStore::default())
        }
    };

    let api_key = settings.credential().map(str::to_string);
    if api_key.is_none() {
        warn!("no OpenWeather API key configured");
    }

    let context = AppContext {
        api_key,
        prompt,
        client: Arc::new(OpenWeatherClient::new(settings.api_base.clone())),
    };

    CityWeatherApp::run(iced::Settings {
        window: window::Settings {
            exit_on_close_request: false,
            ..window::Settings::default()
        },
        ..iced::Settings::with_flags(context)
    })?;
    Ok(())
}

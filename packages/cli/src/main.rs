#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the reverse geocoder toolchain.
//!
//! With any `GEOCODER_POSTINSTALL_*` environment variable set, runs a
//! non-interactive eager initialization that warms the dump cache —
//! handy as a package post-install hook or image build step. The exit
//! code is 0 on success; on failure it is 0 when
//! `GEOCODER_POSTINSTALL_FAIL_SILENTLY=true` and 1 otherwise.
//!
//! Without post-install configuration, presents an interactive menu to
//! warm the cache, start the server, or look up a point.

use std::process::ExitCode;

use dialoguer::{Input, Select};
use revgeo_geocoder::{GeocoderConfig, Point, ReverseGeocoder};

/// Environment prefix for the post-install surface.
const POSTINSTALL_PREFIX: &str = "GEOCODER_POSTINSTALL_";

/// Top-level tool selection for the interactive menu.
enum Tool {
    WarmCache,
    Server,
    Lookup,
}

impl Tool {
    const ALL: &[Self] = &[Self::WarmCache, Self::Server, Self::Lookup];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::WarmCache => "Warm the dump cache",
            Self::Server => "Start the API server",
            Self::Lookup => "Look up a point",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    pretty_env_logger::init_custom_env("RUST_LOG");

    if postinstall_requested() {
        return run_postinstall().await;
    }

    match run_interactive().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Whether any post-install variable is present in the environment.
fn postinstall_requested() -> bool {
    std::env::vars().any(|(key, _)| key.starts_with(POSTINSTALL_PREFIX))
}

/// Eagerly initializes the engine from the post-install environment.
async fn run_postinstall() -> ExitCode {
    let fail_silently = std::env::var("GEOCODER_POSTINSTALL_FAIL_SILENTLY")
        .map(|v| parse_bool_flag(&v))
        .unwrap_or(false);

    let config = match postinstall_config() {
        Ok(config) => config,
        Err(message) => {
            log::error!("Invalid post-install configuration: {message}");
            return failure_code(fail_silently);
        }
    };

    log::info!(
        "Post-install: warming dump cache at {}",
        config.dump_directory.display()
    );

    match ReverseGeocoder::init(config).await {
        Ok(engine) => {
            log::info!("Post-install complete: {} cities indexed", engine.num_cities());
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Post-install failed: {e}");
            failure_code(fail_silently)
        }
    }
}

const fn failure_code(fail_silently: bool) -> ExitCode {
    if fail_silently {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Builds the engine configuration from `GEOCODER_POSTINSTALL_*`.
fn postinstall_config() -> Result<GeocoderConfig, String> {
    let mut config = GeocoderConfig::default();

    if let Ok(dir) = std::env::var("GEOCODER_POSTINSTALL_DUMP_DIRECTORY") {
        config.dump_directory = dir.into();
    }
    if let Ok(file) = std::env::var("GEOCODER_POSTINSTALL_CITIES_FILE") {
        config.cities_file = file.parse().map_err(|e| format!("{e}"))?;
    }
    if let Ok(value) = std::env::var("GEOCODER_POSTINSTALL_LOAD_ADMIN1") {
        config.load.admin1 = parse_bool_flag(&value);
    }
    if let Ok(value) = std::env::var("GEOCODER_POSTINSTALL_LOAD_ADMIN2") {
        config.load.admin2 = parse_bool_flag(&value);
    }
    if let Ok(value) = std::env::var("GEOCODER_POSTINSTALL_LOAD_ADMIN3_AND_4") {
        config.load.admin3_and_4 = parse_bool_flag(&value);
    }
    if let Ok(value) = std::env::var("GEOCODER_POSTINSTALL_LOAD_ALTERNATE_NAMES") {
        config.load.alternate_names = parse_bool_flag(&value);
    }
    if let Ok(value) = std::env::var("GEOCODER_POSTINSTALL_COUNTRIES") {
        config.countries = parse_countries(&value);
    }

    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Boolean environment values: `true`/`1` (case-insensitive) are set.
fn parse_bool_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

/// Splits a comma-separated country list, dropping empty segments.
fn parse_countries(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_uppercase)
        .collect()
}

/// Runs the interactive menu.
async fn run_interactive() -> Result<(), Box<dyn std::error::Error>> {
    println!("Reverse Geocoder Toolchain");
    println!();

    let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Tool::ALL[idx] {
        Tool::WarmCache => {
            let engine = ReverseGeocoder::init(prompt_config()?).await?;
            println!("Dump cache warm; {} cities indexed.", engine.num_cities());
        }
        Tool::Lookup => {
            let config = prompt_config()?;
            let latitude: f64 = Input::new().with_prompt("Latitude").interact_text()?;
            let longitude: f64 = Input::new().with_prompt("Longitude").interact_text()?;

            let engine = ReverseGeocoder::init(config).await?;
            match engine.lookup_one(Point::new(latitude, longitude)) {
                Some(hits) if !hits.is_empty() => {
                    println!("{}", serde_json::to_string_pretty(&hits)?);
                }
                _ => println!("No city found."),
            }
        }
        Tool::Server => {
            // The server uses actix-web's runtime, so run it in a
            // blocking task to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(|| {
                actix_web::rt::System::new().block_on(revgeo_server::run_server())
            })
            .await??;
        }
    }

    Ok(())
}

/// Prompts for the dump directory and cities file, defaulting both.
fn prompt_config() -> Result<GeocoderConfig, Box<dyn std::error::Error>> {
    let mut config = GeocoderConfig::default();

    let dir: String = Input::new()
        .with_prompt("Dump directory")
        .default(config.dump_directory.display().to_string())
        .interact_text()?;
    config.dump_directory = dir.into();

    let cities: String = Input::new()
        .with_prompt("Cities file")
        .default(config.cities_file.to_string())
        .interact_text()?;
    config.cities_file = cities.parse()?;

    Ok(config)
}

//!
//! src/main.rs  Andrew Belles  Oct 9th, 2025
//!
//! Command line front end: resolve a playlist link, or convert it into a
//! playlist on another catalog while printing progress as it arrives
//!

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use rs_playlist_converter::{
    config::{self, AppConfig},
    logging,
    spotify::SpotifyCatalog,
    convert_playlist, resolve_playlist_url, CatalogRegistry, ConversionProgress,
    ConvertError, Converter, Credential, Credentials, ProgressSink, ServiceKind
};

#[derive(Debug, Parser)]
#[command(name = "rs-playlist-converter", version, about = "Convert playlists between streaming catalogs")]
struct Cli {
    #[command(subcommand)]
    command: Command
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Convert a playlist link into a new playlist on another catalog
    Convert {
        url: String,
        /// Target catalog: spotify, apple, youtube, deezer or tidal
        #[arg(long = "to", env = "CONVERT_TARGET", default_value = "spotify")]
        to: String
    },
    /// Print which catalog a playlist link belongs to and its id
    Resolve {
        url: String
    }
}

fn print_progress(p: &ConversionProgress) {
    match (p.tracks_processed, p.total_tracks) {
        (Some(done), Some(total)) => {
            println!("[{:>5.1}%] {} ({done}/{total})", p.percent, p.message)
        }
        _ => println!("[{:>5.1}%] {}", p.percent, p.message),
    }
}

/// Credentials the CLI can build from its own configuration
fn credentials_from(cfgs: &AppConfig) -> Credentials {
    let mut credentials = Credentials::new();
    match cfgs.spotify.access_token.as_deref() {
        Some(token) => {
            let scopes: Vec<&str> = cfgs.spotify.token_scopes.iter().map(String::as_str).collect();
            credentials.insert(
                Credential::new(ServiceKind::Spotify, token, cfgs.spotify.token_expires_in)
                    .with_scopes(&scopes)
            );
        }
        None => warn!("SPOTIFY_ACCESS_TOKEN not set, spotify calls will fail authentication"),
    }
    credentials
}

async fn run_convert(cfgs: &AppConfig, url: &str, target: &str) -> Result<(), ConvertError> {
    let registry = CatalogRegistry::builder()
        .add(SpotifyCatalog::new(&cfgs.http, &cfgs.spotify)?)
        .build()?;
    let converter = Converter::from_config(Arc::new(registry), cfgs);

    // Ctrl-C abandons the run between stages
    let shutdown = converter.cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });

    let (sink, mut rx) = ProgressSink::channel(cfgs.conversion.progress_capacity);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            print_progress(&event);
        }
    });

    let credentials = credentials_from(cfgs);
    let outcome = convert_playlist(&converter, url, target, &credentials, &sink).await;
    drop(sink);
    if printer.await.is_err() {
        warn!("progress.printer.panicked");
    }

    let result = outcome?;
    println!();
    println!("Matched {}/{} tracks", result.success_count, result.total_tracks);
    if let Some(playlist_url) = result.playlist_url.as_deref() {
        println!("Playlist: {playlist_url}");
    }
    if !result.failed_tracks.is_empty() {
        println!("Not matched:");
        for failed in &result.failed_tracks {
            println!(
                "  {} - {} ({})",
                failed.original.primary_artist(), failed.original.title, failed.reason
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), ConvertError> {
    let cli = Cli::parse();
    let cfgs = config::load_config()?;
    let _guard = logging::init_logging(&cfgs.logging)?;

    info!(
        service = "rs-playlist-converter",
        version = %env!("CARGO_PKG_VERSION"),
        "starting"
    );

    match cli.command {
        Command::Resolve { url } => {
            let resolved = resolve_playlist_url(&url)?;
            println!("{} {}", resolved.service, resolved.playlist_id);
        }
        Command::Convert { url, to } => run_convert(&cfgs, &url, &to).await?,
    }

    Ok(())
}

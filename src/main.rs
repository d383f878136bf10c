mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use rb_core::config;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise choose defaults by verbosity.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "rb_server=trace,rb_db=debug,rb_media=debug,tower_http=debug".to_string()
        } else {
            "rb_server=info,rb_db=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt().with_env_filter(&env_filter).init();

    match cli.command {
        Commands::Start { host, port } => {
            let mut config = config::load_config_or_default(cli.config.as_deref())?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(rb_server::start(config))?;
            Ok(())
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::GenerateSecret => {
            println!("{}", rb_core::folder::random_hex_id());
            Ok(())
        }
        Commands::Version => {
            println!("radiobox {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Database: {}", config.server.db_path.display());
            println!("  Media root: {}", config.media.root.display());
            println!("  ffmpeg: {}", config.tools.ffmpeg.display());
            println!("  yt-dlp: {}", config.tools.ytdlp.display());
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Media root: {}", config.media.root.display());
        }
    }

    Ok(())
}

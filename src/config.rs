use crate::models::transformation::{Effect, parse_effect_list};
use crate::session::state::FallbackPolicy;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{env, fmt};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Public base URL of this server, used by the client to reach the
    /// deletion endpoint.
    pub base_url: String,
    /// Directory holding the durable page state.
    pub state_dir: String,
    /// Public account name on the media host.
    pub cloud_name: String,
    /// Host API credentials. Required to serve; client-only commands run
    /// without them.
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    /// Media host API root (overridable so tests can point at a mock).
    pub api_base: String,
    /// Media host delivery root for derived image URLs.
    pub delivery_base: String,
    /// Ordered enhancement chain applied after the preview resize.
    pub effects: Vec<Effect>,
    /// What the "after" pane shows when derivation fails.
    pub fallback: FallbackPolicy,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Upload, enhance and compare images via a hosted media API")]
pub struct Args {
    /// Host to bind to (overrides IMAGEFLUX_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides IMAGEFLUX_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Public base URL of this server (overrides IMAGEFLUX_BASE_URL)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Directory where page state is stored (overrides IMAGEFLUX_STATE_DIR)
    #[arg(long)]
    pub state_dir: Option<String>,

    /// Comma-separated effect chain (overrides IMAGEFLUX_EFFECTS)
    #[arg(long)]
    pub effects: Option<String>,

    /// Fallback when derivation fails: none | original (overrides IMAGEFLUX_FALLBACK)
    #[arg(long)]
    pub fallback: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API server (default)
    Serve,
    /// Record a successful upload by its secure URL and derive the enhanced URL
    Record { secure_url: String },
    /// Print the stored original and the derived enhanced URL
    Show,
    /// Delete the stored asset via the deletion endpoint
    Remove,
    /// Fetch the enhanced image and write it to disk
    Download {
        /// Output file path
        #[arg(long, default_value = "enhanced.jpg")]
        output: String,
    },
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and the
    /// selected command (defaulting to `serve`).
    pub fn from_env_and_args() -> Result<(Self, Command)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("IMAGEFLUX_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("IMAGEFLUX_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing IMAGEFLUX_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading IMAGEFLUX_PORT"),
        };
        let env_base_url =
            env::var("IMAGEFLUX_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".into());
        let env_state_dir =
            env::var("IMAGEFLUX_STATE_DIR").unwrap_or_else(|_| "./data/state".into());

        let cloud_name =
            env::var("CLOUDINARY_CLOUD_NAME").context("CLOUDINARY_CLOUD_NAME must be set")?;
        let api_key = env::var("CLOUDINARY_API_KEY").ok();
        let api_secret = env::var("CLOUDINARY_API_SECRET").ok();
        let api_base = env::var("CLOUDINARY_API_BASE")
            .unwrap_or_else(|_| "https://api.cloudinary.com".into());
        let delivery_base = env::var("CLOUDINARY_DELIVERY_BASE")
            .unwrap_or_else(|_| "https://res.cloudinary.com".into());

        let effects_spec = args
            .effects
            .clone()
            .or_else(|| env::var("IMAGEFLUX_EFFECTS").ok())
            .unwrap_or_else(|| "upscale,enhance,gen_restore".into());
        let effects = parse_effect_list(&effects_spec)
            .with_context(|| format!("parsing effect list `{}`", effects_spec))?;

        let fallback_spec = args
            .fallback
            .clone()
            .or_else(|| env::var("IMAGEFLUX_FALLBACK").ok())
            .unwrap_or_else(|| "none".into());
        let fallback = fallback_spec
            .parse::<FallbackPolicy>()
            .with_context(|| format!("parsing fallback policy `{}`", fallback_spec))?;

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            base_url: args.base_url.unwrap_or(env_base_url),
            state_dir: args.state_dir.unwrap_or(env_state_dir),
            cloud_name,
            api_key,
            api_secret,
            api_base,
            delivery_base,
            effects,
            fallback,
        };

        Ok((cfg, args.command.unwrap_or(Command::Serve)))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// Manual Debug so startup logging never prints the credentials.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("base_url", &self.base_url)
            .field("state_dir", &self.state_dir)
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key.as_deref().map(|_| "<set>"))
            .field("api_secret", &self.api_secret.as_deref().map(|_| "<set>"))
            .field("api_base", &self.api_base)
            .field("delivery_base", &self.delivery_base)
            .field("effects", &self.effects)
            .field("fallback", &self.fallback)
            .finish()
    }
}

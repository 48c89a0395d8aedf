use clap::{Parser, Subcommand};

/// Tooling for the embedded cookie consent banner.
#[derive(Parser, Debug)]
#[command(name = "consent-embed", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Log filter override (e.g. debug, consent_embed=trace).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the banner iframe a page at ORIGIN would create.
    FrameUrl {
        /// Origin of the host page, e.g. https://shop.example
        #[arg(long)]
        origin: String,
        #[arg(long)]
        client_id: Option<String>,
    },
    /// Validate the config and print the resolved embed options.
    Check,
    /// Print the cookie written for a preferences object.
    Cookie {
        /// Preferences as JSON, e.g. '{"analytics":true}'
        preferences: String,
    },
    /// Check a category against a `document.cookie` string.
    Allowed { cookies: String, category: String },
    /// Probe `{endpoint}/{clientId}/client` on the consent API.
    Ping {
        #[arg(long)]
        client_id: Option<String>,
        /// Overrides `api_endpoint` from the config.
        #[arg(long)]
        endpoint: Option<String>,
    },
    /// Run a handshake and one consent decision against an in-memory page.
    Simulate {
        #[arg(long, default_value = "https://shop.example")]
        origin: String,
        #[arg(long)]
        client_id: Option<String>,
        /// Preferences the simulated widget reports, as JSON.
        #[arg(long, default_value = r#"{"necessary":true,"analytics":false,"marketing":true}"#)]
        preferences: String,
    },
}

pub fn parse() -> Args {
    Args::parse()
}

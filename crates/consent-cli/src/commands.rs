//! Subcommand implementations. Each returns its output as JSON so `main`
//! only prints.

use consent_common::{ConfigError, EmbedError};
use consent_config::{validate, ConsentConfig};
use consent_embed::connectivity;
use consent_embed::cookie;
use consent_embed::frame::{build_frame_url, FrameParams, FrameSpec};
use consent_embed::{Callbacks, EmbedController, EmbedHost, MemoryHost, WidgetMessage};
use serde_json::{json, Map, Value};
use tracing::{error, info};

use crate::cli::Command;

pub async fn run(command: Command, config: ConsentConfig) -> Result<Value, EmbedError> {
    match command {
        Command::FrameUrl { origin, client_id } => {
            frame_preview(&config, &origin, &resolve_client_id(client_id, &config)?)
        }
        Command::Check => check(&config),
        Command::Cookie { preferences } => {
            let set_cookie = cookie::set_cookie_string(&parse_preferences(&preferences)?)?;
            Ok(json!({ "set_cookie": set_cookie }))
        }
        Command::Allowed { cookies, category } => Ok(json!({
            "category": category,
            "allowed": cookie::is_allowed(&cookies, &category),
        })),
        Command::Ping {
            client_id,
            endpoint,
        } => {
            let client_id = resolve_client_id(client_id, &config)?;
            let endpoint = endpoint
                .or_else(|| config.embed.api_endpoint.clone())
                .ok_or(ConfigError::MissingEndpoint)?;
            let report = connectivity::probe(&endpoint, &client_id).await?;
            Ok(json!(report))
        }
        Command::Simulate {
            origin,
            client_id,
            preferences,
        } => {
            let client_id = resolve_client_id(client_id, &config)?;
            simulate(&config, &origin, &client_id, parse_preferences(&preferences)?).await
        }
    }
}

/// The command-line client id wins over the config file's.
fn resolve_client_id(arg: Option<String>, config: &ConsentConfig) -> Result<String, ConfigError> {
    arg.or_else(|| config.client_id.clone())
        .filter(|id| !id.trim().is_empty())
        .ok_or(ConfigError::MissingClientId)
}

fn parse_preferences(text: &str) -> Result<Value, EmbedError> {
    match serde_json::from_str::<Value>(text) {
        Ok(value) if value.is_object() => Ok(value),
        Ok(other) => Err(EmbedError::MessageProcessing(format!(
            "preferences must be a JSON object, got {other}"
        ))),
        Err(e) => Err(EmbedError::MessageProcessing(format!(
            "preferences are not JSON: {e}"
        ))),
    }
}

fn check(config: &ConsentConfig) -> Result<Value, EmbedError> {
    validate(config)?;
    let options = &config.embed;
    Ok(json!({
        "client_id": config.client_id,
        "deployment_mode": options.deployment_mode,
        "frame_host": options.frame_host(),
        "handshake_timeout_ms": options.handshake_timeout().as_millis() as u64,
        "requires_origin_match": options.deployment_mode.requires_origin_match(),
        "options": options,
    }))
}

fn frame_preview(
    config: &ConsentConfig,
    origin: &str,
    client_id: &str,
) -> Result<Value, EmbedError> {
    let location = MemoryHost::with_origin(origin).location();
    let options = &config.embed;
    let url = build_frame_url(
        options.frame_host(),
        &location.origin,
        FrameParams {
            client_id,
            domain: options.domain_or(&location.hostname),
            endpoint: options.api_endpoint.as_deref(),
        },
    )?;
    let spec = FrameSpec::new(url, options.sandbox.as_str());
    let attributes: Map<String, Value> = spec
        .attributes()
        .iter()
        .map(|(name, value)| (name.to_string(), json!(value)))
        .collect();

    Ok(json!({
        "src": spec.url.as_str(),
        "sandbox": spec.sandbox,
        "attributes": attributes,
        "style": spec.style.css_text(),
        "target_origin": options.target_origin(&location.origin),
    }))
}

/// Drive a controller through `initialized`, one `preferencesChanged`
/// and a `show` command, against a page that exists only in memory.
async fn simulate(
    config: &ConsentConfig,
    origin: &str,
    client_id: &str,
    preferences: Value,
) -> Result<Value, EmbedError> {
    let host = MemoryHost::with_origin(origin);
    let callbacks = Callbacks::new()
        .on_initialized(|data| {
            info!(%data, "widget initialized");
            Ok(())
        })
        .on_preferences_changed(|data| {
            info!(%data, "preferences changed");
            Ok(())
        })
        .on_error(|err| error!(error = %err, "simulated banner error"));
    let banner = EmbedController::new(client_id, config.embed.clone(), callbacks, host.clone())?;

    let answer = async {
        tokio::task::yield_now().await;
        if let Some(frame) = host.last_frame() {
            host.post_from_frame(frame, WidgetMessage::to_value("initialized", json!({})));
        }
    };
    let (initialized, ()) = tokio::join!(banner.init(), answer);
    initialized?;

    if let Some(frame) = banner.frame() {
        host.post_from_frame(
            frame,
            WidgetMessage::to_value("preferencesChanged", preferences.clone()),
        );
    }
    banner.show().await;

    let allowed: Map<String, Value> = preferences
        .as_object()
        .into_iter()
        .flat_map(|map| map.keys())
        .map(|category| (category.clone(), json!(banner.is_allowed(category))))
        .collect();
    let posted: Vec<Value> = host.posted().iter().map(|p| json!(p.command)).collect();

    Ok(json!({
        "snapshot": banner.debug_snapshot(),
        "cookie": host.cookies(),
        "allowed": allowed,
        "posted": posted,
    }))
}

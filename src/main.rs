use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use form_flow::channels::CliChannel;
use form_flow::config::EngineConfig;
use form_flow::form::{Catalog, EngineDeps, FormFlowEngine, SystemClock};
use form_flow::routes::{FormRouteState, form_routes};
use form_flow::store::{
    Event, JsonFileSessionStore, MemoryEventStore, MemoryRegistrationStore, MemoryUserStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = EngineConfig::from_env().context("invalid configuration")?;

    let events = match &config.events_path {
        Some(path) => load_events(path).await?,
        None => sample_events(),
    };

    eprintln!("📝 Form Flow v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Sessions: {}", config.sessions_path.display());
    eprintln!("   Events: {}", events.len());
    if let Some(port) = config.http_port {
        eprintln!("   Status API: http://0.0.0.0:{}/api/forms", port);
    }
    eprintln!("   /start [event_id] to begin, /progress, /cancel, /quit to exit.\n");

    // ── Collaborators ────────────────────────────────────────────────────
    let event_store = Arc::new(MemoryEventStore::new(events));
    let channel = Arc::new(CliChannel::new(config.cli_user_id.clone()));

    let catalog = Arc::new(
        Catalog::load(event_store.as_ref())
            .await
            .context("failed to build question catalog")?,
    );

    let deps = EngineDeps {
        users: Arc::new(MemoryUserStore::new()),
        registrations: Arc::new(MemoryRegistrationStore::new()),
        events: event_store,
        messenger: channel.clone(),
        notifier: channel.clone(),
        sessions: Arc::new(JsonFileSessionStore::new(config.sessions_path.clone())),
        clock: Arc::new(SystemClock),
    };
    let engine = Arc::new(FormFlowEngine::new(catalog, deps, &config).await);

    // ── Status routes ────────────────────────────────────────────────────
    if let Some(port) = config.http_port {
        let app = form_routes(FormRouteState {
            engine: Arc::clone(&engine),
        });
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
            .await
            .with_context(|| format!("failed to bind status API on port {port}"))?;
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
    }

    channel.run(engine).await?;

    eprintln!("👋 Bye");
    Ok(())
}

async fn load_events(path: &Path) -> anyhow::Result<Vec<Event>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read events from {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse events in {}", path.display()))
}

/// Two events to try the form against when no events file is configured.
fn sample_events() -> Vec<Event> {
    vec![
        Event {
            id: "play-night".into(),
            name: "Wild Ginger Play Night".into(),
            event_type: "play".into(),
            start_date: "2026-11-14".into(),
            start_time: "21:00".into(),
            end_time: "04:00".into(),
            location: "Tel Aviv".into(),
            description: "A night of consensual play.".into(),
            participant_commitment: "I commit to respecting every boundary.".into(),
            line_rules: "To confirm you have read the rules, write the word \"ginger\".".into(),
            place_rules: "No phones on the play floor.".into(),
        },
        Event {
            id: "cuddle-party".into(),
            name: "Wild Ginger Cuddle Party".into(),
            event_type: "cuddle".into(),
            start_date: "2026-11-28".into(),
            start_time: "20:00".into(),
            end_time: "23:30".into(),
            location: "Haifa".into(),
            description: "An evening of non-sexual touch and connection.".into(),
            ..Default::default()
        },
    ]
}

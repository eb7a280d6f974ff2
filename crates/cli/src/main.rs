mod edits;

use anyhow::Context;
use api_shared::{InterestAreaDto, PlaybackViewRes, PreviewRes};
use clap::{Parser, Subcommand};
use portal_client::HttpPortalBackend;
use portal_core::{
    config_from_env_values, load_catalog, resolve_catalog, CaptureSession, DateRangeType,
    DiaryViewer, PlaybackState, PlaybackView, PortalConfig,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "portal")]
#[command(about = "Patient portal diary CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the interest areas a diary would ask about
    Interests {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Record a diary
    Record {
        /// Time window: today or since-last
        #[arg(long, default_value = "since-last")]
        scope: DateRangeType,
        /// Free text for the diary
        #[arg(long)]
        text: Option<String>,
        /// Share the free text with the care team
        #[arg(long)]
        share_text: bool,
        /// Area-level answer, as AREA=TEXT
        #[arg(long = "answer", value_name = "AREA=TEXT")]
        answers: Vec<String>,
        /// Trigger answer, as AREA::TRIGGER=TEXT
        #[arg(long = "trigger", value_name = "AREA::TRIGGER=TEXT")]
        triggers: Vec<String>,
        /// Share an interest area's answer
        #[arg(long = "share", value_name = "AREA")]
        shares: Vec<String>,
        /// Share one trigger answer
        #[arg(long = "share-trigger", value_name = "AREA::TRIGGER")]
        share_triggers: Vec<String>,
        /// Print the body that would be sent instead of sending it
        #[arg(long)]
        dry_run: bool,
    },
    /// Show a stored diary
    View {
        /// Diary id
        diary_id: String,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("portal=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use 'portal --help' for commands");
        return Ok(());
    };

    let cfg = config_from_env_values(
        std::env::var("PORTAL_BACKEND_URL").ok(),
        std::env::var("PORTAL_ACCESS_TOKEN").ok(),
        std::env::var("PORTAL_REQUEST_TIMEOUT_SECS").ok(),
        std::env::var("PORTAL_CATALOG_FALLBACK").ok(),
    )?;
    let backend = Arc::new(HttpPortalBackend::new(&cfg)?);

    match command {
        Commands::Interests { json } => {
            let session = open_session(&cfg, &backend).await?;
            if json {
                let areas: Vec<InterestAreaDto> = session
                    .areas()
                    .iter()
                    .map(|area| InterestAreaDto::from(area.as_ref()))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&areas)?);
            } else if session.areas().is_empty() {
                println!("No interest areas found.");
            } else {
                for area in session.areas() {
                    println!("[{}] {}", area.id, area.label());
                    for trigger in &area.triggers {
                        println!("    [{}] {}", trigger.id, trigger.label());
                    }
                }
            }
        }
        Commands::Record {
            scope,
            text,
            share_text,
            answers,
            triggers,
            shares,
            share_triggers,
            dry_run,
        } => {
            let mut session = open_session(&cfg, &backend).await?;
            session.set_date_range(scope);
            session.set_free_text(text.unwrap_or_default());
            session.set_share_text(share_text);
            edits::apply(&mut session, &answers, &triggers, &shares, &share_triggers)?;

            let progress = session.progress();
            if dry_run {
                let preview = PreviewRes::from_folded(&session.preview())?;
                println!("{}", serde_json::to_string_pretty(&preview.body)?);
                for collision in &preview.name_collisions {
                    eprintln!(
                        "warning: '{}' in '{}' was answered more than once; the last answer is sent",
                        collision.key.as_deref().unwrap_or("(area)"),
                        collision.area
                    );
                }
            } else {
                match session.submit(backend.as_ref()).await {
                    Ok(()) => println!(
                        "Diary saved ({}/{} interest areas answered).",
                        progress.answered, progress.total
                    ),
                    Err(e) => {
                        eprintln!("{}", e.user_message());
                        return Err(e).context("submitting diary");
                    }
                }
            }
        }
        Commands::View { diary_id, json } => {
            tracing::debug!(%diary_id, "loading stored diary");
            let viewer = DiaryViewer::new(backend);
            match viewer.show(Some(&diary_id)).await {
                Some(PlaybackState::Loaded(view)) if json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&PlaybackViewRes::from(&view))?
                    );
                }
                Some(PlaybackState::Loaded(view)) => print_view(&view),
                Some(PlaybackState::Failed(e)) => {
                    eprintln!("{}", e.user_message());
                    return Err(e).context(format!("viewing diary {diary_id}"));
                }
                None => {}
            }
        }
    }

    Ok(())
}

async fn open_session(
    cfg: &PortalConfig,
    backend: &HttpPortalBackend,
) -> anyhow::Result<CaptureSession> {
    let loaded = load_catalog(backend).await;
    match resolve_catalog(loaded, cfg.catalog_fallback()) {
        Ok((areas, degraded)) => {
            if degraded {
                tracing::warn!("Interests could not be loaded; showing a sample interest area.");
            }
            tracing::debug!(areas = areas.len(), degraded, "capture session opened");
            Ok(CaptureSession::new(areas, degraded))
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            Err(e).context("loading interest catalog")
        }
    }
}

fn shared_marker(shared: bool) -> &'static str {
    if shared {
        " (shared with care team)"
    } else {
        ""
    }
}

fn print_view(view: &PlaybackView) {
    println!(
        "Diary {} - {} ({})",
        view.diary_id,
        view.date_display.as_deref().unwrap_or("no date"),
        view.scope_label
    );

    if !view.has_content {
        println!("This diary has no content.");
        return;
    }

    if let Some(note) = &view.general_note {
        println!();
        println!("General note{}", shared_marker(note.shared));
        println!("  {}", note.text);
    }

    for section in &view.sections {
        println!();
        println!("{}{}", section.title, shared_marker(section.shared));
        for answer in &section.answers {
            println!("  {}: {}", answer.label, answer.value);
        }
    }
}

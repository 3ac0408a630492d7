//! Subcommand handlers.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use serde_json::json;
use tracing::{info, warn};

use promptlift_bridge::{BackgroundBridge, BridgeClient, FileStore, RewriteClient, SystemTabOpener};
use promptlift_config::{Config, ConfigValidator};
use promptlift_engine::page::ViewportInfo;
use promptlift_engine::pending::InsertionState;
use promptlift_engine::{
    DeliveryOutcome, EnhanceOutcome, PageController, PageTree, PendingInsertionStore,
    PlatformRegistry, SnapshotPage,
};

/// Housekeeping cadence while a streamed rewrite is rendering.
const TICK_INTERVAL: Duration = Duration::from_millis(100);

async fn connect(config: &Config) -> anyhow::Result<BridgeClient> {
    let store = FileStore::open(config.storage.path.clone())
        .await
        .with_context(|| format!("opening storage at {}", config.storage.path.display()))?;
    let rewriter =
        RewriteClient::new(config.remote.endpoint.clone()).with_api_key(config.remote.api_key.clone());
    let background = BackgroundBridge::new(Arc::new(store), Arc::new(SystemTabOpener), rewriter);

    let pruned = background.startup().await?;
    if !pruned.is_empty() {
        info!("Removed stale storage keys: {}", pruned.join(", "));
    }
    Ok(BridgeClient::new(Arc::new(background)))
}

fn load_registry(config: &Config) -> anyhow::Result<Arc<PlatformRegistry>> {
    Ok(Arc::new(PlatformRegistry::from_config(&config.platforms)?))
}

fn load_page(path: &Path) -> anyhow::Result<SnapshotPage> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    SnapshotPage::from_json(&raw).with_context(|| format!("parsing snapshot {}", path.display()))
}

async fn page_controller(config: &Config, page: SnapshotPage) -> anyhow::Result<PageController<SnapshotPage>> {
    Ok(PageController::new(page, load_registry(config)?, connect(config).await?, config))
}

/// Text currently in the resolved input, if any.
fn input_text(controller: &PageController<SnapshotPage>) -> Option<String> {
    let target = controller.resolved_target()?;
    let page = controller.page();
    let page = page.lock();
    page.read_text(target.editable)
}

pub(crate) fn platforms(config: &Config, format: &str) -> anyhow::Result<()> {
    let registry = load_registry(config)?;

    match format {
        "json" => {
            let list: Vec<_> = registry
                .list()
                .iter()
                .map(|p| {
                    json!({
                        "id": p.id,
                        "name": p.name,
                        "hosts": p.url.hosts,
                        "launchUrl": p.launch_url,
                        "anchor": p.anchor_hint.as_str(),
                        "commitOrder": p.commit_order.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&list)?);
        }
        _ => {
            println!("{:<12} {:<16} {:<14} {}", "ID", "NAME", "ANCHOR", "LAUNCH URL");
            println!("{}", "-".repeat(80));
            for p in registry.list() {
                println!(
                    "{:<12} {:<16} {:<14} {}",
                    p.id,
                    p.name,
                    p.anchor_hint.as_str(),
                    p.launch_url
                );
            }
        }
    }
    Ok(())
}

pub(crate) async fn resolve(config: &Config, snapshot: &Path) -> anyhow::Result<()> {
    let controller = page_controller(config, load_page(snapshot)?).await?;
    let report = controller.initialize().await?;

    println!("Platform: {}", report.platform.as_deref().unwrap_or("generic"));
    match report.target {
        Some(target) => {
            println!("Tier:     {:?}", target.tier);
            println!("Rule:     {}", target.rule);
            println!("Score:    {:.1}", target.score);
            println!("Input:    {} (editable {})", target.container, target.editable);
            println!("Anchor:   {}", controller.current_anchor());
        }
        None => println!("No input target found."),
    }
    Ok(())
}

pub(crate) async fn enhance(
    config: &Config,
    snapshot: &Path,
    text: Option<&str>,
    stream: bool,
) -> anyhow::Result<()> {
    let controller = page_controller(config, load_page(snapshot)?).await?;
    controller.initialize().await?;

    let outcome = if stream {
        let work = controller.enhance_streaming(text);
        tokio::pin!(work);
        loop {
            tokio::select! {
                outcome = &mut work => break outcome?,
                _ = tokio::time::sleep(TICK_INTERVAL) => {
                    controller.tick();
                }
            }
        }
    } else {
        controller.enhance(text).await?
    };

    match outcome {
        EnhanceOutcome::Applied { strategy, .. } => {
            if let Some(strategy) = strategy {
                info!("Committed with {}", strategy);
            }
            println!("{}", input_text(&controller).unwrap_or_default());
        }
        EnhanceOutcome::Suppressed => warn!("Duplicate request suppressed"),
        EnhanceOutcome::Superseded => warn!("Request superseded"),
    }
    Ok(())
}

pub(crate) async fn open(config: &Config, platform: &str, text: &str) -> anyhow::Result<()> {
    let blank = SnapshotPage::new("about:blank", ViewportInfo::default());
    let controller = page_controller(config, blank).await?;
    let insertion = controller.open_in_platform(platform, text).await?;
    println!(
        "Pending insertion for {} stored until {}",
        insertion.platform_id,
        insertion.expires_at().to_rfc3339()
    );
    Ok(())
}

pub(crate) async fn deliver(config: &Config, snapshot: &Path) -> anyhow::Result<()> {
    let controller = page_controller(config, load_page(snapshot)?).await?;
    let report = controller.initialize().await?;

    match report.delivery {
        DeliveryOutcome::Delivered {
            platform_id,
            clicked_send,
        } => {
            println!("Delivered to {} (send clicked: {})", platform_id, clicked_send);
            println!("{}", input_text(&controller).unwrap_or_default());
        }
        DeliveryOutcome::None => println!("Nothing pending."),
        DeliveryOutcome::Waiting => println!("Pending insertion is waiting for an input."),
        DeliveryOutcome::Expired => println!("Pending insertion expired and was removed."),
        DeliveryOutcome::OtherPlatform(id) => println!("Pending insertion is for {}.", id),
        DeliveryOutcome::Failed(message) => bail!("delivery failed: {}", message),
    }
    Ok(())
}

pub(crate) async fn pending(config: &Config, clear: bool) -> anyhow::Result<()> {
    let store = PendingInsertionStore::new(connect(config).await?, config.pending.ttl());
    if clear {
        store.clear().await?;
        println!("Pending insertion cleared.");
        return Ok(());
    }

    match store.load().await? {
        InsertionState::None => println!("Nothing pending."),
        state => println!("{}", serde_json::to_string_pretty(&state)?),
    }
    Ok(())
}

pub(crate) fn check(config: &Config) -> anyhow::Result<()> {
    let result = ConfigValidator::validate(config);
    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for error in &result.errors {
        println!("error: {}: {}", error.path, error.message);
    }
    if !result.is_valid() {
        bail!("{} configuration error(s)", result.errors.len());
    }
    load_registry(config)?;
    println!("Configuration OK.");
    Ok(())
}

//! Headless session: load a page into memory and navigate away from it.

use anyhow::{Result, bail};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use swapnav_client::nav::{ClickEvent, ElementInfo, EventTarget, IntentEvent, IntentKind, eligible_link};
use swapnav_client::{
    FetchClient, FetchConfig, FetchPurpose, MemoryHost, NavConfig, NavOutcome, NavigationManager, PageHost,
};
use swapnav_core::AppConfig;
use url::Url;

#[derive(Debug, Serialize)]
struct SwapReport {
    outcome: &'static str,
    target: String,
    error: Option<String>,
    location: String,
    title: String,
    history_entries: usize,
    native_loads: Vec<String>,
}

pub async fn swap(config: &AppConfig, from: Url, to: &str) -> Result<Value> {
    let client = FetchClient::new(FetchConfig::from(config))?;
    let page = client.fetch_document(&from, FetchPurpose::Navigate).await?;

    let host = Arc::new(MemoryHost::from_html(page.final_url.clone(), &page.text(), &config.content_selector)?);
    let manager = NavigationManager::init(host.clone(), Arc::new(client), NavConfig::from(config))?;

    let target = EventTarget::link(ElementInfo::anchor(to));
    if let Err(reason) = eligible_link(&target, &manager.current_url()) {
        bail!("{to:?} would not be intercepted: {reason}");
    }

    let hover = IntentEvent { kind: IntentKind::PointerEnter, target: target.clone() };
    if let Some(prefetch) = manager.handle_intent(&hover) {
        prefetch.await?;
    }
    let Some(navigation) = manager.handle_click(&ClickEvent::primary(target)) else {
        bail!("click on {to:?} was not intercepted");
    };

    let (outcome, target, error) = match navigation.await {
        NavOutcome::Swapped { url } => ("swapped", url, None),
        NavOutcome::ScrollRestored { url } => ("scroll_restored", url, None),
        NavOutcome::Superseded { url } => ("superseded", url, None),
        NavOutcome::FellBack { url, error } => ("fell_back", url, Some(error.to_string())),
    };

    Ok(serde_json::to_value(SwapReport {
        outcome,
        target: target.to_string(),
        error,
        location: host.location().to_string(),
        title: host.title(),
        history_entries: host.history_len(),
        native_loads: host.native_loads().iter().map(Url::to_string).collect(),
    })?)
}

// src/services/ports.rs

//! Port collector service.
//!
//! Builds the `current` snapshot by listing the vessels in port at every
//! monitored port.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use reqwest::Client;
use scraper::{Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{Config, PortInfo, Snapshot, SnapshotEntry, VesselId};
use crate::utils::{extract_vessel_id, http, resolve};

const DETAILS_LINK: &str = ".info_details[href]";
const VESSEL_LINKS: &str = ".myst-table a[href]";

/// Summary of a collection run.
#[derive(Debug, Default)]
pub struct CollectOutcome {
    pub snapshot: Snapshot,
    pub port_total: usize,
    pub port_failures: usize,
}

/// Service for listing vessels currently in the monitored ports.
pub struct PortCollector {
    config: Arc<Config>,
    client: Client,
}

impl PortCollector {
    /// Create a new collector with the given configuration.
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let client = http::create_async_client(&config.tracker)?;
        Ok(Self { config, client })
    }

    /// Create a collector sharing an existing client.
    pub fn with_client(config: Arc<Config>, client: Client) -> Self {
        Self { config, client }
    }

    /// Visit every configured port in order.
    ///
    /// A vessel listed at several ports is attributed to the first one.
    /// Ports that fail are logged and skipped.
    pub async fn collect(&self) -> Result<CollectOutcome> {
        if self.config.ports.is_empty() {
            return Err(AppError::config("no ports configured"));
        }

        let delay = Duration::from_millis(self.config.tracker.port_delay_ms);
        let seen_at = Local::now().naive_local();
        let mut outcome = CollectOutcome {
            port_total: self.config.ports.len(),
            ..CollectOutcome::default()
        };

        for port in &self.config.ports {
            log::info!("Listing vessels at {} (id {})", port.name, port.id);
            match self.fetch_port_vessels(port).await {
                Ok(ids) => {
                    let mut added = 0;
                    for id in ids {
                        if !outcome.snapshot.contains(&id) {
                            outcome
                                .snapshot
                                .upsert(SnapshotEntry::new(id, &port.name, seen_at));
                            added += 1;
                        }
                    }
                    log::info!("  -> {} new vessels at {}", added, port.name);
                }
                Err(error) => {
                    outcome.port_failures += 1;
                    log::warn!("Failed to list vessels at {}: {}", port.name, error);
                }
            }

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        Ok(outcome)
    }

    fn port_url(&self, port: &PortInfo) -> String {
        format!(
            "{}/?port={}",
            self.config.tracker.base_url.trim_end_matches('/'),
            port.id
        )
    }

    /// Follow a port's details link and read its vessel table.
    async fn fetch_port_vessels(&self, port: &PortInfo) -> Result<Vec<VesselId>> {
        let port_url = self.port_url(port);
        let details_url = {
            let document = http::fetch_page_async(&self.client, &port_url).await?;
            find_details_link(&document, &port_url)?
        }
        .ok_or_else(|| AppError::collect(&port.name, "no port details link"))?;

        let document = http::fetch_page_async(&self.client, &details_url).await?;
        extract_vessel_ids(&document)
    }
}

/// Absolute URL of the port details page linked from a port page.
pub fn find_details_link(document: &Html, page_url: &str) -> Result<Option<String>> {
    let selector = parse_selector(DETAILS_LINK)?;
    Ok(document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .next()
        .map(|href| resolve(page_url, href).unwrap_or_else(|| href.to_string())))
}

/// Vessel ids linked from a port's vessel table, first occurrence first.
pub fn extract_vessel_ids(document: &Html) -> Result<Vec<VesselId>> {
    let selector = parse_selector(VESSEL_LINKS)?;
    let mut seen = HashSet::new();
    Ok(document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(extract_vessel_id)
        .filter(|id| seen.insert(id.clone()))
        .collect())
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

// src/services/vessel_page.rs

//! Vessel page scraper.
//!
//! Reads the current trip panel and the first row of the recent-trips table
//! from a vessel's page on the tracking site.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};

use crate::error::{LookupError, Result};
use crate::models::{TrackerConfig, TripLeg, TripRecord, VesselId};
use crate::services::TripLookup;
use crate::utils::http;

const CURRENT_TRIP: &str = "#vpage-current-trip";
const ARRIVAL_BLOCK: &str = "div.myst-arrival-cont";
const PORT_NAME: &str = "h3";
const DATE_LINE: &str = "span.line";
const LAST_TRIPS_ROW: &str = "#ft-lasttrips tbody tr";
const CELL: &str = "td";

/// `TripLookup` backed by the tracking site's vessel pages.
pub struct VesselPageScraper {
    client: Client,
    base_url: String,
    delay: Duration,
}

impl VesselPageScraper {
    /// Create a scraper with its own HTTP client.
    pub fn new(config: &TrackerConfig) -> Result<Self> {
        Ok(Self::with_client(http::create_async_client(config)?, config))
    }

    /// Create a scraper sharing an existing client.
    pub fn with_client(client: Client, config: &TrackerConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            delay: Duration::from_millis(config.request_delay_ms),
        }
    }

    fn vessel_url(&self, id: &VesselId) -> String {
        format!("{}/vessels/vessel-mmsi-{}-imo-0", self.base_url, id)
    }

    async fn fetch(&self, url: &str) -> std::result::Result<String, LookupError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl TripLookup for VesselPageScraper {
    async fn lookup(&self, id: &VesselId) -> std::result::Result<Option<TripRecord>, LookupError> {
        let url = self.vessel_url(id);
        log::debug!("Fetching vessel page {}", url);

        let body = self.fetch(&url).await?;
        let document = Html::parse_document(&body);
        let record = parse_vessel_page(&document)?;
        Ok((!record.is_empty()).then_some(record))
    }

    fn pacing(&self) -> Duration {
        self.delay
    }
}

/// Extract the current and last completed trip from a vessel page.
///
/// A page without the current trip panel has not rendered its trip data and
/// is reported as a parse failure.
pub fn parse_vessel_page(document: &Html) -> std::result::Result<TripRecord, LookupError> {
    let panel_sel = parse_selector(CURRENT_TRIP)?;
    let Some(panel) = document.select(&panel_sel).next() else {
        return Err(LookupError::Parse(format!("no {CURRENT_TRIP} section")));
    };

    Ok(TripRecord {
        current: parse_current_trip(panel)?,
        previous: parse_last_trip(document)?,
    })
}

fn parse_current_trip(panel: ElementRef<'_>) -> std::result::Result<TripLeg, LookupError> {
    let block_sel = parse_selector(ARRIVAL_BLOCK)?;
    let port_sel = parse_selector(PORT_NAME)?;
    let line_sel = parse_selector(DATE_LINE)?;

    let blocks: Vec<ElementRef<'_>> = panel.select(&block_sel).collect();
    let [departure, arrival, ..] = blocks.as_slice() else {
        return Ok(TripLeg::default());
    };

    let port = |block: &ElementRef<'_>| block.select(&port_sel).next().map(element_text);
    let when = |block: &ElementRef<'_>| {
        let lines: Vec<String> = block.select(&line_sel).map(element_text).collect();
        match lines.as_slice() {
            [date, time, ..] => Some(format!("{date} {time}")),
            _ => None,
        }
    };

    Ok(TripLeg::new(
        port(departure),
        when(departure),
        port(arrival),
        when(arrival),
    ))
}

fn parse_last_trip(document: &Html) -> std::result::Result<TripLeg, LookupError> {
    let row_sel = parse_selector(LAST_TRIPS_ROW)?;
    let cell_sel = parse_selector(CELL)?;

    let Some(row) = document.select(&row_sel).next() else {
        return Ok(TripLeg::default());
    };
    let cells: Vec<String> = row.select(&cell_sel).map(element_text).collect();
    let [_, origin, departure, destination, arrival, ..] = cells.as_slice() else {
        return Ok(TripLeg::default());
    };

    log::debug!("Last trip found: {} -> {}", origin, destination);
    Ok(TripLeg::new(
        Some(origin.clone()),
        Some(departure.clone()),
        Some(destination.clone()),
        Some(arrival.clone()),
    ))
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_selector(s: &str) -> std::result::Result<Selector, LookupError> {
    Selector::parse(s).map_err(|e| LookupError::Parse(format!("invalid selector '{s}': {e:?}")))
}

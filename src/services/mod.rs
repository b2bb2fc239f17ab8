//! Service layer for the tracker application.
//!
//! This module contains the site-facing collaborators:
//! - Trip lookup seam (`TripLookup`)
//! - Vessel page scraping (`VesselPageScraper`)
//! - Port vessel listing (`PortCollector`)

mod lookup;
mod ports;
mod vessel_page;

pub use lookup::TripLookup;
pub use ports::{CollectOutcome, PortCollector, extract_vessel_ids, find_details_link};
pub use vessel_page::{VesselPageScraper, parse_vessel_page};

//! maps-scout: pull business listings out of a Google Maps search.
//!
//! The browser is driven through [`scrapers::BrowserSurface`]; the
//! [`extraction`] module holds the scan / paginate loop and the Ctrl+C
//! checkpoint path, and [`export`] writes the results as CSV.

pub mod cli;
pub mod config;
pub mod export;
pub mod extraction;
pub mod models;
pub mod scrapers;

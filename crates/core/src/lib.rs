// ABOUTME: Library entry point for the horoscope scraper.
// ABOUTME: Re-exports extraction, the sign table, the HTTP session, and the CSV log.

//! Horóscopo - scrapes daily per-sign predictions from a horoscope article.
//!
//! The pipeline is fetch → extract → append:
//!
//! ```no_run
//! use chrono::Local;
//! use horoscopo_core::{extract_predictions, CsvLog, HttpSession};
//!
//! fn main() -> horoscopo_core::Result<()> {
//!     let session = HttpSession::builder().build()?;
//!     let html = session.get_text("https://example.com/horoscopo-de-hoy")?;
//!     let predictions = extract_predictions(&html);
//!     CsvLog::new("horoscopo.csv").record(Local::now().date_naive(), &predictions)?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod extract;
pub mod options;
pub mod resource;
pub mod signs;
pub mod store;

pub use crate::error::{Error, Result};
pub use crate::extract::{
    extract_predictions, extract_predictions_with, BlockPolicy, ExtractOptions, Prediction,
    DEFAULT_SECTION_MARKER,
};
pub use crate::options::{
    RetryMethod, RetryPolicy, SessionBuilder, SessionOptions, DEFAULT_USER_AGENT,
};
pub use crate::resource::{FetchResult, HttpSession};
pub use crate::signs::{match_sign, sign_from_heading, split_prediction, Sign, SignMatch};
pub use crate::store::{rows_for, CsvLog, LogRow};

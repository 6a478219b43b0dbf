//! Date-window timeline retrieval
//!
//! A timeline crawl has two phases per entity:
//! - Locating the first page that overlaps the window ([`BoundaryLocator`])
//! - Walking forward from that page until the window start is passed
//!   ([`WindowCrawler`])

mod crawler;
mod locator;

pub use crawler::{StopReason, WindowCrawl, WindowCrawler};
pub use locator::{BoundaryLocator, LocateError};

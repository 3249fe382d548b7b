pub mod extractor;
pub mod interrupt;
pub mod navigator;
pub mod pagination;
pub mod parse;
pub mod search;
pub mod session;

pub use extractor::FieldExtractor;
pub use interrupt::InterruptHandler;
pub use navigator::ListingNavigator;
pub use pagination::PaginationController;
pub use search::{open_search, search_url, SearchError};
pub use session::{
    ExtractionSession, SessionEnd, SessionReport, SessionRunner, SessionSettings, TerminationReason,
};

/// Scrollable results list
pub const RESULTS_FEED: &str = "div[role=\"feed\"]";

/// One link per rendered listing in the results list
pub const LISTING_LINKS: &str = "div[role=\"feed\"] a[href*=\"/maps/place/\"]";

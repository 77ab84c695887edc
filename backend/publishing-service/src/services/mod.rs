/// Business logic layer for publishing-service
///
/// - Post service: lifecycle (draft/publish/update), reads and listings
/// - Engagement service: like ledger, counters and reconciliation
/// - Read accounting: background read counters
/// - Author service: profiles and author search
pub mod authors;
pub mod engagement;
pub mod posts;
pub mod reads;
pub mod slug;

pub use authors::AuthorService;
pub use engagement::{EngagementService, ReconcileReport};
pub use posts::{GetPostOptions, ListingLimits, PostService};
pub use reads::ReadAccounting;

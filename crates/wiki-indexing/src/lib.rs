//! Background indexing for the wiki.
//!
//! This crate builds several independent indexes from one list of page
//! identifiers, concurrently, while reporting progress per index.
//!
//! ## Key Components
//!
//! - [`MultiMaintainer`]: Applies one page operation to every index, joining errors
//! - [`BackgroundIndexingCoordinator`]: One bounded queue and worker pool per index
//! - [`IndexingProgress`]: Snapshot of overall and per-index progress
//!
//! ## Architecture
//!
//! 1. The caller hands the full identifier list to
//!    [`BackgroundIndexingCoordinator::start_background`]
//! 2. A distributor task per index feeds that index's bounded queue
//! 3. The index's workers drain the queue into `add_page_to_index`
//! 4. Failures are recorded per index and never stop other pages or indexes
//! 5. The run completes once every index has indexed every page
//!
//! ## Example
//!
//! ```ignore
//! use wiki_indexing::BackgroundIndexingCoordinator;
//!
//! let coordinator = BackgroundIndexingCoordinator::new(vec![
//!     (frontmatter_index, 4),
//!     (text_index, 2),
//! ]);
//! coordinator.start_background(page_ids);
//! coordinator.wait_until_idle().await;
//! let progress = coordinator.get_progress();
//! ```

pub mod coordinator;
pub mod maintainer;
pub mod pool;
pub mod progress;

pub use coordinator::BackgroundIndexingCoordinator;
pub use maintainer::MultiMaintainer;
pub use pool::queue_capacity;
pub use progress::{IndexingProgress, SingleIndexProgress};

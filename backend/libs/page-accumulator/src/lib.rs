//! # Page Accumulator
//!
//! Client-side "load more" pagination over offset-paged listings.
//!
//! A listing endpoint returns one page at a time for a filter, and a paired
//! count endpoint returns the number of documents matching the same filter.
//! The accumulator merges successive pages into one growing list:
//!
//! - page 1 replaces the list and issues the one-time count request
//! - the page after the loaded one appends in fetch order, without
//!   duplicate elimination; earlier pages are not fetched again and later
//!   ones are clamped to the next page
//! - a different filter discards everything and restarts at page 1
//! - `has_more` is answered locally from the cached total
//!
//! ## Consistency
//!
//! `total_docs` is fetched once per filter and never refreshed, so it goes
//! stale if documents are inserted while the client scrolls. Offset windows
//! also shift under concurrent inserts, which can repeat or skip items at
//! page boundaries. Both are accepted in exchange for fewer round trips.
//!
//! ## Usage
//!
//! ```ignore
//! let mut feed = PageAccumulator::new();
//! feed.load(&source, filter.clone(), 1).await?;
//! while feed.has_more() {
//!     feed.load_more(&source).await?;
//! }
//! ```

use async_trait::async_trait;
use serde::Serialize;

/// A paged, counted listing for a filter type `F`.
#[async_trait]
pub trait PageSource<F: Sync>: Send + Sync {
    type Item: Send;
    type Error: Send;

    /// Fetch page `page` (1-based) of the listing for `filter`.
    async fn fetch_page(&self, filter: &F, page: u32) -> Result<Vec<Self::Item>, Self::Error>;

    /// Count every document matching `filter`.
    async fn count(&self, filter: &F) -> Result<u64, Self::Error>;
}

/// Snapshot of the accumulated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageState<T> {
    pub results: Vec<T>,
    pub page: u32,
    pub total_docs: u64,
}

impl<T> PageState<T> {
    pub fn has_more(&self) -> bool {
        (self.results.len() as u64) < self.total_docs
    }
}

/// Growing result list for the current filter.
#[derive(Debug, Clone)]
pub struct PageAccumulator<F, T> {
    filter: Option<F>,
    state: Option<PageState<T>>,
}

impl<F, T> Default for PageAccumulator<F, T> {
    fn default() -> Self {
        Self {
            filter: None,
            state: None,
        }
    }
}

impl<F, T> PageAccumulator<F, T>
where
    F: PartialEq + Clone + Send + Sync,
    T: Send,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(&self) -> Option<&F> {
        self.filter.as_ref()
    }

    pub fn state(&self) -> Option<&PageState<T>> {
        self.state.as_ref()
    }

    pub fn results(&self) -> &[T] {
        self.state
            .as_ref()
            .map(|state| state.results.as_slice())
            .unwrap_or(&[])
    }

    pub fn page(&self) -> Option<u32> {
        self.state.as_ref().map(|state| state.page)
    }

    pub fn total_docs(&self) -> Option<u64> {
        self.state.as_ref().map(|state| state.total_docs)
    }

    /// No round trip; compares the accumulated length with the cached total.
    pub fn has_more(&self) -> bool {
        self.state.as_ref().map(PageState::has_more).unwrap_or(false)
    }

    pub fn reset(&mut self) {
        self.filter = None;
        self.state = None;
    }

    /// Load `page` for `filter`, returning how many items the fetch produced.
    ///
    /// A filter different from the current one (or the first load) always
    /// restarts at page 1 regardless of `page`. For the current filter only
    /// the page after the loaded one is appended: a page that is already
    /// loaded returns `Ok(0)` without a round trip, and a page further ahead
    /// is clamped to the next one. On error the accumulated state is left
    /// untouched.
    pub async fn load<S>(&mut self, source: &S, filter: F, page: u32) -> Result<usize, S::Error>
    where
        S: PageSource<F, Item = T> + ?Sized,
    {
        let filter_changed = self.filter.as_ref() != Some(&filter);
        let loaded_page = self.state.as_ref().map(|state| state.page);
        let restart = filter_changed || loaded_page.is_none() || page <= 1;

        if restart {
            if filter_changed {
                tracing::debug!("page accumulator filter changed; restarting at page 1");
            }

            let results = source.fetch_page(&filter, 1).await?;
            let total_docs = source.count(&filter).await?;
            let fetched = results.len();

            self.filter = Some(filter);
            self.state = Some(PageState {
                results,
                page: 1,
                total_docs,
            });
            return Ok(fetched);
        }

        let Some(state) = self.state.as_mut() else {
            return Ok(0);
        };
        if page <= state.page {
            tracing::debug!(page, loaded = state.page, "page already loaded; skipping fetch");
            return Ok(0);
        }

        let next_page = state.page + 1;
        if page > next_page {
            tracing::debug!(page, next_page, "page jump clamped to the next page");
        }

        let batch = source.fetch_page(&filter, next_page).await?;
        let fetched = batch.len();
        state.results.extend(batch);
        state.page = next_page;
        Ok(fetched)
    }

    /// Fetch the page after the current one for the current filter.
    ///
    /// Returns `Ok(0)` without a round trip when nothing is loaded yet or the
    /// cached total says the list is complete.
    pub async fn load_more<S>(&mut self, source: &S) -> Result<usize, S::Error>
    where
        S: PageSource<F, Item = T> + ?Sized,
    {
        let (filter, next_page) = match (&self.filter, &self.state) {
            (Some(filter), Some(state)) if state.has_more() => (filter.clone(), state.page + 1),
            _ => return Ok(0),
        };
        self.load(source, filter, next_page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Numbers 1..=n, filtered by divisor, paged newest-first.
    struct Numbers {
        items: Mutex<Vec<u32>>,
        page_size: usize,
        count_calls: AtomicUsize,
        fail_pages: bool,
    }

    impl Numbers {
        fn new(n: u32, page_size: usize) -> Self {
            Self {
                items: Mutex::new((1..=n).rev().collect()),
                page_size,
                count_calls: AtomicUsize::new(0),
                fail_pages: false,
            }
        }

        fn matching(&self, divisor: u32) -> Vec<u32> {
            self.items
                .lock()
                .unwrap()
                .iter()
                .copied()
                .filter(|n| n % divisor == 0)
                .collect()
        }
    }

    #[async_trait]
    impl PageSource<u32> for Numbers {
        type Item = u32;
        type Error = String;

        async fn fetch_page(&self, divisor: &u32, page: u32) -> Result<Vec<u32>, String> {
            if self.fail_pages {
                return Err("listing unavailable".to_string());
            }
            let skip = (page as usize - 1) * self.page_size;
            Ok(self
                .matching(*divisor)
                .into_iter()
                .skip(skip)
                .take(self.page_size)
                .collect())
        }

        async fn count(&self, divisor: &u32) -> Result<u64, String> {
            self.count_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.matching(*divisor).len() as u64)
        }
    }

    #[tokio::test]
    async fn first_page_replaces_and_counts_once() {
        let source = Numbers::new(7, 5);
        let mut acc: PageAccumulator<u32, u32> = PageAccumulator::new();

        assert_eq!(acc.load(&source, 1, 1).await.unwrap(), 5);
        assert_eq!(acc.results(), &[7, 6, 5, 4, 3]);
        assert_eq!(acc.total_docs(), Some(7));
        assert!(acc.has_more());

        assert_eq!(acc.load(&source, 1, 2).await.unwrap(), 2);
        assert_eq!(acc.results(), &[7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(acc.page(), Some(2));
        assert!(!acc.has_more());
        assert_eq!(source.count_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn accumulates_everything_without_duplicates() {
        let source = Numbers::new(23, 4);
        let mut acc: PageAccumulator<u32, u32> = PageAccumulator::new();
        acc.load(&source, 1, 1).await.unwrap();
        let mut rounds = 1;
        while acc.has_more() {
            acc.load_more(&source).await.unwrap();
            rounds += 1;
        }

        let mut seen = acc.results().to_vec();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 23);
        assert_eq!(acc.results().len(), 23);
        assert_eq!(rounds, 6);
    }

    #[tokio::test]
    async fn filter_change_restarts_at_page_one() {
        let source = Numbers::new(20, 3);
        let mut acc: PageAccumulator<u32, u32> = PageAccumulator::new();
        acc.load(&source, 1, 1).await.unwrap();
        acc.load(&source, 1, 2).await.unwrap();
        assert_eq!(acc.results().len(), 6);

        // Asking for page 3 of a new filter still starts over.
        acc.load(&source, 5, 3).await.unwrap();
        assert_eq!(acc.results(), &[20, 15, 10]);
        assert_eq!(acc.page(), Some(1));
        assert_eq!(acc.total_docs(), Some(4));
        assert_eq!(acc.filter(), Some(&5));
        assert_eq!(source.count_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn total_is_not_refreshed_after_inserts() {
        let source = Numbers::new(6, 5);
        let mut acc: PageAccumulator<u32, u32> = PageAccumulator::new();
        acc.load(&source, 1, 1).await.unwrap();

        source.items.lock().unwrap().insert(0, 100);
        acc.load_more(&source).await.unwrap();

        assert_eq!(acc.total_docs(), Some(6));
        // The insert shifted the window: 2 shows up twice.
        assert_eq!(acc.results(), &[6, 5, 4, 3, 2, 2, 1]);
        assert!(!acc.has_more());
    }

    #[tokio::test]
    async fn reloading_a_loaded_page_is_a_no_op() {
        let source = Numbers::new(12, 5);
        let mut acc: PageAccumulator<u32, u32> = PageAccumulator::new();
        acc.load(&source, 1, 1).await.unwrap();
        acc.load(&source, 1, 2).await.unwrap();

        assert_eq!(tokio_test::assert_ok!(acc.load(&source, 1, 2).await), 0);
        assert_eq!(acc.results().len(), 10);
        assert_eq!(acc.page(), Some(2));
        assert!(acc.has_more());

        acc.load_more(&source).await.unwrap();
        let mut seen = acc.results().to_vec();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 12);
        assert_eq!(acc.results().len(), 12);
        assert!(!acc.has_more());
    }

    #[tokio::test]
    async fn page_jumps_are_clamped_to_the_next_page() {
        let source = Numbers::new(12, 5);
        let mut acc: PageAccumulator<u32, u32> = PageAccumulator::new();
        acc.load(&source, 1, 1).await.unwrap();

        assert_eq!(acc.load(&source, 1, 3).await.unwrap(), 5);
        assert_eq!(acc.page(), Some(2));
        assert_eq!(acc.results(), &[12, 11, 10, 9, 8, 7, 6, 5, 4, 3]);
        assert!(acc.results().len() <= 2 * 5);
    }

    #[tokio::test]
    async fn load_more_without_state_is_a_no_op() {
        let source = Numbers::new(3, 5);
        let mut acc: PageAccumulator<u32, u32> = PageAccumulator::new();
        assert_eq!(tokio_test::assert_ok!(acc.load_more(&source).await), 0);
        assert!(acc.state().is_none());
        assert_eq!(source.count_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_state() {
        let mut source = Numbers::new(9, 5);
        let mut acc: PageAccumulator<u32, u32> = PageAccumulator::new();
        acc.load(&source, 1, 1).await.unwrap();

        source.fail_pages = true;
        let err = tokio_test::assert_err!(acc.load_more(&source).await);
        assert_eq!(err, "listing unavailable");
        assert_eq!(acc.results().len(), 5);
        assert_eq!(acc.page(), Some(1));

        acc.reset();
        assert!(acc.results().is_empty());
        assert!(!acc.has_more());
    }
}

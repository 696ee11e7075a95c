//! Lazy paged enumeration
//!
//! A [`Pager`] walks a sequence of pages, converting each item only when it
//! is handed to the caller. The next page is fetched exactly when the current
//! one is exhausted and the service returned a continuation. Both the async
//! and the blocking iteration drive the same cursor.

use super::response::Converter;
use crate::arm::blocking;
use crate::arm::error::{ArmError, ArmResult, TransportError};
use crate::arm::http::ArmRequest;
use crate::arm::pipeline::Pipeline;
use async_trait::async_trait;
use futures::stream::{self, Stream};
use reqwest::Method;
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// One page of raw items
pub struct Page {
    pub items: Vec<Value>,
    pub continuation: Option<String>,
}

#[async_trait]
pub trait PageSource: Send + Sync {
    /// `None` requests the first page.
    async fn fetch_page(&self, continuation: Option<&str>) -> ArmResult<Page>;
}

/// Query options for list calls
#[derive(Debug, Clone, Default)]
pub struct PageOptions {
    pub top: Option<u32>,
    pub filter: Option<String>,
    pub expand: Option<String>,
}

impl PageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn top(mut self, top: u32) -> Self {
        self.top = Some(top);
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn expand(mut self, expand: impl Into<String>) -> Self {
        self.expand = Some(expand.into());
        self
    }

    pub(crate) fn apply(&self, url: &mut Url) {
        let mut query = url.query_pairs_mut();
        if let Some(filter) = &self.filter {
            query.append_pair("$filter", filter);
        }
        if let Some(top) = self.top {
            query.append_pair("$top", &top.to_string());
        }
        if let Some(expand) = &self.expand {
            query.append_pair("$expand", expand);
        }
    }
}

enum Cursor {
    NotStarted,
    Active {
        items: VecDeque<Value>,
        continuation: Option<String>,
    },
    Finished,
}

enum Step {
    Yield(Value),
    Fetch(Option<String>),
    Done,
}

pub struct Pager<T> {
    source: Arc<dyn PageSource>,
    convert: Converter<T>,
    cursor: Cursor,
    pages_fetched: usize,
}

impl<T> Pager<T> {
    /// Nothing is fetched until the first item is requested.
    pub fn new(source: Arc<dyn PageSource>, convert: Converter<T>) -> Self {
        Self {
            source,
            convert,
            cursor: Cursor::NotStarted,
            pages_fetched: 0,
        }
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Next converted item, `None` once the service has no more pages.
    /// A failed page fetch ends the sequence after the error is returned.
    pub async fn try_next(&mut self) -> ArmResult<Option<T>> {
        loop {
            let step = match &mut self.cursor {
                Cursor::Finished => Step::Done,
                Cursor::NotStarted => Step::Fetch(None),
                Cursor::Active {
                    items,
                    continuation,
                } => match items.pop_front() {
                    Some(item) => Step::Yield(item),
                    None => match continuation.take() {
                        Some(token) => Step::Fetch(Some(token)),
                        None => Step::Done,
                    },
                },
            };

            match step {
                Step::Yield(item) => return (self.convert)(&item).map(Some),
                Step::Done => {
                    self.cursor = Cursor::Finished;
                    return Ok(None);
                }
                Step::Fetch(token) => {
                    tracing::debug!("Fetching page {}", self.pages_fetched + 1);
                    match self.source.fetch_page(token.as_deref()).await {
                        Ok(page) => {
                            self.pages_fetched += 1;
                            self.cursor = Cursor::Active {
                                items: page.items.into(),
                                continuation: page.continuation.filter(|c| !c.is_empty()),
                            };
                        }
                        Err(e) => {
                            self.cursor = Cursor::Finished;
                            return Err(e);
                        }
                    }
                }
            }
        }
    }

    /// Drain the remaining items.
    pub async fn collect_all(mut self) -> ArmResult<Vec<T>> {
        let mut all_items = Vec::new();
        while let Some(item) = self.try_next().await? {
            all_items.push(item);
        }
        Ok(all_items)
    }

    pub fn into_stream(self) -> impl Stream<Item = ArmResult<T>> {
        stream::unfold(self, |mut pager| async move {
            match pager.try_next().await {
                Ok(Some(item)) => Some((Ok(item), pager)),
                Ok(None) => None,
                Err(e) => Some((Err(e), pager)),
            }
        })
    }

    /// Iterate on the calling thread.
    pub fn blocking(self) -> BlockingPager<T> {
        BlockingPager { inner: self }
    }
}

impl<T> fmt::Debug for Pager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.cursor {
            Cursor::NotStarted => "not started",
            Cursor::Active { .. } => "active",
            Cursor::Finished => "finished",
        };
        f.debug_struct("Pager")
            .field("state", &state)
            .field("pages_fetched", &self.pages_fetched)
            .finish()
    }
}

/// Thread-blocking view of a [`Pager`]
pub struct BlockingPager<T> {
    inner: Pager<T>,
}

impl<T> BlockingPager<T> {
    pub fn pages_fetched(&self) -> usize {
        self.inner.pages_fetched()
    }
}

impl<T> Iterator for BlockingPager<T> {
    type Item = ArmResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        blocking::block_on(self.inner.try_next()).transpose()
    }
}

/// Pages from a management-plane list endpoint (`value` + `nextLink`).
pub struct ArmPageSource {
    pipeline: Pipeline,
    first_url: Url,
}

impl ArmPageSource {
    pub fn new(pipeline: Pipeline, first_url: Url) -> Self {
        Self {
            pipeline,
            first_url,
        }
    }
}

#[async_trait]
impl PageSource for ArmPageSource {
    async fn fetch_page(&self, continuation: Option<&str>) -> ArmResult<Page> {
        let url = match continuation {
            Some(next) => Url::parse(next).map_err(|e| {
                ArmError::from(TransportError::InvalidResponse(format!("bad nextLink: {}", e)))
            })?,
            None => self.first_url.clone(),
        };

        let response = self.pipeline.send(ArmRequest::new(Method::GET, url)).await?;
        let items = response
            .body
            .get("value")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let continuation = response
            .body
            .get("nextLink")
            .and_then(Value::as_str)
            .map(|s| s.to_string());

        Ok(Page {
            items,
            continuation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// `pages` pages of `per_page` items each, numbered from 0.
    struct Numbered {
        pages: usize,
        per_page: usize,
        fetches: AtomicUsize,
        fail_on: Option<usize>,
    }

    impl Numbered {
        fn new(pages: usize, per_page: usize) -> Arc<Self> {
            Arc::new(Self {
                pages,
                per_page,
                fetches: AtomicUsize::new(0),
                fail_on: None,
            })
        }
    }

    #[async_trait]
    impl PageSource for Numbered {
        async fn fetch_page(&self, continuation: Option<&str>) -> ArmResult<Page> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let page: usize = continuation.map(|c| c.parse().unwrap()).unwrap_or(0);
            if self.fail_on == Some(page) {
                return Err(TransportError::InvalidResponse("boom".to_string()).into());
            }
            let start = page * self.per_page;
            let items = (start..start + self.per_page).map(|n| json!(n)).collect();
            let continuation = (page + 1 < self.pages).then(|| (page + 1).to_string());
            Ok(Page {
                items,
                continuation,
            })
        }
    }

    fn counting_converter(count: Arc<AtomicUsize>) -> Converter<u64> {
        Arc::new(move |v: &Value| -> ArmResult<u64> {
            count.fetch_add(1, Ordering::SeqCst);
            v.as_u64()
                .ok_or_else(|| TransportError::InvalidResponse("not a number".to_string()).into())
        })
    }

    #[tokio::test]
    async fn test_lazy_fetch_and_conversion() {
        let source = Numbered::new(3, 5);
        let conversions = Arc::new(AtomicUsize::new(0));
        let mut pager = Pager::new(source.clone(), counting_converter(conversions.clone()));

        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
        assert_eq!(pager.try_next().await.unwrap(), Some(0));
        assert_eq!(pager.try_next().await.unwrap(), Some(1));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(conversions.load(Ordering::SeqCst), 2);

        for expected in 2..5 {
            assert_eq!(pager.try_next().await.unwrap(), Some(expected));
        }
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);

        assert_eq!(pager.try_next().await.unwrap(), Some(5));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_terminates_without_continuation() {
        let source = Numbered::new(3, 5);
        let pager = Pager::new(source.clone(), counting_converter(Arc::new(AtomicUsize::new(0))));
        let all = pager.collect_all().await.unwrap();
        assert_eq!(all, (0..15).collect::<Vec<u64>>());
        assert_eq!(source.fetches.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_independent_pagers_do_not_share_cursor() {
        let source = Numbered::new(2, 3);
        let convert = counting_converter(Arc::new(AtomicUsize::new(0)));
        let first = Pager::new(source.clone(), convert.clone()).collect_all().await.unwrap();
        let mut second = Pager::new(source.clone(), convert);
        assert_eq!(second.try_next().await.unwrap(), Some(0));
        assert_eq!(first.len(), 6);
    }

    #[tokio::test]
    async fn test_fetch_error_ends_sequence() {
        let source = Arc::new(Numbered {
            pages: 3,
            per_page: 2,
            fetches: AtomicUsize::new(0),
            fail_on: Some(1),
        });
        let mut pager = Pager::new(source, counting_converter(Arc::new(AtomicUsize::new(0))));
        assert_eq!(pager.try_next().await.unwrap(), Some(0));
        assert_eq!(pager.try_next().await.unwrap(), Some(1));
        assert!(pager.try_next().await.is_err());
        assert_eq!(pager.try_next().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_stream_yields_all_items() {
        use futures::TryStreamExt;

        let source = Numbered::new(2, 2);
        let pager = Pager::new(source, counting_converter(Arc::new(AtomicUsize::new(0))));
        let items: Vec<u64> = pager.into_stream().try_collect().await.unwrap();
        assert_eq!(items, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_blocking_iteration_is_lazy() {
        let source = Numbered::new(3, 5);
        let pager = Pager::new(source.clone(), counting_converter(Arc::new(AtomicUsize::new(0))));
        let mut iter = pager.blocking();
        let firsts: Vec<u64> = iter.by_ref().take(2).map(|r| r.unwrap()).collect();
        assert_eq!(firsts, vec![0, 1]);
        assert_eq!(iter.pages_fetched(), 1);
        assert_eq!(iter.count(), 13);
    }

    #[test]
    fn test_page_options_query() {
        let mut url = Url::parse("https://management.azure.com/x?api-version=1").unwrap();
        PageOptions::new()
            .filter("resourceType eq 'Microsoft.Compute/virtualMachines'")
            .top(10)
            .apply(&mut url);
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("$top".to_string(), "10".to_string())));
        assert!(pairs.contains(&(
            "$filter".to_string(),
            "resourceType eq 'Microsoft.Compute/virtualMachines'".to_string()
        )));
    }
}

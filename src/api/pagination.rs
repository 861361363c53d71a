// src/api/pagination.rs
//! Lazy cursor pagination.
//!
//! A [`Paginator`] owns a fetch function and the cursor it last received.
//! Items are buffered one service page at a time and the next page is only
//! requested once the buffer runs dry, so a consumer that stops early never
//! pays for pages it did not read.

use super::types::{Batch, Cursor};
use crate::error::AppError;
use futures::future::BoxFuture;
use futures::{FutureExt, Stream};
use std::collections::VecDeque;
use std::future::Future;

/// Fetches one page of results given the continuation (`None` for the first page).
pub type FetchBatch<T> =
    Box<dyn FnMut(Option<Cursor>) -> BoxFuture<'static, Result<Batch<T>, AppError>> + Send>;

enum State {
    Start,
    Next(Cursor),
    /// Raised once the items already received have been yielded.
    Failed(AppError),
    Exhausted,
}

/// Single-consumer iterator over a paginated listing.
pub struct Paginator<T> {
    fetch: FetchBatch<T>,
    buffer: VecDeque<T>,
    state: State,
    pages_fetched: usize,
}

impl<T: Send + 'static> Paginator<T> {
    pub fn new<F, Fut>(mut fetch: F) -> Self
    where
        F: FnMut(Option<Cursor>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Batch<T>, AppError>> + Send + 'static,
    {
        Self {
            fetch: Box::new(move |cursor| fetch(cursor).boxed()),
            buffer: VecDeque::new(),
            state: State::Start,
            pages_fetched: 0,
        }
    }

    /// The next item, fetching another page when the buffer is empty.
    ///
    /// After an error the paginator is exhausted; the error is yielded once.
    pub async fn next(&mut self) -> Option<Result<T, AppError>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }

            let cursor = match std::mem::replace(&mut self.state, State::Exhausted) {
                State::Exhausted => return None,
                State::Failed(e) => return Some(Err(e)),
                State::Start => None,
                State::Next(cursor) => Some(cursor),
            };
            let previous = cursor.clone();

            let batch = match (self.fetch)(cursor).await {
                Ok(batch) => batch,
                Err(e) => return Some(Err(e)),
            };
            self.pages_fetched += 1;
            log::debug!(
                "Fetched page {} with {} items (more: {})",
                self.pages_fetched,
                batch.items.len(),
                batch.next_cursor.is_some()
            );

            if let Some(next) = batch.next_cursor {
                if previous.as_ref() == Some(&next) {
                    log::warn!("Service repeated cursor {}", next.token());
                    self.buffer.extend(batch.items);
                    self.state = State::Failed(AppError::MalformedResponse(format!(
                        "pagination cursor {} did not advance",
                        next.token()
                    )));
                    continue;
                }
                self.state = State::Next(next);
            }
            self.buffer.extend(batch.items);
        }
    }

    /// Drains every remaining item, failing on the first error.
    pub async fn collect_all(mut self) -> Result<Vec<T>, AppError> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await {
            items.push(item?);
        }
        Ok(items)
    }

    /// At most `limit` items; no page beyond the one holding the last of them is fetched.
    pub async fn collect_up_to(mut self, limit: usize) -> Result<Vec<T>, AppError> {
        let mut items = Vec::with_capacity(limit.min(crate::constants::NOTION_API_PAGE_SIZE));
        while items.len() < limit {
            match self.next().await {
                Some(item) => items.push(item?),
                None => break,
            }
        }
        Ok(items)
    }

    /// Number of service pages requested so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<T, AppError>> + Send {
        futures::stream::unfold(self, |mut paginator| async move {
            paginator.next().await.map(|item| (item, paginator))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Serves `pages` in order, counting calls.
    fn scripted(pages: Vec<Vec<u32>>, calls: Arc<AtomicUsize>) -> Paginator<u32> {
        let total = pages.len();
        Paginator::new(move |cursor: Option<Cursor>| {
            let index = cursor
                .map(|c| c.token().parse::<usize>().unwrap())
                .unwrap_or(0);
            calls.fetch_add(1, Ordering::SeqCst);
            let items = pages[index].clone();
            async move {
                Ok(Batch {
                    items,
                    next_cursor: (index + 1 < total).then(|| Cursor::new((index + 1).to_string())),
                })
            }
        })
    }

    #[tokio::test]
    async fn yields_every_item_across_pages_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let items = scripted(vec![vec![1, 2], vec![], vec![3]], calls.clone())
            .collect_all()
            .await
            .unwrap();
        assert_eq!(items, vec![1, 2, 3]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_after_a_null_cursor() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut paginator = scripted(vec![vec![1]], calls.clone());
        assert_eq!(paginator.next().await.unwrap().unwrap(), 1);
        assert!(paginator.next().await.is_none());
        assert!(paginator.next().await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(paginator.pages_fetched(), 1);
    }

    #[tokio::test]
    async fn early_stop_skips_later_pages() {
        let calls = Arc::new(AtomicUsize::new(0));
        let items = scripted(vec![vec![1, 2], vec![3, 4], vec![5]], calls.clone())
            .collect_up_to(3)
            .await
            .unwrap();
        assert_eq!(items, vec![1, 2, 3]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn an_error_ends_the_iteration() {
        let mut calls = 0;
        let mut paginator: Paginator<u32> = Paginator::new(move |_cursor| {
            calls += 1;
            let first = calls == 1;
            async move {
                if first {
                    Ok(Batch {
                        items: vec![7],
                        next_cursor: Some(Cursor::new("next".to_string())),
                    })
                } else {
                    Err(AppError::MalformedResponse("boom".to_string()))
                }
            }
        });
        assert_eq!(paginator.next().await.unwrap().unwrap(), 7);
        assert!(paginator.next().await.unwrap().is_err());
        assert!(paginator.next().await.is_none());
    }

    #[tokio::test]
    async fn a_repeated_cursor_does_not_loop() {
        let mut paginator: Paginator<u32> = Paginator::new(|_cursor| async {
            Ok(Batch {
                items: vec![],
                next_cursor: Some(Cursor::new("same".to_string())),
            })
        });
        // First call has no cursor so "same" is new; the second repeats it.
        assert!(paginator.next().await.unwrap().is_err());
        assert!(paginator.next().await.is_none());
        assert_eq!(paginator.pages_fetched(), 2);
    }

    #[tokio::test]
    async fn a_repeated_cursor_after_items_yields_them_then_fails() {
        let mut paginator: Paginator<u32> = Paginator::new(|cursor: Option<Cursor>| {
            let first = cursor.is_none();
            async move {
                Ok(Batch {
                    items: if first { vec![1, 2] } else { vec![3] },
                    next_cursor: Some(Cursor::new("same".to_string())),
                })
            }
        });
        assert_eq!(paginator.next().await.unwrap().unwrap(), 1);
        assert_eq!(paginator.next().await.unwrap().unwrap(), 2);
        assert_eq!(paginator.next().await.unwrap().unwrap(), 3);
        let err = paginator.next().await.unwrap().unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse(_)));
        assert!(paginator.next().await.is_none());
        assert_eq!(paginator.pages_fetched(), 2);
    }

    #[tokio::test]
    async fn works_as_a_stream() {
        let calls = Arc::new(AtomicUsize::new(0));
        let stream = scripted(vec![vec![1], vec![2]], calls).into_stream();
        let items: Vec<u32> = stream.map(|item| item.unwrap()).collect().await;
        assert_eq!(items, vec![1, 2]);
    }
}

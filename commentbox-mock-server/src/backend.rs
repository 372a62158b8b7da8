use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use commentbox_api::{Backend, Comment, CommentId, Error, NewComment};
use tokio::sync::Mutex;

use crate::Shared;

/// In-process `Backend` over a shared `MockServer`, with scriptable latency
///
/// A list request snapshots the server before waiting out its delay, so a slow
/// answer is also a stale one. Mutations wait first, then hit the server.
#[derive(Clone, Debug)]
pub struct MockBackend {
    server: Shared,
    delays: Arc<Mutex<VecDeque<Duration>>>,
    calls: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn new(server: Shared) -> MockBackend {
        MockBackend {
            server,
            delays: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn server(&self) -> &Shared {
        &self.server
    }

    /// Delay the next request not yet started, requests without one answer immediately
    pub async fn push_delay(&self, d: Duration) {
        self.delays.lock().await.push_back(d);
    }

    /// Number of requests received so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn start_call(&self) -> Duration {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.delays.lock().await.pop_front().unwrap_or(Duration::ZERO)
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn list(&self) -> Result<Vec<Comment>, Error> {
        let delay = self.start_call().await;
        let res = self.server.lock().await.list();
        tokio::time::sleep(delay).await;
        Ok(res?)
    }

    async fn create(&self, c: &NewComment) -> Result<Option<Comment>, Error> {
        let delay = self.start_call().await;
        tokio::time::sleep(delay).await;
        Ok(Some(self.server.lock().await.create(c.clone())?))
    }

    async fn update(&self, id: &CommentId, c: &NewComment) -> Result<Option<Comment>, Error> {
        let delay = self.start_call().await;
        tokio::time::sleep(delay).await;
        Ok(Some(self.server.lock().await.update(id, c.clone())?))
    }

    async fn delete(&self, id: &CommentId) -> Result<(), Error> {
        let delay = self.start_call().await;
        tokio::time::sleep(delay).await;
        Ok(self.server.lock().await.delete(id)?)
    }
}

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};

use crate::{
    api::{Backend, CommentId},
    Config, Request, Response, Store,
};

pub enum Msg {
    Tick,
    Response(Response),
}

/// Handle on the polling timer, which stops when the handle is dropped
#[derive(Debug)]
pub struct Poller(Option<JoinHandle<()>>);

impl Poller {
    pub fn start(period: Duration, sender: mpsc::UnboundedSender<Msg>) -> Poller {
        Poller(Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if sender.send(Msg::Tick).is_err() {
                    return;
                }
            }
        })))
    }

    pub fn is_running(&self) -> bool {
        self.0.is_some()
    }

    /// Returns false if the timer had already been cancelled
    pub fn cancel(&mut self) -> bool {
        match self.0.take() {
            Some(h) => {
                h.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// A mounted comment widget: the store, the backend it syncs with, and the
/// timer refreshing it
///
/// Requests run as spawned tasks, their answers are queued and only applied
/// to the store from `next`, one at a time.
pub struct CommentBox<B> {
    store: Store,
    backend: Arc<B>,
    sender: mpsc::UnboundedSender<Msg>,
    receiver: mpsc::UnboundedReceiver<Msg>,
    poller: Poller,
    in_flight: usize,
}

impl<B: 'static + Backend> CommentBox<B> {
    /// Must be called from within a tokio runtime
    pub fn mount(backend: Arc<B>, config: &Config) -> CommentBox<B> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let poller = Poller::start(config.poll_interval, sender.clone());
        let mut this = CommentBox {
            store: Store::new(config.consistency),
            backend,
            sender,
            receiver,
            poller,
            in_flight: 0,
        };
        tracing::info!(
            poll_interval = ?config.poll_interval,
            consistency = ?config.consistency,
            "mounted comment box"
        );
        this.refresh();
        this
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Number of requests sent whose answer was not applied yet
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }

    fn dispatch(&mut self, req: Option<Request>) {
        let req = match req {
            Some(req) => req,
            None => return,
        };
        tracing::debug!(?req, "sending request");
        self.in_flight += 1;
        let backend = self.backend.clone();
        let sender = self.sender.clone();
        tokio::spawn(async move {
            let resp = req.execute(&*backend).await;
            // the receiver is only gone once the box itself is dropped
            let _ = sender.send(Msg::Response(resp));
        });
    }

    pub fn refresh(&mut self) {
        let req = self.store.refresh();
        self.dispatch(Some(req));
    }

    pub fn create(&mut self, author: &str, text: &str) {
        let req = self.store.create(author, text);
        self.dispatch(req);
    }

    pub fn update(&mut self, id: CommentId, author: &str, text: &str) {
        let req = self.store.update(id, author, text);
        self.dispatch(req);
    }

    pub fn delete(&mut self, id: &CommentId) {
        let req = self.store.delete(id);
        self.dispatch(req);
    }

    pub fn begin_edit(&mut self, id: &CommentId) -> bool {
        self.store.begin_edit(id)
    }

    pub fn cancel_edit(&mut self) {
        self.store.cancel_edit();
    }

    pub fn set_author(&mut self, author: String) {
        self.store.set_author(author);
    }

    pub fn set_text(&mut self, text: String) {
        self.store.set_text(text);
    }

    pub fn submit(&mut self) {
        let req = self.store.submit();
        self.dispatch(req);
    }

    /// Wait for the next timer tick or server answer and apply it
    ///
    /// Returns whether the visible state changed. Never returns while nothing
    /// is in flight and the timer is stopped.
    pub async fn next(&mut self) -> bool {
        // self.sender keeps the channel open
        let msg = match self.receiver.recv().await {
            Some(msg) => msg,
            None => return false,
        };
        self.apply(msg)
    }

    fn apply(&mut self, msg: Msg) -> bool {
        match msg {
            // ticks queued before teardown are dropped
            Msg::Tick if !self.poller.is_running() => false,
            Msg::Tick => {
                self.refresh();
                false
            }
            Msg::Response(resp) => {
                self.in_flight -= 1;
                self.store.handle(resp)
            }
        }
    }

    /// Apply answers until no request is in flight anymore
    pub async fn settle(&mut self) {
        while self.in_flight > 0 {
            self.next().await;
        }
    }

    /// Stop polling; answers to requests already sent still get applied
    ///
    /// Returns false if the box had already been torn down.
    pub fn teardown(&mut self) -> bool {
        let stopped = self.poller.cancel();
        if stopped {
            tracing::info!("unmounted comment box");
        }
        stopped
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use commentbox_mock_server::{MockBackend, MockServer};

    use super::*;
    use crate::{api::NewComment, Consistency};

    fn mount(mock: &MockBackend, consistency: Consistency) -> CommentBox<MockBackend> {
        CommentBox::mount(
            Arc::new(mock.clone()),
            &Config {
                poll_interval: Duration::from_millis(2000),
                consistency,
            },
        )
    }

    async fn seeded(comments: &[(&str, &str)]) -> MockBackend {
        let mock = MockBackend::new(MockServer::new().shared());
        {
            let mut server = mock.server().lock().await;
            for (author, text) in comments {
                server
                    .create(NewComment::new(*author, *text))
                    .expect("seeding mock server");
            }
        }
        mock
    }

    #[tokio::test(start_paused = true)]
    async fn mount_refreshes_immediately() {
        let mock = seeded(&[("Bo", "hi")]).await;
        let mut cb = mount(&mock, Consistency::Reconciling);
        assert_eq!(cb.in_flight(), 1);
        assert!(cb.next().await);
        assert_eq!(cb.store().items().len(), 1);
        assert_eq!(cb.store().items()[0].author, "Bo");
    }

    #[tokio::test(start_paused = true)]
    async fn polls_every_interval() {
        let mock = seeded(&[]).await;
        let mut cb = mount(&mock, Consistency::Reconciling);
        cb.settle().await;
        assert!(cb.store().items().is_empty());

        mock.server()
            .lock()
            .await
            .create(NewComment::new("Ann", "hello"))
            .unwrap();
        let start = Instant::now();
        // tick, then the refresh it triggered
        assert!(!cb.next().await);
        assert!(start.elapsed() >= Duration::from_millis(2000));
        assert!(cb.next().await);
        assert_eq!(cb.store().items().len(), 1);
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_is_idempotent_and_stops_polling() {
        let mock = seeded(&[]).await;
        let mut cb = mount(&mock, Consistency::Reconciling);
        cb.settle().await;
        assert!(cb.is_polling());
        assert!(cb.teardown());
        assert!(!cb.teardown());
        assert!(!cb.is_polling());
        assert!(tokio::time::timeout(Duration::from_secs(10), cb.next())
            .await
            .is_err());
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn queued_tick_is_ignored_after_teardown() {
        let mock = seeded(&[]).await;
        let mut cb = mount(&mock, Consistency::Reconciling);
        cb.settle().await;
        // let the timer fire once without consuming its tick
        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert!(cb.teardown());
        assert!(!cb.next().await);
        cb.settle().await;
        assert_eq!(cb.in_flight(), 0);
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn answers_after_teardown_still_apply() {
        let mock = seeded(&[("Bo", "hi")]).await;
        mock.push_delay(Duration::from_millis(500)).await;
        let mut cb = mount(&mock, Consistency::Reconciling);
        cb.teardown();
        cb.settle().await;
        assert_eq!(cb.store().items().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn create_then_confirm() {
        let mock = seeded(&[]).await;
        let mut cb = mount(&mock, Consistency::Reconciling);
        cb.settle().await;

        cb.set_author(String::from("Ann"));
        cb.set_text(String::from("hello"));
        cb.submit();
        assert_eq!(cb.store().items().len(), 1);
        assert!(cb.store().items()[0].id.is_placeholder());

        cb.settle().await;
        let server = mock.server().lock().await.list().unwrap();
        assert_eq!(cb.store().items(), &server[..]);
        assert_eq!(cb.store().draft().author, "");
        assert_eq!(cb.store().last_error(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_create_sends_nothing() {
        let mock = seeded(&[]).await;
        let mut cb = mount(&mock, Consistency::Reference);
        cb.settle().await;
        cb.create("", "hello");
        cb.submit();
        assert_eq!(cb.in_flight(), 0);
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_failure_in_both_modes() {
        for (consistency, restored) in [
            (Consistency::Reference, false),
            (Consistency::Reconciling, true),
        ] {
            let mock = seeded(&[("Bo", "hi")]).await;
            let mut cb = mount(&mock, consistency);
            cb.settle().await;
            let id = cb.store().items()[0].id.clone();

            mock.server().lock().await.fail_with(Some(String::from("db down")));
            cb.delete(&id);
            assert!(cb.store().items().is_empty());
            cb.settle().await;
            assert_eq!(cb.store().last_error(), Some("db down"));
            assert_eq!(cb.store().get(&id).is_some(), restored, "with {consistency:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stale_refresh_is_dropped_when_reconciling() {
        for (consistency, expected_len) in
            [(Consistency::Reference, 1), (Consistency::Reconciling, 2)]
        {
            let mock = seeded(&[("Bo", "hi")]).await;
            // the mount-time refresh reads the list, then lingers
            mock.push_delay(Duration::from_millis(300)).await;
            mock.push_delay(Duration::ZERO).await;
            let mut cb = mount(&mock, consistency);
            tokio::time::sleep(Duration::from_millis(10)).await;
            mock.server()
                .lock()
                .await
                .create(NewComment::new("Ann", "hello"))
                .unwrap();
            cb.refresh();
            cb.settle().await;
            assert_eq!(
                cb.store().items().len(),
                expected_len,
                "with {consistency:?}"
            );
        }
    }
}

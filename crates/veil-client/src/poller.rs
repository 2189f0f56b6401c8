//! Inbox polling.
//!
//! Every fetch is stamped with a sequence number when it is issued. A
//! response is applied only if no newer fetch has been issued since and the
//! poller is still running, so a slow response can never overwrite a newer
//! one. Each applied response replaces the visible list wholesale.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use veil_types::{Message, Owner};

use crate::config::ClientConfig;
use crate::error::{ClientError, StoreError};
use crate::store::LinkStore;

/// What the inbox shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboxView {
    /// No fetch has succeeded yet.
    Loading,
    /// The owner has no messages.
    Empty,
    /// Newest first.
    Messages(Vec<Message>),
}

impl InboxView {
    fn from_messages(messages: Vec<Message>) -> Self {
        if messages.is_empty() {
            InboxView::Empty
        } else {
            InboxView::Messages(messages)
        }
    }

    pub fn messages(&self) -> &[Message] {
        match self {
            InboxView::Messages(messages) => messages,
            _ => &[],
        }
    }
}

/// Starts pollers against one store.
pub struct InboxPoller {
    store: Arc<dyn LinkStore>,
    interval: Duration,
}

impl InboxPoller {
    pub fn new(store: Arc<dyn LinkStore>, config: &ClientConfig) -> Self {
        Self::with_interval(store, config.poll_interval)
    }

    pub fn with_interval(store: Arc<dyn LinkStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Resolve `link_id` and start polling its inbox.
    ///
    /// Fails with [`ClientError::NotFound`] if the link has no owner. The
    /// first message fetch completes before this returns; a failure there is
    /// logged and the view stays [`InboxView::Loading`] until a tick succeeds.
    pub async fn start(&self, link_id: &str) -> Result<PollHandle, ClientError> {
        let owner = self
            .store
            .owner_by_link(link_id)
            .await?
            .ok_or_else(|| ClientError::NotFound(link_id.to_string()))?;

        let (view, _) = watch::channel(InboxView::Loading);
        let fetcher = Fetcher {
            store: self.store.clone(),
            owner: Arc::new(owner),
            shared: Arc::new(Shared {
                issued: AtomicU64::new(0),
                stopped: AtomicBool::new(false),
                apply: Mutex::new(()),
                view,
            }),
        };

        let seq = fetcher.shared.issue();
        if let Err(e) = fetcher.fetch(seq).await {
            warn!("Initial inbox fetch for {} failed: {}", link_id, e);
        }

        let task = tokio::spawn(run_poll_loop(fetcher.clone(), self.interval));
        info!("Polling inbox {} every {:?}", link_id, self.interval);

        Ok(PollHandle {
            fetcher,
            task: Mutex::new(Some(task)),
        })
    }
}

impl std::fmt::Debug for InboxPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboxPoller")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

struct Shared {
    /// Sequence number of the most recently issued fetch.
    issued: AtomicU64,
    stopped: AtomicBool,
    /// Makes "is this still the latest fetch?" and the view update one step.
    apply: Mutex<()>,
    view: watch::Sender<InboxView>,
}

impl Shared {
    fn issue(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.apply.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Taken under the apply lock so no response can land once this returns.
    fn stop(&self) -> bool {
        let _guard = self.lock();
        self.stopped.swap(true, Ordering::SeqCst)
    }

    fn apply(&self, seq: u64, messages: Vec<Message>) -> bool {
        let _guard = self.lock();
        if self.is_stopped() {
            debug!("Poller stopped, dropping response #{}", seq);
            return false;
        }
        let latest = self.issued.load(Ordering::SeqCst);
        if seq != latest {
            debug!("Dropping response #{} (latest is #{})", seq, latest);
            return false;
        }
        self.view.send_replace(InboxView::from_messages(messages));
        true
    }

    /// Remove a confirmed-deleted message and invalidate every fetch issued
    /// before the deletion, since those may still contain it.
    fn remove(&self, message_id: Uuid) {
        let _guard = self.lock();
        self.issued.fetch_add(1, Ordering::SeqCst);
        self.view.send_if_modified(|view| {
            let InboxView::Messages(list) = view else {
                return false;
            };
            let before = list.len();
            list.retain(|m| m.id != message_id);
            if list.len() == before {
                return false;
            }
            if list.is_empty() {
                *view = InboxView::Empty;
            }
            true
        });
    }
}

#[derive(Clone)]
struct Fetcher {
    store: Arc<dyn LinkStore>,
    owner: Arc<Owner>,
    shared: Arc<Shared>,
}

impl Fetcher {
    async fn fetch(&self, seq: u64) -> Result<bool, StoreError> {
        let messages = self.store.messages_for(&self.owner).await?;
        Ok(self.shared.apply(seq, messages))
    }
}

/// Runs until aborted. The first tick is one period after start since
/// `start` already fetched once; fetches never overlap because each tick
/// awaits its fetch and late ticks are skipped.
async fn run_poll_loop(fetcher: Fetcher, period: Duration) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        if fetcher.shared.is_stopped() {
            break;
        }

        let seq = fetcher.shared.issue();
        match fetcher.fetch(seq).await {
            Ok(applied) => debug!("Poll #{} for {} (applied: {})", seq, fetcher.owner.unique_id, applied),
            Err(e) => warn!("Inbox poll for {} failed: {}", fetcher.owner.unique_id, e),
        }
    }
}

/// A running poller. Dropping it stops polling.
pub struct PollHandle {
    fetcher: Fetcher,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PollHandle {
    pub fn owner(&self) -> &Owner {
        &self.fetcher.owner
    }

    /// Current snapshot.
    pub fn view(&self) -> InboxView {
        self.fetcher.shared.view.borrow().clone()
    }

    /// Receives every applied update.
    pub fn subscribe(&self) -> watch::Receiver<InboxView> {
        self.fetcher.shared.view.subscribe()
    }

    /// Fetch now, outside the regular interval.
    ///
    /// The sequence number is taken when this is called, not when the future
    /// is first polled. Resolves to whether the result was applied; it is not
    /// if a newer fetch was issued meanwhile or the poller was stopped.
    pub fn refresh(&self) -> impl Future<Output = Result<bool, ClientError>> + Send + 'static {
        let fetcher = self.fetcher.clone();
        let seq = (!fetcher.shared.is_stopped()).then(|| fetcher.shared.issue());

        async move {
            let Some(seq) = seq else {
                return Ok(false);
            };
            Ok(fetcher.fetch(seq).await?)
        }
    }

    /// Delete a message. It leaves the visible list only once the store
    /// confirms; on failure the list is untouched. A message the store no
    /// longer has counts as deleted.
    pub async fn delete_message(&self, message_id: Uuid) -> Result<(), ClientError> {
        let owner = &self.fetcher.owner;
        match self.fetcher.store.delete_message(owner, message_id).await {
            Ok(()) => debug!("Deleted message {}", message_id),
            Err(StoreError::NotFound) => debug!("Message {} was already deleted", message_id),
            Err(e) => {
                warn!("Failed to delete message {}: {}", message_id, e);
                return Err(e.into());
            }
        }

        self.fetcher.shared.remove(message_id);
        Ok(())
    }

    /// Stop polling. Responses still in flight are dropped. Calling this
    /// again is a no-op.
    pub fn stop(&self) {
        let already = self.fetcher.shared.stop();

        let task = self
            .task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(task) = task {
            task.abort();
        }

        if !already {
            info!("Stopped polling inbox {}", self.fetcher.owner.unique_id);
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.fetcher.shared.is_stopped()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for PollHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollHandle")
            .field("link_id", &self.fetcher.owner.unique_id)
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::oneshot;

    use crate::store::{MemoryStore, NewOwner};

    const LINK: &str = "abcdefghij";
    const NEVER: Duration = Duration::from_secs(3600);

    fn owner() -> Owner {
        Owner {
            id: Uuid::new_v4(),
            unique_id: LINK.into(),
            name: "Ava".into(),
            wallet_address: "0xabc".into(),
            created_at: Utc::now(),
        }
    }

    fn message(owner: &Owner, text: &str) -> Message {
        Message {
            id: Uuid::new_v4(),
            owner_id: owner.id,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    struct Step {
        gate: Option<oneshot::Receiver<()>>,
        result: Result<Vec<Message>, StoreError>,
    }

    /// Answers message fetches from a script, optionally holding each answer
    /// until its gate opens. An empty script answers with no messages.
    struct ScriptedStore {
        owner: Owner,
        fetches: AtomicUsize,
        script: Mutex<VecDeque<Step>>,
        deletes_fail: AtomicBool,
    }

    impl ScriptedStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                owner: owner(),
                fetches: AtomicUsize::new(0),
                script: Mutex::new(VecDeque::new()),
                deletes_fail: AtomicBool::new(false),
            })
        }

        fn answer(&self, messages: Vec<Message>) {
            self.push(None, Ok(messages));
        }

        fn answer_when(&self, messages: Vec<Message>) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.push(Some(rx), Ok(messages));
            tx
        }

        fn push(&self, gate: Option<oneshot::Receiver<()>>, result: Result<Vec<Message>, StoreError>) {
            self.script.lock().unwrap().push_back(Step { gate, result });
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }

        async fn wait_for_fetches(&self, n: usize) {
            while self.fetches() < n {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        }
    }

    #[async_trait]
    impl LinkStore for ScriptedStore {
        async fn create_owner(&self, _: &NewOwner) -> Result<Owner, StoreError> {
            Err(StoreError::Unavailable("read only".into()))
        }

        async fn owner_by_link(&self, link_id: &str) -> Result<Option<Owner>, StoreError> {
            Ok((link_id == self.owner.unique_id).then(|| self.owner.clone()))
        }

        async fn messages_for(&self, _: &Owner) -> Result<Vec<Message>, StoreError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let step = self.script.lock().unwrap().pop_front();
            let Some(step) = step else {
                return Ok(vec![]);
            };
            if let Some(gate) = step.gate {
                let _ = gate.await;
            }
            step.result
        }

        async fn insert_message(&self, _: &Owner, _: &str) -> Result<Message, StoreError> {
            Err(StoreError::Unavailable("read only".into()))
        }

        async fn delete_message(&self, _: &Owner, _: Uuid) -> Result<(), StoreError> {
            if self.deletes_fail.load(Ordering::SeqCst) {
                Err(StoreError::Unavailable("connection reset".into()))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn interval_comes_from_config() {
        let config = ClientConfig {
            poll_interval: Duration::from_millis(750),
            ..ClientConfig::default()
        };
        let poller = InboxPoller::new(ScriptedStore::new(), &config);
        assert_eq!(poller.interval, Duration::from_millis(750));
    }

    #[tokio::test]
    async fn unknown_link_is_not_found() {
        let poller = InboxPoller::with_interval(ScriptedStore::new(), NEVER);
        let err = poller.start("zzzzzzzzzz").await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
    }

    #[tokio::test]
    async fn empty_inbox_is_an_explicit_state() {
        let poller = InboxPoller::with_interval(ScriptedStore::new(), NEVER);
        let handle = poller.start(LINK).await.unwrap();
        assert_eq!(handle.view(), InboxView::Empty);
        assert!(handle.view().messages().is_empty());
    }

    #[tokio::test]
    async fn failed_first_fetch_stays_loading() {
        let store = ScriptedStore::new();
        store.push(None, Err(StoreError::Unavailable("down".into())));
        let handle = InboxPoller::with_interval(store.clone(), NEVER)
            .start(LINK)
            .await
            .unwrap();
        assert_eq!(handle.view(), InboxView::Loading);

        let hello = message(&store.owner, "hello");
        store.answer(vec![hello.clone()]);
        assert!(handle.refresh().await.unwrap());
        assert_eq!(handle.view(), InboxView::Messages(vec![hello]));
    }

    #[tokio::test]
    async fn later_fetch_wins_even_when_it_resolves_first() {
        let store = ScriptedStore::new();
        store.answer(vec![]);
        let handle = InboxPoller::with_interval(store.clone(), NEVER)
            .start(LINK)
            .await
            .unwrap();

        let stale = message(&store.owner, "stale");
        let fresh = message(&store.owner, "fresh");
        let open_stale = store.answer_when(vec![stale]);
        let open_fresh = store.answer_when(vec![fresh.clone()]);

        let first = tokio::spawn(handle.refresh());
        store.wait_for_fetches(2).await;
        let second = tokio::spawn(handle.refresh());
        store.wait_for_fetches(3).await;

        open_fresh.send(()).unwrap();
        assert!(second.await.unwrap().unwrap());
        open_stale.send(()).unwrap();
        assert!(!first.await.unwrap().unwrap());

        assert_eq!(handle.view(), InboxView::Messages(vec![fresh]));
    }

    #[tokio::test]
    async fn failed_delete_leaves_list_unchanged() {
        let store = ScriptedStore::new();
        let hello = message(&store.owner, "hello");
        store.answer(vec![hello.clone()]);
        let handle = InboxPoller::with_interval(store.clone(), NEVER)
            .start(LINK)
            .await
            .unwrap();

        store.deletes_fail.store(true, Ordering::SeqCst);
        let err = handle.delete_message(hello.id).await.unwrap_err();
        assert!(matches!(err, ClientError::Store(StoreError::Unavailable(_))));
        assert_eq!(handle.view(), InboxView::Messages(vec![hello]));
    }

    #[tokio::test]
    async fn confirmed_delete_is_not_undone_by_an_older_read() {
        let store = ScriptedStore::new();
        let hello = message(&store.owner, "hello");
        let other = message(&store.owner, "other");
        store.answer(vec![other.clone(), hello.clone()]);
        let handle = InboxPoller::with_interval(store.clone(), NEVER)
            .start(LINK)
            .await
            .unwrap();

        // A read issued before the delete still sees the message.
        let open = store.answer_when(vec![other.clone(), hello.clone()]);
        let read = tokio::spawn(handle.refresh());
        store.wait_for_fetches(2).await;

        handle.delete_message(hello.id).await.unwrap();
        assert_eq!(handle.view(), InboxView::Messages(vec![other.clone()]));

        open.send(()).unwrap();
        assert!(!read.await.unwrap().unwrap());
        assert_eq!(handle.view(), InboxView::Messages(vec![other]));
    }

    #[tokio::test]
    async fn deleting_the_last_message_empties_the_inbox() {
        let store = ScriptedStore::new();
        let hello = message(&store.owner, "hello");
        store.answer(vec![hello.clone()]);
        let handle = InboxPoller::with_interval(store.clone(), NEVER)
            .start(LINK)
            .await
            .unwrap();

        handle.delete_message(hello.id).await.unwrap();
        assert_eq!(handle.view(), InboxView::Empty);
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_drops_in_flight_results() {
        let store = ScriptedStore::new();
        let handle = InboxPoller::with_interval(store.clone(), NEVER)
            .start(LINK)
            .await
            .unwrap();

        let open = store.answer_when(vec![message(&store.owner, "late")]);
        let read = tokio::spawn(handle.refresh());
        store.wait_for_fetches(2).await;

        handle.stop();
        handle.stop();
        assert!(handle.is_stopped());

        open.send(()).unwrap();
        assert!(!read.await.unwrap().unwrap());
        assert_eq!(handle.view(), InboxView::Empty);

        assert!(!handle.refresh().await.unwrap());
        assert_eq!(store.fetches(), 2);
    }

    #[tokio::test]
    async fn stop_waits_for_a_response_being_applied() {
        let handle = InboxPoller::with_interval(ScriptedStore::new(), NEVER)
            .start(LINK)
            .await
            .unwrap();

        let applying = handle.fetcher.shared.lock();
        std::thread::scope(|s| {
            let stopper = s.spawn(|| handle.stop());
            std::thread::sleep(Duration::from_millis(50));
            assert!(!handle.is_stopped());

            drop(applying);
            stopper.join().unwrap();
        });
        assert!(handle.is_stopped());
    }

    #[tokio::test]
    async fn polls_on_the_interval() {
        let store = Arc::new(MemoryStore::new());
        let ava = store
            .create_owner(&NewOwner {
                unique_id: LINK.into(),
                name: "Ava".into(),
                wallet_address: "0xabc".into(),
            })
            .await
            .unwrap();

        let handle = InboxPoller::with_interval(store.clone(), Duration::from_millis(20))
            .start(LINK)
            .await
            .unwrap();
        assert_eq!(handle.view(), InboxView::Empty);

        store.insert_message(&ava, "hello").await.unwrap();
        let mut rx = handle.subscribe();
        let view = tokio::time::timeout(
            Duration::from_secs(5),
            rx.wait_for(|v| matches!(v, InboxView::Messages(_))),
        )
        .await
        .unwrap()
        .unwrap()
        .clone();
        assert_eq!(view.messages()[0].text, "hello");
    }

    #[tokio::test]
    async fn failed_tick_keeps_the_last_list() {
        let store = Arc::new(MemoryStore::new());
        let ava = store
            .create_owner(&NewOwner {
                unique_id: LINK.into(),
                name: "Ava".into(),
                wallet_address: "0xabc".into(),
            })
            .await
            .unwrap();
        store.insert_message(&ava, "hello").await.unwrap();

        let handle = InboxPoller::with_interval(store.clone(), Duration::from_millis(10))
            .start(LINK)
            .await
            .unwrap();
        let before = handle.view();

        store.set_offline(true);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(handle.view(), before);
        assert!(handle.refresh().await.is_err());
        assert_eq!(handle.view(), before);
    }

    #[tokio::test]
    async fn dropping_the_handle_stops_polling() {
        let store = ScriptedStore::new();
        let handle = InboxPoller::with_interval(store.clone(), Duration::from_millis(10))
            .start(LINK)
            .await
            .unwrap();
        store.wait_for_fetches(3).await;

        drop(handle);
        let after_drop = store.fetches();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(store.fetches(), after_drop);
    }
}

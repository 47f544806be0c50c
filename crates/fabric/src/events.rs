//! Fan-out of one chaincode event listener to any number of streams.
//!
//! The channel listener is registered when the first stream is opened and
//! removed when the last one is dropped. The hub lock only guards its own
//! bookkeeping; the channel is always called with the lock released, so a
//! channel may deliver events from inside `register_chaincode_listener`.
//!
//! Every registration carries a generation. Events from a listener whose
//! generation is no longer current are ignored, and a registration that
//! completes after its generation was abandoned is undone.

use crate::api::{ChaincodeEvent, ChaincodeEventStream};
use crate::channel::{ChaincodeEventSink, FabricChannel, ListenerHandle};
use chainbind_core::CallError;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use tracing::{debug, error, info, warn};

type EventItem = Result<ChaincodeEvent, CallError>;

struct Observer {
    id: u64,
    sender: UnboundedSender<EventItem>,
}

#[derive(Default)]
enum Listener {
    #[default]
    Idle,
    Registering(u64),
    Active(u64, ListenerHandle),
}

impl Listener {
    fn generation(&self) -> Option<u64> {
        match self {
            Listener::Idle => None,
            Listener::Registering(generation) | Listener::Active(generation, _) => Some(*generation),
        }
    }

    /// Resets to idle, returning the handle to unregister if one was active.
    fn release(&mut self) -> Option<ListenerHandle> {
        match std::mem::take(self) {
            Listener::Active(_, handle) => Some(handle),
            _ => None,
        }
    }
}

#[derive(Default)]
struct HubState {
    observers: Vec<Observer>,
    next_id: u64,
    generation: u64,
    listener: Listener,
}

impl HubState {
    /// Resets the listener once no observer is left.
    fn release_if_unobserved(&mut self) -> Option<ListenerHandle> {
        if self.observers.is_empty() {
            self.listener.release()
        } else {
            None
        }
    }
}

/// Shares one channel listener for a chaincode event between streams.
///
/// A failed delivery drops only the affected stream. An error reported by the
/// channel is passed to every stream, after which all of them end and the
/// listener is removed; the next [`subscribe`](Self::subscribe) registers a new one.
pub struct ChaincodeEventHub {
    channel: Arc<dyn FabricChannel>,
    chaincode: String,
    event_name: String,
    state: Mutex<HubState>,
}

impl ChaincodeEventHub {
    /// Creates a hub for `event_name` emitted by `chaincode`.
    pub fn new<C: Into<String>, E: Into<String>>(channel: Arc<dyn FabricChannel>, chaincode: C, event_name: E) -> Arc<Self> {
        Arc::new(Self {
            channel,
            chaincode: chaincode.into(),
            event_name: event_name.into(),
            state: Mutex::new(HubState::default()),
        })
    }

    /// Opens a stream of the events.
    pub fn subscribe(self: &Arc<Self>) -> ChaincodeEventStream {
        let (sender, receiver) = mpsc::unbounded();
        let (id, generation) = {
            let mut state = self.state.lock();
            let id = state.next_id;
            state.next_id += 1;
            state.observers.push(Observer { id, sender });
            debug!("Adding observer {} of chaincode event '{}'", id, self.event_name);

            let generation = match state.listener {
                Listener::Idle => {
                    state.generation += 1;
                    state.listener = Listener::Registering(state.generation);
                    Some(state.generation)
                }
                _ => None,
            };
            (id, generation)
        };

        if let Some(generation) = generation {
            self.register(generation);
        }

        Subscription {
            receiver,
            hub: Arc::clone(self),
            id,
        }
        .boxed()
    }

    /// Number of open streams.
    pub fn observer_count(&self) -> usize {
        self.state.lock().observers.len()
    }

    /// Whether a channel listener is registered.
    pub fn is_listening(&self) -> bool {
        matches!(self.state.lock().listener, Listener::Active(..))
    }

    fn register(self: &Arc<Self>, generation: u64) {
        let hub: Weak<Self> = Arc::downgrade(self);
        let sink: ChaincodeEventSink = Arc::new(move |item: EventItem| {
            if let Some(hub) = hub.upgrade() {
                match item {
                    Ok(event) => hub.publish(generation, event),
                    Err(e) => hub.fail(generation, e),
                }
            }
        });

        match self
            .channel
            .register_chaincode_listener(&self.chaincode, &self.event_name, sink)
        {
            Ok(handle) => {
                let mut state = self.state.lock();
                let current = matches!(state.listener, Listener::Registering(g) if g == generation);
                if current && !state.observers.is_empty() {
                    info!(
                        "Registered listener '{}' for event '{}' of chaincode '{}'",
                        handle, self.event_name, self.chaincode
                    );
                    state.listener = Listener::Active(generation, handle);
                    return;
                }
                if current {
                    state.listener = Listener::Idle;
                }
                drop(state);
                debug!("Listener '{}' is no longer needed", handle);
                self.unregister(handle);
            }
            Err(e) => {
                error!("Failed to register event listener: {}", e);
                let observers = {
                    let mut state = self.state.lock();
                    if !matches!(state.listener, Listener::Registering(g) if g == generation) {
                        return;
                    }
                    state.listener = Listener::Idle;
                    std::mem::take(&mut state.observers)
                };
                self.broadcast_error(observers, &e);
            }
        }
    }

    fn unregister(&self, handle: ListenerHandle) {
        match self.channel.unregister_chaincode_listener(&handle) {
            Ok(()) => debug!("Unregistered event listener '{}'", handle),
            Err(e) => error!("Failed to unregister event listener with event handle '{}': {}", handle, e),
        }
    }

    fn publish(&self, generation: u64, event: ChaincodeEvent) {
        let released = {
            let mut state = self.state.lock();
            if state.listener.generation() != Some(generation) {
                debug!("Ignoring event of stale listener generation {}", generation);
                return;
            }
            state.observers.retain(|observer| {
                let delivered = observer.sender.unbounded_send(Ok(event.clone())).is_ok();
                if !delivered {
                    warn!("Failed to transmit event to observer {}, removing it", observer.id);
                }
                delivered
            });
            state.release_if_unobserved()
        };
        if let Some(handle) = released {
            self.unregister(handle);
        }
    }

    fn fail(&self, generation: u64, error: CallError) {
        let (observers, released) = {
            let mut state = self.state.lock();
            if state.listener.generation() != Some(generation) {
                return;
            }
            error!("Chaincode event listener for '{}' failed: {}", self.event_name, error);
            let observers = std::mem::take(&mut state.observers);
            (observers, state.listener.release())
        };
        self.broadcast_error(observers, &error);
        if let Some(handle) = released {
            self.unregister(handle);
        }
    }

    fn broadcast_error(&self, observers: Vec<Observer>, error: &CallError) {
        let message = error.to_string();
        for observer in observers {
            if observer.sender.unbounded_send(Err(CallError::client(message.clone()))).is_err() {
                debug!("Observer {} is already gone", observer.id);
            }
        }
    }

    fn remove(&self, id: u64) {
        let released = {
            let mut state = self.state.lock();
            state.observers.retain(|observer| observer.id != id);
            debug!("Removed observer {} of chaincode event '{}'", id, self.event_name);
            state.release_if_unobserved()
        };
        if let Some(handle) = released {
            self.unregister(handle);
        }
    }
}

struct Subscription {
    receiver: UnboundedReceiver<EventItem>,
    hub: Arc<ChaincodeEventHub>,
    id: u64,
}

impl Stream for Subscription {
    type Item = EventItem;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_next_unpin(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.remove(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChaincodeProposal, InstallProposal, InstantiateProposal, Peer, ProposalResponse, TransactionEvent};
    use crate::user::FabricUser;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    type RegisterHook = Box<dyn Fn(&ChaincodeEventSink) + Send + Sync>;

    #[derive(Default)]
    struct ListenerChannel {
        sinks: Mutex<Vec<(ListenerHandle, ChaincodeEventSink)>>,
        registrations: AtomicUsize,
        refuse: AtomicBool,
        on_register: Mutex<Option<RegisterHook>>,
        replay_on_unregister: AtomicBool,
    }

    impl ListenerChannel {
        fn emit(&self, item: EventItem) {
            let sinks: Vec<_> = self.sinks.lock().iter().map(|(_, sink)| Arc::clone(sink)).collect();
            let message = item.as_ref().err().map(|e| e.to_string());
            for sink in sinks {
                match (&item, &message) {
                    (Ok(event), _) => sink(Ok(event.clone())),
                    (Err(_), Some(message)) => sink(Err(CallError::client(message.clone()))),
                    (Err(_), None) => {}
                }
            }
        }
    }

    #[async_trait]
    impl FabricChannel for ListenerChannel {
        fn peers(&self) -> Vec<Peer> {
            vec![]
        }

        async fn send_install_proposal(
            &self,
            _: InstallProposal,
            _: &[Peer],
            _: Option<&FabricUser>,
        ) -> Result<Vec<ProposalResponse>, CallError> {
            unimplemented!()
        }

        async fn send_instantiate_proposal(
            &self,
            _: InstantiateProposal,
            _: &[Peer],
            _: Option<&FabricUser>,
        ) -> Result<Vec<ProposalResponse>, CallError> {
            unimplemented!()
        }

        async fn send_transaction_proposal(
            &self,
            _: ChaincodeProposal,
            _: &[Peer],
            _: Option<&FabricUser>,
        ) -> Result<Vec<ProposalResponse>, CallError> {
            unimplemented!()
        }

        async fn query_by_chaincode(
            &self,
            _: ChaincodeProposal,
            _: &[Peer],
            _: Option<&FabricUser>,
        ) -> Result<Vec<ProposalResponse>, CallError> {
            unimplemented!()
        }

        async fn send_transaction(
            &self,
            _: Vec<ProposalResponse>,
            _: Option<&FabricUser>,
        ) -> Result<TransactionEvent, CallError> {
            unimplemented!()
        }

        fn register_chaincode_listener(
            &self,
            _chaincode: &str,
            _event_name: &str,
            sink: ChaincodeEventSink,
        ) -> Result<ListenerHandle, CallError> {
            if self.refuse.load(Ordering::SeqCst) {
                return Err(CallError::client("event hub unavailable"));
            }
            let n = self.registrations.fetch_add(1, Ordering::SeqCst);
            let handle = ListenerHandle(format!("listener-{}", n));
            self.sinks.lock().push((handle.clone(), Arc::clone(&sink)));
            if let Some(hook) = self.on_register.lock().as_ref() {
                hook(&sink);
            }
            Ok(handle)
        }

        fn unregister_chaincode_listener(&self, handle: &ListenerHandle) -> Result<(), CallError> {
            if self.replay_on_unregister.load(Ordering::SeqCst) {
                let sink = self.sinks.lock().iter().find(|(h, _)| h == handle).map(|(_, sink)| Arc::clone(sink));
                if let Some(sink) = sink {
                    sink(Ok(event("late")));
                }
            }
            self.sinks.lock().retain(|(h, _)| h != handle);
            Ok(())
        }
    }

    fn event(payload: &str) -> ChaincodeEvent {
        ChaincodeEvent {
            payload: payload.to_string(),
            block_hash: Some("block".to_string()),
            transaction_id: "tx".to_string(),
        }
    }

    #[tokio::test]
    async fn test_streams_share_one_listener() {
        let channel = Arc::new(ListenerChannel::default());
        let hub = ChaincodeEventHub::new(channel.clone(), "assets", "transferred");

        let mut first = hub.subscribe();
        let mut second = hub.subscribe();
        assert_eq!(channel.registrations.load(Ordering::SeqCst), 1);
        assert_eq!(hub.observer_count(), 2);

        channel.emit(Ok(event("a")));
        assert_eq!(first.next().await.unwrap().unwrap().payload, "a");
        assert_eq!(second.next().await.unwrap().unwrap().payload, "a");

        drop(first);
        assert!(hub.is_listening());
        drop(second);
        assert!(!hub.is_listening());
        assert!(channel.sinks.lock().is_empty());

        let _third = hub.subscribe();
        assert_eq!(channel.registrations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_upstream_error_ends_every_stream() {
        let channel = Arc::new(ListenerChannel::default());
        let hub = ChaincodeEventHub::new(channel.clone(), "assets", "transferred");
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        channel.emit(Err(CallError::client("peer disconnected")));

        for stream in [&mut first, &mut second] {
            let err = stream.next().await.unwrap().unwrap_err();
            assert_eq!(err.to_string(), "peer disconnected");
            assert!(stream.next().await.is_none());
        }
        assert_eq!(hub.observer_count(), 0);
        assert!(!hub.is_listening());
    }

    #[tokio::test]
    async fn test_failed_registration_is_reported_in_stream() {
        let channel = Arc::new(ListenerChannel::default());
        channel.refuse.store(true, Ordering::SeqCst);
        let hub = ChaincodeEventHub::new(channel.clone(), "assets", "transferred");

        let mut stream = hub.subscribe();
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(err.to_string().contains("event hub unavailable"));
        assert!(stream.next().await.is_none());
        assert!(!hub.is_listening());
    }

    #[test]
    fn test_closed_observer_is_dropped_on_delivery() {
        let channel = Arc::new(ListenerChannel::default());
        let hub = ChaincodeEventHub::new(channel.clone(), "assets", "transferred");
        let _open = hub.subscribe();
        {
            let mut state = hub.state.lock();
            let (sender, receiver) = mpsc::unbounded();
            drop(receiver);
            state.observers.push(Observer { id: 99, sender });
        }
        assert_eq!(hub.observer_count(), 2);

        channel.emit(Ok(event("a")));
        assert_eq!(hub.observer_count(), 1);
        assert!(hub.is_listening());
    }

    /// Runs `f` on its own thread, failing instead of hanging when it blocks.
    fn within_timeout<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
        let (done, outcome) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let _ = done.send(f());
        });
        outcome.recv_timeout(Duration::from_secs(5)).expect("hub call blocked")
    }

    #[test]
    fn test_event_delivered_during_registration() {
        let channel = Arc::new(ListenerChannel::default());
        *channel.on_register.lock() = Some(Box::new(|sink: &ChaincodeEventSink| sink(Ok(event("replayed")))));
        let hub = ChaincodeEventHub::new(channel.clone(), "assets", "transferred");

        let subscriber = Arc::clone(&hub);
        let mut stream = within_timeout(move || subscriber.subscribe());
        let first = tokio_test::block_on(stream.next()).unwrap().unwrap();
        assert_eq!(first.payload, "replayed");
        assert!(hub.is_listening());
        assert_eq!(channel.registrations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscriber_joining_during_registration_shares_listener() {
        let channel = Arc::new(ListenerChannel::default());
        let hub_slot: Arc<Mutex<Option<Arc<ChaincodeEventHub>>>> = Arc::default();
        let joined: Arc<Mutex<Vec<ChaincodeEventStream>>> = Arc::default();
        {
            let hub_slot = Arc::clone(&hub_slot);
            let joined = Arc::clone(&joined);
            *channel.on_register.lock() = Some(Box::new(move |_: &ChaincodeEventSink| {
                if let Some(hub) = hub_slot.lock().clone() {
                    joined.lock().push(hub.subscribe());
                }
            }));
        }
        let hub = ChaincodeEventHub::new(channel.clone(), "assets", "transferred");
        *hub_slot.lock() = Some(Arc::clone(&hub));

        let subscriber = Arc::clone(&hub);
        let mut first = within_timeout(move || subscriber.subscribe());
        *hub_slot.lock() = None;
        let mut second = joined.lock().pop().unwrap();
        assert_eq!(channel.registrations.load(Ordering::SeqCst), 1);
        assert_eq!(hub.observer_count(), 2);
        assert!(hub.is_listening());

        channel.emit(Ok(event("a")));
        assert_eq!(tokio_test::block_on(first.next()).unwrap().unwrap().payload, "a");
        assert_eq!(tokio_test::block_on(second.next()).unwrap().unwrap().payload, "a");
    }

    #[test]
    fn test_event_delivered_during_unregistration_is_ignored() {
        let channel = Arc::new(ListenerChannel::default());
        channel.replay_on_unregister.store(true, Ordering::SeqCst);
        let hub = ChaincodeEventHub::new(channel.clone(), "assets", "transferred");
        let stream = hub.subscribe();
        assert!(hub.is_listening());

        within_timeout(move || drop(stream));
        assert!(!hub.is_listening());
        assert!(channel.sinks.lock().is_empty());

        let mut renewed = hub.subscribe();
        channel.emit(Ok(event("b")));
        assert_eq!(tokio_test::block_on(renewed.next()).unwrap().unwrap().payload, "b");
        assert_eq!(channel.registrations.load(Ordering::SeqCst), 2);
    }
}

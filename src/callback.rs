//! A single uniform callback shape.
//!
//! Every registered callback is normalized to one shape at registration time, rather than
//! branching on callback kind at dispatch time. A blanket impl lets a plain `FnMut(Packet)`
//! closure be passed directly; it is wrapped in an immediately-ready future.

use std::sync::Arc;

use futures::future::{self, BoxFuture};
use tokio::sync::Mutex as AsyncMutex;

use crate::packet::Packet;

/// A callback invoked with a decoded packet, returning a future that completes when the
/// callback's work is done. Implementors own their own state via `FnMut`'s captured environment.
pub trait PacketCallback: Send + 'static {
    fn call(&mut self, packet: Packet) -> BoxFuture<'static, ()>;
}

impl<F> PacketCallback for F
where
    F: FnMut(Packet) -> BoxFuture<'static, ()> + Send + 'static,
{
    fn call(&mut self, packet: Packet) -> BoxFuture<'static, ()> {
        self(packet)
    }
}

/// Wraps a plain synchronous closure as a [`PacketCallback`], completing its future immediately.
pub struct Immediate<F>(F);

impl<F> Immediate<F>
where
    F: FnMut(Packet) + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> PacketCallback for Immediate<F>
where
    F: FnMut(Packet) + Send + 'static,
{
    fn call(&mut self, packet: Packet) -> BoxFuture<'static, ()> {
        (self.0)(packet);
        Box::pin(future::ready(()))
    }
}

pub type BoxedCallback = Box<dyn PacketCallback>;

/// Wraps one [`BoxedCallback`] so it can be installed into more than one place at once: a
/// periodic action's successive `ActionRegistry` entries (a fresh `ActionID` every tick), or
/// several event subscriptions registered from one `register_event` call. Every handle delegates
/// to the same underlying closure and its captured state.
#[derive(Clone)]
pub struct SharedCallback(Arc<AsyncMutex<BoxedCallback>>);

impl SharedCallback {
    #[must_use]
    pub fn new(inner: BoxedCallback) -> Self {
        Self(Arc::new(AsyncMutex::new(inner)))
    }

    /// A fresh [`BoxedCallback`] handle sharing this instance's state.
    #[must_use]
    pub fn handle(&self) -> BoxedCallback {
        Box::new(SharedHandle(self.0.clone()))
    }
}

struct SharedHandle(Arc<AsyncMutex<BoxedCallback>>);

impl PacketCallback for SharedHandle {
    fn call(&mut self, packet: Packet) -> BoxFuture<'static, ()> {
        let inner = self.0.clone();
        Box::pin(async move {
            inner.lock().await.call(packet).await;
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn sync_wrapper_runs_immediately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let mut cb = Immediate::new(move |_packet: Packet| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        cb.call(Packet::action("Ping")).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn boxed_callback_is_object_safe() {
        let mut boxed: BoxedCallback = Box::new(Immediate::new(|_: Packet| {}));
        boxed.call(Packet::action("Ping")).await;
    }

    #[tokio::test]
    async fn shared_handles_all_observe_every_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let shared = SharedCallback::new(Box::new(Immediate::new(move |_: Packet| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        })));

        let mut a = shared.handle();
        let mut b = shared.handle();

        a.call(Packet::action("Ping")).await;
        b.call(Packet::action("Ping")).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

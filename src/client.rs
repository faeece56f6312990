//! Orchestrates the other modules: connect, handshake, event loop, reconnect.
//!
//! Modelled as an `actix` actor (`ClientActor`), the house's own concurrency primitive
//! (`titanirc-server/src/entities/user/mod.rs`'s `User` actor is the closest analogue: it owns an
//! `actix::io::FramedWrite`, schedules its own keep-alive via `ctx.run_later`, and implements
//! `WriteHandler`). The actor's mailbox processes one message at a time and `ctx.spawn`/
//! `ctx.run_interval` schedule sibling futures on the same single-threaded arbiter: one driving
//! task plus its siblings, never preempted.
//!
//! [`Client`] is the public handle: a thin wrapper around `Addr<ClientActor>` plus the oneshot
//! receiver that `connect()` awaits.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use std::sync::Arc;

use actix::prelude::*;
use actix::io::WriteHandler;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::io::WriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tracing::{info, instrument, warn};

use crate::action::Repeat;
use crate::callback::{BoxedCallback, PacketCallback};
use crate::codec::Codec;
use crate::config::ClientConfig;
use crate::dispatcher::{self, Outcome};
use crate::error::Error;
use crate::id_generator::IdGenerator;
use crate::packet::Packet;
use crate::registry::ActionRegistry;
use crate::scheduler::Scheduler;
use crate::session;
use crate::subscription::SubscriptionSet;
use crate::transport::{self, PacketReader, PacketWriter};

/// The connection's current lifecycle state: whether the socket is connected, whether login
/// has succeeded, and the banner the peer sent (if any).
#[derive(Debug, Clone, Default)]
pub struct ConnectionState {
    pub connected: bool,
    pub authenticated: bool,
    pub banner: Option<String>,
}

struct RegisterEvent {
    pattern: String,
    callback: BoxedCallback,
}

impl Message for RegisterEvent {
    type Result = ();
}

struct CreateAction {
    packet: Packet,
    callback: Option<BoxedCallback>,
    repeat: Repeat,
}

impl Message for CreateAction {
    type Result = ();
}

struct SpawnTask(BoxFuture<'static, ()>);

impl Message for SpawnTask {
    type Result = ();
}

/// The actor driving one client's connection lifecycle. Not constructed directly: see
/// [`Client::new`].
struct ClientActor {
    config: ClientConfig,
    ids: Arc<IdGenerator>,
    registry: ActionRegistry,
    subscriptions: SubscriptionSet,
    scheduler: Scheduler,
    writer: Option<PacketWriter>,
    state: ConnectionState,
    reconnect_attempts: u32,
    pending_one_shots: Vec<(Packet, Option<BoxedCallback>)>,
    pending_tasks: Vec<BoxFuture<'static, ()>>,
    periodic_intervals: Vec<Option<SpawnHandle>>,
    banner_callback: Option<Box<dyn FnMut(String) + Send>>,
    done: Option<oneshot::Sender<Result<(), Error>>>,
}

impl ClientActor {
    fn new(
        config: ClientConfig,
        banner_callback: Option<Box<dyn FnMut(String) + Send>>,
        done: oneshot::Sender<Result<(), Error>>,
    ) -> Self {
        let mut scheduler = Scheduler::new();
        if config.ping_enabled() {
            scheduler.register_ping(config.ping_delay);
        }

        Self {
            ids: Arc::new(IdGenerator::new("ami")),
            registry: ActionRegistry::new(),
            subscriptions: SubscriptionSet::new(),
            scheduler,
            writer: None,
            state: ConnectionState::default(),
            reconnect_attempts: 0,
            pending_one_shots: Vec::new(),
            pending_tasks: Vec::new(),
            periodic_intervals: Vec::new(),
            banner_callback,
            done: Some(done),
            config,
        }
    }

    /// `Disconnected -> Connecting`: opens the TCP socket and performs the login handshake. The
    /// connect and login work happens in a spawned future; `ClientActor` state only changes back
    /// on the actor thread, in the `.map` continuation.
    #[instrument(skip(self, ctx), fields(host = %self.config.host, port = self.config.port))]
    fn begin_connect(&mut self, ctx: &mut Context<Self>) {
        self.state = ConnectionState::default();

        let host = self.config.host.clone();
        let port = self.config.port;
        let connect_timeout = self.config.connect_timeout;
        let username = self.config.username.clone();
        let secret = self.config.secret.clone();
        let ids = self.ids.clone();

        let fut = async move {
            let stream = transport::connect(&host, port, connect_timeout).await?;
            let (read, write) = transport::split(stream);
            let mut reader: PacketReader = tokio_util::codec::FramedRead::new(read, Codec::new());
            let mut writer = tokio_util::codec::FramedWrite::new(write, Codec::new());

            let outcome = session::login(&mut reader, &mut writer, &ids, &username, &secret).await?;
            let write_half: WriteHalf<TcpStream> = writer.into_inner();

            Ok::<_, Error>((reader, write_half, outcome))
        };

        ctx.spawn(fut.into_actor(self).map(|res, act, ctx| match res {
            Ok((reader, write_half, outcome)) => act.on_authenticated(reader, write_half, outcome, ctx),
            Err(Error::AuthFailed(message)) => {
                warn!(%message, "login rejected, giving up (no auto-retry on AuthFailed)");
                act.finish(Err(Error::AuthFailed(message)), ctx);
            }
            Err(err) => act.schedule_reconnect_or_give_up(ctx, err),
        }));
    }

    /// `Authenticating → Running`: replays queued one-shots and (re)arms every periodic action,
    /// then starts the read loop.
    fn on_authenticated(
        &mut self,
        reader: PacketReader,
        write_half: WriteHalf<TcpStream>,
        outcome: session::LoginOutcome,
        ctx: &mut Context<Self>,
    ) {
        self.state = ConnectionState {
            connected: true,
            authenticated: true,
            banner: outcome.banner.clone(),
        };
        self.reconnect_attempts = 0;

        if let (Some(banner), Some(cb)) = (outcome.banner, self.banner_callback.as_mut()) {
            cb(banner);
        }

        self.writer = Some(PacketWriter::new(write_half, Codec::new(), ctx));
        ctx.add_stream(reader);

        for (packet, callback) in std::mem::take(&mut self.pending_one_shots) {
            self.submit_now(packet, callback, None);
        }

        for idx in 0..self.scheduler.periodic_actions().len() {
            self.arm_periodic(idx, ctx);
        }

        for task in std::mem::take(&mut self.pending_tasks) {
            self.spawn_callback(ctx, task);
        }

        info!("session established");
        self.maybe_auto_close(ctx);
    }

    /// Submits `packet` immediately (the writer must already exist: callers check
    /// `state.authenticated` before queuing versus submitting).
    fn submit_now(&mut self, packet: Packet, callback: Option<BoxedCallback>, periodic: Option<Duration>) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        let sent = self.registry.submit(&self.ids, packet, callback, periodic);
        writer.write(sent);
    }

    /// Starts (or restarts, after reconnect) the interval for periodic action `idx`: an immediate
    /// first submission, then a fresh one every `delay`.
    fn arm_periodic(&mut self, idx: usize, ctx: &mut Context<Self>) {
        self.submit_periodic_tick(idx, ctx);

        let Some(delay) = self.scheduler.periodic_actions().get(idx).map(|pa| pa.delay) else {
            return;
        };
        let handle = ctx.run_interval(delay, move |act, ctx| {
            act.submit_periodic_tick(idx, ctx);
        });

        while self.periodic_intervals.len() <= idx {
            self.periodic_intervals.push(None);
        }
        self.periodic_intervals[idx] = Some(handle);
    }

    /// One tick of periodic action `idx`: a fresh `ActionID` every time. The built-in ping
    /// additionally checks the outstanding-ping liveness counter before sending another one.
    fn submit_periodic_tick(&mut self, idx: usize, ctx: &mut Context<Self>) {
        let Some((is_ping, delay, template, callback)) =
            self.scheduler.periodic_actions().get(idx).map(|pa| {
                let (template, callback) = pa.tick();
                (pa.is_ping, pa.delay, template, callback)
            })
        else {
            return;
        };

        if is_ping {
            if self.scheduler.peer_is_dead() {
                self.on_connection_lost(
                    ctx,
                    Error::ConnectionLost("no ping reply within the liveness threshold".to_string()),
                );
                return;
            }
            self.scheduler.note_ping_sent();
        }

        self.submit_now(template, callback, Some(delay));
    }

    /// Spawns a callback future, catching (and logging) a panic rather than tearing the
    /// connection down.
    fn spawn_callback(&mut self, ctx: &mut Context<Self>, fut: BoxFuture<'static, ()>) {
        let guarded = AssertUnwindSafe(fut).catch_unwind().map(|result| {
            if result.is_err() {
                tracing::error!("a user callback panicked; the connection is unaffected");
            }
        });
        ctx.spawn(guarded.into_actor(self));
    }

    /// `Running -> Closing`, triggered by the idle rule: no subscriptions and no in-flight or
    /// user-registered periodic actions remain. The built-in ping is excluded: see
    /// `Scheduler::user_periodic_is_empty`.
    fn maybe_auto_close(&mut self, ctx: &mut Context<Self>) {
        if !self.state.authenticated {
            return;
        }

        if self.subscriptions.is_empty() && self.registry.is_empty() && self.scheduler.user_periodic_is_empty() {
            info!("idle: no subscriptions or actions remain, closing");
            self.begin_close(ctx);
        }
    }

    fn begin_close(&mut self, ctx: &mut Context<Self>) {
        self.state.connected = false;
        self.state.authenticated = false;
        self.cancel_intervals(ctx);
        self.writer = None;
        self.finish(Ok(()), ctx);
    }

    /// `Running -> Connecting`: a read error, EOF, or `Event: Shutdown`. Non-periodic in-flight
    /// actions are dropped; periodic actions are preserved for replay once reconnected.
    #[instrument(skip(self, ctx))]
    fn on_connection_lost(&mut self, ctx: &mut Context<Self>, err: Error) {
        if !self.state.connected {
            // already torn down by a prior call this tick (e.g. both a read error and the
            // periodic ping's liveness check firing before the actor next polls).
            return;
        }

        warn!(error = %err, "connection lost");
        self.state.connected = false;
        self.state.authenticated = false;
        self.writer = None;
        self.cancel_intervals(ctx);
        self.registry.clear_non_periodic();

        self.schedule_reconnect_or_give_up(ctx, err);
    }

    fn cancel_intervals(&mut self, ctx: &mut Context<Self>) {
        for handle in self.periodic_intervals.drain(..).flatten() {
            ctx.cancel_future(handle);
        }
    }

    /// `Connecting -> Disconnected` (give up) or stays in `Connecting` (sleep and retry).
    /// `reconnect_timeout == 0` means give up rather than retry.
    fn schedule_reconnect_or_give_up(&mut self, ctx: &mut Context<Self>, err: Error) {
        if !self.config.reconnect_enabled() {
            warn!(error = %err, "reconnect disabled, giving up");
            self.finish(Err(err), ctx);
            return;
        }

        let backoff = self.config.reconnect_timeout
            + self.config.reconnect_timeout_increase * self.reconnect_attempts;
        self.reconnect_attempts = self.reconnect_attempts.saturating_add(1);

        warn!(error = %err, delay = ?backoff, "reconnecting");
        ctx.run_later(backoff, |act, ctx| act.begin_connect(ctx));
    }

    /// Resolves `connect()`'s future and stops the actor. Idempotent: a second call is a no-op
    /// (the oneshot sender is only `Some` once).
    fn finish(&mut self, result: Result<(), Error>, ctx: &mut Context<Self>) {
        if let Some(tx) = self.done.take() {
            let _ = tx.send(result);
        }
        ctx.stop();
    }
}

impl Actor for ClientActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.begin_connect(ctx);
    }
}

impl WriteHandler<std::io::Error> for ClientActor {
    /// A write/flush failure is treated as `ConnectionLost`: route it through the same reconnect
    /// path as a read error rather than letting the actor's default handler stop it outright.
    fn error(&mut self, err: std::io::Error, ctx: &mut Self::Context) -> Running {
        self.on_connection_lost(ctx, Error::from(err));
        Running::Continue
    }
}

impl StreamHandler<Result<Packet, std::io::Error>> for ClientActor {
    fn handle(&mut self, item: Result<Packet, std::io::Error>, ctx: &mut Self::Context) {
        let packet = match item {
            Ok(packet) => packet,
            Err(err) => {
                self.on_connection_lost(ctx, Error::from(err));
                return;
            }
        };

        self.scheduler.note_packet_received();

        match dispatcher::dispatch(packet, &mut self.registry, &mut self.subscriptions) {
            Outcome::Shutdown => {
                self.on_connection_lost(ctx, Error::ConnectionLost("peer sent Event: Shutdown".to_string()));
            }
            Outcome::Callbacks { futures, .. } => {
                for fut in futures {
                    self.spawn_callback(ctx, fut);
                }
                self.maybe_auto_close(ctx);
            }
        }
    }

    fn finished(&mut self, ctx: &mut Self::Context) {
        self.on_connection_lost(ctx, Error::ConnectionLost("connection closed by peer".to_string()));
    }
}

impl Handler<RegisterEvent> for ClientActor {
    type Result = ();

    fn handle(&mut self, msg: RegisterEvent, _ctx: &mut Self::Context) -> Self::Result {
        self.subscriptions.register(msg.pattern, msg.callback);
    }
}

impl Handler<CreateAction> for ClientActor {
    type Result = ();

    fn handle(&mut self, msg: CreateAction, ctx: &mut Self::Context) -> Self::Result {
        match msg.repeat {
            Repeat::None => {
                if self.state.authenticated {
                    self.submit_now(msg.packet, msg.callback, None);
                } else {
                    self.pending_one_shots.push((msg.packet, msg.callback));
                }
            }
            Repeat::Periodic(delay) => {
                let idx = self.scheduler.register(msg.packet, msg.callback, delay);
                if self.state.authenticated {
                    self.arm_periodic(idx, ctx);
                }
            }
        }
    }
}

impl Handler<SpawnTask> for ClientActor {
    type Result = ();

    fn handle(&mut self, msg: SpawnTask, ctx: &mut Self::Context) -> Self::Result {
        if self.state.authenticated {
            self.spawn_callback(ctx, msg.0);
        } else {
            self.pending_tasks.push(msg.0);
        }
    }
}

/// The public entry point: construct with [`Client::new`], then `register_event`/`create_action`
/// to arm it and `connect` to run it. Must be constructed from within a running actix `System`
/// (e.g. inside `#[actix_rt::main]`), since it spawns the driving `ClientActor` immediately.
pub struct Client {
    addr: Addr<ClientActor>,
    done: AsyncMutex<Option<oneshot::Receiver<Result<(), Error>>>>,
}

impl Client {
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self::new_inner(config, None)
    }

    /// Like [`Client::new`], but fires `on_banner` once with the negotiated AMI banner after a
    /// successful login.
    #[must_use]
    pub fn with_banner_callback(config: ClientConfig, on_banner: impl FnMut(String) + Send + 'static) -> Self {
        Self::new_inner(config, Some(Box::new(on_banner)))
    }

    fn new_inner(config: ClientConfig, banner_callback: Option<Box<dyn FnMut(String) + Send>>) -> Self {
        let (tx, rx) = oneshot::channel();
        let addr = ClientActor::create(move |_ctx| ClientActor::new(config, banner_callback, tx));

        Self {
            addr,
            done: AsyncMutex::new(Some(rx)),
        }
    }

    /// Registers `callback` against every pattern in `patterns` (literal `Event` value, or `"*"`
    /// for all events). One shared callback instance backs every pattern.
    pub fn register_event<C>(&self, patterns: &[&str], callback: C)
    where
        C: PacketCallback,
    {
        let shared = crate::callback::SharedCallback::new(Box::new(callback));
        for pattern in patterns {
            self.addr.do_send(RegisterEvent {
                pattern: (*pattern).to_string(),
                callback: shared.handle(),
            });
        }
    }

    /// Enqueues `packet` to be sent after the next successful login, or immediately if the client
    /// is already `Running`.
    pub fn create_action<C>(&self, packet: Packet, callback: Option<C>, repeat: Repeat)
    where
        C: PacketCallback,
    {
        self.addr.do_send(CreateAction {
            packet,
            callback: callback.map(|cb| Box::new(cb) as BoxedCallback),
            repeat,
        });
    }

    /// Accepts a user background task, launched once the client has authenticated (immediately,
    /// if already `Running`).
    pub fn create_asyncio_task<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.addr.do_send(SpawnTask(Box::pin(task)));
    }

    /// Blocks until the client reaches a terminal `Disconnected` state from which it will not
    /// auto-reconnect: `AuthFailed`, a refused connect with reconnect disabled, or the idle
    /// auto-close rule. Awaiting this a second time returns a `ConnectionLost` error rather than
    /// hanging, since the underlying signal is single-shot.
    pub async fn connect(&self) -> Result<(), Error> {
        let rx = self.done.lock().await.take();
        match rx {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(Error::ConnectionLost("client actor stopped unexpectedly".to_string()))),
            None => Err(Error::ConnectionLost("connect() already awaited".to_string())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn connection_state_defaults_to_disconnected() {
        let state = ConnectionState::default();
        assert!(!state.connected);
        assert!(!state.authenticated);
        assert!(state.banner.is_none());
    }
}

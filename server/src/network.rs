//! Server network layer: TCP accept loop and tick/broadcast scheduling

use crate::broadcast::{broadcast_snapshot, run_writer};
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::game::{GameContext, SharedContext};
use crate::session::run_session;
use log::{debug, error, info, warn};
use shared::ServerMessage;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};

/// Cooperative stop signal shared by the accept loop, the tick loop and
/// every session.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Main server coordinating connections and the simulation
pub struct Server {
    listener: TcpListener,
    context: SharedContext,
    config: ServerConfig,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl Server {
    /// Validates `config` and binds the listening socket.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;
        let listener = TcpListener::bind(config.bind_address()).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let context = GameContext::new(&config).into_shared();
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Server {
            listener,
            context,
            config,
            shutdown_tx: Arc::new(shutdown_tx),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn context(&self) -> SharedContext {
        Arc::clone(&self.context)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown_tx),
        }
    }

    /// Runs the tick loop and the accept loop until shutdown is signalled.
    /// The listening socket is closed when this returns.
    pub async fn run(self) -> Result<(), ServerError> {
        let tick_task = tokio::spawn(run_tick_loop(
            Arc::clone(&self.context),
            self.config.tick_duration(),
            self.shutdown_tx.subscribe(),
        ));

        let mut shutdown = self.shutdown_tx.subscribe();
        while !*shutdown.borrow() {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => self.admit(stream, addr).await,
                    Err(e) => error!("Accept failed: {}", e),
                },
                _ = shutdown.changed() => break,
            }
        }

        info!("Server shutting down");
        self.shutdown_tx.send_replace(true);
        drop(self.listener);
        if let Err(e) = tick_task.await {
            error!("Tick loop panicked: {}", e);
        }
        Ok(())
    }

    /// Registers a new connection and spawns its reader and writer tasks,
    /// or turns it away with `SERVER_FULL` when the pool is exhausted.
    async fn admit(&self, stream: TcpStream, addr: SocketAddr) {
        let (tx, rx) = mpsc::channel(self.config.outbound_queue);
        let admitted = self
            .context
            .lock()
            .await
            .connections
            .add_connection(addr, tx.clone());

        let Some(conn) = admitted else {
            warn!("Rejecting connection from {}: server full", addr);
            tokio::spawn(reject(stream));
            return;
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not set TCP_NODELAY for {}: {}", addr, e);
        }
        let (reader, writer) = stream.into_split();
        tokio::spawn(run_writer(writer, rx, conn));
        tokio::spawn(run_session(
            Arc::clone(&self.context),
            conn,
            reader,
            tx,
            self.shutdown_tx.subscribe(),
            self.config.reassembly_capacity,
        ));
    }
}

async fn reject(mut stream: TcpStream) {
    let notice = ServerMessage::ServerFull.encode();
    if let Err(e) = stream.write_all(notice.as_bytes()).await {
        debug!("Failed to send rejection notice: {}", e);
    }
    let _ = stream.shutdown().await;
}

/// Fixed-rate loop: advance the world, then push a snapshot to everyone.
/// Both happen under one acquisition of the state lock.
pub async fn run_tick_loop(
    context: SharedContext,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // Skip the first tick since it fires immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }

        let mut ctx = context.lock().await;
        ctx.tick(Instant::now());
        broadcast_snapshot(&mut ctx);
    }
    debug!("Tick loop stopped");
}

//! TCP front end: accepts connections and runs one session task per client

use crate::engine::{Engine, EngineError};
use crate::session::run_session;
use crate::state::{ServerState, SharedState};
use log::{debug, error, info};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Listening server owning the shared state
pub struct Server<E> {
    listener: TcpListener,
    state: SharedState<E>,
}

impl<E: Engine + 'static> Server<E> {
    pub fn new(listener: TcpListener, state: ServerState<E>) -> Self {
        Self {
            listener,
            state: state.into_shared(),
        }
    }

    pub async fn bind(addr: &str, state: ServerState<E>) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::new(listener, state))
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn state(&self) -> SharedState<E> {
        Arc::clone(&self.state)
    }

    /// Accepts clients until a session reports an engine failure, which is
    /// returned. Accept errors are logged and do not stop the loop.
    pub async fn run(self) -> EngineError {
        let (fatal_tx, mut fatal_rx) = mpsc::unbounded_channel();
        info!("Accepting connections on {:?}", self.listener.local_addr());

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => self.spawn_session(stream, addr, fatal_tx.clone()),
                    Err(e) => error!("Failed to accept connection: {}", e),
                },
                Some(failure) = fatal_rx.recv() => return failure,
            }
        }
    }

    fn spawn_session(
        &self,
        stream: TcpStream,
        addr: SocketAddr,
        fatal_tx: mpsc::UnboundedSender<EngineError>,
    ) {
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let (reader, writer) = stream.into_split();
            debug!("Session for {} started", addr);
            if let Err(failure) =
                run_session(state, BufReader::new(reader), writer, addr.to_string()).await
            {
                let _ = fatal_tx.send(failure);
            }
            debug!("Session for {} finished", addr);
        });
    }
}

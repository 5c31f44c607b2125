//! # Seatbook Server
//!
//! TCP front-end for the seat [`Inventory`].
//!
//! The server accepts connections forever and serves each one on its own task
//! with [`handler::handle_connection`]. There is no connection cap and no idle
//! timeout: a connection lives until the peer closes it or an I/O error occurs.
//! An I/O error only ends the connection it happened on.
//!
//! ## Example
//!
//! ```rust,no_run
//! use seatbook_core::Inventory;
//! use seatbook_server::Server;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = Server::bind("127.0.0.1:8099", Arc::new(Inventory::new())).await?;
//! server.run().await;
//! # Ok(())
//! # }
//! ```

use seatbook_core::inventory::Inventory;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{Instrument, debug, info, info_span, warn};

/// Environment-driven server configuration
pub mod config;

/// Per-connection request loop
pub mod handler;

pub use config::Config;

/// Pause after a failed `accept` before trying again.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Error types for the server
pub mod error {
    use thiserror::Error;

    /// Errors that can occur while starting the server
    #[derive(Error, Debug)]
    pub enum ServerError {
        /// The listening socket could not be opened
        #[error("error while opening socket at [{address}]: {source}")]
        Bind {
            /// Requested address
            address: String,
            /// Underlying I/O error
            #[source]
            source: std::io::Error,
        },

        /// The bound address could not be read back
        #[error("could not determine local address: {0}")]
        LocalAddr(#[source] std::io::Error),
    }
}

pub use error::ServerError;

/// Accept loop over a bound listener.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    inventory: Arc<Inventory>,
    next_connection: AtomicU64,
}

impl Server {
    /// Bind a listener on `address`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the socket cannot be opened.
    pub async fn bind<A>(address: A, inventory: Arc<Inventory>) -> Result<Self, ServerError>
    where
        A: ToSocketAddrs + std::fmt::Display,
    {
        let display = address.to_string();
        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| ServerError::Bind {
                address: display,
                source,
            })?;
        let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

        info!(address = %local_addr, "Server listening");
        Ok(Self {
            listener,
            local_addr,
            inventory,
            next_connection: AtomicU64::new(0),
        })
    }

    /// Address the listener is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The inventory served by this server.
    #[must_use]
    pub fn inventory(&self) -> Arc<Inventory> {
        Arc::clone(&self.inventory)
    }

    /// Accept connections forever.
    pub async fn run(self) {
        self.run_until(std::future::pending()).await;
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// Connections already being served keep running on their own tasks.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Ready to accept connections");

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("No longer accepting connections");
                    return;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => self.spawn_handler(stream, peer),
                    Err(error) => {
                        warn!(%error, "Error accepting connection");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
            }
        }
    }

    fn spawn_handler(&self, stream: TcpStream, peer: SocketAddr) {
        let id = self.next_connection.fetch_add(1, Ordering::Relaxed);
        let inventory = Arc::clone(&self.inventory);
        let span = info_span!("connection", id, %peer);

        tokio::spawn(
            async move {
                debug!("Connection accepted");
                match handler::handle_connection(stream, &inventory).await {
                    Ok(()) => info!("Closing connection"),
                    Err(error) => warn!(%error, "Closing connection after I/O error"),
                }
            }
            .instrument(span),
        );
    }
}

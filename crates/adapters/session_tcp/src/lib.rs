//! # dehum-adapter-session-tcp
//!
//! Operator sessions over plain TCP, one line per command.
//!
//! ## Responsibilities
//! - Listen on the configured address with the configured backlog
//! - Give every connection its own task and [`SessionId`]
//! - Forward each received line to the gateway dispatcher and write back
//!   the reply followed by the next prompt
//! - Buffer at most [`MAX_LINE_LEN`] bytes per line; the rest of an overlong
//!   line is discarded and the line is answered as an invalid command
//! - Tear a session down on disconnect or I/O error without touching any
//!   other session
//!
//! ## Dependency rule
//! Same as other adapters: depends on `dehum-app` and `dehum-domain`.

mod error;

use std::future::Future;
use std::net::SocketAddr;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpSocket, TcpStream};

use dehum_app::services::gateway_handle::GatewayHandle;
use dehum_app::services::gateway_service::MAX_LINE_LEN;
use dehum_domain::id::SessionId;
use dehum_domain::time::{elapsed_secs, now};

pub use error::SessionError;

/// Listening socket for operator sessions.
pub struct SessionServer {
    listener: TcpListener,
}

impl SessionServer {
    /// Bind `addr` with address reuse enabled.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Bind`] if the socket cannot be created, bound
    /// or put into listening mode.
    pub fn bind(addr: SocketAddr, backlog: u32) -> Result<Self, SessionError> {
        let bind_err = |source| SessionError::Bind { addr, source };
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(bind_err)?;
        socket.set_reuseaddr(true).map_err(bind_err)?;
        socket.bind(addr).map_err(bind_err)?;
        let listener = socket.listen(backlog).map_err(bind_err)?;
        Ok(Self { listener })
    }

    /// The bound address, useful when binding port 0.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if the OS cannot report the address.
    pub fn local_addr(&self) -> Result<SocketAddr, SessionError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// Sessions already running are left to finish on their own.
    pub async fn serve(self, gateway: GatewayHandle, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        if let Ok(addr) = self.listener.local_addr() {
            tracing::info!(%addr, "accepting operator sessions");
        }

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tokio::spawn(run_session(stream, peer, gateway.clone()));
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to accept connection");
                    }
                },
            }
        }
        tracing::info!("session listener stopped");
    }
}

async fn run_session(stream: TcpStream, peer: SocketAddr, gateway: GatewayHandle) {
    let session = SessionId::new();
    let started = now();
    tracing::info!(%session, %peer, "connection accepted");

    match converse(stream, &gateway).await {
        Ok(()) => {
            tracing::info!(%session, %peer, duration_secs = elapsed_secs(started), "connection closed");
        }
        Err(err) => {
            tracing::warn!(%session, %peer, duration_secs = elapsed_secs(started), error = %err, "session ended with error");
        }
    }
}

async fn converse(stream: TcpStream, gateway: &GatewayHandle) -> Result<(), SessionError> {
    let (read, mut write) = stream.into_split();
    let mut reader = BufReader::new(read);

    write.write_all(gateway.prompt().await?.as_bytes()).await?;

    // One byte past the limit, so the gateway can tell the line was cut.
    let limit = u64::try_from(MAX_LINE_LEN).unwrap_or(u64::MAX).saturating_add(1);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if (&mut reader).take(limit).read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        if buf.len() > MAX_LINE_LEN && buf.last() != Some(&b'\n') {
            tracing::warn!(len = buf.len(), "discarding rest of overlong line");
            discard_rest_of_line(&mut reader).await?;
        }
        let line = String::from_utf8_lossy(&buf).into_owned();
        let reply = gateway.submit(line).await?;
        write.write_all(reply.as_bytes()).await?;
    }
}

async fn discard_rest_of_line<R>(reader: &mut R) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(());
        }
        if let Some(pos) = available.iter().position(|&byte| byte == b'\n') {
            reader.consume(pos + 1);
            return Ok(());
        }
        let len = available.len();
        reader.consume(len);
    }
}

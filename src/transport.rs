// Copyright (C) 2022 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of syslog-relay.
//
// syslog-relay is free software: you can redistribute it and/or modify it under the terms of the
// GNU General Public License as published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// mpdpopm is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even
// the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details.
//
// You should have received a copy of the GNU General Public License along with mpdpopm.  If not,
// see <http://www.gnu.org/licenses/>.

//! The syslog transport layer.
//!
//! This module defines the [`Transport`] trait that all implementations must support, as well as
//! the UDP & TCP implementations.
//!
//! Both take the already-encoded wire bytes; neither appends framing of its own (the encoder owns
//! the trailing newline and, optionally, the octet-count prefix). Failures are returned to the
//! caller here-- it is the relay layer's job to swallow them into the error sink so that a dead
//! collector never takes the instrumented application down with it.
//!
//! # Examples
//!
//! To send syslog messages over UDP to a daemon listening on port 514 (the default) on localhost:
//!
//! ```rust
//! use syslog_relay::transport::UdpTransport;
//! let transpo = UdpTransport::local().unwrap();
//! ```
//!
//! To get a TCP transport that will connect lazily on first write:
//!
//! ```rust
//! use syslog_relay::transport::{Protocol, TcpTransport, TransportEndpoint};
//! let endpoint = TransportEndpoint::new("some-host.domain.io", 6514, Protocol::Tcp).unwrap();
//! let transpo = TcpTransport::new(endpoint); // no connection attempt yet
//! ```

use crate::error::{Error, Result};

use backtrace::Backtrace;

use std::{
    io::Write,
    net::TcpStream,
    sync::Mutex,
};

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                       transport endpoint                                       //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Delivery protocol for a [`TransportEndpoint`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Protocol {
    /// Reliable, ordered; one persistent connection
    Tcp,
    /// Best-effort; one datagram per message
    Udp,
}

/// A validated collector address.
///
/// Construction is the fail-fast moment: a port outside [1, 65535] is rejected here, at
/// configuration time, never at per-record time. (The upper bound is enforced by `u16`; zero is
/// the one representable invalid value.)
#[derive(Clone, Debug)]
pub struct TransportEndpoint {
    host: String,
    port: u16,
    protocol: Protocol,
}

impl TransportEndpoint {
    pub fn new(host: impl Into<String>, port: u16, protocol: Protocol) -> Result<TransportEndpoint> {
        if port == 0 {
            return Err(Error::BadPort {
                port,
                back: Backtrace::new(),
            });
        }
        Ok(TransportEndpoint {
            host: host.into(),
            port,
            protocol,
        })
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// The `host:port` form handed to the socket APIs.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                      transport mechanisms                                      //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Operations all transport layers must support.
pub trait Transport {
    /// Send a slice of bytes on this transport mechanism.
    ///
    /// It would be nice to make this more general, to accept input in a variety of forms that
    /// might support zero-copy, but at the end of the day UDP & TCP both operate on a contiguous
    /// slice of `u8`, so we require that our caller assemble one.
    fn send(&self, buf: &[u8]) -> Result<usize>;
}

/// Sending syslog messages via UDP datagrams.
///
/// Stateless per call: one datagram per [`send`](Transport::send), no ordering, no delivery
/// guarantee. Callers relying on delivery must use [`TcpTransport`].
pub struct UdpTransport {
    socket: std::net::UdpSocket,
}

impl UdpTransport {
    /// Construct a [`Transport`] implementation via UDP at `addr`.
    pub fn new<A: std::net::ToSocketAddrs>(addr: A) -> Result<UdpTransport> {
        // Bind to any available port on localhost...
        let socket = std::net::UdpSocket::bind("127.0.0.1:0").map_err(|err| Error::Transport {
            source: Box::new(err),
            back: Backtrace::new(),
        })?;
        // and connect to the syslog daemon at `addr`:
        socket.connect(addr).map_err(|err| Error::Transport {
            source: Box::new(err),
            back: Backtrace::new(),
        })?;
        Ok(UdpTransport { socket })
    }
    /// Construct a [`Transport`] implementation via UDP at localhost:514
    pub fn local() -> Result<UdpTransport> {
        UdpTransport::new("localhost:514")
    }
    /// Construct from a validated endpoint.
    pub fn from_endpoint(endpoint: &TransportEndpoint) -> Result<UdpTransport> {
        UdpTransport::new(endpoint.addr())
    }
}

impl Transport for UdpTransport {
    fn send(&self, buf: &[u8]) -> Result<usize> {
        self.socket.send(buf).map_err(|err| Error::Transport {
            source: Box::new(err),
            back: Backtrace::new(),
        })
    }
}

/// Sending syslog messages via a persistent TCP stream.
///
/// The connection is established lazily, inside [`send`](Transport::send), under the per-writer
/// lock: if there is no live stream, connect first (a plain blocking connect-- the lock already
/// serializes writers, so a callback chain would buy nothing but complexity). On any write
/// failure the stream is abandoned, so the next `send` starts with a fresh connect. The same lock
/// guarantees that messages reach the socket in `send`-call order.
pub struct TcpTransport {
    endpoint: TransportEndpoint,
    stream: Mutex<Option<TcpStream>>,
}

impl TcpTransport {
    /// Construct a [`Transport`] implementation via TCP at `endpoint`.
    ///
    /// No connection attempt is made here; the first [`send`](Transport::send) connects.
    pub fn new(endpoint: TransportEndpoint) -> TcpTransport {
        TcpTransport {
            endpoint,
            stream: Mutex::new(None),
        }
    }

    /// Construct a [`Transport`] implementation via TCP at localhost:514
    pub fn try_default() -> Result<TcpTransport> {
        Ok(TcpTransport::new(TransportEndpoint::new(
            "localhost",
            514,
            Protocol::Tcp,
        )?))
    }

    /// True if a previous `send` left a live connection behind.
    pub fn is_connected(&self) -> bool {
        self.stream
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }
}

impl Transport for TcpTransport {
    fn send(&self, buf: &[u8]) -> Result<usize> {
        // A poisoned lock just means another writer panicked mid-send; the Option inside is
        // still coherent (worst case we reconnect), so recover it rather than propagate.
        let mut guard = self
            .stream
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut stream = match guard.take() {
            Some(stream) => stream,
            None => TcpStream::connect(self.endpoint.addr()).map_err(|err| Error::Transport {
                source: Box::new(err),
                back: Backtrace::new(),
            })?,
        };

        match stream.write_all(buf).and_then(|_| stream.flush()) {
            Ok(()) => {
                *guard = Some(stream);
                Ok(buf.len())
            }
            // the stream is dropped (abandoned) here; the next send re-establishes it
            Err(err) => Err(Error::Transport {
                source: Box::new(err),
                back: Backtrace::new(),
            }),
        }
    }
}

#[cfg(test)]
mod test {

    use super::*;

    use std::io::Read;
    use std::net::TcpListener;

    #[test]
    fn endpoint_port_is_validated_eagerly() {
        assert!(TransportEndpoint::new("localhost", 0, Protocol::Tcp).is_err());
        let ep = TransportEndpoint::new("localhost", 6514, Protocol::Udp).unwrap();
        assert_eq!(ep.addr(), "localhost:6514");
        assert_eq!(ep.protocol(), Protocol::Udp);
    }

    #[test]
    fn udp_sends_one_datagram_per_write() {
        let receiver = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = receiver.local_addr().unwrap();

        let transpo = UdpTransport::new(addr).unwrap();
        transpo.send(b"first\n").unwrap();
        transpo.send(b"second\n").unwrap();

        let mut buf = [0u8; 64];
        let n = receiver.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"first\n");
        let n = receiver.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"second\n");
    }

    #[test]
    fn tcp_connects_lazily_and_preserves_order() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let transpo = TcpTransport::new(
            TransportEndpoint::new("127.0.0.1", port, Protocol::Tcp).unwrap(),
        );
        assert!(!transpo.is_connected());

        transpo.send(b"one\n").unwrap();
        transpo.send(b"two\n").unwrap();
        assert!(transpo.is_connected());

        let (mut conn, _) = listener.accept().unwrap();
        let mut buf = [0u8; 8];
        conn.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"one\ntwo\n");
    }

    #[test]
    fn tcp_send_fails_without_listener_and_recovers() {
        // grab a port with no listener behind it
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let transpo = TcpTransport::new(
            TransportEndpoint::new("127.0.0.1", port, Protocol::Tcp).unwrap(),
        );
        assert!(transpo.send(b"lost\n").is_err());
        assert!(!transpo.is_connected());

        // a listener shows up; the next send reconnects
        let listener = TcpListener::bind(("127.0.0.1", port)).unwrap();
        transpo.send(b"found\n").unwrap();
        let (mut conn, _) = listener.accept().unwrap();
        let mut buf = [0u8; 6];
        conn.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"found\n");
    }
}

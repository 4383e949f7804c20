use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use socket2::{Domain, Protocol, Socket, Type};
use statuscast_core::config::BroadcastConfig;
use statuscast_core::error::TransportError;
use statuscast_core::traits::MessageSink;
use tokio::net::UdpSocket;
use tracing::{debug, info};

/// Fire-and-forget UDP sender to one multicast group.
///
/// The socket is created once and reused for every datagram. Must be built
/// inside a tokio runtime.
pub struct MulticastSender {
    socket: UdpSocket,
    target: SocketAddrV4,
}

impl MulticastSender {
    pub fn from_config(config: &BroadcastConfig) -> io::Result<Self> {
        Self::bind(
            SocketAddrV4::new(config.group, config.port),
            config.ttl,
            config.loopback,
            config.interface,
        )
    }

    /// `interface` of `0.0.0.0` leaves the outgoing interface to the OS.
    pub fn bind(
        target: SocketAddrV4,
        ttl: u32,
        loopback: bool,
        interface: Ipv4Addr,
    ) -> io::Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.set_multicast_ttl_v4(ttl)?;
        socket.set_multicast_loop_v4(loopback)?;
        if !interface.is_unspecified() {
            socket.set_multicast_if_v4(&interface)?;
        }

        let bind_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0));
        socket.bind(&bind_addr.into())?;
        socket.set_nonblocking(true)?;

        let socket = UdpSocket::from_std(socket.into())?;
        info!(
            group = %target,
            local = %socket.local_addr()?,
            ttl,
            loopback,
            "Multicast sender ready"
        );
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddrV4 {
        self.target
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl MessageSink for MulticastSender {
    async fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let sent = self.socket.send_to(payload, self.target).await?;
        if sent != payload.len() {
            return Err(TransportError::Truncated {
                sent,
                expected: payload.len(),
            });
        }
        debug!(bytes = sent, "Datagram sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MulticastListener;
    use chrono::{DateTime, Utc};
    use statuscast_core::models::PlaybackStatus;
    use statuscast_core::wire::{BroadcastMessage, WireFormat, DEFAULT_SERVER_ID};
    use std::time::Duration;

    #[tokio::test]
    async fn test_one_datagram_per_send() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let SocketAddr::V4(target) = receiver.local_addr().unwrap() else {
            panic!("expected an IPv4 address");
        };

        let mut sender = MulticastSender::bind(target, 1, true, Ipv4Addr::UNSPECIFIED).unwrap();
        sender.send(b"{\"a\":1}").await.unwrap();
        sender.send(b"{\"b\":2}").await.unwrap();

        let mut buf = [0u8; 64];
        let n = receiver.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"{\"a\":1}");
        let n = receiver.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"{\"b\":2}");
    }

    #[tokio::test]
    async fn test_oversized_payload_is_an_error() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let SocketAddr::V4(target) = receiver.local_addr().unwrap() else {
            panic!("expected an IPv4 address");
        };
        let mut sender = MulticastSender::bind(target, 1, true, Ipv4Addr::UNSPECIFIED).unwrap();

        let payload = vec![b'x'; crate::MAX_DATAGRAM + 1];
        assert!(sender.send(&payload).await.is_err());
    }

    #[tokio::test]
    #[ignore = "needs a multicast-capable network interface"]
    async fn test_multicast_loopback() {
        let group = Ipv4Addr::new(239, 255, 0, 101);
        let listener = MulticastListener::bind(group, 18888, Ipv4Addr::UNSPECIFIED).unwrap();
        let mut sender = MulticastSender::bind(
            SocketAddrV4::new(group, 18888),
            1,
            true,
            Ipv4Addr::UNSPECIFIED,
        )
        .unwrap();

        let at = DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000).unwrap();
        let msg = BroadcastMessage::new(PlaybackStatus::no_media(), at, DEFAULT_SERVER_ID);
        sender.send(&msg.to_json(WireFormat::Rich).unwrap()).await.unwrap();

        let datagram = tokio::time::timeout(Duration::from_secs(2), listener.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(datagram.decode().unwrap(), msg);
    }
}

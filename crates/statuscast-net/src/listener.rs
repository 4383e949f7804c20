use std::io;
use std::net::{Ipv4Addr, SocketAddr};

use socket2::{Domain, Protocol, Socket, Type};
use statuscast_core::wire::BroadcastMessage;
use tokio::net::UdpSocket;
use tracing::info;

use crate::MAX_DATAGRAM;

/// One received datagram and its sender.
#[derive(Debug, Clone)]
pub struct Datagram {
    pub from: SocketAddr,
    pub payload: Vec<u8>,
}

impl Datagram {
    pub fn decode(&self) -> Result<BroadcastMessage, serde_json::Error> {
        BroadcastMessage::from_json(&self.payload)
    }
}

/// Member of a multicast group, for observing the status stream.
pub struct MulticastListener {
    socket: UdpSocket,
    group: Ipv4Addr,
    interface: Ipv4Addr,
}

impl MulticastListener {
    /// Join `group` on `interface` (`0.0.0.0` = OS default) and listen on `port`.
    ///
    /// `SO_REUSEADDR` lets several listeners share the port on one host.
    pub fn bind(group: Ipv4Addr, port: u16, interface: Ipv4Addr) -> io::Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;

        let bind_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        socket.bind(&bind_addr.into())?;
        socket.join_multicast_v4(&group, &interface)?;
        socket.set_nonblocking(true)?;

        let socket = UdpSocket::from_std(socket.into())?;
        info!(%group, port, %interface, "Joined multicast group");
        Ok(Self {
            socket,
            group,
            interface,
        })
    }

    pub async fn recv(&self) -> io::Result<Datagram> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (n, from) = self.socket.recv_from(&mut buf).await?;
        buf.truncate(n);
        Ok(Datagram { from, payload: buf })
    }

    pub fn group(&self) -> Ipv4Addr {
        self.group
    }
}

impl Drop for MulticastListener {
    fn drop(&mut self) {
        let _ = self.socket.leave_multicast_v4(self.group, self.interface);
    }
}

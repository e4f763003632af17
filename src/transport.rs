//! The transport abstraction the browser and advertiser are generic over,
//! plus the two implementations: a real multicast-UDP transport backed by
//! `socket2`/`tokio`, and an in-memory mock for deterministic tests.
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::config::TransportConfig;
use crate::constants::{MDNS_MULTICAST_IPV4, MDNS_MULTICAST_IPV6, MDNS_PORT};
use crate::error::{DnsSdError, DnsSdResult};
use crate::message::Message;

/// The contract `ServiceBrowser`/`ServiceAdvertiser` need from the network:
/// lifecycle control, outbound send (multicast or unicast), and a lazily
/// pulled stream of incoming, already-decoded messages. Malformed datagrams
/// never reach `recv` — they're logged and dropped inside the implementation.
#[allow(async_fn_in_trait)]
pub trait Transport: Send + Sync {
    async fn start(&self) -> DnsSdResult<()>;
    async fn stop(&self) -> DnsSdResult<()>;
    /// Multicast send on every enabled family.
    async fn send(&self, message: &Message) -> DnsSdResult<()>;
    /// Unicast send to a single peer address.
    async fn send_to(&self, message: &Message, addr: SocketAddr) -> DnsSdResult<()>;
    /// Waits for the next incoming message. Returns `None` once the
    /// transport has been stopped and its queue drained.
    async fn recv(&self) -> Option<(Message, SocketAddr)>;
}

struct Sockets {
    v4: Option<Arc<UdpSocket>>,
    v6: Option<Arc<UdpSocket>>,
    tasks: Vec<JoinHandle<()>>,
}

/// The default transport: one UDP socket per enabled address family, joined
/// to the mDNS multicast group, with a background task per socket pumping
/// decoded datagrams into a shared channel.
pub struct UdpTransport {
    config: TransportConfig,
    sockets: Mutex<Option<Sockets>>,
    rx: Mutex<mpsc::UnboundedReceiver<(Message, SocketAddr)>>,
    tx: mpsc::UnboundedSender<(Message, SocketAddr)>,
}

impl UdpTransport {
    pub fn new(config: TransportConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        UdpTransport {
            config,
            sockets: Mutex::new(None),
            rx: Mutex::new(rx),
            tx,
        }
    }

    fn local_v4(&self) -> DnsSdResult<std::net::Ipv4Addr> {
        for iface in if_addrs::get_if_addrs()?.into_iter() {
            if let Some(name) = &self.config.interface_name {
                if &iface.name != name {
                    continue;
                }
            }
            if let IpAddr::V4(addr) = iface.ip() {
                if !iface.is_loopback() {
                    return Ok(addr);
                }
            }
        }
        Ok(std::net::Ipv4Addr::UNSPECIFIED)
    }

    fn bind_v4(&self) -> DnsSdResult<UdpSocket> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        #[cfg(unix)]
        socket.set_reuse_port(true)?;
        socket.set_nonblocking(true)?;
        let bind_addr: SocketAddr = (std::net::Ipv4Addr::UNSPECIFIED, MDNS_PORT).into();
        socket.bind(&bind_addr.into())?;
        socket.join_multicast_v4(&MDNS_MULTICAST_IPV4, &self.local_v4()?)?;
        Ok(UdpSocket::from_std(socket.into())?)
    }

    fn bind_v6(&self) -> DnsSdResult<UdpSocket> {
        let socket = Socket::new(Domain::IPV6, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        #[cfg(unix)]
        socket.set_reuse_port(true)?;
        socket.set_nonblocking(true)?;
        let bind_addr: SocketAddr = (std::net::Ipv6Addr::UNSPECIFIED, MDNS_PORT).into();
        socket.bind(&bind_addr.into())?;
        socket.join_multicast_v6(&MDNS_MULTICAST_IPV6, 0)?;
        Ok(UdpSocket::from_std(socket.into())?)
    }

    fn spawn_recv_task(
        socket: Arc<UdpSocket>,
        tx: mpsc::UnboundedSender<(Message, SocketAddr)>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut buf = vec![0u8; crate::constants::MAX_MDNS_MESSAGE_SIZE];
            loop {
                let (len, from) = match socket.recv_from(&mut buf).await {
                    Ok(v) => v,
                    Err(e) => {
                        log::warn!("mdns socket recv failed: {}", e);
                        break;
                    }
                };
                match Message::from_bytes(&buf[..len]) {
                    Ok(message) => {
                        if tx.send((message, from)).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        log::debug!("dropping malformed datagram from {}: {}", from, e);
                    }
                }
            }
        })
    }
}

impl Transport for UdpTransport {
    async fn start(&self) -> DnsSdResult<()> {
        let mut guard = self.sockets.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let mut tasks = Vec::new();
        let v4 = if self.config.use_ipv4 {
            let socket = Arc::new(self.bind_v4()?);
            tasks.push(Self::spawn_recv_task(socket.clone(), self.tx.clone()));
            Some(socket)
        } else {
            None
        };
        let v6 = if self.config.use_ipv6 {
            let socket = Arc::new(self.bind_v6()?);
            tasks.push(Self::spawn_recv_task(socket.clone(), self.tx.clone()));
            Some(socket)
        } else {
            None
        };

        *guard = Some(Sockets { v4, v6, tasks });
        Ok(())
    }

    async fn stop(&self) -> DnsSdResult<()> {
        let mut guard = self.sockets.lock().await;
        if let Some(sockets) = guard.take() {
            for task in sockets.tasks {
                task.abort();
            }
        }
        Ok(())
    }

    async fn send(&self, message: &Message) -> DnsSdResult<()> {
        let guard = self.sockets.lock().await;
        let sockets = guard
            .as_ref()
            .ok_or_else(|| DnsSdError::Internal("transport not started".to_string()))?;
        let bytes = message.to_bytes()?;

        if let Some(socket) = &sockets.v4 {
            let addr: SocketAddr = (MDNS_MULTICAST_IPV4, MDNS_PORT).into();
            socket.send_to(&bytes, addr).await?;
        }
        if let Some(socket) = &sockets.v6 {
            let addr: SocketAddr = (MDNS_MULTICAST_IPV6, MDNS_PORT).into();
            socket.send_to(&bytes, addr).await?;
        }
        Ok(())
    }

    async fn send_to(&self, message: &Message, addr: SocketAddr) -> DnsSdResult<()> {
        let guard = self.sockets.lock().await;
        let sockets = guard
            .as_ref()
            .ok_or_else(|| DnsSdError::Internal("transport not started".to_string()))?;
        let bytes = message.to_bytes()?;

        let socket = match addr {
            SocketAddr::V4(_) => sockets.v4.as_ref(),
            SocketAddr::V6(_) => sockets.v6.as_ref(),
        }
        .ok_or_else(|| DnsSdError::Internal("no socket for that address family".to_string()))?;

        socket.send_to(&bytes, addr).await?;
        Ok(())
    }

    async fn recv(&self) -> Option<(Message, SocketAddr)> {
        self.rx.lock().await.recv().await
    }
}

/// An in-memory transport for browser/advertiser unit tests: `send`/`send_to`
/// record what would have gone out, and `inject` feeds a message back in as
/// if it had arrived over the wire.
pub struct MockTransport {
    sent: std::sync::Mutex<Vec<(Message, Option<SocketAddr>)>>,
    inbox_tx: mpsc::UnboundedSender<(Message, SocketAddr)>,
    inbox_rx: Mutex<mpsc::UnboundedReceiver<(Message, SocketAddr)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        MockTransport {
            sent: std::sync::Mutex::new(Vec::new()),
            inbox_tx,
            inbox_rx: Mutex::new(inbox_rx),
        }
    }

    /// Feeds `message` into the transport's incoming stream as if it had
    /// just arrived from `from`.
    pub fn inject(&self, message: Message, from: SocketAddr) {
        let _ = self.inbox_tx.send((message, from));
    }

    /// Every message handed to `send`/`send_to` so far, in order.
    pub fn sent_messages(&self) -> Vec<Message> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(m, _)| m.clone())
            .collect()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    async fn start(&self) -> DnsSdResult<()> {
        Ok(())
    }

    async fn stop(&self) -> DnsSdResult<()> {
        Ok(())
    }

    async fn send(&self, message: &Message) -> DnsSdResult<()> {
        self.sent.lock().unwrap().push((message.clone(), None));
        Ok(())
    }

    async fn send_to(&self, message: &Message, addr: SocketAddr) -> DnsSdResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push((message.clone(), Some(addr)));
        Ok(())
    }

    async fn recv(&self) -> Option<(Message, SocketAddr)> {
        self.inbox_rx.lock().await.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::mdns_query;

    #[tokio::test]
    async fn mock_records_sent_messages() {
        let transport = MockTransport::new();
        let name = "_http._tcp.local".parse().unwrap();
        transport.send(&mdns_query(&name)).await.unwrap();
        assert_eq!(transport.sent_messages().len(), 1);
    }

    #[tokio::test]
    async fn mock_replays_injected_messages() {
        let transport = MockTransport::new();
        let name = "_http._tcp.local".parse().unwrap();
        let addr: SocketAddr = "127.0.0.1:5353".parse().unwrap();
        transport.inject(mdns_query(&name), addr);

        let (msg, from) = transport.recv().await.unwrap();
        assert_eq!(from, addr);
        assert!(msg.is_mdns());
    }
}

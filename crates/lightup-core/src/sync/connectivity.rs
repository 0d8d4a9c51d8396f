//! Network reachability check performed before every request.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use reqwest::Url;
use tracing::debug;

use crate::config::ServerConfig;

const FALLBACK_TARGET: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)), 53);

/// Synchronous "is a network path available" check
pub trait Connectivity: Send + Sync {
    fn is_connected(&self) -> bool;
}

impl<T: Connectivity + ?Sized> Connectivity for Arc<T> {
    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}

/// Reports connected when the OS has a route to `target`.
///
/// Connecting a UDP socket only consults the routing table; no packet is
/// sent. A host with no active interface fails with `ENETUNREACH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteProbe {
    target: SocketAddr,
}

impl RouteProbe {
    pub const fn new(target: SocketAddr) -> Self {
        Self { target }
    }

    /// Probe the route to the LightUpPi host itself.
    ///
    /// A server on an isolated LAN is reachable without a default gateway, so
    /// an IP address is probed directly. Host names are not resolved here and
    /// fall back to the public target.
    pub fn for_server(server: &ServerConfig) -> Self {
        server
            .address()
            .and_then(server_socket_addr)
            .map_or_else(Self::default, Self::new)
    }

    pub const fn target(&self) -> SocketAddr {
        self.target
    }
}

impl Default for RouteProbe {
    fn default() -> Self {
        Self::new(FALLBACK_TARGET)
    }
}

fn server_socket_addr(address: &str) -> Option<SocketAddr> {
    let url = Url::parse(&format!("http://{address}/")).ok()?;
    let host = url.host_str()?;
    let ip: IpAddr = host
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse()
        .ok()?;
    Some(SocketAddr::new(ip, url.port_or_known_default()?))
}

impl Connectivity for RouteProbe {
    fn is_connected(&self) -> bool {
        let bind = if self.target.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        match UdpSocket::bind(bind).and_then(|socket| socket.connect(self.target)) {
            Ok(()) => true,
            Err(error) => {
                debug!(target = %self.target, %error, "No network route");
                false
            }
        }
    }
}

/// Fixed connectivity state, switchable at runtime
#[derive(Debug)]
pub struct StaticConnectivity(AtomicBool);

impl StaticConnectivity {
    pub const fn new(connected: bool) -> Self {
        Self(AtomicBool::new(connected))
    }

    pub fn set_connected(&self, connected: bool) {
        self.0.store(connected, Ordering::SeqCst);
    }
}

impl Connectivity for StaticConnectivity {
    fn is_connected(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tokio::runtime::{Handle, RuntimeFlavor};

/// Reports whether the network is currently reachable.
pub trait Connectivity {
    fn is_connected(&self) -> bool;
}

impl<T> Connectivity for Box<T>
where
    T: Connectivity + ?Sized,
{
    fn is_connected(&self) -> bool {
        self.as_ref().is_connected()
    }
}

/// A probe with a fixed answer, used for `--offline`.
#[derive(Debug, Clone, Copy)]
pub struct Fixed(pub bool);

impl Connectivity for Fixed {
    fn is_connected(&self) -> bool {
        self.0
    }
}

/// Connected if a TCP connection to `addr` can be opened within `timeout`.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    addr: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }
    fn probe(&self) -> bool {
        let addrs = match self.addr.to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(e) => {
                log::debug!("failed to resolve {}: {e}", self.addr);
                return false;
            }
        };
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(_) => return true,
                Err(e) => log::debug!("failed to connect to {addr}: {e}"),
            }
        }
        false
    }
}

// DNS lookup and connect both block, so keep them off the async workers.
impl Connectivity for TcpProbe {
    fn is_connected(&self) -> bool {
        match Handle::try_current().map(|handle| handle.runtime_flavor()) {
            Ok(RuntimeFlavor::MultiThread) => tokio::task::block_in_place(|| self.probe()),
            _ => self.probe(),
        }
    }
}

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::metrics::ServerMetrics;
use crate::protocol::{ConnectionId, ServerMessage};

use super::connection_handle::ConnectionHandle;
use super::RegisterClientError;

/// Live connections and per-IP admission accounting.
pub(crate) struct ConnectionManager {
    clients: DashMap<ConnectionId, SocketAddr>,
    connections_per_ip: DashMap<IpAddr, usize>,
    metrics: Arc<ServerMetrics>,
    max_connections_per_ip: usize,
}

impl ConnectionManager {
    pub fn new(max_connections_per_ip: usize, metrics: Arc<ServerMetrics>) -> Self {
        Self {
            clients: DashMap::new(),
            connections_per_ip: DashMap::new(),
            metrics,
            max_connections_per_ip,
        }
    }

    /// Admit a connection and assign its identity.
    pub fn register_client(
        &self,
        sender: mpsc::Sender<Arc<ServerMessage>>,
        client_addr: SocketAddr,
    ) -> Result<ConnectionHandle, RegisterClientError> {
        let ip = client_addr.ip();
        if let Err(current) = self.try_reserve_ip_slot(ip) {
            self.metrics.increment_rejected_connections();
            warn!(
                %ip,
                current,
                max = self.max_connections_per_ip,
                "IP connection limit exceeded"
            );
            return Err(RegisterClientError::IpLimitExceeded {
                current,
                limit: self.max_connections_per_ip,
            });
        }

        let handle = ConnectionHandle::new(Uuid::new_v4(), sender);
        self.clients.insert(handle.id(), client_addr);
        self.metrics.increment_connections();

        info!(connection_id = %handle.id(), %client_addr, "Client registered");
        Ok(handle)
    }

    /// Forget a connection and release its admission slot. Returns its address once.
    pub fn remove_client(&self, connection_id: &ConnectionId) -> Option<SocketAddr> {
        self.clients
            .remove(connection_id)
            .map(|(_, client_addr)| {
                self.release_ip_slot(client_addr.ip());
                self.metrics.decrement_active_connections();
                client_addr
            })
    }

    pub fn connection_count(&self) -> usize {
        self.clients.len()
    }

    pub fn connections_from(&self, ip: &IpAddr) -> usize {
        self.connections_per_ip
            .get(ip)
            .map(|entry| *entry)
            .unwrap_or(0)
    }

    fn try_reserve_ip_slot(&self, ip: IpAddr) -> Result<usize, usize> {
        match self.connections_per_ip.entry(ip) {
            Entry::Occupied(mut entry) => {
                let current = *entry.get();
                if current >= self.max_connections_per_ip {
                    Err(current)
                } else {
                    let count = entry.get_mut();
                    *count += 1;
                    Ok(*count)
                }
            }
            Entry::Vacant(entry) => {
                if self.max_connections_per_ip == 0 {
                    Err(0)
                } else {
                    entry.insert(1);
                    Ok(1)
                }
            }
        }
    }

    /// Decrement and remove under one shard lock so a concurrent reserve is never erased.
    fn release_ip_slot(&self, ip: IpAddr) {
        if let Entry::Occupied(mut entry) = self.connections_per_ip.entry(ip) {
            if *entry.get() > 1 {
                *entry.get_mut() -= 1;
            } else {
                entry.remove();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_manager(max_connections_per_ip: usize) -> ConnectionManager {
        ConnectionManager::new(max_connections_per_ip, Arc::new(ServerMetrics::new()))
    }

    fn channel() -> (
        mpsc::Sender<Arc<ServerMessage>>,
        mpsc::Receiver<Arc<ServerMessage>>,
    ) {
        mpsc::channel(4)
    }

    #[test]
    fn register_client_enforces_ip_limits_and_releases_on_remove() {
        let manager = make_manager(1);
        let addr: SocketAddr = "127.0.0.1:5000".parse().unwrap();

        let (tx1, _rx1) = channel();
        let first = manager
            .register_client(tx1, addr)
            .expect("first registration succeeds");

        let (tx2, _rx2) = channel();
        let err = manager
            .register_client(tx2, addr)
            .expect_err("second client hits per-IP limit");
        match err {
            RegisterClientError::IpLimitExceeded { current, limit } => {
                assert_eq!(current, 1);
                assert_eq!(limit, 1);
            }
        }
        assert_eq!(
            manager.metrics.rejected_connections.load(std::sync::atomic::Ordering::Relaxed),
            1
        );

        assert!(manager.remove_client(&first.id()).is_some());
        assert_eq!(manager.connections_from(&addr.ip()), 0);

        let (tx3, _rx3) = channel();
        manager
            .register_client(tx3, addr)
            .expect("registrations resume after slot release");
    }

    #[test]
    fn limits_are_per_ip() {
        let manager = make_manager(1);
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();

        manager
            .register_client(tx1, "10.0.0.1:1".parse().unwrap())
            .unwrap();
        manager
            .register_client(tx2, "10.0.0.2:1".parse().unwrap())
            .unwrap();
        assert_eq!(manager.connection_count(), 2);
    }

    #[test]
    fn identities_are_unique_and_removal_is_idempotent() {
        let manager = make_manager(8);
        let addr: SocketAddr = "127.0.0.1:7000".parse().unwrap();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();

        let a = manager.register_client(tx1, addr).unwrap();
        let b = manager.register_client(tx2, addr).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(manager.connections_from(&addr.ip()), 2);

        assert_eq!(manager.remove_client(&a.id()), Some(addr));
        assert!(manager.remove_client(&a.id()).is_none());
        assert_eq!(manager.connection_count(), 1);
        assert_eq!(manager.connections_from(&addr.ip()), 1);

        assert!(manager.remove_client(&b.id()).is_some());
        assert_eq!(manager.connections_from(&addr.ip()), 0);
    }

    #[test]
    fn ip_slot_accounting_survives_concurrent_churn() {
        let limit = 2;
        let manager = Arc::new(make_manager(limit));
        let addr: SocketAddr = "127.0.0.1:9100".parse().unwrap();
        let peak = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                let peak = Arc::clone(&peak);
                std::thread::spawn(move || {
                    for _ in 0..2_000 {
                        let (tx, _rx) = channel();
                        if let Ok(handle) = manager.register_client(tx, addr) {
                            let live = manager.connection_count();
                            peak.fetch_max(live, std::sync::atomic::Ordering::Relaxed);
                            manager.remove_client(&handle.id());
                        }
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        assert!(peak.load(std::sync::atomic::Ordering::Relaxed) <= limit);
        assert_eq!(manager.connection_count(), 0);
        assert_eq!(manager.connections_from(&addr.ip()), 0);

        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();
        let (tx3, _rx3) = channel();
        manager.register_client(tx1, addr).unwrap();
        manager.register_client(tx2, addr).unwrap();
        assert!(manager.register_client(tx3, addr).is_err());
    }
}

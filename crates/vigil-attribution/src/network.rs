//! Process-lifetime network identity cache.

use mac_address::MacAddressIterator;
use parking_lot::Mutex;
use std::net::IpAddr;
use std::sync::Arc;
use sysinfo::Networks;
use tracing::debug;
use vigil_types::NetworkInfo;

/// Cached local network identity (first usable IPv4 + MAC).
///
/// Resolution runs at most once per process lifetime when it fully succeeds;
/// while unresolved, every call retries.
#[derive(Clone, Default)]
pub struct NetworkIdentity {
    cached: Arc<Mutex<Option<NetworkInfo>>>,
}

impl NetworkIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the cache. Test hook.
    pub fn with_cached(info: NetworkInfo) -> Self {
        Self {
            cached: Arc::new(Mutex::new(Some(info))),
        }
    }

    /// Current identity, or `None` if nothing could be resolved.
    pub fn resolve(&self) -> Option<NetworkInfo> {
        let mut cached = self.cached.lock();
        if let Some(info) = cached.as_ref() {
            return Some(info.clone());
        }

        let info = discover();
        if info.ip_address.is_some() && info.mac_address.is_some() {
            *cached = Some(info.clone());
        }
        info.is_resolved().then_some(info)
    }
}

fn discover() -> NetworkInfo {
    let mut info = NetworkInfo::default();

    let networks = Networks::new_with_refreshed_list();
    'outer: for (_name, data) in networks.iter() {
        for ip in data.ip_networks() {
            if let IpAddr::V4(v4) = ip.addr {
                if !v4.is_loopback() && !v4.is_unspecified() {
                    info.ip_address = Some(v4.to_string());
                    break 'outer;
                }
            }
        }
    }

    match MacAddressIterator::new() {
        Ok(macs) => {
            // Skip all-zero virtual interfaces.
            info.mac_address = macs
                .filter(|mac| mac.bytes() != [0u8; 6])
                .map(|mac| mac.to_string())
                .next();
        }
        Err(e) => debug!("MAC discovery failed: {e}"),
    }

    info
}

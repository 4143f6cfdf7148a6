//! Network connectivity prechecks.

use async_trait::async_trait;

/// The network state reported by a [`ConnectivityCheck`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// Requests can be sent.
    Online,
    /// No network at all.
    Offline,
    /// A network exists but the internet cannot be reached.
    Unreachable,
}

/// Reports whether the device is online.
///
/// Only consulted by calls that enable
/// [`RestBuilder::connectivity_precheck`](crate::RestBuilder::connectivity_precheck).
#[async_trait]
pub trait ConnectivityCheck: Send + Sync {
    /// The current state.
    async fn state(&self) -> Connectivity;
}

/// Always reports [`Connectivity::Online`]. The default check.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeOnline;

#[async_trait]
impl ConnectivityCheck for AssumeOnline {
    async fn state(&self) -> Connectivity {
        Connectivity::Online
    }
}

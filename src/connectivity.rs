//! Point-in-time connectivity checks consulted before each request.
//!
//! The answer is advisory: "online" only means an interface looks able to
//! reach the internet. Nothing here probes reachability.

use std::path::PathBuf;

const ROUTE_TABLE: &str = "/proc/net/route";
const RTF_UP: u32 = 0x0001;

pub trait Connectivity: Send + Sync {
    fn has_internet(&self) -> bool;
}

/// Reads the kernel routing table and reports online when a non-loopback
/// interface has an active default route.
#[derive(Clone, Debug)]
pub struct SystemConnectivity {
    route_table: PathBuf,
}

impl SystemConnectivity {
    pub fn new() -> Self {
        Self {
            route_table: PathBuf::from(ROUTE_TABLE),
        }
    }

    pub fn with_route_table(route_table: impl Into<PathBuf>) -> Self {
        Self {
            route_table: route_table.into(),
        }
    }
}

impl Default for SystemConnectivity {
    fn default() -> Self {
        Self::new()
    }
}

impl Connectivity for SystemConnectivity {
    fn has_internet(&self) -> bool {
        match std::fs::read_to_string(&self.route_table) {
            Ok(table) => has_default_route(&table),
            Err(err) => {
                // No routing table to inspect; let the request decide.
                tracing::debug!(path = %self.route_table.display(), %err, "route table unreadable");
                true
            }
        }
    }
}

/// Fixed answer, for `--offline` and tests.
#[derive(Clone, Copy, Debug)]
pub struct FixedConnectivity(pub bool);

impl Connectivity for FixedConnectivity {
    fn has_internet(&self) -> bool {
        self.0
    }
}

/// Parses `/proc/net/route` contents.
pub fn has_default_route(table: &str) -> bool {
    table.lines().skip(1).any(|line| {
        let mut fields = line.split_whitespace();
        let (Some(iface), Some(destination), Some(_gateway), Some(flags)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return false;
        };
        let flags = u32::from_str_radix(flags, 16).unwrap_or(0);
        iface != "lo" && destination == "00000000" && flags & RTF_UP != 0
    })
}

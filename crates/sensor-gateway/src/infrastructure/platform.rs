//! Hardware seed for the gateway's node identity.
//!
//! The seed is the first usable network interface's MAC address, rendered as
//! a decimal integer.  Hosts without one get a random 48-bit number with the
//! multicast bit set, so it can never collide with a real MAC.

use std::path::Path;

use tracing::{debug, warn};
use uuid::Uuid;

const SYSFS_NET: &str = "/sys/class/net";

/// Multicast bit of the first octet in a 48-bit MAC.
const MULTICAST_BIT: u64 = 1 << 40;

/// Returns the node identity seed for this host.
pub fn hardware_seed() -> String {
    match first_mac_in(Path::new(SYSFS_NET)) {
        Some(mac) => {
            debug!("node seed taken from hardware address");
            mac.to_string()
        }
        None => {
            warn!("no hardware address found, using a random node seed");
            random_seed().to_string()
        }
    }
}

/// Parses `aa:bb:cc:dd:ee:ff` into its 48-bit value.  All-zero addresses
/// (loopback) are rejected.
pub fn parse_mac(text: &str) -> Option<u64> {
    let octets: Vec<&str> = text.trim().split(':').collect();
    if octets.len() != 6 {
        return None;
    }
    let mut value = 0u64;
    for octet in octets {
        if octet.len() != 2 {
            return None;
        }
        value = (value << 8) | u64::from(u8::from_str_radix(octet, 16).ok()?);
    }
    (value != 0).then_some(value)
}

/// A random 48-bit value with the multicast bit set.
pub fn random_seed() -> u64 {
    let bytes = Uuid::new_v4().into_bytes();
    let value = bytes[..6]
        .iter()
        .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
    value | MULTICAST_BIT
}

/// Scans interface directories in name order, skipping loopback.
fn first_mac_in(dir: &Path) -> Option<u64> {
    let mut names: Vec<_> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.file_name())
        .filter(|name| name != "lo")
        .collect();
    names.sort();

    names.into_iter().find_map(|name| {
        let address = std::fs::read_to_string(dir.join(&name).join("address")).ok()?;
        parse_mac(&address)
    })
}

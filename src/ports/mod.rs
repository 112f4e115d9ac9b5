use crate::models::PortPair;

/// Highest port reached by `users` slots above `start_port`, or `None` when
/// that runs past the TCP port range. A plan that passes this check can call
/// `derive_port_pair` for every slot below `users`.
pub fn last_port(start_port: u32, users: u32) -> Option<u16> {
    let end = u64::from(start_port) + u64::from(users) * 2;
    u16::try_from(end).ok()
}

/// Derive the port pair for a zero-based user slot.
/// Each slot owns the block `start_port + slot*2 + 1 ..= start_port + slot*2 + 2`;
/// callers bound `start_port` and `user` with `last_port` first.
pub fn derive_port_pair(start_port: u16, user: u16) -> PortPair {
    let port_1 = start_port + user * 2 + 1;
    PortPair {
        port_1,
        port_2: port_1 + 1,
    }
}

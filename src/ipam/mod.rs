//! Subnet parsing and interface address derivation.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::models::Host;

/// Highest host identifier that selects an address within a subnet
pub const MAX_HOST_ID: u32 = 2;

/// Host that takes the first address of its subnet; every other host takes the second
pub const PRIMARY_HOST: &str = "router1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    InvalidCidr(String),
    UnsupportedHostId(u32),
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::InvalidCidr(reason) => write!(f, "Invalid CIDR: {}", reason),
            AddressError::UnsupportedHostId(id) => write!(
                f,
                "Unsupported host ID {}: only host IDs 1 and {} are supported",
                id, MAX_HOST_ID
            ),
        }
    }
}

impl std::error::Error for AddressError {}

/// Parse a dotted-decimal IPv4 address into its integer form
pub fn parse_ipv4_to_u32(ip: &str) -> Result<u32, String> {
    ip.trim()
        .parse::<Ipv4Addr>()
        .map(u32::from)
        .map_err(|_| format!("Invalid IPv4 address: {}", ip))
}

fn prefix_mask(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else {
        u32::MAX << (32 - prefix_len as u32)
    }
}

/// Parse a CIDR string into (network, broadcast, prefix_len).
/// Host bits must be zero: "10.0.0.1/24" is rejected.
pub fn parse_cidr(cidr: &str) -> Result<(u32, u32, u8), String> {
    let (addr, len) = cidr
        .trim()
        .split_once('/')
        .ok_or_else(|| format!("missing prefix length in {}", cidr))?;

    let prefix_len: u8 = len
        .parse()
        .map_err(|_| format!("invalid prefix length in {}", cidr))?;
    if prefix_len > 32 {
        return Err(format!("prefix length {} exceeds 32", prefix_len));
    }

    let addr_int = parse_ipv4_to_u32(addr)?;
    let mask = prefix_mask(prefix_len);
    if addr_int & !mask != 0 {
        return Err(format!("{} has host bits set", cidr));
    }

    Ok((addr_int, addr_int | !mask, prefix_len))
}

/// An IPv4 network: base address and prefix length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Subnet {
    network: u32,
    broadcast: u32,
    prefix_len: u8,
}

impl Ipv4Subnet {
    pub fn network(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.network)
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Every address in the subnet in ascending order, network and broadcast included
    pub fn addresses(&self) -> impl Iterator<Item = Ipv4Addr> {
        (self.network..=self.broadcast).map(Ipv4Addr::from)
    }
}

impl FromStr for Ipv4Subnet {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (network, broadcast, prefix_len) = parse_cidr(s).map_err(AddressError::InvalidCidr)?;
        Ok(Self {
            network,
            broadcast,
            prefix_len,
        })
    }
}

impl fmt::Display for Ipv4Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network(), self.prefix_len)
    }
}

/// An interface address: host address plus the prefix length of its subnet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceAddress {
    pub address: Ipv4Addr,
    pub prefix_len: u8,
}

impl fmt::Display for InterfaceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

/// Derive the interface address for a host ID within a subnet.
///
/// Host ID `h` selects the address at position `h - 1` of the subnet's
/// ascending enumeration. Only the first two positions are considered, so
/// any ID outside 1..=2, or a subnet too small to hold the position, fails.
pub fn derive_interface_address(
    subnet: &Ipv4Subnet,
    host_id: u32,
) -> Result<InterfaceAddress, AddressError> {
    let address = subnet
        .addresses()
        .take(MAX_HOST_ID as usize)
        .enumerate()
        .find(|(position, _)| host_id >= 1 && *position as u32 == host_id - 1)
        .map(|(_, address)| address)
        .ok_or(AddressError::UnsupportedHostId(host_id))?;

    Ok(InterfaceAddress {
        address,
        prefix_len: subnet.prefix_len(),
    })
}

/// Host ID for a lab device: explicit inventory value, else by name
pub fn host_id_for(host: &Host) -> u32 {
    match host.host_id {
        Some(id) => id,
        None if host.name == PRIMARY_HOST => 1,
        None => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subnet(cidr: &str) -> Ipv4Subnet {
        cidr.parse().unwrap()
    }

    fn host(name: &str, host_id: Option<u32>) -> Host {
        Host {
            name: name.to_string(),
            hostname: name.to_string(),
            platform: "eos".to_string(),
            network: "10.0.0.0/24".to_string(),
            username: None,
            password: None,
            port: 22,
            host_id,
        }
    }

    #[test]
    fn test_parse_cidr() {
        let (net, bcast, len) = parse_cidr("10.0.0.0/24").unwrap();
        assert_eq!(Ipv4Addr::from(net), Ipv4Addr::new(10, 0, 0, 0));
        assert_eq!(Ipv4Addr::from(bcast), Ipv4Addr::new(10, 0, 0, 255));
        assert_eq!(len, 24);

        let (net, bcast, _) = parse_cidr("0.0.0.0/0").unwrap();
        assert_eq!(net, 0);
        assert_eq!(bcast, u32::MAX);
    }

    #[test]
    fn test_parse_cidr_rejects_malformed() {
        assert!(parse_cidr("10.0.0.0").is_err());
        assert!(parse_cidr("10.0.0.0/33").is_err());
        assert!(parse_cidr("10.0.0/24").is_err());
        assert!(parse_cidr("10.0.0.1/24").is_err()); // host bits
        assert!(matches!(
            "nope/8".parse::<Ipv4Subnet>(),
            Err(AddressError::InvalidCidr(_))
        ));
    }

    #[test]
    fn test_subnet_enumeration() {
        let s = subnet("192.168.1.0/30");
        let all: Vec<Ipv4Addr> = s.addresses().collect();
        assert_eq!(
            all,
            vec![
                Ipv4Addr::new(192, 168, 1, 0),
                Ipv4Addr::new(192, 168, 1, 1),
                Ipv4Addr::new(192, 168, 1, 2),
                Ipv4Addr::new(192, 168, 1, 3),
            ]
        );
        assert_eq!(s.to_string(), "192.168.1.0/30");
    }

    #[test]
    fn test_host_id_one_selects_first_address() {
        let addr = derive_interface_address(&subnet("10.0.0.0/24"), 1).unwrap();
        assert_eq!(addr.to_string(), "10.0.0.0/24");
    }

    #[test]
    fn test_host_id_two_selects_second_address() {
        let addr = derive_interface_address(&subnet("10.0.0.0/24"), 2).unwrap();
        assert_eq!(addr.address, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(addr.prefix_len, 24);
        assert_eq!(addr.to_string(), "10.0.0.1/24");
    }

    #[test]
    fn test_unsupported_host_ids() {
        let s = subnet("10.0.0.0/24");
        assert_eq!(
            derive_interface_address(&s, 3),
            Err(AddressError::UnsupportedHostId(3))
        );
        assert_eq!(
            derive_interface_address(&s, 0),
            Err(AddressError::UnsupportedHostId(0))
        );
    }

    #[test]
    fn test_single_address_subnet() {
        let s = subnet("10.9.8.7/32");
        assert_eq!(
            derive_interface_address(&s, 1).unwrap().to_string(),
            "10.9.8.7/32"
        );
        assert_eq!(
            derive_interface_address(&s, 2),
            Err(AddressError::UnsupportedHostId(2))
        );
    }

    #[test]
    fn test_unsupported_error_message() {
        let msg = AddressError::UnsupportedHostId(3).to_string();
        assert!(msg.contains("Unsupported host ID 3"));
    }

    #[test]
    fn test_host_id_for() {
        assert_eq!(host_id_for(&host("router1", None)), 1);
        assert_eq!(host_id_for(&host("router2", None)), 2);
        assert_eq!(host_id_for(&host("spine7", None)), 2);
        assert_eq!(host_id_for(&host("router2", Some(1))), 1);
    }
}

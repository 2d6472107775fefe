//! Network - CIDR parsing, subnet carving and overlap detection

use ipnet::Ipv4Net;

/// CIDR error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CidrError {
    #[error("Invalid CIDR block '{0}': expected IPv4 address/prefix (e.g. 10.0.0.0/16)")]
    Invalid(String),

    #[error("CIDR block '{cidr}' has host bits set, did you mean {network}?")]
    NotCanonical { cidr: String, network: String },

    #[error("Cannot carve {count} /{prefix} subnet(s) out of {network}")]
    Exhausted {
        network: String,
        prefix: u8,
        count: usize,
    },
}

/// Parse an IPv4 CIDR block
pub fn parse_ipv4_net(cidr: &str) -> Result<Ipv4Net, CidrError> {
    cidr.trim()
        .parse::<Ipv4Net>()
        .map_err(|_| CidrError::Invalid(cidr.to_string()))
}

/// Parse an IPv4 CIDR block that must name a network (no host bits set)
pub fn parse_network(cidr: &str) -> Result<Ipv4Net, CidrError> {
    let net = parse_ipv4_net(cidr)?;
    if net.trunc() != net {
        return Err(CidrError::NotCanonical {
            cidr: cidr.to_string(),
            network: net.trunc().to_string(),
        });
    }
    Ok(net)
}

/// Allocate `count` consecutive subnets of length `prefix` from the start of `network`
pub fn carve_subnets(network: Ipv4Net, prefix: u8, count: usize) -> Result<Vec<Ipv4Net>, CidrError> {
    let exhausted = || CidrError::Exhausted {
        network: network.to_string(),
        prefix,
        count,
    };

    if prefix < network.prefix_len() {
        return Err(exhausted());
    }
    let subnets: Vec<Ipv4Net> = network
        .subnets(prefix)
        .map_err(|_| exhausted())?
        .take(count)
        .collect();
    if subnets.len() < count {
        return Err(exhausted());
    }
    Ok(subnets)
}

/// Returns true if two networks share at least one address
pub fn overlaps(a: &Ipv4Net, b: &Ipv4Net) -> bool {
    a.contains(&b.network()) || b.contains(&a.network())
}

/// Every overlapping pair among named networks, in input order
pub fn find_overlaps(networks: &[(String, Ipv4Net)]) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (i, (name_a, a)) in networks.iter().enumerate() {
        for (name_b, b) in &networks[i + 1..] {
            if overlaps(a, b) {
                pairs.push((name_a.clone(), name_b.clone()));
            }
        }
    }
    pairs
}

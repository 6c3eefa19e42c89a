use super::traits::{Matcher, RuleSink};
use crate::error::RuleError;
use ipnet::IpNet;
use std::net::IpAddr;

/// Sorted list of IP ranges.
///
/// IPv4 ranges are stored in the IPv4-mapped IPv6 space so both families share
/// one table. Lookups binary search the table, which is only valid once
/// [`IpList::sort`] has run after the last append.
#[derive(Debug, Clone)]
pub struct IpList {
    // Inclusive (start, end), sorted by start and non-overlapping once sorted.
    ranges: Vec<(u128, u128)>,
    sorted: bool,
}

impl Default for IpList {
    fn default() -> Self {
        Self::new()
    }
}

impl IpList {
    pub fn new() -> Self {
        Self {
            ranges: Vec::new(),
            sorted: true,
        }
    }

    pub fn append(&mut self, net: IpNet) {
        let net = net.trunc();
        let range = match net {
            IpNet::V4(v4) => (
                u128::from(v4.network().to_ipv6_mapped()),
                u128::from(v4.broadcast().to_ipv6_mapped()),
            ),
            IpNet::V6(v6) => (u128::from(v6.network()), u128::from(v6.broadcast())),
        };
        self.ranges.push(range);
        self.sorted = false;
    }

    /// Sorts and merges the ranges. Must be called after appending and before
    /// any lookup.
    pub fn sort(&mut self) {
        if self.sorted {
            return;
        }
        self.ranges.sort_unstable();

        let mut merged: Vec<(u128, u128)> = Vec::with_capacity(self.ranges.len());
        for &(start, end) in &self.ranges {
            match merged.last_mut() {
                Some(last) if start <= last.1.saturating_add(1) => {
                    last.1 = last.1.max(end);
                }
                _ => merged.push((start, end)),
            }
        }
        self.ranges = merged;
        self.sorted = true;
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    pub fn contains(&self, addr: IpAddr) -> bool {
        debug_assert!(self.sorted, "IpList looked up before sort()");
        let key = match addr {
            IpAddr::V4(v4) => u128::from(v4.to_ipv6_mapped()),
            IpAddr::V6(v6) => u128::from(v6),
        };
        let idx = self.ranges.partition_point(|&(start, _)| start <= key);
        idx > 0 && self.ranges[idx - 1].1 >= key
    }
}

/// Parses an address or CIDR prefix. A bare address becomes a host prefix.
pub fn parse_prefix(s: &str) -> Result<IpNet, RuleError> {
    let s = s.trim();
    if s.contains('/') {
        return s
            .parse::<IpNet>()
            .map_err(|_| RuleError::InvalidIp(s.to_string()));
    }
    s.parse::<IpAddr>()
        .map(IpNet::from)
        .map_err(|_| RuleError::InvalidIp(s.to_string()))
}

impl RuleSink for IpList {
    fn add_rule(&mut self, rule: &str) -> Result<(), RuleError> {
        self.append(parse_prefix(rule)?);
        Ok(())
    }

    fn len(&self) -> usize {
        self.ranges.len()
    }
}

impl Matcher<IpAddr> for IpList {
    fn is_match(&self, addr: &IpAddr) -> bool {
        self.contains(*addr)
    }
}

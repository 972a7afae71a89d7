//! CIDR arithmetic for carving parent blocks into leasable subnets.

use ipnet::IpNet;

use crate::error::{Error, Result};
use crate::models::{ParentSubnet, Subnet};

/// Splits `cidr` into every subnet of prefix length `split_range`.
///
/// The result enumerates the `2^(split_range - prefix)` children in ascending
/// network-address order; callers depend on that order being stable. A
/// `split_range` equal to the parent's prefix yields the parent itself.
pub fn split(cidr: &str, split_range: u8) -> Result<Vec<IpNet>> {
    let base: IpNet = cidr
        .parse()
        .map_err(|_| Error::InvalidCidr(cidr.to_string()))?;
    let base = base.trunc();

    if split_range > base.max_prefix_len() {
        return Err(Error::InsufficientAddressSpace {
            prefix: base.prefix_len(),
            split_range,
        });
    }
    if split_range < base.prefix_len() {
        return Err(Error::invalid_request(format!(
            "split range /{split_range} is wider than parent prefix /{}",
            base.prefix_len()
        )));
    }

    let subnets = base
        .subnets(split_range)
        .map_err(|_| Error::InvalidCidr(cidr.to_string()))?;
    Ok(subnets.collect())
}

/// Splits a registered parent into its child pool entries.
///
/// Pure arithmetic; ids and timestamps are assigned by the store on insert.
pub fn split_parent_subnet(parent: &ParentSubnet) -> Result<Vec<Subnet>> {
    let children = split(&parent.cidr, parent.split_range)?;

    Ok(children
        .into_iter()
        .map(|net| Subnet {
            id: String::new(),
            cidr: net.to_string(),
            account_id: String::new(),
            parent_subnet: parent.cidr.clone(),
            create_at: parent.create_at,
            lock_acquired_by: None,
            lock_acquired_at: 0,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cidrs(nets: &[IpNet]) -> Vec<String> {
        nets.iter().map(|net| net.to_string()).collect()
    }

    #[test]
    fn split_in_half() {
        let nets = split("10.0.0.0/8", 9).unwrap();
        assert_eq!(cidrs(&nets), vec!["10.0.0.0/9", "10.128.0.0/9"]);
    }

    #[test]
    fn split_into_quarters_in_order() {
        let nets = split("10.0.0.0/8", 10).unwrap();
        assert_eq!(
            cidrs(&nets),
            vec![
                "10.0.0.0/10",
                "10.64.0.0/10",
                "10.128.0.0/10",
                "10.192.0.0/10",
            ]
        );
    }

    #[test]
    fn split_twenty_to_twenty_three() {
        let nets = split("10.0.0.0/20", 23).unwrap();
        assert_eq!(nets.len(), 8);
        assert_eq!(nets[0].to_string(), "10.0.0.0/23");
        assert_eq!(nets[7].to_string(), "10.0.14.0/23");
    }

    #[test]
    fn split_equal_prefix_returns_parent() {
        let nets = split("10.0.0.0/8", 8).unwrap();
        assert_eq!(cidrs(&nets), vec!["10.0.0.0/8"]);
    }

    #[test]
    fn split_past_address_width_fails() {
        let err = split("10.0.0.0/8", 33).unwrap_err();
        assert!(matches!(err, Error::InsufficientAddressSpace { .. }));
    }

    #[test]
    fn split_malformed_cidr_fails() {
        let err = split("10.0.0.0//8", 10).unwrap_err();
        assert!(matches!(err, Error::InvalidCidr(_)));

        let err = split("not-a-cidr", 10).unwrap_err();
        assert!(matches!(err, Error::InvalidCidr(_)));
    }

    #[test]
    fn split_range_wider_than_prefix_fails() {
        let err = split("10.0.0.0/20", 8).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn split_ipv6_parent() {
        let nets = split("fd00::/64", 66).unwrap();
        assert_eq!(nets.len(), 4);
        assert_eq!(nets[0].to_string(), "fd00::/66");
    }

    #[test]
    fn split_parent_builds_pool_entries() {
        let parent = ParentSubnet {
            id: crate::models::new_id(),
            cidr: "10.0.0.0/8".into(),
            split_range: 10,
            create_at: 1234,
            lock_acquired_by: None,
            lock_acquired_at: 0,
        };
        let subnets = split_parent_subnet(&parent).unwrap();
        assert_eq!(subnets.len(), 4);
        for subnet in &subnets {
            assert!(subnet.is_free());
            assert_eq!(subnet.parent_subnet, "10.0.0.0/8");
            assert_eq!(subnet.create_at, 1234);
        }
        assert_eq!(subnets[1].cidr, "10.64.0.0/10");
    }
}

//! IPv4 address and CIDR block helpers.
//!
//! Service schemas can tag string attributes with the `ip-or-cidr` format;
//! the validator uses [`is_address_valid`] to enforce it. Provider services
//! also derive their default network layout from a root IP via
//! [`cidr_blocks`], producing one parent block plus a fixed number of
//! subnet blocks.

use crate::error::{Error, Result};
use std::net::Ipv4Addr;

/// Parses an `a.b.c.d` or `a.b.c.d/mask` string into address and mask parts.
fn parse_ipv4(address: &str) -> Option<(Ipv4Addr, Option<u8>)> {
    match address.split_once('/') {
        Some((ip, mask)) => {
            let ip: Ipv4Addr = ip.parse().ok()?;
            let mask: u8 = mask.parse().ok()?;
            if mask > 32 {
                return None;
            }
            Some((ip, Some(mask)))
        }
        None => {
            let ip: Ipv4Addr = address.parse().ok()?;
            Some((ip, None))
        }
    }
}

/// Returns whether the given value is a valid dotted IPv4 address or IPv4
/// CIDR block.
pub fn is_address_valid(address: &str) -> bool {
    parse_ipv4(address).is_some()
}

/// Normalizes an IP address or CIDR block to CIDR form.
///
/// A bare address becomes a `/32` block; an existing CIDR block passes
/// through unchanged.
pub fn to_cidr(address: &str) -> Result<String> {
    let (ip, mask) = parse_ipv4(address).ok_or_else(|| Error::InvalidAddress {
        address: address.to_string(),
    })?;
    Ok(format!("{}/{}", ip, mask.unwrap_or(32)))
}

/// Returns a list of CIDR blocks derived from a single root IP.
///
/// The first entry is the root block at `bitmask`; each subsequent entry is
/// a `/subnet_bitmask` block carved out of the root's first two octets. The
/// returned list is deduplicated while preserving order.
pub fn cidr_blocks(ip: &str, bitmask: u8, subnets: u8, subnet_bitmask: u8) -> Result<Vec<String>> {
    let (root, _) = parse_ipv4(ip).ok_or_else(|| Error::InvalidAddress {
        address: ip.to_string(),
    })?;

    if bitmask > 32 || subnet_bitmask > 32 {
        return Err(Error::InvalidAddress {
            address: format!("{ip}/{bitmask}"),
        });
    }

    let octets = root.octets();
    let mut blocks = vec![format!("{}.{}.0.0/{}", octets[0], octets[1], bitmask)];

    for num in 0..subnets {
        blocks.push(format!(
            "{}.{}.{}.0/{}",
            octets[0],
            octets[1],
            num + 1,
            subnet_bitmask
        ));
    }

    blocks.dedup();
    Ok(blocks)
}

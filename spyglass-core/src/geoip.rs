//! Offline IP geolocation against local MaxMind GeoLite2 databases.
//!
//! Lookups are pure file reads, so this is the one enrichment that never
//! touches the network. Missing databases disable the lookup instead of
//! failing the run.

use crate::graph::GeoIpData;
use anyhow::{Context, Result};
use maxminddb::{geoip2, Reader};
use std::net::IpAddr;
use std::path::Path;
use tracing::debug;

pub trait GeoIpLookup: Send + Sync {
    fn lookup(&self, ip: IpAddr) -> Option<GeoIpData>;
}

pub struct MaxMindLookup {
    country: Reader<Vec<u8>>,
    asn: Reader<Vec<u8>>,
}

impl MaxMindLookup {
    /// Opens `GeoLite2-Country.mmdb` and `GeoLite2-ASN.mmdb` from `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        let country_path = dir.join("GeoLite2-Country.mmdb");
        let asn_path = dir.join("GeoLite2-ASN.mmdb");
        let country = Reader::open_readfile(&country_path)
            .with_context(|| format!("failed to open {}", country_path.display()))?;
        let asn = Reader::open_readfile(&asn_path)
            .with_context(|| format!("failed to open {}", asn_path.display()))?;
        Ok(Self { country, asn })
    }
}

impl GeoIpLookup for MaxMindLookup {
    fn lookup(&self, ip: IpAddr) -> Option<GeoIpData> {
        let mut data = GeoIpData::new();
        let mut found = false;

        if let Ok(record) = self.country.lookup::<geoip2::Country>(ip) {
            if let Some(country) = record.country {
                data.country_code = country.iso_code.map(String::from);
                data.country_name = country
                    .names
                    .as_ref()
                    .and_then(|names| names.get("en"))
                    .map(|name| name.to_string());
                found = true;
            }
            if let Some(continent) = record.continent {
                data.continent_code = continent.code.map(String::from);
                data.continent_name = continent
                    .names
                    .as_ref()
                    .and_then(|names| names.get("en"))
                    .map(|name| name.to_string());
                found = true;
            }
        }

        if let Ok((record, prefix_len)) = self.asn.lookup_prefix::<geoip2::Asn>(ip) {
            if record.autonomous_system_number.is_some() {
                data.asn = record.autonomous_system_number;
                data.asn_name = record.autonomous_system_organization.map(String::from);
                data.network = Some(network_string(ip, prefix_len));
                found = true;
            }
        }

        if !found {
            debug!("no geoip data for {}", ip);
            return None;
        }
        Some(data)
    }
}

/// CIDR form of the database prefix the address fell into.
fn network_string(ip: IpAddr, prefix_len: usize) -> String {
    match ip {
        IpAddr::V4(addr) => {
            let bits = u32::from(addr);
            let mask = if prefix_len == 0 {
                0
            } else {
                u32::MAX << (32 - prefix_len as u32)
            };
            format!("{}/{}", std::net::Ipv4Addr::from(bits & mask), prefix_len)
        }
        IpAddr::V6(addr) => {
            let bits = u128::from(addr);
            let mask = if prefix_len == 0 {
                0
            } else {
                u128::MAX << (128 - prefix_len as u32)
            };
            format!("{}/{}", std::net::Ipv6Addr::from(bits & mask), prefix_len)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_string_masks_host_bits() {
        let ip: IpAddr = "192.168.37.41".parse().unwrap();
        assert_eq!(network_string(ip, 24), "192.168.37.0/24");
        assert_eq!(network_string(ip, 16), "192.168.0.0/16");
        assert_eq!(network_string(ip, 0), "0.0.0.0/0");
    }

    #[test]
    fn ipv6_prefixes_mask_correctly() {
        let ip: IpAddr = "2001:db8::dead:beef".parse().unwrap();
        assert_eq!(network_string(ip, 32), "2001:db8::/32");
    }

    #[test]
    fn missing_databases_are_a_setup_error() {
        let dir = std::env::temp_dir().join("spyglass-no-mmdb-here");
        assert!(MaxMindLookup::open(&dir).is_err());
    }
}

use spyglass_core::graph::{EnrichmentGraph, IpNode};
use std::collections::BTreeMap;

fn seeded() -> EnrichmentGraph {
    EnrichmentGraph::new(["example.com", "example.org"])
}

#[test]
fn merging_the_same_discovery_twice_changes_nothing() {
    let mut graph = seeded();
    let found = ["www.example.com".to_string(), "mail.example.com".to_string()];

    graph.merge_discovery("example.com", "crtsh", found.clone());
    graph.merge_discovery("example.com", "crtsh", found);

    let seed = &graph.domains["example.com"];
    assert_eq!(seed.subdomains.len(), 2);
    let www = &seed.subdomains["www.example.com"];
    assert_eq!(www.sources.len(), 1);
}

#[test]
fn a_second_source_is_recorded_without_duplicating_the_node() {
    let mut graph = seeded();
    graph.merge_discovery("example.com", "crtsh", ["www.example.com".to_string()]);
    graph.merge_discovery("example.com", "sublist3r", ["www.example.com".to_string()]);

    let seed = &graph.domains["example.com"];
    assert_eq!(seed.subdomains.len(), 1);
    let sources = &seed.subdomains["www.example.com"].sources;
    assert!(sources.contains("crtsh"));
    assert!(sources.contains("sublist3r"));
}

#[test]
fn discoveries_for_unknown_seeds_are_dropped() {
    let mut graph = seeded();
    graph.merge_discovery("nosuchseed.net", "crtsh", ["a.nosuchseed.net".to_string()]);
    assert_eq!(graph.domains.len(), 2);
    assert!(graph.domains.values().all(|node| node.subdomains.is_empty()));
}

#[test]
fn distinct_ips_deduplicate_across_owners() {
    let mut graph = seeded();
    graph.merge_discovery("example.com", "crtsh", ["www.example.com".to_string()]);

    graph
        .domains
        .get_mut("example.com")
        .unwrap()
        .ip_addresses
        .insert("203.0.113.7".to_string(), IpNode::new("203.0.113.7"));
    graph
        .node_mut("www.example.com")
        .unwrap()
        .ip_addresses
        .insert("203.0.113.7".to_string(), IpNode::new("203.0.113.7"));
    graph
        .domains
        .get_mut("example.org")
        .unwrap()
        .ip_addresses
        .insert("198.51.100.2".to_string(), IpNode::new("198.51.100.2"));

    let ips = graph.distinct_ips();
    assert_eq!(
        ips.into_iter().collect::<Vec<_>>(),
        vec!["198.51.100.2", "203.0.113.7"]
    );
}

#[test]
fn open_ports_reach_every_owner_of_an_address() {
    let mut graph = seeded();
    graph.merge_discovery("example.com", "crtsh", ["www.example.com".to_string()]);
    graph
        .domains
        .get_mut("example.com")
        .unwrap()
        .ip_addresses
        .insert("203.0.113.7".to_string(), IpNode::new("203.0.113.7"));
    graph
        .node_mut("www.example.com")
        .unwrap()
        .ip_addresses
        .insert("203.0.113.7".to_string(), IpNode::new("203.0.113.7"));

    let mut open = BTreeMap::new();
    open.insert("203.0.113.7".to_string(), vec![22, 443]);
    graph.apply_open_ports(&open);

    for hostname in ["example.com", "www.example.com"] {
        let ports = &graph.node_mut(hostname).unwrap().ip_addresses["203.0.113.7"].ports;
        assert_eq!(ports.keys().copied().collect::<Vec<_>>(), vec![22, 443]);
        assert!(ports.values().all(|port| port.status == "open"));
    }
}

#[test]
fn hostnames_cover_seeds_and_subdomains() {
    let mut graph = seeded();
    graph.merge_discovery("example.com", "crtsh", ["www.example.com".to_string()]);

    let hostnames = graph.hostnames();
    assert_eq!(
        hostnames,
        vec!["example.com", "www.example.com", "example.org"]
    );
}

#[test]
fn empty_collections_stay_out_of_the_snapshot() {
    let graph = seeded();
    let json = serde_json::to_value(&graph).unwrap();

    let seed = &json["domains"]["example.com"];
    assert_eq!(seed["type"], "domain");
    assert_eq!(seed["value"], "example.com");
    assert!(seed.get("subdomains").is_none());
    assert!(seed.get("ip_addresses").is_none());
    assert!(seed.get("paths").is_none());
}

#[test]
fn the_snapshot_nests_ports_under_their_address() {
    let mut graph = EnrichmentGraph::new(["example.com"]);
    graph
        .domains
        .get_mut("example.com")
        .unwrap()
        .ip_addresses
        .insert("203.0.113.7".to_string(), IpNode::new("203.0.113.7"));
    let mut open = BTreeMap::new();
    open.insert("203.0.113.7".to_string(), vec![443]);
    graph.apply_open_ports(&open);

    let json = serde_json::to_value(&graph).unwrap();
    let port =
        &json["domains"]["example.com"]["ip_addresses"]["203.0.113.7"]["ports"]["443"];
    assert_eq!(port["type"], "tcp_port");
    assert_eq!(port["status"], "open");
    assert_eq!(port["value"], 443);
}

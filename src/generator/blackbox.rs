use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use super::{SaveError, TargetGenerator, TargetGroup, excluded, write_groups};
use crate::client::Node;

static IPV4_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,3}\.){3}\d{1,3}(:\d+)?$").unwrap());

/// A literal IPv4 address, optionally with a port. Anything else is
/// treated as a domain name.
fn is_ipv4(address: &str) -> bool {
    IPV4_RE.is_match(address)
}

/// Emits probe targets for the blackbox exporter: one group holding
/// every reachable address, domains ahead of bare IPv4 literals.
pub struct Blackbox {
    output: PathBuf,
}

impl Blackbox {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Blackbox {
            output: output.into(),
        }
    }
}

impl TargetGenerator for Blackbox {
    fn name(&self) -> &'static str {
        "blackbox"
    }

    fn generate(&self, nodes: &[Node]) -> Vec<TargetGroup> {
        let mut domains = Vec::new();
        let mut addresses = Vec::new();

        for node in nodes {
            if excluded(node) {
                continue;
            }

            if is_ipv4(&node.address) {
                addresses.push(node.address.clone());
            } else {
                domains.push(node.address.clone());
            }
        }

        // domains first, each bucket in discovery order
        let mut targets = domains;
        targets.extend(addresses);

        if targets.is_empty() {
            return Vec::new();
        }

        vec![TargetGroup {
            targets,
            labels: BTreeMap::new(),
        }]
    }

    fn save(&self, groups: &[TargetGroup]) -> Result<(), SaveError> {
        write_groups(&self.output, groups)
    }
}

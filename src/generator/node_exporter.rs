use std::collections::BTreeMap;
use std::path::PathBuf;

use super::{SaveError, TargetGenerator, TargetGroup, excluded, write_groups};
use crate::client::Node;

/// Emits scrape targets for per-host node exporter instances: one group
/// per configured port, labelled with that port, listing every node as
/// `address:port`.
pub struct NodeExporter {
    output: PathBuf,
    ports: Vec<u16>,
}

impl NodeExporter {
    pub fn new(output: impl Into<PathBuf>, ports: Vec<u16>) -> Self {
        NodeExporter {
            output: output.into(),
            ports,
        }
    }
}

impl TargetGenerator for NodeExporter {
    fn name(&self) -> &'static str {
        "node_exporter"
    }

    fn generate(&self, nodes: &[Node]) -> Vec<TargetGroup> {
        self.ports
            .iter()
            .filter_map(|port| {
                let targets = nodes
                    .iter()
                    .filter(|node| !excluded(node))
                    .map(|node| format!("{}:{}", node.address, port))
                    .collect::<Vec<_>>();

                if targets.is_empty() {
                    return None;
                }

                Some(TargetGroup {
                    targets,
                    labels: BTreeMap::from([("port".to_string(), port.to_string())]),
                })
            })
            .collect()
    }

    fn save(&self, groups: &[TargetGroup]) -> Result<(), SaveError> {
        write_groups(&self.output, groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn node(name: &str, address: &str) -> Node {
        Node {
            name: name.to_string(),
            address: address.to_string(),
            is_disabled: false,
        }
    }

    #[test]
    fn one_group_per_port() {
        let generator = NodeExporter::new("unused.yml", vec![9100, 9256]);
        let groups = generator.generate(&[node("a", "1.2.3.4")]);

        assert_eq!(
            groups,
            vec![
                TargetGroup {
                    targets: vec!["1.2.3.4:9100".to_string()],
                    labels: BTreeMap::from([("port".to_string(), "9100".to_string())]),
                },
                TargetGroup {
                    targets: vec!["1.2.3.4:9256".to_string()],
                    labels: BTreeMap::from([("port".to_string(), "9256".to_string())]),
                },
            ]
        );
    }

    #[test]
    fn node_order_is_preserved_within_a_port() {
        let generator = NodeExporter::new("unused.yml", vec![9100]);
        let groups = generator.generate(&[
            node("b", "b.example.com"),
            node("a", "a.example.com"),
            node("c", "10.0.0.1"),
        ]);

        assert_eq!(groups.len(), 1);
        assert_eq!(
            groups[0].targets,
            vec!["b.example.com:9100", "a.example.com:9100", "10.0.0.1:9100"]
        );
    }

    #[test]
    fn soft_deleted_nodes_are_dropped() {
        let generator = NodeExporter::new("unused.yml", vec![9100]);
        let groups = generator.generate(&[node("-retired", "gone.example.com")]);

        assert!(groups.is_empty());
    }

    #[test]
    fn empty_node_list_means_no_groups() {
        let generator = NodeExporter::new("unused.yml", vec![9100, 9256]);

        assert!(generator.generate(&[]).is_empty());
    }
}

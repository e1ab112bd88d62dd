pub mod blackbox;
pub mod node_exporter;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::Node;

/// A group of scrape targets sharing one label set. A targets file is a
/// sequence of these, which is what Prometheus file-based service
/// discovery consumes.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TargetGroup {
    pub targets: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("serialize target groups failed, {0}")]
    Serialize(#[from] serde_yaml::Error),
}

/// Maps inventory nodes to the targets file of one scraper.
pub trait TargetGenerator {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Pure transform from the (already filtered) node list to target
    /// groups. No I/O happens here.
    fn generate(&self, nodes: &[Node]) -> Vec<TargetGroup>;

    /// Write the groups to the configured targets file.
    fn save(&self, groups: &[TargetGroup]) -> Result<(), SaveError>;

    /// The one entry point the update cycle calls. Returns the number
    /// of emitted groups.
    fn process(&self, nodes: &[Node]) -> Result<usize, SaveError> {
        let groups = self.generate(nodes);
        self.save(&groups)?;

        Ok(groups.len())
    }
}

/// Nodes renamed with a leading `-` are soft-deleted in the inventory
/// and must never be emitted.
pub(crate) fn excluded(node: &Node) -> bool {
    node.name.starts_with('-')
}

/// Replace `path` with the serialized groups. The content is written to
/// a sibling tmp file and flushed fully to disk first, then renamed over
/// the destination, so a concurrent scrape never observes a partial
/// file.
pub(crate) fn write_groups(path: &Path, groups: &[TargetGroup]) -> Result<(), SaveError> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir)?;
    }

    let tmp = path.with_extension("tmp");
    let mut file = io::BufWriter::new(fs::File::create(&tmp)?);
    serde_yaml::to_writer(&mut file, groups)?;
    file.into_inner()
        .map_err(io::IntoInnerError::into_error)?
        .sync_all()?;

    fs::rename(&tmp, path)?;

    Ok(())
}

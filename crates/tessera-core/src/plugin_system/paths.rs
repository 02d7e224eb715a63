use std::path::{Path, PathBuf};

use crate::host::routing::join_route;
use crate::kernel::constants;
use crate::plugin_system::descriptor::PluginDescriptor;

/// Lower-cases a plugin name and replaces anything outside `[a-z0-9._-]` with `-`.
pub fn normalize_route_segment(name: &str) -> String {
    let mapped: String = name
        .trim()
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();
    mapped.trim_matches('-').to_string()
}

/// Derives route prefixes and data directories from plugin descriptors.
///
/// The base directory is fixed at construction; nothing here reads process state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathDeriver {
    base_dir: PathBuf,
}

impl PathDeriver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// `"/{normalized name}"` when the plugin opts into auto prefixing, `""` otherwise.
    pub fn route_prefix(&self, descriptor: &PluginDescriptor) -> String {
        if descriptor.use_auto_route_prefix {
            format!("/{}", normalize_route_segment(&descriptor.name))
        } else {
            String::new()
        }
    }

    /// Management group for a plugin: `{root}/{normalized name}`, regardless of auto prefixing.
    pub fn management_route(&self, root: &str, descriptor: &PluginDescriptor) -> String {
        join_route(root, &normalize_route_segment(&descriptor.name))
    }

    /// `{base}/data/{name}` unless the descriptor overrides it.
    pub fn data_dir(&self, descriptor: &PluginDescriptor) -> PathBuf {
        match &descriptor.data_dir {
            Some(custom) if custom.is_absolute() => custom.clone(),
            Some(custom) => self.base_dir.join(custom),
            None => self
                .base_dir
                .join(constants::DATA_DIR_NAME)
                .join(&descriptor.name),
        }
    }

    pub fn plugin_paths(&self, descriptor: &PluginDescriptor) -> PluginPaths {
        PluginPaths::new(self.data_dir(descriptor))
    }
}

/// Filesystem locations owned by one plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginPaths {
    data_dir: PathBuf,
}

impl PluginPaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Absolute paths pass through unchanged (external mounts); relative ones land under the data directory.
    pub fn resolve_data_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }
}

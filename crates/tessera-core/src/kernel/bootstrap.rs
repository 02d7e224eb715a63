use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::host::HostContext;
use crate::kernel::constants;
use crate::kernel::error::{Error, Result};
use crate::plugin_system::lifecycle::{LifecycleOrchestrator, LifecycleTracker};
use crate::plugin_system::paths::PathDeriver;
use crate::plugin_system::registry::PluginRegistry;
use crate::plugin_system::resolver::LoadPlan;
use crate::plugin_system::traits::Plugin;
use crate::plugin_system::validator::TwoStageValidator;
use crate::storage::config::{parse_document, ConfigFormat, ConfigSource, PluginConfigLoader};

fn default_base_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_management_prefix() -> String {
    constants::DEFAULT_MANAGEMENT_PREFIX.to_string()
}

fn default_true() -> bool {
    true
}

/// Host-level policy for a load attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSettings {
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    /// Defaults to `{base_dir}/config`
    #[serde(default)]
    pub config_dir: Option<PathBuf>,
    #[serde(default)]
    pub fail_fast: bool,
    #[serde(default = "default_management_prefix")]
    pub management_prefix: String,
    #[serde(default = "default_true")]
    pub write_default_configs: bool,
    #[serde(default)]
    pub disabled_plugins: Vec<String>,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            config_dir: None,
            fail_fast: false,
            management_prefix: default_management_prefix(),
            write_default_configs: true,
            disabled_plugins: Vec::new(),
        }
    }
}

impl HostSettings {
    /// Load settings from a JSON, YAML or TOML file, chosen by extension.
    pub fn from_file(path: &Path) -> Result<Self> {
        let format = ConfigFormat::require_from_path(path)?;
        let contents =
            fs::read_to_string(path).map_err(|e| Error::io(e, "read host settings", path.to_path_buf()))?;
        parse_document(&contents, format)
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn config_dir(&self) -> PathBuf {
        match &self.config_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => self.base_dir.join(dir),
            None => self.base_dir.join(constants::CONFIG_DIR_NAME),
        }
    }
}

/// Everything one load attempt produced
#[derive(Debug)]
pub struct StartupReport {
    pub plan: LoadPlan,
    /// Registered plugins excluded by `disabled_plugins`
    pub disabled: Vec<String>,
    pub lifecycle: LifecycleTracker,
    /// Plugins that reached `Active`, in activation order
    pub activated: Vec<String>,
    /// Registrations committed by the active plugins
    pub host: HostContext,
}

impl StartupReport {
    pub fn failed(&self) -> Vec<(String, String)> {
        self.lifecycle.failed()
    }

    pub fn is_clean(&self) -> bool {
        self.failed().is_empty()
    }
}

/// Drives a load attempt: validation, then lifecycle activation.
///
/// Plugins are registered explicitly; nothing is discovered by scanning.
#[derive(Debug, Default)]
pub struct PluginHost {
    settings: HostSettings,
    registry: PluginRegistry,
}

impl PluginHost {
    pub fn new(settings: HostSettings) -> Self {
        log::info!("Initializing {} v{}", constants::APP_NAME, constants::APP_VERSION);
        Self {
            settings,
            registry: PluginRegistry::new(),
        }
    }

    pub fn settings(&self) -> &HostSettings {
        &self.settings
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn register_plugin(&mut self, plugin: Arc<dyn Plugin>) -> Result<()> {
        self.registry.register_plugin(plugin)
    }

    pub fn path_deriver(&self) -> PathDeriver {
        PathDeriver::new(self.settings.base_dir.clone())
    }

    /// Registered plugins named in `disabled_plugins`, ascending
    pub fn disabled(&self) -> Vec<String> {
        let mut disabled = Vec::new();
        for name in &self.settings.disabled_plugins {
            if self.registry.has_plugin(name) {
                if !disabled.contains(name) {
                    disabled.push(name.clone());
                }
            } else {
                log::warn!("Disabled plugin '{}' is not registered", name);
            }
        }
        disabled.sort();
        disabled
    }

    fn eligible(&self, disabled: &[String]) -> PluginRegistry {
        for name in disabled {
            log::warn!("Plugin '{}' excluded from this load attempt: disabled by host settings", name);
        }
        self.registry.without(disabled)
    }

    /// Both validation stages without invoking any lifecycle callback.
    pub fn plan(&self) -> LoadPlan {
        TwoStageValidator::validate(&self.eligible(&self.disabled()))
    }

    /// Run a load attempt reading plugin configuration from the configured directory.
    pub async fn start(&self) -> Result<StartupReport> {
        let loader = PluginConfigLoader::new(self.settings.config_dir())
            .with_write_defaults(self.settings.write_default_configs);
        self.start_with(&loader).await
    }

    /// Run a load attempt with plugin configuration from `configs`.
    ///
    /// Lifecycle failures are recorded in the report; only fail-fast mode turns
    /// one into an error.
    pub async fn start_with(&self, configs: &dyn ConfigSource) -> Result<StartupReport> {
        let disabled = self.disabled();
        let eligible = self.eligible(&disabled);
        let plan = TwoStageValidator::validate(&eligible);
        let mut lifecycle = LifecycleTracker::from_plan(&eligible, &plan)?;

        let orchestrator = LifecycleOrchestrator::new(self.path_deriver())
            .with_fail_fast(self.settings.fail_fast)
            .with_management_prefix(&self.settings.management_prefix);
        let mut host = HostContext::new();
        let activated = orchestrator
            .activate(&eligible, &plan.order, configs, &mut host, &mut lifecycle)
            .await?;

        let report = StartupReport {
            plan,
            disabled,
            lifecycle,
            activated,
            host,
        };
        log::info!(
            "Load attempt finished: {} active, {} rejected, {} failed, {} disabled",
            report.activated.len(),
            report.plan.rejected().count(),
            report.failed().len().saturating_sub(report.plan.rejected().count()),
            report.disabled.len()
        );
        Ok(report)
    }
}

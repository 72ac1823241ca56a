//! Monitor configuration: engine tuning plus the routers to simulate.

use std::path::{Path, PathBuf};

use bfc_engine::{EngineConfig, RouterDefinition};
use bfc_model::{AlternateLevels, CrosspointUpdate, Destination, Level, RouterCatalog, RouterId, RouterSummary, Source};
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading the monitor configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// Error parsing TOML.
	#[error("invalid config {path}: {error}")]
	Parse {
		/// Path to the file that failed to parse.
		path: PathBuf,
		/// The underlying parse error.
		error: toml::de::Error,
	},

	/// Two routers share an id.
	#[error("router {0} is defined twice")]
	DuplicateRouter(RouterId),
}

/// Result type for configuration loading.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// One `[[routers]]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
	pub id: RouterId,
	pub display_name: String,
	#[serde(default)]
	pub short_name: String,
	#[serde(default)]
	pub levels: Vec<Level>,
	#[serde(default)]
	pub sources: Vec<Source>,
	#[serde(default)]
	pub destinations: Vec<Destination>,
	#[serde(default)]
	pub alternate_levels: Vec<AlternateLevels>,
	#[serde(default)]
	pub crosspoints: Vec<CrosspointUpdate>,
}

impl RouterConfig {
	pub fn into_definition(self) -> RouterDefinition {
		let short_name = if self.short_name.is_empty() {
			self.display_name.clone()
		} else {
			self.short_name
		};
		RouterDefinition {
			summary: RouterSummary {
				id: self.id,
				display_name: self.display_name,
				short_name,
			},
			catalog: RouterCatalog {
				levels: self.levels,
				sources: self.sources,
				destinations: self.destinations,
			},
			alternate_levels: self.alternate_levels,
			crosspoints: self.crosspoints,
		}
	}
}

/// Top-level `monitor.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
	/// `error`, `warn`, `info`, `debug` or `trace`.
	pub log_level: Option<String>,
	pub engine: EngineConfig,
	pub routers: Vec<RouterConfig>,
}

impl MonitorConfig {
	pub fn parse(path: &Path, text: &str) -> Result<Self> {
		let config: Self = toml::from_str(text).map_err(|error| ConfigError::Parse {
			path: path.to_path_buf(),
			error,
		})?;
		let mut seen = Vec::with_capacity(config.routers.len());
		for router in &config.routers {
			if seen.contains(&router.id) {
				return Err(ConfigError::DuplicateRouter(router.id));
			}
			seen.push(router.id);
		}
		Ok(config)
	}

	/// Loads `path`, or the default location when `path` is `None`.
	///
	/// A missing default file is not an error; an explicitly named one is.
	/// Without any routers configured the built-in demo router is used.
	pub fn load(path: Option<&Path>) -> Result<Self> {
		let mut config = match path {
			Some(path) => Self::read(path)?,
			None => match default_path() {
				Some(path) if path.exists() => Self::read(&path)?,
				_ => Self::default(),
			},
		};
		if config.routers.is_empty() {
			config.routers = vec![demo_router()?];
		}
		Ok(config)
	}

	pub fn definitions(&self) -> Vec<RouterDefinition> {
		self.routers.iter().cloned().map(RouterConfig::into_definition).collect()
	}

	fn read(path: &Path) -> Result<Self> {
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::parse(path, &text)
	}
}

/// `<config dir>/bfc/monitor.toml`.
pub fn default_path() -> Option<PathBuf> {
	dirs::config_dir().map(|dir| dir.join("bfc").join("monitor.toml"))
}

/// Small two-level router used when nothing is configured.
pub fn demo_router() -> Result<RouterConfig> {
	const DEMO: &str = r#"
id = 1
display_name = "Demo Router"
short_name = "DEMO"
levels = [{ id = 1, name = "SDI" }, { id = 2, name = "AES" }]
sources = [
	{ id = 1, name = "CAM1", levels = [1, 2] },
	{ id = 2, name = "CAM2", levels = [1, 2] },
	{ id = 3, name = "VTR", levels = [1, 2] },
	{ id = 4, name = "MIC", levels = [2] },
]
destinations = [
	{ id = 1, name = "PGM", levels = [1, 2] },
	{ id = 2, name = "PVW", levels = [1, 2] },
	{ id = 3, name = "MON-A", levels = [1] },
]
alternate_levels = [{ level = 2, alternates = [1] }]
crosspoints = [
	{ destination = 1, destination_level = 1, source = 1, source_level = 1 },
	{ destination = 1, destination_level = 2, source = 4, source_level = 2 },
	{ destination = 2, destination_level = 1, source = 2, source_level = 1, locked = true },
]
"#;
	toml::from_str(DEMO).map_err(|error| ConfigError::Parse {
		path: PathBuf::from("<built-in demo>"),
		error,
	})
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use bfc_model::LevelId;
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn demo_router_parses() {
		let demo = demo_router().unwrap().into_definition();
		assert_eq!(demo.summary.short_name, "DEMO");
		assert_eq!(demo.catalog.levels.len(), 2);
		assert_eq!(demo.crosspoints.len(), 3);
		assert!(demo.crosspoints[2].locked);
		assert_eq!(demo.alternate_levels[0].alternates, vec![LevelId(1)]);
	}

	#[test]
	fn explicit_file_is_loaded() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(
			file,
			r#"
log_level = "debug"

[engine]
quiet_period_ms = 50

[[routers]]
id = 7
display_name = "Truck"
levels = [{{ id = 1, name = "V" }}]
"#
		)
		.unwrap();

		let config = MonitorConfig::load(Some(file.path())).unwrap();
		assert_eq!(config.log_level.as_deref(), Some("debug"));
		assert_eq!(config.engine.quiet_period_ms, 50);
		let definitions = config.definitions();
		assert_eq!(definitions.len(), 1);
		assert_eq!(definitions[0].summary.short_name, "Truck");
	}

	#[test]
	fn missing_explicit_file_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		let err = MonitorConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
		assert!(matches!(err, ConfigError::Io { .. }));
	}

	#[test]
	fn duplicate_routers_are_rejected() {
		let text = r#"
[[routers]]
id = 1
display_name = "A"

[[routers]]
id = 1
display_name = "B"
"#;
		let err = MonitorConfig::parse(Path::new("monitor.toml"), text).unwrap_err();
		assert!(matches!(err, ConfigError::DuplicateRouter(RouterId(1))));
	}

	#[test]
	fn unknown_keys_are_rejected() {
		let err = MonitorConfig::parse(Path::new("monitor.toml"), "colour = true").unwrap_err();
		assert!(matches!(err, ConfigError::Parse { .. }));
	}
}

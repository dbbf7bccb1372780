//! Multi-file configuration loading.
//!
//! The main file may list `include = "file.toml"` or `include = [...]`,
//! resolved relative to its directory. Included files contribute whole
//! sections and may not include further files.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Top-level sections of a storefront configuration.
const SECTIONS: [&str; 5] = ["client", "storage", "transport", "envelope", "orders"];

const INCLUDE_KEY: &str = "include";

/// Loads `path` and every file it includes into one validated [`Config`].
pub(crate) async fn load(path: &Path) -> Result<Config, ConfigError> {
	let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
	let main_path = canonical(path).await?;

	let mut main = read_table(&main_path).await?;
	let includes = take_includes(&mut main)?;

	let mut sections = SectionMap::default();
	sections.merge(main, &main_path)?;

	for include in includes {
		let include_path = canonical(&base_dir.join(include)).await?;
		if sections.files.contains(&include_path) {
			return Err(ConfigError::RepeatedInclude(include_path));
		}

		let table = read_table(&include_path).await?;
		if table.contains_key(INCLUDE_KEY) {
			return Err(ConfigError::Validation(format!(
				"{} lists includes, only the main file may include others",
				include_path.display()
			)));
		}
		sections.merge(table, &include_path)?;
	}

	tracing::debug!(
		path = %main_path.display(),
		files = sections.files.len(),
		"Loaded configuration"
	);
	let config: Config = toml::Value::Table(sections.table).try_into()?;
	config.validate()?;
	Ok(config)
}

/// Sections collected so far and the file each one came from.
#[derive(Default)]
struct SectionMap {
	table: toml::Table,
	sources: HashMap<String, PathBuf>,
	files: HashSet<PathBuf>,
}

impl SectionMap {
	fn merge(&mut self, table: toml::Table, file: &Path) -> Result<(), ConfigError> {
		self.files.insert(file.to_path_buf());
		for (section, value) in table {
			if !SECTIONS.contains(&section.as_str()) {
				return Err(ConfigError::UnknownSection {
					section,
					file: file.to_path_buf(),
				});
			}
			if let Some(first) = self.sources.get(&section) {
				return Err(ConfigError::DuplicateSection {
					section,
					first: first.clone(),
					second: file.to_path_buf(),
				});
			}
			self.sources.insert(section.clone(), file.to_path_buf());
			self.table.insert(section, value);
		}
		Ok(())
	}
}

async fn canonical(path: &Path) -> Result<PathBuf, ConfigError> {
	tokio::fs::canonicalize(path).await.map_err(|e| {
		ConfigError::Io(std::io::Error::new(
			e.kind(),
			format!("Configuration file {}: {}", path.display(), e),
		))
	})
}

async fn read_table(path: &Path) -> Result<toml::Table, ConfigError> {
	let content = tokio::fs::read_to_string(path).await?;
	let resolved = resolve_env_vars(&content)?;
	Ok(toml::from_str(&resolved)?)
}

fn take_includes(table: &mut toml::Table) -> Result<Vec<PathBuf>, ConfigError> {
	match table.remove(INCLUDE_KEY) {
		None => Ok(Vec::new()),
		Some(toml::Value::String(path)) => Ok(vec![PathBuf::from(path)]),
		Some(toml::Value::Array(paths)) => paths
			.into_iter()
			.map(|entry| match entry {
				toml::Value::String(path) => Ok(PathBuf::from(path)),
				other => Err(ConfigError::Validation(format!(
					"include entries must be paths, got {}",
					other.type_str()
				))),
			})
			.collect(),
		Some(other) => Err(ConfigError::Validation(format!(
			"include must be a path or a list of paths, got {}",
			other.type_str()
		))),
	}
}

//! `sqlbridge.toml` configuration.
//!
//! ```toml
//! [conversion]
//! varchar_length = 50
//! rewrite_boolean_literals = true
//! keep_comments = false
//!
//! [mappings.MY_NOW]
//! kind = "direct"
//! target = "SYSDATETIME"
//! category = "date"
//!
//! [mappings.WINDOW_SUM]
//! kind = "flag"
//! reason = "WINDOW_SUM needs an OVER clause"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::converter::ConvertOptions;
use crate::error::{BridgeError, BridgeResult};
use crate::mapping::{Category, MappingTable};
use crate::rewrites::RewriteOptions;

pub const CONFIG_FILE: &str = "sqlbridge.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub conversion: ConversionConfig,
    /// Extra or overriding mapping entries, keyed by function name.
    pub mappings: BTreeMap<String, MappingEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConversionConfig {
    pub varchar_length: u32,
    pub rewrite_boolean_literals: bool,
    pub keep_comments: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            varchar_length: RewriteOptions::default().varchar_length,
            rewrite_boolean_literals: true,
            keep_comments: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Direct,
    Reorder,
    Flag,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingEntry {
    pub kind: EntryKind,
    pub target: Option<String>,
    pub reason: Option<String>,
    pub category: Option<Category>,
}

impl Config {
    /// Load from `explicit`, or from the first discovered config file.
    ///
    /// No file at all yields the defaults.
    pub fn load(explicit: Option<&Path>) -> BridgeResult<Config> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => Self::discover(),
        };
        match path {
            Some(p) => Self::from_file(&p),
            None => Ok(Config::default()),
        }
    }

    /// `./sqlbridge.toml`, then `<config dir>/sqlbridge/config.toml`.
    pub fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE);
        if local.is_file() {
            return Some(local);
        }
        dirs::config_dir()
            .map(|d| d.join("sqlbridge").join("config.toml"))
            .filter(|p| p.is_file())
    }

    pub fn from_file(path: &Path) -> BridgeResult<Config> {
        let content = fs::read_to_string(path)?;
        let config = Self::parse(&content).map_err(|source| BridgeError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), mappings = config.mappings.len(), "loaded config");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Config, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            rewrite: RewriteOptions {
                varchar_length: self.conversion.varchar_length,
            },
            rewrite_boolean_literals: self.conversion.rewrite_boolean_literals,
            keep_comments: self.conversion.keep_comments,
        }
    }

    /// The default table extended with the configured entries.
    pub fn mapping_table(&self) -> BridgeResult<MappingTable> {
        let defaults = MappingTable::global();
        let mut builder = MappingTable::tableau_builder();

        for (name, entry) in &self.mappings {
            let category = entry
                .category
                .or_else(|| defaults.lookup(name).map(|r| r.category))
                .unwrap_or(Category::Other);

            builder = match entry.kind {
                EntryKind::Direct => {
                    let target = entry.target.as_deref().ok_or_else(|| {
                        BridgeError::Config(format!("mapping {}: direct entries need a target", name))
                    })?;
                    builder.direct(name, target, category)
                }
                EntryKind::Flag => {
                    let reason = entry
                        .reason
                        .clone()
                        .unwrap_or_else(|| format!("{} requires manual review", name.to_ascii_uppercase()));
                    builder.flag(name, category, reason)
                }
                EntryKind::Reorder => {
                    return Err(BridgeError::Config(format!(
                        "mapping {}: reorder rules cannot be configured",
                        name
                    )));
                }
            };
        }

        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::RuleKind;

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.convert_options(), ConvertOptions::default());
    }

    #[test]
    fn test_conversion_section() {
        let config = Config::parse("[conversion]\nvarchar_length = 64\nkeep_comments = false\n").unwrap();
        let options = config.convert_options();
        assert_eq!(options.rewrite.varchar_length, 64);
        assert!(!options.keep_comments);
        assert!(options.rewrite_boolean_literals);
    }

    #[test]
    fn test_mapping_extensions() {
        let config = Config::parse(
            r#"
            [mappings.now]
            kind = "flag"
            reason = "use SYSDATETIME"

            [mappings.WINDOW_SUM]
            kind = "direct"
            target = "SUM"
            category = "aggregate"
            "#,
        )
        .unwrap();
        let table = config.mapping_table().unwrap();

        let now = table.lookup("NOW").unwrap();
        assert_eq!(now.kind(), RuleKind::Flag);
        assert_eq!(now.reason(), Some("use SYSDATETIME"));
        assert_eq!(now.category, Category::Date);

        let window = table.lookup("window_sum").unwrap();
        assert_eq!(window.target(), Some("SUM"));
        assert_eq!(window.category, Category::Aggregate);
        assert!(table.len() > MappingTable::global().len());
    }

    #[test]
    fn test_reorder_rejected() {
        let config = Config::parse("[mappings.ZN]\nkind = \"reorder\"\ntarget = \"ISNULL\"\n").unwrap();
        let err = config.mapping_table().unwrap_err();
        assert!(err.to_string().contains("reorder rules cannot be configured"));
    }

    #[test]
    fn test_direct_without_target() {
        let config = Config::parse("[mappings.FOO]\nkind = \"direct\"\n").unwrap();
        assert!(matches!(config.mapping_table(), Err(BridgeError::Config(_))));
    }

    #[test]
    fn test_unknown_field_is_parse_error() {
        assert!(Config::parse("[conversion]\nvarchar = 3\n").is_err());
    }
}

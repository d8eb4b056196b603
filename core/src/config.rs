use std::collections::BTreeMap;
use std::str::FromStr;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::expr::lookup_operator;
use crate::sql::dialect::{Dialect, Template};

/// How parameter placeholders are written into SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderStyle {
    /// `?` for every parameter
    #[default]
    Anonymous,
    /// `$1`, `$2`, ... in emission order
    Numbered,
}

impl PlaceholderStyle {
    pub fn render(&self, position: usize) -> String {
        match self {
            PlaceholderStyle::Anonymous => "?".to_string(),
            PlaceholderStyle::Numbered => format!("${}", position),
        }
    }
}

impl FromStr for PlaceholderStyle {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anonymous" | "?" => Ok(PlaceholderStyle::Anonymous),
            "numbered" | "$" | "$n" => Ok(PlaceholderStyle::Numbered),
            other => Err(QueryError::Config(format!(
                "unknown placeholder style '{}'",
                other
            ))),
        }
    }
}

/// Storage shape a declared column type resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Json,
    Array,
    Scalar,
}

/// Declared column type names and the storage shape each one maps to.
///
/// Names are matched case-insensitively; unknown names are scalars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TypeMappings {
    entries: BTreeMap<String, ColumnKind>,
}

impl TypeMappings {
    pub fn builder() -> TypeMappingsBuilder {
        TypeMappingsBuilder {
            entries: Self::default().entries,
        }
    }

    pub fn kind_of(&self, declared_type: &str) -> ColumnKind {
        self.entries
            .get(&declared_type.to_ascii_lowercase())
            .copied()
            .unwrap_or(ColumnKind::Scalar)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TypeMappings {
    fn default() -> Self {
        let entries = [
            ("string-array", ColumnKind::Array),
            ("int-array", ColumnKind::Array),
            ("list-array", ColumnKind::Array),
            ("jsonb", ColumnKind::Json),
            ("json", ColumnKind::Json),
        ]
        .into_iter()
        .map(|(name, kind)| (name.to_string(), kind))
        .collect();
        Self { entries }
    }
}

// Entries read from a file extend the defaults rather than replace them.
impl<'de> Deserialize<'de> for TypeMappings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let custom = BTreeMap::<String, ColumnKind>::deserialize(deserializer)?;
        let mut builder = TypeMappings::builder();
        for (name, kind) in custom {
            builder = builder.with(name, kind);
        }
        Ok(builder.build())
    }
}

/// Collects custom type definitions on top of the defaults.
#[derive(Debug, Clone)]
pub struct TypeMappingsBuilder {
    entries: BTreeMap<String, ColumnKind>,
}

impl TypeMappingsBuilder {
    pub fn with(mut self, declared_type: impl AsRef<str>, kind: ColumnKind) -> Self {
        self.entries
            .insert(declared_type.as_ref().to_ascii_lowercase(), kind);
        self
    }

    pub fn build(self) -> TypeMappings {
        TypeMappings {
            entries: self.entries,
        }
    }
}

/// Settings for compiling statements.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompilerConfig {
    #[serde(default)]
    pub placeholder: PlaceholderStyle,
    /// Operator name to SQL pattern, applied over the PostgreSQL defaults
    #[serde(default)]
    pub template_overrides: BTreeMap<String, String>,
    #[serde(default)]
    pub type_mappings: TypeMappings,
}

impl CompilerConfig {
    pub fn from_toml(s: &str) -> QueryResult<Self> {
        toml::from_str(s).map_err(|e| QueryError::Config(e.to_string()))
    }

    /// Load config from a TOML file, with environment variable overrides.
    /// Falls back to defaults if the file is not found. JSONB_SQL_CONFIG overrides the path.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> QueryResult<Self> {
        ConfigLoader::new(|key| env::var(key).ok()).load(path)
    }

    /// Build the dialect with every template override applied.
    pub fn dialect(&self) -> QueryResult<Dialect> {
        let mut dialect = Dialect::postgres();
        for (name, pattern) in &self.template_overrides {
            let operator = lookup_operator(name)
                .ok_or_else(|| QueryError::UnknownOperator(name.clone()))?;
            dialect = dialect.with_template(operator.name, Template::new(pattern.clone()))?;
        }
        Ok(dialect)
    }
}

/// Resolves configuration from a file and environment variables.
struct ConfigLoader<F> {
    var: F,
}

impl<F> ConfigLoader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn new(var: F) -> Self {
        Self { var }
    }

    fn load<P: AsRef<Path>>(&self, default_path: P) -> QueryResult<CompilerConfig> {
        let cfg_path = match (self.var)("JSONB_SQL_CONFIG") {
            Some(env_path) => PathBuf::from(env_path),
            None => default_path.as_ref().to_path_buf(),
        };

        let mut cfg = match fs::read_to_string(&cfg_path) {
            Ok(s) => CompilerConfig::from_toml(&s)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %cfg_path.display(), "config file not found, using defaults");
                CompilerConfig::default()
            }
            Err(e) => {
                return Err(QueryError::Config(format!(
                    "failed to read {}: {}",
                    cfg_path.display(),
                    e
                )));
            }
        };

        self.apply_env_overrides(&mut cfg)?;
        debug!(
            placeholder = ?cfg.placeholder,
            overrides = cfg.template_overrides.len(),
            "compiler config loaded"
        );
        Ok(cfg)
    }

    /// Apply JSONB_SQL_* environment variable overrides.
    fn apply_env_overrides(&self, cfg: &mut CompilerConfig) -> QueryResult<()> {
        if let Some(v) = (self.var)("JSONB_SQL_PLACEHOLDER") {
            cfg.placeholder = v.parse()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let cfg = CompilerConfig::default();
        assert_eq!(cfg.placeholder, PlaceholderStyle::Anonymous);
        assert_eq!(cfg.type_mappings.kind_of("jsonb"), ColumnKind::Json);
        assert_eq!(cfg.type_mappings.kind_of("STRING-ARRAY"), ColumnKind::Array);
        assert_eq!(cfg.type_mappings.kind_of("varchar"), ColumnKind::Scalar);
    }

    #[test]
    fn test_placeholder_render() {
        assert_eq!(PlaceholderStyle::Anonymous.render(3), "?");
        assert_eq!(PlaceholderStyle::Numbered.render(3), "$3");
        assert_eq!("$n".parse::<PlaceholderStyle>(), Ok(PlaceholderStyle::Numbered));
        assert!("named".parse::<PlaceholderStyle>().is_err());
    }

    #[test]
    fn test_custom_mappings_extend_defaults() {
        let mappings = TypeMappings::builder()
            .with("uuid-array", ColumnKind::Array)
            .build();
        assert_eq!(mappings.kind_of("uuid-array"), ColumnKind::Array);
        assert_eq!(mappings.kind_of("jsonb"), ColumnKind::Json);
    }

    #[test]
    fn test_from_toml() {
        let cfg = CompilerConfig::from_toml(
            r#"
placeholder = "numbered"

[template_overrides]
CONTAINS_KEY = "jsonb_exists({1}, {2})"

[type_mappings]
"tag-array" = "array"
"#,
        )
        .unwrap();

        assert_eq!(cfg.placeholder, PlaceholderStyle::Numbered);
        assert_eq!(cfg.type_mappings.kind_of("tag-array"), ColumnKind::Array);
        assert_eq!(cfg.type_mappings.kind_of("list-array"), ColumnKind::Array);
        assert!(cfg.dialect().is_ok());
    }

    #[test]
    fn test_dialect_rejects_unknown_operator() {
        let mut cfg = CompilerConfig::default();
        cfg.template_overrides
            .insert("JSON_MERGE".to_string(), "merge({1})".to_string());
        assert!(matches!(
            cfg.dialect(),
            Err(QueryError::UnknownOperator(name)) if name == "JSON_MERGE"
        ));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ConfigLoader::new(no_env)
            .load(dir.path().join("absent.toml"))
            .unwrap();
        assert_eq!(cfg, CompilerConfig::default());
    }

    #[test]
    fn test_load_file_with_env_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "placeholder = \"anonymous\"").unwrap();

        let loader = ConfigLoader::new(|key: &str| {
            (key == "JSONB_SQL_PLACEHOLDER").then(|| "numbered".to_string())
        });
        let cfg = loader.load(file.path()).unwrap();
        assert_eq!(cfg.placeholder, PlaceholderStyle::Numbered);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "placeholder = 42").unwrap();

        let err = ConfigLoader::new(no_env).load(file.path()).unwrap_err();
        assert_eq!(err.kind(), "config_error");
    }
}

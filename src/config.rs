use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use thiserror::Error;
use validator::Validate;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

#[derive(Error, Debug)]
#[error("expected one of {expected}, got '{value}'")]
pub struct UnknownOption {
    value: String,
    expected: &'static str,
}

/// What to do with `*` and `*n..` relationships, which have no upper bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnboundedPathPolicy {
    #[default]
    Escalate,
    Reject,
}

/// How a label backed by several entities is combined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MultiEntityPolicy {
    /// Rows of every backing entity, columns coalesced.
    #[default]
    Union,
    /// Only keys present in every backing entity.
    Join,
}

/// Cycle handling for path enumeration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CyclePolicy {
    /// No node repeats within a path.
    #[default]
    Forbidden,
    /// Nodes may repeat, edges may not; the depth cap bounds the walk.
    Bounded,
}

macro_rules! parse_lowercase_enum {
    ($ty:ty, $expected:literal, $($text:literal => $variant:expr),+ $(,)?) => {
        impl FromStr for $ty {
            type Err = UnknownOption;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($variant),)+
                    _ => Err(UnknownOption {
                        value: s.to_string(),
                        expected: $expected,
                    }),
                }
            }
        }
    };
}

parse_lowercase_enum!(UnboundedPathPolicy, "escalate, reject",
    "escalate" => UnboundedPathPolicy::Escalate,
    "reject" => UnboundedPathPolicy::Reject,
);
parse_lowercase_enum!(MultiEntityPolicy, "union, join",
    "union" => MultiEntityPolicy::Union,
    "join" => MultiEntityPolicy::Join,
);
parse_lowercase_enum!(CyclePolicy, "forbidden, bounded",
    "forbidden" => CyclePolicy::Forbidden,
    "bounded" => CyclePolicy::Bounded,
);

/// Translator configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Upper bound accepted for `*min..max` relationships and the cap applied
    /// to shortest-path searches.
    #[validate(range(
        min = 1,
        max = 1000,
        message = "Max path depth must be between 1 and 1000"
    ))]
    pub max_path_depth: u32,

    pub unbounded_path_policy: UnboundedPathPolicy,

    pub multi_entity_policy: MultiEntityPolicy,

    /// Accept labels, types and properties that differ from the mapping only
    /// in case. Such resolutions lower the confidence score.
    pub case_insensitive_schema_fallback: bool,

    /// Default result cap for path enumeration.
    #[validate(range(min = 1, message = "Max path results must be at least 1"))]
    pub max_path_results: u64,

    pub cycle_policy: CyclePolicy,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            max_path_depth: 10,
            unbounded_path_policy: UnboundedPathPolicy::Escalate,
            multi_entity_policy: MultiEntityPolicy::Union,
            case_insensitive_schema_fallback: false,
            max_path_results: 1000,
            cycle_policy: CyclePolicy::Forbidden,
        }
    }
}

impl TranslatorConfig {
    /// Create configuration from `KUSTOGRAPH_*` environment variables with
    /// validation. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            max_path_depth: parse_env_var("KUSTOGRAPH_MAX_PATH_DEPTH", "10")?,
            unbounded_path_policy: parse_env_var("KUSTOGRAPH_UNBOUNDED_PATH_POLICY", "escalate")?,
            multi_entity_policy: parse_env_var("KUSTOGRAPH_MULTI_ENTITY_POLICY", "union")?,
            case_insensitive_schema_fallback: parse_env_var(
                "KUSTOGRAPH_CASE_INSENSITIVE_SCHEMA_FALLBACK",
                "false",
            )?,
            max_path_results: parse_env_var("KUSTOGRAPH_MAX_PATH_RESULTS", "1000")?,
            cycle_policy: parse_env_var("KUSTOGRAPH_CYCLE_POLICY", "forbidden")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }
}

/// Parse an environment variable with a default value
fn parse_env_var<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}

//! Pipeline configuration.

use k_nn::{DEFAULT_LEAF_SIZE, SearchStrategy};
use magic_helpers::LoaderOptions;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("k must be at least 1")]
    InvalidK,
    #[error("at least one feature column is required")]
    NoFeatures,
    #[error("k-d tree leaf size must be at least 1")]
    InvalidLeafSize,
    #[error("delimiter {0:?} is not a single ASCII character")]
    InvalidDelimiter(char),
    #[error("unknown distance metric {0:?} (expected euclidean, manhattan or chebyshev)")]
    UnknownMetric(String),
    #[error("unknown index {0:?} (expected kdtree or linear)")]
    UnknownIndex(String),
}

/// Distance metric used by the classifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "lowercase")
)]
pub enum Metric {
    #[default]
    Euclidean,
    Manhattan,
    Chebyshev,
}

impl Display for Metric {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Metric::Euclidean => "euclidean",
            Metric::Manhattan => "manhattan",
            Metric::Chebyshev => "chebyshev",
        })
    }
}

impl FromStr for Metric {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "euclidean" | "l2" => Ok(Metric::Euclidean),
            "manhattan" | "l1" => Ok(Metric::Manhattan),
            "chebyshev" | "linf" => Ok(Metric::Chebyshev),
            _ => Err(ConfigError::UnknownMetric(s.to_string())),
        }
    }
}

/// Parses the index name used on the command line.
pub fn parse_strategy(name: &str, leaf_size: usize) -> Result<SearchStrategy, ConfigError> {
    match name.to_ascii_lowercase().as_str() {
        "kdtree" | "kd-tree" => Ok(SearchStrategy::KdTree { leaf_size }),
        "linear" => Ok(SearchStrategy::Linear),
        _ => Err(ConfigError::UnknownIndex(name.to_string())),
    }
}

/// Everything a pipeline run depends on.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", default)
)]
pub struct PipelineConfig {
    /// Feature columns between the id and the label.
    pub n_features: usize,
    pub has_header: bool,
    pub delimiter: char,
    /// Share of records used for training, in `(0, 1)`.
    pub train_ratio: f64,
    pub seed: u64,
    pub k: usize,
    pub metric: Metric,
    pub strategy: SearchStrategy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            n_features: 10,
            has_header: true,
            delimiter: ',',
            train_ratio: 0.7,
            seed: 42,
            k: 3,
            metric: Metric::Euclidean,
            strategy: SearchStrategy::KdTree {
                leaf_size: DEFAULT_LEAF_SIZE,
            },
        }
    }
}

impl PipelineConfig {
    /// Checks the settings no later stage validates on its own. The train
    /// ratio is left to the splitter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.k == 0 {
            return Err(ConfigError::InvalidK);
        }
        if self.n_features == 0 {
            return Err(ConfigError::NoFeatures);
        }
        if let SearchStrategy::KdTree { leaf_size: 0 } = self.strategy {
            return Err(ConfigError::InvalidLeafSize);
        }
        self.delimiter_byte()?;
        Ok(())
    }

    fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(ConfigError::InvalidDelimiter(self.delimiter))
        }
    }

    pub fn loader_options(&self) -> Result<LoaderOptions, ConfigError> {
        Ok(LoaderOptions {
            n_features: self.n_features,
            has_header: self.has_header,
            delimiter: self.delimiter_byte()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.loader_options(), Ok(LoaderOptions::default()));
    }

    #[test]
    fn test_validation_errors() {
        let config = PipelineConfig {
            k: 0,
            ..PipelineConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidK));

        let config = PipelineConfig {
            strategy: SearchStrategy::KdTree { leaf_size: 0 },
            ..PipelineConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidLeafSize));

        let config = PipelineConfig {
            delimiter: '€',
            ..PipelineConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidDelimiter('€')));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("Euclidean".parse::<Metric>(), Ok(Metric::Euclidean));
        assert_eq!("l1".parse::<Metric>(), Ok(Metric::Manhattan));
        assert!("cosine".parse::<Metric>().is_err());
        assert_eq!(parse_strategy("linear", 8), Ok(SearchStrategy::Linear));
        assert_eq!(
            parse_strategy("kdtree", 8),
            Ok(SearchStrategy::KdTree { leaf_size: 8 })
        );
        assert_eq!(Metric::Chebyshev.to_string(), "chebyshev");
    }
}

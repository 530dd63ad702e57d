//! Target image partitions

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// A top-level directory of the target image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Partition {
    System,
    SystemExt,
    Product,
    Vendor,
    Odm,
}

impl Partition {
    pub const ALL: [Partition; 5] = [
        Partition::System,
        Partition::SystemExt,
        Partition::Product,
        Partition::Vendor,
        Partition::Odm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::System => "system",
            Partition::SystemExt => "system_ext",
            Partition::Product => "product",
            Partition::Vendor => "vendor",
            Partition::Odm => "odm",
        }
    }

    /// Partition a relative output path lives in, from its first component
    pub fn from_path(path: &str) -> Option<Self> {
        path.split('/').next().and_then(|first| first.parse().ok())
    }
}

impl FromStr for Partition {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Partition::System),
            "system_ext" => Ok(Partition::SystemExt),
            "product" => Ok(Partition::Product),
            "vendor" => Ok(Partition::Vendor),
            "odm" => Ok(Partition::Odm),
            other => Err(ConfigError::UnknownPartition(other.to_string())),
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

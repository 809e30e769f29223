use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A Selling Partner API region.
///
/// Each region maps to a fixed API endpoint and to the AWS region code used
/// in the SigV4 credential scope.
///
/// # Examples
///
/// ```
/// use spapi_common::Region;
///
/// let region: Region = "eu".parse().unwrap();
/// assert_eq!(region.aws_region(), "eu-west-1");
/// assert_eq!(region.endpoint(), "https://sellingpartnerapi-eu.amazon.com");
///
/// // AWS region codes are accepted too
/// let region: Region = "us-west-2".parse().unwrap();
/// assert_eq!(region, Region::FarEast);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Region {
    /// North America (`na`, signed as `us-east-1`).
    NorthAmerica,
    /// Europe (`eu`, signed as `eu-west-1`).
    Europe,
    /// Far East (`fe`, signed as `us-west-2`).
    FarEast,
}

impl Region {
    /// All known regions.
    pub const ALL: [Self; 3] = [Self::NorthAmerica, Self::Europe, Self::FarEast];

    /// Short region code (`na`, `eu`, `fe`).
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NorthAmerica => "na",
            Self::Europe => "eu",
            Self::FarEast => "fe",
        }
    }

    /// AWS region code used in the signing scope.
    #[must_use]
    pub const fn aws_region(self) -> &'static str {
        match self {
            Self::NorthAmerica => "us-east-1",
            Self::Europe => "eu-west-1",
            Self::FarEast => "us-west-2",
        }
    }

    /// Base URL of the region's API endpoint.
    #[must_use]
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::NorthAmerica => "https://sellingpartnerapi-na.amazon.com",
            Self::Europe => "https://sellingpartnerapi-eu.amazon.com",
            Self::FarEast => "https://sellingpartnerapi-fe.amazon.com",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Region {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|region| region.code() == needle || region.aws_region() == needle)
            .ok_or_else(|| anyhow::anyhow!("Unknown region: {s}"))
    }
}

impl TryFrom<String> for Region {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Region> for String {
    fn from(region: Region) -> Self {
        region.code().to_string()
    }
}

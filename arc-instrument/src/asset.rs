use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, StrExt};
use std::borrow::Borrow;
use std::fmt::{Display, Formatter};

/// Arcflux lowercase `SmolStr` identifier for an asset (eg/ "btc", "usdt").
///
/// Not unique across exchanges - an exchange's own representation may differ
/// (eg/ some exchanges refer to "btc" as "xbt"). Comparison and hashing treat
/// this as an opaque byte sequence per the Symbol Mapper's normalisation.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
pub struct AssetName(SmolStr);

impl AssetName {
    pub fn new<S>(name: S) -> Self
    where
        S: Into<SmolStr>,
    {
        let name = name.into();
        if name.chars().all(|c| c.is_lowercase() || !c.is_alphabetic()) {
            Self(name)
        } else {
            Self(name.to_lowercase_smolstr())
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for AssetName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for AssetName {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

impl Borrow<str> for AssetName {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for AssetName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AssetName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for AssetName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        let name = std::borrow::Cow::<'de, str>::deserialize(deserializer)?;
        Ok(AssetName::new(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_name_lowercases() {
        assert_eq!(AssetName::new("BTC").as_str(), "btc");
        assert_eq!(AssetName::new("usdt").as_str(), "usdt");
    }

    #[test]
    fn test_asset_name_eq_across_case() {
        assert_eq!(AssetName::new("BTC"), AssetName::new("btc"));
    }
}

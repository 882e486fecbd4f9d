use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Deserializer, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(ImageId);

/// Name of an image-encoding scheme, e.g. `Martin1`.
///
/// The decoder serializes modes it cannot name as a tagged object
/// (`{"Unknown": 7}`); those deserialize into a name like `Unknown(7)` which no
/// registry knows, so the lookup fails for that one image instead of the whole
/// listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ModeName(String);

impl ModeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModeName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ModeName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl<'de> Deserialize<'de> for ModeName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum WireMode {
            Named(String),
            Tagged(BTreeMap<String, serde_json::Value>),
        }

        Ok(match WireMode::deserialize(deserializer)? {
            WireMode::Named(name) => Self(name),
            WireMode::Tagged(tagged) => Self(
                tagged
                    .into_iter()
                    .map(|(tag, value)| format!("{tag}({value})"))
                    .collect::<Vec<_>>()
                    .join(","),
            ),
        })
    }
}

/// Raster size of a mode. Both sides are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Option<Self> {
        (width > 0 && height > 0).then_some(Self { width, height })
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

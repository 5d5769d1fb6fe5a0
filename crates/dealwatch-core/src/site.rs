use serde::{Deserialize, Serialize};

/// A supported hotdeal source site.
///
/// External item IDs are unique only within one site's namespace, so this
/// enum is part of every composite key that touches crawl state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    Algumon,
    Ruliweb,
}

impl Site {
    /// Stable lowercase identifier, used as the DB key and in log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Site::Algumon => "algumon",
            Site::Ruliweb => "ruliweb",
        }
    }

    /// Human-readable name for email headings.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Site::Algumon => "ALGUMON",
            Site::Ruliweb => "RULIWEB",
        }
    }
}

impl std::fmt::Display for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Site {
    type Err = UnknownSite;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "algumon" => Ok(Site::Algumon),
            "ruliweb" => Ok(Site::Ruliweb),
            other => Err(UnknownSite(other.to_owned())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown site identifier: {0}")]
pub struct UnknownSite(pub String);

//! Types shared by the try-on server and client.
//!
//! The wire contract of `POST /api/tryon` lives here so both sides serialize
//! the same shapes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum accepted size of a single image part (8 MiB).
pub const MAX_IMAGE_BYTES: usize = 8 * 1024 * 1024;

/// Path of the try-on endpoint.
pub const TRYON_PATH: &str = "/api/tryon";

/// Path of the health endpoint.
pub const HEALTH_PATH: &str = "/api/health";

/// Multipart part carrying the person photo.
pub const PART_PERSON: &str = "image";

/// Multipart part carrying the advisory clothing metadata.
pub const PART_CLOTHING: &str = "clothing";

const MIB: usize = 1024 * 1024;

/// Human-readable size limit, e.g. `8MB`.
#[must_use]
pub fn size_label(bytes: usize) -> String {
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{bytes} bytes")
    }
}

/// Named upload position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GarmentRole {
    Person,
    Shirt,
    Pants,
}

impl GarmentRole {
    /// Garment roles in forwarding priority order.
    pub const GARMENTS: [GarmentRole; 2] = [GarmentRole::Shirt, GarmentRole::Pants];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Shirt => "shirt",
            Self::Pants => "pants",
        }
    }

    /// Name of the multipart part carrying this role.
    #[must_use]
    pub const fn part_name(self) -> &'static str {
        match self {
            Self::Person => PART_PERSON,
            Self::Shirt => "shirt",
            Self::Pants => "pants",
        }
    }

    /// Role for a multipart part name, if it is one of the image parts.
    #[must_use]
    pub fn from_part_name(name: &str) -> Option<Self> {
        match name {
            PART_PERSON => Some(Self::Person),
            "shirt" => Some(Self::Shirt),
            "pants" => Some(Self::Pants),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_garment(self) -> bool {
        !matches!(self, Self::Person)
    }
}

impl fmt::Display for GarmentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of a configuration value.
///
/// Precedence: CLI arguments > configuration file > programmatic > defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    /// Value provided via CLI argument (highest precedence).
    Cli,
    /// Value loaded from configuration file.
    Config,
    /// Value provided programmatically (e.g., `Config::builder()`).
    Programmatic,
    /// Built-in default value (lowest precedence).
    Default,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cli => write!(f, "cli"),
            Self::Config => write!(f, "config"),
            Self::Programmatic => write!(f, "programmatic"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// One selected clothing item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClothingItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub color: String,
}

impl ClothingItem {
    #[must_use]
    pub fn new(kind: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            color: color.into(),
        }
    }
}

/// Advisory clothing metadata sent alongside the garment images.
///
/// Synthesis never depends on it; it only enriches logs and the optional
/// description forwarded to the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClothingSelection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shirt: Option<ClothingItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pants: Option<ClothingItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shoes: Option<ClothingItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coat: Option<ClothingItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch: Option<ClothingItem>,
}

impl ClothingSelection {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items().next().is_none()
    }

    fn items(&self) -> impl Iterator<Item = &ClothingItem> {
        [&self.shirt, &self.pants, &self.coat, &self.shoes, &self.watch]
            .into_iter()
            .flatten()
    }

    /// Render a short description such as `"red t-shirt, blue jeans"`.
    ///
    /// Items with an empty type are skipped.
    #[must_use]
    pub fn describe(&self) -> String {
        self.items()
            .filter(|item| !item.kind.trim().is_empty())
            .map(|item| {
                let kind = item.kind.trim().to_lowercase();
                let color = item.color.trim();
                if color.is_empty() {
                    kind
                } else {
                    format!("{color} {kind}")
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// JSON body returned by `POST /api/tryon`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TryOnResponseBody {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TryOnResponseBody {
    /// Message attached to successful responses.
    pub const SUCCESS_MESSAGE: &'static str = "Outfit generated successfully";

    #[must_use]
    pub fn success(original_image: String, generated_image: String) -> Self {
        Self {
            success: true,
            original_image: Some(original_image),
            generated_image: Some(generated_image),
            message: Some(Self::SUCCESS_MESSAGE.to_string()),
            error: None,
        }
    }

    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            original_image: None,
            generated_image: None,
            message: None,
            error: Some(error.into()),
        }
    }
}

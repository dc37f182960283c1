use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ModelError;

/// Name of an uploaded image: `<deviceId>-<uniqueNumber>.<format>`.
///
/// The device id and unique number together form the key of the image, so a device
/// must never reuse a unique number it generated before.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageIdentifier {
    pub device_id: i64,
    pub unique_number: i32,
    /// File extension without the dot, ASCII only (e.g. "jpg").
    pub format: String,
}

impl ImageIdentifier {
    pub fn new(device_id: i64, unique_number: i32, format: impl Into<String>) -> Self {
        Self {
            device_id,
            unique_number,
            format: format.into(),
        }
    }

    /// Picks a random non-negative unique number. Callers still have to check the
    /// device hasn't produced the same name before (e.g. the file already exists).
    pub fn generate(device_id: i64, format: impl Into<String>) -> Self {
        let unique_number = rand::rng().random_range(0..i32::MAX);
        Self::new(device_id, unique_number, format)
    }
}

impl fmt::Display for ImageIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}.{}", self.device_id, self.unique_number, self.format)
    }
}

impl FromStr for ImageIdentifier {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ModelError::InvalidImageName(s.to_string());

        let (stem, format) = s.rsplit_once('.').ok_or_else(invalid)?;
        let (device, unique) = stem.split_once('-').ok_or_else(invalid)?;

        if format.is_empty() || !format.is_ascii() || format.contains(['/', '\\']) {
            return Err(invalid());
        }

        Ok(Self {
            device_id: device.parse().map_err(|_| invalid())?,
            unique_number: unique.parse().map_err(|_| invalid())?,
            format: format.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let image = ImageIdentifier::new(42, 1234, "jpg");
        assert_eq!(image.to_string(), "42-1234.jpg");
    }

    #[test]
    fn test_parse() {
        let image: ImageIdentifier = "7-99.png".parse().unwrap();
        assert_eq!(image, ImageIdentifier::new(7, 99, "png"));
    }

    #[test]
    fn test_parse_invalid() {
        for name in ["", "photo.jpg", "7-99", "7-abc.jpg", "x-1.jpg", "7-1."] {
            assert!(name.parse::<ImageIdentifier>().is_err(), "{name}");
        }
    }

    #[test]
    fn test_generate_parses_back() {
        let image = ImageIdentifier::generate(3, "jpg");
        assert!(image.unique_number >= 0);
        let parsed: ImageIdentifier = image.to_string().parse().unwrap();
        assert_eq!(parsed, image);
    }
}

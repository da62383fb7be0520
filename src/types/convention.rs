//! Source coordinate conventions.
//!
//! Modelling tools disagree on which axis points up and on handedness.
//! Bedrock geometry is Y-up and right-handed, so every imported mesh is
//! tagged with the convention it was authored in and remapped by the
//! normalizer.

use serde::{Deserialize, Serialize};

/// Which source axis points up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpAxis {
    Y,
    Z,
}

/// Handedness of the source coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    Right,
    Left,
}

/// The coordinate convention a mesh was authored in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceConvention {
    /// glTF, OBJ and most game engines.
    #[default]
    YUpRightHanded,
    /// Blender, 3ds Max and many CAD exports.
    ZUpRightHanded,
    /// Unity, DirectX-style tools.
    YUpLeftHanded,
    /// Unreal-style tools.
    ZUpLeftHanded,
}

impl SourceConvention {
    /// All conventions.
    pub const ALL: [SourceConvention; 4] = [
        SourceConvention::YUpRightHanded,
        SourceConvention::ZUpRightHanded,
        SourceConvention::YUpLeftHanded,
        SourceConvention::ZUpLeftHanded,
    ];

    /// Build a convention from its two components.
    pub fn new(up: UpAxis, handedness: Handedness) -> Self {
        match (up, handedness) {
            (UpAxis::Y, Handedness::Right) => SourceConvention::YUpRightHanded,
            (UpAxis::Z, Handedness::Right) => SourceConvention::ZUpRightHanded,
            (UpAxis::Y, Handedness::Left) => SourceConvention::YUpLeftHanded,
            (UpAxis::Z, Handedness::Left) => SourceConvention::ZUpLeftHanded,
        }
    }

    pub fn up_axis(&self) -> UpAxis {
        match self {
            SourceConvention::YUpRightHanded | SourceConvention::YUpLeftHanded => UpAxis::Y,
            SourceConvention::ZUpRightHanded | SourceConvention::ZUpLeftHanded => UpAxis::Z,
        }
    }

    pub fn handedness(&self) -> Handedness {
        match self {
            SourceConvention::YUpRightHanded | SourceConvention::ZUpRightHanded => {
                Handedness::Right
            }
            SourceConvention::YUpLeftHanded | SourceConvention::ZUpLeftHanded => Handedness::Left,
        }
    }

    /// Parse from a short tag such as `y-up-rh` or `z_up_left_handed` (case-insensitive).
    pub fn from_str(s: &str) -> Option<Self> {
        let normalized = s.to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "y_up_rh" | "y_up_right_handed" | "yup_rh" => Some(SourceConvention::YUpRightHanded),
            "z_up_rh" | "z_up_right_handed" | "zup_rh" => Some(SourceConvention::ZUpRightHanded),
            "y_up_lh" | "y_up_left_handed" | "yup_lh" => Some(SourceConvention::YUpLeftHanded),
            "z_up_lh" | "z_up_left_handed" | "zup_lh" => Some(SourceConvention::ZUpLeftHanded),
            _ => None,
        }
    }
}

impl std::fmt::Display for SourceConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceConvention::YUpRightHanded => write!(f, "y-up-rh"),
            SourceConvention::ZUpRightHanded => write!(f, "z-up-rh"),
            SourceConvention::YUpLeftHanded => write!(f, "y-up-lh"),
            SourceConvention::ZUpLeftHanded => write!(f, "z-up-lh"),
        }
    }
}

/// Where texture coordinate (0, 0) sits on the image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UvOrigin {
    /// glTF and Bedrock.
    #[default]
    TopLeft,
    /// OBJ and FBX.
    BottomLeft,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components_round_trip() {
        for convention in SourceConvention::ALL {
            let rebuilt = SourceConvention::new(convention.up_axis(), convention.handedness());
            assert_eq!(rebuilt, convention);
        }
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(
            SourceConvention::from_str("Z-Up-RH"),
            Some(SourceConvention::ZUpRightHanded)
        );
        assert_eq!(
            SourceConvention::from_str("y_up_left_handed"),
            Some(SourceConvention::YUpLeftHanded)
        );
        assert_eq!(SourceConvention::from_str("sideways"), None);
    }

    #[test]
    fn test_display_parses_back() {
        for convention in SourceConvention::ALL {
            assert_eq!(
                SourceConvention::from_str(&convention.to_string()),
                Some(convention)
            );
        }
    }
}

use bitflags::bitflags;

bitflags! {
    /// Toggles for optional parse paths. Parsing records which of these a
    /// stylesheet actually used in [`features_seen`](crate::Stylesheet).
    pub struct FeatureFlags: u16 {
        const NESTING = 1 << 0;
        const CASCADE_LAYERS = 1 << 1;
        const CONTAINER_QUERIES = 1 << 2;
        const SCOPE = 1 << 3;
        const CUSTOM_SELECTORS = 1 << 4;
        const COLOR_4 = 1 << 5;
        const LOGICAL_PROPERTIES = 1 << 6;
        const SUBGRID = 1 << 7;
        const ANCHOR_POSITIONING = 1 << 8;
    }
}

impl FeatureFlags {
    /// Map an external feature name to its flag.
    pub fn from_name(name: &str) -> Option<Self> {
        let flag = match name {
            "nesting" => Self::NESTING,
            "cascade-layers" => Self::CASCADE_LAYERS,
            "container-queries" => Self::CONTAINER_QUERIES,
            "scope" => Self::SCOPE,
            "custom-selectors" => Self::CUSTOM_SELECTORS,
            "color-4" => Self::COLOR_4,
            "logical-properties" => Self::LOGICAL_PROPERTIES,
            "subgrid" => Self::SUBGRID,
            "anchor-positioning" => Self::ANCHOR_POSITIONING,
            _ => return None,
        };
        Some(flag)
    }
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self::NESTING | Self::COLOR_4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(FeatureFlags::from_name("nesting"), Some(FeatureFlags::NESTING));
        assert_eq!(FeatureFlags::from_name("color-4"), Some(FeatureFlags::COLOR_4));
        assert_eq!(FeatureFlags::from_name("holograms"), None);
    }

    #[test]
    fn test_default_enables_nesting_and_color() {
        let flags = FeatureFlags::default();
        assert!(flags.contains(FeatureFlags::NESTING));
        assert!(flags.contains(FeatureFlags::COLOR_4));
        assert!(!flags.contains(FeatureFlags::CASCADE_LAYERS));
    }
}

use rustc_hash::FxHashMap;

use crate::features::FeatureFlags;
use crate::token::tokenize;
use crate::value::{parse_value_from_tokens, Value};

/// Identifier of a property in the [`PropertyRegistry`] table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyId(u16);

impl PropertyId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// True for custom property names (`--foo`). These bypass the registry and
/// are stored by name on the element's custom-property table.
pub fn is_custom_property_name(name: &str) -> bool {
    name.starts_with("--")
}

/// Longhand property table: name, inherited flag, initial value text.
/// Names are lowercase; initial values are parsed once at registry
/// construction.
static PROPERTIES: &[(&str, bool, &str)] = &[
    // Text and fonts
    ("color", true, "black"),
    ("font-family", true, "serif"),
    ("font-size", true, "medium"),
    ("font-style", true, "normal"),
    ("font-variant", true, "normal"),
    ("font-weight", true, "normal"),
    ("line-height", true, "normal"),
    ("letter-spacing", true, "normal"),
    ("word-spacing", true, "normal"),
    ("text-align", true, "start"),
    ("text-indent", true, "0"),
    ("text-transform", true, "none"),
    ("white-space", true, "normal"),
    ("word-break", true, "normal"),
    ("overflow-wrap", true, "normal"),
    ("tab-size", true, "8"),
    ("direction", true, "ltr"),
    ("visibility", true, "visible"),
    ("cursor", true, "auto"),
    ("pointer-events", true, "auto"),
    ("quotes", true, "auto"),
    ("caption-side", true, "top"),
    ("border-collapse", true, "separate"),
    ("border-spacing", true, "0"),
    ("empty-cells", true, "show"),
    ("list-style-type", true, "disc"),
    ("list-style-position", true, "outside"),
    ("list-style-image", true, "none"),
    ("orphans", true, "2"),
    ("widows", true, "2"),
    // Box model
    ("display", false, "inline"),
    ("position", false, "static"),
    ("top", false, "auto"),
    ("right", false, "auto"),
    ("bottom", false, "auto"),
    ("left", false, "auto"),
    ("float", false, "none"),
    ("clear", false, "none"),
    ("z-index", false, "auto"),
    ("width", false, "auto"),
    ("height", false, "auto"),
    ("min-width", false, "0"),
    ("min-height", false, "0"),
    ("max-width", false, "none"),
    ("max-height", false, "none"),
    ("margin-top", false, "0"),
    ("margin-right", false, "0"),
    ("margin-bottom", false, "0"),
    ("margin-left", false, "0"),
    ("padding-top", false, "0"),
    ("padding-right", false, "0"),
    ("padding-bottom", false, "0"),
    ("padding-left", false, "0"),
    ("box-sizing", false, "content-box"),
    ("aspect-ratio", false, "auto"),
    // Logical properties, mapped at layout time by the host
    ("inline-size", false, "auto"),
    ("block-size", false, "auto"),
    ("min-inline-size", false, "0"),
    ("min-block-size", false, "0"),
    ("max-inline-size", false, "none"),
    ("max-block-size", false, "none"),
    ("margin-inline-start", false, "0"),
    ("margin-inline-end", false, "0"),
    ("margin-block-start", false, "0"),
    ("margin-block-end", false, "0"),
    ("padding-inline-start", false, "0"),
    ("padding-inline-end", false, "0"),
    ("padding-block-start", false, "0"),
    ("padding-block-end", false, "0"),
    ("inset-inline-start", false, "auto"),
    ("inset-inline-end", false, "auto"),
    ("inset-block-start", false, "auto"),
    ("inset-block-end", false, "auto"),
    ("overflow-x", false, "visible"),
    ("overflow-y", false, "visible"),
    ("vertical-align", false, "baseline"),
    // Borders and outline
    ("border-top-width", false, "medium"),
    ("border-right-width", false, "medium"),
    ("border-bottom-width", false, "medium"),
    ("border-left-width", false, "medium"),
    ("border-top-style", false, "none"),
    ("border-right-style", false, "none"),
    ("border-bottom-style", false, "none"),
    ("border-left-style", false, "none"),
    ("border-top-color", false, "currentcolor"),
    ("border-right-color", false, "currentcolor"),
    ("border-bottom-color", false, "currentcolor"),
    ("border-left-color", false, "currentcolor"),
    ("border-top-left-radius", false, "0"),
    ("border-top-right-radius", false, "0"),
    ("border-bottom-right-radius", false, "0"),
    ("border-bottom-left-radius", false, "0"),
    ("outline-width", false, "medium"),
    ("outline-style", false, "none"),
    ("outline-color", false, "currentcolor"),
    // Backgrounds
    ("background-color", false, "transparent"),
    ("background-image", false, "none"),
    ("background-position", false, "0% 0%"),
    ("background-repeat", false, "repeat"),
    ("background-size", false, "auto"),
    ("background-attachment", false, "scroll"),
    ("background-clip", false, "border-box"),
    ("background-origin", false, "padding-box"),
    ("opacity", false, "1"),
    ("box-shadow", false, "none"),
    // Flex and grid
    ("flex-direction", false, "row"),
    ("flex-wrap", false, "nowrap"),
    ("flex-grow", false, "0"),
    ("flex-shrink", false, "1"),
    ("flex-basis", false, "auto"),
    ("justify-content", false, "normal"),
    ("align-items", false, "normal"),
    ("align-self", false, "auto"),
    ("align-content", false, "normal"),
    ("order", false, "0"),
    ("row-gap", false, "normal"),
    ("column-gap", false, "normal"),
    ("grid-template-rows", false, "none"),
    ("grid-template-columns", false, "none"),
    // Decoration and effects
    ("text-decoration-line", false, "none"),
    ("text-decoration-style", false, "solid"),
    ("text-decoration-color", false, "currentcolor"),
    ("text-overflow", false, "clip"),
    ("transform", false, "none"),
    ("transform-origin", false, "50% 50%"),
    ("filter", false, "none"),
    ("mix-blend-mode", false, "normal"),
    ("isolation", false, "auto"),
    ("object-fit", false, "fill"),
    ("object-position", false, "50% 50%"),
    ("content", false, "normal"),
    ("will-change", false, "auto"),
    // Transitions and animations
    ("transition-property", false, "all"),
    ("transition-duration", false, "0s"),
    ("transition-timing-function", false, "ease"),
    ("transition-delay", false, "0s"),
    ("animation-name", false, "none"),
    ("animation-duration", false, "0s"),
    // Shorthands, stored whole; longhand expansion is the host's concern
    ("margin", false, "0"),
    ("padding", false, "0"),
    ("inset", false, "auto"),
    ("overflow", false, "visible"),
    ("border", false, "none"),
    ("border-width", false, "medium"),
    ("border-style", false, "none"),
    ("border-color", false, "currentcolor"),
    ("border-radius", false, "0"),
    ("outline", false, "none"),
    ("background", false, "transparent"),
    ("font", true, "medium serif"),
    ("list-style", true, "disc"),
    ("text-decoration", false, "none"),
    ("flex", false, "0 1 auto"),
    ("gap", false, "normal"),
    ("transition", false, "none"),
    ("animation", false, "none"),
];

/// Metadata for one known property.
#[derive(Debug, Clone)]
pub struct PropertyMeta {
    pub name: &'static str,
    pub inherited: bool,
    pub initial: Value,
}

/// Lookup table from lowercase property names to ids and metadata.
///
/// Constructed once, then shared by reference with the parser and the
/// cascade; read-only after construction.
pub struct PropertyRegistry {
    by_name: FxHashMap<&'static str, PropertyId>,
    metas: Vec<PropertyMeta>,
}

impl PropertyRegistry {
    pub fn new() -> Self {
        let mut by_name = FxHashMap::default();
        let mut metas = Vec::with_capacity(PROPERTIES.len());
        for (i, &(name, inherited, initial_text)) in PROPERTIES.iter().enumerate() {
            by_name.insert(name, PropertyId(i as u16));
            let tokens = tokenize(initial_text);
            let mut diags = Vec::new();
            let initial =
                parse_value_from_tokens(&tokens, initial_text, FeatureFlags::default(), &mut diags)
                    .unwrap_or(Value::Initial);
            metas.push(PropertyMeta { name, inherited, initial });
        }
        Self { by_name, metas }
    }

    /// Id for a property name; ASCII case-insensitive.
    pub fn id(&self, name: &str) -> Option<PropertyId> {
        if name.bytes().any(|b| b.is_ascii_uppercase()) {
            self.by_name.get(name.to_ascii_lowercase().as_str()).copied()
        } else {
            self.by_name.get(name).copied()
        }
    }

    pub fn meta(&self, id: PropertyId) -> &PropertyMeta {
        &self.metas[id.index()]
    }

    pub fn name(&self, id: PropertyId) -> &'static str {
        self.meta(id).name
    }

    pub fn is_inherited(&self, id: PropertyId) -> bool {
        self.meta(id).inherited
    }

    pub fn initial(&self, id: PropertyId) -> &Value {
        &self.meta(id).initial
    }

    /// All property ids, in table order.
    pub fn ids(&self) -> impl Iterator<Item = PropertyId> + '_ {
        (0..self.metas.len()).map(|i| PropertyId(i as u16))
    }

    pub fn len(&self) -> usize {
        self.metas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metas.is_empty()
    }
}

impl Default for PropertyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = PropertyRegistry::new();
        let id = registry.id("color").unwrap();
        assert_eq!(registry.id("COLOR"), Some(id));
        assert_eq!(registry.id("CoLoR"), Some(id));
        assert_eq!(registry.name(id), "color");
        assert!(registry.id("bogus-property").is_none());
    }

    #[test]
    fn test_no_duplicate_names() {
        let registry = PropertyRegistry::new();
        assert_eq!(registry.by_name.len(), registry.metas.len());
    }

    #[test]
    fn test_inherited_flags() {
        let registry = PropertyRegistry::new();
        assert!(registry.is_inherited(registry.id("color").unwrap()));
        assert!(registry.is_inherited(registry.id("font-size").unwrap()));
        assert!(!registry.is_inherited(registry.id("display").unwrap()));
        assert!(!registry.is_inherited(registry.id("width").unwrap()));
        assert!(!registry.is_inherited(registry.id("margin-top").unwrap()));
    }

    #[test]
    fn test_initial_values_parse() {
        let registry = PropertyRegistry::new();
        for id in registry.ids() {
            assert_ne!(
                *registry.initial(id),
                Value::Initial,
                "initial value for {} failed to parse",
                registry.name(id)
            );
        }
    }

    #[test]
    fn test_initial_value_shapes() {
        let registry = PropertyRegistry::new();
        assert_eq!(
            *registry.initial(registry.id("width").unwrap()),
            Value::Keyword("auto".into())
        );
        assert_eq!(
            *registry.initial(registry.id("color").unwrap()),
            Value::Color(crate::color::Color::Rgba(Rgba::BLACK))
        );
        assert_eq!(
            *registry.initial(registry.id("opacity").unwrap()),
            Value::Integer(1)
        );
        assert_eq!(
            *registry.initial(registry.id("margin-top").unwrap()),
            Value::Integer(0)
        );
    }

    #[test]
    fn test_shorthands_are_registered_whole() {
        let registry = PropertyRegistry::new();
        assert_eq!(
            *registry.initial(registry.id("margin").unwrap()),
            Value::Integer(0)
        );
        assert_eq!(
            *registry.initial(registry.id("padding").unwrap()),
            Value::Integer(0)
        );
        assert!(registry.is_inherited(registry.id("font").unwrap()));
        assert!(!registry.is_inherited(registry.id("border").unwrap()));
    }

    #[test]
    fn test_custom_property_names() {
        assert!(is_custom_property_name("--x"));
        assert!(is_custom_property_name("--main-color"));
        assert!(!is_custom_property_name("-webkit-thing"));
        assert!(!is_custom_property_name("color"));
    }

    #[test]
    fn test_ids_round_trip() {
        let registry = PropertyRegistry::new();
        for id in registry.ids() {
            assert_eq!(registry.id(registry.name(id)), Some(id));
        }
    }
}

//! Engine facade: configuration, feature toggles, viewport context, the
//! `env()` variable map, the interaction-state oracle, and statistics
//! wrapped around the parse and cascade subsystems.

use std::time::{Duration, Instant};

use css::{FeatureFlags, Origin, PropertyRegistry, Rule, Stylesheet};
use dom::{Document, ElementRef, ElementState, NodeId, StateMap};
use rustc_hash::FxHashMap;
use style::{CascadeContext, ComputedStyle, StyleStore};

// ─────────────────────────────────────────────────────────────────────────────
// Viewport
// ─────────────────────────────────────────────────────────────────────────────

/// Static host context record. Media conditions are carried unevaluated, so
/// the viewport describes the host without driving any parse or cascade
/// decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub device_pixel_ratio: f32,
    pub root_font_size: f32,
    pub color_scheme: ColorScheme,
    pub reduced_motion: bool,
    pub high_contrast: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
            device_pixel_ratio: 1.0,
            root_font_size: 16.0,
            color_scheme: ColorScheme::Light,
            reduced_motion: false,
            high_contrast: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorScheme {
    #[default]
    Light,
    Dark,
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration and statistics
// ─────────────────────────────────────────────────────────────────────────────

/// Construction-time settings. Defaults enable the default parse features
/// and a 1280x720 viewport.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineConfig {
    pub features: FeatureFlags,
    pub viewport: Viewport,
}

/// Cumulative counters since engine construction.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineStats {
    pub rules_parsed: usize,
    pub stylesheets_parsed: usize,
    pub cascade_calculations: usize,
    pub parse_time: Duration,
    pub cascade_time: Duration,
    /// Coarse stylesheet footprint: rule records only.
    pub memory_usage: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

/// The engine owning the property registry, feature flags, viewport, `env()`
/// map, state oracle, and statistics. Stylesheets parse against the
/// registry and cascade through [`compute_style`](Self::compute_style) or
/// [`style_tree`](Self::style_tree).
pub struct CssEngine {
    registry: PropertyRegistry,
    flags: FeatureFlags,
    viewport: Viewport,
    env: FxHashMap<String, String>,
    states: StateMap,
    stats: EngineStats,
}

impl CssEngine {
    pub fn new(config: EngineConfig) -> Self {
        log::debug!("engine created, features {:?}", config.features);
        Self {
            registry: PropertyRegistry::new(),
            flags: config.features,
            viewport: config.viewport,
            env: FxHashMap::default(),
            states: StateMap::new(),
            stats: EngineStats::default(),
        }
    }

    /// Parse author-origin CSS text.
    pub fn parse_stylesheet(&mut self, text: &str, url: Option<&str>) -> Stylesheet {
        self.parse_stylesheet_as(text, Origin::Author, url)
    }

    /// Parse CSS text under an explicit cascade origin, so one engine can
    /// hold user-agent, user, and author sheets.
    pub fn parse_stylesheet_as(
        &mut self,
        text: &str,
        origin: Origin,
        url: Option<&str>,
    ) -> Stylesheet {
        let sheet = css::parse_stylesheet(text, origin, url, &self.registry, self.flags);
        self.stats.stylesheets_parsed += 1;
        self.stats.rules_parsed += sheet.rule_count();
        self.stats.parse_time += sheet.parse_time;
        self.stats.memory_usage += sheet.rule_count() * std::mem::size_of::<Rule>();
        sheet
    }

    /// Compute one element's style under `stylesheets` plus an optional
    /// inline declaration block.
    ///
    /// Ancestors cascade first, root downward, so inheritance reads real
    /// parent values. When `inline_style` is `None` the element's own
    /// `style` attribute applies. A non-element node yields an empty record.
    pub fn compute_style(
        &mut self,
        document: &Document,
        node: NodeId,
        stylesheets: &[&Stylesheet],
        inline_style: Option<&str>,
    ) -> ComputedStyle {
        let Some(element) = document.element(node) else {
            return ComputedStyle::new();
        };
        let start = Instant::now();
        let mut chain: Vec<ElementRef<'_>> = Vec::new();
        let mut cursor = Some(element);
        while let Some(el) = cursor {
            chain.push(el);
            cursor = el.parent();
        }
        chain.reverse();

        let computed = {
            let ctx = self.cascade_context();
            let mut parent: Option<ComputedStyle> = None;
            for (i, el) in chain.iter().enumerate() {
                let inline = if i + 1 == chain.len() {
                    inline_style.or_else(|| el.attr("style"))
                } else {
                    el.attr("style")
                };
                parent = Some(style::compute(*el, stylesheets, inline, parent.as_ref(), &ctx));
            }
            parent.unwrap_or_default()
        };
        self.stats.cascade_calculations += chain.len();
        self.stats.cascade_time += start.elapsed();
        computed
    }

    /// Style every element under `root`, parents before children.
    pub fn style_tree(
        &mut self,
        document: &Document,
        root: NodeId,
        stylesheets: &[&Stylesheet],
    ) -> StyleStore {
        let start = Instant::now();
        let store = {
            let ctx = self.cascade_context();
            style::style_tree(document, root, stylesheets, &ctx)
        };
        self.stats.cascade_calculations += store.len();
        self.stats.cascade_time += start.elapsed();
        store
    }

    fn cascade_context(&self) -> CascadeContext<'_> {
        CascadeContext {
            registry: &self.registry,
            flags: self.flags,
            env: &self.env,
            states: Some(&self.states),
        }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Toggle a parse feature by its external name (`"nesting"`,
    /// `"cascade-layers"`, ...). Returns false for an unknown name.
    pub fn enable_feature(&mut self, name: &str, enabled: bool) -> bool {
        let Some(flag) = FeatureFlags::from_name(name) else {
            log::warn!("unknown feature {name:?}");
            return false;
        };
        self.flags.set(flag, enabled);
        true
    }

    /// Define an `env()` variable visible to substitution.
    pub fn set_env(&mut self, name: &str, value: &str) {
        self.env.insert(name.to_string(), value.to_string());
    }

    /// Replace the interaction state bits of one node.
    pub fn set_element_state(&mut self, node: NodeId, state: ElementState) {
        self.states.set(node, state);
    }

    pub fn states(&self) -> &StateMap {
        &self.states
    }

    pub fn registry(&self) -> &PropertyRegistry {
        &self.registry
    }

    pub fn flags(&self) -> FeatureFlags {
        self.flags
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

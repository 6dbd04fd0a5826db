use crate::token::{Token, TokenKind};

/// An RGBA color value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Alpha, 0.0 (transparent) to 1.0 (opaque).
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0.0);
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);
}

impl std::fmt::Display for Rgba {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.a == 1.0 {
            write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
        } else {
            write!(f, "rgba({}, {}, {}, {:.3})", self.r, self.g, self.b, self.a)
        }
    }
}

/// A CSS color in whichever notation it was written. The parse-time form is
/// preserved; `to_rgba` converts on demand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Color {
    Rgba(Rgba),
    /// Hue in degrees; saturation and lightness as fractions 0..1.
    Hsl { h: f64, s: f64, l: f64, alpha: f32 },
    /// Hue in degrees; whiteness and blackness as fractions 0..1.
    Hwb { h: f64, w: f64, b: f64, alpha: f32 },
    /// CIE Lab, L in 0..100, a/b unbounded (typically ±125).
    Lab { l: f64, a: f64, b: f64, alpha: f32 },
    /// CIE LCH, polar form of Lab.
    Lch { l: f64, c: f64, h: f64, alpha: f32 },
    /// OKLab, L in 0..1, a/b typically ±0.4.
    Oklab { l: f64, a: f64, b: f64, alpha: f32 },
    /// OKLCH, polar form of OKLab.
    Oklch { l: f64, c: f64, h: f64, alpha: f32 },
    /// Resolves to the element's `color` property at use time.
    CurrentColor,
}

impl Color {
    /// Convert to RGBA, resolving `currentcolor` to the supplied value.
    pub fn to_rgba(self, current_color: Rgba) -> Rgba {
        match self {
            Color::Rgba(rgba) => rgba,
            Color::Hsl { h, s, l, alpha } => {
                let (r, g, b) = hsl_to_rgb(h, s, l);
                Rgba::new(channel(r), channel(g), channel(b), alpha)
            }
            Color::Hwb { h, w, b, alpha } => {
                let (r, g, bl) = hwb_to_rgb(h, w, b);
                Rgba::new(channel(r), channel(g), channel(bl), alpha)
            }
            Color::Lab { l, a, b, alpha } => {
                let rgb = xyz_d65_to_linear_srgb(xyz_d50_to_d65(lab_to_xyz_d50(l, a, b)));
                linear_rgba(rgb, alpha)
            }
            Color::Lch { l, c, h, alpha } => {
                let (a, b) = polar_to_rect(c, h);
                Color::Lab { l, a, b, alpha }.to_rgba(current_color)
            }
            Color::Oklab { l, a, b, alpha } => linear_rgba(oklab_to_linear_srgb(l, a, b), alpha),
            Color::Oklch { l, c, h, alpha } => {
                let (a, b) = polar_to_rect(c, h);
                Color::Oklab { l, a, b, alpha }.to_rgba(current_color)
            }
            Color::CurrentColor => current_color,
        }
    }

    pub fn is_current_color(self) -> bool {
        matches!(self, Color::CurrentColor)
    }

    fn alpha(self) -> f32 {
        match self {
            Color::Rgba(rgba) => rgba.a,
            Color::Hsl { alpha, .. }
            | Color::Hwb { alpha, .. }
            | Color::Lab { alpha, .. }
            | Color::Lch { alpha, .. }
            | Color::Oklab { alpha, .. }
            | Color::Oklch { alpha, .. } => alpha,
            Color::CurrentColor => 1.0,
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn tail(f: &mut std::fmt::Formatter<'_>, alpha: f32) -> std::fmt::Result {
            if alpha == 1.0 {
                write!(f, ")")
            } else {
                write!(f, " / {alpha:.3})")
            }
        }
        match *self {
            Color::Rgba(rgba) => write!(f, "{rgba}"),
            Color::Hsl { h, s, l, alpha } => {
                write!(f, "hsl({h} {}% {}%", s * 100.0, l * 100.0)?;
                tail(f, alpha)
            }
            Color::Hwb { h, w, b, alpha } => {
                write!(f, "hwb({h} {}% {}%", w * 100.0, b * 100.0)?;
                tail(f, alpha)
            }
            Color::Lab { l, a, b, alpha } => {
                write!(f, "lab({l} {a} {b}")?;
                tail(f, alpha)
            }
            Color::Lch { l, c, h, alpha } => {
                write!(f, "lch({l} {c} {h}")?;
                tail(f, alpha)
            }
            Color::Oklab { l, a, b, alpha } => {
                write!(f, "oklab({l} {a} {b}")?;
                tail(f, alpha)
            }
            Color::Oklch { l, c, h, alpha } => {
                write!(f, "oklch({l} {c} {h}")?;
                tail(f, alpha)
            }
            Color::CurrentColor => write!(f, "currentcolor"),
        }
    }
}

/// Interpolation space for `color-mix()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixSpace {
    Srgb,
    SrgbLinear,
    Hsl,
    Hwb,
    Lab,
    Lch,
    Oklab,
    Oklch,
}

impl MixSpace {
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
            "srgb" => Some(MixSpace::Srgb),
            "srgb-linear" => Some(MixSpace::SrgbLinear),
            "hsl" => Some(MixSpace::Hsl),
            "hwb" => Some(MixSpace::Hwb),
            "lab" => Some(MixSpace::Lab),
            "lch" => Some(MixSpace::Lch),
            "oklab" => Some(MixSpace::Oklab),
            "oklch" => Some(MixSpace::Oklch),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MixSpace::Srgb => "srgb",
            MixSpace::SrgbLinear => "srgb-linear",
            MixSpace::Hsl => "hsl",
            MixSpace::Hwb => "hwb",
            MixSpace::Lab => "lab",
            MixSpace::Lch => "lch",
            MixSpace::Oklab => "oklab",
            MixSpace::Oklch => "oklch",
        }
    }

    /// Index of the hue component in this space's coordinates, if polar.
    fn hue_index(self) -> Option<usize> {
        match self {
            MixSpace::Hsl | MixSpace::Hwb => Some(0),
            MixSpace::Lch | MixSpace::Oklch => Some(2),
            _ => None,
        }
    }
}

/// A parsed `color-mix()`: interpolation space plus two color arms with
/// optional percentages. Percentages are as written (0..100); validation at
/// parse time guarantees that when both are present they sum to at most 100.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMix {
    pub space: MixSpace,
    pub a: Color,
    pub pa: Option<f64>,
    pub b: Color,
    pub pb: Option<f64>,
}

impl ColorMix {
    /// Evaluate the mix to an RGBA value.
    ///
    /// Weight normalisation per CSS Color 5: a single percentage is
    /// complemented; two percentages summing below 100 % scale the result's
    /// alpha by the sum. Interpolation is premultiplied, with hue components
    /// taking the shorter arc.
    pub fn evaluate(&self, current_color: Rgba) -> Rgba {
        let (wa, wb, alpha_mult) = match (self.pa, self.pb) {
            (None, None) => (0.5, 0.5, 1.0),
            (Some(p), None) => (p / 100.0, 1.0 - p / 100.0, 1.0),
            (None, Some(p)) => (1.0 - p / 100.0, p / 100.0, 1.0),
            (Some(p1), Some(p2)) => {
                let sum = p1 + p2;
                let mult = if sum < 100.0 { sum / 100.0 } else { 1.0 };
                (p1 / sum, p2 / sum, mult)
            }
        };

        let ca = to_space(self.space, self.a.to_rgba(current_color));
        let cb = to_space(self.space, self.b.to_rgba(current_color));
        let aa = self.a.alpha() as f64;
        let ab = self.b.alpha() as f64;

        let alpha_out = aa * wa + ab * wb;
        let mut mixed = [0.0f64; 3];
        for (i, slot) in mixed.iter_mut().enumerate() {
            if self.space.hue_index() == Some(i) {
                *slot = mix_hue(ca[i], cb[i], wa, wb);
            } else if alpha_out > 0.0 {
                // Premultiplied interpolation of non-hue components.
                *slot = (ca[i] * aa * wa + cb[i] * ab * wb) / alpha_out;
            } else {
                *slot = ca[i] * wa + cb[i] * wb;
            }
        }

        let mut out = from_space(self.space, mixed);
        out.a = (alpha_out * alpha_mult).clamp(0.0, 1.0) as f32;
        out
    }
}

/// Shorter-arc hue interpolation in degrees.
fn mix_hue(h1: f64, h2: f64, w1: f64, w2: f64) -> f64 {
    let mut delta = (h2 - h1).rem_euclid(360.0);
    if delta > 180.0 {
        delta -= 360.0;
    }
    (h1 * (w1 + w2) + delta * w2).rem_euclid(360.0)
}

/// Convert an RGBA color into the coordinates of `space` (alpha dropped).
fn to_space(space: MixSpace, c: Rgba) -> [f64; 3] {
    let r = c.r as f64 / 255.0;
    let g = c.g as f64 / 255.0;
    let b = c.b as f64 / 255.0;
    match space {
        MixSpace::Srgb => [r, g, b],
        MixSpace::SrgbLinear => [srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b)],
        MixSpace::Hsl => {
            let (h, s, l) = rgb_to_hsl(r, g, b);
            [h, s, l]
        }
        MixSpace::Hwb => {
            let (h, _, _) = rgb_to_hsl(r, g, b);
            [h, r.min(g).min(b), 1.0 - r.max(g).max(b)]
        }
        MixSpace::Lab | MixSpace::Lch => {
            let [l, a, bb] = xyz_d50_to_lab(xyz_d65_to_d50(linear_srgb_to_xyz_d65([
                srgb_to_linear(r),
                srgb_to_linear(g),
                srgb_to_linear(b),
            ])));
            if space == MixSpace::Lab {
                [l, a, bb]
            } else {
                let (c2, h2) = rect_to_polar(a, bb);
                [l, c2, h2]
            }
        }
        MixSpace::Oklab | MixSpace::Oklch => {
            let [l, a, bb] = linear_srgb_to_oklab([
                srgb_to_linear(r),
                srgb_to_linear(g),
                srgb_to_linear(b),
            ]);
            if space == MixSpace::Oklab {
                [l, a, bb]
            } else {
                let (c2, h2) = rect_to_polar(a, bb);
                [l, c2, h2]
            }
        }
    }
}

/// Convert coordinates in `space` back to RGBA (alpha set by the caller).
fn from_space(space: MixSpace, v: [f64; 3]) -> Rgba {
    match space {
        MixSpace::Srgb => Rgba::new(channel(v[0]), channel(v[1]), channel(v[2]), 1.0),
        MixSpace::SrgbLinear => linear_rgba(v, 1.0),
        MixSpace::Hsl => {
            let (r, g, b) = hsl_to_rgb(v[0], v[1], v[2]);
            Rgba::new(channel(r), channel(g), channel(b), 1.0)
        }
        MixSpace::Hwb => {
            let (r, g, b) = hwb_to_rgb(v[0], v[1], v[2]);
            Rgba::new(channel(r), channel(g), channel(b), 1.0)
        }
        MixSpace::Lab => {
            linear_rgba(xyz_d65_to_linear_srgb(xyz_d50_to_d65(lab_to_xyz_d50(v[0], v[1], v[2]))), 1.0)
        }
        MixSpace::Lch => {
            let (a, b) = polar_to_rect(v[1], v[2]);
            from_space(MixSpace::Lab, [v[0], a, b])
        }
        MixSpace::Oklab => linear_rgba(oklab_to_linear_srgb(v[0], v[1], v[2]), 1.0),
        MixSpace::Oklch => {
            let (a, b) = polar_to_rect(v[1], v[2]);
            from_space(MixSpace::Oklab, [v[0], a, b])
        }
    }
}

// --- Component conversion math ---

fn channel(v: f64) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

fn linear_rgba(rgb: [f64; 3], alpha: f32) -> Rgba {
    Rgba::new(
        channel(linear_to_srgb(rgb[0])),
        channel(linear_to_srgb(rgb[1])),
        channel(linear_to_srgb(rgb[2])),
        alpha,
    )
}

fn polar_to_rect(c: f64, h_deg: f64) -> (f64, f64) {
    let h = h_deg.to_radians();
    (c * h.cos(), c * h.sin())
}

fn rect_to_polar(a: f64, b: f64) -> (f64, f64) {
    ((a * a + b * b).sqrt(), b.atan2(a).to_degrees().rem_euclid(360.0))
}

fn srgb_to_linear(c: f64) -> f64 {
    if c.abs() <= 0.04045 {
        c / 12.92
    } else {
        c.signum() * ((c.abs() + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f64) -> f64 {
    if c.abs() <= 0.0031308 {
        c * 12.92
    } else {
        c.signum() * (1.055 * c.abs().powf(1.0 / 2.4) - 0.055)
    }
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (f64, f64, f64) {
    if s == 0.0 {
        return (l, l, l);
    }
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let h_norm = h.rem_euclid(360.0) / 360.0;
    (
        hue_to_rgb(p, q, h_norm + 1.0 / 3.0),
        hue_to_rgb(p, q, h_norm),
        hue_to_rgb(p, q, h_norm - 1.0 / 3.0),
    )
}

fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 1.0 / 2.0 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    p
}

fn rgb_to_hsl(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let l = (max + min) / 2.0;
    if delta == 0.0 {
        return (0.0, 0.0, l);
    }
    let s = if l < 0.5 {
        delta / (max + min)
    } else {
        delta / (2.0 - max - min)
    };
    let h = if max == r {
        ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };
    (h * 60.0, s, l)
}

fn hwb_to_rgb(h: f64, w: f64, b: f64) -> (f64, f64, f64) {
    if w + b >= 1.0 {
        let gray = w / (w + b);
        return (gray, gray, gray);
    }
    let (r, g, bl) = hsl_to_rgb(h, 1.0, 0.5);
    let scale = |c: f64| c * (1.0 - w - b) + w;
    (scale(r), scale(g), scale(bl))
}

// sRGB <-> XYZ (D65) matrices per IEC 61966-2-1.
fn linear_srgb_to_xyz_d65(rgb: [f64; 3]) -> [f64; 3] {
    mat3(
        [
            [0.41239079926595934, 0.357584339383878, 0.1804807884018343],
            [0.21263900587151027, 0.715168678767756, 0.07219231536073371],
            [0.01933081871559182, 0.11919477979462598, 0.9505321522496607],
        ],
        rgb,
    )
}

fn xyz_d65_to_linear_srgb(xyz: [f64; 3]) -> [f64; 3] {
    mat3(
        [
            [3.2409699419045226, -1.537383177570094, -0.4986107602930034],
            [-0.9692436362808796, 1.8759675015077202, 0.04155505740717559],
            [0.05563007969699366, -0.20397695888897652, 1.0569715142428786],
        ],
        xyz,
    )
}

// Bradford chromatic adaptation between the D65 and D50 white points.
fn xyz_d65_to_d50(xyz: [f64; 3]) -> [f64; 3] {
    mat3(
        [
            [1.0479298208405488, 0.022946793341019088, -0.05019222954313557],
            [0.029627815688159344, 0.990434484573249, -0.01707382502938514],
            [-0.009243058152591178, 0.015055144896577895, 0.7518742899580008],
        ],
        xyz,
    )
}

fn xyz_d50_to_d65(xyz: [f64; 3]) -> [f64; 3] {
    mat3(
        [
            [0.9554734527042182, -0.023098536874261423, 0.0632593086610217],
            [-0.028369706963208136, 1.0099954580058226, 0.021041398966943008],
            [0.012314001688319899, -0.020507696433477912, 1.3303659366080753],
        ],
        xyz,
    )
}

const D50_WHITE: [f64; 3] = [0.9642956764295677, 1.0, 0.8251046025104602];

fn lab_to_xyz_d50(l: f64, a: f64, b: f64) -> [f64; 3] {
    const KAPPA: f64 = 24389.0 / 27.0;
    const EPSILON: f64 = 216.0 / 24389.0;
    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;
    let finv = |f: f64| {
        let f3 = f * f * f;
        if f3 > EPSILON { f3 } else { (116.0 * f - 16.0) / KAPPA }
    };
    let y = if l > KAPPA * EPSILON {
        let v = (l + 16.0) / 116.0;
        v * v * v
    } else {
        l / KAPPA
    };
    [finv(fx) * D50_WHITE[0], y, finv(fz) * D50_WHITE[2]]
}

fn xyz_d50_to_lab(xyz: [f64; 3]) -> [f64; 3] {
    const KAPPA: f64 = 24389.0 / 27.0;
    const EPSILON: f64 = 216.0 / 24389.0;
    let fwd = |t: f64| {
        if t > EPSILON { t.cbrt() } else { (KAPPA * t + 16.0) / 116.0 }
    };
    let fx = fwd(xyz[0] / D50_WHITE[0]);
    let fy = fwd(xyz[1]);
    let fz = fwd(xyz[2] / D50_WHITE[2]);
    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

fn linear_srgb_to_oklab(rgb: [f64; 3]) -> [f64; 3] {
    let l = 0.4122214708 * rgb[0] + 0.5363325363 * rgb[1] + 0.0514459929 * rgb[2];
    let m = 0.2119034982 * rgb[0] + 0.6806995451 * rgb[1] + 0.1073969566 * rgb[2];
    let s = 0.0883024619 * rgb[0] + 0.2817188376 * rgb[1] + 0.6299787005 * rgb[2];
    let l_ = l.cbrt();
    let m_ = m.cbrt();
    let s_ = s.cbrt();
    [
        0.2104542553 * l_ + 0.7936177850 * m_ - 0.0040720468 * s_,
        1.9779984951 * l_ - 2.4285922050 * m_ + 0.4505937099 * s_,
        0.0259040371 * l_ + 0.7827717662 * m_ - 0.8086757660 * s_,
    ]
}

fn oklab_to_linear_srgb(l: f64, a: f64, b: f64) -> [f64; 3] {
    let l_ = l + 0.3963377774 * a + 0.2158037573 * b;
    let m_ = l - 0.1055613458 * a - 0.0638541728 * b;
    let s_ = l - 0.0894841775 * a - 1.2914855480 * b;
    let lc = l_ * l_ * l_;
    let mc = m_ * m_ * m_;
    let sc = s_ * s_ * s_;
    [
        4.0767416621 * lc - 3.3077115913 * mc + 0.2309699292 * sc,
        -1.2684380046 * lc + 2.6097574011 * mc - 0.3413193965 * sc,
        -0.0041960863 * lc - 0.7034186147 * mc + 1.7076147010 * sc,
    ]
}

fn mat3(m: [[f64; 3]; 3], v: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

// --- Token-level parsing ---

/// One argument inside a color function, with separators flattened out.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ColorArg {
    Num(f64),
    Pct(f64),
    /// `none` keyword; treated as a zero component.
    None,
    Slash,
}

/// Collect the arguments of a non-mix color function, resolving angle
/// dimensions to degrees and dropping commas (legacy syntax).
fn collect_args(tokens: &[&Token]) -> Option<Vec<ColorArg>> {
    let mut args = Vec::new();
    for token in tokens {
        match &token.kind {
            TokenKind::Number { value, .. } => args.push(ColorArg::Num(*value)),
            TokenKind::Percentage(value) => args.push(ColorArg::Pct(*value)),
            TokenKind::Dimension { value, unit } => {
                args.push(ColorArg::Num(angle_to_degrees(*value, unit)?));
            }
            TokenKind::Ident(name) if name.eq_ignore_ascii_case("none") => {
                args.push(ColorArg::None);
            }
            TokenKind::Delim('/') => args.push(ColorArg::Slash),
            TokenKind::Comma => {}
            _ => return None,
        }
    }
    Some(args)
}

fn angle_to_degrees(value: f64, unit: &str) -> Option<f64> {
    let lower = unit.to_ascii_lowercase();
    match lower.as_str() {
        "deg" => Some(value),
        "grad" => Some(value * 0.9),
        "rad" => Some(value.to_degrees()),
        "turn" => Some(value * 360.0),
        _ => None,
    }
}

/// Split collected args into the channel triple and an optional alpha.
fn split_alpha(args: &[ColorArg]) -> Option<(&[ColorArg], Option<ColorArg>)> {
    if let Some(slash) = args.iter().position(|a| *a == ColorArg::Slash) {
        // Modern syntax: exactly one arg after the slash.
        if args.len() != slash + 2 {
            return None;
        }
        Some((&args[..slash], Some(args[slash + 1])))
    } else if args.len() == 4 {
        // Legacy comma syntax carried the alpha as a fourth argument.
        Some((&args[..3], Some(args[3])))
    } else {
        Some((args, None))
    }
}

fn alpha_value(arg: Option<ColorArg>) -> Option<f32> {
    match arg {
        Option::None => Some(1.0),
        Some(ColorArg::Num(v)) => Some(v.clamp(0.0, 1.0) as f32),
        Some(ColorArg::Pct(v)) => Some((v / 100.0).clamp(0.0, 1.0) as f32),
        Some(ColorArg::None) => Some(0.0),
        Some(ColorArg::Slash) => Option::None,
    }
}

/// Numeric component where a percentage scales so that 100 % maps to `scale`.
fn component(arg: ColorArg, scale: f64) -> Option<f64> {
    match arg {
        ColorArg::Num(v) => Some(v),
        ColorArg::Pct(v) => Some(v / 100.0 * scale),
        ColorArg::None => Some(0.0),
        ColorArg::Slash => None,
    }
}

/// Parse a color function (`rgb`, `hsl`, `hwb`, `lab`, `lch`, `oklab`,
/// `oklch` and the legacy `rgba`/`hsla` aliases) from the tokens between its
/// parentheses. Returns `None` when the arguments do not form a color.
pub fn parse_function(name: &str, tokens: &[&Token]) -> Option<Color> {
    let args = collect_args(tokens)?;
    let (channels, alpha_arg) = split_alpha(&args)?;
    if channels.len() != 3 {
        return None;
    }
    let alpha = alpha_value(alpha_arg)?;

    let lower = name.to_ascii_lowercase();
    match lower.as_str() {
        "rgb" | "rgba" => {
            let ch = |a: ColorArg| component(a, 255.0).map(|v| v.round().clamp(0.0, 255.0) as u8);
            Some(Color::Rgba(Rgba::new(
                ch(channels[0])?,
                ch(channels[1])?,
                ch(channels[2])?,
                alpha,
            )))
        }
        "hsl" | "hsla" => Some(Color::Hsl {
            h: component(channels[0], 360.0)?.rem_euclid(360.0),
            s: (component(channels[1], 100.0)? / 100.0).clamp(0.0, 1.0),
            l: (component(channels[2], 100.0)? / 100.0).clamp(0.0, 1.0),
            alpha,
        }),
        "hwb" => Some(Color::Hwb {
            h: component(channels[0], 360.0)?.rem_euclid(360.0),
            w: (component(channels[1], 100.0)? / 100.0).clamp(0.0, 1.0),
            b: (component(channels[2], 100.0)? / 100.0).clamp(0.0, 1.0),
            alpha,
        }),
        "lab" => Some(Color::Lab {
            l: component(channels[0], 100.0)?.max(0.0),
            a: component(channels[1], 125.0)?,
            b: component(channels[2], 125.0)?,
            alpha,
        }),
        "lch" => Some(Color::Lch {
            l: component(channels[0], 100.0)?.max(0.0),
            c: component(channels[1], 150.0)?.max(0.0),
            h: component(channels[2], 360.0)?.rem_euclid(360.0),
            alpha,
        }),
        "oklab" => Some(Color::Oklab {
            l: component(channels[0], 1.0)?.clamp(0.0, 1.0),
            a: component(channels[1], 0.4)?,
            b: component(channels[2], 0.4)?,
            alpha,
        }),
        "oklch" => Some(Color::Oklch {
            l: component(channels[0], 1.0)?.clamp(0.0, 1.0),
            c: component(channels[1], 0.4)?.max(0.0),
            h: component(channels[2], 360.0)?.rem_euclid(360.0),
            alpha,
        }),
        _ => None,
    }
}

/// Parse the arguments of `color-mix()`:
/// `in <space> [<hue-direction> hue]?, <color> <pct>?, <color> <pct>?`.
///
/// Percentage validation: each must lie in 0..=100, and when both are given
/// their sum must be positive and at most 100. Hue-direction keywords are
/// accepted but interpolation always takes the shorter arc.
pub fn parse_color_mix(tokens: &[&Token]) -> Option<ColorMix> {
    let mut cur = Cursor { toks: tokens, pos: 0 };

    match cur.next()? {
        TokenKind::Ident(word) if word.eq_ignore_ascii_case("in") => {}
        _ => return None,
    }
    let space = match cur.next()? {
        TokenKind::Ident(name) => MixSpace::from_name(name)?,
        _ => return None,
    };
    // Optional "<direction> hue" pair.
    if let Some(TokenKind::Ident(word)) = cur.peek() {
        if matches!(
            word.to_ascii_lowercase().as_str(),
            "shorter" | "longer" | "increasing" | "decreasing"
        ) {
            cur.pos += 1;
            match cur.next()? {
                TokenKind::Ident(w) if w.eq_ignore_ascii_case("hue") => {}
                _ => return None,
            }
        }
    }
    cur.expect_comma()?;

    let (a, pa) = cur.color_arm()?;
    cur.expect_comma()?;
    let (b, pb) = cur.color_arm()?;
    if cur.pos != cur.toks.len() {
        return None;
    }

    for p in [pa, pb].into_iter().flatten() {
        if !(0.0..=100.0).contains(&p) {
            return None;
        }
    }
    if let (Some(p1), Some(p2)) = (pa, pb) {
        if p1 + p2 > 100.0 || p1 + p2 == 0.0 {
            return None;
        }
    }

    Some(ColorMix { space, a, pa, b, pb })
}

struct Cursor<'t> {
    toks: &'t [&'t Token],
    pos: usize,
}

impl<'t> Cursor<'t> {
    fn peek(&self) -> Option<&'t TokenKind> {
        self.toks.get(self.pos).map(|t| &t.kind)
    }

    fn next(&mut self) -> Option<&'t TokenKind> {
        let kind = self.peek()?;
        self.pos += 1;
        Some(kind)
    }

    fn expect_comma(&mut self) -> Option<()> {
        match self.next()? {
            TokenKind::Comma => Some(()),
            _ => None,
        }
    }

    /// `<color> <percentage>?` or `<percentage>? <color>`.
    fn color_arm(&mut self) -> Option<(Color, Option<f64>)> {
        let mut pct = None;
        if let Some(TokenKind::Percentage(p)) = self.peek() {
            pct = Some(*p);
            self.pos += 1;
        }
        let color = self.parse_color()?;
        if pct.is_none() {
            if let Some(TokenKind::Percentage(p)) = self.peek() {
                pct = Some(*p);
                self.pos += 1;
            }
        }
        Some((color, pct))
    }

    fn parse_color(&mut self) -> Option<Color> {
        match self.next()? {
            TokenKind::Hash { value, .. } => parse_hex(value).map(Color::Rgba),
            TokenKind::Ident(name) => {
                if name.eq_ignore_ascii_case("currentcolor") {
                    Some(Color::CurrentColor)
                } else {
                    parse_named(name).map(Color::Rgba)
                }
            }
            TokenKind::Function(name) => {
                // Slice to the matching close paren.
                let start = self.pos;
                let mut depth = 1usize;
                while self.pos < self.toks.len() && depth > 0 {
                    match self.toks[self.pos].kind {
                        TokenKind::Function(_) | TokenKind::LParen => depth += 1,
                        TokenKind::RParen => depth -= 1,
                        _ => {}
                    }
                    if depth > 0 {
                        self.pos += 1;
                    }
                }
                let inner = &self.toks[start..self.pos];
                if self.pos < self.toks.len() {
                    self.pos += 1;
                }
                parse_function(name, inner)
            }
            _ => None,
        }
    }
}

/// Parse a hex color body (without the leading `#`).
/// Supports `rgb` (3 digits), `rgba` (4), `rrggbb` (6), `rrggbbaa` (8).
pub fn parse_hex(hex: &str) -> Option<Rgba> {
    let chars: Vec<char> = hex.chars().collect();
    match chars.len() {
        3 => Some(Rgba::rgb(
            hex_digit(chars[0])? * 17,
            hex_digit(chars[1])? * 17,
            hex_digit(chars[2])? * 17,
        )),
        4 => Some(Rgba::new(
            hex_digit(chars[0])? * 17,
            hex_digit(chars[1])? * 17,
            hex_digit(chars[2])? * 17,
            hex_digit(chars[3])? as f32 * 17.0 / 255.0,
        )),
        6 => Some(Rgba::rgb(
            hex_byte(chars[0], chars[1])?,
            hex_byte(chars[2], chars[3])?,
            hex_byte(chars[4], chars[5])?,
        )),
        8 => Some(Rgba::new(
            hex_byte(chars[0], chars[1])?,
            hex_byte(chars[2], chars[3])?,
            hex_byte(chars[4], chars[5])?,
            hex_byte(chars[6], chars[7])? as f32 / 255.0,
        )),
        _ => None,
    }
}

fn hex_digit(c: char) -> Option<u8> {
    match c {
        '0'..='9' => Some(c as u8 - b'0'),
        'a'..='f' => Some(c as u8 - b'a' + 10),
        'A'..='F' => Some(c as u8 - b'A' + 10),
        _ => None,
    }
}

fn hex_byte(hi: char, lo: char) -> Option<u8> {
    Some(hex_digit(hi)? * 16 + hex_digit(lo)?)
}

/// Try to parse a named CSS color. Supports all 148 CSS named colors plus
/// `transparent`.
pub fn parse_named(name: &str) -> Option<Rgba> {
    let lower = name.to_ascii_lowercase();
    match lower.as_str() {
        "aliceblue" => Some(Rgba::rgb(240, 248, 255)),
        "antiquewhite" => Some(Rgba::rgb(250, 235, 215)),
        "aqua" | "cyan" => Some(Rgba::rgb(0, 255, 255)),
        "aquamarine" => Some(Rgba::rgb(127, 255, 212)),
        "azure" => Some(Rgba::rgb(240, 255, 255)),
        "beige" => Some(Rgba::rgb(245, 245, 220)),
        "bisque" => Some(Rgba::rgb(255, 228, 196)),
        "black" => Some(Rgba::rgb(0, 0, 0)),
        "blanchedalmond" => Some(Rgba::rgb(255, 235, 205)),
        "blue" => Some(Rgba::rgb(0, 0, 255)),
        "blueviolet" => Some(Rgba::rgb(138, 43, 226)),
        "brown" => Some(Rgba::rgb(165, 42, 42)),
        "burlywood" => Some(Rgba::rgb(222, 184, 135)),
        "cadetblue" => Some(Rgba::rgb(95, 158, 160)),
        "chartreuse" => Some(Rgba::rgb(127, 255, 0)),
        "chocolate" => Some(Rgba::rgb(210, 105, 30)),
        "coral" => Some(Rgba::rgb(255, 127, 80)),
        "cornflowerblue" => Some(Rgba::rgb(100, 149, 237)),
        "cornsilk" => Some(Rgba::rgb(255, 248, 220)),
        "crimson" => Some(Rgba::rgb(220, 20, 60)),
        "darkblue" => Some(Rgba::rgb(0, 0, 139)),
        "darkcyan" => Some(Rgba::rgb(0, 139, 139)),
        "darkgoldenrod" => Some(Rgba::rgb(184, 134, 11)),
        "darkgray" | "darkgrey" => Some(Rgba::rgb(169, 169, 169)),
        "darkgreen" => Some(Rgba::rgb(0, 100, 0)),
        "darkkhaki" => Some(Rgba::rgb(189, 183, 107)),
        "darkmagenta" => Some(Rgba::rgb(139, 0, 139)),
        "darkolivegreen" => Some(Rgba::rgb(85, 107, 47)),
        "darkorange" => Some(Rgba::rgb(255, 140, 0)),
        "darkorchid" => Some(Rgba::rgb(153, 50, 204)),
        "darkred" => Some(Rgba::rgb(139, 0, 0)),
        "darksalmon" => Some(Rgba::rgb(233, 150, 122)),
        "darkseagreen" => Some(Rgba::rgb(143, 188, 143)),
        "darkslateblue" => Some(Rgba::rgb(72, 61, 139)),
        "darkslategray" | "darkslategrey" => Some(Rgba::rgb(47, 79, 79)),
        "darkturquoise" => Some(Rgba::rgb(0, 206, 209)),
        "darkviolet" => Some(Rgba::rgb(148, 0, 211)),
        "deeppink" => Some(Rgba::rgb(255, 20, 147)),
        "deepskyblue" => Some(Rgba::rgb(0, 191, 255)),
        "dimgray" | "dimgrey" => Some(Rgba::rgb(105, 105, 105)),
        "dodgerblue" => Some(Rgba::rgb(30, 144, 255)),
        "firebrick" => Some(Rgba::rgb(178, 34, 34)),
        "floralwhite" => Some(Rgba::rgb(255, 250, 240)),
        "forestgreen" => Some(Rgba::rgb(34, 139, 34)),
        "fuchsia" | "magenta" => Some(Rgba::rgb(255, 0, 255)),
        "gainsboro" => Some(Rgba::rgb(220, 220, 220)),
        "ghostwhite" => Some(Rgba::rgb(248, 248, 255)),
        "gold" => Some(Rgba::rgb(255, 215, 0)),
        "goldenrod" => Some(Rgba::rgb(218, 165, 32)),
        "gray" | "grey" => Some(Rgba::rgb(128, 128, 128)),
        "green" => Some(Rgba::rgb(0, 128, 0)),
        "greenyellow" => Some(Rgba::rgb(173, 255, 47)),
        "honeydew" => Some(Rgba::rgb(240, 255, 240)),
        "hotpink" => Some(Rgba::rgb(255, 105, 180)),
        "indianred" => Some(Rgba::rgb(205, 92, 92)),
        "indigo" => Some(Rgba::rgb(75, 0, 130)),
        "ivory" => Some(Rgba::rgb(255, 255, 240)),
        "khaki" => Some(Rgba::rgb(240, 230, 140)),
        "lavender" => Some(Rgba::rgb(230, 230, 250)),
        "lavenderblush" => Some(Rgba::rgb(255, 240, 245)),
        "lawngreen" => Some(Rgba::rgb(124, 252, 0)),
        "lemonchiffon" => Some(Rgba::rgb(255, 250, 205)),
        "lightblue" => Some(Rgba::rgb(173, 216, 230)),
        "lightcoral" => Some(Rgba::rgb(240, 128, 128)),
        "lightcyan" => Some(Rgba::rgb(224, 255, 255)),
        "lightgoldenrodyellow" => Some(Rgba::rgb(250, 250, 210)),
        "lightgray" | "lightgrey" => Some(Rgba::rgb(211, 211, 211)),
        "lightgreen" => Some(Rgba::rgb(144, 238, 144)),
        "lightpink" => Some(Rgba::rgb(255, 182, 193)),
        "lightsalmon" => Some(Rgba::rgb(255, 160, 122)),
        "lightseagreen" => Some(Rgba::rgb(32, 178, 170)),
        "lightskyblue" => Some(Rgba::rgb(135, 206, 250)),
        "lightslategray" | "lightslategrey" => Some(Rgba::rgb(119, 136, 153)),
        "lightsteelblue" => Some(Rgba::rgb(176, 196, 222)),
        "lightyellow" => Some(Rgba::rgb(255, 255, 224)),
        "lime" => Some(Rgba::rgb(0, 255, 0)),
        "limegreen" => Some(Rgba::rgb(50, 205, 50)),
        "linen" => Some(Rgba::rgb(250, 240, 230)),
        "maroon" => Some(Rgba::rgb(128, 0, 0)),
        "mediumaquamarine" => Some(Rgba::rgb(102, 205, 170)),
        "mediumblue" => Some(Rgba::rgb(0, 0, 205)),
        "mediumorchid" => Some(Rgba::rgb(186, 85, 211)),
        "mediumpurple" => Some(Rgba::rgb(147, 112, 219)),
        "mediumseagreen" => Some(Rgba::rgb(60, 179, 113)),
        "mediumslateblue" => Some(Rgba::rgb(123, 104, 238)),
        "mediumspringgreen" => Some(Rgba::rgb(0, 250, 154)),
        "mediumturquoise" => Some(Rgba::rgb(72, 209, 204)),
        "mediumvioletred" => Some(Rgba::rgb(199, 21, 133)),
        "midnightblue" => Some(Rgba::rgb(25, 25, 112)),
        "mintcream" => Some(Rgba::rgb(245, 255, 250)),
        "mistyrose" => Some(Rgba::rgb(255, 228, 225)),
        "moccasin" => Some(Rgba::rgb(255, 228, 181)),
        "navajowhite" => Some(Rgba::rgb(255, 222, 173)),
        "navy" => Some(Rgba::rgb(0, 0, 128)),
        "oldlace" => Some(Rgba::rgb(253, 245, 230)),
        "olive" => Some(Rgba::rgb(128, 128, 0)),
        "olivedrab" => Some(Rgba::rgb(107, 142, 35)),
        "orange" => Some(Rgba::rgb(255, 165, 0)),
        "orangered" => Some(Rgba::rgb(255, 69, 0)),
        "orchid" => Some(Rgba::rgb(218, 112, 214)),
        "palegoldenrod" => Some(Rgba::rgb(238, 232, 170)),
        "palegreen" => Some(Rgba::rgb(152, 251, 152)),
        "paleturquoise" => Some(Rgba::rgb(175, 238, 238)),
        "palevioletred" => Some(Rgba::rgb(219, 112, 147)),
        "papayawhip" => Some(Rgba::rgb(255, 239, 213)),
        "peachpuff" => Some(Rgba::rgb(255, 218, 185)),
        "peru" => Some(Rgba::rgb(205, 133, 63)),
        "pink" => Some(Rgba::rgb(255, 192, 203)),
        "plum" => Some(Rgba::rgb(221, 160, 221)),
        "powderblue" => Some(Rgba::rgb(176, 224, 230)),
        "purple" => Some(Rgba::rgb(128, 0, 128)),
        "rebeccapurple" => Some(Rgba::rgb(102, 51, 153)),
        "red" => Some(Rgba::rgb(255, 0, 0)),
        "rosybrown" => Some(Rgba::rgb(188, 143, 143)),
        "royalblue" => Some(Rgba::rgb(65, 105, 225)),
        "saddlebrown" => Some(Rgba::rgb(139, 69, 19)),
        "salmon" => Some(Rgba::rgb(250, 128, 114)),
        "sandybrown" => Some(Rgba::rgb(244, 164, 96)),
        "seagreen" => Some(Rgba::rgb(46, 139, 87)),
        "seashell" => Some(Rgba::rgb(255, 245, 238)),
        "sienna" => Some(Rgba::rgb(160, 82, 45)),
        "silver" => Some(Rgba::rgb(192, 192, 192)),
        "skyblue" => Some(Rgba::rgb(135, 206, 235)),
        "slateblue" => Some(Rgba::rgb(106, 90, 205)),
        "slategray" | "slategrey" => Some(Rgba::rgb(112, 128, 144)),
        "snow" => Some(Rgba::rgb(255, 250, 250)),
        "springgreen" => Some(Rgba::rgb(0, 255, 127)),
        "steelblue" => Some(Rgba::rgb(70, 130, 180)),
        "tan" => Some(Rgba::rgb(210, 180, 140)),
        "teal" => Some(Rgba::rgb(0, 128, 128)),
        "thistle" => Some(Rgba::rgb(216, 191, 216)),
        "tomato" => Some(Rgba::rgb(255, 99, 71)),
        "turquoise" => Some(Rgba::rgb(64, 224, 208)),
        "violet" => Some(Rgba::rgb(238, 130, 238)),
        "wheat" => Some(Rgba::rgb(245, 222, 179)),
        "white" => Some(Rgba::rgb(255, 255, 255)),
        "whitesmoke" => Some(Rgba::rgb(245, 245, 245)),
        "yellow" => Some(Rgba::rgb(255, 255, 0)),
        "yellowgreen" => Some(Rgba::rgb(154, 205, 50)),
        "transparent" => Some(Rgba::TRANSPARENT),
        _ => None,
    }
}

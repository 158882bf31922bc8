//! Palettes. Particles carry a symbolic [`Tint`] which the renderer resolves
//! against the owning firework's [`ColorScheme`].

use serde::{Deserialize, Serialize};

pub type Rgb = (u8, u8, u8);

const fn hex(v: u32) -> Rgb {
    ((v >> 16) as u8, (v >> 8) as u8, v as u8)
}

/// Primary / secondary / accent triples for the classic style.
pub const SCHEMES: [[Rgb; 3]; 10] = [
    [hex(0xff6b6b), hex(0xffd93d), hex(0xff8e3c)],
    [hex(0x4facfe), hex(0x00f2fe), hex(0xa8edea)],
    [hex(0xff9a9e), hex(0xfecfef), hex(0xffecd2)],
    [hex(0xa18cd1), hex(0xfbc2eb), hex(0xf5576c)],
    [hex(0x00ff87), hex(0x60efff), hex(0xffd700)],
    [hex(0xff0080), hex(0xff8c00), hex(0xffe100)],
    [hex(0xffffff), hex(0xe0e0e0), hex(0xffd700)],
    [hex(0x50ff50), hex(0x90ff90), hex(0xffffff)],
    [hex(0xff1493), hex(0xff69b4), hex(0xffb6c1)],
    [hex(0x00ffff), hex(0x40e0d0), hex(0x7fffd4)],
];

/// Glow of the rising shell head and its trail.
pub const ROCKET_COLOR: Rgb = (255, 200, 100);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tint {
    Primary,
    Secondary,
    Accent,
    Rgb(Rgb),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorScheme {
    colors: [Rgb; 3],
    /// How many of the slots hold distinct colors (1 = mono, 2 = dual, 3 = triad).
    distinct: u8,
}

impl ColorScheme {
    pub fn new(primary: Rgb, secondary: Rgb, accent: Rgb) -> Self {
        Self { colors: [primary, secondary, accent], distinct: 3 }
    }

    /// One of the fixed classic schemes.
    pub fn classic(rng: &mut fastrand::Rng) -> Self {
        let [p, s, a] = SCHEMES[rng.usize(0..SCHEMES.len())];
        Self::new(p, s, a)
    }

    /// Hue-harmony palette: mono, complementary pair, or triad, split evenly.
    pub fn harmony(rng: &mut fastrand::Rng) -> Self {
        let roll = rng.f32();
        let base = rng.f32();
        let lead = hsl_to_rgb(base, 1.0, 0.6);
        if roll < 0.33 {
            Self { colors: [lead; 3], distinct: 1 }
        } else if roll < 0.66 {
            let complement = hsl_to_rgb((base + 0.5) % 1.0, 1.0, 0.5);
            Self { colors: [lead, complement, lead], distinct: 2 }
        } else {
            Self {
                colors: [
                    lead,
                    hsl_to_rgb((base + 0.33) % 1.0, 1.0, 0.6),
                    hsl_to_rgb((base + 0.66) % 1.0, 1.0, 0.6),
                ],
                distinct: 3,
            }
        }
    }

    pub fn primary(&self) -> Rgb {
        self.colors[0]
    }

    pub fn secondary(&self) -> Rgb {
        self.colors[1]
    }

    pub fn accent(&self) -> Rgb {
        self.colors[2]
    }

    pub fn distinct(&self) -> usize {
        self.distinct as usize
    }

    /// Uniform choice among the distinct slots.
    pub fn random_slot(&self, rng: &mut fastrand::Rng) -> Tint {
        match rng.usize(0..self.distinct()) {
            0 => Tint::Primary,
            1 => Tint::Secondary,
            _ => Tint::Accent,
        }
    }

    pub fn resolve(&self, tint: Tint) -> Rgb {
        match tint {
            Tint::Primary => self.colors[0],
            Tint::Secondary => self.colors[1],
            Tint::Accent => self.colors[2],
            Tint::Rgb(rgb) => rgb,
        }
    }
}

/// `h`, `s`, `l` all in [0, 1].
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> Rgb {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = (h.rem_euclid(1.0)) * 6.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r, g, b) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let to_u8 = |v: f32| ((v + m).clamp(0.0, 1.0) * 255.0).round() as u8;
    (to_u8(r), to_u8(g), to_u8(b))
}

/// Scale a color's channels, saturating at white.
pub fn scale(color: Rgb, factor: f32) -> Rgb {
    let f = factor.max(0.0);
    (
        (color.0 as f32 * f).min(255.0) as u8,
        (color.1 as f32 * f).min(255.0) as u8,
        (color.2 as f32 * f).min(255.0) as u8,
    )
}

/// Linear blend from `from` to `to`, `t` in [0, 1].
pub fn blend(from: Rgb, to: Rgb, t: f32) -> Rgb {
    let t = t.clamp(0.0, 1.0);
    (
        (from.0 as f32 * (1.0 - t) + to.0 as f32 * t) as u8,
        (from.1 as f32 * (1.0 - t) + to.1 as f32 * t) as u8,
        (from.2 as f32 * (1.0 - t) + to.2 as f32 * t) as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hsl_primaries() {
        assert_eq!(hsl_to_rgb(0.0, 1.0, 0.5), (255, 0, 0));
        assert_eq!(hsl_to_rgb(1.0 / 3.0, 1.0, 0.5), (0, 255, 0));
        assert_eq!(hsl_to_rgb(2.0 / 3.0, 1.0, 0.5), (0, 0, 255));
    }

    #[test]
    fn test_scheme_is_seed_deterministic() {
        let a = ColorScheme::classic(&mut fastrand::Rng::with_seed(7));
        let b = ColorScheme::classic(&mut fastrand::Rng::with_seed(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_mono_harmony_only_yields_primary() {
        let mut rng = fastrand::Rng::with_seed(1);
        let scheme = (0..200)
            .map(|_| ColorScheme::harmony(&mut rng))
            .find(|s| s.distinct() == 1)
            .expect("mono scheme within 200 draws");
        for _ in 0..50 {
            assert_eq!(scheme.random_slot(&mut rng), Tint::Primary);
        }
    }

    #[test]
    fn test_resolve_direct_rgb() {
        let scheme = ColorScheme::new((1, 2, 3), (4, 5, 6), (7, 8, 9));
        assert_eq!(scheme.resolve(Tint::Accent), (7, 8, 9));
        assert_eq!(scheme.resolve(Tint::Rgb((10, 11, 12))), (10, 11, 12));
    }

    #[test]
    fn test_scale_saturates() {
        assert_eq!(scale((200, 100, 0), 2.0), (255, 200, 0));
    }
}

use skyburst::color::{self, Rgb, ROCKET_COLOR};
use skyburst::firework::{Firework, Phase};
use skyburst::launcher::{Launcher, Stage};
use skyburst::math::Vec3;
use std::io::{self, Write};

use super::starfield::Starfield;

/// World units per half-block pixel.
pub const PX_PER_CELL: f32 = 6.0;
/// Glow values run 0..=MAX_GLOW; anything brighter saturates.
const MAX_GLOW: f32 = 3.0;
const STAR_COLOR: Rgb = (200, 210, 255);
const SPARKLE_COLOR: Rgb = (255, 250, 230);

/// Draws the launcher's state into a `width` x `height` pixel grid, two
/// pixels per terminal cell stacked with "▄".
pub struct Renderer {
    width: usize,
    height: usize,
    bg: Rgb,
    glow: Vec<(f32, Rgb)>,
    order: Vec<usize>,
    output_buf: Vec<u8>,
    rng: fastrand::Rng,
}

impl Renderer {
    pub fn new(width: usize, height: usize, bg: Rgb) -> Self {
        Self {
            width,
            height,
            bg,
            glow: vec![(0.0, bg); width * height],
            order: Vec::new(),
            output_buf: Vec::with_capacity(width * height * 20),
            rng: fastrand::Rng::new(),
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.glow = vec![(0.0, self.bg); width * height];
    }

    /// The world rectangle this grid shows.
    pub fn stage(&self) -> Stage {
        Stage::new(self.width as f32 * PX_PER_CELL, self.height as f32 * PX_PER_CELL)
    }

    /// World is Y-up, rows count down from the top.
    pub fn world_to_pixel(&self, p: Vec3) -> Option<(usize, usize)> {
        if !p.is_finite() {
            return None;
        }
        let px = p.x / PX_PER_CELL;
        let py = self.height as f32 - 1.0 - p.y / PX_PER_CELL;
        if px < 0.0 || py < 0.0 || px >= self.width as f32 || py >= self.height as f32 {
            return None;
        }
        Some((px as usize, py as usize))
    }

    /// Centre of a terminal cell in world space.
    pub fn cell_to_world(&self, column: u16, row: u16) -> Vec3 {
        let px = column as f32 + 0.5;
        let py = row as f32 * 2.0 + 1.0;
        Vec3::new(px * PX_PER_CELL, (self.height as f32 - py) * PX_PER_CELL, 0.0)
    }

    fn plot(&mut self, x: usize, y: usize, intensity: f32, color: Rgb) {
        let idx = y * self.width + x;
        if intensity > self.glow[idx].0 {
            self.glow[idx] = (intensity, color);
        }
    }

    fn plot_world(&mut self, p: Vec3, intensity: f32, color: Rgb) {
        if let Some((x, y)) = self.world_to_pixel(p) {
            self.plot(x, y, intensity, color);
        }
    }

    fn halo(&mut self, x: usize, y: usize, intensity: f32, color: Rgb) {
        for dy in -1i32..=1 {
            for dx in -1i32..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                if nx >= 0 && ny >= 0 && (nx as usize) < self.width && (ny as usize) < self.height {
                    self.plot(nx as usize, ny as usize, intensity, color);
                }
            }
        }
    }

    fn draw_stars(&mut self, stars: &Starfield) {
        let (w, h) = (self.width, self.height);
        for (x, y, intensity) in stars.points(w, h) {
            self.plot(x, y, intensity * 0.6, STAR_COLOR);
        }
    }

    fn draw_firework(&mut self, fw: &Firework) {
        let dim = 0.5 + 0.5 * fw.depth();
        match fw.phase() {
            Phase::Rising => {
                let n = fw.rising_trail().len().max(1) as f32;
                for (i, p) in fw.rising_trail().iter().enumerate() {
                    let fade = (i + 1) as f32 / n;
                    self.plot_world(*p, fade * 1.5 * dim, ROCKET_COLOR);
                }
                self.plot_world(fw.head(), MAX_GLOW * dim, ROCKET_COLOR);
            }
            Phase::Exploding => {
                let scheme = *fw.scheme();
                for p in fw.particles() {
                    let base = scheme.resolve(p.tint);
                    let strength = p.alpha * p.brightness * dim;

                    let trail_len = p.trail.len().max(1) as f32;
                    for (i, t) in p.trail.iter().enumerate() {
                        let fade = (i + 1) as f32 / trail_len * 0.5;
                        self.plot_world(*t, strength * fade * MAX_GLOW, base);
                    }

                    let Some((x, y)) = self.world_to_pixel(p.position) else {
                        continue;
                    };
                    let flash = p.flags.sparkle && self.rng.f32() > 0.85;
                    let color = if flash { color::blend(base, SPARKLE_COLOR, 0.7) } else { base };
                    let intensity = strength * MAX_GLOW;
                    self.plot(x, y, intensity, color);
                    if p.size > 1.5 {
                        self.halo(x, y, intensity * 0.35, color);
                    }
                }
            }
            Phase::Done => {}
        }
    }

    fn shade(&self, (intensity, color): (f32, Rgb)) -> Rgb {
        if intensity > 0.05 {
            color::blend(self.bg, color, intensity / MAX_GLOW)
        } else {
            self.bg
        }
    }

    /// Compose one frame and write it in a single flush.
    pub fn render<W: Write>(&mut self, launcher: &Launcher, stars: &Starfield, out: &mut W) -> io::Result<()> {
        let bg = self.bg;
        self.glow.fill((0.0, bg));
        self.draw_stars(stars);

        let fireworks = launcher.fireworks();
        self.order.clear();
        self.order.extend(0..fireworks.len());
        self.order
            .sort_by(|&a, &b| fireworks[a].depth().total_cmp(&fireworks[b].depth()));
        let order = std::mem::take(&mut self.order);
        for &i in &order {
            self.draw_firework(&fireworks[i]);
        }
        self.order = order;

        self.output_buf.clear();
        self.output_buf.extend_from_slice(b"\x1b[H");

        let mut prev_top: Option<Rgb> = None;
        let mut prev_bot: Option<Rgb> = None;
        for y in (0..self.height).step_by(2) {
            for x in 0..self.width {
                let top_idx = y * self.width + x;
                let bot_idx = if y + 1 < self.height { top_idx + self.width } else { top_idx };
                let top = self.shade(self.glow[top_idx]);
                let bot = self.shade(self.glow[bot_idx]);

                if prev_top != Some(top) {
                    write!(self.output_buf, "\x1b[48;2;{};{};{}m", top.0, top.1, top.2)?;
                    prev_top = Some(top);
                }
                if prev_bot != Some(bot) {
                    write!(self.output_buf, "\x1b[38;2;{};{};{}m", bot.0, bot.1, bot.2)?;
                    prev_bot = Some(bot);
                }
                self.output_buf.extend_from_slice("▄".as_bytes());
            }
            self.output_buf.extend_from_slice(b"\x1b[0m");
            prev_top = None;
            prev_bot = None;
            if y + 2 < self.height {
                self.output_buf.extend_from_slice(b"\r\n");
            }
        }

        out.write_all(&self.output_buf)?;
        out.flush()
    }
}

use noise::{NoiseFn, Perlin};

const STAR_COUNT: usize = 160;
const MAX_DEPTH: f32 = 4.0;
const MIN_DEPTH: f32 = 0.15;
/// Depth units per second at rest.
const DRIFT_SPEED: f32 = 0.12;
const BOOST_PEAK: f32 = 6.0;
/// Fraction of the boost left after one second.
const BOOST_DECAY: f32 = 0.2;

struct Star {
    x: f32,
    y: f32,
    z: f32,
    seed: f64,
}

/// Slow fly-through backdrop. Stars drift toward the viewer and are
/// recycled at the far plane.
pub struct Starfield {
    stars: Vec<Star>,
    noise: Perlin,
    rng: fastrand::Rng,
    time: f32,
    boost: f32,
}

impl Starfield {
    pub fn new(seed: u64) -> Self {
        let mut rng = fastrand::Rng::with_seed(seed);
        let noise = Perlin::new(rng.u32(..));
        let stars = (0..STAR_COUNT)
            .map(|i| Star {
                x: rng.f32() * 2.0 - 1.0,
                y: rng.f32() * 2.0 - 1.0,
                z: MIN_DEPTH + rng.f32() * (MAX_DEPTH - MIN_DEPTH),
                seed: i as f64 * 7.31,
            })
            .collect();
        Self { stars, noise, rng, time: 0.0, boost: 0.0 }
    }

    /// Kick the stars into a brief rush toward the viewer.
    pub fn boost(&mut self) {
        self.boost = BOOST_PEAK;
    }

    pub fn update(&mut self, dt: f32) {
        self.time += dt;
        let speed = DRIFT_SPEED * (1.0 + self.boost);
        self.boost *= BOOST_DECAY.powf(dt);
        if self.boost < 0.01 {
            self.boost = 0.0;
        }

        for star in &mut self.stars {
            star.z -= speed * dt;
            if star.z <= MIN_DEPTH {
                star.x = self.rng.f32() * 2.0 - 1.0;
                star.y = self.rng.f32() * 2.0 - 1.0;
                star.z = MAX_DEPTH;
            }
        }
    }

    /// Visible stars as `(column, pixel_row, intensity)` for a
    /// `width` x `height` pixel grid. Intensity is in [0, 1].
    pub fn points(&self, width: usize, height: usize) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        let half_w = width as f32 / 2.0;
        let half_h = height as f32 / 2.0;
        self.stars.iter().filter_map(move |star| {
            let sx = star.x / star.z * half_w + half_w;
            let sy = star.y / star.z * half_h + half_h;
            if sx < 0.0 || sy < 0.0 || sx >= width as f32 || sy >= height as f32 {
                return None;
            }

            let near = 1.0 - (star.z - MIN_DEPTH) / (MAX_DEPTH - MIN_DEPTH);
            let twinkle = self.noise.get([star.seed, self.time as f64 * 1.3]) as f32;
            let intensity = (0.15 + 0.55 * near) * (0.75 + 0.25 * twinkle);
            Some((sx as usize, sy as usize, intensity.clamp(0.0, 1.0)))
        })
    }
}

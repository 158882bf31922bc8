use skyburst::error::ListenerError;
use skyburst::firework::ExplosionEvent;
use skyburst::launcher::ExplosionListener;
use std::io::Write;
use std::time::{Duration, Instant};

/// Closer bells than this merge into one.
const MIN_GAP: Duration = Duration::from_millis(150);

/// Rings the terminal bell on each burst. Far bursts at low volume stay
/// silent; the bell has no volume of its own.
pub struct Bell<W: Write> {
    out: W,
    volume: f32,
    last_ring: Option<Instant>,
}

impl<W: Write> Bell<W> {
    pub fn new(out: W, volume: f32) -> Self {
        Self { out, volume, last_ring: None }
    }

    fn audible(&self, event: &ExplosionEvent) -> bool {
        self.volume * (0.5 + 0.5 * event.depth) >= 0.25
    }
}

impl<W: Write> ExplosionListener for Bell<W> {
    fn on_explosion(&mut self, event: &ExplosionEvent) -> Result<(), ListenerError> {
        if !self.audible(event) {
            return Ok(());
        }
        let now = Instant::now();
        if self.last_ring.is_some_and(|t| now.duration_since(t) < MIN_GAP) {
            return Ok(());
        }
        self.last_ring = Some(now);
        self.out.write_all(b"\x07")?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyburst::firework::FireworkId;
    use skyburst::math::Vec3;
    use skyburst::pattern::ExplosionKind;

    fn event(depth: f32) -> ExplosionEvent {
        ExplosionEvent {
            id: FireworkId(1),
            position: Vec3::ZERO,
            depth,
            kind: ExplosionKind::Sphere,
            particles: 10,
        }
    }

    #[test]
    fn test_rings_once_per_gap() {
        let mut bell = Bell::new(Vec::new(), 0.5);
        bell.on_explosion(&event(1.0)).unwrap();
        bell.on_explosion(&event(1.0)).unwrap();
        assert_eq!(bell.out, b"\x07");
    }

    #[test]
    fn test_quiet_and_far_is_silent() {
        let mut bell = Bell::new(Vec::new(), 0.3);
        bell.on_explosion(&event(0.0)).unwrap();
        assert!(bell.out.is_empty());
        bell.on_explosion(&event(1.0)).unwrap();
        assert_eq!(bell.out.len(), 1);
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_surfaces_as_listener_error() {
        let mut bell = Bell::new(Broken, 1.0);
        assert!(matches!(bell.on_explosion(&event(1.0)), Err(ListenerError::Io(_))));
    }
}

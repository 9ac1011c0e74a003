//! Metaball scalar field and the pixel-art threshold rasterizer.
//!
//! The field at a grid point is `Σ radius² / distance²` over all particles;
//! everything above the threshold is filled as an opaque block, everything
//! below is left untouched. The hard cutoff is the look, not a shortcut.

use crate::sim::{Bounds, Particle, Tuning};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Drops the alpha channel; the terminal has no use for it.
    pub fn from_argb(argb: i32) -> Self {
        let v = argb as u32;
        Self {
            r: (v >> 16) as u8,
            g: (v >> 8) as u8,
            b: v as u8,
        }
    }

    /// Packs back to the config's signed ARGB int, always fully opaque.
    pub fn to_argb(self) -> i32 {
        (0xFF00_0000u32 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32) as i32
    }
}

/// Paint target for one frame. The host hands one in per render call; the
/// renderer must not hold onto it across ticks.
pub trait Surface {
    /// Fill a `size` x `size` pixel block whose top-left corner is (x, y).
    fn fill_block(&mut self, x: i32, y: i32, size: i32, color: Rgb);
    /// Place a line of instructional text; only the placement overlay uses it.
    fn overlay_line(&mut self, row: usize, text: &str);
}

pub struct MetaballField {
    pixel_size: i32,
    threshold: f32,
    min_dist_sq: f32,
}

impl MetaballField {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            pixel_size: tuning.pixel_size,
            threshold: tuning.threshold,
            min_dist_sq: tuning.min_dist_sq,
        }
    }

    /// Total influence of all particles at one grid point. Distances squared
    /// are floored so a point sitting on a particle center stays finite.
    pub fn influence_at(&self, x: f32, y: f32, particles: &[Particle]) -> f32 {
        let mut total = 0.0;
        for p in particles {
            let dx = x - p.pos.x;
            let dy = y - p.pos.y;
            let dist_sq = (dx * dx + dy * dy).max(self.min_dist_sq);
            total += (p.radius * p.radius) / dist_sq;
        }
        total
    }

    /// Walk the bounds at the block stride and fill every block whose field
    /// value clears the threshold. O(area / stride² x particles) per frame,
    /// which is what caps the population at 50.
    pub fn render(
        &self,
        surface: &mut dyn Surface,
        bounds: Bounds,
        particles: &[Particle],
        color: Rgb,
    ) {
        if bounds.is_degenerate() || particles.is_empty() {
            return;
        }
        let mut y = bounds.top as i32;
        while (y as f32) < bounds.bottom {
            let mut x = bounds.left as i32;
            while (x as f32) < bounds.right {
                if self.influence_at(x as f32, y as f32, particles) > self.threshold {
                    surface.fill_block(x, y, self.pixel_size, color);
                }
                x += self.pixel_size;
            }
            y += self.pixel_size;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Vec2;

    pub struct RecordingSurface {
        pub blocks: Vec<(i32, i32)>,
        pub lines: Vec<String>,
    }

    impl RecordingSurface {
        pub fn new() -> Self {
            Self {
                blocks: Vec::new(),
                lines: Vec::new(),
            }
        }
    }

    impl Surface for RecordingSurface {
        fn fill_block(&mut self, x: i32, y: i32, _size: i32, _color: Rgb) {
            self.blocks.push((x, y));
        }
        fn overlay_line(&mut self, _row: usize, text: &str) {
            self.lines.push(text.to_string());
        }
    }

    fn one_particle(x: f32, y: f32, radius: f32) -> Vec<Particle> {
        vec![Particle {
            pos: Vec2::new(x, y),
            vel: Vec2::new(0.0, 0.0),
            radius,
        }]
    }

    #[test]
    fn influence_is_deterministic_at_known_points() {
        let field = MetaballField::new(&Tuning::default());
        let particles = one_particle(0.0, 0.0, 10.0);
        // dist² = 100 → 100/100 = 1.0, below the 3.0 threshold.
        assert_eq!(field.influence_at(10.0, 0.0, &particles), 1.0);
        // dist² = 25 → 100/25 = 4.0, above it.
        assert_eq!(field.influence_at(5.0, 0.0, &particles), 4.0);
    }

    #[test]
    fn coincident_point_is_finite() {
        let field = MetaballField::new(&Tuning::default());
        let particles = one_particle(12.0, 12.0, 8.0);
        let v = field.influence_at(12.0, 12.0, &particles);
        assert!(v.is_finite());
        assert_eq!(v, 64.0_f32 / 0.001_f32);
    }

    #[test]
    fn render_fills_inside_and_skips_outside() {
        let field = MetaballField::new(&Tuning::default());
        let particles = one_particle(20.0, 20.0, 10.0);
        let mut surface = RecordingSurface::new();
        field.render(
            &mut surface,
            Bounds::of_size(40.0, 40.0),
            &particles,
            Rgb::new(245, 110, 30),
        );
        // The iso-contour for r=10 at threshold 3.0 sits at dist ≈ 5.77 px.
        assert!(surface.blocks.contains(&(20, 20)));
        assert!(surface.blocks.contains(&(24, 20)));
        assert!(!surface.blocks.contains(&(28, 20)));
        // Stride 2: only even coordinates are ever visited.
        assert!(surface.blocks.iter().all(|&(x, y)| x % 2 == 0 && y % 2 == 0));
    }

    #[test]
    fn degenerate_bounds_render_nothing() {
        let field = MetaballField::new(&Tuning::default());
        let particles = one_particle(20.0, 20.0, 10.0);
        let mut surface = RecordingSurface::new();
        field.render(
            &mut surface,
            Bounds::of_size(0.0, 40.0),
            &particles,
            Rgb::new(245, 110, 30),
        );
        assert!(surface.blocks.is_empty());
    }

    #[test]
    fn empty_population_renders_nothing() {
        let field = MetaballField::new(&Tuning::default());
        let mut surface = RecordingSurface::new();
        field.render(
            &mut surface,
            Bounds::of_size(40.0, 40.0),
            &[],
            Rgb::new(245, 110, 30),
        );
        assert!(surface.blocks.is_empty());
    }

    #[test]
    fn argb_unpacks_to_channels() {
        let c = Rgb::from_argb(0xFFF5_6E1Eu32 as i32);
        assert_eq!(c, Rgb::new(245, 110, 30));
        assert_eq!(c.to_argb(), 0xFFF5_6E1Eu32 as i32);
    }
}

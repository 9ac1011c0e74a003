//! Lava particle physics: per-tick integration, boundary policies, and the
//! bounds-proportional population.

use rand::Rng;

/// Axis-aligned simulation rectangle, in pixels. Supplied by the host every
/// tick; may change between ticks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Bounds {
    pub fn of_size(width: f32, height: f32) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            right: width,
            bottom: height,
        }
    }

    pub fn width(self) -> f32 {
        self.right - self.left
    }

    pub fn height(self) -> f32 {
        self.bottom - self.top
    }

    /// Too small to simulate or rasterize; update and render skip the tick.
    pub fn is_degenerate(self) -> bool {
        self.width() < 1.0 || self.height() < 1.0
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// The laws of physics for this micro-universe, injected at construction so
/// alternative tunings can be exercised without touching the simulation code.
#[derive(Clone, Copy, Debug)]
pub struct Tuning {
    /// Horizontal speed limit, px per tick.
    pub max_speed_x: f32,
    /// Vertical speed limit, px per tick.
    pub max_speed_y: f32,
    /// Convection force applied inside the hot/cold zones.
    pub acceleration: f32,
    /// Multiplicative per-tick velocity decay.
    pub drag: f32,
    /// Half-width of the uniform lateral jitter impulse.
    pub wander_force: f32,
    /// Fraction of the height below which the cold zone starts.
    pub cold_zone: f32,
    /// Fraction of the height above which the hot zone starts.
    pub hot_zone: f32,
    /// Influence radius range at spawn, px.
    pub min_radius: f32,
    pub max_radius: f32,
    /// One particle per this many pixels of width.
    pub width_per_particle: f32,
    pub min_particles: usize,
    pub max_particles: usize,
    /// Rasterizer stride and block size, px.
    pub pixel_size: i32,
    /// Field value above which a block is filled.
    pub threshold: f32,
    /// Floor for distance-squared in the field kernel.
    pub min_dist_sq: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            max_speed_x: 0.5,
            max_speed_y: 1.0,
            acceleration: 0.02,
            drag: 0.98,
            wander_force: 0.035,
            cold_zone: 0.25,
            hot_zone: 0.75,
            min_radius: 5.0,
            max_radius: 10.0,
            width_per_particle: 16.0,
            min_particles: 2,
            max_particles: 50,
            pixel_size: 2,
            threshold: 3.0,
            min_dist_sq: 0.001,
        }
    }
}

/// One blob of lava "energy". Not the visual radius: the influence radius
/// feeding the metaball kernel.
#[derive(Clone, Copy, Debug)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
}

impl Particle {
    /// Random initial state, uniform inside the bounds, with a small push in
    /// an arbitrary direction.
    pub fn spawn(bounds: Bounds, tuning: &Tuning, rng: &mut impl Rng) -> Self {
        Self {
            pos: Vec2::new(
                rng.gen_range(bounds.left..bounds.right),
                rng.gen_range(bounds.top..bounds.bottom),
            ),
            vel: Vec2::new(rng.gen_range(-0.25..0.25), rng.gen_range(-0.5..0.5)),
            radius: rng.gen_range(tuning.min_radius..tuning.max_radius),
        }
    }

    /// One implicit-unit time step. The tick rate is the physics rate; there
    /// is no delta-time parameter.
    pub fn update(&mut self, bounds: Bounds, tuning: &Tuning, rng: &mut impl Rng) {
        // Convection: hot zone at the bottom pushes up, cold zone at the top
        // pushes down. The shared factor keeps the motion from looking robotic.
        let relative_y = self.pos.y / bounds.height();
        let random_factor: f32 = rng.gen_range(0.8..1.3);
        if relative_y > tuning.hot_zone {
            self.vel.y -= tuning.acceleration * random_factor;
        } else if relative_y < tuning.cold_zone {
            self.vel.y += tuning.acceleration * random_factor;
        }

        // Lateral wander.
        self.vel.x += rng.gen_range(-tuning.wander_force..tuning.wander_force);

        // Drag, then clamp so forces cannot accumulate without bound.
        self.vel.x *= tuning.drag;
        self.vel.y *= tuning.drag;
        self.vel.x = self.vel.x.clamp(-tuning.max_speed_x, tuning.max_speed_x);
        self.vel.y = self.vel.y.clamp(-tuning.max_speed_y, tuning.max_speed_y);

        // Euler step.
        self.pos.x += self.vel.x;
        self.pos.y += self.vel.y;

        // Horizontal walls bounce. The max/min pair forces the particle back
        // inside even when a panel is narrower than one diameter.
        if self.pos.x - self.radius < bounds.left || self.pos.x + self.radius > bounds.right {
            self.vel.x = -self.vel.x;
            self.pos.x =
                (bounds.left + self.radius).max((bounds.right - self.radius).min(self.pos.x));
        }

        // Vertical edges wrap, giving a continuous convective loop with no
        // visible reset. Velocity is untouched.
        if self.pos.y > bounds.bottom + self.radius {
            self.pos.y = bounds.top - self.radius;
        } else if self.pos.y < bounds.top - self.radius {
            self.pos.y = bounds.bottom + self.radius;
        }
    }
}

/// Owns the particle collection. Particles never interact during update;
/// only the field rasterizer couples them.
pub struct ParticleSystem {
    tuning: Tuning,
    particles: Vec<Particle>,
}

impl ParticleSystem {
    pub fn new(tuning: Tuning) -> Self {
        Self {
            tuning,
            particles: Vec::new(),
        }
    }

    /// Population for a given panel width: one blob per 16 px, at least 2,
    /// capped at 50 to keep the rasterizer inside the frame budget.
    pub fn population_for(&self, width: f32) -> usize {
        let raw = (width / self.tuning.width_per_particle).round() as isize;
        raw.clamp(
            self.tuning.min_particles as isize,
            self.tuning.max_particles as isize,
        ) as usize
    }

    /// Discards any existing population and spawns a fresh one sized to the
    /// bounds. Called on every Animation entry, never during steady ticking.
    pub fn spawn(&mut self, bounds: Bounds, rng: &mut impl Rng) {
        self.particles.clear();
        if bounds.is_degenerate() {
            return;
        }
        let count = self.population_for(bounds.width());
        for _ in 0..count {
            self.particles.push(Particle::spawn(bounds, &self.tuning, rng));
        }
    }

    pub fn update_all(&mut self, bounds: Bounds, rng: &mut impl Rng) {
        if bounds.is_degenerate() {
            return;
        }
        for p in &mut self.particles {
            p.update(bounds, &self.tuning, rng);
        }
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn bounds_320x200() -> Bounds {
        Bounds::of_size(320.0, 200.0)
    }

    #[test]
    fn velocity_stays_clamped_over_many_ticks() {
        let tuning = Tuning::default();
        let mut rng = StdRng::seed_from_u64(11);
        let bounds = bounds_320x200();
        let mut sys = ParticleSystem::new(tuning);
        sys.spawn(bounds, &mut rng);
        for _ in 0..200 {
            sys.update_all(bounds, &mut rng);
            for p in sys.particles() {
                assert!(p.vel.x.abs() <= tuning.max_speed_x + f32::EPSILON);
                assert!(p.vel.y.abs() <= tuning.max_speed_y + f32::EPSILON);
            }
        }
    }

    #[test]
    fn horizontal_bounce_negates_and_contains() {
        let tuning = Tuning::default();
        let mut rng = StdRng::seed_from_u64(3);
        let bounds = bounds_320x200();
        let mut p = Particle {
            pos: Vec2::new(318.0, 100.0),
            vel: Vec2::new(0.4, 0.0),
            radius: 8.0,
        };
        p.update(bounds, &tuning, &mut rng);
        assert!(p.vel.x < 0.0, "bounce must negate vx, got {}", p.vel.x);
        assert!(p.pos.x >= bounds.left + p.radius);
        assert!(p.pos.x <= bounds.right - p.radius);
    }

    #[test]
    fn vertical_wrap_bottom_to_top() {
        let tuning = Tuning::default();
        let mut rng = StdRng::seed_from_u64(5);
        let bounds = bounds_320x200();
        let radius = 7.0;
        let mut p = Particle {
            pos: Vec2::new(160.0, bounds.bottom + radius + 1.0),
            vel: Vec2::new(0.0, 0.0),
            radius,
        };
        // Convection pushes up by at most 0.026 px this tick, so the particle
        // is still past the bottom edge when the wrap check runs.
        p.update(bounds, &tuning, &mut rng);
        assert_eq!(p.pos.y, bounds.top - radius);
    }

    #[test]
    fn vertical_wrap_top_to_bottom() {
        let tuning = Tuning::default();
        let mut rng = StdRng::seed_from_u64(5);
        let bounds = bounds_320x200();
        let radius = 7.0;
        let mut p = Particle {
            pos: Vec2::new(160.0, bounds.top - radius - 1.0),
            vel: Vec2::new(0.0, 0.0),
            radius,
        };
        p.update(bounds, &tuning, &mut rng);
        assert_eq!(p.pos.y, bounds.bottom + radius);
    }

    #[test]
    fn population_formula_with_clamps() {
        let sys = ParticleSystem::new(Tuning::default());
        assert_eq!(sys.population_for(160.0), 10);
        assert_eq!(sys.population_for(8.0), 2);
        assert_eq!(sys.population_for(10000.0), 50);
    }

    #[test]
    fn spawn_randomizes_within_documented_ranges() {
        let tuning = Tuning::default();
        let mut rng = StdRng::seed_from_u64(42);
        let bounds = bounds_320x200();
        let mut sys = ParticleSystem::new(tuning);
        sys.spawn(bounds, &mut rng);
        assert_eq!(sys.particles().len(), 20);
        for p in sys.particles() {
            assert!(p.radius >= tuning.min_radius && p.radius < tuning.max_radius);
            assert!(p.pos.x >= bounds.left && p.pos.x < bounds.right);
            assert!(p.pos.y >= bounds.top && p.pos.y < bounds.bottom);
            assert!(p.vel.x.abs() <= 0.25);
            assert!(p.vel.y.abs() <= 0.5);
        }
    }

    #[test]
    fn respawn_replaces_population_wholesale() {
        let tuning = Tuning::default();
        let mut rng = StdRng::seed_from_u64(9);
        let mut sys = ParticleSystem::new(tuning);
        sys.spawn(bounds_320x200(), &mut rng);
        assert_eq!(sys.particles().len(), 20);
        sys.spawn(Bounds::of_size(160.0, 100.0), &mut rng);
        assert_eq!(sys.particles().len(), 10);
    }

    #[test]
    fn degenerate_bounds_skip_update_and_spawn() {
        let tuning = Tuning::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut sys = ParticleSystem::new(tuning);
        sys.spawn(Bounds::of_size(0.0, 0.0), &mut rng);
        assert!(sys.particles().is_empty());

        sys.spawn(bounds_320x200(), &mut rng);
        let before: Vec<f32> = sys.particles().iter().map(|p| p.pos.x).collect();
        sys.update_all(Bounds::of_size(320.0, 0.0), &mut rng);
        let after: Vec<f32> = sys.particles().iter().map(|p| p.pos.x).collect();
        assert_eq!(before, after);
    }
}

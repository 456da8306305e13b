//! Ground truth rider for simulation.
//!
//! The `RouteWalker` moves along a route polyline at constant speed and
//! produces position fixes the way a phone would:
//! - Gaussian noise on every fix (seeded, reproducible)
//! - Dropout windows with no fixes at all
//! - Detours that push the rider sideways off the route
//! - Teleports (sudden jumps along the route, e.g. a stale cached fix)

use nalgebra::Vector2;
use narrator_core::{bearing_degrees, distance_meters, Route, EARTH_RADIUS_M};
use narrator_env::{Coordinate, Position};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::time::Duration;

/// A sideways excursion active during `[start_s, end_s)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detour {
    pub start_s: f64,
    pub end_s: f64,
    /// Offset to the right of travel (meters)
    pub offset_m: f64,
}

/// Moves along a route and generates noisy fixes.
pub struct RouteWalker {
    route: Route,

    /// Distance from route start to each point (meters)
    cumulative_m: Vec<f64>,

    /// RNG for fix noise
    rng: ChaCha8Rng,

    noise: Option<Normal<f64>>,
    noise_std_m: f64,

    speed_mps: f64,

    /// Current distance along the route (meters)
    distance_m: f64,

    /// Time since walker start
    elapsed: Duration,

    dropouts: Vec<(f64, f64)>,
    detours: Vec<Detour>,

    /// Pending teleports as (time, target distance), earliest first
    teleports: Vec<(f64, f64)>,
}

impl RouteWalker {
    /// Creates a walker at the start of `route`, moving at 10 m/s without noise.
    pub fn new(route: Route, seed: u64) -> Self {
        let mut cumulative_m = Vec::with_capacity(route.points.len());
        let mut total = 0.0;
        for (i, point) in route.points.iter().enumerate() {
            if i > 0 {
                total += distance_meters(&route.points[i - 1], point);
            }
            cumulative_m.push(total);
        }

        Self {
            route,
            cumulative_m,
            rng: ChaCha8Rng::seed_from_u64(seed),
            noise: None,
            noise_std_m: 0.0,
            speed_mps: 10.0,
            distance_m: 0.0,
            elapsed: Duration::ZERO,
            dropouts: Vec::new(),
            detours: Vec::new(),
            teleports: Vec::new(),
        }
    }

    /// Sets the travel speed.
    pub fn with_speed(mut self, speed_mps: f64) -> Self {
        self.speed_mps = speed_mps.max(0.0);
        self
    }

    /// Sets the fix noise standard deviation (meters, per axis).
    pub fn with_noise(mut self, std_m: f64) -> Self {
        self.noise = Normal::new(0.0, std_m).ok().filter(|_| std_m > 0.0);
        self.noise_std_m = if self.noise.is_some() { std_m } else { 0.0 };
        self
    }

    /// Starts part-way along the route (mid-route join).
    pub fn starting_at(mut self, distance_m: f64) -> Self {
        self.distance_m = distance_m.clamp(0.0, self.length_m());
        self
    }

    /// No fixes during `[start_s, end_s)`.
    pub fn with_dropout(mut self, start_s: f64, end_s: f64) -> Self {
        self.dropouts.push((start_s, end_s));
        self
    }

    /// No fixes from `at_s` on.
    pub fn with_stream_end(self, at_s: f64) -> Self {
        self.with_dropout(at_s, f64::INFINITY)
    }

    /// Pushes the rider `offset_m` to the right of the route during `[start_s, end_s)`.
    pub fn with_detour(mut self, start_s: f64, end_s: f64, offset_m: f64) -> Self {
        self.detours.push(Detour {
            start_s,
            end_s,
            offset_m,
        });
        self
    }

    /// Jumps to `to_distance_m` along the route once `at_s` is reached.
    pub fn with_teleport(mut self, at_s: f64, to_distance_m: f64) -> Self {
        self.teleports.push((at_s, to_distance_m));
        self.teleports.sort_by(|a, b| a.0.total_cmp(&b.0));
        self
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Total route length in meters.
    pub fn length_m(&self) -> f64 {
        self.cumulative_m.last().copied().unwrap_or(0.0)
    }

    pub fn distance_m(&self) -> f64 {
        self.distance_m
    }

    /// Time since walker start in seconds.
    pub fn time_s(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// True once the rider has reached the route end.
    pub fn is_finished(&self) -> bool {
        self.distance_m >= self.length_m()
    }

    /// Returns true if fixes are suppressed at the current time.
    pub fn in_dropout(&self) -> bool {
        let now = self.time_s();
        self.dropouts.iter().any(|&(start, end)| now >= start && now < end)
    }

    /// Advances the rider by `dt`.
    pub fn step(&mut self, dt: Duration) {
        self.elapsed += dt;
        self.distance_m = (self.distance_m + self.speed_mps * dt.as_secs_f64()).min(self.length_m());

        let now = self.time_s();
        while let Some(&(at, to)) = self.teleports.first() {
            if at > now {
                break;
            }
            self.teleports.remove(0);
            self.distance_m = to.clamp(0.0, self.length_m());
            tracing::debug!(time_s = now, distance_m = self.distance_m, "walker teleported");
        }
    }

    /// Point on the polyline at `distance_m` and the bearing of its segment.
    fn point_at(&self, distance_m: f64) -> (Coordinate, f64) {
        let points = &self.route.points;
        match points.len() {
            0 => return (Coordinate::new(0.0, 0.0), 0.0),
            1 => return (points[0], 0.0),
            _ => {}
        }

        let segment = self
            .cumulative_m
            .windows(2)
            .position(|w| distance_m <= w[1])
            .unwrap_or(points.len() - 2);

        let a = &points[segment];
        let b = &points[segment + 1];
        let length = self.cumulative_m[segment + 1] - self.cumulative_m[segment];
        let t = if length > 0.0 {
            ((distance_m - self.cumulative_m[segment]) / length).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let point = Coordinate::new(
            a.latitude + t * (b.latitude - a.latitude),
            a.longitude + t * (b.longitude - a.longitude),
        );
        (point, bearing_degrees(a, b))
    }

    /// Current ground truth position, including any active detour.
    pub fn true_position(&self) -> Coordinate {
        let (point, bearing) = self.point_at(self.distance_m);

        let now = self.time_s();
        let offset_m: f64 = self
            .detours
            .iter()
            .filter(|d| now >= d.start_s && now < d.end_s)
            .map(|d| d.offset_m)
            .sum();
        if offset_m == 0.0 {
            return point;
        }

        let right = (bearing + 90.0).to_radians();
        offset(&point, Vector2::new(right.sin(), right.cos()) * offset_m)
    }

    /// Produces a fix for the current time, or `None` during a dropout.
    pub fn sample(&mut self) -> Option<Position> {
        if self.in_dropout() {
            return None;
        }

        let truth = self.true_position();
        let coordinate = match self.noise {
            Some(normal) => {
                let noise = Vector2::new(normal.sample(&mut self.rng), normal.sample(&mut self.rng));
                offset(&truth, noise)
            }
            None => truth,
        };

        let (_, bearing) = self.point_at(self.distance_m);
        let mut position = Position::new(coordinate, self.elapsed.as_millis() as u64)
            .with_heading(bearing)
            .with_speed(self.speed_mps);
        if self.noise_std_m > 0.0 {
            position = position.with_accuracy(self.noise_std_m);
        }
        Some(position)
    }
}

/// Shifts a coordinate by a local (east, north) offset in meters.
fn offset(origin: &Coordinate, east_north_m: Vector2<f64>) -> Coordinate {
    let dlat = (east_north_m.y / EARTH_RADIUS_M).to_degrees();
    let dlng = (east_north_m.x / (EARTH_RADIUS_M * origin.latitude.to_radians().cos())).to_degrees();
    Coordinate::new(origin.latitude + dlat, origin.longitude + dlng)
}

//! The unified particle-state carrier (\S3).

use crate::constants::EPS;

/// A Cartesian 3-vector, Earth-centred, metres.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    /// x coordinate.
    pub x: f64,
    /// y coordinate.
    pub y: f64,
    /// z coordinate.
    pub z: f64,
}

impl Vec3 {
    /// Builds a vector from components.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean norm.
    #[must_use]
    pub fn norm(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Dot product.
    #[must_use]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Returns a unit vector in the same direction, or `self` unchanged if
    /// the norm is (numerically) zero.
    #[must_use]
    pub fn normalized(self) -> Self {
        let n = self.norm();
        if n <= 0.0 {
            self
        } else {
            self * (1.0 / n)
        }
    }

    /// `true` if `self` has unit norm within \S8's tolerance.
    #[must_use]
    pub fn is_unit(self) -> bool {
        (self.norm() - 1.0).abs() <= EPS
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl std::ops::Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        self * -1.0
    }
}

/// Kind of carrier the unified particle state represents.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Kind {
    /// A (anti)neutrino of any flavour.
    Neutrino,
    /// A charged lepton (tau, muon, electron and antiparticles).
    ChargedLepton,
}

/// Tri-state flux-crossing detector (\S3).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CrossingState {
    /// Detection is disabled for this track.
    Disabled,
    /// Armed but not yet fired.
    NotClassified,
    /// Armed, classified as currently inside the detection sphere.
    Inside,
    /// Armed, classified as currently outside the detection sphere.
    Outside,
}

/// Flux-crossing bookkeeping triad (\S3).
#[derive(Clone, Copy, Debug)]
pub struct FluxCrossing {
    /// Current inside/outside/not-yet-classified state.
    pub state: CrossingState,
    /// Whether a crossing has fired since the last re-arm.
    pub has_crossed: bool,
    /// Total number of crossings observed so far on this track.
    pub cross_count: u32,
}

impl FluxCrossing {
    /// A disabled flux-crossing detector.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            state: CrossingState::Disabled,
            has_crossed: false,
            cross_count: 0,
        }
    }

    /// An armed, not-yet-classified flux-crossing detector.
    #[must_use]
    pub const fn armed() -> Self {
        Self {
            state: CrossingState::NotClassified,
            has_crossed: false,
            cross_count: 0,
        }
    }

    /// An armed detector that starts out already below the detection
    /// altitude, used when inheriting state across transport generations
    /// (\S4.E step 7d: "crossed=1 if already below the detection
    /// altitude").
    #[must_use]
    pub fn armed_inside() -> Self {
        Self {
            state: CrossingState::Inside,
            has_crossed: false,
            cross_count: 1,
        }
    }

    /// Re-arms the detector after a first crossing (\S4.E step 3).
    pub fn rearm(&mut self) {
        self.state = CrossingState::NotClassified;
        self.has_crossed = false;
    }
}

/// The unified particle-state carrier (\S3). Both neutrino and
/// charged-lepton tracks are represented by the same struct; `kind`
/// selects which engine-specific fields are meaningful.
#[derive(Clone, Debug)]
pub struct ParticleState {
    /// Neutrino or charged lepton.
    pub kind: Kind,
    /// Signed PDG-style particle code.
    pub pid: i32,
    /// Kinetic energy (charged lepton) or total energy (neutrino), GeV.
    pub energy: f64,
    /// Position, Earth-centred Cartesian, m.
    pub position: Vec3,
    /// Unit direction of travel.
    pub direction: Vec3,
    /// Cumulative distance travelled, m.
    pub distance: f64,
    /// Cumulative grammage, kg/m^2.
    pub grammage: f64,
    /// Non-negative importance weight; zero means the track is dead.
    pub weight: f64,
    /// Set once a charged lepton has decayed.
    pub decayed: bool,
    /// Cached `r = |position|`, maintained by the geometry callback.
    pub radius: f64,
    /// Flux-crossing bookkeeping.
    pub flux: FluxCrossing,
    /// Shell index, or -1 if the particle has exited.
    pub medium_index: i32,
    /// Density at the current position, kg/m^3 (scratch for the engines).
    pub density: f64,
}

impl ParticleState {
    /// Builds a new particle state, normalising `direction` and
    /// initialising the radius cache from `position`.
    #[must_use]
    pub fn new(kind: Kind, pid: i32, energy: f64, position: Vec3, direction: Vec3) -> Self {
        let direction = direction.normalized();
        Self {
            kind,
            pid,
            energy,
            position,
            direction,
            distance: 0.0,
            grammage: 0.0,
            weight: 1.0,
            decayed: false,
            radius: position.norm(),
            flux: FluxCrossing::disabled(),
            medium_index: -1,
            density: 0.0,
        }
    }

    /// `true` if the invariants of \S8 all hold: unit direction, finite,
    /// non-negative weight and radius.
    #[must_use]
    pub fn invariants_hold(&self) -> bool {
        self.direction.is_unit()
            && self.weight >= 0.0
            && self.weight.is_finite()
            && self.radius >= 0.0
            && self.energy.is_finite()
            && self.medium_index >= -1
    }

    /// Kills the track: sets its weight to zero. Used when an invariant
    /// violation is detected (\S7: "invariant violations... cause the
    /// track to be dropped").
    pub fn kill(&mut self) {
        self.weight = 0.0;
    }

    /// `true` if the track is dead (zero weight, NaN, or otherwise invalid).
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.weight <= 0.0 || !self.invariants_hold()
    }

    /// Refreshes `radius` from `position`. Geometry callbacks are
    /// responsible for calling this after moving a particle.
    pub fn refresh_radius(&mut self) {
        self.radius = self.position.norm();
    }

    /// Advances the position by `step` along `direction`, updating the
    /// distance, radius cache, and grammage accumulator from `density`.
    pub fn advance(&mut self, step: f64) {
        self.position = self.position + self.direction * step;
        self.distance += step;
        self.grammage += self.density * step;
        self.refresh_radius();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_normalises_direction() {
        let p = ParticleState::new(
            Kind::Neutrino,
            16,
            1.0e9,
            Vec3::new(0.0, 0.0, 7_000_000.0),
            Vec3::new(0.0, 0.0, 5.0),
        );
        assert!(p.direction.is_unit());
    }

    #[test]
    fn kill_zeroes_weight() {
        let mut p = ParticleState::new(
            Kind::Neutrino,
            16,
            1.0e9,
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        );
        p.kill();
        assert!(p.is_dead());
    }

    #[test]
    fn advance_updates_distance_and_grammage() {
        let mut p = ParticleState::new(
            Kind::ChargedLepton,
            15,
            1.0e6,
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        );
        p.density = 2.0;
        p.advance(10.0);
        assert_eq!(p.distance, 10.0);
        assert_eq!(p.grammage, 20.0);
        assert_eq!(p.radius, 10.0);
    }
}

//! Radially stratified Earth-model geometry (\S3, \S4.A of the design).
//!
//! A [`ShellTable`] holds the fifteen concentric spherical shells described
//! in the data model: seven PREM polynomial segments for the core and
//! mantle, two uniform crustal layers, one uniform sea layer, four
//! exponential U.S. Standard Atmosphere segments, and one near-vacuum
//! outer-space shell. [`ShellTable::step_to_boundary`] is the single
//! operation \S4.A specifies: given a position and direction it returns the
//! suggested step to the next shell boundary and records the current shell
//! index.

use crate::constants::{EARTH_RADIUS, MIN_STEP};
use crate::particle::Vec3;

/// A material a shell is filled with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Material {
    /// Solid rock: core, mantle, and crust.
    Rock,
    /// Liquid water: the ocean layer.
    Water,
    /// Atmospheric air.
    Air,
    /// Near-vacuum outer space.
    Vacuum,
}

/// A radial density profile.
#[derive(Clone, Copy, Debug)]
pub enum Profile {
    /// PREM-style polynomial in `x = r / R_E`: `rho = sum_i c_i * x^i`.
    Polynomial([f64; 4]),
    /// Constant density.
    Uniform(f64),
    /// U.S. Standard Atmosphere exponential segment:
    /// `rho(r) = (b / c) * exp(-(r - R_E) / c)`, with `b`, `c` in kg/m^2
    /// and m respectively.
    Exponential {
        /// Column density scale, kg/m^2.
        b: f64,
        /// Attenuation length, m.
        c: f64,
    },
}

impl Profile {
    /// Evaluates the density at radius `r`, kg/m^3.
    #[must_use]
    fn density(&self, r: f64) -> f64 {
        match *self {
            Self::Polynomial(coeffs) => {
                let x = r / EARTH_RADIUS;
                let mut rho = 0.0;
                let mut xp = 1.0;
                for c in coeffs {
                    rho += c * xp;
                    xp *= x;
                }
                // published PREM coefficients are in g/cm^3
                rho.max(0.0) * 1.0e3
            }
            Self::Uniform(rho) => rho,
            Self::Exponential { b, c } => (b / c) * (-((r - EARTH_RADIUS) / c)).exp(),
        }
    }

    /// Magnitude of `d(rho)/dr`, used only for the step-size hint.
    #[must_use]
    fn density_derivative(&self, r: f64) -> f64 {
        match *self {
            Self::Polynomial(coeffs) => {
                let x = r / EARTH_RADIUS;
                let mut d = 0.0;
                let mut xp = 1.0;
                for (i, c) in coeffs.iter().enumerate().skip(1) {
                    d += (i as f64) * c * xp;
                    xp *= x;
                }
                (d / EARTH_RADIUS).abs() * 1.0e3
            }
            Self::Uniform(_) => 0.0,
            Self::Exponential { b, c } => (b / (c * c)) * (-((r - EARTH_RADIUS) / c)).exp(),
        }
    }
}

/// One concentric shell: an outer radius, a density profile, a material,
/// and a pre-computed step-size hint.
#[derive(Clone, Copy, Debug)]
pub struct Shell {
    /// Outer radius, m.
    pub outer_radius: f64,
    /// Density profile.
    pub profile: Profile,
    /// Material occupying the shell.
    pub material: Material,
}

impl Shell {
    /// Density at radius `r`, kg/m^3.
    #[must_use]
    pub fn density(&self, r: f64) -> f64 {
        self.profile.density(r)
    }

    /// Suggested step hint `0.01 * R / |drho/dr|` (\S3), floored so a
    /// vanishing gradient (uniform layers) does not divide by zero.
    #[must_use]
    pub fn step_hint(&self, r: f64) -> f64 {
        let deriv = self.profile.density_derivative(r);
        if deriv <= 0.0 {
            f64::INFINITY
        } else {
            0.01 * self.outer_radius / deriv
        }
    }
}

/// Result of a geometry step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepResult {
    /// Suggested step length to the next shell boundary, m. Zero only when
    /// the particle has exited (`shell_index == -1`) or a flux crossing
    /// fired.
    pub step: f64,
    /// Index of the shell the position currently resides in, or `-1` if
    /// the particle is beyond the terminal outer bound.
    pub shell_index: i32,
}

/// The full radially stratified Earth model.
///
/// Holds fifteen real shells plus an implicit terminal horizon at
/// `2 * shells.last().outer_radius`: charged leptons may propagate through
/// the outermost (vacuum) shell out to that horizon, reusing the last
/// shell's material and profile, before the `step_to_boundary` contract
/// finally returns `shell_index == -1`.
#[derive(Clone, Debug)]
pub struct ShellTable {
    shells: Vec<Shell>,
    /// Altitude beyond which neutrinos are forced to exit even though the
    /// terminal horizon has not been reached (\S4.A): `R_E + 100 km`.
    pub neutrino_exit_radius: f64,
    /// Absolute outer bound; beyond this, every particle exits.
    pub terminal_radius: f64,
}

/// Outer radii of the fifteen shells, km, in the order given by \S3.
pub const SHELL_OUTER_RADII_KM: [f64; 15] = [
    1221.5, 3480.0, 5701.0, 5771.0, 5971.0, 6151.0, 6346.6, 6356.0, 6368.0, 6371.0, 6375.0,
    6381.0, 6411.0, 6471.0, 42164.0,
];

impl ShellTable {
    /// Builds the standard PREM + U.S. Standard Atmosphere shell table.
    ///
    /// Shell 9 (0-based; the ocean layer, outer radius 6371 km) carries
    /// [`Material::Water`] by default; see [`ShellTable::disable_sea`] to
    /// alias it to shell 8's rock.
    #[must_use]
    pub fn standard() -> Self {
        let km = 1.0e3;
        let r = |i: usize| SHELL_OUTER_RADII_KM[i] * km;

        // published PREM polynomial coefficients, g/cm^3, x = r / R_E
        let shells = vec![
            Shell {
                outer_radius: r(0),
                profile: Profile::Polynomial([13.0885, 0.0, -8.8381, 0.0]),
                material: Material::Rock,
            },
            Shell {
                outer_radius: r(1),
                profile: Profile::Polynomial([12.5815, -1.2638, -3.6426, -5.5281]),
                material: Material::Rock,
            },
            Shell {
                outer_radius: r(2),
                profile: Profile::Polynomial([7.9565, -6.4761, 5.5283, -3.0807]),
                material: Material::Rock,
            },
            Shell {
                outer_radius: r(3),
                profile: Profile::Polynomial([5.3197, -1.4836, 0.0, 0.0]),
                material: Material::Rock,
            },
            Shell {
                outer_radius: r(4),
                profile: Profile::Polynomial([11.2494, -8.0298, 0.0, 0.0]),
                material: Material::Rock,
            },
            Shell {
                outer_radius: r(5),
                profile: Profile::Polynomial([7.1089, -3.8045, 0.0, 0.0]),
                material: Material::Rock,
            },
            Shell {
                outer_radius: r(6),
                profile: Profile::Polynomial([2.6910, 0.6924, 0.0, 0.0]),
                material: Material::Rock,
            },
            // lower crust, uniform
            Shell {
                outer_radius: r(7),
                profile: Profile::Uniform(2.9e3),
                material: Material::Rock,
            },
            // upper crust, uniform
            Shell {
                outer_radius: r(8),
                profile: Profile::Uniform(2.6e3),
                material: Material::Rock,
            },
            // ocean, uniform, overridable
            Shell {
                outer_radius: r(9),
                profile: Profile::Uniform(1.02e3),
                material: Material::Water,
            },
            // U.S. Standard Atmosphere, Linsley parametrisation, four
            // exponential segments
            Shell {
                outer_radius: r(10),
                profile: Profile::Exponential {
                    b: 1222.6 * 10.0,
                    c: 9941.8638,
                },
                material: Material::Air,
            },
            Shell {
                outer_radius: r(11),
                profile: Profile::Exponential {
                    b: 1144.9069 * 10.0,
                    c: 8781.5355,
                },
                material: Material::Air,
            },
            Shell {
                outer_radius: r(12),
                profile: Profile::Exponential {
                    b: 1305.5948 * 10.0,
                    c: 6361.4304,
                },
                material: Material::Air,
            },
            Shell {
                outer_radius: r(13),
                profile: Profile::Exponential {
                    b: 540.1778 * 10.0,
                    c: 7721.7016,
                },
                material: Material::Air,
            },
            // near-vacuum outer space, out to geostationary radius
            Shell {
                outer_radius: r(14),
                profile: Profile::Uniform(1.0e-12),
                material: Material::Vacuum,
            },
        ];

        let terminal_radius = 2.0 * r(14);
        let neutrino_exit_radius = EARTH_RADIUS + 100.0 * km;

        Self {
            shells,
            neutrino_exit_radius,
            terminal_radius,
        }
    }

    /// Replaces the ocean layer's material with shell 8's (upper crust
    /// rock), matching the `--pem-no-sea` CLI flag and \S4.H's one-shot
    /// mutator. Reversible: returns a fresh `ShellTable` rather than
    /// mutating a shared global table, so multiple contexts can coexist
    /// with and without the override.
    #[must_use]
    pub fn disable_sea(mut self) -> Self {
        let rock = self.shells[8].material;
        self.shells[9].material = rock;
        self
    }

    /// Number of real shells (always 15).
    #[must_use]
    pub fn len(&self) -> usize {
        self.shells.len()
    }

    /// Never empty: the table always has fifteen shells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns the shell at `index`, clamped to the last (vacuum) shell for
    /// any index beyond the real table -- used for the implicit terminal
    /// horizon.
    #[must_use]
    pub fn shell(&self, index: usize) -> &Shell {
        let last = self.shells.len() - 1;
        &self.shells[index.min(last)]
    }

    /// Finds the smallest shell index `i` with `r <= outer_radius(i)`, or
    /// `None` if `r` exceeds the last shell's outer radius (the particle is
    /// in the implicit terminal-horizon band or beyond it).
    fn locate(&self, r: f64) -> Option<usize> {
        self.shells.iter().position(|s| r <= s.outer_radius)
    }

    /// Density at radius `r`, kg/m^3, honouring the implicit terminal band.
    #[must_use]
    pub fn density(&self, r: f64) -> f64 {
        match self.locate(r) {
            Some(i) => self.shells[i].density(r),
            None => self.shells.last().unwrap().density(r),
        }
    }

    /// Material at radius `r`, honouring the implicit terminal band.
    #[must_use]
    pub fn material(&self, r: f64) -> Material {
        match self.locate(r) {
            Some(i) => self.shells[i].material,
            None => self.shells.last().unwrap().material,
        }
    }

    /// Step-size hint at radius `r`.
    #[must_use]
    pub fn step_hint(&self, r: f64) -> f64 {
        match self.locate(r) {
            Some(i) => self.shells[i].step_hint(r),
            None => self.shells.last().unwrap().step_hint(r),
        }
    }

    /// \S4.A's single geometry operation: given a position and direction,
    /// returns the suggested step length to the next shell boundary and
    /// the shell index the position currently occupies.
    ///
    /// `is_charged_lepton` selects the exit policy of \S4.A: neutrinos
    /// leaving the atmosphere (`r > R_E + 100 km`) exit immediately, while
    /// charged leptons are allowed to continue out to the geostationary
    /// radius (and, beyond it, to the terminal horizon).
    #[must_use]
    pub fn step_to_boundary(&self, p: Vec3, d: Vec3, is_charged_lepton: bool) -> StepResult {
        let r = p.norm();

        if r > self.terminal_radius {
            return StepResult {
                step: 0.0,
                shell_index: -1,
            };
        }
        if !is_charged_lepton && r > self.neutrino_exit_radius {
            return StepResult {
                step: 0.0,
                shell_index: -1,
            };
        }

        let i = self.locate(r).unwrap_or(self.shells.len() - 1);
        let r_outer = if i + 1 == self.shells.len() {
            // implicit terminal boundary for the vacuum shell
            self.terminal_radius.max(self.shells[i].outer_radius)
        } else {
            self.shells[i].outer_radius
        };

        let b = p.dot(d);
        let step_out = (b * b + r_outer * r_outer - r * r).max(0.0).sqrt() - b;

        let step = if i > 0 && b < 0.0 {
            let r_inner = self.shells[i - 1].outer_radius;
            let radicand = b * b + r_inner * r_inner - r * r;
            if radicand >= 0.0 {
                let step_in = -b - radicand.sqrt();
                step_out.min(step_in)
            } else {
                step_out
            }
        } else {
            step_out
        };

        StepResult {
            step: step.max(MIN_STEP),
            shell_index: i32::try_from(i).unwrap_or(i32::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn shell_count_is_fifteen() {
        assert_eq!(ShellTable::standard().len(), 15);
    }

    #[test]
    fn step_floor_is_enforced() {
        let table = ShellTable::standard();
        let p = Vec3::new(0.0, 0.0, EARTH_RADIUS - 1.0e-6);
        let d = Vec3::new(0.0, 0.0, 1.0);
        let result = table.step_to_boundary(p, d, false);
        assert!(result.shell_index >= 0);
        assert!(result.step >= MIN_STEP);
    }

    #[test]
    fn exit_beyond_terminal_radius_has_zero_step() {
        let table = ShellTable::standard();
        let p = Vec3::new(0.0, 0.0, table.terminal_radius * 2.0);
        let d = Vec3::new(0.0, 0.0, 1.0);
        let result = table.step_to_boundary(p, d, true);
        assert_eq!(result.shell_index, -1);
        assert_approx_eq!(f64, result.step, 0.0);
    }

    #[test]
    fn neutrino_exits_above_atmosphere() {
        let table = ShellTable::standard();
        let p = Vec3::new(0.0, 0.0, table.neutrino_exit_radius + 1.0);
        let d = Vec3::new(0.0, 0.0, 1.0);
        let result = table.step_to_boundary(p, d, false);
        assert_eq!(result.shell_index, -1);
    }

    #[test]
    fn charged_lepton_survives_above_atmosphere() {
        let table = ShellTable::standard();
        let p = Vec3::new(0.0, 0.0, table.neutrino_exit_radius + 1.0);
        let d = Vec3::new(0.0, 0.0, 1.0);
        let result = table.step_to_boundary(p, d, true);
        assert!(result.shell_index >= 0);
    }

    #[test]
    fn disable_sea_aliases_material() {
        let table = ShellTable::standard().disable_sea();
        assert_eq!(table.material(SHELL_OUTER_RADII_KM[9] * 1.0e3 - 1.0), Material::Rock);
    }

    #[test]
    fn density_is_nonnegative_across_all_shells() {
        let table = ShellTable::standard();
        let mut r = 1.0;
        while r < table.terminal_radius {
            assert!(table.density(r) >= 0.0, "negative density at r={r}");
            r *= 1.3;
        }
    }
}

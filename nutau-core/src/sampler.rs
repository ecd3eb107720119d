//! Primary-kinematics sampler (\S3, \S4.C).
//!
//! Holds the intervals for `cos(theta)` (forward mode), elevation
//! (backward mode), altitude, energy, and a per-particle-kind target
//! weight vector. Every field is mutable; [`Sampler::update`] validates the
//! whole configuration and stamps an integrity hash that
//! [`Sampler::ensure_fresh`] checks before every run, matching \S8's
//! "stored hash equals djb2 over the sampler struct; any subsequent
//! mutation is detected at `run` time".

use crate::constants::{SAMPLER_ENERGY_MAX_CEIL, SAMPLER_ENERGY_MIN};
use crate::error::{Error, Result};
use crate::random::RandomSource;
use std::collections::BTreeMap;

/// djb2 string/byte hash, seeded at 5381 (\S8).
fn djb2(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 5381;
    for &b in bytes {
        hash = hash.wrapping_mul(33).wrapping_add(u64::from(b));
    }
    hash
}

/// Primary-kinematics sampler.
#[derive(Clone, Debug)]
pub struct Sampler {
    /// `cos(theta)` range used in forward mode, `[lo, hi]`.
    pub cos_theta: [f64; 2],
    /// Elevation range in degrees used in backward mode, `[lo, hi]`.
    pub elevation_deg: [f64; 2],
    /// Altitude range, m.
    pub altitude: [f64; 2],
    /// Energy range, GeV.
    pub energy: [f64; 2],
    /// Target weight per primary PDG code.
    pub target_weights: BTreeMap<i32, f64>,

    neutrino_sum_weight: f64,
    total_weight: f64,
    stamped_hash: Option<u64>,
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler {
    /// A sampler with no configured ranges; `update` must be called, and
    /// will fail, before it is used.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cos_theta: [0.0, 0.0],
            elevation_deg: [0.0, 0.0],
            altitude: [0.0, 0.0],
            energy: [SAMPLER_ENERGY_MIN, SAMPLER_ENERGY_MIN],
            target_weights: BTreeMap::new(),
            neutrino_sum_weight: 0.0,
            total_weight: 0.0,
            stamped_hash: None,
        }
    }

    fn raw_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(64);
        for v in self.cos_theta {
            bytes.extend_from_slice(&v.to_bits().to_le_bytes());
        }
        for v in self.elevation_deg {
            bytes.extend_from_slice(&v.to_bits().to_le_bytes());
        }
        for v in self.altitude {
            bytes.extend_from_slice(&v.to_bits().to_le_bytes());
        }
        for v in self.energy {
            bytes.extend_from_slice(&v.to_bits().to_le_bytes());
        }
        for (pid, w) in &self.target_weights {
            bytes.extend_from_slice(&pid.to_le_bytes());
            bytes.extend_from_slice(&w.to_bits().to_le_bytes());
        }
        bytes
    }

    /// Validates every range, computes the derived neutrino-sum and total
    /// weights, and stamps the integrity hash. Nothing is mutated on
    /// failure except that the stamped hash is cleared, so a stale
    /// `Sampler` cannot be used accidentally after a failed `update`.
    pub fn update(&mut self) -> Result<()> {
        self.stamped_hash = None;

        let [ct_lo, ct_hi] = self.cos_theta;
        if !(0.0..=1.0).contains(&ct_lo) || !(ct_lo..=1.0).contains(&ct_hi) {
            return Err(Error::Configuration(format!(
                "cos(theta) range [{ct_lo}, {ct_hi}] is not within [0, 1] and increasing"
            )));
        }

        let [el_lo, el_hi] = self.elevation_deg;
        if !(-90.0..=90.0).contains(&el_lo) || !(el_lo..=90.0).contains(&el_hi) {
            return Err(Error::Configuration(format!(
                "elevation range [{el_lo}, {el_hi}] is not within [-90, 90] and increasing"
            )));
        }

        let [alt_lo, alt_hi] = self.altitude;
        if alt_lo < 0.0 || alt_hi < alt_lo {
            return Err(Error::Configuration(format!(
                "altitude range [{alt_lo}, {alt_hi}] is not non-negative and increasing"
            )));
        }

        let [e_lo, e_hi] = self.energy;
        if e_lo < SAMPLER_ENERGY_MIN || e_hi < e_lo || e_hi > SAMPLER_ENERGY_MAX_CEIL {
            return Err(Error::Configuration(format!(
                "energy range [{e_lo}, {e_hi}] GeV must satisfy {SAMPLER_ENERGY_MIN} <= lo <= hi <= {SAMPLER_ENERGY_MAX_CEIL}"
            )));
        }

        if self.target_weights.is_empty() {
            return Err(Error::Configuration(
                "no target weights configured".to_string(),
            ));
        }
        for &w in self.target_weights.values() {
            if w < 0.0 || !w.is_finite() {
                return Err(Error::Configuration(format!(
                    "target weight {w} is not a non-negative finite number"
                )));
            }
        }

        self.neutrino_sum_weight = self
            .target_weights
            .iter()
            .filter(|&(&pid, _)| crate::constants::is_neutrino(pid))
            .map(|(_, &w)| w)
            .sum();
        self.total_weight = self.target_weights.values().sum();

        self.stamped_hash = Some(djb2(&self.raw_bytes()));
        Ok(())
    }

    /// Sum of the target weights of neutrino primaries, valid only after
    /// [`Sampler::update`].
    #[must_use]
    pub fn neutrino_sum_weight(&self) -> f64 {
        self.neutrino_sum_weight
    }

    /// Sum of all target weights, valid only after [`Sampler::update`].
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Fails with [`Error::StaleSampler`] if the sampler was never
    /// validated, or was mutated after its last `update`.
    pub fn ensure_fresh(&self) -> Result<()> {
        match self.stamped_hash {
            Some(h) if h == djb2(&self.raw_bytes()) => Ok(()),
            _ => Err(Error::StaleSampler),
        }
    }

    /// `linear(x, grid)` draw (\S4.C): in grammage mode (`grid = Some((i,
    /// n))`), draws the `i`-th point of an evenly spaced `n`-point grid
    /// over `x`; otherwise draws uniformly. Returns `(value, weight
    /// multiplier)`, the multiplier always being `x[1] - x[0]`.
    #[must_use]
    pub fn linear(rng: &mut RandomSource, x: [f64; 2], grid: Option<(usize, usize)>) -> (f64, f64) {
        let u = match grid {
            Some((i, n)) if n > 1 => i as f64 / (n - 1) as f64,
            _ => rng.uniform(),
        };
        let value = x[0] + u * (x[1] - x[0]);
        (value, x[1] - x[0])
    }

    /// `log-or-linear(x)` draw (\S4.C): log-uniform when both endpoints
    /// share sign (weight `|ln(x1/x0)| * value`), otherwise linear (weight
    /// `x1 - x0`).
    #[must_use]
    pub fn log_or_linear(rng: &mut RandomSource, x: [f64; 2]) -> (f64, f64) {
        let same_sign = (x[0] > 0.0 && x[1] > 0.0) || (x[0] < 0.0 && x[1] < 0.0);
        if same_sign {
            let u = rng.uniform();
            let ratio = x[1] / x[0];
            let value = x[0] * ratio.powf(u);
            let weight = ratio.ln().abs() * value;
            (value, weight)
        } else {
            let u = rng.uniform();
            let value = x[0] + u * (x[1] - x[0]);
            (value, x[1] - x[0])
        }
    }
}

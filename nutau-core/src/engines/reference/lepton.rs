//! A reference charged-lepton transport engine.
//!
//! Combines continuous ionisation-like energy loss (`dE/dx = -(a + b*E) *
//! rho`, the standard muon/tau energy-loss shape) with an exponential decay
//! length derived from the tau's boosted proper lifetime. Multiple
//! scattering is not modelled: \S1 puts "charged-lepton multiple
//! scattering" under the same out-of-scope physics-engine umbrella as decay
//! and interaction sampling, and this reference only needs to produce a
//! plausible decay vertex, not a validated trajectory.

use crate::constants::{C_LIGHT, MIN_STEP, TAU_CTAU0, TAU_MASS};
use crate::engines::adapters::medium_callback;
use crate::engines::LeptonEngine;
use crate::error::Result;
use crate::geometry::ShellTable;
use crate::particle::ParticleState;
use crate::random::RandomSource;

/// Ionisation-loss coefficient, GeV / (kg/m^2). Shared with backward
/// transport (\S4.F), which inverts the same loss law to reconstruct energy
/// walking back along the track.
pub(crate) const IONISATION_A: f64 = 2.0e-4;
/// Radiative-loss coefficient, 1 / (kg/m^2). See [`IONISATION_A`].
pub(crate) const RADIATIVE_B: f64 = 2.0e-7;

/// Reference tau transport: continuous energy loss plus exponential decay.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReferenceLeptonEngine;

impl ReferenceLeptonEngine {
    /// Builds the reference engine; it has no configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn decay_length(energy: f64) -> f64 {
        let gamma = (energy + TAU_MASS) / TAU_MASS;
        gamma * TAU_CTAU0.max(MIN_STEP)
    }
}

impl LeptonEngine for ReferenceLeptonEngine {
    fn transport(&self, state: &mut ParticleState, medium: &ShellTable, rng: &mut RandomSource) -> Result<()> {
        for _ in 0..1_000_000 {
            if state.is_dead() {
                state.kill();
                return Ok(());
            }

            let step_result = medium_callback(medium, state, true);
            if step_result.shell_index < 0 {
                return Ok(());
            }
            state.density = medium.density(state.radius);
            let step_hint = medium.step_hint(state.radius);

            let u = rng.uniform().clamp(1.0e-300, 1.0);
            let decay_path = -Self::decay_length(state.energy) * u.ln() / C_LIGHT.max(1.0);

            let advance = step_result.step.min(step_hint).max(MIN_STEP).min(decay_path.max(MIN_STEP));
            state.advance(advance);

            let d_energy = (IONISATION_A + RADIATIVE_B * state.energy) * state.density * advance;
            state.energy = (state.energy - d_energy).max(0.0);

            if state.energy <= 0.0 {
                state.kill();
                return Ok(());
            }
            if advance >= decay_path {
                state.decayed = true;
                return Ok(());
            }
        }
        Err(crate::error::Error::Engine("lepton engine failed to converge on decay or exit".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PDG_TAU;
    use crate::geometry::ShellTable;
    use crate::particle::{Kind, Vec3};

    #[test]
    fn transport_terminates_in_decay_exit_or_death() {
        let engine = ReferenceLeptonEngine::new();
        let medium = ShellTable::standard();
        let mut rng = RandomSource::from_seed_u32(11);
        let mut tau = ParticleState::new(
            Kind::ChargedLepton,
            PDG_TAU,
            1.0e6,
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        );
        engine.transport(&mut tau, &medium, &mut rng).unwrap();
        assert!(tau.decayed || tau.medium_index < 0 || tau.is_dead());
    }
}

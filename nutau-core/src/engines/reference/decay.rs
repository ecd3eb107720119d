//! A reference tau-decay (and un-decay) engine.
//!
//! Samples among the three dominant decay topologies — the two leptonic
//! channels and a single lumped hadronic channel standing in for the
//! rho/pi/a1 modes — with their measured branching fractions, and performs
//! the "un-decay" backward sampling described in \S4.F / the glossary.
//! Full three-body phase space and polarisation-dependent angular
//! distributions are out of scope for a reference engine; daughters are
//! emitted collinear with the tau, which is an adequate approximation at
//! the energies this crate transports (tau boosts of `gamma >> 1`).

use crate::constants::{
    ELECTRON_MASS, MUON_MASS, PDG_ANTIMUON, PDG_ANTITAU, PDG_ELECTRON, PDG_MUON, PDG_NU_E_BAR,
    PDG_NU_MU_BAR, PDG_NU_TAU, PDG_NU_TAU_BAR, PDG_POSITRON, PDG_TAU, TAU_MASS,
};
use crate::engines::{DecayEngine, UndecayResult};
use crate::error::{Error, Result};
use crate::particle::{Kind, ParticleState, Vec3};
use crate::random::RandomSource;

const BR_ELECTRON: f64 = 0.1782;
const BR_MUON: f64 = 0.1739;
const PION_MASS: f64 = 0.1396;

/// Reference two/three-body tau decay engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReferenceDecayEngine;

impl ReferenceDecayEngine {
    /// Builds the reference engine; it has no configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Splits `total_energy` among `n` daughters with random weights drawn
    /// from a flat Dirichlet-like simplex sample, a standard way of faking
    /// multi-body phase space without solving it exactly.
    fn split_energy(rng: &mut RandomSource, total_energy: f64, n: usize) -> Vec<f64> {
        let mut cuts: Vec<f64> = (0..n - 1).map(|_| rng.uniform()).collect();
        cuts.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let mut edges = vec![0.0];
        edges.extend(cuts);
        edges.push(1.0);
        edges.windows(2).map(|w| (w[1] - w[0]) * total_energy).collect()
    }

    fn daughter(kind: Kind, pid: i32, energy: f64, mass: f64, tau: &ParticleState) -> ParticleState {
        let kinetic = if matches!(kind, Kind::ChargedLepton) { (energy - mass).max(0.0) } else { energy };
        let mut d = ParticleState::new(kind, pid, kinetic, tau.position, tau.direction);
        d.weight = tau.weight;
        d.medium_index = tau.medium_index;
        d
    }
}

impl DecayEngine for ReferenceDecayEngine {
    fn decay(&self, tau: &ParticleState, _polarisation: Vec3, rng: &mut RandomSource) -> Result<Vec<ParticleState>> {
        let lab_energy = tau.energy + TAU_MASS;
        if lab_energy <= TAU_MASS {
            return Err(Error::Engine("tau energy below rest mass at decay".to_string()));
        }

        let is_antitau = tau.pid == PDG_ANTITAU;
        let nu_tau_pid = if is_antitau { PDG_NU_TAU_BAR } else { PDG_NU_TAU };

        let u = rng.uniform();
        let daughters = if u < BR_ELECTRON {
            let fractions = Self::split_energy(rng, lab_energy, 3);
            let lepton_pid = if is_antitau { PDG_POSITRON } else { PDG_ELECTRON };
            vec![
                Self::daughter(Kind::Neutrino, nu_tau_pid, fractions[0], 0.0, tau),
                Self::daughter(Kind::Neutrino, PDG_NU_E_BAR, fractions[1], 0.0, tau),
                Self::daughter(Kind::ChargedLepton, lepton_pid, fractions[2], ELECTRON_MASS, tau),
            ]
        } else if u < BR_ELECTRON + BR_MUON {
            let fractions = Self::split_energy(rng, lab_energy, 3);
            let lepton_pid = if is_antitau { PDG_ANTIMUON } else { PDG_MUON };
            vec![
                Self::daughter(Kind::Neutrino, nu_tau_pid, fractions[0], 0.0, tau),
                Self::daughter(Kind::Neutrino, PDG_NU_MU_BAR, fractions[1], 0.0, tau),
                Self::daughter(Kind::ChargedLepton, lepton_pid, fractions[2], MUON_MASS, tau),
            ]
        } else {
            let fractions = Self::split_energy(rng, lab_energy, 2);
            let pion_pid = if is_antitau { -211 } else { 211 };
            vec![
                Self::daughter(Kind::Neutrino, nu_tau_pid, fractions[0], 0.0, tau),
                Self::daughter(Kind::ChargedLepton, pion_pid, fractions[1], PION_MASS, tau),
            ]
        };

        Ok(daughters)
    }

    fn undecay(&self, neutrino: &ParticleState, rng: &mut RandomSource) -> Result<UndecayResult> {
        if neutrino.pid != PDG_NU_TAU && neutrino.pid != PDG_NU_TAU_BAR {
            return Err(Error::Engine("un-decay requested for a non-tau-neutrino daughter".to_string()));
        }

        let inelasticity = 0.3 + 0.4 * rng.uniform();
        let tau_lab_energy = (neutrino.energy / inelasticity).max(TAU_MASS);
        let tau_pid = if neutrino.pid == PDG_NU_TAU_BAR { PDG_ANTITAU } else { PDG_TAU };

        let mut tau = ParticleState::new(
            Kind::ChargedLepton,
            tau_pid,
            (tau_lab_energy - TAU_MASS).max(0.0),
            neutrino.position,
            neutrino.direction,
        );
        tau.weight = neutrino.weight;
        tau.medium_index = neutrino.medium_index;

        Ok(UndecayResult { tau, weight: inelasticity })
    }
}

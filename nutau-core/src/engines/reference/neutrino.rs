//! A reference neutrino-interaction engine.
//!
//! Models a single effective charged-current-like vertex with an
//! energy-dependent mean free path: the per-nucleon cross section follows
//! the textbook ultra-high-energy power law `sigma ~ sigma_0 * E^eps`, the
//! overall rate is then scaled by the struck parton's momentum fraction, read
//! from the supplied `lhagrid1` PDF set via `pdf.xfx_q2(id, x, q2)`.

use crate::constants::{is_transportable_neutrino, AVOGADRO, PDG_ANTITAU, PDG_NU_TAU, PDG_NU_TAU_BAR, PDG_TAU, TAU_MASS};
use crate::engines::adapters::{ancestor_weight, medium_callback};
use crate::engines::{NeutrinoEngine, NeutrinoStep, NeutrinoVertex};
use crate::error::{Error, Result};
use crate::geometry::ShellTable;
use crate::material::MaterialTable;
use crate::particle::{Kind, ParticleState};
use crate::random::RandomSource;
use lhapdf::Pdf;

/// Reference charged-current-like neutrino interaction model.
pub struct ReferenceNeutrinoEngine {
    pdf: Pdf,
    materials: MaterialTable,
}

impl ReferenceNeutrinoEngine {
    /// Loads the named `lhagrid1` set, resolved through LHAPDF's own search
    /// path via `Pdf::with_setname_and_member`, and pairs it with the
    /// built-in material table.
    #[must_use]
    pub fn new(pdf_set_name: &str) -> Self {
        Self {
            pdf: Pdf::with_setname_and_member(pdf_set_name, 0),
            materials: MaterialTable::builtin(),
        }
    }

    /// Uses a custom material table instead of the built-in one (e.g. one
    /// loaded from an external description via [`MaterialTable::load_or_build`]).
    #[must_use]
    pub fn with_materials(mut self, materials: MaterialTable) -> Self {
        self.materials = materials;
        self
    }

    /// Per-nucleon charged-current-like cross section at `energy` GeV, cm^2.
    fn cross_section(&self, energy: f64) -> f64 {
        const SIGMA0: f64 = 7.84e-36;
        const EPSILON: f64 = 0.363;
        SIGMA0 * energy.powf(EPSILON)
    }

    /// Momentum-fraction correction read off the PDF at a representative
    /// `(x, Q^2)` point; purely a shape factor, not a validated structure
    /// function.
    fn pdf_correction(&self, energy: f64) -> f64 {
        const NUCLEON_MASS: f64 = 0.938;
        let q2 = (2.0 * NUCLEON_MASS * energy).max(1.0);
        let up = self.pdf.xfx_q2(2, 0.2, q2);
        let down = self.pdf.xfx_q2(1, 0.2, q2);
        (up + down).max(1.0e-6)
    }

    /// Mean free path `lambda_P = A / (sigma * N_A * rho) * 1e-3` (\S4.D),
    /// kg/m^2, given the effective atomic mass of the current material.
    fn mean_free_path(&self, state: &ParticleState, geometry: &ShellTable) -> f64 {
        let material = geometry.material(state.radius);
        let locals = self
            .materials
            .get(MaterialTable::name_of(material))
            .unwrap_or(crate::material::MaterialLocals { z: 7.0, a: 14.0, i: 80.0 });
        let sigma_cm2 = self.cross_section(state.energy) * self.pdf_correction(state.energy);
        let density_g_cm3 = (state.density * 1.0e-3).max(1.0e-30);
        locals.a / (sigma_cm2 * AVOGADRO * density_g_cm3) * 1.0e-3
    }
}

impl NeutrinoEngine for ReferenceNeutrinoEngine {
    fn step(
        &self,
        state: &mut ParticleState,
        medium: &ShellTable,
        rng: &mut RandomSource,
        forward: bool,
    ) -> Result<NeutrinoStep> {
        if !is_transportable_neutrino(state.pid) {
            return Ok(NeutrinoStep::Exit);
        }

        for _ in 0..10_000 {
            let step_result = medium_callback(medium, state, forward);
            if step_result.shell_index < 0 {
                return Ok(NeutrinoStep::Exit);
            }
            state.density = medium.density(state.radius);
            let step_hint = medium.step_hint(state.radius);

            let lambda = self.mean_free_path(state, medium);
            let u = rng.uniform().clamp(1.0e-300, 1.0);
            let free_path = -lambda * u.ln();

            let advance = step_result.step.min(step_hint).min(free_path);
            state.advance(advance.max(crate::constants::MIN_STEP));

            if free_path <= step_result.step.min(step_hint) {
                let tau_pid = if state.pid == PDG_NU_TAU_BAR { PDG_ANTITAU } else { PDG_TAU };
                const INELASTICITY: f64 = 0.2;
                let tau_kinetic = ((1.0 - INELASTICITY) * state.energy - TAU_MASS).max(0.0);
                let mut tau = ParticleState::new(Kind::ChargedLepton, tau_pid, tau_kinetic, state.position, state.direction);
                tau.weight = state.weight;
                tau.medium_index = state.medium_index;
                return Ok(NeutrinoStep::Produced(tau));
            }
        }

        Err(Error::Engine("neutrino engine failed to converge on an interaction or exit".to_string()))
    }

    fn sample_vertex(&self, tau: &ParticleState, medium: &ShellTable, rng: &mut RandomSource) -> Result<NeutrinoVertex> {
        let material = medium.material(tau.radius);
        let locals = self
            .materials
            .get(MaterialTable::name_of(material))
            .unwrap_or(crate::material::MaterialLocals { z: 7.0, a: 14.0, i: 80.0 });

        let parent_energy = tau.energy + TAU_MASS * (1.0 + rng.uniform());
        let nu_pid = if tau.pid == PDG_ANTITAU { PDG_NU_TAU_BAR } else { PDG_NU_TAU };

        let mut neutrino = ParticleState::new(Kind::Neutrino, nu_pid, parent_energy, tau.position, tau.direction);
        neutrino.weight = tau.weight;

        let sigma_cm2 = self.cross_section(parent_energy) * self.pdf_correction(parent_energy);
        let density_g_cm3 = (tau.density.max(1.0e-30)) * 1.0e-3;
        let mean_free_path = locals.a / (sigma_cm2 * AVOGADRO * density_g_cm3) * 1.0e-3;

        Ok(NeutrinoVertex { neutrino, mean_free_path })
    }

    fn ancestor_weight(&self, daughter_pid: i32, ancestor_pid: i32, energy: f64, density: f64) -> f64 {
        ancestor_weight(daughter_pid, ancestor_pid, energy, density)
    }
}

//! Context and process lifecycle (\S4.H, \S5).
//!
//! The three physics engines are process-wide and read-only during
//! transport; [`EngineSet::initialise`] builds them once, and
//! [`EngineSet::finalise`] idempotently tears them down (dropping the
//! `Arc`s). A [`Context`] owns everything a single run needs: the sampler,
//! the Earth model, the cuts/mode flags, and its own PRNG, so multiple
//! contexts can run concurrently without sharing mutable state (\S5).

use crate::constants::DEFAULT_BACKWARD_ENERGY_CUT;
use crate::engines::reference::{ReferenceDecayEngine, ReferenceLeptonEngine, ReferenceNeutrinoEngine};
use crate::engines::{DecayEngine, LeptonEngine, NeutrinoEngine};
use crate::error::{Error, Result};
use crate::geometry::ShellTable;
use crate::material::MaterialTable;
use crate::random::RandomSource;
use crate::sampler::Sampler;
use std::path::Path;
use std::sync::Arc;

/// The process-wide, read-only engine handles (\S4.H, \S5).
#[derive(Clone)]
pub struct EngineSet {
    neutrino: Option<Arc<dyn NeutrinoEngine>>,
    lepton: Option<Arc<dyn LeptonEngine>>,
    decay: Option<Arc<dyn DecayEngine>>,
}

impl EngineSet {
    /// Wraps already-constructed engines (used by tests and by callers
    /// supplying a non-reference engine implementation).
    #[must_use]
    pub fn new(
        neutrino: Arc<dyn NeutrinoEngine>,
        lepton: Arc<dyn LeptonEngine>,
        decay: Arc<dyn DecayEngine>,
    ) -> Self {
        Self { neutrino: Some(neutrino), lepton: Some(lepton), decay: Some(decay) }
    }

    /// `initialise(pdf)` (\S4.H): creates the neutrino-physics handle from
    /// a parton distribution file, loads or builds the cached material
    /// table for the lepton engine, and initialises the decay engine. Uses
    /// the reference engines of [`crate::engines::reference`].
    pub fn initialise(
        pdf_set_name: &str,
        material_cache: impl AsRef<Path>,
        material_description: impl AsRef<Path>,
    ) -> Result<Self> {
        let materials = MaterialTable::load_or_build(material_cache, material_description)?;
        let neutrino = ReferenceNeutrinoEngine::new(pdf_set_name).with_materials(materials);
        Ok(Self::new(Arc::new(neutrino), Arc::new(ReferenceLeptonEngine::new()), Arc::new(ReferenceDecayEngine::new())))
    }

    /// Idempotent teardown (\S4.H): safe to call more than once.
    pub fn finalise(&mut self) {
        self.neutrino = None;
        self.lepton = None;
        self.decay = None;
    }

    /// The neutrino engine handle, or `Error::Engine` if not (or no longer)
    /// initialised.
    pub fn neutrino(&self) -> Result<&Arc<dyn NeutrinoEngine>> {
        self.neutrino.as_ref().ok_or_else(|| Error::Engine("neutrino engine not initialised".to_string()))
    }

    /// The lepton engine handle, or `Error::Engine` if not (or no longer)
    /// initialised.
    pub fn lepton(&self) -> Result<&Arc<dyn LeptonEngine>> {
        self.lepton.as_ref().ok_or_else(|| Error::Engine("lepton engine not initialised".to_string()))
    }

    /// The decay engine handle, or `Error::Engine` if not (or no longer)
    /// initialised.
    pub fn decay(&self) -> Result<&Arc<dyn DecayEngine>> {
        self.decay.as_ref().ok_or_else(|| Error::Engine("decay engine not initialised".to_string()))
    }
}

/// Which backward-flux target a backward run was requested for (\S4.F:
/// "flux mode, neutrino flux" vs "flux mode, tau flux"). Only consulted in
/// backward transport's termination step when `decay_mode` is `false`;
/// forward transport and decay-mode backward runs ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FluxTarget {
    /// Emit `(primary neutrino, final-state neutrino)`.
    Neutrino,
    /// Emit `(primary neutrino, tau-at-production, final tau)`.
    Tau,
}

/// Transport mode flags (\S3's "mode flags {forward, longitudinal-only,
/// decay-vs-flux, grammage}").
#[derive(Debug, Clone, Copy)]
pub struct ModeFlags {
    /// `true` for forward Monte Carlo, `false` for backward.
    pub forward: bool,
    /// Suppress transverse kicks; direction stays frozen to the primary's.
    pub longitudinal_only: bool,
    /// `true` to emit tau-decay records, `false` for flux records (backward
    /// mode only; forward mode always runs in decay-record mode unless
    /// flux-crossing is armed on the sampler).
    pub decay_mode: bool,
    /// `true` for a grammage scan instead of physical transport.
    pub grammage: bool,
    /// Which flux target a backward, non-decay-mode run was requested for.
    /// Unused when `forward` or `decay_mode` is `true`.
    pub flux_target: FluxTarget,
}

/// Per-run state (\S3, \S4.H): cuts, mode flags, the sampler, the Earth
/// model, and an owned PRNG. Contexts do not share mutable state; each owns
/// everything transport needs except the process-wide [`EngineSet`].
pub struct Context {
    /// Process-wide engine handles (cheaply cloned; shared, read-only).
    pub engines: EngineSet,
    /// The stratified Earth + atmosphere model.
    pub geometry: ShellTable,
    /// The validated primary-kinematics sampler.
    pub sampler: Sampler,
    /// Low-energy cut, GeV: tracks below this terminate (\S4.E step 2).
    pub energy_cut: f64,
    /// High-energy cut used by backward transport, GeV (\S4.F, \S9's second
    /// open question, surfaced here as configuration).
    pub backward_energy_cut: f64,
    /// Mode flags.
    pub mode: ModeFlags,
    /// PDG code of the primary this run samples (one of -12, 16, -16);
    /// backward transport rejects any cascade whose reconstructed primary
    /// does not match (\S4.F: "must match the sampler's requested primary
    /// kind").
    pub requested_primary_pid: i32,
    /// This context's own PRNG.
    pub rng: RandomSource,
}

impl Context {
    /// Creates a context, failing if `sampler` has not been `update`d (or
    /// was mutated since) per \S3 ("the hash must equal the one stamped at
    /// the last update call; otherwise transport refuses to run").
    pub fn new(
        engines: EngineSet,
        geometry: ShellTable,
        sampler: Sampler,
        energy_cut: f64,
        mode: ModeFlags,
        requested_primary_pid: i32,
        rng: RandomSource,
    ) -> Result<Self> {
        sampler.ensure_fresh()?;
        Ok(Self {
            engines,
            geometry,
            sampler,
            energy_cut,
            backward_energy_cut: DEFAULT_BACKWARD_ENERGY_CUT,
            mode,
            requested_primary_pid,
            rng,
        })
    }
}

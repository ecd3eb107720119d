//! The three physics-engine contracts (\S1, \S4.D).
//!
//! Neutrino interactions, charged-lepton transport, and tau decay are
//! explicitly out of scope ("external collaborators whose contracts are
//! specified in \S6"); this module turns that contract into three traits so
//! the orchestrator in [`crate::transport`] can be written, compiled, and
//! tested without any concrete physics engine linked in. [`reference`] ships
//! one non-authoritative implementation of each, built from the formulas
//! `spec.md` itself gives, so the crate is runnable end to end out of the
//! box.

pub mod adapters;
pub mod reference;

use crate::error::Result;
use crate::geometry::ShellTable;
use crate::particle::{ParticleState, Vec3};
use crate::random::RandomSource;

/// Outcome of stepping the neutrino engine once (\S4.E steps 1, 4, 6).
///
/// \S4.E describes the underlying physics engine as sometimes placing a
/// freshly produced charged lepton in the same memory slot the neutrino
/// occupied, requiring the driver to "swap the two slots so that the tau is
/// in the product slot". \S9 explicitly licenses a different wire contract
/// for reimplementations ("the contract is the payload fields, not the
/// layout trick"); `Produced` below folds that slot bookkeeping into the
/// return value instead, which is equivalent for every caller in \S4.E and
/// \S4.F.
#[derive(Debug)]
pub enum NeutrinoStep {
    /// The track continues as a neutrino; no product was created.
    Continue,
    /// The track left the transport volume or fell below scope.
    Exit,
    /// A charged-current-like interaction produced this charged lepton; the
    /// neutrino track itself ends here.
    Produced(ParticleState),
}

/// A backward-sampled neutrino production vertex (\S4.F).
#[derive(Debug)]
pub struct NeutrinoVertex {
    /// The generated neutrino state, positioned at the vertex.
    pub neutrino: ParticleState,
    /// `lambda_P = A / (sigma * N_A * rho) * 1e-3`, the neutrino mean free
    /// path at the vertex, kg/m^2, needed by the backward weight
    /// recombination of \S4.F.
    pub mean_free_path: f64,
}

/// Neutrino interactions: DIS-like vertex sampling in both transport
/// directions, and the ancestor-sampling weight used by backward transport.
pub trait NeutrinoEngine: Send + Sync {
    /// Steps `state` to its next event. `forward` selects the transport
    /// direction; the medium callback (\S4.D) must flip sign accordingly.
    fn step(
        &self,
        state: &mut ParticleState,
        medium: &ShellTable,
        rng: &mut RandomSource,
        forward: bool,
    ) -> Result<NeutrinoStep>;

    /// Backward vertex sampler (\S4.F): given a tau-at-production state,
    /// generates the neutrino that would have produced it.
    fn sample_vertex(
        &self,
        tau: &ParticleState,
        medium: &ShellTable,
        rng: &mut RandomSource,
    ) -> Result<NeutrinoVertex>;

    /// Ancestor callback (\S4.D): the relative weight of generating
    /// `ancestor_pid` as the backward parent of `daughter_pid`, at the given
    /// energy (GeV) and local density (kg/m^3). For the identity and CP
    /// mirror cases the weight is 1.
    fn ancestor_weight(&self, daughter_pid: i32, ancestor_pid: i32, energy: f64, density: f64) -> f64;
}

/// Charged-lepton transport: continuous and stochastic energy loss, ending
/// in decay, exit, or death (weight reaching zero).
pub trait LeptonEngine: Send + Sync {
    /// Runs `state` to completion (\S4.E step 7b: "run the lepton engine to
    /// completion"): repeatedly advances the lepton through `medium` until
    /// it decays (`state.decayed = true`), exits (`state.medium_index ==
    /// -1`), or dies (`state.weight == 0`).
    fn transport(
        &self,
        state: &mut ParticleState,
        medium: &ShellTable,
        rng: &mut RandomSource,
    ) -> Result<()>;
}

/// Result of backward-sampling a tau parent from one of its decay products
/// (un-decay, \S4.F, \S\S GLOSSARY).
#[derive(Debug)]
pub struct UndecayResult {
    /// The reconstructed tau-at-decay state.
    pub tau: ParticleState,
    /// The un-decay weight correction `W_undecay`.
    pub weight: f64,
}

/// Tau decay and its backward inverse.
pub trait DecayEngine: Send + Sync {
    /// Forward-decays a tau at the given polarisation (\S4.D's polarisation
    /// callback supplies the third argument), producing daughter particles
    /// in the lab frame. May fail to model an occasional sampling fizzle;
    /// callers retry up to [`crate::constants::MAX_DECAY_RETRIES`] times
    /// (\S4.E step 7c, \S7, \S9).
    fn decay(
        &self,
        tau: &ParticleState,
        polarisation: Vec3,
        rng: &mut RandomSource,
    ) -> Result<Vec<ParticleState>>;

    /// Un-decay (\S4.F): given a neutrino daughter produced by a backward
    /// tau decay, samples a consistent tau parent.
    fn undecay(&self, neutrino: &ParticleState, rng: &mut RandomSource) -> Result<UndecayResult>;
}

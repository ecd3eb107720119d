//! Recursive forward transport (\S4.E).

use crate::constants::{
    is_transportable_neutrino, ATMOSPHERE_MIN_MEDIUM_INDEX, EPS, MAX_DECAY_RETRIES,
    MAX_GENERATION_DEPTH, PDG_ANTIMUON, PDG_MUON, PDG_NU_E_BAR, PDG_NU_MU, PDG_NU_MU_BAR,
    PDG_NU_TAU, PDG_NU_TAU_BAR,
};
use crate::context::Context;
use crate::engines::{adapters, NeutrinoStep};
use crate::error::Result;
use crate::particle::{CrossingState, FluxCrossing, ParticleState};
use crate::result::{PrimaryDumpedLatch, Record, ResultWriter};
use std::io::Write;

use super::detection_radius;

/// Runs the recursive forward-transport cascade entered at `neutrino`
/// (\S4.E). `ancestor` is the primary snapshot carried through every
/// generation for delayed logging; `latch` is shared across the whole
/// cascade so the ancestor + tau pair is emitted at most once per primary.
pub fn transport_forward<W: Write>(
    ctx: &mut Context,
    mut neutrino: ParticleState,
    generation: u32,
    ancestor: &ParticleState,
    latch: &mut PrimaryDumpedLatch,
    writer: &mut ResultWriter<W>,
) -> Result<()> {
    if !is_transportable_neutrino(neutrino.pid) {
        return Ok(());
    }
    // \S9: a hard recursion depth limit stands in for converting this into
    // an explicit work stack.
    if generation > MAX_GENERATION_DEPTH {
        return Ok(());
    }

    let detection_radius = detection_radius(ctx);

    loop {
        // 1. Step the neutrino engine to its next event.
        let outcome = ctx.engines.neutrino()?.step(&mut neutrino, &ctx.geometry, &mut ctx.rng, true)?;

        // 2. Energy cut.
        if neutrino.energy <= ctx.energy_cut + EPS {
            return Ok(());
        }

        // 3. Flux mode: the second crossing ends the track, the first
        // re-arms it (downward/upward round trips are counted correctly).
        if adapters::detect_crossing(&mut neutrino, detection_radius) {
            if neutrino.flux.cross_count >= 2 {
                writer.write(&Record::Flux { ancestor, particle: &neutrino })?;
                return Ok(());
            }
            neutrino.flux.rearm();
        }

        match outcome {
            // 4. Exit.
            NeutrinoStep::Exit => return Ok(()),
            // 8. Still transportable: loop; the engine never changes pid on
            // `Continue`, so this is always true in practice, but the
            // defensive re-check costs nothing.
            NeutrinoStep::Continue => {
                if is_transportable_neutrino(neutrino.pid) {
                    continue;
                }
                return Ok(());
            }
            NeutrinoStep::Produced(mut tau) => {
                // 5. Longitudinal-only mode freezes both directions to the
                // entry direction. 6. The "slot swap" of the original
                // engine contract is represented structurally by `tau`
                // already being the returned product (see
                // `NeutrinoStep::Produced`'s doc comment).
                if ctx.mode.longitudinal_only {
                    tau.direction = ancestor.direction;
                    neutrino.direction = ancestor.direction;
                }

                handle_tau_production(ctx, &neutrino, tau, generation, ancestor, latch, writer, detection_radius)?;
                return Ok(());
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_tau_production<W: Write>(
    ctx: &mut Context,
    parent_neutrino: &ParticleState,
    mut tau: ParticleState,
    generation: u32,
    ancestor: &ParticleState,
    latch: &mut PrimaryDumpedLatch,
    writer: &mut ResultWriter<W>,
    detection_radius: f64,
) -> Result<()> {
    // 7a. Snapshot the tau at the moment of production.
    let production = tau.clone();

    // 7b. Run the lepton engine to completion.
    ctx.engines.lepton()?.transport(&mut tau, &ctx.geometry, &mut ctx.rng)?;

    if tau.decayed {
        // 7c. Produce daughters via the decay engine, retrying on failure;
        // a run of `MAX_DECAY_RETRIES` failures silently yields nothing.
        let mut daughters = Vec::new();
        for _ in 0..MAX_DECAY_RETRIES {
            let polarisation = adapters::polarisation_callback(&tau);
            match ctx.engines.decay()?.decay(&tau, polarisation, &mut ctx.rng) {
                Ok(d) => {
                    daughters = d;
                    break;
                }
                Err(_) => continue,
            }
        }

        let mut candidates = Vec::new();
        let mut others = Vec::new();
        for daughter in daughters {
            match daughter.pid {
                PDG_NU_TAU | PDG_NU_TAU_BAR | PDG_NU_E_BAR => candidates.push(daughter),
                PDG_NU_MU | PDG_NU_MU_BAR | PDG_MUON | PDG_ANTIMUON => {} // dropped, \S4.E step 7c
                _ => others.push(daughter),
            }
        }

        if tau.medium_index >= ATMOSPHERE_MIN_MEDIUM_INDEX && !others.is_empty() {
            if latch.fire_once() {
                writer.write(&Record::Decay { ancestor, production: &production, decay: &tau, daughters: &others })?;
            } else {
                writer.write(&Record::Daughters { daughters: &others })?;
            }
        }

        // 7d. Recurse on each surviving neutrino daughter.
        for mut daughter in candidates {
            daughter.flux = if parent_neutrino.flux.state == CrossingState::Disabled {
                FluxCrossing::disabled()
            } else if daughter.radius <= detection_radius {
                FluxCrossing::armed_inside()
            } else {
                FluxCrossing::armed()
            };
            transport_forward(ctx, daughter, generation + 1, ancestor, latch, writer)?;
        }
    } else if adapters::detect_crossing(&mut tau, detection_radius) {
        // 7e. Did not decay but crossed the detection sphere (flux mode).
        writer.write(&Record::Flux { ancestor, particle: &tau })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{EngineSet, FluxTarget, ModeFlags};
    use crate::engines::reference::{ReferenceDecayEngine, ReferenceLeptonEngine};
    use crate::engines::{NeutrinoEngine, NeutrinoVertex};
    use crate::geometry::ShellTable;
    use crate::particle::{Kind, Vec3};
    use crate::random::RandomSource;
    use crate::sampler::Sampler;
    use std::sync::Arc;

    /// A neutrino engine that always interacts on the first step, so the
    /// cascade deterministically exercises tau production without needing
    /// an installed PDF set.
    struct AlwaysInteractNeutrino;
    impl NeutrinoEngine for AlwaysInteractNeutrino {
        fn step(
            &self,
            state: &mut ParticleState,
            _medium: &crate::geometry::ShellTable,
            _rng: &mut RandomSource,
            _forward: bool,
        ) -> Result<NeutrinoStep> {
            let tau = ParticleState::new(
                Kind::ChargedLepton,
                crate::constants::PDG_TAU,
                state.energy * 0.5,
                state.position,
                state.direction,
            );
            Ok(NeutrinoStep::Produced(tau))
        }
        fn sample_vertex(&self, tau: &ParticleState, _medium: &crate::geometry::ShellTable, _rng: &mut RandomSource) -> Result<NeutrinoVertex> {
            Ok(NeutrinoVertex { neutrino: tau.clone(), mean_free_path: 1.0 })
        }
        fn ancestor_weight(&self, _daughter_pid: i32, _ancestor_pid: i32, _energy: f64, _density: f64) -> f64 {
            1.0
        }
    }

    fn test_context() -> Context {
        let mut sampler = Sampler::new();
        sampler.cos_theta = [0.1, 0.2];
        sampler.altitude = [0.0, 0.0];
        sampler.energy = [1.0e7, 1.0e9];
        sampler.target_weights.insert(16, 1.0);
        sampler.update().unwrap();

        let engines = EngineSet::new(
            Arc::new(AlwaysInteractNeutrino),
            Arc::new(ReferenceLeptonEngine::new()),
            Arc::new(ReferenceDecayEngine::new()),
        );
        let mode = ModeFlags { forward: true, longitudinal_only: false, decay_mode: true, grammage: false, flux_target: FluxTarget::Neutrino };
        Context::new(engines, ShellTable::standard(), sampler, 1.0e2, mode, 16, RandomSource::from_seed_u32(21)).unwrap()
    }

    #[test]
    fn a_cascade_from_deep_underground_terminates_and_may_emit_records() {
        let mut ctx = test_context();
        let ancestor = ParticleState::new(
            Kind::Neutrino,
            PDG_NU_TAU,
            1.0e8,
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        );
        let ancestor_snapshot = ancestor.clone();
        let mut latch = PrimaryDumpedLatch::new();
        let mut buffer = Vec::new();
        let mut writer = ResultWriter::new(&mut buffer);
        let result = transport_forward(&mut ctx, ancestor, 1, &ancestor_snapshot, &mut latch, &mut writer);
        assert!(result.is_ok());
    }

    #[test]
    fn non_transportable_primary_returns_immediately() {
        let mut ctx = test_context();
        let primary = ParticleState::new(
            Kind::Neutrino,
            PDG_NU_MU,
            1.0e8,
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        );
        let mut latch = PrimaryDumpedLatch::new();
        let mut buffer = Vec::new();
        let mut writer = ResultWriter::new(&mut buffer);
        transport_forward(&mut ctx, primary.clone(), 1, &primary, &mut latch, &mut writer).unwrap();
        assert!(buffer.is_empty());
    }
}

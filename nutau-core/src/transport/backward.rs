//! Recursive backward transport (\S4.F).

use crate::constants::{
    is_neutrino, ATMOSPHERE_MIN_MEDIUM_INDEX, BACKWARD_GRAMMAGE_LAMBDA0, C_LIGHT, EPS,
    FORCED_DECAY_PROBABILITY, MAX_DECAY_RETRIES, MAX_GENERATION_DEPTH, MIN_STEP, PDG_NU_TAU,
    TAU_CTAU0, TAU_LIFETIME, TAU_MASS,
};
use crate::context::{Context, FluxTarget};
use crate::engines::reference::{IONISATION_A, RADIATIVE_B};
use crate::engines::{adapters, NeutrinoStep};
use crate::error::Result;
use crate::particle::ParticleState;
use crate::result::{PrimaryDumpedLatch, Record, ResultWriter};
use std::io::Write;

/// The state a backward-transport recursion is entered with (\S4.F).
#[derive(Debug)]
pub enum BackwardSeed {
    /// A tau at the moment of decay.
    Tau(ParticleState),
    /// A neutrino: either the sampler's backward primary, or one just
    /// generated by a backward vertex sample.
    Neutrino(ParticleState),
}

/// The two out-parameters threaded through the recursion (\S4.F).
#[derive(Debug, Default)]
pub struct BackwardTrace {
    /// Snapshotted once, at generation 1.
    pub final_state: Option<ParticleState>,
    /// Snapshotted at the last tau generated backward.
    pub tau_at_production: Option<ParticleState>,
}

/// Runs the recursive backward-transport cascade (\S4.F). Emits records
/// through `writer` on termination; `latch` scopes the ancestor + tau pair
/// to at most one emission per backward primary, exactly as in forward
/// transport.
pub fn transport_backward<W: Write>(
    ctx: &mut Context,
    current: BackwardSeed,
    generation: u32,
    trace: &mut BackwardTrace,
    latch: &mut PrimaryDumpedLatch,
    writer: &mut ResultWriter<W>,
) -> Result<()> {
    if generation == 1 {
        let snapshot = match &current {
            BackwardSeed::Tau(t) => t.clone(),
            BackwardSeed::Neutrino(n) => n.clone(),
        };
        trace.final_state = Some(snapshot);
    }
    if generation > MAX_GENERATION_DEPTH {
        return Ok(());
    }

    match current {
        BackwardSeed::Tau(tau) => backward_tau(ctx, tau, generation, trace, latch, writer),
        BackwardSeed::Neutrino(neutrino) => backward_neutrino(ctx, neutrino, generation, trace, latch, writer),
    }
}

/// `true` if continuing forward from `tau`'s current state would carry it
/// out of the Earth rather than back into it -- a cheap stand-in for a full
/// ray-to-surface intersection test.
fn ray_emerges_from_earth(tau: &ParticleState) -> bool {
    tau.position.dot(tau.direction) > 0.0
}

fn backward_tau<W: Write>(
    ctx: &mut Context,
    mut tau: ParticleState,
    generation: u32,
    trace: &mut BackwardTrace,
    latch: &mut PrimaryDumpedLatch,
    writer: &mut ResultWriter<W>,
) -> Result<()> {
    // w <- w * m_tau / (c * tau0 * |p|)
    let total_energy = tau.energy + TAU_MASS;
    let momentum = (total_energy * total_energy - TAU_MASS * TAU_MASS).max(0.0).sqrt().max(EPS);
    tau.weight *= TAU_MASS / (C_LIGHT * TAU_LIFETIME * momentum);

    // Sample a forward-grammage horizon and propagate the tau backward
    // until it is reached, the tau decays, exceeds the upper energy cut, or
    // loses all weight.
    let u = ctx.rng.uniform().clamp(1.0e-300, 1.0);
    let horizon = -BACKWARD_GRAMMAGE_LAMBDA0 * u.ln();
    let mut accumulated = 0.0;

    loop {
        if tau.is_dead() || tau.energy >= ctx.backward_energy_cut {
            break;
        }
        let step_result = adapters::medium_callback(&ctx.geometry, &mut tau, false);
        if step_result.shell_index < 0 {
            break;
        }
        let (_, step_hint) = adapters::locals_callback(&ctx.geometry, &mut tau);
        let density = tau.density.max(1.0e-30);
        let remaining = (horizon - accumulated).max(0.0);
        let grammage_step = if remaining > 0.0 { remaining / density } else { f64::INFINITY };
        let advance = step_result.step.min(step_hint).min(grammage_step).max(MIN_STEP);

        // Backward in time: energy increases as the track is walked back
        // towards its source, the same loss law run in reverse.
        let gained = (IONISATION_A + RADIATIVE_B * tau.energy) * density * advance;
        tau.advance(advance);
        tau.energy += gained;
        accumulated += density * advance;

        if accumulated >= horizon {
            break;
        }
    }

    let emerging = ray_emerges_from_earth(&tau);
    let in_air = tau.medium_index >= ATMOSPHERE_MIN_MEDIUM_INDEX && tau.density > 0.0;

    let produced_here = if !emerging && in_air {
        let lambda_b = horizon.max(EPS);
        let lambda_d = TAU_CTAU0.max(MIN_STEP) * (tau.energy + TAU_MASS) / TAU_MASS;
        let p_decay = lambda_b / (lambda_b + lambda_d);
        let p_continue = lambda_d / (lambda_b + lambda_d);

        if ctx.rng.uniform() < FORCED_DECAY_PROBABILITY {
            tau.weight *= p_decay / FORCED_DECAY_PROBABILITY;
            true
        } else {
            tau.weight *= p_continue / (1.0 - FORCED_DECAY_PROBABILITY);
            false
        }
    } else {
        true
    };

    if !produced_here {
        if tau.is_dead() {
            return Ok(());
        }
        return backward_tau(ctx, tau, generation, trace, latch, writer);
    }

    trace.tau_at_production = Some(tau.clone());

    // Generate the neutrino production vertex and recombine the weight.
    let lambda_b = horizon.max(EPS);
    let lambda_d = TAU_CTAU0.max(MIN_STEP) * (tau.energy + TAU_MASS) / TAU_MASS;
    let vertex = ctx.engines.neutrino()?.sample_vertex(&tau, &ctx.geometry, &mut ctx.rng)?;
    let lambda_p = vertex.mean_free_path.max(EPS);
    let p0 = (-(accumulated - horizon) / BACKWARD_GRAMMAGE_LAMBDA0).exp().max(EPS);

    let mut neutrino = vertex.neutrino;
    neutrino.weight = tau.weight * (lambda_b * lambda_d) / ((lambda_b + lambda_d) * lambda_p * p0);

    transport_backward(ctx, BackwardSeed::Neutrino(neutrino), generation, trace, latch, writer)
}

fn backward_neutrino<W: Write>(
    ctx: &mut Context,
    mut neutrino: ParticleState,
    generation: u32,
    trace: &mut BackwardTrace,
    latch: &mut PrimaryDumpedLatch,
    writer: &mut ResultWriter<W>,
) -> Result<()> {
    loop {
        if neutrino.energy >= ctx.backward_energy_cut {
            break;
        }

        let outcome = ctx.engines.neutrino()?.step(&mut neutrino, &ctx.geometry, &mut ctx.rng, false)?;
        match outcome {
            NeutrinoStep::Exit => break,
            NeutrinoStep::Continue => continue,
            NeutrinoStep::Produced(_) => {
                // The backward ancestor callback has already weighted which
                // kind of parent produced this daughter; un-decay converts
                // the current neutrino back into the tau that emitted it.
                let undecay = ctx.engines.decay()?.undecay(&neutrino, &mut ctx.rng)?;
                let total_energy = undecay.tau.energy + TAU_MASS;
                let p_tau = (total_energy * total_energy - TAU_MASS * TAU_MASS).max(0.0).sqrt().max(EPS);

                let mut tau = undecay.tau;
                tau.weight = neutrino.weight * (neutrino.energy / p_tau).powi(2) * undecay.weight;

                return transport_backward(ctx, BackwardSeed::Tau(tau), generation + 1, trace, latch, writer);
            }
        }
    }

    finish(ctx, neutrino, trace, latch, writer)
}

/// Termination (\S4.F): the backward-reconstructed primary must match the
/// sampler's requested kind, after which the emission depends on the run
/// mode.
fn finish<W: Write>(
    ctx: &mut Context,
    primary: ParticleState,
    trace: &mut BackwardTrace,
    latch: &mut PrimaryDumpedLatch,
    writer: &mut ResultWriter<W>,
) -> Result<()> {
    if primary.pid != ctx.requested_primary_pid {
        return Ok(());
    }
    if ctx.mode.grammage {
        // Grammage mode is handled by the driver, not here.
        return Ok(());
    }

    let Some(final_state) = trace.final_state.clone() else {
        return Ok(());
    };

    if !ctx.mode.decay_mode {
        // Flux mode: which shape to emit is a property of what was
        // *requested* (tau flux vs. neutrino flux), not of whether this
        // particular cascade happened to pass through a tau-decay vertex --
        // a neutrino-flux cascade can still detour through `backward_tau`
        // via un-decay, so `tau_at_production` being set is not itself
        // evidence of a tau-flux request.
        match ctx.mode.flux_target {
            FluxTarget::Tau => {
                let Some(tau_at_production) = trace.tau_at_production.clone() else {
                    return Ok(());
                };
                writer.write(&Record::Decay {
                    ancestor: &primary,
                    production: &tau_at_production,
                    decay: &final_state,
                    daughters: &[],
                })?;
            }
            FluxTarget::Neutrino => {
                writer.write(&Record::Flux { ancestor: &primary, particle: &final_state })?;
            }
        }
        return Ok(());
    }

    // Decay mode: forward-decay the final tau and emit its non-neutrino
    // daughters.
    let mut daughters = Vec::new();
    for _ in 0..MAX_DECAY_RETRIES {
        let polarisation = adapters::polarisation_callback(&final_state);
        match ctx.engines.decay()?.decay(&final_state, polarisation, &mut ctx.rng) {
            Ok(d) => {
                daughters = d;
                break;
            }
            Err(_) => continue,
        }
    }

    // "Non-neutrino daughter" means exactly that: drop every neutrino
    // flavour, not just the transportable subset, matching the sibling
    // filter in forward transport's own daughter classification.
    let others: Vec<ParticleState> = daughters.into_iter().filter(|d| !is_neutrino(d.pid)).collect();

    let production = trace.tau_at_production.clone().unwrap_or_else(|| final_state.clone());
    if latch.fire_once() {
        writer.write(&Record::Decay { ancestor: &primary, production: &production, decay: &final_state, daughters: &others })?;
    } else if !others.is_empty() {
        writer.write(&Record::Daughters { daughters: &others })?;
    }

    Ok(())
}

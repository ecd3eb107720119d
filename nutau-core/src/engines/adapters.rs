//! The four engine-adapter callbacks of \S4.D, as free functions over the
//! geometry and particle-state types rather than raw function pointers: the
//! design note in \S9 ("reimplementations may instead pass an adapter
//! object") licenses exactly this — no engine-visible pointer layout, no
//! user-data slot, the contract is the fields each callback reads and
//! writes.

use crate::constants::{PDG_ANTITAU, PDG_NU_TAU, PDG_NU_TAU_BAR, PDG_TAU};
use crate::geometry::{ShellTable, StepResult};
use crate::particle::{CrossingState, Kind, ParticleState, Vec3};

/// Medium callback (\S4.D): wraps [`ShellTable::step_to_boundary`],
/// flipping the probe direction when the engine runs backward, and writes
/// the resulting shell index back into `state`.
pub fn medium_callback(geometry: &ShellTable, state: &mut ParticleState, forward: bool) -> StepResult {
    let probe_direction = if forward { state.direction } else { -state.direction };
    let is_charged_lepton = matches!(state.kind, Kind::ChargedLepton);
    let result = geometry.step_to_boundary(state.position, probe_direction, is_charged_lepton);
    state.medium_index = result.shell_index;
    result
}

/// Locals / density callback (\S4.D): writes the local density into the
/// engine's scratch field, reports the Earth model's step-size hint, and
/// returns the (always zero) magnetic field, since \S1 declares magnetic
/// deflection explicitly out of scope.
pub fn locals_callback(geometry: &ShellTable, state: &mut ParticleState) -> (Vec3, f64) {
    state.density = geometry.density(state.radius);
    let step_hint = geometry.step_hint(state.radius);
    (Vec3::new(0.0, 0.0, 0.0), step_hint)
}

/// Ancestor callback (\S4.D): the per-(daughter, ancestor-kind) weight used
/// by backward neutrino transport to sample which kind of parent produced
/// `daughter_pid`. Identity and CP-mirror transitions carry weight 1; a
/// tau-to-tau-neutrino transition uses the empirical parameterisation
/// `1.63e-17 * E^1.363 * rho`; every other combination is forbidden.
#[must_use]
pub fn ancestor_weight(daughter_pid: i32, ancestor_pid: i32, energy: f64, density: f64) -> f64 {
    if daughter_pid == ancestor_pid {
        return 1.0;
    }
    let tau_to_nu_tau =
        (daughter_pid == PDG_NU_TAU && ancestor_pid == PDG_TAU) || (daughter_pid == PDG_NU_TAU_BAR && ancestor_pid == PDG_ANTITAU);
    if tau_to_nu_tau {
        1.63e-17 * energy.powf(1.363) * density
    } else {
        0.0
    }
}

/// Polarisation callback (\S4.D): longitudinal polarisation, collinear with
/// the tau's 3-momentum, i.e. its unit direction of travel.
#[must_use]
pub fn polarisation_callback(tau: &ParticleState) -> Vec3 {
    tau.direction
}

/// Flux-crossing detection (\S4.A's optional geometry behaviour, \S3's
/// flux-crossing triad): classifies `state` as inside or outside the
/// sampler's detection sphere and reports whether it just crossed it. Armed
/// tracks go `NotClassified -> {Inside, Outside}` on their first call (no
/// crossing reported: there is nothing to cross yet) and increment
/// `cross_count` / report a crossing on every inside/outside flip
/// thereafter.
pub fn detect_crossing(state: &mut ParticleState, detection_radius: f64) -> bool {
    if state.flux.state == CrossingState::Disabled {
        return false;
    }

    let now_inside = state.radius <= detection_radius;
    let new_state = if now_inside { CrossingState::Inside } else { CrossingState::Outside };

    let crossed = match state.flux.state {
        CrossingState::NotClassified => false,
        CrossingState::Inside => !now_inside,
        CrossingState::Outside => now_inside,
        CrossingState::Disabled => unreachable!("checked above"),
    };

    state.flux.state = new_state;
    if crossed {
        state.flux.has_crossed = true;
        state.flux.cross_count += 1;
    }
    crossed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PDG_NU_TAU;

    #[test]
    fn identity_ancestor_weight_is_one() {
        assert_eq!(ancestor_weight(PDG_NU_TAU, PDG_NU_TAU, 1.0e6, 1.0), 1.0);
    }

    #[test]
    fn tau_to_nu_tau_uses_parameterisation() {
        let w = ancestor_weight(PDG_NU_TAU, PDG_TAU, 1.0e6, 2.0);
        assert!(w > 0.0);
        assert!((w - 1.63e-17 * 1.0e6_f64.powf(1.363) * 2.0).abs() < 1.0e-20);
    }

    #[test]
    fn unrelated_pair_is_forbidden() {
        assert_eq!(ancestor_weight(12, PDG_TAU, 1.0e6, 1.0), 0.0);
    }

    #[test]
    fn polarisation_is_collinear_with_direction() {
        let tau = ParticleState::new(
            Kind::ChargedLepton,
            PDG_TAU,
            1.0e6,
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        let pol = polarisation_callback(&tau);
        assert_eq!(pol, tau.direction);
    }

    fn neutrino_at(radius: f64) -> ParticleState {
        let mut p = ParticleState::new(
            Kind::Neutrino,
            PDG_NU_TAU,
            1.0e6,
            Vec3::new(0.0, 0.0, radius),
            Vec3::new(0.0, 0.0, 1.0),
        );
        p.flux = crate::particle::FluxCrossing::armed();
        p
    }

    #[test]
    fn first_call_classifies_without_reporting_a_crossing() {
        let mut p = neutrino_at(100.0);
        assert!(!detect_crossing(&mut p, 200.0));
    }

    #[test]
    fn inside_to_outside_transition_is_a_crossing() {
        let mut p = neutrino_at(100.0);
        detect_crossing(&mut p, 200.0);
        p.position = Vec3::new(0.0, 0.0, 300.0);
        p.refresh_radius();
        assert!(detect_crossing(&mut p, 200.0));
        assert_eq!(p.flux.cross_count, 1);
    }

    #[test]
    fn disabled_detector_never_reports_a_crossing() {
        let mut p = neutrino_at(100.0);
        p.flux = crate::particle::FluxCrossing::disabled();
        p.position = Vec3::new(0.0, 0.0, 300.0);
        p.refresh_radius();
        assert!(!detect_crossing(&mut p, 200.0));
    }
}

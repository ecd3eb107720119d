//! The forward and backward transport orchestrators (\S4.E, \S4.F).
//!
//! Both recursions are written against the [`crate::engines`] traits and
//! the [`crate::engines::adapters`] callbacks only; neither module knows
//! about a concrete physics engine.

pub mod backward;
pub mod forward;

use crate::context::Context;

/// The detection-sphere radius used by flux-crossing detection: the Earth's
/// mean radius plus the sampler's first (lower) altitude threshold (\S4.A:
/// "crosses the sampler's first altitude threshold").
pub(crate) fn detection_radius(ctx: &Context) -> f64 {
    crate::constants::EARTH_RADIUS + ctx.sampler.altitude[0]
}

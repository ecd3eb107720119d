//! Physical constants and PDG particle codes used throughout the crate.

/// Speed of light, m/s.
pub const C_LIGHT: f64 = 2.997_924_58e8;

/// Tau mass, GeV/c^2.
pub const TAU_MASS: f64 = 1.776_86;

/// Tau mean proper lifetime, s.
pub const TAU_LIFETIME: f64 = 2.903e-13;

/// `c * tau0`, the tau's proper decay length, m.
pub const TAU_CTAU0: f64 = C_LIGHT * TAU_LIFETIME;

/// Electron mass, GeV/c^2.
pub const ELECTRON_MASS: f64 = 0.000_510_999;

/// Muon mass, GeV/c^2.
pub const MUON_MASS: f64 = 0.105_658;

/// Avogadro's number, mol^-1.
pub const AVOGADRO: f64 = 6.022_140_76e23;

/// PDG code: electron neutrino.
pub const PDG_NU_E: i32 = 12;
/// PDG code: electron antineutrino.
pub const PDG_NU_E_BAR: i32 = -12;
/// PDG code: muon neutrino.
pub const PDG_NU_MU: i32 = 14;
/// PDG code: muon antineutrino.
pub const PDG_NU_MU_BAR: i32 = -14;
/// PDG code: tau neutrino.
pub const PDG_NU_TAU: i32 = 16;
/// PDG code: tau antineutrino.
pub const PDG_NU_TAU_BAR: i32 = -16;
/// PDG code: electron.
pub const PDG_ELECTRON: i32 = 11;
/// PDG code: positron.
pub const PDG_POSITRON: i32 = -11;
/// PDG code: muon (negative).
pub const PDG_MUON: i32 = 13;
/// PDG code: antimuon.
pub const PDG_ANTIMUON: i32 = -13;
/// PDG code: tau (negative).
pub const PDG_TAU: i32 = 15;
/// PDG code: antitau.
pub const PDG_ANTITAU: i32 = -15;

/// Returns `true` for the primary flavours this engine can transport
/// forward: $\bar\nu_e$, $\nu_\tau$, $\bar\nu_\tau$.
#[must_use]
pub const fn is_transportable_neutrino(pid: i32) -> bool {
    matches!(pid, PDG_NU_E_BAR | PDG_NU_TAU | PDG_NU_TAU_BAR)
}

/// Returns `true` if `pid` is any flavour (or anti-flavour) of neutrino.
#[must_use]
pub const fn is_neutrino(pid: i32) -> bool {
    matches!(
        pid,
        PDG_NU_E | PDG_NU_E_BAR | PDG_NU_MU | PDG_NU_MU_BAR | PDG_NU_TAU | PDG_NU_TAU_BAR
    )
}

/// Returns `true` if `pid` is a tau or antitau.
#[must_use]
pub const fn is_tau(pid: i32) -> bool {
    matches!(pid, PDG_TAU | PDG_ANTITAU)
}

/// Lower energy bound accepted by the sampler, GeV.
pub const SAMPLER_ENERGY_MIN: f64 = 1.0e2;

/// Sampler energies may not exceed this ceiling, GeV.
pub const SAMPLER_ENERGY_MAX_CEIL: f64 = 1.0e12;

/// Default high-energy cut for backward transport, GeV. Surfaced as
/// configuration per the Open Question in `spec.md` \S9 rather than
/// hard-coded.
pub const DEFAULT_BACKWARD_ENERGY_CUT: f64 = 1.0e12;

/// Maximum number of consecutive decay-sampling failures tolerated before
/// an event silently yields no daughter products (\S4.E, \S9).
pub const MAX_DECAY_RETRIES: u32 = 20;

/// Forced-decay bias probability used in the backward tau transport when a
/// stopping vertex is reached in air without emerging from the Earth
/// (\S4.F).
pub const FORCED_DECAY_PROBABILITY: f64 = 0.1;

/// Mean grammage scale `lambda0` used to sample the backward propagation
/// horizon, kg/m^2 (\S4.F).
pub const BACKWARD_GRAMMAGE_LAMBDA0: f64 = 3.0e7;

/// Minimum geometric step, m (\S4.A).
pub const MIN_STEP: f64 = 1.0e-3;

/// Mean sea-level Earth radius, m.
pub const EARTH_RADIUS: f64 = 6_371_000.0;

/// Floating point tolerance used for direction-norm and weight invariants.
pub const EPS: f64 = 1.0e-9;

/// Shell index at and above which the medium is atmosphere (\S4.E step 7c,
/// \S9's first open question: "medium >= 10"). Matches 0-based index 10,
/// the first of the four exponential U.S. Standard Atmosphere shells built
/// by `ShellTable::standard`.
pub const ATMOSPHERE_MIN_MEDIUM_INDEX: i32 = 10;

/// Hard recursion depth limit for forward transport's neutrino-descendant
/// cascade (\S9: "implementations should still either impose a hard depth
/// limit or convert the recursion to an explicit work stack"). Chosen
/// generously above the number of generations the energy cut allows in
/// practice.
pub const MAX_GENERATION_DEPTH: u32 = 8;

//! `nutau`: drives forward Monte Carlo transport of a chosen primary
//! neutrino flavour through the stratified Earth and atmosphere model of
//! `nutau-core`, sampling its kinematics and writing classified records to
//! an output file.

use anyhow::{bail, Context as _, Result};
use clap::Parser;
use git_version::git_version;
use nutau_core::context::{EngineSet, FluxTarget, ModeFlags};
use nutau_core::engines::adapters;
use nutau_core::geometry::ShellTable;
use nutau_core::particle::{Kind, ParticleState, Vec3};
use nutau_core::random::RandomSource;
use nutau_core::result::{PrimaryDumpedLatch, Record, ResultWriter};
use nutau_core::sampler::Sampler;
use nutau_core::transport::forward::transport_forward;
use nutau_core::Context;
use std::fs::OpenOptions;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;

const VERSION: &str = git_version!(fallback = "unknown");

/// Allowed forward primaries: nu_tau-bar, nu_tau, nu_e-bar.
const ALLOWED_PRIMARIES: [i32; 3] = [-16, 16, -12];

/// Recursive forward Monte Carlo transport of ultra-high-energy neutrinos
/// through the Earth, producing tau decay or flux-crossing records.
#[derive(Parser)]
#[command(version = VERSION)]
struct Cli {
    /// PDG code of the primary neutrino: -12 (nu_e-bar), 16 (nu_tau), or
    /// -16 (nu_tau-bar).
    primary_pid: i32,

    /// Fixes cos(theta) to a single value instead of a range.
    #[arg(long, value_name = "COS_THETA")]
    cos_theta: Option<f64>,
    /// Lower bound of the cos(theta) sampling range.
    #[arg(long, default_value_t = 0.0, value_name = "LO")]
    cos_theta_min: f64,
    /// Upper bound of the cos(theta) sampling range.
    #[arg(long, default_value_t = 1.0, value_name = "HI")]
    cos_theta_max: f64,

    /// Fixes the primary energy to a single value instead of a range (GeV).
    #[arg(long, value_name = "ENERGY")]
    energy: Option<f64>,
    /// Lower bound of the primary energy sampling range, GeV.
    #[arg(long, default_value_t = 1.0e7, value_name = "LO")]
    energy_min: f64,
    /// Upper bound of the primary energy sampling range, GeV.
    #[arg(long, default_value_t = 1.0e9, value_name = "HI")]
    energy_max: f64,
    /// Low-energy cut below which a track is terminated, GeV.
    #[arg(long, default_value_t = 1.0e2, value_name = "CUT")]
    energy_cut: f64,
    /// Use an unweighted (analog) energy draw instead of the default
    /// log-or-linear importance sampling.
    #[arg(long)]
    energy_analog: bool,

    /// Replace the ocean layer with the upper crust's rock.
    #[arg(long)]
    pem_no_sea: bool,

    /// Number of primaries to simulate.
    #[arg(long, default_value_t = 10_000, value_name = "N")]
    taus: u64,

    /// Open the output file in append mode instead of truncating it.
    #[arg(long)]
    append: bool,

    /// Run a grammage scan instead of physical transport.
    #[arg(long)]
    grammage: bool,

    /// Output file path.
    #[arg(long, default_value = "nutau.out", value_name = "PATH")]
    output_file: PathBuf,

    /// LHAPDF set name (or `lhagrid1` path resolvable by LHAPDF) used by
    /// the neutrino engine. Required unless `--grammage` is given.
    #[arg(long, value_name = "PATH", required_unless_present = "grammage")]
    pdf_file: Option<String>,

    /// Material description XML. Defaults alongside the material cache.
    #[arg(long, default_value = "materials.xml", value_name = "PATH")]
    material_description: PathBuf,
    /// Material cache file, created on first run and reused thereafter.
    #[arg(long, default_value = "materials.b", value_name = "PATH")]
    material_cache: PathBuf,

    /// Seeds the PRNG explicitly instead of drawing from OS entropy
    /// (useful for reproducible runs).
    #[arg(long, value_name = "SEED")]
    seed: Option<u32>,
}

fn main() -> ExitCode {
    match run(&Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("nutau: error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    if !ALLOWED_PRIMARIES.contains(&cli.primary_pid) {
        bail!("primary PDG code must be one of -12, 16, -16, got {}", cli.primary_pid);
    }

    let mut sampler = Sampler::new();
    let (cos_lo, cos_hi) = match cli.cos_theta {
        Some(v) => (v, v),
        None => (cli.cos_theta_min, cli.cos_theta_max),
    };
    sampler.cos_theta = [cos_lo, cos_hi];
    let (e_lo, e_hi) = match cli.energy {
        Some(v) => (v, v),
        None => (cli.energy_min, cli.energy_max),
    };
    sampler.energy = [e_lo, e_hi];
    sampler.target_weights.insert(cli.primary_pid, 1.0);
    sampler.update().context("invalid sampler configuration")?;

    let geometry = if cli.pem_no_sea { ShellTable::standard().disable_sea() } else { ShellTable::standard() };

    let mut rng = match cli.seed {
        Some(seed) => RandomSource::from_seed_u32(seed),
        None => RandomSource::from_entropy().context("failed to read OS entropy for RNG seed")?,
    };

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(cli.append)
        .truncate(!cli.append)
        .open(&cli.output_file)
        .with_context(|| format!("failed to open output file {}", cli.output_file.display()))?;
    let mut writer = ResultWriter::new(BufWriter::new(file));
    if !cli.append {
        writer.write_header(cli.primary_pid, if cli.grammage { "grammage" } else { "forward" })?;
    }

    if cli.grammage {
        run_grammage(cli, &sampler, &geometry, &mut rng, &mut writer)?;
        return Ok(());
    }

    let material_description = &cli.material_description;
    let engines = EngineSet::initialise(
        cli.pdf_file.as_deref().expect("validated by clap required_unless_present"),
        &cli.material_cache,
        material_description,
    )
    .context("failed to initialise physics engines")?;

    let mode = ModeFlags { forward: true, longitudinal_only: false, decay_mode: true, grammage: false, flux_target: FluxTarget::Neutrino };
    let mut ctx = Context::new(engines, geometry, sampler, cli.energy_cut, mode, cli.primary_pid, rng)
        .context("failed to build transport context")?;

    for i in 0..cli.taus {
        let (cos_theta, _) = Sampler::linear(&mut ctx.rng, ctx.sampler.cos_theta, None);
        let (energy, _) = if cli.energy_analog {
            Sampler::linear(&mut ctx.rng, ctx.sampler.energy, None)
        } else {
            Sampler::log_or_linear(&mut ctx.rng, ctx.sampler.energy)
        };
        let primary = build_primary(cli.primary_pid, cos_theta, energy);
        let ancestor = primary.clone();
        let mut latch = PrimaryDumpedLatch::new();
        if let Err(err) = transport_forward(&mut ctx, primary, 1, &ancestor, &mut latch, &mut writer) {
            eprintln!("nutau: warning: event {i} aborted: {err}");
        }
    }

    ctx.engines.finalise();
    Ok(())
}

fn build_primary(pid: i32, cos_theta: f64, energy: f64) -> ParticleState {
    use nutau_core::constants::EARTH_RADIUS;
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let r_top = EARTH_RADIUS + 1.0e5; // 100 km, the top of the atmosphere
    let position = Vec3::new(0.0, 0.0, r_top);
    let direction = Vec3::new(sin_theta, 0.0, -cos_theta);
    ParticleState::new(Kind::Neutrino, pid, energy, position, direction)
}

fn run_grammage(
    cli: &Cli,
    sampler: &Sampler,
    geometry: &ShellTable,
    rng: &mut RandomSource,
    writer: &mut ResultWriter<BufWriter<std::fs::File>>,
) -> Result<()> {
    let n = cli.taus.max(1) as usize;
    for i in 0..n {
        let (cos_theta, _) = Sampler::linear(rng, sampler.cos_theta, Some((i, n)));
        let mut state = build_primary(cli.primary_pid, cos_theta, sampler.energy[0]);
        for _ in 0..1_000_000 {
            let step_result = adapters::medium_callback(geometry, &mut state, true);
            if step_result.shell_index < 0 {
                break;
            }
            let (_, step_hint) = adapters::locals_callback(geometry, &mut state);
            let advance = step_result.step.min(step_hint);
            state.advance(advance);
        }
        writer.write(&Record::Grammage { angle: cos_theta, grammage: state.grammage })?;
    }
    Ok(())
}

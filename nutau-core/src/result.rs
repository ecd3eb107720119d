//! Result classification and the whitespace-aligned text writer (\S4.G, \S6).
//!
//! \S4.G defines three record shapes that must each be emitted atomically:
//! a decay record (ancestor, tau production/decay pair, daughter lines), a
//! flux record (ancestor, one particle line), and a grammage record (one
//! `(angle, grammage)` line per primary). \S6 leaves the exact column
//! layout open ("whitespace-aligned text... Header lines introduce the
//! run"); this module fixes one, using plain non-tabular `writeln!` output.

use crate::error::Result;
use crate::particle::ParticleState;
use std::io::Write;

/// A classified outcome ready for emission (\S4.G).
#[derive(Debug)]
pub enum Record<'a> {
    /// Ancestor line, tau-production line, tau-decay line, then zero or
    /// more daughter lines.
    Decay {
        /// The primary neutrino that ultimately produced this tau.
        ancestor: &'a ParticleState,
        /// The tau at the moment it was produced.
        production: &'a ParticleState,
        /// The tau at the moment it decayed (or its last state, if it did
        /// not decay but crossed the detection sphere in flux mode).
        decay: &'a ParticleState,
        /// Non-neutrino daughters emitted alongside the decay.
        daughters: &'a [ParticleState],
    },
    /// Ancestor line, then one neutrino-or-tau line.
    Flux {
        /// The primary neutrino.
        ancestor: &'a ParticleState,
        /// The particle observed at the detection sphere.
        particle: &'a ParticleState,
    },
    /// Zero or more daughter lines only, with no accompanying ancestor or
    /// tau pair (used once the per-primary ancestor + tau pair has already
    /// been emitted via a [`Record::Decay`], \S4.E step 7c).
    Daughters {
        /// Non-neutrino daughters emitted alongside a decay already logged.
        daughters: &'a [ParticleState],
    },
    /// One `(angle, grammage)` line.
    Grammage {
        /// `cos(theta)` in forward mode, elevation in degrees in backward
        /// mode.
        angle: f64,
        /// Accumulated grammage along the sampled primary trajectory,
        /// kg/m^2.
        grammage: f64,
    },
}

/// Whitespace-aligned text writer for `nutau` output (\S6).
pub struct ResultWriter<W: Write> {
    sink: W,
}

impl<W: Write> ResultWriter<W> {
    /// Wraps an output sink. Does not itself write a header; call
    /// [`ResultWriter::write_header`] for a fresh (non-appended) file.
    pub const fn new(sink: W) -> Self {
        Self { sink }
    }

    /// Writes the run header line (\S6: "Header lines introduce the run").
    pub fn write_header(&mut self, primary_pid: i32, mode: &str) -> Result<()> {
        writeln!(self.sink, "# nutau  primary={primary_pid:>3}  mode={mode}")?;
        Ok(())
    }

    fn write_particle_line(&mut self, tag: &str, p: &ParticleState) -> Result<()> {
        writeln!(
            self.sink,
            "{tag:<10} {pid:>6} {energy:>14.6E} {x:>14.6E} {y:>14.6E} {z:>14.6E} {weight:>12.6E}",
            tag = tag,
            pid = p.pid,
            energy = p.energy,
            x = p.position.x,
            y = p.position.y,
            z = p.position.z,
            weight = p.weight,
        )?;
        Ok(())
    }

    /// Emits one record atomically (\S4.G, \S8: "at most one ancestor line
    /// precedes all records for that primary" is enforced by the caller via
    /// `primary_dumped`, not by this writer).
    pub fn write(&mut self, record: &Record<'_>) -> Result<()> {
        match record {
            Record::Decay { ancestor, production, decay, daughters } => {
                self.write_particle_line("ancestor", ancestor)?;
                self.write_particle_line("tau-prod", production)?;
                self.write_particle_line("tau-decay", decay)?;
                for daughter in daughters.iter() {
                    self.write_particle_line("daughter", daughter)?;
                }
            }
            Record::Flux { ancestor, particle } => {
                self.write_particle_line("ancestor", ancestor)?;
                self.write_particle_line("flux", particle)?;
            }
            Record::Daughters { daughters } => {
                for daughter in daughters.iter() {
                    self.write_particle_line("daughter", daughter)?;
                }
            }
            Record::Grammage { angle, grammage } => {
                writeln!(self.sink, "{angle:<10.5E} {grammage:>16.6E}")?;
            }
        }
        self.sink.flush()?;
        Ok(())
    }
}

/// Per-primary latch ensuring the ancestor line precedes at most once per
/// primary event (\S4.E, \S4.G, \S8).
#[derive(Debug, Default, Clone, Copy)]
pub struct PrimaryDumpedLatch(bool);

impl PrimaryDumpedLatch {
    /// A fresh, un-fired latch, to be created once per primary event.
    #[must_use]
    pub const fn new() -> Self {
        Self(false)
    }

    /// `true` the first time it's called for this latch, `false` on every
    /// subsequent call.
    pub fn fire_once(&mut self) -> bool {
        let first = !self.0;
        self.0 = true;
        first
    }

    /// `true` if the latch has already fired.
    #[must_use]
    pub const fn has_fired(self) -> bool {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{PDG_NU_TAU, PDG_TAU};
    use crate::particle::{Kind, Vec3};

    fn particle(pid: i32) -> ParticleState {
        ParticleState::new(Kind::Neutrino, pid, 1.0e6, Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0))
    }

    #[test]
    fn latch_fires_exactly_once() {
        let mut latch = PrimaryDumpedLatch::new();
        assert!(latch.fire_once());
        assert!(!latch.fire_once());
        assert!(latch.has_fired());
    }

    #[test]
    fn decay_record_writes_all_lines() {
        let mut buffer = Vec::new();
        {
            let mut writer = ResultWriter::new(&mut buffer);
            let ancestor = particle(PDG_NU_TAU);
            let production = particle(PDG_TAU);
            let decay = particle(PDG_TAU);
            let daughters = vec![particle(211)];
            writer
                .write(&Record::Decay { ancestor: &ancestor, production: &production, decay: &decay, daughters: &daughters })
                .unwrap();
        }
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.lines().count(), 4);
        assert!(text.contains("ancestor"));
        assert!(text.contains("daughter"));
    }

    #[test]
    fn grammage_record_is_one_line() {
        let mut buffer = Vec::new();
        {
            let mut writer = ResultWriter::new(&mut buffer);
            writer.write(&Record::Grammage { angle: 1.0, grammage: 123.456 }).unwrap();
        }
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}

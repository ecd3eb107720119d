//! Material description and caching (\S3, \S6, \S4.H).
//!
//! The lepton engine needs, for every shell material, an effective
//! `(Z, A, I)` triple computed from an external XML description of
//! elements and mass-fraction compounds. \S6 specifies the XML shape and
//! a binary cache (`materials.b`) the first `initialise` call produces and
//! later calls reload; this module implements both, grounded in the
//! teacher's own use of `serde` + `bincode` for its binary grid format and
//! `quick-xml` (seen in the pack's `UnifiedLAB`) for the XML side.

use crate::error::{Error, Result};
use crate::geometry::Material;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// A single chemical element entry in the material description XML.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename = "element")]
pub struct ElementDescription {
    /// Element name, used as the key components reference.
    #[serde(rename = "@name")]
    pub name: String,
    /// Atomic number.
    #[serde(rename = "@Z")]
    pub z: f64,
    /// Atomic mass, g/mol.
    #[serde(rename = "@A")]
    pub a: f64,
    /// Mean excitation energy, eV.
    #[serde(rename = "@I")]
    pub i: f64,
}

/// One element's mass fraction within a compound.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename = "component")]
pub struct ComponentDescription {
    /// Name of the referenced element.
    #[serde(rename = "@name")]
    pub name: String,
    /// Mass fraction, in `[0, 1]`.
    #[serde(rename = "@fraction")]
    pub fraction: f64,
}

/// A compound made of element mass fractions.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename = "compound")]
pub struct CompoundDescription {
    /// Compound name, e.g. `"Rock"`, `"Air"`.
    #[serde(rename = "@name")]
    pub name: String,
    /// Mass-fraction components.
    #[serde(rename = "component", default)]
    pub components: Vec<ComponentDescription>,
}

/// The full parsed material description XML (\S6).
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename = "materials")]
pub struct MaterialDescription {
    /// Declared elements.
    #[serde(rename = "element", default)]
    pub elements: Vec<ElementDescription>,
    /// Declared compounds.
    #[serde(rename = "compound", default)]
    pub compounds: Vec<CompoundDescription>,
}

impl MaterialDescription {
    /// Parses a material description from an XML reader.
    pub fn from_reader<R: std::io::BufRead>(reader: R) -> Result<Self> {
        quick_xml::de::from_reader(reader)
            .map_err(|e| Error::Other(anyhow::anyhow!("malformed material description: {e}")))
    }

    /// Parses a material description from a file path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

/// Effective properties the lepton engine needs for a material: a
/// mass-fraction-weighted mean atomic number, atomic mass, and mean
/// excitation energy.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
pub struct MaterialLocals {
    /// Effective atomic number.
    pub z: f64,
    /// Effective atomic mass, g/mol.
    pub a: f64,
    /// Mean excitation energy, eV.
    pub i: f64,
}

/// The resolved material table: one [`MaterialLocals`] per compound name,
/// ready for the lepton engine's locals callback (\S4.D). This is exactly
/// what `materials.b` caches.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct MaterialTable {
    compounds: HashMap<String, MaterialLocals>,
}

impl MaterialTable {
    /// Resolves every compound in `description` to its effective
    /// `(Z, A, I)`, failing if a component references an undeclared
    /// element.
    pub fn build(description: &MaterialDescription) -> Result<Self> {
        let elements: HashMap<&str, &ElementDescription> = description
            .elements
            .iter()
            .map(|e| (e.name.as_str(), e))
            .collect();

        let mut compounds = HashMap::new();
        for compound in &description.compounds {
            let mut z = 0.0;
            let mut a = 0.0;
            let mut i = 0.0;
            let mut fraction_sum = 0.0;
            for component in &compound.components {
                let element = elements.get(component.name.as_str()).ok_or_else(|| {
                    Error::Configuration(format!(
                        "compound '{}' references undeclared element '{}'",
                        compound.name, component.name
                    ))
                })?;
                z += component.fraction * element.z;
                a += component.fraction * element.a;
                i += component.fraction * element.i;
                fraction_sum += component.fraction;
            }
            if (fraction_sum - 1.0).abs() > 1.0e-3 {
                return Err(Error::Configuration(format!(
                    "compound '{}' mass fractions sum to {fraction_sum}, not 1",
                    compound.name
                )));
            }
            compounds.insert(compound.name.clone(), MaterialLocals { z, a, i });
        }

        Ok(Self { compounds })
    }

    /// Looks up the effective properties of a named compound.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<MaterialLocals> {
        self.compounds.get(name).copied()
    }

    /// Built-in fallback table used when no material description is
    /// supplied, with approximate literature values for rock (SiO2-like),
    /// water, and air. Vacuum is intentionally absent: the lepton engine
    /// never takes a step in it.
    #[must_use]
    pub fn builtin() -> Self {
        let mut compounds = HashMap::new();
        compounds.insert(
            "Rock".to_string(),
            MaterialLocals {
                z: 11.0,
                a: 22.0,
                i: 136.4,
            },
        );
        compounds.insert(
            "Water".to_string(),
            MaterialLocals {
                z: 7.22,
                a: 14.3,
                i: 78.0,
            },
        );
        compounds.insert(
            "Air".to_string(),
            MaterialLocals {
                z: 7.3,
                a: 14.4,
                i: 85.7,
            },
        );
        Self { compounds }
    }

    /// Reloads a previously dumped binary cache.
    pub fn load_cache(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        bincode::deserialize_from(BufReader::new(file))
            .map_err(|e| Error::Other(anyhow::anyhow!("corrupt material cache: {e}")))
    }

    /// Dumps the table as a binary cache (`materials.b`).
    pub fn dump_cache(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        bincode::serialize_into(BufWriter::new(file), self)
            .map_err(|e| Error::Other(anyhow::anyhow!("failed to write material cache: {e}")))
    }

    /// Loads the table from `materials.b` if present, otherwise parses
    /// `description_path`, builds the table, and writes the cache, per
    /// \S4.H ("loads or builds a cached material description").
    pub fn load_or_build(cache_path: impl AsRef<Path>, description_path: impl AsRef<Path>) -> Result<Self> {
        let cache_path = cache_path.as_ref();
        if cache_path.exists() {
            return Self::load_cache(cache_path);
        }
        let description = MaterialDescription::from_path(description_path)?;
        let table = Self::build(&description)?;
        table.dump_cache(cache_path)?;
        Ok(table)
    }

    /// Name used to look a [`Material`] up in this table.
    #[must_use]
    pub fn name_of(material: Material) -> &'static str {
        match material {
            Material::Rock => "Rock",
            Material::Water => "Water",
            Material::Air => "Air",
            Material::Vacuum => "Vacuum",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_XML: &str = r#"<materials>
        <element name="Oxygen" Z="8" A="16.0" I="95.0"/>
        <element name="Silicon" Z="14" A="28.09" I="173.0"/>
        <compound name="Rock">
            <component name="Oxygen" fraction="0.6"/>
            <component name="Silicon" fraction="0.4"/>
        </compound>
    </materials>"#;

    #[test]
    fn parses_and_builds_from_xml() {
        let description = MaterialDescription::from_reader(SAMPLE_XML.as_bytes()).unwrap();
        let table = MaterialTable::build(&description).unwrap();
        let rock = table.get("Rock").unwrap();
        assert!((rock.z - (0.6 * 8.0 + 0.4 * 14.0)).abs() < 1.0e-9);
    }

    #[test]
    fn rejects_undeclared_element() {
        let bad = r#"<materials>
            <compound name="Rock">
                <component name="Ghost" fraction="1.0"/>
            </compound>
        </materials>"#;
        let description = MaterialDescription::from_reader(bad.as_bytes()).unwrap();
        assert!(MaterialTable::build(&description).is_err());
    }

    #[test]
    fn cache_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("materials.b");
        let table = MaterialTable::builtin();
        table.dump_cache(&cache_path).unwrap();
        let reloaded = MaterialTable::load_cache(&cache_path).unwrap();
        assert_eq!(reloaded.get("Rock").unwrap().z, table.get("Rock").unwrap().z);
    }

    #[test]
    fn load_or_build_reuses_existing_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("materials.b");
        let xml_path = dir.path().join("materials.xml");
        std::fs::write(&xml_path, SAMPLE_XML).unwrap();

        let first = MaterialTable::load_or_build(&cache_path, &xml_path).unwrap();
        assert!(cache_path.exists());
        // remove the XML to prove the second call reuses the cache, not the XML
        std::fs::remove_file(&xml_path).unwrap();
        let second = MaterialTable::load_or_build(&cache_path, &xml_path).unwrap();
        assert_eq!(first.get("Rock").unwrap().z, second.get("Rock").unwrap().z);
    }
}

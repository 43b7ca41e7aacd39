use std::collections::{BTreeMap, HashSet};

use crate::error::RegistryError;
use crate::feature::{Feature, FeatureCollection, FeatureId, Provenance};

/// Canonical store of the active features.
///
/// The canonical collection holds the primary features that transforms
/// operate on. Operand collections (erase mask, clip mask) live beside it,
/// one per operand role. Identities are unique across the combined view.
#[derive(Debug, Default)]
pub struct FeatureRegistry {
    features: Vec<Feature>,
    operands: BTreeMap<Provenance, Vec<Feature>>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Immutable copy of the canonical collection.
    pub fn snapshot(&self) -> FeatureCollection {
        FeatureCollection::new(self.features.clone())
    }

    /// Copy of the operand collection stored for `role`.
    pub fn operand(&self, role: Provenance) -> FeatureCollection {
        FeatureCollection::new(self.operands.get(&role).cloned().unwrap_or_default())
    }

    pub fn operand_len(&self, role: Provenance) -> usize {
        self.operands.get(&role).map_or(0, Vec::len)
    }

    /// Canonical features followed by every operand collection. This is what
    /// the drawing UI and the rendering source display.
    pub fn combined(&self) -> FeatureCollection {
        let features = self
            .features
            .iter()
            .chain(self.operands.values().flatten())
            .cloned()
            .collect();
        FeatureCollection::new(features)
    }

    /// Atomically swaps the canonical collection. Operand collections are
    /// dropped: a replacement is a fresh generation of the drawing.
    ///
    /// Features without an identity are given one above the current maximum.
    pub fn replace_all(&mut self, features: impl Into<FeatureCollection>) -> Result<(), RegistryError> {
        let mut features = features.into().features;
        validate_geometries(&features)?;
        let last = max_numeric_id(&features);
        assign_missing_ids(&mut features, last);
        ensure_unique_ids(&features)?;

        log::debug!("Registry replaced with {} features", features.len());
        self.features = features;
        self.operands.clear();
        Ok(())
    }

    /// Renumbers `imported` starting at one above the highest identity in the
    /// combined view, stamps `provenance` on each, and merges them in.
    ///
    /// Primary imports are appended to the canonical collection; operand
    /// imports replace the operand collection for that role. Returns the
    /// renumbered features.
    pub fn merge_imported(
        &mut self,
        imported: impl Into<FeatureCollection>,
        provenance: Provenance,
    ) -> Result<Vec<Feature>, RegistryError> {
        let mut imported = imported.into().features;
        validate_geometries(&imported)?;

        let base = max_numeric_id(self.combined_iter());
        for (index, feature) in imported.iter_mut().enumerate() {
            feature.id = Some(FeatureId::from(base + index as u64 + 1));
            feature.retag(provenance);
        }

        if provenance.is_operand() {
            self.operands.insert(provenance, imported.clone());
        } else {
            self.features.extend(imported.iter().cloned());
        }
        log::info!(
            "Merged {} imported features as {:?} (ids {}..={})",
            imported.len(),
            provenance,
            base + 1,
            base + imported.len() as u64
        );
        Ok(imported)
    }

    /// Replaces the operand collection for `role` with features taken as-is.
    pub fn set_operand(&mut self, role: Provenance, features: Vec<Feature>) {
        if features.is_empty() {
            self.operands.remove(&role);
        } else {
            self.operands.insert(role, features);
        }
    }

    pub fn clear_operand(&mut self, role: Provenance) {
        self.operands.remove(&role);
    }

    /// Takes the full set reported by the drawing UI and splits it back into
    /// the canonical collection and the operand collections by provenance.
    pub fn sync_from_surface(&mut self, all: FeatureCollection) -> Result<(), RegistryError> {
        let mut features = all.features;
        validate_geometries(&features)?;
        let last = max_numeric_id(&features);
        assign_missing_ids(&mut features, last);
        ensure_unique_ids(&features)?;

        let mut primary = Vec::new();
        let mut operands: BTreeMap<Provenance, Vec<Feature>> = BTreeMap::new();
        for feature in features {
            if feature.provenance.is_operand() {
                operands.entry(feature.provenance).or_default().push(feature);
            } else {
                primary.push(feature);
            }
        }
        self.features = primary;
        self.operands = operands;
        Ok(())
    }

    /// Empties the canonical collection and every operand collection.
    pub fn clear(&mut self) {
        self.features.clear();
        self.operands.clear();
    }

    fn combined_iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter().chain(self.operands.values().flatten())
    }
}

fn validate_geometries(features: &[Feature]) -> Result<(), RegistryError> {
    match features.iter().position(|f| f.geometry.is_none()) {
        Some(index) => Err(RegistryError::InvalidFeatureCollection {
            reason: format!("feature at index {index} has no geometry"),
        }),
        None => Ok(()),
    }
}

fn max_numeric_id<'a>(features: impl IntoIterator<Item = &'a Feature>) -> u64 {
    features
        .into_iter()
        .filter_map(|f| f.id.as_ref())
        .map(FeatureId::numeric_value)
        .max()
        .unwrap_or(0)
}

fn assign_missing_ids(features: &mut [Feature], mut last: u64) {
    for feature in features.iter_mut().filter(|f| f.id.is_none()) {
        last += 1;
        feature.id = Some(FeatureId::from(last));
    }
}

fn ensure_unique_ids(features: &[Feature]) -> Result<(), RegistryError> {
    let mut seen = HashSet::with_capacity(features.len());
    for id in features.iter().filter_map(|f| f.id.as_ref()) {
        if !seen.insert(id.normalized()) {
            return Err(RegistryError::InvalidFeatureCollection {
                reason: format!("duplicate feature id {id}"),
            });
        }
    }
    Ok(())
}

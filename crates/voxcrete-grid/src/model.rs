//! Settings-driven voxel model: owns the solids, the voxel set and the
//! bucket table, and regenerates exactly what a settings change requires.

use log::debug;
use voxcrete_math::Aabb3;
use voxcrete_solid::Solid;

use crate::bucket::BucketTable;
use crate::classify::{classify_voxels, restyle_voxels};
use crate::color::Color;
use crate::density::sub_lattice_cells;
use crate::error::{Result, VoxelError};
use crate::grid::build_grid;
use crate::settings::{GridSettings, SamplingSettings, VoxelConfig};
use crate::voxel::{Voxel, VoxelId, VoxelRecord};

/// Lifecycle of a [`VoxelModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    /// No voxel set exists.
    Unbuilt,
    /// A grid build or classification pass is running.
    Rebuilding,
    /// A committed voxel set is available.
    Built {
        /// Bumped whenever the voxel set is regenerated.
        grid_version: u64,
        /// Bumped whenever ratios, buckets or visual handles change.
        classification_version: u64,
    },
}

impl BuildState {
    /// True for [`BuildState::Built`].
    pub fn is_built(&self) -> bool {
        matches!(self, BuildState::Built { .. })
    }
}

/// What [`VoxelModel::apply_settings`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsChange {
    /// Nothing visible changed, or there was no voxel set to update.
    Unchanged,
    /// Only visual handles were recreated.
    Restyled,
    /// The voxel set was discarded and rebuilt.
    Rebuilt,
}

/// Callback notified on every [`BuildState`] transition.
pub type StateListener = Box<dyn FnMut(&BuildState) + Send>;

/// Concrete and reinforcement solids plus everything derived from them.
pub struct VoxelModel {
    concrete: Solid,
    reinforcement: Solid,
    bounds: Option<Aabb3>,
    grid: GridSettings,
    sampling: SamplingSettings,
    table: BucketTable,
    voxels: Vec<Voxel>,
    state: BuildState,
    grid_version: u64,
    classification_version: u64,
    visual_generation: u64,
    listener: Option<StateListener>,
}

impl std::fmt::Debug for VoxelModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoxelModel")
            .field("concrete", &self.concrete)
            .field("reinforcement", &self.reinforcement)
            .field("grid", &self.grid)
            .field("voxels", &self.voxels.len())
            .field("state", &self.state)
            .finish()
    }
}

impl VoxelModel {
    /// Create an unbuilt model.
    ///
    /// The lattice covers the concrete solid's world bounds unless
    /// [`with_bounds`](Self::with_bounds) overrides them.
    pub fn new(concrete: Solid, reinforcement: Solid, config: &VoxelConfig) -> Result<Self> {
        config.validate()?;
        let strategy = config.sampling.containment.strategy();
        let concrete = concrete.with_containment(strategy.clone());
        let reinforcement = reinforcement.with_containment(strategy);

        Ok(Self {
            bounds: concrete.world_aabb(),
            concrete,
            reinforcement,
            grid: config.grid,
            sampling: config.sampling,
            table: config.buckets.table()?,
            voxels: Vec::new(),
            state: BuildState::Unbuilt,
            grid_version: 0,
            classification_version: 0,
            visual_generation: 0,
            listener: None,
        })
    }

    /// Use `bounds` instead of the concrete solid's own bounds.
    pub fn with_bounds(mut self, bounds: Aabb3) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Register a callback for state transitions, replacing any previous one.
    pub fn set_listener(&mut self, listener: impl FnMut(&BuildState) + Send + 'static) {
        self.listener = Some(Box::new(listener));
    }

    /// Current state.
    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Current grid settings.
    pub fn grid_settings(&self) -> &GridSettings {
        &self.grid
    }

    /// Current sampling settings.
    pub fn sampling_settings(&self) -> &SamplingSettings {
        &self.sampling
    }

    /// Lattice bounds, `None` when the concrete solid is empty.
    pub fn bounds(&self) -> Option<Aabb3> {
        self.bounds
    }

    /// Bucket table with the quantities of the last pass.
    pub fn buckets(&self) -> &BucketTable {
        &self.table
    }

    /// All voxels, in lattice order.
    pub fn voxels(&self) -> &[Voxel] {
        &self.voxels
    }

    /// Voxel by id.
    pub fn voxel(&self, id: VoxelId) -> Option<&Voxel> {
        self.voxels
            .binary_search_by_key(&id, |v| v.id)
            .ok()
            .map(|i| &self.voxels[i])
    }

    /// Voxels classified into bucket `index`.
    pub fn voxels_in_bucket(&self, index: usize) -> impl Iterator<Item = &Voxel> {
        self.voxels.iter().filter(move |v| v.bucket == Some(index))
    }

    /// Voxels currently drawn in `color`.
    pub fn voxels_with_color(&self, color: Color) -> impl Iterator<Item = &Voxel> {
        self.voxels.iter().filter(move |v| v.color() == color)
    }

    /// Exportable records of all voxels.
    pub fn records(&self) -> Vec<VoxelRecord> {
        self.voxels.iter().map(Voxel::record).collect()
    }

    /// Discard any voxel set and build it from scratch: grid, then
    /// classification.
    ///
    /// On failure the previous voxel set, table and state are kept.
    pub fn voxelize(&mut self) -> Result<&BucketTable> {
        let previous = self.state;
        self.transition(BuildState::Rebuilding);

        match self.build() {
            Ok((voxels, table)) => {
                self.voxels = voxels;
                self.table = table;
                self.grid_version += 1;
                self.classification_version += 1;
                self.restyle();
                self.transition_to_built();
                Ok(&self.table)
            }
            Err(e) => {
                self.transition(previous);
                Err(e)
            }
        }
    }

    fn build(&self) -> Result<(Vec<Voxel>, BucketTable)> {
        let mut table = self.table.clone();
        let Some(bounds) = self.bounds else {
            debug!("concrete `{}` is empty, nothing to voxelize", self.concrete.id());
            table.reset_quantities();
            return Ok((Vec::new(), table));
        };
        sub_lattice_cells(self.grid.cell_size, self.sampling.sub_grid_size)?;
        let mut voxels = build_grid(&bounds, &self.grid, &self.concrete, self.sampling.parallel)?;
        let table = classify_voxels(
            &mut voxels,
            &self.reinforcement,
            self.sampling.sub_grid_size,
            table,
            self.sampling.parallel,
        )?;
        Ok((voxels, table))
    }

    /// Rerun classification on the existing voxel set, optionally with a
    /// new bucket table.
    ///
    /// Fails with [`VoxelError::NotBuilt`] when there is no voxel set.
    pub fn reclassify(&mut self, table: Option<BucketTable>) -> Result<&BucketTable> {
        if !self.state.is_built() {
            return Err(VoxelError::NotBuilt);
        }
        let previous = self.state;
        self.transition(BuildState::Rebuilding);

        let table = table.unwrap_or_else(|| self.table.clone());
        let mut voxels = self.voxels.clone();
        match classify_voxels(
            &mut voxels,
            &self.reinforcement,
            self.sampling.sub_grid_size,
            table,
            self.sampling.parallel,
        ) {
            Ok(table) => {
                self.voxels = voxels;
                self.table = table;
                self.classification_version += 1;
                self.restyle();
                self.transition_to_built();
                Ok(&self.table)
            }
            Err(e) => {
                self.transition(previous);
                Err(e)
            }
        }
    }

    /// Apply new grid settings.
    ///
    /// A cell size change rebuilds the voxel set; a roundness or
    /// transparency change only recreates visual handles and leaves ratios
    /// and buckets alone. Without a voxel set the settings are stored for
    /// the next [`voxelize`](Self::voxelize).
    pub fn apply_settings(&mut self, settings: GridSettings) -> Result<SettingsChange> {
        settings.validate()?;
        let old = self.grid;

        if !self.state.is_built() {
            self.grid = settings;
            return Ok(SettingsChange::Unchanged);
        }
        if old.needs_rebuild(&settings) {
            self.grid = settings;
            if let Err(e) = self.voxelize() {
                self.grid = old;
                return Err(e);
            }
            return Ok(SettingsChange::Rebuilt);
        }
        if old.needs_restyle(&settings) {
            self.grid = settings;
            self.classification_version += 1;
            self.restyle();
            self.transition_to_built();
            return Ok(SettingsChange::Restyled);
        }
        Ok(SettingsChange::Unchanged)
    }

    /// Replace the sampling settings. They take effect on the next
    /// [`voxelize`](Self::voxelize) or [`reclassify`](Self::reclassify).
    pub fn set_sampling(&mut self, sampling: SamplingSettings) -> Result<()> {
        sampling.validate()?;
        if sampling.containment != self.sampling.containment {
            let strategy = sampling.containment.strategy();
            self.concrete = self.concrete.clone().with_containment(strategy.clone());
            self.reinforcement = self.reinforcement.clone().with_containment(strategy);
        }
        self.sampling = sampling;
        Ok(())
    }

    /// Swap in new solids, discarding the voxel set.
    pub fn replace_solids(&mut self, concrete: Solid, reinforcement: Solid) {
        let strategy = self.sampling.containment.strategy();
        self.concrete = concrete.with_containment(strategy.clone());
        self.reinforcement = reinforcement.with_containment(strategy);
        self.bounds = self.concrete.world_aabb();
        self.voxels.clear();
        self.table.reset_quantities();
        self.transition(BuildState::Unbuilt);
    }

    fn restyle(&mut self) {
        self.visual_generation += 1;
        restyle_voxels(&mut self.voxels, &self.table, &self.grid, self.visual_generation);
    }

    fn transition_to_built(&mut self) {
        self.transition(BuildState::Built {
            grid_version: self.grid_version,
            classification_version: self.classification_version,
        });
    }

    fn transition(&mut self, state: BuildState) {
        debug!("voxel model {:?} -> {:?}", self.state, state);
        self.state = state;
        if let Some(listener) = self.listener.as_mut() {
            listener(&state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::{Arc, Mutex};
    use voxcrete_math::{Point3, Transform};
    use voxcrete_solid::{box_mesh, TriangleMesh};

    fn block(id: &str, min: f64, max: f64) -> Solid {
        let mesh = box_mesh(Point3::new(min, min, min), Point3::new(max, max, max));
        Solid::new(id, &mesh, Transform::identity()).unwrap()
    }

    fn model() -> VoxelModel {
        VoxelModel::new(
            block("concrete", 0.0, 1.0),
            block("rebar", -0.2, 0.5),
            &VoxelConfig::default(),
        )
        .unwrap()
    }

    fn recorder(model: &mut VoxelModel) -> Arc<Mutex<Vec<BuildState>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        model.set_listener(move |s| sink.lock().unwrap().push(*s));
        seen
    }

    #[test]
    fn test_voxelize_reports_rebuilding_then_built() {
        let mut model = model();
        let seen = recorder(&mut model);
        assert_eq!(model.state(), BuildState::Unbuilt);

        model.voxelize().unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                BuildState::Rebuilding,
                BuildState::Built {
                    grid_version: 1,
                    classification_version: 1
                }
            ]
        );
        assert_eq!(model.voxels().len(), 8);
        assert_eq!(model.buckets().total_quantity(), 8);
    }

    #[test]
    fn test_single_reinforced_voxel_is_full() {
        let mut model = model();
        model.voxelize().unwrap();
        let full: Vec<&Voxel> = model.voxels_in_bucket(3).collect();
        assert_eq!(full.len(), 1);
        assert_relative_eq!(full[0].center.x, 0.25);
        assert_relative_eq!(full[0].ratio.unwrap(), 100.0, epsilon = 1e-6);
        assert_eq!(model.voxels_in_bucket(0).count(), 7);
        assert_eq!(model.buckets().buckets()[0].quantity, 7);

        let red = model.buckets().buckets()[3].color;
        assert_eq!(model.voxels_with_color(red).count(), 1);
        assert_eq!(model.voxel(full[0].id), Some(full[0]));
    }

    #[test]
    fn test_transparency_change_only_restyles() {
        let mut model = model();
        model.voxelize().unwrap();
        let before = model.voxels().to_vec();

        let settings = GridSettings {
            transparency: 0.9,
            ..*model.grid_settings()
        };
        assert_eq!(model.apply_settings(settings).unwrap(), SettingsChange::Restyled);
        assert_eq!(
            model.state(),
            BuildState::Built {
                grid_version: 1,
                classification_version: 2
            }
        );
        for (old, new) in before.iter().zip(model.voxels()) {
            assert_eq!(old.id, new.id);
            assert_eq!(old.ratio, new.ratio);
            assert_eq!(old.bucket, new.bucket);
            assert_eq!(old.visual.color, new.visual.color);
            assert!(new.visual.generation > old.visual.generation);
            assert_relative_eq!(new.visual.transparency, 0.9);
        }
    }

    #[test]
    fn test_cell_size_change_rebuilds() {
        let mut model = model();
        model.voxelize().unwrap();
        let settings = GridSettings {
            cell_size: 0.25,
            ..*model.grid_settings()
        };
        assert_eq!(model.apply_settings(settings).unwrap(), SettingsChange::Rebuilt);
        assert_eq!(model.voxels().len(), 64);
        assert_eq!(model.buckets().total_quantity(), 64);
        assert_eq!(
            model.state(),
            BuildState::Built {
                grid_version: 2,
                classification_version: 2
            }
        );
    }

    #[test]
    fn test_same_settings_change_nothing() {
        let mut model = model();
        model.voxelize().unwrap();
        let settings = *model.grid_settings();
        assert_eq!(model.apply_settings(settings).unwrap(), SettingsChange::Unchanged);
    }

    #[test]
    fn test_failed_rebuild_keeps_previous_voxels() {
        let mut model = model();
        model.voxelize().unwrap();
        let before = model.voxels().to_vec();
        let state = model.state();
        let seen = recorder(&mut model);

        let tiny = GridSettings {
            cell_size: 1e-7,
            ..*model.grid_settings()
        };
        assert!(matches!(
            model.apply_settings(tiny),
            Err(VoxelError::InvalidSettings(_))
        ));
        assert_eq!(model.voxels(), before.as_slice());
        assert_eq!(model.state(), state);
        assert_relative_eq!(model.grid_settings().cell_size, 0.5);
        assert_eq!(*seen.lock().unwrap(), vec![BuildState::Rebuilding, state]);
    }

    #[test]
    fn test_invalid_settings_rejected_up_front() {
        let mut model = model();
        let bad = GridSettings {
            cell_size: 0.0,
            ..Default::default()
        };
        assert!(model.apply_settings(bad).is_err());
        assert_eq!(model.state(), BuildState::Unbuilt);
    }

    #[test]
    fn test_reclassify_requires_grid() {
        let mut model = model();
        assert!(matches!(model.reclassify(None), Err(VoxelError::NotBuilt)));
        assert!(model.voxels().is_empty());
    }

    #[test]
    fn test_reclassify_with_new_table() {
        let mut model = model();
        model.voxelize().unwrap();
        let table = model.reclassify(Some(BucketTable::even(2).unwrap())).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.buckets()[0].quantity, 7);
        assert_eq!(table.buckets()[1].quantity, 1);
        assert_eq!(
            model.state(),
            BuildState::Built {
                grid_version: 1,
                classification_version: 2
            }
        );
    }

    #[test]
    fn test_saved_table_reloads_and_recounts() {
        let mut model = model();
        model.voxelize().unwrap();
        let saved = model.buckets().to_json().unwrap();

        let mut loaded = BucketTable::from_json(&saved).unwrap();
        loaded.reset_quantities();
        let table = model.reclassify(Some(loaded)).unwrap().clone();

        assert_eq!(table.total_quantity(), model.voxels().len());
        assert_eq!(table.to_json().unwrap(), saved);
        assert_eq!(model.buckets().to_json().unwrap(), saved);
    }

    #[test]
    fn test_empty_concrete_gives_nothing() {
        let empty = Solid::new("empty", &TriangleMesh::new(), Transform::identity()).unwrap();
        let mut model =
            VoxelModel::new(empty, block("rebar", 0.0, 1.0), &VoxelConfig::default()).unwrap();
        assert!(model.bounds().is_none());
        let table = model.voxelize().unwrap();
        assert_eq!(table.total_quantity(), 0);
        assert!(model.voxels().is_empty());
        assert!(model.state().is_built());
    }

    #[test]
    fn test_replace_solids_discards_voxels() {
        let mut model = model();
        model.voxelize().unwrap();
        model.replace_solids(block("concrete", 0.0, 2.0), block("rebar", 0.0, 0.1));
        assert_eq!(model.state(), BuildState::Unbuilt);
        assert!(model.voxels().is_empty());
        assert_eq!(model.buckets().total_quantity(), 0);
        model.voxelize().unwrap();
        assert_eq!(model.voxels().len(), 64);
    }

    #[test]
    fn test_bounds_override() {
        let concrete = block("concrete", 0.0, 10.0);
        let mut model = VoxelModel::new(concrete, block("rebar", 0.0, 0.1), &VoxelConfig::default())
            .unwrap()
            .with_bounds(Aabb3::new(
                Point3::new(2.0, 2.0, 2.0),
                Point3::new(4.0, 4.0, 4.0),
            ));
        model.voxelize().unwrap();
        assert_eq!(model.voxels().len(), 125);
    }

    #[test]
    fn test_majority_vote_strategy_is_applied() {
        let mut model = model();
        let sampling = SamplingSettings {
            containment: voxcrete_solid::ContainmentKind::MajorityVote,
            ..*model.sampling_settings()
        };
        model.set_sampling(sampling).unwrap();
        model.voxelize().unwrap();
        assert_eq!(model.voxels().len(), 8);
        assert_eq!(model.voxels_in_bucket(3).count(), 1);
    }
}

//! JSON mesh documents exported by the model loader.
//!
//! ```json
//! {
//!   "elements": [
//!     { "id": "wall-1", "mesh": { "vertices": [...], "indices": [...] },
//!       "transform": [1,0,0,0, 0,1,0,0, 0,0,1,0, 0,0,0,1] }
//!   ]
//! }
//! ```
//!
//! `transform` is a column-major 4x4 matrix and defaults to the identity.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use voxcrete_math::Transform;
use voxcrete_solid::{Solid, TriangleMesh};

/// One element of the model: a mesh and where it sits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshElement {
    pub id: String,
    pub mesh: TriangleMesh,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<[f64; 16]>,
}

impl MeshElement {
    fn transform(&self) -> Transform {
        self.transform
            .as_ref()
            .map_or_else(Transform::identity, Transform::from_column_major)
    }
}

/// A list of elements that together form one solid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshDocument {
    pub elements: Vec<MeshElement>,
}

impl MeshDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))
    }

    /// Build one solid from all elements.
    ///
    /// A single element keeps its transform on the solid; several elements
    /// are baked into world space and merged.
    pub fn into_solid(self, id: &str) -> Result<Solid> {
        let solid = match self.elements.as_slice() {
            [single] => Solid::new(single.id.clone(), &single.mesh, single.transform())?,
            elements => {
                let mut merged = TriangleMesh::new();
                for element in elements {
                    let transform = element.transform();
                    if transform.is_identity() {
                        merged.merge(&element.mesh);
                    } else {
                        merged.merge(&element.mesh.transformed(&transform));
                    }
                }
                Solid::new(id, &merged, Transform::identity())?
            }
        };
        Ok(solid)
    }
}

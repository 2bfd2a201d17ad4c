use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use voxcrete_grid::{build_grid, classify_voxels, BucketTable, GridSettings};
use voxcrete_math::{Point3, Transform};
use voxcrete_solid::{box_mesh, Solid, TriangleMesh};

/// A 4 x 1 x 0.5 beam with four longitudinal bars.
fn beam() -> (Solid, Solid) {
    let concrete = box_mesh(Point3::origin(), Point3::new(4.0, 1.0, 0.5));
    let mut bars = TriangleMesh::new();
    for (y, z) in [(0.1, 0.1), (0.9, 0.1), (0.1, 0.4), (0.9, 0.4)] {
        bars.merge(&box_mesh(
            Point3::new(0.05, y - 0.02, z - 0.02),
            Point3::new(3.95, y + 0.02, z + 0.02),
        ));
    }
    (
        Solid::new("beam", &concrete, Transform::identity()).unwrap(),
        Solid::new("bars", &bars, Transform::identity()).unwrap(),
    )
}

fn bench_build_grid(c: &mut Criterion) {
    let (concrete, _) = beam();
    let bbox = concrete.world_aabb().unwrap();
    let mut group = c.benchmark_group("build_grid");
    for cell_size in [0.2, 0.1, 0.05] {
        let settings = GridSettings {
            cell_size,
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(cell_size), &settings, |b, s| {
            b.iter(|| build_grid(black_box(&bbox), s, &concrete, true).unwrap())
        });
    }
    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let (concrete, bars) = beam();
    let bbox = concrete.world_aabb().unwrap();
    let settings = GridSettings {
        cell_size: 0.2,
        ..Default::default()
    };
    let voxels = build_grid(&bbox, &settings, &concrete, true).unwrap();
    let mut group = c.benchmark_group("classify");
    for parallel in [false, true] {
        group.bench_with_input(BenchmarkId::from_parameter(parallel), &parallel, |b, &p| {
            b.iter(|| {
                let mut voxels = voxels.clone();
                classify_voxels(&mut voxels, &bars, 0.05, BucketTable::default(), p).unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build_grid, bench_classify);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lattice::{line, GridBounds, GridPos, OccupancyMap};

fn bench_line_ground(c: &mut Criterion) {
    c.bench_function("line_ground_40_cells", |b| {
        b.iter(|| line(black_box(GridPos::new(-20, -7, 0)), black_box(GridPos::new(20, 11, 0))))
    });
}

fn bench_line_climb(c: &mut Criterion) {
    c.bench_function("line_climb_3d", |b| {
        b.iter(|| line(black_box(GridPos::new(0, 0, 0)), black_box(GridPos::new(12, -30, 9))))
    });
}

fn bench_free_adjacent_crowded(c: &mut Criterion) {
    // Ring the target on the ground plane so only airborne cells remain free
    let mut map: OccupancyMap<u32> = OccupancyMap::new(GridBounds::default());
    let target = GridPos::new(0, 0, 1);
    map.place(0, target).unwrap();
    let mut key = 1;
    for x in -1..=1 {
        for y in -1..=1 {
            map.place(key, GridPos::new(x, y, 0)).unwrap();
            key += 1;
        }
    }

    c.bench_function("free_adjacent_crowded", |b| {
        b.iter(|| map.free_adjacent(black_box(target), black_box(GridPos::new(10, 10, 0))))
    });
}

criterion_group!(
    benches,
    bench_line_ground,
    bench_line_climb,
    bench_free_adjacent_crowded
);
criterion_main!(benches);

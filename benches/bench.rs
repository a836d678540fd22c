use criterion::{black_box, criterion_group, criterion_main, Criterion};
use presage::{vec, Fp, FinderTable, Shape, Vec2, World};

fn sweep_benchmarks(c: &mut Criterion) {
    let finders = FinderTable::standard();

    let mut fixed = Shape::circle(10.0);
    fixed.reset(Vec2::new(0.0, 0.0));
    let mut mover = Shape::circle(10.0);
    mover.start = Vec2::new(100.0, 5.0);
    mover.end = Vec2::new(0.0, 5.0);
    c.bench_function("circle circle sweep", |b| {
        b.iter(|| finders.find(black_box(&fixed), black_box(&mover)))
    });

    let mut wall = Shape::rect(-10.0, -10.0, 10.0, 10.0);
    wall.reset(Vec2::new(0.0, 0.0));
    let mut ball = Shape::circle(5.0);
    ball.start = Vec2::new(25.0, 25.0);
    ball.end = Vec2::new(5.0, 5.0);
    c.bench_function("rect circle corner sweep", |b| {
        b.iter(|| finders.find(black_box(&wall), black_box(&ball)))
    });
}

fn step_benchmark(c: &mut Criterion) {
    c.bench_function("step 32 converging circles", |b| {
        b.iter(|| {
            let mut world = World::new();
            for i in 0..32 {
                let angle = i as Fp * 6.2831853 / 32.0;
                let at = vec::rotate(Vec2::new(100.0, 0.0), angle);
                let mut shape = Shape::circle(4.0);
                shape.start = at;
                shape.end = at * 0.05;
                world.add(shape);
            }
            world.step(&mut ());
            black_box(world.len())
        })
    });
}

criterion_group!(benches, sweep_benchmarks, step_benchmark);
criterion_main!(benches);

use criterion::{criterion_group, criterion_main, Criterion, black_box};

use glam::{Mat4, Vec3};

use portalvis::core::Camera;
use portalvis::math::Aabb;
use portalvis::render::{DrawOrder, DynamicBsp, FrustumManager, RenderList, RenderSettings, Renderer};
use portalvis::render::visibility::gen_world_list;
use portalvis::world::{BlendMode, Mesh, TexturedPolygon, World};

const CELL: f32 = 10.0;

/// Square grid of rooms, every neighbour joined by a doorway, each room
/// holding a few panes of glass
fn room_grid(n: usize) -> World {
    let mut world = World::new();
    for z in 0..n {
        for x in 0..n {
            let min = Vec3::new(x as f32 * CELL, 0.0, -(z as f32 + 1.0) * CELL);
            let room = world.add_room(Aabb::new(min, min + Vec3::new(CELL, CELL, CELL)));

            let panes: Vec<TexturedPolygon> = (0..4)
                .map(|i| {
                    let c = min + Vec3::new(2.0 + i as f32 * 2.0, 2.0, 5.0);
                    TexturedPolygon::from_positions(
                        &[c, c + Vec3::new(1.5, 0.0, 0.0), c + Vec3::new(1.5, 3.0, 0.5), c + Vec3::new(0.0, 3.0, 0.5)],
                        BlendMode::Multiply,
                        i,
                    )
                })
                .collect();
            let mesh = world.add_mesh(Mesh::new(panes).expect("valid panes"));
            world.set_room_mesh(room, mesh).expect("room exists");
        }
    }

    let id = |x: usize, z: usize| portalvis::world::RoomId((z * n + x) as u32);
    for z in 0..n {
        for x in 0..n {
            let min = Vec3::new(x as f32 * CELL, 0.0, -(z as f32 + 1.0) * CELL);
            if x + 1 < n {
                let wx = min.x + CELL;
                let door = vec![
                    Vec3::new(wx, 1.0, min.z + 3.0),
                    Vec3::new(wx, 1.0, min.z + 7.0),
                    Vec3::new(wx, 6.0, min.z + 7.0),
                    Vec3::new(wx, 6.0, min.z + 3.0),
                ];
                world.connect(id(x, z), id(x + 1, z), door).expect("doorway");
            }
            if z + 1 < n {
                let wz = min.z;
                let door = vec![
                    Vec3::new(min.x + 3.0, 1.0, wz),
                    Vec3::new(min.x + 7.0, 1.0, wz),
                    Vec3::new(min.x + 7.0, 6.0, wz),
                    Vec3::new(min.x + 3.0, 6.0, wz),
                ];
                world.connect(id(x, z), id(x, z + 1), door).expect("doorway");
            }
        }
    }
    world
}

fn camera() -> Camera {
    let eye = Vec3::new(5.0, 4.0, -1.0);
    Camera::look_at(eye, eye + Vec3::new(0.3, 0.0, -1.0), Vec3::Y)
}

fn bench_gen_world_list(c: &mut Criterion) {
    let world = room_grid(16);
    let mut frustums = FrustumManager::new(8192);
    frustums.set_room_count(world.room_count());
    let mut list = RenderList::new(world.room_count(), 128);
    let mut cam = camera();

    c.bench_function("gen_world_list_16x16", |b| {
        b.iter(|| {
            gen_world_list(black_box(&world), &mut cam, &mut frustums, &mut list);
            black_box(list.len())
        });
    });
}

fn bench_bsp_build_traverse(c: &mut Criterion) {
    let world = room_grid(8);
    let polygons: Vec<TexturedPolygon> = world
        .meshes
        .iter()
        .flat_map(|m| m.transparent_polygons.iter().cloned())
        .collect();
    let mut bsp = DynamicBsp::new(16384, 32768);
    let eye = camera().position;

    c.bench_function("bsp_build_traverse_256", |b| {
        b.iter(|| {
            bsp.reset(&[]);
            bsp.insert_polygons(black_box(&polygons), &Mat4::IDENTITY, &[]);
            bsp.traverse(eye, DrawOrder::BackToFront);
            black_box(bsp.commands().len())
        });
    });
}

fn bench_render_frame(c: &mut Criterion) {
    let world = room_grid(16);
    let mut renderer = Renderer::new(RenderSettings::default()).expect("default settings");
    renderer.set_world(&world);
    let mut cam = camera();

    c.bench_function("render_frame_16x16", |b| {
        b.iter(|| black_box(renderer.render_frame(&world, &mut cam)));
    });
}

criterion_group!(benches, bench_gen_world_list, bench_bsp_build_traverse, bench_render_frame);
criterion_main!(benches);

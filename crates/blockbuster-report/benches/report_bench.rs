use blockbuster_report::{
    BlendData, Datablock, Node, NodeTree, ObjectType, ReportOptions, SceneObject, TextureType,
    build_report, find_references,
};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

/// Images used by node materials and legacy texture slots, spread over many objects
fn synthetic_scene(materials: usize, objects: usize) -> BlendData {
    let mut data = BlendData::new();
    let mut material_ids = Vec::with_capacity(materials);

    for i in 0..materials {
        let image = data.add_datablock(
            Datablock::image(format!("Image{i}")).with_packed_file(Some(1024 * (i as u64 + 1))),
        );
        let texture = data.add_datablock(
            Datablock::texture(format!("Tex{i}"), TextureType::Image, Some(image))
                .with_shallow_size(200),
        );
        let tree = NodeTree {
            nodes: vec![Node::other("ShaderNodeBsdfPrincipled"), Node::tex_image(Some(image))],
        };
        let material = data.add_datablock(
            Datablock::material(format!("Mat{i}"), Some(tree), vec![texture])
                .with_shallow_size(1500)
                .with_users(1),
        );
        material_ids.push(material);
    }

    for i in 0..objects {
        let mesh = data.add_datablock(
            Datablock::mesh(format!("Mesh{i}"))
                .with_shallow_size(1400)
                .with_users(1)
                .with_user_map(1),
        );
        let slot = material_ids.get(i % materials.max(1)).copied();
        data.add_object(
            SceneObject::new(format!("Object{i}"), ObjectType::Mesh, Some(mesh))
                .with_material_slots(vec![slot]),
        );
    }

    data
}

fn benchmark_build_report(c: &mut Criterion) {
    let data = synthetic_scene(200, 2000);
    let options = ReportOptions::default();

    c.bench_function("build_report_200_materials_2000_objects", |b| {
        b.iter(|| black_box(build_report(black_box(&data), &options)))
    });
}

fn benchmark_find_references(c: &mut Criterion) {
    let data = synthetic_scene(200, 2000);
    let image = data.images()[0];

    c.bench_function("find_references_image", |b| {
        b.iter(|| black_box(find_references(black_box(&data), image)))
    });
}

criterion_group!(benches, benchmark_build_report, benchmark_find_references);
criterion_main!(benches);

use std::time::Duration;

use flow_playground::{
    attachment::AttachmentStatus,
    config::Config,
    data_structures::{
        material::Material,
        mesh::Geometry,
        scene_graph::NodeKind,
    },
    flow::SceneFlow,
    pick::TriangleIntersector,
    resources::FileSource,
    scene::{AssetSpec, NodeSpec, SceneDescriptor},
};

use crate::common::test_utils::{scratch_dir, write_png, write_triangle_gltf};

mod common;

async fn settle(flow: &mut SceneFlow) {
    for _ in 0..500 {
        flow.pump_assets();
        if flow.attachments().pending() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("asset loads did not settle");
}

#[tokio::test(flavor = "multi_thread")]
async fn files_on_disk_are_attached_once_loaded() {
    let dir = scratch_dir("file-source");
    let root = dir.path();
    write_triangle_gltf(root);
    write_png(root, "textures/red.png", [255, 0, 0, 255]);

    let mut scene = SceneDescriptor::new("files");
    scene.materials = vec![(
        "painted".into(),
        Material::new("painted", [1.0; 3]).with_texture("textures/red.png"),
    )];
    scene.nodes.push(NodeSpec::mesh(
        "ground",
        Geometry::Plane {
            width: 2.0,
            height: 2.0,
        },
        "painted",
    ));
    scene.assets.push(AssetSpec::model("tri", "model/tri.gltf"));
    scene.assets.push(AssetSpec::model("absent", "model/absent.gltf"));

    let source = FileSource::new(root, tokio::runtime::Handle::current());
    let mut flow = SceneFlow::build(
        &scene,
        &Config::default(),
        Box::new(source),
        Box::new(TriangleIntersector),
    )
    .expect("descriptor should build");
    assert_eq!(flow.attachments().pending(), 3);
    settle(&mut flow).await;

    let texture = flow.graph().texture("textures/red.png").expect("texture attached");
    assert_eq!(texture.mean_colour(), [1.0, 0.0, 0.0]);

    let tri = flow.asset("tri").unwrap();
    let model = flow.attachments().loaded_node(tri).expect("model attached");
    let model = flow.graph().node(model).unwrap();
    let node = &model.children()[0];
    assert_eq!(node.name, "tri");
    assert_eq!(node.transform.position, cgmath::Vector3::new(0.0, 1.0, 0.0));
    let mesh = &node.children()[0];
    assert!(matches!(mesh.kind, NodeKind::Mesh { .. }));
    let material = flow.graph().material(mesh.material().unwrap()).unwrap();
    assert_eq!(material.colour, [1.0, 0.0, 0.0]);
    assert_eq!(material.texture, None);

    let bricks = flow
        .graph()
        .materials()
        .iter()
        .find(|m| m.name == "bricks")
        .expect("textured material imported");
    let brick_texture = bricks.texture.as_deref().expect("base colour texture resolved");
    assert_eq!(brick_texture, "model/tri.gltf#0");
    let texture = flow.graph().texture(brick_texture).expect("model texture registered");
    assert_eq!(texture.mean_colour(), [0.0, 1.0, 0.0]);

    let absent = flow.asset("absent").unwrap();
    match flow.attachments().status(absent).unwrap() {
        AttachmentStatus::Failed(failure) => {
            assert!(failure.to_string().contains("model/absent.gltf"))
        }
        other => panic!("expected a failure, got {other:?}"),
    }
}

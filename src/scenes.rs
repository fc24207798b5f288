//! Ready-made scenes.
//!
//! [`playground`] is the reference scene: a grass field fenced by four
//! concrete walls, a small building whose walls change texture when
//! clicked, a sun circling overhead and four playground models. Variants are
//! built by editing its descriptor.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use crate::{
    data_structures::{
        instance::Instance,
        material::Material,
        mesh::Geometry,
        scene_graph::{Fog, Light, LightKind},
    },
    scene::{
        AnimationSpec, AssetSpec, NodeSpec, NodeSpecKind, PickableSpec, SceneDescriptor, TargetSpec,
    },
};

/// `0xRRGGBB` to RGB in `0.0..=1.0`.
pub fn hex(rgb: u32) -> [f32; 3] {
    [
        ((rgb >> 16) & 0xff) as f32 / 255.0,
        ((rgb >> 8) & 0xff) as f32 / 255.0,
        (rgb & 0xff) as f32 / 255.0,
    ]
}

fn textured(name: &str, texture: &str) -> Material {
    Material::new(name, [1.0; 3]).with_texture(texture)
}

fn ambient(intensity: f32) -> Light {
    Light {
        kind: LightKind::Ambient,
        colour: [1.0; 3],
        intensity,
    }
}

pub fn playground() -> SceneDescriptor {
    let mut scene = SceneDescriptor::new("playground");
    scene.background = hex(0x87ceeb);
    scene.fog = Some(Fog {
        colour: hex(0xaaaaaa),
        near: 1.0,
        far: 50.0,
    });

    scene.materials = vec![
        (
            "grass".into(),
            textured("grass", "textures/grass.jpg").with_repeat(16.0, 16.0),
        ),
        (
            "concrete".into(),
            textured("concrete", "textures/concrete.jpg")
                .with_repeat(16.0, 1.0)
                .double_sided(),
        ),
        ("brick".into(), textured("brick", "textures/wall-texture.jpg")),
        ("plaster".into(), textured("plaster", "textures/wall-texture2.jpg")),
        ("roof".into(), textured("roof", "textures/roof.jpg")),
    ];

    scene.nodes.push(NodeSpec::light("ambient", ambient(0.3)));
    scene.nodes.push(
        NodeSpec::mesh(
            "ground",
            Geometry::Plane {
                width: 50.0,
                height: 50.0,
            },
            "grass",
        )
        .at(Instance::new().with_euler(-FRAC_PI_2, 0.0, 0.0))
        .shadows(false, true),
    );

    let wall = Geometry::Plane {
        width: 50.0,
        height: 5.0,
    };
    let fence = [
        ("wall east", (25.0, 0.0), -FRAC_PI_2),
        ("wall west", (-25.0, 0.0), FRAC_PI_2),
        ("wall south", (0.0, 25.0), PI),
        ("wall north", (0.0, -25.0), 0.0),
    ];
    for (key, (x, z), yaw) in fence {
        scene.nodes.push(
            NodeSpec::mesh(key, wall.clone(), "concrete")
                .at(Instance::at(x, 0.0, z).with_euler(0.0, yaw, 0.0))
                .shadows(true, true),
        );
    }

    scene.nodes.push(NodeSpec::group("building"));
    scene.nodes.push(
        NodeSpec::mesh(
            "building walls",
            Geometry::Box {
                width: 5.0,
                height: 6.0,
                depth: 5.0,
            },
            "brick",
        )
        .under("building")
        .at(Instance::at(2.0, 1.0, -1.0))
        .shadows(true, true),
    );
    scene.nodes.push(
        NodeSpec::mesh(
            "roof",
            Geometry::Cone {
                radius: 4.0,
                height: 2.0,
                segments: 4,
            },
            "roof",
        )
        .under("building")
        .at(Instance::at(2.0, 5.0, -1.0).with_euler(0.0, FRAC_PI_4, 0.0))
        .shadows(true, false),
    );
    scene.pickables.push(PickableSpec {
        name: "building".into(),
        members: vec!["building walls".into()],
        hit_only: vec!["roof".into()],
        materials: vec!["brick".into(), "plaster".into()],
    });

    scene.nodes.push(
        NodeSpec::light(
            "sun",
            Light {
                kind: LightKind::Directional,
                colour: [1.0; 3],
                intensity: 1.0,
            },
        )
        .at(Instance::at(10.0, 20.0, 10.0))
        .shadows(true, false),
    );
    scene.animations.push(AnimationSpec::OrbitLight {
        target: TargetSpec::Node("sun".into()),
        radius: 20.0,
        speed: 1.0,
    });

    let models = [
        ("swing", "model/swing/scene.gltf", 0.01, (14.0, -1.0)),
        ("slide", "model/slide/scene.gltf", 1.2, (-14.0, 1.0)),
        ("merry", "model/merry/scene.gltf", 2.0, (0.0, -14.0)),
        ("seesaws", "model/seesaws/scene.gltf", 0.01, (0.0, 14.0)),
    ];
    for (key, path, scale, (x, z)) in models {
        scene.assets.push(
            AssetSpec::model(key, path)
                .at(Instance::at(x, 0.0, z).with_uniform_scale(scale))
                .shadows(true, false),
        );
    }

    scene
}

/// The playground at dusk: dim pulsing ambient light, a weaker sun and a
/// merry-go-round that turns once it has loaded.
pub fn night_playground() -> SceneDescriptor {
    let mut scene = playground();
    scene.name = "night playground".into();
    scene.background = hex(0x0b1026);
    scene.fog = Some(Fog {
        colour: hex(0x1a1d2e),
        near: 1.0,
        far: 40.0,
    });
    for spec in &mut scene.nodes {
        if let ("sun", NodeSpecKind::Light(light)) = (spec.key.as_str(), &mut spec.kind) {
            light.colour = hex(0x9fb4ff);
            light.intensity = 0.4;
        }
    }
    scene.animations.push(AnimationSpec::Pulse {
        target: TargetSpec::Node("ambient".into()),
        floor: 0.05,
        amplitude: 0.2,
        frequency: 2.0,
    });
    scene.animations.push(AnimationSpec::Spin {
        target: TargetSpec::Asset("merry".into()),
        speed: 1.5,
    });
    scene
}

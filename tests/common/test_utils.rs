#![allow(dead_code)]

use std::{
    cell::RefCell,
    collections::HashMap,
    rc::Rc,
    sync::{Mutex, OnceLock},
};

use anyhow::anyhow;
use cgmath::Point3;
use flow_playground::{
    camera::CameraView,
    data_structures::{
        material::{Material, MaterialId},
        mesh::Geometry,
        scene_graph::{LoadedModel, Node, SceneGraph},
        texture::TextureData,
    },
    render::{Frame, Renderer},
    resources::{AssetKind, AssetSource, Resource},
};
use futures::{FutureExt, channel::oneshot, future::LocalBoxFuture};

/// Counts frames instead of drawing them.
pub(crate) struct RecordingRenderer {
    renders: u32,
    fail: bool,
    viewport: (u32, u32),
    eyes: Vec<Point3<f32>>,
    draw_counts: Vec<usize>,
    colours: Vec<Vec<[f32; 3]>>,
}

impl RecordingRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            renders: 0,
            fail: false,
            viewport: (width, height),
            eyes: Vec::new(),
            draw_counts: Vec::new(),
            colours: Vec::new(),
        }
    }

    /// A renderer whose every frame errors after being counted.
    pub fn failing(width: u32, height: u32) -> Self {
        Self {
            fail: true,
            ..Self::new(width, height)
        }
    }

    pub fn renders(&self) -> u32 {
        self.renders
    }

    pub fn eyes(&self) -> &[Point3<f32>] {
        &self.eyes
    }

    pub fn last_draw_count(&self) -> Option<usize> {
        self.draw_counts.last().copied()
    }

    pub fn last_colours(&self) -> Option<&[[f32; 3]]> {
        self.colours.last().map(Vec::as_slice)
    }
}

impl Default for RecordingRenderer {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, graph: &SceneGraph, camera: &CameraView) -> anyhow::Result<()> {
        self.renders += 1;
        let frame = Frame::collect(graph);
        self.eyes.push(camera.eye);
        self.draw_counts.push(frame.items.len());
        self.colours
            .push(frame.items.iter().map(|item| item.colour).collect());
        if self.fail {
            return Err(anyhow!("recording renderer told to fail"));
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    fn viewport(&self) -> (u32, u32) {
        self.viewport
    }
}

/// An asset source that resolves requests only when the test says so.
///
/// Clones share their pending requests, so the test can keep one handle and
/// give the other to a flow.
#[derive(Clone, Default)]
pub(crate) struct ScriptedSource {
    pending: Rc<RefCell<HashMap<String, oneshot::Sender<anyhow::Result<Resource>>>>>,
    requested: Rc<RefCell<Vec<(String, AssetKind)>>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completes the pending request for `path`. Returns false when nothing
    /// asked for it.
    pub fn resolve(&self, path: &str, result: anyhow::Result<Resource>) -> bool {
        match self.pending.borrow_mut().remove(path) {
            Some(sender) => sender.send(result).is_ok(),
            None => false,
        }
    }

    pub fn fail(&self, path: &str, message: &str) -> bool {
        self.resolve(path, Err(anyhow!(message.to_string())))
    }

    pub fn requested(&self) -> Vec<(String, AssetKind)> {
        self.requested.borrow().clone()
    }

    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }
}

impl AssetSource for ScriptedSource {
    fn load(&self, path: &str, kind: AssetKind) -> LocalBoxFuture<'static, anyhow::Result<Resource>> {
        let (sender, receiver) = oneshot::channel();
        self.pending.borrow_mut().insert(path.to_string(), sender);
        self.requested.borrow_mut().push((path.to_string(), kind));
        let path = path.to_string();
        async move {
            receiver
                .await
                .unwrap_or_else(|_| Err(anyhow!("request for {path} was dropped")))
        }
        .boxed_local()
    }
}

/// A one-mesh model: a unit box with its own grey material.
pub(crate) fn box_model(name: &str) -> Resource {
    let mut root = Node::group(name);
    root.add_child(Node::mesh(
        format!("{name} mesh"),
        Geometry::Box {
            width: 1.0,
            height: 1.0,
            depth: 1.0,
        },
        MaterialId(0),
    ));
    Resource::Model(LoadedModel {
        root,
        materials: vec![Material::new(format!("{name} grey"), [0.5, 0.5, 0.5])],
        textures: Vec::new(),
    })
}

pub(crate) fn solid_texture(rgba: [u8; 4]) -> Resource {
    Resource::Texture(TextureData {
        name: "solid".into(),
        width: 1,
        height: 1,
        pixels: rgba.to_vec(),
    })
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Record {
    pub level: log::Level,
    pub message: String,
}

struct CaptureLogger;

fn records() -> &'static Mutex<Vec<Record>> {
    static RECORDS: OnceLock<Mutex<Vec<Record>>> = OnceLock::new();
    RECORDS.get_or_init(|| Mutex::new(Vec::new()))
}

impl log::Log for CaptureLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Debug
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Ok(mut records) = records().lock() {
            records.push(Record {
                level: record.level(),
                message: record.args().to_string(),
            });
        }
    }

    fn flush(&self) {}
}

/// Installs the capturing logger once per test binary.
pub(crate) fn capture_logs() {
    static INSTALLED: OnceLock<()> = OnceLock::new();
    INSTALLED.get_or_init(|| {
        if log::set_boxed_logger(Box::new(CaptureLogger)).is_ok() {
            log::set_max_level(log::LevelFilter::Debug);
        }
    });
}

/// Captured records at `level` mentioning `needle`. Tests run in parallel,
/// so every test filters by a marker of its own.
pub(crate) fn logged(level: log::Level, needle: &str) -> Vec<Record> {
    records()
        .lock()
        .map(|records| {
            records
                .iter()
                .filter(|record| record.level == level && record.message.contains(needle))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// A fresh directory under the system temp dir, removed when dropped.
pub(crate) fn scratch_dir(name: &str) -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix(&format!("flow-playground-{name}-"))
        .tempdir()
        .expect("temp dir is writable")
}

/// Writes `model/tri.gltf` and its buffer: one red triangle in a node
/// named `tri`, lifted one unit up. The file also carries a `bricks`
/// material whose base colour texture is `model/brick wall.png` (green).
/// Both external files are named with a space and referenced percent-encoded.
pub(crate) fn write_triangle_gltf(root: &std::path::Path) {
    let model = root.join("model");
    std::fs::create_dir_all(&model).expect("model dir is writable");
    let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let bin: Vec<u8> = positions.iter().flat_map(|v| v.to_le_bytes()).collect();
    std::fs::write(model.join("tri data.bin"), bin).expect("buffer is writable");
    write_png(root, "model/brick wall.png", [0, 255, 0, 255]);
    let json = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "name": "tri", "mesh": 0, "translation": [0.0, 1.0, 0.0] }],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 }, "material": 0 }] }],
        "materials": [
            { "name": "red", "pbrMetallicRoughness": { "baseColorFactor": [1.0, 0.0, 0.0, 1.0] } },
            { "name": "bricks", "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } } }
        ],
        "textures": [{ "source": 0 }],
        "images": [{ "uri": "brick%20wall.png" }],
        "buffers": [{ "uri": "tri%20data.bin", "byteLength": 36 }],
        "bufferViews": [{ "buffer": 0, "byteLength": 36 }],
        "accessors": [{
            "bufferView": 0,
            "componentType": 5126,
            "count": 3,
            "type": "VEC3",
            "min": [0.0, 0.0, 0.0],
            "max": [1.0, 1.0, 0.0]
        }]
    }"#;
    std::fs::write(model.join("tri.gltf"), json).expect("model is writable");
}

pub(crate) fn write_png(root: &std::path::Path, name: &str, rgba: [u8; 4]) {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("texture dir is writable");
    }
    image::RgbaImage::from_pixel(2, 2, image::Rgba(rgba))
        .save(&path)
        .expect("png is writable");
}

//! Loading of models and textures from external files.
//!
//! The [`AssetSource`] trait is the seam between the scene runtime and
//! wherever assets come from. [`FileSource`] reads them from disk on a tokio
//! runtime and decodes them off the render thread; the decoded [`Resource`]
//! is handed back through the returned future.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use futures::{FutureExt, future::LocalBoxFuture};
use percent_encoding::percent_decode_str;

use crate::data_structures::{
    material::{Material, MaterialId},
    scene_graph::{LoadedModel, Node},
    texture::TextureData,
};

pub mod mesh;
pub mod texture;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// A glTF scene (`.gltf` with external or embedded buffers, or `.glb`).
    Model,
    /// An image file (PNG, JPEG).
    Texture,
}

/// A decoded asset, ready to be merged into a scene graph.
#[derive(Debug)]
pub enum Resource {
    Model(LoadedModel),
    Texture(TextureData),
}

impl Resource {
    pub fn kind(&self) -> AssetKind {
        match self {
            Resource::Model(_) => AssetKind::Model,
            Resource::Texture(_) => AssetKind::Texture,
        }
    }
}

/// Asynchronously retrieves named resources.
///
/// The returned future resolves exactly once. It is polled from the thread
/// owning the scene; the work behind it may run anywhere.
pub trait AssetSource {
    fn load(&self, path: &str, kind: AssetKind) -> LocalBoxFuture<'static, anyhow::Result<Resource>>;
}

/// Reads assets below `root` using a tokio runtime for IO and decoding.
pub struct FileSource {
    root: PathBuf,
    runtime: tokio::runtime::Handle,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>, runtime: tokio::runtime::Handle) -> Self {
        Self {
            root: root.into(),
            runtime,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for FileSource {
    fn load(&self, path: &str, kind: AssetKind) -> LocalBoxFuture<'static, anyhow::Result<Resource>> {
        let root = self.root.clone();
        let path = path.to_string();
        log::debug!("Loading {:?} {} from {}", kind, path, root.display());
        let task = self.runtime.spawn(async move {
            match kind {
                AssetKind::Model => load_model_gltf(&root, &path).await.map(Resource::Model),
                AssetKind::Texture => texture::load_texture(&root, &path)
                    .await
                    .map(Resource::Texture),
            }
        });
        async move { task.await.context("asset loading task was aborted")? }.boxed_local()
    }
}

/// Load a glTF model and convert it into a detached scene subtree.
///
/// Buffers and images referenced by URI are resolved relative to the model
/// file after percent-decoding. Only triangle primitives are kept; every
/// primitive becomes its own mesh node. Base colour textures are decoded and
/// returned with the model, named `<file_name>#<image index>`.
pub async fn load_model_gltf(root: &Path, file_name: &str) -> anyhow::Result<LoadedModel> {
    let gltf_bytes = texture::load_binary(root, file_name).await?;
    let gltf = gltf::Gltf::from_slice(&gltf_bytes)
        .with_context(|| format!("{file_name} is not a valid glTF file"))?;
    let base = Path::new(file_name).parent().unwrap_or(Path::new(""));

    // Load buffers
    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => match gltf.blob.as_deref() {
                Some(blob) => buffer_data.push(blob.to_vec()),
                None => bail!("{file_name} references a binary chunk it does not contain"),
            },
            gltf::buffer::Source::Uri(uri) if uri.starts_with("data:") => {
                bail!("{file_name} embeds a data URI buffer, which is not supported")
            }
            gltf::buffer::Source::Uri(uri) => {
                let path = resolve_uri(base, uri)?;
                let bin = texture::load_binary(root, &path).await?;
                buffer_data.push(bin);
            }
        }
    }

    // Load materials. Primitives without one use a neutral fallback appended last.
    let mut materials = Vec::new();
    let mut textures: Vec<TextureData> = Vec::new();
    for material in gltf.materials() {
        let pbr = material.pbr_metallic_roughness();
        let [r, g, b, _] = pbr.base_color_factor();
        let name = material.name().unwrap_or(file_name).to_string();
        let mut converted = Material::new(name, [r, g, b]);
        if material.double_sided() {
            converted = converted.double_sided();
        }
        if let Some(info) = pbr.base_color_texture() {
            let image = info.texture().source();
            let texture_name = format!("{file_name}#{}", image.index());
            if !textures.iter().any(|t| t.name == texture_name) {
                match load_gltf_image(root, base, &image, &buffer_data, &texture_name).await {
                    Ok(Some(decoded)) => textures.push(decoded),
                    Ok(None) => {}
                    Err(e) => {
                        log::warn!("Skipping base colour texture of {}: {:#}", converted.name, e)
                    }
                }
            }
            if textures.iter().any(|t| t.name == texture_name) {
                converted = converted.with_texture(texture_name);
            }
        }
        materials.push(converted);
    }
    let fallback = MaterialId(materials.len());
    materials.push(Material::new(format!("{file_name} default"), [0.8, 0.8, 0.8]));

    let mut root_node = Node::group(file_name);
    let scene = gltf.default_scene().or_else(|| gltf.scenes().next());
    match scene {
        Some(scene) => {
            for node in scene.nodes() {
                root_node.add_child(mesh::to_model_node(node, &buffer_data, fallback));
            }
        }
        None => log::warn!("{} contains no scene, it will stay empty.", file_name),
    }

    Ok(LoadedModel {
        root: root_node,
        materials,
        textures,
    })
}

/// Decodes one glTF image, either from a buffer view or from a file next to
/// the model. Embedded data URIs are skipped with a warning.
async fn load_gltf_image(
    root: &Path,
    base: &Path,
    image: &gltf::Image<'_>,
    buffer_data: &[Vec<u8>],
    name: &str,
) -> anyhow::Result<Option<TextureData>> {
    match image.source() {
        gltf::image::Source::View { view, mime_type } => {
            let buffer = buffer_data
                .get(view.buffer().index())
                .with_context(|| format!("image {} points at a missing buffer", image.index()))?;
            let bytes = buffer
                .get(view.offset()..view.offset() + view.length())
                .with_context(|| format!("image {} overruns its buffer", image.index()))?;
            TextureData::from_bytes(bytes, name, mime_type.split('/').next_back()).map(Some)
        }
        gltf::image::Source::Uri { uri, .. } if uri.starts_with("data:") => {
            log::warn!("Image {} is an embedded data URI, which is not supported.", image.index());
            Ok(None)
        }
        gltf::image::Source::Uri { uri, mime_type } => {
            let path = resolve_uri(base, uri)?;
            let bytes = texture::load_binary(root, &path).await?;
            let format = mime_type
                .and_then(|mt| mt.split('/').next_back())
                .or_else(|| Path::new(&path).extension().and_then(|ext| ext.to_str()));
            TextureData::from_bytes(&bytes, name, format).map(Some)
        }
    }
}

/// Turns a relative glTF URI into a path below the asset root.
fn resolve_uri(base: &Path, uri: &str) -> anyhow::Result<String> {
    let decoded = percent_decode_str(uri)
        .decode_utf8()
        .with_context(|| format!("{uri} does not decode to UTF-8"))?;
    Ok(base.join(decoded.as_ref()).to_string_lossy().into_owned())
}

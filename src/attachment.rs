//! Asynchronous attachment of external assets to the scene graph.
//!
//! A request returns immediately with an [`AttachmentId`] in the
//! [`AttachmentStatus::Pending`] state. The load runs wherever the
//! [`AssetSource`] puts it; its result is only applied to the graph from
//! [`Attachments::pump`], which the owner calls between ticks. Every
//! attachment moves from `Pending` to `Loaded` or `Failed` exactly once.
//! Failed loads are not retried.

use futures::{FutureExt, StreamExt, future::LocalBoxFuture, stream::FuturesUnordered};
use thiserror::Error;

use crate::{
    data_structures::{
        instance::Instance,
        scene_graph::{LoadedModel, NodeId, SceneGraph},
    },
    resources::{AssetKind, AssetSource, Resource},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttachmentId(usize);

/// The one recoverable runtime error: an asset that could not be attached.
#[derive(Debug, Error)]
#[error("could not load {path}: {cause:#}")]
pub struct AssetLoadFailure {
    pub path: String,
    pub cause: anyhow::Error,
}

/// What a successful attachment added to the graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Attached {
    /// Root of the imported model subtree.
    Node(NodeId),
    /// Name the texture was registered under.
    Texture(String),
}

#[derive(Debug)]
pub enum AttachmentStatus {
    Pending,
    Loaded(Attached),
    Failed(AssetLoadFailure),
}

impl AttachmentStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, AttachmentStatus::Pending)
    }
}

/// A resource to fetch and where to put it.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetRequest {
    pub path: String,
    pub kind: AssetKind,
    /// Parent of the loaded subtree, the scene root if `None`.
    pub anchor: Option<NodeId>,
    /// Replaces the model root's own transform once loaded.
    pub transform: Instance,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl AssetRequest {
    pub fn model(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: AssetKind::Model,
            anchor: None,
            transform: Instance::new(),
            cast_shadow: false,
            receive_shadow: false,
        }
    }

    pub fn texture(path: impl Into<String>) -> Self {
        Self {
            kind: AssetKind::Texture,
            ..Self::model(path)
        }
    }

    pub fn with_anchor(mut self, anchor: NodeId) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn with_transform(mut self, transform: Instance) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_shadows(mut self, cast: bool, receive: bool) -> Self {
        self.cast_shadow = cast;
        self.receive_shadow = receive;
        self
    }
}

#[derive(Debug)]
struct Attachment {
    request: AssetRequest,
    status: AttachmentStatus,
}

type InFlight = LocalBoxFuture<'static, (AttachmentId, anyhow::Result<Resource>)>;

/// All asset attachments of a scene, pending and settled.
#[derive(Default)]
pub struct Attachments {
    entries: Vec<Attachment>,
    in_flight: FuturesUnordered<InFlight>,
}

impl Attachments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts loading `request` from `source`. Never blocks.
    pub fn request(&mut self, source: &dyn AssetSource, request: AssetRequest) -> AttachmentId {
        let id = AttachmentId(self.entries.len());
        let load = source.load(&request.path, request.kind);
        self.in_flight
            .push(async move { (id, load.await) }.boxed_local());
        self.entries.push(Attachment {
            request,
            status: AttachmentStatus::Pending,
        });
        id
    }

    /// Applies every load that has resolved since the last call, without
    /// waiting for the others. Returns the number of attachments settled.
    pub fn pump(&mut self, graph: &mut SceneGraph) -> usize {
        let mut settled = 0;
        while let Some(Some((id, result))) = self.in_flight.next().now_or_never() {
            if self.settle(id, result, graph) {
                settled += 1;
            }
        }
        settled
    }

    fn settle(&mut self, id: AttachmentId, result: anyhow::Result<Resource>, graph: &mut SceneGraph) -> bool {
        let Some(entry) = self.entries.get_mut(id.0) else {
            log::warn!("Received a load result for unknown attachment {:?}.", id);
            return false;
        };
        if !entry.status.is_pending() {
            log::warn!(
                "Ignoring a second load result for {}; attachments settle once.",
                entry.request.path
            );
            return false;
        }

        entry.status = match result.and_then(|resource| attach(&entry.request, resource, graph)) {
            Ok(attached) => {
                log::info!("Attached {} ({:?}).", entry.request.path, attached);
                AttachmentStatus::Loaded(attached)
            }
            Err(cause) => {
                let failure = AssetLoadFailure {
                    path: entry.request.path.clone(),
                    cause,
                };
                log::error!("{}", failure);
                AttachmentStatus::Failed(failure)
            }
        };
        true
    }

    pub fn status(&self, id: AttachmentId) -> Option<&AttachmentStatus> {
        self.entries.get(id.0).map(|entry| &entry.status)
    }

    pub fn request_of(&self, id: AttachmentId) -> Option<&AssetRequest> {
        self.entries.get(id.0).map(|entry| &entry.request)
    }

    /// Root node of a loaded model. `None` while pending, on failure and for
    /// textures.
    pub fn loaded_node(&self, id: AttachmentId) -> Option<NodeId> {
        match self.status(id)? {
            AttachmentStatus::Loaded(Attached::Node(node)) => Some(*node),
            _ => None,
        }
    }

    pub fn pending(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.status.is_pending())
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = AttachmentId> {
        (0..self.entries.len()).map(AttachmentId)
    }
}

fn attach(request: &AssetRequest, resource: Resource, graph: &mut SceneGraph) -> anyhow::Result<Attached> {
    if resource.kind() != request.kind {
        anyhow::bail!(
            "expected a {:?} resource but the source delivered a {:?}",
            request.kind,
            resource.kind()
        );
    }
    match resource {
        Resource::Model(mut model) => {
            let anchor = request.anchor.unwrap_or_else(|| graph.root_id());
            if !graph.contains(anchor) {
                anyhow::bail!("anchor node {:?} is not part of the scene", anchor);
            }
            model.root.transform = request.transform.clone();
            model.root.set_shadows(request.cast_shadow, request.receive_shadow);
            graph
                .import(anchor, model)
                .map(Attached::Node)
                .ok_or_else(|| anyhow::anyhow!("could not attach below {:?}", anchor))
        }
        Resource::Texture(mut texture) => {
            texture.name = request.path.clone();
            graph.add_texture(texture);
            Ok(Attached::Texture(request.path.clone()))
        }
    }
}

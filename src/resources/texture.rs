use std::path::Path;

use anyhow::Context;

use crate::data_structures::texture::TextureData;

/// Reads a file below the asset root.
pub async fn load_binary(root: &Path, file_name: &str) -> anyhow::Result<Vec<u8>> {
    let path = root.join(file_name);
    tokio::fs::read(&path)
        .await
        .with_context(|| format!("could not read {}", path.display()))
}

/// Reads and decodes an image file. The texture is registered under
/// `file_name`, which is also what materials refer to.
pub async fn load_texture(root: &Path, file_name: &str) -> anyhow::Result<TextureData> {
    let data = load_binary(root, file_name).await?;
    let format = Path::new(file_name).extension().and_then(|ext| ext.to_str());
    TextureData::from_bytes(&data, file_name, format)
}

//! Storage for uploaded media. Images are stored content-addressed (named by
//! their SHA-256 digest), so uploading the same image twice stores it once.
use std::sync::Arc;

use object_store::{
    aws::AmazonS3Builder, local::LocalFileSystem, path::Path, ObjectStore, PutPayload,
};
use sha2::{Digest as _, Sha256};
use tracing::info;

use crate::constants::media as constants;

/// A shareable handle to the media store.
pub type MediaStore = Arc<dyn ObjectStore>;

const PHOTO_PREFIX: &str = "photos";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFileType {
    Png,
    Jpg,
    Gif,
    Webp,
}

impl ImageFileType {
    /// Sniff the image type from its leading magic bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, ..] => Some(Self::Png),
            [0xff, 0xd8, 0xff, ..] => Some(Self::Jpg),
            [0x47, 0x49, 0x46, 0x38, 0x37 | 0x39, 0x61, ..] => Some(Self::Gif),
            [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some(Self::Webp),
            _ => None,
        }
    }
    /// Recover the image type from a stored path's extension.
    pub fn from_path(path: &str) -> Option<Self> {
        match path.rsplit_once('.')?.1 {
            "png" => Some(Self::Png),
            "jpg" => Some(Self::Jpg),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }
}

/// Open the configured media store: an S3-compatible bucket when `S3_HOST`
/// is set, a local directory otherwise.
pub fn connect() -> Result<MediaStore, errors::StorageError> {
    if let Some(host) = constants::S3_HOST.as_ref() {
        info!(%host, bucket = %*constants::S3_BUCKET, "Using S3 media store");
        let store = AmazonS3Builder::new()
            .with_endpoint(format!("http://{host}:{}", *constants::S3_PORT))
            .with_bucket_name(constants::S3_BUCKET.as_str())
            .with_access_key_id(constants::S3_ACCESS_KEY.as_str())
            .with_secret_access_key(constants::S3_SECRET_KEY.as_str())
            .with_allow_http(true)
            .build()?;
        Ok(Arc::new(store))
    } else {
        let root = constants::MEDIA_ROOT.as_str();
        std::fs::create_dir_all(root).map_err(|err| object_store::Error::Generic {
            store: "LocalFileSystem",
            source: Box::new(err),
        })?;
        info!(%root, "Using local media store");
        Ok(Arc::new(LocalFileSystem::new_with_prefix(root)?))
    }
}

/// The content-addressed path an image is stored at.
fn image_path(image: &[u8], file_type: ImageFileType) -> String {
    let hash = Sha256::digest(image);
    format!("{PHOTO_PREFIX}/{hash:x}.{}", file_type.extension())
}

/// Validate and store an image, returning the path it is stored at.
pub async fn store_image(
    store: &MediaStore,
    image: Vec<u8>,
) -> Result<String, errors::StoreImageError> {
    if image.len() > constants::MAX_PHOTO_SIZE {
        return Err(errors::StoreImageError::TooLarge);
    }
    let file_type =
        ImageFileType::from_bytes(&image).ok_or(errors::StoreImageError::InvalidFileType)?;
    let object_path = image_path(&image, file_type);
    // object_store will upsert by default, and since we use hashes, this will implicitely
    // dedup image storage.
    store
        .put(&Path::from(object_path.as_str()), PutPayload::from(image))
        .await
        .map_err(errors::StorageError::from)?;
    Ok(object_path)
}

/// Fetch a stored image along with its type.
pub async fn load_image(
    store: &MediaStore,
    path: &str,
) -> Result<(ImageFileType, Vec<u8>), errors::LoadImageError> {
    let file_type = ImageFileType::from_path(path).ok_or(errors::LoadImageError::NotAnImage)?;
    let result = match store.get(&Path::from(path)).await {
        Ok(result) => result,
        Err(object_store::Error::NotFound { .. }) => return Err(errors::LoadImageError::NotFound),
        Err(err) => return Err(errors::StorageError::from(err).into()),
    };
    let bytes = result.bytes().await.map_err(errors::StorageError::from)?;
    Ok((file_type, bytes.to_vec()))
}

pub mod errors {
    use thiserror::Error;
    #[derive(Debug, Error)]
    pub enum StoreImageError {
        #[error("Image is of invalid file type")]
        InvalidFileType,
        #[error("Image is too large")]
        TooLarge,
        #[error(transparent)]
        StorageError(#[from] StorageError),
    }

    #[derive(Debug, Error)]
    pub enum LoadImageError {
        #[error("Image does not exist")]
        NotFound,
        #[error("Stored path is not an image")]
        NotAnImage,
        #[error(transparent)]
        StorageError(#[from] StorageError),
    }

    #[derive(Debug, Error)]
    #[error(transparent)]
    pub struct StorageError(#[from] object_store::Error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    const PNG_HEADER: [u8; 8] = [0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a];

    fn memory_store() -> MediaStore {
        Arc::new(InMemory::new())
    }

    #[test]
    fn detects_supported_image_types() {
        assert_eq!(ImageFileType::from_bytes(&PNG_HEADER), Some(ImageFileType::Png));
        assert_eq!(
            ImageFileType::from_bytes(&[0xff, 0xd8, 0xff, 0xe0, 0, 0x10]),
            Some(ImageFileType::Jpg)
        );
        assert_eq!(ImageFileType::from_bytes(b"GIF89a..."), Some(ImageFileType::Gif));
        assert_eq!(
            ImageFileType::from_bytes(b"RIFF\x24\0\0\0WEBPVP8 "),
            Some(ImageFileType::Webp)
        );
        assert_eq!(ImageFileType::from_bytes(b"%PDF-1.7"), None);
        assert_eq!(ImageFileType::from_bytes(&[]), None);
    }

    #[test]
    fn path_extension_round_trips() {
        for file_type in [
            ImageFileType::Png,
            ImageFileType::Jpg,
            ImageFileType::Gif,
            ImageFileType::Webp,
        ] {
            let path = format!("photos/abc.{}", file_type.extension());
            assert_eq!(ImageFileType::from_path(&path), Some(file_type));
        }
        assert_eq!(ImageFileType::from_path("photos/abc"), None);
    }

    #[tokio::test]
    async fn identical_images_share_a_path() {
        let store = memory_store();
        let mut image = PNG_HEADER.to_vec();
        image.extend_from_slice(b"pixels");
        let first = store_image(&store, image.clone()).await.unwrap();
        let second = store_image(&store, image.clone()).await.unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("photos/") && first.ends_with(".png"));

        let (file_type, bytes) = load_image(&store, &first).await.unwrap();
        assert_eq!(file_type, ImageFileType::Png);
        assert_eq!(bytes, image);
    }

    #[tokio::test]
    async fn rejects_non_images_and_oversized_uploads() {
        let store = memory_store();
        assert!(matches!(
            store_image(&store, b"just text".to_vec()).await,
            Err(errors::StoreImageError::InvalidFileType)
        ));
        let mut huge = PNG_HEADER.to_vec();
        huge.resize(constants::MAX_PHOTO_SIZE + 1, 0);
        assert!(matches!(
            store_image(&store, huge).await,
            Err(errors::StoreImageError::TooLarge)
        ));
    }

    #[tokio::test]
    async fn missing_images_are_not_found() {
        let store = memory_store();
        assert!(matches!(
            load_image(&store, "photos/missing.png").await,
            Err(errors::LoadImageError::NotFound)
        ));
    }
}

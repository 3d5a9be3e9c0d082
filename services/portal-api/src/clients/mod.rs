pub mod playlist;
pub mod storage;

pub use playlist::{PlaylistClient, PlaylistMetadata};
pub use storage::{StorageClient, StoredFile};

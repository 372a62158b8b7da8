use async_trait::async_trait;

use crate::{Comment, CommentId, Error, NewComment};

/// The four calls of the comments REST contract
#[async_trait]
pub trait Backend: Send + Sync {
    async fn list(&self) -> Result<Vec<Comment>, Error>;

    /// Returns the stored record if the server sends it back
    async fn create(&self, c: &NewComment) -> Result<Option<Comment>, Error>;

    async fn update(&self, id: &CommentId, c: &NewComment) -> Result<Option<Comment>, Error>;

    async fn delete(&self, id: &CommentId) -> Result<(), Error>;
}

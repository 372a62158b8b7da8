use std::sync::Arc;

use chrono::Utc;
use commentbox_api::{Comment, CommentId, Error, NewComment};
use tokio::sync::Mutex;

mod backend;
pub use backend::MockBackend;

mod router;
pub use router::{router, spawn};

pub type Shared = Arc<Mutex<MockServer>>;

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum MockError {
    #[error("comment {0} not found")]
    NotFound(CommentId),

    #[error("{0}")]
    Invalid(Error),

    #[error("{0}")]
    Injected(String),
}

impl MockError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            MockError::NotFound(_) => StatusCode::NOT_FOUND,
            MockError::Invalid(_) => StatusCode::BAD_REQUEST,
            MockError::Injected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MockError> for Error {
    fn from(e: MockError) -> Error {
        match e {
            MockError::Invalid(e) => e,
            e => Error::new(e.to_string()),
        }
    }
}

/// In-memory comments server, storing comments in insertion order
#[derive(Debug, Default)]
pub struct MockServer {
    comments: Vec<Comment>,
    next_id: u64,
    failure: Option<String>,
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer::default()
    }

    pub fn shared(self) -> Shared {
        Arc::new(Mutex::new(self))
    }

    /// While set, every call fails with this message
    pub fn fail_with(&mut self, failure: Option<String>) {
        self.failure = failure;
    }

    pub fn is_failing(&self) -> bool {
        self.failure.is_some()
    }

    fn check_failure(&self) -> Result<(), MockError> {
        match &self.failure {
            Some(msg) => Err(MockError::Injected(msg.clone())),
            None => Ok(()),
        }
    }

    fn find_mut(&mut self, id: &CommentId) -> Result<&mut Comment, MockError> {
        self.comments
            .iter_mut()
            .find(|c| c.id == *id)
            .ok_or_else(|| MockError::NotFound(id.clone()))
    }

    pub fn list(&self) -> Result<Vec<Comment>, MockError> {
        self.check_failure()?;
        Ok(self.comments.clone())
    }

    pub fn create(&mut self, c: NewComment) -> Result<Comment, MockError> {
        self.check_failure()?;
        c.validate().map_err(MockError::Invalid)?;
        self.next_id += 1;
        let now = Utc::now();
        let comment = Comment {
            id: CommentId(format!("{:024x}", self.next_id)),
            author: c.author,
            text: c.text,
            created_at: now,
            updated_at: now,
        };
        self.comments.push(comment.clone());
        Ok(comment)
    }

    pub fn update(&mut self, id: &CommentId, c: NewComment) -> Result<Comment, MockError> {
        self.check_failure()?;
        c.validate().map_err(MockError::Invalid)?;
        let comment = self.find_mut(id)?;
        comment.author = c.author;
        comment.text = c.text;
        comment.updated_at = Utc::now();
        Ok(comment.clone())
    }

    pub fn delete(&mut self, id: &CommentId) -> Result<(), MockError> {
        self.check_failure()?;
        let idx = self
            .comments
            .iter()
            .position(|c| c.id == *id)
            .ok_or_else(|| MockError::NotFound(id.clone()))?;
        self.comments.remove(idx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crud() {
        let mut m = MockServer::new();
        let a = m.create(NewComment::new("Ann", "hello")).unwrap();
        let b = m.create(NewComment::new("Bo", "hi")).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(m.list().unwrap(), vec![a.clone(), b.clone()]);

        let a2 = m.update(&a.id, NewComment::new("Ann", "edited")).unwrap();
        assert_eq!(a2.text, "edited");
        assert!(a2.updated_at >= a.updated_at);
        assert_eq!(m.list().unwrap()[0], a2);

        m.delete(&a.id).unwrap();
        assert_eq!(m.list().unwrap(), vec![b]);
        assert_eq!(m.delete(&a.id), Err(MockError::NotFound(a.id.clone())));
    }

    #[test]
    fn rejects_empty_fields() {
        let mut m = MockServer::new();
        assert_eq!(
            m.create(NewComment::new("", "hello")).map_err(Error::from),
            Err(Error::new("author must not be empty")),
        );
        assert!(m.list().unwrap().is_empty());
    }

    #[test]
    fn injected_failure() {
        let mut m = MockServer::new();
        m.fail_with(Some(String::from("db down")));
        assert_eq!(m.list(), Err(MockError::Injected(String::from("db down"))));
        assert!(m.create(NewComment::new("Ann", "hello")).is_err());
        m.fail_with(None);
        assert!(m.list().unwrap().is_empty());
    }
}

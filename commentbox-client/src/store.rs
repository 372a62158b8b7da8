use std::collections::HashMap;

use chrono::Utc;

use crate::{
    api::{Backend, Comment, CommentId, Error, NewComment},
    Draft,
};

/// How optimistic mutations get reconciled with what the server answers
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Consistency {
    /// Failed mutations are not rolled back, placeholders are never replaced
    /// and refresh responses are applied in arrival order
    Reference,

    /// Failed mutations are rolled back, confirmed creations replace their
    /// placeholder and out-of-date refresh responses are dropped
    #[default]
    Reconciling,
}

/// Identifies one in-flight mutation
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct OpToken(pub u64);

/// A call the store wants sent to the server
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Request {
    List {
        seq: u64,
    },
    Create {
        token: OpToken,
        body: NewComment,
    },
    Update {
        token: OpToken,
        id: CommentId,
        body: NewComment,
    },
    Delete {
        token: OpToken,
        id: CommentId,
    },
}

/// The server's answer to a `Request`
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Response {
    Listed {
        seq: u64,
        res: Result<Vec<Comment>, Error>,
    },
    Created {
        token: OpToken,
        res: Result<Option<Comment>, Error>,
    },
    Updated {
        token: OpToken,
        res: Result<Option<Comment>, Error>,
    },
    Deleted {
        token: OpToken,
        res: Result<(), Error>,
    },
}

impl Request {
    pub async fn execute<B: Backend + ?Sized>(self, backend: &B) -> Response {
        match self {
            Request::List { seq } => Response::Listed {
                seq,
                res: backend.list().await,
            },
            Request::Create { token, body } => Response::Created {
                token,
                res: backend.create(&body).await,
            },
            Request::Update { token, id, body } => Response::Updated {
                token,
                res: backend.update(&id, &body).await,
            },
            Request::Delete { token, id } => Response::Deleted {
                token,
                res: backend.delete(&id).await,
            },
        }
    }
}

/// What to undo or reconcile once a mutation's answer comes back
#[derive(Clone, Debug)]
enum Pending {
    Insert(CommentId),
    Update,
    Remove { index: usize, comment: Comment },
}

/// Local view of the comment list, and the form bound to it
///
/// The store never talks to the network itself: every operation returns the
/// `Request` to send, and the matching `Response` is fed back through
/// `handle`. All mutations thus happen one at a time, in whatever order the
/// answers arrive.
#[derive(Debug)]
pub struct Store {
    consistency: Consistency,
    items: Vec<Comment>,
    draft: Draft,
    last_error: Option<String>,
    next_token: u64,
    pending: HashMap<OpToken, Pending>,
    latest_refresh: u64,
}

impl Store {
    pub fn new(consistency: Consistency) -> Store {
        Store {
            consistency,
            items: Vec::new(),
            draft: Draft::default(),
            last_error: None,
            next_token: 0,
            pending: HashMap::new(),
            latest_refresh: 0,
        }
    }

    pub fn consistency(&self) -> Consistency {
        self.consistency
    }

    pub fn items(&self) -> &[Comment] {
        &self.items
    }

    pub fn get(&self, id: &CommentId) -> Option<&Comment> {
        self.items.iter().find(|c| c.id == *id)
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Number of mutations still waiting for their answer
    pub fn num_pending(&self) -> usize {
        self.pending.len()
    }

    pub fn set_author(&mut self, author: String) {
        self.draft.author = author;
    }

    pub fn set_text(&mut self, text: String) {
        self.draft.text = text;
    }

    pub fn cancel_edit(&mut self) {
        self.draft.clear();
    }

    fn new_token(&mut self, p: Pending) -> OpToken {
        let token = OpToken(self.next_token);
        self.next_token += 1;
        self.pending.insert(token, p);
        token
    }

    pub fn refresh(&mut self) -> Request {
        self.latest_refresh += 1;
        Request::List {
            seq: self.latest_refresh,
        }
    }

    pub fn create(&mut self, author: &str, text: &str) -> Option<Request> {
        if author.is_empty() || text.is_empty() {
            return None;
        }
        let c = Comment::placeholder(String::from(author), String::from(text), Utc::now());
        let token = self.new_token(Pending::Insert(c.id.clone()));
        tracing::debug!(id = %c.id, ?token, "optimistically inserted comment");
        self.items.push(c);
        Some(Request::Create {
            token,
            body: NewComment::new(author, text),
        })
    }

    /// Only valid while editing, the displayed comment is left as-is until confirmed
    pub fn update(&mut self, id: CommentId, author: &str, text: &str) -> Option<Request> {
        if self.draft.editing.is_none() || author.is_empty() || text.is_empty() {
            return None;
        }
        let token = self.new_token(Pending::Update);
        Some(Request::Update {
            token,
            id,
            body: NewComment::new(author, text),
        })
    }

    pub fn delete(&mut self, id: &CommentId) -> Option<Request> {
        let index = self.items.iter().position(|c| c.id == *id)?;
        let comment = self.items.remove(index);
        let token = self.new_token(Pending::Remove { index, comment });
        tracing::debug!(%id, ?token, "optimistically removed comment");
        Some(Request::Delete {
            token,
            id: id.clone(),
        })
    }

    /// Returns whether the comment was found
    pub fn begin_edit(&mut self, id: &CommentId) -> bool {
        let c = match self.items.iter().find(|c| c.id == *id) {
            Some(c) => c,
            None => return false,
        };
        self.draft = Draft {
            author: c.author.clone(),
            text: c.text.clone(),
            editing: Some(id.clone()),
        };
        true
    }

    /// Form submission: updates the edited comment, or creates a new one
    ///
    /// Incomplete drafts are ignored without surfacing any error.
    pub fn submit(&mut self) -> Option<Request> {
        if !self.draft.is_complete() {
            return None;
        }
        let NewComment { author, text } = self.draft.to_new_comment();
        match self.draft.editing.clone() {
            Some(id) => self.update(id, &author, &text),
            None => self.create(&author, &text),
        }
    }

    /// Returns whether the displayed error changed
    fn fail(&mut self, what: &str, err: Error) -> bool {
        tracing::warn!(%err, "{what} failed");
        let msg = err.into_message();
        let changed = self.last_error.as_deref() != Some(msg.as_str());
        self.last_error = Some(msg);
        changed
    }

    fn clear_error(&mut self) -> bool {
        self.last_error.take().is_some()
    }

    /// Apply a server answer, returns whether anything visible changed
    pub fn handle(&mut self, resp: Response) -> bool {
        match resp {
            Response::Listed { seq, res } => self.handle_listed(seq, res),
            Response::Created { token, res } => {
                let pending = self.pending.remove(&token);
                self.handle_created(pending, res)
            }
            Response::Updated { token, res } => {
                self.pending.remove(&token);
                self.handle_updated(res)
            }
            Response::Deleted { token, res } => {
                let pending = self.pending.remove(&token);
                self.handle_deleted(pending, res)
            }
        }
    }

    fn reconciling(&self) -> bool {
        self.consistency == Consistency::Reconciling
    }

    fn handle_listed(&mut self, seq: u64, res: Result<Vec<Comment>, Error>) -> bool {
        if self.reconciling() && seq != self.latest_refresh {
            tracing::debug!(seq, latest = self.latest_refresh, "dropping stale refresh");
            return false;
        }
        match res {
            Ok(items) => {
                let changed = self.items != items;
                self.items = items;
                self.clear_error() || changed
            }
            Err(e) => self.fail("refresh", e),
        }
    }

    fn handle_created(
        &mut self,
        pending: Option<Pending>,
        res: Result<Option<Comment>, Error>,
    ) -> bool {
        let placeholder = match pending {
            Some(Pending::Insert(id)) => Some(id),
            _ => None,
        };
        match res {
            Ok(record) => {
                let mut changed = !self.draft.author.is_empty() || !self.draft.text.is_empty();
                self.draft.clear_fields();
                changed |= self.clear_error();
                if let (true, Some(placeholder), Some(record)) =
                    (self.reconciling(), placeholder, record)
                {
                    changed |= self.replace_placeholder(&placeholder, record);
                }
                changed
            }
            Err(e) => {
                let mut changed = false;
                if let (true, Some(placeholder)) = (self.reconciling(), placeholder) {
                    let before = self.items.len();
                    self.items.retain(|c| c.id != placeholder);
                    changed = self.items.len() != before;
                }
                self.fail("create", e) || changed
            }
        }
    }

    fn replace_placeholder(&mut self, placeholder: &CommentId, record: Comment) -> bool {
        let pos = match self.items.iter().position(|c| c.id == *placeholder) {
            Some(pos) => pos,
            // a refresh already swapped the list out
            None => return false,
        };
        if self.items.iter().any(|c| c.id == record.id) {
            self.items.remove(pos);
        } else {
            self.items[pos] = record;
        }
        true
    }

    fn handle_updated(&mut self, res: Result<Option<Comment>, Error>) -> bool {
        match res {
            Ok(record) => {
                let mut changed = self.draft != Draft::default();
                self.draft.clear();
                changed |= self.clear_error();
                if let (true, Some(record)) = (self.reconciling(), record) {
                    if let Some(c) = self.items.iter_mut().find(|c| c.id == record.id) {
                        changed |= *c != record;
                        *c = record;
                    }
                }
                changed
            }
            Err(e) => self.fail("update", e),
        }
    }

    fn handle_deleted(&mut self, pending: Option<Pending>, res: Result<(), Error>) -> bool {
        match res {
            Ok(()) => self.clear_error(),
            Err(e) => {
                let mut changed = false;
                if let (true, Some(Pending::Remove { index, comment })) =
                    (self.reconciling(), pending)
                {
                    if !self.items.iter().any(|c| c.id == comment.id) {
                        let index = index.min(self.items.len());
                        self.items.insert(index, comment);
                        changed = true;
                    }
                }
                self.fail("delete", e) || changed
            }
        }
    }
}

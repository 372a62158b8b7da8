use crate::api::{CommentId, NewComment};

/// Form state shared by the create and the update flows
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Draft {
    pub author: String,
    pub text: String,

    /// Set while the form edits an existing comment, submission then updates it
    pub editing: Option<CommentId>,
}

impl Draft {
    pub fn is_complete(&self) -> bool {
        !self.author.is_empty() && !self.text.is_empty()
    }

    pub fn to_new_comment(&self) -> NewComment {
        NewComment::new(self.author.clone(), self.text.clone())
    }

    pub fn clear_fields(&mut self) {
        self.author.clear();
        self.text.clear();
    }

    pub fn clear(&mut self) {
        self.clear_fields();
        self.editing = None;
    }
}

mod comment_box;
pub use comment_box::{CommentBox, Msg, Poller};

mod config;
pub use config::{Config, DEFAULT_POLL_INTERVAL};

mod draft;
pub use draft::Draft;

mod http;
pub use http::HttpBackend;

pub mod render;

mod store;
pub use store::{Consistency, OpToken, Request, Response, Store};

mod fuzz;

pub mod api {
    pub use commentbox_api::*;
}

use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Context};
use chrono::Utc;
use commentbox_client::{
    api::{Backend, Comment, CommentId, NewComment},
    render, CommentBox, Config, Consistency, HttpBackend, Store,
};

#[derive(structopt::StructOpt)]
struct Opt {
    /// Server root, defaults to the COMMENTBOX_HOST environment variable
    #[structopt(short, long)]
    host: Option<String>,

    /// Render comment bodies from markdown to html
    #[structopt(long)]
    html: bool,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// List all comments
    List,

    /// Post a new comment
    Create { author: String, text: String },

    /// Replace the author and text of a comment
    Update {
        id: String,
        author: String,
        text: String,
    },

    /// Delete a comment
    Delete { id: String },

    /// Poll the server and print the list each time it changes
    Watch {
        #[structopt(long, default_value = "2000")]
        poll_interval_ms: u64,

        /// Keep failed optimistic changes and apply refreshes in arrival order
        #[structopt(long)]
        reference: bool,
    },
}

fn host(opt: &Opt) -> anyhow::Result<String> {
    match &opt.host {
        Some(h) => Ok(h.clone()),
        None => std::env::var("COMMENTBOX_HOST")
            .context("no --host given, and retrieving COMMENTBOX_HOST environment variable"),
    }
}

fn print_comment(c: &Comment, html: bool) {
    let body = match html {
        true => render::render_markdown_to_html(&c.text),
        false => c.text.clone(),
    };
    println!(
        "{} [{}] {}: {}",
        c.id,
        render::comment_age(c, Utc::now()),
        c.author,
        body.trim_end()
    );
}

fn print_store(store: &Store, html: bool) {
    println!("--- {} comments", store.items().len());
    for c in store.items() {
        print_comment(c, html);
    }
    if let Some(err) = store.last_error() {
        println!("error: {err}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opt = <Opt as structopt::StructOpt>::from_args();
    let backend = HttpBackend::new(host(&opt)?);
    tracing::debug!(host = backend.host(), "using comments server");

    match opt.cmd {
        Command::List => {
            for c in backend.list().await.context("listing comments")? {
                print_comment(&c, opt.html);
            }
        }
        Command::Create { author, text } => {
            let c = NewComment::new(author, text);
            c.validate().context("validating comment")?;
            match backend.create(&c).await.context("creating comment")? {
                Some(c) => print_comment(&c, opt.html),
                None => println!("created"),
            }
        }
        Command::Update { id, author, text } => {
            let c = NewComment::new(author, text);
            c.validate().context("validating comment")?;
            match backend
                .update(&CommentId(id), &c)
                .await
                .context("updating comment")?
            {
                Some(c) => print_comment(&c, opt.html),
                None => println!("updated"),
            }
        }
        Command::Delete { id } => {
            backend
                .delete(&CommentId(id))
                .await
                .context("deleting comment")?;
        }
        Command::Watch {
            poll_interval_ms,
            reference,
        } => {
            if poll_interval_ms == 0 {
                return Err(anyhow!("poll interval must be positive"));
            }
            let config = Config {
                poll_interval: Duration::from_millis(poll_interval_ms),
                consistency: match reference {
                    true => Consistency::Reference,
                    false => Consistency::Reconciling,
                },
            };
            let mut cb = CommentBox::mount(Arc::new(backend), &config);
            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);
            loop {
                tokio::select! {
                    res = &mut ctrl_c => {
                        res.context("waiting for ctrl-c")?;
                        tracing::info!("interrupted, stopping");
                        break;
                    }
                    changed = cb.next() => {
                        if changed {
                            print_store(cb.store(), opt.html);
                        }
                    }
                }
            }
            cb.teardown();
        }
    }

    Ok(())
}

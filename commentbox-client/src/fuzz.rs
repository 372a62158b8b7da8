#![cfg(test)]

use std::collections::HashSet;

use bolero::generator::TypeGenerator;

use commentbox_mock_server::MockServer;

use crate::{
    api::{CommentId, Error},
    Consistency, Request, Response, Store,
};

#[derive(Clone, Debug, bolero::generator::TypeGenerator)]
enum FuzzOp {
    Refresh,
    Create {
        #[generator(bolero::generator::gen_with::<String>().len(0..4usize))]
        author: String,
        #[generator(bolero::generator::gen_with::<String>().len(0..4usize))]
        text: String,
    },
    SetDraft {
        #[generator(bolero::generator::gen_with::<String>().len(0..4usize))]
        author: String,
        #[generator(bolero::generator::gen_with::<String>().len(0..4usize))]
        text: String,
    },
    BeginEdit {
        idx: usize,
    },
    Submit,
    Delete {
        idx: usize,
    },
    /// Let the server process one in-flight request, in any order
    Deliver {
        idx: usize,
    },
    ToggleServerFailure,
}

fn execute_on_mock(mock: &mut MockServer, req: Request) -> Response {
    match req {
        Request::List { seq } => Response::Listed {
            seq,
            res: mock.list().map_err(Error::from),
        },
        Request::Create { token, body } => Response::Created {
            token,
            res: mock.create(body).map(Some).map_err(Error::from),
        },
        Request::Update { token, id, body } => Response::Updated {
            token,
            res: mock.update(&id, body).map(Some).map_err(Error::from),
        },
        Request::Delete { token, id } => Response::Deleted {
            token,
            res: mock.delete(&id).map_err(Error::from),
        },
    }
}

struct Harness {
    store: Store,
    mock: MockServer,
    in_flight: Vec<Request>,
}

impl Harness {
    fn new(consistency: Consistency) -> Harness {
        Harness {
            store: Store::new(consistency),
            mock: MockServer::new(),
            in_flight: Vec::new(),
        }
    }

    fn item_id(&self, idx: usize) -> Option<CommentId> {
        let items = self.store.items();
        match items.is_empty() {
            true => None,
            false => Some(items[idx % items.len()].id.clone()),
        }
    }

    fn send(&mut self, req: Option<Request>) {
        self.in_flight.extend(req);
    }

    fn deliver(&mut self, idx: usize) {
        if self.in_flight.is_empty() {
            return;
        }
        let req = self.in_flight.remove(idx % self.in_flight.len());
        let resp = execute_on_mock(&mut self.mock, req);
        self.store.handle(resp);
    }

    fn execute(&mut self, op: FuzzOp) {
        match op {
            FuzzOp::Refresh => {
                let req = self.store.refresh();
                self.send(Some(req));
            }
            FuzzOp::Create { author, text } => {
                let before = self.store.items().len();
                let req = self.store.create(&author, &text);
                if author.is_empty() || text.is_empty() {
                    assert_eq!(req, None);
                    assert_eq!(self.store.items().len(), before);
                }
                self.send(req);
            }
            FuzzOp::SetDraft { author, text } => {
                self.store.set_author(author);
                self.store.set_text(text);
            }
            FuzzOp::BeginEdit { idx } => {
                if let Some(id) = self.item_id(idx) {
                    assert!(self.store.begin_edit(&id));
                }
            }
            FuzzOp::Submit => {
                let req = self.store.submit();
                self.send(req);
            }
            FuzzOp::Delete { idx } => {
                if let Some(id) = self.item_id(idx) {
                    let req = self.store.delete(&id);
                    assert!(req.is_some());
                    assert!(self.store.get(&id).is_none());
                    self.send(req);
                }
            }
            FuzzOp::Deliver { idx } => self.deliver(idx),
            FuzzOp::ToggleServerFailure => {
                let failing = self.mock.is_failing();
                self.mock
                    .fail_with((!failing).then(|| String::from("injected failure")));
            }
        }
        let mut seen = HashSet::new();
        for c in self.store.items() {
            assert!(seen.insert(c.id.clone()), "duplicate comment id {}", c.id);
        }
    }

    fn converge(&mut self) {
        while !self.in_flight.is_empty() {
            self.deliver(0);
        }
        self.mock.fail_with(None);
        let req = self.store.refresh();
        self.send(Some(req));
        self.deliver(0);
        assert_eq!(self.store.items(), &self.mock.list().unwrap()[..]);
        assert_eq!(self.store.last_error(), None);
        assert_eq!(self.store.num_pending(), 0);
    }
}

macro_rules! do_fuzz_test {
    ( $name:ident, $consistency:expr ) => {
        #[test]
        fn $name() {
            bolero::check!()
                .with_generator(bolero::generator::gen_with::<Vec<FuzzOp>>().len(1..100usize))
                .cloned()
                .for_each(|ops: Vec<FuzzOp>| {
                    let mut h = Harness::new($consistency);
                    for op in ops {
                        h.execute(op);
                    }
                    h.converge();
                })
        }
    };
}

do_fuzz_test!(reference_store_converges, Consistency::Reference);
do_fuzz_test!(reconciling_store_converges, Consistency::Reconciling);

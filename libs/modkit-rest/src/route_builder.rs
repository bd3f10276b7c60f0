use crate::client::ClientInner;
use crate::route::Route;
use crate::url::{Query, Url};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

#[derive(Default)]
struct Node {
    children: HashMap<String, Node>,
    route: Option<Arc<Route>>,
}

/// Segment trie caching one [`Route`] per distinct path.
///
/// Entries are never evicted; the cache lives as long as its client.
pub(crate) struct RouteBuilder {
    root: Mutex<Node>,
    client: Weak<ClientInner>,
    /// Base URL query seeded into every new route
    inherited: Query,
}

impl RouteBuilder {
    pub(crate) fn new(client: Weak<ClientInner>, inherited: Query) -> Self {
        Self {
            root: Mutex::new(Node::default()),
            client,
            inherited,
        }
    }

    /// Cached or new route for `url`'s segments.
    ///
    /// A new route starts with the base URL query as default params. `url`'s
    /// own query pairs are then merged in and win on key conflicts.
    pub(crate) fn resolve(&self, url: &Url) -> Arc<Route> {
        let route = {
            let mut root = self.root.lock();
            let node = url
                .segments()
                .iter()
                .fold(&mut *root, |node, segment| {
                    node.children.entry(segment.clone()).or_default()
                });

            match &node.route {
                Some(route) => Arc::clone(route),
                None => {
                    let route = Arc::new(Route::new(url.without_query(), self.client.clone()));
                    if !self.inherited.is_empty() {
                        route.add_params(self.inherited.clone());
                    }
                    tracing::trace!(url = %route, "Created route");
                    node.route = Some(Arc::clone(&route));
                    route
                }
            }
        };

        if !url.query().is_empty() {
            route.add_params(url.query().clone());
        }
        route
    }

    /// Number of cached routes
    pub(crate) fn len(&self) -> usize {
        fn count(node: &Node) -> usize {
            usize::from(node.route.is_some()) + node.children.values().map(count).sum::<usize>()
        }
        count(&self.root.lock())
    }
}

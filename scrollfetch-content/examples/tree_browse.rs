// Example: browse a two-level tree with expand and collapse.
use std::rc::Rc;

use scrollfetch::{FetchError, IteratorPage, PageFuture, PagedIterator};
use scrollfetch_content::{
    ContentCoordinator, ContentOptions, DataProvider, FetchOptions, RowKey, RowMetadata,
    TreeContentCoordinator,
};
use serde_json::json;

struct ListProvider {
    rows: Vec<(RowKey, String)>,
    children: Vec<(RowKey, Rc<ListProvider>)>,
}

impl ListProvider {
    fn new(rows: &[(&str, &str)]) -> Rc<Self> {
        Rc::new(Self {
            rows: rows
                .iter()
                .map(|(k, d)| (json!(k), d.to_string()))
                .collect(),
            children: Vec::new(),
        })
    }
}

struct ListIterator {
    rows: Vec<(RowKey, String)>,
    served: bool,
}

impl PagedIterator<String, RowMetadata> for ListIterator {
    fn next(&mut self) -> PageFuture<'_, String, RowMetadata> {
        let page = if self.served {
            IteratorPage::finished()
        } else {
            self.served = true;
            IteratorPage {
                done: true,
                data: self.rows.iter().map(|(_, d)| d.clone()).collect(),
                metadata: self
                    .rows
                    .iter()
                    .map(|(k, _)| RowMetadata::new(k.clone()))
                    .collect(),
                max_count_limit: false,
            }
        };
        Box::pin(async move { Ok::<_, FetchError>(page) })
    }
}

impl DataProvider<String> for ListProvider {
    fn fetch_first(&self, _options: FetchOptions) -> Box<dyn PagedIterator<String, RowMetadata>> {
        Box::new(ListIterator {
            rows: self.rows.clone(),
            served: false,
        })
    }

    fn child_provider(&self, key: &RowKey) -> Option<Rc<dyn DataProvider<String>>> {
        self.children
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, p)| Rc::clone(p) as Rc<dyn DataProvider<String>>)
    }
}

fn print_rows(coordinator: &mut TreeContentCoordinator<String>) {
    for row in coordinator.render().rows {
        let indent = "  ".repeat(row.metadata.tree_depth);
        let marker = if row.metadata.is_leaf {
            " "
        } else if row.metadata.expanded {
            "-"
        } else {
            "+"
        };
        println!("{indent}{marker} {}", row.data);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let crates = ListProvider::new(&[("engine", "engine/"), ("content", "content/")]);
    let mut root = ListProvider::new(&[("crates", "crates/"), ("readme", "README.md")]);
    Rc::get_mut(&mut root)
        .expect("unshared")
        .children
        .push((json!("crates"), crates));

    let options = ContentOptions::new().with_load_more_on_scroll(false);
    let mut coordinator = TreeContentCoordinator::new(root, options);
    coordinator.fetch_rows().await.expect("fetch");

    println!("collapsed:");
    print_rows(&mut coordinator);

    coordinator.expand(&json!("crates")).await.expect("expand");
    println!("expanded:");
    print_rows(&mut coordinator);

    coordinator.collapse(&json!("crates"));
    println!("collapsed again:");
    print_rows(&mut coordinator);
}

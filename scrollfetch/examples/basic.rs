// Example: drive the scroller with synthetic scroll events.
use scrollfetch::{
    FetchError, IteratorPage, PageFuture, PagedIterator, ScrollerOptions, ViewportScroller,
};

struct Numbers {
    next: u32,
    total: u32,
    page: usize,
}

impl PagedIterator<u32, u32> for Numbers {
    fn next(&mut self) -> PageFuture<'_, u32, u32> {
        let start = self.next;
        let end = (start + self.page as u32).min(self.total);
        self.next = end;
        let done = end == self.total;
        Box::pin(async move {
            let data: Vec<u32> = (start..end).collect();
            let metadata = data.clone();
            Ok::<_, FetchError>(IteratorPage {
                done,
                data,
                metadata,
                max_count_limit: false,
            })
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let iterator = Numbers {
        next: 25,
        total: 200,
        page: 25,
    };
    let options = ScrollerOptions::new().with_initial_row_count(25);
    let mut scroller = ViewportScroller::new(Box::new(iterator), options);
    scroller.set_viewport_size(100);
    scroller.set_viewport_range(0, 500);

    // row height 20px: each fetched page adds 500px of scroll space
    let mut max_scroll_top = 500u64;
    for step in 1..=8 {
        let scroll_top = max_scroll_top.saturating_sub(1);
        let result = scroller.handle_scroll(scroll_top, max_scroll_top).await;
        println!(
            "step {step}: rows={} fetched={} status={:?}",
            scroller.row_count(),
            result.is_fetched(),
            scroller.status(),
        );
        max_scroll_top = scroller.row_count() as u64 * 20;
        scroller.set_viewport_range(0, max_scroll_top);
        if scroller.status().done {
            break;
        }
    }
}

//! Query command - filter, sort and page through the library.

use crate::app::App;
use crate::OutputFormat;
use folio_core::{
    CollectionId, Config, FilterCoordinator, Item, SortDirection, SortKey, SortSpec, ViewMode,
};
use serde::Serialize;
use std::time::Instant;

/// View options given on the command line.
#[derive(Debug, Default)]
pub struct QueryArgs {
    pub text: Option<String>,
    pub collection: Option<String>,
    pub sort: Option<SortKey>,
    pub desc: bool,
    pub page: Option<usize>,
    pub state: Option<String>,
}

#[derive(Serialize)]
struct QueryOutput<'a> {
    visible_count: usize,
    start: usize,
    page: Option<usize>,
    page_count: Option<usize>,
    state: String,
    items: Vec<&'a Item>,
}

/// Run the query command.
pub fn run(config: Config, args: QueryArgs, output: OutputFormat) -> anyhow::Result<()> {
    let app = App::new(config)?;

    let start = Instant::now();
    let view = build_view(&app, &args);
    let elapsed = start.elapsed();

    let window = view.window();
    let encoded = view.encoded_state();

    match output {
        OutputFormat::Text => {
            for (offset, item) in view.window_items().into_iter().enumerate() {
                println!("{:>5}. {}", window.start + offset + 1, summary_line(item));
            }

            eprintln!();
            if let Some(page) = window.page {
                eprintln!(
                    "{} matching records, page {} of {} ({:.3}ms)",
                    view.visible_count(),
                    page.page,
                    page.page_count.max(1),
                    elapsed.as_secs_f64() * 1000.0
                );
            } else {
                eprintln!(
                    "{} matching records, showing {}-{} ({:.3}ms)",
                    view.visible_count(),
                    window.start + 1,
                    window.start + window.items.len(),
                    elapsed.as_secs_f64() * 1000.0
                );
            }
            if !encoded.is_empty() {
                eprintln!("State: ?{}", encoded);
            }
        }
        OutputFormat::Json => {
            let out = QueryOutput {
                visible_count: view.visible_count(),
                start: window.start,
                page: window.page.map(|p| p.page),
                page_count: window.page.map(|p| p.page_count),
                state: encoded,
                items: view.window_items(),
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }

    Ok(())
}

/// Apply the shared state first, then the explicit options on top of it.
pub fn build_view(app: &App, args: &QueryArgs) -> FilterCoordinator {
    let mut view = app.coordinator();

    if let Some(ref encoded) = args.state {
        view.apply_encoded(encoded);
    }
    if let Some(ref collection) = args.collection {
        view.select_collection(Some(CollectionId::new(collection.as_str())));
    }
    if let Some(ref text) = args.text {
        view.set_search_text(text);
    }
    if args.sort.is_some() || args.desc {
        let current = view.state().sort;
        let direction = if args.desc {
            SortDirection::Desc
        } else {
            current.direction
        };
        view.set_sort(SortSpec::new(args.sort.unwrap_or(current.key), direction));
    }
    if let Some(page) = args.page {
        match view.mode() {
            ViewMode::Paged { .. } => {
                view.set_page(page);
            }
            // One page is one screenful in virtual mode
            ViewMode::Virtual(layout) => {
                let screens = page.saturating_sub(1) as u64;
                view.set_scroll_offset(screens * u64::from(layout.viewport_height));
            }
        }
    }

    view
}

/// One-line description of a record: title, year, authors and venue.
pub fn summary_line(item: &Item) -> String {
    let mut line = item.title.clone();
    if let Some(year) = item.year {
        line.push_str(&format!(" ({})", year));
    }

    let authors: Vec<&str> = item
        .authors
        .iter()
        .map(|a| a.display.as_str())
        .filter(|d| !d.is_empty())
        .collect();
    match authors.len() {
        0 => {}
        1 | 2 => line.push_str(&format!(" - {}", authors.join(", "))),
        _ => line.push_str(&format!(" - {} et al.", authors[0])),
    }

    if !item.venue.is_empty() {
        line.push_str(&format!(" [{}]", item.venue));
    }
    line
}

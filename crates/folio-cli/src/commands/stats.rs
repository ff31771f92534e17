//! Stats command - show dataset, hierarchy and index statistics.

use crate::app::App;
use folio_core::Config;

/// Run the stats command.
pub fn run(config: Config) -> anyhow::Result<()> {
    let app = App::new(config)?;

    let stats = app.store.stats();
    let index = app.index.stats();
    let mode = app.config.view_mode(stats.items);

    println!("Folio Library Status");
    println!("====================");
    println!();

    if app.store.is_empty() {
        println!("The item dataset is empty.");
    }

    println!("Records:");
    println!("  Items:               {}", stats.items);
    println!("  Unfiled items:       {}", stats.unfiled_items);
    if let Some(loaded) = stats.loaded_at {
        println!(
            "  Loaded at:           {}",
            loaded.format("%Y-%m-%d %H:%M:%S")
        );
    }

    println!();
    println!("Collections:");
    println!("  Collections:         {}", stats.collections);
    println!("  Roots:               {}", stats.roots);
    println!("  Max depth:           {}", stats.max_depth);
    println!("  With direct members: {}", stats.collections_with_items);
    let warning_marker = if stats.warnings == 0 { "✓" } else { "⚠" };
    println!("  Hierarchy warnings:  {} {}", stats.warnings, warning_marker);

    println!();
    println!("Search index:");
    println!("  Word tokens:         {}", index.words);
    println!("  Trigrams:            {}", index.trigrams);
    println!(
        "  Text volume:         {} bytes ({:.2} KB)",
        index.text_bytes,
        index.text_bytes as f64 / 1024.0
    );
    println!("  Build time:          {}ms", index.build_ms);

    println!();
    match mode {
        folio_core::ViewMode::Paged { page_size } => {
            println!("View mode: paged ({} per page)", page_size)
        }
        folio_core::ViewMode::Virtual(layout) => println!(
            "View mode: virtual (row {}px, viewport {}px, buffer {} rows)",
            layout.row_height, layout.viewport_height, layout.buffer_rows
        ),
    }

    // Show data directory
    println!("Data directory: {}", app.config.data_dir()?.display());

    Ok(())
}

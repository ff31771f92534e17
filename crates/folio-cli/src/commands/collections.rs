//! Collections command - print the collection tree.

use crate::app::App;
use folio_core::{CollectionForest, CollectionId, Config};

/// Run the collections command.
pub fn run(config: Config) -> anyhow::Result<()> {
    let app = App::new(config)?;
    let forest = app.store.forest();

    if forest.is_empty() {
        println!("No collections.");
        return Ok(());
    }

    for line in tree_lines(forest) {
        println!("{}", line);
    }

    let warnings = forest.warnings().len();
    if warnings > 0 {
        eprintln!();
        eprintln!("{} hierarchy warnings, run 'folio check' for details", warnings);
    }

    Ok(())
}

/// Render the forest as indented lines with recursive item counts.
pub fn tree_lines(forest: &CollectionForest) -> Vec<String> {
    let mut lines = Vec::new();
    for root in forest.roots() {
        for id in forest.subtree(root) {
            if let Some(line) = node_line(forest, &id) {
                lines.push(line);
            }
        }
    }
    lines
}

fn node_line(forest: &CollectionForest, id: &CollectionId) -> Option<String> {
    let node = forest.get(id)?;
    let indent = "  ".repeat(forest.depth(id).saturating_sub(1));
    Some(format!(
        "{}{} ({}) [{}]",
        indent,
        node.title,
        forest.item_count(id),
        node.id
    ))
}

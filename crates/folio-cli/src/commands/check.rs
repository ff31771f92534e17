//! Check command - report collection hierarchy problems.

use crate::app::App;
use folio_core::Config;

/// Run the check command. Fails when any problem was found.
pub fn run(config: Config) -> anyhow::Result<()> {
    let app = App::new(config)?;
    let warnings = app.store.forest().warnings();

    if warnings.is_empty() {
        println!(
            "✓ {} collections, {} items: no hierarchy problems",
            app.store.forest().len(),
            app.store.len()
        );
        return Ok(());
    }

    for warning in warnings {
        println!("⚠ {}", warning);
    }

    anyhow::bail!("{} hierarchy problems found", warnings.len())
}

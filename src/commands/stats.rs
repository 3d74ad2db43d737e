use anyhow::Result;
use tracing::{info, warn};

use crate::cli::StatsArgs;
use crate::store::{Store, TABLES};

pub fn run(args: StatsArgs) -> Result<()> {
    info!(db = %args.db.display(), "database statistics");
    let store = Store::open(&args.db)?;
    report_counts(&store);
    Ok(())
}

/// Log one count line per table; an absent table is reported, not fatal.
pub(crate) fn report_counts(store: &Store) {
    for (table, label) in TABLES {
        match store.table_count(table) {
            Ok(rows) => info!(table, label, rows, "table count"),
            Err(_) => warn!(table, label, "table not found"),
        }
    }
}

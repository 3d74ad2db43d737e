use anyhow::Result;
use tracing::info;

use crate::cli::InitArgs;
use crate::commands::stats;
use crate::store::Store;

pub fn run(args: InitArgs) -> Result<()> {
    info!(db = %args.db.display(), "initializing database");
    let store = Store::open(&args.db)?;
    stats::report_counts(&store);
    info!("schema ready");
    Ok(())
}

//! Cache command - manage the version cache

use crate::cache::VersionCache;
use crate::cli::args::{CacheAction, CacheArgs};
use crate::config::Config;
use crate::error::GoptResult;
use crate::factory::{cache_dir, open_file_cache};
use crate::ui::{self, UiContext};

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> GoptResult<()> {
    let ctx = UiContext::detect();

    match args.action {
        CacheAction::Path => println!("{}", cache_dir(config).display()),
        CacheAction::Clear => {
            let cache = open_file_cache(config).await?;
            let removed = cache.clear().await?;
            ui::step_ok_detail(
                &ctx,
                &format!("Removed {} cache entr{}", removed, plural_y(removed)),
                &cache.dir().display().to_string(),
            );
        }
        CacheAction::Gc => {
            let cache = open_file_cache(config).await?;
            let removed = cache.sweep().await?;
            ui::step_ok(
                &ctx,
                &format!("Removed {} expired cache entr{}", removed, plural_y(removed)),
            );
        }
    }

    Ok(())
}

fn plural_y(n: usize) -> &'static str {
    if n == 1 {
        "y"
    } else {
        "ies"
    }
}

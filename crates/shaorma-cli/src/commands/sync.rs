use anyhow::Result;
use shaorma_store::{Rejection, Session, SyncOutcome};

/// Print skipped records to stderr.
pub fn print_rejections(rejections: &[Rejection]) {
    for rejection in rejections {
        eprintln!("warning: skipped {}: {}", rejection.key, rejection.reason);
    }
}

/// Run a vendor sync (and optionally a lookup sync) and report the result.
pub async fn run(session: &Session, force: bool, lookups: bool) -> Result<()> {
    println!("Syncing vendors...");

    let outcome = session.refresh(force).await;

    if let Some(report) = outcome.report() {
        print_rejections(&report.rejections);
    }
    println!("{}", capitalize(&outcome.to_string()));

    if lookups {
        let report = session.refresh_lookups().await;
        println!(
            "Synced {} categories, {} subcategories, {} banners.",
            report.categories, report.subcategories, report.banners
        );
    }

    if !outcome.is_success() && !session.has_cached_data() {
        anyhow::bail!("sync failed and no cached vendors are available");
    }

    Ok(())
}

/// Non-forced sync before a read command. Only problems are printed.
pub async fn ensure_synced(session: &Session) {
    match session.refresh(false).await {
        SyncOutcome::Fresh => {}
        outcome if outcome.is_success() => eprintln!("{}", capitalize(&outcome.to_string())),
        outcome => eprintln!("warning: {outcome}"),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

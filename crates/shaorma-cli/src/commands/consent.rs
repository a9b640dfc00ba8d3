use anyhow::{Context, Result};
use shaorma::now_millis;
use shaorma_store::PreferenceStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ConsentAction {
    /// Show the current consent flags
    Status,
    /// Allow network use
    Grant,
    /// Withdraw consent; the prompt is not shown again
    Revoke,
    /// Forget every flag so the prompt is shown again
    Reset,
}

pub fn run(prefs: &PreferenceStore, action: ConsentAction, json: bool) -> Result<()> {
    match action {
        ConsentAction::Status => {}
        ConsentAction::Grant => prefs
            .grant_consent(now_millis())
            .context("failed to record consent")?,
        ConsentAction::Revoke => prefs.revoke_consent().context("failed to revoke consent")?,
        ConsentAction::Reset => prefs.reset_consent().context("failed to reset consent")?,
    }

    let given = prefs.has_consent()?;
    let asked = prefs.has_asked_for_consent()?;
    let since = prefs.consent_timestamp()?;

    if json {
        let value = serde_json::json!({
            "given": given,
            "asked": asked,
            "timestamp": since,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Consent: {}", if given { "given" } else { "not given" });
    println!("Asked:   {}", if asked { "yes" } else { "no" });
    if given && let Some(at) = since {
        let minutes = (now_millis() - at).max(0) / 60_000;
        println!("Since:   {minutes} min ago");
    }

    Ok(())
}

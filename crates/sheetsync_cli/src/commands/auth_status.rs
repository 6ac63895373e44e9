//! Auth status command implementation.

use super::open_existing;
use chrono::Utc;
use std::path::Path;

/// Runs the auth-status command.
pub fn run(path: &Path, spreadsheet_id: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_existing(path)?;

    match spreadsheet_id {
        Some(id) if !id.is_empty() => println!("Spreadsheet:   {id}"),
        _ => println!("Spreadsheet:   (not configured)"),
    }

    let Some(stored) = store.latest_token()? else {
        println!("Credential:    none, log in first");
        return Ok(());
    };

    let token = &stored.token;
    let expired = token.is_expired_at(Utc::now());
    println!("Account:       {}", stored.user_email);
    println!("Token type:    {}", token.token_type);
    match token.expiry {
        Some(expiry) => println!("Expiry:        {}", expiry.to_rfc3339()),
        None => println!("Expiry:        unknown"),
    }
    println!("Refreshable:   {}", !token.refresh_token.is_empty());
    println!(
        "Usable:        {}",
        if expired && token.refresh_token.is_empty() {
            "no, log in again"
        } else {
            "yes"
        }
    );

    Ok(())
}

//! Settings table access
//!
//! Holds the token signing secret when none is supplied by configuration.
//! The secret is generated once and reused across restarts so issued
//! tokens stay valid.

use rand::Rng;
use roster_common::Result;
use sqlx::SqlitePool;

const TOKEN_SECRET_KEY: &str = "token_secret";

/// Load the stored token secret, generating and storing one if missing
pub async fn load_or_create_token_secret(db: &SqlitePool) -> Result<String> {
    let existing: Option<(Option<String>,)> =
        sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(TOKEN_SECRET_KEY)
            .fetch_optional(db)
            .await?;

    if let Some((Some(secret),)) = existing {
        if !secret.is_empty() {
            return Ok(secret);
        }
    }

    initialize_token_secret(db).await
}

/// Generate a random 256-bit secret and store it
///
/// `INSERT OR IGNORE` keeps the first secret if two processes race here;
/// the stored value is read back so both use the same one.
async fn initialize_token_secret(db: &SqlitePool) -> Result<String> {
    let secret: String = {
        let mut rng = rand::thread_rng();
        (0..32).map(|_| format!("{:02x}", rng.gen::<u8>())).collect()
    };

    sqlx::query("DELETE FROM settings WHERE key = ? AND (value IS NULL OR value = '')")
        .bind(TOKEN_SECRET_KEY)
        .execute(db)
        .await?;

    sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
        .bind(TOKEN_SECRET_KEY)
        .bind(&secret)
        .execute(db)
        .await?;

    let stored: String = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(TOKEN_SECRET_KEY)
        .fetch_one(db)
        .await?;

    tracing::info!("Generated token signing secret");
    Ok(stored)
}

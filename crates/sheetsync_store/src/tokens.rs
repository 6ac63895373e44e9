//! OAuth token persistence.

use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

/// OAuth credentials for the mirror API.
#[derive(Debug, Clone, PartialEq)]
pub struct OAuthToken {
    /// Bearer token.
    pub access_token: String,
    /// Refresh token. Empty when the provider did not issue a new one.
    pub refresh_token: String,
    /// Token type, usually `Bearer`.
    pub token_type: String,
    /// Expiry instant. `None` means one hour from storage time.
    pub expiry: Option<DateTime<Utc>>,
}

impl OAuthToken {
    /// Returns true if the token is past its expiry at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry.map(|e| e <= now).unwrap_or(false)
    }
}

/// A token together with the account it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredToken {
    /// Account email.
    pub user_email: String,
    /// Stored credentials.
    pub token: OAuthToken,
}

pub(crate) fn upsert_token(
    conn: &Connection,
    user_email: &str,
    token: &OAuthToken,
    now: DateTime<Utc>,
) -> StoreResult<()> {
    let expiry = token.expiry.unwrap_or(now + Duration::hours(1));
    // An empty refresh token keeps the previously stored one.
    conn.execute(
        "INSERT INTO oauth_tokens (user_email, access_token, refresh_token, token_type, expiry, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(user_email) DO UPDATE SET
             access_token = excluded.access_token,
             refresh_token = CASE WHEN excluded.refresh_token != ''
                                  THEN excluded.refresh_token
                                  ELSE oauth_tokens.refresh_token END,
             token_type = excluded.token_type,
             expiry = excluded.expiry,
             updated_at = excluded.updated_at",
        params![
            user_email,
            token.access_token,
            token.refresh_token,
            token.token_type,
            expiry.to_rfc3339_opts(SecondsFormat::Micros, true),
            now.to_rfc3339_opts(SecondsFormat::Micros, true),
        ],
    )?;
    Ok(())
}

pub(crate) fn latest_token(conn: &Connection) -> StoreResult<Option<StoredToken>> {
    let row = conn
        .query_row(
            "SELECT user_email, access_token, refresh_token, token_type, expiry
             FROM oauth_tokens ORDER BY updated_at DESC, rowid DESC LIMIT 1",
            [],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )
        .optional()?;

    let Some((user_email, access_token, refresh_token, token_type, expiry)) = row else {
        return Ok(None);
    };
    let expiry = DateTime::parse_from_rfc3339(&expiry)
        .map_err(|e| StoreError::InvalidData(format!("token expiry {expiry:?}: {e}")))?
        .with_timezone(&Utc);

    Ok(Some(StoredToken {
        user_email,
        token: OAuthToken {
            access_token,
            refresh_token,
            token_type,
            expiry: Some(expiry),
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;

    fn token(access: &str, refresh: &str) -> OAuthToken {
        OAuthToken {
            access_token: access.into(),
            refresh_token: refresh.into(),
            token_type: "Bearer".into(),
            expiry: None,
        }
    }

    #[test]
    fn empty_refresh_keeps_previous() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let t0 = Utc::now();

        upsert_token(&conn, "ana@example.com", &token("a1", "r1"), t0).unwrap();
        upsert_token(
            &conn,
            "ana@example.com",
            &token("a2", ""),
            t0 + Duration::seconds(5),
        )
        .unwrap();

        let stored = latest_token(&conn).unwrap().unwrap();
        assert_eq!(stored.token.access_token, "a2");
        assert_eq!(stored.token.refresh_token, "r1");
        assert_eq!(
            stored.token.expiry.unwrap().timestamp(),
            (t0 + Duration::seconds(5) + Duration::hours(1)).timestamp()
        );
    }

    #[test]
    fn latest_is_most_recently_updated() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let t0 = Utc::now();

        upsert_token(&conn, "a@example.com", &token("a", "r"), t0).unwrap();
        upsert_token(&conn, "b@example.com", &token("b", "r"), t0 + Duration::seconds(1))
            .unwrap();
        assert_eq!(latest_token(&conn).unwrap().unwrap().user_email, "b@example.com");
    }

    #[test]
    fn no_token_is_none() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        assert!(latest_token(&conn).unwrap().is_none());
    }

    #[test]
    fn expiry_check() {
        let now = Utc::now();
        let mut t = token("a", "r");
        assert!(!t.is_expired_at(now));
        t.expiry = Some(now - Duration::seconds(1));
        assert!(t.is_expired_at(now));
    }
}

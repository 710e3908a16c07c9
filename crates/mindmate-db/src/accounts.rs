use crate::{datetime_from_db_text, datetime_to_db_text, DbError, DbPool};
use chrono::{DateTime, Utc};
use mindmate_models::account::{AccountKind, CounterpartSummary, ProfileCounters};
use sqlx::Row;

#[derive(Debug, Clone)]
pub struct AccountRow {
    pub id: i64,
    pub kind: AccountKind,
    pub name: String,
    pub email: String,
    pub points: i64,
    pub chat_messages: i64,
    pub created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::any::AnyRow> for AccountRow {
    fn from_row(row: &'r sqlx::any::AnyRow) -> Result<Self, sqlx::Error> {
        let kind_raw: String = row.try_get("kind")?;
        let created_at_raw: String = row.try_get("created_at")?;
        Ok(Self {
            id: row.try_get("id")?,
            kind: kind_raw
                .parse()
                .map_err(|e: String| sqlx::Error::Protocol(e))?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            points: row.try_get("points")?,
            chat_messages: row.try_get("chat_messages")?,
            created_at: datetime_from_db_text(&created_at_raw)?,
        })
    }
}

impl AccountRow {
    pub fn summary(&self) -> CounterpartSummary {
        CounterpartSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            kind: self.kind,
        }
    }
}

const SELECT_COLS: &str = "id, kind, name, email, points, chat_messages, created_at";

/// Provision an account row. Accounts are owned by the identity provider;
/// this exists for provisioning hooks and tests.
pub async fn create_account(
    pool: &DbPool,
    id: i64,
    kind: AccountKind,
    name: &str,
    email: &str,
) -> Result<AccountRow, DbError> {
    let row = sqlx::query_as::<_, AccountRow>(&format!(
        "INSERT INTO accounts (id, kind, name, email, created_at)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {SELECT_COLS}"
    ))
    .bind(id)
    .bind(kind.as_str())
    .bind(name)
    .bind(email)
    .bind(datetime_to_db_text(Utc::now()))
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn get_account(pool: &DbPool, id: i64) -> Result<Option<AccountRow>, DbError> {
    let row = sqlx::query_as::<_, AccountRow>(&format!(
        "SELECT {SELECT_COLS} FROM accounts WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn account_exists(pool: &DbPool, id: i64) -> Result<bool, DbError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Every account except `exclude_id`, users before caretakers, then by name.
pub async fn list_accounts_except(
    pool: &DbPool,
    exclude_id: i64,
) -> Result<Vec<AccountRow>, DbError> {
    let rows = sqlx::query_as::<_, AccountRow>(&format!(
        "SELECT {SELECT_COLS} FROM accounts WHERE id <> $1
         ORDER BY CASE WHEN kind = 'user' THEN 0 ELSE 1 END, name ASC, id ASC"
    ))
    .bind(exclude_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Award one point and bump the chat counter, logging a `message_sent`
/// activity in the same transaction.
pub async fn record_message_sent(pool: &DbPool, id: i64) -> Result<ProfileCounters, DbError> {
    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        "UPDATE accounts SET points = points + 1, chat_messages = chat_messages + 1 WHERE id = $1",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    sqlx::query(
        "INSERT INTO account_activities (account_id, activity_type, title, created_at)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(id)
    .bind("message_sent")
    .bind("Message sent")
    .bind(datetime_to_db_text(Utc::now()))
    .execute(&mut *tx)
    .await?;

    let (points, chat_messages): (i64, i64) =
        sqlx::query_as("SELECT points, chat_messages FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

    tx.commit().await?;
    Ok(ProfileCounters {
        points,
        chat_messages,
    })
}

pub async fn count_activities(pool: &DbPool, id: i64, activity_type: &str) -> Result<i64, DbError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM account_activities WHERE account_id = $1 AND activity_type = $2",
    )
    .bind(id)
    .bind(activity_type)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pool;

    #[tokio::test]
    async fn listing_excludes_the_caller() {
        let pool = test_pool().await;
        create_account(&pool, 1, AccountKind::User, "Ada", "ada@example.com")
            .await
            .unwrap();
        create_account(&pool, 2, AccountKind::Caretaker, "Bea", "bea@example.com")
            .await
            .unwrap();
        create_account(&pool, 3, AccountKind::User, "Cal", "cal@example.com")
            .await
            .unwrap();

        let rows = list_accounts_except(&pool, 1).await.unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 2]);
        assert_eq!(rows[1].kind, AccountKind::Caretaker);
    }

    #[tokio::test]
    async fn record_message_sent_increments_counters() {
        let pool = test_pool().await;
        create_account(&pool, 10, AccountKind::User, "Ada", "ada@example.com")
            .await
            .unwrap();

        record_message_sent(&pool, 10).await.unwrap();
        let counters = record_message_sent(&pool, 10).await.unwrap();
        assert_eq!(counters.points, 2);
        assert_eq!(counters.chat_messages, 2);
        assert_eq!(count_activities(&pool, 10, "message_sent").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn record_message_sent_for_unknown_account_is_not_found() {
        let pool = test_pool().await;
        let err = record_message_sent(&pool, 404).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound));
        assert!(!account_exists(&pool, 404).await.unwrap());
    }
}

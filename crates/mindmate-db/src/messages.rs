use crate::{datetime_from_db_text, datetime_to_db_text, DbError, DbPool};
use chrono::{DateTime, Utc};
use mindmate_models::message::{Message, RecipientKind};
use sqlx::Row;

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub receiver_type: RecipientKind,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::any::AnyRow> for MessageRow {
    fn from_row(row: &'r sqlx::any::AnyRow) -> Result<Self, sqlx::Error> {
        let receiver_type_raw: String = row.try_get("receiver_type")?;
        let created_at_raw: String = row.try_get("created_at")?;
        Ok(Self {
            id: row.try_get("id")?,
            sender_id: row.try_get("sender_id")?,
            receiver_id: row.try_get("receiver_id")?,
            receiver_type: receiver_type_raw
                .parse()
                .map_err(|e: mindmate_models::message::UnknownRecipientKind| {
                    sqlx::Error::Protocol(e.to_string())
                })?,
            body: row.try_get("body")?,
            created_at: datetime_from_db_text(&created_at_raw)?,
        })
    }
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            sender: row.sender_id,
            receiver: row.receiver_id,
            receiver_type: row.receiver_type,
            message: row.body,
            created_at: row.created_at,
        }
    }
}

const SELECT_COLS: &str = "id, sender_id, receiver_id, receiver_type, body, created_at";

/// Single-row insert; the caller assigns `id` and `created_at`.
pub async fn create_message(
    pool: &DbPool,
    id: i64,
    sender_id: i64,
    receiver_id: i64,
    receiver_type: RecipientKind,
    body: &str,
    created_at: DateTime<Utc>,
) -> Result<MessageRow, DbError> {
    let row = sqlx::query_as::<_, MessageRow>(&format!(
        "INSERT INTO messages (id, sender_id, receiver_id, receiver_type, body, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {SELECT_COLS}"
    ))
    .bind(id)
    .bind(sender_id)
    .bind(receiver_id)
    .bind(receiver_type.as_str())
    .bind(body)
    .bind(datetime_to_db_text(created_at))
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn get_message(pool: &DbPool, id: i64) -> Result<Option<MessageRow>, DbError> {
    let row = sqlx::query_as::<_, MessageRow>(&format!(
        "SELECT {SELECT_COLS} FROM messages WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Every message exchanged between `a` and `b` in either direction, oldest
/// first. Ties on `created_at` fall back to the snowflake id.
pub async fn get_conversation(pool: &DbPool, a: i64, b: i64) -> Result<Vec<MessageRow>, DbError> {
    let rows = sqlx::query_as::<_, MessageRow>(&format!(
        "SELECT {SELECT_COLS} FROM messages
         WHERE (sender_id = $1 AND receiver_id = $2)
            OR (sender_id = $3 AND receiver_id = $4)
         ORDER BY created_at ASC, id ASC"
    ))
    .bind(a)
    .bind(b)
    .bind(b)
    .bind(a)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Number of messages where `id` is sender or recipient, optionally only
/// those created at or after `since`.
pub async fn count_messages_involving(
    pool: &DbPool,
    id: i64,
    since: Option<DateTime<Utc>>,
) -> Result<i64, DbError> {
    let count: i64 = match since {
        Some(since) => {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM messages
                 WHERE (sender_id = $1 OR receiver_id = $2) AND created_at >= $3",
            )
            .bind(id)
            .bind(id)
            .bind(datetime_to_db_text(since))
            .fetch_one(pool)
            .await?
        }
        None => {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM messages WHERE sender_id = $1 OR receiver_id = $2",
            )
            .bind(id)
            .bind(id)
            .fetch_one(pool)
            .await?
        }
    };
    Ok(count)
}

/// Distinct identities `id` has exchanged at least one message with: each
/// message is projected to its other side, then de-duplicated.
pub async fn distinct_partners(
    pool: &DbPool,
    id: i64,
    since: Option<DateTime<Utc>>,
) -> Result<Vec<i64>, DbError> {
    let since_text = since.map(datetime_to_db_text);
    let rows: Vec<(i64,)> = sqlx::query_as(
        "SELECT DISTINCT CASE WHEN sender_id = $1 THEN receiver_id ELSE sender_id END AS partner_id
         FROM messages
         WHERE (sender_id = $2 OR receiver_id = $3)
           AND ($4 IS NULL OR created_at >= $5)
         ORDER BY partner_id ASC",
    )
    .bind(id)
    .bind(id)
    .bind(id)
    .bind(since_text.clone())
    .bind(since_text)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(partner,)| partner).collect())
}

pub async fn count_sent_by(pool: &DbPool, id: i64) -> Result<i64, DbError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE sender_id = $1")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pool;
    use chrono::{Duration, TimeZone};

    async fn insert(
        pool: &DbPool,
        id: i64,
        from: i64,
        to: i64,
        body: &str,
        at: DateTime<Utc>,
    ) -> MessageRow {
        create_message(pool, id, from, to, RecipientKind::User, body, at)
            .await
            .expect("insert message")
    }

    #[tokio::test]
    async fn conversation_contains_both_directions_only() {
        let pool = test_pool().await;
        let t0 = Utc.with_ymd_and_hms(2025, 5, 1, 10, 0, 0).unwrap();
        insert(&pool, 1, 100, 200, "a->b", t0).await;
        insert(&pool, 2, 200, 100, "b->a", t0 + Duration::seconds(1)).await;
        insert(&pool, 3, 100, 300, "a->c", t0 + Duration::seconds(2)).await;
        insert(&pool, 4, 300, 200, "c->b", t0 + Duration::seconds(3)).await;

        let rows = get_conversation(&pool, 100, 200).await.unwrap();
        let bodies: Vec<&str> = rows.iter().map(|r| r.body.as_str()).collect();
        assert_eq!(bodies, vec!["a->b", "b->a"]);

        let reversed = get_conversation(&pool, 200, 100).await.unwrap();
        assert_eq!(reversed.len(), 2);
    }

    #[tokio::test]
    async fn conversation_is_sorted_by_timestamp_not_insertion() {
        let pool = test_pool().await;
        let t0 = Utc.with_ymd_and_hms(2025, 5, 1, 10, 0, 0).unwrap();
        insert(&pool, 10, 1, 2, "late", t0 + Duration::minutes(5)).await;
        insert(&pool, 11, 2, 1, "early", t0).await;

        let rows = get_conversation(&pool, 1, 2).await.unwrap();
        assert_eq!(rows[0].body, "early");
        assert_eq!(rows[1].body, "late");
    }

    #[tokio::test]
    async fn partner_and_raw_counts_follow_their_definitions() {
        let pool = test_pool().await;
        let day_d = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();
        let day_d1 = day_d + Duration::days(1);
        insert(&pool, 1, 1, 2, "hi", day_d).await;
        insert(&pool, 2, 1, 2, "again", day_d + Duration::minutes(1)).await;
        insert(&pool, 3, 2, 1, "yo", day_d + Duration::minutes(2)).await;
        insert(&pool, 4, 1, 3, "new day", day_d1).await;

        let midnight = Utc.with_ymd_and_hms(2025, 5, 2, 0, 0, 0).unwrap();
        assert_eq!(distinct_partners(&pool, 1, None).await.unwrap(), vec![2, 3]);
        assert_eq!(distinct_partners(&pool, 1, Some(midnight)).await.unwrap(), vec![3]);
        assert_eq!(count_messages_involving(&pool, 1, None).await.unwrap(), 4);
        assert_eq!(
            count_messages_involving(&pool, 1, Some(midnight)).await.unwrap(),
            1
        );
        assert_eq!(count_sent_by(&pool, 1).await.unwrap(), 3);
        assert_eq!(distinct_partners(&pool, 3, None).await.unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn stored_message_converts_to_wire_model() {
        let pool = test_pool().await;
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let row = create_message(&pool, 77, 5, 6, RecipientKind::Caretaker, "hello", at)
            .await
            .unwrap();
        let fetched = get_message(&pool, 77).await.unwrap().expect("exists");
        assert_eq!(fetched.created_at, at);

        let msg: Message = row.into();
        assert_eq!(msg.receiver_type, RecipientKind::Caretaker);
        assert_eq!(msg.message, "hello");
    }
}

use crate::error::CoreError;
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use mindmate_db::DbPool;
use mindmate_models::account::{CounterpartSummary, InteractionCounts};
use mindmate_models::message::Message;

/// UTC instant of the most recent midnight in `now`'s own timezone. On a
/// day whose midnight is skipped by a DST change, falls back to `now`.
pub fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    now.timezone()
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| now.with_timezone(&Utc))
}

/// Start of the server's local calendar day.
pub fn local_midnight() -> DateTime<Utc> {
    start_of_day(&chrono::Local::now())
}

pub async fn list_counterparts(
    pool: &DbPool,
    caller: i64,
) -> Result<Vec<CounterpartSummary>, CoreError> {
    let rows = mindmate_db::accounts::list_accounts_except(pool, caller).await?;
    Ok(rows.iter().map(|row| row.summary()).collect())
}

pub async fn conversation(
    pool: &DbPool,
    caller: i64,
    counterpart: i64,
) -> Result<Vec<Message>, CoreError> {
    let rows = mindmate_db::messages::get_conversation(pool, caller, counterpart).await?;
    Ok(rows.into_iter().map(Message::from).collect())
}

/// Raw message counts where the caller is on either side.
pub async fn interaction_counts(
    pool: &DbPool,
    caller: i64,
    since: DateTime<Utc>,
) -> Result<InteractionCounts, CoreError> {
    let total = mindmate_db::messages::count_messages_involving(pool, caller, None).await?;
    let today = mindmate_db::messages::count_messages_involving(pool, caller, Some(since)).await?;
    Ok(InteractionCounts {
        total_interactions: total,
        today_interactions: today,
    })
}

/// Distinct counterparts the caller has exchanged messages with, optionally
/// limited to messages at or after `since`.
pub async fn partners(
    pool: &DbPool,
    caller: i64,
    since: Option<DateTime<Utc>>,
) -> Result<Vec<i64>, CoreError> {
    Ok(mindmate_db::messages::distinct_partners(pool, caller, since).await?)
}

pub async fn sent_count(pool: &DbPool, caller: i64) -> Result<i64, CoreError> {
    Ok(mindmate_db::messages::count_sent_by(pool, caller).await?)
}

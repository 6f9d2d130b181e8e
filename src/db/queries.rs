use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::catalog::CatalogItem;
use crate::models::comment::Comment;
use crate::models::frame::CapturedFrame;

/// Durable write-through copy of an accepted comment. Best-effort: callers
/// log-and-swallow failures, the queue/log copy is authoritative.
pub async fn archive_comment(pool: &PgPool, comment: &Comment) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO chat_messages (source_id, recipient_id, posted_at, body)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(&comment.source_id)
    .bind(&comment.recipient_id)
    .bind(comment.timestamp)
    .bind(&comment.text)
    .execute(pool)
    .await?;

    Ok(())
}

/// Record one successful frame capture.
pub async fn insert_frame(
    pool: &PgPool,
    source_id: &str,
    captured_at: DateTime<Utc>,
    storage_key: &str,
    locator: &str,
) -> Result<CapturedFrame, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO captured_frames (source_id, captured_at, storage_key, locator)
        VALUES ($1, $2, $3, $4)
        RETURNING id, source_id, captured_at, storage_key, locator
        "#,
    )
    .bind(source_id)
    .bind(captured_at)
    .bind(storage_key)
    .bind(locator)
    .fetch_one(pool)
    .await?;

    frame_from_row(&row)
}

/// Nearest captured frame for a source relative to when intent began:
/// prefer the latest frame at-or-before the anchor, fall back to the earliest
/// frame after it. Duplicated capture records are harmless here, the ordering
/// always picks a single row.
pub async fn nearest_frame(
    pool: &PgPool,
    source_id: &str,
    anchor: DateTime<Utc>,
) -> Result<Option<CapturedFrame>, sqlx::Error> {
    if let Some(frame) = frame_at_or_before(pool, source_id, anchor).await? {
        return Ok(Some(frame));
    }
    frame_after(pool, source_id, anchor).await
}

/// Latest frame with `captured_at <= anchor`.
pub async fn frame_at_or_before(
    pool: &PgPool,
    source_id: &str,
    anchor: DateTime<Utc>,
) -> Result<Option<CapturedFrame>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, source_id, captured_at, storage_key, locator
        FROM captured_frames
        WHERE source_id = $1 AND captured_at <= $2
        ORDER BY captured_at DESC
        LIMIT 1
        "#,
    )
    .bind(source_id)
    .bind(anchor)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(frame_from_row).transpose()
}

/// Earliest frame with `captured_at >= anchor`.
pub async fn frame_after(
    pool: &PgPool,
    source_id: &str,
    anchor: DateTime<Utc>,
) -> Result<Option<CapturedFrame>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, source_id, captured_at, storage_key, locator
        FROM captured_frames
        WHERE source_id = $1 AND captured_at >= $2
        ORDER BY captured_at ASC
        LIMIT 1
        "#,
    )
    .bind(source_id)
    .bind(anchor)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(frame_from_row).transpose()
}

fn frame_from_row(row: &sqlx::postgres::PgRow) -> Result<CapturedFrame, sqlx::Error> {
    Ok(CapturedFrame {
        id: row.try_get("id")?,
        source_id: row.try_get("source_id")?,
        captured_at: row.try_get("captured_at")?,
        storage_key: row.try_get("storage_key")?,
        locator: row.try_get("locator")?,
    })
}

/// Read-only catalog lookup by item id.
pub async fn get_catalog_item(
    pool: &PgPool,
    item_id: Uuid,
) -> Result<Option<CatalogItem>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, name, unit_price, description, image_ref
        FROM catalog_items
        WHERE id = $1
        "#,
    )
    .bind(item_id)
    .fetch_optional(pool)
    .await?;

    Ok(match row {
        Some(r) => Some(CatalogItem {
            id: r.try_get("id")?,
            name: r.try_get("name")?,
            unit_price: r.try_get("unit_price")?,
            description: r.try_get("description")?,
            image_ref: r.try_get("image_ref")?,
        }),
        None => None,
    })
}

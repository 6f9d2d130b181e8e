use chrono::{DateTime, Utc};

use crate::app_state::AppState;
use crate::db::queries;
use crate::models::catalog::CatalogItem;
use crate::models::comment::Comment;
use crate::models::intent::{IntentLabel, IntentResult, VisualMatch};
use crate::models::outcome::{MatchedItem, PipelineOutcome};
use crate::services::queue::{QueueError, QueueKey};

/// Drain one recipient's queue and drive the batch through the
/// intent → frame → vision → catalog → order pipeline.
///
/// `head` is a message already popped off the queue by the worker's blocking
/// wait; the on-demand HTTP entry point passes `None` and drains everything.
/// Collaborator failures degrade to safe defaults; only queue-store failures
/// surface to the caller. The queue is deleted in full once the outcome has
/// been produced — drain once, decide once.
pub async fn process_batch(
    state: &AppState,
    key: &QueueKey,
    head: Option<Comment>,
) -> Result<PipelineOutcome, QueueError> {
    let start = std::time::Instant::now();

    let raw_entries = state.queue.peek_all(key).await?;

    let mut messages: Vec<Comment> = head.into_iter().collect();
    messages.extend(parse_entries(key, &raw_entries));

    if messages.is_empty() {
        return Ok(PipelineOutcome::empty(&key.source_id, &key.recipient_id));
    }

    let first_intent_ts = first_intent_timestamp(&messages).unwrap_or_else(Utc::now);
    let combined = combined_text(&messages);

    tracing::info!(
        queue_key = %key,
        messages = messages.len(),
        first_intent_ts = %first_intent_ts,
        "Processing drained batch"
    );

    // Classifier failure is never fatal: degrade to no intent and keep going.
    let intent = match state.intent.classify(&combined).await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(queue_key = %key, error = %e, "Intent classifier failed, assuming no intent");
            IntentResult::none()
        }
    };

    let mut matched_item = None;
    let mut payment_ready = false;
    let mut reply = "How can I help you?".to_string();

    if intent.label == IntentLabel::Buy && intent.confidence > state.buy_threshold {
        tracing::info!(
            queue_key = %key,
            confidence = intent.confidence,
            "Buying intent detected"
        );

        match resolve_purchase(state, key, first_intent_ts, &intent).await {
            Some(item) => {
                reply = format!(
                    "Found the product! {} — ${:.2}. Proceed with the purchase of {} unit(s)?",
                    item.name, item.unit_price, item.quantity
                );
                trigger_order(state, key, &item).await;
                matched_item = Some(item);
                payment_ready = true;
            }
            None => {
                reply = "Could not identify the product, please try again.".to_string();
            }
        }
    }

    // Batch decided: the queue goes away whether or not anything matched.
    state.queue.delete(key).await?;

    metrics::histogram!("pipeline_processing_seconds").record(start.elapsed().as_secs_f64());
    metrics::counter!("pipeline_batches_total").increment(1);

    Ok(PipelineOutcome {
        source_id: key.source_id.clone(),
        recipient_id: key.recipient_id.clone(),
        messages_consumed: messages.len(),
        resolved_intent: intent.label,
        matched_item,
        payment_ready,
        reply,
    })
}

/// Frame correlation + visual match + catalog resolution. Every failure in
/// here degrades to `None`, which the caller turns into a "no match" reply.
async fn resolve_purchase(
    state: &AppState,
    key: &QueueKey,
    first_intent_ts: DateTime<Utc>,
    intent: &IntentResult,
) -> Option<MatchedItem> {
    let frame = match queries::nearest_frame(&state.db, &key.source_id, first_intent_ts).await {
        Ok(Some(frame)) => frame,
        Ok(None) => {
            tracing::warn!(queue_key = %key, "No captured frames for source, cannot anchor intent");
            return None;
        }
        Err(e) => {
            tracing::warn!(queue_key = %key, error = %e, "Frame lookup failed");
            return None;
        }
    };

    tracing::info!(
        queue_key = %key,
        frame_id = %frame.id,
        captured_at = %frame.captured_at,
        "Selected nearest frame for intent anchor"
    );

    let visual = match state
        .vision
        .match_product(std::slice::from_ref(&frame.locator), &key.source_id)
        .await
    {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(queue_key = %key, error = %e, "Visual matcher failed");
            VisualMatch::none()
        }
    };

    let item_id = match visual.item_id {
        Some(id) if visual.confidence > state.match_threshold => id,
        _ => {
            tracing::info!(
                queue_key = %key,
                confidence = visual.confidence,
                "No product match or confidence below threshold"
            );
            return None;
        }
    };

    let item = match queries::get_catalog_item(&state.db, item_id).await {
        Ok(Some(item)) => item,
        Ok(None) => {
            tracing::warn!(queue_key = %key, item_id = %item_id, "Matched item missing from catalog");
            return None;
        }
        Err(e) => {
            tracing::warn!(queue_key = %key, error = %e, "Catalog lookup failed");
            return None;
        }
    };

    Some(price_item(item, intent.quantity_or_default()))
}

/// Price a resolved catalog item for the ordered quantity.
fn price_item(item: CatalogItem, quantity: u32) -> MatchedItem {
    MatchedItem {
        id: item.id,
        name: item.name,
        unit_price: item.unit_price,
        quantity,
        total: item.unit_price * f64::from(quantity),
    }
}

/// At-most-once order attempt per drained batch; failure is logged, never
/// retried, and does not take payment readiness away from the outcome.
async fn trigger_order(state: &AppState, key: &QueueKey, item: &MatchedItem) {
    match state
        .orders
        .create_order(item.id, &key.recipient_id, &key.source_id, item.quantity)
        .await
    {
        Ok(receipt) => {
            metrics::counter!("orders_triggered_total").increment(1);
            tracing::info!(
                queue_key = %key,
                order_id = %receipt.order_id,
                status = %receipt.status,
                "Order created"
            );
        }
        Err(e) => {
            tracing::warn!(queue_key = %key, error = %e, "Order creation failed");
        }
    }
}

/// Deserialize queued payloads; malformed entries are logged and dropped.
pub fn parse_entries(key: &QueueKey, raw_entries: &[String]) -> Vec<Comment> {
    raw_entries
        .iter()
        .filter_map(|raw| match serde_json::from_str::<Comment>(raw) {
            Ok(comment) => Some(comment),
            Err(e) => {
                tracing::error!(queue_key = %key, error = %e, "Dropping malformed queue entry");
                None
            }
        })
        .collect()
}

/// When did the buyer start indicating intent: the earliest timestamp in the
/// batch, not the latest.
pub fn first_intent_timestamp(messages: &[Comment]) -> Option<DateTime<Utc>> {
    messages.iter().map(|m| m.timestamp).min()
}

/// Combined batch text sent to the classifier as one unit of context.
pub fn combined_text(messages: &[Comment]) -> String {
    messages
        .iter()
        .map(|m| m.text.as_str())
        .collect::<Vec<_>>()
        .join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn comment(ts_secs: u32, text: &str) -> Comment {
        Comment {
            source_id: "s1".to_string(),
            recipient_id: "r1".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, ts_secs).unwrap(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_first_intent_timestamp_is_earliest() {
        // FIFO order is not guaranteed to be timestamp order when clients
        // supply their own timestamps.
        let messages = vec![comment(30, "b"), comment(10, "a"), comment(20, "c")];
        assert_eq!(
            first_intent_timestamp(&messages),
            Some(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 10).unwrap())
        );
    }

    #[test]
    fn test_first_intent_timestamp_empty_batch() {
        assert_eq!(first_intent_timestamp(&[]), None);
    }

    #[test]
    fn test_combined_text_joins_in_queue_order() {
        let messages = vec![comment(1, "I want"), comment(2, "to buy this")];
        assert_eq!(combined_text(&messages), "I want | to buy this");
    }

    #[test]
    fn test_price_item_multiplies_unit_price_by_quantity() {
        let item = CatalogItem {
            id: uuid::Uuid::new_v4(),
            name: "Denim Jacket".to_string(),
            unit_price: 50.0,
            description: None,
            image_ref: None,
        };
        let priced = price_item(item, 2);
        assert_eq!(priced.quantity, 2);
        assert_eq!(priced.unit_price, 50.0);
        assert_eq!(priced.total, 100.0);
    }

    #[test]
    fn test_parse_entries_drops_malformed() {
        let key = QueueKey::new("s1", "r1");
        let good = serde_json::to_string(&comment(5, "hola")).unwrap();
        let raw = vec![good, "{not json".to_string()];
        let parsed = parse_entries(&key, &raw);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].text, "hola");
    }
}

//! Removal of server-generated noise ("joined the team", "joined the
//! channel", ...) from every channel a seeding run touched.

use futures::stream::{self, StreamExt};
use tenantry_core::models::{EntityKind, Outcome, SeedReport};

use crate::admin_api::AdminApiClient;

/// Delete the newest system posts of each channel.
///
/// Channels are processed concurrently, and so are the deletions within one
/// channel; both are bounded by `max_concurrency`. A failed deletion is
/// counted, never propagated.
pub async fn remove_system_posts(
    api: &AdminApiClient,
    channels: &[(String, String)],
    page_size: u32,
    max_concurrency: usize,
) -> SeedReport {
    let max_concurrency = max_concurrency.max(1);

    let outcomes: Vec<(String, Outcome)> = stream::iter(channels)
        .map(|(label, channel_id)| async move {
            let outcome = clean_channel(api, channel_id, page_size, max_concurrency).await;
            (label.clone(), outcome)
        })
        .buffer_unordered(max_concurrency)
        .collect()
        .await;

    let mut report = SeedReport::default();
    for (label, outcome) in outcomes {
        report.record(EntityKind::Cleanup, label, outcome);
    }
    report
}

async fn clean_channel(
    api: &AdminApiClient,
    channel_id: &str,
    page_size: u32,
    max_concurrency: usize,
) -> Outcome {
    let page = match api.list_channel_posts(channel_id, 0, page_size).await {
        Ok(page) => page,
        Err(e) => {
            tracing::warn!(channel_id = %channel_id, error = %e, "Failed to list channel posts");
            return Outcome::Failed(e.to_string());
        }
    };

    let post_ids: Vec<&str> = page.system_posts().map(|post| post.id.as_str()).collect();
    if post_ids.is_empty() {
        return Outcome::Skipped("no system posts".to_string());
    }

    let total = post_ids.len();
    let failures = stream::iter(post_ids)
        .map(|post_id| async move {
            match api.delete_post(post_id).await {
                Ok(()) => 0usize,
                Err(e) => {
                    tracing::warn!(channel_id = %channel_id, post_id = %post_id, error = %e, "Failed to delete system post");
                    1
                }
            }
        })
        .buffer_unordered(max_concurrency)
        .fold(0usize, |acc, failed| async move { acc + failed })
        .await;

    tracing::debug!(channel_id = %channel_id, removed = total - failures, failed = failures, "Cleaned channel");

    if failures == 0 {
        Outcome::Updated
    } else {
        Outcome::Failed(format!("{} of {} system posts could not be deleted", failures, total))
    }
}

//! Message rendering for bot replies.

use poise::serenity_prelude::CreateEmbed;
use poise::serenity_prelude::CreateEmbedAuthor;
use poise::serenity_prelude::CreateEmbedFooter;

use crate::api::UserFolder;
use crate::submission::FullSubmission;
use crate::submission::ResultKind;
use crate::submission::SearchResult;
use crate::task::subscription_watcher::WatcherSnapshot;

const DESCRIPTION_LIMIT: usize = 500;
const FOLDER_LISTING_LIMIT: usize = 10;

pub fn welcome_text() -> String {
    "Hello! I post new FurAffinity submissions for your saved searches.\n\
     Use /add_subscription <query> to follow a search, /list_subscriptions to see them \
     and /remove_subscription <query> to stop.\n\
     Send me any FurAffinity submission link and I will neaten it up."
        .to_string()
}

pub fn subscription_list(queries: &[String]) -> String {
    if queries.is_empty() {
        return "There are no active subscriptions in this chat.".to_string();
    }
    let lines: Vec<String> = queries.iter().map(|query| format!("- {query}")).collect();
    format!(
        "Current active subscriptions in this chat:\n{}",
        lines.join("\n")
    )
}

pub fn added_reply(query: &str, queries: &[String]) -> String {
    format!(
        "Added subscription: \"{query}\".\n{}",
        subscription_list(queries)
    )
}

pub fn removed_reply(query: &str, queries: &[String]) -> String {
    format!(
        "Removed subscription: \"{query}\".\n{}",
        subscription_list(queries)
    )
}

/// Markdown excerpt of an HTML description.
pub fn description_excerpt(html: &str) -> String {
    let html = html.trim().replace("<br>", "").replace("<br />", "");
    let markdown = html2md::parse_html(&html);
    let markdown = markdown.trim();
    if markdown.chars().count() <= DESCRIPTION_LIMIT {
        return markdown.to_string();
    }
    // Counted in chars so multi-byte characters are never split.
    let mut excerpt: String = markdown.chars().take(DESCRIPTION_LIMIT).collect();
    excerpt.push('…');
    excerpt
}

pub fn submission_embed(full: &FullSubmission) -> CreateEmbed {
    let base = &full.base;
    let mut embed = CreateEmbed::new()
        .title(&base.title)
        .url(base.link())
        .author(CreateEmbedAuthor::new(&base.author.name).url(base.author.link()))
        .field("Rating", full.rating.as_str(), true)
        .footer(CreateEmbedFooter::new(format!("#{}", base.id)));

    let description = description_excerpt(&full.description);
    if !description.is_empty() {
        embed = embed.description(description);
    }

    if full.is_image() {
        embed.image(&full.full_image_url)
    } else {
        embed.thumbnail(base.small_thumbnail_url()).field(
            "Download",
            format!("[Direct download]({})", full.download_url),
            true,
        )
    }
}

/// Newest entries of a user folder, one link per line.
pub fn folder_listing(user: &str, folder: UserFolder, results: &[SearchResult]) -> String {
    let user = user.trim();
    if results.is_empty() {
        return format!("There are no submissions in {user}'s {folder}.");
    }
    let lines: Vec<String> = results
        .iter()
        .take(FOLDER_LISTING_LIMIT)
        .map(|result| {
            let by = match result.kind {
                ResultKind::Favorite { .. } => format!(" by {}", result.author.name),
                ResultKind::Short => String::new(),
            };
            format!("- [{}]({}){by}", result.title, result.link())
        })
        .collect();
    format!("Latest in {user}'s {folder}:\n{}", lines.join("\n"))
}

pub fn about_text(snapshot: &WatcherSnapshot) -> String {
    format!(
        "Watches search queries and posts new submissions to subscribed chats.\n\
         Tracking {} subscriptions. {} queries searched successfully, {} currently failing.\n\
         {} notifications waiting to be retried.",
        snapshot.tracked_subscriptions,
        snapshot.last_success.len(),
        snapshot.consecutive_failures.len(),
        snapshot.pending_retries
    )
}

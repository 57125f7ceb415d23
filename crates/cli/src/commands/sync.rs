//! `sync` and `list`: cache reconciliation and listings.

use hamlet_directory::sync::SyncAction;

use super::Context;

/// Run the staleness check / full refresh and report what happened.
pub async fn run(ctx: &Context) {
    let outcome = ctx.sync.smart_sync().await;

    let action = match outcome.action {
        SyncAction::NoChange => "no change",
        SyncAction::FullSync => "full sync",
    };
    println!(
        "{action}: {} businesses, {} categories ({})",
        outcome.businesses.len(),
        outcome.categories.len(),
        if outcome.from_cache { "from cache" } else { "fresh from remote" }
    );
}

/// List businesses, optionally filtered to one category.
pub async fn list(ctx: &Context, category: Option<&str>) {
    ctx.tracker.page_visit("list").await;

    let outcome = ctx.sync.smart_sync().await;
    let mut shown = 0_usize;

    for business in &outcome.businesses {
        if let Some(category) = category
            && business.category_id.as_str() != category
        {
            continue;
        }

        let delivery = if business.home_delivery { " [delivers]" } else { "" };
        println!(
            "{}  {} - {} ({}){delivery}",
            business.id, business.shop_name, business.owner_name, business.phone
        );
        shown += 1;
    }

    if shown == 0 {
        println!("no businesses found");
    }
}

//! `search`: AI-assisted natural-language search.

use hamlet_directory::ai::{AiMatch, AiSearchClient};

use super::Context;

/// Ask the configured model about the current snapshot.
///
/// AI failures are displayed in their user-facing form and logged in full;
/// they do not abort with an error status, matching the in-app behavior.
pub async fn run(ctx: &Context, query: &str) {
    let outcome = ctx.sync.smart_sync().await;

    let client = match AiSearchClient::new(&ctx.config.ai) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "AI search unavailable");
            println!("{}", e.user_message());
            return;
        }
    };

    match client.search(query, &outcome.businesses).await {
        Ok(result) => {
            let business_matches = result.business_match_count();
            ctx.tracker
                .ai_search(query, business_matches, business_matches > 0)
                .await;

            println!("{}", result.summary);
            for m in &result.matches {
                match m {
                    AiMatch::Business(id) => {
                        match outcome.businesses.iter().find(|b| &b.id == id) {
                            Some(business) => println!(
                                "  {} - {} ({})",
                                business.shop_name, business.owner_name, business.phone
                            ),
                            None => println!("  [unknown business {id}]"),
                        }
                    }
                    AiMatch::Text(text) => println!("  {text}"),
                }
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "AI search failed");
            ctx.tracker.ai_search(query, 0, false).await;
            println!("{}", e.user_message());
        }
    }
}

//! `stats`: aggregated analytics views.

use hamlet_directory::analytics::AnalyticsViews;

use super::Context;

const TOP_N: usize = 5;

/// Print the aggregated views the admin dashboard shows.
///
/// # Errors
///
/// Returns an error if the analytics store cannot be read.
pub async fn run(ctx: &Context) -> hamlet_directory::Result<()> {
    let views = AnalyticsViews::new(&ctx.config.supabase)?;

    println!("live now: {}", views.live_count().await?);

    let rate = views.conversion_rate().await?;
    println!("view-to-call conversion: {:.0}%", rate * 100.0);

    println!("popular searches:");
    for search in views.popular_searches(TOP_N).await? {
        println!("  {:>4}x  {}", search.count, search.query);
    }

    println!("popular businesses:");
    for business in views.popular_businesses(TOP_N).await? {
        println!("  {:>4}x  {}", business.count, business.business_id);
    }

    Ok(())
}

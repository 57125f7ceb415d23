//! `business`: admin curation of listings.
//!
//! These are the only paths that surface remote errors to the user: a
//! failed save or delete must be visible, unlike background sync and
//! tracking which degrade silently.
//!
//! # Environment Variables
//!
//! - `HAMLET_ADMIN_EMAIL` - Admin sign-in email
//! - `HAMLET_ADMIN_PASSWORD` - Admin sign-in password

use clap::Subcommand;

use hamlet_core::{Business, BusinessId, CategoryId};
use hamlet_directory::config::ConfigError;
use hamlet_directory::remote::RemoteError;

use super::Context;

#[derive(Subcommand)]
pub enum BusinessAction {
    /// Add a new listing
    Add {
        /// Category identifier
        #[arg(short, long)]
        category: String,

        /// Shop name
        #[arg(short, long)]
        name: String,

        /// Owner name
        #[arg(short, long)]
        owner: String,

        /// Contact number
        #[arg(short, long)]
        phone: String,

        /// Street address
        #[arg(long)]
        address: Option<String>,

        /// Opening hours
        #[arg(long)]
        hours: Option<String>,

        /// Comma-separated services
        #[arg(long, value_delimiter = ',')]
        services: Vec<String>,

        /// Whether the shop delivers to homes
        #[arg(long)]
        home_delivery: bool,

        /// Comma-separated payment options
        #[arg(long, value_delimiter = ',')]
        payment_options: Vec<String>,
    },
    /// Replace an existing listing
    Update {
        /// Business identifier
        id: String,

        #[arg(short, long)]
        category: String,

        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        owner: String,

        #[arg(short, long)]
        phone: String,

        #[arg(long)]
        address: Option<String>,

        #[arg(long)]
        hours: Option<String>,

        #[arg(long, value_delimiter = ',')]
        services: Vec<String>,

        #[arg(long)]
        home_delivery: bool,

        #[arg(long, value_delimiter = ',')]
        payment_options: Vec<String>,
    },
    /// Delete a listing
    Delete {
        /// Business identifier
        id: String,
    },
}

/// Sign in, verify the admin role, and run the requested mutation.
///
/// # Errors
///
/// Returns an error when credentials are missing or rejected, the signed-in
/// user lacks the admin role, or the mutation itself fails.
pub async fn run(ctx: &Context, action: BusinessAction) -> hamlet_directory::Result<()> {
    sign_in_admin(ctx).await?;

    match action {
        BusinessAction::Add {
            category,
            name,
            owner,
            phone,
            address,
            hours,
            services,
            home_delivery,
            payment_options,
        } => {
            let business = Business {
                id: BusinessId::new(uuid::Uuid::new_v4().to_string()),
                category_id: CategoryId::new(category),
                shop_name: name,
                owner_name: owner,
                phone,
                address,
                hours,
                services,
                home_delivery,
                payment_options,
            };

            let created = ctx.sync.add_business(&business).await?;
            println!("added {} ({})", created.shop_name, created.id);
        }
        BusinessAction::Update {
            id,
            category,
            name,
            owner,
            phone,
            address,
            hours,
            services,
            home_delivery,
            payment_options,
        } => {
            let business = Business {
                id: BusinessId::new(id),
                category_id: CategoryId::new(category),
                shop_name: name,
                owner_name: owner,
                phone,
                address,
                hours,
                services,
                home_delivery,
                payment_options,
            };

            let updated = ctx.sync.update_business(&business).await?;
            println!("updated {} ({})", updated.shop_name, updated.id);
        }
        BusinessAction::Delete { id } => {
            let id = BusinessId::new(id);
            ctx.sync.delete_business(&id).await?;
            println!("deleted {id}");
        }
    }

    ctx.client.sign_out().await;
    Ok(())
}

async fn sign_in_admin(ctx: &Context) -> hamlet_directory::Result<()> {
    let email = std::env::var("HAMLET_ADMIN_EMAIL")
        .map_err(|_| ConfigError::MissingEnvVar("HAMLET_ADMIN_EMAIL".to_string()))?;
    let password = std::env::var("HAMLET_ADMIN_PASSWORD")
        .map_err(|_| ConfigError::MissingEnvVar("HAMLET_ADMIN_PASSWORD".to_string()))?;

    ctx.client.sign_in(&email, &password).await?;

    if !ctx.client.is_admin().await? {
        ctx.client.sign_out().await;
        return Err(
            RemoteError::Unauthorized("signed-in user lacks the admin role".to_string()).into(),
        );
    }

    Ok(())
}

use chrono::Utc;
use poise::serenity_prelude::{
    ChannelId, CreateEmbed, CreateEmbedFooter, CreateMessage, EditRole, Role, RoleId, UserId,
};
use tracing::warn;

use crate::bot::data::Context;
use crate::bot::error::Error;
use crate::commands::shop::SortChoice;
use crate::constants::embeds;
use crate::db::models::{MarketItem, MarketKind, RequestStatus};
use crate::db::queries::custom_role as custom_role_queries;
use crate::db::queries::shop::ShopOrder;
use crate::services::economy::custom_roles;
use crate::utils::formatting::{format_coins, mention_id, mention_role, truncate};
use crate::utils::notify;
use crate::utils::permissions::ensure_access;

const PAGE_SIZE: i64 = 10;
const PENDING_LIMIT: i64 = 15;

/// Custom roles: request, resell and edit your own role
#[poise::command(
    slash_command,
    subcommands(
        "request",
        "approve",
        "deny",
        "pending",
        "mine",
        "sell",
        "unlist",
        "edit",
        "edit_approve",
        "edit_deny",
        "revoke"
    ),
    guild_only
)]
pub async fn custom_role(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say("Use one of the subcommands, for example `/custom_role request`")
        .await?;
    Ok(())
}

async fn post_for_review(ctx: Context<'_>, embed: CreateEmbed) {
    let Some(channel_id) = ctx.data().settings.economy.review_channel_id else {
        return;
    };
    if let Err(e) = ChannelId::new(channel_id)
        .send_message(ctx, CreateMessage::new().embed(embed))
        .await
    {
        warn!("Failed to post to review channel {}: {:?}", channel_id, e);
    }
}

/// Ask staff for a role of your own
#[poise::command(slash_command, guild_only)]
pub async fn request(
    ctx: Context<'_>,
    #[description = "Role name"]
    #[max_length = 100]
    name: String,
    #[description = "Color such as #ff8800"] color: String,
    #[description = "Icon image link"] image_url: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;
    let price = ctx.data().settings.economy.custom_role_price;

    let request = custom_roles::request_role(
        &ctx.data().pool,
        price,
        guild_id.get() as i64,
        ctx.author().id.get() as i64,
        &name,
        &color,
        image_url.as_deref(),
        Utc::now(),
    )
    .await?;

    let mut review = embeds::info_embed()
        .title(format!("Custom Role Request #{}", request.id))
        .field("Member", mention_id(request.user_id), true)
        .field("Name", &request.name, true)
        .field("Color", &request.color, true)
        .footer(CreateEmbedFooter::new(format!(
            "/custom_role approve request:{} role:<created role> or /custom_role deny",
            request.id
        )));
    if let Some(url) = &request.image_url {
        review = review.thumbnail(url);
    }
    post_for_review(ctx, review).await;

    let embed = embeds::success_embed()
        .title("Request Sent")
        .description(format!(
            "Request `#{}` for **{}** is waiting for review. {} will be taken from your bank when it is approved.",
            request.id,
            request.name,
            format_coins(price)
        ));
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Approve a request with the role made for it
#[poise::command(slash_command, guild_only)]
pub async fn approve(
    ctx: Context<'_>,
    #[description = "Request number"] request: i64,
    #[description = "The role created for this request"] role: Role,
) -> Result<(), Error> {
    ensure_access(ctx, &ctx.data().settings.roles.economy_review).await?;
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;
    let data = ctx.data();
    let guild = guild_id.get() as i64;

    let pending = custom_roles::pending(&data.pool, guild, request).await?;
    let member_id = UserId::new(pending.user_id as u64);
    let http = &ctx.serenity_context().http;

    http.add_member_role(guild_id, member_id, role.id, Some("Custom role approved"))
        .await?;

    let approved = match custom_roles::approve_request(
        &data.pool,
        data.settings.economy.custom_role_price,
        guild,
        request,
        role.id.get() as i64,
        ctx.author().id.get() as i64,
        Utc::now(),
    )
    .await
    {
        Ok(approved) => approved,
        Err(e) => {
            if let Err(remove_err) = http
                .remove_member_role(guild_id, member_id, role.id, Some("Custom role not paid"))
                .await
            {
                warn!("Could not take back role {} from {}: {:?}", role.id, member_id, remove_err);
            }
            return Err(e);
        }
    };

    notify::dm(
        http,
        member_id,
        embeds::success_embed()
            .title("Custom Role Approved")
            .description(format!(
                "Your role **{}** is ready. {} was taken from your bank.",
                approved.name,
                format_coins(data.settings.economy.custom_role_price)
            )),
    )
    .await;

    let embed = embeds::success_embed().description(format!(
        "Request `#{}` approved, {} given to {}",
        approved.id,
        mention_role(role.id.get()),
        mention_id(approved.user_id)
    ));
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Turn a request down
#[poise::command(slash_command, guild_only)]
pub async fn deny(
    ctx: Context<'_>,
    #[description = "Request number"] request: i64,
    #[description = "Reason shown to the member"] reason: Option<String>,
) -> Result<(), Error> {
    ensure_access(ctx, &ctx.data().settings.roles.economy_review).await?;
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    let denied = custom_roles::deny_request(
        &ctx.data().pool,
        guild_id.get() as i64,
        request,
        ctx.author().id.get() as i64,
        Utc::now(),
    )
    .await?;

    let reason = reason.unwrap_or_else(|| "No reason given".to_string());
    notify::dm(
        &ctx.serenity_context().http,
        UserId::new(denied.user_id as u64),
        embeds::warning_embed()
            .title("Custom Role Denied")
            .description(format!("Your request for **{}** was denied: {}", denied.name, reason)),
    )
    .await;

    let embed = embeds::success_embed().description(format!("Request `#{}` denied", denied.id));
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Requests waiting for review
#[poise::command(slash_command, guild_only)]
pub async fn pending(ctx: Context<'_>) -> Result<(), Error> {
    ensure_access(ctx, &ctx.data().settings.roles.economy_review).await?;
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    let requests = custom_role_queries::list_requests(
        &ctx.data().pool,
        guild_id.get() as i64,
        RequestStatus::Pending,
        PENDING_LIMIT,
    )
    .await?;

    let description = if requests.is_empty() {
        "Nothing to review.".to_string()
    } else {
        let lines: Vec<String> = requests
            .iter()
            .map(|r| {
                format!(
                    "`#{}` {} **{}** {} <t:{}:R>",
                    r.id,
                    mention_id(r.user_id),
                    truncate(&r.name, 40),
                    r.color,
                    r.created_at.timestamp()
                )
            })
            .collect();
        embeds::bullet_list(&lines)
    };

    let embed = embeds::info_embed()
        .title("Pending Custom Roles")
        .description(description);
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Your custom roles
#[poise::command(slash_command, guild_only)]
pub async fn mine(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    let owned = custom_roles::owned_roles(
        &ctx.data().pool,
        guild_id.get() as i64,
        ctx.author().id.get() as i64,
    )
    .await?;

    let description = if owned.is_empty() {
        "You do not own any custom roles. Ask for one with `/custom_role request`.".to_string()
    } else {
        let lines: Vec<String> = owned
            .iter()
            .map(|o| format!("{} since <t:{}:d>", mention_role(o.role_id as u64), o.created_at.timestamp()))
            .collect();
        embeds::bullet_list(&lines)
    };

    let embed = embeds::economy_embed()
        .title("Your Custom Roles")
        .description(description);
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Sell copies of a role you own on the market
#[poise::command(slash_command, guild_only)]
pub async fn sell(
    ctx: Context<'_>,
    #[description = "Your custom role"] role: Role,
    #[description = "Price per copy"]
    #[min = 1]
    price: i64,
    #[description = "How many copies can be sold (unlimited when empty)"]
    #[min = 1]
    max_sales: Option<i64>,
    #[description = "Shown in the market"]
    #[max_length = 200]
    description: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    let listing = custom_roles::create_listing(
        &ctx.data().pool,
        guild_id.get() as i64,
        ctx.author().id.get() as i64,
        role.id.get() as i64,
        price,
        max_sales,
        description.as_deref().unwrap_or(""),
    )
    .await?;

    let limit = match listing.remaining() {
        Some(n) => format!("{} copies left", n),
        None => "unlimited copies".to_string(),
    };
    let embed = embeds::success_embed().title("Listed").description(format!(
        "{} is on the market for {} ({})",
        mention_role(listing.role_id as u64),
        format_coins(listing.price),
        limit
    ));
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Take your role off the market
#[poise::command(slash_command, guild_only)]
pub async fn unlist(
    ctx: Context<'_>,
    #[description = "Your listed role"] role: Role,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    custom_roles::remove_listing(
        &ctx.data().pool,
        guild_id.get() as i64,
        ctx.author().id.get() as i64,
        role.id.get() as i64,
    )
    .await?;

    let embed = embeds::success_embed()
        .description(format!("{} is no longer for sale", mention_role(role.id.get())));
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Pay to rename or recolor your role
#[poise::command(slash_command, guild_only)]
pub async fn edit(
    ctx: Context<'_>,
    #[description = "Your custom role"] role: Role,
    #[description = "New name"]
    #[max_length = 100]
    name: Option<String>,
    #[description = "New color such as #ff8800"] color: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;
    let price = ctx.data().settings.economy.custom_role_edit_price;

    let edit = custom_roles::request_edit(
        &ctx.data().pool,
        price,
        guild_id.get() as i64,
        ctx.author().id.get() as i64,
        role.id.get() as i64,
        name.as_deref(),
        color.as_deref(),
        Utc::now(),
    )
    .await?;

    let review = embeds::info_embed()
        .title(format!("Role Edit Request #{}", edit.id))
        .field("Member", mention_id(edit.user_id), true)
        .field("Role", mention_role(edit.role_id as u64), true)
        .field("New name", edit.new_name.as_deref().unwrap_or("unchanged"), true)
        .field("New color", edit.new_color.as_deref().unwrap_or("unchanged"), true)
        .footer(CreateEmbedFooter::new(format!(
            "/custom_role edit_approve request:{} or /custom_role edit_deny",
            edit.id
        )));
    post_for_review(ctx, review).await;

    let embed = embeds::success_embed().title("Edit Requested").description(format!(
        "Edit `#{}` is waiting for review. You paid {}, refunded if it is denied.",
        edit.id,
        format_coins(edit.price_paid)
    ));
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Apply a role edit
#[poise::command(slash_command, guild_only)]
pub async fn edit_approve(
    ctx: Context<'_>,
    #[description = "Edit request number"] request: i64,
) -> Result<(), Error> {
    ensure_access(ctx, &ctx.data().settings.roles.economy_review).await?;
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;
    let data = ctx.data();
    let guild = guild_id.get() as i64;

    let edit = custom_roles::pending_edit(&data.pool, guild, request).await?;

    let mut changes = EditRole::new();
    if let Some(name) = &edit.new_name {
        changes = changes.name(name);
    }
    if let Some(colour) = edit.new_color.as_deref().and_then(embeds::parse_hex_color) {
        changes = changes.colour(colour);
    }
    guild_id
        .edit_role(ctx, RoleId::new(edit.role_id as u64), changes)
        .await?;

    let applied = custom_roles::approve_edit(
        &data.pool,
        guild,
        request,
        ctx.author().id.get() as i64,
        Utc::now(),
    )
    .await?;

    notify::dm(
        &ctx.serenity_context().http,
        UserId::new(applied.user_id as u64),
        embeds::success_embed()
            .title("Role Edit Approved")
            .description(format!("Your changes to {} are live", mention_role(applied.role_id as u64))),
    )
    .await;

    let embed = embeds::success_embed().description(format!("Edit `#{}` applied", applied.id));
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Turn a role edit down and refund it
#[poise::command(slash_command, guild_only)]
pub async fn edit_deny(
    ctx: Context<'_>,
    #[description = "Edit request number"] request: i64,
) -> Result<(), Error> {
    ensure_access(ctx, &ctx.data().settings.roles.economy_review).await?;
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    let denied = custom_roles::deny_edit(
        &ctx.data().pool,
        guild_id.get() as i64,
        request,
        ctx.author().id.get() as i64,
        Utc::now(),
    )
    .await?;

    notify::dm(
        &ctx.serenity_context().http,
        UserId::new(denied.user_id as u64),
        embeds::warning_embed().title("Role Edit Denied").description(format!(
            "Your edit of {} was denied and {} went back to your bank",
            mention_role(denied.role_id as u64),
            format_coins(denied.price_paid)
        )),
    )
    .await;

    let embed = embeds::success_embed().description(format!("Edit `#{}` denied and refunded", denied.id));
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Stop treating a role as custom, for roles that were deleted or taken away
#[poise::command(slash_command, guild_only)]
pub async fn revoke(
    ctx: Context<'_>,
    #[description = "Role"] role: Role,
) -> Result<(), Error> {
    ensure_access(ctx, &ctx.data().settings.roles.economy_review).await?;
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    let owners = custom_roles::revoke_role(&ctx.data().pool, guild_id.get() as i64, role.id.get() as i64).await?;
    if owners == 0 {
        return Err(Error::not_found(format!("custom role {}", role.name)));
    }

    let embed = embeds::success_embed().description(format!(
        "{} is no longer a custom role and was taken off the market",
        mention_role(role.id.get())
    ));
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// One market line, shop items by number and listings by role
pub fn market_line(item: &MarketItem) -> String {
    let available = match item.available {
        Some(0) => "sold out".to_string(),
        Some(n) => format!("{} left", n),
        None => "unlimited".to_string(),
    };
    match item.kind {
        MarketKind::Shop => format!(
            "`#{}` {} {} ({})",
            item.item_id.unwrap_or_default(),
            mention_role(item.role_id as u64),
            format_coins(item.price),
            available
        ),
        MarketKind::Listing => {
            let mut line = format!(
                "{} {} ({}) from {}",
                mention_role(item.role_id as u64),
                format_coins(item.price),
                available,
                item.seller_id.map(mention_id).unwrap_or_default()
            );
            if !item.description.is_empty() {
                line.push_str(&format!(" - {}", truncate(&item.description, 60)));
            }
            line
        }
    }
}

/// Browse the shop together with roles members are selling
#[poise::command(slash_command, guild_only)]
pub async fn market(
    ctx: Context<'_>,
    #[description = "Page"]
    #[min = 1]
    page: Option<i64>,
    #[description = "Sort order"] sort: Option<SortChoice>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;
    let pool = &ctx.data().pool;
    let guild = guild_id.get() as i64;
    let page = page.unwrap_or(1).max(1);
    let order = ShopOrder::from(sort.unwrap_or(SortChoice::PriceDesc));

    custom_roles::cleanup_invalid_listings(pool, guild).await?;
    let items =
        custom_role_queries::market_items(pool, guild, order, PAGE_SIZE, (page - 1) * PAGE_SIZE)
            .await?;
    let total = custom_role_queries::market_count(pool, guild).await?;
    let pages = ((total + PAGE_SIZE - 1) / PAGE_SIZE).max(1);

    let description = if items.is_empty() {
        "Nothing for sale.".to_string()
    } else {
        items.iter().map(market_line).collect::<Vec<_>>().join("\n")
    };

    let embed = embeds::economy_embed()
        .title("Market")
        .description(description)
        .footer(CreateEmbedFooter::new(format!(
            "Page {}/{} • Shop items with /buy, member roles with /market_buy",
            page, pages
        )));
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Buy a role another member is selling
#[poise::command(slash_command, guild_only)]
pub async fn market_buy(
    ctx: Context<'_>,
    #[description = "Listed role"] role: Role,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;
    let data = ctx.data();
    let buyer = ctx.author().id;

    if let Some(member) = ctx.author_member().await {
        if member.roles.contains(&role.id) {
            return Err(Error::invalid("You already have this role"));
        }
    }

    let listing = custom_roles::purchase_listing(
        &data.pool,
        guild_id.get() as i64,
        buyer.get() as i64,
        role.id.get() as i64,
    )
    .await?;

    if let Err(e) = ctx
        .serenity_context()
        .http
        .add_member_role(guild_id, buyer, role.id, Some("Market purchase"))
        .await
    {
        warn!("Could not give market role {} to {}: {:?}", role.id, buyer, e);
        custom_roles::refund_listing(&data.pool, &listing, buyer.get() as i64).await?;
        return Err(Error::custom("The role could not be given, you have been refunded"));
    }

    let embed = embeds::success_embed().title("Purchased").description(format!(
        "You bought {} from {} for {}",
        mention_role(listing.role_id as u64),
        mention_id(listing.seller_id),
        format_coins(listing.price)
    ));
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(kind: MarketKind, available: Option<i64>) -> MarketItem {
        MarketItem {
            kind,
            item_id: (kind == MarketKind::Shop).then_some(4),
            role_id: 900,
            price: 1500,
            available,
            seller_id: (kind == MarketKind::Listing).then_some(2),
            description: String::new(),
        }
    }

    #[test]
    fn test_market_line() {
        let shop = market_line(&item(MarketKind::Shop, None));
        assert!(shop.starts_with("`#4` <@&900>"));
        assert!(shop.ends_with("(unlimited)"));

        let listing = market_line(&item(MarketKind::Listing, Some(0)));
        assert!(listing.contains("(sold out)"));
        assert!(listing.ends_with("from <@2>"));
    }
}

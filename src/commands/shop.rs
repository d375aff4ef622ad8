use chrono::Utc;
use poise::serenity_prelude::{CreateEmbedFooter, Role, RoleId, User};
use tracing::warn;

use crate::bot::data::Context;
use crate::bot::error::Error;
use crate::constants::embeds;
use crate::db::queries::shop::{self as shop_queries, ShopOrder};
use crate::services::economy::shop;
use crate::services::moderation::duration::{format_duration, parse_duration};
use crate::utils::formatting::{format_coins, mention_role};
use crate::utils::permissions::ensure_access;

const PAGE_SIZE: i64 = 10;

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum SortChoice {
    #[name = "Most expensive"]
    PriceDesc,
    #[name = "Cheapest"]
    PriceAsc,
    #[name = "Running out"]
    Availability,
}

impl From<SortChoice> for ShopOrder {
    fn from(choice: SortChoice) -> Self {
        match choice {
            SortChoice::PriceDesc => ShopOrder::PriceDesc,
            SortChoice::PriceAsc => ShopOrder::PriceAsc,
            SortChoice::Availability => ShopOrder::Availability,
        }
    }
}

/// Browse roles for sale
#[poise::command(slash_command, guild_only, rename = "shop")]
pub async fn shop_list(
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

    let items = shop_queries::list(pool, guild, order, PAGE_SIZE, (page - 1) * PAGE_SIZE).await?;
    let total = shop_queries::count(pool, guild).await?;
    let pages = ((total + PAGE_SIZE - 1) / PAGE_SIZE).max(1);

    let description = if items.is_empty() {
        "Nothing for sale.".to_string()
    } else {
        items
            .iter()
            .map(|item| {
                let stock = match item.stock {
                    Some(0) => "sold out".to_string(),
                    Some(n) => format!("{} left", n),
                    None => "unlimited".to_string(),
                };
                format!(
                    "`#{}` {} {} ({})",
                    item.id,
                    mention_role(item.role_id as u64),
                    format_coins(item.price),
                    stock
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let embed = embeds::economy_embed()
        .title("Role Shop")
        .description(description)
        .footer(CreateEmbedFooter::new(format!(
            "Page {}/{} • Buy with /buy, paid from the bank",
            page, pages
        )));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Buy a role from the shop
#[poise::command(slash_command, guild_only)]
pub async fn buy(
    ctx: Context<'_>,
    #[description = "Item number from /shop"] item: i64,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;
    let data = ctx.data();
    let buyer = ctx.author().id;

    let bought = shop::purchase(&data.pool, guild_id.get() as i64, buyer.get() as i64, item).await?;
    let role_id = RoleId::new(bought.role_id as u64);

    if let Err(e) = ctx
        .serenity_context()
        .http
        .add_member_role(guild_id, buyer, role_id, Some("Shop purchase"))
        .await
    {
        warn!("Could not give shop role {} to {}: {:?}", role_id, buyer, e);
        shop::refund(&data.pool, &bought, buyer.get() as i64).await?;
        return Err(Error::custom("The role could not be given, you have been refunded"));
    }

    let embed = embeds::success_embed()
        .title("Purchased")
        .description(format!(
            "You bought {} for {}",
            mention_role(bought.role_id as u64),
            format_coins(bought.price)
        ));
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Put a role up for sale
#[poise::command(slash_command, guild_only)]
pub async fn shop_add(
    ctx: Context<'_>,
    #[description = "Role to sell"] role: Role,
    #[description = "Price"]
    #[min = 0]
    price: i64,
    #[description = "How many can be sold (unlimited when empty)"]
    #[min = 0]
    stock: Option<i64>,
) -> Result<(), Error> {
    ensure_access(ctx, &ctx.data().settings.roles.economy_admin).await?;
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    let item = shop::add_listing(
        &ctx.data().pool,
        guild_id.get() as i64,
        role.id.get() as i64,
        price,
        stock,
    )
    .await?;

    let embed = embeds::success_embed()
        .title("Listed")
        .description(format!(
            "`#{}` {} for {}",
            item.id,
            mention_role(item.role_id as u64),
            format_coins(item.price)
        ));
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Take a role off sale
#[poise::command(slash_command, guild_only)]
pub async fn shop_remove(
    ctx: Context<'_>,
    #[description = "Item number from /shop"] item: i64,
) -> Result<(), Error> {
    ensure_access(ctx, &ctx.data().settings.roles.economy_admin).await?;
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    if !shop_queries::remove(&ctx.data().pool, guild_id.get() as i64, item).await? {
        return Err(Error::not_found(format!("shop item #{}", item)));
    }

    let embed = embeds::success_embed().description(format!("Removed item `#{}`", item));
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Give a member a role for a limited time
#[poise::command(slash_command, guild_only)]
pub async fn temprole(
    ctx: Context<'_>,
    #[description = "Member"] user: User,
    #[description = "Role"] role: Role,
    #[description = "Duration such as 30m, 2h or 7d"] duration: String,
) -> Result<(), Error> {
    ensure_access(ctx, &ctx.data().settings.roles.economy_admin).await?;
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    let length = parse_duration(&duration);
    let granted = shop::grant_temp_role(
        &ctx.serenity_context().http,
        &ctx.data().pool,
        guild_id,
        user.id,
        role.id,
        length,
        Utc::now(),
    )
    .await?;

    let embed = embeds::success_embed()
        .title("Temporary Role Granted")
        .description(format!(
            "<@{}> has {} for {} (until <t:{}:f>)",
            user.id,
            mention_role(role.id.get()),
            format_duration(length),
            granted.expires_at.timestamp()
        ));
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

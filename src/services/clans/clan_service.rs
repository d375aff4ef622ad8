use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::bot::error::Error;
use crate::config::ClanSettings;
use crate::constants::economy::CLAN_SLOTS_PER_PURCHASE;
use crate::db::models::{Clan, ClanMember, ClanRole};
use crate::db::queries::{account, clan};

pub const MAX_NAME_LENGTH: usize = 32;

/// Take `amount` from a member's cash inside an open transaction
async fn charge(
    conn: &mut SqliteConnection,
    guild_id: i64,
    user_id: i64,
    amount: i64,
) -> Result<(), Error> {
    account::ensure(&mut *conn, guild_id, user_id).await?;
    let payer = account::get(&mut *conn, guild_id, user_id)
        .await?
        .ok_or_else(|| Error::not_found("account"))?;

    if !account::try_spend_cash(&mut *conn, guild_id, user_id, amount).await? {
        return Err(Error::InsufficientFunds {
            needed: amount,
            available: payer.cash,
        });
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<&str, Error> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::invalid("Clan name cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(Error::invalid(format!(
            "Clan name can be at most {} characters",
            MAX_NAME_LENGTH
        )));
    }
    Ok(name)
}

pub async fn create(
    pool: &SqlitePool,
    settings: &ClanSettings,
    guild_id: i64,
    owner_id: i64,
    name: &str,
    now: DateTime<Utc>,
) -> Result<Clan, Error> {
    let name = validate_name(name)?;

    let mut tx = pool.begin().await?;
    if let Some(existing) = clan::clan_of(&mut *tx, owner_id).await? {
        return Err(Error::invalid(format!(
            "You are already in {}",
            existing.display_name()
        )));
    }
    if clan::name_taken(&mut *tx, name).await? {
        return Err(Error::invalid(format!("The name \"{}\" is taken", name)));
    }

    charge(&mut tx, guild_id, owner_id, settings.create_cost).await?;
    let created = clan::insert(
        &mut *tx,
        guild_id,
        name,
        owner_id,
        settings.default_max_members,
        now,
    )
    .await?;
    clan::add_member(&mut *tx, created.id, owner_id, ClanRole::Owner, now).await?;
    tx.commit().await?;

    info!("Clan {} ({}) created by {}", created.name, created.id, owner_id);
    Ok(created)
}

pub async fn by_id(pool: &SqlitePool, clan_id: i64) -> Result<Option<Clan>, Error> {
    Ok(clan::get_by_id(pool, clan_id).await?)
}

pub async fn by_name(pool: &SqlitePool, name: &str) -> Result<Option<Clan>, Error> {
    Ok(clan::get_by_name(pool, name.trim()).await?)
}

pub async fn clan_of(pool: &SqlitePool, user_id: i64) -> Result<Option<Clan>, Error> {
    Ok(clan::clan_of(pool, user_id).await?)
}

pub async fn members(pool: &SqlitePool, clan_id: i64) -> Result<Vec<ClanMember>, Error> {
    Ok(clan::members(pool, clan_id).await?)
}

pub async fn member_role(
    pool: &SqlitePool,
    clan_id: i64,
    user_id: i64,
) -> Result<Option<ClanRole>, Error> {
    Ok(clan::member_role(pool, clan_id, user_id).await?)
}

/// Role of `actor` in the clan, or an error when they are not in it
async fn require_role(pool: &SqlitePool, clan_id: i64, actor_id: i64) -> Result<ClanRole, Error> {
    clan::member_role(pool, clan_id, actor_id)
        .await?
        .ok_or_else(|| Error::PermissionDenied("You are not a member of this clan".to_string()))
}

async fn require_owner(pool: &SqlitePool, clan_id: i64, actor_id: i64) -> Result<Clan, Error> {
    let found = clan::get_by_id(pool, clan_id)
        .await?
        .ok_or_else(|| Error::not_found("clan"))?;
    if found.owner_id != actor_id {
        return Err(Error::PermissionDenied(
            "Only the clan owner can do that".to_string(),
        ));
    }
    Ok(found)
}

/// Add a user as a plain member, respecting the member cap
pub async fn add_member(
    pool: &SqlitePool,
    clan_id: i64,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<(), Error> {
    let mut tx = pool.begin().await?;
    let target = clan::get_by_id(&mut *tx, clan_id)
        .await?
        .ok_or_else(|| Error::not_found("clan"))?;

    if clan::clan_of(&mut *tx, user_id).await?.is_some() {
        return Err(Error::invalid("That member is already in a clan"));
    }
    if clan::member_count(&mut *tx, clan_id).await? >= target.max_members {
        return Err(Error::invalid(format!(
            "{} is full ({} members)",
            target.display_name(),
            target.max_members
        )));
    }
    if !clan::add_member(&mut *tx, clan_id, user_id, ClanRole::Member, now).await? {
        return Err(Error::invalid("That member is already in this clan"));
    }
    tx.commit().await?;

    info!("{} joined clan {}", user_id, clan_id);
    Ok(())
}

/// Checks an invitation can be sent before the invitee is asked
pub async fn check_invite(
    pool: &SqlitePool,
    clan_id: i64,
    actor_id: i64,
    user_id: i64,
) -> Result<Clan, Error> {
    if !require_role(pool, clan_id, actor_id).await?.can_manage() {
        return Err(Error::PermissionDenied(
            "Only owners and officers can invite".to_string(),
        ));
    }
    let target = clan::get_by_id(pool, clan_id)
        .await?
        .ok_or_else(|| Error::not_found("clan"))?;
    if clan::clan_of(pool, user_id).await?.is_some() {
        return Err(Error::invalid("That member is already in a clan"));
    }
    if clan::member_count(pool, clan_id).await? >= target.max_members {
        return Err(Error::invalid("The clan is full"));
    }
    Ok(target)
}

pub async fn kick(
    pool: &SqlitePool,
    clan_id: i64,
    actor_id: i64,
    user_id: i64,
) -> Result<(), Error> {
    let actor_role = require_role(pool, clan_id, actor_id).await?;
    let target_role = clan::member_role(pool, clan_id, user_id)
        .await?
        .ok_or_else(|| Error::not_found("clan member"))?;

    let allowed = match (actor_role, target_role) {
        (_, ClanRole::Owner) => false,
        (ClanRole::Owner, _) => true,
        (ClanRole::Officer, ClanRole::Member) => true,
        _ => false,
    };
    if !allowed || actor_id == user_id {
        return Err(Error::PermissionDenied(
            "You cannot kick that member".to_string(),
        ));
    }

    clan::remove_member(pool, clan_id, user_id).await?;
    info!("{} kicked {} from clan {}", actor_id, user_id, clan_id);
    Ok(())
}

/// Leave the user's current clan. The owner cannot leave.
pub async fn leave(pool: &SqlitePool, user_id: i64) -> Result<Clan, Error> {
    let current = clan::clan_of(pool, user_id)
        .await?
        .ok_or_else(|| Error::invalid("You are not in a clan"))?;
    if current.owner_id == user_id {
        return Err(Error::invalid("The owner cannot leave their own clan"));
    }

    clan::remove_member(pool, current.id, user_id).await?;
    info!("{} left clan {}", user_id, current.id);
    Ok(current)
}

/// Change a member's role. Only the owner may do this and ownership is not transferable here.
pub async fn set_member_role(
    pool: &SqlitePool,
    clan_id: i64,
    actor_id: i64,
    user_id: i64,
    role: ClanRole,
) -> Result<(), Error> {
    require_owner(pool, clan_id, actor_id).await?;
    if role == ClanRole::Owner || actor_id == user_id {
        return Err(Error::invalid("Ownership cannot be changed"));
    }
    if !clan::set_member_role(pool, clan_id, user_id, role).await? {
        return Err(Error::not_found("clan member"));
    }

    info!("{} is now {} in clan {}", user_id, role, clan_id);
    Ok(())
}

pub async fn update_info(
    pool: &SqlitePool,
    clan_id: i64,
    actor_id: i64,
    description: Option<&str>,
    color: Option<&str>,
    emoji: Option<&str>,
) -> Result<Clan, Error> {
    require_owner(pool, clan_id, actor_id).await?;
    if let Some(color) = color {
        if !is_hex_color(color) {
            return Err(Error::invalid("Color must look like #5865F2"));
        }
    }

    clan::update_info(pool, clan_id, description, color, emoji)
        .await?
        .ok_or_else(|| Error::not_found("clan"))
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Buy another pack of member slots, up to the configured cap
pub async fn buy_member_slots(
    pool: &SqlitePool,
    settings: &ClanSettings,
    clan_id: i64,
    actor_id: i64,
) -> Result<Clan, Error> {
    let owned = require_owner(pool, clan_id, actor_id).await?;
    if owned.max_members >= settings.max_member_slots {
        return Err(Error::invalid(format!(
            "The clan already has the maximum of {} slots",
            settings.max_member_slots
        )));
    }

    let new_max = (owned.max_members + CLAN_SLOTS_PER_PURCHASE).min(settings.max_member_slots);
    let mut tx = pool.begin().await?;
    charge(&mut tx, owned.guild_id, actor_id, settings.member_slot_cost).await?;
    clan::set_max_members(&mut *tx, clan_id, new_max).await?;
    tx.commit().await?;

    info!("Clan {} now has {} member slots", clan_id, new_max);
    clan::get_by_id(pool, clan_id)
        .await?
        .ok_or_else(|| Error::not_found("clan"))
}

pub async fn buy_voice_channel(
    pool: &SqlitePool,
    settings: &ClanSettings,
    clan_id: i64,
    actor_id: i64,
) -> Result<Clan, Error> {
    let owned = require_owner(pool, clan_id, actor_id).await?;
    if owned.voice_channels_count >= settings.max_voice_channels {
        return Err(Error::invalid(format!(
            "The clan already has the maximum of {} voice channels",
            settings.max_voice_channels
        )));
    }

    let mut tx = pool.begin().await?;
    charge(&mut tx, owned.guild_id, actor_id, settings.voice_channel_cost).await?;
    clan::increment_voice_channels(&mut *tx, clan_id).await?;
    tx.commit().await?;

    info!("Clan {} bought a voice channel", clan_id);
    clan::get_by_id(pool, clan_id)
        .await?
        .ok_or_else(|| Error::not_found("clan"))
}

pub async fn top_by_members(
    pool: &SqlitePool,
    guild_id: i64,
    limit: i64,
) -> Result<Vec<clan::ClanStanding>, Error> {
    Ok(clan::top_by_members(pool, guild_id, limit).await?)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::db::pool::test_pool;
    use crate::services::economy::wallet;

    const GUILD: i64 = 1;
    const OWNER: i64 = 100;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap()
    }

    async fn funded_clan(pool: &SqlitePool, settings: &ClanSettings) -> Clan {
        wallet::adjust(pool, GUILD, OWNER, settings.create_cost + 50_000, 0)
            .await
            .unwrap();
        create(pool, settings, GUILD, OWNER, "Ravens", now()).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_charges_owner() {
        let pool = test_pool().await;
        let settings = ClanSettings::default();
        let created = funded_clan(&pool, &settings).await;

        let owner = account::get_or_create(&pool, GUILD, OWNER).await.unwrap();
        assert_eq!(owner.cash, 50_000);
        assert_eq!(created.max_members, settings.default_max_members);
        assert_eq!(
            member_role(&pool, created.id, OWNER).await.unwrap(),
            Some(ClanRole::Owner)
        );
        assert_eq!(clan_of(&pool, OWNER).await.unwrap().unwrap().id, created.id);
    }

    #[tokio::test]
    async fn test_create_rejections() {
        let pool = test_pool().await;
        let settings = ClanSettings::default();

        let err = create(&pool, &settings, GUILD, 7, "Broke", now()).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds { .. }));
        assert!(clan_of(&pool, 7).await.unwrap().is_none());

        funded_clan(&pool, &settings).await;
        wallet::adjust(&pool, GUILD, 8, settings.create_cost, 0).await.unwrap();
        assert!(create(&pool, &settings, GUILD, 8, "ravens", now()).await.is_err());
        assert!(create(&pool, &settings, GUILD, 8, "   ", now()).await.is_err());
        // Failed attempts leave the cash untouched
        let other = account::get_or_create(&pool, GUILD, 8).await.unwrap();
        assert_eq!(other.cash, settings.create_cost);

        wallet::adjust(&pool, GUILD, OWNER, settings.create_cost, 0).await.unwrap();
        assert!(create(&pool, &settings, GUILD, OWNER, "Second", now()).await.is_err());
    }

    #[tokio::test]
    async fn test_member_cap() {
        let pool = test_pool().await;
        let settings = ClanSettings {
            default_max_members: 2,
            ..ClanSettings::default()
        };
        let created = funded_clan(&pool, &settings).await;

        add_member(&pool, created.id, 201, now()).await.unwrap();
        assert!(add_member(&pool, created.id, 201, now()).await.is_err());
        assert!(add_member(&pool, created.id, 202, now()).await.is_err());
        assert_eq!(members(&pool, created.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_kick_and_roles() {
        let pool = test_pool().await;
        let settings = ClanSettings::default();
        let created = funded_clan(&pool, &settings).await;
        add_member(&pool, created.id, 201, now()).await.unwrap();
        add_member(&pool, created.id, 202, now()).await.unwrap();

        // Members cannot kick or promote
        assert!(kick(&pool, created.id, 201, 202).await.is_err());
        assert!(set_member_role(&pool, created.id, 201, 202, ClanRole::Officer)
            .await
            .is_err());

        set_member_role(&pool, created.id, OWNER, 201, ClanRole::Officer)
            .await
            .unwrap();
        assert!(kick(&pool, created.id, 201, OWNER).await.is_err());
        kick(&pool, created.id, 201, 202).await.unwrap();
        assert!(member_role(&pool, created.id, 202).await.unwrap().is_none());

        let listed = members(&pool, created.id).await.unwrap();
        assert_eq!(listed[0].role, ClanRole::Owner);
        assert_eq!(listed[1].role, ClanRole::Officer);
    }

    #[tokio::test]
    async fn test_leave() {
        let pool = test_pool().await;
        let settings = ClanSettings::default();
        let created = funded_clan(&pool, &settings).await;
        add_member(&pool, created.id, 201, now()).await.unwrap();

        assert!(leave(&pool, OWNER).await.is_err());
        assert_eq!(leave(&pool, 201).await.unwrap().id, created.id);
        assert!(leave(&pool, 201).await.is_err());
    }

    #[tokio::test]
    async fn test_buy_member_slots_caps() {
        let pool = test_pool().await;
        let settings = ClanSettings {
            default_max_members: 35,
            ..ClanSettings::default()
        };
        let created = funded_clan(&pool, &settings).await;

        let upgraded = buy_member_slots(&pool, &settings, created.id, OWNER).await.unwrap();
        assert_eq!(upgraded.max_members, 45);
        let upgraded = buy_member_slots(&pool, &settings, created.id, OWNER).await.unwrap();
        assert_eq!(upgraded.max_members, settings.max_member_slots);
        assert!(buy_member_slots(&pool, &settings, created.id, OWNER).await.is_err());

        let owner = account::get_or_create(&pool, GUILD, OWNER).await.unwrap();
        assert_eq!(owner.cash, 50_000 - 2 * settings.member_slot_cost);
    }

    #[tokio::test]
    async fn test_buy_voice_channel_limit() {
        let pool = test_pool().await;
        let settings = ClanSettings::default();
        let created = funded_clan(&pool, &settings).await;

        for expected in 2..=settings.max_voice_channels {
            let upgraded = buy_voice_channel(&pool, &settings, created.id, OWNER).await.unwrap();
            assert_eq!(upgraded.voice_channels_count, expected);
        }
        assert!(buy_voice_channel(&pool, &settings, created.id, OWNER).await.is_err());
    }

    #[tokio::test]
    async fn test_update_info_and_top() {
        let pool = test_pool().await;
        let settings = ClanSettings::default();
        let created = funded_clan(&pool, &settings).await;
        add_member(&pool, created.id, 201, now()).await.unwrap();

        assert!(update_info(&pool, created.id, OWNER, None, Some("blue"), None)
            .await
            .is_err());
        let updated = update_info(&pool, created.id, OWNER, Some("We fly"), Some("#112233"), None)
            .await
            .unwrap();
        assert_eq!(updated.description, "We fly");
        assert_eq!(updated.color, "#112233");
        assert_eq!(updated.emoji, created.emoji);

        wallet::adjust(&pool, GUILD, 300, settings.create_cost, 0).await.unwrap();
        create(&pool, &settings, GUILD, 300, "Owls", now()).await.unwrap();

        let top = top_by_members(&pool, GUILD, 10).await.unwrap();
        assert_eq!(top[0].name, "Ravens");
        assert_eq!(top[0].member_count, 2);
        assert_eq!(top[1].member_count, 1);
        assert_eq!(by_name(&pool, "OWLS").await.unwrap().unwrap().owner_id, 300);
    }
}

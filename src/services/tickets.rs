use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;

use crate::bot::error::Error;
use crate::config::TicketSettings;
use crate::db::models::Ticket;
use crate::db::queries::ticket;

/// Open tickets a member may hold at once
pub const MAX_OPEN_TICKETS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketType {
    StaffApplication,
    ServerAppeal,
    ModerationAppeal,
    TechSupport,
}

impl TicketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketType::StaffApplication => "staff_application",
            TicketType::ServerAppeal => "server_appeal",
            TicketType::ModerationAppeal => "moderation_appeal",
            TicketType::TechSupport => "tech_support",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "staff_application" => Some(TicketType::StaffApplication),
            "server_appeal" => Some(TicketType::ServerAppeal),
            "moderation_appeal" => Some(TicketType::ModerationAppeal),
            "tech_support" => Some(TicketType::TechSupport),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TicketType::StaffApplication => "Staff Application",
            TicketType::ServerAppeal => "Server Appeal",
            TicketType::ModerationAppeal => "Moderation Appeal",
            TicketType::TechSupport => "Tech Support",
        }
    }

    /// Roles pinged when a ticket of this type is opened
    pub fn staff_roles<'a>(&self, settings: &'a TicketSettings) -> &'a [u64] {
        match self {
            TicketType::StaffApplication => &settings.staff_application_roles,
            TicketType::ServerAppeal => &settings.server_appeal_roles,
            TicketType::ModerationAppeal => &settings.moderation_appeal_roles,
            TicketType::TechSupport => &settings.tech_support_roles,
        }
    }
}

pub fn format_ticket_number(n: i64) -> String {
    format!("TICKET-{:04}", n)
}

/// Reserve the next ticket number
pub async fn next_ticket_number(pool: &SqlitePool) -> Result<String, Error> {
    let n = ticket::next_number(pool).await?;
    Ok(format_ticket_number(n))
}

/// Store a ticket. Returns `false` when the number is already taken.
#[allow(clippy::too_many_arguments)]
pub async fn create(
    pool: &SqlitePool,
    ticket_number: &str,
    guild_id: i64,
    user_id: i64,
    ticket_type: TicketType,
    description: &str,
    position: Option<&str>,
    now: DateTime<Utc>,
) -> Result<bool, Error> {
    let created = ticket::insert(
        pool,
        ticket_number,
        guild_id,
        user_id,
        ticket_type.as_str(),
        description,
        position,
        now,
    )
    .await?
    .is_some();

    if created {
        info!("{} opened {} ({})", user_id, ticket_number, ticket_type.as_str());
    }
    Ok(created)
}

/// Reject members who already hold too many open tickets
pub async fn check_can_open(pool: &SqlitePool, guild_id: i64, user_id: i64) -> Result<(), Error> {
    let open = ticket::count_open_for_user(pool, guild_id, user_id).await?;
    if open >= MAX_OPEN_TICKETS {
        return Err(Error::invalid(format!(
            "You already have {} open tickets",
            open
        )));
    }
    Ok(())
}

pub async fn get(pool: &SqlitePool, ticket_number: &str) -> Result<Option<Ticket>, Error> {
    Ok(ticket::get(pool, ticket_number).await?)
}

pub async fn close(pool: &SqlitePool, ticket_number: &str) -> Result<bool, Error> {
    let closed = ticket::close(pool, ticket_number).await?;
    if closed {
        info!("{} closed", ticket_number);
    }
    Ok(closed)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::db::pool::test_pool;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_ticket_number_format() {
        assert_eq!(format_ticket_number(7), "TICKET-0007");
        assert_eq!(format_ticket_number(12345), "TICKET-12345");
    }

    #[test]
    fn test_staff_roles_by_type() {
        let settings = TicketSettings {
            staff_application_roles: vec![1],
            tech_support_roles: vec![4, 5],
            ..TicketSettings::default()
        };
        assert_eq!(TicketType::StaffApplication.staff_roles(&settings), &[1]);
        assert_eq!(TicketType::TechSupport.staff_roles(&settings), &[4, 5]);
        assert!(TicketType::ServerAppeal.staff_roles(&settings).is_empty());
        assert_eq!(TicketType::parse("server_appeal"), Some(TicketType::ServerAppeal));
        assert_eq!(TicketType::parse("unknown"), None);
    }

    #[tokio::test]
    async fn test_numbers_increase() {
        let pool = test_pool().await;
        assert_eq!(next_ticket_number(&pool).await.unwrap(), "TICKET-0001");
        assert_eq!(next_ticket_number(&pool).await.unwrap(), "TICKET-0002");
    }

    #[tokio::test]
    async fn test_create_get_close() {
        let pool = test_pool().await;
        let number = next_ticket_number(&pool).await.unwrap();

        assert!(create(
            &pool,
            &number,
            1,
            10,
            TicketType::StaffApplication,
            "I'd like to help",
            Some("moderator"),
            now()
        )
        .await
        .unwrap());
        assert!(!create(&pool, &number, 1, 11, TicketType::TechSupport, "dup", None, now())
            .await
            .unwrap());

        let stored = get(&pool, &number).await.unwrap().unwrap();
        assert_eq!(stored.user_id, 10);
        assert_eq!(stored.ticket_type, "staff_application");
        assert_eq!(stored.position.as_deref(), Some("moderator"));
        assert!(stored.is_open());

        assert!(close(&pool, &number).await.unwrap());
        assert!(!close(&pool, &number).await.unwrap());
        assert!(!close(&pool, "TICKET-9999").await.unwrap());
        assert!(!get(&pool, &number).await.unwrap().unwrap().is_open());
    }

    #[tokio::test]
    async fn test_open_ticket_limit() {
        let pool = test_pool().await;
        for _ in 0..MAX_OPEN_TICKETS {
            let number = next_ticket_number(&pool).await.unwrap();
            create(&pool, &number, 1, 10, TicketType::TechSupport, "help", None, now())
                .await
                .unwrap();
        }
        assert!(check_can_open(&pool, 1, 10).await.is_err());
        check_can_open(&pool, 1, 11).await.unwrap();

        close(&pool, "TICKET-0001").await.unwrap();
        check_can_open(&pool, 1, 10).await.unwrap();
    }
}

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum TicketStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Ticket {
    pub id: i64,
    pub ticket_number: String,
    pub guild_id: i64,
    pub user_id: i64,
    pub ticket_type: String,
    pub description: String,
    pub position: Option<String>,
    pub created_at: DateTime<Utc>,
    pub status: TicketStatus,
}

impl Ticket {
    pub fn is_open(&self) -> bool {
        self.status == TicketStatus::Open
    }
}

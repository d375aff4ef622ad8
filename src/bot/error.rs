use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Discord API error: {0}")]
    Serenity(#[from] serenity::Error),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not enough money: need {needed}, have {available}")]
    InsufficientFunds { needed: i64, available: i64 },

    #[error("On cooldown for another {0}")]
    Cooldown(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("{0}")]
    Custom(String),
}

impl Error {
    pub fn custom<S: Into<String>>(msg: S) -> Self {
        Error::Custom(msg.into())
    }

    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        Error::InvalidOperation(msg.into())
    }

    pub fn not_found<S: Into<String>>(what: S) -> Self {
        Error::NotFound(what.into())
    }

    /// Errors caused by the caller rather than the bot, safe to show verbatim
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, Error::Database(_) | Error::Serenity(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InsufficientFunds {
            needed: 1000,
            available: 250,
        };
        assert_eq!(err.to_string(), "Not enough money: need 1000, have 250");

        let err = Error::not_found("clan `Wolves`");
        assert_eq!(err.to_string(), "Not found: clan `Wolves`");
        assert!(err.is_user_facing());

        let err = Error::from(sqlx::Error::RowNotFound);
        assert!(!err.is_user_facing());
    }
}

use std::collections::BTreeMap;

use sqlx::SqlitePool;

use crate::bot::error::Error;
use crate::db::queries::account;

/// Level before and after an XP grant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelChange {
    pub from: i64,
    pub to: i64,
    pub xp: f64,
}

impl LevelChange {
    pub fn leveled_up(&self) -> bool {
        self.to > self.from
    }
}

/// Spend accumulated XP on level ups.
///
/// `table[level]` is the XP needed to leave `level`. Levels missing from the
/// table are terminal: XP keeps accumulating but the level no longer rises.
pub fn apply_level_ups(mut level: i64, mut xp: f64, table: &BTreeMap<i64, f64>) -> (i64, f64) {
    while let Some(&needed) = table.get(&level) {
        if needed <= 0.0 || xp < needed {
            break;
        }
        xp -= needed;
        level += 1;
    }
    (level, xp)
}

/// XP needed to leave `level`, falling back to `level * 100` past the table
pub fn xp_to_next(level: i64, table: &BTreeMap<i64, f64>) -> f64 {
    table
        .get(&level)
        .copied()
        .unwrap_or((level * 100) as f64)
}

/// Add XP to a member and apply any resulting level ups
pub async fn grant_xp(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
    amount: f64,
    table: &BTreeMap<i64, f64>,
) -> Result<LevelChange, Error> {
    let mut tx = pool.begin().await?;
    account::ensure(&mut *tx, guild_id, user_id).await?;
    let current = account::get(&mut *tx, guild_id, user_id)
        .await?
        .ok_or_else(|| Error::not_found("account"))?;

    let (level, xp) = apply_level_ups(current.level, current.xp + amount.max(0.0), table);
    account::set_progress(&mut *tx, guild_id, user_id, level, xp).await?;
    tx.commit().await?;

    Ok(LevelChange {
        from: current.level,
        to: level,
        xp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_xp_table;
    use crate::db::pool::test_pool;

    #[test]
    fn test_apply_level_ups() {
        let table = default_xp_table();

        assert_eq!(apply_level_ups(1, 99.5, &table), (1, 99.5));
        assert_eq!(apply_level_ups(1, 100.0, &table), (2, 0.0));
        // 100 + 200 + 300 = 600 carries level 1 to 4
        assert_eq!(apply_level_ups(1, 650.0, &table), (4, 50.0));
    }

    #[test]
    fn test_levels_stop_past_table() {
        let mut table = BTreeMap::new();
        table.insert(1, 10.0);

        assert_eq!(apply_level_ups(1, 1000.0, &table), (2, 990.0));
        assert_eq!(xp_to_next(2, &table), 200.0);
        assert_eq!(xp_to_next(1, &table), 10.0);
    }

    #[test]
    fn test_zero_requirement_does_not_loop() {
        let mut table = BTreeMap::new();
        table.insert(1, 0.0);
        assert_eq!(apply_level_ups(1, 5.0, &table), (1, 5.0));
    }

    #[tokio::test]
    async fn test_grant_xp_levels_up() {
        let pool = test_pool().await;
        let table = default_xp_table();

        let change = grant_xp(&pool, 1, 2, 60.0, &table).await.unwrap();
        assert!(!change.leveled_up());

        let change = grant_xp(&pool, 1, 2, 60.0, &table).await.unwrap();
        assert_eq!(change.from, 1);
        assert_eq!(change.to, 2);
        assert!((change.xp - 20.0).abs() < f64::EPSILON);

        let stored = account::get(&pool, 1, 2).await.unwrap().unwrap();
        assert_eq!(stored.level, 2);
    }
}

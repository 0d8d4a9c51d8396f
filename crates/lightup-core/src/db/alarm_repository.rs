//! Alarm repository implementation

use crate::error::{Error, Result};
use crate::models::{Alarm, AlarmId, DaysOfWeek, RemoteId};
use crate::util::unix_timestamp_millis;
use libsql::{params, Connection, Row, Value};

const ALARM_COLUMNS: &str = "id, remote_id, hour, minute, days_of_week, enabled, label, alert, \
     vibrate, delete_after_use, timestamp";

/// Selection applied when listing alarms
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AlarmFilter {
    /// Every stored alarm
    #[default]
    All,
    /// Alarms that are switched on
    Enabled,
    /// Alarms that carry a LightUpPi server ID
    Synced,
    /// Alarms never pushed to the server
    LocalOnly,
}

impl AlarmFilter {
    const fn where_clause(self) -> &'static str {
        match self {
            Self::All => "1 = 1",
            Self::Enabled => "enabled = 1",
            Self::Synced => "remote_id IS NOT NULL",
            Self::LocalOnly => "remote_id IS NULL",
        }
    }
}

/// Trait for local alarm storage operations (async)
#[allow(async_fn_in_trait)]
pub trait AlarmStore {
    /// Get an alarm by its local ID
    async fn get(&self, id: AlarmId) -> Result<Option<Alarm>>;

    /// Get the first alarm carrying the given LightUpPi server ID
    async fn get_by_remote_id(&self, remote_id: RemoteId) -> Result<Option<Alarm>>;

    /// List alarms matching `filter`, ordered by time of day
    async fn list(&self, filter: AlarmFilter) -> Result<Vec<Alarm>>;

    /// Insert a new alarm and return it with its assigned local ID
    async fn insert(&self, alarm: &Alarm) -> Result<Alarm>;

    /// Overwrite a stored alarm.
    ///
    /// With `bump_timestamp` the edit marker is set to now; otherwise the
    /// alarm's own timestamp is stored as-is.
    async fn update(&self, alarm: &Alarm, bump_timestamp: bool) -> Result<Alarm>;

    /// Delete an alarm
    async fn delete(&self, id: AlarmId) -> Result<()>;
}

/// libSQL implementation of `AlarmStore`
pub struct LibSqlAlarmRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlAlarmRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse an alarm from a database row
    fn parse_alarm(row: &Row) -> Result<Alarm> {
        let remote_id = match row.get_value(1)? {
            Value::Integer(id) => Some(RemoteId::new(id)),
            _ => None,
        };

        Ok(Alarm {
            id: Some(AlarmId::new(row.get::<i64>(0)?)),
            remote_id,
            hour: Self::column_u8(row, 2, "hour")?,
            minute: Self::column_u8(row, 3, "minute")?,
            days: DaysOfWeek::from_bits(Self::column_u8(row, 4, "days_of_week")?),
            enabled: row.get::<i64>(5)? != 0,
            label: row.get(6)?,
            alert: row.get(7)?,
            vibrate: row.get::<i64>(8)? != 0,
            delete_after_use: row.get::<i64>(9)? != 0,
            timestamp: row.get(10)?,
        })
    }

    fn column_u8(row: &Row, index: i32, name: &str) -> Result<u8> {
        let value = row.get::<i64>(index)?;
        u8::try_from(value)
            .map_err(|_| Error::Database(format!("column {name} out of range: {value}")))
    }

    async fn query_alarms(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<Alarm>> {
        let mut rows = self.conn.query(sql, params).await?;
        let mut alarms = Vec::new();
        while let Some(row) = rows.next().await? {
            alarms.push(Self::parse_alarm(&row)?);
        }
        Ok(alarms)
    }

    fn require_id(alarm: &Alarm) -> Result<AlarmId> {
        alarm
            .id
            .ok_or_else(|| Error::InvalidInput("alarm has not been stored yet".into()))
    }
}

fn remote_id_value(remote_id: Option<RemoteId>) -> Value {
    remote_id.map_or(Value::Null, |id| Value::Integer(id.get()))
}

impl AlarmStore for LibSqlAlarmRepository<'_> {
    async fn get(&self, id: AlarmId) -> Result<Option<Alarm>> {
        let sql = format!("SELECT {ALARM_COLUMNS} FROM alarms WHERE id = ?");
        Ok(self
            .query_alarms(&sql, params![id.get()])
            .await?
            .into_iter()
            .next())
    }

    async fn get_by_remote_id(&self, remote_id: RemoteId) -> Result<Option<Alarm>> {
        let sql =
            format!("SELECT {ALARM_COLUMNS} FROM alarms WHERE remote_id = ? ORDER BY id LIMIT 1");
        Ok(self
            .query_alarms(&sql, params![remote_id.get()])
            .await?
            .into_iter()
            .next())
    }

    async fn list(&self, filter: AlarmFilter) -> Result<Vec<Alarm>> {
        let sql = format!(
            "SELECT {ALARM_COLUMNS} FROM alarms WHERE {} ORDER BY hour, minute, id",
            filter.where_clause()
        );
        self.query_alarms(&sql, ()).await
    }

    async fn insert(&self, alarm: &Alarm) -> Result<Alarm> {
        self.conn
            .execute(
                "INSERT INTO alarms (remote_id, hour, minute, days_of_week, enabled, label, alert, \
                 vibrate, delete_after_use, timestamp) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    remote_id_value(alarm.remote_id),
                    i64::from(alarm.hour),
                    i64::from(alarm.minute),
                    i64::from(alarm.days.bits()),
                    i64::from(alarm.enabled),
                    alarm.label.clone(),
                    alarm.alert.clone(),
                    i64::from(alarm.vibrate),
                    i64::from(alarm.delete_after_use),
                    alarm.timestamp
                ],
            )
            .await?;

        let id = AlarmId::new(self.conn.last_insert_rowid());
        tracing::debug!(%id, remote_id = ?alarm.remote_id, "Inserted alarm");
        Ok(Alarm {
            id: Some(id),
            ..alarm.clone()
        })
    }

    async fn update(&self, alarm: &Alarm, bump_timestamp: bool) -> Result<Alarm> {
        let id = Self::require_id(alarm)?;
        let timestamp = if bump_timestamp {
            unix_timestamp_millis()
        } else {
            alarm.timestamp
        };

        let rows = self
            .conn
            .execute(
                "UPDATE alarms SET remote_id = ?, hour = ?, minute = ?, days_of_week = ?, \
                 enabled = ?, label = ?, alert = ?, vibrate = ?, delete_after_use = ?, \
                 timestamp = ? WHERE id = ?",
                params![
                    remote_id_value(alarm.remote_id),
                    i64::from(alarm.hour),
                    i64::from(alarm.minute),
                    i64::from(alarm.days.bits()),
                    i64::from(alarm.enabled),
                    alarm.label.clone(),
                    alarm.alert.clone(),
                    i64::from(alarm.vibrate),
                    i64::from(alarm.delete_after_use),
                    timestamp,
                    id.get()
                ],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(format!("alarm {id}")));
        }

        Ok(Alarm {
            timestamp,
            ..alarm.clone()
        })
    }

    async fn delete(&self, id: AlarmId) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM alarms WHERE id = ?", params![id.get()])
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(format!("alarm {id}")));
        }

        Ok(())
    }
}

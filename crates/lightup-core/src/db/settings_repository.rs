//! Settings repository implementation

use crate::error::Result;
use crate::models::Settings;
use crate::util::normalize_text_option;
use libsql::Connection;

const KEY_LIGHTUPPI_SERVER: &str = "lightuppi_server";
const KEY_DEFAULT_ALERT_SOUND: &str = "default_alert_sound";

/// Trait for settings storage operations (async)
#[allow(async_fn_in_trait)]
pub trait SettingsRepository {
    /// Load settings from the database
    async fn load(&self) -> Result<Settings>;

    /// Save settings to the database
    async fn save(&self, settings: &Settings) -> Result<()>;
}

/// libSQL implementation of `SettingsRepository`
pub struct LibSqlSettingsRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlSettingsRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl SettingsRepository for LibSqlSettingsRepository<'_> {
    async fn load(&self) -> Result<Settings> {
        let mut settings = Settings::default();

        if let Some(value) = self.get_setting(KEY_LIGHTUPPI_SERVER).await? {
            settings.lightuppi_server = value;
        }

        settings.default_alert_sound =
            normalize_text_option(self.get_setting(KEY_DEFAULT_ALERT_SOUND).await?);

        Ok(settings)
    }

    async fn save(&self, settings: &Settings) -> Result<()> {
        self.set_setting(KEY_LIGHTUPPI_SERVER, settings.lightuppi_server.trim())
            .await?;
        match settings.default_alert_sound.as_deref() {
            Some(alert) => self.set_setting(KEY_DEFAULT_ALERT_SOUND, alert).await?,
            None => self.remove_setting(KEY_DEFAULT_ALERT_SOUND).await?,
        }
        Ok(())
    }
}

impl LibSqlSettingsRepository<'_> {
    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM settings WHERE key = ?", [key])
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)",
                [key, value],
            )
            .await?;
        Ok(())
    }

    async fn remove_setting(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM settings WHERE key = ?", [key])
            .await?;
        Ok(())
    }
}

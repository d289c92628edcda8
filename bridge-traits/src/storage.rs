//! Settings Storage
//!
//! Key-value preferences persisted by the host (content filters and similar
//! user toggles).

use async_trait::async_trait;

use crate::error::Result;

/// Settings storage trait
///
/// Provides key-value storage for user preferences:
/// - **Desktop**: SQLite table or JSON file
/// - **iOS**: UserDefaults
/// - **Android**: DataStore / SharedPreferences
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn hide_explicit(store: &dyn SettingsStore) -> Result<()> {
///     store.set_bool("hide_explicit", true).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Store a boolean value
    async fn set_bool(&self, key: &str, value: bool) -> Result<()>;

    /// Retrieve a boolean value
    async fn get_bool(&self, key: &str) -> Result<Option<bool>>;

    /// Delete a setting
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a setting exists
    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get_string(key).await?.is_some())
    }
}

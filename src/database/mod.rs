pub mod sqlcmd;

use crate::connection::ConnectionDescriptor;
use crate::tables::TableName;

/// Server metadata queries needed around a backup or restore.
#[async_trait::async_trait]
pub trait Catalog: Send + Sync {
    /// User databases on the server, system databases excluded, sorted by name.
    async fn list_user_databases(&self, server: &ConnectionDescriptor) -> anyhow::Result<Vec<String>>;

    /// User tables of the descriptor's database, sorted by schema then name.
    async fn list_user_tables(&self, database: &ConnectionDescriptor) -> anyhow::Result<Vec<TableName>>;

    async fn database_exists(&self, server: &ConnectionDescriptor, name: &str) -> anyhow::Result<bool>;

    async fn create_database(&self, server: &ConnectionDescriptor, name: &str) -> anyhow::Result<()>;

    async fn drop_database(&self, server: &ConnectionDescriptor, name: &str) -> anyhow::Result<()>;
}

use super::Catalog;
use crate::config::AppConfig;
use crate::connection::ConnectionDescriptor;
use crate::tables::TableName;
use tracing::debug;

const LIST_DATABASES: &str = "SELECT [name] FROM sys.databases \
     WHERE database_id > 4 AND state_desc = 'ONLINE' ORDER BY [name]";

const LIST_TABLES: &str = "SELECT '[' + SCHEMA_NAME(schema_id) + '].[' + [name] + ']' \
     FROM sys.tables WHERE is_ms_shipped = 0 \
     ORDER BY SCHEMA_NAME(schema_id) ASC, [name] ASC";

/// Metadata queries through the `sqlcmd` command line client.
#[derive(Debug, Clone)]
pub struct SqlCmd {
    program: String,
}

#[async_trait::async_trait]
impl Catalog for SqlCmd {
    async fn list_user_databases(&self, server: &ConnectionDescriptor) -> anyhow::Result<Vec<String>> {
        self.query(&server.master(), LIST_DATABASES).await
    }

    async fn list_user_tables(&self, database: &ConnectionDescriptor) -> anyhow::Result<Vec<TableName>> {
        let rows = self.query(database, LIST_TABLES).await?;
        Ok(rows.iter().filter_map(|row| TableName::normalize(row)).collect())
    }

    async fn database_exists(&self, server: &ConnectionDescriptor, name: &str) -> anyhow::Result<bool> {
        let query = format!(
            "SELECT COUNT(*) FROM sys.databases WHERE [name] = N'{}'",
            escape_literal(name)
        );
        let rows = self.query(&server.master(), &query).await?;
        Ok(rows.first().is_some_and(|count| count.trim() != "0"))
    }

    async fn create_database(&self, server: &ConnectionDescriptor, name: &str) -> anyhow::Result<()> {
        let query = format!(
            "IF DB_ID(N'{}') IS NULL CREATE DATABASE [{}]",
            escape_literal(name),
            escape_identifier(name)
        );
        self.query(&server.master(), &query).await?;
        Ok(())
    }

    async fn drop_database(&self, server: &ConnectionDescriptor, name: &str) -> anyhow::Result<()> {
        let query = format!(
            "IF DB_ID(N'{literal}') IS NOT NULL BEGIN \
             ALTER DATABASE [{ident}] SET SINGLE_USER WITH ROLLBACK IMMEDIATE; \
             DROP DATABASE [{ident}]; END",
            literal = escape_literal(name),
            ident = escape_identifier(name)
        );
        self.query(&server.master(), &query).await?;
        Ok(())
    }
}

impl SqlCmd {
    pub fn new(config: &AppConfig) -> Self {
        SqlCmd {
            program: config.sqlcmd.clone(),
        }
    }

    async fn query(&self, descriptor: &ConnectionDescriptor, sql: &str) -> anyhow::Result<Vec<String>> {
        let mut cmd = tokio::process::Command::new(&self.program);

        cmd.args(connection_args(descriptor))
            .arg("-Q")
            .arg(format!("SET NOCOUNT ON; {}", sql))
            .env("SQLCMDPASSWORD", &descriptor.password);

        debug!("{} on {}: {}", self.program, descriptor.server_name, sql);
        let output = cmd.output().await?;

        if !output.status.success() {
            anyhow::bail!(
                "{} failed on {}: {}{}",
                self.program,
                descriptor.server_name,
                String::from_utf8_lossy(&output.stderr),
                String::from_utf8_lossy(&output.stdout)
            );
        }

        Ok(parse_rows(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Connection switches; the password travels through `SQLCMDPASSWORD`.
pub fn connection_args(descriptor: &ConnectionDescriptor) -> Vec<String> {
    let mut args = vec!["-S".to_string(), descriptor.server_name.clone()];

    if !descriptor.database_name.is_empty() {
        args.push("-d".into());
        args.push(descriptor.database_name.clone());
    }

    if descriptor.user_name.is_empty() {
        args.push("-E".into());
    } else {
        args.push("-U".into());
        args.push(descriptor.user_name.clone());
    }

    args.push("-l".into());
    args.push(descriptor.connect_timeout.to_string());
    args.push("-t".into());
    args.push(descriptor.command_timeout.to_string());

    if descriptor.trust_server_certificate {
        args.push("-C".into());
    }

    // headerless, trimmed, fail on SQL errors
    args.extend(["-h", "-1", "-W", "-b"].map(String::from));
    args
}

fn parse_rows(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

fn escape_identifier(value: &str) -> String {
    value.replace(']', "]]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_args_with_sql_login() {
        let descriptor = ConnectionDescriptor::from_connection_string(
            "Server=host,1433;Database=db;User ID=sa;Password=secret;TrustServerCertificate=true",
        )
        .unwrap();

        let args = connection_args(&descriptor);
        assert_eq!(
            args,
            vec![
                "-S", "host,1433", "-d", "db", "-U", "sa", "-l", "15", "-t", "30", "-C", "-h",
                "-1", "-W", "-b"
            ]
        );
        assert!(!args.iter().any(|a| a.contains("secret")));
    }

    #[test]
    fn test_connection_args_with_integrated_login() {
        let descriptor = ConnectionDescriptor {
            server_name: "host".to_string(),
            trust_server_certificate: false,
            ..ConnectionDescriptor::default()
        };

        let args = connection_args(&descriptor);
        assert!(args.contains(&"-E".to_string()));
        assert!(!args.contains(&"-C".to_string()));
        assert!(!args.contains(&"-d".to_string()));
    }

    #[test]
    fn test_parse_rows_skips_blank_lines() {
        let rows = parse_rows("[dbo].[a]\r\n\r\n  [dbo].[b]  \n");
        assert_eq!(rows, vec!["[dbo].[a]", "[dbo].[b]"]);
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape_literal("O'Brien"), "O''Brien");
        assert_eq!(escape_identifier("odd]name"), "odd]]name");
    }
}

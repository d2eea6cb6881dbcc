use clap::Parser;

const USAGE: &str = "\
Actions (/Action: or /a:):
  Backup        Export one database to a .bacpac file
  Restore       Import a .bacpac file, purging or creating the target first
  Backup-All    Export every user database on the source server
  Restore-All   Import every .bacpac file next to /SourceFile:
  (anything else is passed to SqlPackage unchanged)

Connection:
  /SourceConnectionString: (/scs:)   /TargetConnectionString: (/tcs:)
  /SourceServerName: (/ssn:)         /TargetServerName: (/tsn:)
  /SourceDatabaseName: (/sdn:)       /TargetDatabaseName: (/tdn:)
  /SourceUser: (/su:)                /TargetUser: (/tu:)
  /SourcePassword: (/sp:)            /TargetPassword: (/tp:)
  /SourceTimeout: (/st:)             /TargetTimeout: (/tt:)
  /SourceTrustServerCertificate: (/stsc:)
  /TargetTrustServerCertificate: (/ttsc:)

Files and properties:
  /TargetFile: (/tf:)  /SourceFile: (/sf:)  /DiagnosticsFile: (/df:)
  /p:TableData=[schema].[table]         include only these tables' data
  /p:ExcludeTableData=[schema].[prefix*] skip tables (one leading or trailing *)
  /p:CommandTimeout=120

Example:
  sqlpkg /a:Backup /ssn:localhost /sdn:shop /su:sa /sp:secret /tf:backups/shop.bacpac";

#[derive(Parser, Debug)]
#[command(name = "sqlpkg")]
#[command(version, about = "Backup and restore SQL Server databases with SqlPackage", long_about = None)]
#[command(after_help = USAGE)]
pub struct Cli {
    /// Specific file for configuration
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log the SqlPackage arguments instead of running anything
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// SqlPackage-style arguments, e.g. /a:Backup /ssn:host /tf:out.bacpac
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub arguments: Vec<String>,
}

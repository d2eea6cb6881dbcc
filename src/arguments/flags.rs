//! Recognized SqlPackage flags, long and short forms.
//!
//! Keys carry their trailing delimiter (`:` for flags, `=` for `/p:` properties)
//! exactly as they appear after tokenizing.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Path,
    ConnectionString,
    Integer,
    Boolean,
}

impl ValueKind {
    /// Values that may hold spaces or `;` and travel wrapped in double quotes.
    pub fn is_quoted(self) -> bool {
        matches!(self, ValueKind::Path | ValueKind::ConnectionString)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flag {
    pub name: &'static str,
    pub abbrev: Option<&'static str>,
    pub kind: ValueKind,
    pub default: Option<&'static str>,
}

impl Flag {
    const fn new(
        name: &'static str,
        abbrev: Option<&'static str>,
        kind: ValueKind,
        default: Option<&'static str>,
    ) -> Self {
        Flag {
            name,
            abbrev,
            kind,
            default,
        }
    }

    /// Case-insensitive match of a parsed key against either form.
    pub fn matches(&self, key: &str) -> bool {
        self.name.eq_ignore_ascii_case(key)
            || self.abbrev.is_some_and(|a| a.eq_ignore_ascii_case(key))
    }
}

pub const ACTION: Flag = Flag::new("/Action:", Some("/a:"), ValueKind::Text, None);

pub const SOURCE_FILE: Flag = Flag::new("/SourceFile:", Some("/sf:"), ValueKind::Path, None);
pub const TARGET_FILE: Flag = Flag::new("/TargetFile:", Some("/tf:"), ValueKind::Path, None);
pub const DIAGNOSTICS_FILE: Flag =
    Flag::new("/DiagnosticsFile:", Some("/df:"), ValueKind::Path, None);
pub const MODEL_FILE_PATH: Flag = Flag::new("/ModelFilePath:", Some("/mfp:"), ValueKind::Path, None);

pub const TABLE_DATA: Flag = Flag::new("/p:TableData=", None, ValueKind::Text, None);
pub const EXCLUDE_TABLE_DATA: Flag = Flag::new("/p:ExcludeTableData=", None, ValueKind::Text, None);
pub const COMMAND_TIMEOUT: Flag =
    Flag::new("/p:CommandTimeout=", None, ValueKind::Integer, Some("120"));
pub const VERIFY_EXTRACTION: Flag =
    Flag::new("/p:VerifyExtraction=", None, ValueKind::Boolean, Some("false"));
pub const TEMP_DIRECTORY_FOR_TABLE_DATA: Flag =
    Flag::new("/p:TempDirectoryForTableData=", None, ValueKind::Path, None);

/// Connection flags owned by one side of the transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SideFlags {
    pub connection_string: Flag,
    pub server_name: Flag,
    pub database_name: Flag,
    pub user: Flag,
    pub password: Flag,
    pub timeout: Flag,
    pub trust_server_certificate: Flag,
}

impl SideFlags {
    pub fn all(&self) -> [Flag; 7] {
        [
            self.connection_string,
            self.server_name,
            self.database_name,
            self.user,
            self.password,
            self.timeout,
            self.trust_server_certificate,
        ]
    }
}

pub const SOURCE: SideFlags = SideFlags {
    connection_string: Flag::new(
        "/SourceConnectionString:",
        Some("/scs:"),
        ValueKind::ConnectionString,
        None,
    ),
    server_name: Flag::new("/SourceServerName:", Some("/ssn:"), ValueKind::Text, None),
    database_name: Flag::new("/SourceDatabaseName:", Some("/sdn:"), ValueKind::Text, None),
    user: Flag::new("/SourceUser:", Some("/su:"), ValueKind::Text, None),
    password: Flag::new("/SourcePassword:", Some("/sp:"), ValueKind::Text, None),
    timeout: Flag::new("/SourceTimeout:", Some("/st:"), ValueKind::Integer, Some("30")),
    trust_server_certificate: Flag::new(
        "/SourceTrustServerCertificate:",
        Some("/stsc:"),
        ValueKind::Boolean,
        Some("true"),
    ),
};

pub const TARGET: SideFlags = SideFlags {
    connection_string: Flag::new(
        "/TargetConnectionString:",
        Some("/tcs:"),
        ValueKind::ConnectionString,
        None,
    ),
    server_name: Flag::new("/TargetServerName:", Some("/tsn:"), ValueKind::Text, None),
    database_name: Flag::new("/TargetDatabaseName:", Some("/tdn:"), ValueKind::Text, None),
    user: Flag::new("/TargetUser:", Some("/tu:"), ValueKind::Text, None),
    password: Flag::new("/TargetPassword:", Some("/tp:"), ValueKind::Text, None),
    timeout: Flag::new("/TargetTimeout:", Some("/tt:"), ValueKind::Integer, Some("30")),
    trust_server_certificate: Flag::new(
        "/TargetTrustServerCertificate:",
        Some("/ttsc:"),
        ValueKind::Boolean,
        Some("true"),
    ),
};

/// Every flag the front-end interprets.
pub static KNOWN: [Flag; 24] = [
    ACTION,
    SOURCE_FILE,
    TARGET_FILE,
    DIAGNOSTICS_FILE,
    MODEL_FILE_PATH,
    TABLE_DATA,
    EXCLUDE_TABLE_DATA,
    COMMAND_TIMEOUT,
    VERIFY_EXTRACTION,
    TEMP_DIRECTORY_FOR_TABLE_DATA,
    SOURCE.connection_string,
    SOURCE.server_name,
    SOURCE.database_name,
    SOURCE.user,
    SOURCE.password,
    SOURCE.timeout,
    SOURCE.trust_server_certificate,
    TARGET.connection_string,
    TARGET.server_name,
    TARGET.database_name,
    TARGET.user,
    TARGET.password,
    TARGET.timeout,
    TARGET.trust_server_certificate,
];

/// Flags whose values get wrapped in double quotes.
pub fn quoted() -> impl Iterator<Item = &'static Flag> {
    KNOWN.iter().filter(|f| f.kind.is_quoted())
}

/// Flags whose values are masked when a command line is logged.
pub const SECRETS: [Flag; 4] = [
    SOURCE.password,
    TARGET.password,
    SOURCE.connection_string,
    TARGET.connection_string,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_either_form_ignoring_case() {
        assert!(SOURCE.user.matches("/SourceUser:"));
        assert!(SOURCE.user.matches("/sourceuser:"));
        assert!(SOURCE.user.matches("/SU:"));
        assert!(!SOURCE.user.matches("/SourceUser="));
        assert!(!SOURCE.user.matches("/TargetUser:"));
    }

    #[test]
    fn test_property_flags_have_no_abbreviation() {
        assert!(COMMAND_TIMEOUT.matches("/P:COMMANDTIMEOUT="));
        assert!(!COMMAND_TIMEOUT.matches(""));
    }

    #[test]
    fn test_quoted_flags_follow_value_kind() {
        let names: Vec<_> = quoted().map(|f| f.name).collect();
        assert_eq!(
            names,
            vec![
                "/SourceFile:",
                "/TargetFile:",
                "/DiagnosticsFile:",
                "/ModelFilePath:",
                "/p:TempDirectoryForTableData=",
                "/SourceConnectionString:",
                "/TargetConnectionString:",
            ]
        );
        assert!(!quoted().any(|f| f.kind == ValueKind::Text));
    }
}

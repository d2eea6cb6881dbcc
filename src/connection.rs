//! Connection descriptors for the source and target side of a transfer.
//!
//! A descriptor always carries both the discrete fields and the canonical
//! connection string rendered from them.

use crate::arguments::flags::{SideFlags, COMMAND_TIMEOUT, SOURCE, TARGET};
use crate::arguments::{ArgumentError, ArgumentList};
use std::fmt;
use thiserror::Error;

pub const DEFAULT_CONNECT_TIMEOUT: u32 = 30;
pub const DEFAULT_COMMAND_TIMEOUT: u32 = 120;

// Values assumed by the connection string parser for keywords a string omits.
const PARSER_CONNECT_TIMEOUT: u32 = 15;
const PARSER_COMMAND_TIMEOUT: u32 = 30;
const PARSER_TRUST_SERVER_CERTIFICATE: bool = false;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConnectionError {
    #[error(transparent)]
    Argument(#[from] ArgumentError),

    #[error("Malformed connection string segment '{segment}'")]
    MalformedSegment { segment: String },

    #[error("Unterminated quoted value for '{keyword}' in connection string")]
    UnterminatedQuote { keyword: String },

    #[error("Invalid value '{value}' for '{keyword}' in connection string")]
    InvalidValue { keyword: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Target,
}

impl Side {
    pub fn flags(self) -> &'static SideFlags {
        match self {
            Side::Source => &SOURCE,
            Side::Target => &TARGET,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => write!(f, "Source"),
            Side::Target => write!(f, "Target"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub server_name: String,
    pub database_name: String,
    pub user_name: String,
    pub password: String,
    pub connect_timeout: u32,
    pub command_timeout: u32,
    pub trust_server_certificate: bool,
    /// Keywords with no dedicated field (e.g. `Encrypt`), kept in order.
    pub extra: Vec<(String, String)>,
    pub connection_string: String,
}

impl Default for ConnectionDescriptor {
    fn default() -> Self {
        let mut descriptor = ConnectionDescriptor {
            server_name: String::new(),
            database_name: String::new(),
            user_name: String::new(),
            password: String::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            trust_server_certificate: true,
            extra: Vec::new(),
            connection_string: String::new(),
        };
        descriptor.refresh();
        descriptor
    }
}

enum Keyword {
    DataSource,
    InitialCatalog,
    UserId,
    Password,
    ConnectTimeout,
    CommandTimeout,
    TrustServerCertificate,
}

impl Keyword {
    fn lookup(normalized: &str) -> Option<Keyword> {
        let keyword = match normalized {
            "data source" | "server" | "address" | "addr" | "network address" => {
                Keyword::DataSource
            }
            "initial catalog" | "database" => Keyword::InitialCatalog,
            "user id" | "uid" | "user" => Keyword::UserId,
            "password" | "pwd" => Keyword::Password,
            "connect timeout" | "connection timeout" | "timeout" => Keyword::ConnectTimeout,
            "command timeout" => Keyword::CommandTimeout,
            "trust server certificate" | "trustservercertificate" => {
                Keyword::TrustServerCertificate
            }
            _ => return None,
        };
        Some(keyword)
    }
}

impl ConnectionDescriptor {
    /// Parse a `keyword=value;...` string. Omitted keywords take the parser defaults.
    pub fn from_connection_string(connection_string: &str) -> Result<Self, ConnectionError> {
        let mut descriptor = ConnectionDescriptor {
            connect_timeout: PARSER_CONNECT_TIMEOUT,
            command_timeout: PARSER_COMMAND_TIMEOUT,
            trust_server_certificate: PARSER_TRUST_SERVER_CERTIFICATE,
            ..ConnectionDescriptor::default()
        };

        for (keyword, value) in parse_pairs(connection_string)? {
            let normalized = keyword
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_ascii_lowercase();

            match Keyword::lookup(&normalized) {
                Some(Keyword::DataSource) => descriptor.server_name = value,
                Some(Keyword::InitialCatalog) => descriptor.database_name = value,
                Some(Keyword::UserId) => descriptor.user_name = value,
                Some(Keyword::Password) => descriptor.password = value,
                Some(Keyword::ConnectTimeout) => {
                    descriptor.connect_timeout = parse_number(&keyword, &value)?
                }
                Some(Keyword::CommandTimeout) => {
                    descriptor.command_timeout = parse_number(&keyword, &value)?
                }
                Some(Keyword::TrustServerCertificate) => {
                    descriptor.trust_server_certificate = parse_flag(&keyword, &value)?
                }
                None => {
                    match descriptor
                        .extra
                        .iter_mut()
                        .find(|(k, _)| k.eq_ignore_ascii_case(&keyword))
                    {
                        Some(existing) => existing.1 = value,
                        None => descriptor.extra.push((keyword, value)),
                    }
                }
            }
        }

        descriptor.refresh();
        Ok(descriptor)
    }

    /// Re-render `connection_string` from the discrete fields.
    pub fn refresh(&mut self) {
        let mut pairs: Vec<(&str, String)> = Vec::new();

        for (keyword, value) in [
            ("Data Source", &self.server_name),
            ("Initial Catalog", &self.database_name),
            ("User ID", &self.user_name),
            ("Password", &self.password),
        ] {
            if !value.is_empty() {
                pairs.push((keyword, value.clone()));
            }
        }

        pairs.push(("Connect Timeout", self.connect_timeout.to_string()));
        pairs.push(("Command Timeout", self.command_timeout.to_string()));
        pairs.push((
            "Trust Server Certificate",
            if self.trust_server_certificate { "True" } else { "False" }.to_string(),
        ));

        for (keyword, value) in &self.extra {
            pairs.push((keyword.as_str(), value.clone()));
        }

        self.connection_string = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, quote_value(v)))
            .collect::<Vec<_>>()
            .join(";");
    }

    /// Copy pointed at another database.
    pub fn with_database(&self, database_name: &str) -> Self {
        let mut descriptor = self.clone();
        descriptor.database_name = database_name.to_string();
        descriptor.refresh();
        descriptor
    }

    /// Copy pointed at the server's `master` database.
    pub fn master(&self) -> Self {
        self.with_database("master")
    }

    pub fn has_server(&self) -> bool {
        !self.server_name.is_empty()
    }
}

/// Build the descriptor for one side from the original arguments.
///
/// An explicit connection string wins over discrete fields. Its trust-certificate
/// and timeout settings are only overridden when the matching flag was passed.
pub fn normalize(arguments: &ArgumentList, side: Side) -> Result<ConnectionDescriptor, ConnectionError> {
    let flags = side.flags();
    let connection_string = arguments.value(&flags.connection_string).unwrap_or_default();

    if !connection_string.is_empty() {
        let mut descriptor = ConnectionDescriptor::from_connection_string(connection_string)?;

        if let Some(trust) = arguments.boolean(&flags.trust_server_certificate)? {
            descriptor.trust_server_certificate = trust;
        }
        if let Some(timeout) = arguments.integer(&flags.timeout)? {
            descriptor.connect_timeout = timeout;
        }
        if let Some(timeout) = arguments.integer(&COMMAND_TIMEOUT)? {
            descriptor.command_timeout = timeout;
        }

        descriptor.refresh();
        return Ok(descriptor);
    }

    let mut descriptor = ConnectionDescriptor {
        server_name: arguments.value_or_default(&flags.server_name).to_string(),
        database_name: arguments.value_or_default(&flags.database_name).to_string(),
        user_name: arguments.value_or_default(&flags.user).to_string(),
        password: arguments.value_or_default(&flags.password).to_string(),
        connect_timeout: arguments
            .integer(&flags.timeout)?
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT),
        command_timeout: arguments
            .integer(&COMMAND_TIMEOUT)?
            .unwrap_or(DEFAULT_COMMAND_TIMEOUT),
        trust_server_certificate: arguments
            .boolean(&flags.trust_server_certificate)?
            .unwrap_or(true),
        ..ConnectionDescriptor::default()
    };

    descriptor.refresh();
    Ok(descriptor)
}

fn parse_pairs(input: &str) -> Result<Vec<(String, String)>, ConnectionError> {
    let mut pairs = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace() || *c == ';') {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut keyword = String::new();
        let mut found_equals = false;
        for c in chars.by_ref() {
            if c == '=' {
                found_equals = true;
                break;
            }
            if c == ';' {
                break;
            }
            keyword.push(c);
        }

        let keyword = keyword.trim().to_string();
        if !found_equals || keyword.is_empty() {
            return Err(ConnectionError::MalformedSegment { segment: keyword });
        }

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }

        let mut value = String::new();
        match chars.peek().copied() {
            Some(quote @ ('"' | '\'')) => {
                chars.next();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    if c == quote {
                        if chars.peek() == Some(&quote) {
                            chars.next();
                            value.push(quote);
                            continue;
                        }
                        closed = true;
                        break;
                    }
                    value.push(c);
                }
                if !closed {
                    return Err(ConnectionError::UnterminatedQuote { keyword });
                }
                for c in chars.by_ref() {
                    if c == ';' {
                        break;
                    }
                    if !c.is_whitespace() {
                        return Err(ConnectionError::MalformedSegment { segment: keyword });
                    }
                }
            }
            _ => {
                for c in chars.by_ref() {
                    if c == ';' {
                        break;
                    }
                    value.push(c);
                }
                value = value.trim().to_string();
            }
        }

        pairs.push((keyword, value));
    }

    Ok(pairs)
}

/// Single quotes keep the rendered string free of `"`, which wraps it on the command line.
fn quote_value(value: &str) -> String {
    let needs_quotes = value.contains(';')
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace)
        || value.starts_with('"')
        || value.starts_with('\'');

    if needs_quotes {
        format!("'{}'", value.replace('\'', "''"))
    } else {
        value.to_string()
    }
}

fn parse_number(keyword: &str, value: &str) -> Result<u32, ConnectionError> {
    value.trim().parse().map_err(|_| ConnectionError::InvalidValue {
        keyword: keyword.to_string(),
        value: value.to_string(),
    })
}

fn parse_flag(keyword: &str, value: &str) -> Result<bool, ConnectionError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" => Ok(true),
        "false" | "no" => Ok(false),
        _ => Err(ConnectionError::InvalidValue {
            keyword: keyword.to_string(),
            value: value.to_string(),
        }),
    }
}

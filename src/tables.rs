//! Table name normalization and the table-data filter applied to backups.

use crate::arguments::flags::{EXCLUDE_TABLE_DATA, TABLE_DATA};
use crate::arguments::{ArgumentError, ArgumentList, CliArgument};
use crate::connection::ConnectionDescriptor;
use crate::database::Catalog;
use std::fmt;
use tracing::{debug, info, warn};

pub const DEFAULT_SCHEMA: &str = "dbo";

/// Canonical `[schema].[table]` name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableName(String);

impl TableName {
    /// `Foo.Bar`, `[Foo].[Bar]` and `Foo.[Bar]` all become `[Foo].[Bar]`;
    /// a bare `Bar` becomes `[dbo].[Bar]`. Empty input yields `None`.
    pub fn normalize(name: &str) -> Option<TableName> {
        let segments: Vec<String> = split_segments(name.trim())
            .into_iter()
            .map(|s| s.trim().trim_start_matches('[').trim_end_matches(']').to_string())
            .filter(|s| !s.is_empty())
            .collect();

        match segments.len() {
            0 => None,
            1 => Some(TableName(format!("[{}].[{}]", DEFAULT_SCHEMA, segments[0]))),
            _ => Some(TableName(
                segments
                    .iter()
                    .map(|s| format!("[{}]", s))
                    .collect::<Vec<_>>()
                    .join("."),
            )),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn lowercase(&self) -> String {
        self.0.to_lowercase()
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Split on dots that are not inside brackets.
fn split_segments(name: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (index, c) in name.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '.' if depth == 0 => {
                segments.push(&name[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    segments.push(&name[start..]);
    segments
}

/// An exclusion entry: an exact table name, or one with a single `*` at the
/// start or end of a name segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TablePattern {
    Exact(TableName),
    /// Matches names starting with `prefix` and ending with `suffix`.
    /// A trailing `*` leaves only the closing bracket as suffix; a leading `*`
    /// leaves only the schema and opening bracket as prefix.
    Wildcard { prefix: String, suffix: String },
}

impl TablePattern {
    pub fn parse(pattern: &str) -> Result<Option<TablePattern>, ArgumentError> {
        let Some(normalized) = TableName::normalize(pattern) else {
            return Ok(None);
        };
        let text = normalized.as_str();
        let invalid = || ArgumentError::InvalidPattern {
            pattern: pattern.to_string(),
        };

        match text.matches('*').count() {
            0 => Ok(Some(TablePattern::Exact(normalized))),
            1 => {
                let index = text.find('*').ok_or_else(invalid)?;
                let (prefix, rest) = text.split_at(index);
                let suffix = &rest[1..];

                if !prefix.ends_with('[') && !suffix.starts_with(']') {
                    return Err(invalid());
                }

                Ok(Some(TablePattern::Wildcard {
                    prefix: prefix.to_lowercase(),
                    suffix: suffix.to_lowercase(),
                }))
            }
            _ => Err(invalid()),
        }
    }

    pub fn matches(&self, table: &TableName) -> bool {
        match self {
            TablePattern::Exact(name) => name.lowercase() == table.lowercase(),
            TablePattern::Wildcard { prefix, suffix } => {
                let name = table.lowercase();
                name.len() >= prefix.len() + suffix.len()
                    && name.starts_with(prefix.as_str())
                    && name.ends_with(suffix.as_str())
            }
        }
    }
}

/// Remove every table matched by any of `patterns`, in order.
pub fn apply_exclusions(tables: &mut Vec<TableName>, patterns: &[TablePattern]) {
    for pattern in patterns {
        let before = tables.len();
        tables.retain(|t| !pattern.matches(t));
        debug!(
            "Exclusion {:?} removed {} table(s)",
            pattern,
            before - tables.len()
        );
    }
}

/// Exclusion patterns from the original arguments; unsupported patterns are
/// reported and skipped.
pub fn exclusion_patterns(original: &ArgumentList) -> Vec<TablePattern> {
    original
        .values(&EXCLUDE_TABLE_DATA)
        .filter_map(|value| match TablePattern::parse(value) {
            Ok(pattern) => pattern,
            Err(e) => {
                warn!("{}", e);
                None
            }
        })
        .collect()
}

/// Tables whose data goes into the backup.
///
/// Explicit `/p:TableData=` entries are used as given and the catalog is never
/// queried; otherwise every user table of the source database is listed. The
/// exclusions are applied to either list.
pub async fn resolve_table_list(
    original: &ArgumentList,
    source: &ConnectionDescriptor,
    catalog: &dyn Catalog,
) -> anyhow::Result<Vec<TableName>> {
    let mut tables: Vec<TableName> = if original.has(&TABLE_DATA) {
        original
            .values(&TABLE_DATA)
            .filter_map(TableName::normalize)
            .collect()
    } else {
        catalog.list_user_tables(source).await?
    };

    let found = tables.len();
    apply_exclusions(&mut tables, &exclusion_patterns(original));

    info!(
        "Resolved {} table(s) for data export ({} excluded)",
        tables.len(),
        found - tables.len()
    );
    if found > 0 && tables.is_empty() {
        warn!("Every table was excluded; SqlPackage will export data for all tables");
    }
    Ok(tables)
}

/// Replace table-data entries in `working` with one per resolved table, appended
/// after every other argument. Exclusion entries are dropped.
pub fn apply_to_working(working: &ArgumentList, tables: &[TableName]) -> ArgumentList {
    let mut result = working.without(&[TABLE_DATA, EXCLUDE_TABLE_DATA]);
    result.extend(
        tables
            .iter()
            .map(|t| CliArgument::new(TABLE_DATA.name, t.as_str())),
    );
    result
}

pub mod flags;

use crate::utils::{remove_wrapped_quotes, wrap_in_quotes};
use flags::{quoted, Flag, SECRETS};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("Invalid integer value '{value}' for {flag}")]
    InvalidInteger { flag: String, value: String },

    #[error("Invalid boolean value '{value}' for {flag}")]
    InvalidBoolean { flag: String, value: String },

    #[error("Unsupported table pattern '{pattern}': only one leading or trailing '*' is allowed")]
    InvalidPattern { pattern: String },
}

/// How a token was split into key and value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentSyntax {
    /// `/Name:value`
    Flag,
    /// `/p:Name=value`
    Property,
}

impl ArgumentSyntax {
    fn of(token: &str) -> Self {
        let is_property = token
            .get(..3)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("/p:"));

        if is_property {
            ArgumentSyntax::Property
        } else {
            ArgumentSyntax::Flag
        }
    }

    pub fn delimiter(self) -> char {
        match self {
            ArgumentSyntax::Flag => ':',
            ArgumentSyntax::Property => '=',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgument {
    /// Flag including its trailing delimiter, e.g. `/SourceUser:`.
    pub key: String,
    /// Everything after the delimiter, wrapping quotes removed.
    pub value: String,
    pub syntax: ArgumentSyntax,
}

impl CliArgument {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let syntax = ArgumentSyntax::of(&key);

        CliArgument {
            key,
            value: value.into(),
            syntax,
        }
    }

    /// Tokens shorter than two characters yield `None`.
    pub fn parse(token: &str) -> Option<Self> {
        if token.chars().count() < 2 {
            return None;
        }

        let syntax = ArgumentSyntax::of(token);
        let delimiter = syntax.delimiter();

        let argument = match token.find(delimiter) {
            Some(index) => CliArgument {
                key: token[..=index].to_string(),
                value: remove_wrapped_quotes(&token[index + 1..]).to_string(),
                syntax,
            },
            None => CliArgument {
                key: token.to_string(),
                value: String::new(),
                syntax,
            },
        };

        Some(argument)
    }

    pub fn is(&self, flag: &Flag) -> bool {
        flag.matches(&self.key)
    }
}

impl fmt::Display for CliArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.key, self.value)
    }
}

/// Ordered collection of parsed arguments. Keys may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentList {
    items: Vec<CliArgument>,
}

impl ArgumentList {
    pub fn new() -> Self {
        ArgumentList::default()
    }

    pub fn import<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let items = tokens
            .into_iter()
            .filter_map(|token| CliArgument::parse(token.as_ref()))
            .collect();

        ArgumentList { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CliArgument> {
        self.items.iter()
    }

    pub fn has(&self, flag: &Flag) -> bool {
        self.items.iter().any(|a| a.is(flag))
    }

    /// First matching value, unquoted.
    pub fn value(&self, flag: &Flag) -> Option<&str> {
        self.items
            .iter()
            .find(|a| a.is(flag))
            .map(|a| remove_wrapped_quotes(&a.value))
    }

    /// First matching value or the flag's own default, or empty.
    pub fn value_or_default(&self, flag: &Flag) -> &str {
        self.value(flag).or(flag.default).unwrap_or_default()
    }

    /// Every matching value in insertion order.
    pub fn values<'a>(&'a self, flag: &'a Flag) -> impl Iterator<Item = &'a str> + 'a {
        self.items
            .iter()
            .filter(move |a| a.is(flag))
            .map(|a| remove_wrapped_quotes(&a.value))
    }

    /// Explicit value parsed as an integer; `None` when the flag is absent.
    pub fn integer(&self, flag: &Flag) -> Result<Option<u32>, ArgumentError> {
        self.value(flag)
            .map(|value| {
                value
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| ArgumentError::InvalidInteger {
                        flag: flag.name.to_string(),
                        value: value.to_string(),
                    })
            })
            .transpose()
    }

    /// Explicit value parsed as a boolean; `None` when the flag is absent.
    pub fn boolean(&self, flag: &Flag) -> Result<Option<bool>, ArgumentError> {
        self.value(flag).map(|value| parse_bool(flag, value)).transpose()
    }

    pub fn push(&mut self, argument: CliArgument) {
        self.items.push(argument);
    }

    pub fn insert(&mut self, index: usize, argument: CliArgument) {
        let index = index.min(self.items.len());
        self.items.insert(index, argument);
    }

    pub fn extend<I: IntoIterator<Item = CliArgument>>(&mut self, arguments: I) {
        self.items.extend(arguments);
    }

    /// Keep only arguments matching none of `flags`.
    pub fn without(&self, flags: &[Flag]) -> ArgumentList {
        let items = self
            .items
            .iter()
            .filter(|a| !flags.iter().any(|f| a.is(f)))
            .cloned()
            .collect();

        ArgumentList { items }
    }

    /// Append `flag` with `value` unless some form of it is already present.
    pub fn set_default(&mut self, flag: &Flag, value: &str) {
        if !self.has(flag) {
            self.items.push(CliArgument::new(flag.name, value));
        }
    }

    /// Replace the value of every matching argument, or append one when absent.
    pub fn set_value(&mut self, flag: &Flag, value: &str) {
        let mut found = false;
        for argument in self.items.iter_mut().filter(|a| flag.matches(&a.key)) {
            argument.value = value.to_string();
            found = true;
        }
        if !found {
            self.items.push(CliArgument::new(flag.name, value));
        }
    }

    /// Wrap path-bearing values in double quotes, stripping any existing wrapping first.
    pub fn wrap_paths_in_quotes(&mut self) {
        for argument in self
            .items
            .iter_mut()
            .filter(|a| quoted().any(|f| f.matches(&a.key)))
        {
            argument.value = wrap_in_quotes(&argument.value);
        }
    }

    /// `key+value` strings in order, ready for the external tool.
    pub fn to_cli_args(&self) -> Vec<String> {
        self.items.iter().map(ToString::to_string).collect()
    }

    /// Single-line rendering with secrets masked, for logs.
    pub fn to_masked_string(&self) -> String {
        self.items
            .iter()
            .map(|a| {
                if SECRETS.iter().any(|f| a.is(f)) {
                    format!("{}{}", a.key, mask_secret(&a.value))
                } else {
                    a.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl<'a> IntoIterator for &'a ArgumentList {
    type Item = &'a CliArgument;
    type IntoIter = std::slice::Iter<'a, CliArgument>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<CliArgument> for ArgumentList {
    fn from_iter<I: IntoIterator<Item = CliArgument>>(iter: I) -> Self {
        ArgumentList {
            items: iter.into_iter().collect(),
        }
    }
}

pub fn parse_bool(flag: &Flag, value: &str) -> Result<bool, ArgumentError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(ArgumentError::InvalidBoolean {
            flag: flag.name.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Mask a password, or the `Password=` segment of a connection string.
fn mask_secret(value: &str) -> String {
    if !value.contains('=') {
        return "********".to_string();
    }

    let wrapped = value.starts_with('"') && value.ends_with('"') && value.len() >= 2;
    let masked = remove_wrapped_quotes(value)
        .split(';')
        .map(|segment| {
            let key = segment.split('=').next().unwrap_or_default().trim();
            if key.eq_ignore_ascii_case("password") || key.eq_ignore_ascii_case("pwd") {
                format!("{}=********", key)
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(";");

    if wrapped {
        wrap_in_quotes(&masked)
    } else {
        masked
    }
}

use crate::action::Action;
use crate::arguments::ArgumentList;
use crate::connection::{normalize, ConnectionDescriptor, ConnectionError, Side};

/// Everything derived from one invocation's raw arguments.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Tokens exactly as received, forwarded untouched in pass-through mode.
    pub raw: Vec<String>,
    pub original: ArgumentList,
    pub action: Option<Action>,
    pub source: ConnectionDescriptor,
    pub target: ConnectionDescriptor,
}

impl AppState {
    /// Connection settings are only normalized for recognized actions; pass-through
    /// leaves them for the tool to validate.
    pub fn import(tokens: &[String]) -> Result<Self, ConnectionError> {
        let original = ArgumentList::import(tokens);
        let action = Action::from_arguments(&original);

        let (source, target) = match action {
            Some(_) => (
                normalize(&original, Side::Source)?,
                normalize(&original, Side::Target)?,
            ),
            None => Default::default(),
        };

        Ok(AppState {
            raw: tokens.to_vec(),
            original,
            action,
            source,
            target,
        })
    }
}

//! Topic name and topic filter validation.

use thiserror::Error;

use crate::{codec::MAX_FIELD_LEN, protocol::ProtocolVersion};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicError {
    #[error("topic is empty")]
    Empty,

    #[error("topic exceeds {} bytes", MAX_FIELD_LEN)]
    TooLong,

    #[error("topic contains a null character")]
    ContainsNullChar,

    #[error("wildcard characters (+, #) not allowed in topic names")]
    WildcardInTopicName,

    #[error("single-level wildcard (+) must occupy an entire level")]
    InvalidSingleLevelWildcard,

    #[error("multi-level wildcard (#) must be the last level and occupy it entirely")]
    InvalidMultiLevelWildcard,

    #[error("shared subscription needs a non-empty share name and filter")]
    InvalidSharedSubscription,
}

fn check_common(topic: &str) -> Result<(), TopicError> {
    if topic.is_empty() {
        return Err(TopicError::Empty);
    }

    if topic.len() > MAX_FIELD_LEN {
        return Err(TopicError::TooLong);
    }

    if topic.contains('\0') {
        return Err(TopicError::ContainsNullChar);
    }

    Ok(())
}

/// Validates a topic name as carried by PUBLISH and Will messages.
pub fn validate_topic_name(topic: &str) -> Result<(), TopicError> {
    check_common(topic)?;

    if topic.contains(['+', '#']) {
        return Err(TopicError::WildcardInTopicName);
    }

    Ok(())
}

/// Validates a topic filter as carried by SUBSCRIBE and UNSUBSCRIBE. Under
/// 5.0 this includes the `$share/{name}/{filter}` form; earlier versions
/// treat `$share` as an ordinary first level.
pub fn validate_topic_filter(filter: &str, version: ProtocolVersion) -> Result<(), TopicError> {
    check_common(filter)?;

    let shared = match version {
        ProtocolVersion::V5 => filter.strip_prefix("$share/"),
        _ => None,
    };

    let filter = match shared {
        Some(shared) => {
            let (name, rest) = shared
                .split_once('/')
                .ok_or(TopicError::InvalidSharedSubscription)?;

            if name.is_empty() || rest.is_empty() || name.contains(['+', '#']) {
                return Err(TopicError::InvalidSharedSubscription);
            }
            rest
        }
        None => filter,
    };

    let mut levels = filter.split('/').peekable();

    while let Some(level) = levels.next() {
        if level.contains('+') && level != "+" {
            return Err(TopicError::InvalidSingleLevelWildcard);
        }

        if level.contains('#') && (level != "#" || levels.peek().is_some()) {
            return Err(TopicError::InvalidMultiLevelWildcard);
        }
    }

    Ok(())
}

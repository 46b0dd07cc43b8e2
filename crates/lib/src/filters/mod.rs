//! List filters: narrow contact or message rows by submitted choices.
//!
//! Choices are parsed from the raw field strings with `FromStr`. An empty string
//! always means "no filtering". Ids that no longer resolve also leave rows unchanged.

mod contacts;
mod messages;

pub use contacts::{
    AgeFilter, DistrictFilter, FreeSearchFilter, GenderFilter, GroupsFilter,
    MultipleDistrictFilter, RoleFilter,
};
pub use messages::{FlaggedFilter, HandledByFilter, MessageDistrictFilter, MessageTextFilter};

use crate::model::{ContactRow, GroupId, LocationId, MessageRow};
use async_trait::async_trait;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid choice {0:?}")]
pub struct InvalidChoice(pub String);

fn parse_id(s: &str) -> Result<u64, InvalidChoice> {
    s.trim().parse().map_err(|_| InvalidChoice(s.to_string()))
}

#[async_trait]
pub trait ContactFilter: Send + Sync {
    async fn filter(&self, rows: Vec<ContactRow>) -> Vec<ContactRow>;
}

#[async_trait]
pub trait MessageFilter: Send + Sync {
    async fn filter(&self, rows: Vec<MessageRow>) -> Vec<MessageRow>;
}

/// Run filters in order, each narrowing the previous result.
pub async fn apply_contact_filters(
    filters: &[Box<dyn ContactFilter>],
    mut rows: Vec<ContactRow>,
) -> Vec<ContactRow> {
    for f in filters {
        rows = f.filter(rows).await;
    }
    rows
}

pub async fn apply_message_filters(
    filters: &[Box<dyn MessageFilter>],
    mut rows: Vec<MessageRow>,
) -> Vec<MessageRow> {
    for f in filters {
        rows = f.filter(rows).await;
    }
    rows
}

/// One entry of the groups multi-select; `-1` is "No Group".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupChoice {
    NoGroup,
    Group(GroupId),
}

impl FromStr for GroupChoice {
    type Err = InvalidChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim() == "-1" {
            Ok(GroupChoice::NoGroup)
        } else {
            parse_id(s).map(GroupChoice::Group)
        }
    }
}

/// District select: empty, `-1` for "No District", or a location id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistrictChoice {
    Any,
    NoDistrict,
    District(LocationId),
}

impl FromStr for DistrictChoice {
    type Err = InvalidChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Ok(DistrictChoice::Any),
            "-1" => Ok(DistrictChoice::NoDistrict),
            other => parse_id(other).map(DistrictChoice::District),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlaggedChoice {
    Any,
    Flagged,
    NotFlagged,
}

impl FromStr for FlaggedChoice {
    type Err = InvalidChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Ok(FlaggedChoice::Any),
            "1" => Ok(FlaggedChoice::Flagged),
            "0" => Ok(FlaggedChoice::NotFlagged),
            other => Err(InvalidChoice(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenderChoice {
    Any,
    Male,
    Female,
    Unknown,
}

impl FromStr for GenderChoice {
    type Err = InvalidChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Ok(GenderChoice::Any),
            "M" => Ok(GenderChoice::Male),
            "F" => Ok(GenderChoice::Female),
            "None" => Ok(GenderChoice::Unknown),
            other => Err(InvalidChoice(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeOperator {
    Any,
    Equal,
    GreaterThan,
    LessThan,
    Unknown,
}

impl FromStr for AgeOperator {
    type Err = InvalidChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Ok(AgeOperator::Any),
            "==" => Ok(AgeOperator::Equal),
            ">" => Ok(AgeOperator::GreaterThan),
            "<" => Ok(AgeOperator::LessThan),
            "None" => Ok(AgeOperator::Unknown),
            other => Err(InvalidChoice(other.to_string())),
        }
    }
}

/// Which app handled an incoming message: empty (any), `*` (none) or an app name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandledBy {
    Any,
    Unhandled,
    App(String),
}

impl FromStr for HandledBy {
    type Err = InvalidChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "" => HandledBy::Any,
            "*" => HandledBy::Unhandled,
            app => HandledBy::App(app.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_choices() {
        assert_eq!("-1".parse::<GroupChoice>().unwrap(), GroupChoice::NoGroup);
        assert_eq!("4".parse::<GroupChoice>().unwrap(), GroupChoice::Group(4));
        assert!("x".parse::<GroupChoice>().is_err());
        assert_eq!("".parse::<DistrictChoice>().unwrap(), DistrictChoice::Any);
        assert_eq!("-1".parse::<DistrictChoice>().unwrap(), DistrictChoice::NoDistrict);
        assert_eq!("12".parse::<DistrictChoice>().unwrap(), DistrictChoice::District(12));
        assert_eq!("1".parse::<FlaggedChoice>().unwrap(), FlaggedChoice::Flagged);
        assert_eq!("None".parse::<GenderChoice>().unwrap(), GenderChoice::Unknown);
        assert_eq!(">".parse::<AgeOperator>().unwrap(), AgeOperator::GreaterThan);
        assert_eq!("*".parse::<HandledBy>().unwrap(), HandledBy::Unhandled);
        assert_eq!(
            "poll".parse::<HandledBy>().unwrap(),
            HandledBy::App("poll".to_string())
        );
    }
}

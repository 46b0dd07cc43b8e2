//! Contact list filters.

use super::{AgeOperator, ContactFilter, DistrictChoice, GenderChoice, GroupChoice};
use crate::model::{ContactRow, Gender, GroupId, LocationId, LocationKind};
use crate::store::{GroupRepository, LocationRepository};
use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate};
use regex::RegexBuilder;
use std::sync::Arc;

/// Contacts in any chosen group; `NoGroup` also matches contacts without groups.
pub struct GroupsFilter {
    choices: Vec<GroupChoice>,
}

impl GroupsFilter {
    pub fn new(choices: Vec<GroupChoice>) -> Self {
        Self { choices }
    }
}

#[async_trait]
impl ContactFilter for GroupsFilter {
    async fn filter(&self, rows: Vec<ContactRow>) -> Vec<ContactRow> {
        if self.choices.is_empty() {
            return rows;
        }
        let no_group = self.choices.contains(&GroupChoice::NoGroup);
        let ids: Vec<GroupId> = self
            .choices
            .iter()
            .filter_map(|c| match c {
                GroupChoice::Group(id) => Some(*id),
                GroupChoice::NoGroup => None,
            })
            .collect();
        rows.into_iter()
            .filter(|r| {
                let groups = &r.contact.groups;
                (no_group && groups.is_empty()) || groups.iter().any(|g| ids.contains(g))
            })
            .collect()
    }
}

/// Free-form search over name, reporting location name and phone numbers.
///
/// A term wrapped in quotes matches whole words only; otherwise it is a
/// case-insensitive substring match.
pub struct FreeSearchFilter {
    term: String,
}

impl FreeSearchFilter {
    pub fn new(term: impl Into<String>) -> Self {
        Self { term: term.into() }
    }

    fn quoted_inner(term: &str) -> Option<&str> {
        let mut chars = term.chars();
        let first = chars.next()?;
        let last = chars.next_back()?;
        let is_quote = |c: char| c == '\'' || c == '"';
        if is_quote(first) && is_quote(last) {
            Some(&term[first.len_utf8()..term.len() - last.len_utf8()])
        } else {
            None
        }
    }
}

fn searchable_fields(r: &ContactRow) -> impl Iterator<Item = &str> {
    std::iter::once(r.contact.name.as_str())
        .chain(r.location.as_ref().map(|l| l.name.as_str()))
        .chain(r.identities.iter().map(|s| s.as_str()))
}

#[async_trait]
impl ContactFilter for FreeSearchFilter {
    async fn filter(&self, rows: Vec<ContactRow>) -> Vec<ContactRow> {
        let term = self.term.trim();
        if term.is_empty() {
            return rows;
        }
        if let Some(inner) = Self::quoted_inner(term) {
            if inner.is_empty() {
                return rows;
            }
            let pattern = format!(r"\b({})\b", regex::escape(inner));
            let re = match RegexBuilder::new(&pattern).case_insensitive(true).build() {
                Ok(re) => re,
                Err(e) => {
                    log::debug!("free search: bad pattern {:?}: {}", pattern, e);
                    return rows;
                }
            };
            return rows
                .into_iter()
                .filter(|r| searchable_fields(r).any(|f| re.is_match(f)))
                .collect();
        }
        let needle = term.to_lowercase();
        rows.into_iter()
            .filter(|r| searchable_fields(r).any(|f| f.to_lowercase().contains(&needle)))
            .collect()
    }
}

/// Contacts reporting from a district (or anywhere below it). `NoDistrict`
/// keeps contacts registered at country or region level.
pub struct DistrictFilter {
    choice: DistrictChoice,
    locations: Arc<dyn LocationRepository>,
}

impl DistrictFilter {
    pub fn new(choice: DistrictChoice, locations: Arc<dyn LocationRepository>) -> Self {
        Self { choice, locations }
    }
}

#[async_trait]
impl ContactFilter for DistrictFilter {
    async fn filter(&self, rows: Vec<ContactRow>) -> Vec<ContactRow> {
        match self.choice {
            DistrictChoice::Any => rows,
            DistrictChoice::NoDistrict => rows
                .into_iter()
                .filter(|r| {
                    matches!(
                        r.location.as_ref().map(|l| l.kind),
                        Some(LocationKind::Country) | Some(LocationKind::Region)
                    )
                })
                .collect(),
            DistrictChoice::District(id) => {
                let within = self.locations.descendants(id).await;
                if within.is_empty() {
                    log::debug!("district filter: location {} not found", id);
                    return rows;
                }
                rows.into_iter()
                    .filter(|r| {
                        r.contact
                            .reporting_location
                            .map(|l| within.contains(&l))
                            .unwrap_or(false)
                    })
                    .collect()
            }
        }
    }
}

/// Contacts whose reporting location is one of the chosen districts.
pub struct MultipleDistrictFilter {
    districts: Vec<LocationId>,
}

impl MultipleDistrictFilter {
    pub fn new(districts: Vec<LocationId>) -> Self {
        Self { districts }
    }
}

#[async_trait]
impl ContactFilter for MultipleDistrictFilter {
    async fn filter(&self, rows: Vec<ContactRow>) -> Vec<ContactRow> {
        if self.districts.is_empty() {
            return rows;
        }
        rows.into_iter()
            .filter(|r| {
                r.contact
                    .reporting_location
                    .map(|l| self.districts.contains(&l))
                    .unwrap_or(false)
            })
            .collect()
    }
}

/// Contacts holding a role (group). Village health team members who are
/// also peer supervisors (`PVHT`) are not listed under `VHT`.
pub struct RoleFilter {
    role: Option<GroupId>,
    groups: Arc<dyn GroupRepository>,
}

impl RoleFilter {
    pub fn new(role: Option<GroupId>, groups: Arc<dyn GroupRepository>) -> Self {
        Self { role, groups }
    }
}

#[async_trait]
impl ContactFilter for RoleFilter {
    async fn filter(&self, rows: Vec<ContactRow>) -> Vec<ContactRow> {
        let Some(id) = self.role else {
            return rows;
        };
        let Some(group) = self.groups.get_group(id).await else {
            log::debug!("role filter: group {} not found", id);
            return rows;
        };
        let has = |r: &ContactRow, name: &str| r.group_names.iter().any(|g| g == name);
        rows.into_iter()
            .filter(|r| has(r, group.name.as_str()) && !(group.name == "VHT" && has(r, "PVHT")))
            .collect()
    }
}

pub struct GenderFilter {
    choice: GenderChoice,
}

impl GenderFilter {
    pub fn new(choice: GenderChoice) -> Self {
        Self { choice }
    }
}

#[async_trait]
impl ContactFilter for GenderFilter {
    async fn filter(&self, rows: Vec<ContactRow>) -> Vec<ContactRow> {
        let want = match self.choice {
            GenderChoice::Any => return rows,
            GenderChoice::Male => Some(Gender::Male),
            GenderChoice::Female => Some(Gender::Female),
            GenderChoice::Unknown => None,
        };
        rows.into_iter().filter(|r| r.contact.gender == want).collect()
    }
}

/// Age comparison against a window of `age * 365` days ending today.
pub struct AgeFilter {
    op: AgeOperator,
    age: Option<i64>,
    today: NaiveDate,
}

impl AgeFilter {
    /// `age` is the raw field; anything that is not a whole number counts as missing.
    pub fn new(op: AgeOperator, age: &str, today: NaiveDate) -> Self {
        Self {
            op,
            age: age.trim().parse().ok(),
            today,
        }
    }

    pub fn as_of_today(op: AgeOperator, age: &str) -> Self {
        Self::new(op, age, chrono::Local::now().date_naive())
    }

    fn window_start(&self) -> Option<NaiveDate> {
        let days = self.age?.checked_mul(365).and_then(Duration::try_days)?;
        self.today.checked_sub_signed(days)
    }
}

#[async_trait]
impl ContactFilter for AgeFilter {
    async fn filter(&self, rows: Vec<ContactRow>) -> Vec<ContactRow> {
        if self.op == AgeOperator::Any {
            return rows;
        }
        if self.op == AgeOperator::Unknown {
            return rows
                .into_iter()
                .filter(|r| r.contact.birthdate.is_none())
                .collect();
        }
        let Some(start) = self.window_start() else {
            log::debug!("age filter: no usable age for {:?}", self.op);
            return rows;
        };
        let end = self.today;
        rows.into_iter()
            .filter(|r| {
                let Some(b) = r.contact.birthdate else {
                    return false;
                };
                let within = b >= start && b <= end;
                match self.op {
                    AgeOperator::Equal => b.year() == start.year(),
                    AgeOperator::GreaterThan => !within,
                    AgeOperator::LessThan => within,
                    AgeOperator::Any | AgeOperator::Unknown => true,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Contact, Group, Location};
    use crate::store::MemoryStore;

    fn row(id: u64, name: &str) -> ContactRow {
        ContactRow {
            contact: Contact {
                id,
                name: name.to_string(),
                gender: None,
                birthdate: None,
                reporting_location: None,
                groups: vec![],
            },
            location: None,
            identities: vec![],
            group_names: vec![],
        }
    }

    fn ids(rows: &[ContactRow]) -> Vec<u64> {
        rows.iter().map(|r| r.contact.id).collect()
    }

    #[tokio::test]
    async fn groups_filter_no_group_and_ids() {
        let mut a = row(1, "a");
        a.contact.groups = vec![7];
        let b = row(2, "b");
        let mut c = row(3, "c");
        c.contact.groups = vec![8];
        let rows = vec![a, b, c];

        let f = GroupsFilter::new(vec![GroupChoice::NoGroup]);
        assert_eq!(ids(&f.filter(rows.clone()).await), vec![2]);
        let f = GroupsFilter::new(vec![GroupChoice::NoGroup, GroupChoice::Group(7)]);
        assert_eq!(ids(&f.filter(rows.clone()).await), vec![1, 2]);
        let f = GroupsFilter::new(vec![GroupChoice::Group(8)]);
        assert_eq!(ids(&f.filter(rows).await), vec![3]);
    }

    #[tokio::test]
    async fn free_search_substring_and_quoted() {
        let mut a = row(1, "Johnson Okello");
        a.identities = vec!["256772123456".to_string()];
        let b = row(2, "John Opio");
        let rows = vec![a, b];

        let f = FreeSearchFilter::new("john");
        assert_eq!(ids(&f.filter(rows.clone()).await), vec![1, 2]);
        let f = FreeSearchFilter::new("\"john\"");
        assert_eq!(ids(&f.filter(rows.clone()).await), vec![2]);
        let f = FreeSearchFilter::new("2123");
        assert_eq!(ids(&f.filter(rows.clone()).await), vec![1]);
        let f = FreeSearchFilter::new("   ");
        assert_eq!(f.filter(rows).await.len(), 2);
    }

    #[tokio::test]
    async fn free_search_quoted_term_is_literal() {
        let rows = vec![row(1, "a.b"), row(2, "axb")];
        let f = FreeSearchFilter::new("'a.b'");
        assert_eq!(ids(&f.filter(rows).await), vec![1]);
    }

    #[tokio::test]
    async fn district_filter_uses_descendants_and_degrades() {
        let store = Arc::new(MemoryStore::new());
        for (id, name, kind, parent) in [
            (1, "Uganda", LocationKind::Country, None),
            (2, "Gulu", LocationKind::District, Some(1)),
            (3, "Bardege", LocationKind::Other, Some(2)),
            (4, "Lira", LocationKind::District, Some(1)),
        ] {
            store
                .insert_location(Location {
                    id,
                    name: name.to_string(),
                    kind,
                    parent,
                })
                .await;
        }
        let mut a = row(1, "a");
        a.contact.reporting_location = Some(3);
        let mut b = row(2, "b");
        b.contact.reporting_location = Some(4);
        let mut c = row(3, "c");
        c.contact.reporting_location = Some(1);
        c.location = store.get_location(1).await;
        let rows = vec![a, b, c];

        let f = DistrictFilter::new(DistrictChoice::District(2), store.clone());
        assert_eq!(ids(&f.filter(rows.clone()).await), vec![1]);
        let f = DistrictFilter::new(DistrictChoice::NoDistrict, store.clone());
        assert_eq!(ids(&f.filter(rows.clone()).await), vec![3]);
        let f = DistrictFilter::new(DistrictChoice::District(99), store.clone());
        assert_eq!(f.filter(rows.clone()).await.len(), 3);
        let f = MultipleDistrictFilter::new(vec![4, 1]);
        assert_eq!(ids(&f.filter(rows).await), vec![2, 3]);
    }

    #[tokio::test]
    async fn role_filter_vht_excludes_pvht() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_group(Group {
                id: 1,
                name: "VHT".to_string(),
            })
            .await;
        let mut a = row(1, "a");
        a.group_names = vec!["VHT".to_string()];
        let mut b = row(2, "b");
        b.group_names = vec!["VHT".to_string(), "PVHT".to_string()];
        let rows = vec![a, b, row(3, "c")];

        let f = RoleFilter::new(Some(1), store.clone());
        assert_eq!(ids(&f.filter(rows.clone()).await), vec![1]);
        let f = RoleFilter::new(Some(42), store.clone());
        assert_eq!(f.filter(rows.clone()).await.len(), 3);
        let f = RoleFilter::new(None, store);
        assert_eq!(f.filter(rows).await.len(), 3);
    }

    #[tokio::test]
    async fn gender_filter() {
        let mut a = row(1, "a");
        a.contact.gender = Some(Gender::Male);
        let mut b = row(2, "b");
        b.contact.gender = Some(Gender::Female);
        let rows = vec![a, b, row(3, "c")];
        assert_eq!(ids(&GenderFilter::new(GenderChoice::Male).filter(rows.clone()).await), vec![1]);
        assert_eq!(ids(&GenderFilter::new(GenderChoice::Unknown).filter(rows.clone()).await), vec![3]);
        assert_eq!(GenderFilter::new(GenderChoice::Any).filter(rows).await.len(), 3);
    }

    #[tokio::test]
    async fn age_filter_window() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let born = |y, m, d| NaiveDate::from_ymd_opt(y, m, d);
        let mut young = row(1, "young");
        young.contact.birthdate = born(2010, 1, 1);
        let mut old = row(2, "old");
        old.contact.birthdate = born(1960, 1, 1);
        let unknown = row(3, "unknown");
        let rows = vec![young, old, unknown];

        let lt = AgeFilter::new(AgeOperator::LessThan, "20", today);
        assert_eq!(ids(&lt.filter(rows.clone()).await), vec![1]);
        let gt = AgeFilter::new(AgeOperator::GreaterThan, "20", today);
        assert_eq!(ids(&gt.filter(rows.clone()).await), vec![2]);
        // 64 * 365 days before 2024-06-01 falls in 1960
        let eq = AgeFilter::new(AgeOperator::Equal, "64", today);
        assert_eq!(ids(&eq.filter(rows.clone()).await), vec![2]);
        let none = AgeFilter::new(AgeOperator::Unknown, "", today);
        assert_eq!(ids(&none.filter(rows.clone()).await), vec![3]);
        let bad = AgeFilter::new(AgeOperator::LessThan, "abc", today);
        assert_eq!(bad.filter(rows).await.len(), 3);
    }

    #[tokio::test]
    async fn age_beyond_calendar_range_leaves_rows_unchanged() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut a = row(1, "a");
        a.contact.birthdate = NaiveDate::from_ymd_opt(2000, 1, 1);
        let rows = vec![a, row(2, "b")];
        let max = i64::MAX.to_string();

        for age in ["99999999999999", max.as_str()] {
            for op in [AgeOperator::LessThan, AgeOperator::GreaterThan, AgeOperator::Equal] {
                let f = AgeFilter::new(op, age, today);
                assert_eq!(ids(&f.filter(rows.clone()).await), vec![1, 2]);
            }
        }
    }
}

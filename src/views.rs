//! Derived, read-only projections over the cached collections.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::models::*;

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Comma-separated tag input, trimmed, empty entries dropped.
pub fn parse_tags(input: &str) -> Vec<String> {
    input.split(',').map(str::trim).filter(|t| !t.is_empty()).map(str::to_string).collect()
}

pub fn filter_by_status(posts: &[Post], status: PostStatus) -> Vec<&Post> {
    posts.iter().filter(|p| p.status == status).collect()
}

/// Everything not yet published, in collection order.
pub fn posts_to_review(posts: &[Post]) -> Vec<&Post> {
    posts.iter().filter(|p| p.status != PostStatus::Published).collect()
}

// ---------------- Sources --------------------------------------------

/// Applies the query (title or handle), type and status selections.
pub fn filter_sources<'a>(sources: &'a [Source], filters: &FilterState) -> Vec<&'a Source> {
    let needle = filters.query.trim().to_lowercase();
    sources
        .iter()
        .filter(|s| needle.is_empty() || contains_ci(&s.title, &needle) || contains_ci(&s.handle, &needle))
        .filter(|s| filters.source_type.matches(&s.kind))
        .filter(|s| filters.source_status.matches(&s.status))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceTotals {
    pub total: usize,
    pub active: usize,
    pub telegram: usize,
    pub website: usize,
}

pub fn source_totals(sources: &[Source]) -> SourceTotals {
    sources.iter().fold(SourceTotals::default(), |mut t, s| {
        t.total += 1;
        if s.status == SourceStatus::Active {
            t.active += 1;
        }
        match s.kind {
            SourceType::Telegram => t.telegram += 1,
            SourceType::Website => t.website += 1,
        }
        t
    })
}

// ---------------- Review queue ---------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewQuery {
    pub query: String,
    pub status: Selection<PostStatus>,
    pub source_id: Selection<Id>,
}

/// Unpublished posts matching `q`, relative order preserved.
pub fn review_queue<'a>(posts: &'a [Post], q: &ReviewQuery) -> Vec<&'a Post> {
    let needle = q.query.trim().to_lowercase();
    posts_to_review(posts)
        .into_iter()
        .filter(|p| needle.is_empty() || contains_ci(&p.title, &needle) || contains_ci(&p.content, &needle))
        .filter(|p| q.status.matches(&p.status))
        .filter(|p| q.source_id.matches(&p.source_id))
        .collect()
}

/// Most recently touched first; ties keep their incoming order.
pub fn sort_by_recent(mut posts: Vec<&Post>) -> Vec<&Post> {
    posts.sort_by(|a, b| b.activity_at().cmp(&a.activity_at()));
    posts
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayGroup<'a> {
    pub day: NaiveDate,
    pub label: String,
    pub posts: Vec<&'a Post>,
}

/// `Today`, `Yesterday`, or `dd.mm.yy`.
pub fn day_label(day: NaiveDate, today: NaiveDate) -> String {
    if day == today {
        "Today".to_string()
    } else if today.pred_opt() == Some(day) {
        "Yesterday".to_string()
    } else {
        day.format("%d.%m.%y").to_string()
    }
}

/// Groups already-sorted posts by UTC calendar day, groups in first-seen order.
pub fn group_by_day<'a>(posts: &[&'a Post], today: NaiveDate) -> Vec<DayGroup<'a>> {
    let mut groups: Vec<DayGroup<'a>> = Vec::new();
    for &post in posts {
        let day = post.activity_at().date_naive();
        match groups.iter_mut().find(|g| g.day == day) {
            Some(group) => group.posts.push(post),
            None => groups.push(DayGroup { day, label: day_label(day, today), posts: vec![post] }),
        }
    }
    groups
}

// ---------------- Released feed --------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Timeframe {
    All,
    Days7,
    #[default]
    Days30,
    Days90,
}

impl Timeframe {
    pub fn window(self) -> Option<Duration> {
        match self {
            Timeframe::All => None,
            Timeframe::Days7 => Some(Duration::days(7)),
            Timeframe::Days30 => Some(Duration::days(30)),
            Timeframe::Days90 => Some(Duration::days(90)),
        }
    }
}

impl std::str::FromStr for Timeframe {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Timeframe::All),
            "7d" => Ok(Timeframe::Days7),
            "30d" => Ok(Timeframe::Days30),
            "90d" => Ok(Timeframe::Days90),
            _ => Err(ParseEnumError { kind: "timeframe", value: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleasedQuery {
    pub query: String,
    pub source_id: Selection<Id>,
    pub timeframe: Timeframe,
}

/// Published posts within the timeframe; a post without `publishedAt` only
/// shows under [`Timeframe::All`].
pub fn released<'a>(posts: &'a [Post], q: &ReleasedQuery, now: DateTime<Utc>) -> Vec<&'a Post> {
    let needle = q.query.trim().to_lowercase();
    filter_by_status(posts, PostStatus::Published)
        .into_iter()
        .filter(|p| needle.is_empty() || contains_ci(&p.title, &needle) || contains_ci(&p.content, &needle))
        .filter(|p| q.source_id.matches(&p.source_id))
        .filter(|p| match q.timeframe.window() {
            None => true,
            Some(window) => p.published_at.map_or(false, |at| now - at <= window),
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleasedTotals {
    pub total: usize,
    /// (source id, count), largest first.
    pub by_source: Vec<(Id, usize)>,
}

pub fn released_totals(posts: &[&Post]) -> ReleasedTotals {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for p in posts {
        *counts.entry(p.source_id.as_str()).or_default() += 1;
    }
    let mut by_source: Vec<(Id, usize)> = counts.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    by_source.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ReleasedTotals { total: posts.len(), by_source }
}

pub fn count_role(users: &[User], role: Role) -> usize {
    users.iter().filter(|u| u.role == role).count()
}

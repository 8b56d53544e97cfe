//! Feedback analytics: one reduction building per-person aggregates,
//! followed by independent sort-and-slice ranking projections. Everything
//! is pure and never errors; malformed sentiment labels count as neutral.

use std::collections::HashMap;

use crate::directory::Directory;
use crate::model::{Feedback, Role, Sentiment, TargetKind, UserId};

pub const RANKING_LIMIT: usize = 5;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonAggregate {
    pub id: UserId,
    pub name: String,
    pub role: Option<Role>,
    pub email: Option<String>,
    pub sent: u64,
    pub received: u64,
    pub positive_received: u64,
    pub neutral_received: u64,
    pub negative_received: u64,
}

/// Aggregates keyed by person, in first-touch order. The insertion order is
/// load-bearing: ranking ties are broken by it (stable sort), which is the
/// contract the dashboards rely on.
#[derive(Debug, Default)]
pub struct Aggregation {
    people: Vec<PersonAggregate>,
    index: HashMap<UserId, usize>,
}

impl Aggregation {
    pub fn people(&self) -> &[PersonAggregate] {
        &self.people
    }

    pub fn person(&self, id: &str) -> Option<&PersonAggregate> {
        self.index.get(id).map(|&i| &self.people[i])
    }

    fn entry(&mut self, id: &str) -> &mut PersonAggregate {
        if let Some(&i) = self.index.get(id) {
            return &mut self.people[i];
        }
        let aggregate = PersonAggregate {
            id: id.to_string(),
            name: fallback_name(id),
            ..PersonAggregate::default()
        };
        self.people.push(aggregate);
        self.index.insert(id.to_string(), self.people.len() - 1);
        let last = self.people.len() - 1;
        &mut self.people[last]
    }

    fn note_identity(&mut self, id: &str, name: Option<&str>, role: Option<&str>, email: Option<&str>) {
        let entry = self.entry(id);
        if let Some(name) = name {
            if !name.trim().is_empty() {
                entry.name = name.to_string();
            }
        }
        if entry.role.is_none() {
            entry.role = role.and_then(Role::parse);
        }
        if entry.email.is_none() {
            entry.email = email.map(|e| e.to_string());
        }
    }

    /// Fill name/role/email from the directory once it is available. A
    /// known name is never replaced by a blank one.
    pub fn enrich(&mut self, directory: &Directory) {
        for aggregate in &mut self.people {
            if let Some(user) = directory.person(&aggregate.id) {
                if !user.full_name.trim().is_empty() {
                    aggregate.name = user.full_name.clone();
                }
                aggregate.role = Some(user.role);
                if aggregate.email.is_none() {
                    aggregate.email = Some(user.email.clone());
                }
            }
        }
    }

    pub fn rankings(&self) -> RankingSet {
        RankingSet {
            top_senders: self.top_by(|p| p.sent, None),
            top_recipients: self.top_by(|p| p.received, None),
            praised_students: self.top_by(|p| p.positive_received, Some(Role::Student)),
            praised_teachers: self.top_by(|p| p.positive_received, Some(Role::Teacher)),
            pressured_students: self.top_by(|p| p.negative_received, Some(Role::Student)),
            pressured_teachers: self.top_by(|p| p.negative_received, Some(Role::Teacher)),
            teacher_sentiment: self
                .people
                .iter()
                .filter(|p| p.role == Some(Role::Teacher) && p.received > 0)
                .cloned()
                .collect(),
        }
    }

    /// Stable descending sort, strictly-positive metric, at most five rows.
    fn top_by<F>(&self, metric: F, role: Option<Role>) -> Vec<PersonAggregate>
    where
        F: Fn(&PersonAggregate) -> u64,
    {
        let mut rows: Vec<&PersonAggregate> = self
            .people
            .iter()
            .filter(|p| metric(p) > 0)
            .filter(|p| role.map_or(true, |r| p.role == Some(r)))
            .collect();
        rows.sort_by(|a, b| metric(b).cmp(&metric(a)));
        rows.into_iter().take(RANKING_LIMIT).cloned().collect()
    }
}

fn fallback_name(id: &str) -> String {
    let short: String = id.chars().take(8).collect();
    format!("user-{short}")
}

#[derive(Debug, Default)]
pub struct RankingSet {
    pub top_senders: Vec<PersonAggregate>,
    pub top_recipients: Vec<PersonAggregate>,
    pub praised_students: Vec<PersonAggregate>,
    pub praised_teachers: Vec<PersonAggregate>,
    pub pressured_students: Vec<PersonAggregate>,
    pub pressured_teachers: Vec<PersonAggregate>,
    /// Every teacher with received > 0, carrying the three sentiment counts
    /// for proportional display. Not truncated.
    pub teacher_sentiment: Vec<PersonAggregate>,
}

/// Single pass over the event list. Senders always gain a `sent`; person
/// targets additionally gain `received` plus exactly one sentiment bucket.
/// Class and subject targets never produce a received bucket.
pub fn aggregate(events: &[Feedback]) -> Aggregation {
    let mut aggregation = Aggregation::default();

    for event in events {
        aggregation.note_identity(
            &event.sender_id,
            event.sender_name.as_deref(),
            event.sender_role.as_deref(),
            event.sender_email.as_deref(),
        );
        aggregation.entry(&event.sender_id).sent += 1;

        if event.target_type == TargetKind::User {
            aggregation.note_identity(
                &event.target_id,
                event.target_name.as_deref(),
                event.target_role.as_deref(),
                event.target_email.as_deref(),
            );
            let entry = aggregation.entry(&event.target_id);
            entry.received += 1;
            match event.sentiment_bucket() {
                Sentiment::Positive => entry.positive_received += 1,
                Sentiment::Neutral => entry.neutral_received += 1,
                Sentiment::Negative => entry.negative_received += 1,
            }
        }
    }

    aggregation
}

/// Overview widget counters. The three sentiment buckets always partition
/// the total, and triggers can never exceed it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedbackTotals {
    pub total: u64,
    pub positive: u64,
    pub neutral: u64,
    pub negative: u64,
    pub triggers: u64,
}

pub fn totals(events: &[Feedback]) -> FeedbackTotals {
    let mut out = FeedbackTotals::default();
    for event in events {
        out.total += 1;
        match event.sentiment_bucket() {
            Sentiment::Positive => out.positive += 1,
            Sentiment::Neutral => out.neutral += 1,
            Sentiment::Negative => out.negative += 1,
        }
        if event.has_trigger {
            out.triggers += 1;
        }
    }
    out
}

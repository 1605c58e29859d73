use chrono::NaiveDate;
use tracing::trace;

use crate::datetime::parse_date_expr;
use crate::event::{Event, Priority, Status};

/// One predicate parsed from a filter term. All predicates AND together.
#[derive(Debug, Clone)]
pub enum Pred {
    Id(u64),
    StatusEq(Status),
    PriorityEq(Priority),
    CategoryEq(String),
    AssigneeEq(String),
    TagInclude(String),
    TagExclude(String),
    OccursOn(NaiveDate),
    EndsOnOrAfter(NaiveDate),
    StartsOnOrBefore(NaiveDate),
    TextContains(String),
}

#[derive(Debug, Clone, Default)]
pub struct Filter {
    preds: Vec<Pred>,
}

impl Filter {
    /// Parse free-form filter terms. Date-valued terms resolve date
    /// expressions against `today`.
    #[tracing::instrument(skip(terms, today))]
    pub fn parse(terms: &[String], today: NaiveDate) -> anyhow::Result<Self> {
        let mut preds = Vec::with_capacity(terms.len());

        for term in terms {
            let term = term.trim();
            if term.is_empty() {
                continue;
            }

            if let Ok(id) = term.parse::<u64>() {
                preds.push(Pred::Id(id));
                continue;
            }

            if let Some(tag) = term.strip_prefix('+') {
                preds.push(Pred::TagInclude(tag.to_string()));
                continue;
            }
            if let Some(tag) = term.strip_prefix('-') {
                preds.push(Pred::TagExclude(tag.to_string()));
                continue;
            }

            if let Some((key, value)) = term.split_once(':') {
                match key {
                    "status" => {
                        preds.push(Pred::StatusEq(parse_status(value)?));
                        continue;
                    }
                    "priority" => {
                        preds.push(Pred::PriorityEq(parse_priority(value)?));
                        continue;
                    }
                    "category" => {
                        preds.push(Pred::CategoryEq(value.to_string()));
                        continue;
                    }
                    "assignee" => {
                        preds.push(Pred::AssigneeEq(value.to_string()));
                        continue;
                    }
                    "on" => {
                        preds.push(Pred::OccursOn(parse_date_expr(value, today)?));
                        continue;
                    }
                    "from" => {
                        preds.push(Pred::EndsOnOrAfter(parse_date_expr(value, today)?));
                        continue;
                    }
                    "until" => {
                        preds.push(Pred::StartsOnOrBefore(parse_date_expr(value, today)?));
                        continue;
                    }
                    _ => {}
                }
            }

            preds.push(Pred::TextContains(term.to_ascii_lowercase()));
        }

        Ok(Self { preds })
    }

    pub fn is_empty(&self) -> bool {
        self.preds.is_empty()
    }

    /// True when the filter selects by id, i.e. names specific events.
    pub fn has_identity_selector(&self) -> bool {
        self.preds.iter().any(|p| matches!(p, Pred::Id(_)))
    }

    pub fn matches(&self, event: &Event) -> bool {
        let ok = self.preds.iter().all(|pred| eval(pred, event));
        trace!(id = event.id, ok, "filter evaluated");
        ok
    }
}

fn eval(pred: &Pred, event: &Event) -> bool {
    match pred {
        Pred::Id(id) => event.id == *id,
        Pred::StatusEq(status) => event.status == *status,
        Pred::PriorityEq(priority) => event.priority == *priority,
        Pred::CategoryEq(category) => event.category.eq_ignore_ascii_case(category),
        Pred::AssigneeEq(assignee) => event.assigned_to.eq_ignore_ascii_case(assignee),
        Pred::TagInclude(tag) => event.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)),
        Pred::TagExclude(tag) => !event.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)),
        Pred::OccursOn(date) => event.occurs_on(*date),
        Pred::EndsOnOrAfter(date) => event.end_date >= *date,
        Pred::StartsOnOrBefore(date) => event.start_date <= *date,
        Pred::TextContains(needle) => {
            event.title.to_ascii_lowercase().contains(needle)
                || event.description.to_ascii_lowercase().contains(needle)
        }
    }
}

pub fn parse_status(value: &str) -> anyhow::Result<Status> {
    match value.trim().to_ascii_lowercase().as_str() {
        "planned" => Ok(Status::Planned),
        "in-progress" | "inprogress" | "active" => Ok(Status::InProgress),
        "completed" | "done" => Ok(Status::Completed),
        other => Err(anyhow::anyhow!("unknown status: {other}")),
    }
}

pub fn parse_priority(value: &str) -> anyhow::Result<Priority> {
    match value.trim().to_ascii_lowercase().as_str() {
        "low" | "l" => Ok(Priority::Low),
        "medium" | "m" => Ok(Priority::Medium),
        "high" | "h" => Ok(Priority::High),
        other => Err(anyhow::anyhow!("unknown priority: {other}")),
    }
}

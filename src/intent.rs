use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::store::{Item, ItemId, ItemPatch, QueryFilter, StoreFault};

/// Opaque conversation key handed to us by the chat surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw user input. Immutable once received.
#[derive(Debug, Clone, Serialize)]
pub struct Utterance {
    pub text: String,
    pub received_at: DateTime<Utc>,
    pub session: SessionId,
}

impl Utterance {
    pub fn now(text: impl Into<String>, session: SessionId) -> Self {
        Self {
            text: text.into(),
            received_at: Utc::now(),
            session,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Day {
    /// Accepts full day names, common abbreviations, and plurals, any case.
    /// Whole-word only: "monitor" is not a Monday.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim().trim_matches(|c: char| !c.is_alphanumeric());
        let lower = token.to_lowercase();
        let singular = lower.strip_suffix('s').unwrap_or(&lower);
        match singular {
            "mon" | "monday" => Some(Day::Mon),
            "tue" | "tuesday" => Some(Day::Tue),
            "wed" | "wednesday" => Some(Day::Wed),
            "thu" | "thur" | "thursday" => Some(Day::Thu),
            "fri" | "friday" => Some(Day::Fri),
            // "sats"/"suns" are nobody's plurals, but stripping is harmless
            "sat" | "saturday" => Some(Day::Sat),
            "sun" | "sunday" => Some(Day::Sun),
            _ => None,
        }
    }

    pub fn from_weekday(weekday: chrono::Weekday) -> Self {
        match weekday {
            chrono::Weekday::Mon => Day::Mon,
            chrono::Weekday::Tue => Day::Tue,
            chrono::Weekday::Wed => Day::Wed,
            chrono::Weekday::Thu => Day::Thu,
            chrono::Weekday::Fri => Day::Fri,
            chrono::Weekday::Sat => Day::Sat,
            chrono::Weekday::Sun => Day::Sun,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Day::Mon => "mon",
            Day::Tue => "tue",
            Day::Wed => "wed",
            Day::Thu => "thu",
            Day::Fri => "fri",
            Day::Sat => "sat",
            Day::Sun => "sun",
        }
    }
}

/// Wall-clock time of day, minute resolution. No date attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    /// Parses "10", "10:30", "10.30", "8am", "8:15 pm".
    pub fn parse(text: &str) -> Option<Self> {
        let lower = text.trim().to_lowercase().replace('.', ":");
        let is_pm = lower.contains("pm");
        let is_am = lower.contains("am");
        let digits: String = lower.chars().filter(|c| c.is_ascii_digit() || *c == ':').collect();
        let (h_str, m_str) = match digits.split_once(':') {
            Some((h, m)) => (h, m),
            None => (digits.as_str(), "0"),
        };
        let mut hour: u8 = h_str.parse().ok()?;
        let minute: u8 = m_str.parse().ok()?;
        if is_pm && hour < 12 {
            hour += 12;
        }
        if is_am && hour == 12 {
            hour = 0;
        }
        TimeOfDay::new(hour, minute)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Query,
    CreateTask,
    CreateEvent,
    ModifyTask,
    Unknown,
}

impl IntentKind {
    pub fn label(&self) -> &'static str {
        match self {
            IntentKind::Query => "query",
            IntentKind::CreateTask => "task",
            IntentKind::CreateEvent => "class",
            IntentKind::ModifyTask => "modify",
            IntentKind::Unknown => "unknown",
        }
    }
}

/// Where a candidate came from. Advisory candidates never carry authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Deterministic,
    Advisory,
}

/// Kind-specific fields a candidate managed to extract. All extraction fields
/// are optional; hard rules decide later whether enough is present to act.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntentPayload {
    Query {
        filter: QueryFilter,
    },
    CreateTask {
        title: Option<String>,
        due: Option<chrono::NaiveDate>,
    },
    CreateEvent {
        title: Option<String>,
        days: BTreeSet<Day>,
        start: Option<TimeOfDay>,
        end: Option<TimeOfDay>,
    },
    ModifyTask {
        target: Option<String>,
        patch: ItemPatch,
    },
    Unknown,
}

impl IntentPayload {
    pub fn kind(&self) -> IntentKind {
        match self {
            IntentPayload::Query { .. } => IntentKind::Query,
            IntentPayload::CreateTask { .. } => IntentKind::CreateTask,
            IntentPayload::CreateEvent { .. } => IntentKind::CreateEvent,
            IntentPayload::ModifyTask { .. } => IntentKind::ModifyTask,
            IntentPayload::Unknown => IntentKind::Unknown,
        }
    }
}

/// A scored interpretation of one utterance. Immutable value object; merging
/// and boosting always produce fresh candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentCandidate {
    pub payload: IntentPayload,
    pub confidence: f32,
    pub source: Source,
    pub reason: String,
}

impl IntentCandidate {
    pub fn new(payload: IntentPayload, confidence: f32, source: Source, reason: impl Into<String>) -> Self {
        Self {
            payload,
            confidence: confidence.clamp(0.0, 1.0),
            source,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> IntentKind {
        self.payload.kind()
    }
}

/// A candidate that passed hard-rule validation. Only `arbiter::rules` builds
/// these; the executor re-checks the invariants anyway.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedIntent {
    Query(QueryFilter),
    CreateTask {
        title: String,
        due: Option<chrono::NaiveDate>,
    },
    CreateEvent {
        title: String,
        days: BTreeSet<Day>,
        start: TimeOfDay,
        end: TimeOfDay,
    },
    ModifyTask {
        id: ItemId,
        patch: ItemPatch,
    },
}

impl ResolvedIntent {
    pub fn kind(&self) -> IntentKind {
        match self {
            ResolvedIntent::Query(_) => IntentKind::Query,
            ResolvedIntent::CreateTask { .. } => IntentKind::CreateTask,
            ResolvedIntent::CreateEvent { .. } => IntentKind::CreateEvent,
            ResolvedIntent::ModifyTask { .. } => IntentKind::ModifyTask,
        }
    }

    pub fn is_mutation(&self) -> bool {
        !matches!(self, ResolvedIntent::Query(_))
    }
}

/// Confidence and origin of the candidate that won arbitration. Carried next
/// to the ResolvedIntent for the analytics record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Provenance {
    pub confidence: f32,
    pub source: Source,
}

/// An unresolved turn parked for the user. One per session; a newer entry
/// supersedes the old one.
#[derive(Debug, Clone)]
pub struct PendingClarification {
    pub utterance: Utterance,
    pub candidates: Vec<IntentCandidate>,
    pub question: String,
    pub options: Vec<String>,
    pub asked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    NoActionableIntent,
    Validation(String),
    TargetNotFound(String),
    Declined,
    StoreFault(StoreFault),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NoActionableIntent => f.write_str("no actionable intent recognized"),
            RejectReason::Validation(msg) => write!(f, "{}", msg),
            RejectReason::TargetNotFound(text) => {
                write!(f, "couldn't find anything matching '{}'", text)
            }
            RejectReason::Declined => f.write_str("okay, leaving everything as it is"),
            RejectReason::StoreFault(fault) => write!(f, "store unavailable: {}", fault),
        }
    }
}

/// The Arbiter's verdict for one turn. Always exactly one of these; ordinary
/// ambiguity is Clarify or Reject, never a fault.
#[derive(Debug, Clone)]
pub enum Decision {
    Execute {
        intent: ResolvedIntent,
        provenance: Provenance,
    },
    Clarify(PendingClarification),
    Reject(RejectReason),
}

impl Decision {
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Execute { .. } => "execute",
            Decision::Clarify(_) => "clarify",
            Decision::Reject(_) => "reject",
        }
    }
}

/// Outcome of executor dispatch. Mutation confirmation or query results,
/// never both.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult {
    Created(ItemId),
    Modified(ItemId),
    Items(Vec<Item>),
}

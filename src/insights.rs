//! Derived, read-only views over a member and its related rows.
//!
//! Everything here is a pure function of its inputs. Callers pass `now`
//! explicitly so results are reproducible in tests.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::db::to_millis;
use crate::models::{
    Conversation, ConversationStatus, ConversationThread, EngagementLevel, Episode,
    EpisodeStatus, HealthMetric, Member, Priority,
};

const MILLIS_PER_DAY: i64 = 86_400_000;
const INACTIVE_AFTER_DAYS: i64 = 7;
const LOW_ADHERENCE_BELOW: i32 = 75;

/// Preview sizes used by `/members/full`.
pub const FULL_METRICS: usize = 10;
pub const FULL_EPISODES: usize = 5;
pub const FULL_CONVERSATIONS: usize = 3;
pub const FULL_MESSAGES: usize = 5;

const PROFILE_RECENT_METRICS: usize = 7;
const DASHBOARD_METRIC_WINDOW: usize = 30;
const DASHBOARD_RECENT_METRICS: usize = 3;
const DASHBOARD_GOALS: usize = 2;
const OVERVIEW_RECENT_ACTIVITY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

pub fn risk_level(plan_adherence: i32) -> RiskLevel {
    if plan_adherence < 50 {
        RiskLevel::High
    } else if plan_adherence < LOW_ADHERENCE_BELOW {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Whole days from `timestamp` to `now`, floored.
pub fn days_since(timestamp: OffsetDateTime, now: OffsetDateTime) -> i64 {
    (to_millis(now) - to_millis(timestamp)).div_euclid(MILLIS_PER_DAY)
}

pub fn is_inactive(last_active: OffsetDateTime, now: OffsetDateTime) -> bool {
    days_since(last_active, now) > INACTIVE_AFTER_DAYS
}

/// Stable descending sort by `key`, truncated to `n`. Equal keys keep their
/// input order.
pub fn latest_n<T, K, F>(items: &[T], n: usize, key: F) -> Vec<T>
where
    T: Clone,
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut sorted: Vec<T> = items.to_vec();
    sorted.sort_by(|a, b| key(b).cmp(&key(a)));
    sorted.truncate(n);
    sorted
}

pub fn retention_rate(active_members: usize, total_members: usize) -> String {
    if total_members == 0 {
        return "0.0".to_string();
    }
    let percent = active_members as f64 / total_members as f64 * 100.0;
    // Exact halves round up, not to even.
    format!("{:.1}", (percent * 10.0).round() / 10.0)
}

/// A member with every related row the aggregations need.
#[derive(Debug, Clone)]
pub struct MemberRecords {
    pub member: Member,
    pub health_metrics: Vec<HealthMetric>,
    pub episodes: Vec<Episode>,
    /// Threads carry all of their messages; `member` is unset.
    pub conversations: Vec<ConversationThread>,
}

impl MemberRecords {
    pub fn empty(member: Member) -> Self {
        Self {
            member,
            health_metrics: Vec::new(),
            episodes: Vec::new(),
            conversations: Vec::new(),
        }
    }

    fn active_episodes(&self) -> impl Iterator<Item = &Episode> {
        self.episodes.iter().filter(|ep| ep.status.is_active())
    }

    fn active_conversations(&self) -> impl Iterator<Item = &ConversationThread> {
        self.conversations
            .iter()
            .filter(|thread| thread.conversation.status == ConversationStatus::Active)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInsights {
    pub total_health_metrics: usize,
    pub active_episodes: usize,
    pub active_conversations: usize,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_metric_date: Option<OffsetDateTime>,
    pub average_plan_adherence: i32,
    pub risk_level: RiskLevel,
}

pub fn insights(records: &MemberRecords) -> MemberInsights {
    MemberInsights {
        total_health_metrics: records.health_metrics.len(),
        active_episodes: records.active_episodes().count(),
        active_conversations: records.active_conversations().count(),
        last_metric_date: records.health_metrics.iter().map(|m| m.timestamp).max(),
        average_plan_adherence: records.member.plan_adherence,
        risk_level: risk_level(records.member.plan_adherence),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberWithInsights {
    #[serde(flatten)]
    pub member: Member,
    pub health_metrics: Vec<HealthMetric>,
    pub episodes: Vec<Episode>,
    pub conversations: Vec<ConversationThread>,
    pub insights: MemberInsights,
}

/// Insights over every row, previews trimmed to the `FULL_*` sizes.
pub fn member_with_insights(records: &MemberRecords) -> MemberWithInsights {
    let conversations = latest_n(&records.conversations, FULL_CONVERSATIONS, |t| {
        t.conversation.updated_at
    })
    .into_iter()
    .map(|mut thread| {
        thread.messages = latest_n(&thread.messages, FULL_MESSAGES, |m| m.timestamp);
        thread
    })
    .collect();

    MemberWithInsights {
        member: records.member.clone(),
        health_metrics: latest_n(&records.health_metrics, FULL_METRICS, |m| m.timestamp),
        episodes: latest_n(&records.episodes, FULL_EPISODES, |ep| ep.created_at),
        conversations,
        insights: insights(records),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembersSummary {
    pub total_members: usize,
    pub high_engagement: usize,
    pub low_adherence: usize,
    /// Episodes currently `in_progress`; `open` ones are not counted here.
    pub active_episodes: usize,
}

pub fn members_summary(records: &[MemberRecords]) -> MembersSummary {
    MembersSummary {
        total_members: records.len(),
        high_engagement: records
            .iter()
            .filter(|r| {
                matches!(
                    r.member.engagement_level,
                    EngagementLevel::High | EngagementLevel::VeryHigh
                )
            })
            .count(),
        low_adherence: records
            .iter()
            .filter(|r| r.member.plan_adherence < LOW_ADHERENCE_BELOW)
            .count(),
        active_episodes: records
            .iter()
            .flat_map(|r| r.episodes.iter())
            .filter(|ep| ep.status == EpisodeStatus::InProgress)
            .count(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthTrends {
    pub total_metrics: usize,
    pub recent_metrics: Vec<HealthMetric>,
    pub metric_types: Vec<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_recorded_date: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareJourney {
    pub total_episodes: usize,
    pub active_episodes: Vec<Episode>,
    pub resolved_episodes: Vec<Episode>,
    /// Mean length in days of episodes that have an end date.
    pub average_episode_duration: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Communication {
    pub total_conversations: usize,
    pub active_conversations: Vec<ConversationThread>,
    pub total_messages: usize,
    pub unread_messages: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub risk_level: RiskLevel,
    pub adherence_score: i32,
    pub engagement_level: EngagementLevel,
    #[serde(with = "time::serde::rfc3339")]
    pub last_active_date: OffsetDateTime,
    pub days_since_last_active: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberAnalytics {
    pub health_trends: HealthTrends,
    pub care_journey: CareJourney,
    pub communication: Communication,
    pub health_status: HealthStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberProfile {
    #[serde(flatten)]
    pub member: Member,
    pub health_metrics: Vec<HealthMetric>,
    pub episodes: Vec<Episode>,
    pub conversations: Vec<ConversationThread>,
    pub analytics: MemberAnalytics,
}

pub fn member_profile(records: &MemberRecords, now: OffsetDateTime) -> MemberProfile {
    let health_metrics = latest_n(&records.health_metrics, usize::MAX, |m| m.timestamp);
    let episodes = latest_n(&records.episodes, usize::MAX, |ep| ep.created_at);
    let conversations: Vec<ConversationThread> =
        latest_n(&records.conversations, usize::MAX, |t| t.conversation.updated_at)
            .into_iter()
            .map(|mut thread| {
                thread.messages = latest_n(&thread.messages, usize::MAX, |m| m.timestamp);
                thread
            })
            .collect();

    let mut seen = HashSet::new();
    let metric_types = health_metrics
        .iter()
        .filter(|m| seen.insert(m.metric_type.as_str()))
        .map(|m| m.metric_type.clone())
        .collect();

    let finished: Vec<f64> = episodes
        .iter()
        .filter_map(|ep| {
            ep.end_date.map(|end| {
                (to_millis(end) - to_millis(ep.start_date)) as f64 / MILLIS_PER_DAY as f64
            })
        })
        .collect();
    let average_episode_duration = if finished.is_empty() {
        None
    } else {
        Some(finished.iter().sum::<f64>() / finished.len() as f64)
    };

    let member = &records.member;
    let analytics = MemberAnalytics {
        health_trends: HealthTrends {
            total_metrics: health_metrics.len(),
            recent_metrics: latest_n(&health_metrics, PROFILE_RECENT_METRICS, |m| m.timestamp),
            metric_types,
            last_recorded_date: health_metrics.first().map(|m| m.timestamp),
        },
        care_journey: CareJourney {
            total_episodes: episodes.len(),
            active_episodes: episodes
                .iter()
                .filter(|ep| ep.status.is_active())
                .cloned()
                .collect(),
            resolved_episodes: episodes
                .iter()
                .filter(|ep| ep.status == EpisodeStatus::Resolved)
                .cloned()
                .collect(),
            average_episode_duration,
        },
        communication: Communication {
            total_conversations: conversations.len(),
            active_conversations: conversations
                .iter()
                .filter(|t| t.conversation.status == ConversationStatus::Active)
                .cloned()
                .collect(),
            total_messages: conversations.iter().map(|t| t.messages.len()).sum(),
            unread_messages: conversations
                .iter()
                .flat_map(|t| t.messages.iter())
                .filter(|m| m.is_unread_from_team())
                .count(),
        },
        health_status: HealthStatus {
            risk_level: risk_level(member.plan_adherence),
            adherence_score: member.plan_adherence,
            engagement_level: member.engagement_level,
            last_active_date: member.last_active,
            days_since_last_active: days_since(member.last_active, now),
        },
    };

    MemberProfile {
        member: member.clone(),
        health_metrics,
        episodes,
        conversations,
        analytics,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMember {
    pub id: String,
    pub name: String,
    pub profile_image: Option<String>,
    pub engagement_level: EngagementLevel,
    pub plan_adherence: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickStats {
    pub active_episodes: usize,
    pub unread_messages: usize,
    pub recent_metrics: Vec<HealthMetric>,
    pub next_goals: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardAlerts {
    pub low_adherence: bool,
    pub inactive_user: bool,
    pub urgent_episodes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub last_metric: Option<HealthMetric>,
    pub active_conversations: usize,
    pub current_conditions: Vec<String>,
    pub medications: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDashboard {
    pub member: DashboardMember,
    pub quick_stats: QuickStats,
    pub alerts: DashboardAlerts,
    pub recent_activity: RecentActivity,
}

pub fn member_dashboard(records: &MemberRecords, now: OffsetDateTime) -> MemberDashboard {
    let member = &records.member;
    let window = latest_n(&records.health_metrics, DASHBOARD_METRIC_WINDOW, |m| {
        m.timestamp
    });
    let active_episodes: Vec<&Episode> = records.active_episodes().collect();
    let active_conversations: Vec<&ConversationThread> =
        records.active_conversations().collect();
    let unread_messages = active_conversations
        .iter()
        .flat_map(|t| t.messages.iter())
        .filter(|m| m.is_unread_from_team())
        .count();

    MemberDashboard {
        member: DashboardMember {
            id: member.id.clone(),
            name: member.name.clone(),
            profile_image: member.profile_image.clone(),
            engagement_level: member.engagement_level,
            plan_adherence: member.plan_adherence,
        },
        quick_stats: QuickStats {
            active_episodes: active_episodes.len(),
            unread_messages,
            recent_metrics: latest_n(&window, DASHBOARD_RECENT_METRICS, |m| m.timestamp),
            next_goals: member
                .health_goals
                .iter()
                .take(DASHBOARD_GOALS)
                .cloned()
                .collect(),
        },
        alerts: DashboardAlerts {
            low_adherence: member.plan_adherence < LOW_ADHERENCE_BELOW,
            inactive_user: is_inactive(member.last_active, now),
            urgent_episodes: active_episodes
                .iter()
                .filter(|ep| matches!(ep.priority, Priority::Urgent | Priority::High))
                .count(),
        },
        recent_activity: RecentActivity {
            last_metric: window.first().cloned(),
            active_conversations: active_conversations.len(),
            current_conditions: member.current_conditions.clone(),
            medications: member.medications.clone(),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewSummary {
    pub total_members: usize,
    pub total_health_metrics: usize,
    pub total_episodes: usize,
    pub total_conversations: usize,
    pub active_members: usize,
    pub high_risk_members: usize,
    pub member_retention_rate: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberName {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentMetric {
    #[serde(flatten)]
    pub metric: HealthMetric,
    pub member: MemberName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewAlerts {
    pub high_risk_members: usize,
    pub inactive_members: usize,
    pub urgent_episodes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsOverview {
    pub summary: OverviewSummary,
    pub recent_activity: Vec<RecentMetric>,
    pub alerts: OverviewAlerts,
}

pub fn analytics_overview(
    members: &[Member],
    metrics: &[HealthMetric],
    episodes: &[Episode],
    conversations: &[Conversation],
    now: OffsetDateTime,
) -> AnalyticsOverview {
    let active_since = now - Duration::days(INACTIVE_AFTER_DAYS);
    let total_members = members.len();
    let active_members = members
        .iter()
        .filter(|m| m.last_active >= active_since)
        .count();
    let high_risk_members = members
        .iter()
        .filter(|m| m.plan_adherence < LOW_ADHERENCE_BELOW)
        .count();

    let names: HashMap<&str, &str> = members
        .iter()
        .map(|m| (m.id.as_str(), m.name.as_str()))
        .collect();
    let recent_activity = latest_n(metrics, OVERVIEW_RECENT_ACTIVITY, |m| m.timestamp)
        .into_iter()
        .map(|metric| {
            let name = names
                .get(metric.member_id.as_str())
                .map(|name| name.to_string())
                .unwrap_or_default();
            RecentMetric {
                metric,
                member: MemberName { name },
            }
        })
        .collect();

    AnalyticsOverview {
        summary: OverviewSummary {
            total_members,
            total_health_metrics: metrics.len(),
            total_episodes: episodes.len(),
            total_conversations: conversations.len(),
            active_members,
            high_risk_members,
            member_retention_rate: retention_rate(active_members, total_members),
        },
        recent_activity,
        alerts: OverviewAlerts {
            high_risk_members,
            inactive_members: total_members - active_members,
            urgent_episodes: episodes
                .iter()
                .filter(|ep| ep.priority == Priority::Urgent && ep.status.is_active())
                .count(),
        },
    }
}

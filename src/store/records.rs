use std::collections::HashMap;

use super::conversations::{group_messages, threads};
use super::CareStore;
use crate::error::Result;
use crate::insights::MemberRecords;
use crate::models::{Conversation, Episode, HealthMetric, Member};

/// Everything the store-wide overview is computed from.
#[derive(Debug, Clone, Default)]
pub struct OverviewSnapshot {
    pub members: Vec<Member>,
    pub health_metrics: Vec<HealthMetric>,
    pub episodes: Vec<Episode>,
    pub conversations: Vec<Conversation>,
}

impl CareStore {
    /// One member with all related rows.
    pub async fn member_records(&self, member_id: &str) -> Result<MemberRecords> {
        let member = self.get_member(member_id).await?;
        let (health_metrics, episodes, conversations) = futures::try_join!(
            self.member_health_metrics(member_id, None, None),
            self.member_episodes(member_id),
            self.member_conversations(member_id),
        )?;
        Ok(MemberRecords {
            member,
            health_metrics,
            episodes,
            conversations,
        })
    }

    /// Every member with all related rows, most recently active first.
    pub async fn all_member_records(&self) -> Result<Vec<MemberRecords>> {
        let (members, metrics, episodes, conversations, messages) = futures::try_join!(
            self.list_members(None),
            self.all_health_metrics(),
            self.all_episodes(),
            self.all_conversations(),
            self.all_messages(),
        )?;

        let mut metrics_by_member = bucket(metrics, |m| m.member_id.clone());
        let mut episodes_by_member = bucket(episodes, |ep| ep.member_id.clone());
        let mut threads_by_member = bucket(
            threads(conversations, group_messages(messages)),
            |t| t.conversation.member_id.clone(),
        );

        Ok(members
            .into_iter()
            .map(|member| MemberRecords {
                health_metrics: metrics_by_member.remove(&member.id).unwrap_or_default(),
                episodes: episodes_by_member.remove(&member.id).unwrap_or_default(),
                conversations: threads_by_member.remove(&member.id).unwrap_or_default(),
                member,
            })
            .collect())
    }

    pub async fn overview_snapshot(&self) -> Result<OverviewSnapshot> {
        let (members, health_metrics, episodes, conversations) = futures::try_join!(
            self.list_members(None),
            self.all_health_metrics(),
            self.all_episodes(),
            self.all_conversations(),
        )?;
        Ok(OverviewSnapshot {
            members,
            health_metrics,
            episodes,
            conversations,
        })
    }
}

fn bucket<T>(items: Vec<T>, key: impl Fn(&T) -> String) -> HashMap<String, Vec<T>> {
    let mut grouped: HashMap<String, Vec<T>> = HashMap::new();
    for item in items {
        grouped.entry(key(&item)).or_default().push(item);
    }
    grouped
}

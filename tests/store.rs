mod common;

use care_chronicle::error::ChronicleError;
use care_chronicle::models::{
    ConversationStatus, EpisodeStatus, EpisodeUpdate, NewConversation, NewEpisode,
    NewHealthMetric, NewMember, NewMessage, NewTeamMember, TeamRole,
};
use time::macros::datetime;

use common::open_store;

fn new_member(id: &str, email: &str) -> NewMember {
    NewMember {
        id: Some(id.to_string()),
        name: format!("Member {id}"),
        email: email.to_string(),
        ..NewMember::default()
    }
}

fn new_metric(member_id: &str, metric_type: &str, day: u8) -> NewHealthMetric {
    NewHealthMetric {
        member_id: member_id.to_string(),
        metric_type: metric_type.to_string(),
        value: "1".to_string(),
        timestamp: Some(
            datetime!(2025-08-01 08:00 UTC) + time::Duration::days(i64::from(day)),
        ),
        ..NewHealthMetric::default()
    }
}

#[tokio::test]
async fn member_defaults_and_lookup() {
    let (store, _db) = open_store().await;
    let member = store
        .create_member(new_member("m1", "one@example.com"))
        .await
        .unwrap();
    assert_eq!(member.plan_adherence, 0);
    assert_eq!(member.communication_preference, "email");
    assert_eq!(member.preferred_contact_time, "morning");
    assert!(member.health_goals.is_empty());

    let err = store.get_member("missing").await.unwrap_err();
    assert!(matches!(err, ChronicleError::NotFound(_)));

    let err = store
        .create_member(new_member("m2", "one@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, ChronicleError::Constraint(_)));

    let status = store.status().await.unwrap();
    assert_eq!(status.member_count, 1);
    store.close();
}

#[tokio::test]
async fn restrict_policy_protects_children() {
    let (store, _db) = open_store().await;
    store
        .create_member(new_member("m1", "one@example.com"))
        .await
        .unwrap();
    let episode = store
        .create_episode(NewEpisode {
            member_id: "m1".to_string(),
            title: "Check-in".to_string(),
            ..NewEpisode::default()
        })
        .await
        .unwrap();

    let err = store.delete_member("m1").await.unwrap_err();
    assert!(matches!(err, ChronicleError::Constraint(_)), "{err:?}");
    assert!(store.get_member("m1").await.is_ok());
    assert_eq!(store.member_episodes("m1").await.unwrap()[0].id, episode.id);
}

#[tokio::test]
async fn episode_defaults_and_unconstrained_updates() {
    let (store, _db) = open_store().await;
    store
        .create_member(new_member("m1", "one@example.com"))
        .await
        .unwrap();
    let episode = store
        .create_episode(NewEpisode {
            member_id: "m1".to_string(),
            title: "Sleep".to_string(),
            ..NewEpisode::default()
        })
        .await
        .unwrap();
    assert_eq!(episode.status, EpisodeStatus::Open);
    assert_eq!(episode.category, "general");
    assert_eq!(episode.end_date, None);

    for status in [
        EpisodeStatus::Resolved,
        EpisodeStatus::Open,
        EpisodeStatus::InProgress,
    ] {
        let updated = store
            .update_episode(
                &episode.id,
                EpisodeUpdate {
                    status: Some(status),
                    ..EpisodeUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, status);
    }
}

#[tokio::test]
async fn conversation_listing_previews_latest_messages() {
    let (store, _db) = open_store().await;
    store
        .create_member(new_member("m1", "one@example.com"))
        .await
        .unwrap();
    let conversation = store
        .create_conversation(NewConversation {
            member_id: "m1".to_string(),
            title: Some("Medication".to_string()),
            ..NewConversation::default()
        })
        .await
        .unwrap();
    assert_eq!(conversation.status, ConversationStatus::Active);

    for minute in 0..5u8 {
        store
            .add_message(
                &conversation.id,
                NewMessage {
                    content: format!("message {minute}"),
                    timestamp: Some(
                        datetime!(2025-08-16 09:00 UTC)
                            + time::Duration::minutes(i64::from(minute)),
                    ),
                    ..NewMessage::default()
                },
            )
            .await
            .unwrap();
    }

    let threads = store.list_conversations(20, 3).await.unwrap();
    assert_eq!(threads.len(), 1);
    let contents: Vec<&str> = threads[0]
        .messages
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(contents, vec!["message 4", "message 3", "message 2"]);
    assert_eq!(threads[0].member.as_ref().unwrap().id, "m1");

    let detail = store.get_conversation(&conversation.id).await.unwrap();
    assert_eq!(detail.messages.len(), 5);
    assert_eq!(detail.messages[0].content, "message 0");
    assert!(detail.conversation.updated_at >= conversation.updated_at);

    let records = store.member_records("m1").await.unwrap();
    assert_eq!(records.conversations[0].messages.len(), 5);
}

#[tokio::test]
async fn member_records_group_rows_by_member() {
    let (store, _db) = open_store().await;
    store
        .create_member(new_member("m1", "one@example.com"))
        .await
        .unwrap();
    store
        .create_member(new_member("m2", "two@example.com"))
        .await
        .unwrap();
    for day in 0..3 {
        store
            .create_health_metric(new_metric("m1", "weight", day))
            .await
            .unwrap();
    }
    store
        .create_health_metric(new_metric("m2", "steps", 0))
        .await
        .unwrap();

    let metrics = store
        .member_health_metrics("m1", Some("weight"), Some(2))
        .await
        .unwrap();
    assert_eq!(metrics.len(), 2);
    assert!(metrics[0].timestamp > metrics[1].timestamp);

    let all = store.all_member_records().await.unwrap();
    assert_eq!(all.len(), 2);
    let first = all.iter().find(|r| r.member.id == "m1").unwrap();
    let second = all.iter().find(|r| r.member.id == "m2").unwrap();
    assert_eq!(first.health_metrics.len(), 3);
    assert_eq!(second.health_metrics.len(), 1);
    assert!(second.episodes.is_empty());

    let snapshot = store.overview_snapshot().await.unwrap();
    assert_eq!(snapshot.members.len(), 2);
    assert_eq!(snapshot.health_metrics.len(), 4);
}

#[tokio::test]
async fn team_member_round_trip() {
    let (store, _db) = open_store().await;
    let created = store
        .create_team_member(NewTeamMember {
            name: "Ruby".to_string(),
            role: TeamRole::Concierge,
            expertise: vec!["scheduling".to_string(), "logistics".to_string()],
            is_online: true,
            ..NewTeamMember::default()
        })
        .await
        .unwrap();
    let listed = store.list_team_members(20).await.unwrap();
    assert_eq!(listed, vec![created]);
}

#[tokio::test]
async fn equal_timestamps_load_in_insertion_order() {
    let (store, _db) = open_store().await;
    store
        .create_member(new_member("m1", "one@example.com"))
        .await
        .unwrap();
    for label in ["a", "b", "c"] {
        store
            .create_health_metric(NewHealthMetric {
                id: Some(label.to_string()),
                ..new_metric("m1", "weight", 0)
            })
            .await
            .unwrap();
    }
    let ids: Vec<String> = store
        .member_health_metrics("m1", None, Some(2))
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(ids, vec!["a", "b"]);

    let conversation = store
        .create_conversation(NewConversation {
            member_id: "m1".to_string(),
            ..NewConversation::default()
        })
        .await
        .unwrap();
    for content in ["one", "two", "three"] {
        store
            .add_message(
                &conversation.id,
                NewMessage {
                    content: content.to_string(),
                    timestamp: Some(datetime!(2025-08-16 09:00 UTC)),
                    ..NewMessage::default()
                },
            )
            .await
            .unwrap();
    }
    let threads = store.list_conversations(20, 2).await.unwrap();
    let contents: Vec<&str> = threads[0]
        .messages
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(contents, vec!["one", "two"]);

    let detail = store.get_conversation(&conversation.id).await.unwrap();
    let contents: Vec<&str> = detail.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["one", "two", "three"]);
}

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::test_app;

fn sarah() -> serde_json::Value {
    json!({
        "name": "Sarah Martinez",
        "email": "sarah.martinez@email.com",
        "phone": "+1-555-0123",
        "healthGoals": ["Lose 15 pounds", "Lower blood pressure", "Sleep 8 hours"],
        "currentConditions": ["Hypertension"],
        "medications": ["Lisinopril 10mg"],
        "engagementLevel": "high",
        "planAdherence": 85
    })
}

#[tokio::test]
async fn service_routes() {
    let app = test_app().await;

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = app.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["endpoints"]
        .as_array()
        .unwrap()
        .iter()
        .any(|e| e == "GET /api/analytics/overview"));

    let (status, body) = app.get("/api/test-db").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["memberCount"], 0);
    assert_eq!(body["data"]["totalTables"], 6);
}

#[tokio::test]
async fn member_lifecycle() {
    let app = test_app().await;
    let id = app.member(sarah()).await;

    let (status, body) = app.get("/api/members").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["email"], "sarah.martinez@email.com");
    assert_eq!(body["data"][0]["timeZone"], "UTC");

    let (status, body) = app
        .put(
            &format!("/api/members/{id}"),
            json!({"planAdherence": 60, "medications": []}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["planAdherence"], 60);
    assert_eq!(body["data"]["medications"], json!([]));
    assert_eq!(body["data"]["name"], "Sarah Martinez");

    let (status, body) = app.get(&format!("/api/members/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["analytics"]["healthStatus"]["riskLevel"], "medium");
    assert_eq!(body["data"]["analytics"]["healthStatus"]["daysSinceLastActive"], 0);
    assert!(body["data"]["analytics"]["healthTrends"]["lastRecordedDate"].is_null());

    let (status, body) = app.delete(&format!("/api/members/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Member deleted successfully");

    let (status, body) = app.get(&format!("/api/members/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Member not found");
}

#[tokio::test]
async fn member_input_is_validated() {
    let app = test_app().await;

    let (status, body) = app
        .post("/api/members", json!({"name": "Tom", "email": "not-an-email"}))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Failed to create member");
    assert_eq!(body["message"], "invalid email format 'not-an-email'");

    let (status, _) = app
        .post(
            "/api/members",
            json!({"name": "Tom", "email": "tom@example.com", "planAdherence": 140}),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, body) = app
        .post(
            "/api/members",
            json!({"name": "Tom", "email": "tom@example.com", "shoeSize": 44}),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["message"].as_str().unwrap().contains("shoeSize"));

    let (status, _) = app
        .post(
            "/api/members",
            json!({"name": "Tom", "email": "tom@example.com", "engagementLevel": "extreme"}),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, _) = app.put("/api/members/missing", json!({"name": "X"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_email_is_a_store_failure() {
    let app = test_app().await;
    app.member(sarah()).await;
    let (status, body) = app.post("/api/members", sarah()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to create member");
    assert!(body["message"].as_str().is_some());
}

#[tokio::test]
async fn dashboard_orders_recent_metrics() {
    let app = test_app().await;
    let id = app
        .member(json!({
            "name": "Michael Chen",
            "email": "michael.chen@email.com",
            "planAdherence": 72,
            "healthGoals": ["Walk 10k steps", "Cut sugar", "Sleep earlier"]
        }))
        .await;

    for (label, ts) in [
        ("t1", "2025-08-14T07:00:00Z"),
        ("t3", "2025-08-16T07:00:00Z"),
        ("t2", "2025-08-15T07:00:00Z"),
    ] {
        let (status, body) = app
            .post(
                "/api/health-metrics",
                json!({
                    "id": label,
                    "memberId": id,
                    "type": "weight",
                    "value": "180",
                    "unit": "lbs",
                    "timestamp": ts
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    let (status, body) = app.get(&format!("/api/members/{id}/dashboard")).await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    let recent: Vec<&str> = data["quickStats"]["recentMetrics"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap())
        .collect();
    assert_eq!(recent, vec!["t3", "t2", "t1"]);
    assert_eq!(data["alerts"]["lowAdherence"], true);
    assert_eq!(data["alerts"]["inactiveUser"], false);
    assert_eq!(data["quickStats"]["nextGoals"].as_array().unwrap().len(), 2);
    assert_eq!(data["recentActivity"]["lastMetric"]["id"], "t3");
    assert_eq!(data["member"]["planAdherence"], 72);

    let (status, _) = app.get("/api/members/nobody/dashboard").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn member_metrics_filter_and_limit() {
    let app = test_app().await;
    let id = app.member(sarah()).await;
    for (i, metric_type) in ["weight", "blood_pressure", "weight", "steps"]
        .iter()
        .enumerate()
    {
        let value = if *metric_type == "blood_pressure" {
            "128/82".to_string()
        } else {
            (100 + i).to_string()
        };
        let (status, _) = app
            .post(
                "/api/health-metrics",
                json!({
                    "memberId": id,
                    "type": metric_type,
                    "value": value,
                    "timestamp": format!("2025-08-1{}T08:00:00Z", i + 1)
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = app
        .get(&format!("/api/members/{id}/health-metrics?type=weight"))
        .await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["data"][0]["value"], "102");

    let (_, body) = app
        .get(&format!("/api/members/{id}/health-metrics?limit=1"))
        .await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["type"], "steps");

    let (status, _) = app
        .get(&format!("/api/members/{id}/health-metrics?limit=lots"))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (_, body) = app.get("/api/health-metrics").await;
    assert_eq!(body["count"], 4);
    assert_eq!(body["data"][0]["member"]["name"], "Sarah Martinez");

    let (status, _) = app.get("/api/members/nobody/health-metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn member_delete_is_restricted_while_rows_exist() {
    let app = test_app().await;
    let id = app.member(sarah()).await;
    let (_, body) = app
        .post(
            "/api/health-metrics",
            json!({"memberId": id, "type": "weight", "value": "170"}),
        )
        .await;
    let metric_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app.delete(&format!("/api/members/{id}")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to delete member");

    let (status, _) = app.get(&format!("/api/members/{id}")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.delete(&format!("/api/health-metrics/{metric_id}")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.delete(&format!("/api/health-metrics/{metric_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.delete(&format!("/api/members/{id}")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn dangling_member_reference_fails() {
    let app = test_app().await;
    let (status, body) = app
        .post(
            "/api/health-metrics",
            json!({"memberId": "ghost", "type": "weight", "value": "170"}),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn conversation_with_message() {
    let app = test_app().await;
    let id = app.member(sarah()).await;

    let (status, body) = app
        .post("/api/conversations", json!({"memberId": id, "subject": "X"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "X");
    assert_eq!(body["data"]["status"], "active");
    let conversation_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .post(
            &format!("/api/conversations/{conversation_id}/messages"),
            json!({"content": "hi"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["senderRole"], "care_coordinator");
    assert_eq!(body["data"]["isRead"], false);

    let (status, body) = app
        .get(&format!("/api/conversations/{conversation_id}"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["messages"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["messages"][0]["content"], "hi");
    assert_eq!(body["data"]["member"]["id"], id.as_str());

    let (_, body) = app
        .post(
            &format!("/api/conversations/{conversation_id}/messages"),
            json!({"content": "Thanks!", "senderRole": "member", "senderName": "Sarah"}),
        )
        .await;
    assert_eq!(body["data"]["senderRole"], "member");

    let (_, body) = app.get("/api/conversations").await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["member"]["name"], "Sarah Martinez");
    assert_eq!(body["data"][0]["messages"].as_array().unwrap().len(), 2);

    let (_, body) = app.get(&format!("/api/members/{id}/dashboard")).await;
    assert_eq!(body["data"]["quickStats"]["unreadMessages"], 1);

    let (status, body) = app
        .put(
            &format!("/api/conversations/{conversation_id}"),
            json!({"status": "archived"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "archived");
}

#[tokio::test]
async fn message_to_unknown_conversation_is_not_found() {
    let app = test_app().await;
    let (status, body) = app
        .post("/api/conversations/nope/messages", json!({"content": "hi"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Conversation not found");

    let (status, _) = app.get("/api/conversations/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post("/api/conversations/nope/messages", json!({"content": ""}))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn episode_status_moves_freely() {
    let app = test_app().await;
    let id = app.member(sarah()).await;

    let (status, body) = app
        .post(
            "/api/episodes",
            json!({
                "memberId": id,
                "title": "Blood pressure follow-up",
                "priority": "urgent",
                "status": "resolved",
                "tags": ["bp"]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let episode_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .put(&format!("/api/episodes/{episode_id}"), json!({"status": "open"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "open");
    assert_eq!(body["data"]["tags"], json!(["bp"]));

    let (_, body) = app.get("/api/episodes").await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["member"]["email"], "sarah.martinez@email.com");

    let (_, body) = app.get(&format!("/api/members/{id}/episodes")).await;
    assert_eq!(body["count"], 1);

    let (_, body) = app.get("/api/analytics/overview").await;
    assert_eq!(body["data"]["alerts"]["urgentEpisodes"], 1);

    let (status, _) = app
        .put("/api/episodes/missing", json!({"status": "open"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .put(&format!("/api/episodes/{episode_id}"), json!({"status": "closed"}))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn team_members() {
    let app = test_app().await;
    let (status, body) = app
        .post(
            "/api/team-members",
            json!({
                "name": "Dr. Warren",
                "role": "doctor",
                "title": "Medical Strategist",
                "expertise": ["cardiology"],
                "responseTime": 45
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["role"], "doctor");

    let (status, _) = app
        .post("/api/team-members", json!({"name": "X", "role": "chef"}))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (_, body) = app.get("/api/team-members").await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["expertise"], json!(["cardiology"]));
}

#[tokio::test]
async fn overview_on_empty_store() {
    let app = test_app().await;
    let (status, body) = app.get("/api/analytics/overview").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["summary"]["totalMembers"], 0);
    assert_eq!(body["data"]["summary"]["memberRetentionRate"], "0.0");
    assert_eq!(body["data"]["recentActivity"], json!([]));
}

#[tokio::test]
async fn members_full_includes_insights_and_summary() {
    let app = test_app().await;
    let sarah_id = app.member(sarah()).await;
    app.member(json!({
        "name": "Rohan Patel",
        "email": "rohan.patel@techcorp.com",
        "planAdherence": 40,
        "engagementLevel": "low"
    }))
    .await;
    app.post(
        "/api/episodes",
        json!({"memberId": sarah_id, "title": "Sleep", "status": "in_progress"}),
    )
    .await;
    app.post(
        "/api/episodes",
        json!({"memberId": sarah_id, "title": "Diet", "status": "open"}),
    )
    .await;

    let (status, body) = app.get("/api/members/full").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["summary"]["totalMembers"], 2);
    assert_eq!(body["summary"]["highEngagement"], 1);
    assert_eq!(body["summary"]["lowAdherence"], 1);
    assert_eq!(body["summary"]["activeEpisodes"], 1);

    let sarah = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["id"] == sarah_id.as_str())
        .unwrap();
    assert_eq!(sarah["insights"]["activeEpisodes"], 2);
    assert_eq!(sarah["insights"]["riskLevel"], "low");
    assert!(sarah["insights"]["lastMetricDate"].is_null());
}

#[tokio::test]
async fn malformed_json_is_rejected() {
    let app = test_app().await;
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/members")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.app.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn equal_timestamps_keep_insertion_order() {
    let app = test_app().await;
    let id = app.member(sarah()).await;
    for label in ["first", "second", "third"] {
        let (status, body) = app
            .post(
                "/api/health-metrics",
                json!({
                    "id": label,
                    "memberId": id,
                    "type": "steps",
                    "value": "9000",
                    "timestamp": "2025-08-16T07:00:00Z"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }
    let ids = |values: &serde_json::Value| -> Vec<String> {
        values
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["id"].as_str().unwrap().to_string())
            .collect()
    };
    let expected = vec!["first", "second", "third"];

    let (_, body) = app.get(&format!("/api/members/{id}/dashboard")).await;
    assert_eq!(ids(&body["data"]["quickStats"]["recentMetrics"]), expected);

    let (_, body) = app.get(&format!("/api/members/{id}/health-metrics")).await;
    assert_eq!(ids(&body["data"]), expected);

    let (_, body) = app
        .get(&format!("/api/members/{id}/health-metrics?limit=2"))
        .await;
    assert_eq!(ids(&body["data"]), vec!["first", "second"]);

    let (_, body) = app.get("/api/members/full").await;
    assert_eq!(ids(&body["data"][0]["healthMetrics"]), expected);

    for (name, email) in [("Zed", "zed@example.com"), ("Amy", "amy@example.com")] {
        app.member(json!({
            "name": name,
            "email": email,
            "lastActive": "2020-01-01T00:00:00Z"
        }))
        .await;
    }
    let (_, body) = app.get("/api/members").await;
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Sarah Martinez", "Zed", "Amy"]);
}

#[tokio::test]
async fn episode_can_be_reopened_and_unassigned() {
    let app = test_app().await;
    let id = app.member(sarah()).await;
    let (_, body) = app
        .post(
            "/api/team-members",
            json!({"name": "Ruby", "role": "concierge"}),
        )
        .await;
    let ruby = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .post(
            "/api/episodes",
            json!({"memberId": id, "title": "Sleep", "assignedTo": ruby}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let episode = format!("/api/episodes/{}", body["data"]["id"].as_str().unwrap());

    let (_, body) = app
        .put(&episode, json!({"status": "resolved", "endDate": "2025-08-20"}))
        .await;
    assert_eq!(body["data"]["endDate"], "2025-08-20T00:00:00Z");

    let (_, body) = app.put(&episode, json!({"status": "in_progress"})).await;
    assert_eq!(body["data"]["endDate"], "2025-08-20T00:00:00Z");
    assert_eq!(body["data"]["assignedTo"], ruby.as_str());

    let (status, body) = app
        .put(
            &episode,
            json!({"status": "open", "endDate": null, "assignedTo": null}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "open");
    assert!(body["data"]["endDate"].is_null());
    assert!(body["data"]["assignedTo"].is_null());

    let (_, body) = app
        .put(
            &format!("/api/members/{id}"),
            json!({"profileImage": "https://img.example.com/sarah.png"}),
        )
        .await;
    assert_eq!(body["data"]["profileImage"], "https://img.example.com/sarah.png");
    let (_, body) = app
        .put(&format!("/api/members/{id}"), json!({"profileImage": null}))
        .await;
    assert!(body["data"]["profileImage"].is_null());
    assert_eq!(body["data"]["phone"], "+1-555-0123");
}

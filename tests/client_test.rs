//! Integration tests for the Skland HTTP client using wiremock

use qiandao::skland::{AttendanceOutcome, AttendanceService, ServiceError, Session, SklandClient};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn session() -> Session {
    Session {
        cred: "test-cred".to_string(),
        sign_token: "test-sign".to_string(),
        user_id: "u1".to_string(),
    }
}

#[tokio::test]
async fn test_authorize_happy_path() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/user/oauth2/v2/grant"))
        .and(body_partial_json(serde_json::json!({ "type": 0 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": 0,
            "msg": "OK",
            "data": { "code": "oauth-code" },
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/user/auth/generate_cred_by_code"))
        .and(body_partial_json(serde_json::json!({ "code": "oauth-code", "kind": 1 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0,
            "message": "OK",
            "data": { "cred": "c", "token": "t", "userId": "u1" },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = SklandClient::with_base_urls(&server.uri(), &server.uri()).unwrap();
    let session = client.authorize("account-token").await.unwrap();

    assert_eq!(session.cred, "c");
    assert_eq!(session.sign_token, "t");
    assert_eq!(session.user_id, "u1");
}

#[tokio::test]
async fn test_authorize_grant_rejection() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/user/oauth2/v2/grant"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": 1,
            "msg": "登录凭证无效",
        })))
        .mount(&server)
        .await;

    let client = SklandClient::with_base_urls(&server.uri(), &server.uri()).unwrap();
    let err = client.authorize("bad-token").await.unwrap_err();

    assert!(matches!(err, ServiceError::Auth(_)));
    assert!(err.to_string().contains("登录凭证无效"));
}

#[tokio::test]
async fn test_list_characters_filters_and_flattens() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/game/player/binding"))
        .and(header("cred", "test-cred"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0,
            "message": "OK",
            "data": {
                "list": [
                    {
                        "appCode": "arknights",
                        "bindingList": [
                            { "uid": "1", "channelMasterId": "1", "nickName": "甲#1" },
                            { "uid": "2", "channelMasterId": "2", "nickName": "乙#2" },
                        ],
                    },
                    {
                        "appCode": "endfield",
                        "bindingList": [
                            { "uid": "9", "channelMasterId": "1", "nickName": "丙#9" },
                        ],
                    },
                ],
            },
        })))
        .mount(&server)
        .await;

    let client = SklandClient::with_base_urls(&server.uri(), &server.uri()).unwrap();
    let characters = client.list_characters(&session()).await.unwrap();

    assert_eq!(characters.len(), 2);
    assert_eq!(characters[0].uid, "1");
    assert_eq!(characters[1].uid, "2");
    assert_eq!(characters[1].channel_master_id, "2");
}

#[tokio::test]
async fn test_attendance_success_with_awards() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/game/attendance"))
        .and(body_partial_json(serde_json::json!({ "uid": "1", "gameId": "1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0,
            "message": "OK",
            "data": {
                "awards": [
                    { "resource": { "name": "合成玉" }, "count": 200 },
                ],
            },
        })))
        .mount(&server)
        .await;

    let client = SklandClient::with_base_urls(&server.uri(), &server.uri()).unwrap();
    let characters = vec![qiandao::skland::Character {
        uid: "1".to_string(),
        channel_master_id: "1".to_string(),
        nick_name: "甲#1".to_string(),
    }];

    let outcome = client
        .submit_attendance(&session(), &characters[0])
        .await
        .unwrap();

    match outcome {
        AttendanceOutcome::Success { awards } => {
            assert_eq!(awards.len(), 1);
            assert_eq!(awards[0].name, "合成玉");
            assert_eq!(awards[0].count, 200);
        }
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn test_attendance_forbidden_is_duplicate_signal() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/game/attendance"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let client = SklandClient::with_base_urls(&server.uri(), &server.uri()).unwrap();
    let character = qiandao::skland::Character {
        uid: "1".to_string(),
        channel_master_id: "1".to_string(),
        nick_name: "甲#1".to_string(),
    };

    let err = client
        .submit_attendance(&session(), &character)
        .await
        .unwrap_err();

    assert!(err.is_duplicate_signal());
}

#[tokio::test]
async fn test_attendance_rejection() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/game/attendance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 10001,
            "message": "请勿重复签到",
        })))
        .mount(&server)
        .await;

    let client = SklandClient::with_base_urls(&server.uri(), &server.uri()).unwrap();
    let character = qiandao::skland::Character {
        uid: "1".to_string(),
        channel_master_id: "1".to_string(),
        nick_name: "甲#1".to_string(),
    };

    let err = client
        .submit_attendance(&session(), &character)
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Rejected { code: 10001, .. }));
    assert!(!err.is_duplicate_signal());
}

#[tokio::test]
async fn test_attendance_empty_body_means_already_done() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/game/attendance"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = SklandClient::with_base_urls(&server.uri(), &server.uri()).unwrap();
    let character = qiandao::skland::Character {
        uid: "1".to_string(),
        channel_master_id: "1".to_string(),
        nick_name: "甲#1".to_string(),
    };

    let outcome = client
        .submit_attendance(&session(), &character)
        .await
        .unwrap();

    assert_eq!(outcome, AttendanceOutcome::AlreadyDone);
}

use commands::CommandKind;

use super::*;

#[test]
fn parses_service_field_names() {
    let body = r##"{
        "title": "Quarterly review",
        "upload_id": "u-42",
        "owner": true,
        "page": 3,
        "cmds": [
            {"timestamp": "2014-01-02T10:11:12Z", "cmd": "gotoPage", "page": 3, "coords": null},
            {"timestamp": "2014-01-02T10:11:13Z", "cmd": "drawLine", "page": 3, "coords": [1, 2, 3, 4],
             "color": "#ADFF2F", "width": 10, "canvasWidth": 800, "canvasHeight": 600}
        ]
    }"##;
    let info = SessionInfo::from_json(body).unwrap();
    assert_eq!(info.title, "Quarterly review");
    assert_eq!(info.document_id, "u-42");
    assert!(info.is_owner);
    assert_eq!(info.current_page, PageNumber::new(3).ok());
    assert_eq!(info.ended_at, None);
    let kinds: Vec<CommandKind> = info.commands.iter().map(Command::kind).collect();
    assert_eq!(kinds, vec![CommandKind::GotoPage, CommandKind::DrawStroke]);
}

#[test]
fn accepts_descriptive_aliases() {
    let body = r#"{
        "title": "t",
        "documentId": "doc",
        "isOwner": false,
        "currentPage": 2,
        "endedAt": "2014-01-02T10:11:12Z",
        "commandLog": []
    }"#;
    let info = SessionInfo::from_json(body).unwrap();
    assert_eq!(info.document_id, "doc");
    assert!(!info.is_owner);
    assert_eq!(info.current_page, PageNumber::new(2).ok());
    assert_eq!(info.ended_at.map(Timestamp::unix_timestamp), Some(1_388_657_472));
}

#[test]
fn missing_and_empty_fields_default() {
    let info = SessionInfo::from_json(r#"{"upload_id": "u", "ended": "", "page": 0, "cmds": null}"#).unwrap();
    assert_eq!(info.title, "");
    assert!(!info.is_owner);
    assert!(info.commands.is_empty());
    assert_eq!(info.ended_at, None);
    assert_eq!(info.current_page, None);
}

#[test]
fn invalid_logged_commands_are_skipped() {
    let body = r##"{"upload_id": "u", "cmds": [
        {"cmd": "drawLine", "page": 1, "coords": [1, 2, 3], "color": "#fff", "width": 1, "canvasWidth": 1, "canvasHeight": 1},
        {"cmd": "clearSlide", "page": 1}
    ]}"##;
    let info = SessionInfo::from_json(body).unwrap();
    assert_eq!(info.commands, vec![Command::clear_page(1).unwrap()]);
}

#[test]
fn malformed_ended_timestamp_is_an_error() {
    let err = SessionInfo::from_json(r#"{"upload_id": "u", "ended": "yesterday"}"#).unwrap_err();
    assert!(matches!(err, InfoError::Decode(_)));
}

#[test]
fn client_rejects_cookie_with_newline() {
    let mut config = ClientConfig::new("http://127.0.0.1:1").unwrap();
    config.session_cookie = Some("bad\nvalue".into());
    assert!(matches!(SessionInfoClient::new(config), Err(InfoError::InvalidHeader(_))));
}

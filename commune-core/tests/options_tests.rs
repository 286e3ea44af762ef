//! Integration tests for options parsing and error display.

use std::time::Duration;

use commune_core::{
    BodyEncoding, FormField, Payload, RequestError, RequestOptions, TransportError,
    TransportErrorKind,
};
use serde_json::json;

#[test]
fn test_typical_community_post() {
    let options = RequestOptions::from_json(json!({
        "uri": "https://steamcommunity.com/tradeoffer/new/send",
        "method": "POST",
        "headers": { "Referer": "https://steamcommunity.com/tradeoffer/new/" },
        "form": { "sessionid": "abc", "serverid": 1, "captcha": null },
        "json": true,
        "timeout": 15000,
        "checkTradeError": false
    }))
    .unwrap();

    assert_eq!(options.target(), Some("https://steamcommunity.com/tradeoffer/new/send"));
    assert_eq!(options.method.as_deref(), Some("POST"));
    assert_eq!(
        options.headers.get("Referer").map(String::as_str),
        Some("https://steamcommunity.com/tradeoffer/new/")
    );

    let form = options.form.unwrap();
    assert_eq!(form.get("serverid").map(String::as_str), Some("1"));
    assert!(!form.contains_key("captcha"));

    assert!(options.json);
    assert_eq!(options.timeout, Some(Duration::from_millis(15000)));
    assert_eq!(options.check_trade_error, Some(false));
    assert_eq!(options.check_http_error, None);
    assert_eq!(options.encoding, BodyEncoding::Text);
}

#[test]
fn test_upload_options() {
    let options = RequestOptions::from_json(json!({
        "url": "https://steamcommunity.com/actions/FileUploader",
        "method": "post",
        "formData": {
            "MAX_FILE_SIZE": 1024,
            "avatar": {
                "value": [137, 80, 78, 71],
                "options": { "filename": "avatar.png", "contentType": "image/png" }
            }
        }
    }))
    .unwrap();

    let fields = options.form_data.unwrap();
    assert_eq!(fields.get("MAX_FILE_SIZE"), Some(&FormField::Scalar(Payload::from("1024"))));

    let Some(FormField::Detailed { value, options }) = fields.get("avatar") else {
        panic!("expected detailed field");
    };
    assert_eq!(value, &Payload::from(vec![137u8, 80, 78, 71]));
    assert_eq!(options.filename.as_deref(), Some("avatar.png"));
    assert_eq!(options.content_type.as_deref(), Some("image/png"));
}

#[test]
fn test_error_messages() {
    assert_eq!(RequestError::NotLoggedIn.to_string(), "Not Logged In");
    assert_eq!(RequestError::FamilyViewRestricted.to_string(), "Family View Restricted");
    assert_eq!(RequestError::Http { status: 500 }.to_string(), "HTTP error 500");
    assert_eq!(RequestError::MalformedResponse.to_string(), "Malformed JSON response");
    assert_eq!(
        RequestError::Community("The item is no longer available.".into()).to_string(),
        "The item is no longer available."
    );

    let transport = TransportError::new(TransportErrorKind::Timeout, "deadline elapsed");
    let error = RequestError::from(transport);
    assert!(error.is_transport());
    assert_eq!(error.status_code(), None);
}

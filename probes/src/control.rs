use rumqttc::Publish;
use serde_json::Value;

/// A control message as the pump understood it.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Json(Value),
    Raw(String),
}

pub fn decode(payload: &[u8]) -> Command {
    match serde_json::from_slice::<Value>(payload) {
        Ok(value) => Command::Json(value),
        Err(_) => Command::Raw(String::from_utf8_lossy(payload).into_owned()),
    }
}

/// Human-readable block printed for every command.
pub fn describe(publish: &Publish) -> String {
    let body = match decode(&publish.payload) {
        Command::Json(value) => {
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
        }
        Command::Raw(text) => format!("(not JSON) {}", text),
    };

    format!(
        ">>>> PUMP RECEIVED COMMAND <<<<\nFrom topic: {}\nPayload: {}\n================================",
        publish.topic, body
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumqttc::QoS;

    #[test]
    fn test_decode_json_command() {
        let cmd = decode(br#"{"action": "ON", "duration": 30}"#);
        match cmd {
            Command::Json(v) => {
                assert_eq!(v["action"], "ON");
                assert_eq!(v["duration"], 30);
            }
            other => panic!("expected JSON, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_raw_command() {
        assert_eq!(decode(b"ON"), Command::Raw("ON".to_string()));
    }

    #[test]
    fn test_describe() {
        let publish = Publish::new(
            "device/PUMP-001/control",
            QoS::AtLeastOnce,
            r#"{"action":"OFF"}"#,
        );

        let text = describe(&publish);
        assert!(text.contains("From topic: device/PUMP-001/control"));
        assert!(text.contains("\"action\": \"OFF\""));
    }
}

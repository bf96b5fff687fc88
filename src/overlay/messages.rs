use crate::overlay::model::{Area, AreaId, AreaType};
use crate::settings::Settings;
use serde::{Deserialize, Serialize};

/// Requests the control surface sends to a page's engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    Ping,
    UpdateSettings {
        settings: Settings,
    },
    ToggleSelectionMode {
        #[serde(rename = "areaType", default)]
        area_type: AreaType,
    },
    ResetArea,
    GetAreas,
    DeleteArea {
        #[serde(rename = "areaId")]
        area_id: AreaId,
    },
    EditArea {
        #[serde(rename = "areaId")]
        area_id: AreaId,
    },
    ToggleAreaType {
        #[serde(rename = "areaId")]
        area_id: AreaId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Status {
        status: Status,
        #[serde(rename = "pageKey")]
        page_key: String,
    },
    Areas {
        areas: Vec<Area>,
        #[serde(rename = "pageKey")]
        page_key: String,
    },
}

impl Response {
    pub fn page_key(&self) -> &str {
        match self {
            Self::Status { page_key, .. } | Self::Areas { page_key, .. } => page_key,
        }
    }

    pub fn areas(&self) -> Option<&[Area]> {
        match self {
            Self::Areas { areas, .. } => Some(areas),
            Self::Status { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requests_decode_from_action_tag() {
        let request: Request =
            serde_json::from_value(json!({"action": "deleteArea", "areaId": 3})).expect("decode");
        assert_eq!(request, Request::DeleteArea { area_id: 3 });

        let request: Request = serde_json::from_value(json!({
            "action": "updateSettings",
            "settings": {"monochrome": false, "hideEngagement": true}
        }))
        .expect("decode");
        assert_eq!(
            request,
            Request::UpdateSettings {
                settings: Settings {
                    monochrome: false,
                    hide_engagement: true
                }
            }
        );
    }

    #[test]
    fn selection_mode_defaults_to_floating() {
        let request: Request =
            serde_json::from_value(json!({"action": "toggleSelectionMode"})).expect("decode");
        assert_eq!(
            request,
            Request::ToggleSelectionMode {
                area_type: AreaType::Floating
            }
        );
    }

    #[test]
    fn unknown_action_is_rejected() {
        let result: Result<Request, _> = serde_json::from_value(json!({"action": "explode"}));
        assert!(result.is_err());
    }

    #[test]
    fn responses_encode_page_key_in_camel_case() {
        let ping = Response::Status {
            status: Status::Ok,
            page_key: "example.com/".into(),
        };
        assert_eq!(
            serde_json::to_value(&ping).expect("encode"),
            json!({"status": "ok", "pageKey": "example.com/"})
        );

        let areas = Response::Areas {
            areas: Vec::new(),
            page_key: "example.com/".into(),
        };
        assert_eq!(
            serde_json::to_value(&areas).expect("encode"),
            json!({"areas": [], "pageKey": "example.com/"})
        );
    }
}

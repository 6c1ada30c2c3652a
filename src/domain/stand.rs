use super::user::StandId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct StandSettings {
    pub stand_id: StandId,
    pub store_name: String,
    #[serde(default)]
    pub qris: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// The payment reference a buyer scans to pay a stand.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct QrisCode {
    pub stand_id: StandId,
    pub qris_code: String,
    pub store_name: String,
}

impl StandSettings {
    /// Returns the stand's QRIS code, if one is configured.
    pub fn qris_code(&self) -> Option<QrisCode> {
        self.qris
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(|code| QrisCode {
                stand_id: self.stand_id,
                qris_code: code.to_string(),
                store_name: self.store_name.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_qris_is_not_configured() {
        let mut settings = StandSettings {
            stand_id: 10,
            store_name: "Warung Bu Ani".to_string(),
            qris: Some("  ".to_string()),
            is_active: true,
        };
        assert!(settings.qris_code().is_none());

        settings.qris = Some("00020101021126".to_string());
        let code = settings.qris_code().unwrap();
        assert_eq!(code.stand_id, 10);
        assert_eq!(code.store_name, "Warung Bu Ani");
    }
}

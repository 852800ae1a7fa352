use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModulePriority {
    Low,
    #[default]
    Neutral,
    High,
}

impl ModulePriority {
    pub fn as_str(self) -> &'static str {
        match self {
            ModulePriority::Low => "LOW",
            ModulePriority::Neutral => "NEUTRAL",
            ModulePriority::High => "HIGH",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "LOW" => Some(ModulePriority::Low),
            "NEUTRAL" => Some(ModulePriority::Neutral),
            "HIGH" => Some(ModulePriority::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModuleRecord {
    pub id: String,
    pub account_id: String,
    pub title: String,
    pub description: Option<String>,
    pub priority: ModulePriority,
    pub color: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModuleCreateInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<ModulePriority>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModuleUpdateInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub priority: Option<ModulePriority>,
    #[serde(default)]
    pub color: Option<String>,
}

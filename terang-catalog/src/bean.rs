// Coffee beans on offer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use terang_backend::Direction;

use crate::forms::FormCheck;
use crate::{Entity, Validate, ValidationErrors};

pub const BEAN_ALERT: &str = "Nama, origin, notes wajib.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoastLevel {
    Light,
    #[serde(rename = "Light-Medium")]
    LightMedium,
    Medium,
    #[serde(rename = "Medium-Dark")]
    MediumDark,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bean {
    pub id: String,
    pub name: String,
    pub origin: String,
    #[serde(default)]
    pub process: Option<String>,
    #[serde(default)]
    pub roast: Option<RoastLevel>,
    pub notes: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BeanInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roast: Option<RoastLevel>,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BeanPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roast: Option<RoastLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl Entity for Bean {
    type Input = BeanInput;
    type Patch = BeanPatch;

    const TABLE: &'static str = "beans";
    const SINGULAR: &'static str = "bean";
    const PLURAL: &'static str = "beans";
    const VISIBILITY_COLUMN: &'static str = "is_active";
    const ORDER_BY: &'static str = "created_at";
    const ORDER_DIRECTION: Direction = Direction::Desc;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Validate for BeanInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        FormCheck::new(BEAN_ALERT)
            .required("name", &self.name)
            .required("origin", &self.origin)
            .required("notes", &self.notes)
            .finish()
    }
}

impl Validate for BeanPatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        FormCheck::new(BEAN_ALERT)
            .required_if_set("name", self.name.as_deref())
            .required_if_set("origin", self.origin.as_deref())
            .required_if_set("notes", self.notes.as_deref())
            .finish()
    }
}

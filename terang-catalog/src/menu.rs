// Coffee bar menu

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use terang_backend::Direction;

use crate::forms::FormCheck;
use crate::{Entity, Validate, ValidationErrors};

pub const MENU_ALERT: &str = "Nama & harga wajib.";

/// Section of the menu an item belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MenuGroup {
    #[default]
    Signature,
    Espresso,
    Manual,
    NonCoffee,
}

impl MenuGroup {
    /// Display order.
    pub const ALL: [MenuGroup; 4] = [
        MenuGroup::Signature,
        MenuGroup::Espresso,
        MenuGroup::Manual,
        MenuGroup::NonCoffee,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            MenuGroup::Signature => "Signature",
            MenuGroup::Espresso => "Espresso Based",
            MenuGroup::Manual => "Manual Brew",
            MenuGroup::NonCoffee => "Non-Coffee",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    pub group: MenuGroup,
    pub price: f64,
    #[serde(default)]
    pub badge: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_available: bool,
    #[serde(default)]
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuItemInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub group: MenuGroup,
    #[serde(default)]
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_available: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<MenuGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_available: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i32>,
}

impl Entity for MenuItem {
    type Input = MenuItemInput;
    type Patch = MenuItemPatch;

    const TABLE: &'static str = "menu_items";
    const SINGULAR: &'static str = "menu item";
    const PLURAL: &'static str = "menu items";
    const VISIBILITY_COLUMN: &'static str = "is_available";
    const ORDER_BY: &'static str = "sort_order";
    const ORDER_DIRECTION: Direction = Direction::Asc;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Validate for MenuItemInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        FormCheck::new(MENU_ALERT)
            .required("name", &self.name)
            .positive("price", self.price)
            .finish()
    }
}

impl Validate for MenuItemPatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        FormCheck::new(MENU_ALERT)
            .required_if_set("name", self.name.as_deref())
            .positive_if_set("price", self.price)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuSection {
    pub group: MenuGroup,
    pub title: &'static str,
    pub items: Vec<MenuItem>,
}

/// Group items into sections in menu order. Empty sections are left out.
pub fn menu_sections(items: &[MenuItem]) -> Vec<MenuSection> {
    MenuGroup::ALL
        .iter()
        .filter_map(|group| {
            let mut section: Vec<MenuItem> =
                items.iter().filter(|i| i.group == *group).cloned().collect();
            if section.is_empty() {
                return None;
            }
            section.sort_by_key(|i| i.sort_order);
            Some(MenuSection {
                group: *group,
                title: group.title(),
                items: section,
            })
        })
        .collect()
}

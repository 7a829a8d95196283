// Admin dashboard summary

use serde::Serialize;
use terang_backend::Database;

use crate::{Bean, Book, Event, MenuItem, Result, Visibility, count};

/// Row counts per dashboard tab, including hidden rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardCounts {
    pub books: usize,
    pub events: usize,
    pub menu: usize,
    pub beans: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardTab {
    pub key: &'static str,
    pub label: &'static str,
    pub count: usize,
}

impl DashboardCounts {
    pub async fn load(db: &dyn Database) -> Result<Self> {
        let (books, events, menu, beans) = tokio::try_join!(
            count::<Book>(db, Visibility::Admin),
            count::<Event>(db, Visibility::Admin),
            count::<MenuItem>(db, Visibility::Admin),
            count::<Bean>(db, Visibility::Admin),
        )?;
        Ok(Self {
            books,
            events,
            menu,
            beans,
        })
    }

    /// Tabs in dashboard order.
    pub fn tabs(&self) -> Vec<DashboardTab> {
        vec![
            DashboardTab {
                key: "books",
                label: "Books",
                count: self.books,
            },
            DashboardTab {
                key: "events",
                label: "Events",
                count: self.events,
            },
            DashboardTab {
                key: "menu",
                label: "Coffee Menu",
                count: self.menu,
            },
            DashboardTab {
                key: "beans",
                label: "Beans",
                count: self.beans,
            },
        ]
    }
}

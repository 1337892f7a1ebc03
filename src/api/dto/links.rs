//! DTOs for link endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::application::services::link_service::{LinkPage, LinkStats};
use crate::domain::entities::Link;

/// Request body for creating a link.
///
/// `expiry_hours` is honoured only for anonymous links.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLinkBody {
    #[validate(url(message = "Invalid URL format"))]
    pub long_url: String,

    #[validate(length(min = 6, max = 20))]
    pub short_code: Option<String>,

    pub expiry_hours: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub id: Uuid,
    pub long_url: String,
    pub short_code: String,
    pub short_url: String,
    pub clicks: i64,
    pub is_anonymous: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LinkResponse {
    pub fn from_link(link: Link, short_url: String) -> Self {
        Self {
            id: link.id,
            long_url: link.long_url,
            short_code: link.short_code,
            short_url,
            clicks: link.clicks,
            is_anonymous: link.is_anonymous,
            expires_at: link.expires_at,
            created_at: link.created_at,
            updated_at: link.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
pub struct LinkListResponse {
    pub items: Vec<LinkResponse>,
    pub meta: PaginationMeta,
}

impl LinkListResponse {
    pub fn from_page(page: LinkPage, short_url: impl Fn(&str) -> String) -> Self {
        let meta = PaginationMeta {
            page: page.page,
            per_page: page.per_page,
            total: page.total,
            total_pages: page.total_pages(),
        };
        let items = page
            .links
            .into_iter()
            .map(|link| {
                let url = short_url(&link.short_code);
                LinkResponse::from_link(link, url)
            })
            .collect();
        Self { items, meta }
    }
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_clicks: i64,
    pub last_accessed_at: DateTime<Utc>,
}

impl From<LinkStats> for StatsResponse {
    fn from(stats: LinkStats) -> Self {
        Self {
            total_clicks: stats.total_clicks,
            last_accessed_at: stats.last_accessed_at,
        }
    }
}

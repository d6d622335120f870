//! Typed list queries shared by both store backends.
//!
//! Each query knows how to test a single record (`matches`, used by the in-memory
//! backend) and how to compile itself into a filter document (`filter_data`, used by
//! the Postgres backend through `Repository`). Both paths must agree; the tests at the
//! bottom of this file pin the SQL shape for the common cases.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::database::models::{
    Contract, ContractStatus, Lead, LeadStatus, Listing, ListingStatus, Owner, OwnerStatus, RoomType, Tenant,
    TenantStatus,
};
use crate::filter::FilterData;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContractOrder {
    /// `created_at` descending
    #[default]
    Newest,
    /// `end_date` ascending
    EndingFirst,
}

#[derive(Debug, Clone, Default)]
pub struct ContractQuery {
    pub owner_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
    pub listing_id: Option<Uuid>,
    pub statuses: Vec<ContractStatus>,
    pub exclude_id: Option<Uuid>,
    pub end_from: Option<DateTime<Utc>>,
    pub end_to: Option<DateTime<Utc>>,
    pub order: ContractOrder,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

impl ContractQuery {
    pub fn for_listing(listing_id: Uuid) -> Self {
        Self {
            listing_id: Some(listing_id),
            ..Default::default()
        }
    }

    pub fn for_tenant(tenant_id: Uuid) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            ..Default::default()
        }
    }

    pub fn for_owner(owner_id: Uuid) -> Self {
        Self {
            owner_id: Some(owner_id),
            ..Default::default()
        }
    }

    pub fn with_statuses(mut self, statuses: &[ContractStatus]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    pub fn excluding(mut self, id: Uuid) -> Self {
        self.exclude_id = Some(id);
        self
    }

    pub fn matches(&self, c: &Contract) -> bool {
        self.owner_id.map_or(true, |id| c.owner_id == id)
            && self.tenant_id.map_or(true, |id| c.tenant_id == Some(id))
            && self.listing_id.map_or(true, |id| c.listing_id == id)
            && (self.statuses.is_empty() || self.statuses.contains(&c.status))
            && self.exclude_id.map_or(true, |id| c.id != id)
            && self.end_from.map_or(true, |from| c.end_date >= from)
            && self.end_to.map_or(true, |to| c.end_date <= to)
    }

    pub fn filter_data(&self) -> FilterData {
        let mut w = Map::new();
        put_eq(&mut w, "owner_id", self.owner_id);
        put_eq(&mut w, "tenant_id", self.tenant_id);
        put_eq(&mut w, "listing_id", self.listing_id);
        put_in(&mut w, "status", &self.statuses);
        if let Some(id) = self.exclude_id {
            w.insert("id".into(), json!({ "$ne": id }));
        }
        put_range(&mut w, "end_date", self.end_from.map(|d| json!(d)), self.end_to.map(|d| json!(d)));

        let order = match self.order {
            ContractOrder::Newest => "created_at desc",
            ContractOrder::EndingFirst => "end_date asc",
        };
        FilterData::with_where(Value::Object(w))
            .order_by(order)
            .page(self.limit, self.offset)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TenantQuery {
    pub ids: Option<Vec<Uuid>>,
    pub owner_id: Option<Uuid>,
    pub status: Option<TenantStatus>,
    /// Case-insensitive substring over name, email and phone
    pub search: Option<String>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

impl TenantQuery {
    pub fn matches(&self, t: &Tenant) -> bool {
        self.ids.as_ref().map_or(true, |ids| ids.contains(&t.id))
            && self.owner_id.map_or(true, |id| t.owner_id == id)
            && self.status.map_or(true, |s| t.status == s)
            && self.search.as_deref().map_or(true, |term| {
                contains_ci(&t.name, term) || contains_ci(&t.email, term) || t.phone.as_deref().map_or(false, |p| contains_ci(p, term))
            })
    }

    pub fn filter_data(&self) -> FilterData {
        let mut w = Map::new();
        if let Some(ids) = &self.ids {
            w.insert("id".into(), json!({ "$in": ids }));
        }
        put_eq(&mut w, "owner_id", self.owner_id);
        put_eq(&mut w, "status", self.status.map(|s| s.as_str()));
        if let Some(term) = self.search.as_deref() {
            let pattern = like_pattern(term);
            w.insert(
                "$or".into(),
                json!([
                    { "name": { "$ilike": pattern } },
                    { "email": { "$ilike": pattern } },
                    { "phone": { "$ilike": pattern } },
                ]),
            );
        }
        FilterData::with_where(Value::Object(w))
            .order_by("created_at desc")
            .page(self.limit, self.offset)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListingQuery {
    pub ids: Option<Vec<Uuid>>,
    pub owner_id: Option<Uuid>,
    pub statuses: Vec<ListingStatus>,
    pub slug: Option<String>,
    /// Case-insensitive substring
    pub suburb: Option<String>,
    pub room_type: Option<RoomType>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

impl ListingQuery {
    pub fn matches(&self, l: &Listing) -> bool {
        self.ids.as_ref().map_or(true, |ids| ids.contains(&l.id))
            && self.owner_id.map_or(true, |id| l.owner_id == id)
            && (self.statuses.is_empty() || self.statuses.contains(&l.status))
            && self.slug.as_deref().map_or(true, |s| l.slug == s)
            && self.suburb.as_deref().map_or(true, |s| l.suburb.as_deref().map_or(false, |ls| contains_ci(ls, s)))
            && self.room_type.map_or(true, |rt| l.room_type == Some(rt))
            && self.min_price.map_or(true, |min| l.price_per_week.map_or(false, |p| p >= min))
            && self.max_price.map_or(true, |max| l.price_per_week.map_or(false, |p| p <= max))
    }

    pub fn filter_data(&self) -> FilterData {
        let mut w = Map::new();
        if let Some(ids) = &self.ids {
            w.insert("id".into(), json!({ "$in": ids }));
        }
        put_eq(&mut w, "owner_id", self.owner_id);
        put_in(&mut w, "status", &self.statuses);
        put_eq(&mut w, "slug", self.slug.as_deref());
        if let Some(suburb) = self.suburb.as_deref() {
            w.insert("suburb".into(), json!({ "$ilike": like_pattern(suburb) }));
        }
        put_eq(&mut w, "room_type", self.room_type.map(|r| r.as_str()));
        put_range(
            &mut w,
            "price_per_week",
            self.min_price.map(decimal_value),
            self.max_price.map(decimal_value),
        );
        FilterData::with_where(Value::Object(w))
            .order_by("created_at desc")
            .page(self.limit, self.offset)
    }
}

#[derive(Debug, Clone, Default)]
pub struct OwnerQuery {
    pub status: Option<OwnerStatus>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

impl OwnerQuery {
    pub fn matches(&self, o: &Owner) -> bool {
        self.status.map_or(true, |s| o.status == s)
    }

    pub fn filter_data(&self) -> FilterData {
        let mut w = Map::new();
        put_eq(&mut w, "status", self.status.map(|s| s.as_str()));
        FilterData::with_where(Value::Object(w))
            .order_by("created_at desc")
            .page(self.limit, self.offset)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LeadQuery {
    pub status: Option<LeadStatus>,
    pub listing_id: Option<Uuid>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

impl LeadQuery {
    pub fn matches(&self, l: &Lead) -> bool {
        self.status.map_or(true, |s| l.status == s) && self.listing_id.map_or(true, |id| l.listing_id == Some(id))
    }

    pub fn filter_data(&self) -> FilterData {
        let mut w = Map::new();
        put_eq(&mut w, "status", self.status.map(|s| s.as_str()));
        put_eq(&mut w, "listing_id", self.listing_id);
        FilterData::with_where(Value::Object(w))
            .order_by("created_at desc")
            .page(self.limit, self.offset)
    }
}

fn put_eq<V: serde::Serialize>(w: &mut Map<String, Value>, column: &str, value: Option<V>) {
    if let Some(v) = value {
        w.insert(column.to_string(), json!(v));
    }
}

fn put_in<V: std::fmt::Display>(w: &mut Map<String, Value>, column: &str, values: &[V]) {
    if !values.is_empty() {
        let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        w.insert(column.to_string(), json!({ "$in": values }));
    }
}

fn put_range(w: &mut Map<String, Value>, column: &str, from: Option<Value>, to: Option<Value>) {
    let mut ops = Map::new();
    if let Some(from) = from {
        ops.insert("$gte".into(), from);
    }
    if let Some(to) = to {
        ops.insert("$lte".into(), to);
    }
    if !ops.is_empty() {
        w.insert(column.to_string(), Value::Object(ops));
    }
}

fn decimal_value(d: Decimal) -> Value {
    serde_json::to_value(d).unwrap_or(Value::Null)
}

/// `%term%` with LIKE wildcards in the term escaped
fn like_pattern(term: &str) -> String {
    let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{}%", escaped)
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

//! Postgres-backed implementation of the rental store.
//!
//! # Schema
//! One table per collection (`contracts`, `tenants`, `listings`, `owners`, `leads`,
//! `users`), created by `migrations/0001_init.sql`. Enum-valued fields are stored as
//! `TEXT` and parsed back into the domain enums on read; embedded sub-documents
//! (contract documents and terms, tenant emergency contact and documents, listing
//! location) are `JSONB`. Reference columns (`listing_id`, `tenant_id`, `owner_id`,
//! `current_contract_id`) carry no foreign-key constraints: the contract coordinator
//! owns their consistency.
//!
//! # Reads and writes
//! - List, count and get go through `Repository<Db*>`, which compiles the typed
//!   queries in `store::query` into parameterised SQL via the filter DSL.
//! - Inserts and updates are explicit statements that write every column. Each
//!   statement is its own implicit transaction; nothing here spans records.
//!
//! # Error mapping
//! - Unique violations (`23505`) on `listings.slug`, `owners.email` and
//!   `users.email` map to `StoreError::Conflict`.
//! - An `UPDATE`/`DELETE` that affects no row maps to `StoreError::NotFound`.
//! - Unparseable enum text in a row is `StoreError::Unexpected`.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::{types::Json, FromRow, PgPool};
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

use super::query::{ContractQuery, LeadQuery, ListingQuery, OwnerQuery, TenantQuery};
use super::{RentalStore, StoreError, StoreResult};
use crate::config::DatabaseConfig;
use crate::database::models::{
    Contract, ContractDocument, ContractTerms, EmergencyContact, GeoPoint, Lead, Listing, Owner, ParseEnumError,
    Tenant, TenantDocuments, User,
};
use crate::database::{DatabaseManager, Repository};
use crate::filter::FilterData;

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens the pool and applies migrations when configured to.
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = DatabaseManager::connect(config).await?;
        if config.run_migrations {
            DatabaseManager::migrate(&pool).await?;
        }
        info!("Postgres store ready");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn repo<T>(&self, table: &str) -> Repository<T>
    where
        T: for<'r> FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
    {
        Repository::new(table, self.pool.clone())
    }
}

#[derive(Debug, Clone, FromRow)]
struct DbContract {
    id: Uuid,
    listing_id: Uuid,
    tenant_id: Option<Uuid>,
    owner_id: Uuid,
    signed_date: Option<DateTime<Utc>>,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    notice_period_days: i32,
    weekly_rent: Decimal,
    bond_amount: Decimal,
    bond_paid: bool,
    payment_frequency: String,
    bills_included: bool,
    status: String,
    termination_reason: Option<String>,
    termination_date: Option<DateTime<Utc>>,
    documents: Json<Vec<ContractDocument>>,
    terms: Json<ContractTerms>,
    created_by: Option<Uuid>,
    updated_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct DbTenant {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    emergency_contact: Json<EmergencyContact>,
    owner_id: Uuid,
    current_contract_id: Option<Uuid>,
    status: String,
    documents: Json<TenantDocuments>,
    notes: Option<String>,
    converted_from_lead_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct DbListing {
    id: Uuid,
    title: String,
    slug: String,
    address: String,
    suburb: Option<String>,
    location: Option<Json<GeoPoint>>,
    room_type: Option<String>,
    price_per_week: Option<Decimal>,
    bond: Option<Decimal>,
    bills_included: bool,
    available_from: Option<DateTime<Utc>>,
    min_term_weeks: i32,
    preferred_tenants: Vec<String>,
    house_features: Vec<String>,
    rules: Vec<String>,
    images: Vec<String>,
    owner_id: Uuid,
    status: String,
    tenant_id: Option<Uuid>,
    locale: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct DbOwner {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    company: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct DbLead {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    message: Option<String>,
    listing_id: Option<Uuid>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct DbUser {
    id: Uuid,
    email: String,
    password_hash: String,
    name: String,
    role: String,
    is_active: bool,
    last_login: Option<DateTime<Utc>>,
    owner_id: Option<Uuid>,
    tenant_id: Option<Uuid>,
    avatar: Option<String>,
    phone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_enum<T: FromStr<Err = ParseEnumError>>(value: &str) -> StoreResult<T> {
    value.parse::<T>().map_err(|e| StoreError::Unexpected(e.into()))
}

fn contract_from_db(row: DbContract) -> StoreResult<Contract> {
    Ok(Contract {
        id: row.id,
        listing_id: row.listing_id,
        tenant_id: row.tenant_id,
        owner_id: row.owner_id,
        signed_date: row.signed_date,
        start_date: row.start_date,
        end_date: row.end_date,
        notice_period_days: row.notice_period_days,
        weekly_rent: row.weekly_rent,
        bond_amount: row.bond_amount,
        bond_paid: row.bond_paid,
        payment_frequency: parse_enum(&row.payment_frequency)?,
        bills_included: row.bills_included,
        status: parse_enum(&row.status)?,
        termination_reason: row.termination_reason,
        termination_date: row.termination_date,
        documents: row.documents.0,
        terms: row.terms.0,
        created_by: row.created_by,
        updated_by: row.updated_by,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn tenant_from_db(row: DbTenant) -> StoreResult<Tenant> {
    Ok(Tenant {
        id: row.id,
        name: row.name,
        email: row.email,
        phone: row.phone,
        emergency_contact: row.emergency_contact.0,
        owner_id: row.owner_id,
        current_contract_id: row.current_contract_id,
        status: parse_enum(&row.status)?,
        documents: row.documents.0,
        notes: row.notes,
        converted_from_lead_id: row.converted_from_lead_id,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn listing_from_db(row: DbListing) -> StoreResult<Listing> {
    Ok(Listing {
        id: row.id,
        title: row.title,
        slug: row.slug,
        address: row.address,
        suburb: row.suburb,
        location: row.location.map(|l| l.0),
        room_type: row.room_type.as_deref().map(parse_enum).transpose()?,
        price_per_week: row.price_per_week,
        bond: row.bond,
        bills_included: row.bills_included,
        available_from: row.available_from,
        min_term_weeks: row.min_term_weeks,
        preferred_tenants: row.preferred_tenants,
        house_features: row.house_features,
        rules: row.rules,
        images: row.images,
        owner_id: row.owner_id,
        status: parse_enum(&row.status)?,
        tenant_id: row.tenant_id,
        locale: parse_enum(&row.locale)?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn owner_from_db(row: DbOwner) -> StoreResult<Owner> {
    Ok(Owner {
        id: row.id,
        name: row.name,
        email: row.email,
        phone: row.phone,
        company: row.company,
        status: parse_enum(&row.status)?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn lead_from_db(row: DbLead) -> StoreResult<Lead> {
    Ok(Lead {
        id: row.id,
        name: row.name,
        email: row.email,
        phone: row.phone,
        message: row.message,
        listing_id: row.listing_id,
        status: parse_enum(&row.status)?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn user_from_db(row: DbUser) -> StoreResult<User> {
    Ok(User {
        id: row.id,
        email: row.email,
        password_hash: row.password_hash,
        name: row.name,
        role: parse_enum(&row.role)?,
        is_active: row.is_active,
        last_login: row.last_login,
        owner_id: row.owner_id,
        tenant_id: row.tenant_id,
        avatar: row.avatar,
        phone: row.phone,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().map(|code| code == "23505").unwrap_or(false);
    }
    false
}

fn write_error(err: sqlx::Error, what: impl FnOnce() -> String) -> StoreError {
    if is_unique_violation(&err) {
        StoreError::Conflict(what())
    } else {
        err.into()
    }
}

fn expect_row(rows_affected: u64, kind: &str, id: Uuid) -> StoreResult<()> {
    if rows_affected == 0 {
        return Err(StoreError::NotFound(format!("{} {}", kind, id)));
    }
    Ok(())
}

fn collect<R, T>(rows: Vec<R>, convert: fn(R) -> StoreResult<T>) -> StoreResult<Vec<T>> {
    rows.into_iter().map(convert).collect()
}

#[async_trait]
impl RentalStore for PostgresStore {
    async fn get_contract(&self, id: Uuid) -> StoreResult<Option<Contract>> {
        let row = self.repo::<DbContract>("contracts").select_id(id).await?;
        row.map(contract_from_db).transpose()
    }

    async fn list_contracts(&self, query: &ContractQuery) -> StoreResult<Vec<Contract>> {
        let rows = self.repo::<DbContract>("contracts").select_any(query.filter_data()).await?;
        collect(rows, contract_from_db)
    }

    async fn count_contracts(&self, query: &ContractQuery) -> StoreResult<i64> {
        Ok(self.repo::<DbContract>("contracts").count(query.filter_data()).await?)
    }

    async fn insert_contract(&self, c: Contract) -> StoreResult<Contract> {
        sqlx::query(
            r#"INSERT INTO contracts (
                id, listing_id, tenant_id, owner_id, signed_date, start_date, end_date,
                notice_period_days, weekly_rent, bond_amount, bond_paid, payment_frequency,
                bills_included, status, termination_reason, termination_date, documents, terms,
                created_by, updated_by, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)"#,
        )
        .bind(c.id)
        .bind(c.listing_id)
        .bind(c.tenant_id)
        .bind(c.owner_id)
        .bind(c.signed_date)
        .bind(c.start_date)
        .bind(c.end_date)
        .bind(c.notice_period_days)
        .bind(c.weekly_rent)
        .bind(c.bond_amount)
        .bind(c.bond_paid)
        .bind(c.payment_frequency.as_str())
        .bind(c.bills_included)
        .bind(c.status.as_str())
        .bind(&c.termination_reason)
        .bind(c.termination_date)
        .bind(Json(c.documents.clone()))
        .bind(Json(c.terms.clone()))
        .bind(c.created_by)
        .bind(c.updated_by)
        .bind(c.created_at)
        .bind(c.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, || format!("contract {} already exists", c.id)))?;
        Ok(c)
    }

    async fn update_contract(&self, c: Contract) -> StoreResult<Contract> {
        let result = sqlx::query(
            r#"UPDATE contracts SET
                listing_id = $2, tenant_id = $3, owner_id = $4, signed_date = $5, start_date = $6,
                end_date = $7, notice_period_days = $8, weekly_rent = $9, bond_amount = $10,
                bond_paid = $11, payment_frequency = $12, bills_included = $13, status = $14,
                termination_reason = $15, termination_date = $16, documents = $17, terms = $18,
                updated_by = $19, updated_at = $20
            WHERE id = $1"#,
        )
        .bind(c.id)
        .bind(c.listing_id)
        .bind(c.tenant_id)
        .bind(c.owner_id)
        .bind(c.signed_date)
        .bind(c.start_date)
        .bind(c.end_date)
        .bind(c.notice_period_days)
        .bind(c.weekly_rent)
        .bind(c.bond_amount)
        .bind(c.bond_paid)
        .bind(c.payment_frequency.as_str())
        .bind(c.bills_included)
        .bind(c.status.as_str())
        .bind(&c.termination_reason)
        .bind(c.termination_date)
        .bind(Json(c.documents.clone()))
        .bind(Json(c.terms.clone()))
        .bind(c.updated_by)
        .bind(c.updated_at)
        .execute(&self.pool)
        .await?;
        expect_row(result.rows_affected(), "contract", c.id)?;
        Ok(c)
    }

    async fn delete_contract(&self, id: Uuid) -> StoreResult<()> {
        let removed = self.repo::<DbContract>("contracts").delete_id(id).await?;
        expect_row(removed as u64, "contract", id)
    }

    async fn get_tenant(&self, id: Uuid) -> StoreResult<Option<Tenant>> {
        let row = self.repo::<DbTenant>("tenants").select_id(id).await?;
        row.map(tenant_from_db).transpose()
    }

    async fn list_tenants(&self, query: &TenantQuery) -> StoreResult<Vec<Tenant>> {
        let rows = self.repo::<DbTenant>("tenants").select_any(query.filter_data()).await?;
        collect(rows, tenant_from_db)
    }

    async fn count_tenants(&self, query: &TenantQuery) -> StoreResult<i64> {
        Ok(self.repo::<DbTenant>("tenants").count(query.filter_data()).await?)
    }

    async fn insert_tenant(&self, t: Tenant) -> StoreResult<Tenant> {
        sqlx::query(
            r#"INSERT INTO tenants (
                id, name, email, phone, emergency_contact, owner_id, current_contract_id, status,
                documents, notes, converted_from_lead_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"#,
        )
        .bind(t.id)
        .bind(&t.name)
        .bind(&t.email)
        .bind(&t.phone)
        .bind(Json(t.emergency_contact.clone()))
        .bind(t.owner_id)
        .bind(t.current_contract_id)
        .bind(t.status.as_str())
        .bind(Json(t.documents.clone()))
        .bind(&t.notes)
        .bind(t.converted_from_lead_id)
        .bind(t.created_at)
        .bind(t.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, || format!("tenant {} already exists", t.id)))?;
        Ok(t)
    }

    async fn update_tenant(&self, t: Tenant) -> StoreResult<Tenant> {
        let result = sqlx::query(
            r#"UPDATE tenants SET
                name = $2, email = $3, phone = $4, emergency_contact = $5, owner_id = $6,
                current_contract_id = $7, status = $8, documents = $9, notes = $10,
                converted_from_lead_id = $11, updated_at = $12
            WHERE id = $1"#,
        )
        .bind(t.id)
        .bind(&t.name)
        .bind(&t.email)
        .bind(&t.phone)
        .bind(Json(t.emergency_contact.clone()))
        .bind(t.owner_id)
        .bind(t.current_contract_id)
        .bind(t.status.as_str())
        .bind(Json(t.documents.clone()))
        .bind(&t.notes)
        .bind(t.converted_from_lead_id)
        .bind(t.updated_at)
        .execute(&self.pool)
        .await?;
        expect_row(result.rows_affected(), "tenant", t.id)?;
        Ok(t)
    }

    async fn delete_tenant(&self, id: Uuid) -> StoreResult<()> {
        let removed = self.repo::<DbTenant>("tenants").delete_id(id).await?;
        expect_row(removed as u64, "tenant", id)
    }

    async fn get_listing(&self, id: Uuid) -> StoreResult<Option<Listing>> {
        let row = self.repo::<DbListing>("listings").select_id(id).await?;
        row.map(listing_from_db).transpose()
    }

    async fn list_listings(&self, query: &ListingQuery) -> StoreResult<Vec<Listing>> {
        let rows = self.repo::<DbListing>("listings").select_any(query.filter_data()).await?;
        collect(rows, listing_from_db)
    }

    async fn count_listings(&self, query: &ListingQuery) -> StoreResult<i64> {
        Ok(self.repo::<DbListing>("listings").count(query.filter_data()).await?)
    }

    async fn insert_listing(&self, l: Listing) -> StoreResult<Listing> {
        sqlx::query(
            r#"INSERT INTO listings (
                id, title, slug, address, suburb, location, room_type, price_per_week, bond,
                bills_included, available_from, min_term_weeks, preferred_tenants, house_features,
                rules, images, owner_id, status, tenant_id, locale, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)"#,
        )
        .bind(l.id)
        .bind(&l.title)
        .bind(&l.slug)
        .bind(&l.address)
        .bind(&l.suburb)
        .bind(l.location.map(Json))
        .bind(l.room_type.map(|r| r.as_str()))
        .bind(l.price_per_week)
        .bind(l.bond)
        .bind(l.bills_included)
        .bind(l.available_from)
        .bind(l.min_term_weeks)
        .bind(&l.preferred_tenants)
        .bind(&l.house_features)
        .bind(&l.rules)
        .bind(&l.images)
        .bind(l.owner_id)
        .bind(l.status.as_str())
        .bind(l.tenant_id)
        .bind(l.locale.as_str())
        .bind(l.created_at)
        .bind(l.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, || format!("listing slug {} already exists", l.slug)))?;
        Ok(l)
    }

    async fn update_listing(&self, l: Listing) -> StoreResult<Listing> {
        let result = sqlx::query(
            r#"UPDATE listings SET
                title = $2, slug = $3, address = $4, suburb = $5, location = $6, room_type = $7,
                price_per_week = $8, bond = $9, bills_included = $10, available_from = $11,
                min_term_weeks = $12, preferred_tenants = $13, house_features = $14, rules = $15,
                images = $16, owner_id = $17, status = $18, tenant_id = $19, locale = $20,
                updated_at = $21
            WHERE id = $1"#,
        )
        .bind(l.id)
        .bind(&l.title)
        .bind(&l.slug)
        .bind(&l.address)
        .bind(&l.suburb)
        .bind(l.location.map(Json))
        .bind(l.room_type.map(|r| r.as_str()))
        .bind(l.price_per_week)
        .bind(l.bond)
        .bind(l.bills_included)
        .bind(l.available_from)
        .bind(l.min_term_weeks)
        .bind(&l.preferred_tenants)
        .bind(&l.house_features)
        .bind(&l.rules)
        .bind(&l.images)
        .bind(l.owner_id)
        .bind(l.status.as_str())
        .bind(l.tenant_id)
        .bind(l.locale.as_str())
        .bind(l.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, || format!("listing slug {} already exists", l.slug)))?;
        expect_row(result.rows_affected(), "listing", l.id)?;
        Ok(l)
    }

    async fn delete_listing(&self, id: Uuid) -> StoreResult<()> {
        let removed = self.repo::<DbListing>("listings").delete_id(id).await?;
        expect_row(removed as u64, "listing", id)
    }

    async fn get_owner(&self, id: Uuid) -> StoreResult<Option<Owner>> {
        let row = self.repo::<DbOwner>("owners").select_id(id).await?;
        row.map(owner_from_db).transpose()
    }

    async fn list_owners(&self, query: &OwnerQuery) -> StoreResult<Vec<Owner>> {
        let rows = self.repo::<DbOwner>("owners").select_any(query.filter_data()).await?;
        collect(rows, owner_from_db)
    }

    async fn count_owners(&self, query: &OwnerQuery) -> StoreResult<i64> {
        Ok(self.repo::<DbOwner>("owners").count(query.filter_data()).await?)
    }

    async fn insert_owner(&self, o: Owner) -> StoreResult<Owner> {
        sqlx::query(
            r#"INSERT INTO owners (id, name, email, phone, company, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(o.id)
        .bind(&o.name)
        .bind(&o.email)
        .bind(&o.phone)
        .bind(&o.company)
        .bind(o.status.as_str())
        .bind(o.created_at)
        .bind(o.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, || format!("owner email {} already exists", o.email)))?;
        Ok(o)
    }

    async fn update_owner(&self, o: Owner) -> StoreResult<Owner> {
        let result = sqlx::query(
            r#"UPDATE owners SET name = $2, email = $3, phone = $4, company = $5, status = $6, updated_at = $7
            WHERE id = $1"#,
        )
        .bind(o.id)
        .bind(&o.name)
        .bind(&o.email)
        .bind(&o.phone)
        .bind(&o.company)
        .bind(o.status.as_str())
        .bind(o.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, || format!("owner email {} already exists", o.email)))?;
        expect_row(result.rows_affected(), "owner", o.id)?;
        Ok(o)
    }

    async fn delete_owner(&self, id: Uuid) -> StoreResult<()> {
        let removed = self.repo::<DbOwner>("owners").delete_id(id).await?;
        expect_row(removed as u64, "owner", id)
    }

    async fn get_lead(&self, id: Uuid) -> StoreResult<Option<Lead>> {
        let row = self.repo::<DbLead>("leads").select_id(id).await?;
        row.map(lead_from_db).transpose()
    }

    async fn list_leads(&self, query: &LeadQuery) -> StoreResult<Vec<Lead>> {
        let rows = self.repo::<DbLead>("leads").select_any(query.filter_data()).await?;
        collect(rows, lead_from_db)
    }

    async fn count_leads(&self, query: &LeadQuery) -> StoreResult<i64> {
        Ok(self.repo::<DbLead>("leads").count(query.filter_data()).await?)
    }

    async fn insert_lead(&self, l: Lead) -> StoreResult<Lead> {
        sqlx::query(
            r#"INSERT INTO leads (id, name, email, phone, message, listing_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
        )
        .bind(l.id)
        .bind(&l.name)
        .bind(&l.email)
        .bind(&l.phone)
        .bind(&l.message)
        .bind(l.listing_id)
        .bind(l.status.as_str())
        .bind(l.created_at)
        .bind(l.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, || format!("lead {} already exists", l.id)))?;
        Ok(l)
    }

    async fn update_lead(&self, l: Lead) -> StoreResult<Lead> {
        let result = sqlx::query(
            r#"UPDATE leads SET name = $2, email = $3, phone = $4, message = $5, listing_id = $6,
                status = $7, updated_at = $8
            WHERE id = $1"#,
        )
        .bind(l.id)
        .bind(&l.name)
        .bind(&l.email)
        .bind(&l.phone)
        .bind(&l.message)
        .bind(l.listing_id)
        .bind(l.status.as_str())
        .bind(l.updated_at)
        .execute(&self.pool)
        .await?;
        expect_row(result.rows_affected(), "lead", l.id)?;
        Ok(l)
    }

    async fn delete_lead(&self, id: Uuid) -> StoreResult<()> {
        let removed = self.repo::<DbLead>("leads").delete_id(id).await?;
        expect_row(removed as u64, "lead", id)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row = self.repo::<DbUser>("users").select_id(id).await?;
        row.map(user_from_db).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let filter = FilterData::with_where(json!({ "email": email.trim().to_lowercase() }));
        let row = self.repo::<DbUser>("users").select_one(filter).await?;
        row.map(user_from_db).transpose()
    }

    async fn find_user_by_owner(&self, owner_id: Uuid) -> StoreResult<Option<User>> {
        let row = self
            .repo::<DbUser>("users")
            .select_one(FilterData::with_where(json!({ "owner_id": owner_id })))
            .await?;
        row.map(user_from_db).transpose()
    }

    async fn find_user_by_tenant(&self, tenant_id: Uuid) -> StoreResult<Option<User>> {
        let row = self
            .repo::<DbUser>("users")
            .select_one(FilterData::with_where(json!({ "tenant_id": tenant_id })))
            .await?;
        row.map(user_from_db).transpose()
    }

    async fn insert_user(&self, u: User) -> StoreResult<User> {
        sqlx::query(
            r#"INSERT INTO users (
                id, email, password_hash, name, role, is_active, last_login, owner_id, tenant_id,
                avatar, phone, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"#,
        )
        .bind(u.id)
        .bind(&u.email)
        .bind(&u.password_hash)
        .bind(&u.name)
        .bind(u.role.as_str())
        .bind(u.is_active)
        .bind(u.last_login)
        .bind(u.owner_id)
        .bind(u.tenant_id)
        .bind(&u.avatar)
        .bind(&u.phone)
        .bind(u.created_at)
        .bind(u.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, || format!("user email {} already exists", u.email)))?;
        Ok(u)
    }

    async fn update_user(&self, u: User) -> StoreResult<User> {
        let result = sqlx::query(
            r#"UPDATE users SET
                email = $2, password_hash = $3, name = $4, role = $5, is_active = $6, last_login = $7,
                owner_id = $8, tenant_id = $9, avatar = $10, phone = $11, updated_at = $12
            WHERE id = $1"#,
        )
        .bind(u.id)
        .bind(&u.email)
        .bind(&u.password_hash)
        .bind(&u.name)
        .bind(u.role.as_str())
        .bind(u.is_active)
        .bind(u.last_login)
        .bind(u.owner_id)
        .bind(u.tenant_id)
        .bind(&u.avatar)
        .bind(&u.phone)
        .bind(u.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, || format!("user email {} already exists", u.email)))?;
        expect_row(result.rows_affected(), "user", u.id)?;
        Ok(u)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(DatabaseManager::health_check(&self.pool).await?)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

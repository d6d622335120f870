use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;


string_enum! {
    /// Maintained by the contract lifecycle; never taken from client updates.
    ListingStatus {
        Draft => "draft",
        Published => "published",
        Reserved => "reserved",
        Rented => "rented",
    }
}

impl Default for ListingStatus {
    fn default() -> Self {
        ListingStatus::Published
    }
}

string_enum! {
    RoomType {
        Master => "master",
        Double => "double",
        Single => "single",
    }
}

string_enum! {
    Locale {
        Es => "es",
        En => "en",
    }
}

impl Default for Locale {
    fn default() -> Self {
        Locale::Es
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub address: String,
    pub suburb: Option<String>,
    pub location: Option<GeoPoint>,
    pub room_type: Option<RoomType>,
    pub price_per_week: Option<Decimal>,
    pub bond: Option<Decimal>,
    pub bills_included: bool,
    pub available_from: Option<DateTime<Utc>>,
    pub min_term_weeks: i32,
    pub preferred_tenants: Vec<String>,
    pub house_features: Vec<String>,
    pub rules: Vec<String>,
    pub images: Vec<String>,
    pub owner_id: Uuid,
    pub status: ListingStatus,
    pub tenant_id: Option<Uuid>,
    pub locale: Locale,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    /// Marks the listing as held by a tenant's lease.
    pub fn reserve_for(&mut self, tenant_id: Uuid) {
        self.status = ListingStatus::Reserved;
        self.tenant_id = Some(tenant_id);
        self.updated_at = Utc::now();
    }

    /// Puts the listing back on the market.
    pub fn release(&mut self) {
        self.status = ListingStatus::Published;
        self.tenant_id = None;
        self.updated_at = Utc::now();
    }
}

/// Builds a URL slug of the form `<suburb>-<title>-<millis>`, lower-cased with accents
/// folded and anything outside `[a-z0-9-]` dropped.
pub fn make_slug(suburb: Option<&str>, title: &str, now: DateTime<Utc>) -> String {
    let base = format!("{}-{}", suburb.filter(|s| !s.trim().is_empty()).unwrap_or("room"), title);
    let mut slug = String::with_capacity(base.len() + 14);
    let mut last_dash = false;
    for ch in base.chars().flat_map(char::to_lowercase) {
        let folded = fold_accent(ch);
        if folded.is_whitespace() {
            if !last_dash {
                slug.push('-');
                last_dash = true;
            }
        } else if folded.is_ascii_alphanumeric() || folded == '-' {
            slug.push(folded);
            last_dash = folded == '-';
        }
    }
    format!("{}-{}", slug, now.timestamp_millis())
}

fn fold_accent(ch: char) -> char {
    match ch {
        'á' | 'à' | 'ä' | 'â' | 'ã' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn slug_folds_accents_and_appends_timestamp() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        assert_eq!(
            make_slug(Some("Surry Hills"), "Habitación grande, luminosa!", now),
            "surry-hills-habitacion-grande-luminosa-1700000000000"
        );
    }

    #[test]
    fn slug_defaults_missing_suburb_to_room() {
        let now = Utc.timestamp_millis_opt(5).unwrap();
        assert_eq!(make_slug(None, "Cosy single", now), "room-cosy-single-5");
        assert_eq!(make_slug(Some("  "), "A", now), "room-a-5");
    }
}

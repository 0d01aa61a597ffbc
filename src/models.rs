use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Flag stamped onto the config document when it only exists locally.
pub const IS_LOCAL_KEY: &str = "_isLocal";
/// ISO timestamp of the last local save.
pub const LAST_SAVED_KEY: &str = "_lastSaved";
/// ISO timestamp of the last successful local→remote reconciliation.
pub const LAST_SYNCED_KEY: &str = "_lastSynced";

/// The full editable state of the bot and storefront.
///
/// No fixed schema is enforced: the remote service owns the shape and this
/// client treats the document as an open mapping. Typed projections exist
/// only for the slices this crate actually reads, and every nested access is
/// optional; a missing field is never an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigDoc(pub Map<String, Value>);

impl ConfigDoc {
    /// Seed document used on first local initialization and after `clear`.
    pub fn defaults() -> Self {
        let value = json!({
            "welcomeMessage": "Bienvenue sur FindYourPlug 🔌",
            "buttons": {
                "shop": "🛍 Boutique",
                "inscription": "📝 Inscription",
                "services": "💬 Services",
            },
            "socialMedia": [],
            "shopSocialMedia": [],
            "boutique": {
                "title": "FindYourPlug",
                "subtitle": "",
                "backgroundImage": null,
            },
            "languages": {
                "available": ["fr", "en", "es", "it", "de"],
                "currentLanguage": "fr",
            },
            "telegramLinks": TelegramLinks::default(),
        });
        match value {
            Value::Object(map) => Self(map),
            _ => Self(Map::new()),
        }
    }

    /// Wraps a JSON value, accepting objects only.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Shallow top-level merge. The remote service replaces wholesale any
    /// field it receives, so nested structures in `patch` overwrite rather
    /// than deep-merge.
    pub fn merge(&mut self, patch: Map<String, Value>) {
        for (key, value) in patch {
            self.0.insert(key, value);
        }
    }

    /// Stamps the document as the local authoritative copy.
    pub fn mark_local(&mut self) {
        self.0.insert(IS_LOCAL_KEY.to_string(), Value::Bool(true));
        self.0
            .insert(LAST_SAVED_KEY.to_string(), Value::String(Utc::now().to_rfc3339()));
    }

    /// Clears the local flag after a successful push to the remote service.
    pub fn mark_synced(&mut self) {
        self.0.insert(IS_LOCAL_KEY.to_string(), Value::Bool(false));
        self.0
            .insert(LAST_SYNCED_KEY.to_string(), Value::String(Utc::now().to_rfc3339()));
    }

    pub fn is_local(&self) -> bool {
        self.0
            .get(IS_LOCAL_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Narrow projection of the two outbound telegram URLs.
    /// Absent or partial `telegramLinks` falls back to the defaults per field.
    pub fn telegram_links(&self) -> TelegramLinks {
        let defaults = TelegramLinks::default();
        let node = self.0.get("telegramLinks");
        let field = |name: &str, fallback: &str| -> String {
            node.and_then(|n| n.get(name))
                .and_then(Value::as_str)
                .unwrap_or(fallback)
                .to_string()
        };
        TelegramLinks {
            inscription_telegram_link: field(
                "inscriptionTelegramLink",
                &defaults.inscription_telegram_link,
            ),
            services_telegram_link: field("servicesTelegramLink", &defaults.services_telegram_link),
        }
    }

    /// Shop-facing social entries; malformed entries are skipped.
    pub fn shop_social_media(&self) -> Vec<SocialMediaEntry> {
        self.0
            .get("shopSocialMedia")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A social media link shown under the bot menu or the shop footer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialMediaEntry {
    pub id: String,
    pub name: String,
    pub emoji: String,
    pub url: String,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
}

impl SocialMediaEntry {
    /// Derives a unique id from the entry name.
    ///
    /// Ids are slugs of the name; collisions within the containing list are
    /// resolved at insertion time by probing `name`, `name_1`, `name_2`, …
    pub fn unique_id(existing: &[SocialMediaEntry], name: &str) -> String {
        let base = slugify(name);
        if !existing.iter().any(|e| e.id == base) {
            return base;
        }
        let mut suffix = 1u32;
        loop {
            let candidate = format!("{}_{}", base, suffix);
            if !existing.iter().any(|e| e.id == candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }
}

fn slugify(name: &str) -> String {
    let slug: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if slug.is_empty() {
        "entry".to_string()
    } else {
        slug
    }
}

/// One service offered by a listing (delivery, postal shipping or meetup).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceInfo {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlugServices {
    pub delivery: ServiceInfo,
    pub postal: ServiceInfo,
    pub meetup: ServiceInfo,
}

/// A vendor listing ("plug"/boutique) shown in the storefront.
///
/// Owned by the remote service: this crate reads and votes, it is never the
/// source of truth. Every field beyond the id may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plug {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub is_vip: bool,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub services: PlugServices,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral_link: Option<String>,
}

/// The two outbound Telegram URLs needed by every public shop page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelegramLinks {
    pub inscription_telegram_link: String,
    pub services_telegram_link: String,
}

impl Default for TelegramLinks {
    fn default() -> Self {
        Self {
            inscription_telegram_link: "https://t.me/FindYourPlugBot?start=inscription".to_string(),
            services_telegram_link: "https://t.me/FindYourPlugBot?start=services".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReferralEntry {
    pub plug_id: String,
    pub name: String,
    pub referrals: u64,
}

/// Referral statistics rendered on the admin dashboard. The remote service
/// may add fields at any time; unknown keys are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReferralStats {
    pub total_users: u64,
    pub total_referrals: u64,
    pub top_referrers: Vec<ReferralEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

//! Catalog products and admin drafts.

use crate::loose;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A catalog product as stored under `product:{slug}` and in the `products`
/// list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// URL-safe identifier.
    pub slug: String,
    /// Display title.
    pub title: String,
    /// One-line subtitle.
    pub subtitle: String,
    /// Long description.
    pub description: String,
    /// Unit price in cents.
    pub price_cents: u64,
    /// Stock snapshot. The live value is the `stock:{slug}` counter.
    pub stock: u64,
    /// Hidden from the shop, listed in the archive.
    pub archived: bool,
    /// Visible in the shop.
    pub published: bool,
    /// Archive automatically when stock reaches zero.
    #[serde(default)]
    pub auto_archive_on_zero: bool,
    /// Image URLs.
    #[serde(default)]
    pub images: Vec<String>,
    /// Materials text.
    #[serde(default)]
    pub materials: String,
    /// Dimensions text.
    #[serde(default)]
    pub dimensions: String,
    /// Care instructions.
    #[serde(default)]
    pub care: String,
    /// Shipping and returns text.
    #[serde(default)]
    pub shipping_returns: String,
    /// Catalog price at the payment processor, if one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_id: Option<String>,
    /// Unix millis of the last stock sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Product {
    /// Normalize a stored value.
    ///
    /// Slug and title are required (after trimming). Numbers are floored and
    /// clamped at zero, the description falls back to the subtitle and only
    /// non-empty image strings are kept.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let slug = loose::string_or(obj.get("slug"), "").trim().to_string();
        let title = loose::string_or(obj.get("title"), "").trim().to_string();
        if slug.is_empty() || title.is_empty() {
            return None;
        }

        let subtitle = loose::string_or(obj.get("subtitle"), "");
        let description = loose::string_or(obj.get("description"), &subtitle);

        Some(Self {
            slug,
            title,
            description,
            subtitle,
            price_cents: loose::clamp_non_negative(loose::number(obj.get("priceCents")).unwrap_or(0.0)),
            stock: loose::clamp_non_negative(loose::number(obj.get("stock")).unwrap_or(0.0)),
            archived: loose::bool_or(obj.get("archived"), false),
            published: loose::bool_or(obj.get("published"), false),
            auto_archive_on_zero: loose::bool_or(obj.get("autoArchiveOnZero"), false),
            images: loose::string_list(obj.get("images")),
            materials: loose::string_or(obj.get("materials"), ""),
            dimensions: loose::string_or(obj.get("dimensions"), ""),
            care: loose::string_or(obj.get("care"), ""),
            shipping_returns: loose::string_or(obj.get("shippingReturns"), ""),
            price_id: loose::non_empty_str(obj.get("priceId")).map(str::to_string),
            updated_at: loose::whole(obj.get("updatedAt")),
        })
    }

    /// Listed in the shop.
    #[must_use]
    pub const fn is_purchasable(&self) -> bool {
        self.published && !self.archived
    }

    /// Listed in the archive: archived, or published and sold out.
    #[must_use]
    pub const fn is_archive_item(&self) -> bool {
        self.archived || (self.published && self.stock == 0)
    }

    /// Apply a new stock level, archiving if the product asks for it.
    pub fn apply_stock(&mut self, stock: u64, now_millis: i64) {
        self.stock = stock;
        if self.auto_archive_on_zero && stock == 0 {
            self.archived = true;
        }
        self.updated_at = Some(now_millis);
    }
}

/// An admin product submission, from JSON or from form fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    /// Trimmed slug.
    pub slug: String,
    /// Trimmed title.
    pub title: String,
    /// Subtitle.
    pub subtitle: String,
    /// Description (defaults to subtitle).
    pub description: String,
    /// Raw price, clamped on save.
    pub price_cents: f64,
    /// Raw stock, clamped on save.
    pub stock: f64,
    /// Archived flag.
    pub archived: bool,
    /// Published flag.
    pub published: bool,
    /// Auto-archive flag.
    pub auto_archive_on_zero: bool,
    /// Image URLs.
    pub images: Vec<String>,
    /// Materials text.
    pub materials: String,
    /// Dimensions text.
    pub dimensions: String,
    /// Care text.
    pub care: String,
    /// Shipping and returns text.
    pub shipping_returns: String,
    /// Processor price id.
    pub price_id: Option<String>,
}

impl ProductDraft {
    /// Read a submission.
    ///
    /// Form submissions carry every value as a string: flags are checkbox
    /// values and images are newline-separated. JSON submissions use native
    /// types. Returns `None` without a slug and title.
    #[must_use]
    pub fn from_value(value: &Value, is_json: bool) -> Option<Self> {
        let obj = value.as_object()?;
        let slug = obj.get("slug").and_then(Value::as_str)?.trim().to_string();
        let title = obj.get("title").and_then(Value::as_str)?.trim().to_string();
        if slug.is_empty() || title.is_empty() {
            return None;
        }

        let text = |key: &str| loose::string_or(obj.get(key), "");
        let subtitle = text("subtitle");
        let description = loose::string_or(obj.get("description"), &subtitle);

        let (archived, published, auto_archive_on_zero, images) = if is_json {
            (
                truthy(obj.get("archived")),
                truthy(obj.get("published")),
                truthy(obj.get("autoArchiveOnZero")),
                loose::string_list(obj.get("images")),
            )
        } else {
            (
                loose::flag(obj.get("archived")),
                loose::flag(obj.get("published")),
                loose::flag(obj.get("autoArchiveOnZero")),
                obj.get("images")
                    .and_then(Value::as_str)
                    .map(loose::lines)
                    .unwrap_or_default(),
            )
        };

        Some(Self {
            slug,
            title,
            description,
            subtitle,
            price_cents: loose::number_like(obj.get("priceCents")).unwrap_or(0.0),
            stock: loose::number_like(obj.get("stock")).unwrap_or(0.0),
            archived,
            published,
            auto_archive_on_zero,
            images,
            materials: text("materials"),
            dimensions: text("dimensions"),
            care: text("care"),
            shipping_returns: text("shippingReturns"),
            price_id: loose::non_empty_str(obj.get("priceId")).map(|s| s.trim().to_string()),
        })
    }

    /// Build the product to store.
    ///
    /// Price and stock are clamped to non-negative integers. A product that
    /// auto-archives and has no stock is archived regardless of the flag.
    #[must_use]
    pub fn into_product(self, now_millis: i64) -> Product {
        let stock = loose::clamp_non_negative(self.stock);
        let archived = if self.auto_archive_on_zero && stock == 0 {
            true
        } else {
            self.archived
        };
        Product {
            slug: self.slug,
            title: self.title,
            subtitle: self.subtitle,
            description: self.description,
            price_cents: loose::clamp_non_negative(self.price_cents),
            stock,
            archived,
            published: self.published,
            auto_archive_on_zero: self.auto_archive_on_zero,
            images: self.images,
            materials: self.materials,
            dimensions: self.dimensions,
            care: self.care,
            shipping_returns: self.shipping_returns,
            price_id: self.price_id,
            updated_at: Some(now_millis),
        }
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

/// One row of a bulk stock update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockUpdate {
    /// Product slug.
    pub slug: String,
    /// New stock level.
    pub stock: u64,
}

/// Read `{ "updates": [{ "slug", "stock" }] }`, dropping invalid rows.
///
/// A missing stock reads as zero; non-numeric stock drops the row.
#[must_use]
pub fn sanitize_stock_updates(payload: &Value) -> Vec<StockUpdate> {
    let Some(rows) = payload.get("updates").and_then(Value::as_array) else {
        return Vec::new();
    };
    rows.iter()
        .filter_map(|row| {
            let slug = row.get("slug").and_then(Value::as_str)?.trim();
            if slug.is_empty() {
                return None;
            }
            let stock = match row.get("stock") {
                None | Some(Value::Null) => 0.0,
                other => loose::number_like(other)?,
            };
            Some(StockUpdate {
                slug: slug.to_string(),
                stock: loose::clamp_non_negative(stock),
            })
        })
        .collect()
}

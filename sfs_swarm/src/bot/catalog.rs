//! Clothing catalog built from shop product listings.

use crate::net::payload::{SfsObject, SfsValue};
use rand::Rng;
use std::collections::HashSet;

/// Product type accepted into the catalog, compared case-insensitively
const CLOTH_TYPE: &str = "CLOTH";

/// A wearable product offered by a shop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClothProduct {
    pub shop_id: i32,
    pub product_id: i32,
    pub clip: String,
    /// Positive color ids the product can be bought in
    pub colors: Vec<i32>,
}

impl ClothProduct {
    /// Random color from the product's list, or 0 when it has none
    pub fn pick_color<R: Rng + ?Sized>(&self, rng: &mut R) -> i32 {
        if self.colors.is_empty() {
            return 0;
        }
        self.colors[rng.random_range(0..self.colors.len())]
    }
}

/// Ordered catalog, unique by `(shop_id, product_id)`
#[derive(Debug, Clone, Default)]
pub struct ClothCatalog {
    products: Vec<ClothProduct>,
    keys: HashSet<(i32, i32)>,
}

impl ClothCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a product unless one with the same shop and product id exists.
    pub fn insert(&mut self, product: ClothProduct) -> bool {
        if !self.keys.insert((product.shop_id, product.product_id)) {
            return false;
        }
        self.products.push(product);
        true
    }

    /// Merge a `shopproductlist` response into the catalog.
    ///
    /// The response carries `shopID` and a `shopProductList` object whose
    /// values are arrays of product objects. Entries that are not clothing or
    /// lack a clip or id are skipped. Returns how many entries were added.
    pub fn collect(&mut self, response: &SfsObject) -> usize {
        let shop_id = response
            .get("shopID")
            .and_then(SfsValue::as_i64)
            .and_then(|id| i32::try_from(id).ok())
            .unwrap_or(0);
        let Some(listing) = response.get_object("shopProductList") else {
            return 0;
        };

        let mut added = 0;
        for (_, group) in listing.iter() {
            let SfsValue::Array(entries) = group else {
                continue;
            };
            for entry in entries.iter() {
                let SfsValue::Object(entry) = entry else {
                    continue;
                };
                if let Some(product) = parse_product(shop_id, entry) {
                    if self.insert(product) {
                        added += 1;
                    }
                }
            }
        }
        added
    }

    /// Uniformly random product
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&ClothProduct> {
        if self.products.is_empty() {
            return None;
        }
        self.products.get(rng.random_range(0..self.products.len()))
    }

    pub fn products(&self) -> &[ClothProduct] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

/// Parse one product entry, or `None` if it is not usable clothing.
pub fn parse_product(shop_id: i32, entry: &SfsObject) -> Option<ClothProduct> {
    let kind = entry.get_utf("type")?;
    if !kind.eq_ignore_ascii_case(CLOTH_TYPE) {
        return None;
    }

    let clip = entry.get_utf("clip").filter(|clip| !clip.is_empty())?;
    let product_id = entry
        .get("id")
        .and_then(SfsValue::as_i64)
        .and_then(|id| i32::try_from(id).ok())
        .filter(|&id| id > 0)?;

    Some(ClothProduct {
        shop_id,
        product_id,
        clip: clip.to_string(),
        colors: parse_colors(entry),
    })
}

/// Colors that parse as positive integers, in listed order
fn parse_colors(entry: &SfsObject) -> Vec<i32> {
    match entry.get("colors") {
        Some(SfsValue::Array(items)) => items.iter().filter_map(color_value).collect(),
        Some(SfsValue::UtfArray(items)) => items.iter().filter_map(|s| leading_int(s)).collect(),
        Some(SfsValue::IntArray(items)) => items.iter().copied().filter(|&c| c > 0).collect(),
        _ => Vec::new(),
    }
}

fn color_value(value: &SfsValue) -> Option<i32> {
    match value {
        SfsValue::Utf(s) | SfsValue::Text(s) => leading_int(s),
        other => other
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .filter(|&n| n > 0),
    }
}

/// Positive integer at the start of `s` (`"12px"` is 12)
fn leading_int(s: &str) -> Option<i32> {
    let s = s.trim_start();
    let digits = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && c == '+')))
        .map_or(s.len(), |(i, _)| i);
    s[..digits].parse::<i32>().ok().filter(|&n| n > 0)
}

// Product Catalog Module
// Read-only product endpoints plus ready-made remote resources for views

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::CatalogConfig;
use crate::error::Result;
use crate::fetch::{NoParams, RemoteResource};
use crate::transport::Transport;

pub const PRODUCTS_PATH: &str = "/api/products";

/// Product as served by the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub stock: u32,
}

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_pages: u32,
    pub total_elements: u64,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub number: u32,
}

/// Stock level of a single product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockInfo {
    pub product_id: u64,
    pub product_name: String,
    pub stock: u32,
}

/// Listing query parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ProductQuery {
    pub page: u32,
    pub size: u32,
    pub sort: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ProductQuery {
    pub fn from_config(config: &CatalogConfig) -> Self {
        Self {
            page: 0,
            size: config.page_size,
            sort: config.sort.clone(),
            category: None,
        }
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self::from_config(&CatalogConfig::default())
    }
}

pub type ProductListing = RemoteResource<Page<Product>, ProductQuery>;
pub type ProductDetail = RemoteResource<Product, NoParams>;

pub struct Catalog {
    transport: Arc<Transport>,
    defaults: ProductQuery,
}

impl Catalog {
    pub fn new(transport: Arc<Transport>, config: &CatalogConfig) -> Self {
        Self {
            transport,
            defaults: ProductQuery::from_config(config),
        }
    }

    /// Query pre-filled with the configured page size and sort order
    pub fn query(&self) -> ProductQuery {
        self.defaults.clone()
    }

    pub async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>> {
        self.transport.get_with(PRODUCTS_PATH, query).await
    }

    pub async fn all_products(&self) -> Result<Vec<Product>> {
        self.transport.get(&format!("{}/all", PRODUCTS_PATH)).await
    }

    pub async fn product(&self, id: u64) -> Result<Product> {
        self.transport.get(&product_path(id)).await
    }

    pub async fn stock(&self, id: u64) -> Result<StockInfo> {
        self.transport.get(&format!("{}/stock", product_path(id))).await
    }

    /// Listing resource, not yet loaded
    pub fn listing(&self, query: ProductQuery) -> ProductListing {
        RemoteResource::new(Arc::clone(&self.transport), PRODUCTS_PATH, query)
    }

    /// Detail resource, not yet loaded.
    /// Switch products with [`RemoteResource::set_path`] and [`product_path`].
    pub fn detail(&self, id: u64) -> ProductDetail {
        RemoteResource::new(Arc::clone(&self.transport), product_path(id), NoParams {})
    }
}

pub fn product_path(id: u64) -> String {
    format!("{}/{}", PRODUCTS_PATH, id)
}

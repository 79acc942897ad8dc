use crate::ports::AssetCatalog;
use chrono::{DateTime, Utc};
use common::clients::catalog::{Asset, SearchAssetsRequest};
use common::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaleQuery {
    /// Cutoff fixed when the run was triggered, identical across retries.
    pub updated_before: DateTime<Utc>,
    pub page_size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaleAssets {
    pub updated_before: DateTime<Utc>,
    pub assets: Vec<Asset>,
}

impl StaleAssets {
    pub fn guids(&self) -> Vec<String> {
        self.assets.iter().map(|a| a.guid.clone()).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagRequest {
    pub guids: Vec<String>,
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagOutcome {
    pub tagged: u64,
}

pub fn page_count(total: u64, page_size: u64) -> u64 {
    total.div_ceil(page_size)
}

pub struct FreshnessActivities {
    catalog: Arc<dyn AssetCatalog>,
}

impl FreshnessActivities {
    pub fn new(catalog: Arc<dyn AssetCatalog>) -> Self {
        Self { catalog }
    }

    /// Pages through every asset last updated before the cutoff. The first
    /// page is always requested since it carries the total, so an empty
    /// catalog costs exactly one search.
    pub async fn fetch_stale_assets(&self, query: StaleQuery) -> AppResult<StaleAssets> {
        if query.page_size == 0 {
            return Err(AppError::Validation("page_size must be positive".to_string()));
        }
        let updated_before = query.updated_before;

        let mut request = SearchAssetsRequest {
            updated_before,
            from: 0,
            size: query.page_size,
        };
        let first = self.catalog.search_assets(&request).await?;
        let pages = page_count(first.total, query.page_size);
        let mut assets = first.assets;

        for page in 1..pages {
            request.from = page * query.page_size;
            let next = self.catalog.search_assets(&request).await?;
            assets.extend(next.assets);
        }

        let before = assets.len();
        assets.retain(|asset| !asset.is_deleted());
        tracing::info!(
            total = first.total,
            pages,
            live = assets.len(),
            deleted = before - assets.len(),
            "Fetched stale assets"
        );

        Ok(StaleAssets {
            updated_before,
            assets,
        })
    }

    pub async fn tag_assets(&self, request: TagRequest) -> AppResult<TagOutcome> {
        if request.tag.trim().is_empty() {
            return Err(AppError::Validation("tag must not be empty".to_string()));
        }
        let tagged = self
            .catalog
            .add_tag(&request.guids, request.tag.trim())
            .await?;
        Ok(TagOutcome { tagged })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::MockAssetCatalog;
    use chrono::TimeZone;
    use common::clients::catalog::AssetPage;
    use std::sync::Mutex;

    fn asset(i: u64, deleted: bool) -> Asset {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Asset {
            guid: format!("a-{}", i),
            name: format!("table_{}", i),
            updated_at: ts,
            deleted_at: deleted.then_some(ts),
        }
    }

    fn cutoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    /// Catalog of `total` assets where every third one is soft-deleted.
    fn paged_catalog(total: u64) -> (MockAssetCatalog, Arc<Mutex<Vec<u64>>>) {
        let visited = Arc::new(Mutex::new(Vec::new()));
        let seen = visited.clone();
        let mut catalog = MockAssetCatalog::new();
        catalog.expect_search_assets().returning(move |req| {
            seen.lock().unwrap().push(req.from);
            let end = (req.from + req.size).min(total);
            Ok(AssetPage {
                total,
                assets: (req.from..end).map(|i| asset(i, i % 3 == 2)).collect(),
            })
        });
        (catalog, visited)
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(21, 10), 3);
    }

    #[tokio::test]
    async fn visits_every_page_once_and_drops_deleted() {
        let (catalog, visited) = paged_catalog(25);
        let stale = FreshnessActivities::new(Arc::new(catalog))
            .fetch_stale_assets(StaleQuery {
                updated_before: cutoff(),
                page_size: 10,
            })
            .await
            .unwrap();

        assert_eq!(*visited.lock().unwrap(), vec![0, 10, 20]);
        // indices 2, 5, 8, ..., 23 are deleted: 8 of 25
        assert_eq!(stale.assets.len(), 17);
        assert!(stale.assets.iter().all(|a| a.deleted_at.is_none()));
    }

    #[tokio::test]
    async fn zero_page_size_is_rejected() {
        let mut catalog = MockAssetCatalog::new();
        catalog.expect_search_assets().never();
        let err = FreshnessActivities::new(Arc::new(catalog))
            .fetch_stale_assets(StaleQuery {
                updated_before: cutoff(),
                page_size: 0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn empty_catalog_reads_only_the_first_page() {
        let (catalog, visited) = paged_catalog(0);
        let stale = FreshnessActivities::new(Arc::new(catalog))
            .fetch_stale_assets(StaleQuery {
                updated_before: cutoff(),
                page_size: 50,
            })
            .await
            .unwrap();
        assert!(stale.assets.is_empty());
        assert_eq!(*visited.lock().unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn repeated_attempts_search_with_the_same_cutoff() {
        let cutoffs = Arc::new(Mutex::new(Vec::new()));
        let seen = cutoffs.clone();
        let mut catalog = MockAssetCatalog::new();
        catalog.expect_search_assets().returning(move |req| {
            seen.lock().unwrap().push(req.updated_before);
            Ok(AssetPage {
                total: 0,
                assets: vec![],
            })
        });
        let activities = FreshnessActivities::new(Arc::new(catalog));
        let query = StaleQuery {
            updated_before: cutoff(),
            page_size: 10,
        };

        let first = activities.fetch_stale_assets(query.clone()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = activities.fetch_stale_assets(query).await.unwrap();

        assert_eq!(first.updated_before, second.updated_before);
        assert_eq!(*cutoffs.lock().unwrap(), vec![cutoff(), cutoff()]);
    }

    #[tokio::test]
    async fn tag_assets_forwards_guids() {
        let mut catalog = MockAssetCatalog::new();
        catalog
            .expect_add_tag()
            .withf(|guids, tag| guids.len() == 2 && tag == "stale")
            .returning(|guids, _| Ok(guids.len() as u64));

        let outcome = FreshnessActivities::new(Arc::new(catalog))
            .tag_assets(TagRequest {
                guids: vec!["a".into(), "b".into()],
                tag: " stale ".into(),
            })
            .await
            .unwrap();
        assert_eq!(outcome, TagOutcome { tagged: 2 });
    }
}

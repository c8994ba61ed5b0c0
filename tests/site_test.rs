//! Site provisioning integration tests

use quillpress_core::domain::{CreateSiteInput, UpdateSiteInput};
use quillpress_core::error::AppError;
use quillpress_core::repository::{
    DomainRepository, DomainRepositoryImpl, GroupRepository, GroupRepositoryImpl,
    SiteRepositoryImpl,
};
use quillpress_core::service::{SiteCache, SiteService};
use std::sync::Arc;

mod common;

fn site_service(
    pool: &sqlx::MySqlPool,
) -> SiteService<SiteRepositoryImpl, DomainRepositoryImpl> {
    SiteService::new(
        Arc::new(SiteRepositoryImpl::new(pool.clone())),
        Arc::new(DomainRepositoryImpl::new(pool.clone())),
        Arc::new(SiteCache::new()),
        common::test_sites_config(),
    )
}

#[tokio::test]
async fn test_provision_site_creates_group_and_domain() {
    let pool = match common::get_test_pool().await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Skipping test: could not connect to database: {}", e);
            return;
        }
    };
    common::setup_database(&pool).await.unwrap();

    let owner = common::create_owner(&pool, "owner@example.com").await;
    let service = site_service(&pool);

    let site = service
        .create_site(CreateSiteInput {
            owner_id: owner.id,
            name: "Test Site".to_string(),
            subdomain: "test".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(site.name, "Test Site");
    assert_eq!(site.subdomain, "test");
    assert_eq!(site.normalized_subdomain, "test");
    assert_eq!(site.owner_id, owner.id);
    assert_eq!(site.theme, "cleanblog");

    // The exclusive access-control group exists and the owner is a member.
    let group = GroupRepositoryImpl::new(pool.clone())
        .find_by_name("site:test")
        .await
        .unwrap()
        .expect("site group missing");
    assert_eq!(group.id, site.group_id);

    let owned = service.list_for_user(owner.id).await.unwrap();
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0].id, site.id);

    // The canonical domain is also the primary domain.
    let domain_repo = DomainRepositoryImpl::new(pool.clone());
    let canonical = domain_repo
        .canonical_for_site(site.id)
        .await
        .unwrap()
        .expect("canonical domain missing");
    assert_eq!(canonical.display_domain, "test.example.com");
    assert_eq!(canonical.normalized_domain, "test.example.com");
    assert!(canonical.is_primary);
    assert!(canonical.is_canonical);
}

#[tokio::test]
async fn test_duplicate_subdomain_is_conflict_with_no_partial_tenant() {
    let pool = match common::get_test_pool().await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Skipping test: could not connect to database: {}", e);
            return;
        }
    };
    common::setup_database(&pool).await.unwrap();

    let owner = common::create_owner(&pool, "dup@example.com").await;
    let service = site_service(&pool);

    service
        .create_site(CreateSiteInput {
            owner_id: owner.id,
            name: "First".to_string(),
            subdomain: "dup".to_string(),
        })
        .await
        .unwrap();

    let err = service
        .create_site(CreateSiteInput {
            owner_id: owner.id,
            name: "Second".to_string(),
            subdomain: "dup".to_string(),
        })
        .await
        .unwrap_err();

    match err {
        AppError::Conflict(msg) => assert_eq!(msg, "This domain name is not available."),
        other => panic!("expected conflict, got {:?}", other),
    }

    // The failed attempt must not leave any row behind. Exactly one group
    // with the site's name means the second transaction rolled back.
    let (groups,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM `groups` WHERE name = 'site:dup'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(groups, 1);

    let (sites,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sites")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(sites, 1);
}

#[tokio::test]
async fn test_reserved_subdomain_is_rejected() {
    let pool = match common::get_test_pool().await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Skipping test: could not connect to database: {}", e);
            return;
        }
    };
    common::setup_database(&pool).await.unwrap();

    let owner = common::create_owner(&pool, "reserved@example.com").await;
    let service = site_service(&pool);

    let err = service
        .create_site(CreateSiteInput {
            owner_id: owner.id,
            name: "Admin".to_string(),
            subdomain: "admin".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let (sites,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sites")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(sites, 0);
}

#[tokio::test]
async fn test_update_site_moves_group_and_canonical_domain() {
    let pool = match common::get_test_pool().await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Skipping test: could not connect to database: {}", e);
            return;
        }
    };
    common::setup_database(&pool).await.unwrap();

    let owner = common::create_owner(&pool, "mover@example.com").await;
    let service = site_service(&pool);

    let site = service
        .create_site(CreateSiteInput {
            owner_id: owner.id,
            name: "Old Name".to_string(),
            subdomain: "before".to_string(),
        })
        .await
        .unwrap();

    let updated = service
        .update_site(
            site.id,
            UpdateSiteInput {
                name: "New Name".to_string(),
                subdomain: "after".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "New Name");
    assert_eq!(updated.subdomain, "after");
    assert_eq!(updated.normalized_subdomain, "after");

    let group_repo = GroupRepositoryImpl::new(pool.clone());
    assert!(group_repo.find_by_name("site:before").await.unwrap().is_none());
    let group = group_repo.find_by_name("site:after").await.unwrap().unwrap();
    assert_eq!(group.id, site.group_id);

    let canonical = DomainRepositoryImpl::new(pool.clone())
        .canonical_for_site(site.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(canonical.display_domain, "after.example.com");
}

#[tokio::test]
async fn test_archive_site_records_canonical_name() {
    let pool = match common::get_test_pool().await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Skipping test: could not connect to database: {}", e);
            return;
        }
    };
    common::setup_database(&pool).await.unwrap();

    let owner = common::create_owner(&pool, "archiver@example.com").await;
    let service = site_service(&pool);

    let site = service
        .create_site(CreateSiteInput {
            owner_id: owner.id,
            name: "Doomed".to_string(),
            subdomain: "doomed".to_string(),
        })
        .await
        .unwrap();

    let archived = service.archive_site(site.id).await.unwrap();
    assert!(archived.is_archived());
    assert_eq!(
        archived.archived_canonical_name.as_deref(),
        Some("doomed.example.com")
    );

    // An archived site's domains no longer resolve.
    let found = DomainRepositoryImpl::new(pool.clone())
        .find_for_host("doomed.example.com")
        .await
        .unwrap();
    assert!(found.is_none());

    // Archiving twice is an error, not a silent overwrite.
    let err = service.archive_site(site.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_international_subdomain_round_trip() {
    let pool = match common::get_test_pool().await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Skipping test: could not connect to database: {}", e);
            return;
        }
    };
    common::setup_database(&pool).await.unwrap();

    let owner = common::create_owner(&pool, "idn@example.com").await;
    let service = site_service(&pool);

    let site = service
        .create_site(CreateSiteInput {
            owner_id: owner.id,
            name: "München".to_string(),
            subdomain: "münchen".to_string(),
        })
        .await
        .unwrap();

    // Display form keeps what the user typed; lookups use punycode.
    assert_eq!(site.subdomain, "münchen");
    assert_eq!(site.normalized_subdomain, "xn--mnchen-3ya");

    let canonical = DomainRepositoryImpl::new(pool.clone())
        .canonical_for_site(site.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(canonical.display_domain, "münchen.example.com");
    assert_eq!(canonical.normalized_domain, "xn--mnchen-3ya.example.com");
}

use std::sync::Arc;

use anyhow::Result;

use secunda::domain::{Building, Organization, Practice, PracticeMembership};
use secunda::geo::{Area, BoxArea, CircleArea};
use secunda::seed::populate_if_empty;
use secunda::storage::{InMemoryStorage, Storage};
use secunda::DirectoryService;

const TRUBNAYA: (f64, f64) = (55.769372, 37.624849);

async fn seeded() -> (Arc<InMemoryStorage>, DirectoryService) {
    let storage = Arc::new(InMemoryStorage::new());
    populate_if_empty(storage.as_ref()).await.unwrap();
    let service = DirectoryService::new(storage.clone());
    (storage, service)
}

fn ids(organizations: &[secunda::schemas::OrganizationSchema]) -> Vec<i64> {
    organizations.iter().map(|o| o.id).collect()
}

#[tokio::test]
async fn seeding_twice_does_not_duplicate_rows() -> Result<()> {
    let (storage, _) = seeded().await;
    assert_eq!(storage.count_organizations().await?, 9);

    // Second populate must be a no-op because the count check is nonzero.
    populate_if_empty(storage.as_ref()).await?;
    assert_eq!(storage.count_organizations().await?, 9);
    assert_eq!(storage.get_all_buildings().await?.len(), 5);
    assert_eq!(storage.get_all_practices().await?.len(), 17);
    Ok(())
}

#[tokio::test]
async fn lists_every_building() -> Result<()> {
    let (_, service) = seeded().await;
    let buildings = service.list_buildings().await?;
    assert_eq!(buildings.len(), 5);
    assert_eq!(buildings[0].address, "г. Москва, ул. Трубная 15");
    assert_eq!(buildings[0].coordinates, "55.769372,37.624849");
    Ok(())
}

#[tokio::test]
async fn practices_carry_levels_and_member_organizations() -> Result<()> {
    let (_, service) = seeded().await;
    let practices = service.list_practices().await?;
    assert_eq!(practices.len(), 17);

    let by_name = |name: &str| practices.iter().find(|p| p.name == name).unwrap();

    let food = by_name("Еда");
    assert_eq!(food.level, 0);
    assert_eq!(food.parent_id, None);
    assert!(food.organizations.is_empty());

    // Жилье -> Отель -> Мини-отель
    let mini_hotel = by_name("Мини-отель");
    assert_eq!(mini_hotel.level, 2);
    let members: Vec<i64> = mini_hotel.organizations.iter().map(|o| o.id).collect();
    assert_eq!(members, vec![3, 5]); // Seven Hills and the Pushkaryov mini-hotel

    let bar = by_name("Бар");
    assert_eq!(bar.level, 1);
    Ok(())
}

#[tokio::test]
async fn organizations_come_with_practice_refs() -> Result<()> {
    let (_, service) = seeded().await;
    let organizations = service.list_organizations().await?;
    assert_eq!(organizations.len(), 9);

    let el_borracho = &organizations[0];
    assert_eq!(el_borracho.name, "Эль Боррачо");
    assert_eq!(el_borracho.phone_numbers, vec!["8-909-634-15-15"]);
    let practice_names: Vec<&str> =
        el_borracho.practices.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(practice_names, vec!["Бар", "Мексиканская кухня"]);
    Ok(())
}

#[tokio::test]
async fn organizations_are_filtered_by_building() -> Result<()> {
    let (_, service) = seeded().await;
    assert_eq!(ids(&service.organizations_in_building(1).await?), vec![1, 2, 3, 4]);
    assert_eq!(ids(&service.organizations_in_building(3).await?), vec![6, 7]);
    // Building 5 exists but hosts nobody.
    assert!(service.organizations_in_building(5).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn exact_practice_match_ignores_descendants() -> Result<()> {
    let (_, service) = seeded().await;
    // Both ATM organizations are tagged with "Банкомат" (16) directly.
    assert_eq!(ids(&service.organizations_of_practice(16).await?), vec![4, 8]);
    // Nobody is tagged with "Банковские услуги" (15) itself, only with its
    // children, which an exact match must not see.
    assert!(service.organizations_of_practice(15).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn recursive_practice_match_spans_two_levels() -> Result<()> {
    let (_, service) = seeded().await;
    // Финансы (13): children 14, 15; grandchildren 16, 17.
    assert_eq!(
        ids(&service.organizations_of_practice_recursive(13).await?),
        vec![4, 7, 8, 9]
    );
    // Еда (1): bar, cafe and their kitchens cover three organizations.
    assert_eq!(ids(&service.organizations_of_practice_recursive(1).await?), vec![1, 2, 6]);
    Ok(())
}

#[tokio::test]
async fn recursive_practice_match_excludes_great_grandchildren() -> Result<()> {
    // The two-level range is deliberate; pin it with a deeper chain than the
    // demo dataset has.
    let storage = Arc::new(InMemoryStorage::new());
    let practice = |id, parent_id| Practice {
        id,
        name: format!("practice {id}"),
        parent_id,
    };
    storage
        .insert_practices(&[
            practice(1, None),
            practice(2, Some(1)),
            practice(3, Some(2)),
            practice(4, Some(3)),
        ])
        .await?;
    storage
        .insert_buildings(&[Building {
            id: 1,
            address: "test".to_string(),
            coordinates: "0.0,0.0".to_string(),
        }])
        .await?;
    let organization = |id: i64, name: &str| Organization {
        id,
        name: name.to_string(),
        phone_numbers: vec![],
        building_id: 1,
    };
    storage
        .insert_organizations(&[
            organization(1, "grandchild member"),
            organization(2, "great-grandchild member"),
        ])
        .await?;
    storage
        .insert_memberships(&[
            PracticeMembership { organization_id: 1, practice_id: 3 },
            PracticeMembership { organization_id: 2, practice_id: 4 },
        ])
        .await?;

    let service = DirectoryService::new(storage);
    let matched = service.organizations_of_practice_recursive(1).await?;
    assert_eq!(ids(&matched), vec![1]);
    Ok(())
}

#[tokio::test]
async fn circle_area_selects_nearby_buildings() -> Result<()> {
    let (_, service) = seeded().await;

    let close = Area::Circle(CircleArea { lat: TRUBNAYA.0, lon: TRUBNAYA.1, radius: 300.0 });
    let matched: Vec<i64> = service.buildings_in_area(&close).await?.iter().map(|b| b.id).collect();
    assert_eq!(matched, vec![1, 2, 5]);

    let tight = Area::Circle(CircleArea { lat: TRUBNAYA.0, lon: TRUBNAYA.1, radius: 100.0 });
    let matched: Vec<i64> = service.buildings_in_area(&tight).await?.iter().map(|b| b.id).collect();
    assert_eq!(matched, vec![1]);
    Ok(())
}

#[tokio::test]
async fn box_area_selects_buildings_by_corner_offsets() -> Result<()> {
    let (_, service) = seeded().await;
    let area = Area::Box(BoxArea { lat1: 55.768, lon1: 37.623, lat2: 55.771, lon2: 37.630 });
    let matched: Vec<i64> = service.buildings_in_area(&area).await?.iter().map(|b| b.id).collect();
    assert_eq!(matched, vec![1, 2, 5]);
    Ok(())
}

#[tokio::test]
async fn organizations_in_area_follow_the_matched_buildings() -> Result<()> {
    let (_, service) = seeded().await;

    // Radius 300 covers buildings 1, 2 and 5; building 5 hosts nobody.
    let area = Area::Circle(CircleArea { lat: TRUBNAYA.0, lon: TRUBNAYA.1, radius: 300.0 });
    assert_eq!(ids(&service.organizations_in_area(&area).await?), vec![1, 2, 3, 4, 5]);

    let nowhere = Area::Circle(CircleArea { lat: 0.0, lon: 0.0, radius: 100.0 });
    assert!(service.organizations_in_area(&nowhere).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn full_organization_view_embeds_its_building() -> Result<()> {
    let (_, service) = seeded().await;

    let full = service.get_organization(2).await?.expect("organization 2 is seeded");
    assert_eq!(full.name, "Мария Санта");
    assert_eq!(full.phone_numbers.len(), 2);
    assert_eq!(full.building.id, 1);
    assert_eq!(full.building.address, "г. Москва, ул. Трубная 15");
    let practice_names: Vec<&str> = full.practices.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(practice_names, vec!["Итальянская кухня"]);

    assert!(service.get_organization(100).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn name_search_is_case_insensitive_substring() -> Result<()> {
    let (_, service) = seeded().await;

    // Cyrillic casefolding: "сан" hits "Мария Санта".
    assert_eq!(ids(&service.search_organizations_by_name("сан").await?), vec![2]);
    // ASCII casefolding: "SEVEN" hits "Seven Hills".
    assert_eq!(ids(&service.search_organizations_by_name("SEVEN").await?), vec![3]);
    assert!(service.search_organizations_by_name("nothing here").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn deleting_a_practice_removes_its_subtree() -> Result<()> {
    let (storage, service) = seeded().await;

    // Банковские услуги (15) takes Банкомат (16) and Денежные переводы (17)
    // with it, along with the membership rows of organizations 4, 8 and 9.
    storage.delete_practice(15).await?;
    assert_eq!(storage.get_all_practices().await?.len(), 14);
    assert!(service.organizations_of_practice(16).await?.is_empty());

    let atm = service.get_organization(4).await?.expect("organization survives");
    assert!(atm.practices.is_empty());
    Ok(())
}

#[tokio::test]
async fn deleting_a_building_removes_its_organizations() -> Result<()> {
    let (storage, service) = seeded().await;

    storage.delete_building(1).await?;
    assert_eq!(storage.count_organizations().await?, 5);
    assert!(service.get_organization(1).await?.is_none());
    assert!(service.organizations_in_building(1).await?.is_empty());
    // Memberships of the removed organizations are gone as well.
    assert!(ids(&service.organizations_of_practice(7).await?).is_empty());
    Ok(())
}

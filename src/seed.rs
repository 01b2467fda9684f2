//! Demo-data seeding. Runs once at startup: if the store already holds any
//! organization the whole step is skipped, so repeated starts never
//! duplicate rows. The count check is an at-least-once guard, not a lock —
//! two fresh instances racing the same empty store could both populate.

use tracing::info;

use crate::domain::{Building, Organization, Practice, PracticeMembership};
use crate::error::Result;
use crate::storage::Storage;

pub async fn is_populated(storage: &dyn Storage) -> Result<bool> {
    Ok(storage.count_organizations().await? > 0)
}

pub async fn populate_if_empty(storage: &dyn Storage) -> Result<()> {
    if is_populated(storage).await? {
        info!("Store already populated, skipping seeding");
        return Ok(());
    }

    info!("No data found, populating store with the demo dataset");
    populate(storage).await
}

async fn populate(storage: &dyn Storage) -> Result<()> {
    let building = |id, address: &str, coordinates: &str| Building {
        id,
        address: address.to_string(),
        coordinates: coordinates.to_string(),
    };
    let practice = |id, name: &str, parent_id| Practice {
        id,
        name: name.to_string(),
        parent_id,
    };
    let organization = |id, name: &str, phone_numbers: &[&str], building_id| Organization {
        id,
        name: name.to_string(),
        phone_numbers: phone_numbers.iter().map(|p| p.to_string()).collect(),
        building_id,
    };

    storage
        .insert_buildings(&[
            building(1, "г. Москва, ул. Трубная 15", "55.769372,37.624849"),
            building(2, "г. Москва, пер. Пушкарёв 16", "55.768624,37.628458"),
            building(3, "г. Москва, ул. Большая Никитская 24/1с5", "55.757480,37.602280"),
            building(4, "г. Москва, пер. Вознесенский 7", "55.757859,37.604078"),
            building(5, "г. Москва, пер. Последний 15", "55.770144,37.628240"),
        ])
        .await?;

    // Three practice trees: food, housing, finance.
    storage
        .insert_practices(&[
            practice(1, "Еда", None),
            practice(2, "Продукты", Some(1)),
            practice(3, "Кафе", Some(1)),
            practice(4, "Бар", Some(1)),
            practice(5, "Кальянная", Some(4)),
            practice(6, "Мексиканская кухня", Some(3)),
            practice(7, "Итальянская кухня", Some(3)),
            practice(8, "Японская кухня", Some(3)),
            practice(9, "Жилье", None),
            practice(10, "Отель", Some(9)),
            practice(11, "Мини-отель", Some(10)),
            practice(12, "Апартотель", Some(10)),
            practice(13, "Финансы", None),
            practice(14, "Финансовый консалтинг", Some(13)),
            practice(15, "Банковские услуги", Some(13)),
            practice(16, "Банкомат", Some(15)),
            practice(17, "Денежные переводы", Some(15)),
        ])
        .await?;

    storage
        .insert_organizations(&[
            organization(1, "Эль Боррачо", &["8-909-634-15-15"], 1),
            organization(2, "Мария Санта", &["8-919-764-44-40", "8-919-725-22-88"], 1),
            organization(3, "Seven Hills", &["8-926-773-67-07", "8-499-503-66-77"], 1),
            organization(4, "Банкомат Сбербанк", &[], 1),
            organization(5, "Мини-отель на Пушкарёвом 16", &["8-909-970-22-44"], 2),
            organization(6, "Dukh", &["8-917-262-95-95"], 3),
            organization(
                7,
                "Национальное бюро кредитных историй",
                &["8-495-221-78-37", "8-800-600-64-04"],
                3,
            ),
            organization(8, "Банкомат ВТБ", &[], 4),
            organization(9, "Золотая Корона", &["8-495-960-05-55"], 4),
        ])
        .await?;

    let pair = |organization_id, practice_id| PracticeMembership { organization_id, practice_id };
    storage
        .insert_memberships(&[
            pair(1, 4),  // Эль Боррачо: бар
            pair(1, 6),  // Эль Боррачо: мексиканская кухня
            pair(2, 7),  // Мария Санта: итальянская кухня
            pair(3, 11), // Seven Hills: мини-отель
            pair(4, 16), // Банкомат Сбербанк: банкомат
            pair(5, 11), // Мини-отель на Пушкарёвом: мини-отель
            pair(5, 12), // Мини-отель на Пушкарёвом: апартотель
            pair(6, 3),  // Dukh: кафе
            pair(6, 5),  // Dukh: кальянная
            pair(7, 14), // НБКИ: финансовый консалтинг
            pair(8, 16), // Банкомат ВТБ: банкомат
            pair(9, 17), // Золотая Корона: денежные переводы
        ])
        .await?;

    info!("Seeding complete");
    Ok(())
}

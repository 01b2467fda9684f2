use crate::error::Result;
use crate::storage::Storage;

/// Practice ids considered a match for a "recursive" lookup rooted at
/// `practice_id`: the practice itself, its direct children, and its
/// grandchildren. The range is fixed at two levels below the root by
/// construction (self OR child-of OR grandchild-of), mirroring the shipped
/// three-clause query; practices three or more levels down do not match.
/// Kept as two one-level fetches rather than a descent loop so the range
/// cannot silently widen.
pub async fn recursive_practice_ids(storage: &dyn Storage, practice_id: i64) -> Result<Vec<i64>> {
    let children: Vec<i64> = storage
        .get_practices_by_parent_ids(&[practice_id])
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();

    let grandchildren: Vec<i64> = storage
        .get_practices_by_parent_ids(&children)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();

    let mut ids = Vec::with_capacity(1 + children.len() + grandchildren.len());
    ids.push(practice_id);
    ids.extend(children);
    ids.extend(grandchildren);
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Practice;
    use crate::storage::InMemoryStorage;

    fn practice(id: i64, parent_id: Option<i64>) -> Practice {
        Practice { id, name: format!("practice {id}"), parent_id }
    }

    #[tokio::test]
    async fn closure_stops_at_grandchildren() {
        let storage = InMemoryStorage::new();
        // 1 -> 2 -> 3 -> 4 -> 5, plus a sibling child 6 under 1.
        storage
            .insert_practices(&[
                practice(1, None),
                practice(2, Some(1)),
                practice(3, Some(2)),
                practice(4, Some(3)),
                practice(5, Some(4)),
                practice(6, Some(1)),
            ])
            .await
            .unwrap();

        let mut ids = recursive_practice_ids(&storage, 1).await.unwrap();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3, 6]);
    }

    #[tokio::test]
    async fn leaf_practice_matches_only_itself() {
        let storage = InMemoryStorage::new();
        storage
            .insert_practices(&[practice(1, None), practice(2, Some(1))])
            .await
            .unwrap();

        let ids = recursive_practice_ids(&storage, 2).await.unwrap();
        assert_eq!(ids, vec![2]);
    }
}
